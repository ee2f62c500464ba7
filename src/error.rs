//! 错误类型
//!
//! 输入解析与配置校验的错误定义。通知投递的错误见 [`crate::notify::NotificationError`]。

use thiserror::Error;

/// 读数输入解析错误
///
/// 任何一个非法 token 都会导致整批输入被拒绝，不会部分写入。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputParseError {
    /// 输入为空
    #[error("no readings entered")]
    Empty,

    /// 存在空 token（例如 "36.5,,37"）
    #[error("reading #{position} is empty")]
    EmptyToken { position: usize },

    /// 非数值 token
    #[error("reading #{position} is not a number: {token:?}")]
    InvalidNumber { position: usize, token: String },

    /// NaN 或无穷大
    #[error("reading #{position} is not a finite number: {token:?}")]
    NonFinite { position: usize, token: String },
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// 阈值非法：下限必须严格小于报警阈值，且二者均为有限数
    #[error("invalid thresholds: lower bound {lower} must be below alert threshold {alert}")]
    InvalidThresholds { lower: f64, alert: f64 },

    /// 缺少邮件配置项
    #[error("mail setting `{0}` is required when mail alerts are enabled")]
    MissingMailSetting(&'static str),

    /// 邮箱地址格式错误
    #[error("mail setting `{field}` is not a valid mailbox: {value:?}")]
    InvalidMailbox { field: &'static str, value: String },

    /// 无法获取 SMTP 密码
    #[error("SMTP password unavailable: {0}")]
    MissingCredentials(String),
}
