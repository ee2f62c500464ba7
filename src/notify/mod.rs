//! 通知模块
//!
//! 将报警消息投递给看护人。核心只依赖 [`Notifier`] trait，
//! 具体传输（SMTP、日志）由配置决定。

pub mod credentials;
pub mod dispatcher;
pub mod smtp;

pub use dispatcher::{
    create_dispatcher, DispatcherHandle, NotificationStatus, NotificationWorker, PendingDelivery,
};
pub use smtp::SmtpNotifier;

use crate::config::MailConfig;
use crate::health::AlertPayload;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 通知投递错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// 认证失败（用户名或密码错误）
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// 无法连接到邮件服务器
    #[error("connection failed: {0}")]
    Connection(String),

    /// 服务器拒绝了请求
    #[error("protocol error: {0}")]
    Protocol(String),

    /// 其他错误
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl NotificationError {
    /// 展示给用户的提示信息
    pub fn user_message(&self) -> String {
        match self {
            Self::Authentication(_) => {
                "SMTP Authentication Error: Check your email and password.".to_string()
            }
            Self::Connection(_) => {
                "SMTP Connection Error: Unable to connect to the server.".to_string()
            }
            Self::Protocol(detail) => format!("SMTP Error: {detail}"),
            Self::Unknown(detail) => format!("Unexpected Error: {detail}"),
        }
    }
}

/// 报警最终送达的渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryChannel {
    /// 邮件发送给看护人
    Mail,
    /// 只写入本地日志
    Log,
}

/// 报警投递端口
///
/// `notify` 是阻塞调用，可能很慢或失败；异步调用方应通过
/// [`dispatcher`] 在阻塞线程池中执行。
pub trait Notifier: Send + Sync {
    /// 通知渠道名称，用于日志与状态展示
    fn name(&self) -> &str;

    /// 投递渠道，决定成功后给用户的提示
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Mail
    }

    /// 投递一条报警
    fn notify(&self, payload: &AlertPayload) -> Result<(), NotificationError>;
}

/// 仅写入日志的通知器，邮件关闭时使用
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Log
    }

    fn notify(&self, payload: &AlertPayload) -> Result<(), NotificationError> {
        tracing::warn!(subject = %payload.subject, "{}", payload.body);
        Ok(())
    }
}

/// 根据配置创建通知器
///
/// 邮件关闭时返回 [`LogNotifier`]。读取 keyring 可能弹出系统密码框，
/// 因此在阻塞线程中执行并设置超时。
pub async fn build_notifier(config: &MailConfig) -> Result<Arc<dyn Notifier>> {
    if !config.enabled {
        tracing::info!("邮件报警未启用，报警将只写入日志");
        return Ok(Arc::new(LogNotifier));
    }

    let sender = credentials::configured_sender(config)?.to_string();

    let mail_config = config.clone();
    let timeout_secs = config.keyring_timeout_secs;
    let password = match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        tokio::task::spawn_blocking(move || credentials::resolve_password(&mail_config, &sender)),
    )
    .await
    {
        Ok(Ok(Ok(password))) => password,
        Ok(Ok(Err(e))) => return Err(e.into()),
        Ok(Err(e)) => return Err(anyhow!("读取 SMTP 密码的任务失败: {}", e)),
        Err(_) => {
            return Err(anyhow!(
                "读取 SMTP 密码超时（{}秒）。如果系统要求输入密码，请增加 mail.keyring_timeout_secs 配置值",
                timeout_secs
            ))
        }
    };

    let notifier = SmtpNotifier::new(config, password)?;
    tracing::info!(
        "邮件报警已启用: {}:{} -> {}",
        config.smtp_host,
        config.smtp_port,
        notifier.receiver()
    );
    Ok(Arc::new(notifier))
}
