//! 配置系统模块
//!
//! 统一处理 TOML 配置文件、环境变量、命令行参数

use crate::error::ConfigurationError;
use crate::health::{Thresholds, DEFAULT_ALERT_SUBJECT, DEFAULT_ALERT_THRESHOLD};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use config::{Config as ConfigBuilder, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

const APP_NAME: &str = "temperature-monitor";

/// 命令行参数
#[derive(Parser, Debug, Clone)]
#[command(name = "temperature-monitor")]
#[command(about = "体温监测工具 - 统计体温读数并在异常时通知看护人")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(short, long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// 报警阈值（°C）
    #[arg(short, long)]
    pub alert_threshold: Option<f64>,

    /// 关闭邮件报警，只写日志
    #[arg(long)]
    pub no_mail: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 支持的命令
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 交互式录入读数（默认）
    Run,
    /// 分析一批读数后退出
    Analyze {
        /// 逗号分隔的读数，例如 "36.5, 38.1, 37.0"
        #[arg(short, long)]
        readings: String,
        /// 不发送报警
        #[arg(long)]
        no_notify: bool,
    },
    /// 显示当前生效的配置
    ShowConfig,
    /// 重置配置
    ResetConfig,
    /// 从标准输入读取 SMTP 密码并保存到系统 keyring
    SetPassword,
    /// 删除系统 keyring 中保存的 SMTP 密码
    ClearPassword,
    /// 生成 shell 自动补全脚本
    Completions {
        /// 目标 shell
        shell: clap_complete::Shell,
    },
}

/// 日志级别
#[derive(clap::ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// 监测配置
    pub monitor: MonitorConfig,
    /// 邮件报警配置
    pub mail: MailConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 监测配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 报警阈值（°C），高于该值的读数视为异常
    pub alert_threshold: f64,
}

/// 邮件报警配置
///
/// SMTP 密码不在配置中，见 [`crate::notify::credentials`]。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// 是否启用邮件报警
    pub enabled: bool,
    /// SMTP 服务器
    pub smtp_host: String,
    /// SMTP 端口（STARTTLS）
    pub smtp_port: u16,
    /// 发件人地址，同时作为 SMTP 用户名
    pub sender: Option<String>,
    /// 收件人地址
    pub receiver: Option<String>,
    /// 邮件主题
    pub subject: String,
    /// SMTP 超时（秒）
    pub timeout_secs: u64,
    /// 待投递报警队列长度
    pub queue_size: usize,
    /// 是否从系统 keyring 读取密码
    pub use_keyring: bool,
    /// keyring 访问超时时间（秒）
    pub keyring_timeout_secs: u64,
    /// 是否允许从环境变量读取密码
    pub allow_env_password: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 日志格式
    pub format: LogFormat,
    /// 日志输出目录
    pub directory: Option<PathBuf>,
}

/// 日志格式
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 简洁格式
    Compact,
    /// 详细格式
    Full,
    /// JSON 格式
    Json,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: None,
            receiver: None,
            subject: DEFAULT_ALERT_SUBJECT.to_string(),
            timeout_secs: 30,
            queue_size: 16,
            use_keyring: true,
            keyring_timeout_secs: 30, // 30秒超时，给用户足够时间输入密码
            allow_env_password: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            directory: None,
        }
    }
}

impl Config {
    /// 使用指定的 CLI 参数从多种配置源加载配置
    pub fn load_with_cli(cli: Cli) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // 1. 首先加载默认配置
        builder = builder.add_source(config::Config::try_from(&Config::default())?);

        // 2. 加载系统配置文件
        if let Some(system_config) = Self::get_system_config_path() {
            if system_config.exists() {
                builder = builder.add_source(File::from(system_config));
            }
        }

        // 3. 加载用户配置文件
        if let Some(user_config) = Self::get_user_config_path() {
            if user_config.exists() {
                builder = builder.add_source(File::from(user_config));
            }
        }

        // 4. 加载指定的配置文件
        if let Some(config_path) = cli.config {
            if config_path.exists() {
                builder = builder.add_source(File::from(config_path));
            } else {
                return Err(anyhow!("配置文件不存在: {}", config_path.display()));
            }
        }

        // 5. 加载环境变量（前缀 TEMP_MONITOR_）
        builder = builder.add_source(
            Environment::with_prefix("TEMP_MONITOR")
                .prefix_separator("_")
                .separator("__"),
        );

        // 6. 构建配置
        let mut config: Config = builder.build()?.try_deserialize()?;

        // 7. 应用命令行参数覆盖
        if let Some(log_level) = cli.log_level {
            config.logging.level = log_level;
        }

        if let Some(alert_threshold) = cli.alert_threshold {
            config.monitor.alert_threshold = alert_threshold;
        }

        if cli.no_mail {
            config.mail.enabled = false;
        }

        // 8. 验证配置
        config.validate()?;

        Ok(config)
    }

    /// 获取系统配置文件路径
    pub fn get_system_config_path() -> Option<PathBuf> {
        Some(PathBuf::from("/etc/temperature-monitor/config.toml"))
    }

    /// 获取用户配置文件路径
    pub fn get_user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// 生成默认配置文件
    pub fn generate_default_config() -> Result<String> {
        Config::default().to_toml()
    }

    /// 序列化为 TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| anyhow!("序列化配置失败: {}", e))
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        // 验证报警阈值
        Thresholds::new(self.monitor.alert_threshold)?;

        // 启用邮件时必须有收发件人
        if self.mail.enabled {
            let is_missing = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());
            if is_missing(&self.mail.sender) {
                return Err(ConfigurationError::MissingMailSetting("mail.sender").into());
            }
            if is_missing(&self.mail.receiver) {
                return Err(ConfigurationError::MissingMailSetting("mail.receiver").into());
            }
            if self.mail.smtp_host.is_empty() {
                return Err(ConfigurationError::MissingMailSetting("mail.smtp_host").into());
            }
        }

        if self.mail.queue_size == 0 {
            return Err(anyhow!("mail.queue_size 不能为 0"));
        }

        // 验证日志目录
        if let Some(log_dir) = &self.logging.directory {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir)?;
            }
        }

        Ok(())
    }

    /// 初始化日志系统
    ///
    /// 控制台日志写到 stderr；配置了日志目录时另外按天轮转写入文件。
    /// 返回的 guard 必须在程序运行期间保持存活，否则文件日志会丢失。
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let level_filter = EnvFilter::builder()
            .with_default_directive(Level::from(self.logging.level.clone()).into())
            .from_env_lossy();

        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
        let console = fmt::layer().with_writer(std::io::stderr);
        layers.push(match self.logging.format {
            LogFormat::Compact => console.compact().boxed(),
            LogFormat::Full => console.boxed(),
            LogFormat::Json => console.json().boxed(),
        });

        let mut guard = None;
        if let Some(log_dir) = &self.logging.directory {
            std::fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "temperature-monitor.log");
            let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);
            layers.push(match self.logging.format {
                LogFormat::Json => file_layer.json().boxed(),
                _ => file_layer.boxed(),
            });
            guard = Some(worker_guard);
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(level_filter)
            .try_init()
            .map_err(|e| anyhow!("初始化日志系统失败: {}", e))?;

        tracing::info!("日志系统已初始化，级别: {:?}", self.logging.level);
        Ok(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with(args: &[&str]) -> Cli {
        let mut argv = vec!["temperature-monitor"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.monitor.alert_threshold, 37.5);
        assert!(!config.mail.enabled);
        assert_eq!(config.mail.smtp_host, "smtp.gmail.com");
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(config.mail.subject, "Temperature Alert!");
        assert!(matches!(config.logging.level, LogLevel::Warn));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = Config::generate_default_config().unwrap();
        assert!(toml_str.contains("[monitor]"));
        assert!(toml_str.contains("[mail]"));
        assert!(toml_str.contains("[logging]"));

        // 密码不写入配置文件，只保留读取方式的开关
        let table: toml::Table = toml::from_str(&toml_str).unwrap();
        let mail = table["mail"].as_table().unwrap();
        assert!(!mail.contains_key("password"));
        assert!(!mail.contains_key("smtp_password"));
        assert!(mail.contains_key("allow_env_password"));
    }

    #[test]
    fn test_config_file_loading() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let test_config = r#"
[monitor]
alert_threshold = 38.0

[mail]
enabled = true
sender = "monitor@example.com"
receiver = "caregiver@example.com"
smtp_port = 2525

[logging]
level = "debug"
format = "json"
        "#;
        std::fs::write(&config_path, test_config).unwrap();

        let cli = cli_with(&["--config", config_path.to_str().unwrap()]);
        let config = Config::load_with_cli(cli).unwrap();
        assert_eq!(config.monitor.alert_threshold, 38.0);
        assert!(config.mail.enabled);
        assert_eq!(config.mail.sender.as_deref(), Some("monitor@example.com"));
        assert_eq!(config.mail.receiver.as_deref(), Some("caregiver@example.com"));
        assert_eq!(config.mail.smtp_port, 2525);
        assert_eq!(config.mail.smtp_host, "smtp.gmail.com");
        assert!(matches!(config.logging.level, LogLevel::Debug));
        assert!(matches!(config.logging.format, LogFormat::Json));
    }

    #[test]
    fn test_cli_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "[mail]\nenabled = true\nsender = \"a@example.com\"\nreceiver = \"b@example.com\"\n",
        )
        .unwrap();

        let cli = cli_with(&[
            "--config",
            config_path.to_str().unwrap(),
            "--alert-threshold",
            "38.2",
            "--no-mail",
            "--log-level",
            "trace",
        ]);
        let config = Config::load_with_cli(cli).unwrap();
        assert_eq!(config.monitor.alert_threshold, 38.2);
        assert!(!config.mail.enabled);
        assert!(matches!(config.logging.level, LogLevel::Trace));
    }

    #[test]
    fn test_password_commands() {
        assert!(matches!(
            cli_with(&["set-password"]).command,
            Some(Commands::SetPassword)
        ));
        assert!(matches!(
            cli_with(&["clear-password"]).command,
            Some(Commands::ClearPassword)
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = cli_with(&["--config", "/nonexistent/temperature-monitor.toml"]);
        assert!(Config::load_with_cli(cli).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_threshold() {
        let mut config = Config::default();
        config.monitor.alert_threshold = 34.0;
        let err = config.validate().unwrap_err();
        assert!(err.downcast_ref::<ConfigurationError>().is_some());
    }

    #[test]
    fn test_validation_requires_mail_addresses() {
        let mut config = Config::default();
        config.mail.enabled = true;
        config.mail.sender = Some("monitor@example.com".to_string());
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigurationError>(),
            Some(&ConfigurationError::MissingMailSetting("mail.receiver"))
        );

        config.mail.receiver = Some("caregiver@example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        Config::default().save_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&content).unwrap();
        assert_eq!(loaded.monitor.alert_threshold, 37.5);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(LogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(LogLevel::Info), Level::INFO);
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
    }
}
