//! SMTP 凭据管理
//!
//! 密码不出现在源码或配置文件中：优先读取环境变量，其次读取系统 keyring。

use crate::config::MailConfig;
use crate::error::ConfigurationError;
use anyhow::{anyhow, Result};
use keyring::Entry;

/// keyring 服务名称
pub const KEYRING_SERVICE: &str = "temperature-monitor";

/// 存放 SMTP 密码的环境变量
pub const PASSWORD_ENV: &str = "TEMP_MONITOR_SMTP_PASSWORD";

/// 配置中的发件人地址，即 keyring 用户名
pub fn configured_sender(config: &MailConfig) -> Result<&str, ConfigurationError> {
    config
        .sender
        .as_deref()
        .filter(|sender| !sender.trim().is_empty())
        .ok_or(ConfigurationError::MissingMailSetting("mail.sender"))
}

/// 解析 SMTP 密码
pub fn resolve_password(config: &MailConfig, sender: &str) -> Result<String, ConfigurationError> {
    resolve_password_with(config, sender, |name| std::env::var(name).ok(), load_from_keyring)
}

/// 使用指定的环境变量和 keyring 读取函数解析密码
pub fn resolve_password_with<E, K>(
    config: &MailConfig,
    sender: &str,
    env: E,
    keyring: K,
) -> Result<String, ConfigurationError>
where
    E: Fn(&str) -> Option<String>,
    K: Fn(&str) -> Result<String>,
{
    if config.allow_env_password {
        if let Some(password) = env(PASSWORD_ENV).filter(|p| !p.is_empty()) {
            tracing::info!("从环境变量加载 SMTP 密码");
            return Ok(password);
        }
    }

    if config.use_keyring {
        return keyring(sender).map_err(|e| ConfigurationError::MissingCredentials(e.to_string()));
    }

    Err(ConfigurationError::MissingCredentials(format!(
        "set {PASSWORD_ENV} or enable mail.use_keyring"
    )))
}

/// 从系统 keyring 读取发件人的 SMTP 密码
pub fn load_from_keyring(sender: &str) -> Result<String> {
    let entry =
        Entry::new(KEYRING_SERVICE, sender).map_err(|e| anyhow!("无法访问系统密钥服务: {}", e))?;

    let password = entry
        .get_password()
        .map_err(|e| anyhow!("无法从系统密钥服务加载 SMTP 密码: {}", e))?;

    tracing::info!("从系统 keyring 加载 SMTP 密码");
    Ok(password)
}

/// 保存 SMTP 密码到系统 keyring
pub fn save_to_keyring(sender: &str, password: &str) -> Result<()> {
    let entry =
        Entry::new(KEYRING_SERVICE, sender).map_err(|e| anyhow!("无法访问系统密钥服务: {}", e))?;

    entry
        .set_password(password)
        .map_err(|e| anyhow!("无法保存 SMTP 密码到系统密钥服务: {}", e))?;

    tracing::info!("SMTP 密码已保存到系统 keyring");
    Ok(())
}

/// 删除 keyring 中保存的 SMTP 密码
pub fn delete_from_keyring(sender: &str) -> Result<()> {
    let entry =
        Entry::new(KEYRING_SERVICE, sender).map_err(|e| anyhow!("无法访问系统密钥服务: {}", e))?;

    entry
        .delete_password()
        .map_err(|e| anyhow!("无法从系统密钥服务删除 SMTP 密码: {}", e))?;

    tracing::info!("已从系统 keyring 删除 SMTP 密码");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_keyring(_: &str) -> Result<String> {
        Err(anyhow!("no entry"))
    }

    #[test]
    fn test_configured_sender() {
        let mut config = MailConfig::default();
        assert_eq!(
            configured_sender(&config),
            Err(ConfigurationError::MissingMailSetting("mail.sender"))
        );

        config.sender = Some("  ".to_string());
        assert!(configured_sender(&config).is_err());

        config.sender = Some("nurse@example.com".to_string());
        assert_eq!(configured_sender(&config), Ok("nurse@example.com"));
    }

    #[test]
    fn test_env_password_wins() {
        let config = MailConfig::default();
        let password = resolve_password_with(
            &config,
            "nurse@example.com",
            |name| (name == PASSWORD_ENV).then(|| "from-env".to_string()),
            |_| Ok("from-keyring".to_string()),
        )
        .unwrap();
        assert_eq!(password, "from-env");
    }

    #[test]
    fn test_keyring_used_for_sender() {
        let config = MailConfig::default();
        let password = resolve_password_with(
            &config,
            "nurse@example.com",
            |_| None,
            |user| Ok(format!("secret-for-{user}")),
        )
        .unwrap();
        assert_eq!(password, "secret-for-nurse@example.com");
    }

    #[test]
    fn test_env_ignored_when_disallowed() {
        let config = MailConfig {
            allow_env_password: false,
            use_keyring: false,
            ..MailConfig::default()
        };
        let result = resolve_password_with(
            &config,
            "nurse@example.com",
            |_| Some("from-env".to_string()),
            no_keyring,
        );
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_keyring_failure_reported() {
        let config = MailConfig::default();
        let err = resolve_password_with(&config, "nurse@example.com", |_| None, no_keyring)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingCredentials("no entry".to_string())
        );
    }
}
