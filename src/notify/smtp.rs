//! SMTP 邮件通知器
//!
//! 通过 STARTTLS 中继发送纯文本报警邮件。

use super::{NotificationError, Notifier};
use crate::config::MailConfig;
use crate::error::ConfigurationError;
use crate::health::AlertPayload;
use anyhow::{anyhow, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;

/// 需要认证或认证失败的 SMTP 响应码
const AUTH_FAILURE_CODES: [u16; 3] = [530, 534, 535];

/// 服务不可用，服务器正在关闭连接
const SERVICE_UNAVAILABLE: u16 = 421;

pub struct SmtpNotifier {
    transport: SmtpTransport,
    sender: Mailbox,
    receiver: Mailbox,
}

impl SmtpNotifier {
    /// 根据邮件配置和密码创建通知器
    pub fn new(config: &MailConfig, password: String) -> Result<Self> {
        let sender = parse_mailbox("mail.sender", config.sender.as_deref())?;
        let receiver = parse_mailbox("mail.receiver", config.receiver.as_deref())?;

        let transport = SmtpTransport::starttls_relay(&config.smtp_host)
            .map_err(|e| anyhow!("无法创建 SMTP 传输 {}: {}", config.smtp_host, e))?
            .port(config.smtp_port)
            .credentials(Credentials::new(sender.email.to_string(), password))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            transport,
            sender,
            receiver,
        })
    }

    pub fn receiver(&self) -> &Mailbox {
        &self.receiver
    }

    fn build_message(&self, payload: &AlertPayload) -> Result<Message, NotificationError> {
        Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(payload.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(payload.body.clone())
            .map_err(|e| NotificationError::Unknown(e.to_string()))
    }
}

impl Notifier for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    fn notify(&self, payload: &AlertPayload) -> Result<(), NotificationError> {
        let message = self.build_message(payload)?;
        let response = self.transport.send(&message).map_err(|e| classify(&e))?;
        tracing::debug!(code = %response.code(), "SMTP 服务器已接收报警邮件");
        Ok(())
    }
}

fn parse_mailbox(field: &'static str, value: Option<&str>) -> Result<Mailbox, ConfigurationError> {
    let value = value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigurationError::MissingMailSetting(field))?;
    value
        .parse()
        .map_err(|_| ConfigurationError::InvalidMailbox {
            field,
            value: value.to_string(),
        })
}

fn classify(err: &lettre::transport::smtp::Error) -> NotificationError {
    classify_failure(
        err.status().map(u16::from),
        err.is_timeout() || err.is_tls(),
        err.is_client(),
        err.to_string(),
    )
}

/// 按 SMTP 响应码和错误类别归类投递失败
///
/// 没有响应码的失败发生在拿到服务器答复之前，视为连接失败；
/// 客户端自身的错误（如不支持的认证机制）视为协议错误。
pub(crate) fn classify_failure(
    code: Option<u16>,
    transport_failure: bool,
    client_error: bool,
    detail: String,
) -> NotificationError {
    match code {
        Some(code) if AUTH_FAILURE_CODES.contains(&code) => NotificationError::Authentication(detail),
        Some(SERVICE_UNAVAILABLE) => NotificationError::Connection(detail),
        Some(_) => NotificationError::Protocol(detail),
        None if transport_failure => NotificationError::Connection(detail),
        None if client_error => NotificationError::Protocol(detail),
        None => NotificationError::Connection(detail),
    }
}
