//! 通知调度器
//!
//! 把阻塞的邮件发送与交互循环解耦，分为两部分：
//! - DispatcherHandle: 可克隆的发送端，提交投递请求
//! - NotificationWorker: 独占的接收端，在阻塞线程池中调用通知器

use super::{DeliveryChannel, NotificationError, Notifier};
use crate::health::AlertPayload;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// 一次投递的结果
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationStatus {
    /// 投递成功
    Delivered {
        notifier: String,
        channel: DeliveryChannel,
        delivered_at: DateTime<Utc>,
    },
    /// 投递失败（不会自动重试）
    Failed(NotificationError),
}

impl NotificationStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// 投递请求
struct NotificationRequest {
    payload: AlertPayload,
    reply: oneshot::Sender<NotificationStatus>,
}

/// 等待中的投递，可在任意时刻 await 结果
#[derive(Debug)]
pub struct PendingDelivery {
    receiver: oneshot::Receiver<NotificationStatus>,
}

impl PendingDelivery {
    /// 等待投递结果
    pub async fn wait(self) -> NotificationStatus {
        self.receiver.await.unwrap_or_else(|_| {
            NotificationStatus::Failed(NotificationError::Unknown(
                "notification worker stopped before replying".to_string(),
            ))
        })
    }
}

/// 调度器句柄 - 可克隆，用于提交投递请求
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<NotificationRequest>,
}

/// 通知工作者 - 独占接收端，顺序处理投递请求
pub struct NotificationWorker {
    receiver: mpsc::Receiver<NotificationRequest>,
    notifier: Arc<dyn Notifier>,
}

/// 创建通知调度系统
pub fn create_dispatcher(
    notifier: Arc<dyn Notifier>,
    buffer_size: usize,
) -> (DispatcherHandle, NotificationWorker) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (
        DispatcherHandle { sender },
        NotificationWorker { receiver, notifier },
    )
}

impl DispatcherHandle {
    /// 提交投递请求，立即返回
    pub async fn request(&self, payload: AlertPayload) -> PendingDelivery {
        let (reply, receiver) = oneshot::channel();
        let request = NotificationRequest { payload, reply };
        if let Err(mpsc::error::SendError(request)) = self.sender.send(request).await {
            tracing::error!("通知工作者已停止，无法投递报警");
            let _ = request.reply.send(NotificationStatus::Failed(NotificationError::Unknown(
                "notification worker is not running".to_string(),
            )));
        }
        PendingDelivery { receiver }
    }

    /// 提交投递请求并等待结果
    pub async fn deliver(&self, payload: AlertPayload) -> NotificationStatus {
        self.request(payload).await.wait().await
    }
}

impl NotificationWorker {
    pub fn notifier_name(&self) -> &str {
        self.notifier.name()
    }

    /// 处理请求直到所有句柄被丢弃
    pub async fn run(mut self) {
        tracing::debug!("通知工作者已启动: {}", self.notifier.name());

        while let Some(request) = self.receiver.recv().await {
            let status = self.dispatch(request.payload).await;
            if request.reply.send(status).is_err() {
                tracing::debug!("投递结果无人等待，已丢弃");
            }
        }

        tracing::debug!("通知工作者已停止");
    }

    async fn dispatch(&self, payload: AlertPayload) -> NotificationStatus {
        let notifier = self.notifier.clone();
        let name = notifier.name().to_string();
        let channel = notifier.channel();

        tracing::info!(notifier = %name, subject = %payload.subject, "正在投递报警");
        let result = tokio::task::spawn_blocking(move || notifier.notify(&payload)).await;

        match result {
            Ok(Ok(())) => {
                let delivered_at = Utc::now();
                tracing::info!(
                    notifier = %name,
                    delivered_at = %delivered_at.to_rfc3339(),
                    "报警投递成功"
                );
                NotificationStatus::Delivered {
                    notifier: name,
                    channel,
                    delivered_at,
                }
            }
            Ok(Err(e)) => {
                tracing::error!(notifier = %name, error = %e, "报警投递失败");
                NotificationStatus::Failed(e)
            }
            Err(e) => {
                tracing::error!(notifier = %name, "报警投递任务失败: {}", e);
                NotificationStatus::Failed(NotificationError::Unknown(e.to_string()))
            }
        }
    }
}
