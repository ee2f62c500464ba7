//! 测试辅助工具
//!
//! 提供可记录调用的通知器和展示层，便于在没有邮件服务器和界面的情况下测试会话

use crate::health::{AlertPayload, AnalysisResult};
use crate::notify::{NotificationError, Notifier};
use crate::presenter::Presenter;
use parking_lot::Mutex;

/// 记录所有投递请求的通知器
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<AlertPayload>>,
    calls: Mutex<usize>,
    failure: Option<NotificationError>,
}

impl RecordingNotifier {
    /// 创建总是成功的通知器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置每次投递都返回指定错误
    pub fn fail_with(mut self, error: NotificationError) -> Self {
        self.failure = Some(error);
        self
    }

    /// 被调用的次数（包括失败的调用）
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    /// 成功投递的报警
    pub fn sent(&self) -> Vec<AlertPayload> {
        self.sent.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    fn notify(&self, payload: &AlertPayload) -> Result<(), NotificationError> {
        *self.calls.lock() += 1;
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.sent.lock().push(payload.clone());
        Ok(())
    }
}

/// 展示层记录的事件
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterEvent {
    Analysis(AnalysisResult),
    Cleared,
    Info { title: String, message: String },
    Error { title: String, message: String },
}

/// 记录所有展示事件的展示层
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub events: Vec<PresenterEvent>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有提示信息的文本
    pub fn infos(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresenterEvent::Info { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// 所有错误信息的文本
    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresenterEvent::Error { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// 最后一次显示的分析结果
    pub fn last_analysis(&self) -> Option<&AnalysisResult> {
        self.events.iter().rev().find_map(|event| match event {
            PresenterEvent::Analysis(analysis) => Some(analysis),
            _ => None,
        })
    }
}

impl Presenter for RecordingPresenter {
    fn show_analysis(&mut self, analysis: &AnalysisResult) {
        self.events.push(PresenterEvent::Analysis(analysis.clone()));
    }

    fn clear_analysis(&mut self) {
        self.events.push(PresenterEvent::Cleared);
    }

    fn info(&mut self, title: &str, message: &str) {
        self.events.push(PresenterEvent::Info {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn error(&mut self, title: &str, message: &str) {
        self.events.push(PresenterEvent::Error {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
