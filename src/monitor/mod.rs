//! 监测会话模块
//!
//! 一个会话独占一个读数存储，负责"添加读数"和"清空读数"两个动作

pub mod interactive;

pub use interactive::run_interactive;

use crate::config::Config;
use crate::error::InputParseError;
use crate::health::{parse_readings, AlertOutcome, AnalysisReporter, AnalysisResult, ReadingStore};
use crate::notify::{
    build_notifier, create_dispatcher, DispatcherHandle, NotificationError, NotificationWorker, Notifier,
    PendingDelivery,
};
use crate::presenter::Presenter;
use anyhow::Result;
use std::sync::Arc;

/// 一次提交的结果
#[derive(Debug)]
pub struct Submission {
    /// 提交后的分析结果
    pub analysis: AnalysisResult,
    /// 存在异常读数时的报警投递
    pub pending: Option<PendingDelivery>,
}

pub struct MonitorSession {
    /// 读数存储
    store: ReadingStore,
    /// 分析与报警格式化
    reporter: AnalysisReporter,
    /// 通知调度器句柄
    dispatcher: DispatcherHandle,
}

impl MonitorSession {
    pub fn new(store: ReadingStore, reporter: AnalysisReporter, dispatcher: DispatcherHandle) -> Self {
        Self {
            store,
            reporter,
            dispatcher,
        }
    }

    /// 按配置创建会话和通知工作者
    ///
    /// 调用方负责运行返回的 [`NotificationWorker`]。
    pub async fn from_config(config: &Config) -> Result<(Self, NotificationWorker)> {
        tracing::info!("正在初始化监测会话...");

        let store = ReadingStore::new(config.monitor.alert_threshold)?;
        let reporter = AnalysisReporter::new(config.mail.subject.clone());
        let notifier = build_notifier(&config.mail).await?;
        let (dispatcher, worker) = create_dispatcher(notifier, config.mail.queue_size);

        tracing::info!(
            "监测会话已就绪，安全范围: [{}, {}] °C",
            store.thresholds().lower(),
            store.thresholds().alert()
        );
        Ok((Self::new(store, reporter, dispatcher), worker))
    }

    /// 解析并添加一批读数，必要时提交报警
    ///
    /// 输入非法时整批拒绝，存储保持不变。
    pub async fn submit(&mut self, input: &str) -> Result<Submission, InputParseError> {
        let values = match parse_readings(input) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("拒绝非法输入: {}", e);
                return Err(e);
            }
        };

        tracing::debug!("添加 {} 个读数", values.len());
        self.store.add_readings(values);

        let analysis = self.analysis();
        let pending = match self.reporter.alert_payload(&analysis, self.store.readings()) {
            Some(payload) => {
                tracing::info!("发现 {} 个异常读数，提交报警", analysis.outliers.len());
                Some(self.dispatcher.request(payload).await)
            }
            None => None,
        };

        Ok(Submission { analysis, pending })
    }

    /// 当前存储的分析结果
    pub fn analysis(&self) -> AnalysisResult {
        self.reporter.analyze(&self.store)
    }

    /// 清空读数，保留阈值
    pub fn clear(&mut self) {
        tracing::debug!("清空 {} 个读数", self.store.len());
        self.store.clear();
    }

    pub fn readings(&self) -> &[f64] {
        self.store.readings()
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }
}

/// 一次性分析一批读数
///
/// 不经过调度器：报警在阻塞线程中通过 [`AnalysisReporter::maybe_alert`]
/// 同步投递，结果交给展示层后返回。
pub async fn analyze_batch<P: Presenter>(
    config: &Config,
    notifier: Arc<dyn Notifier>,
    input: &str,
    presenter: &mut P,
) -> Result<AnalysisResult> {
    let mut store = ReadingStore::new(config.monitor.alert_threshold)?;
    let reporter = AnalysisReporter::new(config.mail.subject.clone());

    let values = match parse_readings(input) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("拒绝非法输入: {}", e);
            presenter.error("Error", interactive::INVALID_INPUT);
            return Err(e.into());
        }
    };
    store.add_readings(values);

    let analysis = reporter.analyze(&store);
    presenter.show_analysis(&analysis);

    let result = analysis.clone();
    let readings = store.readings().to_vec();
    let outcome = tokio::task::spawn_blocking(move || {
        reporter.maybe_alert(&result, &readings, notifier.as_ref())
    })
    .await
    .unwrap_or_else(|e| {
        tracing::error!("报警投递任务失败: {}", e);
        AlertOutcome::Failed(NotificationError::Unknown(e.to_string()))
    });
    interactive::report_alert_outcome(outcome, presenter);

    Ok(analysis)
}
