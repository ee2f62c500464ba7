use super::readings::ReadingStore;
use crate::notify::{DeliveryChannel, NotificationError, Notifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject line used when none is configured
pub const DEFAULT_ALERT_SUBJECT: &str = "Temperature Alert!";

/// Snapshot of a store's statistics at analysis time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub average: f64,
    pub outliers: Vec<f64>,
    pub total_readings: usize,
}

impl AnalysisResult {
    pub fn has_outliers(&self) -> bool {
        !self.outliers.is_empty()
    }
}

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total readings: {}", self.total_readings)?;
        writeln!(f, "Average temperature: {:.2}", self.average)?;
        write!(f, "Outliers: {:?}", self.outliers)
    }
}

/// Ready-to-send alert: subject line and plain-text body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub subject: String,
    pub body: String,
}

/// What happened to an alert handed to a notifier
#[derive(Debug)]
pub enum AlertOutcome {
    /// No outliers, nothing was sent
    NotRequired,
    Delivered(DeliveryChannel),
    Failed(NotificationError),
}

/// Turns store content into analyses and alert messages
#[derive(Debug, Clone)]
pub struct AnalysisReporter {
    subject: String,
}

impl Default for AnalysisReporter {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_SUBJECT)
    }
}

impl AnalysisReporter {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Compute average, outliers and count from the current store content
    pub fn analyze(&self, store: &ReadingStore) -> AnalysisResult {
        AnalysisResult {
            average: store.average(),
            outliers: store.outliers(),
            total_readings: store.len(),
        }
    }

    /// Format the alert body sent to the caregiver
    pub fn build_alert_message(&self, result: &AnalysisResult, all_readings: &[f64]) -> String {
        format!(
            "Abnormal temperature readings detected: {:?}\n\
             Average temperature: {:.2}\n\
             All readings: {:?}",
            result.outliers, result.average, all_readings
        )
    }

    /// Alert to send for this analysis, if any
    ///
    /// An alert is due exactly when the analysis found outliers.
    pub fn alert_payload(&self, result: &AnalysisResult, all_readings: &[f64]) -> Option<AlertPayload> {
        if !result.has_outliers() {
            return None;
        }
        Some(AlertPayload {
            subject: self.subject.clone(),
            body: self.build_alert_message(result, all_readings),
        })
    }

    /// Hand the alert to `notifier` when the analysis found outliers
    ///
    /// Synchronous entry point: the call blocks for as long as the notifier
    /// does. One-shot callers run it on a blocking thread; long-lived
    /// sessions queue the payload through the dispatcher instead.
    pub fn maybe_alert(
        &self,
        result: &AnalysisResult,
        all_readings: &[f64],
        notifier: &dyn Notifier,
    ) -> AlertOutcome {
        let Some(payload) = self.alert_payload(result, all_readings) else {
            return AlertOutcome::NotRequired;
        };

        tracing::info!(
            outliers = result.outliers.len(),
            notifier = notifier.name(),
            "abnormal readings found, sending alert"
        );
        match notifier.notify(&payload) {
            Ok(()) => AlertOutcome::Delivered(notifier.channel()),
            Err(e) => {
                tracing::warn!(error = %e, "alert delivery failed");
                AlertOutcome::Failed(e)
            }
        }
    }
}
