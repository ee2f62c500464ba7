pub mod analysis;
pub mod input;
pub mod readings;

pub use analysis::{AlertOutcome, AlertPayload, AnalysisReporter, AnalysisResult, DEFAULT_ALERT_SUBJECT};
pub use input::parse_readings;
pub use readings::{ReadingStore, Thresholds, DEFAULT_ALERT_THRESHOLD, LOWER_THRESHOLD};
