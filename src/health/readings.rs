use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Default upper bound of the safe range, in °C
pub const DEFAULT_ALERT_THRESHOLD: f64 = 37.5;

/// Fixed lower bound of the safe range, in °C
pub const LOWER_THRESHOLD: f64 = 35.0;

/// Safe range for body temperature readings
///
/// A reading is an outlier when it lies strictly above `alert` or strictly
/// below `lower`. Both bounds themselves are inside the safe range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct Thresholds {
    alert: f64,
    lower: f64,
}

/// Unchecked wire form of [`Thresholds`]
#[derive(Deserialize)]
struct RawThresholds {
    alert: f64,
    lower: f64,
}

impl TryFrom<RawThresholds> for Thresholds {
    type Error = ConfigurationError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Self::with_lower(raw.alert, raw.lower)
    }
}

impl Thresholds {
    /// Build thresholds with the fixed lower bound
    pub fn new(alert: f64) -> Result<Self, ConfigurationError> {
        Self::with_lower(alert, LOWER_THRESHOLD)
    }

    /// Build thresholds with an explicit lower bound
    pub fn with_lower(alert: f64, lower: f64) -> Result<Self, ConfigurationError> {
        if !alert.is_finite() || !lower.is_finite() || lower >= alert {
            return Err(ConfigurationError::InvalidThresholds { lower, alert });
        }
        Ok(Self { alert, lower })
    }

    pub fn alert(&self) -> f64 {
        self.alert
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Whether a reading falls outside the safe range
    pub fn is_outlier(&self, value: f64) -> bool {
        value > self.alert || value < self.lower
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            alert: DEFAULT_ALERT_THRESHOLD,
            lower: LOWER_THRESHOLD,
        }
    }
}

/// In-memory, insertion-ordered store of temperature readings for one session
#[derive(Debug, Clone, Default)]
pub struct ReadingStore {
    readings: Vec<f64>,
    thresholds: Thresholds,
}

impl ReadingStore {
    /// Create an empty store with the given alert threshold
    pub fn new(alert_threshold: f64) -> Result<Self, ConfigurationError> {
        Ok(Self::with_thresholds(Thresholds::new(alert_threshold)?))
    }

    pub fn with_thresholds(thresholds: Thresholds) -> Self {
        Self {
            readings: Vec::new(),
            thresholds,
        }
    }

    /// Append a batch of readings, keeping their order
    pub fn add_readings<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        self.readings.extend(values);
    }

    /// Remove all readings; thresholds are kept
    pub fn clear(&mut self) {
        self.readings.clear();
    }

    /// Arithmetic mean of all readings, 0 when the store is empty
    pub fn average(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        self.readings.iter().sum::<f64>() / self.readings.len() as f64
    }

    /// Readings outside the safe range, in insertion order
    pub fn outliers(&self) -> Vec<f64> {
        self.readings
            .iter()
            .copied()
            .filter(|&value| self.thresholds.is_outlier(value))
            .collect()
    }

    pub fn readings(&self) -> &[f64] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn alert_threshold(&self) -> f64 {
        self.thresholds.alert
    }
}
