//! Already-fetched environmental signals for one location and time window.

use chrono::{DateTime, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One observation. Any signal may be absent for a given timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EnvSample {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ndvi: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    /// Daily precipitation total in millimetres.
    #[serde(default)]
    pub precipitation_mm: Option<f64>,
}

impl EnvSample {
    #[must_use]
    pub const fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ndvi: None,
            temperature_c: None,
            precipitation_mm: None,
        }
    }
}

/// Static soil and terrain context used for DIC export and permanence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SiteContext {
    #[serde(default)]
    pub soil_ph: Option<f64>,
    #[serde(default)]
    pub clay_pct: Option<f64>,
    #[serde(default)]
    pub slope_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EnvironmentalSnapshot {
    #[serde(default)]
    pub samples: Vec<EnvSample>,
    #[serde(default)]
    pub site: SiteContext,
    /// Provider label, e.g. `open-meteo` or `fixture`.
    #[serde(default)]
    pub source: String,
}

impl EnvironmentalSnapshot {
    /// A snapshot with no samples, used when the provider is unavailable.
    #[must_use]
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            samples: Vec::new(),
            site: SiteContext::default(),
            source: source.into(),
        }
    }

    /// Samples sorted by timestamp. Ties keep their relative order.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.samples.sort_by_key(|s| s.timestamp);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Restrict to samples that [`AnalysisWindow::covers_sample`] accepts.
    #[must_use]
    pub fn within(mut self, window: &AnalysisWindow) -> Self {
        self.samples.retain(|s| window.covers_sample(s.timestamp));
        self
    }
}

/// Closed analysis interval `[start, end]` in UTC.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalysisWindow {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Whether a sample stamped `ts` belongs to the window. A midnight stamp
    /// is a daily value for that whole UTC day, so it counts from the start
    /// date even when the window opens later that day.
    #[must_use]
    pub fn covers_sample(&self, ts: DateTime<Utc>) -> bool {
        if ts.time() == NaiveTime::MIN {
            ts.date_naive() >= self.start.date_naive() && ts <= self.end
        } else {
            self.contains(ts)
        }
    }

    /// Length in fractional days. Negative when `end` precedes `start`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn days(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 86_400.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn normalized_sorts_by_timestamp() {
        let snap = EnvironmentalSnapshot {
            samples: vec![EnvSample::empty(ts(3)), EnvSample::empty(ts(1)), EnvSample::empty(ts(2))],
            ..EnvironmentalSnapshot::default()
        }
        .normalized();
        let days: Vec<_> = snap.samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(days, vec![ts(1), ts(2), ts(3)]);
    }

    #[test]
    fn within_drops_samples_outside_window() {
        let window = AnalysisWindow::new(ts(2), ts(4));
        let snap = EnvironmentalSnapshot {
            samples: (1..=5).map(|d| EnvSample::empty(ts(d))).collect(),
            ..EnvironmentalSnapshot::default()
        }
        .within(&window);
        assert_eq!(snap.samples.len(), 3);
    }

    #[test]
    fn daily_sample_on_the_start_date_is_kept() {
        let window = AnalysisWindow::new(
            ts(2) + chrono::Duration::hours(9),
            ts(4) + chrono::Duration::hours(9),
        );
        let snap = EnvironmentalSnapshot {
            samples: (1..=5).map(|d| EnvSample::empty(ts(d))).collect(),
            ..EnvironmentalSnapshot::default()
        }
        .within(&window);
        let days: Vec<_> = snap.samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(days, vec![ts(2), ts(3), ts(4)]);
    }

    #[test]
    fn sub_daily_samples_use_exact_bounds() {
        let window = AnalysisWindow::new(ts(2) + chrono::Duration::hours(9), ts(4));
        assert!(!window.covers_sample(ts(2) + chrono::Duration::hours(6)));
        assert!(window.covers_sample(ts(2) + chrono::Duration::hours(9)));
        assert!(!window.covers_sample(ts(1)));
    }

    #[test]
    fn window_days_fractional() {
        let window = AnalysisWindow::new(ts(1), ts(1) + chrono::Duration::hours(36));
        assert!((window.days() - 1.5).abs() < 1e-12);
        let reversed = AnalysisWindow::new(ts(2), ts(1));
        assert!(reversed.days() < 0.0);
    }

    #[test]
    fn missing_signals_deserialize_as_none() {
        let json = r#"{"timestamp":"2025-03-01T00:00:00Z","temperature_c":21.5}"#;
        let sample: EnvSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.temperature_c, Some(21.5));
        assert!(sample.ndvi.is_none());
        assert!(sample.precipitation_mm.is_none());
    }
}
