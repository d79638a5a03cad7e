// ============================================================
// Layer 6 - Statistics Reporter
// ============================================================
// Accumulates the scalar statistics a model step returns
// (loss, monitor, ...) between two log boundaries.
//
//   update_data → append every scalar of a record
//   Display     → "name: mean" per metric, sorted by name
//   get_value   → mean of one metric (drives LR decay)
//   clear       → forget everything since the last boundary

use std::collections::BTreeMap;
use std::fmt;

use crate::error::DaRecogError;

/// One step's worth of named scalar statistics.
pub type StatRecord = BTreeMap<String, f64>;

/// Build a `StatRecord` from `(name, value)` pairs.
pub fn stat_record<const N: usize>(pairs: [(&str, f64); N]) -> StatRecord {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

#[derive(Debug, Default, Clone)]
pub struct StatisticsReporter {
    statistics: BTreeMap<String, Vec<f64>>,
}

impl StatisticsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_data(&mut self, record: &StatRecord) {
        for (name, value) in record {
            self.statistics.entry(name.clone()).or_default().push(*value);
        }
    }

    /// Mean of every value recorded for `name` since the last clear.
    pub fn get_value(&self, name: &str) -> Result<f64, DaRecogError> {
        match self.statistics.get(name) {
            Some(values) if !values.is_empty() => Ok(mean(values)),
            _ => Err(DaRecogError::MissingStatistic(name.to_string())),
        }
    }

    pub fn clear(&mut self) {
        self.statistics.clear();
    }
}

impl fmt::Display for StatisticsReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .statistics
            .iter()
            .map(|(name, values)| format!("{}: {}", name, significant(mean(values), 5)))
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Format with `digits` significant digits, trailing zeros trimmed.
fn significant(value: f64, digits: usize) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    if !(-5..16).contains(&magnitude) {
        return format!("{:.*e}", digits.saturating_sub(1), value);
    }
    let decimals = (digits as i32 - 1 - magnitude).max(0) as usize;
    let s = format!("{value:.decimals$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_updates() {
        let mut reporter = StatisticsReporter::new();
        reporter.update_data(&stat_record([("loss", 2.0)]));
        reporter.update_data(&stat_record([("loss", 4.0)]));
        assert_eq!(reporter.get_value("loss").unwrap(), 3.0);
    }

    #[test]
    fn test_clear_empties_accumulators() {
        let mut reporter = StatisticsReporter::new();
        reporter.update_data(&stat_record([("loss", 2.0), ("monitor", 2.0)]));
        reporter.clear();
        assert_eq!(reporter.to_string(), "");
        assert_eq!(
            reporter.get_value("loss"),
            Err(DaRecogError::MissingStatistic("loss".to_string()))
        );
    }

    #[test]
    fn test_unknown_metric_fails() {
        let reporter = StatisticsReporter::new();
        assert!(reporter.get_value("monitor").is_err());
    }

    #[test]
    fn test_display_sorted_means() {
        let mut reporter = StatisticsReporter::new();
        reporter.update_data(&stat_record([("monitor", 1.5), ("loss", 1.0)]));
        reporter.update_data(&stat_record([("monitor", 2.5), ("loss", 2.0)]));
        assert_eq!(reporter.to_string(), "loss: 1.5, monitor: 2");
    }

    #[test]
    fn test_display_does_not_clear() {
        let mut reporter = StatisticsReporter::new();
        reporter.update_data(&stat_record([("loss", 0.123456789)]));
        assert_eq!(reporter.to_string(), "loss: 0.12346");
        assert!(reporter.get_value("loss").is_ok());
    }

    #[test]
    fn test_nan_propagates() {
        let mut reporter = StatisticsReporter::new();
        reporter.update_data(&stat_record([("loss", f64::NAN)]));
        reporter.update_data(&stat_record([("loss", 1.0)]));
        assert!(reporter.get_value("loss").unwrap().is_nan());
    }
}
