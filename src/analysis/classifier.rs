//! Risk classification.
//!
//! A scheme's risk level depends on its utilisation percentage alone.

use crate::error::{InvalidMetricError, MetricIssue, MetricProblem};
use crate::models::{Column, Metric, Record, RiskLevel};

/// Utilisation below this is high risk.
pub const HIGH_RISK_BELOW: f64 = 65.0;

/// Utilisation at or above this is on track.
pub const ON_TRACK_FROM: f64 = 80.0;

/// Classify a utilisation percentage.
///
/// Values are not clamped: negatives are high risk and anything above 100
/// is on track. Only NaN is rejected.
pub fn risk_level(utilisation: f64) -> Result<RiskLevel, InvalidMetricError> {
    if utilisation.is_nan() {
        return Err(MetricIssue {
            row: None,
            column: Column::UtilisationPct,
            problem: MetricProblem::NotANumber,
        }
        .into());
    }

    Ok(if utilisation < HIGH_RISK_BELOW {
        RiskLevel::HighRisk
    } else if utilisation < ON_TRACK_FROM {
        RiskLevel::MediumRisk
    } else {
        RiskLevel::OnTrack
    })
}

/// Read a numeric value out of a record, reporting where it was invalid.
pub fn require_metric(record: &Record, column: Column) -> Result<f64, MetricIssue> {
    let problem = match record.metric(column) {
        Some(Metric::Value(v)) if !v.is_nan() => return Ok(*v),
        Some(Metric::Value(_)) => MetricProblem::NotANumber,
        Some(Metric::Invalid(raw)) => MetricProblem::NonNumeric(raw.clone()),
        Some(Metric::Missing) | None => MetricProblem::Missing,
    };

    Err(MetricIssue {
        row: Some(record.row),
        column,
        problem,
    })
}

/// Classify a record by its `% Utilisation` cell.
pub fn classify_record(record: &Record) -> Result<RiskLevel, InvalidMetricError> {
    let utilisation = require_metric(record, Column::UtilisationPct)?;
    risk_level(utilisation)
}
