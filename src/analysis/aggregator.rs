//! KPI aggregation and chart statistics.
//!
//! Every reduction here runs over a [`ValidatedView`], which is rebuilt from
//! the filtered view each time the selection changes. Risk levels live only
//! on the validated rows and are never stored back on a record.

use crate::analysis::classifier::{require_metric, risk_level};
use crate::error::{InvalidMetricError, MetricIssue};
use crate::models::{
    Column, FilteredView, InvalidMetricPolicy, KpiSummary, Record, RiskLevel, RiskRow,
    SchemeTypeAverage, SchemeUtilisation, StatusShare,
};
use tracing::{debug, warn};

/// A record whose metrics are all usable numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRow<'a> {
    pub record: &'a Record,
    pub allocated_budget: f64,
    pub utilised_budget: f64,
    pub utilisation_pct: f64,
    pub risk_level: RiskLevel,
}

/// The rows of a view that can be aggregated.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedView<'a> {
    pub rows: Vec<ValidatedRow<'a>>,
    /// Problems found in rows that were excluded.
    pub excluded: Vec<MetricIssue>,
    /// Number of rows excluded.
    pub excluded_rows: usize,
}

fn validate_row(record: &Record) -> Result<ValidatedRow<'_>, Vec<MetricIssue>> {
    let mut issues = Vec::new();
    let mut read = |column: Column| match require_metric(record, column) {
        Ok(v) => v,
        Err(issue) => {
            issues.push(issue);
            f64::NAN
        }
    };

    let allocated_budget = read(Column::AllocatedBudget);
    let utilised_budget = read(Column::UtilisedBudget);
    let utilisation_pct = read(Column::UtilisationPct);

    if !issues.is_empty() {
        return Err(issues);
    }

    let risk_level = risk_level(utilisation_pct).map_err(|e| e.issues)?;

    Ok(ValidatedRow {
        record,
        allocated_budget,
        utilised_budget,
        utilisation_pct,
        risk_level,
    })
}

/// Check every metric of the view in a single pass.
///
/// Under [`InvalidMetricPolicy::Fail`] any problem fails the whole view with
/// one error listing every offending value. Under
/// [`InvalidMetricPolicy::Exclude`] offending rows are dropped and counted.
pub fn validate_view<'a>(
    view: &FilteredView<'a>,
    policy: InvalidMetricPolicy,
) -> Result<ValidatedView<'a>, InvalidMetricError> {
    let mut rows = Vec::with_capacity(view.len());
    let mut excluded = Vec::new();
    let mut excluded_rows = 0;

    for record in view.iter() {
        match validate_row(record) {
            Ok(row) => rows.push(row),
            Err(issues) => {
                excluded_rows += 1;
                excluded.extend(issues);
            }
        }
    }

    if excluded_rows > 0 {
        match policy {
            InvalidMetricPolicy::Fail => return Err(InvalidMetricError::new(excluded)),
            InvalidMetricPolicy::Exclude => {
                for issue in &excluded {
                    warn!("Excluding {}", issue);
                }
            }
        }
    }

    debug!(
        "Validated {} rows ({} excluded)",
        rows.len(),
        excluded_rows
    );

    Ok(ValidatedView {
        rows,
        excluded,
        excluded_rows,
    })
}

/// Round to 2 decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Compute the four headline KPIs.
pub fn kpi_summary(view: &ValidatedView<'_>) -> KpiSummary {
    let total_allocation: f64 = view.rows.iter().map(|r| r.allocated_budget).sum();
    let total_utilisation: f64 = view.rows.iter().map(|r| r.utilised_budget).sum();

    KpiSummary {
        total_allocation: round2(total_allocation),
        total_utilisation: round2(total_utilisation),
        mean_utilisation_pct: mean(view.rows.iter().map(|r| r.utilisation_pct)).map(round2),
        high_risk_count: view
            .rows
            .iter()
            .filter(|r| r.risk_level == RiskLevel::HighRisk)
            .count(),
        rows: view.rows.len(),
        excluded_rows: view.excluded_rows,
    }
}

/// Mean utilisation per scheme type, in order of first occurrence.
pub fn utilisation_by_scheme_type(view: &ValidatedView<'_>) -> Vec<SchemeTypeAverage> {
    let mut groups: Vec<(String, f64, usize)> = Vec::new();

    for row in &view.rows {
        let key = &row.record.scheme_type;
        match groups.iter_mut().find(|(k, _, _)| k == key) {
            Some((_, sum, count)) => {
                *sum += row.utilisation_pct;
                *count += 1;
            }
            None => groups.push((key.clone(), row.utilisation_pct, 1)),
        }
    }

    groups
        .into_iter()
        .map(|(scheme_type, sum, count)| SchemeTypeAverage {
            scheme_type,
            mean_utilisation_pct: round2(sum / count as f64),
            schemes: count,
        })
        .collect()
}

/// Utilisation of each scheme, in row order.
pub fn utilisation_by_scheme(view: &ValidatedView<'_>) -> Vec<SchemeUtilisation> {
    view.rows
        .iter()
        .map(|r| SchemeUtilisation {
            scheme_name: r.record.scheme_name.clone(),
            utilisation_pct: r.utilisation_pct,
        })
        .collect()
}

/// Count of records per status, most frequent first.
///
/// Status needs no metric, so every record of the filtered view counts.
/// Ties keep the order of first occurrence.
pub fn status_distribution(view: &FilteredView<'_>) -> Vec<StatusShare> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for record in view.iter() {
        match counts.iter_mut().find(|(s, _)| *s == record.status) {
            Some((_, count)) => *count += 1,
            None => counts.push((record.status.clone(), 1)),
        }
    }

    // Stable sort keeps first-occurrence order among equal counts.
    counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));

    let total = view.len();
    counts
        .into_iter()
        .map(|(status, count)| StatusShare {
            status,
            count,
            share_pct: (count as f64 / total as f64 * 1000.0).round() / 10.0,
        })
        .collect()
}

/// Rows of the risk classification table.
pub fn risk_table(view: &ValidatedView<'_>) -> Vec<RiskRow> {
    view.rows
        .iter()
        .map(|r| RiskRow {
            district: r.record.district_label().to_string(),
            scheme_name: r.record.scheme_name.clone(),
            scheme_type: r.record.scheme_type.clone(),
            utilisation_pct: r.utilisation_pct,
            status: r.record.status.clone(),
            risk_level: r.risk_level,
        })
        .collect()
}

/// Count risk table rows per level, ordered from high risk to on track.
pub fn risk_counts(table: &[RiskRow]) -> Vec<(RiskLevel, usize)> {
    [RiskLevel::HighRisk, RiskLevel::MediumRisk, RiskLevel::OnTrack]
        .into_iter()
        .map(|level| {
            let count = table.iter().filter(|r| r.risk_level == level).count();
            (level, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricProblem;
    use crate::models::Metric;

    fn record(row: usize, scheme_type: &str, allocated: f64, utilisation: f64, status: &str) -> Record {
        Record {
            row,
            district: Some("Pune".to_string()),
            scheme_name: format!("Scheme {}", row),
            scheme_type: scheme_type.to_string(),
            allocated_budget: Metric::Value(allocated),
            utilised_budget: Metric::Value(allocated * utilisation / 100.0),
            utilisation_pct: Metric::Value(utilisation),
            status: status.to_string(),
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record(2, "Central", 10.0, 50.0, "Ongoing"),
            record(3, "State", 20.0, 70.0, "Completed"),
            record(4, "Central", 30.0, 90.0, "Ongoing"),
        ]
    }

    fn view(records: &[Record]) -> FilteredView<'_> {
        FilteredView::new("All", records.iter().collect())
    }

    #[test]
    fn test_kpi_summary() {
        let records = sample();
        let validated = validate_view(&view(&records), InvalidMetricPolicy::Fail).unwrap();
        let kpis = kpi_summary(&validated);

        assert_eq!(kpis.total_allocation, 60.0);
        assert_eq!(kpis.total_utilisation, 5.0 + 14.0 + 27.0);
        assert_eq!(kpis.mean_utilisation_pct, Some(70.0));
        assert_eq!(kpis.high_risk_count, 1);
        assert_eq!(kpis.rows, 3);
        assert_eq!(kpis.excluded_rows, 0);
    }

    #[test]
    fn test_totals_are_rounded() {
        let records = vec![
            record(2, "State", 0.105, 70.0, "Ongoing"),
            record(3, "State", 0.111, 70.0, "Ongoing"),
        ];
        let validated = validate_view(&view(&records), InvalidMetricPolicy::Fail).unwrap();
        assert_eq!(kpi_summary(&validated).total_allocation, 0.22);
    }

    #[test]
    fn test_empty_view_mean_is_undefined() {
        let records: Vec<Record> = Vec::new();
        let validated = validate_view(&view(&records), InvalidMetricPolicy::Fail).unwrap();
        let kpis = kpi_summary(&validated);

        assert_eq!(kpis.mean_utilisation_pct, None);
        assert_eq!(kpis.mean_display(), "N/A");
        assert_eq!(kpis.total_allocation, 0.0);
        assert_eq!(kpis.high_risk_count, 0);
        assert!(status_distribution(&view(&records)).is_empty());
    }

    #[test]
    fn test_invalid_metrics_fail_as_batch() {
        let mut records = sample();
        records[0].utilisation_pct = Metric::Missing;
        records[2].allocated_budget = Metric::Invalid("TBD".to_string());

        let err = validate_view(&view(&records), InvalidMetricPolicy::Fail).unwrap_err();

        assert_eq!(err.issues.len(), 2);
        assert_eq!(err.issues[0].row, Some(2));
        assert_eq!(err.issues[0].problem, MetricProblem::Missing);
        assert_eq!(err.issues[1].row, Some(4));
        assert_eq!(err.issues[1].column, Column::AllocatedBudget);
    }

    #[test]
    fn test_invalid_metrics_excluded_and_counted() {
        let mut records = sample();
        records[0].utilisation_pct = Metric::Invalid("n/a".to_string());

        let validated = validate_view(&view(&records), InvalidMetricPolicy::Exclude).unwrap();
        let kpis = kpi_summary(&validated);

        assert_eq!(kpis.rows, 2);
        assert_eq!(kpis.excluded_rows, 1);
        assert_eq!(kpis.total_allocation, 50.0);
        assert_eq!(kpis.mean_utilisation_pct, Some(80.0));
        assert_eq!(kpis.high_risk_count, 0);
    }

    #[test]
    fn test_utilisation_by_scheme_type_first_occurrence_order() {
        let records = sample();
        let validated = validate_view(&view(&records), InvalidMetricPolicy::Fail).unwrap();
        let groups = utilisation_by_scheme_type(&validated);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].scheme_type, "Central");
        assert_eq!(groups[0].mean_utilisation_pct, 70.0);
        assert_eq!(groups[0].schemes, 2);
        assert_eq!(groups[1].scheme_type, "State");
        assert_eq!(groups[1].mean_utilisation_pct, 70.0);
    }

    #[test]
    fn test_status_distribution() {
        let records = sample();
        let shares = status_distribution(&view(&records));

        assert_eq!(shares[0].status, "Ongoing");
        assert_eq!(shares[0].count, 2);
        assert_eq!(shares[0].share_pct, 66.7);
        assert_eq!(shares[1].status, "Completed");
        assert_eq!(shares[1].share_pct, 33.3);
    }

    #[test]
    fn test_risk_table_and_counts() {
        let records = sample();
        let validated = validate_view(&view(&records), InvalidMetricPolicy::Fail).unwrap();

        let table = risk_table(&validated);
        let levels: Vec<RiskLevel> = table.iter().map(|r| r.risk_level).collect();
        assert_eq!(
            levels,
            vec![RiskLevel::HighRisk, RiskLevel::MediumRisk, RiskLevel::OnTrack]
        );
        assert_eq!(table[0].district, "Pune");

        let counts = risk_counts(&table);
        assert_eq!(counts[0], (RiskLevel::HighRisk, 1));
        assert_eq!(counts[2], (RiskLevel::OnTrack, 1));
    }

    #[test]
    fn test_utilisation_by_scheme_keeps_row_order() {
        let records = sample();
        let validated = validate_view(&view(&records), InvalidMetricPolicy::Fail).unwrap();
        let bars = utilisation_by_scheme(&validated);

        let names: Vec<&str> = bars.iter().map(|b| b.scheme_name.as_str()).collect();
        assert_eq!(names, vec!["Scheme 2", "Scheme 3", "Scheme 4"]);
    }
}
