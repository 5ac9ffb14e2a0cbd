//! Data models for the scheme dashboard.
//!
//! This module contains the core data structures used throughout the
//! application: spreadsheet records, the filtered view over them, and the
//! aggregates rendered into the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel district selection meaning "no filter".
pub const ALL_DISTRICTS: &str = "All";

/// Risk classification of a scheme, derived from its utilisation percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Utilisation below 65%.
    #[serde(rename = "High Risk")]
    HighRisk,
    /// Utilisation from 65% up to (not including) 80%.
    #[serde(rename = "Medium Risk")]
    MediumRisk,
    /// Utilisation of 80% or more.
    #[serde(rename = "On Track")]
    OnTrack,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::HighRisk => write!(f, "High Risk"),
            RiskLevel::MediumRisk => write!(f, "Medium Risk"),
            RiskLevel::OnTrack => write!(f, "On Track"),
        }
    }
}

impl RiskLevel {
    /// Returns an emoji representation of the risk level.
    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::HighRisk => "🔴",
            RiskLevel::MediumRisk => "🟡",
            RiskLevel::OnTrack => "🟢",
        }
    }
}

/// How rows with missing or non-numeric metrics are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InvalidMetricPolicy {
    /// Reject the whole view, listing every invalid value.
    #[default]
    Fail,
    /// Drop offending rows from the aggregates and count them.
    Exclude,
}

impl fmt::Display for InvalidMetricPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidMetricPolicy::Fail => write!(f, "fail"),
            InvalidMetricPolicy::Exclude => write!(f, "exclude"),
        }
    }
}

/// A required column of the input sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Column {
    District,
    SchemeName,
    SchemeType,
    AllocatedBudget,
    UtilisedBudget,
    UtilisationPct,
    Status,
}

impl Column {
    /// Every required column, in canonical order.
    pub const ALL: [Column; 7] = [
        Column::District,
        Column::SchemeName,
        Column::SchemeType,
        Column::AllocatedBudget,
        Column::UtilisedBudget,
        Column::UtilisationPct,
        Column::Status,
    ];

    /// Canonical header name.
    pub fn header(&self) -> &'static str {
        match self {
            Column::District => "District",
            Column::SchemeName => "Scheme Name",
            Column::SchemeType => "Scheme Type",
            Column::AllocatedBudget => "Allocated Budget",
            Column::UtilisedBudget => "Utilised Budget",
            Column::UtilisationPct => "% Utilisation",
            Column::Status => "Status",
        }
    }

    /// Header spellings accepted in addition to the canonical one.
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::SchemeType => &["Scheme Type (Central/State)"],
            Column::AllocatedBudget => &["Allocated Budget (₹ Crores)", "Allocated Budget (Rs Crores)"],
            Column::UtilisedBudget => &["Utilised Budget (₹ Crores)", "Utilised Budget (Rs Crores)"],
            _ => &[],
        }
    }

    /// Whether a (trimmed) sheet header names this column.
    pub fn matches(&self, header: &str) -> bool {
        let header = header.trim();
        header == self.header() || self.aliases().contains(&header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// A numeric cell as read from the sheet.
///
/// Invalid text is kept verbatim so the row can still be shown and
/// reported exactly as it appeared in the upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metric {
    Value(f64),
    Invalid(String),
    Missing,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => write!(f, "{}", v),
            Metric::Invalid(raw) => write!(f, "{}", raw),
            Metric::Missing => Ok(()),
        }
    }
}

/// One row of the uploaded sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// 1-based row number in the worksheet.
    pub row: usize,
    pub district: Option<String>,
    pub scheme_name: String,
    pub scheme_type: String,
    pub allocated_budget: Metric,
    pub utilised_budget: Metric,
    pub utilisation_pct: Metric,
    pub status: String,
}

impl Record {
    /// Returns the metric stored under a numeric column.
    pub fn metric(&self, column: Column) -> Option<&Metric> {
        match column {
            Column::AllocatedBudget => Some(&self.allocated_budget),
            Column::UtilisedBudget => Some(&self.utilised_budget),
            Column::UtilisationPct => Some(&self.utilisation_pct),
            _ => None,
        }
    }

    /// District name, or an empty string for blank cells.
    pub fn district_label(&self) -> &str {
        self.district.as_deref().unwrap_or("")
    }
}

/// All records of one worksheet, in sheet order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    /// Name of the worksheet the records were read from.
    pub sheet: String,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(sheet: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            sheet: sheet.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read-only, order-preserving projection of a [`Dataset`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView<'a> {
    selection: String,
    records: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    pub fn new(selection: impl Into<String>, records: Vec<&'a Record>) -> Self {
        Self {
            selection: selection.into(),
            records,
        }
    }

    /// The district selection that produced this view.
    pub fn selection(&self) -> &str {
        &self.selection
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The four headline KPIs of a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    /// Sum of allocated budgets, rounded to 2 decimals.
    pub total_allocation: f64,
    /// Sum of utilised budgets, rounded to 2 decimals.
    pub total_utilisation: f64,
    /// Mean utilisation percentage; `None` when no rows were aggregated.
    pub mean_utilisation_pct: Option<f64>,
    /// Number of rows classified as high risk.
    pub high_risk_count: usize,
    /// Number of rows that contributed to the aggregates.
    pub rows: usize,
    /// Number of rows dropped for invalid metrics.
    pub excluded_rows: usize,
}

impl KpiSummary {
    /// Mean utilisation formatted for display, `N/A` when undefined.
    pub fn mean_display(&self) -> String {
        match self.mean_utilisation_pct {
            Some(mean) => format!("{:.2}", mean),
            None => "N/A".to_string(),
        }
    }
}

/// Utilisation of a single scheme, for the per-scheme bar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemeUtilisation {
    pub scheme_name: String,
    pub utilisation_pct: f64,
}

/// Share of rows carrying one status value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusShare {
    pub status: String,
    pub count: usize,
    /// Percentage of the view, rounded to 1 decimal.
    pub share_pct: f64,
}

/// Mean utilisation of one scheme type (Central, State, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemeTypeAverage {
    pub scheme_type: String,
    pub mean_utilisation_pct: f64,
    pub schemes: usize,
}

/// One line of the risk classification table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRow {
    pub district: String,
    pub scheme_name: String,
    pub scheme_type: String,
    pub utilisation_pct: f64,
    pub status: String,
    pub risk_level: RiskLevel,
}

/// An AI-drafted review note, shown verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewNote {
    pub model: String,
    pub instruction: String,
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

/// Metadata about the dashboard run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetadata {
    /// Input file the dataset was loaded from.
    pub source: String,
    pub sheet: String,
    /// District selection (`All` when unfiltered).
    pub district: String,
    pub generated_at: DateTime<Utc>,
    /// Rows in the whole dataset.
    pub total_rows: usize,
    /// Rows in the filtered view.
    pub view_rows: usize,
    pub invalid_policy: InvalidMetricPolicy,
}

/// Everything rendered for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    /// Leading rows of the view, for the data preview table.
    pub preview: Vec<Record>,
    pub kpis: KpiSummary,
    pub scheme_utilisation: Vec<SchemeUtilisation>,
    pub status_distribution: Vec<StatusShare>,
    pub scheme_type_comparison: Vec<SchemeTypeAverage>,
    pub risk_table: Vec<RiskRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_note: Option<ReviewNote>,
}

impl Dashboard {
    /// Attaches a drafted review note, replacing any earlier one.
    pub fn attach_review_note(&mut self, note: ReviewNote) {
        self.review_note = Some(note);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::HighRisk < RiskLevel::MediumRisk);
        assert!(RiskLevel::MediumRisk < RiskLevel::OnTrack);
    }

    #[test]
    fn test_risk_level_labels() {
        assert_eq!(RiskLevel::HighRisk.to_string(), "High Risk");
        assert_eq!(RiskLevel::MediumRisk.to_string(), "Medium Risk");
        assert_eq!(RiskLevel::OnTrack.to_string(), "On Track");
        assert_eq!(RiskLevel::HighRisk.emoji(), "🔴");
        assert_eq!(
            serde_json::to_string(&RiskLevel::OnTrack).unwrap(),
            "\"On Track\""
        );
    }

    #[test]
    fn test_column_matches_aliases() {
        assert!(Column::SchemeType.matches("Scheme Type (Central/State)"));
        assert!(Column::AllocatedBudget.matches(" Allocated Budget (₹ Crores) "));
        assert!(Column::UtilisationPct.matches("% Utilisation"));
        assert!(!Column::District.matches("district"));
    }

    #[test]
    fn test_metric_display_is_verbatim() {
        assert_eq!(Metric::Value(72.5).to_string(), "72.5");
        assert_eq!(Metric::Invalid("n/a".to_string()).to_string(), "n/a");
        assert_eq!(Metric::Missing.to_string(), "");
    }

    #[test]
    fn test_metric_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Metric::Value(10.0),
            Metric::Invalid("x".to_string()),
            Metric::Missing,
        ])
        .unwrap();
        assert_eq!(json, "[10.0,\"x\",null]");
    }

    #[test]
    fn test_kpi_mean_display() {
        let mut kpis = KpiSummary {
            total_allocation: 0.0,
            total_utilisation: 0.0,
            mean_utilisation_pct: None,
            high_risk_count: 0,
            rows: 0,
            excluded_rows: 0,
        };
        assert_eq!(kpis.mean_display(), "N/A");

        kpis.mean_utilisation_pct = Some(70.0);
        assert_eq!(kpis.mean_display(), "70.00");
    }
}
