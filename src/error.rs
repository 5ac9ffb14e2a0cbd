//! Error types.
//!
//! Each failure class of the dashboard has its own type so callers can
//! report it precisely; [`DashboardError`] unifies them for the pipeline.

use crate::models::Column;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The API key was not configured.
#[derive(Debug, Error)]
#[error("API key not found: set the {env_var} environment variable or add it to a .env file")]
pub struct MissingCredentialError {
    pub env_var: String,
}

/// The uploaded file could not be read as a workbook.
#[derive(Debug, Error)]
pub enum MalformedInputError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a valid .xlsx workbook: {0}")]
    Parse(#[from] calamine::XlsxError),

    #[error("workbook contains no worksheets")]
    NoWorksheets,

    #[error("worksheet '{name}' not found (available: {})", .available.join(", "))]
    SheetNotFound { name: String, available: Vec<String> },

    #[error("worksheet '{0}' has no header row")]
    EmptySheet(String),
}

/// The header row lacks required columns.
#[derive(Debug, Error)]
#[error(
    "worksheet '{sheet}' is missing required column(s): {} (found: {})",
    join_columns(.missing),
    .found.join(", ")
)]
pub struct SchemaError {
    pub sheet: String,
    pub missing: Vec<Column>,
    pub found: Vec<String>,
}

fn join_columns(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.header())
        .collect::<Vec<_>>()
        .join(", ")
}

/// What is wrong with a metric cell.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricProblem {
    Missing,
    NonNumeric(String),
    NotANumber,
}

impl fmt::Display for MetricProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricProblem::Missing => write!(f, "missing value"),
            MetricProblem::NonNumeric(raw) => write!(f, "non-numeric value '{}'", raw),
            MetricProblem::NotANumber => write!(f, "value is NaN"),
        }
    }
}

/// A single invalid metric value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricIssue {
    /// Worksheet row, when the value came from a record.
    pub row: Option<usize>,
    pub column: Column,
    pub problem: MetricProblem,
}

impl fmt::Display for MetricIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "row {}, {}: {}", row, self.column, self.problem),
            None => write!(f, "{}: {}", self.column, self.problem),
        }
    }
}

/// One or more metric values could not be used for classification or
/// aggregation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} invalid metric value(s): {}", .issues.len(), join_issues(.issues))]
pub struct InvalidMetricError {
    pub issues: Vec<MetricIssue>,
}

impl InvalidMetricError {
    pub fn new(issues: Vec<MetricIssue>) -> Self {
        Self { issues }
    }
}

impl From<MetricIssue> for InvalidMetricError {
    fn from(issue: MetricIssue) -> Self {
        Self::new(vec![issue])
    }
}

fn join_issues(issues: &[MetricIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The text-generation service call failed.
#[derive(Debug, Error)]
pub enum ReviewServiceError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to review service at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to send request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("review service error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse review service response: {0}")]
    MalformedResponse(#[source] reqwest::Error),

    #[error("review service returned no text")]
    EmptyResponse,

    #[error("request cancelled")]
    Cancelled,
}

/// Any error raised by the dashboard pipeline.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    MissingCredential(#[from] MissingCredentialError),

    #[error(transparent)]
    MalformedInput(#[from] MalformedInputError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    InvalidMetric(#[from] InvalidMetricError),

    #[error(transparent)]
    ReviewService(#[from] ReviewServiceError),
}
