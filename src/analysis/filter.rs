//! District filtering.

use crate::models::{Dataset, FilteredView, Record, ALL_DISTRICTS};
use std::collections::BTreeSet;
use std::fmt;

/// The district selection applied to a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DistrictFilter {
    /// Pass every record through.
    #[default]
    All,
    /// Keep records whose district matches exactly (case-sensitive).
    District(String),
}

impl DistrictFilter {
    /// Build a filter from a user selection; `None` and `"All"` select everything.
    pub fn from_selection(selection: Option<&str>) -> Self {
        match selection {
            None => DistrictFilter::All,
            Some(s) if s == ALL_DISTRICTS => DistrictFilter::All,
            Some(s) => DistrictFilter::District(s.to_string()),
        }
    }

    /// Whether a record passes the filter.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            DistrictFilter::All => true,
            DistrictFilter::District(d) => record.district.as_deref() == Some(d.as_str()),
        }
    }
}

impl fmt::Display for DistrictFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistrictFilter::All => write!(f, "{}", ALL_DISTRICTS),
            DistrictFilter::District(d) => write!(f, "{}", d),
        }
    }
}

/// Project the dataset onto the records selected by `filter`, in sheet order.
pub fn apply_filter<'a>(dataset: &'a Dataset, filter: &DistrictFilter) -> FilteredView<'a> {
    let records = dataset
        .records
        .iter()
        .filter(|r| filter.matches(r))
        .collect();

    FilteredView::new(filter.to_string(), records)
}

/// Selectable districts: `"All"` followed by the sorted distinct districts.
pub fn district_options(dataset: &Dataset) -> Vec<String> {
    let districts: BTreeSet<&str> = dataset
        .records
        .iter()
        .filter_map(|r| r.district.as_deref())
        .collect();

    std::iter::once(ALL_DISTRICTS)
        .chain(districts)
        .map(String::from)
        .collect()
}
