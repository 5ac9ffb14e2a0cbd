//! Analysis modules.
//!
//! Filtering, risk classification and aggregation over a loaded dataset.

pub mod aggregator;
pub mod classifier;
pub mod filter;

pub use aggregator::*;
pub use classifier::classify_record;
pub use filter::{apply_filter, district_options, DistrictFilter};
