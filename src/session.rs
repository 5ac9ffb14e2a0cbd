//! Per-run dashboard state.
//!
//! A [`Session`] owns the uploaded dataset and the current district
//! selection. Every derived value is recomputed from it on demand.

use crate::analysis::{self, DistrictFilter};
use crate::error::DashboardError;
use crate::models::{
    Dashboard, DashboardMetadata, Dataset, FilteredView, InvalidMetricPolicy, ReviewNote,
};
use crate::review::{ReviewNoteRequester, ReviewRequest};
use chrono::Utc;
use std::future::Future;
use tracing::{debug, info};

/// Dataset and selection for a single user's run.
#[derive(Debug, Clone)]
pub struct Session {
    dataset: Dataset,
    filter: DistrictFilter,
    policy: InvalidMetricPolicy,
}

impl Session {
    pub fn new(dataset: Dataset, filter: DistrictFilter, policy: InvalidMetricPolicy) -> Self {
        Self {
            dataset,
            filter,
            policy,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filter(&self) -> &DistrictFilter {
        &self.filter
    }

    /// Change the district selection.
    pub fn select(&mut self, filter: DistrictFilter) {
        debug!("District selection changed to {}", filter);
        self.filter = filter;
    }

    /// Districts the user can choose from, `"All"` first.
    pub fn district_options(&self) -> Vec<String> {
        analysis::district_options(&self.dataset)
    }

    /// Whether the current selection names a district present in the data.
    pub fn selection_is_known(&self) -> bool {
        match &self.filter {
            DistrictFilter::All => true,
            DistrictFilter::District(d) => self
                .dataset
                .records
                .iter()
                .any(|r| r.district.as_deref() == Some(d.as_str())),
        }
    }

    /// The records visible under the current selection.
    pub fn view(&self) -> FilteredView<'_> {
        analysis::apply_filter(&self.dataset, &self.filter)
    }

    /// Compute everything the dashboard shows for the current selection.
    ///
    /// The data preview covers the whole upload, before filtering; every
    /// other section follows the selection.
    pub fn dashboard(
        &self,
        source: &str,
        preview_rows: usize,
    ) -> Result<Dashboard, DashboardError> {
        let view = self.view();
        let validated = analysis::validate_view(&view, self.policy)?;
        let kpis = analysis::kpi_summary(&validated);

        info!(
            "Computed dashboard for {}: {} rows, {} high risk",
            view.selection(),
            kpis.rows,
            kpis.high_risk_count
        );

        Ok(Dashboard {
            metadata: DashboardMetadata {
                source: source.to_string(),
                sheet: self.dataset.sheet.clone(),
                district: view.selection().to_string(),
                generated_at: Utc::now(),
                total_rows: self.dataset.len(),
                view_rows: view.len(),
                invalid_policy: self.policy,
            },
            preview: self
                .dataset
                .records
                .iter()
                .take(preview_rows)
                .cloned()
                .collect(),
            scheme_utilisation: analysis::utilisation_by_scheme(&validated),
            status_distribution: analysis::status_distribution(&view),
            scheme_type_comparison: analysis::utilisation_by_scheme_type(&validated),
            risk_table: analysis::risk_table(&validated),
            kpis,
            review_note: None,
        })
    }

    /// Build the review-note request for the current selection.
    pub fn review_request(&self, instruction: Option<&str>) -> ReviewRequest {
        ReviewRequest::new(&self.view(), instruction)
    }

    /// Draft a review note for the current selection.
    ///
    /// The call is abandoned when `cancel` completes first. Nothing in the
    /// session changes, whatever the outcome.
    pub async fn review_note<C>(
        &self,
        requester: &ReviewNoteRequester,
        instruction: Option<&str>,
        cancel: C,
    ) -> Result<ReviewNote, DashboardError>
    where
        C: Future<Output = ()>,
    {
        let request = self.review_request(instruction);
        let text = requester.request_cancellable(&request, cancel).await?;

        Ok(ReviewNote {
            model: requester.config().model_name.clone(),
            instruction: request.instruction,
            text,
            generated_at: Utc::now(),
        })
    }
}
