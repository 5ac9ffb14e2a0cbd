//! Dashboard report generation.
//!
//! This module renders a [`Dashboard`] as a Markdown document or as JSON.

use crate::config::ReportConfig;
use crate::models::{
    Dashboard, DashboardMetadata, KpiSummary, Record, ReviewNote, RiskRow, SchemeTypeAverage,
    SchemeUtilisation, StatusShare,
};
use crate::report::charts::{bar_chart, format_amount};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PreviewRow {
    #[tabled(rename = "Row")]
    row: usize,
    #[tabled(rename = "District")]
    district: String,
    #[tabled(rename = "Scheme Name")]
    scheme_name: String,
    #[tabled(rename = "Scheme Type")]
    scheme_type: String,
    #[tabled(rename = "Allocated")]
    allocated_budget: String,
    #[tabled(rename = "Utilised")]
    utilised_budget: String,
    #[tabled(rename = "% Utilisation")]
    utilisation_pct: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Record> for PreviewRow {
    fn from(r: &Record) -> Self {
        Self {
            row: r.row,
            district: r.district_label().to_string(),
            scheme_name: r.scheme_name.clone(),
            scheme_type: r.scheme_type.clone(),
            allocated_budget: r.allocated_budget.to_string(),
            utilised_budget: r.utilised_budget.to_string(),
            utilisation_pct: r.utilisation_pct.to_string(),
            status: r.status.clone(),
        }
    }
}

#[derive(Tabled)]
struct RiskTableRow {
    #[tabled(rename = "District")]
    district: String,
    #[tabled(rename = "Scheme Name")]
    scheme_name: String,
    #[tabled(rename = "Scheme Type")]
    scheme_type: String,
    #[tabled(rename = "% Utilisation")]
    utilisation_pct: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Risk Level")]
    risk_level: String,
}

impl From<&RiskRow> for RiskTableRow {
    fn from(r: &RiskRow) -> Self {
        Self {
            district: r.district.clone(),
            scheme_name: r.scheme_name.clone(),
            scheme_type: r.scheme_type.clone(),
            utilisation_pct: format!("{:.2}", r.utilisation_pct),
            status: r.status.clone(),
            risk_level: format!("{} {}", r.risk_level.emoji(), r.risk_level),
        }
    }
}

/// Generate the complete Markdown dashboard.
pub fn generate_markdown_report(dashboard: &Dashboard, config: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# 🏛️ Government Scheme Intelligence Dashboard\n\n");
    output.push_str(
        "*Rule-based analytics with AI-assisted review notes. All decisions remain with officers.*\n\n",
    );

    output.push_str(&generate_metadata_section(&dashboard.metadata));
    output.push_str(&generate_kpi_section(&dashboard.kpis, &config.currency_label));
    output.push_str(&generate_preview_section(
        &dashboard.preview,
        dashboard.metadata.total_rows,
    ));
    output.push_str(&generate_scheme_chart_section(
        &dashboard.scheme_utilisation,
        config.bar_width,
    ));
    output.push_str(&generate_status_section(
        &dashboard.status_distribution,
        config.bar_width,
    ));
    output.push_str(&generate_comparison_section(
        &dashboard.scheme_type_comparison,
        config.bar_width,
    ));
    output.push_str(&generate_risk_section(&dashboard.risk_table));

    if let Some(ref note) = dashboard.review_note {
        output.push_str(&generate_review_section(note));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!("- **Worksheet:** {}\n", metadata.sheet));
    section.push_str(&format!("- **District:** {}\n", metadata.district));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Rows:** {} of {}\n",
        metadata.view_rows, metadata.total_rows
    ));
    section.push_str(&format!(
        "- **Invalid metrics:** {}\n",
        metadata.invalid_policy
    ));
    section.push('\n');

    section
}

/// Generate the KPI section.
fn generate_kpi_section(kpis: &KpiSummary, currency: &str) -> String {
    let mut section = String::new();

    section.push_str("## 📌 Key Performance Indicators\n\n");
    section.push_str(&format!(
        "| Total Allocation ({0}) | Total Utilisation ({0}) | Average Utilisation (%) | High Risk Schemes |\n",
        currency
    ));
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        format_amount(kpis.total_allocation, 2),
        format_amount(kpis.total_utilisation, 2),
        kpis.mean_display(),
        kpis.high_risk_count
    ));

    if kpis.excluded_rows > 0 {
        section.push_str(&format!(
            "> ⚠️ {} row(s) with missing or non-numeric values were excluded from these figures.\n\n",
            kpis.excluded_rows
        ));
    }

    section
}

/// Generate the data preview section. The preview is of the whole upload.
fn generate_preview_section(preview: &[Record], total_rows: usize) -> String {
    let mut section = String::new();

    section.push_str("## 📄 Data Preview\n\n");

    if preview.is_empty() {
        section.push_str("The worksheet has no data rows.\n\n");
        return section;
    }

    let rows: Vec<PreviewRow> = preview.iter().map(PreviewRow::from).collect();
    section.push_str(&Table::new(rows).with(Style::markdown()).to_string());
    section.push_str("\n\n");

    if total_rows > preview.len() {
        section.push_str(&format!(
            "*Showing {} of {} rows.*\n\n",
            preview.len(),
            total_rows
        ));
    }

    section
}

/// Generate the per-scheme utilisation chart.
fn generate_scheme_chart_section(schemes: &[SchemeUtilisation], width: usize) -> String {
    if schemes.is_empty() {
        return String::new();
    }

    let items: Vec<(String, f64)> = schemes
        .iter()
        .map(|s| (s.scheme_name.clone(), s.utilisation_pct))
        .collect();

    let mut section = String::new();
    section.push_str("## 📊 Utilisation (%) by Scheme\n\n");
    section.push_str("```text\n");
    section.push_str(&bar_chart(&items, width, "%"));
    section.push_str("```\n\n");

    section
}

/// Generate the status distribution section.
fn generate_status_section(shares: &[StatusShare], width: usize) -> String {
    if shares.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Scheme Status Distribution\n\n");
    section.push_str("| Status | Schemes | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for share in shares {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            share.status, share.count, share.share_pct
        ));
    }
    section.push('\n');

    let items: Vec<(String, f64)> = shares
        .iter()
        .map(|s| (s.status.clone(), s.share_pct))
        .collect();
    section.push_str("```text\n");
    section.push_str(&bar_chart(&items, width, "%"));
    section.push_str("```\n\n");

    section
}

/// Generate the scheme type comparison section.
fn generate_comparison_section(groups: &[SchemeTypeAverage], width: usize) -> String {
    if groups.is_empty() {
        return String::new();
    }

    let items: Vec<(String, f64)> = groups
        .iter()
        .map(|g| {
            (
                format!("{} ({})", g.scheme_type, g.schemes),
                g.mean_utilisation_pct,
            )
        })
        .collect();

    let mut section = String::new();
    section.push_str("## 🏛️ Central vs State Scheme Performance\n\n");
    section.push_str("Average utilisation (%) by scheme type:\n\n");
    section.push_str("```text\n");
    section.push_str(&bar_chart(&items, width, "%"));
    section.push_str("```\n\n");

    section
}

/// Generate the risk classification table.
fn generate_risk_section(rows: &[RiskRow]) -> String {
    let mut section = String::new();

    section.push_str("## 🚦 Risk Classification Table\n\n");

    if rows.is_empty() {
        section.push_str("No schemes to classify.\n\n");
        return section;
    }

    let table_rows: Vec<RiskTableRow> = rows.iter().map(RiskTableRow::from).collect();
    section.push_str(&Table::new(table_rows).with(Style::markdown()).to_string());
    section.push_str("\n\n");

    section
}

/// Generate the review note section. The note is reproduced verbatim.
fn generate_review_section(note: &ReviewNote) -> String {
    let mut section = String::new();

    section.push_str("## 🧠 AI-Assisted Review Note\n\n");
    section.push_str(&format!(
        "*Drafted by `{}` on {}. Instruction: {}*\n\n",
        note.model,
        note.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        note.instruction
    ));
    section.push_str(&note.text);
    section.push_str("\n\n");

    section
}

/// Generate the governance footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("**Governance Disclaimer:**\n");
    footer.push_str(
        "This dashboard provides analytical support and AI-assisted drafting only.\n",
    );
    footer.push_str(
        "All interpretations, decisions, and approvals rest solely with the concerned officers.\n",
    );

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvalidMetricPolicy, Metric, RiskLevel};
    use chrono::Utc;

    fn create_test_dashboard() -> Dashboard {
        Dashboard {
            metadata: DashboardMetadata {
                source: "schemes.xlsx".to_string(),
                sheet: "Sheet1".to_string(),
                district: "Pune".to_string(),
                generated_at: Utc::now(),
                total_rows: 5,
                view_rows: 2,
                invalid_policy: InvalidMetricPolicy::Fail,
            },
            preview: vec![Record {
                row: 2,
                district: Some("Pune".to_string()),
                scheme_name: "PMAY Gramin".to_string(),
                scheme_type: "Central".to_string(),
                allocated_budget: Metric::Value(1200.0),
                utilised_budget: Metric::Value(600.0),
                utilisation_pct: Metric::Value(50.0),
                status: "Ongoing".to_string(),
            }],
            kpis: KpiSummary {
                total_allocation: 1250.5,
                total_utilisation: 640.25,
                mean_utilisation_pct: Some(65.0),
                high_risk_count: 1,
                rows: 2,
                excluded_rows: 0,
            },
            scheme_utilisation: vec![
                SchemeUtilisation {
                    scheme_name: "PMAY Gramin".to_string(),
                    utilisation_pct: 50.0,
                },
                SchemeUtilisation {
                    scheme_name: "Skill Mission".to_string(),
                    utilisation_pct: 80.0,
                },
            ],
            status_distribution: vec![StatusShare {
                status: "Ongoing".to_string(),
                count: 2,
                share_pct: 100.0,
            }],
            scheme_type_comparison: vec![
                SchemeTypeAverage {
                    scheme_type: "Central".to_string(),
                    mean_utilisation_pct: 50.0,
                    schemes: 1,
                },
                SchemeTypeAverage {
                    scheme_type: "State".to_string(),
                    mean_utilisation_pct: 80.0,
                    schemes: 1,
                },
            ],
            risk_table: vec![RiskRow {
                district: "Pune".to_string(),
                scheme_name: "PMAY Gramin".to_string(),
                scheme_type: "Central".to_string(),
                utilisation_pct: 50.0,
                status: "Ongoing".to_string(),
                risk_level: RiskLevel::HighRisk,
            }],
            review_note: None,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let dashboard = create_test_dashboard();
        let markdown = generate_markdown_report(&dashboard, &ReportConfig::default());

        assert!(markdown.contains("# 🏛️ Government Scheme Intelligence Dashboard"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## 📌 Key Performance Indicators"));
        assert!(markdown.contains("| 1,250.50 | 640.25 | 65.00 | 1 |"));
        assert!(markdown.contains("PMAY Gramin"));
        assert!(markdown.contains("*Showing 1 of 5 rows.*"));
        assert!(markdown.contains("Central vs State"));
        assert!(markdown.contains("🔴 High Risk"));
        assert!(markdown.contains("Governance Disclaimer"));
        assert!(!markdown.contains("AI-Assisted Review Note"));
    }

    #[test]
    fn test_kpi_section_reports_na_and_exclusions() {
        let kpis = KpiSummary {
            total_allocation: 0.0,
            total_utilisation: 0.0,
            mean_utilisation_pct: None,
            high_risk_count: 0,
            rows: 0,
            excluded_rows: 3,
        };
        let section = generate_kpi_section(&kpis, "₹ Cr");

        assert!(section.contains("Total Allocation (₹ Cr)"));
        assert!(section.contains("| 0.00 | 0.00 | N/A | 0 |"));
        assert!(section.contains("3 row(s)"));
    }

    #[test]
    fn test_review_note_rendered_verbatim() {
        let mut dashboard = create_test_dashboard();
        dashboard.attach_review_note(ReviewNote {
            model: "gpt-4o-mini".to_string(),
            instruction: "Summarise".to_string(),
            text: "## Key Risks\n- PMAY Gramin at 50%".to_string(),
            generated_at: Utc::now(),
        });

        let markdown = generate_markdown_report(&dashboard, &ReportConfig::default());
        assert!(markdown.contains("## 🧠 AI-Assisted Review Note"));
        assert!(markdown.contains("## Key Risks\n- PMAY Gramin at 50%"));
    }

    #[test]
    fn test_empty_view_sections() {
        let mut dashboard = create_test_dashboard();
        dashboard.preview.clear();
        dashboard.risk_table.clear();
        dashboard.scheme_utilisation.clear();

        let markdown = generate_markdown_report(&dashboard, &ReportConfig::default());
        assert!(markdown.contains("The worksheet has no data rows."));
        assert!(markdown.contains("No schemes to classify."));
        assert!(!markdown.contains("Utilisation (%) by Scheme"));
    }

    #[test]
    fn test_generate_json_report() {
        let dashboard = create_test_dashboard();
        let json = generate_json_report(&dashboard).unwrap();

        assert!(json.contains("\"kpis\""));
        assert!(json.contains("\"risk_level\": \"High Risk\""));
        assert!(json.contains("\"mean_utilisation_pct\": 65.0"));
        assert!(!json.contains("\"review_note\""));
    }
}
