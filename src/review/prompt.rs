//! Review-note prompt construction.
//!
//! The filtered view is serialised into a plain-text table and combined with
//! a fixed system prompt and the officer's instruction.

use crate::analysis::classify_record;
use crate::models::FilteredView;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Instruction used when the officer leaves it blank.
pub const DEFAULT_INSTRUCTION: &str =
    "Prepare a concise review note highlighting key risks, average performers, and good performers.";

/// Fixed system prompt for the review assistant.
pub const SYSTEM_PROMPT: &str = r#"ROLE:
You are a Government Scheme Performance Review Assistant.

RULES:
1. Use formal Government language suitable for official review meetings.
2. Base analysis strictly on the provided numerical data and computed indicators.
3. Do not invent causes, explanations, or policy recommendations unless explicitly asked.
4. Highlight key risks, average performers, and good performers objectively.
5. If information is insufficient, clearly state so.
6. Continue responses fully if analysis is long.

OUTPUT:
- Structured bullet points
- Clear headings
- Review-meeting ready language
"#;

/// Message in a chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Tabled)]
struct DataRow {
    #[tabled(rename = "District")]
    district: String,
    #[tabled(rename = "Scheme Name")]
    scheme_name: String,
    #[tabled(rename = "Scheme Type")]
    scheme_type: String,
    #[tabled(rename = "Allocated Budget")]
    allocated_budget: String,
    #[tabled(rename = "Utilised Budget")]
    utilised_budget: String,
    #[tabled(rename = "% Utilisation")]
    utilisation_pct: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Risk Level")]
    risk_level: String,
}

/// Escape a cell so it cannot break the table layout.
///
/// Backslashes, pipes and line breaks become `\\`, `\|`, `\n` and `\r`, so the
/// original text can be recovered exactly and every row stays on one line.
fn escape_cell(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '|' => escaped.push_str("\\|"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render every row of the view as a column-aligned text table.
///
/// Values are written exactly as loaded (escaped by [`escape_cell`]); a row
/// whose utilisation cannot be classified shows `N/A` as its risk level.
pub fn serialize_view(view: &FilteredView<'_>) -> String {
    let rows: Vec<DataRow> = view
        .iter()
        .map(|r| DataRow {
            district: escape_cell(r.district_label()),
            scheme_name: escape_cell(&r.scheme_name),
            scheme_type: escape_cell(&r.scheme_type),
            allocated_budget: escape_cell(&r.allocated_budget.to_string()),
            utilised_budget: escape_cell(&r.utilised_budget.to_string()),
            utilisation_pct: escape_cell(&r.utilisation_pct.to_string()),
            status: escape_cell(&r.status),
            risk_level: classify_record(r)
                .map(|level| level.to_string())
                .unwrap_or_else(|_| "N/A".to_string()),
        })
        .collect();

    Table::new(rows).with(Style::psql()).to_string()
}

/// Everything sent to the review service for one note.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    pub data_table: String,
    pub instruction: String,
}

impl ReviewRequest {
    /// Build a request for a view; a blank instruction falls back to
    /// [`DEFAULT_INSTRUCTION`].
    pub fn new(view: &FilteredView<'_>, instruction: Option<&str>) -> Self {
        let instruction = match instruction.map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => DEFAULT_INSTRUCTION.to_string(),
        };

        Self {
            data_table: serialize_view(view),
            instruction,
        }
    }

    /// System prompt, data message, instruction message.
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("SCHEME DATA:\n{}", self.data_table)),
            ChatMessage::user(self.instruction.clone()),
        ]
    }
}
