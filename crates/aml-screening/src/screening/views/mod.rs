//! Read-only renderers for the four gateway reports.
//!
//! Each view reads one stored response and never touches lifecycle state.

mod case_report;
mod extract;
mod risk;

pub use case_report::{
    AggregatedReport, AmlReportOutput, CaseQuery, CaseReport, CaseSortKey, CaseSummary,
    CourtCase, FlaggedCategory, OutcomeFilter, SearchedSubject, SortDirection,
};
pub use extract::extract_markdown;
pub use risk::{
    Confidence, RankedMatch, RiskConclusion, RiskScreening, RiskScreeningOutput, RiskTag,
    RiskTagKind, Severity,
};

use pulldown_cmark::Options;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::domain::GatewayId;

const NO_RESPONSE_MESSAGE: &str = "No data received from the API call.";
const LOAD_FAILED_MESSAGE: &str = "Error loading data.";
const EMPTY_SCREENING_MESSAGE: &str = "No data available.";
const UNKNOWN_VIEW_MESSAGE: &str = "No data available for this ID. Please perform a search first.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkdownView {
    pub source: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailBody {
    CaseReport(CaseReport),
    Markdown(MarkdownView),
    RiskScreening(RiskScreening),
    Message { message: String },
}

impl DetailBody {
    pub fn message(message: impl Into<String>) -> Self {
        DetailBody::Message {
            message: message.into(),
        }
    }
}

/// One rendered `/dashboard/{id}` page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub view_id: String,
    pub title: String,
    #[serde(flatten)]
    pub body: DetailBody,
}

impl DetailView {
    /// Render the view for `gateway` from its stored response text.
    pub fn render(gateway: GatewayId, stored: Option<&str>, query: &CaseQuery) -> Self {
        let body = match gateway {
            GatewayId::CourtRecords => case_report::render(stored, query),
            GatewayId::Screening => render_markdown(stored, Options::empty(), true),
            GatewayId::AdverseMedia => render_markdown(
                stored,
                Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH,
                false,
            ),
            GatewayId::LexisNexis => risk::render(stored),
        };

        Self {
            view_id: gateway.number().to_string(),
            title: gateway.label().to_string(),
            body,
        }
    }

    /// Placeholder for identifiers outside 1-4.
    pub fn unavailable(view_id: &str) -> Self {
        Self {
            view_id: view_id.to_string(),
            title: format!("Dashboard for ID: {view_id}"),
            body: DetailBody::message(UNKNOWN_VIEW_MESSAGE),
        }
    }
}

/// Webhook reports send `null` for gaps as often as they omit the field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn render_markdown(stored: Option<&str>, options: Options, empty_list_is_no_data: bool) -> DetailBody {
    let Some(raw) = stored else {
        return DetailBody::message(NO_RESPONSE_MESSAGE);
    };
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return DetailBody::message(LOAD_FAILED_MESSAGE);
    };

    let source = extract_markdown(&value);
    if empty_list_is_no_data && source.trim() == "[]" {
        return DetailBody::message(EMPTY_SCREENING_MESSAGE);
    }

    let html = extract::render_html(&source, options);
    DetailBody::Markdown(MarkdownView { source, html })
}
