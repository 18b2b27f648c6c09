use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{null_as_default, DetailBody};
use crate::screening::gateway::unwrap_envelope;

pub(crate) const NO_REPORT_MESSAGE: &str = "No data available. Please perform a search first.";
pub(crate) const NO_CASES_MESSAGE: &str = "No data found.";

/// Court-records report as produced by gateway 1.
///
/// Every field is optional on the wire; absent or `null` values fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmlReportOutput {
    #[serde(deserialize_with = "null_as_default")]
    pub searched_subject: SearchedSubject,
    #[serde(rename = "consentsSigned", deserialize_with = "null_as_default")]
    pub consents_signed: bool,
    pub analysis_metadata: Option<AnalysisMetadata>,
    #[serde(deserialize_with = "null_as_default")]
    pub aggregated_report: AggregatedReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchedSubject {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub identifier: String,
    #[serde(deserialize_with = "null_as_default")]
    pub identifier_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisMetadata {
    #[serde(deserialize_with = "null_as_default")]
    pub processed_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub documents_analyzed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatedReport {
    #[serde(deserialize_with = "null_as_default")]
    pub header: ReportHeader,
    #[serde(deserialize_with = "null_as_default")]
    pub narrative_summary: String,
    #[serde(deserialize_with = "null_as_default")]
    pub aggregated_flags: BTreeMap<String, FlagSummary>,
    #[serde(deserialize_with = "null_as_default")]
    pub cases: Vec<CourtCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportHeader {
    #[serde(deserialize_with = "null_as_default")]
    pub search_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub total_cases: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub lost_cases_adverse_position: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub won_cases_adverse_position: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub pending_cases_adverse_position: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub overall_risk_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub present: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub case_numbers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourtCase {
    #[serde(deserialize_with = "null_as_default")]
    pub case_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub court: String,
    #[serde(deserialize_with = "null_as_default")]
    pub decision_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub case_topic: String,
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(deserialize_with = "null_as_default")]
    pub case_types: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub procedural_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub subject_role: String,
    #[serde(deserialize_with = "null_as_default")]
    pub outcome_for_subject: String,
    #[serde(deserialize_with = "null_as_default")]
    pub financial_impact: FinancialImpact,
    #[serde(deserialize_with = "null_as_default")]
    pub aml_esg_dd_flags_in_case: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub case_categories: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub documents: Vec<CaseDocument>,
    #[serde(deserialize_with = "null_as_default")]
    pub procedural_history: Vec<String>,
}

/// Amounts arrive either as numbers or as formatted strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialImpact {
    pub disputed_amount: Value,
    pub admitted_amount: Value,
    pub penalties: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseDocument {
    #[serde(deserialize_with = "null_as_default")]
    pub document_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(deserialize_with = "null_as_default")]
    pub decision_type: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeFilter {
    #[default]
    All,
    Winning,
    Losing,
}

impl OutcomeFilter {
    fn admits(self, case: &CourtCase) -> bool {
        match self {
            OutcomeFilter::All => true,
            OutcomeFilter::Winning => case.outcome_for_subject.eq_ignore_ascii_case("winning"),
            OutcomeFilter::Losing => case.outcome_for_subject.eq_ignore_ascii_case("losing"),
        }
    }
}

impl FromStr for OutcomeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(OutcomeFilter::All),
            "winning" => Ok(OutcomeFilter::Winning),
            "losing" => Ok(OutcomeFilter::Losing),
            other => Err(format!("unknown outcome '{other}'; expected all, winning or losing")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSortKey {
    #[default]
    DecisionDate,
    CaseTopic,
}

impl FromStr for CaseSortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "decision_date" => Ok(CaseSortKey::DecisionDate),
            "case_topic" => Ok(CaseSortKey::CaseTopic),
            other => Err(format!(
                "unknown sort key '{other}'; expected decision_date or case_topic"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown direction '{other}'; expected asc or desc")),
        }
    }
}

/// Filter and ordering applied to the case table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub outcome: OutcomeFilter,
    pub sort: CaseSortKey,
    pub direction: SortDirection,
}

impl CaseQuery {
    /// Cases matching the search term and outcome filter, in display order.
    pub fn apply(&self, cases: &[CourtCase]) -> Vec<CourtCase> {
        let needle = self
            .search
            .as_deref()
            .map(|term| term.trim().to_lowercase())
            .unwrap_or_default();

        let mut selected: Vec<CourtCase> = cases
            .iter()
            .filter(|case| {
                needle.is_empty()
                    || case.case_number.to_lowercase().contains(&needle)
                    || case.case_topic.to_lowercase().contains(&needle)
            })
            .filter(|case| self.outcome.admits(case))
            .cloned()
            .collect();

        selected.sort_by(|a, b| {
            let ordering = self.compare(a, b);
            match self.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        selected
    }

    fn compare(&self, a: &CourtCase, b: &CourtCase) -> Ordering {
        match self.sort {
            CaseSortKey::DecisionDate => a.decision_date.cmp(&b.decision_date),
            CaseSortKey::CaseTopic => a.case_topic.cmp(&b.case_topic),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSummary {
    pub overall_risk_level: String,
    pub search_date: String,
    pub total_cases: u32,
    pub lost_cases: u32,
    pub won_cases: u32,
    pub pending_cases: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedCategory {
    pub category: String,
    pub case_numbers: Vec<String>,
}

/// View 1 as handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub subject: SearchedSubject,
    pub consents_signed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AnalysisMetadata>,
    pub summary: CaseSummary,
    pub narrative_summary: String,
    pub flagged_categories: Vec<FlaggedCategory>,
    pub query: CaseQuery,
    pub cases: Vec<CourtCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl CaseReport {
    pub fn build(output: AmlReportOutput, query: &CaseQuery) -> Self {
        let AmlReportOutput {
            searched_subject,
            consents_signed,
            analysis_metadata,
            aggregated_report,
        } = output;
        let header = aggregated_report.header;

        let flagged_categories = aggregated_report
            .aggregated_flags
            .into_iter()
            .filter(|(_, flag)| flag.present)
            .map(|(category, flag)| FlaggedCategory {
                category,
                case_numbers: flag.case_numbers,
            })
            .collect();

        let cases = query.apply(&aggregated_report.cases);
        let notice = cases.is_empty().then(|| NO_CASES_MESSAGE.to_string());

        Self {
            subject: searched_subject,
            consents_signed,
            metadata: analysis_metadata,
            summary: CaseSummary {
                overall_risk_level: header.overall_risk_level,
                search_date: header.search_date,
                total_cases: header.total_cases,
                lost_cases: header.lost_cases_adverse_position,
                won_cases: header.won_cases_adverse_position,
                pending_cases: header.pending_cases_adverse_position,
            },
            narrative_summary: aggregated_report.narrative_summary,
            flagged_categories,
            query: query.clone(),
            cases,
            notice,
        }
    }
}

pub(crate) fn render(stored: Option<&str>, query: &CaseQuery) -> DetailBody {
    let Some(output) = stored.and_then(parse_report) else {
        return DetailBody::message(NO_REPORT_MESSAGE);
    };
    DetailBody::CaseReport(CaseReport::build(output, query))
}

fn parse_report(raw: &str) -> Option<AmlReportOutput> {
    let value = unwrap_envelope(serde_json::from_str::<Value>(raw).ok()?);
    let value = match value.get("output") {
        Some(inner) if inner.is_object() && value.get("aggregated_report").is_none() => {
            inner.clone()
        }
        _ => value,
    };
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}
