use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{null_as_default, DetailBody};

pub(crate) const NO_RISK_DATA_MESSAGE: &str = "No data available";

/// Structured screening result returned by gateway 4.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiskScreeningOutput {
    #[serde(deserialize_with = "null_as_default")]
    pub subject: ScreenedSubject,
    #[serde(deserialize_with = "null_as_default")]
    pub result: String,
    pub best_fit_selection: Option<BestFitSelection>,
    #[serde(deserialize_with = "null_as_default")]
    pub short_risk_conclusion: String,
    #[serde(deserialize_with = "null_as_default")]
    pub other_high_score_candidates: Vec<CandidateMatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenedSubject {
    #[serde(deserialize_with = "null_as_default")]
    pub subject_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub requested_names: Vec<String>,
    pub subject_dob: Option<String>,
    pub subject_identifier: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchScore {
    #[serde(deserialize_with = "null_as_default")]
    pub best_name_score: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub entity_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CandidateMatch {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub score: MatchScore,
    #[serde(deserialize_with = "null_as_default")]
    pub reason_listed: String,
    #[serde(deserialize_with = "null_as_default")]
    pub primary_risk_tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub last_updated: String,
    #[serde(deserialize_with = "null_as_default")]
    pub adverse_media_links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BestFitSelection {
    #[serde(flatten)]
    pub candidate: CandidateMatch,
    #[serde(deserialize_with = "null_as_default")]
    pub justification: String,
    #[serde(deserialize_with = "null_as_default")]
    pub confidence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTagKind {
    Sanction,
    AdverseMedia,
    Other,
}

impl RiskTagKind {
    pub fn classify(tag: &str) -> Self {
        let tag = tag.to_lowercase();
        if tag.contains("sanction") {
            RiskTagKind::Sanction
        } else if tag.contains("adverse") {
            RiskTagKind::AdverseMedia
        } else {
            RiskTagKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskTag {
    pub label: String,
    pub kind: RiskTagKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl Confidence {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            "low" => Confidence::Low,
            _ => Confidence::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskConclusion {
    pub text: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    pub name: String,
    pub best_name_score: f64,
    pub entity_score: f64,
    pub reason_listed: String,
    pub risk_tags: Vec<RiskTag>,
    pub last_updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_display: Option<String>,
    pub adverse_media_links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

impl RankedMatch {
    fn from_candidate(candidate: CandidateMatch) -> Self {
        let last_updated_display = display_date(&candidate.last_updated);
        Self {
            name: candidate.name,
            best_name_score: candidate.score.best_name_score,
            entity_score: candidate.score.entity_score,
            reason_listed: candidate.reason_listed,
            risk_tags: candidate
                .primary_risk_tags
                .into_iter()
                .map(|label| RiskTag {
                    kind: RiskTagKind::classify(&label),
                    label,
                })
                .collect(),
            last_updated: candidate.last_updated,
            last_updated_display,
            adverse_media_links: candidate.adverse_media_links,
            justification: None,
            confidence: None,
        }
    }

    fn from_best_fit(selection: BestFitSelection) -> Self {
        let mut ranked = Self::from_candidate(selection.candidate);
        ranked.justification =
            (!selection.justification.trim().is_empty()).then_some(selection.justification);
        ranked.confidence = Some(Confidence::parse(&selection.confidence));
        ranked
    }

    fn mentions_sanctions(&self) -> bool {
        self.risk_tags
            .iter()
            .any(|tag| tag.kind == RiskTagKind::Sanction)
    }
}

/// View 4 as handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScreening {
    pub result: String,
    pub results_found: bool,
    pub subject: ScreenedSubject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<RiskConclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_match: Option<RankedMatch>,
    pub alternate_candidates: Vec<RankedMatch>,
}

impl RiskScreening {
    pub fn build(output: RiskScreeningOutput) -> Self {
        let best_match = output.best_fit_selection.map(RankedMatch::from_best_fit);
        let severity = if best_match.as_ref().is_some_and(RankedMatch::mentions_sanctions) {
            Severity::Critical
        } else {
            Severity::Advisory
        };
        let conclusion = (!output.short_risk_conclusion.trim().is_empty()).then(|| RiskConclusion {
            text: output.short_risk_conclusion,
            severity,
        });

        Self {
            results_found: output.result == "RESULTS",
            result: output.result,
            subject: output.subject,
            conclusion,
            best_match,
            alternate_candidates: output
                .other_high_score_candidates
                .into_iter()
                .map(RankedMatch::from_candidate)
                .collect(),
        }
    }
}

pub(crate) fn render(stored: Option<&str>) -> DetailBody {
    let Some(value) = stored.and_then(|raw| serde_json::from_str::<Value>(raw).ok()) else {
        return DetailBody::message(NO_RISK_DATA_MESSAGE);
    };

    let value = match value {
        Value::Array(items) => {
            let Some(first) = items.into_iter().next() else {
                return DetailBody::message(NO_RISK_DATA_MESSAGE);
            };
            if first.get("isFound").and_then(Value::as_bool) != Some(true) {
                let message = first
                    .get("message")
                    .and_then(Value::as_str)
                    .filter(|message| !message.is_empty())
                    .unwrap_or(NO_RISK_DATA_MESSAGE);
                return DetailBody::message(message);
            }
            match first.get("output") {
                Some(output) if output.is_object() => output.clone(),
                _ => first,
            }
        }
        object @ Value::Object(_) => object,
        _ => return DetailBody::message(NO_RISK_DATA_MESSAGE),
    };

    match serde_json::from_value::<RiskScreeningOutput>(value) {
        Ok(output) => DetailBody::RiskScreening(RiskScreening::build(output)),
        Err(_) => DetailBody::message(NO_RISK_DATA_MESSAGE),
    }
}

/// `2024-01-05` or an RFC 3339 timestamp as "January 5, 2024".
fn display_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|ts| ts.date_naive()))?;
    Some(date.format("%B %-d, %Y").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "subject": {
                "subject_type": "Individual",
                "requested_names": ["Ion Popescu"],
                "subject_dob": "1970-02-11"
            },
            "result": "RESULTS",
            "best_fit_selection": {
                "name": "POPESCU, Ion",
                "score": { "best_name_score": 97, "entity_score": 88.5 },
                "reason_listed": "EU consolidated list",
                "primary_risk_tags": ["Sanctions", "Adverse Media"],
                "last_updated": "2024-01-05T10:00:00Z",
                "adverse_media_links": ["https://news.example.test/a"],
                "justification": "Name and date of birth match.",
                "confidence": "High"
            },
            "short_risk_conclusion": "Subject appears on a sanctions list.",
            "other_high_score_candidates": [{
                "name": "POPESCU, Ioana",
                "score": { "best_name_score": 81, "entity_score": 40 },
                "primary_risk_tags": ["PEP"],
                "last_updated": "not a date"
            }]
        })
    }

    #[test]
    fn sanction_tags_make_the_conclusion_critical() {
        let DetailBody::RiskScreening(screening) = render(Some(&sample().to_string())) else {
            panic!("expected a risk screening");
        };
        assert!(screening.results_found);
        let conclusion = screening.conclusion.expect("conclusion present");
        assert_eq!(conclusion.severity, Severity::Critical);

        let best = screening.best_match.expect("best match present");
        assert_eq!(best.confidence, Some(Confidence::High));
        assert_eq!(best.best_name_score, 97.0);
        assert_eq!(best.risk_tags[0].kind, RiskTagKind::Sanction);
        assert_eq!(best.risk_tags[1].kind, RiskTagKind::AdverseMedia);
        assert_eq!(best.last_updated_display.as_deref(), Some("January 5, 2024"));

        let alternate = &screening.alternate_candidates[0];
        assert_eq!(alternate.risk_tags[0].kind, RiskTagKind::Other);
        assert!(alternate.last_updated_display.is_none());
        assert!(alternate.confidence.is_none());
    }

    #[test]
    fn array_envelope_reports_not_found_message() {
        let stored = json!([{ "isFound": false, "message": "No matches in watchlists" }]).to_string();
        assert_eq!(
            render(Some(&stored)),
            DetailBody::message("No matches in watchlists")
        );

        let stored = json!([{ "isFound": false }]).to_string();
        assert_eq!(render(Some(&stored)), DetailBody::message(NO_RISK_DATA_MESSAGE));
        assert_eq!(render(None), DetailBody::message(NO_RISK_DATA_MESSAGE));
    }

    #[test]
    fn found_array_envelope_uses_its_output() {
        let stored = json!([{ "isFound": true, "output": sample() }]).to_string();
        let DetailBody::RiskScreening(screening) = render(Some(&stored)) else {
            panic!("expected a risk screening");
        };
        assert_eq!(screening.subject.requested_names, vec!["Ion Popescu"]);
    }

    #[test]
    fn null_fields_still_render_the_screening() {
        let mut value = sample();
        value["best_fit_selection"]["justification"] = Value::Null;
        value["best_fit_selection"]["adverse_media_links"] = Value::Null;
        value["best_fit_selection"]["score"] = json!({ "best_name_score": 90, "entity_score": null });
        value["subject"]["requested_names"] = Value::Null;
        value["other_high_score_candidates"] = Value::Null;

        let stored = json!([{ "isFound": true, "output": value }]).to_string();
        let DetailBody::RiskScreening(screening) = render(Some(&stored)) else {
            panic!("expected a risk screening");
        };
        let best = screening.best_match.expect("best match present");
        assert_eq!(best.name, "POPESCU, Ion");
        assert!(best.justification.is_none());
        assert!(best.adverse_media_links.is_empty());
        assert_eq!(best.entity_score, 0.0);
        assert!(screening.subject.requested_names.is_empty());
        assert!(screening.alternate_candidates.is_empty());
    }

    #[test]
    fn unknown_confidence_and_clean_tags_stay_advisory() {
        let mut value = sample();
        value["best_fit_selection"]["primary_risk_tags"] = json!(["PEP"]);
        value["best_fit_selection"]["confidence"] = json!("unsure");

        let screening = RiskScreening::build(serde_json::from_value(value).expect("parses"));
        assert_eq!(
            screening.conclusion.map(|conclusion| conclusion.severity),
            Some(Severity::Advisory)
        );
        assert_eq!(
            screening.best_match.and_then(|best| best.confidence),
            Some(Confidence::Unknown)
        );
    }
}
