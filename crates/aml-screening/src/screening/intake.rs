use serde::Serialize;

use super::domain::{
    Business, CountryCode, EntityKind, GatewayId, Individual, Subject, SubjectForm,
    BIRTH_DATE_FORMAT,
};

const MIN_NAME_CHARS: usize = 2;
const MIN_IDENTIFIER_CHARS: usize = 5;

/// One rejected form field, keyed by the form's own field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every issue found in a subject form; nothing is submitted while any remain.
#[derive(Debug, Clone, thiserror::Error)]
#[error("subject form rejected: {}", join_messages(.issues))]
pub struct SubjectValidationError {
    pub issues: Vec<FieldIssue>,
}

fn join_messages(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

impl SubjectForm {
    /// Validate the form and produce the subject that will be screened.
    pub fn validate(&self) -> Result<Subject, SubjectValidationError> {
        let mut issues = Vec::new();

        let identifier = self.identifier.trim();
        if !identifier.is_empty() && char_len(identifier) < MIN_IDENTIFIER_CHARS {
            issues.push(FieldIssue::new(
                "identifier",
                "Identifier must be at least 5 characters.",
            ));
        }

        let subject = match self.entity_type {
            EntityKind::Individual => self
                .individual_subject(&mut issues)
                .map(Subject::Individual),
            EntityKind::Company => self.business_subject(&mut issues).map(Subject::Business),
        };

        match subject {
            Some(subject) if issues.is_empty() => Ok(subject),
            _ => Err(SubjectValidationError { issues }),
        }
    }

    fn individual_subject(&self, issues: &mut Vec<FieldIssue>) -> Option<Individual> {
        if char_len(&self.first_name) < MIN_NAME_CHARS {
            issues.push(FieldIssue::new(
                "firstName",
                "First name must be at least 2 characters.",
            ));
        }
        if char_len(&self.last_name) < MIN_NAME_CHARS {
            issues.push(FieldIssue::new(
                "lastName",
                "Last name must be at least 2 characters.",
            ));
        }

        let place_of_birth = if self.place_of_birth.trim().is_empty() {
            None
        } else {
            let code = CountryCode::parse(&self.place_of_birth);
            if code.is_none() {
                issues.push(FieldIssue::new(
                    "placeOfBirth",
                    "Place of birth must be a two-letter country code.",
                ));
            }
            code
        };

        if !issues.is_empty() {
            return None;
        }

        let middle_name = self.middle_name.trim();
        Some(Individual {
            first_name: self.first_name.trim().to_string(),
            middle_name: (!middle_name.is_empty()).then(|| middle_name.to_string()),
            last_name: self.last_name.trim().to_string(),
            gender: self.gender.unwrap_or_default(),
            date_of_birth: self.date_of_birth,
            place_of_birth,
        })
    }

    fn business_subject(&self, issues: &mut Vec<FieldIssue>) -> Option<Business> {
        let company_names: Vec<String> = self
            .company_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if company_names.is_empty() {
            issues.push(FieldIssue::new(
                "companyNames",
                "At least one company name is required.",
            ));
            return None;
        }

        Some(Business { company_names })
    }
}

/// Body for the name-based gateways (1-3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualPayload {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub gender: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessPayload {
    pub company_names: Vec<String>,
}

/// Body for the structured gateway (4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entityType")]
pub enum StructuredSubject {
    Individual(IndividualPayload),
    Business(BusinessPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GatewayPayload {
    Name(NameQuery),
    Structured(StructuredSubject),
}

impl Subject {
    pub fn payload_for(&self, gateway: GatewayId) -> GatewayPayload {
        if gateway.wants_structured_subject() {
            GatewayPayload::Structured(self.structured())
        } else {
            GatewayPayload::Name(NameQuery {
                name: self.display_name(),
            })
        }
    }

    fn structured(&self) -> StructuredSubject {
        match self {
            Subject::Individual(person) => StructuredSubject::Individual(IndividualPayload {
                first_name: person.first_name.clone(),
                middle_name: person.middle_name.clone().unwrap_or_default(),
                last_name: person.last_name.clone(),
                gender: person.gender.label(),
                date_of_birth: person
                    .date_of_birth
                    .map(|date| date.format(BIRTH_DATE_FORMAT).to_string()),
                place_of_birth: person
                    .place_of_birth
                    .as_ref()
                    .map(|code| code.as_str().to_string()),
            }),
            Subject::Business(business) => StructuredSubject::Business(BusinessPayload {
                company_names: business.company_names.clone(),
            }),
        }
    }
}
