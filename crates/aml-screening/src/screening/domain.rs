use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One of the four external screening webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GatewayId {
    CourtRecords,
    Screening,
    AdverseMedia,
    LexisNexis,
}

impl GatewayId {
    pub const ALL: [GatewayId; 4] = [
        GatewayId::CourtRecords,
        GatewayId::Screening,
        GatewayId::AdverseMedia,
        GatewayId::LexisNexis,
    ];

    pub fn number(self) -> u8 {
        match self {
            GatewayId::CourtRecords => 1,
            GatewayId::Screening => 2,
            GatewayId::AdverseMedia => 3,
            GatewayId::LexisNexis => 4,
        }
    }

    /// Human-facing name used in notifications and report titles.
    pub fn label(self) -> &'static str {
        match self {
            GatewayId::CourtRecords => "MD Justice systems",
            GatewayId::Screening => "Screening",
            GatewayId::AdverseMedia => "Reputational & Adverse Media",
            GatewayId::LexisNexis => "Lexis Nexis",
        }
    }

    pub fn endpoint_variable(self) -> String {
        format!("API_WEBHOOK_URL_{}", self.number())
    }

    /// Gateway 4 takes the structured subject; the others take a flattened name.
    pub fn wants_structured_subject(self) -> bool {
        matches!(self, GatewayId::LexisNexis)
    }
}

impl fmt::Display for GatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.label())
    }
}

impl TryFrom<u8> for GatewayId {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(GatewayId::CourtRecords),
            2 => Ok(GatewayId::Screening),
            3 => Ok(GatewayId::AdverseMedia),
            4 => Ok(GatewayId::LexisNexis),
            other => Err(format!("unknown gateway {other}; expected 1-4")),
        }
    }
}

impl From<GatewayId> for u8 {
    fn from(value: GatewayId) -> Self {
        value.number()
    }
}

impl FromStr for GatewayId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = s
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("unknown gateway '{s}'; expected 1-4"))?;
        GatewayId::try_from(number)
    }
}

/// Identifies one client session; the service-side stand-in for a browser tab.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, thiserror::Error)]
#[error("session id must be 1-128 characters of [A-Za-z0-9_-], got '{0}'")]
pub struct InvalidSessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, InvalidSessionId> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_SESSION_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidSessionId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Individual,
    #[serde(alias = "business")]
    Company,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{other}'; expected Male or Female")),
        }
    }
}

/// Raw subject form as entered by the analyst, prior to validation.
///
/// Both variants' fields live side by side, as they do in the entry form;
/// `entity_type` decides which ones count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectForm {
    pub entity_type: EntityKind,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(
        default,
        serialize_with = "serialize_birth_date",
        deserialize_with = "deserialize_birth_date"
    )]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub place_of_birth: String,
    #[serde(default)]
    pub company_names: Vec<String>,
    #[serde(default)]
    pub identifier: String,
}

impl SubjectForm {
    pub fn individual(first_name: &str, last_name: &str) -> Self {
        Self {
            entity_type: EntityKind::Individual,
            first_name: first_name.to_string(),
            middle_name: String::new(),
            last_name: last_name.to_string(),
            gender: None,
            date_of_birth: None,
            place_of_birth: String::new(),
            company_names: Vec::new(),
            identifier: String::new(),
        }
    }

    pub fn business<I, T>(company_names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            entity_type: EntityKind::Company,
            first_name: String::new(),
            middle_name: String::new(),
            last_name: String::new(),
            gender: None,
            date_of_birth: None,
            place_of_birth: String::new(),
            company_names: company_names.into_iter().map(Into::into).collect(),
            identifier: String::new(),
        }
    }
}

pub(crate) const BIRTH_DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only the date.
pub fn parse_birth_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, BIRTH_DATE_FORMAT) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn serialize_birth_date<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(date) => serializer.serialize_some(&date.format(BIRTH_DATE_FORMAT).to_string()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_birth_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(value) if !value.trim().is_empty() => parse_birth_date(&value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// ISO 3166-1 alpha-2 country code, upper case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(Self(trimmed.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Individual {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: Option<NaiveDate>,
    pub place_of_birth: Option<CountryCode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Business {
    /// Never empty, never contains blank entries.
    pub company_names: Vec<String>,
}

/// A validated screening subject. Exactly one variant is active per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Individual(Individual),
    Business(Business),
}

impl Subject {
    /// Flattened name sent to the name-based gateways.
    pub fn display_name(&self) -> String {
        match self {
            Subject::Individual(person) => [
                Some(person.first_name.as_str()),
                person.middle_name.as_deref(),
                Some(person.last_name.as_str()),
            ]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
            Subject::Business(business) => business
                .company_names
                .first()
                .cloned()
                .unwrap_or_default(),
        }
    }
}
