use aml_screening::screening::domain::parse_birth_date;
use aml_screening::screening::views::{CaseSortKey, OutcomeFilter, SortDirection};
use aml_screening::screening::{
    Gender, Notification, NotificationError, NotificationSink, SessionId,
};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Prints notifications as they are raised; the CLI has no toast feed to drain.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConsoleNotificationSink;

impl NotificationSink for ConsoleNotificationSink {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        eprintln!("{}: {}", notification.title, notification.description);
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_birth_date(raw)
}

pub(crate) fn parse_gender(raw: &str) -> Result<Gender, String> {
    raw.parse()
}

pub(crate) fn parse_session(raw: &str) -> Result<SessionId, String> {
    SessionId::parse(raw).map_err(|err| err.to_string())
}

pub(crate) fn parse_outcome(raw: &str) -> Result<OutcomeFilter, String> {
    raw.parse()
}

pub(crate) fn parse_sort(raw: &str) -> Result<CaseSortKey, String> {
    raw.parse()
}

pub(crate) fn parse_direction(raw: &str) -> Result<SortDirection, String> {
    raw.parse()
}
