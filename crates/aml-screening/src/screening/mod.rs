//! AML subject screening: intake, gateway fan-out, session storage and report views.
//!
//! A submitted subject is validated, persisted, and sent to the four screening
//! gateways concurrently. Each call settles on its own and is mirrored into the
//! session's result store, from which the detail views are rendered.

pub mod domain;
pub mod gateway;
pub mod intake;
pub mod lifecycle;
pub mod notifications;
pub mod orchestrator;
pub mod router;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    EntityKind, Gender, GatewayId, InvalidSessionId, SessionId, Subject, SubjectForm,
};
pub use gateway::{GatewayError, HttpScreeningGateway, ScreeningGateway};
pub use intake::{FieldIssue, GatewayPayload, SubjectValidationError};
pub use lifecycle::{CallFlags, CallState, GatewayCallView, GatewayCalls};
pub use notifications::{
    InMemoryNotificationSink, Notification, NotificationError, NotificationSink,
    NotificationVariant,
};
pub use orchestrator::{OrchestratorError, ScreeningOrchestrator, SessionView, SubmissionHandle};
pub use router::screening_router;
pub use store::{
    InMemoryResultStore, JsonFileResultStore, ResultStore, SessionSnapshot, SnapshotStore,
    StoreError, StoreKey,
};
pub use views::{CaseQuery, DetailBody, DetailView};
