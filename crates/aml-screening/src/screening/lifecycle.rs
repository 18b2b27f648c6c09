use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::domain::GatewayId;

/// Lifecycle of one outbound gateway call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallState {
    #[default]
    Idle,
    Pending,
    Completed {
        payload: Value,
    },
    Errored {
        reason: String,
    },
}

/// Flag projection of a `CallState`; at most one flag is ever set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CallFlags {
    pub processing: bool,
    pub completed: bool,
    pub error: bool,
}

impl CallState {
    pub fn flags(&self) -> CallFlags {
        CallFlags {
            processing: matches!(self, CallState::Pending),
            completed: matches!(self, CallState::Completed { .. }),
            error: matches!(self, CallState::Errored { .. }),
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, CallState::Completed { .. } | CallState::Errored { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Pending => "pending",
            CallState::Completed { .. } => "completed",
            CallState::Errored { .. } => "error",
        }
    }
}

/// One state record per gateway, always holding all four gateways.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayCalls {
    states: BTreeMap<GatewayId, CallState>,
}

impl Default for GatewayCalls {
    fn default() -> Self {
        Self::uniform(CallState::Idle)
    }
}

impl GatewayCalls {
    pub fn uniform(state: CallState) -> Self {
        Self {
            states: GatewayId::ALL
                .into_iter()
                .map(|gateway| (gateway, state.clone()))
                .collect(),
        }
    }

    pub fn get(&self, gateway: GatewayId) -> &CallState {
        // every gateway is inserted at construction and never removed
        static IDLE: CallState = CallState::Idle;
        self.states.get(&gateway).unwrap_or(&IDLE)
    }

    pub fn set(&mut self, gateway: GatewayId, state: CallState) {
        self.states.insert(gateway, state);
    }

    pub fn iter(&self) -> impl Iterator<Item = (GatewayId, &CallState)> {
        self.states.iter().map(|(gateway, state)| (*gateway, state))
    }

    pub fn all_settled(&self) -> bool {
        self.states.values().all(CallState::is_settled)
    }

    pub fn all_idle(&self) -> bool {
        self.states
            .values()
            .all(|state| matches!(state, CallState::Idle))
    }
}

/// Per-gateway status as exposed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayCallView {
    pub gateway: GatewayId,
    pub label: &'static str,
    pub status: &'static str,
    #[serde(flatten)]
    pub flags: CallFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GatewayCallView {
    pub fn new(gateway: GatewayId, state: &CallState) -> Self {
        let reason = match state {
            CallState::Errored { reason } => Some(reason.clone()),
            _ => None,
        };
        Self {
            gateway,
            label: gateway.label(),
            status: state.label(),
            flags: state.flags(),
            reason,
        }
    }
}
