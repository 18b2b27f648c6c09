use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::domain::GatewayId;
use super::intake::GatewayPayload;
use crate::config::GatewayConfig;

/// Failures surfaced for a single gateway call.
///
/// Transport errors, non-2xx statuses and malformed bodies all collapse into
/// `CallFailed`; callers treat every variant the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("no endpoint configured for gateway {0}")]
    ConfigurationMissing(GatewayId),
    #[error("gateway {gateway} call failed: {reason}")]
    CallFailed { gateway: GatewayId, reason: String },
}

impl GatewayError {
    pub fn gateway(&self) -> GatewayId {
        match self {
            GatewayError::ConfigurationMissing(gateway) => *gateway,
            GatewayError::CallFailed { gateway, .. } => *gateway,
        }
    }

    fn call_failed(gateway: GatewayId, err: impl std::fmt::Display) -> Self {
        GatewayError::CallFailed {
            gateway,
            reason: err.to_string(),
        }
    }
}

/// Outbound boundary to the remote screening services.
#[async_trait]
pub trait ScreeningGateway: Send + Sync {
    /// Issue one screening request and return the unwrapped payload.
    async fn screen(
        &self,
        gateway: GatewayId,
        payload: &GatewayPayload,
    ) -> Result<Value, GatewayError>;
}

/// Normalizes the two envelope shapes the webhooks answer with.
///
/// `[{ "output": <payload> }]` yields `<payload>`; anything else is returned
/// untouched, including arrays whose first element has no (or a null) `output`.
pub fn unwrap_envelope(response: Value) -> Value {
    match response {
        Value::Array(mut items) => {
            let output = items
                .first_mut()
                .and_then(|first| first.get_mut("output"))
                .map(Value::take);
            match output {
                Some(output) if !output.is_null() => output,
                _ => Value::Array(items),
            }
        }
        other => other,
    }
}

/// reqwest-backed gateway posting JSON to the configured webhooks.
#[derive(Debug, Clone)]
pub struct HttpScreeningGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpScreeningGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: GatewayConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ScreeningGateway for HttpScreeningGateway {
    async fn screen(
        &self,
        gateway: GatewayId,
        payload: &GatewayPayload,
    ) -> Result<Value, GatewayError> {
        let endpoint = self
            .config
            .endpoint(gateway)
            .ok_or(GatewayError::ConfigurationMissing(gateway))?;

        let mut request = self.client.post(endpoint.clone()).json(payload);
        if let Some(timeout) = self.config.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|err| GatewayError::call_failed(gateway, err))?
            .error_for_status()
            .map_err(|err| GatewayError::call_failed(gateway, err))?;
        debug!(gateway = gateway.number(), status = %response.status(), "gateway responded");

        let body: Value = response
            .json()
            .await
            .map_err(|err| GatewayError::call_failed(gateway, err))?;

        Ok(unwrap_envelope(body))
    }
}
