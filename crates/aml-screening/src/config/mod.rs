use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::screening::GatewayId;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub gateways: GatewayConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            gateways: GatewayConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Prefix of the browser-exposed endpoint variables read when the plain ones are unset.
const PUBLIC_ENDPOINT_PREFIX: &str = "NEXT_PUBLIC_";

fn non_blank_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Outbound webhook endpoints, one per screening gateway.
///
/// A gateway without an endpoint is not a startup error: its calls fail
/// individually with `GatewayError::ConfigurationMissing`.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub endpoints: BTreeMap<GatewayId, Url>,
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut endpoints = BTreeMap::new();
        for gateway in GatewayId::ALL {
            let primary = gateway.endpoint_variable();
            let fallback = format!("{PUBLIC_ENDPOINT_PREFIX}{primary}");
            let Some((variable, raw)) = [primary, fallback]
                .into_iter()
                .find_map(|variable| non_blank_var(&variable).map(|raw| (variable, raw)))
            else {
                continue;
            };
            let url = Url::parse(&raw)
                .map_err(|source| ConfigError::InvalidGatewayUrl { variable, source })?;
            endpoints.insert(gateway, url);
        }

        let timeout = match env::var("APP_GATEWAY_TIMEOUT_SECS") {
            Ok(raw) if !raw.trim().is_empty() => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidGatewayTimeout)?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        Ok(Self { endpoints, timeout })
    }

    pub fn endpoint(&self, gateway: GatewayId) -> Option<&Url> {
        self.endpoints.get(&gateway)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidGatewayUrl {
        variable: String,
        source: url::ParseError,
    },
    InvalidGatewayTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidGatewayUrl { variable, .. } => {
                write!(f, "{variable} must be an absolute URL")
            }
            ConfigError::InvalidGatewayTimeout => {
                write!(f, "APP_GATEWAY_TIMEOUT_SECS must be a whole number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidGatewayTimeout => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidGatewayUrl { source, .. } => Some(source),
        }
    }
}
