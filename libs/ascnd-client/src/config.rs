//! Client Configuration
//!
//! `ClientOptions` is the raw, deserializable input (builder, environment,
//! config file). `validate` turns it into an immutable `ClientConfig`; no
//! client can be built from options that fail validation.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use tonic::transport::{Certificate, ClientTlsConfig, Endpoint};
use url::Url;

use crate::error::ConfigError;

/// Production endpoint of the Ascnd API
pub const DEFAULT_ENDPOINT: &str = "https://api.ascnd.gg";

/// Per-call timeout applied when none is configured
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;

/// Prefix of the environment variables read by [`ClientOptions::from_env`]
pub const ENV_PREFIX: &str = "ASCND_";

#[derive(Debug, Deserialize)]
pub struct ClientOptions {
    /// Service endpoint, http or https
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key sent as `x-api-key` on every call
    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    /// Per-call deadline in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: i64,

    /// TCP/TLS connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: i64,

    /// HTTP/2 keep-alive interval in seconds
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    /// HTTP/2 keep-alive timeout in seconds
    #[serde(default = "default_keepalive_timeout_secs")]
    pub keepalive_timeout_secs: u64,

    /// Optional domain name override for TLS SNI/verification
    #[serde(default)]
    pub tls_domain_name: Option<String>,

    /// Optional extra CA certificate (PEM) trusted for https endpoints
    #[serde(default)]
    pub tls_ca_cert_path: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_timeout_secs() -> i64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> i64 {
    10
}

fn default_keepalive_interval_secs() -> u64 {
    30
}

fn default_keepalive_timeout_secs() -> u64 {
    10
}

impl ClientOptions {
    /// Options for the production endpoint with default timeouts
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: SecretString::from(api_key.into()),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            keepalive_timeout_secs: default_keepalive_timeout_secs(),
            tls_domain_name: None,
            tls_ca_cert_path: None,
        }
    }

    /// Load options from `ASCND_*` environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Unset variables fall back to the defaults above.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Ok(envy::prefixed(ENV_PREFIX).from_env::<Self>()?)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: i64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_connect_timeout_secs(mut self, secs: i64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_tls_domain_name(mut self, domain: impl Into<String>) -> Self {
        self.tls_domain_name = Some(domain.into());
        self
    }

    pub fn with_tls_ca_cert_path(mut self, path: impl Into<String>) -> Self {
        self.tls_ca_cert_path = Some(path.into());
        self
    }

    /// Check every field and freeze the result.
    pub fn validate(self) -> Result<ClientConfig, ConfigError> {
        let key = self.api_key.expose_secret();
        if key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !key.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
            return Err(ConfigError::InvalidApiKey);
        }

        let endpoint = parse_endpoint(&self.endpoint)?;
        let request_timeout = positive_secs("timeout_secs", self.timeout_secs)?;
        let connect_timeout = positive_secs("connect_timeout_secs", self.connect_timeout_secs)?;

        Ok(ClientConfig {
            endpoint,
            api_key: self.api_key,
            request_timeout,
            connect_timeout,
            keepalive_interval: Duration::from_secs(self.keepalive_interval_secs),
            keepalive_timeout: Duration::from_secs(self.keepalive_timeout_secs),
            tls_domain_name: self.tls_domain_name,
            tls_ca_cert_path: self.tls_ca_cert_path,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingEndpoint);
    }

    let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidEndpoint {
        endpoint: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidEndpoint {
            endpoint: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Longest timeout applied; larger values are clamped so deadlines stay
/// representable both as an `Instant` and as a `grpc-timeout` header.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(86_400 * 365);

fn positive_secs(field: &'static str, value: i64) -> Result<Duration, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::NonPositiveTimeout { field, value });
    }
    Ok(Duration::from_secs(value as u64).min(MAX_TIMEOUT))
}

/// Validated, immutable client configuration
#[derive(Debug)]
pub struct ClientConfig {
    endpoint: Url,
    api_key: SecretString,
    request_timeout: Duration,
    connect_timeout: Duration,
    keepalive_interval: Duration,
    keepalive_timeout: Duration,
    tls_domain_name: Option<String>,
    tls_ca_cert_path: Option<String>,
}

impl ClientConfig {
    /// `ClientOptions::from_env` followed by validation
    pub fn from_env() -> Result<Self, ConfigError> {
        ClientOptions::from_env()?.validate()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn uses_tls(&self) -> bool {
        self.endpoint.scheme() == "https"
    }

    /// Build a tonic Endpoint with timeouts/keepalive and TLS for https
    pub fn make_endpoint(&self) -> Result<Endpoint, ConfigError> {
        let mut ep = Endpoint::from_shared(self.endpoint.as_str().to_string())?
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .http2_keep_alive_interval(self.keepalive_interval)
            .keep_alive_timeout(self.keepalive_timeout)
            .tcp_nodelay(true);

        if self.uses_tls() {
            let mut tls = ClientTlsConfig::new().with_webpki_roots();

            if let Some(ca_path) = &self.tls_ca_cert_path {
                let ca_pem = fs::read(ca_path).map_err(|source| ConfigError::Certificate {
                    path: ca_path.clone(),
                    source,
                })?;
                tls = tls.ca_certificate(Certificate::from_pem(ca_pem));
            }

            if let Some(domain) = &self.tls_domain_name {
                tls = tls.domain_name(domain);
            }

            ep = ep.tls_config(tls)?;
        }

        Ok(ep)
    }
}
