//! Client-side API key interceptor
//!
//! Injects the `x-api-key` metadata header into every outgoing request.

use secrecy::{ExposeSecret, SecretString};
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

use crate::error::ConfigError;

/// Metadata key carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Interceptor holding the pre-parsed `x-api-key` header value
///
/// The header is parsed once at construction and cloned per request. The
/// value is marked sensitive so it is never rendered by `Debug`.
#[derive(Clone)]
pub struct ApiKeyInterceptor {
    api_key: AsciiMetadataValue,
}

impl ApiKeyInterceptor {
    pub fn new(api_key: &SecretString) -> Result<Self, ConfigError> {
        let mut api_key = AsciiMetadataValue::try_from(api_key.expose_secret())
            .map_err(|_| ConfigError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        Ok(Self { api_key })
    }
}

impl std::fmt::Debug for ApiKeyInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyInterceptor").finish_non_exhaustive()
    }
}

impl Interceptor for ApiKeyInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert(API_KEY_HEADER, self.api_key.clone());

        Ok(request)
    }
}
