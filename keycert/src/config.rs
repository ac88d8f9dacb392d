//! Trust configuration.
//!
//! Public key material comes from configuration and is never fetched.

use crate::error::{CertError, CertResult};
use crate::response::{verify_response_signature, SignedResponse};
use crate::signature::PublicKey;
use serde::{Deserialize, Serialize};

/// Default host the license authority signs responses with.
pub const DEFAULT_API_HOST: &str = "api.keygen.sh";

/// Default HTTP method in the response signing string.
pub const DEFAULT_HTTP_METHOD: &str = "get";

/// Trust material and response-signing expectations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustConfig {
    /// Hex-encoded Ed25519 public key of the issuer. `None` runs offline.
    #[serde(default)]
    pub public_key_hex: Option<String>,
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_http_method")]
    pub http_method: String,
}

fn default_api_host() -> String {
    DEFAULT_API_HOST.to_string()
}

fn default_http_method() -> String {
    DEFAULT_HTTP_METHOD.to_string()
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            public_key_hex: None,
            api_host: default_api_host(),
            http_method: default_http_method(),
        }
    }
}

impl TrustConfig {
    /// Creates a config trusting the given hex public key with default host and method.
    pub fn with_public_key(public_key_hex: impl Into<String>) -> Self {
        Self {
            public_key_hex: Some(public_key_hex.into()),
            ..Self::default()
        }
    }

    /// Parses the configured public key. A missing key yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::InvalidPublicKey`] if the key is present but invalid.
    pub fn verifying_key(&self) -> CertResult<Option<PublicKey>> {
        self.public_key_hex
            .as_deref()
            .map(PublicKey::from_hex)
            .transpose()
    }

    /// Verifies a response against the configured key, host and method.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::InvalidPublicKey`] if no valid key is configured,
    /// otherwise the errors of [`verify_response_signature`].
    pub fn verify_response<R: SignedResponse + ?Sized>(
        &self,
        response: &R,
        uri: &str,
    ) -> CertResult<()> {
        let key = self.verifying_key()?.ok_or_else(|| {
            CertError::InvalidPublicKey("no public key configured".to_string())
        })?;
        verify_response_signature(response, uri, &key, &self.api_host, &self.http_method)
    }
}
