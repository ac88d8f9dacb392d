//! Signed API response verification.
//!
//! The license authority signs each response over a four-line signing string:
//!
//! ```text
//! (request-target): get /v1/accounts/acme/licenses?limit=10
//! host: api.keygen.sh
//! date: Wed, 09 Jun 2021 16:08:15 GMT
//! digest: sha-256=<base64 sha256 of body>
//! ```
//!
//! and carries the result in a `Keygen-Signature` header. Checks run in a
//! fixed order so callers get the most specific diagnosis: signature header,
//! body digest, date, then the signature itself.

use crate::encoding::{decode_base64_lenient, encode_request_target};
use crate::error::{CertError, CertResult};
use crate::signature::PublicKey;
use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Header carrying the response signature parameters.
pub const SIGNATURE_HEADER: &str = "Keygen-Signature";

/// Header carrying the body digest.
pub const DIGEST_HEADER: &str = "Digest";

/// Header carrying the response date.
pub const DATE_HEADER: &str = "Date";

/// The only signature algorithm accepted in the signature header.
pub const SIGNATURE_ALGORITHM: &str = "ed25519";

/// An HTTP response as seen by the verifier.
pub trait SignedResponse {
    /// Looks up a header value; names compare case-insensitively.
    fn header(&self, name: &str) -> Option<&str>;

    /// Returns the raw body bytes exactly as received.
    fn body(&self) -> &[u8];
}

/// An owned, already-received response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedResponse {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl CapturedResponse {
    /// Creates a response with the given body and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Appends a header. Lookup returns the first match.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builds a response from header pairs and body bytes.
    pub fn from_parts<I, K, V>(headers: I, body: impl Into<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            body: body.into(),
        }
    }
}

impl SignedResponse for CapturedResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Inputs of one response signing string. Built per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    /// Lower-case HTTP method.
    pub method: String,
    /// Percent-encoded request target.
    pub uri: String,
    pub host: String,
    pub date: String,
    /// `sha-256=<base64>` of the body.
    pub digest: String,
}

impl SigningContext {
    /// Builds a context, normalizing the method and escaping the URI.
    pub fn new(method: &str, uri: &str, host: &str, date: &str, digest: String) -> Self {
        Self {
            method: method.to_ascii_lowercase(),
            uri: encode_request_target(uri),
            host: host.to_string(),
            date: date.to_string(),
            digest,
        }
    }

    /// Returns the four-line signing string, no trailing newline.
    #[must_use]
    pub fn signing_string(&self) -> String {
        format!(
            "(request-target): {} {}\nhost: {}\ndate: {}\ndigest: {}",
            self.method, self.uri, self.host, self.date, self.digest
        )
    }
}

/// Returns `sha-256=<base64(sha256(body))>`.
#[must_use]
pub fn body_digest(body: &[u8]) -> String {
    format!("sha-256={}", STANDARD.encode(Sha256::digest(body)))
}

/// Splits a signature header into its `key=value` parameters.
///
/// Values may be double-quoted. Parts without `=` are skipped.
#[must_use]
pub fn parse_signature_params(header: &str) -> HashMap<String, String> {
    header
        .split(',')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().trim_matches('"').to_string()))
        .collect()
}

/// Verifies that a response was signed by the holder of `public_key`.
///
/// `uri` is the request path and query as sent; `host` and `method` are the
/// values the authority signs with.
///
/// # Errors
///
/// In evaluation order:
/// - [`CertError::MissingSignature`] if the signature header is absent or empty
/// - [`CertError::UnsupportedAlgorithm`] unless `algorithm` is exactly `ed25519`
/// - [`CertError::MissingSignature`] if the `signature` parameter is absent
/// - [`CertError::DigestMismatch`] if the body does not match the `Digest` header
/// - [`CertError::MissingHeader`] if there is no `Date` header
/// - [`CertError::SignatureVerificationFailed`] if the signature does not verify
pub fn verify_response_signature<R: SignedResponse + ?Sized>(
    response: &R,
    uri: &str,
    public_key: &PublicKey,
    host: &str,
    method: &str,
) -> CertResult<()> {
    let header = response
        .header(SIGNATURE_HEADER)
        .filter(|h| !h.trim().is_empty())
        .ok_or(CertError::MissingSignature)?;
    let params = parse_signature_params(header);

    match params.get("algorithm").map(String::as_str) {
        Some(SIGNATURE_ALGORITHM) => {}
        Some(other) => return Err(CertError::UnsupportedAlgorithm(other.to_string())),
        None => {
            return Err(CertError::UnsupportedAlgorithm(
                "no algorithm in signature header".to_string(),
            ));
        }
    }
    let signature_b64 = params
        .get("signature")
        .filter(|s| !s.is_empty())
        .ok_or(CertError::MissingSignature)?;

    let digest = body_digest(response.body());
    if response.header(DIGEST_HEADER) != Some(digest.as_str()) {
        warn!(uri, "response digest mismatch");
        return Err(CertError::DigestMismatch);
    }

    let date = response
        .header(DATE_HEADER)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| CertError::MissingHeader(DATE_HEADER.to_string()))?;

    let context = SigningContext::new(method, uri, host, date, digest);
    let signature = decode_base64_lenient(signature_b64)
        .map_err(|_| CertError::SignatureVerificationFailed)?;

    if public_key.verifies(context.signing_string().as_bytes(), &signature) {
        debug!(uri, "response signature verified");
        Ok(())
    } else {
        warn!(uri, "response signature rejected");
        Err(CertError::SignatureVerificationFailed)
    }
}
