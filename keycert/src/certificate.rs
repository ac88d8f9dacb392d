//! Certificate envelope parsing.
//!
//! A certificate is an armored base64 blob:
//!
//! ```text
//! -----BEGIN LICENSE FILE-----
//! eyJlbmMiOiIuLi4iLCJzaWciOiIuLi4iLCJhbGciOiJhZXMtMjU2LWdjbStlZDI1NTE5In0=
//! -----END LICENSE FILE-----
//! ```
//!
//! The blob decodes to `{"enc": string, "alg": string, "sig": string|null, "meta"?: object}`.
//! Line endings (LF, CRLF or bare CR) and wrap width do not matter.

use crate::encoding::decode_base64_lenient;
use crate::error::{CertError, CertResult};
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const HEADER_PREFIX: &str = "-----BEGIN ";
const FOOTER_PREFIX: &str = "-----END ";
const ARMOR_SUFFIX: &str = " FILE-----";

/// Longest kind token echoed back in a parse error.
const MAX_KIND_ECHO: usize = 16;

/// Which kind of file a certificate was issued as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertificateKind {
    /// A license file, encrypted with the license key alone.
    License,
    /// A machine file, encrypted with the license key and the machine fingerprint.
    Machine,
}

impl CertificateKind {
    /// Returns the upper-case token used in the armor lines.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::License => "LICENSE",
            Self::Machine => "MACHINE",
        }
    }

    /// Returns the lower-case prefix of the detached signature message.
    #[must_use]
    pub fn signing_prefix(&self) -> &'static str {
        match self {
            Self::License => "license",
            Self::Machine => "machine",
        }
    }
}

impl fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateKind {
    type Err = CertError;

    fn from_str(s: &str) -> CertResult<Self> {
        match s {
            "LICENSE" => Ok(Self::License),
            "MACHINE" => Ok(Self::Machine),
            other => {
                let shown: String = other.chars().take(MAX_KIND_ECHO).collect();
                Err(CertError::MalformedCertificate(format!(
                    "unsupported certificate kind: {shown}"
                )))
            }
        }
    }
}

/// Decoding strategy selected by the `alg` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// `aes-256-gcm[+scheme]`: `ciphertext.iv.tag`, each base64.
    AeadAes256Gcm,
    /// `base64+scheme`: the payload is plain base64 JSON.
    PlainBase64,
    /// Anything else; carries the raw identifier.
    Unsupported(String),
}

impl Algorithm {
    /// Resolves an `alg` identifier by prefix.
    #[must_use]
    pub fn from_id(id: &str) -> Self {
        if id.starts_with("aes-256-gcm") {
            Self::AeadAes256Gcm
        } else if id.starts_with("base64+") {
            Self::PlainBase64
        } else {
            Self::Unsupported(id.to_string())
        }
    }
}

/// A parsed certificate. Immutable once constructed.
///
/// Equality ignores the retained raw text, so the same logical content
/// compares equal regardless of line endings or wrap width.
#[derive(Debug, Clone)]
pub struct Certificate {
    kind: CertificateKind,
    algorithm: Algorithm,
    algorithm_id: String,
    encoded_payload: String,
    signature: Option<String>,
    metadata: Option<Map<String, Value>>,
    raw_text: String,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.algorithm_id == other.algorithm_id
            && self.encoded_payload == other.encoded_payload
            && self.signature == other.signature
            && self.metadata == other.metadata
    }
}

impl Eq for Certificate {}

impl FromStr for Certificate {
    type Err = CertError;

    fn from_str(s: &str) -> CertResult<Self> {
        Self::parse(s)
    }
}

impl Certificate {
    /// Parses armored certificate text.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::MalformedCertificate`] with the failing check as cause.
    pub fn parse(text: &str) -> CertResult<Self> {
        let trimmed = text.trim_end();
        if trimmed.is_empty() {
            return Err(malformed("empty certificate"));
        }
        // CR, LF and CRLF all end a line; CRLF leaves blank pieces that the body join drops.
        let lines: Vec<&str> = trimmed.split(['\r', '\n']).map(str::trim).collect();
        let (first, rest) = lines
            .split_first()
            .ok_or_else(|| malformed("empty certificate"))?;

        let kind: CertificateKind = first
            .strip_prefix(HEADER_PREFIX)
            .and_then(|s| s.strip_suffix(ARMOR_SUFFIX))
            .ok_or_else(|| malformed("malformed certificate header"))?
            .parse()?;

        let (last, body) = rest
            .split_last()
            .ok_or_else(|| malformed("missing certificate footer"))?;
        let footer_kind = last
            .strip_prefix(FOOTER_PREFIX)
            .and_then(|s| s.strip_suffix(ARMOR_SUFFIX))
            .ok_or_else(|| malformed("malformed certificate footer"))?;
        if footer_kind != kind.as_str() {
            return Err(malformed(&format!(
                "footer kind {footer_kind} does not match header kind {kind}"
            )));
        }

        let blob: String = body.concat();
        let decoded =
            decode_base64_lenient(&blob).map_err(|_| malformed("invalid base64 payload"))?;
        let envelope: Value =
            serde_json::from_slice(&decoded).map_err(|_| malformed("invalid JSON payload"))?;
        let Value::Object(mut fields) = envelope else {
            return Err(malformed("payload is not a JSON object"));
        };

        let encoded_payload = take_string(&mut fields, "enc")?;
        let algorithm_id = take_string(&mut fields, "alg")?;
        let signature = match fields.remove("sig") {
            None => return Err(malformed("certificate missing 'sig'")),
            Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(_) => return Err(malformed("'sig' must be a string or null")),
        };
        let metadata = match fields.remove("meta") {
            Some(Value::Object(map)) => Some(map),
            Some(Value::Null) | None => None,
            Some(_) => {
                debug!("ignoring non-object certificate meta");
                None
            }
        };

        let algorithm = Algorithm::from_id(&algorithm_id);
        debug!(%kind, alg = %algorithm_id, signed = signature.is_some(), "parsed certificate");

        Ok(Self {
            kind,
            algorithm,
            algorithm_id,
            encoded_payload,
            signature,
            metadata,
            raw_text: text.to_string(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> CertificateKind {
        self.kind
    }

    /// Returns the resolved decoding strategy.
    #[must_use]
    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    /// Returns the `alg` identifier exactly as issued.
    #[must_use]
    pub fn algorithm_id(&self) -> &str {
        &self.algorithm_id
    }

    /// Returns the signature scheme suffix of the identifier, e.g. `ed25519`.
    #[must_use]
    pub fn signature_scheme(&self) -> Option<&str> {
        self.algorithm_id.split_once('+').map(|(_, scheme)| scheme)
    }

    #[must_use]
    pub fn encoded_payload(&self) -> &str {
        &self.encoded_payload
    }

    /// Returns the base64 detached signature, if the issuer signed the file.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    /// Returns the text this certificate was parsed from.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Returns the message covered by the detached signature: `kind/enc`.
    #[must_use]
    pub fn signing_message(&self) -> String {
        format!("{}/{}", self.kind.signing_prefix(), self.encoded_payload)
    }

    /// Returns `meta.issued`, if present and RFC 3339.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.meta_timestamp("issued")
    }

    /// Returns `meta.expiry`, if present and RFC 3339.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.meta_timestamp("expiry")
    }

    /// Returns `meta.ttl` in seconds as a duration.
    #[must_use]
    pub fn ttl(&self) -> Option<TimeDelta> {
        self.metadata
            .as_ref()?
            .get("ttl")?
            .as_i64()
            .and_then(TimeDelta::try_seconds)
    }

    /// Returns true if the file carries an expiry and `now` is at or past it.
    ///
    /// Parsing never enforces expiry; callers opt in with this check.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| now >= exp)
    }

    fn meta_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        let raw = self.metadata.as_ref()?.get(field)?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn malformed(cause: &str) -> CertError {
    CertError::MalformedCertificate(cause.to_string())
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> CertResult<String> {
    match fields.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(malformed(&format!("'{key}' must be a string"))),
        None => Err(malformed(&format!("certificate missing '{key}'"))),
    }
}
