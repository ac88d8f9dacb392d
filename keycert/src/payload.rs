//! Payload decryption.
//!
//! `aes-256-gcm` payloads are `base64(ciphertext).base64(iv).base64(tag)`,
//! encrypted under `SHA-256(license_key)` for license files and
//! `SHA-256(license_key || fingerprint)` for machine files, with empty
//! associated data. `base64+` payloads are plain base64 JSON.
//!
//! Every failure after the envelope shape has been checked is reported as
//! [`CertError::DecryptionFailed`] without saying which step failed.

use crate::certificate::{Algorithm, Certificate, CertificateKind};
use crate::encoding::decode_base64_lenient;
use crate::error::{CertError, CertResult};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the derived AES key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM initialization vector in bytes.
pub const IV_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A symmetric key derived from license secrets, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PayloadKey {
    bytes: [u8; KEY_SIZE],
}

impl PayloadKey {
    /// Derives the key for a certificate kind.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::MissingFingerprint`] for a machine file without a
    /// non-empty fingerprint.
    pub fn derive(
        kind: CertificateKind,
        license_key: &str,
        fingerprint: Option<&str>,
    ) -> CertResult<Self> {
        let mut hasher = Sha256::new();
        hasher.update(license_key.as_bytes());
        if kind == CertificateKind::Machine {
            let fingerprint = fingerprint
                .filter(|f| !f.is_empty())
                .ok_or(CertError::MissingFingerprint)?;
            hasher.update(fingerprint.as_bytes());
        }
        Ok(Self {
            bytes: hasher.finalize().into(),
        })
    }

    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The three decoded parts of an AEAD payload.
struct SealedPayload {
    ciphertext: Vec<u8>,
    iv: [u8; IV_SIZE],
    tag: [u8; TAG_SIZE],
}

impl SealedPayload {
    fn parse(encoded: &str) -> CertResult<Self> {
        let segments: Vec<&str> = encoded.split('.').collect();
        let [ct_b64, iv_b64, tag_b64] = segments.as_slice() else {
            return Err(CertError::MalformedCiphertextEnvelope(format!(
                "expected 3 dot-separated segments, got {}",
                segments.len()
            )));
        };

        let ciphertext = decode_segment(ct_b64)?;
        let iv = decode_segment(iv_b64)?;
        let tag = decode_segment(tag_b64)?;

        let iv: [u8; IV_SIZE] = iv.try_into().map_err(|iv: Vec<u8>| {
            CertError::MalformedCiphertextEnvelope(format!(
                "IV must be {IV_SIZE} bytes, got {}",
                iv.len()
            ))
        })?;
        let tag: [u8; TAG_SIZE] = tag.try_into().map_err(|tag: Vec<u8>| {
            CertError::MalformedCiphertextEnvelope(format!(
                "tag must be {TAG_SIZE} bytes, got {}",
                tag.len()
            ))
        })?;

        Ok(Self {
            ciphertext,
            iv,
            tag,
        })
    }

    fn open(self, key: &PayloadKey) -> CertResult<Vec<u8>> {
        let cipher = Aes256Gcm::new(key.as_bytes().into());
        let mut sealed = self.ciphertext;
        sealed.extend_from_slice(&self.tag);
        cipher
            .decrypt(
                Nonce::from_slice(&self.iv),
                Payload {
                    msg: &sealed,
                    aad: b"",
                },
            )
            .map_err(|_| CertError::DecryptionFailed)
    }
}

/// A segment that fails to decode has been tampered with, not mis-shaped.
fn decode_segment(segment: &str) -> CertResult<Vec<u8>> {
    decode_base64_lenient(segment).map_err(|_| CertError::DecryptionFailed)
}

/// Decrypts or decodes a certificate payload into a JSON value.
///
/// `fingerprint` is only consulted for machine files.
///
/// # Errors
///
/// - [`CertError::UnsupportedAlgorithm`] for an unknown `alg`
/// - [`CertError::MissingFingerprint`] for a machine file without a fingerprint
/// - [`CertError::MalformedCiphertextEnvelope`] for a mis-shaped AEAD payload
/// - [`CertError::DecryptionFailed`] if authentication or decoding fails
/// - [`CertError::MalformedCertificate`] if a plain payload is not base64 JSON
pub fn decrypt_payload(
    cert: &Certificate,
    license_key: &str,
    fingerprint: Option<&str>,
) -> CertResult<Value> {
    decrypt_payload_as(cert, license_key, fingerprint)
}

/// Like [`decrypt_payload`], deserializing straight into `T`.
///
/// # Errors
///
/// Same as [`decrypt_payload`]; a plaintext that does not fit `T` counts as a
/// decoding failure.
pub fn decrypt_payload_as<T: DeserializeOwned>(
    cert: &Certificate,
    license_key: &str,
    fingerprint: Option<&str>,
) -> CertResult<T> {
    match cert.algorithm() {
        Algorithm::AeadAes256Gcm => {
            let key = PayloadKey::derive(cert.kind(), license_key, fingerprint)?;
            let sealed = SealedPayload::parse(cert.encoded_payload())?;
            let plaintext = sealed.open(&key).inspect_err(|_| {
                warn!(kind = %cert.kind(), "payload authentication failed");
            })?;
            let value = parse_json(&plaintext).ok_or(CertError::DecryptionFailed)?;
            debug!(kind = %cert.kind(), "payload decrypted");
            Ok(value)
        }
        Algorithm::PlainBase64 => decode_base64_lenient(cert.encoded_payload())
            .ok()
            .and_then(|bytes| parse_json(&bytes))
            .ok_or_else(|| {
                CertError::MalformedCertificate("invalid base64/JSON payload".to_string())
            }),
        Algorithm::Unsupported(id) => Err(CertError::UnsupportedAlgorithm(id.clone())),
    }
}

fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    let text = std::str::from_utf8(bytes).ok()?;
    serde_json::from_str(text).ok()
}

impl Certificate {
    /// Decrypts this certificate's payload. See [`decrypt_payload`].
    ///
    /// # Errors
    ///
    /// Same as [`decrypt_payload`].
    pub fn decrypt(&self, license_key: &str, fingerprint: Option<&str>) -> CertResult<Value> {
        decrypt_payload(self, license_key, fingerprint)
    }

    /// Decrypts this certificate's payload into `T`. See [`decrypt_payload_as`].
    ///
    /// # Errors
    ///
    /// Same as [`decrypt_payload_as`].
    pub fn decrypt_as<T: DeserializeOwned>(
        &self,
        license_key: &str,
        fingerprint: Option<&str>,
    ) -> CertResult<T> {
        decrypt_payload_as(self, license_key, fingerprint)
    }
}
