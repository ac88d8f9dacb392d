//! Ed25519 public keys and detached certificate signatures.
//!
//! The issuer signs the UTF-8 bytes of `"{kind}/{enc}"` where `kind` is the
//! lower-case certificate kind and `enc` the encoded payload exactly as it
//! appears in the envelope.

use crate::certificate::Certificate;
use crate::encoding::decode_base64_lenient;
use crate::error::{CertError, CertResult};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::{debug, warn};

/// Size of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// An Ed25519 verifying key supplied by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Builds a key from its 32 raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::InvalidPublicKey`] if the bytes are not a valid point.
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_SIZE]) -> CertResult<Self> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| CertError::InvalidPublicKey("not a valid Ed25519 point".to_string()))
    }

    /// Builds a key from its hex encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::InvalidPublicKey`] on bad hex, wrong length or an invalid point.
    pub fn from_hex(hex_key: &str) -> CertResult<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|_| CertError::InvalidPublicKey("not valid hex".to_string()))?;
        let bytes: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| {
            CertError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_SIZE} bytes, got {}",
                b.len()
            ))
        })?;
        Self::from_bytes(&bytes)
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Returns true if `signature` is a valid signature over `message`.
    ///
    /// Malformed signature bytes simply fail verification.
    #[must_use]
    pub fn verifies(&self, message: &[u8], signature: &[u8]) -> bool {
        Signature::from_slice(signature)
            .map(|sig| self.0.verify(message, &sig).is_ok())
            .unwrap_or(false)
    }
}

/// Verifies the detached signature of a certificate.
///
/// Without a public key, or when the certificate is unsigned, this is a
/// no-op so callers can run without online trust material. When both are
/// present the signature must verify.
///
/// # Errors
///
/// Returns [`CertError::InvalidSignature`] if the signature is present but does not verify.
pub fn verify_signature(cert: &Certificate, public_key: Option<&PublicKey>) -> CertResult<()> {
    let Some(key) = public_key else {
        debug!(kind = %cert.kind(), "no public key configured, skipping signature check");
        return Ok(());
    };
    let Some(sig_b64) = cert.signature() else {
        debug!(kind = %cert.kind(), "certificate is unsigned, skipping signature check");
        return Ok(());
    };

    let sig_bytes = decode_base64_lenient(sig_b64).map_err(|_| CertError::InvalidSignature)?;
    if key.verifies(cert.signing_message().as_bytes(), &sig_bytes) {
        debug!(kind = %cert.kind(), "certificate signature verified");
        Ok(())
    } else {
        warn!(kind = %cert.kind(), "certificate signature rejected");
        Err(CertError::InvalidSignature)
    }
}

impl Certificate {
    /// Verifies this certificate's detached signature. See [`verify_signature`].
    ///
    /// # Errors
    ///
    /// Returns [`CertError::InvalidSignature`] if the signature is present but does not verify.
    pub fn verify(&self, public_key: Option<&PublicKey>) -> CertResult<()> {
        verify_signature(self, public_key)
    }
}
