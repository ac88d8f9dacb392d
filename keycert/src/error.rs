//! Error types for certificate verification and decryption.
//!
//! Messages name the check that failed and nothing else: no key material,
//! no plaintext, no cipher-library fault text.

use thiserror::Error;

/// Certificate and response verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertError {
    /// The certificate envelope could not be parsed.
    #[error("malformed certificate: {0}")]
    MalformedCertificate(String),

    /// The algorithm identifier is not one this crate can handle.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Ed25519 verification of the certificate signature failed.
    #[error("certificate signature invalid")]
    InvalidSignature,

    /// A MACHINE certificate was opened without a fingerprint.
    #[error("machine fingerprint is required to decrypt a MACHINE certificate")]
    MissingFingerprint,

    /// The AEAD payload does not have the `ciphertext.iv.tag` shape.
    #[error("malformed ciphertext envelope: {0}")]
    MalformedCiphertextEnvelope(String),

    /// Authenticated decryption or decoding of the plaintext failed.
    #[error("payload decryption failed")]
    DecryptionFailed,

    /// A required response header was absent.
    #[error("missing response header: {0}")]
    MissingHeader(String),

    /// The response carries no signature.
    #[error("response signature is missing")]
    MissingSignature,

    /// The response body does not match its digest header.
    #[error("response digest did not match")]
    DigestMismatch,

    /// The response signature did not verify against the signing string.
    #[error("response signature verification failed")]
    SignatureVerificationFailed,

    /// Configured public key is not a valid hex-encoded Ed25519 key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

impl CertError {
    /// Stable identifier for mapping errors to exit codes or telemetry.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedCertificate(_) => "MALFORMED_CERTIFICATE",
            Self::UnsupportedAlgorithm(_) => "UNSUPPORTED_ALGORITHM",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MissingFingerprint => "MISSING_FINGERPRINT",
            Self::MalformedCiphertextEnvelope(_) => "MALFORMED_CIPHERTEXT_ENVELOPE",
            Self::DecryptionFailed => "DECRYPTION_FAILED",
            Self::MissingHeader(_) => "MISSING_HEADER",
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::DigestMismatch => "DIGEST_MISMATCH",
            Self::SignatureVerificationFailed => "SIGNATURE_VERIFICATION_FAILED",
            Self::InvalidPublicKey(_) => "INVALID_PUBLIC_KEY",
        }
    }
}

/// Result type for certificate operations.
pub type CertResult<T> = Result<T, CertError>;
