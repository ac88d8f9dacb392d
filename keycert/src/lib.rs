//! Trust layer for license and machine certificates.
//!
//! This crate handles:
//! - Parsing armored `LICENSE FILE` / `MACHINE FILE` certificates
//! - Verifying the detached Ed25519 signature over a certificate
//! - Verifying signed responses from the license authority
//! - Decrypting AES-256-GCM payloads with keys derived from license secrets
//!
//! # Design Principles
//!
//! - **Pure functions**: no I/O, no shared state; callers read files and
//!   perform HTTP requests before handing the results over
//! - **Strict validation**: every structural check has its own error, and
//!   cryptographic failures collapse into a single coarse one
//! - **Offline-capable**: without a configured public key, signature checks
//!   are skipped rather than failed
//!
//! # Example
//!
//! ```no_run
//! use keycert::{open_certificate, OpenOptions, PublicKey};
//!
//! # fn main() -> keycert::CertResult<()> {
//! let text = std::fs::read_to_string("machine.lic").unwrap();
//! let key = PublicKey::from_hex("e8601e48b69383ba520245fd07971e983d06d22c4257cfd82304601479cee788")?;
//! let opened = open_certificate(
//!     &text,
//!     &OpenOptions::new("LICENSE-KEY").fingerprint("fp").public_key(&key),
//! )?;
//! println!("{}", opened.payload);
//! # Ok(())
//! # }
//! ```

mod certificate;
mod config;
mod encoding;
mod error;
mod payload;
mod response;
mod signature;

pub use certificate::{Algorithm, Certificate, CertificateKind};
pub use config::{TrustConfig, DEFAULT_API_HOST, DEFAULT_HTTP_METHOD};
pub use encoding::{decode_base64_lenient, encode_request_target};
pub use error::{CertError, CertResult};
pub use payload::{decrypt_payload, decrypt_payload_as, PayloadKey, IV_SIZE, KEY_SIZE, TAG_SIZE};
pub use response::{
    body_digest, parse_signature_params, verify_response_signature, CapturedResponse,
    SignedResponse, SigningContext, DATE_HEADER, DIGEST_HEADER, SIGNATURE_ALGORITHM,
    SIGNATURE_HEADER,
};
pub use signature::{verify_signature, PublicKey, PUBLIC_KEY_SIZE};

/// Secrets and trust material for [`open_certificate`].
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions<'a> {
    license_key: &'a str,
    fingerprint: Option<&'a str>,
    public_key: Option<&'a PublicKey>,
}

impl<'a> OpenOptions<'a> {
    pub fn new(license_key: &'a str) -> Self {
        Self {
            license_key,
            fingerprint: None,
            public_key: None,
        }
    }

    /// Sets the machine fingerprint, required for machine files.
    #[must_use]
    pub fn fingerprint(mut self, fingerprint: &'a str) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Sets the issuer key; without one the signature check is skipped.
    #[must_use]
    pub fn public_key(mut self, public_key: &'a PublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }
}

/// A certificate whose signature checked out and whose payload was decrypted.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedCertificate {
    pub certificate: Certificate,
    pub payload: serde_json::Value,
}

/// Parses, verifies and decrypts a certificate in one pass.
///
/// # Errors
///
/// Returns the first error from parsing, signature verification or decryption.
pub fn open_certificate(text: &str, options: &OpenOptions<'_>) -> CertResult<OpenedCertificate> {
    let certificate = Certificate::parse(text)?;
    certificate.verify(options.public_key)?;
    let payload = certificate.decrypt(options.license_key, options.fingerprint)?;
    Ok(OpenedCertificate {
        certificate,
        payload,
    })
}
