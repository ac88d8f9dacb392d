mod common;

use common::{
    issue_encrypted, other_keypair, sample_payload, test_keypair, FINGERPRINT, LICENSE_KEY,
};
use keycert::{open_certificate, CertError, CertificateKind, OpenOptions, TrustConfig};
use pretty_assertions::assert_eq;

fn machine_file() -> String {
    let (sk, _) = test_keypair();
    issue_encrypted(&sk, "MACHINE", &format!("{LICENSE_KEY}{FINGERPRINT}"), &sample_payload())
}

#[test]
fn opens_verified_machine_file() {
    common::init_tracing();
    let (_, pk) = test_keypair();
    let opened = open_certificate(
        &machine_file(),
        &OpenOptions::new(LICENSE_KEY).fingerprint(FINGERPRINT).public_key(&pk),
    )
    .unwrap();
    assert_eq!(opened.certificate.kind(), CertificateKind::Machine);
    assert_eq!(opened.payload, sample_payload());
}

#[test]
fn opens_offline_without_public_key() {
    let opened = open_certificate(
        &machine_file(),
        &OpenOptions::new(LICENSE_KEY).fingerprint(FINGERPRINT),
    )
    .unwrap();
    assert_eq!(opened.payload, sample_payload());
}

#[test]
fn untrusted_signature_stops_before_decryption() {
    let (_, other) = other_keypair();
    let result = open_certificate(
        &machine_file(),
        &OpenOptions::new(LICENSE_KEY).fingerprint(FINGERPRINT).public_key(&other),
    );
    assert_eq!(result, Err(CertError::InvalidSignature));
}

#[test]
fn parse_errors_surface_first() {
    let (_, pk) = test_keypair();
    let result = open_certificate("garbage", &OpenOptions::new(LICENSE_KEY).public_key(&pk));
    assert!(matches!(result, Err(CertError::MalformedCertificate(_))));
}

#[test]
fn missing_fingerprint_after_valid_signature() {
    let (_, pk) = test_keypair();
    let result = open_certificate(&machine_file(), &OpenOptions::new(LICENSE_KEY).public_key(&pk));
    assert_eq!(result, Err(CertError::MissingFingerprint));
}

#[test]
fn opens_with_key_from_config() {
    let (_, pk) = test_keypair();
    let config: TrustConfig =
        serde_json::from_str(&format!(r#"{{"public_key_hex":"{}"}}"#, hex::encode(pk.to_bytes())))
            .unwrap();
    let key = config.verifying_key().unwrap().unwrap();
    let opened = open_certificate(
        &machine_file(),
        &OpenOptions::new(LICENSE_KEY).fingerprint(FINGERPRINT).public_key(&key),
    )
    .unwrap();
    assert!(opened.certificate.expires_at().is_some());
}

// ── TrustConfig ──────────────────────────────────────────────────

#[test]
fn config_defaults() {
    let config: TrustConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, TrustConfig::default());
    assert_eq!(config.api_host, "api.keygen.sh");
    assert_eq!(config.http_method, "get");
    assert_eq!(config.verifying_key(), Ok(None));
}

#[test]
fn config_overrides() {
    let config: TrustConfig =
        serde_json::from_str(r#"{"api_host":"licensing.internal","http_method":"post"}"#).unwrap();
    assert_eq!(config.api_host, "licensing.internal");
    assert_eq!(config.http_method, "post");
}

#[test]
fn config_rejects_bad_key() {
    let config = TrustConfig::with_public_key("not-hex");
    assert!(matches!(config.verifying_key(), Err(CertError::InvalidPublicKey(_))));
}
