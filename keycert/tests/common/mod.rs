//! Shared fixtures: issue certificates and signed responses the way the
//! license authority does.

#![allow(dead_code)]

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signer, SigningKey};
use keycert::{body_digest, CapturedResponse, PublicKey, SigningContext};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

pub const LICENSE_KEY: &str = "C1B6DE-39A6E3-DE1529-8559A0-4AF593-V3";
pub const FINGERPRINT: &str = "3a:4f:9b:1c:7e:22:d0:11";
pub const API_HOST: &str = "api.keygen.sh";
pub const DATE: &str = "Wed, 09 Jun 2021 16:08:15 GMT";

/// Installs a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, PublicKey) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let public_key = PublicKey::from_bytes(&signing_key.verifying_key().to_bytes()).unwrap();
    (signing_key, public_key)
}

/// A second, unrelated key pair.
pub fn other_keypair() -> (SigningKey, PublicKey) {
    let signing_key = SigningKey::from_bytes(&[7u8; 32]);
    let public_key = PublicKey::from_bytes(&signing_key.verifying_key().to_bytes()).unwrap();
    (signing_key, public_key)
}

pub fn sample_payload() -> Value {
    json!({
        "meta": { "issued": "2021-06-09T16:08:15Z", "expiry": "2021-07-09T16:08:15Z", "ttl": 2592000 },
        "data": {
            "id": "4097d726-6cc5-4156-8575-3a96387e19b4",
            "type": "licenses",
            "attributes": { "name": "Pro", "maxMachines": 5, "status": "ACTIVE" }
        }
    })
}

/// Encrypts `plaintext` as `base64(ct).base64(iv).base64(tag)` under `SHA-256(secret)`.
pub fn seal(secret: &str, plaintext: &[u8]) -> String {
    let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
    let cipher = Aes256Gcm::new(&key.into());
    let iv: [u8; 12] = rand::random();
    let sealed = cipher.encrypt(Nonce::from_slice(&iv), plaintext).unwrap();
    let (ct, tag) = sealed.split_at(sealed.len() - 16);
    format!(
        "{}.{}.{}",
        STANDARD.encode(ct),
        STANDARD.encode(iv),
        STANDARD.encode(tag)
    )
}

/// Signs `"{kind}/{enc}"` and returns the base64 signature.
pub fn sign_enc(signing_key: &SigningKey, kind: &str, enc: &str) -> String {
    let message = format!("{}/{enc}", kind.to_lowercase());
    STANDARD.encode(signing_key.sign(message.as_bytes()).to_bytes())
}

/// Wraps an envelope object in armor, wrapping base64 at `width` with `newline`.
pub fn armor(kind: &str, envelope: &Value, width: usize, newline: &str) -> String {
    let blob = STANDARD.encode(serde_json::to_vec(envelope).unwrap());
    let mut out = format!("-----BEGIN {kind} FILE-----{newline}");
    for chunk in blob.as_bytes().chunks(width) {
        out.push_str(std::str::from_utf8(chunk).unwrap());
        out.push_str(newline);
    }
    out.push_str(&format!("-----END {kind} FILE-----{newline}"));
    out
}

/// Builds a signed AEAD certificate for `kind` encrypted with `secret`.
pub fn issue_encrypted(
    signing_key: &SigningKey,
    kind: &str,
    secret: &str,
    payload: &Value,
) -> String {
    let enc = seal(secret, &serde_json::to_vec(payload).unwrap());
    let sig = sign_enc(signing_key, kind, &enc);
    armor(
        kind,
        &json!({ "enc": enc, "sig": sig, "alg": "aes-256-gcm+ed25519", "meta": payload["meta"] }),
        64,
        "\n",
    )
}

/// Builds a signed plain-base64 certificate.
pub fn issue_plain(signing_key: &SigningKey, kind: &str, payload: &Value) -> String {
    let enc = STANDARD.encode(serde_json::to_vec(payload).unwrap());
    let sig = sign_enc(signing_key, kind, &enc);
    armor(
        kind,
        &json!({ "enc": enc, "sig": sig, "alg": "base64+ed25519" }),
        64,
        "\n",
    )
}

/// Builds a response signed the way the license authority signs it.
pub fn signed_response(
    signing_key: &SigningKey,
    method: &str,
    uri: &str,
    body: &str,
) -> CapturedResponse {
    let digest = body_digest(body.as_bytes());
    let context = SigningContext::new(method, uri, API_HOST, DATE, digest.clone());
    let signature = STANDARD.encode(signing_key.sign(context.signing_string().as_bytes()).to_bytes());
    CapturedResponse::new(body)
        .with_header("Content-Type", "application/vnd.api+json")
        .with_header("Date", DATE)
        .with_header("Digest", digest)
        .with_header(
            "Keygen-Signature",
            format!(
                r#"keyid="acct-1", algorithm="ed25519", signature="{signature}", headers="(request-target) host date digest""#
            ),
        )
}
