//! Shared test helpers for receipt tests.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signer, SigningKey};

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// A second key pair, for forged receipts.
pub fn other_keypair() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

/// Standard-base64 public key, as written in config files.
pub fn public_key_b64(public: &[u8; 32]) -> String {
    STANDARD.encode(public)
}

/// Creates a signed receipt body: `base64url(payload_json).base64url(signature)`.
pub fn sign_receipt(signing_key: &SigningKey, payload_json: &str) -> String {
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.as_bytes());
    let signature = signing_key.sign(payload_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
    format!("{payload_b64}.{sig_b64}")
}

/// Creates a signed receipt for `product_id` in `state`, purchased now.
pub fn make_receipt(signing_key: &SigningKey, product_id: &str, state: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    make_receipt_at(signing_key, product_id, state, now)
}

/// Creates a signed receipt with an explicit purchase timestamp.
pub fn make_receipt_at(signing_key: &SigningKey, product_id: &str, state: &str, iat: i64) -> String {
    let payload = format!(
        r#"{{"productId":"{product_id}","transactionId":"txn-{iat}","state":"{state}","iat":{iat}}}"#
    );
    sign_receipt(signing_key, &payload)
}
