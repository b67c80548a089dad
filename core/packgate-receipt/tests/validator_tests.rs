mod common;

use common::{make_receipt, make_receipt_at, other_keypair, sign_receipt, test_keypair};
use packgate_receipt::{
    CryptographicValidator, NoOpValidator, PurchaseState, Receipt, ReceiptValidator,
    ValidationError, MAX_CLOCK_SKEW_SECS,
};

fn validator() -> CryptographicValidator {
    let (_, pk) = test_keypair();
    CryptographicValidator::from_bytes(&pk).unwrap()
}

// ── NoOpValidator ────────────────────────────────────────────────

#[test]
fn noop_is_always_unavailable() {
    let receipt = Receipt::new("shop.pack01", "anything");
    let err = NoOpValidator.validate(&receipt).unwrap_err();
    assert!(matches!(err, ValidationError::Unavailable(_)));
    assert!(!err.is_rejection());
    assert_eq!(NoOpValidator.name(), "noop");
}

// ── Valid receipts ───────────────────────────────────────────────

#[test]
fn purchased_receipt_validates() {
    let (sk, _) = test_keypair();
    let receipt = Receipt::new("shop.pack01", make_receipt(&sk, "shop.pack01", "purchased"));

    let validated = validator().validate(&receipt).unwrap();
    assert_eq!(validated.product_id.as_str(), "shop.pack01");
    assert_eq!(validated.state, PurchaseState::Purchased);
    assert!(validated.state.is_active());
    assert!(validated.transaction_id.starts_with("txn-"));
}

#[test]
fn refunded_and_cancelled_states_are_reported() {
    let (sk, _) = test_keypair();
    for (state, expected) in [("refunded", PurchaseState::Refunded), ("cancelled", PurchaseState::Cancelled)] {
        let receipt = Receipt::new("shop.pack01", make_receipt(&sk, "shop.pack01", state));
        let validated = validator().validate(&receipt).unwrap();
        assert_eq!(validated.state, expected);
        assert!(!validated.state.is_active());
    }
}

#[test]
fn purchase_time_is_preserved() {
    let (sk, _) = test_keypair();
    let iat = 1_700_000_000;
    let receipt = Receipt::new("shop.pack02", make_receipt_at(&sk, "shop.pack02", "purchased", iat));
    let validated = validator().validate(&receipt).unwrap();
    assert_eq!(validated.purchased_at.timestamp(), iat);
}

#[test]
fn surrounding_whitespace_is_ignored() {
    let (sk, _) = test_keypair();
    let data = format!("  {}\n", make_receipt(&sk, "shop.pack01", "purchased"));
    assert!(validator().validate(&Receipt::new("shop.pack01", data)).is_ok());
}

// ── Rejections ───────────────────────────────────────────────────

#[test]
fn forged_signature_rejected() {
    let forged = make_receipt(&other_keypair(), "shop.pack01", "purchased");
    let err = validator().validate(&Receipt::new("shop.pack01", forged)).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidSignature));
    assert!(err.is_rejection());
}

#[test]
fn tampered_payload_rejected() {
    let (sk, _) = test_keypair();
    let genuine = make_receipt(&sk, "shop.pack01", "refunded");
    let (_, sig) = genuine.split_once('.').unwrap();
    let (other_payload, _) = make_receipt(&sk, "shop.pack01", "purchased")
        .split_once('.')
        .map(|(p, s)| (p.to_string(), s.to_string()))
        .unwrap();
    let tampered = format!("{other_payload}x.{sig}");

    let err = validator().validate(&Receipt::new("shop.pack01", tampered)).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidSignature));
}

#[test]
fn malformed_receipts_rejected() {
    for data in ["", "no-dot", "a.b.c", "payload.!!!notbase64!!!", "payload.AAAA"] {
        let err = validator().validate(&Receipt::new("shop.pack01", data)).unwrap_err();
        assert!(
            matches!(err, ValidationError::InvalidFormat(_)),
            "{data:?} gave {err:?}"
        );
    }
}

#[test]
fn signed_garbage_payload_rejected() {
    let (sk, _) = test_keypair();
    let data = sign_receipt(&sk, "not json at all");
    let err = validator().validate(&Receipt::new("shop.pack01", data)).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidPayload(_)));
}

#[test]
fn unknown_state_rejected() {
    let (sk, _) = test_keypair();
    let data = make_receipt(&sk, "shop.pack01", "stolen");
    let err = validator().validate(&Receipt::new("shop.pack01", data)).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidPayload(_)));
}

#[test]
fn receipt_for_other_product_rejected() {
    let (sk, _) = test_keypair();
    let data = make_receipt(&sk, "shop.pack02", "purchased");
    let err = validator().validate(&Receipt::new("shop.pack01", data)).unwrap_err();
    match err {
        ValidationError::ProductMismatch { expected, found } => {
            assert_eq!(expected, "shop.pack01");
            assert_eq!(found, "shop.pack02");
        }
        other => panic!("expected ProductMismatch, got {other:?}"),
    }
}

#[test]
fn empty_transaction_id_rejected() {
    let (sk, _) = test_keypair();
    let data = sign_receipt(
        &sk,
        r#"{"productId":"shop.pack01","transactionId":"","state":"purchased","iat":1700000000}"#,
    );
    assert!(matches!(
        validator().validate(&Receipt::new("shop.pack01", data)),
        Err(ValidationError::InvalidPayload(_))
    ));
}

#[test]
fn future_dated_receipt_rejected() {
    let (sk, _) = test_keypair();
    let iat = chrono::Utc::now().timestamp() + MAX_CLOCK_SKEW_SECS * 10;
    let data = make_receipt_at(&sk, "shop.pack01", "purchased", iat);
    assert!(matches!(
        validator().validate(&Receipt::new("shop.pack01", data)),
        Err(ValidationError::InvalidPayload(_))
    ));
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn from_base64_roundtrip() {
    let (sk, pk) = test_keypair();
    let v = CryptographicValidator::from_base64(&common::public_key_b64(&pk)).unwrap();
    let data = make_receipt(&sk, "shop.pack01", "purchased");
    assert!(v.validate(&Receipt::new("shop.pack01", data)).is_ok());
    assert_eq!(v.name(), "ed25519");
}

#[test]
fn from_base64_rejects_bad_keys() {
    assert!(matches!(
        CryptographicValidator::from_base64("%%%"),
        Err(ValidationError::Config(_))
    ));
    assert!(matches!(
        CryptographicValidator::from_base64("AAAA"),
        Err(ValidationError::Config(_))
    ));
}
