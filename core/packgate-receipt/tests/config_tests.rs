mod common;

use common::{make_receipt, public_key_b64, test_keypair};
use packgate_receipt::{Receipt, ValidationError, ValidatorConfig};

#[test]
fn default_is_none() {
    assert_eq!(ValidatorConfig::default(), ValidatorConfig::None);
}

#[test]
fn none_builds_noop() {
    let v = ValidatorConfig::None.build().unwrap();
    assert_eq!(v.name(), "noop");
    assert!(matches!(
        v.validate(&Receipt::new("p", "x")),
        Err(ValidationError::Unavailable(_))
    ));
}

#[test]
fn ed25519_builds_cryptographic() {
    let (sk, pk) = test_keypair();
    let config = ValidatorConfig::Ed25519 { public_key: public_key_b64(&pk) };
    let v = config.build().unwrap();
    assert_eq!(v.name(), "ed25519");
    let data = make_receipt(&sk, "shop.pack01", "purchased");
    assert!(v.validate(&Receipt::new("shop.pack01", data)).is_ok());
}

#[test]
fn ed25519_bad_key_fails_to_build() {
    let config = ValidatorConfig::Ed25519 { public_key: "nope".into() };
    assert!(config.build().is_err());
}

#[test]
fn config_json_shape() {
    let parsed: ValidatorConfig =
        serde_json::from_str(r#"{"kind":"ed25519","publicKey":"abc"}"#).unwrap();
    assert_eq!(parsed, ValidatorConfig::Ed25519 { public_key: "abc".into() });

    let none: ValidatorConfig = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
    assert_eq!(none, ValidatorConfig::None);
}
