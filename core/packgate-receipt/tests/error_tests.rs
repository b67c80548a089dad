use packgate_receipt::ValidationError;

#[test]
fn error_display_unavailable() {
    let err = ValidationError::Unavailable("no validator".into());
    assert!(format!("{err}").contains("unavailable"));
}

#[test]
fn error_display_invalid_signature() {
    let err = ValidationError::InvalidSignature;
    assert!(format!("{err}").contains("signature"));
}

#[test]
fn error_display_product_mismatch() {
    let err = ValidationError::ProductMismatch {
        expected: "a".into(),
        found: "b".into(),
    };
    let msg = format!("{err}");
    assert!(msg.contains("for product b"));
    assert!(msg.contains("expected a"));
}

#[test]
fn error_from_serde_json() {
    let serde_err: Result<serde_json::Value, _> = serde_json::from_str("not json");
    let err: ValidationError = serde_err.unwrap_err().into();
    assert!(format!("{err}").contains("serialization"));
}

#[test]
fn rejection_classification() {
    assert!(ValidationError::InvalidSignature.is_rejection());
    assert!(ValidationError::InvalidFormat("x".into()).is_rejection());
    assert!(!ValidationError::Unavailable("x".into()).is_rejection());
    assert!(!ValidationError::Config("x".into()).is_rejection());
}
