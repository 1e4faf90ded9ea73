// Property tests for MoMo notification signing
//
// Verification must accept exactly what was signed with the shared secret:
// any change to a signed field, the secret or the signature rejects.

use payrecon::gateways::{SignatureVerifier, Verification};
use payrecon::modules::gateways::services::signature::NOTIFICATION_LAYOUTS;
use proptest::prelude::*;
use std::collections::BTreeMap;

const SECRET: &str = "prop-secret";

const SIGNED_FIELDS: [&str; 13] = [
    "partnerCode",
    "accessKey",
    "requestId",
    "orderId",
    "amount",
    "orderInfo",
    "orderType",
    "transId",
    "message",
    "resultCode",
    "payType",
    "responseTime",
    "extraData",
];

fn field_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ._-]{0,24}"
}

fn notification_fields() -> impl Strategy<Value = BTreeMap<String, String>> {
    (
        field_value(),
        1i64..100_000_000,
        field_value(),
        0i64..10_000,
        field_value(),
    )
        .prop_map(|(order, amount, message, code, trans)| {
            let mut fields = BTreeMap::new();
            fields.insert("partnerCode".to_string(), "MOMO".to_string());
            fields.insert("accessKey".to_string(), "access".to_string());
            fields.insert("requestId".to_string(), format!("req-{}", order));
            fields.insert("orderId".to_string(), format!("topup-{}", order));
            fields.insert("amount".to_string(), amount.to_string());
            fields.insert("orderInfo".to_string(), "Nap tien".to_string());
            fields.insert("orderType".to_string(), "momo_wallet".to_string());
            fields.insert("transId".to_string(), trans);
            fields.insert("message".to_string(), message);
            fields.insert("resultCode".to_string(), code.to_string());
            fields.insert("payType".to_string(), "qr".to_string());
            fields.insert("responseTime".to_string(), "1721720663942".to_string());
            fields.insert("extraData".to_string(), String::new());
            fields
        })
}

proptest! {
    #[test]
    fn signing_is_deterministic(fields in notification_fields()) {
        let layout = NOTIFICATION_LAYOUTS[0];
        prop_assert_eq!(
            layout.sign(&fields, SECRET).unwrap(),
            layout.sign(&fields, SECRET).unwrap()
        );
    }

    #[test]
    fn every_layout_verifies_its_own_signature(
        fields in notification_fields(),
        index in 0usize..4,
    ) {
        let layout = NOTIFICATION_LAYOUTS[index];
        let signature = layout.sign(&fields, SECRET).unwrap();

        let verifier = SignatureVerifier::new(SECRET, false);
        prop_assert!(verifier.verify_notification(&fields, &signature).is_accepted());
    }

    #[test]
    fn tampered_signed_field_is_rejected(
        fields in notification_fields(),
        field in proptest::sample::select(SIGNED_FIELDS.to_vec()),
        new_value in field_value(),
    ) {
        let signature = NOTIFICATION_LAYOUTS[0].sign(&fields, SECRET).unwrap();
        prop_assume!(fields[field] != new_value);

        let mut tampered = fields.clone();
        tampered.insert(field.to_string(), new_value);

        let verifier = SignatureVerifier::new(SECRET, false);
        prop_assert_eq!(
            verifier.verify_notification(&tampered, &signature),
            Verification::Rejected
        );
    }

    #[test]
    fn other_secret_is_rejected(fields in notification_fields(), secret in "[a-z]{8,16}") {
        prop_assume!(secret != SECRET);
        let signature = NOTIFICATION_LAYOUTS[0].sign(&fields, &secret).unwrap();

        let verifier = SignatureVerifier::new(SECRET, false);
        prop_assert_eq!(
            verifier.verify_notification(&fields, &signature),
            Verification::Rejected
        );
    }

    #[test]
    fn garbage_signature_never_panics(fields in notification_fields(), signature in ".{0,80}") {
        let verifier = SignatureVerifier::new(SECRET, false);
        let _ = verifier.verify_notification(&fields, &signature);
    }
}

#[test]
fn bypass_accepts_without_checking() {
    let verifier = SignatureVerifier::new(SECRET, true);
    let fields = BTreeMap::new();
    assert_eq!(
        verifier.verify_notification(&fields, "not-hex"),
        Verification::Bypassed
    );
}
