// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::builder::Builder;
use crate::config::SessionConfig;
use crate::error::SchemaError;
use crate::schema::{self, Metadata, Vector};
use crate::tests::support::echo;
use crate::types::address::KeyScheme;
use crate::types::builtin::{BURNT_FUNDS_ACTOR_ADDR, CHAOS_ACTOR_ADDR};
use crate::types::message::{MessageDefaults, MessageSpec};
use crate::types::randomness::{RandomnessKind, RandomnessRule};
use crate::types::receipt::ExitCode;
use serde_json::{json, Value};

fn sample_vector() -> Vector {
    let config = SessionConfig {
        defaults: MessageDefaults::new(1_000_000, 1u64, 200u64),
        epoch: 10,
        ..SessionConfig::default()
    };
    let metadata = Metadata::new("schema-sample")
        .description("two messages and two pinned randomness values")
        .generator("tvx-core-tests", "0.1.0");
    let mut b = Builder::new(metadata, config, echo());
    b.set_selector("chaos_actor", "true");

    let alice = b.account(KeyScheme::Secp256k1, 1_000_000_000_000u64).unwrap();
    b.pin_randomness(
        RandomnessRule::new(RandomnessKind::Beacon, 5, 10, Some(b"hello world!".to_vec())),
        b"super random".to_vec(),
    )
    .unwrap();
    b.pin_randomness(RandomnessRule::new(RandomnessKind::Chain, 99, 68592, None), b"another random value".to_vec())
        .unwrap();
    b.commit_preconditions().unwrap();

    b.push_message(MessageSpec::send(alice.address.clone(), BURNT_FUNDS_ACTOR_ADDR, 5u64)).unwrap();
    b.push_message(MessageSpec::raw(alice.address, CHAOS_ACTOR_ADDR, 4, vec![1, 2, 3])).unwrap();
    b.commit_applies().unwrap();
    b.expect_exit_code(0, ExitCode::OK).unwrap();
    b.finish().unwrap()
}

fn as_json(vector: &Vector) -> Value {
    serde_json::from_slice(&schema::encode(vector).unwrap()).unwrap()
}

fn decode_json(value: &Value) -> Result<Vector, SchemaError> {
    schema::decode(&serde_json::to_vec(value).unwrap())
}

#[test]
fn test_roundtrip_is_entity_equal() {
    let vector = sample_vector();
    let bytes = schema::encode(&vector).unwrap();
    let decoded = schema::decode(&bytes).unwrap();
    assert_eq!(decoded, vector);
    assert_eq!(schema::encode(&decoded).unwrap(), bytes);
}

#[test]
fn test_pinned_randomness_survives_roundtrip() {
    let vector = sample_vector();
    let decoded = schema::decode(&schema::encode(&vector).unwrap()).unwrap();
    assert_eq!(
        decoded.randomness.lookup(RandomnessKind::Beacon, 5, 10, b"hello world!"),
        Some(&b"super random"[..])
    );
    assert_eq!(
        decoded.randomness.lookup(RandomnessKind::Chain, 99, 68592, b""),
        Some(&b"another random value"[..])
    );
}

#[test]
fn test_absent_null_and_empty_entropy_decode_equal() {
    let vector = sample_vector();
    let mut doc = as_json(&vector);

    doc["randomness"][1]["on"] = json!(["chain", 99, 68592]);
    let absent = decode_json(&doc).unwrap();
    doc["randomness"][1]["on"] = json!(["chain", 99, 68592, ""]);
    let empty = decode_json(&doc).unwrap();
    doc["randomness"][1]["on"] = json!(["chain", 99, 68592, null]);
    let null = decode_json(&doc).unwrap();

    assert_eq!(absent, vector);
    assert_eq!(empty, vector);
    assert_eq!(null, vector);
}

#[test]
fn test_document_shape() {
    let doc = as_json(&sample_vector());
    assert_eq!(doc["class"], "message");
    assert_eq!(doc["_meta"]["id"], "schema-sample");
    assert_eq!(doc["preconditions"]["epoch"], 10);
    assert_eq!(doc["apply_messages"][0]["value"], "5");
    assert_eq!(doc["apply_messages"][0]["gas_fee_cap"], "200");
    assert_eq!(doc["randomness"][0]["on"][0], "beacon");
    assert!(doc["postconditions"]["receipts"][0]["return"].is_string());
    assert_eq!(doc["selector"]["chaos_actor"], "true");
}

#[test]
fn test_unknown_and_missing_fields_rejected() {
    let mut doc = as_json(&sample_vector());
    doc["apply_messages"][0]["surprise"] = json!(1);
    assert!(matches!(decode_json(&doc), Err(SchemaError::Json(_))));

    let mut doc = as_json(&sample_vector());
    doc["postconditions"]["receipts"][0].as_object_mut().unwrap().remove("gas_used");
    assert!(matches!(decode_json(&doc), Err(SchemaError::Json(_))));

    let mut doc = as_json(&sample_vector());
    doc.as_object_mut().unwrap().remove("car");
    assert!(matches!(decode_json(&doc), Err(SchemaError::Json(_))));
}

#[test]
fn test_integer_overflow_rejected() {
    let mut doc = as_json(&sample_vector());
    doc["postconditions"]["receipts"][0]["exit_code"] = json!(4_294_967_296u64);
    assert!(matches!(decode_json(&doc), Err(SchemaError::Json(_))));

    let mut doc = as_json(&sample_vector());
    doc["apply_messages"][0]["value"] = json!("-5");
    assert!(matches!(
        decode_json(&doc),
        Err(SchemaError::InvalidInteger { field: "apply_messages.value", .. })
    ));
}

#[test]
fn test_malformed_blobs_rejected() {
    let mut doc = as_json(&sample_vector());
    doc["apply_messages"][1]["params"] = json!("%%%");
    assert!(matches!(
        decode_json(&doc),
        Err(SchemaError::InvalidBlob { field: "apply_messages.params", .. })
    ));

    let mut doc = as_json(&sample_vector());
    doc["car"] = json!(schema::blob::encode_base64(b"plainly not gzip"));
    assert!(matches!(decode_json(&doc), Err(SchemaError::Decompression(_))));

    let mut doc = as_json(&sample_vector());
    doc["apply_messages"][0]["to"] = json!("q099");
    assert!(matches!(decode_json(&doc), Err(SchemaError::InvalidAddress { .. })));

    let mut doc = as_json(&sample_vector());
    doc["preconditions"]["state_tree"]["root_cid"] = json!("xyz");
    assert!(matches!(decode_json(&doc), Err(SchemaError::InvalidCid { .. })));
}

#[test]
fn test_trailing_bytes_after_archive_rejected() {
    let mut doc = as_json(&sample_vector());
    let mut car = schema::blob::decode_base64("car", doc["car"].as_str().unwrap()).unwrap();
    car.extend_from_slice(b"GARBAGE-THAT-IS-NOT-GZIP");
    doc["car"] = json!(schema::blob::encode_base64(&car));
    assert!(matches!(decode_json(&doc), Err(SchemaError::InvalidBlob { field: "car", .. })));
}

#[test]
fn test_one_receipt_per_message() {
    let mut doc = as_json(&sample_vector());
    doc["postconditions"]["receipts"].as_array_mut().unwrap().pop();
    assert!(matches!(
        decode_json(&doc),
        Err(SchemaError::ReceiptCountMismatch { messages: 2, receipts: 1 })
    ));

    let mut doc = as_json(&sample_vector());
    let extra = doc["postconditions"]["receipts"][0].clone();
    doc["postconditions"]["receipts"].as_array_mut().unwrap().push(extra);
    assert!(matches!(
        decode_json(&doc),
        Err(SchemaError::ReceiptCountMismatch { messages: 2, receipts: 3 })
    ));
}

#[test]
fn test_non_canonical_numbers_rejected() {
    for value in ["0_0_5", "+5", "05"] {
        let mut doc = as_json(&sample_vector());
        doc["apply_messages"][0]["value"] = json!(value);
        assert!(matches!(
            decode_json(&doc),
            Err(SchemaError::InvalidInteger { field: "apply_messages.value", .. })
        ));
    }

    let mut doc = as_json(&sample_vector());
    doc["apply_messages"][0]["to"] = json!("t0+0099");
    assert!(matches!(
        decode_json(&doc),
        Err(SchemaError::InvalidAddress { field: "apply_messages.to", .. })
    ));

    let vector = sample_vector();
    let mut doc = as_json(&vector);
    doc["preconditions"]["state_tree"]["root_cid"] = json!(vector.pre_root.to_string().to_uppercase());
    assert!(matches!(decode_json(&doc), Err(SchemaError::InvalidCid { .. })));
}

#[test]
fn test_declared_root_must_match_archive() {
    let vector = sample_vector();
    let mut doc = as_json(&vector);
    doc["postconditions"]["state_tree"]["root_cid"] = json!(vector.pre_root.to_string());
    match decode_json(&doc) {
        Err(SchemaError::RootMismatch { declared, recomputed }) => {
            assert_eq!(declared, vector.pre_root);
            assert_eq!(recomputed, vector.post_root);
        }
        other => panic!("expected root mismatch, got {:?}", other),
    }
}

#[test]
fn test_unsupported_format_and_class() {
    let mut doc = as_json(&sample_vector());
    doc["format_version"] = json!(2);
    assert!(matches!(decode_json(&doc), Err(SchemaError::UnsupportedFormat(2))));

    let mut doc = as_json(&sample_vector());
    doc["class"] = json!("tipset");
    assert!(matches!(decode_json(&doc), Err(SchemaError::UnsupportedClass(_))));
}

#[test]
fn test_file_roundtrip() {
    let vector = sample_vector();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vector.json");
    schema::write_to(&path, &vector).unwrap();
    assert_eq!(schema::read_from(&path).unwrap(), vector);
    assert!(matches!(schema::read_from(dir.path().join("absent.json")), Err(SchemaError::Io(_))));
}

#[test]
fn test_post_state_reconstructs() {
    let vector = sample_vector();
    let post = vector.post_state().unwrap();
    assert_eq!(post.root().unwrap(), vector.post_root);
    let sender = vector.messages[0].from.clone();
    let (_, state) = post.resolve(&sender).unwrap().unwrap();
    assert_eq!(state.nonce, 2);
}
