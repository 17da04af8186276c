mod support;

use piiseal_crypto::{
    CryptoError, DecryptPolicy, EncryptionConfig, FieldEncryptor, OperatorSecret,
    PassthroughEncryptor, PiiField, Record, encrypt_pii_fields, encryptor_from_config,
    is_encrypted,
};
use piiseal_storage::{
    MemoryRecordStore, RecordStore, ReviewerProfileService, SpeakerProfileField,
    SpeakerProfileService, StorageError, UserService,
};
use serde_json::Value;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use support::*;

fn memory_store() -> Arc<dyn RecordStore> {
    Arc::new(MemoryRecordStore::new())
}

fn encryptor_from_env(vars: &[(&str, &str)]) -> Arc<dyn FieldEncryptor> {
    let vars: HashMap<&str, &str> = vars.iter().copied().collect();
    let config = EncryptionConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
        .unwrap();
    encryptor_from_config(&config).unwrap()
}

// ── End to end ───────────────────────────────────────────────────

#[test]
fn user_name_is_encrypted_at_rest_and_read_back() {
    init_tracing();
    let service = UserService::new(
        memory_store(),
        encryptor_from_env(&[("ENCRYPTION_KEY", SECRET), ("PII_ENCRYPTION_ENABLED", "true")]),
    );

    let created = service
        .create(record(json!({"name": "Alice Chen", "email": "alice@example.com"})))
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let raw = service.raw(id).unwrap().unwrap();
    assert!(raw["name"].as_str().unwrap().starts_with("enc:v1:"));
    assert_ne!(raw["name"], "Alice Chen");
    assert_eq!(raw["email"], "alice@example.com");

    let found = service.find_by_id(id).unwrap().unwrap();
    assert_eq!(found["name"], "Alice Chen");
    assert_eq!(found, created);
}

#[test]
fn stray_kdf_variable_does_not_strand_stored_values() {
    let store = memory_store();
    let writer = UserService::new(
        Arc::clone(&store),
        encryptor_from_env(&[("ENCRYPTION_KEY", SECRET), ("PII_KDF_ITERATIONS", "1")]),
    );
    writer.create(record(json!({"id": "u1", "name": "Alice Chen"}))).unwrap();

    let reader = UserService::new(store, encryptor_from_env(&[("ENCRYPTION_KEY", SECRET)]))
        .with_policy(DecryptPolicy::FailClosed);
    assert_eq!(reader.find_by_id("u1").unwrap().unwrap()["name"], "Alice Chen");
}

#[test]
fn speaker_profile_fields_are_all_encrypted() {
    let service = SpeakerProfileService::new(memory_store(), encryptor_for(SECRET));
    let input = json!({
        "id": "s1",
        "fullName": "Alice Chen",
        "phone": "+1 555 0100",
        "company": "Example Corp",
        "jobTitle": "Staff Engineer",
        "location": "Lisbon",
        "bio": "Talks about storage engines",
    });
    service.create(record(input)).unwrap();

    let raw = service.raw("s1").unwrap().unwrap();
    for field in ["fullName", "phone", "company", "jobTitle", "location"] {
        assert!(is_encrypted(raw[field].as_str().unwrap()), "{field} stored in clear");
    }
    assert_eq!(raw["bio"], "Talks about storage engines");

    let found = service.find_by_id("s1").unwrap().unwrap();
    assert_eq!(found["location"], "Lisbon");
}

#[test]
fn reviewer_profile_leaves_undeclared_fields_alone() {
    let service = ReviewerProfileService::new(memory_store(), encryptor_for(SECRET));
    service
        .create(record(json!({"id": "r1", "phone": "555-1234", "expertise": "rust"})))
        .unwrap();

    let raw = service.raw("r1").unwrap().unwrap();
    assert!(is_encrypted(raw["phone"].as_str().unwrap()));
    assert_eq!(raw["expertise"], "rust");
    // Absent PII fields stay absent.
    assert!(!raw.contains_key("company"));
}

// ── CRUD ─────────────────────────────────────────────────────────

#[test]
fn upsert_creates_then_updates() {
    let service = UserService::new(memory_store(), encryptor_for(SECRET));

    let created = service.upsert("u1", record(json!({"name": "Alice"}))).unwrap();
    assert_eq!(created["id"], "u1");

    let updated = service.upsert("u1", record(json!({"name": "Alice Chen"}))).unwrap();
    assert_eq!(updated["name"], "Alice Chen");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_eq!(service.find_all().unwrap().len(), 1);
}

#[test]
fn delete_removes_record() {
    let service = UserService::new(memory_store(), encryptor_for(SECRET));
    service.create(record(json!({"id": "u1", "name": "Alice"}))).unwrap();

    assert!(service.delete("u1").unwrap());
    assert!(!service.delete("u1").unwrap());
    assert!(service.find_by_id("u1").unwrap().is_none());
}

#[test]
fn entity_services_share_a_store_without_colliding() {
    let store = memory_store();
    let users = UserService::new(Arc::clone(&store), encryptor_for(SECRET));
    let reviewers = ReviewerProfileService::new(Arc::clone(&store), encryptor_for(SECRET));

    users.create(record(json!({"id": "x", "name": "Alice"}))).unwrap();
    reviewers.create(record(json!({"id": "x", "phone": "555"}))).unwrap();

    assert_eq!(users.find_all().unwrap().len(), 1);
    assert_eq!(reviewers.find_by_id("x").unwrap().unwrap()["phone"], "555");
}

// ── Feature flag ─────────────────────────────────────────────────

#[test]
fn records_written_while_disabled_read_back_after_enabling() {
    let store = memory_store();
    let disabled = UserService::new(Arc::clone(&store), Arc::new(PassthroughEncryptor));
    disabled.create(record(json!({"id": "old", "name": "Bob"}))).unwrap();

    let enabled = UserService::new(Arc::clone(&store), encryptor_for(SECRET));
    enabled.create(record(json!({"id": "new", "name": "Carol"}))).unwrap();

    assert_eq!(enabled.raw("old").unwrap().unwrap()["name"], "Bob");
    let names: Vec<_> = enabled
        .find_all()
        .unwrap()
        .into_iter()
        .map(|r| r["name"].clone())
        .collect();
    // Ordered by id: "new" before "old".
    assert_eq!(names, [json!("Carol"), json!("Bob")]);
}

#[test]
fn disabled_service_returns_ciphertext_untouched() {
    let store = memory_store();
    let enabled = UserService::new(Arc::clone(&store), encryptor_for(SECRET));
    enabled.create(record(json!({"id": "u1", "name": "Alice"}))).unwrap();

    let disabled = UserService::new(store, Arc::new(PassthroughEncryptor));
    let found = disabled.find_by_id("u1").unwrap().unwrap();
    assert!(is_encrypted(found["name"].as_str().unwrap()));
}

// ── Decryption policy ────────────────────────────────────────────

#[test]
fn best_effort_returns_stored_value_on_wrong_key() {
    init_tracing();
    let store = memory_store();
    UserService::new(Arc::clone(&store), encryptor_for(OLD_SECRET))
        .create(record(json!({"id": "u1", "name": "Alice", "role": "admin"})))
        .unwrap();

    let service = UserService::new(store, encryptor_for(SECRET));
    let found = service.find_by_id("u1").unwrap().unwrap();
    assert!(is_encrypted(found["name"].as_str().unwrap()));
    assert_eq!(found["role"], "admin");
}

#[test]
fn fail_closed_surfaces_authentication_failure() {
    let store = memory_store();
    UserService::new(Arc::clone(&store), encryptor_for(OLD_SECRET))
        .create(record(json!({"id": "u1", "name": "Alice"})))
        .unwrap();

    let service =
        UserService::new(store, encryptor_for(SECRET)).with_policy(DecryptPolicy::FailClosed);
    assert!(matches!(
        service.find_by_id("u1"),
        Err(StorageError::Crypto(CryptoError::AuthenticationFailure))
    ));
    assert!(service.find_all().is_err());
}

// ── Key rotation ─────────────────────────────────────────────────

#[test]
fn rotation_moves_every_record_to_the_current_key() {
    init_tracing();
    let store = memory_store();
    let old = SpeakerProfileService::new(Arc::clone(&store), encryptor_for(OLD_SECRET));
    old.create(record(json!({"id": "s1", "fullName": "Alice", "phone": "555-1"})))
        .unwrap();
    old.create(record(json!({"id": "s2", "fullName": "Bob"})))
        .unwrap();

    let ring = cipher_for(SECRET).with_previous(OperatorSecret::new(OLD_SECRET, None).unwrap());
    let rotating = SpeakerProfileService::new(Arc::clone(&store), Arc::new(ring))
        .with_policy(DecryptPolicy::FailClosed);
    // Dual-key window: old records still read.
    assert_eq!(rotating.find_by_id("s1").unwrap().unwrap()["fullName"], "Alice");

    let report = rotating.rotate_all().unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.records, 2);
    assert_eq!(report.fields, 3);
    assert!(report.failed.is_empty());

    // A second pass finds nothing left to do.
    assert_eq!(rotating.rotate_all().unwrap().records, 0);

    let current_only = SpeakerProfileService::new(store, encryptor_for(SECRET))
        .with_policy(DecryptPolicy::FailClosed);
    assert_eq!(current_only.find_by_id("s2").unwrap().unwrap()["fullName"], "Bob");
}

#[test]
fn rotation_encrypts_plaintext_left_from_disabled_period() {
    let store = memory_store();
    UserService::new(Arc::clone(&store), Arc::new(PassthroughEncryptor))
        .create(record(json!({"id": "u1", "name": "Alice"})))
        .unwrap();

    let service = UserService::new(Arc::clone(&store), encryptor_for(SECRET));
    let report = service.rotate_all().unwrap();
    assert_eq!(report.fields, 1);
    assert!(is_encrypted(service.raw("u1").unwrap().unwrap()["name"].as_str().unwrap()));
}

#[test]
fn rotation_skips_unreadable_records_under_best_effort() {
    let store = memory_store();
    UserService::new(Arc::clone(&store), encryptor_for(OLD_SECRET))
        .create(record(json!({"id": "lost", "name": "Alice"})))
        .unwrap();
    UserService::new(Arc::clone(&store), Arc::new(PassthroughEncryptor))
        .create(record(json!({"id": "plain", "name": "Bob"})))
        .unwrap();

    let service = UserService::new(Arc::clone(&store), encryptor_for(SECRET));
    let report = service.rotate_all().unwrap();
    assert_eq!(report.failed, ["lost"]);
    assert_eq!(report.records, 1);

    let strict = service.with_policy(DecryptPolicy::FailClosed);
    assert!(matches!(
        strict.rotate_all(),
        Err(StorageError::Crypto(CryptoError::AuthenticationFailure))
    ));
}

// ── Properties ───────────────────────────────────────────────────

/// State of one declared field in a generated record.
#[derive(Clone, Debug)]
enum Slot {
    Text(String),
    Empty,
    Number(i64),
    Null,
    Missing,
    Tagged(String),
}

fn slot() -> impl Strategy<Value = Slot> {
    prop_oneof![
        "\\PC{1,24}".prop_map(Slot::Text),
        Just(Slot::Empty),
        any::<i64>().prop_map(Slot::Number),
        Just(Slot::Null),
        Just(Slot::Missing),
        "\\PC{1,24}".prop_map(Slot::Tagged),
    ]
}

fn speaker_record(encryptor: &dyn FieldEncryptor, slots: &[Slot]) -> Record {
    let mut record = record(json!({"id": "s1", "bio": "Talks about storage engines"}));
    for (field, slot) in SpeakerProfileField::ALL.iter().zip(slots) {
        let value = match slot {
            Slot::Text(s) => Value::String(s.clone()),
            Slot::Empty => Value::String(String::new()),
            Slot::Number(n) => json!(n),
            Slot::Null => Value::Null,
            Slot::Missing => continue,
            Slot::Tagged(s) => Value::String(encryptor.encrypt_string(s).unwrap()),
        };
        record.insert(field.name().to_string(), value);
    }
    record
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn field_encryption_is_idempotent(
        slots in proptest::collection::vec(slot(), SpeakerProfileField::ALL.len()),
    ) {
        let cipher = cipher_for(SECRET);
        let input = speaker_record(&cipher, &slots);

        let once = encrypt_pii_fields(&cipher, input.clone(), SpeakerProfileField::ALL).unwrap();
        let twice = encrypt_pii_fields(&cipher, once.clone(), SpeakerProfileField::ALL).unwrap();
        prop_assert_eq!(&twice, &once);

        for (field, slot) in SpeakerProfileField::ALL.iter().zip(&slots) {
            let name = field.name();
            match slot {
                Slot::Text(_) => {
                    prop_assert!(is_encrypted(once[name].as_str().unwrap()));
                }
                _ => {
                    prop_assert_eq!(once.get(name), input.get(name));
                }
            }
        }
        prop_assert_eq!(&once["bio"], &input["bio"]);
    }

    #[test]
    fn created_profiles_read_back_unchanged(
        full_name in "\\PC{1,40}",
        phone in "[0-9 +-]{0,20}",
        company in "\\PC{0,40}",
    ) {
        let service = SpeakerProfileService::new(memory_store(), encryptor_for(SECRET));
        let created = service
            .create(record(json!({"fullName": &full_name, "phone": &phone, "company": &company})))
            .unwrap();
        let found = service
            .find_by_id(created["id"].as_str().unwrap())
            .unwrap()
            .unwrap();

        prop_assert_eq!(&found["fullName"], &json!(full_name));
        prop_assert_eq!(&found["phone"], &json!(phone));
        prop_assert_eq!(&found["company"], &json!(company));
    }
}
