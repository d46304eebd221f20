//! Integration tests for ring operations.
//!
//! These tests run every ring against an in-memory backend so they behave
//! the same on machines with and without a usable OS keyring:
//! - Saving and loading bytes, text and JSON objects
//! - Overwriting, deleting and clearing
//! - Isolation between services and access groups
//! - Error reporting

use keyclip::{Accessibility, Builder, KeyClipError, MemoryStorage, Ring, Status};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    name: String,
    password: String,
}

impl Account {
    fn from_mapping(mapping: Map<String, Value>) -> Self {
        Self {
            name: mapping["name"].as_str().unwrap_or_default().to_string(),
            password: mapping["password"].as_str().unwrap_or_default().to_string(),
        }
    }
}

/// Helper to create a ring over a fresh in-memory backend.
fn test_ring() -> (Ring, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let ring = Builder::new().storage(storage.clone()).build();
    (ring, storage)
}

fn ring_on(storage: &Arc<MemoryStorage>, service: &str) -> Ring {
    Builder::new().service(service).storage(storage.clone()).build()
}

#[test]
fn test_unsaved_keys_are_absent() {
    let (ring, _storage) = test_ring();

    assert_eq!(ring.load_bytes("testSaveLoadKey1").unwrap(), None);
    assert_eq!(ring.load_text("testSaveLoadKey1").unwrap(), None);
    assert_eq!(ring.load_mapping("testSaveLoadKey1").unwrap(), None);
    assert!(!ring.exists("testSaveLoadKey1").unwrap());
}

#[test]
fn test_string_round_trip() {
    let (ring, _storage) = test_ring();

    ring.save_text("testSaveLoadKey1", "data").unwrap();

    assert_eq!(
        ring.load_text("testSaveLoadKey1").unwrap().as_deref(),
        Some("data")
    );
    assert_eq!(ring.load_text("testSaveLoadKey2").unwrap(), None);
}

#[test]
fn test_bytes_round_trip() {
    let (ring, _storage) = test_ring();
    let payload = vec![0u8, 1, 2, 0xff, 0x7f];

    ring.save_bytes("blob", &payload).unwrap();

    assert_eq!(ring.load_bytes("blob").unwrap(), Some(payload));
}

#[test]
fn test_mapping_round_trip() {
    let (ring, _storage) = test_ring();
    let account = Account {
        name: "aska".to_string(),
        password: "********".to_string(),
    };

    ring.save_mapping("testSaveLoadKey1", &account).unwrap();

    // Stored as JSON, so it also reads as text.
    assert!(ring.load_text("testSaveLoadKey1").unwrap().is_some());
    assert_eq!(ring.load_text("testSaveLoadKey2").unwrap(), None);

    let loaded = ring
        .load_with("testSaveLoadKey1", Account::from_mapping)
        .unwrap()
        .unwrap();
    assert_eq!(loaded, account);

    let typed: Account = ring.load_json("testSaveLoadKey1").unwrap().unwrap();
    assert_eq!(typed, account);

    let mapping = ring.load_mapping("testSaveLoadKey1").unwrap().unwrap();
    assert_eq!(mapping.get("name"), Some(&json!("aska")));
}

#[test]
fn test_load_with_absent_key_skips_transform() {
    let (ring, _storage) = test_ring();

    let loaded = ring
        .load_with("missing", |_| -> Account { panic!("transform must not run") })
        .unwrap();
    assert!(loaded.is_none());
}

#[test]
fn test_text_read_as_mapping_fails() {
    let errors = Arc::new(AtomicUsize::new(0));
    let seen = errors.clone();
    let ring = Builder::new()
        .storage(Arc::new(MemoryStorage::new()))
        .on_error(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    ring.save_text("testSaveLoadKey1", "dummy").unwrap();
    let result = ring.load_mapping("testSaveLoadKey1");

    assert!(matches!(result, Err(KeyClipError::Serialization(_))));
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[test]
fn test_save_overwrites() {
    let (ring, _storage) = test_ring();

    ring.save_text("key", "first").unwrap();
    ring.save_text("key", "second").unwrap();

    assert_eq!(ring.load_text("key").unwrap().as_deref(), Some("second"));
}

#[test]
fn test_delete() {
    let (ring, _storage) = test_ring();

    ring.save_text("testDeleteKey1", "testDeleteData").unwrap();
    ring.save_text("testDeleteKey2", "testDeleteData").unwrap();
    assert!(ring.exists("testDeleteKey1").unwrap());
    assert!(ring.exists("testDeleteKey2").unwrap());

    assert!(ring.delete("testDeleteKey1").unwrap());

    assert_eq!(ring.load_text("testDeleteKey1").unwrap(), None);
    assert!(!ring.exists("testDeleteKey1").unwrap());
    assert!(ring.exists("testDeleteKey2").unwrap());
}

#[test]
fn test_delete_absent_key_returns_false() {
    let (ring, _storage) = test_ring();
    assert!(!ring.delete("never-saved").unwrap());
}

#[test]
fn test_clear_only_touches_own_service() {
    let storage = Arc::new(MemoryStorage::new());
    let ring1 = ring_on(&storage, "Service1");
    let ring2 = ring_on(&storage, "Service2");

    ring1.save_text("testClearKey", "testClearData").unwrap();
    ring1.save_text("other", "testClearData").unwrap();
    ring2.save_text("testClearKey", "kept").unwrap();

    assert!(ring1.clear().unwrap());

    assert_eq!(ring1.load_text("testClearKey").unwrap(), None);
    assert_eq!(ring1.load_text("other").unwrap(), None);
    assert_eq!(
        ring2.load_text("testClearKey").unwrap().as_deref(),
        Some("kept")
    );

    // Nothing left to remove.
    assert!(!ring1.clear().unwrap());
}

#[test]
fn test_services_are_isolated() {
    let storage = Arc::new(MemoryStorage::new());
    let ring1 = ring_on(&storage, "Service1");
    let ring2 = ring_on(&storage, "Service2");

    ring1.save_text("testSetServiceKey", "testSetServiceVal1").unwrap();
    assert_eq!(ring2.load_text("testSetServiceKey").unwrap(), None);

    ring2.save_text("testSetServiceKey", "testSetServiceVal2").unwrap();

    assert_eq!(
        ring1.load_text("testSetServiceKey").unwrap().as_deref(),
        Some("testSetServiceVal1")
    );
    assert_eq!(
        ring2.load_text("testSetServiceKey").unwrap().as_deref(),
        Some("testSetServiceVal2")
    );
    assert_eq!(ring1.service(), "Service1");
    assert_eq!(ring2.service(), "Service2");
}

#[test]
fn test_accessible() {
    let storage = Arc::new(MemoryStorage::new());
    let ring = Builder::new()
        .accessibility(Accessibility::AfterFirstUnlock)
        .storage(storage.clone())
        .build();

    ring.save_text("testSetServiceKey", "testSetServiceVal").unwrap();

    assert_eq!(
        ring.load_text("testSetServiceKey").unwrap().as_deref(),
        Some("testSetServiceVal")
    );
    assert_eq!(ring.accessibility(), Accessibility::AfterFirstUnlock);

    let foreground = Builder::new()
        .accessibility(Accessibility::WhenUnlocked)
        .storage(storage.clone())
        .build();
    let always = Builder::new()
        .accessibility(Accessibility::Always)
        .storage(storage)
        .build();

    assert_eq!(foreground.accessibility(), Accessibility::WhenUnlocked);
    assert_eq!(always.accessibility(), Accessibility::Always);
}

#[test]
fn test_access_group() {
    let storage = Arc::new(MemoryStorage::with_access_groups(
        "com.apple.token",
        Vec::<String>::new(),
    ));
    let default_group = Builder::new()
        .storage(storage.clone())
        .build()
        .default_access_group()
        .unwrap();
    assert_eq!(default_group, "com.apple.token");

    let ring1 = Builder::new()
        .access_group(default_group.clone())
        .storage(storage.clone())
        .build();
    let ring2 = Builder::new()
        .access_group("test.dummy")
        .storage(storage)
        .build();

    ring1.save_text("testSetServiceKey", "testSetServiceVal1").unwrap();
    assert!(ring2.save_text("testSetServiceKey", "testSetServiceVal2").is_err());

    assert!(ring1.exists("testSetServiceKey").unwrap());
    assert_eq!(
        ring1.load_text("testSetServiceKey").unwrap().as_deref(),
        Some("testSetServiceVal1")
    );
    assert_eq!(ring2.load_text("testSetServiceKey").unwrap(), None);

    assert_eq!(ring1.access_group(), Some(default_group.as_str()));
    assert_eq!(ring2.access_group(), Some("test.dummy"));
}

#[test]
fn test_access_group_error_reported_once() {
    let storage = Arc::new(MemoryStorage::with_access_groups(
        "com.apple.token",
        Vec::<String>::new(),
    ));
    let errors = Arc::new(AtomicUsize::new(0));
    let seen = errors.clone();
    let ring = Builder::new()
        .access_group("test.dummy")
        .print_error(true)
        .on_error(move |error| {
            assert_eq!(error.status(), Some(Status::MISSING_ENTITLEMENT));
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .storage(storage)
        .build();

    let result = ring.save_text("hoge", "bar");

    assert!(result.is_err());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rings_are_shareable_across_threads() {
    let storage = Arc::new(MemoryStorage::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let ring = ring_on(&storage, &format!("Service{}", i));
            std::thread::spawn(move || {
                for n in 0..16 {
                    let key = format!("key-{}", n);
                    ring.save_text(&key, &format!("{}-{}", i, n)).unwrap();
                }
                ring
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let ring = handle.join().unwrap();
        assert_eq!(
            ring.load_text("key-15").unwrap(),
            Some(format!("{}-15", i))
        );
    }
    assert_eq!(storage.len(), 64);
}
