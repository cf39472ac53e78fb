//! Integration tests for the wingman-secrets crate.
//!
//! These tests exercise both store implementations through the trait
//! object, the way the auth core consumes them.

use std::sync::Arc;

use wingman_secrets::{FileSecretStore, MemorySecretStore, SecretStore};

fn stores() -> Vec<(&'static str, tempfile::TempDir, Arc<dyn SecretStore>)> {
    let dir = tempfile::tempdir().unwrap();
    let file = FileSecretStore::new(dir.path().join("secrets.json"));
    vec![
        (
            "memory",
            tempfile::tempdir().unwrap(),
            Arc::new(MemorySecretStore::new()) as Arc<dyn SecretStore>,
        ),
        ("file", dir, Arc::new(file) as Arc<dyn SecretStore>),
    ]
}

#[test]
fn full_lifecycle_through_trait_object() {
    for (name, _dir, store) in stores() {
        // Store.
        store.set("wingman.auth.session", "payload-1").unwrap();
        assert_eq!(
            store.get("wingman.auth.session").unwrap().as_deref(),
            Some("payload-1"),
            "store: {name}"
        );

        // Overwrite.
        store.set("wingman.auth.session", "payload-2").unwrap();
        assert_eq!(
            store.get("wingman.auth.session").unwrap().as_deref(),
            Some("payload-2"),
            "store: {name}"
        );

        // Delete, then verify gone and idempotent.
        store.delete("wingman.auth.session").unwrap();
        assert!(store.get("wingman.auth.session").unwrap().is_none(), "store: {name}");
        store.delete("wingman.auth.session").unwrap();
    }
}

#[test]
fn keys_are_independent() {
    for (name, _dir, store) in stores() {
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.delete("a").unwrap();

        assert!(store.get("a").unwrap().is_none(), "store: {name}");
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"), "store: {name}");
    }
}

#[test]
fn concurrent_writers_do_not_corrupt_the_store() {
    let (_name, _dir, store) = stores().remove(1);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for j in 0..10 {
                    store.set(&format!("key-{i}"), &format!("val-{j}")).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    // Every key holds its final value and the file still parses.
    for i in 0..8 {
        assert_eq!(
            store.get(&format!("key-{i}")).unwrap().as_deref(),
            Some("val-9")
        );
    }
}
