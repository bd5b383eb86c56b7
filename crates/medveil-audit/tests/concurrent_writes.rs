//! Concurrent appends through a shared store

use medveil_audit::{AuditConfig, AuditFilter, AuditLog, JsonlAuditStore};
use medveil_domain::{AuditEntry, EventType};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_concurrent_appends_do_not_interleave() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn AuditLog> = Arc::new(JsonlAuditStore::open(dir.path()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let entry = AuditEntry::new(EventType::ApiRequest)
                        .with_detail("worker", worker)
                        .with_detail("seq", i)
                        .with_detail("padding", "p".repeat(512));
                    store.append(&entry).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every line parses, so none were torn.
    let entries = store.entries(&AuditFilter::default()).unwrap();
    assert_eq!(entries.len(), 400);
}

#[test]
fn test_config_selects_directory() {
    let dir = TempDir::new().unwrap();
    let config: AuditConfig = toml::from_str(&format!(
        "backend = \"jsonl\"\ndir = {:?}\n",
        dir.path().join("audit").display().to_string()
    ))
    .unwrap();
    let store = medveil_audit::open_store(&config).unwrap();
    store.append(&AuditEntry::new(EventType::ClientEvent)).unwrap();

    assert!(dir.path().join("audit").is_dir());
    assert_eq!(config.preview_chars, 32);
    assert!(!config.log_requests);
}
