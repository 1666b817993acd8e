//! End-to-end behaviour of the structured config store.

use serde::{Deserialize, Serialize};
use serde_json::json;

use layered_config::ConfigError;

mod common;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ServiceConfig {
    name: String,
    database: DatabaseConfig,
    features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct DatabaseConfig {
    host: String,
    port: u16,
}

fn sample() -> ServiceConfig {
    ServiceConfig {
        name: "billing".into(),
        database: DatabaseConfig { host: "db.internal".into(), port: 5432 },
        features: vec!["invoices".into(), "refunds".into()],
    }
}

#[test]
fn test_environment_overlay_merges_objects_and_replaces_arrays() {
    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("service.json").with_environment("prod");
    let base_dir = store.options().base_dir.clone();

    store.save(&desc, &sample()).unwrap();
    common::write_file(
        &base_dir,
        "service.prod.json",
        r#"{"database": {"host": "db.prod"}, "features": ["invoices"]}"#,
    );

    let loaded: ServiceConfig = store.load_with_environment(&desc).unwrap().unwrap();
    assert_eq!(loaded.name, "billing");
    assert_eq!(loaded.database, DatabaseConfig { host: "db.prod".into(), port: 5432 });
    assert_eq!(loaded.features, vec!["invoices".to_string()]);

    // Plain load ignores the overlay.
    assert_eq!(store.load::<ServiceConfig>(&desc).unwrap(), Some(sample()));
}

#[test]
fn test_environment_overlay_presence_matrix() {
    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("app.json").with_environment("dev");
    let base_dir = store.options().base_dir.clone();

    assert_eq!(store.load_document_with_environment(&desc).unwrap(), None);

    common::write_file(&base_dir, "app.dev.json", r#"{"only": "env"}"#);
    assert_eq!(
        store.load_document_with_environment(&desc).unwrap(),
        Some(json!({"only": "env"}))
    );

    std::fs::remove_file(base_dir.join("app.dev.json")).unwrap();
    common::write_file(&base_dir, "app.json", r#"{"only": "base"}"#);
    assert_eq!(
        store.load_document_with_environment(&desc).unwrap(),
        Some(json!({"only": "base"}))
    );
}

#[test]
fn test_case_insensitive_decode() {
    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("service.json");
    common::write_file(
        &store.options().base_dir.clone(),
        "service.json",
        r#"{"Name": "billing", "DATABASE": {"Host": "h", "Port": 1}, "Features": []}"#,
    );

    let loaded: ServiceConfig = store.load(&desc).unwrap().unwrap();
    assert_eq!(loaded.database.port, 1);
    assert_eq!(loaded.name, "billing");
}

#[test]
fn test_update_path_failure_leaves_file_untouched() {
    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("service.json");
    store.save(&desc, &sample()).unwrap();
    let before = std::fs::read(desc.base_path()).unwrap();

    let err = store.update_path(&desc, "name.first", &"x").unwrap_err();
    assert!(matches!(err, ConfigError::PathNotFound { .. }));

    let err = store.update_path(&desc, "cache.ttl", &10).unwrap_err();
    assert!(matches!(err, ConfigError::PathNotFound { .. }));

    assert_eq!(std::fs::read(desc.base_path()).unwrap(), before);
}

#[test]
fn test_update_path_then_load() {
    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("service.json");
    store.save(&desc, &sample()).unwrap();

    store.update_path(&desc, "database.port", &6543).unwrap();
    store.update_path(&desc, "features", &json!([])).unwrap();

    let loaded: ServiceConfig = store.load(&desc).unwrap().unwrap();
    assert_eq!(loaded.database.port, 6543);
    assert!(loaded.features.is_empty());
}

#[test]
fn test_backup_then_restore_is_byte_identical() {
    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("service.json");

    store.save(&desc, &sample()).unwrap();
    let saved = std::fs::read(desc.base_path()).unwrap();
    let backup = store.backup(&desc).unwrap().unwrap();
    let backup_name = backup.file_name().unwrap().to_string_lossy().into_owned();

    store.update_path(&desc, "name", &"changed").unwrap();
    assert_ne!(std::fs::read(desc.base_path()).unwrap(), saved);

    store.restore(&desc, &backup_name).unwrap();
    assert_eq!(std::fs::read(desc.base_path()).unwrap(), saved);
    assert_eq!(store.load::<ServiceConfig>(&desc).unwrap(), Some(sample()));
    assert!(!store.list_backups(&desc).unwrap().is_empty());
}

#[test]
fn test_restore_missing_backup_is_not_found() {
    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("service.json");
    store.save(&desc, &sample()).unwrap();

    let err = store.restore(&desc, "service.19990101000000.json").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
    assert_eq!(store.load::<ServiceConfig>(&desc).unwrap(), Some(sample()));
}

#[test]
fn test_concurrent_updates_do_not_interleave() {
    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("counters.json");
    let keys: Vec<String> = (0..8).map(|i| format!("k{i}")).collect();
    let initial: serde_json::Map<String, serde_json::Value> =
        keys.iter().map(|k| (k.clone(), json!(0))).collect();
    store.save(&desc, &initial).unwrap();

    let handles: Vec<_> = keys
        .iter()
        .cloned()
        .map(|key| {
            let store = store.clone();
            let desc = desc.clone();
            std::thread::spawn(move || {
                for n in 1..=10 {
                    store.update_path(&desc, &key, &n).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let doc = store.load_document(&desc).unwrap().unwrap();
    for key in &keys {
        assert_eq!(doc[key], json!(10), "update to {key} was lost");
    }
}

#[test]
fn test_cached_load_never_outlives_concurrent_save() {
    let (_dir, store) = common::temp_cached_store();
    let desc = store.descriptor("large.json");
    let padding = "x".repeat(200 * 1024);

    for round in 0..50 {
        store.save_document(&desc, &json!({"v": 0, "padding": padding})).unwrap();

        let reader = {
            let store = store.clone();
            let desc = desc.clone();
            std::thread::spawn(move || store.load_document(&desc).unwrap())
        };
        store.save_document(&desc, &json!({"v": 1})).unwrap();
        reader.join().unwrap();

        let doc = store.load_document(&desc).unwrap().unwrap();
        assert_eq!(doc["v"], json!(1), "stale document cached in round {round}");
    }
}

#[test]
fn test_cached_environment_load_sees_update_path() {
    let (_dir, store) = common::temp_cached_store();
    let desc = store.descriptor("service.json").with_environment("prod");
    store.save(&desc, &sample()).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let desc = desc.clone();
            std::thread::spawn(move || {
                for _ in 0..20 {
                    store.load_with_environment::<ServiceConfig>(&desc).unwrap();
                }
            })
        })
        .collect();
    store.update_path(&desc, "database.port", &6543).unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let loaded: ServiceConfig = store.load_with_environment(&desc).unwrap().unwrap();
    assert_eq!(loaded.database.port, 6543);
}

#[test]
fn test_decode_keeps_map_keys_and_renamed_fields() {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Upstream {
        max_connections: u32,
        headers: std::collections::HashMap<String, String>,
    }

    let (_dir, store) = common::temp_store();
    let desc = store.descriptor("upstream.json");
    store
        .save_document(&desc, &json!({"MaxConnections": 5, "headers": {"X-Api-Key": "k"}}))
        .unwrap();

    let upstream: Upstream = store.load(&desc).unwrap().unwrap();
    assert_eq!(upstream.max_connections, 5);
    assert_eq!(upstream.headers.get("X-Api-Key").map(String::as_str), Some("k"));
    assert_eq!(
        store.load_document(&desc).unwrap().unwrap()["headers"],
        json!({"X-Api-Key": "k"})
    );
}
