#![allow(dead_code)]

use std::sync::Arc;

use schema_registry_core::{MemoryStore, SchemaRegistry, SledStore, UnregisteredSchema};

/// A registry over the in-memory backend.
pub fn memory_registry() -> SchemaRegistry {
    SchemaRegistry::new(Arc::new(MemoryStore::default()))
}

/// A registry over a temporary sled database.
pub fn sled_registry() -> SchemaRegistry {
    let store = SledStore::temporary(50, 5).expect("to open a temporary sled store");
    SchemaRegistry::new(Arc::new(store))
}

/// Both bundled backends; storage-visible behavior must be identical
/// across them.
pub fn registries() -> Vec<(&'static str, SchemaRegistry)> {
    vec![
        ("memory", memory_registry()),
        ("sled", sled_registry()),
    ]
}

/// A registry plus a handle on its backing store, for tests that poke the
/// storage contract directly.
pub fn memory_registry_with_store() -> (SchemaRegistry, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let registry = SchemaRegistry::new(store.clone());
    (registry, store)
}

pub const RECORD_WITH_ID: &str =
    r#"{"type":"record","name":"R","fields":[{"name":"id","type":"int"}]}"#;

pub const RECORD_A_B: &str = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"},{"name":"b","type":"string"}]}"#;

pub const RECORD_A_ONLY: &str =
    r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"}]}"#;

/// RECORD_A_B plus an optional field with a default; backward compatible
/// with it.
pub const RECORD_A_B_C: &str = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"},{"name":"b","type":"string"},{"name":"c","type":"string","default":""}]}"#;

pub const DEFAULT_ZERO: &str =
    r#"{"type":"record","name":"R","fields":[{"name":"x","type":"int","default":0}]}"#;

pub const DEFAULT_ONE: &str =
    r#"{"type":"record","name":"R","fields":[{"name":"x","type":"int","default":1}]}"#;

pub fn avro(raw: &str) -> UnregisteredSchema {
    UnregisteredSchema::schema(raw)
}
