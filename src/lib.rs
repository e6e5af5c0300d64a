pub mod api;
pub mod compat;
mod config;
pub mod context;
mod error;
pub mod parser;
mod registry;
pub mod storage;
pub mod types;

mod prelude {
    pub use crate::api::SchemaRegistryAPI;
    pub use crate::config::RegistryConfig;
    pub use crate::context::{QualifiedSubject, DEFAULT_CONTEXT};
    pub use crate::error::{SchemaRegistryError, StorageError};
    pub use crate::registry::SchemaRegistry;
    pub use crate::storage::memory::MemoryStore;
    pub use crate::storage::sled::SledStore;
    pub use crate::storage::SchemaStore;
    pub use crate::types::{
        CompatibilityLevel, Config, Mode, Reference, RegisteredSchema, Schema, SchemaType,
        StringSchema, Subject, SubjectVersion, UnregisteredSchema, Version,
    };
}

pub use prelude::*;
