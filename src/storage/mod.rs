//! The storage contract.
//!
//! One interface backs every registry deployment: an embedded durable store
//! (`sled::SledStore`), an in-memory store (`memory::MemoryStore`), or
//! anything else that can offer compare-and-swap semantics per key. All
//! implementations must expose identical observable behavior: per-context
//! monotonic ids, fingerprint deduplication, dense version numbers under
//! concurrency, and the two-step delete rules.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::types::{
    ApiKey, Config, Metadata, Mode, Reference, RuleSet, SchemaQuery, SchemaType, SubjectVersion,
    User,
};

pub mod alloc;
pub mod memory;
pub mod sled;

/// One row of `schemas_by_id`: the content-addressable schema itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub id: u32,
    pub schema_type: SchemaType,
    pub fingerprint: String,
    pub schema_text: String,
    pub canonical_text: String,
    pub references: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<RuleSet>,
    pub created_at: DateTime<Utc>,
}

/// One row of `subject_versions`: a binding from `(subject, version)` to a
/// schema id, plus the soft-delete flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingRecord {
    pub subject: String,
    pub version: u32,
    pub schema_id: u32,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<RuleSet>,
}

/// A binding joined with the schema content it points at.
#[derive(Debug, Clone)]
pub struct VersionedSchema {
    pub binding: BindingRecord,
    pub schema: SchemaRecord,
}

/// Input to [`SchemaStore::create_schema`] and
/// [`SchemaStore::import_schema`]; the registry has already canonicalized
/// and fingerprinted the content.
#[derive(Debug, Clone)]
pub struct NewSchema {
    pub subject: String,
    pub schema_type: SchemaType,
    pub schema_text: String,
    pub canonical_text: String,
    pub fingerprint: String,
    pub references: Vec<Reference>,
    pub metadata: Option<Metadata>,
    pub rule_set: Option<RuleSet>,
}

/// The outcome of a registration: the (possibly reused) schema id and the
/// version it was bound at.
#[derive(Debug, Clone, Copy)]
pub struct StoredVersion {
    pub id: u32,
    pub version: u32,
}

/// The storage contract. Every operation is scoped to a registry context
/// except the user and API-key records, which are global.
///
/// All operations are single-call atomic from the caller's viewpoint; the
/// reference edge batch inside `create_schema` is the only best-effort write
/// and is idempotent on retry.
#[async_trait]
pub trait SchemaStore: Send + Sync {
    // -- schema registration -------------------------------------------------

    /// Insert-or-find by `(ctx, fingerprint)`, then bind the schema to the
    /// next version of `record.subject`.
    ///
    /// # Errors
    /// - `StorageError::SchemaExists` if a non-deleted binding for the same
    ///   canonical content already exists in the subject (carries the
    ///   existing id and version; callers treat it as idempotent success).
    /// - `StorageError::CasExhausted` when the retry budget is spent.
    async fn create_schema(
        &self,
        ctx: &str,
        record: NewSchema,
    ) -> Result<StoredVersion, StorageError>;

    /// Insert with a caller-specified id and version (IMPORT mode).
    ///
    /// # Errors
    /// - `StorageError::SchemaIdConflict` if the id is already bound to
    ///   different content.
    /// - `StorageError::SchemaExists` if the `(subject, version)` binding
    ///   already exists.
    async fn import_schema(
        &self,
        ctx: &str,
        record: NewSchema,
        id: u32,
        version: u32,
    ) -> Result<StoredVersion, StorageError>;

    // -- id allocation -------------------------------------------------------

    /// Reserve and return the next schema id for the context.
    async fn next_schema_id(&self, ctx: &str) -> Result<u32, StorageError>;

    /// The highest id present in `schemas_by_id`, or 0 when the context is
    /// empty. Exact, not the allocator high-water mark.
    async fn max_schema_id(&self, ctx: &str) -> Result<u32, StorageError>;

    /// Reseed the id allocator after a batch of imports.
    async fn set_next_schema_id(&self, ctx: &str, next: u32) -> Result<(), StorageError>;

    // -- reads ---------------------------------------------------------------

    async fn schema_by_id(&self, ctx: &str, id: u32) -> Result<SchemaRecord, StorageError>;

    /// All versions of a subject in ascending version order.
    async fn schemas_by_subject(
        &self,
        ctx: &str,
        subject: &str,
        include_deleted: bool,
    ) -> Result<Vec<VersionedSchema>, StorageError>;

    async fn schema_by_subject_version(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
        include_deleted: bool,
    ) -> Result<VersionedSchema, StorageError>;

    /// The binding of `subject` whose schema has this fingerprint.
    async fn schema_by_fingerprint(
        &self,
        ctx: &str,
        subject: &str,
        fingerprint: &str,
        include_deleted: bool,
    ) -> Result<VersionedSchema, StorageError>;

    /// The schema content registered under this fingerprint anywhere in the
    /// context, if any.
    async fn schema_by_global_fingerprint(
        &self,
        ctx: &str,
        fingerprint: &str,
    ) -> Result<Option<SchemaRecord>, StorageError>;

    /// The highest non-deleted version of the subject.
    async fn latest_schema(&self, ctx: &str, subject: &str)
        -> Result<VersionedSchema, StorageError>;

    async fn list_subjects(
        &self,
        ctx: &str,
        include_deleted: bool,
    ) -> Result<Vec<String>, StorageError>;

    /// Whether the subject has any versions at all, soft-deleted included.
    async fn subject_exists(&self, ctx: &str, subject: &str) -> Result<bool, StorageError>;

    async fn list_contexts(&self) -> Result<Vec<String>, StorageError>;

    /// Schema ids of non-deleted bindings that reference `(subject, version)`.
    async fn referenced_by(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
    ) -> Result<Vec<u32>, StorageError>;

    async fn subjects_by_schema_id(
        &self,
        ctx: &str,
        id: u32,
        include_deleted: bool,
    ) -> Result<Vec<String>, StorageError>;

    async fn versions_by_schema_id(
        &self,
        ctx: &str,
        id: u32,
        include_deleted: bool,
    ) -> Result<Vec<SubjectVersion>, StorageError>;

    /// Paged listing with prefix and latest-only filters.
    async fn list_schemas(
        &self,
        ctx: &str,
        query: SchemaQuery,
    ) -> Result<Vec<VersionedSchema>, StorageError>;

    // -- deletion ------------------------------------------------------------

    /// Soft delete (`permanent == false`) flips the `deleted` flag;
    /// permanent deletion removes the binding, cleans up reference edges,
    /// and drops the content row once its last binding in the context is
    /// gone.
    ///
    /// # Errors
    /// - `StorageError::VersionNotFound` if the version does not exist.
    /// - `StorageError::VersionSoftDeleted` on a repeated soft delete.
    /// - `StorageError::VersionNotSoftDeleted` when a permanent delete is
    ///   not preceded by a soft delete.
    async fn delete_version(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
        permanent: bool,
    ) -> Result<u32, StorageError>;

    /// Returns the sorted list of affected version numbers.
    ///
    /// # Errors
    /// - `StorageError::SubjectNotFound` if the subject has no versions.
    /// - `StorageError::SubjectSoftDeleted` when soft deleting an already
    ///   fully soft-deleted subject.
    /// - `StorageError::SubjectNotSoftDeleted` when permanently deleting a
    ///   subject with any non-deleted version.
    async fn delete_subject(
        &self,
        ctx: &str,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<u32>, StorageError>;

    // -- configs -------------------------------------------------------------

    async fn subject_config(&self, ctx: &str, subject: &str)
        -> Result<Option<Config>, StorageError>;

    async fn set_subject_config(
        &self,
        ctx: &str,
        subject: &str,
        config: Config,
    ) -> Result<(), StorageError>;

    /// Returns the removed config, if any.
    async fn delete_subject_config(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Option<Config>, StorageError>;

    async fn global_config(&self, ctx: &str) -> Result<Option<Config>, StorageError>;

    async fn set_global_config(&self, ctx: &str, config: Config) -> Result<(), StorageError>;

    async fn delete_global_config(&self, ctx: &str) -> Result<Option<Config>, StorageError>;

    // -- modes ---------------------------------------------------------------

    async fn subject_mode(&self, ctx: &str, subject: &str) -> Result<Option<Mode>, StorageError>;

    async fn set_subject_mode(
        &self,
        ctx: &str,
        subject: &str,
        mode: Mode,
    ) -> Result<(), StorageError>;

    async fn delete_subject_mode(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Option<Mode>, StorageError>;

    async fn global_mode(&self, ctx: &str) -> Result<Option<Mode>, StorageError>;

    async fn set_global_mode(&self, ctx: &str, mode: Mode) -> Result<(), StorageError>;

    // -- users and API keys (global scope) ----------------------------------

    async fn put_user(&self, user: User) -> Result<(), StorageError>;

    async fn get_user(&self, username: &str) -> Result<Option<User>, StorageError>;

    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    async fn delete_user(&self, username: &str) -> Result<bool, StorageError>;

    async fn put_api_key(&self, key: ApiKey) -> Result<(), StorageError>;

    async fn get_api_key(&self, key_id: &str) -> Result<Option<ApiKey>, StorageError>;

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, StorageError>;

    async fn delete_api_key(&self, key_id: &str) -> Result<bool, StorageError>;
}
