//! The embedded durable backend, on sled.
//!
//! Each logical table is a sled `Tree`; `compare_and_swap` is the LWT that
//! serializes concurrent writers, exactly as a wide-column backend would use
//! `INSERT ... IF NOT EXISTS`. Composite keys join their parts with a NUL
//! byte, which subject and context names cannot contain.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sled::{IVec, Tree};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::alloc::IdBlocks;
use crate::storage::{
    BindingRecord, NewSchema, SchemaRecord, SchemaStore, StoredVersion, VersionedSchema,
};
use crate::types::{ApiKey, Config, Mode, SchemaQuery, SubjectVersion, User};

const SCHEMAS_TREE: &str = "schemas";
const FINGERPRINTS_TREE: &str = "fingerprints";
const VERSIONS_TREE: &str = "versions";
const LATEST_TREE: &str = "latest";
const REFS_BY_TARGET_TREE: &str = "refs_by_target";
const CONFIGS_TREE: &str = "configs";
const MODES_TREE: &str = "modes";
const COUNTERS_TREE: &str = "counters";
const CONTEXTS_TREE: &str = "contexts";
const USERS_TREE: &str = "users";
const API_KEYS_TREE: &str = "api_keys";

pub struct SledStore {
    _db: sled::Db,
    schemas: Tree,
    fingerprints: Tree,
    versions: Tree,
    latest: Tree,
    refs_by_target: Tree,
    configs: Tree,
    modes: Tree,
    counters: Tree,
    contexts: Tree,
    users: Tree,
    api_keys: Tree,
    blocks: IdBlocks,
    max_retries: u32,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(
        path: P,
        id_block_size: u32,
        max_retries: u32,
    ) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db, id_block_size, max_retries)
    }

    /// An in-memory sled database, dropped with the store. For tests.
    pub fn temporary(id_block_size: u32, max_retries: u32) -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, id_block_size, max_retries)
    }

    fn from_db(db: sled::Db, id_block_size: u32, max_retries: u32) -> Result<Self, StorageError> {
        let store = Self {
            schemas: db.open_tree(SCHEMAS_TREE)?,
            fingerprints: db.open_tree(FINGERPRINTS_TREE)?,
            versions: db.open_tree(VERSIONS_TREE)?,
            latest: db.open_tree(LATEST_TREE)?,
            refs_by_target: db.open_tree(REFS_BY_TARGET_TREE)?,
            configs: db.open_tree(CONFIGS_TREE)?,
            modes: db.open_tree(MODES_TREE)?,
            counters: db.open_tree(COUNTERS_TREE)?,
            contexts: db.open_tree(CONTEXTS_TREE)?,
            users: db.open_tree(USERS_TREE)?,
            api_keys: db.open_tree(API_KEYS_TREE)?,
            blocks: IdBlocks::new(id_block_size),
            max_retries: max_retries.max(1),
            _db: db,
        };
        store.ensure_context(crate::context::DEFAULT_CONTEXT)?;
        Ok(store)
    }

    fn ensure_context(&self, ctx: &str) -> Result<(), StorageError> {
        let key = ctx.as_bytes();
        if self.contexts.get(key)?.is_none() {
            let created_at = serde_json::to_vec(&Utc::now())?;
            // Lost race just overwrites with a near-identical timestamp.
            self.contexts.insert(key, created_at)?;
        }
        Ok(())
    }

    /// Reserve the next id block from the durable per-context counter.
    fn reserve_block(&self, ctx: &str) -> Result<u32, StorageError> {
        let key = ctx.as_bytes();
        for _ in 0..self.max_retries * 10 {
            let current = self.counters.get(key)?;
            let low = match &current {
                Some(bytes) => decode_u32(bytes)?,
                None => 1,
            };
            let next = low + self.blocks.block_size();
            let swap = self.counters.compare_and_swap(
                key,
                current,
                Some(&next.to_be_bytes()[..]),
            )?;
            if swap.is_ok() {
                return Ok(low);
            }
            debug!(ctx, "id block reservation contended, retrying");
        }
        Err(StorageError::CasExhausted {
            attempts: self.max_retries * 10,
        })
    }

    fn allocate_id(&self, ctx: &str) -> Result<u32, StorageError> {
        if let Some(id) = self.blocks.take(ctx) {
            return Ok(id);
        }
        let low = self.reserve_block(ctx)?;
        Ok(self.blocks.install(ctx, low))
    }

    /// Insert-or-find the content row for this fingerprint. Returns the id
    /// that owns the fingerprint after the call.
    fn claim_fingerprint(&self, ctx: &str, record: &NewSchema) -> Result<u32, StorageError> {
        let fp_key = join_key(&[ctx.as_bytes(), record.fingerprint.as_bytes()]);
        for _ in 0..self.max_retries {
            if let Some(bytes) = self.fingerprints.get(&fp_key)? {
                let id = decode_u32(&bytes)?;
                let schema_key = schema_key(ctx, id);
                if self.schemas.get(&schema_key)?.is_none() {
                    // A writer crashed between claiming the fingerprint and
                    // writing the content row; repair in place.
                    let row = serde_json::to_vec(&make_record(id, record))?;
                    self.schemas.insert(schema_key, row)?;
                }
                return Ok(id);
            }

            let id = self.allocate_id(ctx)?;
            let swap = self.fingerprints.compare_and_swap(
                &fp_key,
                None as Option<&[u8]>,
                Some(&id.to_be_bytes()[..]),
            )?;
            if swap.is_ok() {
                let row = serde_json::to_vec(&make_record(id, record))?;
                self.schemas.insert(schema_key(ctx, id), row)?;
                return Ok(id);
            }
            // Lost the claim; the freshly allocated id becomes a gap.
            debug!(ctx, fingerprint = %record.fingerprint, "fingerprint claim lost, rereading winner");
        }
        Err(StorageError::CasExhausted {
            attempts: self.max_retries,
        })
    }

    /// Highest version number present for the subject, deleted included.
    fn max_version(&self, ctx: &str, subject: &str) -> Result<Option<u32>, StorageError> {
        let prefix = subject_prefix(ctx, subject);
        match self.versions.scan_prefix(&prefix).last() {
            Some(entry) => {
                let (key, _) = entry?;
                Ok(Some(version_from_key(&key, &prefix)?))
            }
            None => Ok(None),
        }
    }

    fn latest_pointer(&self, ctx: &str, subject: &str) -> Result<Option<(u32, u32)>, StorageError> {
        match self.latest.get(join_key(&[ctx.as_bytes(), subject.as_bytes()]))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Advance the latest pointer to `(version, id)` unless it is already
    /// ahead. Losing every CAS is harmless: readers fall back to scans.
    fn advance_latest(&self, ctx: &str, subject: &str, version: u32, id: u32) {
        let key = join_key(&[ctx.as_bytes(), subject.as_bytes()]);
        for _ in 0..self.max_retries {
            let current = match self.latest.get(&key) {
                Ok(current) => current,
                Err(err) => {
                    warn!(subject, error = %err, "latest pointer read failed");
                    return;
                }
            };
            if let Some(bytes) = &current {
                match serde_json::from_slice::<(u32, u32)>(bytes) {
                    Ok((pointer, _)) if pointer >= version => return,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(subject, error = %err, "latest pointer is corrupt");
                        return;
                    }
                }
            }
            let proposed = match serde_json::to_vec(&(version, id)) {
                Ok(proposed) => proposed,
                Err(_) => return,
            };
            match self
                .latest
                .compare_and_swap(&key, current, Some(proposed))
            {
                Ok(Ok(())) => return,
                Ok(Err(_)) => continue,
                Err(err) => {
                    warn!(subject, error = %err, "latest pointer update failed");
                    return;
                }
            }
        }
    }

    fn insert_reverse_refs(&self, ctx: &str, record: &NewSchema, version: u32) {
        for reference in &record.references {
            let key = edge_key(
                ctx,
                &reference.subject,
                reference.version,
                &record.subject,
                version,
            );
            // Idempotent on retry; failures leave a latent repair target
            // that the next registration of this schema re-writes.
            if let Err(err) = self.refs_by_target.insert(key, &[]) {
                warn!(error = %err, "reference edge write failed");
            }
        }
    }

    fn read_binding(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
    ) -> Result<Option<BindingRecord>, StorageError> {
        match self.versions.get(version_key(ctx, subject, version))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_schema(&self, ctx: &str, id: u32) -> Result<Option<SchemaRecord>, StorageError> {
        match self.schemas.get(schema_key(ctx, id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All bindings of a subject in ascending version order.
    fn subject_bindings(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Vec<BindingRecord>, StorageError> {
        let prefix = subject_prefix(ctx, subject);
        let mut bindings = Vec::new();
        for entry in self.versions.scan_prefix(&prefix) {
            let (_, value) = entry?;
            bindings.push(serde_json::from_slice::<BindingRecord>(&value)?);
        }
        Ok(bindings)
    }

    fn joined(&self, ctx: &str, binding: BindingRecord) -> Result<VersionedSchema, StorageError> {
        let schema =
            self.read_schema(ctx, binding.schema_id)?
                .ok_or(StorageError::SchemaIdNotFound {
                    id: binding.schema_id,
                })?;
        Ok(VersionedSchema { binding, schema })
    }

    /// Permanently remove one version row plus the edges and content rows
    /// that no longer have a holder. Callers have verified the soft-delete
    /// precondition.
    fn purge_version(&self, ctx: &str, subject: &str, binding: &BindingRecord) {
        if let Err(err) = self
            .versions
            .remove(version_key(ctx, subject, binding.version))
        {
            warn!(subject, version = binding.version, error = %err, "version row removal failed");
            return;
        }

        match self.read_schema(ctx, binding.schema_id) {
            Ok(Some(schema)) => {
                for reference in &schema.references {
                    let key = edge_key(
                        ctx,
                        &reference.subject,
                        reference.version,
                        subject,
                        binding.version,
                    );
                    if let Err(err) = self.refs_by_target.remove(key) {
                        warn!(error = %err, "reference edge removal failed");
                    }
                }

                let orphaned = match self.is_orphaned(ctx, binding.schema_id) {
                    Ok(orphaned) => orphaned,
                    Err(err) => {
                        warn!(error = %err, "orphan check failed");
                        false
                    }
                };
                if orphaned {
                    if let Err(err) = self.schemas.remove(schema_key(ctx, binding.schema_id)) {
                        warn!(error = %err, "content row removal failed");
                    }
                    let fp_key = join_key(&[ctx.as_bytes(), schema.fingerprint.as_bytes()]);
                    match self.fingerprints.get(&fp_key) {
                        Ok(Some(bytes)) if decode_u32(&bytes).ok() == Some(binding.schema_id) => {
                            if let Err(err) = self.fingerprints.remove(&fp_key) {
                                warn!(error = %err, "fingerprint row removal failed");
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "content row read failed during purge"),
        }

        let emptied = self
            .versions
            .scan_prefix(subject_prefix(ctx, subject))
            .next()
            .is_none();
        if emptied {
            if let Err(err) = self
                .latest
                .remove(join_key(&[ctx.as_bytes(), subject.as_bytes()]))
            {
                warn!(subject, error = %err, "latest pointer removal failed");
            }
        }
    }

    fn is_orphaned(&self, ctx: &str, schema_id: u32) -> Result<bool, StorageError> {
        let mut prefix = ctx.as_bytes().to_vec();
        prefix.push(0);
        for entry in self.versions.scan_prefix(&prefix) {
            let (_, value) = entry?;
            let binding: BindingRecord = serde_json::from_slice(&value)?;
            if binding.schema_id == schema_id {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Subjects in the context together with their bindings.
    fn all_bindings(&self, ctx: &str) -> Result<Vec<BindingRecord>, StorageError> {
        let mut prefix = ctx.as_bytes().to_vec();
        prefix.push(0);
        let mut bindings = Vec::new();
        for entry in self.versions.scan_prefix(&prefix) {
            let (_, value) = entry?;
            bindings.push(serde_json::from_slice::<BindingRecord>(&value)?);
        }
        Ok(bindings)
    }
}

fn join_key(parts: &[&[u8]]) -> Vec<u8> {
    let mut key = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            key.push(0);
        }
        key.extend_from_slice(part);
    }
    key
}

fn schema_key(ctx: &str, id: u32) -> Vec<u8> {
    join_key(&[ctx.as_bytes(), &id.to_be_bytes()])
}

fn subject_prefix(ctx: &str, subject: &str) -> Vec<u8> {
    let mut key = join_key(&[ctx.as_bytes(), subject.as_bytes()]);
    key.push(0);
    key
}

fn version_key(ctx: &str, subject: &str, version: u32) -> Vec<u8> {
    let mut key = subject_prefix(ctx, subject);
    key.extend_from_slice(&version.to_be_bytes());
    key
}

fn edge_key(
    ctx: &str,
    target_subject: &str,
    target_version: u32,
    source_subject: &str,
    source_version: u32,
) -> Vec<u8> {
    let mut key = version_key(ctx, target_subject, target_version);
    key.push(0);
    key.extend_from_slice(source_subject.as_bytes());
    key.push(0);
    key.extend_from_slice(&source_version.to_be_bytes());
    key
}

fn version_from_key(key: &IVec, prefix: &[u8]) -> Result<u32, StorageError> {
    let tail = &key[prefix.len()..];
    decode_u32(tail)
}

fn decode_u32(bytes: &[u8]) -> Result<u32, StorageError> {
    let array: [u8; 4] = bytes
        .get(..4)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| StorageError::Backend {
            source: "malformed u32 key or counter".into(),
        })?;
    Ok(u32::from_be_bytes(array))
}

fn make_record(id: u32, record: &NewSchema) -> SchemaRecord {
    SchemaRecord {
        id,
        schema_type: record.schema_type,
        fingerprint: record.fingerprint.clone(),
        schema_text: record.schema_text.clone(),
        canonical_text: record.canonical_text.clone(),
        references: record.references.clone(),
        metadata: record.metadata.clone(),
        rule_set: record.rule_set.clone(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl SchemaStore for SledStore {
    async fn create_schema(
        &self,
        ctx: &str,
        record: NewSchema,
    ) -> Result<StoredVersion, StorageError> {
        self.ensure_context(ctx)?;
        let id = self.claim_fingerprint(ctx, &record)?;

        for binding in self.subject_bindings(ctx, &record.subject)? {
            if !binding.deleted && binding.schema_id == id {
                return Err(StorageError::SchemaExists {
                    subject: record.subject.clone(),
                    id,
                    version: binding.version,
                });
            }
        }

        for _ in 0..self.max_retries {
            let pointer = self.latest_pointer(ctx, &record.subject)?.map(|(v, _)| v);
            let scanned = self.max_version(ctx, &record.subject)?;
            let version = pointer.unwrap_or(0).max(scanned.unwrap_or(0)) + 1;

            let binding = BindingRecord {
                subject: record.subject.clone(),
                version,
                schema_id: id,
                deleted: false,
                created_at: Utc::now(),
                metadata: None,
                rule_set: None,
            };
            let row = serde_json::to_vec(&binding)?;
            let swap = self.versions.compare_and_swap(
                version_key(ctx, &record.subject, version),
                None as Option<&[u8]>,
                Some(row),
            )?;

            match swap {
                Ok(()) => {
                    self.advance_latest(ctx, &record.subject, version, id);
                    self.insert_reverse_refs(ctx, &record, version);
                    return Ok(StoredVersion { id, version });
                }
                Err(cas) => {
                    // Another writer claimed this version number first.
                    if let Some(current) = cas.current {
                        let existing: BindingRecord = serde_json::from_slice(&current)?;
                        if !existing.deleted && existing.schema_id == id {
                            return Ok(StoredVersion { id, version });
                        }
                    }
                    debug!(subject = %record.subject, version, "version CAS contended, retrying");
                }
            }
        }

        Err(StorageError::CasExhausted {
            attempts: self.max_retries,
        })
    }

    async fn import_schema(
        &self,
        ctx: &str,
        record: NewSchema,
        id: u32,
        version: u32,
    ) -> Result<StoredVersion, StorageError> {
        self.ensure_context(ctx)?;

        if let Some(existing) = self.read_schema(ctx, id)? {
            if existing.fingerprint != record.fingerprint {
                return Err(StorageError::SchemaIdConflict { id });
            }
        }

        if self.schemas.get(schema_key(ctx, id))?.is_none() {
            let row = serde_json::to_vec(&make_record(id, &record))?;
            self.schemas.insert(schema_key(ctx, id), row)?;
        }
        let fp_key = join_key(&[ctx.as_bytes(), record.fingerprint.as_bytes()]);
        // First importer wins the dedup row; same-content imports under
        // other ids stay reachable by id.
        let _ = self.fingerprints.compare_and_swap(
            &fp_key,
            None as Option<&[u8]>,
            Some(&id.to_be_bytes()[..]),
        )?;

        let binding = BindingRecord {
            subject: record.subject.clone(),
            version,
            schema_id: id,
            deleted: false,
            created_at: Utc::now(),
            metadata: None,
            rule_set: None,
        };
        let row = serde_json::to_vec(&binding)?;
        let swap = self.versions.compare_and_swap(
            version_key(ctx, &record.subject, version),
            None as Option<&[u8]>,
            Some(row),
        )?;
        if let Err(cas) = swap {
            let existing_id = match cas.current {
                Some(current) => serde_json::from_slice::<BindingRecord>(&current)?.schema_id,
                None => id,
            };
            return Err(StorageError::SchemaExists {
                subject: record.subject.clone(),
                id: existing_id,
                version,
            });
        }

        self.advance_latest(ctx, &record.subject, version, id);
        self.insert_reverse_refs(ctx, &record, version);
        Ok(StoredVersion { id, version })
    }

    async fn next_schema_id(&self, ctx: &str) -> Result<u32, StorageError> {
        self.ensure_context(ctx)?;
        self.allocate_id(ctx)
    }

    async fn max_schema_id(&self, ctx: &str) -> Result<u32, StorageError> {
        let mut prefix = ctx.as_bytes().to_vec();
        prefix.push(0);
        match self.schemas.scan_prefix(&prefix).last() {
            Some(entry) => {
                let (key, _) = entry?;
                version_from_key(&key, &prefix)
            }
            None => Ok(0),
        }
    }

    async fn set_next_schema_id(&self, ctx: &str, next: u32) -> Result<(), StorageError> {
        self.ensure_context(ctx)?;
        self.counters.insert(ctx.as_bytes(), &next.to_be_bytes())?;
        self.blocks.invalidate(ctx);
        Ok(())
    }

    async fn schema_by_id(&self, ctx: &str, id: u32) -> Result<SchemaRecord, StorageError> {
        self.read_schema(ctx, id)?
            .ok_or(StorageError::SchemaIdNotFound { id })
    }

    async fn schemas_by_subject(
        &self,
        ctx: &str,
        subject: &str,
        include_deleted: bool,
    ) -> Result<Vec<VersionedSchema>, StorageError> {
        let bindings = self.subject_bindings(ctx, subject)?;
        if bindings.is_empty() {
            return Err(StorageError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }
        let mut versions = Vec::new();
        for binding in bindings {
            if binding.deleted && !include_deleted {
                continue;
            }
            versions.push(self.joined(ctx, binding)?);
        }
        if versions.is_empty() {
            return Err(StorageError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }
        Ok(versions)
    }

    async fn schema_by_subject_version(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
        include_deleted: bool,
    ) -> Result<VersionedSchema, StorageError> {
        let bindings = self.subject_bindings(ctx, subject)?;
        if bindings.is_empty() {
            return Err(StorageError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }
        let binding = bindings
            .into_iter()
            .find(|binding| binding.version == version)
            .ok_or_else(|| StorageError::VersionNotFound {
                subject: subject.to_string(),
                version,
            })?;
        if binding.deleted && !include_deleted {
            return Err(StorageError::VersionNotFound {
                subject: subject.to_string(),
                version,
            });
        }
        self.joined(ctx, binding)
    }

    async fn schema_by_fingerprint(
        &self,
        ctx: &str,
        subject: &str,
        fingerprint: &str,
        include_deleted: bool,
    ) -> Result<VersionedSchema, StorageError> {
        let bindings = self.subject_bindings(ctx, subject)?;
        if bindings.is_empty() {
            return Err(StorageError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }

        let mut found = None;
        for binding in bindings {
            if binding.deleted && !include_deleted {
                continue;
            }
            if let Some(schema) = self.read_schema(ctx, binding.schema_id)? {
                if schema.fingerprint == fingerprint {
                    found = Some(VersionedSchema { binding, schema });
                }
            }
        }
        found.ok_or_else(|| StorageError::SchemaNotFound {
            subject: subject.to_string(),
        })
    }

    async fn schema_by_global_fingerprint(
        &self,
        ctx: &str,
        fingerprint: &str,
    ) -> Result<Option<SchemaRecord>, StorageError> {
        let fp_key = join_key(&[ctx.as_bytes(), fingerprint.as_bytes()]);
        match self.fingerprints.get(&fp_key)? {
            Some(bytes) => {
                let id = decode_u32(&bytes)?;
                self.read_schema(ctx, id)
            }
            None => Ok(None),
        }
    }

    async fn latest_schema(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<VersionedSchema, StorageError> {
        let bindings = self.subject_bindings(ctx, subject)?;
        if bindings.is_empty() {
            return Err(StorageError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }
        let binding = bindings
            .into_iter()
            .rev()
            .find(|binding| !binding.deleted)
            .ok_or_else(|| StorageError::SubjectNotFound {
                subject: subject.to_string(),
            })?;
        self.joined(ctx, binding)
    }

    async fn list_subjects(
        &self,
        ctx: &str,
        include_deleted: bool,
    ) -> Result<Vec<String>, StorageError> {
        let mut subjects = Vec::new();
        for binding in self.all_bindings(ctx)? {
            if binding.deleted && !include_deleted {
                continue;
            }
            if subjects.last() != Some(&binding.subject) {
                subjects.push(binding.subject);
            }
        }
        subjects.sort();
        subjects.dedup();
        Ok(subjects)
    }

    async fn subject_exists(&self, ctx: &str, subject: &str) -> Result<bool, StorageError> {
        Ok(self
            .versions
            .scan_prefix(subject_prefix(ctx, subject))
            .next()
            .is_some())
    }

    async fn list_contexts(&self) -> Result<Vec<String>, StorageError> {
        let mut contexts = Vec::new();
        for entry in self.contexts.iter() {
            let (key, _) = entry?;
            contexts.push(String::from_utf8_lossy(&key).into_owned());
        }
        contexts.sort();
        Ok(contexts)
    }

    async fn referenced_by(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
    ) -> Result<Vec<u32>, StorageError> {
        if !self.subject_exists(ctx, subject).await? {
            return Err(StorageError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }
        if self.read_binding(ctx, subject, version)?.is_none() {
            return Err(StorageError::VersionNotFound {
                subject: subject.to_string(),
                version,
            });
        }

        let mut prefix = version_key(ctx, subject, version);
        prefix.push(0);
        let mut ids = Vec::new();
        for entry in self.refs_by_target.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let tail = &key[prefix.len()..];
            let Some(split) = tail.iter().position(|byte| *byte == 0) else {
                continue;
            };
            let source_subject = String::from_utf8_lossy(&tail[..split]).into_owned();
            let source_version = decode_u32(&tail[split + 1..])?;
            let Some(binding) = self.read_binding(ctx, &source_subject, source_version)? else {
                continue;
            };
            if !binding.deleted {
                ids.push(binding.schema_id);
            }
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn subjects_by_schema_id(
        &self,
        ctx: &str,
        id: u32,
        include_deleted: bool,
    ) -> Result<Vec<String>, StorageError> {
        if self.read_schema(ctx, id)?.is_none() {
            return Err(StorageError::SchemaIdNotFound { id });
        }
        let mut subjects = Vec::new();
        for binding in self.all_bindings(ctx)? {
            if binding.schema_id == id && (include_deleted || !binding.deleted) {
                subjects.push(binding.subject);
            }
        }
        subjects.sort();
        subjects.dedup();
        Ok(subjects)
    }

    async fn versions_by_schema_id(
        &self,
        ctx: &str,
        id: u32,
        include_deleted: bool,
    ) -> Result<Vec<SubjectVersion>, StorageError> {
        if self.read_schema(ctx, id)?.is_none() {
            return Err(StorageError::SchemaIdNotFound { id });
        }
        let mut versions = Vec::new();
        for binding in self.all_bindings(ctx)? {
            if binding.schema_id == id && (include_deleted || !binding.deleted) {
                versions.push(SubjectVersion {
                    subject: binding.subject,
                    version: binding.version,
                });
            }
        }
        Ok(versions)
    }

    async fn list_schemas(
        &self,
        ctx: &str,
        query: SchemaQuery,
    ) -> Result<Vec<VersionedSchema>, StorageError> {
        let mut per_subject: Vec<(String, Vec<BindingRecord>)> = Vec::new();
        for binding in self.all_bindings(ctx)? {
            if let Some(prefix) = &query.subject_prefix {
                if !binding.subject.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            match per_subject.last_mut() {
                Some((subject, bindings)) if *subject == binding.subject => {
                    bindings.push(binding)
                }
                _ => per_subject.push((binding.subject.clone(), vec![binding])),
            }
        }

        let mut results = Vec::new();
        for (_, bindings) in per_subject {
            if query.latest_only {
                if let Some(binding) = bindings.into_iter().rev().find(|b| !b.deleted) {
                    results.push(self.joined(ctx, binding)?);
                }
            } else {
                for binding in bindings {
                    if binding.deleted && !query.include_deleted {
                        continue;
                    }
                    results.push(self.joined(ctx, binding)?);
                }
            }
        }

        Ok(results
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn delete_version(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
        permanent: bool,
    ) -> Result<u32, StorageError> {
        if !self.subject_exists(ctx, subject).await? {
            return Err(StorageError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }
        let binding =
            self.read_binding(ctx, subject, version)?
                .ok_or_else(|| StorageError::VersionNotFound {
                    subject: subject.to_string(),
                    version,
                })?;

        if permanent {
            if !binding.deleted {
                return Err(StorageError::VersionNotSoftDeleted {
                    subject: subject.to_string(),
                    version,
                });
            }
            self.purge_version(ctx, subject, &binding);
        } else {
            if binding.deleted {
                return Err(StorageError::VersionSoftDeleted {
                    subject: subject.to_string(),
                    version,
                });
            }
            // CAS so that a racing soft delete of the same version surfaces
            // as the double-delete error on exactly one side.
            let old_row = serde_json::to_vec(&binding)?;
            let mut flipped = binding;
            flipped.deleted = true;
            let new_row = serde_json::to_vec(&flipped)?;
            let swap = self.versions.compare_and_swap(
                version_key(ctx, subject, version),
                Some(old_row),
                Some(new_row),
            )?;
            if swap.is_err() {
                return Err(StorageError::VersionSoftDeleted {
                    subject: subject.to_string(),
                    version,
                });
            }
        }
        Ok(version)
    }

    async fn delete_subject(
        &self,
        ctx: &str,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<u32>, StorageError> {
        let bindings = self.subject_bindings(ctx, subject)?;
        if bindings.is_empty() {
            return Err(StorageError::SubjectNotFound {
                subject: subject.to_string(),
            });
        }

        if permanent {
            if bindings.iter().any(|binding| !binding.deleted) {
                return Err(StorageError::SubjectNotSoftDeleted {
                    subject: subject.to_string(),
                });
            }
            let versions: Vec<u32> = bindings.iter().map(|binding| binding.version).collect();
            for binding in &bindings {
                self.purge_version(ctx, subject, binding);
            }
            self.latest
                .remove(join_key(&[ctx.as_bytes(), subject.as_bytes()]))?;
            self.configs
                .remove(join_key(&[ctx.as_bytes(), subject.as_bytes()]))?;
            self.modes
                .remove(join_key(&[ctx.as_bytes(), subject.as_bytes()]))?;
            Ok(versions)
        } else {
            let affected: Vec<u32> = bindings
                .iter()
                .filter(|binding| !binding.deleted)
                .map(|binding| binding.version)
                .collect();
            if affected.is_empty() {
                return Err(StorageError::SubjectSoftDeleted {
                    subject: subject.to_string(),
                });
            }
            for binding in bindings {
                if binding.deleted {
                    continue;
                }
                let mut flipped = binding;
                flipped.deleted = true;
                let version = flipped.version;
                let row = serde_json::to_vec(&flipped)?;
                self.versions
                    .insert(version_key(ctx, subject, version), row)?;
            }
            Ok(affected)
        }
    }

    async fn subject_config(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Option<Config>, StorageError> {
        match self
            .configs
            .get(join_key(&[ctx.as_bytes(), subject.as_bytes()]))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set_subject_config(
        &self,
        ctx: &str,
        subject: &str,
        config: Config,
    ) -> Result<(), StorageError> {
        self.ensure_context(ctx)?;
        let row = serde_json::to_vec(&config)?;
        self.configs
            .insert(join_key(&[ctx.as_bytes(), subject.as_bytes()]), row)?;
        Ok(())
    }

    async fn delete_subject_config(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Option<Config>, StorageError> {
        match self
            .configs
            .remove(join_key(&[ctx.as_bytes(), subject.as_bytes()]))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn global_config(&self, ctx: &str) -> Result<Option<Config>, StorageError> {
        self.subject_config(ctx, "").await
    }

    async fn set_global_config(&self, ctx: &str, config: Config) -> Result<(), StorageError> {
        self.set_subject_config(ctx, "", config).await
    }

    async fn delete_global_config(&self, ctx: &str) -> Result<Option<Config>, StorageError> {
        self.delete_subject_config(ctx, "").await
    }

    async fn subject_mode(&self, ctx: &str, subject: &str) -> Result<Option<Mode>, StorageError> {
        match self
            .modes
            .get(join_key(&[ctx.as_bytes(), subject.as_bytes()]))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set_subject_mode(
        &self,
        ctx: &str,
        subject: &str,
        mode: Mode,
    ) -> Result<(), StorageError> {
        self.ensure_context(ctx)?;
        let row = serde_json::to_vec(&mode)?;
        self.modes
            .insert(join_key(&[ctx.as_bytes(), subject.as_bytes()]), row)?;
        Ok(())
    }

    async fn delete_subject_mode(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Option<Mode>, StorageError> {
        match self
            .modes
            .remove(join_key(&[ctx.as_bytes(), subject.as_bytes()]))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn global_mode(&self, ctx: &str) -> Result<Option<Mode>, StorageError> {
        self.subject_mode(ctx, "").await
    }

    async fn set_global_mode(&self, ctx: &str, mode: Mode) -> Result<(), StorageError> {
        self.set_subject_mode(ctx, "", mode).await
    }

    async fn put_user(&self, user: User) -> Result<(), StorageError> {
        let row = serde_json::to_vec(&user)?;
        self.users.insert(user.username.as_bytes(), row)?;
        Ok(())
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, StorageError> {
        match self.users.get(username.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let mut users = Vec::new();
        for entry in self.users.iter() {
            let (_, value) = entry?;
            users.push(serde_json::from_slice::<User>(&value)?);
        }
        Ok(users)
    }

    async fn delete_user(&self, username: &str) -> Result<bool, StorageError> {
        Ok(self.users.remove(username.as_bytes())?.is_some())
    }

    async fn put_api_key(&self, key: ApiKey) -> Result<(), StorageError> {
        let row = serde_json::to_vec(&key)?;
        self.api_keys.insert(key.key_id.as_bytes(), row)?;
        Ok(())
    }

    async fn get_api_key(&self, key_id: &str) -> Result<Option<ApiKey>, StorageError> {
        match self.api_keys.get(key_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, StorageError> {
        let mut keys = Vec::new();
        for entry in self.api_keys.iter() {
            let (_, value) = entry?;
            keys.push(serde_json::from_slice::<ApiKey>(&value)?);
        }
        Ok(keys)
    }

    async fn delete_api_key(&self, key_id: &str) -> Result<bool, StorageError> {
        Ok(self.api_keys.remove(key_id.as_bytes())?.is_some())
    }
}
