//! The in-memory backend: one mutex per context, plain maps for the logical
//! tables. Used for tests and for single-process deployments that accept
//! losing state on restart.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::error::StorageError;
use crate::storage::alloc::IdBlocks;
use crate::storage::{
    BindingRecord, NewSchema, SchemaRecord, SchemaStore, StoredVersion, VersionedSchema,
};
use crate::types::{ApiKey, Config, Mode, SchemaQuery, SubjectVersion, User};

#[derive(Default)]
struct ContextTables {
    schemas_by_id: BTreeMap<u32, SchemaRecord>,
    fingerprints: HashMap<String, u32>,
    subjects: BTreeMap<String, BTreeMap<u32, BindingRecord>>,
    /// subject -> (highest appended version, its schema id)
    latest: HashMap<String, (u32, u32)>,
    refs_by_target: HashMap<(String, u32), BTreeSet<(String, u32)>>,
    configs: BTreeMap<String, Config>,
    global_config: Option<Config>,
    modes: BTreeMap<String, Mode>,
    global_mode: Option<Mode>,
    /// Durable counter analog; the next unreserved id.
    next_id: u32,
}

impl ContextTables {
    fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }
}

pub struct MemoryStore {
    contexts: DashMap<String, Arc<Mutex<ContextTables>>>,
    users: Mutex<BTreeMap<String, User>>,
    api_keys: Mutex<BTreeMap<String, ApiKey>>,
    blocks: IdBlocks,
}

impl MemoryStore {
    pub fn new(id_block_size: u32) -> Self {
        let contexts = DashMap::new();
        contexts.insert(
            crate::context::DEFAULT_CONTEXT.to_string(),
            Arc::new(Mutex::new(ContextTables::new())),
        );
        Self {
            contexts,
            users: Mutex::new(BTreeMap::new()),
            api_keys: Mutex::new(BTreeMap::new()),
            blocks: IdBlocks::new(id_block_size),
        }
    }

    /// Context tables for a write path; creates the context lazily.
    fn tables_mut(&self, ctx: &str) -> Arc<Mutex<ContextTables>> {
        self.contexts
            .entry(ctx.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ContextTables::new())))
            .clone()
    }

    /// Context tables for a read path; absent contexts stay absent.
    fn tables(&self, ctx: &str) -> Option<Arc<Mutex<ContextTables>>> {
        self.contexts.get(ctx).map(|entry| entry.value().clone())
    }

    fn allocate_id(&self, ctx: &str, tables: &mut ContextTables) -> u32 {
        if let Some(id) = self.blocks.take(ctx) {
            return id;
        }
        let low = tables.next_id;
        tables.next_id = low + self.blocks.block_size();
        self.blocks.install(ctx, low)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(50)
    }
}

fn lock(tables: &Arc<Mutex<ContextTables>>) -> MutexGuard<'_, ContextTables> {
    tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
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

fn insert_reverse_refs(tables: &mut ContextTables, record: &NewSchema, version: u32) {
    for reference in &record.references {
        tables
            .refs_by_target
            .entry((reference.subject.clone(), reference.version))
            .or_default()
            .insert((record.subject.clone(), version));
    }
}

/// Remove the binding at `version` and clean up everything that hangs off
/// it: reverse reference edges, the orphaned content row, the fingerprint
/// row, and the latest pointer when the subject empties out.
fn purge_version(tables: &mut ContextTables, subject: &str, version: u32) {
    let Some(bindings) = tables.subjects.get_mut(subject) else {
        return;
    };
    let Some(binding) = bindings.remove(&version) else {
        return;
    };
    let schema_id = binding.schema_id;

    if let Some(schema) = tables.schemas_by_id.get(&schema_id) {
        let references = schema.references.clone();
        for reference in references {
            let target = (reference.subject.clone(), reference.version);
            if let Some(referrers) = tables.refs_by_target.get_mut(&target) {
                referrers.remove(&(subject.to_string(), version));
                if referrers.is_empty() {
                    tables.refs_by_target.remove(&target);
                }
            }
        }
    }

    let still_bound = tables
        .subjects
        .values()
        .any(|bindings| bindings.values().any(|b| b.schema_id == schema_id));
    if !still_bound {
        if let Some(schema) = tables.schemas_by_id.remove(&schema_id) {
            if tables.fingerprints.get(&schema.fingerprint) == Some(&schema_id) {
                tables.fingerprints.remove(&schema.fingerprint);
            }
        }
    }

    if tables
        .subjects
        .get(subject)
        .map(|bindings| bindings.is_empty())
        .unwrap_or(false)
    {
        tables.subjects.remove(subject);
        tables.latest.remove(subject);
    }
}

fn joined(
    tables: &ContextTables,
    binding: &BindingRecord,
) -> Result<VersionedSchema, StorageError> {
    let schema = tables
        .schemas_by_id
        .get(&binding.schema_id)
        .ok_or(StorageError::SchemaIdNotFound {
            id: binding.schema_id,
        })?
        .clone();
    Ok(VersionedSchema {
        binding: binding.clone(),
        schema,
    })
}

#[async_trait]
impl SchemaStore for MemoryStore {
    async fn create_schema(
        &self,
        ctx: &str,
        record: NewSchema,
    ) -> Result<StoredVersion, StorageError> {
        let tables = self.tables_mut(ctx);
        let mut tables = lock(&tables);

        // Dedup through the fingerprint table; repair a missing content row
        // the way a crash-recovery read would.
        let id = match tables.fingerprints.get(&record.fingerprint).copied() {
            Some(id) => {
                if !tables.schemas_by_id.contains_key(&id) {
                    let repaired = make_record(id, &record);
                    tables.schemas_by_id.insert(id, repaired);
                }
                id
            }
            None => {
                let id = self.allocate_id(ctx, &mut tables);
                tables.fingerprints.insert(record.fingerprint.clone(), id);
                let row = make_record(id, &record);
                tables.schemas_by_id.insert(id, row);
                id
            }
        };

        // Re-registering content already actively bound in this subject is
        // idempotent; the caller reads id and version out of the error.
        if let Some(bindings) = tables.subjects.get(&record.subject) {
            if let Some(existing) = bindings
                .values()
                .find(|binding| !binding.deleted && binding.schema_id == id)
            {
                return Err(StorageError::SchemaExists {
                    subject: record.subject.clone(),
                    id,
                    version: existing.version,
                });
            }
        }

        let version = tables
            .latest
            .get(&record.subject)
            .map(|(latest, _)| latest + 1)
            .unwrap_or(1);

        let binding = BindingRecord {
            subject: record.subject.clone(),
            version,
            schema_id: id,
            deleted: false,
            created_at: Utc::now(),
            metadata: None,
            rule_set: None,
        };
        tables
            .subjects
            .entry(record.subject.clone())
            .or_default()
            .insert(version, binding);
        tables.latest.insert(record.subject.clone(), (version, id));

        insert_reverse_refs(&mut tables, &record, version);

        Ok(StoredVersion { id, version })
    }

    async fn import_schema(
        &self,
        ctx: &str,
        record: NewSchema,
        id: u32,
        version: u32,
    ) -> Result<StoredVersion, StorageError> {
        let tables = self.tables_mut(ctx);
        let mut tables = lock(&tables);

        if let Some(existing) = tables.schemas_by_id.get(&id) {
            if existing.fingerprint != record.fingerprint {
                return Err(StorageError::SchemaIdConflict { id });
            }
        }

        if let Some(bindings) = tables.subjects.get(&record.subject) {
            if let Some(existing) = bindings.get(&version) {
                return Err(StorageError::SchemaExists {
                    subject: record.subject.clone(),
                    id: existing.schema_id,
                    version,
                });
            }
        }

        if !tables.schemas_by_id.contains_key(&id) {
            let row = make_record(id, &record);
            tables.schemas_by_id.insert(id, row);
        }
        // First importer of a fingerprint wins the dedup row; later imports
        // of the same content under other ids stay reachable by id.
        if !tables.fingerprints.contains_key(&record.fingerprint) {
            tables.fingerprints.insert(record.fingerprint.clone(), id);
        }

        let binding = BindingRecord {
            subject: record.subject.clone(),
            version,
            schema_id: id,
            deleted: false,
            created_at: Utc::now(),
            metadata: None,
            rule_set: None,
        };
        tables
            .subjects
            .entry(record.subject.clone())
            .or_default()
            .insert(version, binding);

        let advance = match tables.latest.get(&record.subject) {
            Some((latest, _)) => version > *latest,
            None => true,
        };
        if advance {
            tables.latest.insert(record.subject.clone(), (version, id));
        }

        insert_reverse_refs(&mut tables, &record, version);

        Ok(StoredVersion { id, version })
    }

    async fn next_schema_id(&self, ctx: &str) -> Result<u32, StorageError> {
        let tables = self.tables_mut(ctx);
        let mut tables = lock(&tables);
        Ok(self.allocate_id(ctx, &mut tables))
    }

    async fn max_schema_id(&self, ctx: &str) -> Result<u32, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(0);
        };
        let tables = lock(&tables);
        Ok(tables
            .schemas_by_id
            .keys()
            .next_back()
            .copied()
            .unwrap_or(0))
    }

    async fn set_next_schema_id(&self, ctx: &str, next: u32) -> Result<(), StorageError> {
        let tables = self.tables_mut(ctx);
        let mut tables = lock(&tables);
        tables.next_id = next;
        self.blocks.invalidate(ctx);
        Ok(())
    }

    async fn schema_by_id(&self, ctx: &str, id: u32) -> Result<SchemaRecord, StorageError> {
        let tables = self
            .tables(ctx)
            .ok_or(StorageError::SchemaIdNotFound { id })?;
        let tables = lock(&tables);
        tables
            .schemas_by_id
            .get(&id)
            .cloned()
            .ok_or(StorageError::SchemaIdNotFound { id })
    }

    async fn schemas_by_subject(
        &self,
        ctx: &str,
        subject: &str,
        include_deleted: bool,
    ) -> Result<Vec<VersionedSchema>, StorageError> {
        let tables = self.tables(ctx).ok_or_else(|| StorageError::SubjectNotFound {
            subject: subject.to_string(),
        })?;
        let tables = lock(&tables);
        let bindings = tables
            .subjects
            .get(subject)
            .ok_or_else(|| StorageError::SubjectNotFound {
                subject: subject.to_string(),
            })?;

        let mut versions = Vec::new();
        for binding in bindings.values() {
            if binding.deleted && !include_deleted {
                continue;
            }
            versions.push(joined(&tables, binding)?);
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
        let tables = self.tables(ctx).ok_or_else(|| StorageError::SubjectNotFound {
            subject: subject.to_string(),
        })?;
        let tables = lock(&tables);
        let bindings = tables
            .subjects
            .get(subject)
            .ok_or_else(|| StorageError::SubjectNotFound {
                subject: subject.to_string(),
            })?;
        let binding = bindings
            .get(&version)
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
        joined(&tables, binding)
    }

    async fn schema_by_fingerprint(
        &self,
        ctx: &str,
        subject: &str,
        fingerprint: &str,
        include_deleted: bool,
    ) -> Result<VersionedSchema, StorageError> {
        let tables = self.tables(ctx).ok_or_else(|| StorageError::SubjectNotFound {
            subject: subject.to_string(),
        })?;
        let tables = lock(&tables);
        let bindings = tables
            .subjects
            .get(subject)
            .ok_or_else(|| StorageError::SubjectNotFound {
                subject: subject.to_string(),
            })?;

        let mut found = None;
        for binding in bindings.values() {
            if binding.deleted && !include_deleted {
                continue;
            }
            if let Some(schema) = tables.schemas_by_id.get(&binding.schema_id) {
                if schema.fingerprint == fingerprint {
                    found = Some(binding);
                }
            }
        }
        match found {
            Some(binding) => joined(&tables, binding),
            None => Err(StorageError::SchemaNotFound {
                subject: subject.to_string(),
            }),
        }
    }

    async fn schema_by_global_fingerprint(
        &self,
        ctx: &str,
        fingerprint: &str,
    ) -> Result<Option<SchemaRecord>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(None);
        };
        let tables = lock(&tables);
        Ok(tables
            .fingerprints
            .get(fingerprint)
            .and_then(|id| tables.schemas_by_id.get(id))
            .cloned())
    }

    async fn latest_schema(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<VersionedSchema, StorageError> {
        let tables = self.tables(ctx).ok_or_else(|| StorageError::SubjectNotFound {
            subject: subject.to_string(),
        })?;
        let tables = lock(&tables);
        let bindings = tables
            .subjects
            .get(subject)
            .ok_or_else(|| StorageError::SubjectNotFound {
                subject: subject.to_string(),
            })?;
        let binding = bindings
            .values()
            .rev()
            .find(|binding| !binding.deleted)
            .ok_or_else(|| StorageError::SubjectNotFound {
                subject: subject.to_string(),
            })?;
        joined(&tables, binding)
    }

    async fn list_subjects(
        &self,
        ctx: &str,
        include_deleted: bool,
    ) -> Result<Vec<String>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(Vec::new());
        };
        let tables = lock(&tables);
        let mut subjects = Vec::new();
        for (subject, bindings) in &tables.subjects {
            let visible = bindings
                .values()
                .any(|binding| include_deleted || !binding.deleted);
            if visible {
                subjects.push(subject.clone());
            }
        }
        Ok(subjects)
    }

    async fn subject_exists(&self, ctx: &str, subject: &str) -> Result<bool, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(false);
        };
        let tables = lock(&tables);
        Ok(tables
            .subjects
            .get(subject)
            .map(|bindings| !bindings.is_empty())
            .unwrap_or(false))
    }

    async fn list_contexts(&self) -> Result<Vec<String>, StorageError> {
        let mut contexts: Vec<String> = self
            .contexts
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        contexts.sort();
        Ok(contexts)
    }

    async fn referenced_by(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
    ) -> Result<Vec<u32>, StorageError> {
        let tables = self.tables(ctx).ok_or_else(|| StorageError::SubjectNotFound {
            subject: subject.to_string(),
        })?;
        let tables = lock(&tables);
        let bindings = tables
            .subjects
            .get(subject)
            .ok_or_else(|| StorageError::SubjectNotFound {
                subject: subject.to_string(),
            })?;
        if !bindings.contains_key(&version) {
            return Err(StorageError::VersionNotFound {
                subject: subject.to_string(),
                version,
            });
        }

        let mut ids = BTreeSet::new();
        if let Some(referrers) = tables
            .refs_by_target
            .get(&(subject.to_string(), version))
        {
            for (ref_subject, ref_version) in referrers {
                let Some(binding) = tables
                    .subjects
                    .get(ref_subject)
                    .and_then(|bindings| bindings.get(ref_version))
                else {
                    continue;
                };
                if !binding.deleted {
                    ids.insert(binding.schema_id);
                }
            }
        }
        Ok(ids.into_iter().collect())
    }

    async fn subjects_by_schema_id(
        &self,
        ctx: &str,
        id: u32,
        include_deleted: bool,
    ) -> Result<Vec<String>, StorageError> {
        let tables = self
            .tables(ctx)
            .ok_or(StorageError::SchemaIdNotFound { id })?;
        let tables = lock(&tables);
        if !tables.schemas_by_id.contains_key(&id) {
            return Err(StorageError::SchemaIdNotFound { id });
        }
        let mut subjects = Vec::new();
        for (subject, bindings) in &tables.subjects {
            let bound = bindings
                .values()
                .any(|binding| binding.schema_id == id && (include_deleted || !binding.deleted));
            if bound {
                subjects.push(subject.clone());
            }
        }
        Ok(subjects)
    }

    async fn versions_by_schema_id(
        &self,
        ctx: &str,
        id: u32,
        include_deleted: bool,
    ) -> Result<Vec<SubjectVersion>, StorageError> {
        let tables = self
            .tables(ctx)
            .ok_or(StorageError::SchemaIdNotFound { id })?;
        let tables = lock(&tables);
        if !tables.schemas_by_id.contains_key(&id) {
            return Err(StorageError::SchemaIdNotFound { id });
        }
        let mut versions = Vec::new();
        for (subject, bindings) in &tables.subjects {
            for binding in bindings.values() {
                if binding.schema_id == id && (include_deleted || !binding.deleted) {
                    versions.push(SubjectVersion {
                        subject: subject.clone(),
                        version: binding.version,
                    });
                }
            }
        }
        Ok(versions)
    }

    async fn list_schemas(
        &self,
        ctx: &str,
        query: SchemaQuery,
    ) -> Result<Vec<VersionedSchema>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(Vec::new());
        };
        let tables = lock(&tables);

        let mut results = Vec::new();
        for (subject, bindings) in &tables.subjects {
            if let Some(prefix) = &query.subject_prefix {
                if !subject.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if query.latest_only {
                if let Some(binding) = bindings.values().rev().find(|b| !b.deleted) {
                    results.push(joined(&tables, binding)?);
                }
            } else {
                for binding in bindings.values() {
                    if binding.deleted && !query.include_deleted {
                        continue;
                    }
                    results.push(joined(&tables, binding)?);
                }
            }
        }

        let results = results
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(results)
    }

    async fn delete_version(
        &self,
        ctx: &str,
        subject: &str,
        version: u32,
        permanent: bool,
    ) -> Result<u32, StorageError> {
        let tables = self.tables(ctx).ok_or_else(|| StorageError::SubjectNotFound {
            subject: subject.to_string(),
        })?;
        let mut tables = lock(&tables);
        let deleted = tables
            .subjects
            .get(subject)
            .ok_or_else(|| StorageError::SubjectNotFound {
                subject: subject.to_string(),
            })?
            .get(&version)
            .ok_or_else(|| StorageError::VersionNotFound {
                subject: subject.to_string(),
                version,
            })?
            .deleted;

        if permanent {
            if !deleted {
                return Err(StorageError::VersionNotSoftDeleted {
                    subject: subject.to_string(),
                    version,
                });
            }
            purge_version(&mut tables, subject, version);
        } else {
            if deleted {
                return Err(StorageError::VersionSoftDeleted {
                    subject: subject.to_string(),
                    version,
                });
            }
            if let Some(binding) = tables
                .subjects
                .get_mut(subject)
                .and_then(|bindings| bindings.get_mut(&version))
            {
                binding.deleted = true;
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
        let tables = self.tables(ctx).ok_or_else(|| StorageError::SubjectNotFound {
            subject: subject.to_string(),
        })?;
        let mut tables = lock(&tables);
        let (all_versions, active_versions) = {
            let bindings = tables
                .subjects
                .get(subject)
                .ok_or_else(|| StorageError::SubjectNotFound {
                    subject: subject.to_string(),
                })?;
            if bindings.is_empty() {
                return Err(StorageError::SubjectNotFound {
                    subject: subject.to_string(),
                });
            }
            let all: Vec<u32> = bindings.keys().copied().collect();
            let active: Vec<u32> = bindings
                .iter()
                .filter(|(_, binding)| !binding.deleted)
                .map(|(version, _)| *version)
                .collect();
            (all, active)
        };

        if permanent {
            if !active_versions.is_empty() {
                return Err(StorageError::SubjectNotSoftDeleted {
                    subject: subject.to_string(),
                });
            }
            for version in &all_versions {
                purge_version(&mut tables, subject, *version);
            }
            tables.subjects.remove(subject);
            tables.latest.remove(subject);
            // Permanent subject deletion cascades to its config and mode.
            tables.configs.remove(subject);
            tables.modes.remove(subject);
            Ok(all_versions)
        } else {
            if active_versions.is_empty() {
                return Err(StorageError::SubjectSoftDeleted {
                    subject: subject.to_string(),
                });
            }
            if let Some(bindings) = tables.subjects.get_mut(subject) {
                for version in &active_versions {
                    if let Some(binding) = bindings.get_mut(version) {
                        binding.deleted = true;
                    }
                }
            }
            Ok(active_versions)
        }
    }

    async fn subject_config(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Option<Config>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(None);
        };
        let tables = lock(&tables);
        Ok(tables.configs.get(subject).cloned())
    }

    async fn set_subject_config(
        &self,
        ctx: &str,
        subject: &str,
        config: Config,
    ) -> Result<(), StorageError> {
        let tables = self.tables_mut(ctx);
        let mut tables = lock(&tables);
        tables.configs.insert(subject.to_string(), config);
        Ok(())
    }

    async fn delete_subject_config(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Option<Config>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(None);
        };
        let mut tables = lock(&tables);
        Ok(tables.configs.remove(subject))
    }

    async fn global_config(&self, ctx: &str) -> Result<Option<Config>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(None);
        };
        let tables = lock(&tables);
        Ok(tables.global_config.clone())
    }

    async fn set_global_config(&self, ctx: &str, config: Config) -> Result<(), StorageError> {
        let tables = self.tables_mut(ctx);
        let mut tables = lock(&tables);
        tables.global_config = Some(config);
        Ok(())
    }

    async fn delete_global_config(&self, ctx: &str) -> Result<Option<Config>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(None);
        };
        let mut tables = lock(&tables);
        Ok(tables.global_config.take())
    }

    async fn subject_mode(&self, ctx: &str, subject: &str) -> Result<Option<Mode>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(None);
        };
        let tables = lock(&tables);
        Ok(tables.modes.get(subject).copied())
    }

    async fn set_subject_mode(
        &self,
        ctx: &str,
        subject: &str,
        mode: Mode,
    ) -> Result<(), StorageError> {
        let tables = self.tables_mut(ctx);
        let mut tables = lock(&tables);
        tables.modes.insert(subject.to_string(), mode);
        Ok(())
    }

    async fn delete_subject_mode(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Option<Mode>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(None);
        };
        let mut tables = lock(&tables);
        Ok(tables.modes.remove(subject))
    }

    async fn global_mode(&self, ctx: &str) -> Result<Option<Mode>, StorageError> {
        let Some(tables) = self.tables(ctx) else {
            return Ok(None);
        };
        let tables = lock(&tables);
        Ok(tables.global_mode)
    }

    async fn set_global_mode(&self, ctx: &str, mode: Mode) -> Result<(), StorageError> {
        let tables = self.tables_mut(ctx);
        let mut tables = lock(&tables);
        tables.global_mode = Some(mode);
        Ok(())
    }

    async fn put_user(&self, user: User) -> Result<(), StorageError> {
        let mut users = self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, StorageError> {
        let users = self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(users.get(username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let users = self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(users.values().cloned().collect())
    }

    async fn delete_user(&self, username: &str) -> Result<bool, StorageError> {
        let mut users = self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(users.remove(username).is_some())
    }

    async fn put_api_key(&self, key: ApiKey) -> Result<(), StorageError> {
        let mut keys = self
            .api_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.insert(key.key_id.clone(), key);
        Ok(())
    }

    async fn get_api_key(&self, key_id: &str) -> Result<Option<ApiKey>, StorageError> {
        let keys = self
            .api_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(keys.get(key_id).cloned())
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, StorageError> {
        let keys = self
            .api_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(keys.values().cloned().collect())
    }

    async fn delete_api_key(&self, key_id: &str) -> Result<bool, StorageError> {
        let mut keys = self
            .api_keys
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(keys.remove(key_id).is_some())
    }
}
