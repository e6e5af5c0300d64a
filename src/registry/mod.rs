//! The registry service: orchestrates the context router, the schema
//! parsers, the compatibility checkers and the storage contract behind the
//! public API traits.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::compatibility::CompatibilityAPI;
use crate::api::configuration::ConfigurationAPI;
use crate::api::context::ContextAPI;
use crate::api::mode::ModeAPI;
use crate::api::schema::SchemaAPI;
use crate::api::subject::SubjectAPI;
use crate::api::SchemaRegistryAPI;
use crate::compat;
use crate::config::RegistryConfig;
use crate::context::QualifiedSubject;
use crate::error::StorageError;
use crate::parser::refs::{RefNode, ReferenceGraph};
use crate::parser::{ParsedSchema, ResolvedReference};
use crate::storage::{NewSchema, SchemaStore, VersionedSchema};
use crate::types::{
    CompatibilityCheck, CompatibilityLevel, Config, ConfigGetResponse, ConfigPutResponse, Mode,
    Reference, RegisteredSchema, ResourceMode, Schema, SchemaQuery, SchemaType, StringSchema,
    Subject, SubjectVersion, UnregisteredSchema, Version,
};
use crate::SchemaRegistryError;

/// The registry core. One instance serves every context against a single
/// storage backend.
pub struct SchemaRegistry {
    store: Arc<dyn SchemaStore>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self::with_config(store, RegistryConfig::default())
    }

    pub fn with_config(store: Arc<dyn SchemaStore>, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    fn route(&self, subject: &str) -> Result<QualifiedSubject, SchemaRegistryError> {
        let qualified: QualifiedSubject = subject.parse()?;
        if !qualified.has_subject() {
            return Err(SchemaRegistryError::InvalidSubject {
                subject: subject.to_string(),
            });
        }
        Ok(qualified)
    }

    /// Context of an optional wire subject; the default context otherwise.
    fn route_context(&self, subject: Option<&str>) -> Result<String, SchemaRegistryError> {
        match subject {
            Some(subject) => {
                let qualified: QualifiedSubject = subject.parse()?;
                Ok(qualified.context().to_string())
            }
            None => Ok(crate::context::DEFAULT_CONTEXT.to_string()),
        }
    }

    async fn effective_mode(
        &self,
        ctx: &str,
        subject: Option<&str>,
    ) -> Result<Mode, SchemaRegistryError> {
        if let Some(subject) = subject {
            if let Some(mode) = self.store.subject_mode(ctx, subject).await? {
                return Ok(mode);
            }
        }
        if let Some(mode) = self.store.global_mode(ctx).await? {
            return Ok(mode);
        }
        Ok(self.config.default_mode)
    }

    async fn effective_compatibility(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<CompatibilityLevel, SchemaRegistryError> {
        if let Some(config) = self.store.subject_config(ctx, subject).await? {
            if let Some(level) = config.compatibility_level {
                return Ok(level);
            }
        }
        if let Some(config) = self.store.global_config(ctx).await? {
            if let Some(level) = config.compatibility_level {
                return Ok(level);
            }
        }
        Ok(self.config.default_compatibility)
    }

    async fn effective_normalize(
        &self,
        ctx: &str,
        subject: &str,
        requested: bool,
    ) -> Result<bool, SchemaRegistryError> {
        if requested {
            return Ok(true);
        }
        if let Some(config) = self.store.subject_config(ctx, subject).await? {
            if let Some(normalize) = config.normalize {
                return Ok(normalize);
            }
        }
        if let Some(config) = self.store.global_config(ctx).await? {
            if let Some(normalize) = config.normalize {
                return Ok(normalize);
            }
        }
        Ok(self.config.normalize_by_default)
    }

    fn guard_writes(&self, mode: Mode) -> Result<(), SchemaRegistryError> {
        if mode.is_read_only() {
            return Err(SchemaRegistryError::OperationNotPermitted {
                mode: mode.to_string(),
            });
        }
        Ok(())
    }

    /// Fetch the transitive closure of the references, reject cycles, and
    /// return the referenced schemas in dependency order (dependencies
    /// before their referrers), ready for the parser.
    async fn resolve_references(
        &self,
        ctx: &str,
        root_subject: &str,
        references: &[Reference],
    ) -> Result<Vec<ResolvedReference>, SchemaRegistryError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }

        struct Fetched {
            name: String,
            schema_type: SchemaType,
            schema_text: String,
            references: Vec<Reference>,
        }

        let root: RefNode = (root_subject.to_string(), 0);
        let mut graph = ReferenceGraph::new();
        let mut fetched: HashMap<RefNode, Fetched> = HashMap::new();
        let mut queue: VecDeque<(RefNode, Reference)> = references
            .iter()
            .map(|reference| (root.clone(), reference.clone()))
            .collect();

        while let Some((parent, reference)) = queue.pop_front() {
            let node: RefNode = (reference.subject.clone(), reference.version);
            graph.add_edge(parent, node.clone());
            if fetched.contains_key(&node) {
                continue;
            }

            let versioned = self
                .store
                .schema_by_subject_version(ctx, &reference.subject, reference.version, false)
                .await
                .map_err(|err| {
                    SchemaRegistryError::invalid_schema(format!(
                        "reference '{}' cannot be resolved: {}",
                        reference.name, err
                    ))
                })?;

            for nested in &versioned.schema.references {
                queue.push_back((node.clone(), nested.clone()));
            }
            fetched.insert(
                node,
                Fetched {
                    name: reference.name.clone(),
                    schema_type: versioned.schema.schema_type,
                    schema_text: versioned.schema.schema_text,
                    references: versioned.schema.references,
                },
            );
        }

        graph.ensure_acyclic()?;

        // Post-order over the fetched graph puts dependencies first.
        fn visit(
            node: &RefNode,
            fetched: &HashMap<RefNode, Fetched>,
            done: &mut Vec<RefNode>,
            seen: &mut HashSet<RefNode>,
        ) {
            if !seen.insert(node.clone()) {
                return;
            }
            if let Some(entry) = fetched.get(node) {
                for nested in &entry.references {
                    let nested_node: RefNode = (nested.subject.clone(), nested.version);
                    visit(&nested_node, fetched, done, seen);
                }
            }
            done.push(node.clone());
        }

        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for reference in references {
            let node: RefNode = (reference.subject.clone(), reference.version);
            visit(&node, &fetched, &mut order, &mut seen);
        }

        Ok(order
            .into_iter()
            .filter_map(|node| {
                fetched.get(&node).map(|entry| ResolvedReference {
                    name: entry.name.clone(),
                    schema_type: entry.schema_type,
                    schema: entry.schema_text.clone(),
                })
            })
            .collect())
    }

    async fn parse_request(
        &self,
        ctx: &str,
        subject: &str,
        schema: &UnregisteredSchema,
    ) -> Result<(ParsedSchema, Vec<Reference>), SchemaRegistryError> {
        let references = schema.references.clone().unwrap_or_default();
        let resolved = self.resolve_references(ctx, subject, &references).await?;
        let parsed = ParsedSchema::parse(schema.schema_type, &schema.schema, &resolved)?;
        Ok((parsed, references))
    }

    /// Non-deleted versions of the subject, parsed. Versions that no longer
    /// parse are skipped from compatibility evaluation with a warning.
    async fn parsed_history(
        &self,
        ctx: &str,
        subject: &str,
    ) -> Result<Vec<(u32, ParsedSchema)>, SchemaRegistryError> {
        let versions = match self.store.schemas_by_subject(ctx, subject, false).await {
            Ok(versions) => versions,
            Err(StorageError::SubjectNotFound { .. }) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut history = Vec::with_capacity(versions.len());
        for versioned in versions {
            match self.parse_stored(ctx, &versioned).await {
                Ok(parsed) => history.push((versioned.binding.version, parsed)),
                Err(err) => {
                    warn!(
                        subject,
                        version = versioned.binding.version,
                        error = %err,
                        "stored schema no longer parses, skipping from compatibility history"
                    );
                }
            }
        }
        Ok(history)
    }

    async fn parse_stored(
        &self,
        ctx: &str,
        versioned: &VersionedSchema,
    ) -> Result<ParsedSchema, SchemaRegistryError> {
        let resolved = self
            .resolve_references(ctx, &versioned.binding.subject, &versioned.schema.references)
            .await?;
        Ok(ParsedSchema::parse(
            versioned.schema.schema_type,
            &versioned.schema.schema_text,
            &resolved,
        )?)
    }

    fn subject_view(qualified: &QualifiedSubject, versioned: VersionedSchema) -> Subject {
        let references = if versioned.schema.references.is_empty() {
            None
        } else {
            Some(versioned.schema.references)
        };
        Subject {
            id: versioned.schema.id,
            subject: qualified.to_string(),
            version: versioned.binding.version,
            schema_type: versioned.schema.schema_type,
            schema: Cow::Owned(versioned.schema.schema_text),
            references,
            deleted: versioned.binding.deleted,
        }
    }

    async fn resolve_version(
        &self,
        ctx: &str,
        subject: &str,
        version: Version,
        include_deleted: bool,
    ) -> Result<VersionedSchema, SchemaRegistryError> {
        match version {
            Version::Latest => Ok(self.store.latest_schema(ctx, subject).await?),
            Version::Number(number) => Ok(self
                .store
                .schema_by_subject_version(ctx, subject, number, include_deleted)
                .await?),
        }
    }

    async fn import_schema(
        &self,
        ctx: &str,
        qualified: &QualifiedSubject,
        schema: &UnregisteredSchema,
        record: NewSchema,
    ) -> Result<RegisteredSchema, SchemaRegistryError> {
        let id = match schema.id {
            Some(id) => id,
            None => {
                // IMPORT without a pinned id still skips compatibility but
                // allocates normally.
                return match self.store.create_schema(ctx, record).await {
                    Ok(stored) => Ok(RegisteredSchema { id: stored.id }),
                    Err(StorageError::SchemaExists { id, .. }) => Ok(RegisteredSchema { id }),
                    Err(err) => Err(err.into()),
                };
            }
        };

        let version = match schema.version {
            Some(version) if version >= 1 => version,
            Some(version) => {
                return Err(SchemaRegistryError::invalid_version(version));
            }
            None => match self
                .store
                .schemas_by_subject(ctx, qualified.subject(), true)
                .await
            {
                Ok(versions) => versions
                    .iter()
                    .map(|versioned| versioned.binding.version)
                    .max()
                    .unwrap_or(0)
                    .saturating_add(1),
                Err(StorageError::SubjectNotFound { .. }) => 1,
                Err(err) => return Err(err.into()),
            },
        };

        match self.store.import_schema(ctx, record, id, version).await {
            Ok(stored) => Ok(RegisteredSchema { id: stored.id }),
            Err(StorageError::SchemaExists {
                id: existing_id, ..
            }) if existing_id == id => Ok(RegisteredSchema { id }),
            Err(StorageError::SchemaExists { id: existing_id, .. }) => {
                debug!(existing_id, requested = id, "import collided with an existing binding");
                Err(SchemaRegistryError::SchemaIdConflict { id })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl SubjectAPI for SchemaRegistry {
    async fn get_subjects(&self, deleted: bool) -> Result<Vec<String>, SchemaRegistryError> {
        let mut subjects = Vec::new();
        for ctx in self.store.list_contexts().await? {
            for subject in self.store.list_subjects(&ctx, deleted).await? {
                subjects.push(QualifiedSubject::new(&ctx, &subject)?.to_string());
            }
        }
        subjects.sort();
        Ok(subjects)
    }

    async fn get_subject_versions(
        &self,
        subject: &str,
        deleted: bool,
    ) -> Result<Vec<u32>, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let versions = self
            .store
            .schemas_by_subject(qualified.context(), qualified.subject(), deleted)
            .await?;
        Ok(versions
            .into_iter()
            .map(|versioned| versioned.binding.version)
            .collect())
    }

    async fn get_subject_version(
        &self,
        subject: &str,
        version: Version,
        deleted: bool,
    ) -> Result<Subject, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let versioned = self
            .resolve_version(qualified.context(), qualified.subject(), version, deleted)
            .await?;
        Ok(Self::subject_view(&qualified, versioned))
    }

    async fn get_subject_version_raw(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<StringSchema, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let versioned = self
            .resolve_version(qualified.context(), qualified.subject(), version, false)
            .await?;
        Ok(StringSchema(Cow::Owned(versioned.schema.schema_text)))
    }

    async fn register_schema(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
        normalize: bool,
    ) -> Result<RegisteredSchema, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();

        let mode = self
            .effective_mode(ctx, Some(qualified.subject()))
            .await?;
        self.guard_writes(mode)?;

        let (parsed, references) = self.parse_request(ctx, qualified.subject(), schema).await?;
        let normalize = self
            .effective_normalize(ctx, qualified.subject(), normalize)
            .await?;
        let canonical = if normalize {
            parsed.normalized()
        } else {
            parsed.canonical()
        };
        let fingerprint = crate::parser::fingerprint(&canonical);

        let record = NewSchema {
            subject: qualified.subject().to_string(),
            schema_type: schema.schema_type,
            schema_text: schema.schema.clone(),
            canonical_text: canonical,
            fingerprint,
            references,
            metadata: schema.metadata.clone(),
            rule_set: schema.rule_set.clone(),
        };

        if mode == Mode::Import {
            return self.import_schema(ctx, &qualified, schema, record).await;
        }

        let level = self
            .effective_compatibility(ctx, qualified.subject())
            .await?;
        if level != CompatibilityLevel::None {
            let history = self.parsed_history(ctx, qualified.subject()).await?;
            let report = compat::check_compatibility(level, &parsed, &history);
            if !report.is_compatible {
                return Err(SchemaRegistryError::IncompatibleSchema {
                    messages: report.messages,
                });
            }
        }

        match self.store.create_schema(ctx, record).await {
            Ok(stored) => Ok(RegisteredSchema { id: stored.id }),
            Err(StorageError::SchemaExists { id, .. }) => Ok(RegisteredSchema { id }),
            Err(err) => Err(err.into()),
        }
    }

    async fn lookup_subject_schema(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
        normalize: bool,
        deleted: bool,
    ) -> Result<Subject, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();

        if !self.store.subject_exists(ctx, qualified.subject()).await? {
            return Err(SchemaRegistryError::SubjectNotFound {
                subject: qualified.to_string(),
            });
        }

        let (parsed, _) = self.parse_request(ctx, qualified.subject(), schema).await?;
        let normalize = self
            .effective_normalize(ctx, qualified.subject(), normalize)
            .await?;
        let canonical = if normalize {
            parsed.normalized()
        } else {
            parsed.canonical()
        };
        let fingerprint = crate::parser::fingerprint(&canonical);

        let versioned = self
            .store
            .schema_by_fingerprint(ctx, qualified.subject(), &fingerprint, deleted)
            .await?;
        Ok(Self::subject_view(&qualified, versioned))
    }

    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<u32>, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();
        let mode = self
            .effective_mode(ctx, Some(qualified.subject()))
            .await?;
        self.guard_writes(mode)?;

        Ok(self
            .store
            .delete_subject(ctx, qualified.subject(), permanent)
            .await?)
    }

    async fn delete_subject_version(
        &self,
        subject: &str,
        version: Version,
        permanent: bool,
    ) -> Result<u32, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();
        let mode = self
            .effective_mode(ctx, Some(qualified.subject()))
            .await?;
        self.guard_writes(mode)?;

        let number = match version {
            Version::Number(number) => number,
            Version::Latest => {
                // Only an explicit numeric version may be purged.
                if permanent {
                    return Err(SchemaRegistryError::invalid_version("latest"));
                }
                self.store
                    .latest_schema(ctx, qualified.subject())
                    .await?
                    .binding
                    .version
            }
        };

        Ok(self
            .store
            .delete_version(ctx, qualified.subject(), number, permanent)
            .await?)
    }

    async fn get_subject_version_references(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<Vec<u32>, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();
        let number = match version {
            Version::Number(number) => number,
            Version::Latest => {
                self.store
                    .latest_schema(ctx, qualified.subject())
                    .await?
                    .binding
                    .version
            }
        };
        Ok(self
            .store
            .referenced_by(ctx, qualified.subject(), number)
            .await?)
    }
}

#[async_trait]
impl SchemaAPI for SchemaRegistry {
    async fn get_schema_by_id(
        &self,
        id: u32,
        subject: Option<&str>,
    ) -> Result<Schema, SchemaRegistryError> {
        let ctx = self.route_context(subject)?;
        let record = self.store.schema_by_id(&ctx, id).await?;
        let references = if record.references.is_empty() {
            None
        } else {
            Some(record.references)
        };
        Ok(Schema {
            schema_type: record.schema_type,
            schema: Cow::Owned(record.schema_text),
            references,
        })
    }

    async fn get_schema_by_id_raw(
        &self,
        id: u32,
        subject: Option<&str>,
    ) -> Result<StringSchema, SchemaRegistryError> {
        let ctx = self.route_context(subject)?;
        let record = self.store.schema_by_id(&ctx, id).await?;
        Ok(StringSchema(Cow::Owned(record.schema_text)))
    }

    async fn get_schema_by_id_formatted(
        &self,
        id: u32,
        subject: Option<&str>,
        format: &str,
    ) -> Result<StringSchema, SchemaRegistryError> {
        let ctx = self.route_context(subject)?;
        let record = self.store.schema_by_id(&ctx, id).await?;

        // The subject is unknown here; resolve references from the record
        // itself, rooted at a synthetic node.
        let resolved = self
            .resolve_references(&ctx, "", &record.references)
            .await?;
        let parsed = ParsedSchema::parse(record.schema_type, &record.schema_text, &resolved)?;
        Ok(StringSchema(Cow::Owned(parsed.formatted(format)?)))
    }

    async fn get_schema_types(&self) -> Result<Vec<SchemaType>, SchemaRegistryError> {
        Ok(vec![SchemaType::Avro, SchemaType::Protobuf, SchemaType::Json])
    }

    async fn get_schemas(
        &self,
        query: SchemaQuery,
    ) -> Result<Vec<Subject>, SchemaRegistryError> {
        let (ctx, local_prefix) = match &query.subject_prefix {
            Some(prefix) => {
                let qualified: QualifiedSubject = prefix.parse()?;
                let (ctx, subject) = qualified.into_parts();
                (ctx, Some(subject))
            }
            None => (crate::context::DEFAULT_CONTEXT.to_string(), None),
        };

        let store_query = SchemaQuery {
            subject_prefix: local_prefix,
            ..query
        };
        let results = self.store.list_schemas(&ctx, store_query).await?;

        let mut subjects = Vec::with_capacity(results.len());
        for versioned in results {
            let qualified = QualifiedSubject::new(&ctx, &versioned.binding.subject)?;
            subjects.push(Self::subject_view(&qualified, versioned));
        }
        Ok(subjects)
    }

    async fn get_schema_subjects(
        &self,
        id: u32,
        subject: Option<&str>,
        deleted: bool,
    ) -> Result<Vec<String>, SchemaRegistryError> {
        let ctx = self.route_context(subject)?;
        let subjects = self.store.subjects_by_schema_id(&ctx, id, deleted).await?;
        subjects
            .into_iter()
            .map(|name| Ok(QualifiedSubject::new(&ctx, &name)?.to_string()))
            .collect()
    }

    async fn get_schema_versions(
        &self,
        id: u32,
        subject: Option<&str>,
        deleted: bool,
    ) -> Result<Vec<SubjectVersion>, SchemaRegistryError> {
        let ctx = self.route_context(subject)?;
        let versions = self.store.versions_by_schema_id(&ctx, id, deleted).await?;
        versions
            .into_iter()
            .map(|entry| {
                Ok(SubjectVersion {
                    subject: QualifiedSubject::new(&ctx, &entry.subject)?.to_string(),
                    version: entry.version,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CompatibilityAPI for SchemaRegistry {
    async fn check_compatibility(
        &self,
        subject: &str,
        version: Version,
        schema: &UnregisteredSchema,
        verbose: bool,
    ) -> Result<CompatibilityCheck, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();

        let (parsed, _) = self.parse_request(ctx, qualified.subject(), schema).await?;
        let versioned = self
            .resolve_version(ctx, qualified.subject(), version, false)
            .await?;
        let existing = self.parse_stored(ctx, &versioned).await?;

        let level = untransitive(
            self.effective_compatibility(ctx, qualified.subject())
                .await?,
        );
        let history = vec![(versioned.binding.version, existing)];
        let report = compat::check_compatibility(level, &parsed, &history);
        Ok(check_response(report, verbose))
    }

    async fn check_compatibility_all(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
        verbose: bool,
    ) -> Result<CompatibilityCheck, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();

        let (parsed, _) = self.parse_request(ctx, qualified.subject(), schema).await?;
        let history = self.parsed_history(ctx, qualified.subject()).await?;
        let level = transitive(
            self.effective_compatibility(ctx, qualified.subject())
                .await?,
        );
        let report = compat::check_compatibility(level, &parsed, &history);
        Ok(check_response(report, verbose))
    }
}

#[async_trait]
impl ConfigurationAPI for SchemaRegistry {
    async fn get_global_config(
        &self,
        context: &str,
    ) -> Result<ConfigGetResponse, SchemaRegistryError> {
        match self.store.global_config(context).await? {
            Some(config) => Ok(ConfigGetResponse {
                compatibility_level: config
                    .compatibility_level
                    .unwrap_or(self.config.default_compatibility),
                alias: config.alias,
                normalize: config.normalize,
            }),
            None => Ok(ConfigGetResponse {
                compatibility_level: self.config.default_compatibility,
                alias: None,
                normalize: None,
            }),
        }
    }

    async fn update_global_config(
        &self,
        context: &str,
        config: Config,
    ) -> Result<ConfigPutResponse, SchemaRegistryError> {
        let mode = self.effective_mode(context, None).await?;
        self.guard_writes(mode)?;

        let compatibility = config
            .compatibility_level
            .unwrap_or(self.config.default_compatibility);
        self.store.set_global_config(context, config).await?;
        Ok(ConfigPutResponse { compatibility })
    }

    async fn delete_global_config(
        &self,
        context: &str,
    ) -> Result<CompatibilityLevel, SchemaRegistryError> {
        let mode = self.effective_mode(context, None).await?;
        self.guard_writes(mode)?;

        let removed = self.store.delete_global_config(context).await?;
        Ok(removed
            .and_then(|config| config.compatibility_level)
            .unwrap_or(self.config.default_compatibility))
    }

    async fn get_subject_config(
        &self,
        subject: &str,
        default_to_global: bool,
    ) -> Result<ConfigGetResponse, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();

        if let Some(config) = self
            .store
            .subject_config(ctx, qualified.subject())
            .await?
        {
            let compatibility_level = match config.compatibility_level {
                Some(level) => level,
                None => self.effective_compatibility(ctx, qualified.subject()).await?,
            };
            return Ok(ConfigGetResponse {
                compatibility_level,
                alias: config.alias,
                normalize: config.normalize,
            });
        }

        if default_to_global {
            return self.get_global_config(ctx).await;
        }

        Err(SchemaRegistryError::SubjectConfigNotFound {
            subject: qualified.to_string(),
        })
    }

    async fn update_subject_config(
        &self,
        subject: &str,
        config: Config,
    ) -> Result<ConfigPutResponse, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();
        let mode = self
            .effective_mode(ctx, Some(qualified.subject()))
            .await?;
        self.guard_writes(mode)?;

        let compatibility = config
            .compatibility_level
            .unwrap_or(self.config.default_compatibility);
        self.store
            .set_subject_config(ctx, qualified.subject(), config)
            .await?;
        Ok(ConfigPutResponse { compatibility })
    }

    async fn delete_subject_config(
        &self,
        subject: &str,
    ) -> Result<CompatibilityLevel, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();
        let mode = self
            .effective_mode(ctx, Some(qualified.subject()))
            .await?;
        self.guard_writes(mode)?;

        let removed = self
            .store
            .delete_subject_config(ctx, qualified.subject())
            .await?;
        match removed {
            Some(config) => match config.compatibility_level {
                Some(level) => Ok(level),
                None => self.effective_compatibility(ctx, qualified.subject()).await,
            },
            None => Err(SchemaRegistryError::SubjectConfigNotFound {
                subject: qualified.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ModeAPI for SchemaRegistry {
    async fn get_global_mode(&self, context: &str) -> Result<ResourceMode, SchemaRegistryError> {
        let mode = self
            .store
            .global_mode(context)
            .await?
            .unwrap_or(self.config.default_mode);
        Ok(ResourceMode { mode })
    }

    async fn update_global_mode(
        &self,
        context: &str,
        mode: Mode,
        force: bool,
    ) -> Result<ResourceMode, SchemaRegistryError> {
        let current = self.effective_mode(context, None).await?;
        // READONLY_OVERRIDE still permits mode changes; plain READONLY does
        // not.
        if current == Mode::ReadOnly {
            return Err(SchemaRegistryError::OperationNotPermitted {
                mode: current.to_string(),
            });
        }
        if mode == Mode::Import && !force && self.store.max_schema_id(context).await? > 0 {
            return Err(SchemaRegistryError::invalid_mode(
                "IMPORT requires force=true on a non-empty context",
            ));
        }

        self.store.set_global_mode(context, mode).await?;
        Ok(ResourceMode { mode })
    }

    async fn get_subject_mode(
        &self,
        subject: &str,
        default_to_global: bool,
    ) -> Result<ResourceMode, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();

        if let Some(mode) = self.store.subject_mode(ctx, qualified.subject()).await? {
            return Ok(ResourceMode { mode });
        }
        if default_to_global {
            return self.get_global_mode(ctx).await;
        }
        Err(SchemaRegistryError::SubjectModeNotFound {
            subject: qualified.to_string(),
        })
    }

    async fn update_subject_mode(
        &self,
        subject: &str,
        mode: Mode,
        force: bool,
    ) -> Result<ResourceMode, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();

        let current = self
            .effective_mode(ctx, Some(qualified.subject()))
            .await?;
        if current == Mode::ReadOnly {
            return Err(SchemaRegistryError::OperationNotPermitted {
                mode: current.to_string(),
            });
        }
        if mode == Mode::Import
            && !force
            && self.store.subject_exists(ctx, qualified.subject()).await?
        {
            return Err(SchemaRegistryError::invalid_mode(
                "IMPORT requires force=true on a subject with registered schemas",
            ));
        }

        self.store
            .set_subject_mode(ctx, qualified.subject(), mode)
            .await?;
        Ok(ResourceMode { mode })
    }

    async fn delete_subject_mode(
        &self,
        subject: &str,
    ) -> Result<ResourceMode, SchemaRegistryError> {
        let qualified = self.route(subject)?;
        let ctx = qualified.context();

        match self
            .store
            .delete_subject_mode(ctx, qualified.subject())
            .await?
        {
            Some(mode) => Ok(ResourceMode { mode }),
            None => Err(SchemaRegistryError::SubjectModeNotFound {
                subject: qualified.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ContextAPI for SchemaRegistry {
    async fn get_contexts(&self) -> Result<Vec<String>, SchemaRegistryError> {
        Ok(self.store.list_contexts().await?)
    }
}

impl SchemaRegistryAPI for SchemaRegistry {}

fn untransitive(level: CompatibilityLevel) -> CompatibilityLevel {
    match level {
        CompatibilityLevel::BackwardTransitive => CompatibilityLevel::Backward,
        CompatibilityLevel::ForwardTransitive => CompatibilityLevel::Forward,
        CompatibilityLevel::FullTransitive => CompatibilityLevel::Full,
        other => other,
    }
}

fn transitive(level: CompatibilityLevel) -> CompatibilityLevel {
    match level {
        CompatibilityLevel::Backward => CompatibilityLevel::BackwardTransitive,
        CompatibilityLevel::Forward => CompatibilityLevel::ForwardTransitive,
        CompatibilityLevel::Full => CompatibilityLevel::FullTransitive,
        other => other,
    }
}

fn check_response(report: compat::CompatibilityReport, verbose: bool) -> CompatibilityCheck {
    CompatibilityCheck {
        is_compatible: report.is_compatible,
        messages: verbose.then_some(report.messages),
    }
}
