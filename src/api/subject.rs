use async_trait::async_trait;

use crate::types::{
    RegisteredSchema, StringSchema, Subject, UnregisteredSchema, Version,
};
use crate::SchemaRegistryError;

#[async_trait]
pub trait SubjectAPI: Send + Sync {
    /// Get all subjects currently registered, across every context
    async fn get_subjects(&self, deleted: bool) -> Result<Vec<String>, SchemaRegistryError>;

    /// Get the version numbers registered under the provided subject
    async fn get_subject_versions(
        &self,
        subject: &str,
        deleted: bool,
    ) -> Result<Vec<u32>, SchemaRegistryError>;

    /// Get a specific version of the subject
    async fn get_subject_version(
        &self,
        subject: &str,
        version: Version,
        deleted: bool,
    ) -> Result<Subject, SchemaRegistryError>;

    /// Get the raw schema for a specific version of the subject
    async fn get_subject_version_raw(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<StringSchema, SchemaRegistryError>;

    /// Register a new schema version under the subject
    async fn register_schema(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
        normalize: bool,
    ) -> Result<RegisteredSchema, SchemaRegistryError>;

    /// Look up whether this exact schema is registered under the subject
    async fn lookup_subject_schema(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
        normalize: bool,
        deleted: bool,
    ) -> Result<Subject, SchemaRegistryError>;

    /// Delete a subject and its versions; returns the affected versions
    async fn delete_subject(
        &self,
        subject: &str,
        permanent: bool,
    ) -> Result<Vec<u32>, SchemaRegistryError>;

    /// Delete a specific version of the subject; returns the numeric version
    async fn delete_subject_version(
        &self,
        subject: &str,
        version: Version,
        permanent: bool,
    ) -> Result<u32, SchemaRegistryError>;

    /// Get ids of non-deleted schemas that reference the subject version
    async fn get_subject_version_references(
        &self,
        subject: &str,
        version: Version,
    ) -> Result<Vec<u32>, SchemaRegistryError>;
}
