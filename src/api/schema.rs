use async_trait::async_trait;

use crate::types::{Schema, SchemaQuery, SchemaType, StringSchema, Subject, SubjectVersion};
use crate::SchemaRegistryError;

#[async_trait]
pub trait SchemaAPI: Send + Sync {
    /// Get the schema identified by the provided id. The optional subject
    /// selects the registry context the id lives in.
    async fn get_schema_by_id(
        &self,
        id: u32,
        subject: Option<&str>,
    ) -> Result<Schema, SchemaRegistryError>;

    /// Get the raw schema text identified by the provided id
    async fn get_schema_by_id_raw(
        &self,
        id: u32,
        subject: Option<&str>,
    ) -> Result<StringSchema, SchemaRegistryError>;

    /// Get the schema in a requested output format (`resolved` for Avro,
    /// `serialized` for Protobuf)
    async fn get_schema_by_id_formatted(
        &self,
        id: u32,
        subject: Option<&str>,
        format: &str,
    ) -> Result<StringSchema, SchemaRegistryError>;

    /// Get all schema types supported by the registry
    async fn get_schema_types(&self) -> Result<Vec<SchemaType>, SchemaRegistryError>;

    /// List schemas with prefix, latest-only, deleted and paging filters
    async fn get_schemas(
        &self,
        query: SchemaQuery,
    ) -> Result<Vec<Subject>, SchemaRegistryError>;

    /// Get the subjects the provided schema id is bound under
    async fn get_schema_subjects(
        &self,
        id: u32,
        subject: Option<&str>,
        deleted: bool,
    ) -> Result<Vec<String>, SchemaRegistryError>;

    /// Get the subject-version pairs the provided schema id is bound at
    async fn get_schema_versions(
        &self,
        id: u32,
        subject: Option<&str>,
        deleted: bool,
    ) -> Result<Vec<SubjectVersion>, SchemaRegistryError>;
}
