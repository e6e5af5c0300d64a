use async_trait::async_trait;

use crate::types::{Mode, ResourceMode};
use crate::SchemaRegistryError;

#[async_trait]
pub trait ModeAPI: Send + Sync {
    /// Get the global resource mode of a context
    async fn get_global_mode(&self, context: &str) -> Result<ResourceMode, SchemaRegistryError>;

    /// Set the global resource mode of a context. Switching to IMPORT while
    /// the context already holds schemas requires `force`.
    async fn update_global_mode(
        &self,
        context: &str,
        mode: Mode,
        force: bool,
    ) -> Result<ResourceMode, SchemaRegistryError>;

    /// Get the resource mode of a subject
    async fn get_subject_mode(
        &self,
        subject: &str,
        default_to_global: bool,
    ) -> Result<ResourceMode, SchemaRegistryError>;

    /// Set the resource mode of a subject
    async fn update_subject_mode(
        &self,
        subject: &str,
        mode: Mode,
        force: bool,
    ) -> Result<ResourceMode, SchemaRegistryError>;

    /// Delete the subject resource mode; the subject falls back to the
    /// global mode afterwards
    async fn delete_subject_mode(&self, subject: &str) -> Result<ResourceMode, SchemaRegistryError>;
}
