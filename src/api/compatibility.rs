use async_trait::async_trait;

use crate::types::{CompatibilityCheck, UnregisteredSchema, Version};
use crate::SchemaRegistryError;

#[async_trait]
pub trait CompatibilityAPI: Send + Sync {
    /// Check a candidate schema against one registered version of the
    /// subject. `verbose` controls whether diagnostics are returned.
    async fn check_compatibility(
        &self,
        subject: &str,
        version: Version,
        schema: &UnregisteredSchema,
        verbose: bool,
    ) -> Result<CompatibilityCheck, SchemaRegistryError>;

    /// Check a candidate schema against all non-deleted versions of the
    /// subject.
    async fn check_compatibility_all(
        &self,
        subject: &str,
        schema: &UnregisteredSchema,
        verbose: bool,
    ) -> Result<CompatibilityCheck, SchemaRegistryError>;
}
