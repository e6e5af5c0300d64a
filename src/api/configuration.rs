use async_trait::async_trait;

use crate::types::{CompatibilityLevel, Config, ConfigGetResponse, ConfigPutResponse};
use crate::SchemaRegistryError;

#[async_trait]
pub trait ConfigurationAPI: Send + Sync {
    /// Get the global configuration of a context
    async fn get_global_config(
        &self,
        context: &str,
    ) -> Result<ConfigGetResponse, SchemaRegistryError>;

    /// Update the global configuration of a context
    async fn update_global_config(
        &self,
        context: &str,
        config: Config,
    ) -> Result<ConfigPutResponse, SchemaRegistryError>;

    /// Delete the global configuration of a context; returns the previously
    /// effective level
    async fn delete_global_config(
        &self,
        context: &str,
    ) -> Result<CompatibilityLevel, SchemaRegistryError>;

    /// Get the configuration for a specific subject. With
    /// `default_to_global` the lookup walks subject, then context global,
    /// then the process default; without it an absent subject config is a
    /// not-found error.
    async fn get_subject_config(
        &self,
        subject: &str,
        default_to_global: bool,
    ) -> Result<ConfigGetResponse, SchemaRegistryError>;

    /// Update the configuration for a specific subject
    async fn update_subject_config(
        &self,
        subject: &str,
        config: Config,
    ) -> Result<ConfigPutResponse, SchemaRegistryError>;

    /// Delete the configuration for a specific subject; returns the
    /// previously effective level
    async fn delete_subject_config(
        &self,
        subject: &str,
    ) -> Result<CompatibilityLevel, SchemaRegistryError>;
}
