use async_trait::async_trait;

use crate::SchemaRegistryError;

#[async_trait]
pub trait ContextAPI: Send + Sync {
    /// Get all registry contexts
    async fn get_contexts(&self) -> Result<Vec<String>, SchemaRegistryError>;
}
