//! The API traits of the registry core.
//!
//! One trait per API area, composed into [`SchemaRegistryAPI`]. The traits
//! mirror the REST surface; an embedding HTTP layer maps routes onto these
//! methods one-for-one. Subject parameters are wire-encoded and may carry a
//! context qualifier (`:.ctx:subject`).

use crate::api::compatibility::CompatibilityAPI;
use crate::api::configuration::ConfigurationAPI;
use crate::api::context::ContextAPI;
use crate::api::mode::ModeAPI;
use crate::api::schema::SchemaAPI;
use crate::api::subject::SubjectAPI;

pub mod compatibility;
pub mod configuration;
pub mod context;
pub mod mode;
pub mod schema;
pub mod subject;

#[async_trait::async_trait]
pub trait SchemaRegistryAPI:
    SchemaAPI + SubjectAPI + CompatibilityAPI + ConfigurationAPI + ModeAPI + ContextAPI + Send + Sync
{
}
