use std::error::Error as StdError;

use thiserror::Error as ThisError;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors produced by a storage backend.
///
/// These are translated into [`SchemaRegistryError`] values at the registry
/// service boundary; the `SchemaExists` variant in particular is not an error
/// at the public surface (re-registration is idempotent).
#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("Subject '{subject}' not found")]
    SubjectNotFound { subject: String },

    #[error("Version {version} of subject '{subject}' not found")]
    VersionNotFound { subject: String, version: u32 },

    #[error("Schema not found in subject '{subject}'")]
    SchemaNotFound { subject: String },

    #[error("Schema {id} not found")]
    SchemaIdNotFound { id: u32 },

    #[error("Subject '{subject}' is already soft-deleted")]
    SubjectSoftDeleted { subject: String },

    #[error("Subject '{subject}' was not soft-deleted before permanent deletion")]
    SubjectNotSoftDeleted { subject: String },

    #[error("Version {version} of subject '{subject}' is already soft-deleted")]
    VersionSoftDeleted { subject: String, version: u32 },

    #[error("Version {version} of subject '{subject}' was not soft-deleted before permanent deletion")]
    VersionNotSoftDeleted { subject: String, version: u32 },

    #[error("Schema is already registered under subject '{subject}' with id {id} version {version}")]
    SchemaExists {
        subject: String,
        id: u32,
        version: u32,
    },

    #[error("Schema id {id} conflicts with an existing schema")]
    SchemaIdConflict { id: u32 },

    #[error("No configuration found for subject '{subject}'")]
    ConfigNotFound { subject: String },

    #[error("No mode found for subject '{subject}'")]
    ModeNotFound { subject: String },

    #[error("Compare-and-swap contention exhausted after {attempts} attempts")]
    CasExhausted { attempts: u32 },

    #[error("Error encoding stored record: {source}")]
    Encoding {
        #[from]
        source: serde_json::Error,
    },

    #[error("Backend error: {source}")]
    Backend { source: BoxError },
}

impl StorageError {
    pub fn backend<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        StorageError::Backend {
            source: Box::new(source),
        }
    }
}

impl From<sled::Error> for StorageError {
    fn from(source: sled::Error) -> Self {
        StorageError::backend(source)
    }
}

/// The public error surface of the registry.
///
/// Every variant maps onto the wire error envelope `{error_code, message}`
/// via [`SchemaRegistryError::error_code`] and
/// [`SchemaRegistryError::http_status`].
#[derive(Debug, ThisError)]
pub enum SchemaRegistryError {
    #[error("Subject '{subject}' not found")]
    SubjectNotFound { subject: String },

    #[error("Version {version} not found for subject '{subject}'")]
    VersionNotFound { subject: String, version: String },

    #[error("Schema not found in subject '{subject}'")]
    SchemaNotFound { subject: String },

    #[error("Schema {id} not found")]
    SchemaIdNotFound { id: u32 },

    #[error("Subject '{subject}' is already soft-deleted")]
    SubjectSoftDeleted { subject: String },

    #[error("Subject '{subject}' must be soft-deleted before being permanently deleted")]
    SubjectNotSoftDeleted { subject: String },

    #[error("Version {version} of subject '{subject}' is already soft-deleted")]
    VersionSoftDeleted { subject: String, version: u32 },

    #[error("Version {version} of subject '{subject}' must be soft-deleted before being permanently deleted")]
    VersionNotSoftDeleted { subject: String, version: u32 },

    #[error("No compatibility configuration found for subject '{subject}'")]
    SubjectConfigNotFound { subject: String },

    #[error("No mode found for subject '{subject}'")]
    SubjectModeNotFound { subject: String },

    #[error("Incompatible schema: {}", messages.join("; "))]
    IncompatibleSchema { messages: Vec<String> },

    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Invalid version: {version}")]
    InvalidVersion { version: String },

    #[error("Invalid compatibility level: {level}")]
    InvalidCompatibilityLevel { level: String },

    #[error("Invalid mode: {mode}")]
    InvalidMode { mode: String },

    #[error("Invalid schema type: {schema_type}")]
    InvalidSchemaType { schema_type: String },

    #[error("Invalid subject name: {subject}")]
    InvalidSubject { subject: String },

    #[error("Operation not permitted while the registry is in {mode} mode")]
    OperationNotPermitted { mode: String },

    #[error("Schema id {id} overlaps with an existing schema")]
    SchemaIdConflict { id: u32 },

    #[error("Storage error: {source}")]
    Storage { source: StorageError },
}

impl SchemaRegistryError {
    pub fn invalid_schema<T: ToString>(message: T) -> Self {
        SchemaRegistryError::InvalidSchema {
            message: message.to_string(),
        }
    }

    pub fn invalid_schema_type<T: ToString>(s: T) -> Self {
        SchemaRegistryError::InvalidSchemaType {
            schema_type: s.to_string(),
        }
    }

    pub fn invalid_version<T: ToString>(s: T) -> Self {
        SchemaRegistryError::InvalidVersion {
            version: s.to_string(),
        }
    }

    pub fn invalid_compatibility_level<T: ToString>(s: T) -> Self {
        SchemaRegistryError::InvalidCompatibilityLevel {
            level: s.to_string(),
        }
    }

    pub fn invalid_mode<T: ToString>(s: T) -> Self {
        SchemaRegistryError::InvalidMode {
            mode: s.to_string(),
        }
    }

    /// The wire error code of the error envelope.
    pub fn error_code(&self) -> u32 {
        match self {
            SchemaRegistryError::SubjectNotFound { .. } => 40401,
            SchemaRegistryError::VersionNotFound { .. } => 40402,
            SchemaRegistryError::SchemaNotFound { .. } => 40403,
            SchemaRegistryError::SchemaIdNotFound { .. } => 40403,
            SchemaRegistryError::SubjectSoftDeleted { .. } => 40404,
            SchemaRegistryError::SubjectNotSoftDeleted { .. } => 40405,
            SchemaRegistryError::VersionSoftDeleted { .. } => 40406,
            SchemaRegistryError::VersionNotSoftDeleted { .. } => 40405,
            SchemaRegistryError::SubjectConfigNotFound { .. } => 40408,
            SchemaRegistryError::SubjectModeNotFound { .. } => 40409,
            SchemaRegistryError::IncompatibleSchema { .. } => 409,
            SchemaRegistryError::InvalidSchema { .. } => 42201,
            SchemaRegistryError::InvalidSchemaType { .. } => 42201,
            SchemaRegistryError::InvalidSubject { .. } => 42201,
            SchemaRegistryError::InvalidVersion { .. } => 42202,
            SchemaRegistryError::InvalidCompatibilityLevel { .. } => 42203,
            SchemaRegistryError::InvalidMode { .. } => 42204,
            SchemaRegistryError::OperationNotPermitted { .. } => 42205,
            SchemaRegistryError::SchemaIdConflict { .. } => 42207,
            SchemaRegistryError::Storage { .. } => 50001,
        }
    }

    /// The HTTP status an embedding transport should answer with.
    pub fn http_status(&self) -> u16 {
        match self.error_code() {
            code if code >= 50000 => 500,
            code if code >= 42200 => 422,
            code if code >= 40400 => 404,
            code => code as u16,
        }
    }
}

impl From<StorageError> for SchemaRegistryError {
    fn from(source: StorageError) -> Self {
        match source {
            StorageError::SubjectNotFound { subject } => {
                SchemaRegistryError::SubjectNotFound { subject }
            }
            StorageError::VersionNotFound { subject, version } => {
                SchemaRegistryError::VersionNotFound {
                    subject,
                    version: version.to_string(),
                }
            }
            StorageError::SchemaNotFound { subject } => {
                SchemaRegistryError::SchemaNotFound { subject }
            }
            StorageError::SchemaIdNotFound { id } => SchemaRegistryError::SchemaIdNotFound { id },
            StorageError::SubjectSoftDeleted { subject } => {
                SchemaRegistryError::SubjectSoftDeleted { subject }
            }
            StorageError::SubjectNotSoftDeleted { subject } => {
                SchemaRegistryError::SubjectNotSoftDeleted { subject }
            }
            StorageError::VersionSoftDeleted { subject, version } => {
                SchemaRegistryError::VersionSoftDeleted { subject, version }
            }
            StorageError::VersionNotSoftDeleted { subject, version } => {
                SchemaRegistryError::VersionNotSoftDeleted { subject, version }
            }
            StorageError::SchemaIdConflict { id } => SchemaRegistryError::SchemaIdConflict { id },
            StorageError::ConfigNotFound { subject } => {
                SchemaRegistryError::SubjectConfigNotFound { subject }
            }
            StorageError::ModeNotFound { subject } => {
                SchemaRegistryError::SubjectModeNotFound { subject }
            }
            other => SchemaRegistryError::Storage { source: other },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_http_statuses() {
        let not_found = SchemaRegistryError::SubjectNotFound {
            subject: "orders-value".into(),
        };
        assert_eq!(not_found.error_code(), 40401);
        assert_eq!(not_found.http_status(), 404);

        let incompatible = SchemaRegistryError::IncompatibleSchema {
            messages: vec!["reader field 'b' has no default".into()],
        };
        assert_eq!(incompatible.error_code(), 409);
        assert_eq!(incompatible.http_status(), 409);

        let gated = SchemaRegistryError::OperationNotPermitted {
            mode: "READONLY".into(),
        };
        assert_eq!(gated.error_code(), 42205);
        assert_eq!(gated.http_status(), 422);

        let internal = SchemaRegistryError::Storage {
            source: StorageError::CasExhausted { attempts: 5 },
        };
        assert_eq!(internal.error_code(), 50001);
        assert_eq!(internal.http_status(), 500);
    }

    #[test]
    fn storage_not_found_errors_keep_their_specific_codes() {
        let err: SchemaRegistryError = StorageError::VersionSoftDeleted {
            subject: "s".into(),
            version: 1,
        }
        .into();
        assert_eq!(err.error_code(), 40406);
    }
}
