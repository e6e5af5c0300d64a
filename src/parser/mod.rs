//! Schema parsing and canonicalization.
//!
//! Each schema language exposes the same four operations: `parse`,
//! `canonical`, `normalized` and `formatted`. The canonical form is the
//! input to fingerprinting and must include field defaults, otherwise two
//! schemas differing only in defaults would deduplicate onto one id.

use sha2::{Digest, Sha256};
use thiserror::Error as ThisError;

use crate::types::SchemaType;
use crate::SchemaRegistryError;

pub mod avro;
pub mod json;
pub mod protobuf;
pub mod refs;

/// A previously registered schema handed to the parser so it can resolve a
/// named reference. Assembled by the registry from storage lookups.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// The logical name the referencing schema uses.
    pub name: String,
    pub schema_type: SchemaType,
    pub schema: String,
}

#[derive(Debug, ThisError)]
pub enum ParseError {
    #[error("Invalid Avro schema: {message}")]
    Avro { message: String },

    #[error("Invalid Protobuf schema at line {line}: {message}")]
    Protobuf { line: usize, message: String },

    #[error("Invalid JSON Schema: {message}")]
    Json { message: String },

    #[error("Cyclic reference through subject '{subject}' version {version}")]
    CyclicReference { subject: String, version: u32 },

    #[error("Reference '{name}' has schema type {actual}, expected {expected}")]
    ReferenceTypeMismatch {
        name: String,
        expected: SchemaType,
        actual: SchemaType,
    },

    #[error("Unknown format '{format}' for schema type {schema_type}")]
    UnknownFormat {
        format: String,
        schema_type: SchemaType,
    },
}

impl From<ParseError> for SchemaRegistryError {
    fn from(err: ParseError) -> Self {
        SchemaRegistryError::invalid_schema(err)
    }
}

/// A parsed schema of any supported language.
#[derive(Debug, Clone)]
pub enum ParsedSchema {
    Avro(avro::AvroParsed),
    Protobuf(protobuf::ProtoSchema),
    Json(json::JsonParsed),
}

impl ParsedSchema {
    /// Parse `raw` as a schema of `schema_type`, resolving named references
    /// against the supplied, previously registered schemas.
    pub fn parse(
        schema_type: SchemaType,
        raw: &str,
        references: &[ResolvedReference],
    ) -> Result<Self, ParseError> {
        for reference in references {
            if reference.schema_type != schema_type {
                return Err(ParseError::ReferenceTypeMismatch {
                    name: reference.name.clone(),
                    expected: schema_type,
                    actual: reference.schema_type,
                });
            }
        }

        match schema_type {
            SchemaType::Avro => Ok(ParsedSchema::Avro(avro::parse(raw, references)?)),
            SchemaType::Protobuf => Ok(ParsedSchema::Protobuf(protobuf::parse(raw, references)?)),
            SchemaType::Json => Ok(ParsedSchema::Json(json::parse(raw, references)?)),
        }
    }

    pub fn schema_type(&self) -> SchemaType {
        match self {
            ParsedSchema::Avro(_) => SchemaType::Avro,
            ParsedSchema::Protobuf(_) => SchemaType::Protobuf,
            ParsedSchema::Json(_) => SchemaType::Json,
        }
    }

    /// The deterministic comparison form. Input to [`fingerprint`].
    pub fn canonical(&self) -> String {
        match self {
            ParsedSchema::Avro(parsed) => parsed.canonical(),
            ParsedSchema::Protobuf(parsed) => parsed.canonical(),
            ParsedSchema::Json(parsed) => parsed.canonical(),
        }
    }

    /// The stronger canonicalization applied when the caller requests
    /// normalization.
    pub fn normalized(&self) -> String {
        match self {
            ParsedSchema::Avro(parsed) => parsed.normalized(),
            ParsedSchema::Protobuf(parsed) => parsed.normalized(),
            ParsedSchema::Json(parsed) => parsed.normalized(),
        }
    }

    /// Render the schema in a caller-requested output format.
    ///
    /// Avro understands `resolved` (named references inlined); Protobuf
    /// understands `serialized` (the normalized descriptor text). Anything
    /// else is rejected; callers wanting the submitted text read it from
    /// storage instead.
    pub fn formatted(&self, format: &str) -> Result<String, ParseError> {
        match (self, format) {
            (ParsedSchema::Avro(parsed), "resolved") => Ok(parsed.resolved()),
            (ParsedSchema::Protobuf(parsed), "serialized") => Ok(parsed.canonical()),
            _ => Err(ParseError::UnknownFormat {
                format: format.to_string(),
                schema_type: self.schema_type(),
            }),
        }
    }
}

/// SHA-256 over the canonical bytes, hex encoded.
pub fn fingerprint(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_hex_sha256() {
        let fp = fingerprint(r#""string""#);
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, fingerprint(r#""string""#));
        assert_ne!(fp, fingerprint(r#""bytes""#));
    }

    #[test]
    fn reference_type_mismatch_is_rejected() {
        let reference = ResolvedReference {
            name: "Author".into(),
            schema_type: SchemaType::Json,
            schema: "{}".into(),
        };
        let err = ParsedSchema::parse(SchemaType::Avro, r#""string""#, &[reference]).unwrap_err();
        assert!(matches!(err, ParseError::ReferenceTypeMismatch { .. }));
    }
}
