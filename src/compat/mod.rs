//! Compatibility checking.
//!
//! The seven compatibility levels decompose into a direction (who is the
//! reader, who is the writer) and a transitivity (latest version only, or
//! every non-deleted version). The per-language rules live in the sibling
//! modules; this module owns the decomposition and the verdict shape.

use crate::parser::ParsedSchema;
use crate::types::CompatibilityLevel;

pub mod avro;
pub mod json;
pub mod protobuf;

#[derive(Debug, Clone)]
pub struct CompatibilityReport {
    pub is_compatible: bool,
    pub messages: Vec<String>,
}

impl CompatibilityReport {
    pub fn compatible() -> Self {
        Self {
            is_compatible: true,
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    /// candidate reads data written under the existing version
    Backward,
    /// the existing version reads data written under the candidate
    Forward,
}

fn pair_messages(
    direction: Direction,
    candidate: &ParsedSchema,
    existing: &ParsedSchema,
) -> Vec<String> {
    match direction {
        Direction::Backward => check_pair(candidate, existing),
        Direction::Forward => check_pair(existing, candidate),
    }
}

/// Whether `reader` can read data written with `writer`. An empty message
/// list means compatible.
pub fn check_pair(reader: &ParsedSchema, writer: &ParsedSchema) -> Vec<String> {
    match (reader, writer) {
        (ParsedSchema::Avro(reader), ParsedSchema::Avro(writer)) => avro::check(reader, writer),
        (ParsedSchema::Protobuf(reader), ParsedSchema::Protobuf(writer)) => {
            protobuf::check(reader, writer)
        }
        (ParsedSchema::Json(reader), ParsedSchema::Json(writer)) => json::check(reader, writer),
        (reader, writer) => vec![format!(
            "SCHEMA_TYPE_MISMATCH: reader is {}, writer is {}",
            reader.schema_type(),
            writer.schema_type()
        )],
    }
}

/// Check a candidate schema against the non-deleted history of a subject,
/// in ascending version order. `history` must exclude soft-deleted versions;
/// its last entry is the current latest.
///
/// Evaluation stops at the first incompatible version and the report names
/// that version in its messages.
pub fn check_compatibility(
    level: CompatibilityLevel,
    candidate: &ParsedSchema,
    history: &[(u32, ParsedSchema)],
) -> CompatibilityReport {
    if history.is_empty() || level == CompatibilityLevel::None {
        return CompatibilityReport::compatible();
    }

    let directions: &[Direction] = match level {
        CompatibilityLevel::Backward | CompatibilityLevel::BackwardTransitive => {
            &[Direction::Backward]
        }
        CompatibilityLevel::Forward | CompatibilityLevel::ForwardTransitive => {
            &[Direction::Forward]
        }
        CompatibilityLevel::Full | CompatibilityLevel::FullTransitive => {
            &[Direction::Backward, Direction::Forward]
        }
        CompatibilityLevel::None => unreachable!(),
    };

    let versions: &[(u32, ParsedSchema)] = if level.is_transitive() {
        history
    } else {
        &history[history.len() - 1..]
    };

    for (version, existing) in versions {
        for direction in directions {
            let messages = pair_messages(*direction, candidate, existing);
            if !messages.is_empty() {
                return CompatibilityReport {
                    is_compatible: false,
                    messages: messages
                        .into_iter()
                        .map(|message| format!("version {}: {}", version, message))
                        .collect(),
                };
            }
        }
    }

    CompatibilityReport::compatible()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemaType;

    fn avro(raw: &str) -> ParsedSchema {
        ParsedSchema::parse(SchemaType::Avro, raw, &[]).unwrap()
    }

    const V1: &str = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"},{"name":"b","type":"string"}]}"#;
    const DROPPED_B: &str = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"}]}"#;

    #[test]
    fn none_level_accepts_anything() {
        let report = check_compatibility(
            CompatibilityLevel::None,
            &avro(r#""string""#),
            &[(1, avro(V1))],
        );
        assert!(report.is_compatible);
    }

    #[test]
    fn dropping_a_field_is_forward_but_not_backward_compatible() {
        let history = vec![(1, avro(V1))];

        let forward = check_compatibility(CompatibilityLevel::Forward, &avro(DROPPED_B), &history);
        assert!(forward.is_compatible);

        let backward =
            check_compatibility(CompatibilityLevel::Backward, &avro(DROPPED_B), &history);
        assert!(!backward.is_compatible);
        let joined = backward.messages.join("; ");
        assert!(joined.contains('b'), "message should name the field: {joined}");
        assert!(joined.contains("READER_FIELD_MISSING_DEFAULT_VALUE"));
    }

    #[test]
    fn transitive_levels_walk_the_full_history() {
        // v1 has only `a`; v2 adds `b` without a default. A candidate equal
        // to v2 is backward compatible with v2 but not with v1.
        let history = vec![(1, avro(DROPPED_B)), (2, avro(V1))];

        let latest_only = check_compatibility(CompatibilityLevel::Backward, &avro(V1), &history);
        assert!(latest_only.is_compatible);

        let transitive =
            check_compatibility(CompatibilityLevel::BackwardTransitive, &avro(V1), &history);
        assert!(!transitive.is_compatible);
        assert!(transitive.messages[0].starts_with("version 1:"));
    }

    #[test]
    fn schema_type_mismatch_is_reported() {
        let json = ParsedSchema::parse(SchemaType::Json, "{}", &[]).unwrap();
        let report = check_compatibility(CompatibilityLevel::Backward, &json, &[(1, avro(V1))]);
        assert!(!report.is_compatible);
        assert!(report.messages[0].contains("SCHEMA_TYPE_MISMATCH"));
    }
}
