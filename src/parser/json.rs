//! JSON Schema parsing and canonical forms.
//!
//! A JSON Schema stays a `serde_json::Value` tree; canonicalization relies
//! on `serde_json`'s ordered object maps so that semantically identical
//! documents serialize to identical bytes.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{ParseError, ResolvedReference};

/// A parsed JSON Schema document plus the reference documents it may point
/// at through `$ref`, keyed by the logical reference name.
#[derive(Debug, Clone)]
pub struct JsonParsed {
    pub root: Value,
    pub references: BTreeMap<String, Value>,
}

pub fn parse(raw: &str, references: &[ResolvedReference]) -> Result<JsonParsed, ParseError> {
    let root: Value = serde_json::from_str(raw).map_err(|err| ParseError::Json {
        message: err.to_string(),
    })?;

    if !matches!(root, Value::Object(_) | Value::Bool(_)) {
        return Err(ParseError::Json {
            message: "a JSON Schema must be an object or a boolean".into(),
        });
    }

    let mut resolved = BTreeMap::new();
    for reference in references {
        let value: Value =
            serde_json::from_str(&reference.schema).map_err(|err| ParseError::Json {
                message: format!("reference '{}': {}", reference.name, err),
            })?;
        if !matches!(value, Value::Object(_) | Value::Bool(_)) {
            return Err(ParseError::Json {
                message: format!("reference '{}' is not a JSON Schema", reference.name),
            });
        }
        resolved.insert(reference.name.clone(), value);
    }

    Ok(JsonParsed {
        root,
        references: resolved,
    })
}

impl JsonParsed {
    /// Minimal serialization with object keys in sorted order.
    pub fn canonical(&self) -> String {
        canonicalize(&self.root)
    }

    /// The normalized form reparses the document with ordered property
    /// mapping; for JSON Schema this coincides with the canonical form.
    pub fn normalized(&self) -> String {
        canonicalize(&self.root)
    }
}

/// Serialize a JSON value deterministically: sorted keys, no insignificant
/// whitespace, minimal string escaping.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            // serde_json applies minimal escaping.
            out.push_str(&Value::String(s.clone()).to_string());
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_value(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_sorts_object_keys() {
        let parsed = parse(r#"{"type":"object","properties":{"b":{},"a":{}}}"#, &[]).unwrap();
        assert_eq!(
            parsed.canonical(),
            r#"{"properties":{"a":{},"b":{}},"type":"object"}"#
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let parsed = parse(
            r#"{"required":["id"],"type":"object","properties":{"id":{"type":"integer"}}}"#,
            &[],
        )
        .unwrap();
        let canonical = parsed.canonical();
        let reparsed = parse(&canonical, &[]).unwrap();
        assert_eq!(reparsed.canonical(), canonical);
        assert_eq!(reparsed.normalized(), parsed.normalized());
    }

    #[test]
    fn boolean_schemas_are_accepted() {
        assert!(parse("true", &[]).is_ok());
        assert!(parse("false", &[]).is_ok());
        assert!(parse("42", &[]).is_err());
        assert!(parse(r#""string""#, &[]).is_err());
    }

    #[test]
    fn parse_errors_carry_the_location() {
        let err = parse(r#"{"type": }"#, &[]).unwrap_err();
        assert!(err.to_string().contains("column"));
    }
}
