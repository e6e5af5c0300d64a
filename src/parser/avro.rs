//! Avro schema model, parser and canonical forms.
//!
//! The model is our own rather than a codec crate's because the registry
//! needs things a codec does not keep: field defaults in the canonical form,
//! alias sets for compatibility matching, and named-reference inlining for
//! the `resolved` output format.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use super::{ParseError, ResolvedReference};

#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Array(Box<AvroSchema>),
    Map(Box<AvroSchema>),
    Union(Vec<AvroSchema>),
    Record(Record),
    Enum(EnumSchema),
    Fixed(FixedSchema),
    /// A reference to a named type defined earlier in this schema or in one
    /// of its resolved references.
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub fullname: String,
    /// Fully qualified.
    pub aliases: Vec<String>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub aliases: Vec<String>,
    pub schema: AvroSchema,
    /// `None` means the key was absent; `Some(Value::Null)` is a null default.
    pub default: Option<Value>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub fullname: String,
    pub aliases: Vec<String>,
    pub symbols: Vec<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub fullname: String,
    pub aliases: Vec<String>,
    pub size: u64,
}

impl AvroSchema {
    pub fn fullname(&self) -> Option<&str> {
        match self {
            AvroSchema::Record(record) => Some(&record.fullname),
            AvroSchema::Enum(en) => Some(&en.fullname),
            AvroSchema::Fixed(fixed) => Some(&fixed.fullname),
            AvroSchema::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// A fully parsed Avro schema plus the table of named types it defines or
/// pulls in through references, keyed by fullname.
#[derive(Debug, Clone)]
pub struct AvroParsed {
    pub root: AvroSchema,
    pub names: BTreeMap<String, AvroSchema>,
}

impl AvroParsed {
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        let opts = WriteOpts {
            normalized: false,
            inline: None,
        };
        write_schema(&self.root, &mut out, &opts, &mut HashSet::new());
        out
    }

    pub fn normalized(&self) -> String {
        let mut out = String::new();
        let opts = WriteOpts {
            normalized: true,
            inline: None,
        };
        write_schema(&self.root, &mut out, &opts, &mut HashSet::new());
        out
    }

    /// Canonical form with every named reference inlined at its first use.
    pub fn resolved(&self) -> String {
        let mut out = String::new();
        let opts = WriteOpts {
            normalized: false,
            inline: Some(&self.names),
        };
        write_schema(&self.root, &mut out, &opts, &mut HashSet::new());
        out
    }

    /// Follow a `Named` node to its definition, if one is known.
    pub fn resolve<'a>(&'a self, schema: &'a AvroSchema) -> &'a AvroSchema {
        if let AvroSchema::Named(name) = schema {
            if let Some(definition) = self.names.get(name) {
                return definition;
            }
        }
        schema
    }
}

pub fn parse(raw: &str, references: &[ResolvedReference]) -> Result<AvroParsed, ParseError> {
    let mut names = BTreeMap::new();

    for reference in references {
        let value: Value = serde_json::from_str(&reference.schema).map_err(|err| {
            ParseError::Avro {
                message: format!("reference '{}': {}", reference.name, err),
            }
        })?;
        parse_value(&value, None, &mut names)?;
    }

    let value: Value = serde_json::from_str(raw).map_err(|err| ParseError::Avro {
        message: err.to_string(),
    })?;
    let root = parse_value(&value, None, &mut names)?;

    Ok(AvroParsed { root, names })
}

fn invalid<T>(message: impl Into<String>) -> Result<T, ParseError> {
    Err(ParseError::Avro {
        message: message.into(),
    })
}

fn validate_name(name: &str) -> Result<(), ParseError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return invalid(format!("invalid name '{}'", name));
    }
    Ok(())
}

fn validate_fullname(fullname: &str) -> Result<(), ParseError> {
    for segment in fullname.split('.') {
        validate_name(segment)?;
    }
    Ok(())
}

/// Split a possibly dotted name into `(fullname, namespace)` given the
/// explicit `namespace` attribute and the enclosing namespace.
fn qualify(
    name: &str,
    namespace: Option<&str>,
    enclosing: Option<&str>,
) -> Result<(String, Option<String>), ParseError> {
    if let Some(index) = name.rfind('.') {
        let namespace = &name[..index];
        validate_fullname(name)?;
        return Ok((name.to_string(), Some(namespace.to_string())));
    }

    validate_name(name)?;
    let namespace = namespace.map(str::to_string).or_else(|| enclosing.map(str::to_string));
    match namespace {
        Some(ns) if !ns.is_empty() => {
            validate_fullname(&ns)?;
            Ok((format!("{}.{}", ns, name), Some(ns)))
        }
        _ => Ok((name.to_string(), None)),
    }
}

fn parse_value(
    value: &Value,
    enclosing: Option<&str>,
    names: &mut BTreeMap<String, AvroSchema>,
) -> Result<AvroSchema, ParseError> {
    match value {
        Value::String(s) => parse_type_name(s, enclosing, names),
        Value::Array(branches) => parse_union(branches, enclosing, names),
        Value::Object(map) => {
            let type_value = map
                .get("type")
                .ok_or_else(|| ParseError::Avro {
                    message: "missing 'type' attribute".into(),
                })?;
            match type_value {
                Value::String(s) => match s.as_str() {
                    "record" | "error" => parse_record(map, enclosing, names),
                    "enum" => parse_enum(map, enclosing, names),
                    "fixed" => parse_fixed(map, enclosing, names),
                    "array" => {
                        let items = map.get("items").ok_or_else(|| ParseError::Avro {
                            message: "array schema is missing 'items'".into(),
                        })?;
                        Ok(AvroSchema::Array(Box::new(parse_value(
                            items, enclosing, names,
                        )?)))
                    }
                    "map" => {
                        let values = map.get("values").ok_or_else(|| ParseError::Avro {
                            message: "map schema is missing 'values'".into(),
                        })?;
                        Ok(AvroSchema::Map(Box::new(parse_value(
                            values, enclosing, names,
                        )?)))
                    }
                    _ => parse_type_name(s, enclosing, names),
                },
                // e.g. {"type": {"type": "array", "items": "int"}}
                nested @ (Value::Object(_) | Value::Array(_)) => {
                    parse_value(nested, enclosing, names)
                }
                other => invalid(format!("unsupported 'type' attribute: {}", other)),
            }
        }
        other => invalid(format!("unsupported schema element: {}", other)),
    }
}

fn parse_type_name(
    name: &str,
    enclosing: Option<&str>,
    names: &BTreeMap<String, AvroSchema>,
) -> Result<AvroSchema, ParseError> {
    match name {
        "null" => return Ok(AvroSchema::Null),
        "boolean" => return Ok(AvroSchema::Boolean),
        "int" => return Ok(AvroSchema::Int),
        "long" => return Ok(AvroSchema::Long),
        "float" => return Ok(AvroSchema::Float),
        "double" => return Ok(AvroSchema::Double),
        "bytes" => return Ok(AvroSchema::Bytes),
        "string" => return Ok(AvroSchema::String),
        _ => {}
    }

    if name.contains('.') {
        validate_fullname(name)?;
        if names.contains_key(name) {
            return Ok(AvroSchema::Named(name.to_string()));
        }
        return invalid(format!("unknown type '{}'", name));
    }

    validate_name(name)?;
    if let Some(ns) = enclosing {
        let qualified = format!("{}.{}", ns, name);
        if names.contains_key(&qualified) {
            return Ok(AvroSchema::Named(qualified));
        }
    }
    if names.contains_key(name) {
        return Ok(AvroSchema::Named(name.to_string()));
    }

    invalid(format!("unknown type '{}'", name))
}

fn parse_union(
    branches: &[Value],
    enclosing: Option<&str>,
    names: &mut BTreeMap<String, AvroSchema>,
) -> Result<AvroSchema, ParseError> {
    if branches.is_empty() {
        return invalid("union must have at least one branch");
    }

    let mut parsed = Vec::with_capacity(branches.len());
    for branch in branches {
        if matches!(branch, Value::Array(_)) {
            return invalid("unions may not immediately contain other unions");
        }
        parsed.push(parse_value(branch, enclosing, names)?);
    }
    Ok(AvroSchema::Union(parsed))
}

fn string_list(map: &serde_json::Map<String, Value>, key: &str) -> Result<Vec<String>, ParseError> {
    match map.get(key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => invalid(format!("'{}' entries must be strings, got {}", key, other)),
            })
            .collect(),
        Some(other) => invalid(format!("'{}' must be an array, got {}", key, other)),
    }
}

fn qualified_aliases(
    map: &serde_json::Map<String, Value>,
    namespace: Option<&str>,
) -> Result<Vec<String>, ParseError> {
    let mut aliases = Vec::new();
    for alias in string_list(map, "aliases")? {
        if alias.contains('.') {
            validate_fullname(&alias)?;
            aliases.push(alias);
        } else {
            validate_name(&alias)?;
            match namespace {
                Some(ns) => aliases.push(format!("{}.{}", ns, alias)),
                None => aliases.push(alias),
            }
        }
    }
    Ok(aliases)
}

// Registers a placeholder so fields of an in-progress record can refer back
// to it; the caller replaces the placeholder with the finished definition.
fn define_name(
    names: &mut BTreeMap<String, AvroSchema>,
    fullname: &str,
) -> Result<(), ParseError> {
    if names.contains_key(fullname) {
        return invalid(format!("type '{}' is defined more than once", fullname));
    }
    names.insert(
        fullname.to_string(),
        AvroSchema::Named(fullname.to_string()),
    );
    Ok(())
}

fn parse_record(
    map: &serde_json::Map<String, Value>,
    enclosing: Option<&str>,
    names: &mut BTreeMap<String, AvroSchema>,
) -> Result<AvroSchema, ParseError> {
    let name = match map.get("name") {
        Some(Value::String(s)) => s,
        _ => return invalid("record schema is missing a 'name'"),
    };
    let namespace = match map.get("namespace") {
        Some(Value::String(s)) => Some(s.as_str()),
        None => None,
        Some(other) => return invalid(format!("'namespace' must be a string, got {}", other)),
    };

    let (fullname, namespace) = qualify(name, namespace, enclosing)?;
    define_name(names, &fullname)?;
    let aliases = qualified_aliases(map, namespace.as_deref())?;

    let field_values = match map.get("fields") {
        Some(Value::Array(fields)) => fields,
        _ => return invalid(format!("record '{}' is missing 'fields'", fullname)),
    };

    let mut fields = Vec::with_capacity(field_values.len());
    let mut seen = HashSet::new();
    for field_value in field_values {
        let field = parse_field(field_value, namespace.as_deref(), names)?;
        if !seen.insert(field.name.clone()) {
            return invalid(format!(
                "record '{}' declares field '{}' more than once",
                fullname, field.name
            ));
        }
        fields.push(field);
    }

    let record = AvroSchema::Record(Record {
        fullname: fullname.clone(),
        aliases,
        fields,
    });
    names.insert(fullname, record.clone());
    Ok(record)
}

fn parse_field(
    value: &Value,
    enclosing: Option<&str>,
    names: &mut BTreeMap<String, AvroSchema>,
) -> Result<Field, ParseError> {
    let map = match value {
        Value::Object(map) => map,
        other => return invalid(format!("record field must be an object, got {}", other)),
    };

    let name = match map.get("name") {
        Some(Value::String(s)) => s.clone(),
        _ => return invalid("record field is missing a 'name'"),
    };
    validate_name(&name)?;

    let schema_value = map.get("type").ok_or_else(|| ParseError::Avro {
        message: format!("field '{}' is missing a 'type'", name),
    })?;
    let schema = parse_value(schema_value, enclosing, names)?;

    let order = match map.get("order") {
        None => None,
        Some(Value::String(s)) if matches!(s.as_str(), "ascending" | "descending" | "ignore") => {
            Some(s.clone())
        }
        Some(other) => {
            return invalid(format!("field '{}' has invalid 'order' {}", name, other));
        }
    };

    Ok(Field {
        aliases: string_list(map, "aliases")?,
        default: map.get("default").cloned(),
        name,
        schema,
        order,
    })
}

fn parse_enum(
    map: &serde_json::Map<String, Value>,
    enclosing: Option<&str>,
    names: &mut BTreeMap<String, AvroSchema>,
) -> Result<AvroSchema, ParseError> {
    let name = match map.get("name") {
        Some(Value::String(s)) => s,
        _ => return invalid("enum schema is missing a 'name'"),
    };
    let namespace = match map.get("namespace") {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    };

    let (fullname, namespace) = qualify(name, namespace, enclosing)?;
    define_name(names, &fullname)?;

    let symbols = string_list(map, "symbols")?;
    if symbols.is_empty() {
        return invalid(format!("enum '{}' has no symbols", fullname));
    }
    let mut seen = HashSet::new();
    for symbol in &symbols {
        validate_name(symbol)?;
        if !seen.insert(symbol.as_str()) {
            return invalid(format!(
                "enum '{}' declares symbol '{}' more than once",
                fullname, symbol
            ));
        }
    }

    let default = match map.get("default") {
        None => None,
        Some(Value::String(s)) => {
            if !symbols.iter().any(|symbol| symbol == s) {
                return invalid(format!(
                    "enum '{}' default '{}' is not one of its symbols",
                    fullname, s
                ));
            }
            Some(s.clone())
        }
        Some(other) => {
            return invalid(format!("enum '{}' has invalid default {}", fullname, other));
        }
    };

    let en = AvroSchema::Enum(EnumSchema {
        fullname: fullname.clone(),
        aliases: qualified_aliases(map, namespace.as_deref())?,
        symbols,
        default,
    });
    names.insert(fullname, en.clone());
    Ok(en)
}

fn parse_fixed(
    map: &serde_json::Map<String, Value>,
    enclosing: Option<&str>,
    names: &mut BTreeMap<String, AvroSchema>,
) -> Result<AvroSchema, ParseError> {
    let name = match map.get("name") {
        Some(Value::String(s)) => s,
        _ => return invalid("fixed schema is missing a 'name'"),
    };
    let namespace = match map.get("namespace") {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    };

    let (fullname, namespace) = qualify(name, namespace, enclosing)?;
    define_name(names, &fullname)?;

    let size = match map.get("size") {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| ParseError::Avro {
            message: format!("fixed '{}' has a negative size", fullname),
        })?,
        _ => return invalid(format!("fixed '{}' is missing 'size'", fullname)),
    };

    let fixed = AvroSchema::Fixed(FixedSchema {
        fullname: fullname.clone(),
        aliases: qualified_aliases(map, namespace.as_deref())?,
        size,
    });
    names.insert(fullname, fixed.clone());
    Ok(fixed)
}

struct WriteOpts<'a> {
    normalized: bool,
    inline: Option<&'a BTreeMap<String, AvroSchema>>,
}

fn write_schema(
    schema: &AvroSchema,
    out: &mut String,
    opts: &WriteOpts<'_>,
    emitted: &mut HashSet<String>,
) {
    match schema {
        AvroSchema::Null => out.push_str("\"null\""),
        AvroSchema::Boolean => out.push_str("\"boolean\""),
        AvroSchema::Int => out.push_str("\"int\""),
        AvroSchema::Long => out.push_str("\"long\""),
        AvroSchema::Float => out.push_str("\"float\""),
        AvroSchema::Double => out.push_str("\"double\""),
        AvroSchema::Bytes => out.push_str("\"bytes\""),
        AvroSchema::String => out.push_str("\"string\""),
        AvroSchema::Named(name) => {
            if let Some(names) = opts.inline {
                if !emitted.contains(name) {
                    if let Some(definition) = names.get(name) {
                        let definition = definition.clone();
                        write_schema(&definition, out, opts, emitted);
                        return;
                    }
                }
            }
            out.push('"');
            out.push_str(name);
            out.push('"');
        }
        AvroSchema::Array(items) => {
            out.push_str("{\"type\":\"array\",\"items\":");
            write_schema(items, out, opts, emitted);
            out.push('}');
        }
        AvroSchema::Map(values) => {
            out.push_str("{\"type\":\"map\",\"values\":");
            write_schema(values, out, opts, emitted);
            out.push('}');
        }
        AvroSchema::Union(branches) => {
            out.push('[');
            for (index, branch) in branches.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_schema(branch, out, opts, emitted);
            }
            out.push(']');
        }
        AvroSchema::Record(record) => {
            emitted.insert(record.fullname.clone());
            out.push_str("{\"name\":\"");
            out.push_str(&record.fullname);
            out.push_str("\",\"type\":\"record\"");
            write_aliases(&record.aliases, out, opts);
            out.push_str(",\"fields\":[");
            for (index, field) in record.fields.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_field(field, out, opts, emitted);
            }
            out.push_str("]}");
        }
        AvroSchema::Enum(en) => {
            emitted.insert(en.fullname.clone());
            out.push_str("{\"name\":\"");
            out.push_str(&en.fullname);
            out.push_str("\",\"type\":\"enum\"");
            write_aliases(&en.aliases, out, opts);
            out.push_str(",\"symbols\":[");
            for (index, symbol) in en.symbols.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(symbol);
                out.push('"');
            }
            out.push(']');
            if let Some(default) = &en.default {
                out.push_str(",\"default\":\"");
                out.push_str(default);
                out.push('"');
            }
            out.push('}');
        }
        AvroSchema::Fixed(fixed) => {
            emitted.insert(fixed.fullname.clone());
            out.push_str("{\"name\":\"");
            out.push_str(&fixed.fullname);
            out.push_str("\",\"type\":\"fixed\"");
            write_aliases(&fixed.aliases, out, opts);
            out.push_str(",\"size\":");
            out.push_str(&fixed.size.to_string());
            out.push('}');
        }
    }
}

fn write_aliases(aliases: &[String], out: &mut String, opts: &WriteOpts<'_>) {
    if !opts.normalized || aliases.is_empty() {
        return;
    }
    let mut sorted: Vec<&String> = aliases.iter().collect();
    sorted.sort();
    out.push_str(",\"aliases\":[");
    for (index, alias) in sorted.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(alias);
        out.push('"');
    }
    out.push(']');
}

fn write_field(
    field: &Field,
    out: &mut String,
    opts: &WriteOpts<'_>,
    emitted: &mut HashSet<String>,
) {
    out.push_str("{\"name\":\"");
    out.push_str(&field.name);
    out.push_str("\",\"type\":");
    write_schema(&field.schema, out, opts, emitted);
    if let Some(default) = &field.default {
        out.push_str(",\"default\":");
        // serde_json object keys are ordered, so this stays deterministic.
        out.push_str(&default.to_string());
    }
    if opts.normalized {
        if !field.aliases.is_empty() {
            let mut sorted: Vec<&String> = field.aliases.iter().collect();
            sorted.sort();
            out.push_str(",\"aliases\":[");
            for (index, alias) in sorted.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(alias);
                out.push('"');
            }
            out.push(']');
        }
        if let Some(order) = &field.order {
            if order != "ascending" {
                out.push_str(",\"order\":\"");
                out.push_str(order);
                out.push('"');
            }
        }
    }
    out.push('}');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemaType;

    fn parse_one(raw: &str) -> AvroParsed {
        parse(raw, &[]).expect("schema should parse")
    }

    #[test]
    fn canonical_form_includes_defaults() {
        let with_zero = parse_one(
            r#"{"type":"record","name":"R","fields":[{"name":"x","type":"int","default":0}]}"#,
        );
        let with_one = parse_one(
            r#"{"type":"record","name":"R","fields":[{"name":"x","type":"int","default":1}]}"#,
        );
        assert!(with_zero.canonical().contains("\"default\":0"));
        assert_ne!(with_zero.canonical(), with_one.canonical());
    }

    #[test]
    fn canonical_fully_qualifies_names() {
        let parsed = parse_one(
            r#"{"type":"record","name":"R","namespace":"com.acme","fields":[{"name":"x","type":"int"}]}"#,
        );
        assert!(parsed.canonical().starts_with("{\"name\":\"com.acme.R\""));
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let parsed = parse_one(
            r#"{"namespace":"com.acme","type":"record","name":"R","doc":"ignored","fields":[{"name":"x","type":["null","string"],"default":null}]}"#,
        );
        let canonical = parsed.canonical();
        let reparsed = parse_one(&canonical);
        assert_eq!(reparsed.canonical(), canonical);

        let normalized = parsed.normalized();
        assert_eq!(parse_one(&normalized).normalized(), normalized);
    }

    #[test]
    fn recursive_records_parse() {
        let parsed = parse_one(
            r#"{"type":"record","name":"Node","fields":[{"name":"next","type":["null","Node"],"default":null}]}"#,
        );
        assert!(parsed.names.contains_key("Node"));
    }

    #[test]
    fn references_are_resolved_by_fullname() {
        let author = ResolvedReference {
            name: "com.acme.Author".into(),
            schema_type: SchemaType::Avro,
            schema: r#"{"type":"record","name":"Author","namespace":"com.acme","fields":[{"name":"name","type":"string"}]}"#.into(),
        };
        let parsed = parse(
            r#"{"type":"record","name":"Book","namespace":"com.acme","fields":[{"name":"author","type":"com.acme.Author"}]}"#,
            &[author],
        )
        .expect("reference should resolve");

        assert_eq!(parsed.canonical(), "{\"name\":\"com.acme.Book\",\"type\":\"record\",\"fields\":[{\"name\":\"author\",\"type\":\"com.acme.Author\"}]}");
        assert!(parsed.resolved().contains("\"name\":\"com.acme.Author\""));
    }

    #[test]
    fn unknown_named_type_is_an_error() {
        let err = parse(
            r#"{"type":"record","name":"R","fields":[{"name":"x","type":"Missing"}]}"#,
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown type"));
    }

    #[test]
    fn nested_union_is_rejected() {
        assert!(parse(r#"[["null","int"]]"#, &[]).is_err());
    }

    #[test]
    fn enum_default_must_be_a_symbol() {
        let err = parse(
            r#"{"type":"enum","name":"Suit","symbols":["HEARTS"],"default":"SPADES"}"#,
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("not one of its symbols"));
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let err = parse(
            r#"{"type":"record","name":"R","fields":[
                {"name":"a","type":{"type":"enum","name":"E","symbols":["X"]}},
                {"name":"b","type":{"type":"enum","name":"E","symbols":["Y"]}}
            ]}"#,
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn normalized_carries_sorted_aliases() {
        let parsed = parse_one(
            r#"{"type":"record","name":"R","aliases":["Zed","Alpha"],"fields":[]}"#,
        );
        assert!(!parsed.canonical().contains("aliases"));
        assert!(parsed.normalized().contains("\"aliases\":[\"Alpha\",\"Zed\"]"));
    }
}
