//! JSON Schema reader/writer compatibility rules.
//!
//! Orientation throughout: can the reader accept every instance the writer
//! schema admits? The checks cover local `$ref` resolution, implicit type
//! detection, string and numeric constraints, composition, dependencies,
//! tuple and boolean `items`, `const`, property-count bounds, `not`,
//! `patternProperties` covering patterns, boolean property schemas, and the
//! open-vs-closed content model rules.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use regex::Regex;
use serde_json::{Map, Value};

use crate::parser::json::{canonicalize, JsonParsed};

/// Pairs of (reader node, writer node) addresses already under comparison;
/// breaks recursion through self-referential `$ref`s.
type Seen = HashSet<(usize, usize)>;

#[derive(Clone, Copy)]
struct Side<'a> {
    doc: &'a Value,
    refs: &'a BTreeMap<String, Value>,
}

/// Whether `reader` can read data written with `writer`. Empty result means
/// compatible.
pub fn check(reader: &JsonParsed, writer: &JsonParsed) -> Vec<String> {
    let reader_side = Side {
        doc: &reader.root,
        refs: &reader.references,
    };
    let writer_side = Side {
        doc: &writer.root,
        refs: &writer.references,
    };
    let mut messages = Vec::new();
    let mut seen = Seen::new();
    check_schema(
        &reader.root,
        reader_side,
        &writer.root,
        writer_side,
        "#",
        &mut seen,
        &mut messages,
    );
    messages
}

/// Follow `$ref` chains: fragment pointers resolve inside the current
/// document, anything else against the registered reference documents.
fn resolve<'a>(mut value: &'a Value, mut side: Side<'a>) -> (&'a Value, Side<'a>) {
    for _ in 0..16 {
        let Value::Object(map) = value else { break };
        let Some(Value::String(target)) = map.get("$ref") else {
            break;
        };
        if let Some(fragment) = target.strip_prefix('#') {
            match side.doc.pointer(fragment) {
                Some(resolved) => value = resolved,
                None => break,
            }
        } else if let Some(document) = side.refs.get(target) {
            value = document;
            side = Side {
                doc: document,
                refs: side.refs,
            };
        } else {
            break;
        }
    }
    (value, side)
}

fn accepts(
    reader: &Value,
    reader_side: Side<'_>,
    writer: &Value,
    writer_side: Side<'_>,
    seen: &Seen,
) -> bool {
    let mut probe = Vec::new();
    let mut seen = seen.clone();
    check_schema(
        reader,
        reader_side,
        writer,
        writer_side,
        "#",
        &mut seen,
        &mut probe,
    );
    probe.is_empty()
}

fn num(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn uint(value: Option<&Value>) -> Option<u64> {
    value.and_then(Value::as_u64)
}

const OBJECT_KEYWORDS: &[&str] = &[
    "properties",
    "required",
    "additionalProperties",
    "patternProperties",
    "minProperties",
    "maxProperties",
    "dependencies",
    "dependentRequired",
    "dependentSchemas",
];
const ARRAY_KEYWORDS: &[&str] = &["items", "prefixItems", "additionalItems", "minItems", "maxItems"];
const STRING_KEYWORDS: &[&str] = &["minLength", "maxLength", "pattern"];
const NUMBER_KEYWORDS: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
];

/// The set of types a schema admits: the explicit `type` keyword, or types
/// implied by the keywords present. `None` means unconstrained.
fn effective_types(map: &Map<String, Value>) -> Option<BTreeSet<String>> {
    match map.get("type") {
        Some(Value::String(s)) => Some(BTreeSet::from([s.clone()])),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => {
            let mut implied = BTreeSet::new();
            if OBJECT_KEYWORDS.iter().any(|key| map.contains_key(*key)) {
                implied.insert("object".to_string());
            }
            if ARRAY_KEYWORDS.iter().any(|key| map.contains_key(*key)) {
                implied.insert("array".to_string());
            }
            if STRING_KEYWORDS.iter().any(|key| map.contains_key(*key)) {
                implied.insert("string".to_string());
            }
            if NUMBER_KEYWORDS.iter().any(|key| map.contains_key(*key)) {
                implied.insert("number".to_string());
            }
            if implied.is_empty() {
                None
            } else {
                Some(implied)
            }
        }
    }
}

fn type_accepted(reader_types: &BTreeSet<String>, writer_type: &str) -> bool {
    reader_types.contains(writer_type)
        || (writer_type == "integer" && reader_types.contains("number"))
}

#[allow(clippy::too_many_arguments)]
fn check_schema(
    reader_raw: &Value,
    reader_side: Side<'_>,
    writer_raw: &Value,
    writer_side: Side<'_>,
    path: &str,
    seen: &mut Seen,
    messages: &mut Vec<String>,
) {
    let (reader, reader_side) = resolve(reader_raw, reader_side);
    let (writer, writer_side) = resolve(writer_raw, writer_side);

    let guard = (
        reader as *const Value as usize,
        writer as *const Value as usize,
    );
    if !seen.insert(guard) {
        return;
    }

    // Boolean schemas: `true` admits everything, `false` admits nothing.
    match (reader, writer) {
        (Value::Bool(true), _) => return,
        (_, Value::Bool(false)) => return,
        (Value::Bool(false), _) => {
            messages.push(format!("SCHEMA_NARROWED_TO_FALSE at '{}'", path));
            return;
        }
        _ => {}
    }

    let empty = Map::new();
    let reader_map = match reader {
        Value::Object(map) => map,
        _ => return,
    };
    let writer_map = match writer {
        Value::Object(map) => map,
        Value::Bool(true) => &empty,
        _ => return,
    };

    check_types(reader_map, writer_map, path, messages);
    check_const(reader_map, writer_map, path, messages);
    check_enum(reader_map, writer_map, path, messages);
    check_string_constraints(reader_map, writer_map, path, messages);
    check_number_constraints(reader_map, writer_map, path, messages);
    check_property_bounds(reader_map, writer_map, path, messages);
    check_not(reader_map, writer_map, path, messages);
    check_required(reader_map, writer_map, path, messages);
    check_properties(
        reader_map,
        reader_side,
        writer_map,
        writer_side,
        path,
        seen,
        messages,
    );
    check_dependencies(
        reader_map,
        reader_side,
        writer_map,
        writer_side,
        path,
        seen,
        messages,
    );
    check_items(
        reader_map,
        reader_side,
        writer_map,
        writer_side,
        path,
        seen,
        messages,
    );
    check_composition(
        reader_map,
        reader_side,
        writer_map,
        writer_side,
        path,
        seen,
        messages,
    );
}

fn check_types(
    reader: &Map<String, Value>,
    writer: &Map<String, Value>,
    path: &str,
    messages: &mut Vec<String>,
) {
    let Some(reader_types) = effective_types(reader) else {
        return;
    };
    match effective_types(writer) {
        Some(writer_types) => {
            for writer_type in &writer_types {
                if !type_accepted(&reader_types, writer_type) {
                    messages.push(format!(
                        "TYPE_NARROWED: writer type '{}' is not accepted by the reader at '{}'",
                        writer_type, path
                    ));
                }
            }
        }
        None => {
            if reader.contains_key("type") {
                messages.push(format!("TYPE_CONSTRAINT_ADDED at '{}'", path));
            }
        }
    }
}

fn check_const(
    reader: &Map<String, Value>,
    writer: &Map<String, Value>,
    path: &str,
    messages: &mut Vec<String>,
) {
    let Some(reader_const) = reader.get("const") else {
        return;
    };
    match writer.get("const") {
        Some(writer_const) if writer_const == reader_const => {}
        Some(_) => messages.push(format!("CONST_CHANGED at '{}'", path)),
        None => messages.push(format!("CONST_ADDED at '{}'", path)),
    }
}

fn check_enum(
    reader: &Map<String, Value>,
    writer: &Map<String, Value>,
    path: &str,
    messages: &mut Vec<String>,
) {
    let Some(Value::Array(reader_values)) = reader.get("enum") else {
        return;
    };
    match writer.get("enum") {
        Some(Value::Array(writer_values)) => {
            if writer_values
                .iter()
                .any(|value| !reader_values.contains(value))
            {
                messages.push(format!("ENUM_ARRAY_NARROWED at '{}'", path));
            }
        }
        _ => {
            // A writer constrained to the same values through `const` is fine.
            match writer.get("const") {
                Some(value) if reader_values.contains(value) => {}
                _ => messages.push(format!("ENUM_ADDED at '{}'", path)),
            }
        }
    }
}

fn check_string_constraints(
    reader: &Map<String, Value>,
    writer: &Map<String, Value>,
    path: &str,
    messages: &mut Vec<String>,
) {
    let reader_min = uint(reader.get("minLength")).unwrap_or(0);
    let writer_min = uint(writer.get("minLength")).unwrap_or(0);
    if reader_min > writer_min {
        messages.push(format!("MIN_LENGTH_INCREASED at '{}'", path));
    }

    if let Some(reader_max) = uint(reader.get("maxLength")) {
        match uint(writer.get("maxLength")) {
            Some(writer_max) if reader_max >= writer_max => {}
            Some(_) => messages.push(format!("MAX_LENGTH_DECREASED at '{}'", path)),
            None => messages.push(format!("MAX_LENGTH_ADDED at '{}'", path)),
        }
    }

    if let Some(Value::String(reader_pattern)) = reader.get("pattern") {
        match writer.get("pattern") {
            Some(Value::String(writer_pattern)) if writer_pattern == reader_pattern => {}
            Some(_) => messages.push(format!("PATTERN_CHANGED at '{}'", path)),
            None => messages.push(format!("PATTERN_ADDED at '{}'", path)),
        }
    }
}

fn check_number_constraints(
    reader: &Map<String, Value>,
    writer: &Map<String, Value>,
    path: &str,
    messages: &mut Vec<String>,
) {
    let bounds = [
        ("minimum", "MINIMUM_INCREASED", "MINIMUM_ADDED", true),
        ("maximum", "MAXIMUM_DECREASED", "MAXIMUM_ADDED", false),
        (
            "exclusiveMinimum",
            "EXCLUSIVE_MINIMUM_INCREASED",
            "EXCLUSIVE_MINIMUM_ADDED",
            true,
        ),
        (
            "exclusiveMaximum",
            "EXCLUSIVE_MAXIMUM_DECREASED",
            "EXCLUSIVE_MAXIMUM_ADDED",
            false,
        ),
    ];

    for (keyword, tightened, added, lower_bound) in bounds {
        let Some(reader_bound) = num(reader.get(keyword)) else {
            continue;
        };
        match num(writer.get(keyword)) {
            Some(writer_bound) => {
                let narrowed = if lower_bound {
                    reader_bound > writer_bound
                } else {
                    reader_bound < writer_bound
                };
                if narrowed {
                    messages.push(format!("{} at '{}'", tightened, path));
                }
            }
            None => messages.push(format!("{} at '{}'", added, path)),
        }
    }

    if let Some(reader_multiple) = num(reader.get("multipleOf")) {
        match num(writer.get("multipleOf")) {
            Some(writer_multiple) => {
                // Every multiple of the writer's step must be a multiple of
                // the reader's step.
                let ratio = writer_multiple / reader_multiple;
                if (ratio - ratio.round()).abs() > 1e-9 {
                    messages.push(format!("MULTIPLE_OF_CHANGED at '{}'", path));
                }
            }
            None => messages.push(format!("MULTIPLE_OF_ADDED at '{}'", path)),
        }
    }
}

fn check_property_bounds(
    reader: &Map<String, Value>,
    writer: &Map<String, Value>,
    path: &str,
    messages: &mut Vec<String>,
) {
    let reader_min = uint(reader.get("minProperties")).unwrap_or(0);
    let writer_min = uint(writer.get("minProperties")).unwrap_or(0);
    if reader_min > writer_min {
        messages.push(format!("MIN_PROPERTIES_INCREASED at '{}'", path));
    }

    if let Some(reader_max) = uint(reader.get("maxProperties")) {
        match uint(writer.get("maxProperties")) {
            Some(writer_max) if reader_max >= writer_max => {}
            Some(_) => messages.push(format!("MAX_PROPERTIES_DECREASED at '{}'", path)),
            None => messages.push(format!("MAX_PROPERTIES_ADDED at '{}'", path)),
        }
    }
}

fn check_not(
    reader: &Map<String, Value>,
    writer: &Map<String, Value>,
    path: &str,
    messages: &mut Vec<String>,
) {
    let Some(reader_not) = reader.get("not") else {
        return;
    };
    match writer.get("not") {
        Some(writer_not) if canonicalize(reader_not) == canonicalize(writer_not) => {}
        Some(_) => messages.push(format!("NOT_TYPE_NARROWED at '{}'", path)),
        None => messages.push(format!("NOT_TYPE_ADDED at '{}'", path)),
    }
}

fn check_required(
    reader: &Map<String, Value>,
    writer: &Map<String, Value>,
    path: &str,
    messages: &mut Vec<String>,
) {
    let reader_required: Vec<&str> = match reader.get("required") {
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => return,
    };
    let writer_required: Vec<&str> = match writer.get("required") {
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    for name in reader_required {
        if writer_required.contains(&name) {
            continue;
        }
        // A newly required property is acceptable when it carries a default.
        let has_default = reader
            .get("properties")
            .and_then(|properties| properties.get(name))
            .and_then(|schema| schema.get("default"))
            .is_some();
        if !has_default {
            messages.push(format!(
                "REQUIRED_ATTRIBUTE_ADDED: property '{}' at '{}'",
                name, path
            ));
        }
    }
}

fn is_closed(map: &Map<String, Value>) -> bool {
    matches!(map.get("additionalProperties"), Some(Value::Bool(false)))
}

/// The reader patternProperties entry whose pattern matches `name`, if any.
fn covering_pattern<'a>(
    map: &'a Map<String, Value>,
    name: &str,
) -> Option<(&'a String, &'a Value)> {
    let Some(Value::Object(patterns)) = map.get("patternProperties") else {
        return None;
    };
    patterns.iter().find(|(pattern, _)| {
        Regex::new(pattern)
            .map(|regex| regex.is_match(name))
            .unwrap_or(false)
    })
}

#[allow(clippy::too_many_arguments)]
fn check_properties(
    reader: &Map<String, Value>,
    reader_side: Side<'_>,
    writer: &Map<String, Value>,
    writer_side: Side<'_>,
    path: &str,
    seen: &mut Seen,
    messages: &mut Vec<String>,
) {
    let empty = Map::new();
    let reader_properties = match reader.get("properties") {
        Some(Value::Object(map)) => map,
        _ => &empty,
    };
    let writer_properties = match writer.get("properties") {
        Some(Value::Object(map)) => map,
        _ => &empty,
    };

    for (name, reader_schema) in reader_properties {
        let property_path = format!("{}/properties/{}", path, name);
        match writer_properties.get(name) {
            Some(writer_schema) => {
                check_schema(
                    reader_schema,
                    reader_side,
                    writer_schema,
                    writer_side,
                    &property_path,
                    seen,
                    messages,
                );
            }
            None if is_closed(writer) => {
                // The writer could never emit this property, so the new
                // constraint is vacuous.
            }
            None => {
                match writer.get("additionalProperties") {
                    Some(additional @ Value::Object(_)) => {
                        // Partially open: the writer emitted it under the
                        // additionalProperties schema.
                        check_schema(
                            reader_schema,
                            reader_side,
                            additional,
                            writer_side,
                            &property_path,
                            seen,
                            messages,
                        );
                    }
                    _ => messages.push(format!(
                        "PROPERTY_ADDED_TO_OPEN_CONTENT_MODEL: property '{}' at '{}'",
                        name, property_path
                    )),
                }
            }
        }
    }

    for (name, writer_schema) in writer_properties {
        if reader_properties.contains_key(name) {
            continue;
        }
        let property_path = format!("{}/properties/{}", path, name);
        if is_closed(reader) {
            match covering_pattern(reader, name) {
                Some((_, pattern_schema)) => {
                    check_schema(
                        pattern_schema,
                        reader_side,
                        writer_schema,
                        writer_side,
                        &property_path,
                        seen,
                        messages,
                    );
                }
                None => messages.push(format!(
                    "PROPERTY_REMOVED_FROM_CLOSED_CONTENT_MODEL: property '{}' at '{}'",
                    name, property_path
                )),
            }
        } else if let Some(additional @ Value::Object(_)) = reader.get("additionalProperties") {
            check_schema(
                additional,
                reader_side,
                writer_schema,
                writer_side,
                &property_path,
                seen,
                messages,
            );
        }
    }

    // Matching patternProperties recurse; everything else is covered by the
    // property loops above.
    if let (Some(Value::Object(reader_patterns)), Some(Value::Object(writer_patterns))) =
        (reader.get("patternProperties"), writer.get("patternProperties"))
    {
        for (pattern, reader_schema) in reader_patterns {
            if let Some(writer_schema) = writer_patterns.get(pattern) {
                let pattern_path = format!("{}/patternProperties/{}", path, pattern);
                check_schema(
                    reader_schema,
                    reader_side,
                    writer_schema,
                    writer_side,
                    &pattern_path,
                    seen,
                    messages,
                );
            }
        }
    }

    // additionalProperties transitions.
    match (
        reader.get("additionalProperties"),
        writer.get("additionalProperties"),
    ) {
        (Some(Value::Bool(false)), Some(Value::Bool(false))) => {}
        (Some(Value::Bool(false)), _) => {
            messages.push(format!("ADDITIONAL_PROPERTIES_REMOVED at '{}'", path));
        }
        (Some(reader_schema @ Value::Object(_)), Some(writer_schema @ Value::Object(_))) => {
            let additional_path = format!("{}/additionalProperties", path);
            check_schema(
                reader_schema,
                reader_side,
                writer_schema,
                writer_side,
                &additional_path,
                seen,
                messages,
            );
        }
        (Some(Value::Object(_)), Some(Value::Bool(false))) => {}
        (Some(Value::Object(_)), _) => {
            messages.push(format!("ADDITIONAL_PROPERTIES_NARROWED at '{}'", path));
        }
        _ => {}
    }
}

/// Gather `dependentRequired` plus the array form of draft-07
/// `dependencies` into one view, and likewise the schema forms.
fn dependency_views(
    map: &Map<String, Value>,
) -> (BTreeMap<&String, Vec<&str>>, BTreeMap<&String, &Value>) {
    let mut required = BTreeMap::new();
    let mut schemas = BTreeMap::new();

    for source in ["dependencies", "dependentRequired", "dependentSchemas"] {
        let Some(Value::Object(entries)) = map.get(source) else {
            continue;
        };
        for (name, entry) in entries {
            match entry {
                Value::Array(names) if source != "dependentSchemas" => {
                    required.insert(name, names.iter().filter_map(Value::as_str).collect());
                }
                Value::Object(_) | Value::Bool(_) if source != "dependentRequired" => {
                    schemas.insert(name, entry);
                }
                _ => {}
            }
        }
    }

    (required, schemas)
}

#[allow(clippy::too_many_arguments)]
fn check_dependencies(
    reader: &Map<String, Value>,
    reader_side: Side<'_>,
    writer: &Map<String, Value>,
    writer_side: Side<'_>,
    path: &str,
    seen: &mut Seen,
    messages: &mut Vec<String>,
) {
    let (reader_required, reader_schemas) = dependency_views(reader);
    let (writer_required, writer_schemas) = dependency_views(writer);

    for (name, required) in &reader_required {
        match writer_required.get(name) {
            Some(writer_names) => {
                if required.iter().any(|entry| !writer_names.contains(entry)) {
                    messages.push(format!(
                        "DEPENDENCY_ARRAY_EXTENDED: dependency '{}' at '{}'",
                        name, path
                    ));
                }
            }
            None => messages.push(format!(
                "DEPENDENCY_ARRAY_ADDED: dependency '{}' at '{}'",
                name, path
            )),
        }
    }

    for (name, reader_schema) in &reader_schemas {
        let dependency_path = format!("{}/dependentSchemas/{}", path, name);
        match writer_schemas.get(name) {
            Some(writer_schema) => {
                check_schema(
                    reader_schema,
                    reader_side,
                    writer_schema,
                    writer_side,
                    &dependency_path,
                    seen,
                    messages,
                );
            }
            None => messages.push(format!(
                "DEPENDENCY_SCHEMA_ADDED: dependency '{}' at '{}'",
                name, dependency_path
            )),
        }
    }
}

/// Tuple constraints: draft-07 `items` as an array or draft 2020-12
/// `prefixItems`.
fn tuple_items(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    if let Some(Value::Array(items)) = map.get("prefixItems") {
        return Some(items);
    }
    if let Some(Value::Array(items)) = map.get("items") {
        return Some(items);
    }
    None
}

/// The schema applied past the tuple prefix, or to every element when no
/// tuple form is present.
fn rest_items(map: &Map<String, Value>) -> Option<&Value> {
    if map.contains_key("prefixItems") {
        return map.get("items");
    }
    match map.get("items") {
        Some(Value::Array(_)) => map.get("additionalItems"),
        other => other,
    }
}

#[allow(clippy::too_many_arguments)]
fn check_items(
    reader: &Map<String, Value>,
    reader_side: Side<'_>,
    writer: &Map<String, Value>,
    writer_side: Side<'_>,
    path: &str,
    seen: &mut Seen,
    messages: &mut Vec<String>,
) {
    let true_schema = Value::Bool(true);
    let items_path = format!("{}/items", path);

    match (tuple_items(reader), tuple_items(writer)) {
        (Some(reader_tuple), Some(writer_tuple)) => {
            let shared = reader_tuple.len().min(writer_tuple.len());
            for index in 0..shared {
                let element_path = format!("{}/{}", items_path, index);
                check_schema(
                    &reader_tuple[index],
                    reader_side,
                    &writer_tuple[index],
                    writer_side,
                    &element_path,
                    seen,
                    messages,
                );
            }

            let writer_rest = rest_items(writer).unwrap_or(&true_schema);
            for (offset, reader_extra) in reader_tuple.iter().enumerate().skip(shared) {
                if matches!(writer_rest, Value::Bool(false)) {
                    // The writer cannot produce elements past its tuple.
                    break;
                }
                if !accepts(reader_extra, reader_side, writer_rest, writer_side, seen) {
                    messages.push(format!(
                        "PREFIX_ITEMS_NARROWED at '{}/{}'",
                        items_path, offset
                    ));
                }
            }

            let reader_rest = rest_items(reader).unwrap_or(&true_schema);
            for (offset, writer_extra) in writer_tuple.iter().enumerate().skip(shared) {
                if !accepts(reader_rest, reader_side, writer_extra, writer_side, seen) {
                    messages.push(format!(
                        "PREFIX_ITEMS_REMOVED at '{}/{}'",
                        items_path, offset
                    ));
                }
            }
        }
        (Some(reader_tuple), None) => {
            // Uniform writer items must satisfy every tuple position.
            let writer_items = rest_items(writer).unwrap_or(&true_schema);
            for (index, reader_element) in reader_tuple.iter().enumerate() {
                if !accepts(reader_element, reader_side, writer_items, writer_side, seen) {
                    messages.push(format!(
                        "ITEMS_CHANGED_TO_TUPLE at '{}/{}'",
                        items_path, index
                    ));
                }
            }
        }
        (None, Some(writer_tuple)) => {
            let reader_items = rest_items(reader).unwrap_or(&true_schema);
            for (index, writer_element) in writer_tuple.iter().enumerate() {
                if !accepts(reader_items, reader_side, writer_element, writer_side, seen) {
                    messages.push(format!(
                        "TUPLE_CHANGED_TO_ITEMS at '{}/{}'",
                        items_path, index
                    ));
                }
            }
        }
        (None, None) => {
            let reader_items = rest_items(reader);
            let writer_items = rest_items(writer);
            if let Some(reader_items) = reader_items {
                let writer_items = writer_items.unwrap_or(&true_schema);
                check_schema(
                    reader_items,
                    reader_side,
                    writer_items,
                    writer_side,
                    &items_path,
                    seen,
                    messages,
                );
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_composition(
    reader: &Map<String, Value>,
    reader_side: Side<'_>,
    writer: &Map<String, Value>,
    writer_side: Side<'_>,
    path: &str,
    seen: &mut Seen,
    messages: &mut Vec<String>,
) {
    // Sum types: every writer branch needs a compatible reader branch.
    for keyword in ["oneOf", "anyOf"] {
        let reader_branches = match reader.get(keyword) {
            Some(Value::Array(branches)) => Some(branches),
            _ => None,
        };
        let writer_branches = match writer.get(keyword) {
            Some(Value::Array(branches)) => Some(branches),
            _ => None,
        };
        if reader_branches.is_none() && writer_branches.is_none() {
            continue;
        }

        let reader_whole = [Value::Object(reader.clone())];
        let writer_whole = [Value::Object(writer.clone())];
        let reader_branches: &[Value] = reader_branches
            .map(|branches| branches.as_slice())
            .unwrap_or(&reader_whole);
        let writer_branches: &[Value] = writer_branches
            .map(|branches| branches.as_slice())
            .unwrap_or(&writer_whole);

        for (index, writer_branch) in writer_branches.iter().enumerate() {
            let readable = reader_branches.iter().any(|reader_branch| {
                accepts(reader_branch, reader_side, writer_branch, writer_side, seen)
            });
            if !readable {
                messages.push(format!(
                    "SUM_TYPE_NARROWED at '{}/{}/{}'",
                    path, keyword, index
                ));
            }
        }
    }

    // Product types: pairwise by position; extra reader conjuncts narrow.
    let reader_all = match reader.get("allOf") {
        Some(Value::Array(branches)) => branches.as_slice(),
        _ => &[],
    };
    let writer_all = match writer.get("allOf") {
        Some(Value::Array(branches)) => branches.as_slice(),
        _ => &[],
    };
    if !reader_all.is_empty() || !writer_all.is_empty() {
        let shared = reader_all.len().min(writer_all.len());
        for index in 0..shared {
            let branch_path = format!("{}/allOf/{}", path, index);
            check_schema(
                &reader_all[index],
                reader_side,
                &writer_all[index],
                writer_side,
                &branch_path,
                seen,
                messages,
            );
        }
        if reader_all.len() > writer_all.len() {
            messages.push(format!("PRODUCT_TYPE_EXTENDED at '{}/allOf'", path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::json::parse;

    fn pair(reader: &str, writer: &str) -> Vec<String> {
        let reader = parse(reader, &[]).unwrap();
        let writer = parse(writer, &[]).unwrap();
        check(&reader, &writer)
    }

    #[test]
    fn identical_schemas_are_compatible() {
        let schema = r#"{"type":"object","properties":{"id":{"type":"integer"}}}"#;
        assert!(pair(schema, schema).is_empty());
    }

    #[test]
    fn property_added_to_open_content_model_is_incompatible() {
        let writer = r#"{"type":"object","properties":{"a":{"type":"string"}}}"#;
        let reader =
            r#"{"type":"object","properties":{"a":{"type":"string"},"b":{"type":"integer"}}}"#;
        let messages = pair(reader, writer);
        assert!(messages[0].contains("PROPERTY_ADDED_TO_OPEN_CONTENT_MODEL"));
    }

    #[test]
    fn property_added_to_closed_content_model_is_compatible() {
        let writer = r#"{"type":"object","properties":{"a":{"type":"string"}},"additionalProperties":false}"#;
        let reader = r#"{"type":"object","properties":{"a":{"type":"string"},"b":{"type":"integer"}},"additionalProperties":false}"#;
        assert!(pair(reader, writer).is_empty());
    }

    #[test]
    fn removed_property_needs_a_covering_pattern_under_a_closed_reader() {
        let writer = r#"{"type":"object","properties":{"tag_a":{"type":"string"}},"additionalProperties":false}"#;
        let closed = r#"{"type":"object","properties":{},"additionalProperties":false}"#;
        let messages = pair(closed, writer);
        assert!(messages[0].contains("PROPERTY_REMOVED_FROM_CLOSED_CONTENT_MODEL"));

        let covered = r#"{"type":"object","properties":{},"patternProperties":{"^tag_":{"type":"string"}},"additionalProperties":false}"#;
        assert!(pair(covered, writer).is_empty());
    }

    #[test]
    fn local_refs_are_resolved() {
        let writer = r##"{"definitions":{"id":{"type":"integer"}},"type":"object","properties":{"id":{"$ref":"#/definitions/id"}}}"##;
        let reader = r##"{"$defs":{"id":{"type":"integer"}},"type":"object","properties":{"id":{"$ref":"#/$defs/id"}}}"##;
        assert!(pair(reader, writer).is_empty());

        let narrowed = r##"{"$defs":{"id":{"type":"string"}},"type":"object","properties":{"id":{"$ref":"#/$defs/id"}}}"##;
        let messages = pair(narrowed, writer);
        assert!(messages[0].contains("TYPE_NARROWED"));
    }

    #[test]
    fn string_constraints_narrow() {
        assert!(pair(r#"{"maxLength":5}"#, r#"{"maxLength":10}"#)[0]
            .contains("MAX_LENGTH_DECREASED"));
        assert!(pair(r#"{"maxLength":5}"#, r#"{"type":"string"}"#)[0]
            .contains("MAX_LENGTH_ADDED"));
        assert!(pair(r#"{"minLength":3}"#, r#"{"minLength":1}"#)[0]
            .contains("MIN_LENGTH_INCREASED"));
        assert!(pair(r#"{"pattern":"^a"}"#, r#"{"type":"string"}"#)[0]
            .contains("PATTERN_ADDED"));
        assert!(pair(r#"{"maxLength":10}"#, r#"{"maxLength":5}"#).is_empty());
    }

    #[test]
    fn numeric_constraints_narrow() {
        assert!(pair(r#"{"minimum":5}"#, r#"{"minimum":1}"#)[0].contains("MINIMUM_INCREASED"));
        assert!(pair(r#"{"maximum":5}"#, r#"{"maximum":10}"#)[0].contains("MAXIMUM_DECREASED"));
        assert!(
            pair(r#"{"multipleOf":3}"#, r#"{"multipleOf":5}"#)[0].contains("MULTIPLE_OF_CHANGED")
        );
        // every multiple of 6 is a multiple of 3
        assert!(pair(r#"{"multipleOf":3}"#, r#"{"multipleOf":6}"#).is_empty());
        assert!(pair(r#"{"minimum":1}"#, r#"{"minimum":5}"#).is_empty());
    }

    #[test]
    fn implicit_types_are_detected() {
        let writer = r#"{"properties":{"a":{"type":"string"}}}"#;
        let reader = r#"{"type":"object","properties":{"a":{"type":"string"}}}"#;
        assert!(pair(reader, writer).is_empty());

        let narrowed = r#"{"type":"string"}"#;
        let messages = pair(narrowed, writer);
        assert!(messages[0].contains("TYPE_NARROWED"));
    }

    #[test]
    fn integer_is_accepted_where_number_is_read() {
        assert!(pair(r#"{"type":"number"}"#, r#"{"type":"integer"}"#).is_empty());
        assert!(!pair(r#"{"type":"integer"}"#, r#"{"type":"number"}"#).is_empty());
    }

    #[test]
    fn const_and_enum_changes() {
        assert!(pair(r#"{"const":1}"#, r#"{"const":2}"#)[0].contains("CONST_CHANGED"));
        assert!(pair(r#"{"const":1}"#, r#"{"const":1}"#).is_empty());
        assert!(pair(r#"{"enum":[1,2]}"#, r#"{"enum":[1,2,3]}"#)[0]
            .contains("ENUM_ARRAY_NARROWED"));
        assert!(pair(r#"{"enum":[1,2,3]}"#, r#"{"enum":[1,2]}"#).is_empty());
    }

    #[test]
    fn sum_types_must_keep_every_writer_branch() {
        let writer = r#"{"oneOf":[{"type":"string"},{"type":"integer"}]}"#;
        let reader = r#"{"oneOf":[{"type":"string"}]}"#;
        let messages = pair(reader, writer);
        assert!(messages[0].contains("SUM_TYPE_NARROWED"));

        let widened = r#"{"oneOf":[{"type":"string"},{"type":"integer"},{"type":"boolean"}]}"#;
        assert!(pair(widened, writer).is_empty());
    }

    #[test]
    fn all_of_extension_narrows() {
        let writer = r#"{"allOf":[{"type":"object"}]}"#;
        let reader = r#"{"allOf":[{"type":"object"},{"required":["x"]}]}"#;
        let messages = pair(reader, writer);
        assert!(messages[0].contains("PRODUCT_TYPE_EXTENDED"));
    }

    #[test]
    fn dependencies_narrow() {
        let writer = r#"{"dependentRequired":{"a":["b"]}}"#;
        let same = r#"{"dependentRequired":{"a":["b"]}}"#;
        assert!(pair(same, writer).is_empty());

        let extended = r#"{"dependentRequired":{"a":["b","c"]}}"#;
        assert!(pair(extended, writer)[0].contains("DEPENDENCY_ARRAY_EXTENDED"));

        let added = r#"{"dependentRequired":{"z":["b"]}}"#;
        assert!(pair(added, writer)[0].contains("DEPENDENCY_ARRAY_ADDED"));
    }

    #[test]
    fn tuple_items_compare_elementwise() {
        let writer = r#"{"items":[{"type":"string"},{"type":"integer"}]}"#;
        let same = r#"{"prefixItems":[{"type":"string"},{"type":"integer"}]}"#;
        assert!(pair(same, writer).is_empty());

        let narrowed = r#"{"items":[{"type":"string"},{"type":"string"}]}"#;
        assert!(!pair(narrowed, writer).is_empty());
    }

    #[test]
    fn items_false_transitions() {
        let open = r#"{"type":"array"}"#;
        let closed = r#"{"type":"array","items":false}"#;
        let messages = pair(closed, open);
        assert!(messages[0].contains("SCHEMA_NARROWED_TO_FALSE"));
        assert!(pair(open, closed).is_empty());
    }

    #[test]
    fn boolean_property_schemas() {
        let writer = r#"{"properties":{"a":true}}"#;
        let reader = r#"{"properties":{"a":{"type":"string"}}}"#;
        let messages = pair(reader, writer);
        assert!(!messages.is_empty());
        assert!(pair(writer, reader).is_empty());
    }

    #[test]
    fn required_addition_needs_a_default() {
        let writer = r#"{"type":"object","properties":{"a":{"type":"string"}}}"#;
        let plain = r#"{"type":"object","properties":{"a":{"type":"string"}},"required":["a"]}"#;
        assert!(pair(plain, writer)[0].contains("REQUIRED_ATTRIBUTE_ADDED"));

        let with_default = r#"{"type":"object","properties":{"a":{"type":"string","default":"x"}},"required":["a"]}"#;
        assert!(pair(with_default, writer).is_empty());
    }

    #[test]
    fn not_keyword_narrowing() {
        assert!(pair(r#"{"not":{"type":"string"}}"#, r#"{}"#)[0].contains("NOT_TYPE_ADDED"));
        assert!(pair(
            r#"{"not":{"type":"string"}}"#,
            r#"{"not":{"type":"string"}}"#
        )
        .is_empty());
        assert!(pair(
            r#"{"not":{"type":"integer"}}"#,
            r#"{"not":{"type":"string"}}"#
        )[0]
            .contains("NOT_TYPE_NARROWED"));
    }
}
