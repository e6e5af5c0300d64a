//! Avro reader/writer compatibility rules.

use std::collections::HashSet;

use crate::parser::avro::{AvroParsed, AvroSchema, EnumSchema, Field, FixedSchema, Record};

/// Pairs of named types already being compared; breaks recursion on
/// self-referential records.
type Seen = HashSet<(String, String)>;

/// Whether `reader` can read data written with `writer`. Empty result means
/// compatible; each message is a category tag plus the diff site.
pub fn check(reader: &AvroParsed, writer: &AvroParsed) -> Vec<String> {
    let mut messages = Vec::new();
    let mut seen = Seen::new();
    check_schema(
        reader,
        &reader.root,
        writer,
        &writer.root,
        "/",
        &mut seen,
        &mut messages,
    );
    messages
}

fn kind(schema: &AvroSchema) -> &'static str {
    match schema {
        AvroSchema::Null => "null",
        AvroSchema::Boolean => "boolean",
        AvroSchema::Int => "int",
        AvroSchema::Long => "long",
        AvroSchema::Float => "float",
        AvroSchema::Double => "double",
        AvroSchema::Bytes => "bytes",
        AvroSchema::String => "string",
        AvroSchema::Array(_) => "array",
        AvroSchema::Map(_) => "map",
        AvroSchema::Union(_) => "union",
        AvroSchema::Record(_) => "record",
        AvroSchema::Enum(_) => "enum",
        AvroSchema::Fixed(_) => "fixed",
        AvroSchema::Named(_) => "named",
    }
}

fn accepts(
    reader_parsed: &AvroParsed,
    reader: &AvroSchema,
    writer_parsed: &AvroParsed,
    writer: &AvroSchema,
    seen: &Seen,
) -> bool {
    let mut probe = Vec::new();
    let mut seen = seen.clone();
    check_schema(
        reader_parsed,
        reader,
        writer_parsed,
        writer,
        "/",
        &mut seen,
        &mut probe,
    );
    probe.is_empty()
}

#[allow(clippy::too_many_arguments)]
fn check_schema(
    reader_parsed: &AvroParsed,
    reader: &AvroSchema,
    writer_parsed: &AvroParsed,
    writer: &AvroSchema,
    path: &str,
    seen: &mut Seen,
    messages: &mut Vec<String>,
) {
    let reader = reader_parsed.resolve(reader);
    let writer = writer_parsed.resolve(writer);

    // Union resolution comes first: every writer branch must find a home in
    // the reader, with a scalar lifted into a singleton union as needed.
    if matches!(writer, AvroSchema::Union(_)) || matches!(reader, AvroSchema::Union(_)) {
        let reader_branches: Vec<&AvroSchema> = match reader {
            AvroSchema::Union(branches) => branches.iter().collect(),
            other => vec![other],
        };
        let writer_branches: Vec<&AvroSchema> = match writer {
            AvroSchema::Union(branches) => branches.iter().collect(),
            other => vec![other],
        };

        for branch in writer_branches {
            let readable = reader_branches.iter().any(|reader_branch| {
                accepts(reader_parsed, reader_branch, writer_parsed, branch, seen)
            });
            if !readable {
                messages.push(format!(
                    "MISSING_UNION_BRANCH: writer branch '{}' has no compatible reader branch at '{}'",
                    describe(writer_parsed, branch),
                    path
                ));
            }
        }
        return;
    }

    match (reader, writer) {
        (AvroSchema::Null, AvroSchema::Null)
        | (AvroSchema::Boolean, AvroSchema::Boolean)
        | (AvroSchema::Int, AvroSchema::Int)
        | (AvroSchema::Long, AvroSchema::Long)
        | (AvroSchema::Float, AvroSchema::Float)
        | (AvroSchema::Double, AvroSchema::Double)
        | (AvroSchema::Bytes, AvroSchema::Bytes)
        | (AvroSchema::String, AvroSchema::String) => {}

        // Promotions.
        (AvroSchema::Long, AvroSchema::Int)
        | (AvroSchema::Float, AvroSchema::Int)
        | (AvroSchema::Float, AvroSchema::Long)
        | (AvroSchema::Double, AvroSchema::Int)
        | (AvroSchema::Double, AvroSchema::Long)
        | (AvroSchema::Double, AvroSchema::Float)
        | (AvroSchema::String, AvroSchema::Bytes)
        | (AvroSchema::Bytes, AvroSchema::String) => {}

        (AvroSchema::Array(reader_items), AvroSchema::Array(writer_items)) => {
            let path = format!("{}items/", path);
            check_schema(
                reader_parsed,
                reader_items,
                writer_parsed,
                writer_items,
                &path,
                seen,
                messages,
            );
        }

        (AvroSchema::Map(reader_values), AvroSchema::Map(writer_values)) => {
            let path = format!("{}values/", path);
            check_schema(
                reader_parsed,
                reader_values,
                writer_parsed,
                writer_values,
                &path,
                seen,
                messages,
            );
        }

        (AvroSchema::Record(reader_record), AvroSchema::Record(writer_record)) => {
            let guard = (
                reader_record.fullname.clone(),
                writer_record.fullname.clone(),
            );
            if !seen.insert(guard) {
                return;
            }
            check_record(
                reader_parsed,
                reader_record,
                writer_parsed,
                writer_record,
                path,
                seen,
                messages,
            );
        }

        (AvroSchema::Enum(reader_enum), AvroSchema::Enum(writer_enum)) => {
            check_enum(reader_enum, writer_enum, path, messages);
        }

        (AvroSchema::Fixed(reader_fixed), AvroSchema::Fixed(writer_fixed)) => {
            check_fixed(reader_fixed, writer_fixed, path, messages);
        }

        (reader, writer) => {
            messages.push(format!(
                "TYPE_MISMATCH: reader type {} does not match writer type {} at '{}'",
                kind(reader),
                kind(writer),
                path
            ));
        }
    }
}

fn describe(parsed: &AvroParsed, schema: &AvroSchema) -> String {
    match parsed.resolve(schema) {
        AvroSchema::Record(record) => record.fullname.clone(),
        AvroSchema::Enum(en) => en.fullname.clone(),
        AvroSchema::Fixed(fixed) => fixed.fullname.clone(),
        other => kind(other).to_string(),
    }
}

fn names_match(
    reader_name: &str,
    reader_aliases: &[String],
    writer_name: &str,
    writer_aliases: &[String],
) -> bool {
    reader_name == writer_name
        || reader_aliases.iter().any(|alias| alias == writer_name)
        || writer_aliases.iter().any(|alias| alias == reader_name)
}

#[allow(clippy::too_many_arguments)]
fn check_record(
    reader_parsed: &AvroParsed,
    reader: &Record,
    writer_parsed: &AvroParsed,
    writer: &Record,
    path: &str,
    seen: &mut Seen,
    messages: &mut Vec<String>,
) {
    if !names_match(
        &reader.fullname,
        &reader.aliases,
        &writer.fullname,
        &writer.aliases,
    ) {
        messages.push(format!(
            "NAME_MISMATCH: reader record '{}' does not match writer record '{}' at '{}'",
            reader.fullname, writer.fullname, path
        ));
        return;
    }

    for (index, reader_field) in reader.fields.iter().enumerate() {
        let writer_field = find_writer_field(reader_field, writer);
        match writer_field {
            Some(writer_field) => {
                let field_path = format!("{}fields/{}/", path, index);
                check_schema(
                    reader_parsed,
                    &reader_field.schema,
                    writer_parsed,
                    &writer_field.schema,
                    &field_path,
                    seen,
                    messages,
                );
            }
            None if reader_field.default.is_some() => {}
            None => {
                messages.push(format!(
                    "READER_FIELD_MISSING_DEFAULT_VALUE: reader field '{}' is missing from the writer schema and has no default at '{}fields/{}'",
                    reader_field.name, path, index
                ));
            }
        }
    }
}

fn find_writer_field<'a>(reader_field: &Field, writer: &'a Record) -> Option<&'a Field> {
    if let Some(field) = writer
        .fields
        .iter()
        .find(|field| field.name == reader_field.name)
    {
        return Some(field);
    }
    writer
        .fields
        .iter()
        .find(|field| reader_field.aliases.iter().any(|alias| alias == &field.name))
}

fn check_enum(reader: &EnumSchema, writer: &EnumSchema, path: &str, messages: &mut Vec<String>) {
    if !names_match(
        &reader.fullname,
        &reader.aliases,
        &writer.fullname,
        &writer.aliases,
    ) {
        messages.push(format!(
            "NAME_MISMATCH: reader enum '{}' does not match writer enum '{}' at '{}'",
            reader.fullname, writer.fullname, path
        ));
        return;
    }

    if reader.default.is_some() {
        return;
    }

    let missing: Vec<&String> = writer
        .symbols
        .iter()
        .filter(|symbol| !reader.symbols.contains(symbol))
        .collect();
    if !missing.is_empty() {
        let missing: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
        messages.push(format!(
            "MISSING_ENUM_SYMBOLS: reader is missing symbols [{}] of enum '{}' and declares no default at '{}'",
            missing.join(", "),
            writer.fullname,
            path
        ));
    }
}

fn check_fixed(reader: &FixedSchema, writer: &FixedSchema, path: &str, messages: &mut Vec<String>) {
    if !names_match(
        &reader.fullname,
        &reader.aliases,
        &writer.fullname,
        &writer.aliases,
    ) {
        messages.push(format!(
            "NAME_MISMATCH: reader fixed '{}' does not match writer fixed '{}' at '{}'",
            reader.fullname, writer.fullname, path
        ));
        return;
    }
    if reader.size != writer.size {
        messages.push(format!(
            "FIXED_SIZE_MISMATCH: reader size {} does not match writer size {} for '{}' at '{}'",
            reader.size, writer.size, writer.fullname, path
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::avro::parse;

    fn pair(reader: &str, writer: &str) -> Vec<String> {
        let reader = parse(reader, &[]).unwrap();
        let writer = parse(writer, &[]).unwrap();
        check(&reader, &writer)
    }

    #[test]
    fn identical_records_are_compatible() {
        let schema = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"}]}"#;
        assert!(pair(schema, schema).is_empty());
    }

    #[test]
    fn int_promotes_to_long_but_not_back() {
        assert!(pair(r#""long""#, r#""int""#).is_empty());
        assert!(pair(r#""double""#, r#""float""#).is_empty());
        assert!(pair(r#""string""#, r#""bytes""#).is_empty());
        assert!(!pair(r#""int""#, r#""long""#).is_empty());
    }

    #[test]
    fn added_reader_field_needs_a_default() {
        let writer = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"}]}"#;
        let with_default = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"},{"name":"b","type":"string","default":"x"}]}"#;
        let without_default = r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"},{"name":"b","type":"string"}]}"#;

        assert!(pair(with_default, writer).is_empty());
        let messages = pair(without_default, writer);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("READER_FIELD_MISSING_DEFAULT_VALUE"));
        assert!(messages[0].contains("'b'"));
    }

    #[test]
    fn field_renames_resolve_through_reader_aliases() {
        let writer = r#"{"type":"record","name":"R","fields":[{"name":"old_name","type":"int"}]}"#;
        let reader = r#"{"type":"record","name":"R","fields":[{"name":"new_name","type":"int","aliases":["old_name"]}]}"#;
        assert!(pair(reader, writer).is_empty());
    }

    #[test]
    fn record_renames_resolve_through_aliases() {
        let writer = r#"{"type":"record","name":"Old","fields":[]}"#;
        let reader = r#"{"type":"record","name":"New","aliases":["Old"],"fields":[]}"#;
        assert!(pair(reader, writer).is_empty());

        let unrelated = r#"{"type":"record","name":"Other","fields":[]}"#;
        assert!(pair(unrelated, writer)[0].contains("NAME_MISMATCH"));
    }

    #[test]
    fn enum_narrowing_needs_a_default() {
        let writer = r#"{"type":"enum","name":"Suit","symbols":["HEARTS","SPADES"]}"#;
        let narrowed = r#"{"type":"enum","name":"Suit","symbols":["HEARTS"]}"#;
        let narrowed_with_default =
            r#"{"type":"enum","name":"Suit","symbols":["HEARTS"],"default":"HEARTS"}"#;

        let messages = pair(narrowed, writer);
        assert!(messages[0].contains("MISSING_ENUM_SYMBOLS"));
        assert!(messages[0].contains("SPADES"));
        assert!(pair(narrowed_with_default, writer).is_empty());
    }

    #[test]
    fn union_branches_lift_scalars() {
        // writer scalar into reader union
        assert!(pair(r#"["null","string"]"#, r#""string""#).is_empty());
        // writer union into reader scalar only if every branch fits
        assert!(!pair(r#""string""#, r#"["null","string"]"#).is_empty());
        // promotion applies inside branches
        assert!(pair(r#"["null","long"]"#, r#"["null","int"]"#).is_empty());
    }

    #[test]
    fn fixed_requires_matching_name_and_size() {
        let writer = r#"{"type":"fixed","name":"Hash","size":16}"#;
        assert!(pair(r#"{"type":"fixed","name":"Hash","size":16}"#, writer).is_empty());
        let messages = pair(r#"{"type":"fixed","name":"Hash","size":32}"#, writer);
        assert!(messages[0].contains("FIXED_SIZE_MISMATCH"));
    }

    #[test]
    fn recursive_records_terminate() {
        let node = r#"{"type":"record","name":"Node","fields":[{"name":"next","type":["null","Node"],"default":null}]}"#;
        assert!(pair(node, node).is_empty());
    }

    #[test]
    fn arrays_and_maps_recurse() {
        assert!(pair(
            r#"{"type":"array","items":"long"}"#,
            r#"{"type":"array","items":"int"}"#
        )
        .is_empty());
        let messages = pair(
            r#"{"type":"map","values":"int"}"#,
            r#"{"type":"map","values":"string"}"#,
        );
        assert!(messages[0].contains("TYPE_MISMATCH"));
    }
}
