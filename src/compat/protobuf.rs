//! Protobuf reader/writer compatibility rules.
//!
//! Message-typed fields are compared structurally, by field number and wire
//! type, so the same logical message imported under a different package
//! stays compatible. Synthetic oneofs backing proto3 `optional` fields are
//! ignored throughout.

use std::collections::HashSet;

use crate::parser::protobuf::{
    FieldLabel, FieldType, ProtoField, ProtoIndex, ProtoMessage, ProtoSchema, WireType,
};

/// Whether `reader` can read data written with `writer`. Empty result means
/// compatible.
pub fn check(reader: &ProtoSchema, writer: &ProtoSchema) -> Vec<String> {
    let reader_index = reader.index();
    let writer_index = writer.index();
    let mut messages = Vec::new();
    let mut seen = HashSet::new();

    for writer_message in &writer.messages {
        match reader
            .messages
            .iter()
            .find(|message| message.name == writer_message.name)
        {
            Some(reader_message) => check_message(
                reader_message,
                writer_message,
                &reader_index,
                &writer_index,
                &writer_message.name,
                &mut seen,
                &mut messages,
            ),
            None => messages.push(format!(
                "MESSAGE_REMOVED: message '{}' is missing from the reader schema",
                writer_message.name
            )),
        }
    }

    messages
}

#[allow(clippy::too_many_arguments)]
fn check_message(
    reader: &ProtoMessage,
    writer: &ProtoMessage,
    reader_index: &ProtoIndex<'_>,
    writer_index: &ProtoIndex<'_>,
    path: &str,
    seen: &mut HashSet<(String, String)>,
    messages: &mut Vec<String>,
) {
    if !seen.insert((reader.name.clone(), writer.name.clone())) {
        return;
    }

    // A reader-required field the writer no longer carries cannot be
    // satisfied; this is the proto2 required-removal rule seen from the
    // reading side.
    for reader_field in &reader.fields {
        if reader_field.label != FieldLabel::Required {
            continue;
        }
        if !writer
            .fields
            .iter()
            .any(|field| field.number == reader_field.number)
        {
            messages.push(format!(
                "REQUIRED_FIELD_REMOVED: required field '{}' ({}) is absent from the writer schema at '{}'",
                reader_field.name, reader_field.number, path
            ));
        }
    }

    for writer_field in &writer.fields {
        let Some(reader_field) = reader
            .fields
            .iter()
            .find(|field| field.number == writer_field.number)
        else {
            // Unknown fields are skipped by every proto decoder.
            continue;
        };

        let field_path = format!("{}.{}", path, reader_field.name);
        check_field(
            reader_field,
            writer_field,
            reader,
            writer,
            reader_index,
            writer_index,
            &field_path,
            seen,
            messages,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn check_field(
    reader_field: &ProtoField,
    writer_field: &ProtoField,
    reader_message: &ProtoMessage,
    writer_message: &ProtoMessage,
    reader_index: &ProtoIndex<'_>,
    writer_index: &ProtoIndex<'_>,
    path: &str,
    seen: &mut HashSet<(String, String)>,
    messages: &mut Vec<String>,
) {
    let reader_wire = reader_index.wire_type(&reader_field.field_type);
    let writer_wire = writer_index.wire_type(&writer_field.field_type);

    if reader_wire != writer_wire {
        messages.push(format!(
            "FIELD_KIND_CHANGED: field {} changed wire type at '{}'",
            reader_field.number, path
        ));
        return;
    }

    let reader_repeated = reader_field.label == FieldLabel::Repeated;
    let writer_repeated = writer_field.label == FieldLabel::Repeated;
    if reader_repeated != writer_repeated && reader_wire != WireType::LengthDelimited {
        // Scalar repeated fields use packed encoding; only length-delimited
        // types decode identically under both labels.
        messages.push(format!(
            "FIELD_MULTIPLICITY_CHANGED: field {} changed between singular and repeated at '{}'",
            reader_field.number, path
        ));
        return;
    }

    // A field newly pulled into a oneof that already holds other fields
    // drops sibling values written by the old schema.
    if writer_field.real_oneof(writer_message).is_none() {
        if let Some(oneof_index) = reader_field.real_oneof(reader_message) {
            let oneof_population = reader_message
                .fields
                .iter()
                .filter(|field| field.oneof == Some(oneof_index))
                .count();
            if oneof_population > 1 {
                messages.push(format!(
                    "FIELD_MOVED_TO_EXISTING_ONEOF: field {} moved into oneof '{}' at '{}'",
                    reader_field.number, reader_message.oneofs[oneof_index].name, path
                ));
                return;
            }
        }
    }

    match (&reader_field.field_type, &writer_field.field_type) {
        (FieldType::Map(reader_key, reader_value), FieldType::Map(writer_key, writer_value)) => {
            if reader_index.wire_type(reader_key) != writer_index.wire_type(writer_key)
                || reader_index.wire_type(reader_value) != writer_index.wire_type(writer_value)
            {
                messages.push(format!(
                    "MAP_ENTRY_CHANGED: map entry types changed for field {} at '{}'",
                    reader_field.number, path
                ));
            }
        }
        (FieldType::Named(reader_name), FieldType::Named(writer_name)) => {
            let reader_resolved = reader_index.message(reader_name);
            let writer_resolved = writer_index.message(writer_name);
            if let (Some(reader_nested), Some(writer_nested)) = (reader_resolved, writer_resolved)
            {
                check_message(
                    reader_nested,
                    writer_nested,
                    reader_index,
                    writer_index,
                    path,
                    seen,
                    messages,
                );
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::protobuf::parse;

    fn pair(reader: &str, writer: &str) -> Vec<String> {
        let reader = parse(reader, &[]).unwrap();
        let writer = parse(writer, &[]).unwrap();
        check(&reader, &writer)
    }

    #[test]
    fn identical_schemas_are_compatible() {
        let schema = "syntax = \"proto3\";\nmessage M { string a = 1; int32 b = 2; }";
        assert!(pair(schema, schema).is_empty());
    }

    #[test]
    fn removing_a_proto2_required_field_is_incompatible() {
        let reader = "syntax = \"proto2\";\nmessage M { required string a = 1; optional int32 b = 2; }";
        let writer = "syntax = \"proto2\";\nmessage M { optional int32 b = 2; }";
        let messages = pair(reader, writer);
        assert!(messages[0].contains("REQUIRED_FIELD_REMOVED"));
    }

    #[test]
    fn proto3_optional_is_not_a_oneof_move() {
        let writer = "syntax = \"proto3\";\nmessage M { int32 a = 1; }";
        let reader = "syntax = \"proto3\";\nmessage M { optional int32 a = 1; }";
        assert!(pair(reader, writer).is_empty());
    }

    #[test]
    fn moving_a_field_into_an_existing_oneof_is_incompatible() {
        let writer = "syntax = \"proto3\";\nmessage M { string a = 1; string b = 2; }";
        let reader =
            "syntax = \"proto3\";\nmessage M { oneof choice { string a = 1; string b = 2; } }";
        let messages = pair(reader, writer);
        assert!(messages
            .iter()
            .any(|m| m.contains("FIELD_MOVED_TO_EXISTING_ONEOF")));
    }

    #[test]
    fn singleton_oneof_is_not_an_existing_oneof() {
        let writer = "syntax = \"proto3\";\nmessage M { string a = 1; }";
        let reader = "syntax = \"proto3\";\nmessage M { oneof choice { string a = 1; } }";
        assert!(pair(reader, writer).is_empty());
    }

    #[test]
    fn multiplicity_change_is_allowed_only_for_length_delimited() {
        let writer = "syntax = \"proto3\";\nmessage M { string a = 1; int32 b = 2; }";
        let strings = "syntax = \"proto3\";\nmessage M { repeated string a = 1; int32 b = 2; }";
        assert!(pair(strings, writer).is_empty());

        let ints = "syntax = \"proto3\";\nmessage M { string a = 1; repeated int32 b = 2; }";
        let messages = pair(ints, writer);
        assert!(messages[0].contains("FIELD_MULTIPLICITY_CHANGED"));
    }

    #[test]
    fn wire_type_change_is_incompatible() {
        let writer = "syntax = \"proto3\";\nmessage M { int32 a = 1; }";
        let reader = "syntax = \"proto3\";\nmessage M { string a = 1; }";
        let messages = pair(reader, writer);
        assert!(messages[0].contains("FIELD_KIND_CHANGED"));
    }

    #[test]
    fn message_fields_compare_structurally_across_packages() {
        let writer = "syntax = \"proto3\";\npackage old.pkg;\nmessage Outer { Inner i = 1; }\nmessage Inner { string s = 1; }";
        let reader = "syntax = \"proto3\";\npackage new.pkg;\nmessage Outer { Inner i = 1; }\nmessage Inner { string s = 1; }";
        assert!(pair(reader, writer).is_empty());

        let changed = "syntax = \"proto3\";\npackage new.pkg;\nmessage Outer { Inner i = 1; }\nmessage Inner { int32 s = 1; }";
        let messages = pair(changed, writer);
        assert!(messages[0].contains("FIELD_KIND_CHANGED"));
    }

    #[test]
    fn removed_message_is_reported() {
        let writer = "syntax = \"proto3\";\nmessage A { string s = 1; }\nmessage B { string s = 1; }";
        let reader = "syntax = \"proto3\";\nmessage A { string s = 1; }";
        let messages = pair(reader, writer);
        assert!(messages[0].contains("MESSAGE_REMOVED"));
    }
}
