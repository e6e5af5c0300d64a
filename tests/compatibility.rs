use schema_registry_core::api::compatibility::CompatibilityAPI;
use schema_registry_core::api::configuration::ConfigurationAPI;
use schema_registry_core::api::subject::SubjectAPI;
use schema_registry_core::{CompatibilityLevel, Config, SchemaType, Version};

mod utils;

const SUBJECT: &str = "test.compat.orders-value";

#[tokio::test]
async fn dropping_a_field_is_forward_but_not_backward_compatible() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");

        // Under FORWARD the dropped field is fine: old consumers can read
        // new data.
        registry
            .update_subject_config(SUBJECT, Config::compatibility(CompatibilityLevel::Forward))
            .await
            .expect("to set FORWARD");
        let check = registry
            .check_compatibility(
                SUBJECT,
                Version::Latest,
                &utils::avro(utils::RECORD_A_ONLY),
                false,
            )
            .await
            .expect("check under FORWARD");
        assert!(check.is_compatible, "backend {backend}");
        assert!(check.messages.is_none(), "non-verbose omits messages");

        // Under BACKWARD it is not: new consumers cannot read old data that
        // carries field `b` with no reader default.
        registry
            .update_subject_config(SUBJECT, Config::compatibility(CompatibilityLevel::Backward))
            .await
            .expect("to set BACKWARD");
        let check = registry
            .check_compatibility(
                SUBJECT,
                Version::Latest,
                &utils::avro(utils::RECORD_A_ONLY),
                true,
            )
            .await
            .expect("check under BACKWARD");
        assert!(!check.is_compatible, "backend {backend}");
        let messages = check.messages.expect("verbose returns messages");
        let joined = messages.join("; ");
        assert!(joined.contains("READER_FIELD_MISSING_DEFAULT_VALUE"), "{joined}");
        assert!(joined.contains('b'), "{joined}");
    }
}

#[tokio::test]
async fn incompatible_registration_is_rejected_with_409() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");

        let err = registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_ONLY), false)
            .await
            .expect_err("BACKWARD is the default level");
        assert_eq!(err.error_code(), 409, "backend {backend}: {err}");
        assert_eq!(err.http_status(), 409);
    }
}

#[tokio::test]
async fn none_level_accepts_any_change() {
    for (_backend, registry) in utils::registries() {
        registry
            .update_subject_config(SUBJECT, Config::compatibility(CompatibilityLevel::None))
            .await
            .expect("to set NONE");
        registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");
        registry
            .register_schema(SUBJECT, &utils::avro(r#""string""#), false)
            .await
            .expect("a completely different schema");
    }
}

#[tokio::test]
async fn transitive_level_checks_every_version() {
    for (backend, registry) in utils::registries() {
        registry
            .update_subject_config(SUBJECT, Config::compatibility(CompatibilityLevel::None))
            .await
            .expect("seed without checks");
        registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_ONLY), false)
            .await
            .expect("v1 without b");
        registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v2 with b");

        // A candidate equal to v2 is compatible with v2 but not with v1
        // (v1 data has no `b`, and `b` has no default).
        registry
            .update_subject_config(
                SUBJECT,
                Config::compatibility(CompatibilityLevel::BackwardTransitive),
            )
            .await
            .expect("to set BACKWARD_TRANSITIVE");

        let check = registry
            .check_compatibility_all(SUBJECT, &utils::avro(utils::RECORD_A_B), true)
            .await
            .expect("transitive check");
        assert!(!check.is_compatible, "backend {backend}");
        let messages = check.messages.expect("verbose");
        assert!(messages[0].contains("version 1"), "{}", messages[0]);

        // Soft-deleting the offending version removes it from the check.
        registry
            .delete_subject_version(SUBJECT, Version::Number(1), false)
            .await
            .expect("soft delete v1");
        let check = registry
            .check_compatibility_all(SUBJECT, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("transitive check after soft delete");
        assert!(check.is_compatible, "backend {backend}");
    }
}

#[tokio::test]
async fn full_level_requires_both_directions() {
    for (backend, registry) in utils::registries() {
        registry
            .update_subject_config(SUBJECT, Config::compatibility(CompatibilityLevel::Full))
            .await
            .expect("to set FULL");
        registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");

        // Adding a defaulted field is both backward and forward compatible.
        registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_B_C), false)
            .await
            .expect("defaulted addition under FULL");

        // Dropping `b` without a default fails the backward half.
        let err = registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_ONLY), false)
            .await
            .expect_err("dropping a field fails FULL");
        assert_eq!(err.error_code(), 409, "backend {backend}: {err}");
    }
}

#[tokio::test]
async fn json_schemas_follow_the_content_model_rules() {
    for (backend, registry) in utils::registries() {
        let open_writer = utils::avro(r#"{"type":"object","properties":{"a":{"type":"string"}}}"#)
            .schema_type(SchemaType::Json);
        registry
            .register_schema(SUBJECT, &open_writer, false)
            .await
            .expect("v1");

        // Adding a property to an open content model narrows it.
        let narrowed = utils::avro(
            r#"{"type":"object","properties":{"a":{"type":"string"},"b":{"type":"integer"}}}"#,
        )
        .schema_type(SchemaType::Json);
        let check = registry
            .check_compatibility(SUBJECT, Version::Latest, &narrowed, true)
            .await
            .expect("check");
        assert!(!check.is_compatible, "backend {backend}");
        let messages = check.messages.expect("verbose");
        assert!(
            messages
                .iter()
                .any(|m| m.contains("PROPERTY_ADDED_TO_OPEN_CONTENT_MODEL")),
            "{messages:?}"
        );
    }
}

#[tokio::test]
async fn protobuf_schemas_check_field_rules() {
    for (backend, registry) in utils::registries() {
        let writer = utils::avro("syntax = \"proto3\";\nmessage Order { string id = 1; int32 qty = 2; }")
            .schema_type(SchemaType::Protobuf);
        registry
            .register_schema(SUBJECT, &writer, false)
            .await
            .expect("v1");

        // Wire-type change on field 2.
        let changed = utils::avro("syntax = \"proto3\";\nmessage Order { string id = 1; string qty = 2; }")
            .schema_type(SchemaType::Protobuf);
        let err = registry
            .register_schema(SUBJECT, &changed, false)
            .await
            .expect_err("wire type change");
        assert_eq!(err.error_code(), 409, "backend {backend}: {err}");

        // proto3 optional is not an incompatible oneof move.
        let optionalized =
            utils::avro("syntax = \"proto3\";\nmessage Order { string id = 1; optional int32 qty = 2; }")
                .schema_type(SchemaType::Protobuf);
        registry
            .register_schema(SUBJECT, &optionalized, false)
            .await
            .expect("proto3 optional stays compatible");
    }
}

#[tokio::test]
async fn schema_type_change_is_incompatible() {
    for (_backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("avro v1");
        let json = utils::avro(r#"{"type":"object"}"#).schema_type(SchemaType::Json);
        let err = registry
            .register_schema(SUBJECT, &json, false)
            .await
            .expect_err("schema type change");
        assert_eq!(err.error_code(), 409);
    }
}
