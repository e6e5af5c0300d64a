use schema_registry_core::api::configuration::ConfigurationAPI;
use schema_registry_core::api::mode::ModeAPI;
use schema_registry_core::api::schema::SchemaAPI;
use schema_registry_core::api::subject::SubjectAPI;
use schema_registry_core::{CompatibilityLevel, Config, SchemaRegistryError, Version};

mod utils;

const SUBJECT_A: &str = "test.lifecycle.a-value";
const SUBJECT_B: &str = "test.lifecycle.b-value";

#[tokio::test]
async fn dedup_assigns_one_id_per_canonical_schema() {
    for (backend, registry) in utils::registries() {
        let schema = utils::avro(utils::RECORD_WITH_ID);

        let first = registry
            .register_schema(SUBJECT_A, &schema, false)
            .await
            .expect("to register under the first subject");
        let second = registry
            .register_schema(SUBJECT_B, &schema, false)
            .await
            .expect("to register under the second subject");

        assert_eq!(first.id, second.id, "backend {backend}");

        let subjects = registry
            .get_schema_subjects(first.id, None, false)
            .await
            .expect("to list subjects for the id");
        assert_eq!(subjects, vec![SUBJECT_A, SUBJECT_B], "backend {backend}");

        // Same binding for both: version 1 each.
        let bound = registry
            .get_subject_version(SUBJECT_B, Version::Latest, false)
            .await
            .expect("to fetch the binding");
        assert_eq!(bound.version, 1);
        assert_eq!(bound.id, first.id);
    }
}

#[tokio::test]
async fn reregistration_is_idempotent() {
    for (backend, registry) in utils::registries() {
        let schema = utils::avro(utils::RECORD_WITH_ID);

        let first = registry
            .register_schema(SUBJECT_A, &schema, false)
            .await
            .expect("to register");
        let again = registry
            .register_schema(SUBJECT_A, &schema, false)
            .await
            .expect("to re-register");
        assert_eq!(first.id, again.id, "backend {backend}");

        let versions = registry
            .get_subject_versions(SUBJECT_A, false)
            .await
            .expect("to list versions");
        assert_eq!(versions, vec![1], "re-registration must not add a version");
    }
}

#[tokio::test]
async fn versions_are_dense_and_monotonic() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B_C), false)
            .await
            .expect("v2");

        let versions = registry
            .get_subject_versions(SUBJECT_A, false)
            .await
            .expect("to list versions");
        assert_eq!(versions, vec![1, 2], "backend {backend}");
    }
}

#[tokio::test]
async fn soft_deleted_subject_continues_version_numbering() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B_C), false)
            .await
            .expect("v2");

        let affected = registry
            .delete_subject(SUBJECT_A, false)
            .await
            .expect("to soft delete the subject");
        assert_eq!(affected, vec![1, 2]);

        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("to re-register after soft delete");

        let bound = registry
            .lookup_subject_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false, false)
            .await
            .expect("to look the schema up again");
        assert_eq!(bound.version, 3, "backend {backend}: numbering continues");
    }
}

#[tokio::test]
async fn permanent_subject_delete_resets_version_numbering() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");
        registry
            .delete_subject(SUBJECT_A, false)
            .await
            .expect("soft delete");
        registry
            .delete_subject(SUBJECT_A, true)
            .await
            .expect("permanent delete");

        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("to register on the purged subject");
        let bound = registry
            .get_subject_version(SUBJECT_A, Version::Latest, false)
            .await
            .expect("latest");
        assert_eq!(bound.version, 1, "backend {backend}: purged subjects restart");
    }
}

#[tokio::test]
async fn double_soft_delete_fails_with_the_specific_codes() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");

        registry
            .delete_subject_version(SUBJECT_A, Version::Number(1), false)
            .await
            .expect("first soft delete");
        let err = registry
            .delete_subject_version(SUBJECT_A, Version::Number(1), false)
            .await
            .expect_err("second soft delete must fail");
        assert_eq!(err.error_code(), 40406, "backend {backend}: {err}");

        // The subject is now fully soft-deleted; a second subject-level soft
        // delete reports the subject-level code.
        let err = registry
            .delete_subject(SUBJECT_A, false)
            .await
            .expect_err("subject soft delete of a fully soft-deleted subject");
        assert_eq!(err.error_code(), 40404, "backend {backend}: {err}");
    }
}

#[tokio::test]
async fn permanent_delete_requires_prior_soft_delete() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");

        let err = registry
            .delete_subject_version(SUBJECT_A, Version::Number(1), true)
            .await
            .expect_err("permanent delete without soft delete");
        assert_eq!(err.error_code(), 40405, "backend {backend}: {err}");

        registry
            .delete_subject_version(SUBJECT_A, Version::Number(1), false)
            .await
            .expect("soft delete");
        let deleted = registry
            .delete_subject_version(SUBJECT_A, Version::Number(1), true)
            .await
            .expect("permanent delete after soft delete");
        assert_eq!(deleted, 1);
    }
}

#[tokio::test]
async fn permanently_deleting_latest_by_alias_is_refused() {
    for (_backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");
        registry
            .delete_subject_version(SUBJECT_A, Version::Number(1), false)
            .await
            .expect("soft delete");

        let err = registry
            .delete_subject_version(SUBJECT_A, Version::Latest, true)
            .await
            .expect_err("permanent delete of 'latest' must be refused");
        assert_eq!(err.error_code(), 42202);
    }
}

#[tokio::test]
async fn soft_delete_hides_the_version_from_latest() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B_C), false)
            .await
            .expect("v2");

        registry
            .delete_subject_version(SUBJECT_A, Version::Number(2), false)
            .await
            .expect("soft delete the latest");

        let latest = registry
            .get_subject_version(SUBJECT_A, Version::Latest, false)
            .await
            .expect("latest after soft delete");
        assert_eq!(latest.version, 1, "backend {backend}");

        registry
            .delete_subject_version(SUBJECT_A, Version::Number(1), false)
            .await
            .expect("soft delete the remaining version");
        let err = registry
            .get_subject_version(SUBJECT_A, Version::Latest, false)
            .await
            .expect_err("no non-deleted version left");
        assert_eq!(err.error_code(), 40401, "backend {backend}: {err}");

        // Soft-deleted versions stay reachable on request.
        let hidden = registry
            .get_subject_version(SUBJECT_A, Version::Number(2), true)
            .await
            .expect("deleted=true shows the soft-deleted binding");
        assert!(hidden.deleted);
    }
}

#[tokio::test]
async fn fingerprint_includes_field_defaults() {
    for (backend, registry) in utils::registries() {
        registry
            .update_subject_config(SUBJECT_A, Config::compatibility(CompatibilityLevel::None))
            .await
            .expect("to disable compatibility checking");

        let zero = registry
            .register_schema(SUBJECT_A, &utils::avro(utils::DEFAULT_ZERO), false)
            .await
            .expect("default 0");
        let one = registry
            .register_schema(SUBJECT_A, &utils::avro(utils::DEFAULT_ONE), false)
            .await
            .expect("default 1");

        assert_ne!(
            zero.id, one.id,
            "backend {backend}: defaults are part of the identity"
        );
    }
}

#[tokio::test]
async fn lookup_distinguishes_missing_subject_from_missing_schema() {
    for (backend, registry) in utils::registries() {
        let err = registry
            .lookup_subject_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false, false)
            .await
            .expect_err("subject does not exist yet");
        assert_eq!(err.error_code(), 40401, "backend {backend}: {err}");

        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");
        let err = registry
            .lookup_subject_schema(SUBJECT_A, &utils::avro(utils::RECORD_WITH_ID), false, false)
            .await
            .expect_err("subject exists but this schema is not in it");
        assert_eq!(err.error_code(), 40403, "backend {backend}: {err}");
    }
}

#[tokio::test]
async fn read_only_mode_gates_writes_but_not_reads() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B), false)
            .await
            .expect("v1");

        registry
            .update_subject_mode(SUBJECT_A, schema_registry_core::Mode::ReadOnly, false)
            .await
            .expect("to set READONLY");

        let err = registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B_C), false)
            .await
            .expect_err("writes are gated");
        assert_eq!(err.error_code(), 42205, "backend {backend}: {err}");

        let err = registry
            .delete_subject(SUBJECT_A, false)
            .await
            .expect_err("deletes are writes too");
        assert_eq!(err.error_code(), 42205, "backend {backend}: {err}");

        // READONLY does not permit mode changes either.
        let err = registry
            .update_subject_mode(SUBJECT_A, schema_registry_core::Mode::ReadWrite, false)
            .await
            .expect_err("mode changes are blocked under READONLY");
        assert_eq!(err.error_code(), 42205);

        // Reads keep working.
        registry
            .get_subject_version(SUBJECT_A, Version::Latest, false)
            .await
            .expect("reads succeed under READONLY");

        // Removing the subject mode falls back to the global READWRITE.
        registry
            .delete_subject_mode(SUBJECT_A)
            .await
            .expect("to drop the subject mode");
        registry
            .register_schema(SUBJECT_A, &utils::avro(utils::RECORD_A_B_C), false)
            .await
            .expect("writes work again");
    }
}

#[tokio::test]
async fn references_are_tracked_and_filtered_by_deletion() {
    for (backend, registry) in utils::registries() {
        let author = utils::avro(
            r#"{"type":"record","name":"Author","namespace":"acme","fields":[{"name":"name","type":"string"}]}"#,
        );
        registry
            .register_schema("acme.author-value", &author, false)
            .await
            .expect("author v1");

        let book = utils::avro(
            r#"{"type":"record","name":"Book","namespace":"acme","fields":[{"name":"author","type":"acme.Author"}]}"#,
        )
        .reference(schema_registry_core::Reference::new(
            "acme.Author",
            "acme.author-value",
        ));
        let registered = registry
            .register_schema("acme.book-value", &book, false)
            .await
            .expect("book v1");

        let referrers = registry
            .get_subject_version_references("acme.author-value", Version::Number(1))
            .await
            .expect("referenced-by");
        assert_eq!(referrers, vec![registered.id], "backend {backend}");

        registry
            .delete_subject("acme.book-value", false)
            .await
            .expect("soft delete the referrer");
        let referrers = registry
            .get_subject_version_references("acme.author-value", Version::Number(1))
            .await
            .expect("referenced-by after soft delete");
        assert!(
            referrers.is_empty(),
            "backend {backend}: soft-deleted referrers are filtered"
        );
    }
}

#[tokio::test]
async fn unknown_references_fail_as_invalid_schema() {
    for (_backend, registry) in utils::registries() {
        let book = utils::avro(
            r#"{"type":"record","name":"Book","fields":[{"name":"author","type":"acme.Author"}]}"#,
        )
        .reference(schema_registry_core::Reference::new(
            "acme.Author",
            "missing-subject",
        ));
        let err = registry
            .register_schema("book-value", &book, false)
            .await
            .expect_err("reference target does not exist");
        assert!(matches!(err, SchemaRegistryError::InvalidSchema { .. }));
        assert_eq!(err.error_code(), 42201);
    }
}

#[tokio::test]
async fn invalid_schemas_are_rejected_with_the_parser_message() {
    for (_backend, registry) in utils::registries() {
        let err = registry
            .register_schema(SUBJECT_A, &utils::avro(r#"{"type":"record"}"#), false)
            .await
            .expect_err("record without a name");
        assert_eq!(err.error_code(), 42201);
        assert!(err.to_string().contains("name"));
    }
}
