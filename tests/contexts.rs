use schema_registry_core::api::configuration::ConfigurationAPI;
use schema_registry_core::api::context::ContextAPI;
use schema_registry_core::api::schema::SchemaAPI;
use schema_registry_core::api::subject::SubjectAPI;
use schema_registry_core::{CompatibilityLevel, Config, Version};

mod utils;

const PLAIN: &str = "orders-value";
const TENANT_A: &str = ":.tenant-a:orders-value";
const TENANT_B: &str = ":.tenant-b:orders-value";

#[tokio::test]
async fn contexts_have_independent_id_sequences() {
    for (backend, registry) in utils::registries() {
        let schema = utils::avro(utils::RECORD_WITH_ID);

        let default_ctx = registry
            .register_schema(PLAIN, &schema, false)
            .await
            .expect("default context");
        let tenant_a = registry
            .register_schema(TENANT_A, &schema, false)
            .await
            .expect("tenant-a context");

        // Same content, but each context runs its own sequence: both get
        // the first id of their context.
        assert_eq!(default_ctx.id, tenant_a.id, "backend {backend}");

        // Dedup holds within a context: another subject in tenant-a reuses
        // the id.
        let tenant_a_again = registry
            .register_schema(":.tenant-a:other-value", &schema, false)
            .await
            .expect("same content, same context");
        assert_eq!(tenant_a.id, tenant_a_again.id, "backend {backend}");
    }
}

#[tokio::test]
async fn contexts_are_created_lazily_and_listed() {
    for (backend, registry) in utils::registries() {
        let before = registry.get_contexts().await.expect("contexts");
        assert_eq!(before, vec!["."], "backend {backend}: only the default");

        registry
            .register_schema(TENANT_A, &utils::avro(utils::RECORD_WITH_ID), false)
            .await
            .expect("first write creates the context");
        registry
            .register_schema(TENANT_B, &utils::avro(utils::RECORD_WITH_ID), false)
            .await
            .expect("second tenant");

        let contexts = registry.get_contexts().await.expect("contexts");
        assert_eq!(contexts, vec![".", "tenant-a", "tenant-b"], "backend {backend}");
    }
}

#[tokio::test]
async fn subjects_are_listed_in_wire_form() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(PLAIN, &utils::avro(utils::RECORD_WITH_ID), false)
            .await
            .expect("default");
        registry
            .register_schema(TENANT_A, &utils::avro(utils::RECORD_WITH_ID), false)
            .await
            .expect("tenant-a");

        let subjects = registry.get_subjects(false).await.expect("subjects");
        assert_eq!(
            subjects,
            vec![":.tenant-a:orders-value", "orders-value"],
            "backend {backend}: default elided, tenants qualified"
        );
    }
}

#[tokio::test]
async fn subject_reads_are_scoped_to_their_context() {
    for (backend, registry) in utils::registries() {
        registry
            .register_schema(TENANT_A, &utils::avro(utils::RECORD_WITH_ID), false)
            .await
            .expect("tenant-a");

        registry
            .get_subject_version(TENANT_A, Version::Latest, false)
            .await
            .expect("visible inside its context");

        let err = registry
            .get_subject_version(PLAIN, Version::Latest, false)
            .await
            .expect_err("not visible from the default context");
        assert_eq!(err.error_code(), 40401, "backend {backend}: {err}");
    }
}

#[tokio::test]
async fn configs_are_scoped_per_context() {
    for (backend, registry) in utils::registries() {
        registry
            .update_subject_config(TENANT_A, Config::compatibility(CompatibilityLevel::None))
            .await
            .expect("tenant-a config");

        let config = registry
            .get_subject_config(TENANT_A, false)
            .await
            .expect("tenant-a config readback");
        assert_eq!(config.compatibility_level, CompatibilityLevel::None);

        let err = registry
            .get_subject_config(PLAIN, false)
            .await
            .expect_err("default-context subject has no config");
        assert_eq!(err.error_code(), 40408, "backend {backend}: {err}");
    }
}

#[tokio::test]
async fn schema_id_lookups_respect_the_context_selector() {
    for (backend, registry) in utils::registries() {
        let registered = registry
            .register_schema(TENANT_A, &utils::avro(utils::RECORD_WITH_ID), false)
            .await
            .expect("tenant-a");

        let schema = registry
            .get_schema_by_id(registered.id, Some(TENANT_A))
            .await
            .expect("id lookup inside tenant-a");
        assert_eq!(schema.schema, utils::RECORD_WITH_ID, "backend {backend}");

        let err = registry
            .get_schema_by_id(registered.id, None)
            .await
            .expect_err("the default context does not hold this id");
        assert_eq!(err.error_code(), 40403, "backend {backend}: {err}");
    }
}
