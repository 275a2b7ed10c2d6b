use std::sync::Arc;

use attrivo_application::{FieldDefinitionRepository, FieldTypeRegistry, FieldTypeRegistryConfig};
use attrivo_core::{AppError, TenantId};
use attrivo_domain::{
    FieldDefinition, FieldDefinitionInput, FieldOption, FieldSettings, FieldWidth, ValidationRule,
};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresFieldDefinitionRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres custom field tests: {error}");
    }

    Some(pool)
}

fn registry() -> Arc<FieldTypeRegistry> {
    Arc::new(FieldTypeRegistry::new(FieldTypeRegistryConfig::default()))
}

fn unique_entity_type() -> String {
    format!("company_{}", Uuid::new_v4().simple())
}

fn build_field(
    registry: &FieldTypeRegistry,
    field_type: &str,
    entity_type: &str,
    code: &str,
    options: Vec<FieldOption>,
) -> FieldDefinition {
    let field_type = registry
        .get(field_type)
        .unwrap_or_else(|_| unreachable!());

    FieldDefinition::new(
        Uuid::new_v4(),
        &field_type,
        FieldDefinitionInput {
            code: code.to_owned(),
            name: code.to_owned(),
            entity_type: entity_type.to_owned(),
            validation_rules: vec![ValidationRule::named("required").unwrap_or_else(|_| unreachable!())],
            settings: FieldSettings::default(),
            sort_order: 0,
            active: true,
            system_defined: false,
            options,
            width: FieldWidth::Half,
        },
    )
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn field_definitions_round_trip_with_options() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let registry = registry();
    let repository = PostgresFieldDefinitionRepository::new(pool, registry.clone());
    let entity_type = unique_entity_type();
    let options = vec![
        FieldOption::new(2, "High", 1, None).unwrap_or_else(|_| unreachable!()),
        FieldOption::new(1, "Low", 0, None).unwrap_or_else(|_| unreachable!()),
    ];
    let field = build_field(&registry, "select", &entity_type, "priority", options);

    assert!(repository.save_field(None, field.clone()).await.is_ok());

    let loaded = repository
        .find_field(None, &entity_type, "priority")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(loaded, Some(field.clone()));

    let deactivated = field.clone().with_active(false);
    assert!(repository.save_field(None, deactivated).await.is_ok());
    let listed = repository
        .list_fields(None, &entity_type)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(listed.len(), 1);
    assert!(!listed[0].is_active());
    assert_eq!(listed[0].options().len(), 2);
    assert_eq!(
        listed[0].validation_rules(),
        &[ValidationRule::named("required").unwrap_or_else(|_| unreachable!())]
    );

    assert!(repository.delete_field(None, field.id()).await.is_ok());
    let missing = repository.delete_field(None, field.id()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn duplicate_codes_conflict_within_tenant_only() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let registry = registry();
    let repository = PostgresFieldDefinitionRepository::new(pool, registry.clone());
    let entity_type = unique_entity_type();
    let tenant = Some(TenantId::new());

    let first = build_field(&registry, "text", &entity_type, "vat", Vec::new());
    assert!(repository.save_field(None, first).await.is_ok());

    let duplicate = build_field(&registry, "text", &entity_type, "vat", Vec::new());
    let conflict = repository.save_field(None, duplicate.clone()).await;
    assert!(matches!(conflict, Err(AppError::Conflict(_))));

    assert!(repository.save_field(tenant, duplicate).await.is_ok());
    let scoped = repository
        .list_fields(tenant, &entity_type)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(scoped.len(), 1);
}
