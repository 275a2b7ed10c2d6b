use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use attrivo_application::{FieldDefinitionRepository, FieldTypeRegistry};
use attrivo_core::{AppError, AppResult, TenantId};
use attrivo_domain::{
    DataType, FieldDefinition, FieldDefinitionInput, FieldOption, FieldSettings, FieldWidth,
    ValidationRule,
};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

mod options;

/// PostgreSQL-backed custom field definition repository.
///
/// Definitions are rebuilt through the field type registry, so a row whose
/// field type is no longer registered fails to load.
#[derive(Clone)]
pub struct PostgresFieldDefinitionRepository {
    pool: PgPool,
    registry: Arc<FieldTypeRegistry>,
}

impl PostgresFieldDefinitionRepository {
    /// Creates a repository with the provided connection pool and registry.
    #[must_use]
    pub fn new(pool: PgPool, registry: Arc<FieldTypeRegistry>) -> Self {
        Self { pool, registry }
    }

    fn rebuild(&self, row: FieldRow, options: Vec<FieldOption>) -> AppResult<FieldDefinition> {
        let field_type = self.registry.get(row.field_type.as_str()).map_err(|error| {
            AppError::Configuration(format!(
                "persisted field '{}' cannot be loaded: {error}",
                row.code
            ))
        })?;

        let stored_data_type = DataType::from_str(row.data_type.as_str())?;
        if stored_data_type != field_type.data_type() {
            return Err(AppError::Internal(format!(
                "persisted field '{}' stores '{}' but field type '{}' now maps to '{}'",
                row.code,
                stored_data_type,
                field_type.key(),
                field_type.data_type()
            )));
        }

        let validation_rules = row
            .validation_rules
            .iter()
            .map(|rule| ValidationRule::from_str(rule))
            .collect::<AppResult<Vec<_>>>()?;
        let settings: FieldSettings = serde_json::from_value(row.settings).map_err(|error| {
            AppError::Internal(format!(
                "persisted settings of field '{}' are invalid: {error}",
                row.code
            ))
        })?;
        let width = u8::try_from(row.width)
            .map_err(|_| {
                AppError::Internal(format!(
                    "persisted width '{}' of field '{}' is out of range",
                    row.width, row.code
                ))
            })
            .and_then(FieldWidth::try_from)?;

        FieldDefinition::new(
            row.id,
            &field_type,
            FieldDefinitionInput {
                code: row.code,
                name: row.name,
                entity_type: row.entity_type,
                validation_rules,
                settings,
                sort_order: row.sort_order,
                active: row.is_active,
                system_defined: row.is_system_defined,
                options,
                width,
            },
        )
    }

    fn rebuild_all(
        &self,
        rows: Vec<FieldRow>,
        mut options: HashMap<Uuid, Vec<FieldOption>>,
    ) -> AppResult<Vec<FieldDefinition>> {
        rows.into_iter()
            .map(|row| {
                let field_options = options.remove(&row.id).unwrap_or_default();
                self.rebuild(row, field_options)
            })
            .collect()
    }
}

#[derive(Debug, FromRow)]
struct FieldRow {
    id: Uuid,
    entity_type: String,
    code: String,
    name: String,
    field_type: String,
    data_type: String,
    validation_rules: Vec<String>,
    settings: Value,
    sort_order: i32,
    is_active: bool,
    is_system_defined: bool,
    width: i16,
}

const FIELD_COLUMNS: &str = r#"
    id, entity_type, code, name, field_type, data_type, validation_rules, settings,
    sort_order, is_active, is_system_defined, width
"#;

#[async_trait]
impl FieldDefinitionRepository for PostgresFieldDefinitionRepository {
    async fn save_field(
        &self,
        tenant_id: Option<TenantId>,
        field: FieldDefinition,
    ) -> AppResult<()> {
        let settings = serde_json::to_value(field.settings()).map_err(|error| {
            AppError::Internal(format!(
                "failed to serialize settings of field '{}': {error}",
                field.code()
            ))
        })?;
        let validation_rules: Vec<String> = field
            .validation_rules()
            .iter()
            .map(ValidationRule::to_rule_string)
            .collect();

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start transaction for field '{}': {error}",
                field.code()
            ))
        })?;

        let result = sqlx::query(
            r#"
            INSERT INTO custom_fields (
                id,
                tenant_id,
                entity_type,
                code,
                name,
                field_type,
                data_type,
                validation_rules,
                settings,
                sort_order,
                is_active,
                is_system_defined,
                width,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, now())
            ON CONFLICT (id)
            DO UPDATE SET
                name = EXCLUDED.name,
                validation_rules = EXCLUDED.validation_rules,
                settings = EXCLUDED.settings,
                sort_order = EXCLUDED.sort_order,
                is_active = EXCLUDED.is_active,
                is_system_defined = EXCLUDED.is_system_defined,
                width = EXCLUDED.width,
                updated_at = now()
            "#,
        )
        .bind(field.id())
        .bind(tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(field.entity_type())
        .bind(field.code())
        .bind(field.name())
        .bind(field.field_type())
        .bind(field.data_type().as_str())
        .bind(validation_rules)
        .bind(settings)
        .bind(field.sort_order())
        .bind(field.is_active())
        .bind(field.is_system_defined())
        .bind(i16::from(field.width().percent()))
        .execute(&mut *transaction)
        .await;

        if let Err(error) = result {
            if let sqlx::Error::Database(database_error) = &error
                && database_error.code().as_deref() == Some("23505")
            {
                return Err(AppError::Conflict(format!(
                    "field '{}' already exists for entity type '{}'",
                    field.code(),
                    field.entity_type()
                )));
            }

            return Err(AppError::Internal(format!(
                "failed to save field '{}' for entity type '{}': {error}",
                field.code(),
                field.entity_type()
            )));
        }

        options::replace_options(&mut transaction, &field).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit field '{}': {error}",
                field.code()
            ))
        })
    }

    async fn find_field(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
    ) -> AppResult<Option<FieldDefinition>> {
        let row = sqlx::query_as::<_, FieldRow>(&format!(
            r#"
            SELECT {FIELD_COLUMNS}
            FROM custom_fields
            WHERE tenant_id IS NOT DISTINCT FROM $1 AND entity_type = $2 AND code = $3
            "#
        ))
        .bind(tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(entity_type)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find field '{code}' for entity type '{entity_type}': {error}"
            ))
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut options = options::load_options(&self.pool, &[row.id]).await?;
        let field_options = options.remove(&row.id).unwrap_or_default();
        self.rebuild(row, field_options).map(Some)
    }

    async fn list_fields(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
    ) -> AppResult<Vec<FieldDefinition>> {
        let rows = sqlx::query_as::<_, FieldRow>(&format!(
            r#"
            SELECT {FIELD_COLUMNS}
            FROM custom_fields
            WHERE tenant_id IS NOT DISTINCT FROM $1 AND entity_type = $2
            ORDER BY sort_order, code
            "#
        ))
        .bind(tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(entity_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list fields for entity type '{entity_type}': {error}"
            ))
        })?;

        let field_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let options = options::load_options(&self.pool, &field_ids).await?;
        self.rebuild_all(rows, options)
    }

    async fn delete_field(&self, tenant_id: Option<TenantId>, field_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM custom_fields
            WHERE tenant_id IS NOT DISTINCT FROM $1 AND id = $2
            "#,
        )
        .bind(tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(field_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete field '{field_id}': {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "field '{field_id}' does not exist"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
