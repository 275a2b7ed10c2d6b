use std::collections::HashMap;

use async_trait::async_trait;
use attrivo_application::FieldValueRepository;
use attrivo_core::{AppError, AppResult, TenantId};
use attrivo_domain::{ColumnValue, EntityRef, FieldDefinition, FieldValue, StorageColumn};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed entity-attribute-value repository.
#[derive(Clone)]
pub struct PostgresFieldValueRepository {
    pool: PgPool,
}

impl PostgresFieldValueRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ValueRow {
    tenant_id: Option<Uuid>,
    entity_type: String,
    entity_id: String,
    custom_field_id: Uuid,
    string_value: Option<String>,
    text_value: Option<String>,
    integer_value: Option<i64>,
    float_value: Option<f64>,
    boolean_value: Option<bool>,
    date_value: Option<NaiveDate>,
    datetime_value: Option<NaiveDateTime>,
    json_value: Option<Value>,
}

impl ValueRow {
    fn into_field_value(self, expected_column: StorageColumn) -> AppResult<FieldValue> {
        let field_id = self.custom_field_id;
        let value = match expected_column {
            StorageColumn::String => self.string_value.map(ColumnValue::String),
            StorageColumn::Text => self.text_value.map(ColumnValue::Text),
            StorageColumn::Integer => self.integer_value.map(ColumnValue::Integer),
            StorageColumn::Float => self.float_value.map(ColumnValue::Float),
            StorageColumn::Boolean => self.boolean_value.map(ColumnValue::Boolean),
            StorageColumn::Date => self.date_value.map(ColumnValue::Date),
            StorageColumn::DateTime => self.datetime_value.map(ColumnValue::DateTime),
            StorageColumn::Json => self.json_value.map(ColumnValue::Json),
        }
        .ok_or_else(|| {
            AppError::Internal(format!(
                "persisted value of field '{field_id}' has no data in '{expected_column}'"
            ))
        })?;

        FieldValue::from_parts(
            self.tenant_id.map(TenantId::from_uuid),
            EntityRef::new(self.entity_type, self.entity_id)?,
            field_id,
            expected_column,
            value,
        )
        .map_err(|error| {
            AppError::Internal(format!(
                "persisted value of field '{field_id}' is invalid: {error}"
            ))
        })
    }
}

/// One bind slot per physical value column; all but one stay `NULL`.
#[derive(Default)]
struct ColumnBinds {
    string_value: Option<String>,
    text_value: Option<String>,
    integer_value: Option<i64>,
    float_value: Option<f64>,
    boolean_value: Option<bool>,
    date_value: Option<NaiveDate>,
    datetime_value: Option<NaiveDateTime>,
    json_value: Option<Value>,
}

impl From<&ColumnValue> for ColumnBinds {
    fn from(value: &ColumnValue) -> Self {
        let mut binds = Self::default();
        match value {
            ColumnValue::String(text) => binds.string_value = Some(text.clone()),
            ColumnValue::Text(text) => binds.text_value = Some(text.clone()),
            ColumnValue::Integer(number) => binds.integer_value = Some(*number),
            ColumnValue::Float(number) => binds.float_value = Some(*number),
            ColumnValue::Boolean(flag) => binds.boolean_value = Some(*flag),
            ColumnValue::Date(date) => binds.date_value = Some(*date),
            ColumnValue::DateTime(date_time) => binds.datetime_value = Some(*date_time),
            ColumnValue::Json(json) => binds.json_value = Some(json.clone()),
        }
        binds
    }
}

const VALUE_COLUMNS: &str = r#"
    tenant_id, entity_type, entity_id, custom_field_id,
    string_value, text_value, integer_value, float_value, boolean_value,
    date_value, datetime_value, json_value
"#;

#[async_trait]
impl FieldValueRepository for PostgresFieldValueRepository {
    async fn find_value(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field: &FieldDefinition,
    ) -> AppResult<Option<FieldValue>> {
        let row = sqlx::query_as::<_, ValueRow>(&format!(
            r#"
            SELECT {VALUE_COLUMNS}
            FROM custom_field_values
            WHERE tenant_id IS NOT DISTINCT FROM $1
              AND entity_type = $2
              AND entity_id = $3
              AND custom_field_id = $4
            "#
        ))
        .bind(tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(entity.entity_type())
        .bind(entity.entity_id())
        .bind(field.id())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to read field '{}' of {} '{}': {error}",
                field.code(),
                entity.entity_type(),
                entity.entity_id()
            ))
        })?;

        row.map(|row| row.into_field_value(field.data_type().storage_column()))
            .transpose()
    }

    async fn list_values(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        fields: &[FieldDefinition],
    ) -> AppResult<Vec<FieldValue>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let columns: HashMap<Uuid, StorageColumn> = fields
            .iter()
            .map(|field| (field.id(), field.data_type().storage_column()))
            .collect();
        let field_ids: Vec<Uuid> = columns.keys().copied().collect();

        let rows = sqlx::query_as::<_, ValueRow>(&format!(
            r#"
            SELECT {VALUE_COLUMNS}
            FROM custom_field_values
            WHERE tenant_id IS NOT DISTINCT FROM $1
              AND entity_type = $2
              AND entity_id = $3
              AND custom_field_id = ANY($4)
            "#
        ))
        .bind(tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(entity.entity_type())
        .bind(entity.entity_id())
        .bind(field_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list field values of {} '{}': {error}",
                entity.entity_type(),
                entity.entity_id()
            ))
        })?;

        rows.into_iter()
            .filter_map(|row| {
                columns
                    .get(&row.custom_field_id)
                    .map(|column| row.into_field_value(*column))
            })
            .collect()
    }

    async fn upsert_value(&self, value: FieldValue) -> AppResult<()> {
        let binds = ColumnBinds::from(value.value());

        sqlx::query(
            r#"
            INSERT INTO custom_field_values (
                tenant_id,
                entity_type,
                entity_id,
                custom_field_id,
                string_value,
                text_value,
                integer_value,
                float_value,
                boolean_value,
                date_value,
                datetime_value,
                json_value,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
            ON CONFLICT (
                (COALESCE(tenant_id, '00000000-0000-0000-0000-000000000000'::uuid)),
                entity_type,
                entity_id,
                custom_field_id
            )
            DO UPDATE SET
                string_value = EXCLUDED.string_value,
                text_value = EXCLUDED.text_value,
                integer_value = EXCLUDED.integer_value,
                float_value = EXCLUDED.float_value,
                boolean_value = EXCLUDED.boolean_value,
                date_value = EXCLUDED.date_value,
                datetime_value = EXCLUDED.datetime_value,
                json_value = EXCLUDED.json_value,
                updated_at = now()
            "#,
        )
        .bind(value.tenant_id().map(|tenant_id| tenant_id.as_uuid()))
        .bind(value.entity().entity_type())
        .bind(value.entity().entity_id())
        .bind(value.field_id())
        .bind(binds.string_value)
        .bind(binds.text_value)
        .bind(binds.integer_value)
        .bind(binds.float_value)
        .bind(binds.boolean_value)
        .bind(binds.date_value)
        .bind(binds.datetime_value)
        .bind(binds.json_value)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store value of field '{}' for {} '{}': {error}",
                value.field_id(),
                value.entity().entity_type(),
                value.entity().entity_id()
            ))
        })?;

        Ok(())
    }

    async fn delete_value(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field_id: Uuid,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM custom_field_values
            WHERE tenant_id IS NOT DISTINCT FROM $1
              AND entity_type = $2
              AND entity_id = $3
              AND custom_field_id = $4
            "#,
        )
        .bind(tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(entity.entity_type())
        .bind(entity.entity_id())
        .bind(field_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete value of field '{field_id}' for {} '{}': {error}",
                entity.entity_type(),
                entity.entity_id()
            ))
        })?;

        debug!(
            field_id = %field_id,
            entity_type = entity.entity_type(),
            entity_id = entity.entity_id(),
            removed = result.rows_affected(),
            "deleted custom field value"
        );

        Ok(())
    }

    async fn delete_values_for_field(
        &self,
        tenant_id: Option<TenantId>,
        field_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM custom_field_values
            WHERE tenant_id IS NOT DISTINCT FROM $1 AND custom_field_id = $2
            "#,
        )
        .bind(tenant_id.map(|tenant_id| tenant_id.as_uuid()))
        .bind(field_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete values of field '{field_id}': {error}"
            ))
        })?;

        Ok(result.rows_affected())
    }
}
