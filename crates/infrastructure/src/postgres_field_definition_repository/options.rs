use std::collections::HashMap;

use attrivo_core::{AppError, AppResult};
use attrivo_domain::{FieldDefinition, FieldOption};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct OptionRow {
    custom_field_id: Uuid,
    id: i64,
    name: String,
    sort_order: i32,
    color: Option<String>,
}

pub(super) async fn replace_options(
    transaction: &mut Transaction<'_, Postgres>,
    field: &FieldDefinition,
) -> AppResult<()> {
    sqlx::query("DELETE FROM custom_field_options WHERE custom_field_id = $1")
        .bind(field.id())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to clear options of field '{}': {error}",
                field.code()
            ))
        })?;

    for option in field.options() {
        sqlx::query(
            r#"
            INSERT INTO custom_field_options (custom_field_id, id, name, sort_order, color)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(field.id())
        .bind(option.id())
        .bind(option.name())
        .bind(option.sort_order())
        .bind(option.color())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save option '{}' of field '{}': {error}",
                option.name(),
                field.code()
            ))
        })?;
    }

    Ok(())
}

pub(super) async fn load_options(
    pool: &PgPool,
    field_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<FieldOption>>> {
    if field_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, OptionRow>(
        r#"
        SELECT custom_field_id, id, name, sort_order, color
        FROM custom_field_options
        WHERE custom_field_id = ANY($1)
        ORDER BY custom_field_id, sort_order, id
        "#,
    )
    .bind(field_ids)
    .fetch_all(pool)
    .await
    .map_err(|error| AppError::Internal(format!("failed to load field options: {error}")))?;

    let mut options: HashMap<Uuid, Vec<FieldOption>> = HashMap::new();
    for row in rows {
        let option = FieldOption::new(row.id, row.name, row.sort_order, row.color).map_err(
            |error| {
                AppError::Internal(format!(
                    "persisted option of field '{}' is invalid: {error}",
                    row.custom_field_id
                ))
            },
        )?;
        options.entry(row.custom_field_id).or_default().push(option);
    }

    Ok(options)
}
