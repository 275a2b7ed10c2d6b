//! Attrivo custom field value importer.

#![forbid(unsafe_code)]

mod importer_config;

use std::path::Path;
use std::sync::Arc;

use attrivo_application::{
    FieldDefinitionService, FieldTypeRegistry, ImportReport, ImportRow, TypedValueStore,
    ValidationConstraintEngine, ValueImportService,
};
use attrivo_core::{AppError, AppResult};
use attrivo_infrastructure::{
    AesValueEncryptor, PostgresFieldDefinitionRepository, PostgresFieldValueRepository,
};
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::importer_config::{ImporterConfig, init_tracing};

/// Rows file layout: a bare array or an object wrapping it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowsFile {
    Rows(Vec<ImportRow>),
    Wrapped { rows: Vec<ImportRow> },
}

impl RowsFile {
    fn into_rows(self) -> Vec<ImportRow> {
        match self {
            Self::Rows(rows) | Self::Wrapped { rows } => rows,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ImporterConfig::load()?;
    let rows = read_rows(config.rows_path.as_path()).await?;
    let pool = connect_pool(config.database_url.as_str()).await?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    let import_service = build_import_service(&config, pool)?;

    info!(
        entity_type = %config.entity_type,
        rows = rows.len(),
        tenant_id = ?config.tenant_id,
        "starting custom field import"
    );

    let report = import_service
        .import_rows(config.tenant_id, config.entity_type.as_str(), &rows)
        .await?;

    print_report(&report)?;

    if !report.failures.is_empty() {
        warn!(
            failed_rows = report.failures.len(),
            "custom field import finished with rejected rows"
        );
    }

    Ok(())
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

async fn read_rows(path: &Path) -> AppResult<Vec<ImportRow>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|error| {
        AppError::Validation(format!(
            "failed to read rows file '{}': {error}",
            path.display()
        ))
    })?;

    serde_json::from_str::<RowsFile>(contents.as_str())
        .map(RowsFile::into_rows)
        .map_err(|error| {
            AppError::Validation(format!(
                "rows file '{}' is not a JSON array of import rows: {error}",
                path.display()
            ))
        })
}

fn build_import_service(config: &ImporterConfig, pool: PgPool) -> AppResult<ValueImportService> {
    let registry = Arc::new(FieldTypeRegistry::new(config.registry.clone()));
    let encryptor = Arc::new(AesValueEncryptor::from_hex(config.encryption_key.as_str())?);
    let definition_repository = Arc::new(PostgresFieldDefinitionRepository::new(
        pool.clone(),
        registry.clone(),
    ));
    let value_repository = Arc::new(PostgresFieldValueRepository::new(pool));

    let field_service = FieldDefinitionService::new(
        definition_repository,
        value_repository.clone(),
        registry.clone(),
    );
    let store = TypedValueStore::new(value_repository, registry.clone(), encryptor);
    let validation = ValidationConstraintEngine::new(registry.clone(), config.constraints);

    Ok(ValueImportService::new(
        field_service,
        store,
        validation,
        registry,
    ))
}

fn print_report(report: &ImportReport) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(report)
        .map_err(|error| AppError::Internal(format!("failed to render import report: {error}")))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::RowsFile;

    #[test]
    fn rows_file_accepts_bare_and_wrapped_arrays() {
        let bare: RowsFile =
            serde_json::from_str(r#"[{"entity_id": "1", "values": {"vat": "DE1"}}]"#)
                .unwrap_or_else(|_| unreachable!());
        assert_eq!(bare.into_rows().len(), 1);

        let wrapped: RowsFile = serde_json::from_str(
            r#"{"rows": [{"entity_id": "1"}, {"entity_id": "2", "values": {}}]}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        let rows = wrapped.into_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].values.is_empty());
    }

    #[test]
    fn rows_file_rejects_other_shapes() {
        assert!(serde_json::from_str::<RowsFile>(r#"{"entity_id": "1"}"#).is_err());
    }
}
