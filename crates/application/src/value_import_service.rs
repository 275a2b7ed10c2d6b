use std::collections::HashMap;
use std::sync::Arc;

use attrivo_core::{AppResult, TenantId};
use attrivo_domain::{DataType, EntityRef, FieldDefinition, comparable_text};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::value_codec::{
    empty_value, is_blank, multi_choice_entries, normalize_value, resolve_option,
};
use crate::{FieldDefinitionService, FieldTypeRegistry, TypedValueStore, ValidationConstraintEngine};

/// One record of an import file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRow {
    /// Identifier of the entity receiving the values.
    pub entity_id: String,
    /// Raw values keyed by field code.
    #[serde(default)]
    pub values: Map<String, Value>,
}

/// A rejected import row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// One-based row number.
    pub row: usize,
    /// Entity identifier as given in the row.
    pub entity_id: String,
    /// Field that caused the rejection, when there is one.
    pub field_code: Option<String>,
    /// Reason for the rejection.
    pub reason: String,
}

/// Outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rows whose values were all written.
    pub imported_rows: usize,
    /// Values written across imported rows.
    pub written_values: usize,
    /// Rejected rows, in file order.
    pub failures: Vec<RowFailure>,
}

struct RowRejection {
    field_code: Option<String>,
    reason: String,
}

impl RowRejection {
    fn new(field_code: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            field_code: field_code.map(str::to_owned),
            reason: reason.into(),
        }
    }
}

/// Applies bulk-imported custom field values, one row at a time.
#[derive(Clone)]
pub struct ValueImportService {
    field_service: FieldDefinitionService,
    store: TypedValueStore,
    validation: ValidationConstraintEngine,
    registry: Arc<FieldTypeRegistry>,
}

impl ValueImportService {
    /// Creates a new import service.
    #[must_use]
    pub fn new(
        field_service: FieldDefinitionService,
        store: TypedValueStore,
        validation: ValidationConstraintEngine,
        registry: Arc<FieldTypeRegistry>,
    ) -> Self {
        Self {
            field_service,
            store,
            validation,
            registry,
        }
    }

    /// Imports rows for one entity type. A failing row is reported and skipped;
    /// the remaining rows still run.
    pub async fn import_rows(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        rows: &[ImportRow],
    ) -> AppResult<ImportReport> {
        let fields = self.field_service.list_active(tenant_id, entity_type).await?;
        let fields_by_code: HashMap<&str, &FieldDefinition> =
            fields.iter().map(|field| (field.code(), field)).collect();

        let mut report = ImportReport::default();
        for (row_number, row) in (1_usize..).zip(rows) {
            match self
                .import_row(tenant_id, entity_type, &fields_by_code, row)
                .await
            {
                Ok(written_values) => {
                    report.imported_rows += 1;
                    report.written_values += written_values;
                }
                Err(rejection) => {
                    warn!(
                        row = row_number,
                        entity_id = %row.entity_id,
                        field = rejection.field_code.as_deref().unwrap_or("-"),
                        reason = %rejection.reason,
                        "rejected import row"
                    );
                    report.failures.push(RowFailure {
                        row: row_number,
                        entity_id: row.entity_id.clone(),
                        field_code: rejection.field_code,
                        reason: rejection.reason,
                    });
                }
            }
        }

        info!(
            entity_type,
            imported_rows = report.imported_rows,
            written_values = report.written_values,
            failed_rows = report.failures.len(),
            "finished custom field import"
        );

        Ok(report)
    }

    async fn import_row(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        fields_by_code: &HashMap<&str, &FieldDefinition>,
        row: &ImportRow,
    ) -> Result<usize, RowRejection> {
        let entity = EntityRef::new(entity_type, row.entity_id.trim())
            .map_err(|error| RowRejection::new(None, error.to_string()))?;

        let mut prepared = Vec::with_capacity(row.values.len());
        for (code, raw) in &row.values {
            let field = fields_by_code.get(code.as_str()).copied().ok_or_else(|| {
                RowRejection::new(
                    Some(code.as_str()),
                    format!("unknown field for entity type '{entity_type}'"),
                )
            })?;

            let value = self
                .prepare_value(field, raw)
                .map_err(|reason| RowRejection::new(Some(code.as_str()), reason))?;

            let violations = self
                .validation
                .violations(field, &value)
                .map_err(|error| RowRejection::new(Some(code.as_str()), error.to_string()))?;
            if !violations.is_empty() {
                let reason = violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(RowRejection::new(Some(code.as_str()), reason));
            }

            prepared.push((field, value));
        }

        for (field, value) in &prepared {
            self.store
                .set(tenant_id, &entity, field, value)
                .await
                .map_err(|error| RowRejection::new(Some(field.code()), error.to_string()))?;
        }

        Ok(prepared.len())
    }

    fn prepare_value(&self, field: &FieldDefinition, raw: &Value) -> Result<Value, String> {
        if is_blank(raw) {
            return Ok(empty_value(field.data_type()));
        }

        let accepts_arbitrary_values = field.data_type().is_choice()
            && self
                .registry
                .get(field.field_type())
                .map_err(|error| error.to_string())?
                .accepts_arbitrary_values();

        match field.data_type() {
            DataType::SingleChoice => resolve_option(field, raw)
                .map(Value::from)
                .ok_or_else(|| format!("unknown option '{}'", comparable_text(raw))),
            DataType::MultiChoice => multi_choice_entries(raw)
                .iter()
                .map(|entry| {
                    resolve_option(field, entry)
                        .map(Value::from)
                        .or_else(|| {
                            let text = comparable_text(entry);
                            (accepts_arbitrary_values && !text.trim().is_empty())
                                .then(|| Value::String(text.trim().to_owned()))
                        })
                        .ok_or_else(|| format!("unknown option '{}'", comparable_text(entry)))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            data_type => {
                let normalized = normalize_value(field, accepts_arbitrary_values, raw);
                if is_blank(&normalized) {
                    return Err(format!(
                        "'{}' cannot be read as {data_type}",
                        comparable_text(raw)
                    ));
                }
                Ok(normalized)
            }
        }
    }
}
