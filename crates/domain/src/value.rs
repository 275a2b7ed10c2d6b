use attrivo_core::{AppError, AppResult, NonEmptyString, TenantId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{FieldDefinition, StorageColumn};

/// Polymorphic owner of custom field values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    entity_type: NonEmptyString,
    entity_id: NonEmptyString,
}

impl EntityRef {
    /// Creates a validated entity reference.
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            entity_type: NonEmptyString::new(entity_type)?,
            entity_id: NonEmptyString::new(entity_id)?,
        })
    }

    /// Returns the entity type alias.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        self.entity_type.as_str()
    }

    /// Returns the entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        self.entity_id.as_str()
    }
}

/// A value held by exactly one physical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "column", content = "value", rename_all = "snake_case")]
pub enum ColumnValue {
    /// `string_value`.
    String(String),
    /// `text_value`.
    Text(String),
    /// `integer_value`.
    Integer(i64),
    /// `float_value`.
    Float(f64),
    /// `boolean_value`.
    Boolean(bool),
    /// `date_value`.
    Date(NaiveDate),
    /// `datetime_value`.
    DateTime(NaiveDateTime),
    /// `json_value`, always an array.
    Json(Value),
}

impl ColumnValue {
    /// Returns the column holding this value.
    #[must_use]
    pub fn column(&self) -> StorageColumn {
        match self {
            Self::String(_) => StorageColumn::String,
            Self::Text(_) => StorageColumn::Text,
            Self::Integer(_) => StorageColumn::Integer,
            Self::Float(_) => StorageColumn::Float,
            Self::Boolean(_) => StorageColumn::Boolean,
            Self::Date(_) => StorageColumn::Date,
            Self::DateTime(_) => StorageColumn::DateTime,
            Self::Json(_) => StorageColumn::Json,
        }
    }
}

/// One stored value row of the entity-attribute-value table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    tenant_id: Option<TenantId>,
    entity: EntityRef,
    field_id: Uuid,
    value: ColumnValue,
}

impl FieldValue {
    /// Creates a row, checking the value sits in the field's column.
    pub fn new(
        tenant_id: Option<TenantId>,
        entity: EntityRef,
        field: &FieldDefinition,
        value: ColumnValue,
    ) -> AppResult<Self> {
        if entity.entity_type() != field.entity_type() {
            return Err(AppError::Validation(format!(
                "field '{}' belongs to entity type '{}', not '{}'",
                field.code(),
                field.entity_type(),
                entity.entity_type()
            )));
        }

        Self::from_parts(tenant_id, entity, field.id(), field.data_type().storage_column(), value)
    }

    /// Rebuilds a persisted row whose expected column is known.
    pub fn from_parts(
        tenant_id: Option<TenantId>,
        entity: EntityRef,
        field_id: Uuid,
        expected_column: StorageColumn,
        value: ColumnValue,
    ) -> AppResult<Self> {
        if value.column() != expected_column {
            return Err(AppError::Validation(format!(
                "value for field '{field_id}' belongs in '{expected_column}', not '{}'",
                value.column()
            )));
        }

        if let ColumnValue::Json(json) = &value
            && !json.is_array()
        {
            return Err(AppError::Validation(format!(
                "json value for field '{field_id}' must be an array"
            )));
        }

        Ok(Self {
            tenant_id,
            entity,
            field_id,
            value,
        })
    }

    /// Returns the tenant partition.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    /// Returns the owning entity.
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Returns the field definition id.
    #[must_use]
    pub fn field_id(&self) -> Uuid {
        self.field_id
    }

    /// Returns the stored value.
    #[must_use]
    pub fn value(&self) -> &ColumnValue {
        &self.value
    }

    /// Consumes the row and returns the stored value.
    #[must_use]
    pub fn into_value(self) -> ColumnValue {
        self.value
    }
}
