use std::sync::Arc;

use attrivo_core::{AppResult, TenantId};
use attrivo_domain::{
    ColumnValue, DataType, EntityRef, FieldDefinition, FieldValue, StorageColumn,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::FieldTypeRegistry;
use crate::field_ports::{FieldValueRepository, ValueEncryptor};
use crate::value_codec::{decode_value, empty_value, encode_value, is_blank};

/// Reads and writes custom field values through their typed storage columns.
#[derive(Clone)]
pub struct TypedValueStore {
    repository: Arc<dyn FieldValueRepository>,
    registry: Arc<FieldTypeRegistry>,
    encryptor: Arc<dyn ValueEncryptor>,
}

impl TypedValueStore {
    /// Creates a store.
    #[must_use]
    pub fn new(
        repository: Arc<dyn FieldValueRepository>,
        registry: Arc<FieldTypeRegistry>,
        encryptor: Arc<dyn ValueEncryptor>,
    ) -> Self {
        Self {
            repository,
            registry,
            encryptor,
        }
    }

    /// Returns the column storing values of a data type.
    #[must_use]
    pub fn resolve_column(data_type: DataType) -> StorageColumn {
        data_type.storage_column()
    }

    /// Returns the stored value, or `[]` for multi-choice and `null` otherwise.
    pub async fn get(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field: &FieldDefinition,
    ) -> AppResult<Value> {
        match self.repository.find_value(tenant_id, entity, field).await? {
            Some(row) => self.read(field, row.into_value()),
            None => Ok(empty_value(field.data_type())),
        }
    }

    /// Returns the values of several fields keyed by field code.
    pub async fn get_many(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        fields: &[FieldDefinition],
    ) -> AppResult<Map<String, Value>> {
        let mut rows = self.repository.list_values(tenant_id, entity, fields).await?;

        let mut values = Map::new();
        for field in fields {
            let value = match rows.iter().position(|row| row.field_id() == field.id()) {
                Some(index) => self.read(field, rows.swap_remove(index).into_value())?,
                None => empty_value(field.data_type()),
            };
            values.insert(field.code().to_owned(), value);
        }

        Ok(values)
    }

    /// Converts and stores a value, replacing the existing row. Values that convert to
    /// nothing clear the field.
    pub async fn set(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field: &FieldDefinition,
        value: &Value,
    ) -> AppResult<()> {
        let accepts_arbitrary_values = self.accepts_arbitrary_values(field)?;
        let Some(encoded) = encode_value(field, accepts_arbitrary_values, value) else {
            if !is_blank(value) {
                debug!(
                    field = %field.code(),
                    entity_type = %entity.entity_type(),
                    entity_id = %entity.entity_id(),
                    data_type = %field.data_type(),
                    "value could not be converted and was cleared"
                );
            }
            return self.clear(tenant_id, entity, field).await;
        };

        let stored = self.write(field, encoded)?;
        let row = FieldValue::new(tenant_id, entity.clone(), field, stored)?;
        self.repository.upsert_value(row).await
    }

    /// Removes the stored value.
    pub async fn clear(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field: &FieldDefinition,
    ) -> AppResult<()> {
        self.repository
            .delete_value(tenant_id, entity, field.id())
            .await
    }

    fn accepts_arbitrary_values(&self, field: &FieldDefinition) -> AppResult<bool> {
        if !field.data_type().is_choice() {
            return Ok(false);
        }

        Ok(self
            .registry
            .get(field.field_type())?
            .accepts_arbitrary_values())
    }

    fn write(&self, field: &FieldDefinition, value: ColumnValue) -> AppResult<ColumnValue> {
        if !field.is_encrypted() {
            return Ok(value);
        }

        Ok(match value {
            ColumnValue::String(text) => ColumnValue::String(self.encryptor.encrypt(&text)?),
            ColumnValue::Text(text) => ColumnValue::Text(self.encryptor.encrypt(&text)?),
            other => other,
        })
    }

    fn read(&self, field: &FieldDefinition, value: ColumnValue) -> AppResult<Value> {
        let value = if field.is_encrypted() {
            match value {
                ColumnValue::String(text) => ColumnValue::String(self.encryptor.decrypt(&text)?),
                ColumnValue::Text(text) => ColumnValue::Text(self.encryptor.decrypt(&text)?),
                other => other,
            }
        } else {
            value
        };

        Ok(decode_value(value))
    }
}
