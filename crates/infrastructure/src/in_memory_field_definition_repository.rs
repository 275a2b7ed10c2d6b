use std::collections::HashMap;

use async_trait::async_trait;
use attrivo_application::FieldDefinitionRepository;
use attrivo_core::{AppError, AppResult, TenantId};
use attrivo_domain::FieldDefinition;
use tokio::sync::RwLock;
use uuid::Uuid;

type FieldKey = (Option<TenantId>, String, String);

/// In-memory field definition repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryFieldDefinitionRepository {
    fields: RwLock<HashMap<FieldKey, FieldDefinition>>,
}

impl InMemoryFieldDefinitionRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl FieldDefinitionRepository for InMemoryFieldDefinitionRepository {
    async fn save_field(
        &self,
        tenant_id: Option<TenantId>,
        field: FieldDefinition,
    ) -> AppResult<()> {
        let key = (
            tenant_id,
            field.entity_type().to_owned(),
            field.code().to_owned(),
        );
        let mut fields = self.fields.write().await;

        if let Some(existing) = fields.get(&key)
            && existing.id() != field.id()
        {
            return Err(AppError::Conflict(format!(
                "field '{}' already exists for entity type '{}'",
                key.2, key.1
            )));
        }

        fields.insert(key, field);
        Ok(())
    }

    async fn find_field(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
    ) -> AppResult<Option<FieldDefinition>> {
        Ok(self
            .fields
            .read()
            .await
            .get(&(tenant_id, entity_type.to_owned(), code.to_owned()))
            .cloned())
    }

    async fn list_fields(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
    ) -> AppResult<Vec<FieldDefinition>> {
        let fields = self.fields.read().await;

        let mut values: Vec<FieldDefinition> = fields
            .iter()
            .filter_map(|((stored_tenant_id, stored_entity_type, _), field)| {
                (stored_tenant_id == &tenant_id && stored_entity_type == entity_type)
                    .then_some(field.clone())
            })
            .collect();
        values.sort_by(|left, right| {
            left.sort_order()
                .cmp(&right.sort_order())
                .then_with(|| left.code().cmp(right.code()))
        });

        Ok(values)
    }

    async fn delete_field(&self, tenant_id: Option<TenantId>, field_id: Uuid) -> AppResult<()> {
        let mut fields = self.fields.write().await;
        let before = fields.len();
        fields.retain(|(stored_tenant_id, _, _), field| {
            !(stored_tenant_id == &tenant_id && field.id() == field_id)
        });

        if fields.len() == before {
            return Err(AppError::NotFound(format!(
                "field '{field_id}' does not exist"
            )));
        }

        Ok(())
    }
}
