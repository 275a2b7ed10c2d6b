use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use attrivo_application::FieldValueRepository;
use attrivo_core::{AppResult, TenantId};
use attrivo_domain::{EntityRef, FieldDefinition, FieldValue};
use tokio::sync::RwLock;
use uuid::Uuid;

type ValueKey = (Option<TenantId>, EntityRef, Uuid);

/// In-memory entity-attribute-value repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryFieldValueRepository {
    values: RwLock<HashMap<ValueKey, FieldValue>>,
}

impl InMemoryFieldValueRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl FieldValueRepository for InMemoryFieldValueRepository {
    async fn find_value(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field: &FieldDefinition,
    ) -> AppResult<Option<FieldValue>> {
        Ok(self
            .values
            .read()
            .await
            .get(&(tenant_id, entity.clone(), field.id()))
            .cloned())
    }

    async fn list_values(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        fields: &[FieldDefinition],
    ) -> AppResult<Vec<FieldValue>> {
        let field_ids: HashSet<Uuid> = fields.iter().map(FieldDefinition::id).collect();
        let values = self.values.read().await;

        Ok(values
            .iter()
            .filter_map(|((stored_tenant_id, stored_entity, field_id), value)| {
                (stored_tenant_id == &tenant_id
                    && stored_entity == entity
                    && field_ids.contains(field_id))
                .then_some(value.clone())
            })
            .collect())
    }

    async fn upsert_value(&self, value: FieldValue) -> AppResult<()> {
        let key = (value.tenant_id(), value.entity().clone(), value.field_id());
        self.values.write().await.insert(key, value);
        Ok(())
    }

    async fn delete_value(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field_id: Uuid,
    ) -> AppResult<()> {
        self.values
            .write()
            .await
            .remove(&(tenant_id, entity.clone(), field_id));
        Ok(())
    }

    async fn delete_values_for_field(
        &self,
        tenant_id: Option<TenantId>,
        field_id: Uuid,
    ) -> AppResult<u64> {
        let mut values = self.values.write().await;
        let before = values.len();
        values.retain(|(stored_tenant_id, _, stored_field_id), _| {
            !(stored_tenant_id == &tenant_id && stored_field_id == &field_id)
        });

        Ok(u64::try_from(before - values.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use attrivo_application::FieldValueRepository;
    use attrivo_core::TenantId;
    use attrivo_domain::{ColumnValue, EntityRef, FieldValue, StorageColumn};
    use uuid::Uuid;

    use super::InMemoryFieldValueRepository;

    fn row(tenant_id: Option<TenantId>, entity_id: &str, field_id: Uuid, text: &str) -> FieldValue {
        FieldValue::from_parts(
            tenant_id,
            EntityRef::new("company", entity_id).unwrap_or_else(|_| unreachable!()),
            field_id,
            StorageColumn::String,
            ColumnValue::String(text.to_owned()),
        )
        .unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn upsert_replaces_natural_key() {
        let repository = InMemoryFieldValueRepository::new();
        let field_id = Uuid::new_v4();
        assert!(repository.upsert_value(row(None, "1", field_id, "old")).await.is_ok());
        assert!(repository.upsert_value(row(None, "1", field_id, "new")).await.is_ok());

        let rows = repository.values.read().await;
        assert_eq!(rows.len(), 1);
        assert!(
            rows.values()
                .all(|value| value.value() == &ColumnValue::String("new".to_owned()))
        );
    }

    #[tokio::test]
    async fn delete_for_field_is_tenant_scoped() {
        let repository = InMemoryFieldValueRepository::new();
        let field_id = Uuid::new_v4();
        let tenant = Some(TenantId::new());
        for value in [
            row(None, "1", field_id, "a"),
            row(None, "2", field_id, "b"),
            row(tenant, "1", field_id, "c"),
            row(None, "1", Uuid::new_v4(), "d"),
        ] {
            assert!(repository.upsert_value(value).await.is_ok());
        }

        let removed = repository.delete_values_for_field(None, field_id).await;
        assert!(removed.is_ok_and(|count| count == 2));
        assert_eq!(repository.values.read().await.len(), 2);
    }

    #[tokio::test]
    async fn delete_value_removes_only_one_row() {
        let repository = InMemoryFieldValueRepository::new();
        let field_id = Uuid::new_v4();
        let entity = EntityRef::new("company", "1").unwrap_or_else(|_| unreachable!());
        assert!(repository.upsert_value(row(None, "1", field_id, "a")).await.is_ok());
        assert!(repository.upsert_value(row(None, "2", field_id, "b")).await.is_ok());

        assert!(repository.delete_value(None, &entity, field_id).await.is_ok());
        assert_eq!(repository.values.read().await.len(), 1);
    }
}
