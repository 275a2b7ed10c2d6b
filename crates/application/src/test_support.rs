use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use attrivo_core::{AppError, AppResult, TenantId};
use attrivo_domain::{
    EntityRef, FieldDefinition, FieldDefinitionInput, FieldOption, FieldSettings, FieldValue,
    FieldWidth,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    FieldDefinitionRepository, FieldTypeRegistry, FieldTypeRegistryConfig, FieldValueRepository,
    ValueEncryptor,
};

pub(crate) type ValueKey = (Option<TenantId>, EntityRef, Uuid);

#[derive(Default)]
pub(crate) struct FakeValueRepository {
    pub(crate) rows: Mutex<HashMap<ValueKey, FieldValue>>,
}

#[async_trait]
impl FieldValueRepository for FakeValueRepository {
    async fn find_value(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field: &FieldDefinition,
    ) -> AppResult<Option<FieldValue>> {
        Ok(self
            .rows
            .lock()
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
        let rows = self.rows.lock().await;
        Ok(fields
            .iter()
            .filter_map(|field| rows.get(&(tenant_id, entity.clone(), field.id())).cloned())
            .collect())
    }

    async fn upsert_value(&self, value: FieldValue) -> AppResult<()> {
        let key = (value.tenant_id(), value.entity().clone(), value.field_id());
        self.rows.lock().await.insert(key, value);
        Ok(())
    }

    async fn delete_value(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field_id: Uuid,
    ) -> AppResult<()> {
        self.rows
            .lock()
            .await
            .remove(&(tenant_id, entity.clone(), field_id));
        Ok(())
    }

    async fn delete_values_for_field(
        &self,
        tenant_id: Option<TenantId>,
        field_id: Uuid,
    ) -> AppResult<u64> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|(stored_tenant_id, _, stored_field_id), _| {
            !(stored_tenant_id == &tenant_id && stored_field_id == &field_id)
        });
        Ok(u64::try_from(before - rows.len()).unwrap_or(u64::MAX))
    }
}

#[derive(Default)]
pub(crate) struct FakeFieldRepository {
    pub(crate) fields: Mutex<HashMap<(Option<TenantId>, String, String), FieldDefinition>>,
}

#[async_trait]
impl FieldDefinitionRepository for FakeFieldRepository {
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
        self.fields.lock().await.insert(key, field);
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
            .lock()
            .await
            .get(&(tenant_id, entity_type.to_owned(), code.to_owned()))
            .cloned())
    }

    async fn list_fields(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
    ) -> AppResult<Vec<FieldDefinition>> {
        let fields = self.fields.lock().await;
        let mut listed: Vec<FieldDefinition> = fields
            .iter()
            .filter_map(|((stored_tenant_id, stored_entity_type, _), field)| {
                (stored_tenant_id == &tenant_id && stored_entity_type == entity_type)
                    .then(|| field.clone())
            })
            .collect();
        listed.sort_by(|left, right| {
            left.sort_order()
                .cmp(&right.sort_order())
                .then_with(|| left.code().cmp(right.code()))
        });
        Ok(listed)
    }

    async fn delete_field(&self, tenant_id: Option<TenantId>, field_id: Uuid) -> AppResult<()> {
        let mut fields = self.fields.lock().await;
        let before = fields.len();
        fields.retain(|(stored_tenant_id, _, _), field| {
            !(stored_tenant_id == &tenant_id && field.id() == field_id)
        });
        if fields.len() == before {
            return Err(AppError::NotFound(format!("field '{field_id}' does not exist")));
        }
        Ok(())
    }
}

/// Reversible stand-in for AES: reverses the text behind a marker.
pub(crate) struct ReversingEncryptor;

impl ValueEncryptor for ReversingEncryptor {
    fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        Ok(format!("enc:{}", plaintext.chars().rev().collect::<String>()))
    }

    fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
        ciphertext
            .strip_prefix("enc:")
            .map(|reversed| reversed.chars().rev().collect())
            .ok_or_else(|| AppError::Internal("value is not encrypted".to_owned()))
    }
}

pub(crate) fn registry() -> Arc<FieldTypeRegistry> {
    Arc::new(FieldTypeRegistry::new(FieldTypeRegistryConfig::default()))
}

pub(crate) fn field_input(code: &str) -> FieldDefinitionInput {
    FieldDefinitionInput {
        code: code.to_owned(),
        name: code.to_owned(),
        entity_type: "company".to_owned(),
        validation_rules: Vec::new(),
        settings: FieldSettings::default(),
        sort_order: 0,
        active: true,
        system_defined: false,
        options: Vec::new(),
        width: FieldWidth::Full,
    }
}

pub(crate) fn build_field(field_type: &str, input: FieldDefinitionInput) -> FieldDefinition {
    let field_type = registry()
        .get(field_type)
        .unwrap_or_else(|_| unreachable!());
    FieldDefinition::new(Uuid::new_v4(), &field_type, input).unwrap_or_else(|_| unreachable!())
}

pub(crate) fn options(names: &[&str]) -> Vec<FieldOption> {
    names
        .iter()
        .zip(1_i64..)
        .map(|(name, id)| {
            FieldOption::new(id, *name, i32::try_from(id).unwrap_or_default(), None)
                .unwrap_or_else(|_| unreachable!())
        })
        .collect()
}

pub(crate) fn company(id: &str) -> EntityRef {
    EntityRef::new("company", id).unwrap_or_else(|_| unreachable!())
}
