use std::collections::BTreeSet;
use std::sync::Arc;

use attrivo_core::{AppError, AppResult, TenantId};
use attrivo_domain::{FieldDefinition, FieldDefinitionInput};
use tracing::info;
use uuid::Uuid;

use crate::FieldTypeRegistry;
use crate::field_ports::{FieldDefinitionRepository, FieldValueRepository};

/// Application service managing custom field definitions.
#[derive(Clone)]
pub struct FieldDefinitionService {
    repository: Arc<dyn FieldDefinitionRepository>,
    value_repository: Arc<dyn FieldValueRepository>,
    registry: Arc<FieldTypeRegistry>,
}

impl FieldDefinitionService {
    /// Creates a new service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn FieldDefinitionRepository>,
        value_repository: Arc<dyn FieldValueRepository>,
        registry: Arc<FieldTypeRegistry>,
    ) -> Self {
        Self {
            repository,
            value_repository,
            registry,
        }
    }

    /// Creates a field of the given field type.
    pub async fn create(
        &self,
        tenant_id: Option<TenantId>,
        field_type: &str,
        input: FieldDefinitionInput,
    ) -> AppResult<FieldDefinition> {
        let field_type = self.registry.get(field_type)?;

        if self
            .repository
            .find_field(tenant_id, input.entity_type.as_str(), input.code.trim())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "field '{}' already exists for entity type '{}'",
                input.code.trim(),
                input.entity_type
            )));
        }

        let field = FieldDefinition::new(Uuid::new_v4(), &field_type, input)?;
        self.ensure_visibility_references(tenant_id, &field).await?;
        self.repository.save_field(tenant_id, field.clone()).await?;

        info!(
            field = %field.code(),
            entity_type = %field.entity_type(),
            field_type = %field.field_type(),
            "created custom field"
        );

        Ok(field)
    }

    /// Replaces a field's definition. Code, entity type and field type are kept.
    pub async fn update(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
        input: FieldDefinitionInput,
    ) -> AppResult<FieldDefinition> {
        let existing = self.find_field(tenant_id, entity_type, code).await?;

        if input.code.trim() != existing.code() || input.entity_type != existing.entity_type() {
            return Err(AppError::Validation(format!(
                "field '{}' cannot change its code or entity type",
                existing.code()
            )));
        }

        let field_type = self.registry.get(existing.field_type())?;
        let field = FieldDefinition::new(existing.id(), &field_type, input)?;
        self.ensure_visibility_references(tenant_id, &field).await?;
        self.repository.save_field(tenant_id, field.clone()).await?;

        info!(
            field = %field.code(),
            entity_type = %field.entity_type(),
            field_type = %field.field_type(),
            "updated custom field"
        );

        Ok(field)
    }

    /// Makes a field available on forms again.
    pub async fn activate(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
    ) -> AppResult<FieldDefinition> {
        self.set_active(tenant_id, entity_type, code, true).await
    }

    /// Hides a field from forms while keeping its values.
    pub async fn deactivate(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
    ) -> AppResult<FieldDefinition> {
        self.set_active(tenant_id, entity_type, code, false).await
    }

    /// Deletes a field and its stored values. Returns how many values were removed.
    pub async fn delete(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
    ) -> AppResult<u64> {
        let field = self.find_field(tenant_id, entity_type, code).await?;

        if field.is_system_defined() {
            return Err(AppError::Forbidden(format!(
                "field '{}' is system defined and cannot be deleted",
                field.code()
            )));
        }

        let dependents: Vec<String> = self
            .repository
            .list_fields(tenant_id, entity_type)
            .await?
            .into_iter()
            .filter(|other| {
                let visibility = other.visibility();
                visibility.is_conditional()
                    && visibility
                        .conditions()
                        .iter()
                        .any(|condition| condition.field_code() == field.code())
            })
            .map(|other| other.code().to_owned())
            .collect();
        if !dependents.is_empty() {
            return Err(AppError::Conflict(format!(
                "field '{}' is referenced by the visibility rules of: {}",
                field.code(),
                dependents.join(", ")
            )));
        }

        let removed_values = self
            .value_repository
            .delete_values_for_field(tenant_id, field.id())
            .await?;
        self.repository.delete_field(tenant_id, field.id()).await?;

        info!(
            field = %field.code(),
            entity_type = %field.entity_type(),
            removed_values,
            "deleted custom field"
        );

        Ok(removed_values)
    }

    /// Finds a field by code.
    pub async fn find_field(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
    ) -> AppResult<FieldDefinition> {
        self.repository
            .find_field(tenant_id, entity_type, code)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "field '{code}' does not exist for entity type '{entity_type}'"
                ))
            })
    }

    /// Lists every field of an entity type ordered by sort order, then code.
    pub async fn list_fields(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
    ) -> AppResult<Vec<FieldDefinition>> {
        self.repository.list_fields(tenant_id, entity_type).await
    }

    /// Lists active fields of an entity type ordered by sort order, then code.
    pub async fn list_active(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
    ) -> AppResult<Vec<FieldDefinition>> {
        Ok(self
            .list_fields(tenant_id, entity_type)
            .await?
            .into_iter()
            .filter(FieldDefinition::is_active)
            .collect())
    }

    async fn set_active(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
        active: bool,
    ) -> AppResult<FieldDefinition> {
        let field = self
            .find_field(tenant_id, entity_type, code)
            .await?
            .with_active(active);
        self.repository.save_field(tenant_id, field.clone()).await?;

        info!(
            field = %field.code(),
            entity_type = %field.entity_type(),
            active,
            "changed custom field state"
        );

        Ok(field)
    }

    async fn ensure_visibility_references(
        &self,
        tenant_id: Option<TenantId>,
        field: &FieldDefinition,
    ) -> AppResult<()> {
        let conditions = field.visibility().conditions();
        if !field.visibility().is_conditional() || conditions.is_empty() {
            return Ok(());
        }

        let known_codes: BTreeSet<String> = self
            .repository
            .list_fields(tenant_id, field.entity_type())
            .await?
            .into_iter()
            .map(|other| other.code().to_owned())
            .collect();

        for condition in conditions {
            if !known_codes.contains(condition.field_code()) {
                return Err(AppError::Configuration(format!(
                    "visibility rule of field '{}' references unknown field '{}'",
                    field.code(),
                    condition.field_code()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
