use async_trait::async_trait;
use attrivo_core::{AppResult, TenantId};
use attrivo_domain::{EntityRef, FieldDefinition, FieldValue};
use uuid::Uuid;

/// Repository port for custom field definitions.
#[async_trait]
pub trait FieldDefinitionRepository: Send + Sync {
    /// Saves or replaces a field definition keyed by tenant, entity type and code.
    async fn save_field(&self, tenant_id: Option<TenantId>, field: FieldDefinition)
    -> AppResult<()>;

    /// Finds a field definition by code.
    async fn find_field(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
        code: &str,
    ) -> AppResult<Option<FieldDefinition>>;

    /// Lists field definitions of an entity type ordered by sort order, then code.
    async fn list_fields(
        &self,
        tenant_id: Option<TenantId>,
        entity_type: &str,
    ) -> AppResult<Vec<FieldDefinition>>;

    /// Deletes a field definition and its options.
    async fn delete_field(&self, tenant_id: Option<TenantId>, field_id: Uuid) -> AppResult<()>;
}

/// Repository port for entity-attribute-value rows.
#[async_trait]
pub trait FieldValueRepository: Send + Sync {
    /// Finds the row of one entity and field.
    async fn find_value(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field: &FieldDefinition,
    ) -> AppResult<Option<FieldValue>>;

    /// Lists the rows of one entity for the provided fields.
    async fn list_values(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        fields: &[FieldDefinition],
    ) -> AppResult<Vec<FieldValue>>;

    /// Inserts or replaces the row keyed by tenant, entity and field.
    async fn upsert_value(&self, value: FieldValue) -> AppResult<()>;

    /// Deletes the row of one entity and field if present.
    async fn delete_value(
        &self,
        tenant_id: Option<TenantId>,
        entity: &EntityRef,
        field_id: Uuid,
    ) -> AppResult<()>;

    /// Deletes every row of a field and returns how many were removed.
    async fn delete_values_for_field(
        &self,
        tenant_id: Option<TenantId>,
        field_id: Uuid,
    ) -> AppResult<u64>;
}

/// Port for encrypting string values at rest.
pub trait ValueEncryptor: Send + Sync {
    /// Encrypts plaintext into a storable string.
    fn encrypt(&self, plaintext: &str) -> AppResult<String>;

    /// Decrypts a stored string.
    fn decrypt(&self, ciphertext: &str) -> AppResult<String>;
}
