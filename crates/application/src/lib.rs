//! Application services and ports for custom fields.

#![forbid(unsafe_code)]

mod field_definition_service;
mod field_ports;
mod field_type_registry;
mod typed_value_store;
mod validation_constraints;
mod value_codec;
mod value_import_service;
mod visibility_engine;

#[cfg(test)]
mod test_support;

pub use field_definition_service::FieldDefinitionService;
pub use field_ports::{FieldDefinitionRepository, FieldValueRepository, ValueEncryptor};
pub use field_type_registry::{FieldTypePolicy, FieldTypeRegistry, FieldTypeRegistryConfig};
pub use typed_value_store::TypedValueStore;
pub use validation_constraints::{
    ColumnConstraints, ENCRYPTION_OVERHEAD_BYTES, RuleViolation, ValidationConstraintEngine,
};
pub use value_codec::{
    decode_value, empty_value, encode_value, is_blank, normalize_value, parse_boolean_input,
    parse_date_input, parse_date_time_input, parse_number_input,
};
pub use value_import_service::{ImportReport, ImportRow, RowFailure, ValueImportService};
pub use visibility_engine::{
    CLIENT_NAMESPACE, ClientAccessorResolver, FormStateAccessors, VisibilityRuleEngine,
    VisibilityState, VisibilityTracker, VisibilityTransition,
};
