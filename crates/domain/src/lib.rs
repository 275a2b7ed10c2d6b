//! Custom field domain: data types, field types, field definitions, stored values and
//! visibility rules.

#![forbid(unsafe_code)]

mod data_type;
mod field;
mod field_type;
mod validation_rule;
mod value;
mod visibility;

pub use data_type::{DataType, StorageColumn};
pub use field::{FieldDefinition, FieldDefinitionInput, FieldOption, FieldSettings, FieldWidth};
pub use field_type::{
    FieldTypeCapability, FieldTypeDefinition, FieldTypeDefinitionInput, builtin_field_types,
};
pub use validation_rule::ValidationRule;
pub use value::{ColumnValue, EntityRef, FieldValue};
pub use visibility::{
    CLIENT_PRELUDE, OPERATOR_TABLE, OperatorDefinition, VisibilityCondition,
    VisibilityConditionInput, VisibilityLogic, VisibilityMode, VisibilityOperator, VisibilityRule,
    VisibilityRuleInput, comparable_number, comparable_text,
};
