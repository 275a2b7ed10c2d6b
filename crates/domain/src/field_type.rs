use std::collections::HashSet;

use attrivo_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::{DataType, ValidationRule};

/// Capability predicate used to filter the field-type catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTypeCapability {
    /// Values are picked from options.
    Choiceable,
    /// Values take part in full-text search.
    Searchable,
    /// Values can order list results.
    Sortable,
    /// Values can filter list results.
    Filterable,
    /// Values may be encrypted at rest.
    Encryptable,
    /// Free-form entries are accepted next to options.
    AcceptsArbitraryValues,
}

/// Input payload for registering one field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTypeDefinitionInput {
    /// Unique type key.
    pub key: String,
    /// Human-friendly label.
    pub label: String,
    /// Semantic data type of values.
    pub data_type: DataType,
    /// Ordering weight in pickers, lower first.
    #[serde(default)]
    pub priority: i32,
    /// Search capability.
    #[serde(default)]
    pub searchable: bool,
    /// Sort capability.
    #[serde(default)]
    pub sortable: bool,
    /// Filter capability.
    #[serde(default)]
    pub filterable: bool,
    /// Encryption capability.
    #[serde(default)]
    pub encryptable: bool,
    /// Free-form entries accepted (choice types only).
    #[serde(default)]
    pub accepts_arbitrary_values: bool,
    /// Administrators cannot author options (choice types only).
    #[serde(default)]
    pub without_user_options: bool,
    /// Rules applied to every field of this type.
    #[serde(default)]
    pub default_validation_rules: Vec<ValidationRule>,
    /// Rule names administrators may attach.
    #[serde(default)]
    pub available_validation_rules: Vec<String>,
}

/// Immutable capability template instantiated by field definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldTypeDefinitionInput")]
pub struct FieldTypeDefinition {
    key: NonEmptyString,
    label: NonEmptyString,
    data_type: DataType,
    priority: i32,
    searchable: bool,
    sortable: bool,
    filterable: bool,
    encryptable: bool,
    accepts_arbitrary_values: bool,
    without_user_options: bool,
    default_validation_rules: Vec<ValidationRule>,
    available_validation_rules: Vec<String>,
}

impl FieldTypeDefinition {
    /// Creates a validated field type definition.
    pub fn new(input: FieldTypeDefinitionInput) -> AppResult<Self> {
        let FieldTypeDefinitionInput {
            key,
            label,
            data_type,
            priority,
            searchable,
            sortable,
            filterable,
            encryptable,
            accepts_arbitrary_values,
            without_user_options,
            default_validation_rules,
            available_validation_rules,
        } = input;

        let key = NonEmptyString::new(key).map_err(|_| {
            AppError::Configuration("field type key must not be empty".to_owned())
        })?;

        if !data_type.is_choice() && (accepts_arbitrary_values || without_user_options) {
            return Err(AppError::Configuration(format!(
                "field type '{}' uses choice-only capabilities with data type '{}'",
                key.as_str(),
                data_type
            )));
        }

        let mut seen = HashSet::new();
        for rule in &default_validation_rules {
            if !seen.insert(rule.name().to_owned()) {
                return Err(AppError::Configuration(format!(
                    "field type '{}' declares default rule '{}' twice",
                    key.as_str(),
                    rule.name()
                )));
            }
        }

        let available_validation_rules = available_validation_rules
            .into_iter()
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();

        Ok(Self {
            label: NonEmptyString::new(label).map_err(|_| {
                AppError::Configuration(format!(
                    "field type '{}' requires a label",
                    key.as_str()
                ))
            })?,
            key,
            data_type,
            priority,
            searchable,
            sortable,
            filterable,
            encryptable,
            accepts_arbitrary_values,
            without_user_options,
            default_validation_rules,
            available_validation_rules,
        })
    }

    /// Returns the unique type key.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the semantic data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the picker ordering weight.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns whether values are searchable.
    #[must_use]
    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    /// Returns whether values are sortable.
    #[must_use]
    pub fn is_sortable(&self) -> bool {
        self.sortable
    }

    /// Returns whether values are filterable.
    #[must_use]
    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    /// Returns whether values may be encrypted.
    #[must_use]
    pub fn is_encryptable(&self) -> bool {
        self.encryptable
    }

    /// Returns whether free-form entries are accepted.
    #[must_use]
    pub fn accepts_arbitrary_values(&self) -> bool {
        self.accepts_arbitrary_values
    }

    /// Returns whether administrators are barred from authoring options.
    #[must_use]
    pub fn without_user_options(&self) -> bool {
        self.without_user_options
    }

    /// Returns rules applied to every field of this type.
    #[must_use]
    pub fn default_validation_rules(&self) -> &[ValidationRule] {
        &self.default_validation_rules
    }

    /// Returns rule names administrators may attach.
    #[must_use]
    pub fn available_validation_rules(&self) -> &[String] {
        &self.available_validation_rules
    }

    /// Returns whether the rule name may be attached by administrators.
    #[must_use]
    pub fn allows_validation_rule(&self, name: &str) -> bool {
        self.available_validation_rules
            .iter()
            .any(|available| available == name)
    }

    /// Returns whether the type has the capability.
    #[must_use]
    pub fn has_capability(&self, capability: FieldTypeCapability) -> bool {
        match capability {
            FieldTypeCapability::Choiceable => self.data_type.is_choice(),
            FieldTypeCapability::Searchable => self.searchable,
            FieldTypeCapability::Sortable => self.sortable,
            FieldTypeCapability::Filterable => self.filterable,
            FieldTypeCapability::Encryptable => self.encryptable,
            FieldTypeCapability::AcceptsArbitraryValues => self.accepts_arbitrary_values,
        }
    }
}

impl TryFrom<FieldTypeDefinitionInput> for FieldTypeDefinition {
    type Error = AppError;

    fn try_from(input: FieldTypeDefinitionInput) -> Result<Self, Self::Error> {
        Self::new(input)
    }
}

struct BuiltinTemplate {
    key: &'static str,
    label: &'static str,
    data_type: DataType,
    searchable: bool,
    sortable: bool,
    filterable: bool,
    encryptable: bool,
    accepts_arbitrary_values: bool,
    defaults: &'static [&'static str],
    available: &'static [&'static str],
}

const TEXT_RULES: &[&str] = &[
    "required",
    "nullable",
    "string",
    "min",
    "max",
    "between",
    "size",
    "starts_with",
    "ends_with",
    "email",
    "url",
    "in",
    "not_in",
];
const LONG_TEXT_RULES: &[&str] = &["required", "nullable", "string", "min", "max", "between"];
const NUMBER_RULES: &[&str] = &[
    "required", "nullable", "numeric", "integer", "min", "max", "between", "in", "not_in",
];
const DECIMAL_RULES: &[&str] = &["required", "nullable", "numeric", "min", "max", "between"];
const FLAG_RULES: &[&str] = &["required", "boolean"];
const DATE_RULES: &[&str] = &["required", "nullable", "date"];
const SINGLE_CHOICE_RULES: &[&str] = &["required", "nullable", "in", "not_in"];
const MULTI_CHOICE_RULES: &[&str] = &[
    "required", "nullable", "array", "min", "max", "size", "distinct", "in", "not_in",
];
const FREE_FORM_RULES: &[&str] = &[
    "required", "nullable", "array", "min", "max", "size", "distinct",
];

const BUILTIN_TEMPLATES: &[BuiltinTemplate] = &[
    BuiltinTemplate {
        key: "text",
        label: "Text",
        data_type: DataType::String,
        searchable: true,
        sortable: true,
        filterable: true,
        encryptable: true,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: TEXT_RULES,
    },
    BuiltinTemplate {
        key: "textarea",
        label: "Textarea",
        data_type: DataType::Text,
        searchable: true,
        sortable: false,
        filterable: false,
        encryptable: true,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: LONG_TEXT_RULES,
    },
    BuiltinTemplate {
        key: "rich_editor",
        label: "Rich editor",
        data_type: DataType::Text,
        searchable: true,
        sortable: false,
        filterable: false,
        encryptable: true,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: LONG_TEXT_RULES,
    },
    BuiltinTemplate {
        key: "markdown_editor",
        label: "Markdown editor",
        data_type: DataType::Text,
        searchable: true,
        sortable: false,
        filterable: false,
        encryptable: true,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: LONG_TEXT_RULES,
    },
    BuiltinTemplate {
        key: "number",
        label: "Number",
        data_type: DataType::Numeric,
        searchable: false,
        sortable: true,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: NUMBER_RULES,
    },
    BuiltinTemplate {
        key: "currency",
        label: "Currency",
        data_type: DataType::Float,
        searchable: false,
        sortable: true,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: DECIMAL_RULES,
    },
    BuiltinTemplate {
        key: "link",
        label: "Link",
        data_type: DataType::String,
        searchable: true,
        sortable: true,
        filterable: false,
        encryptable: true,
        accepts_arbitrary_values: false,
        defaults: &["url"],
        available: &["required", "nullable", "url", "max", "starts_with"],
    },
    BuiltinTemplate {
        key: "color_picker",
        label: "Color picker",
        data_type: DataType::String,
        searchable: false,
        sortable: false,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: &["required", "nullable"],
    },
    BuiltinTemplate {
        key: "toggle",
        label: "Toggle",
        data_type: DataType::Boolean,
        searchable: false,
        sortable: true,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: FLAG_RULES,
    },
    BuiltinTemplate {
        key: "checkbox",
        label: "Checkbox",
        data_type: DataType::Boolean,
        searchable: false,
        sortable: true,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: FLAG_RULES,
    },
    BuiltinTemplate {
        key: "date",
        label: "Date",
        data_type: DataType::Date,
        searchable: false,
        sortable: true,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: DATE_RULES,
    },
    BuiltinTemplate {
        key: "date_time",
        label: "Date and time",
        data_type: DataType::DateTime,
        searchable: false,
        sortable: true,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: DATE_RULES,
    },
    BuiltinTemplate {
        key: "select",
        label: "Select",
        data_type: DataType::SingleChoice,
        searchable: false,
        sortable: true,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: SINGLE_CHOICE_RULES,
    },
    BuiltinTemplate {
        key: "radio",
        label: "Radio",
        data_type: DataType::SingleChoice,
        searchable: false,
        sortable: true,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: SINGLE_CHOICE_RULES,
    },
    BuiltinTemplate {
        key: "multi_select",
        label: "Multi select",
        data_type: DataType::MultiChoice,
        searchable: false,
        sortable: false,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: MULTI_CHOICE_RULES,
    },
    BuiltinTemplate {
        key: "checkbox_list",
        label: "Checkbox list",
        data_type: DataType::MultiChoice,
        searchable: false,
        sortable: false,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: MULTI_CHOICE_RULES,
    },
    BuiltinTemplate {
        key: "toggle_buttons",
        label: "Toggle buttons",
        data_type: DataType::MultiChoice,
        searchable: false,
        sortable: false,
        filterable: true,
        encryptable: false,
        accepts_arbitrary_values: false,
        defaults: &[],
        available: MULTI_CHOICE_RULES,
    },
    BuiltinTemplate {
        key: "tags_input",
        label: "Tags input",
        data_type: DataType::MultiChoice,
        searchable: true,
        sortable: false,
        filterable: false,
        encryptable: false,
        accepts_arbitrary_values: true,
        defaults: &["distinct"],
        available: FREE_FORM_RULES,
    },
];

/// Returns the code-defined catalog of built-in field types.
pub fn builtin_field_types() -> AppResult<Vec<FieldTypeDefinition>> {
    BUILTIN_TEMPLATES
        .iter()
        .zip(0_i32..)
        .map(|(template, position)| {
            FieldTypeDefinition::new(FieldTypeDefinitionInput {
                key: template.key.to_owned(),
                label: template.label.to_owned(),
                data_type: template.data_type,
                priority: position * 10,
                searchable: template.searchable,
                sortable: template.sortable,
                filterable: template.filterable,
                encryptable: template.encryptable,
                accepts_arbitrary_values: template.accepts_arbitrary_values,
                without_user_options: template.accepts_arbitrary_values,
                default_validation_rules: template
                    .defaults
                    .iter()
                    .map(|name| ValidationRule::named(*name))
                    .collect::<AppResult<Vec<_>>>()?,
                available_validation_rules: template
                    .available
                    .iter()
                    .map(|name| (*name).to_owned())
                    .collect(),
            })
        })
        .collect()
}
