use std::collections::HashSet;

use attrivo_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DataType, FieldTypeDefinition, ValidationRule, VisibilityRule};

/// Form column width of a field, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FieldWidth {
    /// 25%.
    Quarter,
    /// 33%.
    Third,
    /// 50%.
    Half,
    /// 66%.
    TwoThirds,
    /// 75%.
    ThreeQuarters,
    /// 100%.
    #[default]
    Full,
}

impl FieldWidth {
    /// Returns the width in percent.
    #[must_use]
    pub fn percent(self) -> u8 {
        match self {
            Self::Quarter => 25,
            Self::Third => 33,
            Self::Half => 50,
            Self::TwoThirds => 66,
            Self::ThreeQuarters => 75,
            Self::Full => 100,
        }
    }
}

impl TryFrom<u8> for FieldWidth {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            25 => Ok(Self::Quarter),
            33 => Ok(Self::Third),
            50 => Ok(Self::Half),
            66 => Ok(Self::TwoThirds),
            75 => Ok(Self::ThreeQuarters),
            100 => Ok(Self::Full),
            _ => Err(AppError::Validation(format!(
                "field width must be one of 25, 33, 50, 66, 75 or 100, got '{value}'"
            ))),
        }
    }
}

impl From<FieldWidth> for u8 {
    fn from(value: FieldWidth) -> Self {
        value.percent()
    }
}

/// One selectable option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    id: i64,
    name: NonEmptyString,
    sort_order: i32,
    color: Option<String>,
}

impl FieldOption {
    /// Creates a validated option. Colors use `#rgb` or `#rrggbb` notation.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        sort_order: i32,
        color: Option<String>,
    ) -> AppResult<Self> {
        if id <= 0 {
            return Err(AppError::Validation(
                "field option id must be positive".to_owned(),
            ));
        }

        let color = color
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty());
        if let Some(color) = &color
            && !is_hex_color(color)
        {
            return Err(AppError::Validation(format!(
                "field option color '{color}' is not a hex color"
            )));
        }

        Ok(Self {
            id,
            name: NonEmptyString::new(name.into().trim())?,
            sort_order,
            color,
        })
    }

    /// Returns the option id stored in field values.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the option label.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the display order.
    #[must_use]
    pub fn sort_order(&self) -> i32 {
        self.sort_order
    }

    /// Returns the optional badge color.
    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };

    matches!(digits.len(), 3 | 6) && digits.chars().all(|digit| digit.is_ascii_hexdigit())
}

/// Per-field presentation and storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSettings {
    /// Values take part in full-text search.
    #[serde(default)]
    pub searchable: bool,
    /// Values are encrypted at rest.
    #[serde(default)]
    pub encrypted: bool,
    /// Shown as a list column.
    #[serde(default = "enabled")]
    pub visible_in_list: bool,
    /// Shown on the detail view.
    #[serde(default = "enabled")]
    pub visible_in_view: bool,
    /// Options carry badge colors.
    #[serde(default)]
    pub enable_option_colors: bool,
    /// Conditional visibility.
    #[serde(default)]
    pub visibility: VisibilityRule,
}

fn enabled() -> bool {
    true
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            searchable: false,
            encrypted: false,
            visible_in_list: true,
            visible_in_view: true,
            enable_option_colors: false,
            visibility: VisibilityRule::always_visible(),
        }
    }
}

/// Input payload for constructing a field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinitionInput {
    /// Code unique within the entity type.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Entity type alias the field is attached to.
    pub entity_type: String,
    /// Administrator-authored rules, in order.
    pub validation_rules: Vec<ValidationRule>,
    /// Settings.
    pub settings: FieldSettings,
    /// Display order.
    pub sort_order: i32,
    /// Active flag.
    pub active: bool,
    /// System-defined fields cannot be deleted.
    pub system_defined: bool,
    /// Options for choice fields.
    pub options: Vec<FieldOption>,
    /// Form width.
    pub width: FieldWidth,
}

/// Administrator-defined custom field attached to an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    id: Uuid,
    code: NonEmptyString,
    name: NonEmptyString,
    entity_type: NonEmptyString,
    field_type: NonEmptyString,
    data_type: DataType,
    validation_rules: Vec<ValidationRule>,
    settings: FieldSettings,
    sort_order: i32,
    active: bool,
    system_defined: bool,
    options: Vec<FieldOption>,
    width: FieldWidth,
}

impl FieldDefinition {
    /// Creates a field definition checked against its field type's capabilities.
    pub fn new(
        id: Uuid,
        field_type: &FieldTypeDefinition,
        input: FieldDefinitionInput,
    ) -> AppResult<Self> {
        let FieldDefinitionInput {
            code,
            name,
            entity_type,
            validation_rules,
            settings,
            sort_order,
            active,
            system_defined,
            mut options,
            width,
        } = input;

        let code = NonEmptyString::new(code.trim())?;
        let data_type = field_type.data_type();

        if settings.encrypted && !field_type.is_encryptable() {
            return Err(AppError::Configuration(format!(
                "field '{}' cannot be encrypted: field type '{}' is not encryptable",
                code.as_str(),
                field_type.key()
            )));
        }

        if !options.is_empty() {
            if !data_type.is_choice() {
                return Err(AppError::Configuration(format!(
                    "field '{}' defines options but field type '{}' is not a choice type",
                    code.as_str(),
                    field_type.key()
                )));
            }
            if field_type.without_user_options() {
                return Err(AppError::Configuration(format!(
                    "field type '{}' does not accept administrator-defined options",
                    field_type.key()
                )));
            }
        }

        let mut seen_ids = HashSet::new();
        let mut seen_names = HashSet::new();
        for option in &options {
            if !seen_ids.insert(option.id()) {
                return Err(AppError::Validation(format!(
                    "field '{}' has duplicate option id '{}'",
                    code.as_str(),
                    option.id()
                )));
            }
            if !seen_names.insert(option.name().to_lowercase()) {
                return Err(AppError::Validation(format!(
                    "field '{}' has duplicate option '{}'",
                    code.as_str(),
                    option.name()
                )));
            }
            if option.color().is_some() && !settings.enable_option_colors {
                return Err(AppError::Validation(format!(
                    "option '{}' has a color but option colors are disabled on field '{}'",
                    option.name(),
                    code.as_str()
                )));
            }
        }
        options.sort_by_key(|option| (option.sort_order(), option.id()));

        let mut seen_rules = HashSet::new();
        for rule in &validation_rules {
            if !field_type.allows_validation_rule(rule.name()) {
                return Err(AppError::Configuration(format!(
                    "validation rule '{}' is not available for field type '{}'",
                    rule.name(),
                    field_type.key()
                )));
            }
            if !rule.has_numeric_bounds() {
                return Err(AppError::Validation(format!(
                    "validation rule '{rule}' of field '{}' needs finite numeric bounds",
                    code.as_str()
                )));
            }
            if !seen_rules.insert(rule.name().to_owned()) {
                return Err(AppError::Validation(format!(
                    "field '{}' declares validation rule '{}' twice",
                    code.as_str(),
                    rule.name()
                )));
            }
        }

        if settings
            .visibility
            .conditions()
            .iter()
            .any(|condition| condition.field_code() == code.as_str())
        {
            return Err(AppError::Configuration(format!(
                "visibility rule of field '{}' cannot depend on itself",
                code.as_str()
            )));
        }

        Ok(Self {
            id,
            code,
            name: NonEmptyString::new(name)?,
            entity_type: NonEmptyString::new(entity_type)?,
            field_type: NonEmptyString::new(field_type.key())?,
            data_type,
            validation_rules,
            settings,
            sort_order,
            active,
            system_defined,
            options,
            width,
        })
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the code.
    #[must_use]
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the owning entity type alias.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        self.entity_type.as_str()
    }

    /// Returns the field type key.
    #[must_use]
    pub fn field_type(&self) -> &str {
        self.field_type.as_str()
    }

    /// Returns the data type inherited from the field type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns administrator-authored rules.
    #[must_use]
    pub fn validation_rules(&self) -> &[ValidationRule] {
        &self.validation_rules
    }

    /// Returns settings.
    #[must_use]
    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    /// Returns the visibility rule.
    #[must_use]
    pub fn visibility(&self) -> &VisibilityRule {
        &self.settings.visibility
    }

    /// Returns whether values are encrypted at rest.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.settings.encrypted
    }

    /// Returns the display order.
    #[must_use]
    pub fn sort_order(&self) -> i32 {
        self.sort_order
    }

    /// Returns whether the field is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns whether the field is protected from deletion.
    #[must_use]
    pub fn is_system_defined(&self) -> bool {
        self.system_defined
    }

    /// Returns options ordered by sort order.
    #[must_use]
    pub fn options(&self) -> &[FieldOption] {
        &self.options
    }

    /// Returns the form width.
    #[must_use]
    pub fn width(&self) -> FieldWidth {
        self.width
    }

    /// Returns a copy with the active flag replaced.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Finds an option by id.
    #[must_use]
    pub fn option(&self, id: i64) -> Option<&FieldOption> {
        self.options.iter().find(|option| option.id() == id)
    }

    /// Resolves an option name to its id, exact match first, then case-insensitive.
    #[must_use]
    pub fn option_id_for_name(&self, name: &str) -> Option<i64> {
        let name = name.trim();
        self.options
            .iter()
            .find(|option| option.name() == name)
            .or_else(|| {
                let lowered = name.to_lowercase();
                self.options
                    .iter()
                    .find(|option| option.name().to_lowercase() == lowered)
            })
            .map(FieldOption::id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::{FieldDefinition, FieldDefinitionInput, FieldOption, FieldSettings, FieldWidth};
    use crate::{
        ValidationRule, VisibilityCondition, VisibilityMode, VisibilityOperator, VisibilityRule,
        VisibilityRuleInput, builtin_field_types,
    };

    fn field_type(key: &str) -> crate::FieldTypeDefinition {
        builtin_field_types()
            .unwrap_or_else(|_| unreachable!())
            .into_iter()
            .find(|field_type| field_type.key() == key)
            .unwrap_or_else(|| unreachable!())
    }

    fn input(code: &str) -> FieldDefinitionInput {
        FieldDefinitionInput {
            code: code.to_owned(),
            name: "Field".to_owned(),
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

    fn option(id: i64, name: &str) -> FieldOption {
        FieldOption::new(id, name, i32::try_from(id).unwrap_or_default(), None)
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn options_on_non_choice_type_are_rejected() {
        let mut definition = input("website");
        definition.options = vec![option(1, "Low")];
        let result = FieldDefinition::new(Uuid::new_v4(), &field_type("text"), definition);
        assert!(matches!(
            result,
            Err(attrivo_core::AppError::Configuration(_))
        ));
    }

    #[test]
    fn options_on_free_form_type_are_rejected() {
        let mut definition = input("tags");
        definition.options = vec![option(1, "red")];
        let result = FieldDefinition::new(Uuid::new_v4(), &field_type("tags_input"), definition);
        assert!(result.is_err());
    }

    #[test]
    fn encryption_requires_encryptable_type() {
        let mut definition = input("employees");
        definition.settings.encrypted = true;
        let result = FieldDefinition::new(Uuid::new_v4(), &field_type("number"), definition);
        assert!(result.is_err());
    }

    #[test]
    fn unavailable_rules_are_rejected() {
        let mut definition = input("employees");
        definition.validation_rules =
            vec![ValidationRule::named("email").unwrap_or_else(|_| unreachable!())];
        let result = FieldDefinition::new(Uuid::new_v4(), &field_type("number"), definition);
        assert!(result.is_err());
    }

    #[test]
    fn non_finite_length_bounds_are_rejected() {
        for rule in ["max:NaN", "min:inf", "between:1,NaN"] {
            let mut definition = input("bio");
            definition.validation_rules = vec![rule.parse().unwrap_or_else(|_| unreachable!())];
            let result = FieldDefinition::new(Uuid::new_v4(), &field_type("textarea"), definition);
            assert!(
                matches!(result, Err(attrivo_core::AppError::Validation(_))),
                "{rule}"
            );
        }
    }

    #[test]
    fn self_referencing_visibility_is_rejected() {
        let mut definition = input("type");
        definition.settings.visibility = VisibilityRule::new(VisibilityRuleInput {
            mode: VisibilityMode::ShowWhen,
            conditions: vec![
                VisibilityCondition::new("type", VisibilityOperator::NotEmpty, json!(null))
                    .unwrap_or_else(|_| unreachable!()),
            ],
            ..VisibilityRuleInput::default()
        })
        .unwrap_or_else(|_| unreachable!());
        let result = FieldDefinition::new(Uuid::new_v4(), &field_type("text"), definition);
        assert!(result.is_err());
    }

    #[test]
    fn option_names_resolve_case_insensitively() {
        let mut definition = input("priority");
        definition.options = vec![option(3, "High"), option(1, "Low"), option(2, "Medium")];
        let field = FieldDefinition::new(Uuid::new_v4(), &field_type("select"), definition)
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(field.option_id_for_name("Medium"), Some(2));
        assert_eq!(field.option_id_for_name("high"), Some(3));
        assert_eq!(field.option_id_for_name("urgent"), None);
        assert_eq!(field.options()[0].name(), "Low");
    }

    #[test]
    fn option_colors_require_setting() {
        let colored = FieldOption::new(1, "Red", 0, Some("#FF0000".to_owned()))
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(colored.color(), Some("#ff0000"));

        let mut definition = input("color");
        definition.options = vec![colored];
        let result =
            FieldDefinition::new(Uuid::new_v4(), &field_type("select"), definition.clone());
        assert!(result.is_err());

        definition.settings.enable_option_colors = true;
        let result = FieldDefinition::new(Uuid::new_v4(), &field_type("select"), definition);
        assert!(result.is_ok());
    }

    #[test]
    fn invalid_option_color_is_rejected() {
        assert!(FieldOption::new(1, "Red", 0, Some("red".to_owned())).is_err());
    }

    #[test]
    fn width_serializes_as_percent() {
        let encoded = serde_json::to_value(FieldWidth::Half).unwrap_or_else(|_| unreachable!());
        assert_eq!(encoded, json!(50));
        assert!(FieldWidth::try_from(40).is_err());
    }
}
