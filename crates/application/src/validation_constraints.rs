use std::fmt::{Display, Formatter};
use std::sync::Arc;

use attrivo_core::{AppError, AppResult};
use attrivo_domain::{DataType, FieldDefinition, StorageColumn, ValidationRule};
use serde_json::Value;

use crate::FieldTypeRegistry;
use crate::value_codec::resolve_option;

mod rule_checks;

/// Bytes an encrypted value gains before base64 encoding: a 12-byte nonce and a
/// 16-byte authentication tag.
pub const ENCRYPTION_OVERHEAD_BYTES: u64 = 28;

/// Physical column limits turned into database-constraint rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnConstraints {
    /// Maximum characters of a plaintext `string_value`.
    pub string_max_length: u64,
    /// Declared width of the `string_value` column.
    pub string_column_capacity: u64,
    /// Maximum characters of `text_value`, unbounded when `None`.
    pub text_max_length: Option<u64>,
    /// Smallest value of `integer_value`.
    pub integer_min: i64,
    /// Largest value of `integer_value`.
    pub integer_max: i64,
    /// Smallest value of `float_value`, unbounded when `None`.
    pub float_min: Option<f64>,
    /// Largest value of `float_value`, unbounded when `None`.
    pub float_max: Option<f64>,
}

impl Default for ColumnConstraints {
    fn default() -> Self {
        Self {
            string_max_length: 255,
            string_column_capacity: 512,
            text_max_length: None,
            integer_min: i64::MIN,
            integer_max: i64::MAX,
            float_min: None,
            float_max: None,
        }
    }
}

impl ColumnConstraints {
    /// Returns the longest string, in characters, whose sealed form still fits the
    /// `string_value` column. Characters are counted at four UTF-8 bytes each.
    #[must_use]
    pub fn encrypted_string_max_length(&self) -> u64 {
        let sealed_bytes = self.string_column_capacity / 4 * 3;
        sealed_bytes.saturating_sub(ENCRYPTION_OVERHEAD_BYTES) / 4
    }

    fn string_ceiling(&self, encrypted: bool) -> u64 {
        let ceiling = self.string_max_length.min(self.string_column_capacity);
        if encrypted {
            ceiling.min(self.encrypted_string_max_length())
        } else {
            ceiling
        }
    }
}

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    /// Rule in validator-string form.
    pub rule: String,
    /// Human-readable message.
    pub message: String,
}

impl Display for RuleViolation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} [{}]", self.message, self.rule)
    }
}

/// Builds and enforces the merged validator rule list of a field.
///
/// Rules come from three sources: administrator rules on the field, rules derived
/// from the storage column, and the field type's defaults. Administrator rules win
/// by name, except that `max` never exceeds the column ceiling and `min` never
/// falls below the column floor.
#[derive(Clone)]
pub struct ValidationConstraintEngine {
    registry: Arc<FieldTypeRegistry>,
    constraints: ColumnConstraints,
}

impl ValidationConstraintEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(registry: Arc<FieldTypeRegistry>, constraints: ColumnConstraints) -> Self {
        Self {
            registry,
            constraints,
        }
    }

    /// Returns the column constraints.
    #[must_use]
    pub fn constraints(&self) -> &ColumnConstraints {
        &self.constraints
    }

    /// Returns administrator rules with option names in `in`/`not_in` rewritten to ids.
    #[must_use]
    pub fn user_rules(&self, field: &FieldDefinition) -> Vec<ValidationRule> {
        field
            .validation_rules()
            .iter()
            .map(|rule| {
                if !field.data_type().is_choice() || !matches!(rule.name(), "in" | "not_in") {
                    return rule.clone();
                }

                let parameters = rule
                    .parameters()
                    .iter()
                    .map(|parameter| {
                        resolve_option(field, &Value::String(parameter.clone()))
                            .map_or_else(|| parameter.clone(), |id| id.to_string())
                    })
                    .collect();
                rule.with_parameters(parameters)
            })
            .collect()
    }

    /// Returns the rules implied by the field's storage column.
    pub fn database_rules(&self, field: &FieldDefinition) -> AppResult<Vec<ValidationRule>> {
        let constraints = &self.constraints;
        let mut rules = Vec::new();

        match field.data_type().storage_column() {
            StorageColumn::String => {
                rules.push(bounded(
                    "max",
                    constraints.string_ceiling(field.is_encrypted()),
                )?);
            }
            StorageColumn::Text => {
                if let Some(max_length) = constraints.text_max_length {
                    rules.push(bounded("max", max_length)?);
                }
            }
            StorageColumn::Integer => {
                rules.push(ValidationRule::named("integer")?);
                if field.data_type() == DataType::Numeric {
                    rules.push(bounded("min", constraints.integer_min)?);
                    rules.push(bounded("max", constraints.integer_max)?);
                }
            }
            StorageColumn::Float => {
                rules.push(ValidationRule::named("numeric")?);
                if let Some(min) = constraints.float_min {
                    rules.push(bounded("min", min)?);
                }
                if let Some(max) = constraints.float_max {
                    rules.push(bounded("max", max)?);
                }
            }
            StorageColumn::Boolean => rules.push(ValidationRule::named("boolean")?),
            StorageColumn::Date | StorageColumn::DateTime => {
                rules.push(ValidationRule::named("date")?);
            }
            StorageColumn::Json => rules.push(ValidationRule::named("array")?),
        }

        Ok(rules)
    }

    /// Returns the merged rule list: administrator rules, then database rules, then
    /// field type defaults, each name at most once.
    pub fn merged_rules(&self, field: &FieldDefinition) -> AppResult<Vec<ValidationRule>> {
        let field_type = self.registry.get(field.field_type())?;
        let database_rules = self.database_rules(field)?;

        let mut merged: Vec<ValidationRule> = self
            .user_rules(field)
            .into_iter()
            .map(|rule| clamp_to_column(rule, &database_rules))
            .collect();

        for rule in database_rules
            .iter()
            .chain(field_type.default_validation_rules())
        {
            if !merged.iter().any(|existing| existing.name() == rule.name()) {
                merged.push(rule.clone());
            }
        }

        Ok(merged)
    }

    /// Returns the merged rules in validator-string form.
    pub fn rule_strings(&self, field: &FieldDefinition) -> AppResult<Vec<String>> {
        Ok(self
            .merged_rules(field)?
            .iter()
            .map(ValidationRule::to_rule_string)
            .collect())
    }

    /// Returns whether the merged rules contain `required`.
    pub fn is_required(&self, field: &FieldDefinition) -> AppResult<bool> {
        Ok(self
            .merged_rules(field)?
            .iter()
            .any(|rule| rule.name() == "required"))
    }

    /// Lists the rules a submitted value violates.
    pub fn violations(
        &self,
        field: &FieldDefinition,
        value: &Value,
    ) -> AppResult<Vec<RuleViolation>> {
        let rules = self.merged_rules(field)?;
        Ok(rule_checks::evaluate_rules(field.code(), &rules, value))
    }

    /// Validates a submitted value against the merged rules.
    pub fn validate(&self, field: &FieldDefinition, value: &Value) -> AppResult<()> {
        let violations = self.violations(field, value)?;
        if violations.is_empty() {
            return Ok(());
        }

        Err(AppError::Validation(
            violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        ))
    }
}

fn bounded(name: &str, bound: impl ToString) -> AppResult<ValidationRule> {
    ValidationRule::new(name, vec![bound.to_string()])
}

fn clamp_to_column(rule: ValidationRule, database_rules: &[ValidationRule]) -> ValidationRule {
    if !matches!(rule.name(), "min" | "max") {
        return rule;
    }

    let Some(limit) = database_rules
        .iter()
        .find(|limit| limit.name() == rule.name())
    else {
        return rule;
    };

    let (Some(requested), Some(bound)) = (rule.numeric_parameter(0), limit.numeric_parameter(0))
    else {
        return limit.clone();
    };

    let exceeds_column = match rule.name() {
        "max" => requested > bound,
        _ => requested < bound,
    };
    if exceeds_column {
        limit.clone()
    } else {
        rule
    }
}
