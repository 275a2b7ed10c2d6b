use std::fmt::{Display, Formatter};

use attrivo_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Visibility mode of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    /// Field is always shown.
    #[default]
    AlwaysVisible,
    /// Field is shown when the conditions hold.
    ShowWhen,
    /// Field is hidden when the conditions hold.
    HideWhen,
}

/// How condition results are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityLogic {
    /// Every condition must hold.
    #[default]
    All,
    /// At least one condition must hold.
    Any,
}

impl VisibilityLogic {
    /// Combines condition results; `All` is vacuously true, `Any` vacuously false.
    pub fn combine(self, results: impl IntoIterator<Item = bool>) -> bool {
        let mut results = results.into_iter();
        match self {
            Self::All => results.all(|result| result),
            Self::Any => results.any(|result| result),
        }
    }

    /// Returns the result of combining zero conditions.
    #[must_use]
    pub fn identity(self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns the JavaScript operator joining compiled conditions.
    #[must_use]
    pub fn client_joiner(self) -> &'static str {
        match self {
            Self::All => " && ",
            Self::Any => " || ",
        }
    }
}

/// Closed set of condition operators shared by server and client evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityOperator {
    /// Value equals expected (any element for lists).
    Equals,
    /// Negation of `Equals`.
    NotEquals,
    /// Case-insensitive substring, or list membership of expected.
    Contains,
    /// Negation of `Contains`.
    NotContains,
    /// Value is one of the expected values.
    In,
    /// Negation of `In`.
    NotIn,
    /// Value is null, blank or an empty list.
    Empty,
    /// Negation of `Empty`.
    NotEmpty,
    /// Numeric comparison, false when either side is not a number.
    GreaterThan,
    /// Numeric comparison, false when either side is not a number.
    LessThan,
}

/// One row of the operator table.
#[derive(Debug)]
pub struct OperatorDefinition {
    /// Operator described by this row.
    pub operator: VisibilityOperator,
    /// Whether the expected value takes part in evaluation.
    pub uses_expected_value: bool,
    /// Name of the client helper implementing the operator.
    pub client_helper: &'static str,
    /// JavaScript arrow function `(actual, expected) => boolean` for the helper.
    pub client_source: &'static str,
    predicate: fn(&Value, &Value) -> bool,
}

impl OperatorDefinition {
    /// Evaluates the operator on the server.
    #[must_use]
    pub fn matches(&self, actual: &Value, expected: &Value) -> bool {
        (self.predicate)(actual, expected)
    }
}

/// The operator table. Server predicates and client helpers are declared side by side.
pub static OPERATOR_TABLE: [OperatorDefinition; 10] = [
    OperatorDefinition {
        operator: VisibilityOperator::Equals,
        uses_expected_value: true,
        client_helper: "equals",
        client_source: "(actual, expected) => Array.isArray(actual) ? actual.some((item) => text(item) === text(expected)) : text(actual) === text(expected)",
        predicate: equals,
    },
    OperatorDefinition {
        operator: VisibilityOperator::NotEquals,
        uses_expected_value: true,
        client_helper: "notEquals",
        client_source: "(actual, expected) => !helpers.equals(actual, expected)",
        predicate: not_equals,
    },
    OperatorDefinition {
        operator: VisibilityOperator::Contains,
        uses_expected_value: true,
        client_helper: "contains",
        client_source: "(actual, expected) => Array.isArray(actual) ? actual.some((item) => text(item) === text(expected)) : text(actual).toLowerCase().includes(text(expected).toLowerCase())",
        predicate: contains,
    },
    OperatorDefinition {
        operator: VisibilityOperator::NotContains,
        uses_expected_value: true,
        client_helper: "notContains",
        client_source: "(actual, expected) => !helpers.contains(actual, expected)",
        predicate: not_contains,
    },
    OperatorDefinition {
        operator: VisibilityOperator::In,
        uses_expected_value: true,
        client_helper: "oneOf",
        client_source: "(actual, expected) => { const allowed = (Array.isArray(expected) ? expected : [expected]).map(text); return Array.isArray(actual) ? actual.some((item) => allowed.includes(text(item))) : allowed.includes(text(actual)); }",
        predicate: one_of,
    },
    OperatorDefinition {
        operator: VisibilityOperator::NotIn,
        uses_expected_value: true,
        client_helper: "noneOf",
        client_source: "(actual, expected) => !helpers.oneOf(actual, expected)",
        predicate: none_of,
    },
    OperatorDefinition {
        operator: VisibilityOperator::Empty,
        uses_expected_value: false,
        client_helper: "empty",
        client_source: "(actual) => actual === null || actual === undefined || (typeof actual === 'string' && actual.trim() === '') || (Array.isArray(actual) && actual.length === 0) || (typeof actual === 'object' && !Array.isArray(actual) && Object.keys(actual).length === 0)",
        predicate: empty,
    },
    OperatorDefinition {
        operator: VisibilityOperator::NotEmpty,
        uses_expected_value: false,
        client_helper: "notEmpty",
        client_source: "(actual) => !helpers.empty(actual)",
        predicate: not_empty,
    },
    OperatorDefinition {
        operator: VisibilityOperator::GreaterThan,
        uses_expected_value: true,
        client_helper: "greaterThan",
        client_source: "(actual, expected) => { const left = number(actual); const right = number(expected); return left !== null && right !== null && left > right; }",
        predicate: greater_than,
    },
    OperatorDefinition {
        operator: VisibilityOperator::LessThan,
        uses_expected_value: true,
        client_helper: "lessThan",
        client_source: "(actual, expected) => { const left = number(actual); const right = number(expected); return left !== null && right !== null && left < right; }",
        predicate: less_than,
    },
];

/// Shared client normalization used by every helper. Mirrors [`comparable_text`] and
/// [`comparable_number`].
pub const CLIENT_PRELUDE: &str = r#"const canonical = (value) => Array.isArray(value) ? '[' + value.map(canonical).join(',') + ']' : (value !== null && typeof value === 'object' ? '{' + Object.keys(value).sort().map((key) => JSON.stringify(key) + ':' + canonical(value[key])).join(',') + '}' : JSON.stringify(value));
const text = (value) => value === null || value === undefined ? '' : (typeof value === 'object' ? canonical(value) : String(value));
const number = (value) => { if (typeof value === 'number') { return Number.isFinite(value) ? value : null; } if (typeof value !== 'string' || !/^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$/.test(value.trim())) { return null; } const parsed = Number(value.trim()); return Number.isFinite(parsed) ? parsed : null; };"#;

impl VisibilityOperator {
    /// Returns the operator's table row.
    #[must_use]
    pub fn definition(self) -> &'static OperatorDefinition {
        let index = match self {
            Self::Equals => 0,
            Self::NotEquals => 1,
            Self::Contains => 2,
            Self::NotContains => 3,
            Self::In => 4,
            Self::NotIn => 5,
            Self::Empty => 6,
            Self::NotEmpty => 7,
            Self::GreaterThan => 8,
            Self::LessThan => 9,
        };
        &OPERATOR_TABLE[index]
    }

    /// Evaluates the operator on the server.
    #[must_use]
    pub fn matches(self, actual: &Value, expected: &Value) -> bool {
        self.definition().matches(actual, expected)
    }

    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Empty => "empty",
            Self::NotEmpty => "not_empty",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
        }
    }
}

impl Display for VisibilityOperator {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Renders a value the way both evaluators compare scalars.
///
/// Numbers follow JavaScript's `String(number)`. Lists and objects render as JSON
/// with object keys sorted by UTF-16 code units, matching the client `canonical`
/// helper.
#[must_use]
pub fn comparable_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number
            .as_f64()
            .map_or_else(|| number.to_string(), ecmascript_number_text),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => canonical_json(value),
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Number(_) => comparable_text(value),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(canonical_json).collect::<Vec<_>>().join(",")
        ),
        Value::Object(entries) => {
            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort_by(|left, right| left.encode_utf16().cmp(right.encode_utf16()));
            let members: Vec<String> = keys
                .into_iter()
                .filter_map(|key| {
                    entries.get(key).map(|item| {
                        format!("{}:{}", Value::String(key.clone()), canonical_json(item))
                    })
                })
                .collect();
            format!("{{{}}}", members.join(","))
        }
        Value::Null | Value::Bool(_) | Value::String(_) => value.to_string(),
    }
}

/// Formats a finite number like ECMAScript `Number::toString`: shortest round-trip
/// digits, exponent form below `1e-6` and from `1e21` on.
fn ecmascript_number_text(number: f64) -> String {
    if number == 0.0 {
        return "0".to_owned();
    }

    let scientific = format!("{:e}", number.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return number.to_string();
    };
    let Ok(exponent) = exponent.parse::<i64>() else {
        return number.to_string();
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let count = i64::try_from(digits.len()).unwrap_or(i64::MAX);
    let point = exponent + 1;
    let zeros = |amount: i64| "0".repeat(usize::try_from(amount).unwrap_or_default());

    let body = if count <= point && point <= 21 {
        format!("{digits}{}", zeros(point - count))
    } else if 0 < point && point <= 21 {
        let (whole, fraction) = digits.split_at(usize::try_from(point).unwrap_or_default());
        format!("{whole}.{fraction}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", zeros(-point))
    } else {
        let (lead, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() {
            String::new()
        } else {
            format!(".{rest}")
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{lead}{fraction}e{sign}{}", exponent.abs())
    };

    if number < 0.0 { format!("-{body}") } else { body }
}

/// Reads a value as a finite number; strings must be plain decimal literals.
#[must_use]
pub fn comparable_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            let is_literal = !trimmed.is_empty()
                && trimmed
                    .chars()
                    .all(|character| character.is_ascii_digit() || "+-.eE".contains(character))
                && trimmed.chars().any(|character| character.is_ascii_digit());
            is_literal
                .then(|| trimmed.parse::<f64>().ok())
                .flatten()
        }
        _ => None,
    };

    number.filter(|number| number.is_finite())
}

fn equals(actual: &Value, expected: &Value) -> bool {
    let expected = comparable_text(expected);
    match actual {
        Value::Array(items) => items.iter().any(|item| comparable_text(item) == expected),
        _ => comparable_text(actual) == expected,
    }
}

fn not_equals(actual: &Value, expected: &Value) -> bool {
    !equals(actual, expected)
}

fn contains(actual: &Value, expected: &Value) -> bool {
    let needle = comparable_text(expected);
    match actual {
        Value::Array(items) => items.iter().any(|item| comparable_text(item) == needle),
        _ => comparable_text(actual)
            .to_lowercase()
            .contains(needle.to_lowercase().as_str()),
    }
}

fn not_contains(actual: &Value, expected: &Value) -> bool {
    !contains(actual, expected)
}

fn one_of(actual: &Value, expected: &Value) -> bool {
    let allowed: Vec<String> = match expected {
        Value::Array(items) => items.iter().map(comparable_text).collect(),
        other => vec![comparable_text(other)],
    };

    match actual {
        Value::Array(items) => items
            .iter()
            .any(|item| allowed.contains(&comparable_text(item))),
        _ => allowed.contains(&comparable_text(actual)),
    }
}

fn none_of(actual: &Value, expected: &Value) -> bool {
    !one_of(actual, expected)
}

fn empty(actual: &Value, _expected: &Value) -> bool {
    match actual {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn not_empty(actual: &Value, expected: &Value) -> bool {
    !empty(actual, expected)
}

fn greater_than(actual: &Value, expected: &Value) -> bool {
    matches!(
        (comparable_number(actual), comparable_number(expected)),
        (Some(left), Some(right)) if left > right
    )
}

fn less_than(actual: &Value, expected: &Value) -> bool {
    matches!(
        (comparable_number(actual), comparable_number(expected)),
        (Some(left), Some(right)) if left < right
    )
}

/// Input shape of one visibility condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityConditionInput {
    /// Code of the field whose value is inspected.
    pub field_code: String,
    /// Comparison operator.
    pub operator: VisibilityOperator,
    /// Expected value.
    #[serde(default)]
    pub value: Value,
}

/// One visibility condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VisibilityConditionInput")]
pub struct VisibilityCondition {
    field_code: NonEmptyString,
    operator: VisibilityOperator,
    value: Value,
}

impl VisibilityCondition {
    /// Creates a validated condition.
    pub fn new(
        field_code: impl Into<String>,
        operator: VisibilityOperator,
        value: Value,
    ) -> AppResult<Self> {
        let field_code = NonEmptyString::new(field_code).map_err(|_| {
            AppError::Configuration("visibility condition requires a field_code".to_owned())
        })?;

        let shape_is_valid = match operator {
            VisibilityOperator::GreaterThan | VisibilityOperator::LessThan => {
                comparable_number(&value).is_some()
            }
            VisibilityOperator::In | VisibilityOperator::NotIn => {
                matches!(value, Value::Array(_) | Value::String(_) | Value::Number(_))
            }
            _ => true,
        };
        if !shape_is_valid {
            return Err(AppError::Configuration(format!(
                "visibility condition on '{}' has a value unusable with operator '{}'",
                field_code.as_str(),
                operator
            )));
        }

        let value = if operator.definition().uses_expected_value {
            value
        } else {
            Value::Null
        };

        Ok(Self {
            field_code,
            operator,
            value,
        })
    }

    /// Returns the referenced field code.
    #[must_use]
    pub fn field_code(&self) -> &str {
        self.field_code.as_str()
    }

    /// Returns the operator.
    #[must_use]
    pub fn operator(&self) -> VisibilityOperator {
        self.operator
    }

    /// Returns the expected value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Evaluates the condition against the referenced field's value.
    #[must_use]
    pub fn matches(&self, actual: &Value) -> bool {
        self.operator.matches(actual, &self.value)
    }
}

impl TryFrom<VisibilityConditionInput> for VisibilityCondition {
    type Error = AppError;

    fn try_from(input: VisibilityConditionInput) -> Result<Self, Self::Error> {
        Self::new(input.field_code, input.operator, input.value)
    }
}

/// Input shape of a visibility rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibilityRuleInput {
    /// Visibility mode.
    #[serde(default)]
    pub mode: VisibilityMode,
    /// Condition combination.
    #[serde(default)]
    pub logic: VisibilityLogic,
    /// Conditions.
    #[serde(default)]
    pub conditions: Vec<VisibilityCondition>,
    /// Keep submitting the value while hidden.
    #[serde(default)]
    pub always_save: bool,
}

/// Conditional show/hide rule attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VisibilityRuleInput")]
pub struct VisibilityRule {
    mode: VisibilityMode,
    logic: VisibilityLogic,
    conditions: Vec<VisibilityCondition>,
    always_save: bool,
}

impl VisibilityRule {
    /// Creates a validated rule. Conditional modes need at least one condition.
    pub fn new(input: VisibilityRuleInput) -> AppResult<Self> {
        let VisibilityRuleInput {
            mode,
            logic,
            conditions,
            always_save,
        } = input;

        if mode != VisibilityMode::AlwaysVisible && conditions.is_empty() {
            return Err(AppError::Configuration(
                "show_when and hide_when visibility rules require at least one condition"
                    .to_owned(),
            ));
        }

        Ok(Self {
            mode,
            logic,
            conditions,
            always_save,
        })
    }

    /// Returns a rule that always shows the field.
    #[must_use]
    pub fn always_visible() -> Self {
        Self::default()
    }

    /// Returns the mode.
    #[must_use]
    pub fn mode(&self) -> VisibilityMode {
        self.mode
    }

    /// Returns the condition combination.
    #[must_use]
    pub fn logic(&self) -> VisibilityLogic {
        self.logic
    }

    /// Returns the conditions.
    #[must_use]
    pub fn conditions(&self) -> &[VisibilityCondition] {
        &self.conditions
    }

    /// Returns whether hidden values are still submitted.
    #[must_use]
    pub fn always_save(&self) -> bool {
        self.always_save
    }

    /// Returns whether the rule depends on other fields.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.mode != VisibilityMode::AlwaysVisible
    }
}

impl TryFrom<VisibilityRuleInput> for VisibilityRule {
    type Error = AppError;

    fn try_from(input: VisibilityRuleInput) -> Result<Self, Self::Error> {
        Self::new(input)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{Value, json};

    use super::{
        OPERATOR_TABLE, VisibilityCondition, VisibilityLogic, VisibilityMode, VisibilityOperator,
        VisibilityRule, VisibilityRuleInput, comparable_number, comparable_text,
    };

    #[test]
    fn operator_table_rows_line_up_with_operators() {
        for row in &OPERATOR_TABLE {
            assert_eq!(row.operator.definition().operator, row.operator);
        }
    }

    #[test]
    fn vacuous_combination_follows_logic() {
        assert!(VisibilityLogic::All.combine(std::iter::empty()));
        assert!(!VisibilityLogic::Any.combine(std::iter::empty()));
        assert!(VisibilityLogic::All.identity());
        assert!(!VisibilityLogic::Any.identity());
    }

    #[test]
    fn equals_compares_numbers_and_strings_alike() {
        assert!(VisibilityOperator::Equals.matches(&json!(3), &json!("3")));
        assert!(VisibilityOperator::Equals.matches(&json!(3.0), &json!(3)));
        assert!(VisibilityOperator::Equals.matches(&json!(true), &json!("true")));
        assert!(!VisibilityOperator::Equals.matches(&json!("basic"), &json!("premium")));
    }

    #[test]
    fn equals_on_lists_checks_membership() {
        assert!(VisibilityOperator::Equals.matches(&json!([1, 2]), &json!(2)));
        assert!(VisibilityOperator::NotEquals.matches(&json!([1, 2]), &json!(5)));
    }

    #[test]
    fn contains_is_case_insensitive_for_text() {
        assert!(VisibilityOperator::Contains.matches(&json!("Enterprise Plan"), &json!("plan")));
        assert!(VisibilityOperator::NotContains.matches(&json!("Starter"), &json!("plan")));
    }

    #[test]
    fn in_accepts_lists_and_scalars() {
        assert!(VisibilityOperator::In.matches(&json!("b"), &json!(["a", "b"])));
        assert!(VisibilityOperator::In.matches(&json!(["x", "a"]), &json!(["a"])));
        assert!(VisibilityOperator::NotIn.matches(&json!("c"), &json!(["a", "b"])));
    }

    #[test]
    fn empty_covers_blank_values() {
        for value in [json!(null), json!("  "), json!([]), json!({})] {
            assert!(VisibilityOperator::Empty.matches(&value, &Value::Null));
        }
        assert!(VisibilityOperator::NotEmpty.matches(&json!(false), &Value::Null));
        assert!(VisibilityOperator::NotEmpty.matches(&json!(0), &Value::Null));
    }

    #[test]
    fn comparisons_require_numbers_on_both_sides() {
        assert!(VisibilityOperator::GreaterThan.matches(&json!("10"), &json!(9)));
        assert!(VisibilityOperator::LessThan.matches(&json!(1.5), &json!("2")));
        assert!(!VisibilityOperator::GreaterThan.matches(&json!("ten"), &json!(9)));
        assert!(!VisibilityOperator::LessThan.matches(&json!(null), &json!(9)));
    }

    #[test]
    fn comparable_number_rejects_non_literals() {
        assert_eq!(comparable_number(&json!("inf")), None);
        assert_eq!(comparable_number(&json!("0x10")), None);
        assert_eq!(comparable_number(&json!(" -2.5 ")), Some(-2.5));
    }

    #[test]
    fn comparable_text_renders_integral_floats_without_fraction() {
        assert_eq!(comparable_text(&json!(2.0)), "2");
        assert_eq!(comparable_text(&json!(2.25)), "2.25");
        assert_eq!(comparable_text(&json!(null)), "");
    }

    #[test]
    fn comparable_text_formats_numbers_like_javascript() {
        let cases = [
            (json!(1e-7), "1e-7"),
            (json!(1.5e-10), "1.5e-10"),
            (json!(0.000001), "0.000001"),
            (json!(0.1 + 0.2), "0.30000000000000004"),
            (json!(-0.0), "0"),
            (json!(-123.456), "-123.456"),
            (json!(1e20), "100000000000000000000"),
            (json!(1e21), "1e+21"),
            (json!(1.2345678901234568e20), "123456789012345680000"),
            (json!(f64::MAX), "1.7976931348623157e+308"),
            (json!(5e-324), "5e-324"),
            (json!(9_007_199_254_740_993_u64), "9007199254740992"),
            (json!(-42), "-42"),
        ];
        for (value, expected) in cases {
            assert_eq!(comparable_text(&value), expected, "{value}");
        }
    }

    #[test]
    fn comparable_text_sorts_object_keys() {
        assert_eq!(
            comparable_text(&json!({"b": 1.0, "a": [1e21, "x\"y", null], "c": {"z": true, "y": {}}})),
            r#"{"a":[1e+21,"x\"y",null],"b":1,"c":{"y":{},"z":true}}"#
        );
        assert_eq!(
            comparable_text(&json!({"\u{10000}": 1, "\u{ff61}": 2})),
            "{\"\u{10000}\":1,\"\u{ff61}\":2}"
        );
    }

    #[test]
    fn equals_agrees_with_client_number_rendering() {
        assert!(VisibilityOperator::Equals.matches(&json!(1e-7), &json!("1e-7")));
        assert!(!VisibilityOperator::Equals.matches(&json!(1e-7), &json!("0.0000001")));
        assert!(VisibilityOperator::Equals.matches(&json!(1e21), &json!("1e+21")));
        assert!(VisibilityOperator::Equals.matches(
            &json!({"b": 2, "a": 1}),
            &serde_json::from_str::<Value>(r#"{"a":1,"b":2}"#).unwrap_or_else(|_| unreachable!())
        ));
    }

    #[test]
    fn conditional_modes_require_conditions() {
        let result = VisibilityRule::new(VisibilityRuleInput {
            mode: VisibilityMode::ShowWhen,
            ..VisibilityRuleInput::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn comparison_conditions_require_numeric_value() {
        let result =
            VisibilityCondition::new("budget", VisibilityOperator::GreaterThan, json!("lots"));
        assert!(result.is_err());
    }

    #[test]
    fn deserialization_validates_rule_shape() {
        let parsed: Result<VisibilityRule, _> = serde_json::from_value(json!({
            "mode": "hide_when",
            "logic": "any",
            "conditions": [],
            "always_save": false
        }));
        assert!(parsed.is_err());

        let parsed: Result<VisibilityRule, _> = serde_json::from_value(json!({
            "mode": "show_when",
            "logic": "all",
            "conditions": [{"field_code": "type", "operator": "equals", "value": "premium"}],
            "always_save": true
        }));
        let rule = parsed.unwrap_or_else(|_| unreachable!());
        assert!(rule.always_save());
        assert_eq!(rule.conditions()[0].field_code(), "type");
    }

    proptest! {
        #[test]
        fn negated_operators_are_complements(actual in "[a-c0-9 ]{0,4}", expected in "[a-c0-9]{0,3}") {
            let actual = json!(actual);
            let expected = json!(expected);
            prop_assert_ne!(
                VisibilityOperator::Equals.matches(&actual, &expected),
                VisibilityOperator::NotEquals.matches(&actual, &expected)
            );
            prop_assert_ne!(
                VisibilityOperator::Contains.matches(&actual, &expected),
                VisibilityOperator::NotContains.matches(&actual, &expected)
            );
            prop_assert_ne!(
                VisibilityOperator::Empty.matches(&actual, &expected),
                VisibilityOperator::NotEmpty.matches(&actual, &expected)
            );
        }
    }
}
