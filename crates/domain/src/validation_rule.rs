use std::fmt::{Display, Formatter};
use std::str::FromStr;

use attrivo_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// One named validation rule with positional parameters.
///
/// Renders as `name` or `name:p1,p2` in validator-string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    name: NonEmptyString,
    #[serde(default)]
    parameters: Vec<String>,
}

impl ValidationRule {
    /// Creates a validated rule.
    pub fn new(name: impl Into<String>, parameters: Vec<String>) -> AppResult<Self> {
        let name = name.into().trim().to_owned();
        if name.contains([':', ',']) {
            return Err(AppError::Validation(format!(
                "validation rule name '{name}' must not contain ':' or ','"
            )));
        }

        Ok(Self {
            name: NonEmptyString::new(name)?,
            parameters: parameters
                .into_iter()
                .map(|parameter| parameter.trim().to_owned())
                .collect(),
        })
    }

    /// Creates a rule without parameters.
    pub fn named(name: impl Into<String>) -> AppResult<Self> {
        Self::new(name, Vec::new())
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the positional parameters.
    #[must_use]
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Returns a copy of this rule with replaced parameters.
    #[must_use]
    pub fn with_parameters(&self, parameters: Vec<String>) -> Self {
        Self {
            name: self.name.clone(),
            parameters,
        }
    }

    /// Returns the parameter at `index` parsed as a finite number.
    #[must_use]
    pub fn numeric_parameter(&self, index: usize) -> Option<f64> {
        self.parameters
            .get(index)
            .and_then(|parameter| parameter.parse::<f64>().ok())
            .filter(|number| number.is_finite())
    }

    /// Returns how many leading parameters must be numeric for this rule.
    #[must_use]
    pub fn numeric_arity(&self) -> usize {
        match self.name() {
            "min" | "max" | "size" => 1,
            "between" => 2,
            _ => 0,
        }
    }

    /// Returns whether every bound parameter is a finite number.
    #[must_use]
    pub fn has_numeric_bounds(&self) -> bool {
        (0..self.numeric_arity()).all(|index| self.numeric_parameter(index).is_some())
    }

    /// Renders the validator-string form.
    #[must_use]
    pub fn to_rule_string(&self) -> String {
        if self.parameters.is_empty() {
            return self.name.as_str().to_owned();
        }

        format!("{}:{}", self.name.as_str(), self.parameters.join(","))
    }
}

impl Display for ValidationRule {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.to_rule_string().as_str())
    }
}

impl FromStr for ValidationRule {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some((name, parameters)) => Self::new(
                name,
                parameters
                    .split(',')
                    .map(str::to_owned)
                    .filter(|parameter| !parameter.trim().is_empty())
                    .collect(),
            ),
            None => Self::named(value),
        }
    }
}
