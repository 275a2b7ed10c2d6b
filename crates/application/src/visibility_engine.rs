use std::collections::HashSet;

use attrivo_domain::{FieldDefinition, VisibilityMode, VisibilityRule};
use serde_json::{Map, Value};

mod client;
mod tracker;

pub use client::{CLIENT_NAMESPACE, ClientAccessorResolver, FormStateAccessors};
pub use tracker::{VisibilityState, VisibilityTracker, VisibilityTransition};

/// Evaluates visibility rules on the server and compiles them for the browser.
///
/// Both sides use the operator table from the domain crate, so a rule gives the
/// same answer wherever it runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityRuleEngine;

impl VisibilityRuleEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns whether a field with this rule is shown for the given values.
    /// Missing values read as `null`.
    #[must_use]
    pub fn evaluate(&self, rule: &VisibilityRule, values: &Map<String, Value>) -> bool {
        let conditions_hold = || {
            rule.logic().combine(rule.conditions().iter().map(|condition| {
                condition.matches(values.get(condition.field_code()).unwrap_or(&Value::Null))
            }))
        };

        match rule.mode() {
            VisibilityMode::AlwaysVisible => true,
            VisibilityMode::ShowWhen => conditions_hold(),
            VisibilityMode::HideWhen => !conditions_hold(),
        }
    }

    /// Returns whether a field is shown for the given values.
    #[must_use]
    pub fn is_visible(&self, field: &FieldDefinition, values: &Map<String, Value>) -> bool {
        self.evaluate(field.visibility(), values)
    }

    /// Returns the distinct field codes a rule reads, in first-seen order.
    #[must_use]
    pub fn dependent_fields(&self, rule: &VisibilityRule) -> Vec<String> {
        if !rule.is_conditional() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        rule.conditions()
            .iter()
            .map(|condition| condition.field_code())
            .filter(|code| seen.insert(*code))
            .map(str::to_owned)
            .collect()
    }

    /// Drops submitted values of hidden fields unless their rule asks to keep them.
    /// Values of unknown codes pass through.
    #[must_use]
    pub fn dehydrate(
        &self,
        fields: &[FieldDefinition],
        submitted: &Map<String, Value>,
    ) -> Map<String, Value> {
        let hidden: HashSet<&str> = fields
            .iter()
            .filter(|field| !field.visibility().always_save() && !self.is_visible(field, submitted))
            .map(FieldDefinition::code)
            .collect();

        submitted
            .iter()
            .filter(|(code, _)| !hidden.contains(code.as_str()))
            .map(|(code, value)| (code.clone(), value.clone()))
            .collect()
    }

    /// Starts tracking visibility of the fields from their initial values.
    #[must_use]
    pub fn tracker(
        &self,
        fields: &[FieldDefinition],
        initial_values: Map<String, Value>,
    ) -> VisibilityTracker {
        VisibilityTracker::new(*self, fields, initial_values)
    }
}
