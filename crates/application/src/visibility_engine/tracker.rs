use std::collections::{BTreeMap, BTreeSet};

use attrivo_domain::{FieldDefinition, VisibilityRule};
use serde_json::{Map, Value};

use super::VisibilityRuleEngine;

/// Visibility of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityState {
    /// Rendered and submitted.
    Visible,
    /// Not rendered; submitted only when the rule keeps hidden values.
    Hidden,
}

impl From<bool> for VisibilityState {
    fn from(visible: bool) -> Self {
        if visible { Self::Visible } else { Self::Hidden }
    }
}

/// A state change reported by [`VisibilityTracker::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityTransition {
    /// Field whose visibility changed.
    pub field_code: String,
    /// Previous state.
    pub from: VisibilityState,
    /// New state.
    pub to: VisibilityState,
}

/// Tracks the visibility of a form's fields while values change.
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    engine: VisibilityRuleEngine,
    rules: BTreeMap<String, VisibilityRule>,
    dependents: BTreeMap<String, BTreeSet<String>>,
    values: Map<String, Value>,
    states: BTreeMap<String, VisibilityState>,
}

impl VisibilityTracker {
    pub(super) fn new(
        engine: VisibilityRuleEngine,
        fields: &[FieldDefinition],
        values: Map<String, Value>,
    ) -> Self {
        let mut rules = BTreeMap::new();
        let mut dependents: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut states = BTreeMap::new();

        for field in fields {
            let rule = field.visibility().clone();
            for dependency in engine.dependent_fields(&rule) {
                dependents
                    .entry(dependency)
                    .or_default()
                    .insert(field.code().to_owned());
            }
            states.insert(
                field.code().to_owned(),
                VisibilityState::from(engine.evaluate(&rule, &values)),
            );
            rules.insert(field.code().to_owned(), rule);
        }

        Self {
            engine,
            rules,
            dependents,
            values,
            states,
        }
    }

    /// Returns the current state of a tracked field.
    #[must_use]
    pub fn state(&self, field_code: &str) -> Option<VisibilityState> {
        self.states.get(field_code).copied()
    }

    /// Returns whether other fields depend on this field's value.
    #[must_use]
    pub fn is_reactive(&self, field_code: &str) -> bool {
        self.dependents.contains_key(field_code)
    }

    /// Returns the current values.
    #[must_use]
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Records a new value and returns the transitions it caused, ordered by field code.
    pub fn update(&mut self, field_code: &str, value: Value) -> Vec<VisibilityTransition> {
        self.values.insert(field_code.to_owned(), value);

        let Some(dependents) = self.dependents.get(field_code) else {
            return Vec::new();
        };

        let mut transitions = Vec::new();
        for dependent in dependents {
            let Some(rule) = self.rules.get(dependent) else {
                continue;
            };

            let next = VisibilityState::from(self.engine.evaluate(rule, &self.values));
            let Some(current) = self.states.get_mut(dependent) else {
                continue;
            };
            if *current != next {
                transitions.push(VisibilityTransition {
                    field_code: dependent.clone(),
                    from: *current,
                    to: next,
                });
                *current = next;
            }
        }

        transitions
    }
}
