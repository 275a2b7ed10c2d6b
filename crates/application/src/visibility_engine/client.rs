use std::collections::BTreeSet;

use attrivo_domain::{
    CLIENT_PRELUDE, FieldDefinition, OPERATOR_TABLE, VisibilityCondition, VisibilityLogic,
    VisibilityMode, VisibilityRule,
};

use super::VisibilityRuleEngine;

/// Global object the runtime script installs its helpers on.
pub const CLIENT_NAMESPACE: &str = "attrivoVisibility";

/// Resolves a field code to a JavaScript expression reading the field's live value.
pub trait ClientAccessorResolver {
    /// Returns the accessor, or `None` when the field is not on the client.
    fn accessor(&self, field_code: &str) -> Option<String>;
}

impl<F> ClientAccessorResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn accessor(&self, field_code: &str) -> Option<String> {
        self(field_code)
    }
}

/// Reads known fields through `$get("<prefix><code>")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormStateAccessors {
    prefix: String,
    field_codes: BTreeSet<String>,
}

impl FormStateAccessors {
    /// Creates accessors for the fields rendered on a form.
    #[must_use]
    pub fn new(prefix: impl Into<String>, fields: &[FieldDefinition]) -> Self {
        Self {
            prefix: prefix.into(),
            field_codes: fields
                .iter()
                .map(|field| field.code().to_owned())
                .collect(),
        }
    }
}

impl ClientAccessorResolver for FormStateAccessors {
    fn accessor(&self, field_code: &str) -> Option<String> {
        if !self.field_codes.contains(field_code) {
            return None;
        }

        let path = format!("{}{field_code}", self.prefix);
        Some(format!("$get({})", serde_json::Value::String(path)))
    }
}

impl VisibilityRuleEngine {
    /// Compiles a rule into a JavaScript boolean expression.
    ///
    /// Conditions whose field has no accessor are dropped. When dropping one could
    /// hide the field, the whole expression becomes `true` instead.
    #[must_use]
    pub fn compile_client_expression(
        &self,
        rule: &VisibilityRule,
        accessors: &impl ClientAccessorResolver,
    ) -> String {
        if !rule.is_conditional() {
            return "true".to_owned();
        }

        let compiled: Vec<Option<String>> = rule
            .conditions()
            .iter()
            .map(|condition| compile_condition(condition, accessors))
            .collect();

        let has_unresolved = compiled.iter().any(Option::is_none);
        let unresolved_could_hide = matches!(
            (rule.mode(), rule.logic()),
            (VisibilityMode::ShowWhen, VisibilityLogic::Any)
                | (VisibilityMode::HideWhen, VisibilityLogic::All)
        );
        if has_unresolved && unresolved_could_hide {
            return "true".to_owned();
        }

        let resolved: Vec<String> = compiled.into_iter().flatten().collect();
        let combined = if resolved.is_empty() {
            rule.logic().identity().to_string()
        } else {
            resolved.join(rule.logic().client_joiner())
        };

        match rule.mode() {
            VisibilityMode::HideWhen => format!("!({combined})"),
            _ => format!("({combined})"),
        }
    }

    /// Returns the script installing one helper per operator on
    /// `globalThis.attrivoVisibility`.
    #[must_use]
    pub fn client_runtime_script(&self) -> String {
        let mut lines = vec![
            "(function (root) {".to_owned(),
            "'use strict';".to_owned(),
            CLIENT_PRELUDE.to_owned(),
            "const helpers = {};".to_owned(),
        ];
        lines.extend(
            OPERATOR_TABLE
                .iter()
                .map(|row| format!("helpers.{} = {};", row.client_helper, row.client_source)),
        );
        lines.push(format!("root.{CLIENT_NAMESPACE} = helpers;"));
        lines.push("})(typeof globalThis !== 'undefined' ? globalThis : window);".to_owned());

        lines.join("\n")
    }
}

fn compile_condition(
    condition: &VisibilityCondition,
    accessors: &impl ClientAccessorResolver,
) -> Option<String> {
    let accessor = accessors.accessor(condition.field_code())?;
    let definition = condition.operator().definition();

    if definition.uses_expected_value {
        Some(format!(
            "{CLIENT_NAMESPACE}.{}({accessor}, {})",
            definition.client_helper,
            condition.value()
        ))
    } else {
        Some(format!(
            "{CLIENT_NAMESPACE}.{}({accessor})",
            definition.client_helper
        ))
    }
}
