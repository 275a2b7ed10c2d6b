use std::collections::HashSet;

use attrivo_domain::{ValidationRule, comparable_number, comparable_text};
use serde_json::Value;
use tracing::warn;
use url::Url;

use super::RuleViolation;
use crate::value_codec::{is_blank, parse_boolean_input, parse_date_input};

pub(super) fn evaluate_rules(
    field_code: &str,
    rules: &[ValidationRule],
    value: &Value,
) -> Vec<RuleViolation> {
    if is_blank(value) {
        return rules
            .iter()
            .filter(|rule| rule.name() == "required")
            .map(|rule| RuleViolation {
                rule: rule.to_rule_string(),
                message: format!("{field_code} is required"),
            })
            .collect();
    }

    let numeric = rules
        .iter()
        .any(|rule| matches!(rule.name(), "numeric" | "integer"));

    rules
        .iter()
        .filter_map(|rule| {
            check_rule(rule, value, numeric).map(|message| RuleViolation {
                rule: rule.to_rule_string(),
                message: format!("{field_code} {message}"),
            })
        })
        .collect()
}

fn check_rule(rule: &ValidationRule, value: &Value, numeric: bool) -> Option<String> {
    let parameters = rule.parameters();

    match rule.name() {
        "required" | "nullable" => None,
        "string" => (!value.is_string()).then(|| "must be text".to_owned()),
        "numeric" => comparable_number(value)
            .is_none()
            .then(|| "must be a number".to_owned()),
        "integer" => (!is_integer(value)).then(|| "must be a whole number".to_owned()),
        "boolean" => parse_boolean_input(value)
            .is_none()
            .then(|| "must be true or false".to_owned()),
        "date" => value
            .as_str()
            .and_then(parse_date_input)
            .is_none()
            .then(|| "must be a date".to_owned()),
        "array" => (!value.is_array()).then(|| "must be a list".to_owned()),
        "min" => {
            let (size, unit) = measure(value, numeric)?;
            let min = rule.numeric_parameter(0)?;
            (size < min).then(|| format!("must be at least {}{unit}", parameters[0]))
        }
        "max" => {
            let (size, unit) = measure(value, numeric)?;
            let max = rule.numeric_parameter(0)?;
            (size > max).then(|| format!("must not be greater than {}{unit}", parameters[0]))
        }
        "between" => {
            let (size, unit) = measure(value, numeric)?;
            let (min, max) = (rule.numeric_parameter(0)?, rule.numeric_parameter(1)?);
            (size < min || size > max).then(|| {
                format!(
                    "must be between {} and {}{unit}",
                    parameters[0], parameters[1]
                )
            })
        }
        "size" => {
            let (size, unit) = measure(value, numeric)?;
            let expected = rule.numeric_parameter(0)?;
            (size != expected).then(|| format!("must be exactly {}{unit}", parameters[0]))
        }
        "in" => (!entries(value)
            .iter()
            .all(|entry| parameters.contains(entry)))
        .then(|| "has an invalid selection".to_owned()),
        "not_in" => entries(value)
            .iter()
            .any(|entry| parameters.contains(entry))
            .then(|| "has a forbidden selection".to_owned()),
        "email" => (!value.as_str().is_some_and(is_email))
            .then(|| "must be a valid email address".to_owned()),
        "url" => (!value.as_str().is_some_and(is_url)).then(|| "must be a valid URL".to_owned()),
        "starts_with" => (!value.as_str().is_some_and(|text| {
            parameters
                .iter()
                .any(|prefix| text.starts_with(prefix.as_str()))
        }))
        .then(|| format!("must start with one of: {}", parameters.join(", "))),
        "ends_with" => (!value.as_str().is_some_and(|text| {
            parameters
                .iter()
                .any(|suffix| text.ends_with(suffix.as_str()))
        }))
        .then(|| format!("must end with one of: {}", parameters.join(", "))),
        "distinct" => {
            let items = value.as_array()?;
            let mut seen = HashSet::new();
            (!items.iter().all(|item| seen.insert(comparable_text(item))))
                .then(|| "has duplicate entries".to_owned())
        }
        unknown => {
            warn!(rule = %unknown, "skipping unsupported validation rule");
            None
        }
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(number) => {
            number.is_i64()
                || number.is_u64()
                || number.as_f64().is_some_and(|float| float.fract() == 0.0)
        }
        Value::String(text) => text.trim().parse::<i64>().is_ok(),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => false,
    }
}

fn measure(value: &Value, numeric: bool) -> Option<(f64, &'static str)> {
    match value {
        Value::Array(items) => Some((items.len() as f64, " items")),
        Value::Number(_) => comparable_number(value).map(|number| (number, "")),
        Value::String(text) => {
            if numeric && let Some(number) = comparable_number(value) {
                return Some((number, ""));
            }
            Some((text.chars().count() as f64, " characters"))
        }
        Value::Null | Value::Bool(_) | Value::Object(_) => None,
    }
}

fn entries(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(comparable_text).collect(),
        other => vec![comparable_text(other)],
    }
}

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !text.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, suffix)| !host.is_empty() && !suffix.is_empty())
        && !domain.ends_with('.')
}

fn is_url(text: &str) -> bool {
    Url::parse(text).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(is_dns_host)
    })
}

fn is_dns_host(host: &str) -> bool {
    host.starts_with('[') || host.split('.').all(|label| !label.is_empty())
}
