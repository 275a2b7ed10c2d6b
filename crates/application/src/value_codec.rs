use attrivo_domain::{ColumnValue, DataType, FieldDefinition, comparable_text};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};

const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d-%m-%Y"];
const DATE_TIME_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Returns whether a value counts as absent: null, blank text or an empty list.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => false,
    }
}

/// Returns the value reported for a field without a stored row.
#[must_use]
pub fn empty_value(data_type: DataType) -> Value {
    if data_type.is_multi_valued() {
        Value::Array(Vec::new())
    } else {
        Value::Null
    }
}

/// Converts an incoming value into the field's storage column.
///
/// Returns `None` when the value is blank or cannot be represented; callers treat
/// that as clearing the stored value.
#[must_use]
pub fn encode_value(
    field: &FieldDefinition,
    accepts_arbitrary_values: bool,
    value: &Value,
) -> Option<ColumnValue> {
    if is_blank(value) {
        return None;
    }

    match field.data_type() {
        DataType::String => scalar_text(value).map(ColumnValue::String),
        DataType::Text => scalar_text(value).map(ColumnValue::Text),
        DataType::Numeric => whole_number_input(value).map(ColumnValue::Integer),
        DataType::Float => number_input(value).map(ColumnValue::Float),
        DataType::Boolean => parse_boolean_input(value).map(ColumnValue::Boolean),
        DataType::Date => date_input(value).map(ColumnValue::Date),
        DataType::DateTime => date_time_input(value).map(ColumnValue::DateTime),
        DataType::SingleChoice => resolve_option(field, value).map(ColumnValue::Integer),
        DataType::MultiChoice => {
            multi_choice_input(field, accepts_arbitrary_values, value).map(ColumnValue::Json)
        }
    }
}

/// Converts a stored column back into its JSON form.
#[must_use]
pub fn decode_value(value: ColumnValue) -> Value {
    match value {
        ColumnValue::String(text) | ColumnValue::Text(text) => Value::String(text),
        ColumnValue::Integer(number) => Value::from(number),
        ColumnValue::Float(number) => Number::from_f64(number).map_or(Value::Null, Value::Number),
        ColumnValue::Boolean(flag) => Value::Bool(flag),
        ColumnValue::Date(date) => Value::String(date.format(DATE_OUTPUT_FORMAT).to_string()),
        ColumnValue::DateTime(date_time) => {
            Value::String(date_time.format(DATE_TIME_OUTPUT_FORMAT).to_string())
        }
        ColumnValue::Json(items) => items,
    }
}

/// Returns the value as it would read back after being stored.
#[must_use]
pub fn normalize_value(
    field: &FieldDefinition,
    accepts_arbitrary_values: bool,
    value: &Value,
) -> Value {
    encode_value(field, accepts_arbitrary_values, value)
        .map_or_else(|| empty_value(field.data_type()), decode_value)
}

/// Parses a number out of text carrying currency symbols or grouping separators.
///
/// Plain literals, exponent notation included, are parsed as-is. Text with any
/// remaining letter is not a number.
#[must_use]
pub fn parse_number_input(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if let Ok(parsed) = trimmed.parse::<f64>() {
        return parsed.is_finite().then_some(parsed);
    }
    if trimmed.chars().any(char::is_alphabetic) {
        return None;
    }

    let first_digit = trimmed.find(|character: char| character.is_ascii_digit())?;
    let negative = trimmed.find('-').is_some_and(|index| index < first_digit)
        || (trimmed.starts_with('(') && trimmed.ends_with(')'));

    let literal: String = trimmed
        .chars()
        .filter(|character| character.is_ascii_digit() || *character == '.')
        .collect();
    if literal.matches('.').count() > 1 {
        return None;
    }

    let parsed = literal.parse::<f64>().ok()?;
    let parsed = if negative { -parsed } else { parsed };
    parsed.is_finite().then_some(parsed)
}

/// Parses a calendar date in one of the accepted input formats.
#[must_use]
pub fn parse_date_input(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| parse_date_time_input(trimmed).map(|date_time| date_time.date()))
}

/// Parses a date and time in one of the accepted input formats. Offsets are
/// converted to UTC.
#[must_use]
pub fn parse_date_time_input(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    DATE_TIME_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|date_time| date_time.naive_utc())
        })
}

/// Parses a boolean from flags, `0`/`1` and common words.
#[must_use]
pub fn parse_boolean_input(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "y" => Some(true),
            "0" | "false" | "no" | "off" | "n" => Some(false),
            _ => None,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Resolves one option reference given as id or name.
#[must_use]
pub fn resolve_option(field: &FieldDefinition, value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .filter(|id| field.option(*id).is_some()),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| field.option(*id).is_some())
            .or_else(|| field.option_id_for_name(text)),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Splits multi-choice input into its entries. Text is split on commas.
#[must_use]
pub fn multi_choice_entries(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| Value::String(entry.to_owned()))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(_) | Value::Bool(_) => Some(comparable_text(value)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn number_input(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|number| number.is_finite()),
        Value::String(text) => parse_number_input(text),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn whole_number_input(value: &Value) -> Option<i64> {
    if let Value::Number(number) = value
        && let Some(whole) = number.as_i64()
    {
        return Some(whole);
    }

    let number = number_input(value)?.trunc();
    // i64::MAX is not representable as f64; the bound below is 2^63.
    (number >= -9_223_372_036_854_775_808.0 && number < 9_223_372_036_854_775_808.0)
        .then_some(number as i64)
}

fn date_input(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(parse_date_input)
}

fn date_time_input(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?;
    parse_date_time_input(text).or_else(|| {
        parse_date_input(text).and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

fn multi_choice_input(
    field: &FieldDefinition,
    accepts_arbitrary_values: bool,
    value: &Value,
) -> Option<Value> {
    let stored: Vec<Value> = multi_choice_entries(value)
        .iter()
        .filter_map(|entry| {
            let option = resolve_option(field, entry).map(Value::from);
            if accepts_arbitrary_values {
                option.or_else(|| free_form_entry(entry))
            } else {
                option
            }
        })
        .collect();

    (!stored.is_empty()).then_some(Value::Array(stored))
}

fn free_form_entry(entry: &Value) -> Option<Value> {
    let text = scalar_text(entry)?;
    let text = text.trim();
    (!text.is_empty()).then(|| Value::String(text.to_owned()))
}
