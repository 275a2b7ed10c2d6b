use std::fmt::{Display, Formatter};
use std::str::FromStr;

use attrivo_core::AppError;
use serde::{Deserialize, Serialize};

/// Semantic data type of a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Short single-line string.
    String,
    /// Long free-form text.
    Text,
    /// Whole number.
    Numeric,
    /// Floating point number.
    Float,
    /// True/false flag.
    Boolean,
    /// Calendar date without time zone.
    Date,
    /// Date and time without time zone.
    DateTime,
    /// One option id out of the field's options.
    SingleChoice,
    /// Zero or more option ids (or raw strings for free-form types).
    MultiChoice,
}

impl DataType {
    /// Every data type, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::String,
        Self::Text,
        Self::Numeric,
        Self::Float,
        Self::Boolean,
        Self::Date,
        Self::DateTime,
        Self::SingleChoice,
        Self::MultiChoice,
    ];

    /// Returns a stable storage value for the data type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::SingleChoice => "single_choice",
            Self::MultiChoice => "multi_choice",
        }
    }

    /// Returns the physical column that stores values of this type.
    #[must_use]
    pub fn storage_column(self) -> StorageColumn {
        match self {
            Self::String => StorageColumn::String,
            Self::Text => StorageColumn::Text,
            Self::Numeric | Self::SingleChoice => StorageColumn::Integer,
            Self::Float => StorageColumn::Float,
            Self::Boolean => StorageColumn::Boolean,
            Self::Date => StorageColumn::Date,
            Self::DateTime => StorageColumn::DateTime,
            Self::MultiChoice => StorageColumn::Json,
        }
    }

    /// Returns whether values are picked from field options.
    #[must_use]
    pub fn is_choice(self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultiChoice)
    }

    /// Returns whether values may hold several entries.
    #[must_use]
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Self::MultiChoice)
    }

    /// Returns whether values are compared as numbers.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Numeric | Self::Float)
    }
}

impl Display for DataType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "string" => Ok(Self::String),
            "text" => Ok(Self::Text),
            "numeric" => Ok(Self::Numeric),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "date" => Ok(Self::Date),
            "date_time" => Ok(Self::DateTime),
            "single_choice" => Ok(Self::SingleChoice),
            "multi_choice" => Ok(Self::MultiChoice),
            _ => Err(AppError::Validation(format!("unknown data type '{value}'"))),
        }
    }
}

/// Physical value column of the `custom_field_values` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageColumn {
    /// `string_value`, bounded varchar.
    String,
    /// `text_value`, unbounded text.
    Text,
    /// `integer_value`, 64-bit integer.
    Integer,
    /// `float_value`, double precision.
    Float,
    /// `boolean_value`.
    Boolean,
    /// `date_value`.
    Date,
    /// `datetime_value`, timestamp without time zone.
    DateTime,
    /// `json_value`, JSON array.
    Json,
}

impl StorageColumn {
    /// Returns the physical column name.
    #[must_use]
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::String => "string_value",
            Self::Text => "text_value",
            Self::Integer => "integer_value",
            Self::Float => "float_value",
            Self::Boolean => "boolean_value",
            Self::Date => "date_value",
            Self::DateTime => "datetime_value",
            Self::Json => "json_value",
        }
    }
}

impl Display for StorageColumn {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.column_name())
    }
}
