// src/schema/types.rs

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Offset unit for epoch-based datetime columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EpochUnit {
    Days,
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl EpochUnit {
    pub fn as_str(&self) -> &str {
        match self {
            EpochUnit::Days => "d",
            EpochUnit::Seconds => "s",
            EpochUnit::Milliseconds => "ms",
            EpochUnit::Microseconds => "us",
            EpochUnit::Nanoseconds => "ns",
        }
    }

    /// Nanoseconds in one unit.
    pub fn nanos(&self) -> i128 {
        match self {
            EpochUnit::Days => 86_400 * 1_000_000_000,
            EpochUnit::Seconds => 1_000_000_000,
            EpochUnit::Milliseconds => 1_000_000,
            EpochUnit::Microseconds => 1_000,
            EpochUnit::Nanoseconds => 1,
        }
    }
}

impl FromStr for EpochUnit {
    type Err = ColumnTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" | "day" | "days" => Ok(EpochUnit::Days),
            "s" | "sec" | "seconds" => Ok(EpochUnit::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(EpochUnit::Milliseconds),
            "us" | "micros" | "microseconds" => Ok(EpochUnit::Microseconds),
            "ns" | "nanos" | "nanoseconds" => Ok(EpochUnit::Nanoseconds),
            other => Err(ColumnTypeError::UnknownUnit(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnTypeError {
    #[error("unknown column type `{0}`")]
    UnknownType(String),
    #[error("unknown epoch unit `{0}` (expected d, s, ms, us or ns)")]
    UnknownUnit(String),
    #[error("empty datetime format")]
    EmptyFormat,
}

/// Target type for a column. The text form is what config files use:
/// `integer`, `float`, `string`, `datetime`, `datetime:<chrono format>`,
/// `epoch:<unit>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Float,
    String,
    /// Strict: every value must match this chrono format string.
    DateTimeFromFormat(String),
    /// Numeric offset from the Unix epoch.
    DateTimeFromUnit(EpochUnit),
    /// ISO-8601-ish text in any of a fixed, ordered set of layouts.
    DateTimeIso,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => f.write_str("integer"),
            ColumnType::Float => f.write_str("float"),
            ColumnType::String => f.write_str("string"),
            ColumnType::DateTimeFromFormat(fmt) => write!(f, "datetime:{}", fmt),
            ColumnType::DateTimeFromUnit(unit) => write!(f, "epoch:{}", unit.as_str()),
            ColumnType::DateTimeIso => f.write_str("datetime"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = ColumnTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // split before lowercasing: format strings are case-sensitive
        if let Some(format) = s.trim_start().strip_prefix("datetime:") {
            if format.is_empty() {
                return Err(ColumnTypeError::EmptyFormat);
            }
            return Ok(ColumnType::DateTimeFromFormat(format.to_string()));
        }
        if let Some(unit) = s.trim().strip_prefix("epoch:") {
            return Ok(ColumnType::DateTimeFromUnit(unit.parse()?));
        }
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" => Ok(ColumnType::Integer),
            "float" | "double" => Ok(ColumnType::Float),
            "str" | "string" | "utf8" => Ok(ColumnType::String),
            "datetime" => Ok(ColumnType::DateTimeIso),
            other => Err(ColumnTypeError::UnknownType(other.to_string())),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = ColumnTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

/// Column name → target type for one table, in declaration order. Columns
/// are coerced (and any diagnostics raised) in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema(Vec<(String, ColumnType)>);

impl ColumnSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, or retype it in place if already declared.
    pub fn with(mut self, column: impl Into<String>, ty: ColumnType) -> Self {
        let column = column.into();
        match self.0.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = ty,
            None => self.0.push((column, ty)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&ColumnType> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ColumnType)> {
        self.0.iter().map(|(name, ty)| (name, ty))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ColumnSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, ty) in &self.0 {
            map.serialize_entry(name, ty)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ColumnSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = ColumnSchema;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to column type")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ColumnSchema, A::Error> {
                let mut columns: Vec<(String, ColumnType)> = Vec::new();
                while let Some((name, ty)) = access.next_entry::<String, ColumnType>()? {
                    if columns.iter().any(|(seen, _)| *seen == name) {
                        return Err(de::Error::custom(format!("duplicate column `{}`", name)));
                    }
                    columns.push((name, ty));
                }
                Ok(ColumnSchema(columns))
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}
