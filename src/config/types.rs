//! Configuration records and the typed value union.
//!
//! A [`Configuration`] names a module-scoped parameter and declares the shape
//! of its value. Each [`ConfigSetting`] carries one value for an optional
//! context key (typically a financial year) and an optional validity window.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared shape of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// A JSON object.
    Json,
    /// A JSON array.
    Array,
    /// A decimal number.
    Number,
    /// Free text.
    Text,
    /// true/false.
    Boolean,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueType::Json => "json",
            ValueType::Array => "array",
            ValueType::Number => "number",
            ValueType::Text => "text",
            ValueType::Boolean => "boolean",
        };
        f.write_str(s)
    }
}

/// A configuration value validated against its [`ValueType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    /// Object payload.
    Json(serde_json::Map<String, serde_json::Value>),
    /// Array payload.
    Array(Vec<serde_json::Value>),
    /// Decimal payload.
    Number(Decimal),
    /// Text payload.
    Text(String),
    /// Boolean payload.
    Boolean(bool),
}

impl ConfigValue {
    /// Checks `raw` against `value_type` and wraps it.
    ///
    /// Numbers may be given as JSON numbers or numeric strings.
    ///
    /// ```
    /// use compensation_engine::config::{ConfigValue, ValueType};
    ///
    /// let value = ConfigValue::from_raw(ValueType::Number, serde_json::json!("21000")).unwrap();
    /// assert!(matches!(value, ConfigValue::Number(_)));
    /// assert!(ConfigValue::from_raw(ValueType::Boolean, serde_json::json!("yes")).is_err());
    /// ```
    pub fn from_raw(value_type: ValueType, raw: serde_json::Value) -> Result<Self, String> {
        use serde_json::Value;
        match (value_type, raw) {
            (ValueType::Json, Value::Object(map)) => Ok(ConfigValue::Json(map)),
            (ValueType::Array, Value::Array(items)) => Ok(ConfigValue::Array(items)),
            (ValueType::Number, Value::Number(n)) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .map(ConfigValue::Number)
                .map_err(|e| e.to_string()),
            (ValueType::Number, Value::String(s)) => Decimal::from_str(s.trim())
                .map(ConfigValue::Number)
                .map_err(|e| format!("'{}' is not a number: {}", s, e)),
            (ValueType::Text, Value::String(s)) => Ok(ConfigValue::Text(s)),
            (ValueType::Boolean, Value::Bool(b)) => Ok(ConfigValue::Boolean(b)),
            (expected, other) => Err(format!("expected {}, found {}", expected, kind_of(&other))),
        }
    }

    /// The value's type tag.
    pub fn value_type(&self) -> ValueType {
        match self {
            ConfigValue::Json(_) => ValueType::Json,
            ConfigValue::Array(_) => ValueType::Array,
            ConfigValue::Number(_) => ValueType::Number,
            ConfigValue::Text(_) => ValueType::Text,
            ConfigValue::Boolean(_) => ValueType::Boolean,
        }
    }

    /// Converts back into an untyped JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ConfigValue::Json(map) => serde_json::Value::Object(map.clone()),
            ConfigValue::Array(items) => serde_json::Value::Array(items.clone()),
            ConfigValue::Number(n) => serde_json::Value::String(n.to_string()),
            ConfigValue::Text(s) => serde_json::Value::String(s.clone()),
            ConfigValue::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }

    /// The decimal payload, if this is a number.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ConfigValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "text",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "json",
    }
}

/// A named, module-scoped parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Configuration id.
    pub id: String,
    /// Owning module, e.g. `payroll`.
    pub module: String,
    /// Parameter key, e.g. `statutory`.
    pub key: String,
    /// Declared value shape.
    pub value_type: ValueType,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// One time-boxed, context-keyed value of a [`Configuration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSetting {
    /// The owning configuration id.
    pub config_id: String,
    /// Context, e.g. a financial-year label; `None` is the default.
    pub context_key: Option<String>,
    /// The validated value.
    pub value: ConfigValue,
    /// First day the value applies.
    pub effective_from: Option<NaiveDate>,
    /// Last day the value applies.
    pub effective_to: Option<NaiveDate>,
    /// Whether the value is live.
    pub is_active: bool,
}

impl ConfigSetting {
    /// True when the validity window contains `date`. Unset bounds are open.
    pub fn window_contains(&self, date: NaiveDate) -> bool {
        self.effective_from.is_none_or(|from| from <= date)
            && self.effective_to.is_none_or(|to| to >= date)
    }

    /// True when both settings are active and their windows share a day.
    pub fn overlaps(&self, other: &ConfigSetting) -> bool {
        if !self.is_active || !other.is_active {
            return false;
        }
        let starts_before_other_ends = match (self.effective_from, other.effective_to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.effective_from, self.effective_to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setting(from: Option<NaiveDate>, to: Option<NaiveDate>, active: bool) -> ConfigSetting {
        ConfigSetting {
            config_id: "c1".to_string(),
            context_key: None,
            value: ConfigValue::Boolean(true),
            effective_from: from,
            effective_to: to,
            is_active: active,
        }
    }

    #[test]
    fn test_from_raw_accepts_matching_shapes() {
        assert!(matches!(
            ConfigValue::from_raw(ValueType::Json, json!({"a": 1})),
            Ok(ConfigValue::Json(_))
        ));
        assert!(matches!(
            ConfigValue::from_raw(ValueType::Array, json!([1, 2])),
            Ok(ConfigValue::Array(_))
        ));
        assert_eq!(
            ConfigValue::from_raw(ValueType::Number, json!(0.75)).unwrap(),
            ConfigValue::Number(Decimal::new(75, 2))
        );
        assert_eq!(
            ConfigValue::from_raw(ValueType::Text, json!("bonus")).unwrap(),
            ConfigValue::Text("bonus".to_string())
        );
    }

    #[test]
    fn test_from_raw_rejects_mismatch() {
        let err = ConfigValue::from_raw(ValueType::Json, json!([1])).unwrap_err();
        assert_eq!(err, "expected json, found array");
        assert!(ConfigValue::from_raw(ValueType::Number, json!("twelve")).is_err());
    }

    #[test]
    fn test_window_contains_open_bounds() {
        assert!(setting(None, None, true).window_contains(date(1999, 1, 1)));
        let s = setting(Some(date(2025, 4, 1)), Some(date(2026, 3, 31)), true);
        assert!(s.window_contains(date(2025, 4, 1)));
        assert!(s.window_contains(date(2026, 3, 31)));
        assert!(!s.window_contains(date(2026, 4, 1)));
    }

    #[test]
    fn test_overlap_detection() {
        let fy25 = setting(Some(date(2025, 4, 1)), Some(date(2026, 3, 31)), true);
        let fy26 = setting(Some(date(2026, 4, 1)), None, true);
        let open = setting(None, None, true);
        let inactive = setting(None, None, false);

        assert!(!fy25.overlaps(&fy26));
        assert!(fy25.overlaps(&open));
        assert!(!fy25.overlaps(&inactive));
    }
}
