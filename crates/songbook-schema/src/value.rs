//! Typed scalar values held by descriptors and flat records.

use serde_json::Value;

/// Type tag of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
}

impl FieldType {
    /// Returns the zero value for this type, used as the schema default.
    pub fn zero_value(&self) -> FieldValue {
        match self {
            FieldType::Str => FieldValue::Str(String::new()),
            FieldType::Int => FieldValue::Int(0),
            FieldType::Float => FieldValue::Float(0.0),
            FieldType::Bool => FieldValue::Bool(false),
        }
    }

    /// Returns the type name as used in messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Str => "string",
            FieldType::Int => "integer",
            FieldType::Float => "float",
            FieldType::Bool => "boolean",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Outcome of converting a value to a schema type.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// The value already had the requested type (or widened silently).
    Exact(FieldValue),
    /// The value was converted losslessly from another representation.
    Coerced(FieldValue),
    /// No sensible conversion exists.
    Invalid,
}

impl FieldValue {
    /// Returns the type tag of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Str(_) => FieldType::Str,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Bool(_) => FieldType::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts a JSON scalar. Returns `None` for `null`, objects and arrays.
    pub fn from_json(value: &Value) -> Option<FieldValue> {
        match value {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(FieldValue::Int(i))
                } else {
                    n.as_f64().map(FieldValue::Float)
                }
            }
            Value::String(s) => Some(FieldValue::Str(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Converts to a JSON scalar. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(*b),
        }
    }

    /// Converts this value to `target`.
    pub fn coerce_to(&self, target: FieldType) -> Coercion {
        match (self, target) {
            (FieldValue::Str(_), FieldType::Str)
            | (FieldValue::Int(_), FieldType::Int)
            | (FieldValue::Float(_), FieldType::Float)
            | (FieldValue::Bool(_), FieldType::Bool) => Coercion::Exact(self.clone()),

            (FieldValue::Int(i), FieldType::Float) => Coercion::Exact(FieldValue::Float(*i as f64)),
            (FieldValue::Float(f), FieldType::Int) => match integral(*f) {
                Some(i) => Coercion::Coerced(FieldValue::Int(i)),
                None => Coercion::Invalid,
            },
            (FieldValue::Int(_) | FieldValue::Float(_) | FieldValue::Bool(_), FieldType::Str) => {
                Coercion::Coerced(FieldValue::Str(self.to_cell()))
            }
            (FieldValue::Str(s), ty) => match FieldValue::parse_cell(ty, s) {
                Some(v) => Coercion::Coerced(v),
                None => Coercion::Invalid,
            },
            (FieldValue::Int(i), FieldType::Bool) => match i {
                0 => Coercion::Coerced(FieldValue::Bool(false)),
                1 => Coercion::Coerced(FieldValue::Bool(true)),
                _ => Coercion::Invalid,
            },
            (FieldValue::Float(_), FieldType::Bool) | (FieldValue::Bool(_), _) => {
                Coercion::Invalid
            }
        }
    }

    /// Parses a table cell as `ty`.
    ///
    /// Integers accept an integral float spelling (`"3.0"`), booleans accept
    /// `true`/`false` in any letter case. Empty numeric or boolean cells do
    /// not parse.
    pub fn parse_cell(ty: FieldType, cell: &str) -> Option<FieldValue> {
        match ty {
            FieldType::Str => Some(FieldValue::Str(cell.to_string())),
            FieldType::Int => {
                let trimmed = cell.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Some(FieldValue::Int(i));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(integral)
                    .map(FieldValue::Int)
            }
            FieldType::Float => cell.trim().parse::<f64>().ok().map(FieldValue::Float),
            FieldType::Bool => parse_bool_token(cell).map(FieldValue::Bool),
        }
    }

    /// Formats this value as a table cell.
    ///
    /// Booleans use the `True`/`False` tokens, integral floats keep a
    /// trailing `.0` so the column stays recognizably fractional.
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Str(s) => s.clone(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Float(f) => format_float(*f),
            FieldValue::Bool(true) => "True".to_string(),
            FieldValue::Bool(false) => "False".to_string(),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_cell())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Parses a boolean token in any letter case (`TRUE`, `False`, `true`, ...).
pub fn parse_bool_token(token: &str) -> Option<bool> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("true") {
        Some(true)
    } else if token.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.0e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert_eq!(FieldType::Str.zero_value(), FieldValue::Str(String::new()));
        assert_eq!(FieldType::Int.zero_value(), FieldValue::Int(0));
        assert_eq!(FieldType::Float.zero_value(), FieldValue::Float(0.0));
        assert_eq!(FieldType::Bool.zero_value(), FieldValue::Bool(false));
    }

    #[test]
    fn test_bool_tokens_any_case() {
        for token in ["TRUE", "True", "true", " tRuE "] {
            assert_eq!(parse_bool_token(token), Some(true), "{token}");
        }
        for token in ["FALSE", "False", "false"] {
            assert_eq!(parse_bool_token(token), Some(false), "{token}");
        }
        assert_eq!(parse_bool_token("yes"), None);
        assert_eq!(parse_bool_token(""), None);
    }

    #[test]
    fn test_parse_int_cell_accepts_integral_float() {
        assert_eq!(
            FieldValue::parse_cell(FieldType::Int, "7.0"),
            Some(FieldValue::Int(7))
        );
        assert_eq!(FieldValue::parse_cell(FieldType::Int, "7.5"), None);
        assert_eq!(FieldValue::parse_cell(FieldType::Int, ""), None);
    }

    #[test]
    fn test_cell_formatting() {
        assert_eq!(FieldValue::Bool(true).to_cell(), "True");
        assert_eq!(FieldValue::Bool(false).to_cell(), "False");
        assert_eq!(FieldValue::Float(0.0).to_cell(), "0.0");
        assert_eq!(FieldValue::Float(1.25).to_cell(), "1.25");
        assert_eq!(FieldValue::Int(-3).to_cell(), "-3");
    }

    #[test]
    fn test_coercions() {
        assert_eq!(
            FieldValue::Int(2).coerce_to(FieldType::Float),
            Coercion::Exact(FieldValue::Float(2.0))
        );
        assert_eq!(
            FieldValue::Str("TRUE".into()).coerce_to(FieldType::Bool),
            Coercion::Coerced(FieldValue::Bool(true))
        );
        assert_eq!(
            FieldValue::Float(4.0).coerce_to(FieldType::Int),
            Coercion::Coerced(FieldValue::Int(4))
        );
        assert_eq!(
            FieldValue::Int(0).coerce_to(FieldType::Str),
            Coercion::Coerced(FieldValue::Str("0".into()))
        );
        assert_eq!(
            FieldValue::Str("n/a".into()).coerce_to(FieldType::Int),
            Coercion::Invalid
        );
        assert_eq!(FieldValue::Bool(true).coerce_to(FieldType::Int), Coercion::Invalid);
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(3)),
            Some(FieldValue::Int(3))
        );
        assert_eq!(
            FieldValue::from_json(&serde_json::json!(0.5)),
            Some(FieldValue::Float(0.5))
        );
        assert_eq!(FieldValue::from_json(&Value::Null), None);
        assert_eq!(FieldValue::Float(f64::NAN).to_json(), Value::Null);
    }
}
