use std::{cmp::Ordering, collections::HashMap};

/// A dynamically typed value flowing through the query pipeline.
///
/// Records pulled from CSV files, JSON documents and HTTP APIs are loosely
/// typed, so a `Value` keeps whatever shape the source produced and the
/// evaluator coerces lazily (a CSV cell `"42"` compares equal to the integer
/// literal `42`).
///
/// `Null` doubles as the "absent" sentinel: a missing key and a present null
/// both evaluate to `Null`.
///
/// # Examples
///
/// ```
/// use recql::Value;
///
/// assert_eq!(Value::String("42".into()).to_number(), Some(Value::Integer(42)));
/// assert_eq!(Value::Null.as_string(), "");
/// assert!(Value::Integer(3).as_bool());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or null
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Nested array, as found in JSON sources
    Array(Vec<Value>),

    /// Nested object, as found in JSON sources
    Object(HashMap<String, Value>),
}

impl Value {
    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Float(n) => *n != 0.0,
            Integer(n) => *n != 0,
            String(s) => !(s.is_empty() || s.eq_ignore_ascii_case("false") || s == "0"),
            Array(arr) => !arr.is_empty(),
            Object(obj) => !obj.is_empty(),
        }
    }

    /// Convert to boolean for conditions
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            _ => self.is_truthy(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as float, without coercing strings
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric coercion used by arithmetic and comparisons.
    ///
    /// Integers and floats pass through; strings are trimmed and parsed,
    /// preferring an integer when the text has no fractional part. Anything
    /// else (null, booleans, nested values) does not coerce.
    pub fn to_number(&self) -> Option<Value> {
        match self {
            Value::Integer(n) => Some(Value::Integer(*n)),
            Value::Float(n) => Some(Value::Float(*n)),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                if let Ok(n) = s.parse::<i64>() {
                    Some(Value::Integer(n))
                } else {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(Value::Float)
                }
            }
            _ => None,
        }
    }

    /// String representation used for comparisons, grouping keys and CONCAT.
    ///
    /// `Null` renders as the empty string.
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => format_float(*n),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Array(_) | Value::Object(_) => crate::output::to_json(self),
        }
    }

    /// Returns a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// Floats that hold a whole number print without a fractional part so that
/// `1.0` and `1` share a representation.
pub(crate) fn format_float(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Generic comparator shared by `=`, `<`, IN, DISTINCT and ORDER BY.
///
/// Both sides numeric after coercion compare numerically; otherwise their
/// string representations compare lexicographically.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left.to_number(), right.to_number()) {
        (Some(Value::Integer(a)), Some(Value::Integer(b))) => a.cmp(&b),
        (Some(a), Some(b)) => {
            let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        _ => left.as_string().cmp(&right.as_string()),
    }
}

/// Integers beyond this magnitude lose precision as `f64`.
const MAX_EXACT_FLOAT_INT: i64 = 1 << 53;

/// Normalised key for hash lookups: numerics collapse to one spelling so
/// values that [`compare_values`] calls equal share a key.
///
/// Integers too large for an exact `f64` take their float spelling, since the
/// comparator matches them against floats after rounding. Such keys can also
/// be shared by integers that are not equal, so callers recheck hits.
pub(crate) fn index_key(value: &Value) -> String {
    match value.to_number() {
        Some(Value::Integer(n)) if n.unsigned_abs() > MAX_EXACT_FLOAT_INT as u64 => {
            format_float(n as f64)
        }
        Some(Value::Integer(n)) => n.to_string(),
        Some(Value::Float(f)) => format_float(f),
        _ => value.as_string(),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_compare_numerically() {
        assert_eq!(
            compare_values(&Value::from("10"), &Value::Integer(9)),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&Value::from("1.0"), &Value::Integer(1)),
            Ordering::Equal
        );
    }

    #[test]
    fn mixed_values_fall_back_to_strings() {
        assert_eq!(
            compare_values(&Value::from("apple"), &Value::Integer(1)),
            Ordering::Greater
        );
        assert_eq!(compare_values(&Value::Null, &Value::from("")), Ordering::Equal);
    }

    #[test]
    fn index_key_agrees_with_comparator() {
        assert_eq!(index_key(&Value::from("1.0")), index_key(&Value::Integer(1)));
        assert_eq!(index_key(&Value::Float(2.5)), "2.5");
    }

    #[test]
    fn large_integers_share_a_key_with_their_float() {
        let big = Value::Integer(9007199254740993);
        let float = Value::Float(9007199254740992.0);
        assert_eq!(compare_values(&big, &float), Ordering::Equal);
        assert_eq!(index_key(&big), index_key(&float));
        assert_eq!(index_key(&Value::from("9007199254740993")), index_key(&float));
        assert_eq!(index_key(&Value::Integer(-42)), "-42");
    }
}
