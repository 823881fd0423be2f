//! JSON rendering for values and result sets.
//!
//! Two flavours share one printer:
//!
//! - **Display output** via [`records_to_json()`] / [`records_to_json_pretty()`] keeps
//!   each record's column order, which is the projection order of the query.
//! - **Canonical output** via [`canonical_record()`] sorts keys and uses a single
//!   spelling for numbers, so two records with the same content always produce the
//!   same string. DISTINCT, UNION/INTERSECT/EXCEPT and ROW_NUMBER rely on it.
//!
//! # Examples
//!
//! ```
//! use recql::{Record, Value};
//! use recql::output::{canonical_record, to_json};
//!
//! assert_eq!(to_json(&Value::Integer(42)), "42");
//!
//! let a: Record = [("b", Value::Integer(2)), ("a", Value::Float(1.0))].into_iter().collect();
//! assert_eq!(canonical_record(&a), r#"{"a":1,"b":2}"#);
//! ```

use crate::{
    record::Record,
    value::{Value, format_float},
};

pub struct JsonPrinter {
    pretty: bool,
    canonical: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter {
            pretty,
            canonical: false,
        }
    }

    pub fn canonical() -> Self {
        JsonPrinter {
            pretty: false,
            canonical: true,
        }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    pub fn print_records(&self, records: &[Record]) -> String {
        let items: Vec<String> = records
            .iter()
            .map(|r| self.print_record(r, 1))
            .collect();
        self.wrap('[', ']', items, 0)
    }

    pub fn print_record(&self, record: &Record, indent: usize) -> String {
        let mut pairs: Vec<(&str, &Value)> = record.iter().collect();
        if self.canonical {
            pairs.sort_by(|a, b| a.0.cmp(b.0));
        }
        self.print_pairs(pairs, indent)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) if self.canonical => format_float(*n),
            Value::Float(n) if n.is_finite() => n.to_string(),
            Value::Float(_) => "null".to_string(),
            Value::String(s) => format!("\"{}\"", self.escape_string(s)),
            Value::Array(arr) => {
                let items = arr
                    .iter()
                    .map(|v| self.print_value(v, indent + 1))
                    .collect();
                self.wrap('[', ']', items, indent)
            }
            Value::Object(obj) => {
                // Nested objects are hash maps; sort for deterministic output
                let mut pairs: Vec<(&str, &Value)> =
                    obj.iter().map(|(k, v)| (k.as_str(), v)).collect();
                pairs.sort_by(|a, b| a.0.cmp(b.0));
                self.print_pairs(pairs, indent)
            }
        }
    }

    fn print_pairs(&self, pairs: Vec<(&str, &Value)>, indent: usize) -> String {
        let sep = if self.pretty { ": " } else { ":" };
        let items = pairs
            .into_iter()
            .map(|(k, v)| {
                format!(
                    "\"{}\"{}{}",
                    self.escape_string(k),
                    sep,
                    self.print_value(v, indent + 1)
                )
            })
            .collect();
        self.wrap('{', '}', items, indent)
    }

    fn wrap(&self, open: char, close: char, items: Vec<String>, indent: usize) -> String {
        if items.is_empty() {
            return format!("{}{}", open, close);
        }

        if self.pretty {
            let inner: Vec<String> = items
                .into_iter()
                .map(|item| format!("{}{}", self.indent(indent + 1), item))
                .collect();
            format!(
                "{}\n{}\n{}{}",
                open,
                inner.join(",\n"),
                self.indent(indent),
                close
            )
        } else {
            format!("{}{}{}", open, items.join(","), close)
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn escape_string(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match c {
                '"' => vec!['\\', '"'],
                '\\' => vec!['\\', '\\'],
                '\n' => vec!['\\', 'n'],
                '\r' => vec!['\\', 'r'],
                '\t' => vec!['\\', 't'],
                c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
                c => vec![c],
            })
            .collect()
    }
}

/// Converts a Value to compact JSON.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// Canonical serialization of a record: sorted keys, stable number format.
pub fn canonical_record(record: &Record) -> String {
    JsonPrinter::canonical().print_record(record, 0)
}

/// Renders a result set as a compact JSON array, preserving column order.
pub fn records_to_json(records: &[Record]) -> String {
    JsonPrinter::new(false).print_records(records)
}

/// Renders a result set as a JSON array with 2-space indentation.
pub fn records_to_json_pretty(records: &[Record]) -> String {
    JsonPrinter::new(true).print_records(records)
}
