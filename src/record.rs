use crate::value::Value;

/// One row of data: column name to value, in insertion order.
///
/// Column names are unique per record; inserting an existing name replaces
/// the value in place. Order only matters for final projection, never for
/// equality (see [`Record::canonical`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Record {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    /// Insert or replace a column, keeping the original position on replace
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// First column's value, used for scalar subquery results
    pub fn first_value(&self) -> Option<&Value> {
        self.fields.first().map(|(_, v)| v)
    }

    /// Copy every field of `other` into this record (later fields win)
    pub fn merge(&mut self, other: &Record) {
        for (k, v) in &other.fields {
            self.insert(k.clone(), v.clone());
        }
    }

    /// New record whose keys are prefixed with `qualifier.`
    pub fn qualified(&self, qualifier: &str) -> Record {
        Record {
            fields: self
                .fields
                .iter()
                .map(|(k, v)| (format!("{}.{}", qualifier, k), v.clone()))
                .collect(),
        }
    }

    /// Resolve a column name, tolerating qualification mismatches.
    ///
    /// Exact match first. A qualified name (`u.id`) then falls back to its
    /// bare column (`id`); a bare name falls back to a single `*.name` key.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        if let Some(v) = self.get(name) {
            return Some(v);
        }
        match name.rsplit_once('.') {
            Some((_, column)) => self.get(column),
            None => {
                let suffix = format!(".{}", name);
                let mut matches = self.fields.iter().filter(|(k, _)| k.ends_with(&suffix));
                match (matches.next(), matches.next()) {
                    (Some((_, v)), None) => Some(v),
                    _ => None,
                }
            }
        }
    }

    /// Deterministic, order-independent serialization used as row identity
    /// by DISTINCT, set operations and window row lookup.
    pub fn canonical(&self) -> String {
        crate::output::canonical_record(self)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
