//! Source loading: turning a table reference into records.
//!
//! The engine only needs [`SourceLoader::load`]. The loaders here are thin
//! adapters: CSV cells stay strings (the evaluator coerces lazily), JSON keeps
//! its own types, and database access is left to an adapter registered on a
//! [`CompositeSource`].

use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{
    convert::json_to_record,
    error::{QueryError, QueryResult},
    record::Record,
    value::Value,
};

/// Where a table comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SourceKind {
    /// CSV or JSON file
    #[default]
    File,
    /// Table in an external database, served by a registered adapter
    Database,
    /// JSON array returned by an HTTP GET
    Api,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::File => "file",
            SourceKind::Database => "database",
            SourceKind::Api => "api",
        })
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(SourceKind::File),
            "database" | "db" => Ok(SourceKind::Database),
            "api" => Ok(SourceKind::Api),
            other => Err(format!("unknown source kind '{}'", other)),
        }
    }
}

/// One column of a described table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Resolves table references into records.
///
/// Implementations block until the data is available; the engine adds no
/// timeout or retry of its own.
pub trait SourceLoader {
    fn load(&self, kind: SourceKind, name: &str) -> QueryResult<Vec<Record>>;

    /// Column names and types of a table, for migration tooling
    fn describe_schema(&self, table: &str) -> QueryResult<Vec<Field>> {
        Err(QueryError::Unsupported(format!(
            "describing the schema of '{}'",
            table
        )))
    }
}

/// Derive fields from loaded records: columns in first-seen order, typed by
/// their first non-null value, nullable when some record lacks a value.
pub fn infer_fields(records: &[Record]) -> Vec<Field> {
    let mut fields: Vec<Field> = Vec::new();

    for record in records {
        for (name, value) in record.iter() {
            let field = match fields.iter().position(|f| f.name == name) {
                Some(i) => &mut fields[i],
                None => {
                    fields.push(Field {
                        name: name.to_string(),
                        data_type: "null".to_string(),
                        nullable: false,
                    });
                    let last = fields.len() - 1;
                    &mut fields[last]
                }
            };
            if value.is_null() {
                field.nullable = true;
            } else if field.data_type == "null" {
                field.data_type = value.type_name().to_string();
            }
        }
    }

    for field in &mut fields {
        if records.iter().any(|r| !r.contains_key(&field.name)) {
            field.nullable = true;
        }
    }
    fields
}

fn records_from_json_array(
    kind: SourceKind,
    name: &str,
    document: serde_json::Value,
) -> QueryResult<Vec<Record>> {
    match document {
        serde_json::Value::Array(items) => Ok(items.into_iter().map(json_to_record).collect()),
        other => Err(QueryError::load(
            kind,
            name,
            format!("expected a JSON array, got {}", json_type(&other)),
        )),
    }
}

fn json_type(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ========================================
// In-memory tables
// ========================================

/// Named record sets held in memory. Every source kind resolves against
/// the same table names.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: HashMap<String, Vec<Record>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, rows: Vec<Record>) {
        self.tables.insert(name.into(), rows);
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Record>) -> Self {
        self.insert(name, rows);
        self
    }

    /// Register a table from a JSON array of objects
    pub fn with_json(self, name: impl Into<String>, rows: serde_json::Value) -> Self {
        let name = name.into();
        let rows = match rows {
            serde_json::Value::Array(items) => items.into_iter().map(json_to_record).collect(),
            other => vec![json_to_record(other)],
        };
        self.with_table(name, rows)
    }
}

impl SourceLoader for InMemorySource {
    fn load(&self, kind: SourceKind, name: &str) -> QueryResult<Vec<Record>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::SourceNotFound {
                kind,
                name: name.to_string(),
            })
    }

    fn describe_schema(&self, table: &str) -> QueryResult<Vec<Field>> {
        Ok(infer_fields(&self.load(SourceKind::File, table)?))
    }
}

// ========================================
// Files
// ========================================

const FILE_EXTENSIONS: [&str; 3] = ["csv", "json", "jsonl"];

/// CSV and JSON files under a base directory.
///
/// A name resolves as given, then with `.csv`, `.json` and `.jsonl` appended.
#[derive(Debug, Clone)]
pub struct FileSource {
    base_dir: PathBuf,
}

impl FileSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FileSource {
            base_dir: base_dir.into(),
        }
    }

    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = self.base_dir.join(name);
        if direct.is_file() {
            return Some(direct);
        }
        FILE_EXTENSIONS
            .iter()
            .map(|ext| self.base_dir.join(format!("{}.{}", name, ext)))
            .find(|p| p.is_file())
    }

    fn read_csv(&self, path: &Path) -> QueryResult<Vec<Record>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_path(path)?;
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            records.push(
                headers
                    .iter()
                    .zip(row.iter())
                    .map(|(h, cell)| (h, Value::String(cell.to_string())))
                    .collect(),
            );
        }
        Ok(records)
    }

    fn read_json(&self, name: &str, text: &str) -> QueryResult<Vec<Record>> {
        if text.trim_start().starts_with('[') {
            let document: serde_json::Value = serde_json::from_str(text)?;
            return records_from_json_array(SourceKind::File, name, document);
        }

        // One JSON document per line
        let mut records = Vec::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let document: serde_json::Value = serde_json::from_str(line)?;
            records.push(json_to_record(document));
        }
        Ok(records)
    }
}

impl SourceLoader for FileSource {
    fn load(&self, kind: SourceKind, name: &str) -> QueryResult<Vec<Record>> {
        let path = self.resolve(name).ok_or_else(|| QueryError::SourceNotFound {
            kind,
            name: name.to_string(),
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let records = match extension.as_deref() {
            Some("csv") => self.read_csv(&path)?,
            Some("json" | "jsonl" | "ndjson") => {
                let text = fs::read_to_string(&path)?;
                self.read_json(name, &text)?
            }
            _ => {
                let text = fs::read_to_string(&path)?;
                if text.trim_start().starts_with(['[', '{']) {
                    self.read_json(name, &text)?
                } else {
                    self.read_csv(&path)?
                }
            }
        };

        tracing::debug!(path = %path.display(), rows = records.len(), "loaded file source");
        Ok(records)
    }

    fn describe_schema(&self, table: &str) -> QueryResult<Vec<Field>> {
        Ok(infer_fields(&self.load(SourceKind::File, table)?))
    }
}

// ========================================
// HTTP APIs
// ========================================

/// JSON arrays fetched with an HTTP GET.
///
/// Names that are full `http://` or `https://` URLs are fetched as-is; other
/// names are joined onto the base URL.
#[derive(Debug, Clone)]
pub struct ApiSource {
    base_url: Option<String>,
    timeout: Duration,
}

impl Default for ApiSource {
    fn default() -> Self {
        ApiSource {
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ApiSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiSource {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url_for(&self, name: &str) -> QueryResult<String> {
        if name.starts_with("http://") || name.starts_with("https://") {
            return Ok(name.to_string());
        }
        match &self.base_url {
            Some(base) => Ok(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                name.trim_start_matches('/')
            )),
            None => Err(QueryError::load(
                SourceKind::Api,
                name,
                "no API base URL configured",
            )),
        }
    }
}

impl SourceLoader for ApiSource {
    fn load(&self, kind: SourceKind, name: &str) -> QueryResult<Vec<Record>> {
        let url = self.url_for(name)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        tracing::debug!(%url, "fetching api source");
        let response = client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::load(kind, name, format!("HTTP {}", status)));
        }

        let document: serde_json::Value = response.json()?;
        records_from_json_array(kind, name, document)
    }
}

// ========================================
// Dispatch by kind
// ========================================

/// Routes each source kind to its own loader.
#[derive(Default)]
pub struct CompositeSource {
    loaders: HashMap<SourceKind, Box<dyn SourceLoader>>,
}

impl CompositeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SourceKind, loader: impl SourceLoader + 'static) -> Self {
        self.loaders.insert(kind, Box::new(loader));
        self
    }
}

impl SourceLoader for CompositeSource {
    fn load(&self, kind: SourceKind, name: &str) -> QueryResult<Vec<Record>> {
        match self.loaders.get(&kind) {
            Some(loader) => loader.load(kind, name),
            None => Err(QueryError::load(
                kind,
                name,
                "no loader registered for this source kind",
            )),
        }
    }

    fn describe_schema(&self, table: &str) -> QueryResult<Vec<Field>> {
        let mut last_error = None;
        for kind in [SourceKind::File, SourceKind::Database, SourceKind::Api] {
            if let Some(loader) = self.loaders.get(&kind) {
                match loader.describe_schema(table) {
                    Ok(fields) => return Ok(fields),
                    Err(e) => last_error = Some(e),
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            QueryError::Unsupported(format!("describing the schema of '{}'", table))
        }))
    }
}
