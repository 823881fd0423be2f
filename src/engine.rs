//! Statement orchestration and the public entry point.
//!
//! [`Engine::run_query`] parses a query string and executes it against the
//! engine's [`SourceLoader`]. Each call builds a fresh [`EvalContext`], so an
//! `Engine` can serve any number of queries one after another; parsed
//! [`Statement`]s can be kept and re-executed with [`Engine::execute`].

use std::{
    collections::{HashMap, HashSet},
    rc::Rc,
    time::Instant,
};

use crate::{
    ast::{CompoundQuery, Query, SetOperator, Statement, TableReference},
    config::{CompoundMode, EngineOptions},
    error::QueryResult,
    evaluator::EvalContext,
    parser,
    record::Record,
    source::{Field, SourceLoader},
};

/// A query engine bound to one source loader.
///
/// # Examples
///
/// ```
/// use recql::{Engine, InMemorySource};
/// use serde_json::json;
///
/// let source = InMemorySource::new().with_json(
///     "people",
///     json!([
///         {"name": "Ada", "age": 36},
///         {"name": "Linus", "age": 28},
///     ]),
/// );
/// let engine = Engine::new(source);
///
/// let rows = engine
///     .run_query("SELECT name FROM people WHERE age > 30")
///     .unwrap();
/// assert_eq!(recql::records_to_json(&rows), r#"[{"name":"Ada"}]"#);
/// ```
pub struct Engine {
    loader: Box<dyn SourceLoader>,
    options: EngineOptions,
}

impl Engine {
    pub fn new(loader: impl SourceLoader + 'static) -> Self {
        Engine {
            loader: Box::new(loader),
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn parse(&self, text: &str) -> QueryResult<Statement> {
        parser::parse(text)
    }

    /// Parse and execute one query string
    pub fn run_query(&self, text: &str) -> QueryResult<Vec<Record>> {
        let statement = self.parse(text)?;
        self.execute(&statement)
    }

    /// Execute an already parsed statement
    pub fn execute(&self, statement: &Statement) -> QueryResult<Vec<Record>> {
        let started = Instant::now();
        tracing::debug!(from = %statement.primary.from.name, "executing statement");

        let mut ctx = EvalContext::new(self.loader.as_ref(), &self.options);
        let rows = ctx.execute_statement(statement)?;

        tracing::info!(
            rows = rows.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "query finished"
        );
        Ok(rows)
    }

    pub fn describe_schema(&self, table: &str) -> QueryResult<Vec<Field>> {
        self.loader.describe_schema(table)
    }
}

impl EvalContext<'_> {
    /// Executes a statement, including its CTEs and any set operation.
    ///
    /// CTEs are visible to this statement and anything nested inside it,
    /// and disappear once it finishes.
    pub fn execute_statement(&mut self, statement: &Statement) -> QueryResult<Vec<Record>> {
        self.cte_scopes.push(HashMap::new());
        let result = self.execute_statement_in_scope(statement);
        self.cte_scopes.pop();
        result
    }

    fn execute_statement_in_scope(&mut self, statement: &Statement) -> QueryResult<Vec<Record>> {
        if let Some(with) = &statement.with {
            for cte in &with.ctes {
                let rows = self.execute_statement(&cte.query)?;
                tracing::debug!(name = %cte.name, rows = rows.len(), "materialized CTE");
                if let Some(scope) = self.cte_scopes.last_mut() {
                    scope.insert(cte.name.clone(), Rc::new(rows));
                }
            }
        }

        match &statement.compound {
            None => self.run_select(&statement.primary),
            Some(compound) => self.run_compound(&statement.primary, compound),
        }
    }

    fn run_select(&mut self, query: &Query) -> QueryResult<Vec<Record>> {
        let base = self.load_table(&query.from)?;
        let rows = self.prepare_rows(query, &base)?;
        self.execute_query(query, rows)
    }

    /// FROM alias prefixing followed by joins.
    ///
    /// Without an alias, rows are still prefixed with the table name when
    /// the query joins, so `users.id` stays addressable next to the joined
    /// columns.
    fn prepare_rows(&mut self, query: &Query, base: &[Record]) -> QueryResult<Vec<Record>> {
        let qualifier = match &query.from.alias {
            Some(alias) => Some(alias.as_str()),
            None if !query.joins.is_empty() => Some(query.from.name.as_str()),
            None => None,
        };
        let rows = match qualifier {
            Some(qualifier) => base.iter().map(|r| r.qualified(qualifier)).collect(),
            None => base.to_vec(),
        };

        if query.joins.is_empty() {
            Ok(rows)
        } else {
            self.execute_joins(&query.joins, rows)
        }
    }

    fn run_compound(&mut self, primary: &Query, compound: &CompoundQuery) -> QueryResult<Vec<Record>> {
        let (left, right) = match self.options.compound_mode {
            CompoundMode::SharedBaseRows => {
                let base = self.load_table(&primary.from)?;
                let left_rows = self.prepare_rows(&compound.left, &base)?;
                let left = self.execute_query(&compound.left, left_rows)?;
                let right_rows = self.prepare_rows(&compound.right, &base)?;
                let right = self.execute_query(&compound.right, right_rows)?;
                (left, right)
            }
            CompoundMode::Independent => (
                self.run_select(&compound.left)?,
                self.run_select(&compound.right)?,
            ),
        };

        tracing::debug!(
            operator = ?compound.operator,
            mode = %self.options.compound_mode,
            left = left.len(),
            right = right.len(),
            "combining set operation"
        );
        Ok(combine(compound.operator, left, right))
    }

    /// Rows for a table reference: an in-scope CTE first (innermost wins),
    /// then the per-execution cache, then the loader.
    pub(crate) fn load_table(&mut self, table: &TableReference) -> QueryResult<Rc<Vec<Record>>> {
        if table.source_kind.is_none()
            && let Some(rows) = self
                .cte_scopes
                .iter()
                .rev()
                .find_map(|scope| scope.get(&table.name))
        {
            return Ok(Rc::clone(rows));
        }

        let kind = table.source_kind.unwrap_or(self.options.default_source);
        let key = (kind, table.name.clone());
        if self.options.cache_sources
            && let Some(rows) = self.source_cache.get(&key)
        {
            tracing::debug!(%kind, name = %table.name, "source cache hit");
            return Ok(Rc::clone(rows));
        }

        let rows = Rc::new(self.loader.load(kind, &table.name)?);
        tracing::debug!(%kind, name = %table.name, rows = rows.len(), "loaded source");
        if self.options.cache_sources {
            self.source_cache.insert(key, Rc::clone(&rows));
        }
        Ok(rows)
    }
}

fn combine(operator: SetOperator, left: Vec<Record>, right: Vec<Record>) -> Vec<Record> {
    match operator {
        SetOperator::Union { all: true } => left.into_iter().chain(right).collect(),
        SetOperator::Union { all: false } => {
            let mut seen = HashSet::new();
            left.into_iter()
                .chain(right)
                .filter(|row| seen.insert(row.canonical()))
                .collect()
        }
        SetOperator::Intersect => {
            let right: HashSet<String> = right.iter().map(Record::canonical).collect();
            left.into_iter()
                .filter(|row| right.contains(&row.canonical()))
                .collect()
        }
        SetOperator::Except => {
            let right: HashSet<String> = right.iter().map(Record::canonical).collect();
            left.into_iter()
                .filter(|row| !right.contains(&row.canonical()))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn ids(values: &[i64]) -> Vec<Record> {
        values
            .iter()
            .map(|&id| [("id", Value::Integer(id))].into_iter().collect())
            .collect()
    }

    #[test]
    fn set_operations_use_canonical_identity() {
        let union = combine(SetOperator::Union { all: false }, ids(&[1, 2]), ids(&[2, 3]));
        assert_eq!(union, ids(&[1, 2, 3]));

        let union_all = combine(SetOperator::Union { all: true }, ids(&[1, 2]), ids(&[2]));
        assert_eq!(union_all, ids(&[1, 2, 2]));

        let intersect = combine(SetOperator::Intersect, ids(&[1, 2, 3]), ids(&[3, 1]));
        assert_eq!(intersect, ids(&[1, 3]));

        let except = combine(SetOperator::Except, ids(&[1, 2, 3]), ids(&[2]));
        assert_eq!(except, ids(&[1, 3]));
    }
}
