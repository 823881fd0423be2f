//! Nested-loop joins.
//!
//! Right-side columns are qualified with the joined table's alias (or name)
//! before matching, so `ON u.id = o.user_id` reads both sides of the merged
//! row. A pair matches only when ON evaluates to exactly `true`.

use std::collections::HashSet;

use crate::{
    ast::{Expr, Join, JoinKind},
    error::QueryResult,
    evaluator::EvalContext,
    record::Record,
    value::Value,
};

impl EvalContext<'_> {
    /// Applies each join in order, feeding the result of one into the next.
    pub fn execute_joins(&mut self, joins: &[Join], left_rows: Vec<Record>) -> QueryResult<Vec<Record>> {
        let mut rows = left_rows;
        for join in joins {
            let loaded = self.load_table(&join.table)?;
            let qualifier = join.table.qualifier();
            let right: Vec<Record> = loaded.iter().map(|r| r.qualified(qualifier)).collect();

            let before = rows.len();
            rows = self.join_rows(join, rows, &right)?;
            tracing::debug!(
                kind = ?join.kind,
                table = %join.table.name,
                left = before,
                right = right.len(),
                output = rows.len(),
                "joined"
            );
        }
        Ok(rows)
    }

    fn join_rows(&mut self, join: &Join, left: Vec<Record>, right: &[Record]) -> QueryResult<Vec<Record>> {
        let on = join.on.as_ref();
        let mut output = Vec::new();

        match join.kind {
            JoinKind::Cross => {
                for l in &left {
                    for r in right {
                        output.push(combine(l, r));
                    }
                }
            }
            JoinKind::Inner => {
                for l in &left {
                    for r in right {
                        let merged = combine(l, r);
                        if self.matches(on, &merged)? {
                            output.push(merged);
                        }
                    }
                }
            }
            JoinKind::Left | JoinKind::Full => {
                let right_nulls = null_extension(right);
                let mut matched_right = vec![false; right.len()];

                for l in &left {
                    let mut matched = false;
                    for (j, r) in right.iter().enumerate() {
                        let merged = combine(l, r);
                        if self.matches(on, &merged)? {
                            matched = true;
                            matched_right[j] = true;
                            output.push(merged);
                        }
                    }
                    if !matched {
                        output.push(combine(l, &right_nulls));
                    }
                }

                if join.kind == JoinKind::Full {
                    let left_nulls = null_extension(&left);
                    for (r, _) in right.iter().zip(matched_right).filter(|(_, m)| !m) {
                        output.push(combine(&left_nulls, r));
                    }
                }
            }
            JoinKind::Right => {
                let left_nulls = null_extension(&left);
                for r in right {
                    let mut matched = false;
                    for l in &left {
                        let merged = combine(l, r);
                        if self.matches(on, &merged)? {
                            matched = true;
                            output.push(merged);
                        }
                    }
                    if !matched {
                        output.push(combine(&left_nulls, r));
                    }
                }
            }
        }

        Ok(output)
    }

    fn matches(&mut self, on: Option<&Expr>, merged: &Record) -> QueryResult<bool> {
        match on {
            Some(predicate) => Ok(matches!(
                self.evaluate(predicate, merged)?,
                Value::Boolean(true)
            )),
            None => Ok(true),
        }
    }
}

fn combine(left: &Record, right: &Record) -> Record {
    let mut merged = left.clone();
    merged.merge(right);
    merged
}

/// A row with every column seen on one side of the join, all null
fn null_extension(rows: &[Record]) -> Record {
    let mut seen = HashSet::new();
    let mut nulls = Record::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.to_string()) {
                nulls.insert(key, Value::Null);
            }
        }
    }
    nulls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_extension_covers_every_key() {
        let rows: Vec<Record> = vec![
            [("a", Value::Integer(1))].into_iter().collect(),
            [("b", Value::Integer(2)), ("a", Value::Integer(3))].into_iter().collect(),
        ];
        let nulls = null_extension(&rows);
        assert_eq!(nulls.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(nulls.iter().all(|(_, v)| v.is_null()));
    }
}
