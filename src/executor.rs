//! Single-query execution over already loaded and joined rows.
//!
//! Clauses always run in the same order: filter, then group/aggregate (with
//! HAVING) or plain projection, then DISTINCT, ORDER BY and LIMIT.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use crate::{
    ast::{BinOp, Expr, GroupBy, Limit, OrderBy, Query},
    error::QueryResult,
    evaluator::{EvalContext, compare_keys},
    record::Record,
    value::{Value, compare_values, index_key},
};

/// A projected row with its ORDER BY keys. Keys are computed during
/// projection, while the row's group and the window population are live.
struct Projected {
    record: Record,
    keys: Vec<Value>,
}

impl EvalContext<'_> {
    /// Runs one query's clauses over `rows`.
    ///
    /// The filtered rows become the window-function population for the
    /// duration of the projection; any previous population is restored
    /// before returning.
    pub fn execute_query(&mut self, query: &Query, rows: Vec<Record>) -> QueryResult<Vec<Record>> {
        let filtered = Rc::new(self.filter_rows(query.where_clause.as_ref(), rows)?);

        let previous = self.set_result_set(Some(Rc::clone(&filtered)));
        let result = self.project(query, &filtered);
        self.set_result_set(previous);
        let mut output = result?;

        if query.distinct {
            let mut seen = HashSet::new();
            output.retain(|row| seen.insert(row.record.canonical()));
        }

        if let Some(order_by) = &query.order_by {
            // Stable: equal keys keep their pre-sort order
            output.sort_by(|a, b| compare_keys(&a.keys, &b.keys, &order_by.directions));
        }

        let records = output.into_iter().map(|row| row.record).collect();
        Ok(apply_limit(records, query.limit))
    }

    // ========================================
    // WHERE
    // ========================================

    pub(crate) fn filter_rows(
        &mut self,
        predicate: Option<&Expr>,
        rows: Vec<Record>,
    ) -> QueryResult<Vec<Record>> {
        let Some(predicate) = predicate else {
            return Ok(rows);
        };

        if self.options.equality_index
            && let Some((column, literal)) = equality_probe(predicate)
        {
            return self.index_filter(column, literal, rows);
        }

        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if self.evaluate(predicate, &row)?.as_bool() {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    /// Hash-index lookup for `column = literal`. Matches keep their input
    /// order.
    fn index_filter(
        &mut self,
        column: &str,
        literal: &Value,
        rows: Vec<Record>,
    ) -> QueryResult<Vec<Record>> {
        let column_expr = Expr::Identifier(column.to_string());
        let mut values = Vec::with_capacity(rows.len());
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            let value = self.evaluate(&column_expr, row)?;
            index.entry(index_key(&value)).or_default().push(i);
            values.push(value);
        }

        // A bucket may hold large integers that only share a float spelling
        let mut keep = vec![false; rows.len()];
        let hits = index.get(&index_key(literal)).map(Vec::as_slice).unwrap_or(&[]);
        for &i in hits {
            keep[i] = compare_values(&values[i], literal) == Ordering::Equal;
        }
        let matched = keep.iter().filter(|k| **k).count();
        tracing::debug!(column, rows = rows.len(), matched, "equality index filter");

        Ok(rows
            .into_iter()
            .zip(keep)
            .filter_map(|(row, keep)| keep.then_some(row))
            .collect())
    }

    // ========================================
    // SELECT / GROUP BY / HAVING
    // ========================================

    fn project(&mut self, query: &Query, rows: &[Record]) -> QueryResult<Vec<Projected>> {
        let fields = &query.select.fields;
        let aggregating = fields.iter().any(Expr::contains_aggregate);

        match &query.group_by {
            Some(group_by) => self.project_groups(query, group_by, rows),
            None if aggregating => {
                // An ungrouped aggregate yields exactly one row, even over no input
                let group: Vec<&Record> = rows.iter().collect();
                Ok(self.project_group(query, &group)?.into_iter().collect())
            }
            None => {
                let mut output = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut projected = Record::with_capacity(fields.len());
                    for field in fields {
                        match field {
                            Expr::Star => projected.merge(row),
                            expr => {
                                let value = self.evaluate(expr, row)?;
                                projected.insert(expr.column_name(), value);
                            }
                        }
                    }
                    let keys = self.sort_keys(query.order_by.as_ref(), &projected, row, None)?;
                    output.push(Projected {
                        record: projected,
                        keys,
                    });
                }
                Ok(output)
            }
        }
    }

    fn project_groups(
        &mut self,
        query: &Query,
        group_by: &GroupBy,
        rows: &[Record],
    ) -> QueryResult<Vec<Projected>> {
        let Some(key_expr) = group_by.key() else {
            return Ok(Vec::new());
        };
        if group_by.fields.len() > 1 {
            tracing::warn!(
                keys = group_by.fields.len(),
                "GROUP BY uses only its first expression"
            );
        }

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&Record>> = HashMap::new();
        for row in rows {
            let key = self.evaluate(key_expr, row)?.as_string();
            let group = groups.entry(key.clone()).or_default();
            if group.is_empty() {
                order.push(key);
            }
            group.push(row);
        }

        let mut output = Vec::with_capacity(order.len());
        for key in &order {
            let group = &groups[key];
            if let Some(row) = self.project_group(query, group)? {
                output.push(row);
            }
        }
        Ok(output)
    }

    /// One output row for a group, or `None` when HAVING rejects it.
    fn project_group(&mut self, query: &Query, group: &[&Record]) -> QueryResult<Option<Projected>> {
        let fields = &query.select.fields;
        let source = group.first().map(|r| (*r).clone()).unwrap_or_default();

        let mut projected = Record::with_capacity(fields.len());
        for field in fields {
            match field {
                Expr::Star => projected.merge(&source),
                expr => {
                    let value = match expr.unaliased() {
                        Expr::FunctionCall { name, args } if expr.is_aggregate_call() => {
                            self.aggregate(name, args, group)?
                        }
                        _ => {
                            let reduced = self.reduce_aggregates(expr, group)?;
                            self.evaluate(&reduced, &source)?
                        }
                    };
                    projected.insert(expr.column_name(), value);
                }
            }
        }

        if let Some(having) = &query.having {
            let condition = self.reduce_aggregates(having, group)?;
            let probe = overlay(&source, &projected);
            if !self.evaluate(&condition, &probe)?.as_bool() {
                return Ok(None);
            }
        }

        let keys = self.sort_keys(query.order_by.as_ref(), &projected, &source, Some(group))?;
        Ok(Some(Projected {
            record: projected,
            keys,
        }))
    }

    /// Replace every aggregate call inside `expr` with its value over `group`.
    fn reduce_aggregates(&mut self, expr: &Expr, group: &[&Record]) -> QueryResult<Expr> {
        if !expr.contains_aggregate() {
            return Ok(expr.clone());
        }

        let reduced = match expr {
            Expr::FunctionCall { name, args } if expr.is_aggregate_call() => {
                Expr::Literal(self.aggregate(name, args, group)?)
            }
            Expr::FunctionCall { name, args } => Expr::FunctionCall {
                name: name.clone(),
                args: self.reduce_all(args, group)?,
            },
            Expr::Alias { expr, name } => Expr::Alias {
                expr: Box::new(self.reduce_aggregates(expr, group)?),
                name: name.clone(),
            },
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(self.reduce_aggregates(left, group)?),
                op: *op,
                right: Box::new(self.reduce_aggregates(right, group)?),
            },
            Expr::In {
                left,
                candidates,
                negated,
            } => Expr::In {
                left: Box::new(self.reduce_aggregates(left, group)?),
                candidates: self.reduce_all(candidates, group)?,
                negated: *negated,
            },
            Expr::Like {
                left,
                pattern,
                negated,
            } => Expr::Like {
                left: Box::new(self.reduce_aggregates(left, group)?),
                pattern: Box::new(self.reduce_aggregates(pattern, group)?),
                negated: *negated,
            },
            Expr::Case {
                when_clauses,
                else_expr,
            } => {
                let mut reduced_whens = Vec::with_capacity(when_clauses.len());
                for (condition, result) in when_clauses {
                    reduced_whens.push((
                        self.reduce_aggregates(condition, group)?,
                        self.reduce_aggregates(result, group)?,
                    ));
                }
                let else_expr = match else_expr {
                    Some(e) => Some(Box::new(self.reduce_aggregates(e, group)?)),
                    None => None,
                };
                Expr::Case {
                    when_clauses: reduced_whens,
                    else_expr,
                }
            }
            other => other.clone(),
        };
        Ok(reduced)
    }

    fn reduce_all(&mut self, exprs: &[Expr], group: &[&Record]) -> QueryResult<Vec<Expr>> {
        exprs
            .iter()
            .map(|e| self.reduce_aggregates(e, group))
            .collect()
    }

    // ========================================
    // ORDER BY
    // ========================================

    /// ORDER BY keys for one output row. Keys see the projected columns over
    /// the source row. Window keys see the source row alone, and aggregate
    /// keys reduce over the row's group.
    fn sort_keys(
        &mut self,
        order_by: Option<&OrderBy>,
        projected: &Record,
        source: &Record,
        group: Option<&[&Record]>,
    ) -> QueryResult<Vec<Value>> {
        let Some(order_by) = order_by else {
            return Ok(Vec::new());
        };

        let probe = overlay(source, projected);
        let mut keys = Vec::with_capacity(order_by.fields.len());
        for expr in &order_by.fields {
            let key = match (expr.unaliased(), group) {
                (Expr::Window { .. }, _) => self.evaluate(expr, source)?,
                (_, Some(group)) if expr.contains_aggregate() => {
                    let reduced = self.reduce_aggregates(expr, group)?;
                    self.evaluate(&reduced, &probe)?
                }
                _ => self.evaluate(expr, &probe)?,
            };
            keys.push(key);
        }
        Ok(keys)
    }
}

/// `identifier = literal` in either operand order
fn equality_probe(predicate: &Expr) -> Option<(&str, &Value)> {
    match predicate {
        Expr::Binary {
            left,
            op: BinOp::Equal,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (Expr::Identifier(column), Expr::Literal(value))
            | (Expr::Literal(value), Expr::Identifier(column)) => Some((column, value)),
            _ => None,
        },
        _ => None,
    }
}

fn overlay(base: &Record, top: &Record) -> Record {
    let mut merged = base.clone();
    merged.merge(top);
    merged
}

fn apply_limit(rows: Vec<Record>, limit: Option<Limit>) -> Vec<Record> {
    let Some(limit) = limit else {
        return rows;
    };
    let offset = limit.offset.min(rows.len());
    let count = limit.count.unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: i64) -> Vec<Record> {
        (1..=n)
            .map(|i| [("n", Value::Integer(i))].into_iter().collect())
            .collect()
    }

    #[test]
    fn limit_and_offset_clamp() {
        let limit = |count, offset| Some(Limit { count, offset });
        assert_eq!(apply_limit(numbered(5), limit(Some(2), 1)).len(), 2);
        assert_eq!(apply_limit(numbered(5), limit(Some(10), 3)).len(), 2);
        assert!(apply_limit(numbered(5), limit(None, 9)).is_empty());
        assert_eq!(apply_limit(numbered(5), None).len(), 5);
    }

    #[test]
    fn equality_probe_accepts_either_side() {
        let column = Expr::Identifier("id".into());
        let literal = Expr::Literal(Value::Integer(3));

        let forward = Expr::binary(column.clone(), BinOp::Equal, literal.clone());
        let reverse = Expr::binary(literal.clone(), BinOp::Equal, column.clone());
        let ranged = Expr::binary(column, BinOp::LessThan, literal);

        assert_eq!(equality_probe(&forward), Some(("id", &Value::Integer(3))));
        assert_eq!(equality_probe(&reverse), Some(("id", &Value::Integer(3))));
        assert_eq!(equality_probe(&ranged), None);
    }
}
