use std::{cmp::Ordering, collections::HashMap, rc::Rc};

use regex::Regex;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{
    ast::{BinOp, Direction, Expr, OrderBy, Statement},
    config::EngineOptions,
    error::QueryResult,
    record::Record,
    source::{SourceKind, SourceLoader},
    value::{Value, compare_values},
};

/// State for one statement execution.
///
/// Created fresh for every top-level query and dropped when it finishes, so
/// nothing here is shared between concurrent executions. Besides evaluating
/// expressions it carries:
///
/// - a stack of enclosing rows for correlated subqueries (innermost last),
/// - the filtered-row snapshot window functions partition over,
/// - CTE scopes and a per-execution cache of loaded sources.
pub struct EvalContext<'a> {
    pub(crate) loader: &'a dyn SourceLoader,
    pub(crate) options: &'a EngineOptions,
    pub(crate) outer_rows: Vec<Record>,
    pub(crate) current_result_set: Option<Rc<Vec<Record>>>,
    pub(crate) cte_scopes: Vec<HashMap<String, Rc<Vec<Record>>>>,
    pub(crate) source_cache: HashMap<(SourceKind, String), Rc<Vec<Record>>>,
    regex_cache: HashMap<String, Option<Regex>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(loader: &'a dyn SourceLoader, options: &'a EngineOptions) -> Self {
        EvalContext {
            loader,
            options,
            outer_rows: Vec::new(),
            current_result_set: None,
            cte_scopes: Vec::new(),
            source_cache: HashMap::new(),
            regex_cache: HashMap::new(),
        }
    }

    /// Make `rows` the population for window functions, returning the
    /// previous snapshot so the caller can restore it.
    pub fn set_result_set(&mut self, rows: Option<Rc<Vec<Record>>>) -> Option<Rc<Vec<Record>>> {
        std::mem::replace(&mut self.current_result_set, rows)
    }

    /// Evaluates an expression against one row.
    ///
    /// Only structural failures (a subquery whose source cannot be loaded)
    /// are errors. Type mismatches, missing columns, unknown functions and
    /// division by zero all evaluate to `Value::Null`.
    ///
    /// # Examples
    ///
    /// ```
    /// use recql::{EngineOptions, EvalContext, InMemorySource, Record, Value};
    /// use recql::ast::{BinOp, Expr};
    ///
    /// let source = InMemorySource::new();
    /// let options = EngineOptions::default();
    /// let mut ctx = EvalContext::new(&source, &options);
    ///
    /// let row: Record = [("price", Value::from("12"))].into_iter().collect();
    /// let expr = Expr::binary(
    ///     Expr::Identifier("price".into()),
    ///     BinOp::Multiply,
    ///     Expr::Literal(Value::Integer(2)),
    /// );
    /// assert_eq!(ctx.evaluate(&expr, &row).unwrap(), Value::Integer(24));
    /// ```
    pub fn evaluate(&mut self, expr: &Expr, row: &Record) -> QueryResult<Value> {
        match expr {
            Expr::Identifier(name) => Ok(self.resolve_identifier(name, row)),
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Alias { expr, .. } => self.evaluate(expr, row),
            Expr::Binary {
                left,
                op: BinOp::And,
                right,
            } => {
                if !self.evaluate(left, row)?.as_bool() {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(self.evaluate(right, row)?.as_bool()))
            }
            Expr::Binary { left, op, right } => {
                let left_val = self.evaluate(left, row)?;
                let right_val = self.evaluate(right, row)?;
                Ok(apply_binop(*op, &left_val, &right_val))
            }
            Expr::In {
                left,
                candidates,
                negated,
            } => {
                let needle = self.evaluate(left, row)?;
                let mut found = false;
                for candidate in candidates {
                    let values: Vec<Value> = match candidate {
                        Expr::Subquery(statement) => self
                            .run_subquery(statement, row)?
                            .iter()
                            .map(|r| r.first_value().cloned().unwrap_or(Value::Null))
                            .collect(),
                        other => vec![self.evaluate(other, row)?],
                    };
                    if values
                        .iter()
                        .any(|v| compare_values(&needle, v) == Ordering::Equal)
                    {
                        found = true;
                        break;
                    }
                }
                Ok(Value::Boolean(found != *negated))
            }
            Expr::Like {
                left,
                pattern,
                negated,
            } => {
                let haystack = self.evaluate(left, row)?.as_string();
                let pattern = self.evaluate(pattern, row)?.as_string();
                let needle = pattern.trim_matches('%');
                Ok(Value::Boolean(haystack.contains(needle) != *negated))
            }
            Expr::FunctionCall { name, args } => self.eval_function(name, args, row),
            Expr::Window {
                function,
                partition_by,
                order_by,
            } => self.eval_window(function, partition_by, order_by.as_ref(), row),
            Expr::Case {
                when_clauses,
                else_expr,
            } => {
                for (condition, result) in when_clauses {
                    if self.evaluate(condition, row)?.as_bool() {
                        return self.evaluate(result, row);
                    }
                }
                match else_expr {
                    Some(else_expr) => self.evaluate(else_expr, row),
                    None => Ok(Value::Null),
                }
            }
            // Only meaningful in a projection list or COUNT(*)
            Expr::Star => Ok(Value::Null),
            Expr::Subquery(statement) => {
                let rows = self.run_subquery(statement, row)?;
                Ok(rows
                    .first()
                    .and_then(Record::first_value)
                    .cloned()
                    .unwrap_or(Value::Null))
            }
        }
    }

    /// Current row first, then enclosing rows from the innermost outwards.
    /// Exact names are tried across every scope before relaxed matches.
    fn resolve_identifier(&self, name: &str, row: &Record) -> Value {
        let scopes = || std::iter::once(row).chain(self.outer_rows.iter().rev());

        if let Some(value) = scopes().find_map(|r| r.get(name)) {
            return value.clone();
        }
        scopes()
            .find_map(|r| r.lookup(name))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn run_subquery(&mut self, statement: &Statement, row: &Record) -> QueryResult<Vec<Record>> {
        self.outer_rows.push(row.clone());
        let result = self.execute_statement(statement);
        self.outer_rows.pop();
        result
    }

    /// Sort keys for one row, in ORDER BY order
    pub(crate) fn order_keys(&mut self, order_by: &OrderBy, row: &Record) -> QueryResult<Vec<Value>> {
        order_by
            .fields
            .iter()
            .map(|expr| self.evaluate(expr, row))
            .collect()
    }

    fn partition_key(&mut self, partition_by: &[Expr], row: &Record) -> QueryResult<String> {
        if partition_by.is_empty() {
            return Ok("all".to_string());
        }
        let parts = partition_by
            .iter()
            .map(|expr| self.evaluate(expr, row).map(|v| v.as_string()))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(parts.join("|"))
    }

    fn eval_window(
        &mut self,
        function: &Expr,
        partition_by: &[Expr],
        order_by: Option<&OrderBy>,
        row: &Record,
    ) -> QueryResult<Value> {
        let Some(population) = self.current_result_set.clone() else {
            return Ok(Value::Null);
        };
        let Expr::FunctionCall { name, args } = function.unaliased() else {
            return Ok(Value::Null);
        };

        let key = self.partition_key(partition_by, row)?;
        let mut partition: Vec<&Record> = Vec::new();
        for candidate in population.iter() {
            if self.partition_key(partition_by, candidate)? == key {
                partition.push(candidate);
            }
        }

        match name.as_str() {
            "COUNT" => Ok(Value::Integer(partition.len() as i64)),
            "ROW_NUMBER" => {
                if let Some(order_by) = order_by {
                    let mut keyed = Vec::with_capacity(partition.len());
                    for candidate in partition {
                        keyed.push((self.order_keys(order_by, candidate)?, candidate));
                    }
                    keyed.sort_by(|a, b| compare_keys(&a.0, &b.0, &order_by.directions));
                    partition = keyed.into_iter().map(|(_, r)| r).collect();
                }

                // Duplicate rows share a canonical form; the first wins
                let target = row.canonical();
                Ok(partition
                    .iter()
                    .position(|r| r.canonical() == target)
                    .map(|i| Value::Integer(i as i64 + 1))
                    .unwrap_or(Value::Null))
            }
            other if crate::ast::AGGREGATE_FUNCTIONS.contains(&other) => {
                self.aggregate(other, args, &partition)
            }
            other => {
                tracing::debug!(function = other, "unsupported window function");
                Ok(Value::Null)
            }
        }
    }

    /// Reduce an aggregate function over a set of rows.
    ///
    /// Non-numeric inputs are skipped. Over no rows COUNT and SUM give 0 and
    /// the others give null.
    pub(crate) fn aggregate(
        &mut self,
        name: &str,
        args: &[Expr],
        rows: &[&Record],
    ) -> QueryResult<Value> {
        if name == "COUNT" {
            return Ok(Value::Integer(rows.len() as i64));
        }

        let mut numbers = Vec::with_capacity(rows.len());
        if let Some(arg) = args.first() {
            for row in rows {
                if let Some(n) = self.evaluate(arg, row)?.to_number() {
                    numbers.push(n);
                }
            }
        }

        let min = || {
            numbers
                .iter()
                .min_by(|a, b| compare_values(a, b))
                .cloned()
                .unwrap_or(Value::Null)
        };
        let max = || {
            numbers
                .iter()
                .max_by(|a, b| compare_values(a, b))
                .cloned()
                .unwrap_or(Value::Null)
        };

        let result = match name {
            "SUM" => sum(&numbers),
            "AVG" if numbers.is_empty() => Value::Null,
            "AVG" => {
                let total = sum(&numbers).as_float().unwrap_or(0.0);
                Value::Float(total / numbers.len() as f64)
            }
            "MIN" => min(),
            "MAX" => max(),
            "DIFF" if numbers.is_empty() => Value::Null,
            "DIFF" => arithmetic(BinOp::Subtract, &max(), &min()),
            _ => Value::Null,
        };
        Ok(result)
    }

    fn eval_function(&mut self, name: &str, args: &[Expr], row: &Record) -> QueryResult<Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg, row)?);
        }

        let result = match (name, values.as_slice()) {
            ("COALESCE", values) => values
                .iter()
                .find(|v| !v.is_null() && *v != &Value::String(String::new()))
                .cloned()
                .unwrap_or(Value::Null),
            ("CONCAT", values) => {
                Value::String(values.iter().map(Value::as_string).collect::<String>())
            }
            ("IF", [condition, then, otherwise]) => {
                if condition.as_bool() {
                    then.clone()
                } else {
                    otherwise.clone()
                }
            }
            ("SUBSTR" | "SUBSTRING", [s, start]) => substring(s, start, None),
            ("SUBSTR" | "SUBSTRING", [s, start, len]) => substring(s, start, Some(len)),
            ("LENGTH" | "LEN", [Value::Null]) => Value::Null,
            ("LENGTH" | "LEN", [s]) => Value::Integer(s.as_string().chars().count() as i64),
            ("UPPER", [Value::Null]) | ("LOWER", [Value::Null]) | ("TRIM", [Value::Null]) => {
                Value::Null
            }
            ("UPPER", [s]) => Value::String(s.as_string().to_uppercase()),
            ("LOWER", [s]) => Value::String(s.as_string().to_lowercase()),
            ("TRIM", [s]) => Value::String(s.as_string().trim().to_string()),
            ("ABS", [n]) => match n.to_number() {
                Some(Value::Integer(i)) => i.checked_abs().map(Value::Integer).unwrap_or(Value::Null),
                Some(Value::Float(f)) => Value::Float(f.abs()),
                _ => Value::Null,
            },
            ("ROUND", [n]) => round(n, 0),
            ("ROUND", [n, digits]) => match digits.to_number() {
                Some(Value::Integer(d)) if d >= 0 => round(n, d as u32),
                _ => Value::Null,
            },
            ("REPLACE", [s, from, to]) if !s.is_null() => {
                let from = from.as_string();
                if from.is_empty() {
                    s.clone()
                } else {
                    Value::String(s.as_string().replace(&from, &to.as_string()))
                }
            }
            ("REGEXP_LIKE", [s, pattern]) => match self.regex(&pattern.as_string()) {
                Some(re) if !s.is_null() => Value::Boolean(re.is_match(&s.as_string())),
                _ => Value::Null,
            },
            (other, _) => {
                // Aggregates only reach here outside an aggregating context
                if !crate::ast::AGGREGATE_FUNCTIONS.contains(&other) {
                    tracing::debug!(
                        function = other,
                        args = values.len(),
                        "unknown function or wrong argument count"
                    );
                }
                Value::Null
            }
        };
        Ok(result)
    }

    fn regex(&mut self, pattern: &str) -> Option<&Regex> {
        self.regex_cache
            .entry(pattern.to_string())
            .or_insert_with(|| Regex::new(pattern).ok())
            .as_ref()
    }
}

/// Compare two key tuples, honouring per-key direction; ties fall through
/// to the next key.
pub(crate) fn compare_keys(a: &[Value], b: &[Value], directions: &[Direction]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let ordering = match directions.get(i).copied().unwrap_or_default() {
            Direction::Asc => compare_values(x, y),
            Direction::Desc => compare_values(y, x),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Value {
    match op {
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide => {
            arithmetic(op, left, right)
        }
        BinOp::Equal => Value::Boolean(compare_values(left, right) == Ordering::Equal),
        BinOp::NotEqual => Value::Boolean(compare_values(left, right) != Ordering::Equal),
        BinOp::LessThan => Value::Boolean(compare_values(left, right) == Ordering::Less),
        BinOp::GreaterThan => Value::Boolean(compare_values(left, right) == Ordering::Greater),
        BinOp::LessEqual => Value::Boolean(compare_values(left, right) != Ordering::Greater),
        BinOp::GreaterEqual => Value::Boolean(compare_values(left, right) != Ordering::Less),
        BinOp::IsNull => Value::Boolean(left.is_null()),
        BinOp::IsNotNull => Value::Boolean(!left.is_null()),
        BinOp::And => Value::Boolean(left.as_bool() && right.as_bool()),
    }
}

/// Arithmetic over coerced numbers. Integers stay integers while the result
/// is exact; mixed operands go through `Decimal` to avoid binary float
/// artefacts. Non-numeric operands and division by zero give null.
pub(crate) fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Value {
    let (Some(a), Some(b)) = (left.to_number(), right.to_number()) else {
        return Value::Null;
    };

    if let (Value::Integer(a), Value::Integer(b)) = (&a, &b) {
        let (a, b) = (*a, *b);
        let exact = match op {
            BinOp::Add => a.checked_add(b),
            BinOp::Subtract => a.checked_sub(b),
            BinOp::Multiply => a.checked_mul(b),
            BinOp::Divide if b == 0 => return Value::Null,
            BinOp::Divide if a.checked_rem(b) == Some(0) => a.checked_div(b),
            BinOp::Divide => return Value::Float(a as f64 / b as f64),
            _ => return Value::Null,
        };
        if let Some(n) = exact {
            return Value::Integer(n);
        }
    }

    let (x, y) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
    if op == BinOp::Divide && y == 0.0 {
        return Value::Null;
    }

    if let Some(xd) = Decimal::from_f64(x)
        && let Some(yd) = Decimal::from_f64(y)
    {
        let rd = match op {
            BinOp::Add => xd.checked_add(yd),
            BinOp::Subtract => xd.checked_sub(yd),
            BinOp::Multiply => xd.checked_mul(yd),
            BinOp::Divide => xd.checked_div(yd),
            _ => None,
        };
        if let Some(rd) = rd {
            if rd.is_integer()
                && let Some(r) = rd.to_i64()
            {
                return Value::Integer(r);
            } else if let Some(r) = rd.to_f64() {
                return Value::Float(r);
            }
        }
    }

    let result = match op {
        BinOp::Add => x + y,
        BinOp::Subtract => x - y,
        BinOp::Multiply => x * y,
        BinOp::Divide => x / y,
        _ => return Value::Null,
    };
    if result.is_finite() {
        Value::Float(result)
    } else {
        Value::Null
    }
}

fn sum(numbers: &[Value]) -> Value {
    numbers
        .iter()
        .fold(Value::Integer(0), |acc, n| arithmetic(BinOp::Add, &acc, n))
}

fn round(n: &Value, digits: u32) -> Value {
    match n.to_number() {
        Some(Value::Integer(i)) => Value::Integer(i),
        Some(Value::Float(f)) => {
            let Some(d) = Decimal::from_f64(f) else {
                return Value::Null;
            };
            let rounded = d.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
            if digits == 0
                && let Some(i) = rounded.to_i64()
            {
                Value::Integer(i)
            } else {
                rounded.to_f64().map(Value::Float).unwrap_or(Value::Null)
            }
        }
        _ => Value::Null,
    }
}

/// 1-based SUBSTR; a start or length outside the string gives ""
fn substring(s: &Value, start: &Value, len: Option<&Value>) -> Value {
    if s.is_null() {
        return Value::Null;
    }
    let chars: Vec<char> = s.as_string().chars().collect();

    let Some(Value::Integer(start)) = start.to_number() else {
        return Value::Null;
    };
    if start < 1 || start as usize > chars.len() {
        return Value::String(String::new());
    }
    let from = start as usize - 1;

    let to = match len.map(Value::to_number) {
        None => chars.len(),
        Some(Some(Value::Integer(n))) if n >= 0 => (from + n as usize).min(chars.len()),
        Some(Some(Value::Integer(_))) => return Value::String(String::new()),
        Some(_) => return Value::Null,
    };
    Value::String(chars[from..to].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_arithmetic_stays_exact() {
        assert_eq!(
            arithmetic(BinOp::Add, &Value::Integer(2), &Value::from("3")),
            Value::Integer(5)
        );
        assert_eq!(
            arithmetic(BinOp::Divide, &Value::Integer(7), &Value::Integer(2)),
            Value::Float(3.5)
        );
    }

    #[test]
    fn mixed_arithmetic_uses_decimal() {
        assert_eq!(
            arithmetic(BinOp::Add, &Value::Float(0.1), &Value::Float(0.2)),
            Value::Float(0.3)
        );
        assert_eq!(
            arithmetic(BinOp::Multiply, &Value::Integer(100), &Value::Float(1.1)),
            Value::Integer(110)
        );
    }

    #[test]
    fn division_by_zero_is_null() {
        assert_eq!(
            arithmetic(BinOp::Divide, &Value::Integer(1), &Value::Integer(0)),
            Value::Null
        );
        assert_eq!(
            arithmetic(BinOp::Divide, &Value::Float(1.5), &Value::from("0.0")),
            Value::Null
        );
    }

    #[test]
    fn integer_overflow_leaves_the_integer_path() {
        assert_eq!(
            arithmetic(BinOp::Divide, &Value::Integer(i64::MIN), &Value::Integer(-1)),
            Value::Float(9223372036854775808.0)
        );
        assert_eq!(
            arithmetic(BinOp::Divide, &Value::from("-9223372036854775808"), &Value::from("-1")),
            Value::Float(9223372036854775808.0)
        );
        assert_eq!(
            arithmetic(BinOp::Add, &Value::Integer(i64::MAX), &Value::Integer(1)),
            Value::Float(9223372036854775808.0)
        );
    }

    #[test]
    fn non_numeric_arithmetic_is_null() {
        assert_eq!(
            arithmetic(BinOp::Add, &Value::from("a"), &Value::Integer(1)),
            Value::Null
        );
    }

    #[test]
    fn substring_clamps() {
        let s = Value::from("hello");
        assert_eq!(
            substring(&s, &Value::Integer(2), Some(&Value::Integer(3))),
            Value::from("ell")
        );
        assert_eq!(
            substring(&s, &Value::Integer(4), Some(&Value::Integer(10))),
            Value::from("lo")
        );
        assert_eq!(substring(&s, &Value::Integer(9), None), Value::from(""));
        assert_eq!(substring(&s, &Value::Integer(0), None), Value::from(""));
    }

    #[test]
    fn round_half_away_from_zero() {
        assert_eq!(round(&Value::Float(2.5), 0), Value::Integer(3));
        assert_eq!(round(&Value::from("1.235"), 2), Value::Float(1.24));
    }

    #[test]
    fn descending_keys_reverse_order() {
        let a = [Value::Integer(1), Value::from("x")];
        let b = [Value::Integer(1), Value::from("y")];
        assert_eq!(
            compare_keys(&a, &b, &[Direction::Asc, Direction::Desc]),
            Ordering::Greater
        );
        assert_eq!(compare_keys(&a, &a, &[Direction::Asc]), Ordering::Equal);
    }
}
