//! Result shaping: projection, DISTINCT, ORDER BY, aggregation.
//!
//! The session picks exactly one mode before iteration starts:
//!
//! - **Projection** streams each row through the projection expressions,
//!   optionally deduplicating via a canonical-string set.
//! - **ORDER BY** buffers tagged values, stable-sorts them under the
//!   fixed comparison ladder, then writes.
//! - **Aggregation** reduces a single aggregate expression.

use std::cmp::Ordering;

use crate::datum::Value;
use crate::db::Database;
use crate::sql::{AggregateFunc, ColumnRef, Expr, OrderByItem, SelectItem};

use super::error::ExecutorError;
use super::Relation;

/// The projection of a SELECT: expressions plus their header texts.
#[derive(Debug, Clone)]
pub struct Projection {
    /// One expression per output column.
    pub exprs: Vec<Expr>,
    /// Header line cells, comma-joined by the writer.
    pub headers: Vec<String>,
}

/// Expands the SELECT list into concrete projection expressions.
///
/// `SELECT *` becomes every declared column of every relation in
/// statement order (declaration order within a table, `__rowid__`
/// excluded) with `relation.column` headers. Explicit expressions keep
/// their rendered text as header.
pub fn build_projection(
    db: &Database,
    relations: &[Relation],
    items: &[SelectItem],
) -> Projection {
    let mut exprs = Vec::new();
    let mut headers = Vec::new();

    for item in items {
        match item {
            SelectItem::Wildcard => {
                for relation in relations {
                    let table = db.table(relation.table_id);
                    for col in table.columns() {
                        exprs.push(Expr::Column(ColumnRef {
                            table: Some(relation.live_name.clone()),
                            column: col.name.clone(),
                        }));
                        headers.push(format!("{}.{}", relation.live_name, col.name));
                    }
                }
            }
            SelectItem::Expr(expr) => {
                headers.push(expr.to_string());
                exprs.push(expr.clone());
            }
        }
    }

    Projection { exprs, headers }
}

/// Canonical string form of a projected row, used as the DISTINCT key:
/// display texts joined by `|`.
pub fn row_key(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_text)
        .collect::<Vec<_>>()
        .join("|")
}

/// Resolves ORDER BY items against the projection.
///
/// A key matches the first projected expression that is a column
/// reference with the same column name. Items that match nothing are
/// dropped, not errors.
pub fn resolve_order_keys(
    projection: &Projection,
    order_by: &[OrderByItem],
) -> Vec<(usize, bool)> {
    let mut keys = Vec::new();
    for item in order_by {
        let position = projection.exprs.iter().position(|expr| {
            matches!(expr, Expr::Column(col) if col.column == item.column)
        });
        if let Some(position) = position {
            keys.push((position, item.ascending));
        }
    }
    keys
}

/// Compares two buffered rows under the ORDER BY keys.
///
/// Per key: NULL sorts before non-NULL regardless of direction, values
/// compare under the engine's comparison rules, incompatible types skip
/// the key, ties fall through to the next key. Full ties return `Equal`
/// so a stable sort preserves iteration order.
pub fn compare_rows(a: &[Value], b: &[Value], keys: &[(usize, bool)]) -> Ordering {
    for &(idx, ascending) in keys {
        let (va, vb) = (&a[idx], &b[idx]);
        match (va.is_null(), vb.is_null()) {
            (true, true) => continue,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        match va.compare(vb) {
            Some(Ordering::Equal) | None => continue,
            Some(ordering) => {
                return if ascending {
                    ordering
                } else {
                    ordering.reverse()
                };
            }
        }
    }
    Ordering::Equal
}

/// Single-expression aggregate reducer.
///
/// `COUNT(*)` counts matching rows, `COUNT(e)` counts non-NULL
/// evaluations; the numeric reducers skip NULL inputs and reject
/// non-numeric ones. `AVG` divides by the number of matching rows and
/// yields 0 over an empty input.
#[derive(Debug)]
pub struct Aggregator {
    func: AggregateFunc,
    /// Matching rows seen (AVG denominator).
    rows: u64,
    /// COUNT numerator.
    counted: u64,
    /// Non-NULL numeric inputs seen.
    non_null: u64,
    sum_int: i64,
    sum_float: f64,
    saw_float: bool,
    best: Option<Value>,
}

impl Aggregator {
    /// Creates a reducer for one aggregate function.
    pub fn new(func: AggregateFunc) -> Self {
        Self {
            func,
            rows: 0,
            counted: 0,
            non_null: 0,
            sum_int: 0,
            sum_float: 0.0,
            saw_float: false,
            best: None,
        }
    }

    /// Number of matching rows folded so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Folds one row; `value` is `None` for `COUNT(*)`.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::TypeMismatch` for non-numeric inputs to
    /// SUM/AVG/MIN/MAX and `IntegerOverflow` for an overflowing SUM.
    pub fn update(&mut self, value: Option<Value>) -> Result<(), ExecutorError> {
        self.rows += 1;

        match self.func {
            AggregateFunc::Count => match value {
                None => self.counted += 1,
                Some(v) if !v.is_null() => self.counted += 1,
                Some(_) => {}
            },
            AggregateFunc::Sum | AggregateFunc::Avg => match value {
                Some(Value::Int(n)) => {
                    self.non_null += 1;
                    self.sum_int = self
                        .sum_int
                        .checked_add(n)
                        .ok_or(ExecutorError::IntegerOverflow)?;
                }
                Some(Value::Float(n)) => {
                    self.non_null += 1;
                    self.saw_float = true;
                    self.sum_float += n;
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(ExecutorError::TypeMismatch {
                        expected: "numeric aggregate input".to_string(),
                        found: other.type_name().to_string(),
                    });
                }
            },
            AggregateFunc::Min | AggregateFunc::Max => match value {
                Some(v @ (Value::Int(_) | Value::Float(_))) => {
                    self.non_null += 1;
                    let replace = match &self.best {
                        None => true,
                        Some(best) => {
                            let ordering =
                                v.compare(best).unwrap_or(Ordering::Equal);
                            match self.func {
                                AggregateFunc::Min => ordering == Ordering::Less,
                                _ => ordering == Ordering::Greater,
                            }
                        }
                    };
                    if replace {
                        self.best = Some(v);
                    }
                }
                Some(Value::Null) | None => {}
                Some(other) => {
                    return Err(ExecutorError::TypeMismatch {
                        expected: "numeric aggregate input".to_string(),
                        found: other.type_name().to_string(),
                    });
                }
            },
        }
        Ok(())
    }

    /// Produces the final aggregate value.
    pub fn finish(&self) -> Value {
        match self.func {
            AggregateFunc::Count => Value::Int(self.counted as i64),
            AggregateFunc::Sum => {
                if self.non_null == 0 {
                    Value::Null
                } else if self.saw_float {
                    Value::Float(self.sum_float + self.sum_int as f64)
                } else {
                    Value::Int(self.sum_int)
                }
            }
            AggregateFunc::Avg => {
                if self.rows == 0 {
                    Value::Float(0.0)
                } else {
                    Value::Float((self.sum_float + self.sum_int as f64) / self.rows as f64)
                }
            }
            AggregateFunc::Min | AggregateFunc::Max => {
                self.best.clone().unwrap_or(Value::Null)
            }
        }
    }
}
