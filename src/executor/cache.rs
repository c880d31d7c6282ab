//! Row-evaluation cache.
//!
//! The cache makes the current tuple of each relation visible to the
//! expression evaluator by `(relation, column)` lookup. Before any
//! predicate runs against a candidate tuple, the executor publishes the
//! decoded row under the relation's live name, shadowing the previous
//! publication until the iterator moves.
//!
//! The cache is statement-scoped: the session wraps each statement in a
//! [`RowCacheGuard`], whose destruction clears the map, so no column
//! reference can resolve across statement boundaries.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use crate::datum::Value;
use crate::heap::Record;
use crate::table::{ColumnMeta, ROWID_COLUMN};

use super::error::ExecutorError;

/// Statement-scoped map from `(relation, column)` to the current value.
#[derive(Debug, Default)]
pub struct RowCache {
    relations: HashMap<String, HashMap<String, Value>>,
}

impl RowCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when nothing is published.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Drops every publication.
    pub fn clear(&mut self) {
        self.relations.clear();
    }

    /// Publishes one relation's current row, replacing its previous one.
    ///
    /// Every declared column is published by name, plus the trailing
    /// `__rowid__`.
    pub fn publish_row(&mut self, relation: &str, columns: &[ColumnMeta], record: &Record) {
        let mut row = HashMap::with_capacity(record.len());
        for (col, value) in columns.iter().zip(record.values.iter()) {
            row.insert(col.name.clone(), value.clone());
        }
        if record.len() > columns.len() {
            row.insert(
                ROWID_COLUMN.to_string(),
                record.values[columns.len()].clone(),
            );
        }
        self.relations.insert(relation.to_string(), row);
    }

    /// Resolves a column reference against the published rows.
    ///
    /// Qualified references look up the relation directly; unqualified
    /// ones search every published relation and must match exactly once.
    pub fn resolve(
        &self,
        relation: Option<&str>,
        column: &str,
    ) -> Result<&Value, ExecutorError> {
        match relation {
            Some(relation) => self
                .relations
                .get(relation)
                .ok_or_else(|| ExecutorError::TableNotFound {
                    name: relation.to_string(),
                })?
                .get(column)
                .ok_or_else(|| ExecutorError::ColumnNotFound {
                    name: format!("{}.{}", relation, column),
                }),
            None => {
                let mut found = None;
                for row in self.relations.values() {
                    if let Some(value) = row.get(column) {
                        if found.is_some() {
                            return Err(ExecutorError::AmbiguousColumn {
                                name: column.to_string(),
                            });
                        }
                        found = Some(value);
                    }
                }
                found.ok_or_else(|| ExecutorError::ColumnNotFound {
                    name: column.to_string(),
                })
            }
        }
    }
}

/// Scope guard clearing the cache when the statement ends.
///
/// Creation does nothing; destruction is the clear.
pub struct RowCacheGuard<'a> {
    cache: &'a mut RowCache,
}

impl<'a> RowCacheGuard<'a> {
    /// Wraps the cache for the duration of one statement.
    pub fn new(cache: &'a mut RowCache) -> Self {
        Self { cache }
    }
}

impl Drop for RowCacheGuard<'_> {
    fn drop(&mut self) {
        self.cache.clear();
    }
}

impl Deref for RowCacheGuard<'_> {
    type Target = RowCache;

    fn deref(&self) -> &RowCache {
        self.cache
    }
}

impl DerefMut for RowCacheGuard<'_> {
    fn deref_mut(&mut self) -> &mut RowCache {
        self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Type;

    fn columns() -> Vec<ColumnMeta> {
        ["a", "b"]
            .into_iter()
            .map(|name| ColumnMeta {
                name: name.to_string(),
                ty: Type::Int,
                not_null: false,
                unique: false,
                primary_key: false,
                default: None,
            })
            .collect()
    }

    #[test]
    fn test_publish_and_resolve() {
        let mut cache = RowCache::new();
        let record = Record::new(vec![Value::Int(1), Value::Int(2), Value::Int(100)]);
        cache.publish_row("t", &columns(), &record);

        assert_eq!(cache.resolve(Some("t"), "a").unwrap(), &Value::Int(1));
        assert_eq!(cache.resolve(None, "b").unwrap(), &Value::Int(2));
        assert_eq!(
            cache.resolve(Some("t"), ROWID_COLUMN).unwrap(),
            &Value::Int(100)
        );
        assert!(matches!(
            cache.resolve(Some("t"), "missing"),
            Err(ExecutorError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            cache.resolve(Some("u"), "a"),
            Err(ExecutorError::TableNotFound { .. })
        ));
    }

    #[test]
    fn test_shadowing() {
        let mut cache = RowCache::new();
        cache.publish_row(
            "t",
            &columns(),
            &Record::new(vec![Value::Int(1), Value::Int(2), Value::Int(100)]),
        );
        cache.publish_row(
            "t",
            &columns(),
            &Record::new(vec![Value::Int(9), Value::Int(8), Value::Int(101)]),
        );
        assert_eq!(cache.resolve(Some("t"), "a").unwrap(), &Value::Int(9));
    }

    #[test]
    fn test_ambiguous_unqualified() {
        let mut cache = RowCache::new();
        let record = Record::new(vec![Value::Int(1), Value::Int(2), Value::Int(100)]);
        cache.publish_row("t", &columns(), &record);
        cache.publish_row("u", &columns(), &record);
        assert!(matches!(
            cache.resolve(None, "a"),
            Err(ExecutorError::AmbiguousColumn { .. })
        ));
    }

    #[test]
    fn test_guard_clears_on_drop() {
        let mut cache = RowCache::new();
        {
            let mut guard = RowCacheGuard::new(&mut cache);
            guard.publish_row(
                "t",
                &columns(),
                &Record::new(vec![Value::Int(1), Value::Int(2), Value::Int(100)]),
            );
            assert!(!guard.is_empty());
        }
        assert!(cache.is_empty());
    }
}
