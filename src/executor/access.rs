//! Access-path selection for a single relation.
//!
//! Policy: scan the relation's atoms in source order for an equality
//! between an indexed column and a constant; the first match wins and
//! becomes an index equality probe (a lower-bound walk that stops at the
//! first differing key). Without a match, the relation is heap-scanned.
//! Atoms not chosen for the path stay in the WHERE and are applied after
//! decode.
//!
//! First-match keeps the selector free of cost estimation on purpose.

use crate::datum::Value;
use crate::db::Database;
use crate::sql::{BinaryOp, Expr};

use super::cache::RowCache;
use super::error::ExecutorError;
use super::eval::eval;
use super::predicate::{collect_column_refs, resolve_column};
use super::Relation;

/// How a relation's rows enter the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessPath {
    /// Iterate every record in insertion order.
    HeapScan,
    /// Walk the column's index from `lower_bound(key)`, stopping at the
    /// first key that differs.
    IndexProbe {
        /// Probed column id.
        column: usize,
        /// Equality key, evaluated at plan time.
        key: Value,
    },
}

/// Chooses between a heap scan and one index equality probe for `rel`.
///
/// `atoms` is the conjunction of the statement's WHERE clause; atoms that
/// mention other relations are ignored here.
///
/// # Errors
///
/// Propagates evaluation failures of the probe key expression.
pub fn choose_access_path(
    db: &Database,
    relations: &[Relation],
    rel: usize,
    atoms: &[&Expr],
) -> Result<AccessPath, ExecutorError> {
    let table = db.table(relations[rel].table_id);

    for atom in atoms {
        let Expr::Binary {
            left,
            op: BinaryOp::Eq,
            right,
        } = atom
        else {
            continue;
        };

        // Normalize `<const> = <ref>` to `<ref> = <const>`
        let (col_side, key_side) = match (left.as_ref(), right.as_ref()) {
            (Expr::Column(_), other) if !matches!(other, Expr::Column(_)) => {
                (left.as_ref(), right.as_ref())
            }
            (other, Expr::Column(_)) if !matches!(other, Expr::Column(_)) => {
                (right.as_ref(), left.as_ref())
            }
            _ => continue,
        };

        let Expr::Column(col) = col_side else {
            continue;
        };
        let Ok((col_rel, cid)) = resolve_column(db, relations, col) else {
            continue;
        };
        if col_rel != rel || !table.has_index(cid) {
            continue;
        }

        // The key must be computable before iteration starts
        let mut refs = Vec::new();
        collect_column_refs(key_side, &mut refs);
        if !refs.is_empty() {
            continue;
        }

        let key = eval(key_side, &RowCache::new())?;
        return Ok(AccessPath::IndexProbe { column: cid, key });
    }

    Ok(AccessPath::HeapScan)
}
