//! Predicate decomposition.
//!
//! The WHERE tree is flattened into a conjunction of atoms (everything
//! that is not an `AND` node), preserving source order. Each atom is then
//! classified: single-relation atoms feed access-path selection, equi-join
//! atoms feed the join orderer, and everything else is residual filtering
//! applied after decode.

use crate::datum::Type;
use crate::db::Database;
use crate::sql::{BinaryOp, ColumnRef, Expr};
use crate::table::Table;

use super::error::ExecutorError;
use super::Relation;

/// Classification of one conjunction atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomClass {
    /// Every column reference names the same relation.
    SingleRelation(usize),
    /// `Ra.x = Rb.y` across two relations with matching types.
    EquiJoin {
        /// `(relation, column)` of the left side.
        left: (usize, usize),
        /// `(relation, column)` of the right side.
        right: (usize, usize),
    },
    /// Anything else: constants-only, non-equi, or multi-relation.
    Residual,
}

/// Recursively flattens `AND` nodes into a list of atoms in source order.
pub fn split_conjuncts(expr: &Expr) -> Vec<&Expr> {
    let mut atoms = Vec::new();
    collect_conjuncts(expr, &mut atoms);
    atoms
}

fn collect_conjuncts<'a>(expr: &'a Expr, atoms: &mut Vec<&'a Expr>) {
    match expr {
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => {
            collect_conjuncts(left, atoms);
            collect_conjuncts(right, atoms);
        }
        other => atoms.push(other),
    }
}

/// Resolves a column reference to `(relation index, column id)`.
///
/// Qualified references must name a live relation; unqualified ones must
/// match exactly one relation.
///
/// # Errors
///
/// Returns `TableNotFound`, `ColumnNotFound`, or `AmbiguousColumn`.
pub fn resolve_column(
    db: &Database,
    relations: &[Relation],
    col: &ColumnRef,
) -> Result<(usize, usize), ExecutorError> {
    match &col.table {
        Some(table) => {
            let rel = relations
                .iter()
                .position(|r| r.live_name == *table)
                .ok_or_else(|| ExecutorError::TableNotFound {
                    name: table.clone(),
                })?;
            let cid = db
                .table(relations[rel].table_id)
                .lookup_column(&col.column)
                .ok_or_else(|| ExecutorError::ColumnNotFound {
                    name: format!("{}.{}", table, col.column),
                })?;
            Ok((rel, cid))
        }
        None => {
            let mut found = None;
            for (rel, relation) in relations.iter().enumerate() {
                if let Some(cid) = db.table(relation.table_id).lookup_column(&col.column) {
                    if found.is_some() {
                        return Err(ExecutorError::AmbiguousColumn {
                            name: col.column.clone(),
                        });
                    }
                    found = Some((rel, cid));
                }
            }
            found.ok_or_else(|| ExecutorError::ColumnNotFound {
                name: col.column.clone(),
            })
        }
    }
}

/// Declared type of a column id, treating the trailing `__rowid__` as INT.
pub fn column_type(table: &Table, column: usize) -> Type {
    table
        .columns()
        .get(column)
        .map(|c| c.ty)
        .unwrap_or(Type::Int)
}

/// Name of a column id, treating the trailing position as `__rowid__`.
pub fn column_name(table: &Table, column: usize) -> &str {
    table
        .columns()
        .get(column)
        .map(|c| c.name.as_str())
        .unwrap_or(crate::table::ROWID_COLUMN)
}

/// Classifies one atom against the live relations.
///
/// # Errors
///
/// Propagates column-resolution failures so a broken reference surfaces
/// before iteration starts.
pub fn classify_atom(
    db: &Database,
    relations: &[Relation],
    atom: &Expr,
) -> Result<AtomClass, ExecutorError> {
    // Equi-join shape: `=` with bare column refs of distinct relations
    // and matching key types.
    if let Expr::Binary {
        left,
        op: BinaryOp::Eq,
        right,
    } = atom
    {
        if let (Expr::Column(lc), Expr::Column(rc)) = (left.as_ref(), right.as_ref()) {
            let l = resolve_column(db, relations, lc)?;
            let r = resolve_column(db, relations, rc)?;
            if l.0 != r.0 {
                let lt = column_type(db.table(relations[l.0].table_id), l.1);
                let rt = column_type(db.table(relations[r.0].table_id), r.1);
                if types_joinable(lt, rt) {
                    return Ok(AtomClass::EquiJoin { left: l, right: r });
                }
                return Ok(AtomClass::Residual);
            }
            return Ok(AtomClass::SingleRelation(l.0));
        }
    }

    let mut refs = Vec::new();
    collect_column_refs(atom, &mut refs);
    let mut relation = None;
    for col in refs {
        let (rel, _) = resolve_column(db, relations, col)?;
        match relation {
            None => relation = Some(rel),
            Some(seen) if seen == rel => {}
            Some(_) => return Ok(AtomClass::Residual),
        }
    }

    match relation {
        Some(rel) => Ok(AtomClass::SingleRelation(rel)),
        None => Ok(AtomClass::Residual),
    }
}

/// Returns true when two declared types join comparably.
fn types_joinable(a: Type, b: Type) -> bool {
    matches!(
        (a, b),
        (Type::Int | Type::Float, Type::Int | Type::Float)
            | (Type::Bool, Type::Bool)
            | (Type::Date, Type::Date)
            | (Type::Char(_) | Type::Varchar(_), Type::Char(_) | Type::Varchar(_))
    )
}

/// Collects every column reference in an expression tree.
pub fn collect_column_refs<'a>(expr: &'a Expr, refs: &mut Vec<&'a ColumnRef>) {
    match expr {
        Expr::Column(col) => refs.push(col),
        Expr::Unary { operand, .. } => collect_column_refs(operand, refs),
        Expr::Binary { left, right, .. } => {
            collect_column_refs(left, refs);
            collect_column_refs(right, refs);
        }
        Expr::IsNull { expr, .. } => collect_column_refs(expr, refs),
        Expr::Like { expr, pattern, .. } => {
            collect_column_refs(expr, refs);
            collect_column_refs(pattern, refs);
        }
        Expr::Aggregate { arg, .. } => {
            if let Some(arg) = arg {
                collect_column_refs(arg, refs);
            }
        }
        Expr::Null | Expr::Int(_) | Expr::Float(_) | Expr::Str(_) | Expr::Bool(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Parser;

    fn parse_expr(input: &str) -> Expr {
        Parser::new(input).unwrap().parse_expr().unwrap()
    }

    #[test]
    fn test_split_preserves_source_order() {
        let expr = parse_expr("a = 1 AND b > 2 AND c < 3");
        let atoms = split_conjuncts(&expr);
        assert_eq!(atoms.len(), 3);
        assert_eq!(format!("{}", atoms[0]), "a = 1");
        assert_eq!(format!("{}", atoms[1]), "b > 2");
        assert_eq!(format!("{}", atoms[2]), "c < 3");
    }

    #[test]
    fn test_split_single_atom() {
        let expr = parse_expr("a = 1 OR b = 2");
        let atoms = split_conjuncts(&expr);
        // OR is one atom; only AND flattens
        assert_eq!(atoms.len(), 1);
    }

    #[test]
    fn test_split_nested_and() {
        let expr = parse_expr("(a = 1 AND b = 2) AND (c = 3 AND d = 4)");
        assert_eq!(split_conjuncts(&expr).len(), 4);
    }
}
