//! Streaming iteration over one or many relations.
//!
//! The executor drives the chosen plan and invokes a per-row callback for
//! every matching tuple combination; nothing is materialized ahead of the
//! callback. The callback returns `Ok(false)` to stop iteration promptly;
//! any evaluation failure aborts with a single diagnostic.
//!
//! The full WHERE (residual atoms included) is applied once, after decode
//! at the innermost level, before the callback fires.

use std::cmp::Ordering;

use log::{debug, info};

use crate::datum::Value;
use crate::db::Database;
use crate::heap::Rid;
use crate::sql::Expr;
use crate::table::Table;

use super::access::{choose_access_path, AccessPath};
use super::cache::RowCache;
use super::error::ExecutorError;
use super::eval::{eval, to_condition};
use super::join::{build_join_plan, JoinPlan};
use super::predicate::{classify_atom, column_name, split_conjuncts, AtomClass};
use super::Relation;

/// Per-row callback: receives the row cache (holding every relation's
/// current tuple) and the rid of each relation's row, positionally.
/// Returning `Ok(false)` stops iteration.
pub type RowCallback<'a> = dyn FnMut(&RowCache, &[Rid]) -> Result<bool, ExecutorError> + 'a;

/// Streams every tuple combination of `relations` satisfying `cond`
/// through `callback`.
///
/// One relation runs through access-path selection (index equality probe
/// when an indexed column is equated with a constant); several relations
/// run through the join orderer.
///
/// # Errors
///
/// Evaluation failures abort the iteration and surface here; partially
/// delivered rows are not retracted.
pub fn iterate(
    db: &mut Database,
    relations: &[Relation],
    cond: Option<&Expr>,
    cache: &mut RowCache,
    callback: &mut RowCallback<'_>,
) -> Result<(), ExecutorError> {
    let mut rids = vec![Rid::MIN; relations.len()];
    if relations.len() == 1 {
        iterate_one(db, relations, cond, cache, callback, &mut rids)
    } else {
        iterate_many(db, relations, cond, cache, callback, &mut rids)
    }
}

fn iterate_one(
    db: &mut Database,
    relations: &[Relation],
    cond: Option<&Expr>,
    cache: &mut RowCache,
    callback: &mut RowCallback<'_>,
    rids: &mut [Rid],
) -> Result<(), ExecutorError> {
    let atoms = cond.map(split_conjuncts).unwrap_or_default();
    let access = choose_access_path(db, relations, 0, &atoms)?;
    let tid = relations[0].table_id;

    let candidates = match &access {
        AccessPath::IndexProbe { column, key } => {
            info!(
                "access path: index probe on {}.{}",
                relations[0].live_name,
                column_name(db.table(tid), *column)
            );
            probe_rids(db.table(tid), *column, key)
        }
        AccessPath::HeapScan => {
            debug!("access path: heap scan on {}", relations[0].live_name);
            db.table_mut(tid).scan_rids()?
        }
    };

    for rid in candidates {
        if !visit(db, relations, 0, rid, cond, cache, callback, rids)? {
            break;
        }
    }
    Ok(())
}

fn iterate_many(
    db: &mut Database,
    relations: &[Relation],
    cond: Option<&Expr>,
    cache: &mut RowCache,
    callback: &mut RowCallback<'_>,
    rids: &mut Vec<Rid>,
) -> Result<(), ExecutorError> {
    let mut equi_atoms = Vec::new();
    if let Some(cond) = cond {
        for atom in split_conjuncts(cond) {
            if let AtomClass::EquiJoin { left, right } = classify_atom(db, relations, atom)? {
                equi_atoms.push((left, right));
            }
        }
    }

    let plan = build_join_plan(db, relations, &equi_atoms);
    let (order, probes) = plan.describe(db, relations);
    info!("join iteration order: {}", order);
    if probes.is_empty() {
        info!("join by plain enumeration");
    } else {
        info!("join index use: {}", probes);
    }

    join_level(db, relations, &plan, 0, cond, cache, callback, rids)?;
    Ok(())
}

/// Recursion over the plan levels, outermost first. Returns `Ok(false)`
/// once the callback asks to stop.
#[allow(clippy::too_many_arguments)]
fn join_level(
    db: &mut Database,
    relations: &[Relation],
    plan: &JoinPlan,
    level: usize,
    cond: Option<&Expr>,
    cache: &mut RowCache,
    callback: &mut RowCallback<'_>,
    rids: &mut Vec<Rid>,
) -> Result<bool, ExecutorError> {
    if level == plan.levels.len() {
        // Innermost: full WHERE once, then the callback
        if let Some(cond) = cond {
            let value = eval(cond, cache)?;
            if !to_condition(&value)? {
                return Ok(true);
            }
        }
        return callback(cache, rids);
    }

    let join = &plan.levels[level];
    let rel = join.relation;
    let tid = relations[rel].table_id;

    let candidates: Vec<Rid> = match &join.probe {
        Some(probe) => {
            let driver = &relations[probe.driver];
            let driver_table = db.table(driver.table_id);
            let key_column = column_name(driver_table, probe.driver_column).to_string();
            let key = cache
                .resolve(Some(&driver.live_name), &key_column)?
                .clone();
            probe_rids(db.table(tid), probe.column, &key)
        }
        None => db.table_mut(tid).scan_rids()?,
    };

    for rid in candidates {
        let record = db.table_mut(tid).get(rid)?;
        cache.publish_row(&relations[rel].live_name, db.table(tid).columns(), &record);
        rids[rel] = rid;
        if !join_level(db, relations, plan, level + 1, cond, cache, callback, rids)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Decodes one row, publishes it, applies the WHERE, and fires the
/// callback. Returns `Ok(false)` when the callback asks to stop.
#[allow(clippy::too_many_arguments)]
fn visit(
    db: &mut Database,
    relations: &[Relation],
    rel: usize,
    rid: Rid,
    cond: Option<&Expr>,
    cache: &mut RowCache,
    callback: &mut RowCallback<'_>,
    rids: &mut [Rid],
) -> Result<bool, ExecutorError> {
    let tid = relations[rel].table_id;
    let record = db.table_mut(tid).get(rid)?;
    cache.publish_row(&relations[rel].live_name, db.table(tid).columns(), &record);

    if let Some(cond) = cond {
        let value = eval(cond, cache)?;
        if !to_condition(&value)? {
            return Ok(true);
        }
    }

    rids[rel] = rid;
    callback(cache, rids)
}

/// Equality probe: lower-bound walk over the column's index, stopping at
/// the first key that no longer equals the probe key. A NULL key matches
/// nothing.
fn probe_rids(table: &Table, column: usize, key: &Value) -> Vec<Rid> {
    if key.is_null() {
        return Vec::new();
    }
    let Some(index) = table.get_index(column) else {
        debug_assert!(false, "probe planned for an unindexed column");
        return Vec::new();
    };
    index
        .lower_bound(key)
        .take_while(|entry| entry.key.0.compare(key) == Some(Ordering::Equal))
        .map(|entry| entry.rid)
        .collect()
}
