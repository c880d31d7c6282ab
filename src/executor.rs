//! Query planner and executor.
//!
//! Given resolved relations and a WHERE tree, this module selects one
//! access path per relation, orders multi-way joins along index-probeable
//! equi-join edges, and streams matching tuple combinations through a
//! per-row callback. Result shaping (projection, DISTINCT, ORDER BY,
//! aggregation) sits on top of the same callback.
//!
//! The moving parts:
//!
//! - **Row cache** ([`cache`]): publishes each relation's current tuple
//!   for column-reference resolution; statement-scoped.
//! - **Expression evaluation** ([`eval`]): result-bearing evaluation over
//!   the row cache, NULL-propagating.
//! - **Predicate decomposition** ([`predicate`]): flattens the WHERE tree
//!   into conjunction atoms and classifies them.
//! - **Access paths** ([`access`]): heap scan versus index equality probe.
//! - **Join ordering** ([`join`]): longest index-driven chain, outer
//!   loops for the rest.
//! - **Iteration** ([`iterate`]): the recursive executor with early stop.
//! - **Result shaping** ([`output`]): projection, DISTINCT set, ORDER BY
//!   sort, single-aggregate reduction.

mod access;
mod cache;
mod error;
mod eval;
mod iterate;
mod join;
mod output;
mod predicate;

pub use access::{choose_access_path, AccessPath};
pub use cache::{RowCache, RowCacheGuard};
pub use error::ExecutorError;
pub use eval::{eval, to_condition};
pub use iterate::{iterate, RowCallback};
pub use join::{build_join_plan, JoinLevel, JoinPlan, JoinProbe};
pub use output::{
    build_projection, compare_rows, resolve_order_keys, row_key, Aggregator, Projection,
};
pub use predicate::{classify_atom, resolve_column, split_conjuncts, AtomClass};

/// One relation taking part in a statement: its catalog position and the
/// name its columns are visible under (the alias, when one was written).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Name columns resolve against during this statement.
    pub live_name: String,
    /// Catalog position of the underlying table.
    pub table_id: usize,
}
