//! Join ordering over index-probeable equi-join edges.
//!
//! Every equi-join atom `Ra.x = Rb.y` contributes a directed edge
//! `Ra -> Rb` when `Rb` has an index on `y` (and the mirror edge when
//! `Ra` is indexed on `x`): with the source relation's tuple bound, the
//! destination can be probed via its index.
//!
//! The plan is the longest simple path in that graph, found by DFS from
//! every start vertex (ties break to the first-encountered start).
//! Relations off the path become plain heap-scan loops at the outer end,
//! in statement order; the chain runs driver-before-driven, so its last
//! vertex is iterated innermost and always sees a bound probe key.

use crate::db::Database;

use super::predicate::column_name;
use super::Relation;

/// An index probe binding one chain edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinProbe {
    /// Relation bound at an outer level whose cached column supplies the key.
    pub driver: usize,
    /// Column on the driver side of the join atom.
    pub driver_column: usize,
    /// Indexed column probed on this relation.
    pub column: usize,
}

/// One nesting level of the join, outermost first in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinLevel {
    /// Relation iterated at this level.
    pub relation: usize,
    /// Index probe from the previous level, or a heap scan when absent.
    pub probe: Option<JoinProbe>,
}

/// The ordered join plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    /// Levels, outermost to innermost.
    pub levels: Vec<JoinLevel>,
}

impl JoinPlan {
    /// Number of index-driven edges in the plan.
    pub fn probe_count(&self) -> usize {
        self.levels.iter().filter(|l| l.probe.is_some()).count()
    }

    /// Renders the iteration order and the index bindings for the log.
    pub fn describe(&self, db: &Database, relations: &[Relation]) -> (String, String) {
        let order = self
            .levels
            .iter()
            .map(|level| relations[level.relation].live_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let probes = self
            .levels
            .iter()
            .filter_map(|level| {
                let probe = level.probe.as_ref()?;
                let driver_table = db.table(relations[probe.driver].table_id);
                let driven_table = db.table(relations[level.relation].table_id);
                Some(format!(
                    "{}.{}-{}.{}",
                    relations[probe.driver].live_name,
                    column_name(driver_table, probe.driver_column),
                    relations[level.relation].live_name,
                    column_name(driven_table, probe.column),
                ))
            })
            .collect::<Vec<_>>()
            .join(", ");

        (order, probes)
    }
}

/// One directed edge: probing `driven_column` keyed by `driver_column`.
#[derive(Debug, Clone, Copy)]
struct Edge {
    driver_column: usize,
    driven_column: usize,
}

/// Builds the join plan from resolved equi-join atom sides.
///
/// `equi_atoms` holds `((relation, column), (relation, column))` pairs in
/// source order; the first atom wiring a given edge wins.
pub fn build_join_plan(
    db: &Database,
    relations: &[Relation],
    equi_atoms: &[((usize, usize), (usize, usize))],
) -> JoinPlan {
    let n = relations.len();

    // Directed edge matrix: edges[a][b] probes b from a
    let mut edges: Vec<Vec<Option<Edge>>> = vec![vec![None; n]; n];
    for &((ra, ca), (rb, cb)) in equi_atoms {
        if db.table(relations[rb].table_id).has_index(cb) && edges[ra][rb].is_none() {
            edges[ra][rb] = Some(Edge {
                driver_column: ca,
                driven_column: cb,
            });
        }
        if db.table(relations[ra].table_id).has_index(ca) && edges[rb][ra].is_none() {
            edges[rb][ra] = Some(Edge {
                driver_column: cb,
                driven_column: ca,
            });
        }
    }

    // Longest simple path, tie broken by first-encountered start
    let mut best_start = 0;
    let mut best_depth = 0;
    for start in 0..n {
        let mut mark = vec![false; n];
        let mut path = vec![0usize; n];
        let mut max_depth = 0;
        find_longest_path(
            start,
            0,
            &mut mark,
            &mut path,
            &edges,
            usize::MAX,
            &mut max_depth,
        );
        if max_depth > best_depth {
            best_depth = max_depth;
            best_start = start;
        }
    }

    let mut mark = vec![false; n];
    let mut path = vec![0usize; n];
    let mut reached = 0;
    let found = find_longest_path(
        best_start,
        0,
        &mut mark,
        &mut path,
        &edges,
        best_depth,
        &mut reached,
    );
    debug_assert!(found, "path of the chosen depth must be reproducible");

    let chain = &path[..=best_depth];
    let in_chain: Vec<bool> = {
        let mut v = vec![false; n];
        for &rel in chain {
            v[rel] = true;
        }
        v
    };

    // Outer loops first (statement order), then the chain driver-first
    let mut levels: Vec<JoinLevel> = (0..n)
        .filter(|&rel| !in_chain[rel])
        .map(|rel| JoinLevel {
            relation: rel,
            probe: None,
        })
        .collect();

    for (pos, &rel) in chain.iter().enumerate() {
        let probe = if pos == 0 {
            None
        } else {
            let driver = chain[pos - 1];
            edges[driver][rel].map(|edge| JoinProbe {
                driver,
                driver_column: edge.driver_column,
                column: edge.driven_column,
            })
        };
        levels.push(JoinLevel {
            relation: rel,
            probe,
        });
    }

    JoinPlan { levels }
}

/// Depth-first search for the longest simple path.
///
/// Fills `path[..=depth]` along the way and tracks the deepest level in
/// `max_depth`; returns true as soon as `target` is reached, leaving the
/// path intact for the caller.
fn find_longest_path(
    now: usize,
    depth: usize,
    mark: &mut [bool],
    path: &mut [usize],
    edges: &[Vec<Option<Edge>>],
    target: usize,
    max_depth: &mut usize,
) -> bool {
    mark[now] = true;
    path[depth] = now;
    if depth > *max_depth {
        *max_depth = depth;
    }
    if depth == target {
        return true;
    }
    for next in 0..edges.len() {
        if edges[now][next].is_none() || mark[next] {
            continue;
        }
        if find_longest_path(next, depth + 1, mark, path, edges, target, max_depth) {
            return true;
        }
    }
    mark[now] = false;
    false
}
