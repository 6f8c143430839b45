//! All-pairs shortest move sequences
//!
//! Enumerates the reachable configurations, seeds a dense distance matrix
//! with the direct edges, then runs Floyd–Warshall while propagating the
//! first-step witness of each shortest path.

use crate::analysis::reachability::reachable;
use crate::app::{Application, GlobalState, Step};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Distance and first-step witness tables keyed by global state
///
/// Pairs with no connecting move sequence are omitted. Every configuration
/// maps to itself with cost zero and no step entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plans {
    /// Minimum number of moves between each reachable pair
    pub costs: BTreeMap<GlobalState, BTreeMap<GlobalState, usize>>,

    /// First move of one shortest path for each pair with cost > 0
    pub steps: BTreeMap<GlobalState, BTreeMap<GlobalState, Step>>,
}

/// Unit cost for every move. Replacing this with a function of the source
/// configuration, the step and the successor is the intended extension
/// point; Floyd–Warshall needs the result to stay non-negative.
fn move_cost(_src: &Application, _step: &Step, _dst: &Application) -> usize {
    1
}

/// Strict relaxation with unreachable treated as greater than everything,
/// so a later edge of equal cost never displaces the first-seen witness
fn relaxes(current: Option<usize>, candidate: usize) -> bool {
    match current {
        Some(cost) => candidate < cost,
        None => true,
    }
}

/// Compute all-pairs minimum move counts and first-step witnesses over the
/// configurations reachable from `app`
pub fn plans(app: &Application) -> Plans {
    let reached = reachable(app);
    let states: Vec<(&GlobalState, &Application)> = reached.iter().collect();
    let n = states.len();
    let idx: FxHashMap<&GlobalState, usize> = states
        .iter()
        .enumerate()
        .map(|(i, (key, _))| (*key, i))
        .collect();

    let mut cost: Vec<Vec<Option<usize>>> = vec![vec![None; n]; n];
    let mut step: Vec<Vec<Option<Step>>> = vec![vec![None; n]; n];
    for (i, row) in cost.iter_mut().enumerate() {
        row[i] = Some(0);
    }

    // Phase 1: direct edges, in the move-enumeration order, so the first
    // enumerated move wins ties.
    for (i, (_, src)) in states.iter().enumerate() {
        for (mv, next) in src.legal_moves() {
            let j = idx[next.global_state()];
            let direct = move_cost(src, &mv, &next);
            if relaxes(cost[i][j], direct) {
                cost[i][j] = Some(direct);
                step[i][j] = Some(mv);
            }
        }
    }

    // Phase 2: Floyd–Warshall. A relaxed src→dst inherits the first step of
    // the src→via leg.
    for via in 0..n {
        for src in 0..n {
            if src == via {
                continue;
            }
            let Some(to_via) = cost[src][via] else {
                continue;
            };
            for dst in 0..n {
                let Some(onward) = cost[via][dst] else {
                    continue;
                };
                let through = to_via + onward;
                if relaxes(cost[src][dst], through) {
                    cost[src][dst] = Some(through);
                    step[src][dst] = step[src][via].clone();
                }
            }
        }
    }

    let mut costs = BTreeMap::new();
    let mut steps = BTreeMap::new();
    for (i, (src_key, _)) in states.iter().enumerate() {
        let mut cost_row = BTreeMap::new();
        let mut step_row = BTreeMap::new();
        for (j, (dst_key, _)) in states.iter().enumerate() {
            if let Some(c) = cost[i][j] {
                cost_row.insert((*dst_key).clone(), c);
            }
            if let Some(s) = &step[i][j] {
                step_row.insert((*dst_key).clone(), s.clone());
            }
        }
        costs.insert((*src_key).clone(), cost_row);
        steps.insert((*src_key).clone(), step_row);
    }

    debug!(configurations = n, "plan matrices complete");
    Plans { costs, steps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, NodeInstance, NodeSpec, OpId, Operation, State, StateId};
    use std::collections::BTreeMap as Map;
    use std::sync::Arc;

    fn key(s: &str) -> GlobalState {
        GlobalState::from(s)
    }

    /// One node cycling a → b → c → a
    fn three_cycle() -> Application {
        let mut states = Map::new();
        states.insert(
            StateId::from("a"),
            State::alive().with_op("next", Operation::new("b")),
        );
        states.insert(
            StateId::from("b"),
            State::alive().with_op("next", Operation::new("c")),
        );
        states.insert(
            StateId::from("c"),
            State::alive().with_op("next", Operation::new("a")),
        );
        let spec = Arc::new(NodeSpec::from_states("cycle", "a", states).unwrap());

        let mut nodes = Map::new();
        nodes.insert(NodeId::from("N"), NodeInstance::new(spec));
        Application::new(nodes, Map::new(), Map::new(), false).unwrap()
    }

    #[test]
    fn test_three_cycle_distance_matrix() {
        let plans = plans(&three_cycle());

        let expected = [
            ("N=a", [("N=a", 0), ("N=b", 1), ("N=c", 2)]),
            ("N=b", [("N=a", 2), ("N=b", 0), ("N=c", 1)]),
            ("N=c", [("N=a", 1), ("N=b", 2), ("N=c", 0)]),
        ];
        for (src, row) in expected {
            for (dst, cost) in row {
                assert_eq!(
                    plans.costs[&key(src)][&key(dst)],
                    cost,
                    "cost {src} -> {dst}"
                );
            }
        }
    }

    #[test]
    fn test_three_cycle_witnesses_leave_the_row_state() {
        let plans = plans(&three_cycle());
        let next = Step::Op {
            node: NodeId::from("N"),
            op: OpId::from("next"),
        };
        for (src, row) in &plans.steps {
            for (dst, step) in row {
                assert_ne!(src, dst, "the diagonal carries no step");
                assert_eq!(step, &next);
            }
        }
        // every non-diagonal pair carries a witness
        for row in plans.steps.values() {
            assert_eq!(row.len(), 2);
        }
    }

    #[test]
    fn test_unreachable_pairs_are_omitted() {
        let mut states = Map::new();
        states.insert(
            StateId::from("s0"),
            State::alive().with_op("go", Operation::new("s1")),
        );
        states.insert(StateId::from("s1"), State::alive());
        let spec = Arc::new(NodeSpec::from_states("n", "s0", states).unwrap());

        let mut nodes = Map::new();
        nodes.insert(NodeId::from("N"), NodeInstance::new(spec));
        let app = Application::new(nodes, Map::new(), Map::new(), false).unwrap();

        let plans = plans(&app);
        assert_eq!(plans.costs[&key("N=s0")][&key("N=s1")], 1);
        assert_eq!(
            plans.steps[&key("N=s0")][&key("N=s1")],
            Step::Op {
                node: NodeId::from("N"),
                op: OpId::from("go")
            }
        );
        assert!(
            !plans.costs[&key("N=s1")].contains_key(&key("N=s0")),
            "s1 cannot get back to s0"
        );
        assert!(plans.steps[&key("N=s1")].is_empty());
    }

    #[test]
    fn test_equal_cost_witness_prefers_first_enumerated_move() {
        // two ops from s0 to s1; the lexicographically first op id wins
        let mut states = Map::new();
        states.insert(
            StateId::from("s0"),
            State::alive()
                .with_op("alpha", Operation::new("s1"))
                .with_op("beta", Operation::new("s1")),
        );
        states.insert(StateId::from("s1"), State::alive());
        let spec = Arc::new(NodeSpec::from_states("n", "s0", states).unwrap());

        let mut nodes = Map::new();
        nodes.insert(NodeId::from("N"), NodeInstance::new(spec));
        let app = Application::new(nodes, Map::new(), Map::new(), false).unwrap();

        let plans = plans(&app);
        assert_eq!(
            plans.steps[&key("N=s0")][&key("N=s1")],
            Step::Op {
                node: NodeId::from("N"),
                op: OpId::from("alpha")
            }
        );
    }

    #[test]
    fn test_plans_are_deterministic() {
        let app = three_cycle();
        assert_eq!(plans(&app), plans(&app));
    }

    #[test]
    fn test_triangle_inequality() {
        let plans = plans(&three_cycle());
        for (i, row_i) in &plans.costs {
            for (k, c_ik) in row_i {
                for (j, c_kj) in &plans.costs[k] {
                    let c_ij = plans.costs[i]
                        .get(j)
                        .expect("a path through k implies i -> j is reachable");
                    assert!(
                        *c_ij <= c_ik + c_kj,
                        "cost({i},{j}) must not exceed cost({i},{k}) + cost({k},{j})"
                    );
                }
            }
        }
    }
}
