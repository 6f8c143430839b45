//! Reachable-configuration enumeration

use crate::app::{Application, GlobalState};
use std::collections::BTreeMap;
use tracing::debug;

/// Enumerate every configuration reachable from `app` by legal moves
///
/// The result is keyed by canonical global state; the first snapshot to
/// arrive at a key is the one stored, later equivalents are dropped. An
/// explicit worklist keeps exploration depth off the call stack, and
/// termination is bounded by the product of per-node state counts.
pub fn reachable(app: &Application) -> BTreeMap<GlobalState, Application> {
    let mut visited: BTreeMap<GlobalState, Application> = BTreeMap::new();
    let mut queue: Vec<Application> = Vec::new();

    visited.insert(app.global_state().clone(), app.clone());
    queue.push(app.clone());

    while let Some(current) = queue.pop() {
        for (_step, next) in current.legal_moves() {
            if !visited.contains_key(next.global_state()) {
                visited.insert(next.global_state().clone(), next.clone());
                queue.push(next);
            }
        }
    }

    debug!(configurations = visited.len(), "reachability exploration complete");
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, NodeInstance, NodeSpec, Operation, State, StateId};
    use std::collections::BTreeMap as Map;
    use std::sync::Arc;

    fn single_node(initial: &str) -> Application {
        let mut states = Map::new();
        states.insert(
            StateId::from("s0"),
            State::alive().with_op("go", Operation::new("s1")),
        );
        states.insert(StateId::from("s1"), State::alive());
        let spec = Arc::new(NodeSpec::from_states("n", initial, states).unwrap());

        let mut nodes = Map::new();
        nodes.insert(NodeId::from("N"), NodeInstance::new(spec));
        Application::new(nodes, Map::new(), Map::new(), false).unwrap()
    }

    #[test]
    fn test_two_state_node_reaches_both_configurations() {
        let reached = reachable(&single_node("s0"));
        let keys: Vec<&str> = reached.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["N=s0", "N=s1"]);
    }

    #[test]
    fn test_initial_configuration_is_always_present() {
        let app = single_node("s1");
        let reached = reachable(&app);
        assert!(reached.contains_key(app.global_state()));
        assert_eq!(reached.len(), 1, "s1 has no outgoing moves");
    }

    #[test]
    fn test_every_successor_of_a_reached_state_is_reached() {
        let reached = reachable(&single_node("s0"));
        for app in reached.values() {
            for (_step, next) in app.legal_moves() {
                assert!(
                    reached.contains_key(next.global_state()),
                    "successor {} must be in the reachable map",
                    next.global_state()
                );
            }
        }
    }

    #[test]
    fn test_exploration_is_deterministic() {
        let app = single_node("s0");
        let first: Vec<String> = reachable(&app)
            .keys()
            .map(|k| k.as_str().to_string())
            .collect();
        let second: Vec<String> = reachable(&app)
            .keys()
            .map(|k| k.as_str().to_string())
            .collect();
        assert_eq!(first, second);
    }
}
