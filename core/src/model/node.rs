//! Node specifications and running instances
//!
//! A [`NodeSpec`] is the immutable protocol of one node: its declared
//! identifier sets, its states and its initial state. Construction runs the
//! full structural validation, so every spec in circulation is well-formed.
//! A [`NodeInstance`] pairs a shared spec with a current state and produces
//! successor instances for the three node-local moves.

use super::ids::{CapId, NodeId, OpId, ReqId, StateId};
use super::state::State;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

/// Result type for spec construction
pub type SpecResult<T> = Result<T, SpecError>;

/// Structural violations detected while building a node spec or an
/// application. Fatal: the caller must fix the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("state '{state}' is not declared")]
    UnknownState { state: StateId },

    #[error("state '{state}' offers capability '{cap}' not declared by the node")]
    UndeclaredCap { state: StateId, cap: CapId },

    #[error("state '{state}' demands requirement '{req}' not declared by the node")]
    UndeclaredReq { state: StateId, req: ReqId },

    #[error("state '{state}' offers operation '{op}' not declared by the node")]
    UndeclaredOp { state: StateId, op: OpId },

    #[error("operation '{op}' in state '{state}' targets unknown state '{to}'")]
    UnknownOpTarget { state: StateId, op: OpId, to: StateId },

    #[error("operation '{op}' in state '{state}' has no requirement alternatives")]
    NoAlternatives { state: StateId, op: OpId },

    #[error("operation '{op}' in state '{state}' mentions requirement '{req}' not declared by the node")]
    UndeclaredOpReq { state: StateId, op: OpId, req: ReqId },

    #[error("handler in state '{state}' mentions requirement '{req}' not declared by the node")]
    UndeclaredHandlerReq { state: StateId, req: ReqId },

    #[error("handler for '{req}' in state '{state}' targets unknown state '{to}'")]
    UnknownHandlerTarget { state: StateId, req: ReqId, to: StateId },

    #[error("requirement '{req}' is declared by both node '{first}' and node '{second}'")]
    DuplicateReq { req: ReqId, first: NodeId, second: NodeId },

    #[error("capability '{cap}' is declared by both node '{first}' and node '{second}'")]
    DuplicateCap { cap: CapId, first: NodeId, second: NodeId },

    #[error("requirement '{req}' of node '{node}' has no binding")]
    UnboundReq { req: ReqId, node: NodeId },

    #[error("binding mentions unknown requirement '{req}'")]
    UnknownBoundReq { req: ReqId },

    #[error("binding for '{req}' targets unknown capability '{cap}'")]
    UnknownBoundCap { req: ReqId, cap: CapId },

    #[error("contained node '{node}' is not part of the application")]
    UnknownContained { node: NodeId },

    #[error("container '{container}' of node '{node}' is not part of the application")]
    UnknownContainer { node: NodeId, container: NodeId },
}

/// Node-local moves rejected by the current state. Indicates a caller bug;
/// application-level legality is checked before these are ever reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeMoveError {
    #[error("state '{state}' has no operation '{op}'")]
    NoSuchOp { state: StateId, op: OpId },

    #[error("state '{state}' has no handler for requirement '{req}'")]
    NoSuchHandler { state: StateId, req: ReqId },
}

/// Immutable protocol of one node
///
/// The declared `caps`/`reqs`/`ops` sets are the unions of every identifier
/// that may ever appear in any state; per-state sets must stay within them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Opaque kind tag; carried for collaborators, unused by the analyses
    pub kind: String,

    /// State the node starts in (and returns to on hard reset)
    pub initial: StateId,

    /// Every capability the node may ever offer
    pub caps: BTreeSet<CapId>,

    /// Every requirement the node may ever demand or handle
    pub reqs: BTreeSet<ReqId>,

    /// Every operation label the node may ever expose
    pub ops: BTreeSet<OpId>,

    /// The protocol states
    pub states: BTreeMap<StateId, State>,
}

impl NodeSpec {
    /// Build a spec with explicit declared sets, validating the structure
    pub fn new(
        kind: impl Into<String>,
        initial: impl Into<StateId>,
        caps: BTreeSet<CapId>,
        reqs: BTreeSet<ReqId>,
        ops: BTreeSet<OpId>,
        states: BTreeMap<StateId, State>,
    ) -> SpecResult<Self> {
        let spec = Self {
            kind: kind.into(),
            initial: initial.into(),
            caps,
            reqs,
            ops,
            states,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Build a spec whose declared sets are derived from the states
    pub fn from_states(
        kind: impl Into<String>,
        initial: impl Into<StateId>,
        states: BTreeMap<StateId, State>,
    ) -> SpecResult<Self> {
        let caps = Self::caps_of(&states);
        let reqs = Self::reqs_of(&states);
        let ops = Self::ops_of(&states);
        Self::new(kind, initial, caps, reqs, ops, states)
    }

    /// Union of capabilities offered by any state
    pub(crate) fn caps_of(states: &BTreeMap<StateId, State>) -> BTreeSet<CapId> {
        states.values().flat_map(|s| s.caps.iter().cloned()).collect()
    }

    /// Union of requirements demanded, required by any operation
    /// alternative, or handled in any state
    pub(crate) fn reqs_of(states: &BTreeMap<StateId, State>) -> BTreeSet<ReqId> {
        states
            .values()
            .flat_map(|s| {
                s.reqs
                    .iter()
                    .cloned()
                    .chain(s.ops.values().flat_map(|op| {
                        op.reqs.iter().flat_map(|alt| alt.iter().cloned())
                    }))
                    .chain(s.handlers.keys().cloned())
            })
            .collect()
    }

    /// Union of operation labels exposed by any state
    pub(crate) fn ops_of(states: &BTreeMap<StateId, State>) -> BTreeSet<OpId> {
        states.values().flat_map(|s| s.ops.keys().cloned()).collect()
    }

    /// Look up a declared state
    pub fn state(&self, id: &StateId) -> Option<&State> {
        self.states.get(id)
    }

    fn validate(&self) -> SpecResult<()> {
        if !self.states.contains_key(&self.initial) {
            return Err(SpecError::UnknownState {
                state: self.initial.clone(),
            });
        }

        for (state_id, state) in &self.states {
            for cap in &state.caps {
                if !self.caps.contains(cap) {
                    return Err(SpecError::UndeclaredCap {
                        state: state_id.clone(),
                        cap: cap.clone(),
                    });
                }
            }
            for req in &state.reqs {
                if !self.reqs.contains(req) {
                    return Err(SpecError::UndeclaredReq {
                        state: state_id.clone(),
                        req: req.clone(),
                    });
                }
            }
            for (op_id, op) in &state.ops {
                if !self.ops.contains(op_id) {
                    return Err(SpecError::UndeclaredOp {
                        state: state_id.clone(),
                        op: op_id.clone(),
                    });
                }
                if !self.states.contains_key(&op.to) {
                    return Err(SpecError::UnknownOpTarget {
                        state: state_id.clone(),
                        op: op_id.clone(),
                        to: op.to.clone(),
                    });
                }
                if op.reqs.is_empty() {
                    return Err(SpecError::NoAlternatives {
                        state: state_id.clone(),
                        op: op_id.clone(),
                    });
                }
                for alt in &op.reqs {
                    for req in alt {
                        if !self.reqs.contains(req) {
                            return Err(SpecError::UndeclaredOpReq {
                                state: state_id.clone(),
                                op: op_id.clone(),
                                req: req.clone(),
                            });
                        }
                    }
                }
            }
            for (req, to) in &state.handlers {
                if !self.reqs.contains(req) {
                    return Err(SpecError::UndeclaredHandlerReq {
                        state: state_id.clone(),
                        req: req.clone(),
                    });
                }
                if !self.states.contains_key(to) {
                    return Err(SpecError::UnknownHandlerTarget {
                        state: state_id.clone(),
                        req: req.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// A node spec together with its current state
///
/// Instances are immutable; every move allocates a new instance sharing the
/// spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInstance {
    spec: Arc<NodeSpec>,
    state_id: StateId,
}

impl NodeInstance {
    /// Instance at the spec's initial state
    pub fn new(spec: Arc<NodeSpec>) -> Self {
        let state_id = spec.initial.clone();
        Self { spec, state_id }
    }

    /// Instance at an explicit state, which must be declared
    pub fn at_state(spec: Arc<NodeSpec>, state_id: impl Into<StateId>) -> SpecResult<Self> {
        let state_id = state_id.into();
        if !spec.states.contains_key(&state_id) {
            return Err(SpecError::UnknownState { state: state_id });
        }
        Ok(Self { spec, state_id })
    }

    /// The shared spec
    pub fn spec(&self) -> &Arc<NodeSpec> {
        &self.spec
    }

    /// Identifier of the current state
    pub fn state_id(&self) -> &StateId {
        &self.state_id
    }

    /// The current state
    pub fn state(&self) -> &State {
        self.spec
            .states
            .get(&self.state_id)
            .expect("current state is declared; checked at construction")
    }

    /// Whether the current state counts as live
    pub fn is_alive(&self) -> bool {
        self.state().is_alive
    }

    /// Follow an operation out of the current state
    ///
    /// Node-local: application-level requirement satisfaction is not
    /// consulted here.
    pub fn perform_op(&self, op_id: &OpId) -> Result<Self, NodeMoveError> {
        let op = self
            .state()
            .ops
            .get(op_id)
            .ok_or_else(|| NodeMoveError::NoSuchOp {
                state: self.state_id.clone(),
                op: op_id.clone(),
            })?;
        Ok(Self {
            spec: Arc::clone(&self.spec),
            state_id: op.to.clone(),
        })
    }

    /// Follow the fault handler for a requirement
    pub fn handle_fault(&self, req_id: &ReqId) -> Result<Self, NodeMoveError> {
        let to = self
            .state()
            .handlers
            .get(req_id)
            .ok_or_else(|| NodeMoveError::NoSuchHandler {
                state: self.state_id.clone(),
                req: req_id.clone(),
            })?;
        Ok(Self {
            spec: Arc::clone(&self.spec),
            state_id: to.clone(),
        })
    }

    /// Return to the initial state. Unconditional at node level; the
    /// application decides when a hard reset is legal.
    pub fn hard_reset(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
            state_id: self.spec.initial.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::state::Operation;

    fn toggle_spec() -> Arc<NodeSpec> {
        let mut states = BTreeMap::new();
        states.insert(
            StateId::from("off"),
            State::alive().with_op("flip", Operation::new("on")),
        );
        states.insert(
            StateId::from("on"),
            State::alive()
                .with_cap("power")
                .with_op("flip", Operation::new("off")),
        );
        Arc::new(NodeSpec::from_states("toggle", "off", states).unwrap())
    }

    #[test]
    fn test_derived_declarations_cover_all_states() {
        let spec = toggle_spec();
        assert!(spec.caps.contains(&CapId::from("power")));
        assert_eq!(spec.ops.len(), 1, "flip appears once in the declared set");
        assert!(spec.reqs.is_empty());
    }

    #[test]
    fn test_unknown_initial_state_is_rejected() {
        let err = NodeSpec::from_states("t", "missing", BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownState {
                state: StateId::from("missing")
            }
        );
    }

    #[test]
    fn test_undeclared_capability_is_rejected() {
        let mut states = BTreeMap::new();
        states.insert(StateId::from("s"), State::alive().with_cap("c"));

        let err = NodeSpec::new(
            "t",
            "s",
            BTreeSet::new(),
            BTreeSet::new(),
            BTreeSet::new(),
            states,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SpecError::UndeclaredCap {
                state: StateId::from("s"),
                cap: CapId::from("c")
            }
        );
    }

    #[test]
    fn test_op_target_must_be_declared() {
        let mut states = BTreeMap::new();
        states.insert(
            StateId::from("s"),
            State::alive().with_op("go", Operation::new("nowhere")),
        );

        let err = NodeSpec::from_states("t", "s", states).unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownOpTarget {
                state: StateId::from("s"),
                op: OpId::from("go"),
                to: StateId::from("nowhere")
            }
        );
    }

    #[test]
    fn test_empty_alternative_list_is_rejected() {
        let mut states = BTreeMap::new();
        states.insert(StateId::from("s"), State::alive());
        states.insert(
            StateId::from("r"),
            State::alive().with_op(
                "go",
                Operation {
                    to: StateId::from("s"),
                    reqs: vec![],
                },
            ),
        );

        let err = NodeSpec::from_states("t", "s", states).unwrap_err();
        assert_eq!(
            err,
            SpecError::NoAlternatives {
                state: StateId::from("r"),
                op: OpId::from("go")
            }
        );
    }

    #[test]
    fn test_handler_target_must_be_declared() {
        let mut states = BTreeMap::new();
        states.insert(
            StateId::from("s"),
            State::alive().with_req("r").with_handler("r", "nowhere"),
        );

        let err = NodeSpec::from_states("t", "s", states).unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownHandlerTarget {
                state: StateId::from("s"),
                req: ReqId::from("r"),
                to: StateId::from("nowhere")
            }
        );
    }

    #[test]
    fn test_undeclared_op_requirement_is_rejected() {
        let mut states = BTreeMap::new();
        states.insert(StateId::from("s"), State::alive());
        let op = Operation::requiring("s", ["r"]);
        states.insert(StateId::from("r0"), State::alive().with_op("go", op));

        let err = NodeSpec::new(
            "t",
            "s",
            BTreeSet::new(),
            BTreeSet::new(),
            [OpId::from("go")].into_iter().collect(),
            states,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SpecError::UndeclaredOpReq {
                state: StateId::from("r0"),
                op: OpId::from("go"),
                req: ReqId::from("r")
            }
        );
    }

    #[test]
    fn test_perform_op_moves_to_target() {
        let inst = NodeInstance::new(toggle_spec());
        assert_eq!(inst.state_id(), &StateId::from("off"));

        let next = inst.perform_op(&OpId::from("flip")).unwrap();
        assert_eq!(next.state_id(), &StateId::from("on"));
        assert!(next.state().caps.contains(&CapId::from("power")));

        // the original instance is untouched
        assert_eq!(inst.state_id(), &StateId::from("off"));
    }

    #[test]
    fn test_missing_op_is_a_node_move_error() {
        let inst = NodeInstance::new(toggle_spec());
        let err = inst.perform_op(&OpId::from("warp")).unwrap_err();
        assert_eq!(
            err,
            NodeMoveError::NoSuchOp {
                state: StateId::from("off"),
                op: OpId::from("warp")
            }
        );
    }

    #[test]
    fn test_missing_handler_is_a_node_move_error() {
        let inst = NodeInstance::new(toggle_spec());
        let err = inst.handle_fault(&ReqId::from("r")).unwrap_err();
        assert_eq!(
            err,
            NodeMoveError::NoSuchHandler {
                state: StateId::from("off"),
                req: ReqId::from("r")
            }
        );
    }

    #[test]
    fn test_hard_reset_returns_to_initial() {
        let inst = NodeInstance::new(toggle_spec())
            .perform_op(&OpId::from("flip"))
            .unwrap();
        assert_eq!(inst.state_id(), &StateId::from("on"));
        assert_eq!(inst.hard_reset().state_id(), &StateId::from("off"));
    }

    #[test]
    fn test_at_state_rejects_unknown_states() {
        let err = NodeInstance::at_state(toggle_spec(), "limbo").unwrap_err();
        assert_eq!(
            err,
            SpecError::UnknownState {
                state: StateId::from("limbo")
            }
        );
    }

    #[test]
    fn test_instances_share_the_spec() {
        let spec = toggle_spec();
        let a = NodeInstance::new(Arc::clone(&spec));
        let b = a.perform_op(&OpId::from("flip")).unwrap();
        assert!(Arc::ptr_eq(a.spec(), b.spec()));
    }
}
