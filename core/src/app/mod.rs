//! Composed application snapshots
//!
//! An [`Application`] wires node instances together with a requirement
//! binding and a containment relation, and exposes the legality predicates
//! and successor constructors for the three move kinds. Snapshots are value
//! types: every derived fact is computed at construction and every move
//! produces a fresh snapshot, leaving the original untouched.

pub mod step;

pub use step::Step;

use crate::model::{
    CapId, NodeId, NodeInstance, NodeMoveError, OpId, ReqId, SpecError, StateId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Application-level moves rejected by a failing precondition
///
/// The `Display` strings are stable and part of the testable surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("faults pending")]
    FaultsPending,

    #[error("liveness constraint failing")]
    LivenessConstraintFailing,

    #[error("unknown node '{node}'")]
    UnknownNode { node: NodeId },

    #[error("operation '{op}' is not available in state '{state}' of node '{node}'")]
    OpUnavailable {
        node: NodeId,
        state: StateId,
        op: OpId,
    },

    #[error("no requirement alternative of operation '{op}' on node '{node}' is satisfied")]
    OpRequirementsUnsatisfied { node: NodeId, op: OpId },

    #[error("requirement '{req}' is not faulted")]
    NotFaulted { req: ReqId },

    #[error("state '{state}' of node '{node}' has no handler for requirement '{req}'")]
    HandlerUnavailable {
        node: NodeId,
        state: StateId,
        req: ReqId,
    },

    #[error("hard reset is not enabled")]
    HardResetDisabled,

    #[error("node '{node}' has no container")]
    NotContained { node: NodeId },

    #[error("container '{container}' of node '{node}' is alive")]
    ContainerAlive { node: NodeId, container: NodeId },

    #[error(transparent)]
    Node(#[from] NodeMoveError),
}

/// Canonical identity of a configuration
///
/// Format: `"node=state|node=state|…"` with tokens sorted lexicographically
/// by the full `node=state` token. Equal assignments always produce equal
/// keys, and the format is stable for downstream tooling.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GlobalState(String);

impl GlobalState {
    fn of_nodes(nodes: &BTreeMap<NodeId, NodeInstance>) -> Self {
        let mut tokens: Vec<String> = nodes
            .iter()
            .map(|(id, inst)| format!("{}={}", id, inst.state_id()))
            .collect();
        tokens.sort();
        Self(tokens.join("|"))
    }

    /// View the key as a plain string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GlobalState {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GlobalState {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Static wiring shared by every snapshot of one analysis: the binding, the
/// containment relation, the hard-reset flag and the owner indices derived
/// from declared (not current-state) identifier sets.
#[derive(Debug)]
struct Topology {
    binding: BTreeMap<ReqId, CapId>,
    contained_by: BTreeMap<NodeId, NodeId>,
    hard_reset: bool,
    req_owner: BTreeMap<ReqId, NodeId>,
    cap_owner: BTreeMap<CapId, NodeId>,
}

/// One immutable configuration of the whole application
#[derive(Debug, Clone)]
pub struct Application {
    nodes: BTreeMap<NodeId, NodeInstance>,
    topo: Arc<Topology>,

    // derived per snapshot
    reqs: BTreeSet<ReqId>,
    caps: BTreeSet<CapId>,
    faults: BTreeSet<ReqId>,
    containment_consistent: bool,
    global_state: GlobalState,
}

impl Application {
    /// Build the initial application, validating the cross-node invariants
    ///
    /// Each requirement and capability identifier may be declared by at most
    /// one node; the binding must cover every declared requirement with
    /// declared identifiers on both sides; containment must relate known
    /// nodes.
    pub fn new(
        nodes: BTreeMap<NodeId, NodeInstance>,
        binding: BTreeMap<ReqId, CapId>,
        contained_by: BTreeMap<NodeId, NodeId>,
        hard_reset: bool,
    ) -> Result<Self, SpecError> {
        let mut req_owner: BTreeMap<ReqId, NodeId> = BTreeMap::new();
        let mut cap_owner: BTreeMap<CapId, NodeId> = BTreeMap::new();
        for (node_id, inst) in &nodes {
            for req in &inst.spec().reqs {
                if let Some(first) = req_owner.insert(req.clone(), node_id.clone()) {
                    return Err(SpecError::DuplicateReq {
                        req: req.clone(),
                        first,
                        second: node_id.clone(),
                    });
                }
            }
            for cap in &inst.spec().caps {
                if let Some(first) = cap_owner.insert(cap.clone(), node_id.clone()) {
                    return Err(SpecError::DuplicateCap {
                        cap: cap.clone(),
                        first,
                        second: node_id.clone(),
                    });
                }
            }
        }

        for (req, owner) in &req_owner {
            if !binding.contains_key(req) {
                return Err(SpecError::UnboundReq {
                    req: req.clone(),
                    node: owner.clone(),
                });
            }
        }
        for (req, cap) in &binding {
            if !req_owner.contains_key(req) {
                return Err(SpecError::UnknownBoundReq { req: req.clone() });
            }
            if !cap_owner.contains_key(cap) {
                return Err(SpecError::UnknownBoundCap {
                    req: req.clone(),
                    cap: cap.clone(),
                });
            }
        }

        for (child, parent) in &contained_by {
            if !nodes.contains_key(child) {
                return Err(SpecError::UnknownContained {
                    node: child.clone(),
                });
            }
            if !nodes.contains_key(parent) {
                return Err(SpecError::UnknownContainer {
                    node: child.clone(),
                    container: parent.clone(),
                });
            }
        }

        let topo = Arc::new(Topology {
            binding,
            contained_by,
            hard_reset,
            req_owner,
            cap_owner,
        });
        Ok(Self::derive(nodes, topo))
    }

    /// Compute every per-snapshot derived fact with one walk over the nodes
    fn derive(nodes: BTreeMap<NodeId, NodeInstance>, topo: Arc<Topology>) -> Self {
        let mut reqs = BTreeSet::new();
        let mut caps = BTreeSet::new();
        let mut containment_consistent = true;

        for (node_id, inst) in &nodes {
            let state = inst.state();
            reqs.extend(state.reqs.iter().cloned());
            caps.extend(state.caps.iter().cloned());

            if state.is_alive {
                if let Some(parent) = topo.contained_by.get(node_id) {
                    let parent_alive = nodes.get(parent).is_some_and(|p| p.is_alive());
                    if !parent_alive {
                        containment_consistent = false;
                    }
                }
            }
        }

        let faults = reqs
            .iter()
            .filter(|req| match topo.binding.get(*req) {
                Some(cap) => !caps.contains(cap),
                None => true,
            })
            .cloned()
            .collect();
        let global_state = GlobalState::of_nodes(&nodes);

        Self {
            nodes,
            topo,
            reqs,
            caps,
            faults,
            containment_consistent,
            global_state,
        }
    }

    /// Successor differing in exactly one node entry
    fn with_node(&self, node_id: &NodeId, inst: NodeInstance) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.insert(node_id.clone(), inst);
        Self::derive(nodes, Arc::clone(&self.topo))
    }

    /// The node instances of this configuration
    pub fn nodes(&self) -> &BTreeMap<NodeId, NodeInstance> {
        &self.nodes
    }

    /// Look up one node
    pub fn node(&self, id: &NodeId) -> Option<&NodeInstance> {
        self.nodes.get(id)
    }

    /// The requirement → capability binding
    pub fn binding(&self) -> &BTreeMap<ReqId, CapId> {
        &self.topo.binding
    }

    /// The containment relation (child → container)
    pub fn contained_by(&self) -> &BTreeMap<NodeId, NodeId> {
        &self.topo.contained_by
    }

    /// Whether the hard-reset move is enabled
    pub fn has_hard_reset(&self) -> bool {
        self.topo.hard_reset
    }

    /// Which node declares each requirement
    pub fn req_owner(&self) -> &BTreeMap<ReqId, NodeId> {
        &self.topo.req_owner
    }

    /// Which node declares each capability
    pub fn cap_owner(&self) -> &BTreeMap<CapId, NodeId> {
        &self.topo.cap_owner
    }

    /// Requirements demanded by some current state
    pub fn reqs(&self) -> &BTreeSet<ReqId> {
        &self.reqs
    }

    /// Capabilities offered by some current state
    pub fn caps(&self) -> &BTreeSet<CapId> {
        &self.caps
    }

    /// Active requirements whose bound capability is not offered
    pub fn faults(&self) -> &BTreeSet<ReqId> {
        &self.faults
    }

    /// No faults pending
    pub fn is_consistent(&self) -> bool {
        self.faults.is_empty()
    }

    /// Every currently-alive contained node has an alive container
    pub fn is_containment_consistent(&self) -> bool {
        self.containment_consistent
    }

    /// Canonical identity of this configuration
    pub fn global_state(&self) -> &GlobalState {
        &self.global_state
    }

    /// A requirement is satisfied when its bound capability is currently
    /// offered somewhere in the application
    pub fn is_satisfied(&self, req: &ReqId) -> bool {
        self.topo
            .binding
            .get(req)
            .is_some_and(|cap| self.caps.contains(cap))
    }

    /// First failing precondition for performing an operation, if any
    ///
    /// Check order is contractual: global consistency, then (with hard
    /// reset enabled) containment consistency, then node existence, then op
    /// availability, then requirement satisfaction.
    pub fn unsatisfied_op_constraints(&self, node_id: &NodeId, op_id: &OpId) -> Option<MoveError> {
        if !self.is_consistent() {
            return Some(MoveError::FaultsPending);
        }
        if self.topo.hard_reset && !self.containment_consistent {
            return Some(MoveError::LivenessConstraintFailing);
        }
        let Some(node) = self.nodes.get(node_id) else {
            return Some(MoveError::UnknownNode {
                node: node_id.clone(),
            });
        };
        let Some(op) = node.state().ops.get(op_id) else {
            return Some(MoveError::OpUnavailable {
                node: node_id.clone(),
                state: node.state_id().clone(),
                op: op_id.clone(),
            });
        };
        let enabled = op
            .reqs
            .iter()
            .any(|alt| alt.iter().all(|req| self.is_satisfied(req)));
        if !enabled {
            return Some(MoveError::OpRequirementsUnsatisfied {
                node: node_id.clone(),
                op: op_id.clone(),
            });
        }
        None
    }

    /// First failing precondition for handling a fault, if any
    ///
    /// Handlers exist to drain faults, so there is deliberately no global
    /// consistency gate here: only the named requirement must be faulted.
    pub fn unsatisfied_handler_constraints(
        &self,
        node_id: &NodeId,
        req_id: &ReqId,
    ) -> Option<MoveError> {
        if !self.faults.contains(req_id) {
            return Some(MoveError::NotFaulted {
                req: req_id.clone(),
            });
        }
        let Some(node) = self.nodes.get(node_id) else {
            return Some(MoveError::UnknownNode {
                node: node_id.clone(),
            });
        };
        if !node.state().handlers.contains_key(req_id) {
            return Some(MoveError::HandlerUnavailable {
                node: node_id.clone(),
                state: node.state_id().clone(),
                req: req_id.clone(),
            });
        }
        None
    }

    /// First failing precondition for a hard reset, if any
    ///
    /// Legal only when the feature is enabled and the node's immediate
    /// container is not alive: the move models rebooting a contained node
    /// after its host has died.
    pub fn unsatisfied_hard_reset_constraints(&self, node_id: &NodeId) -> Option<MoveError> {
        if !self.topo.hard_reset {
            return Some(MoveError::HardResetDisabled);
        }
        let Some(container) = self.topo.contained_by.get(node_id) else {
            return Some(MoveError::NotContained {
                node: node_id.clone(),
            });
        };
        let container_alive = self.nodes.get(container).is_some_and(|c| c.is_alive());
        if container_alive {
            return Some(MoveError::ContainerAlive {
                node: node_id.clone(),
                container: container.clone(),
            });
        }
        None
    }

    /// Whether performing `op_id` on `node_id` is legal
    pub fn can_perform_op(&self, node_id: &NodeId, op_id: &OpId) -> bool {
        self.unsatisfied_op_constraints(node_id, op_id).is_none()
    }

    /// Whether handling the fault on `req_id` through `node_id` is legal
    pub fn can_handle_fault(&self, node_id: &NodeId, req_id: &ReqId) -> bool {
        self.unsatisfied_handler_constraints(node_id, req_id)
            .is_none()
    }

    /// Whether hard-resetting `node_id` is legal
    pub fn can_hard_reset(&self, node_id: &NodeId) -> bool {
        self.unsatisfied_hard_reset_constraints(node_id).is_none()
    }

    /// Perform an operation, producing the successor configuration
    pub fn perform_op(&self, node_id: &NodeId, op_id: &OpId) -> Result<Self, MoveError> {
        if let Some(err) = self.unsatisfied_op_constraints(node_id, op_id) {
            return Err(err);
        }
        let next = self.nodes[node_id].perform_op(op_id)?;
        Ok(self.with_node(node_id, next))
    }

    /// Handle a fault, producing the successor configuration
    pub fn handle_fault(&self, node_id: &NodeId, req_id: &ReqId) -> Result<Self, MoveError> {
        if let Some(err) = self.unsatisfied_handler_constraints(node_id, req_id) {
            return Err(err);
        }
        let next = self.nodes[node_id].handle_fault(req_id)?;
        Ok(self.with_node(node_id, next))
    }

    /// Hard-reset a node, producing the successor configuration
    pub fn hard_reset(&self, node_id: &NodeId) -> Result<Self, MoveError> {
        if let Some(err) = self.unsatisfied_hard_reset_constraints(node_id) {
            return Err(err);
        }
        let next = self.nodes[node_id].hard_reset();
        Ok(self.with_node(node_id, next))
    }

    /// Apply a move witness, dispatching on its kind
    pub fn apply(&self, step: &Step) -> Result<Self, MoveError> {
        match step {
            Step::Op { node, op } => self.perform_op(node, op),
            Step::Handle { node, req } => self.handle_fault(node, req),
            Step::Reset { node } => self.hard_reset(node),
        }
    }

    /// Enumerate every legal move together with its successor
    ///
    /// The order is the witness-preference order shared by reachability and
    /// the planner: every operation on every node, then every fault handle
    /// on every declared requirement of every node, then every hard reset;
    /// nodes, operations and requirements each in lexicographic id order.
    pub fn legal_moves(&self) -> Vec<(Step, Application)> {
        let mut moves = Vec::new();

        for (node_id, inst) in &self.nodes {
            for op_id in inst.state().ops.keys() {
                if let Ok(next) = self.perform_op(node_id, op_id) {
                    moves.push((
                        Step::Op {
                            node: node_id.clone(),
                            op: op_id.clone(),
                        },
                        next,
                    ));
                }
            }
        }

        for (node_id, inst) in &self.nodes {
            for req_id in &inst.spec().reqs {
                if let Ok(next) = self.handle_fault(node_id, req_id) {
                    moves.push((
                        Step::Handle {
                            node: node_id.clone(),
                            req: req_id.clone(),
                        },
                        next,
                    ));
                }
            }
        }

        for node_id in self.nodes.keys() {
            if let Ok(next) = self.hard_reset(node_id) {
                moves.push((
                    Step::Reset {
                        node: node_id.clone(),
                    },
                    next,
                ));
            }
        }

        moves
    }
}
