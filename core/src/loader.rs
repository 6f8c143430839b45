//! JSON topology documents
//!
//! Documents describe nodes, binding and containment in a hand-editable
//! shape and build into a validated [`Application`]. Absent fields default
//! liberally: states are alive unless marked otherwise, an operation
//! without `requires` is unconditional, and a node's declared identifier
//! sets are derived from its states when not spelled out.

use crate::app::Application;
use crate::model::{
    CapId, NodeId, NodeInstance, NodeSpec, OpId, Operation, ReqId, SpecError, State, StateId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Result type for document loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Document loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// A whole application topology
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDoc {
    /// Enable the hard-reset move (and the liveness gate on operations)
    #[serde(default)]
    pub hard_reset: bool,

    /// Requirement → capability binding
    #[serde(default)]
    pub binding: BTreeMap<ReqId, CapId>,

    /// Containment relation, child → container
    #[serde(default)]
    pub contained_by: BTreeMap<NodeId, NodeId>,

    /// The nodes of the application
    pub nodes: BTreeMap<NodeId, NodeDoc>,
}

/// One node's protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDoc {
    /// Opaque kind tag, unused by the analyses
    #[serde(default, rename = "type")]
    pub kind: String,

    /// Initial state
    pub initial: StateId,

    /// Declared capabilities; derived from the states when omitted
    #[serde(default)]
    pub caps: Option<BTreeSet<CapId>>,

    /// Declared requirements; derived from the states when omitted
    #[serde(default)]
    pub reqs: Option<BTreeSet<ReqId>>,

    /// Declared operation labels; derived from the states when omitted
    #[serde(default)]
    pub ops: Option<BTreeSet<OpId>>,

    /// The protocol states
    pub states: BTreeMap<StateId, StateDoc>,
}

/// One protocol state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDoc {
    /// Liveness for containment purposes; alive unless marked otherwise
    #[serde(default = "default_alive")]
    pub alive: bool,

    #[serde(default)]
    pub caps: BTreeSet<CapId>,

    #[serde(default)]
    pub reqs: BTreeSet<ReqId>,

    #[serde(default)]
    pub ops: BTreeMap<OpId, OpDoc>,

    #[serde(default)]
    pub handlers: BTreeMap<ReqId, StateId>,
}

/// One labelled transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpDoc {
    /// Destination state
    pub to: StateId,

    /// Requirement alternatives; absent or empty means unconditional
    #[serde(default)]
    pub requires: Vec<BTreeSet<ReqId>>,
}

fn default_alive() -> bool {
    true
}

impl ApplicationDoc {
    /// Build the validated initial application
    pub fn build(&self) -> Result<Application, SpecError> {
        let mut nodes = BTreeMap::new();
        for (node_id, doc) in &self.nodes {
            let spec = doc.build_spec()?;
            nodes.insert(node_id.clone(), NodeInstance::new(Arc::new(spec)));
        }
        Application::new(
            nodes,
            self.binding.clone(),
            self.contained_by.clone(),
            self.hard_reset,
        )
    }
}

impl NodeDoc {
    fn build_spec(&self) -> Result<NodeSpec, SpecError> {
        let mut states = BTreeMap::new();
        for (state_id, doc) in &self.states {
            let ops = doc
                .ops
                .iter()
                .map(|(op_id, op)| {
                    let reqs = if op.requires.is_empty() {
                        vec![BTreeSet::new()]
                    } else {
                        op.requires.clone()
                    };
                    (
                        op_id.clone(),
                        Operation {
                            to: op.to.clone(),
                            reqs,
                        },
                    )
                })
                .collect();
            states.insert(
                state_id.clone(),
                State {
                    is_alive: doc.alive,
                    caps: doc.caps.clone(),
                    reqs: doc.reqs.clone(),
                    ops,
                    handlers: doc.handlers.clone(),
                },
            );
        }

        let caps = self
            .caps
            .clone()
            .unwrap_or_else(|| NodeSpec::caps_of(&states));
        let reqs = self
            .reqs
            .clone()
            .unwrap_or_else(|| NodeSpec::reqs_of(&states));
        let ops = self.ops.clone().unwrap_or_else(|| NodeSpec::ops_of(&states));
        NodeSpec::new(self.kind.clone(), self.initial.clone(), caps, reqs, ops, states)
    }
}

/// Load and build an application from a JSON document on disk
pub fn load_path(path: impl AsRef<Path>) -> LoadResult<Application> {
    let text = fs::read_to_string(path)?;
    let doc: ApplicationDoc = serde_json::from_str(&text)?;
    Ok(doc.build()?)
}
