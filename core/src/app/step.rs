//! Move witnesses
//!
//! A [`Step`] names one legal application-level move: performing an
//! operation, handling a fault, or hard-resetting a node. The planner hands
//! these out as first-step witnesses.

use crate::model::{NodeId, OpId, ReqId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One application-level move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Perform operation `op` on `node`
    Op { node: NodeId, op: OpId },

    /// Drain the fault on requirement `req` through `node`'s handler
    Handle { node: NodeId, req: ReqId },

    /// Hard-reset `node` to its initial state
    Reset { node: NodeId },
}

impl Step {
    /// The node this move touches
    pub fn node(&self) -> &NodeId {
        match self {
            Step::Op { node, .. } | Step::Handle { node, .. } | Step::Reset { node } => node,
        }
    }

    /// Whether this is an operation step
    pub fn is_op(&self) -> bool {
        matches!(self, Step::Op { .. })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Op { node, op } => write!(f, "perform {op} on {node}"),
            Step::Handle { node, req } => write!(f, "handle {req} on {node}"),
            Step::Reset { node } => write!(f, "reset {node}"),
        }
    }
}

/// Wire shape of a step: `{nodeId, opId, isOp}`. `opId` holds the operation
/// id for an operation step, the faulted requirement id for a handle step,
/// and null for a hard reset.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepWire {
    node_id: NodeId,
    #[serde(default)]
    op_id: Option<String>,
    is_op: bool,
}

impl From<&Step> for StepWire {
    fn from(step: &Step) -> Self {
        match step {
            Step::Op { node, op } => StepWire {
                node_id: node.clone(),
                op_id: Some(op.0.clone()),
                is_op: true,
            },
            Step::Handle { node, req } => StepWire {
                node_id: node.clone(),
                op_id: Some(req.0.clone()),
                is_op: false,
            },
            Step::Reset { node } => StepWire {
                node_id: node.clone(),
                op_id: None,
                is_op: false,
            },
        }
    }
}

impl TryFrom<StepWire> for Step {
    type Error = String;

    fn try_from(wire: StepWire) -> Result<Self, Self::Error> {
        match (wire.is_op, wire.op_id) {
            (true, Some(op)) => Ok(Step::Op {
                node: wire.node_id,
                op: OpId(op),
            }),
            (false, Some(req)) => Ok(Step::Handle {
                node: wire.node_id,
                req: ReqId(req),
            }),
            (false, None) => Ok(Step::Reset {
                node: wire.node_id,
            }),
            (true, None) => Err("operation step is missing its opId".to_string()),
        }
    }
}

impl Serialize for Step {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        StepWire::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = StepWire::deserialize(deserializer)?;
        Step::try_from(wire).map_err(serde::de::Error::custom)
    }
}
