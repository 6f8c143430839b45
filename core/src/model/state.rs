//! Per-state descriptions
//!
//! A state describes what a node offers and demands while it is in that
//! state, which labelled operations leave it, and which faults it can
//! handle.

use super::ids::{CapId, OpId, ReqId, StateId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A labelled transition out of a state
///
/// The operation is enabled iff at least one of its requirement-alternative
/// sets is entirely satisfied in the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Destination state
    pub to: StateId,

    /// Requirement alternatives, in declaration order. An unconditional
    /// operation carries a single empty set; the list itself is never empty.
    pub reqs: Vec<BTreeSet<ReqId>>,
}

impl Operation {
    /// Unconditional operation to `to` (a single empty alternative)
    pub fn new(to: impl Into<StateId>) -> Self {
        Self {
            to: to.into(),
            reqs: vec![BTreeSet::new()],
        }
    }

    /// Operation gated on every requirement of one alternative set
    pub fn requiring<I, R>(to: impl Into<StateId>, alt: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ReqId>,
    {
        Self {
            to: to.into(),
            reqs: vec![alt.into_iter().map(Into::into).collect()],
        }
    }

    /// Add a further alternative set
    pub fn or_requiring<I, R>(mut self, alt: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ReqId>,
    {
        self.reqs.push(alt.into_iter().map(Into::into).collect());
        self
    }
}

/// One state of a node's protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Whether a node in this state counts as live for containment purposes
    pub is_alive: bool,

    /// Capabilities offered while in this state
    pub caps: BTreeSet<CapId>,

    /// Requirements demanded while in this state
    pub reqs: BTreeSet<ReqId>,

    /// Transitions enabled from this state
    pub ops: BTreeMap<OpId, Operation>,

    /// Fault handlers: fallback state per requirement that may fail here
    pub handlers: BTreeMap<ReqId, StateId>,
}

impl State {
    /// Empty state with the given liveness
    pub fn new(is_alive: bool) -> Self {
        Self {
            is_alive,
            caps: BTreeSet::new(),
            reqs: BTreeSet::new(),
            ops: BTreeMap::new(),
            handlers: BTreeMap::new(),
        }
    }

    /// Empty live state
    pub fn alive() -> Self {
        Self::new(true)
    }

    /// Empty dead state
    pub fn dead() -> Self {
        Self::new(false)
    }

    /// Offer a capability in this state
    pub fn with_cap(mut self, cap: impl Into<CapId>) -> Self {
        self.caps.insert(cap.into());
        self
    }

    /// Demand a requirement in this state
    pub fn with_req(mut self, req: impl Into<ReqId>) -> Self {
        self.reqs.insert(req.into());
        self
    }

    /// Add an outgoing operation
    pub fn with_op(mut self, id: impl Into<OpId>, op: Operation) -> Self {
        self.ops.insert(id.into(), op);
        self
    }

    /// Add a fault handler
    pub fn with_handler(mut self, req: impl Into<ReqId>, to: impl Into<StateId>) -> Self {
        self.handlers.insert(req.into(), to.into());
        self
    }
}
