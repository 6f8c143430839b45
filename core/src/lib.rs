//! topoplan-core
//!
//! Reachability and planning analyses for applications modeled as
//! interacting finite-state machines: nodes offer capabilities, demand
//! requirements and expose labelled operations and fault handlers; a
//! static binding wires requirements to capabilities and a containment
//! relation encodes liveness dependencies.

pub mod analysis; // reachability enumeration and the all-pairs planner
pub mod app;      // composed application snapshots and legality predicates
pub mod loader;   // JSON topology documents
pub mod model;    // identifiers, states, node specs and instances

pub use analysis::{plans, reachable, Plans};
pub use app::{Application, GlobalState, MoveError, Step};
pub use loader::{load_path, ApplicationDoc, LoadError, LoadResult};
pub use model::{
    CapId, NodeId, NodeInstance, NodeMoveError, NodeSpec, OpId, Operation, ReqId, SpecError,
    SpecResult, State, StateId,
};
