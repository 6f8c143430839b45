//! Static node model
//!
//! Identifiers, per-state descriptions, validated node specifications and
//! running node instances.

pub mod ids;
pub mod node;
pub mod state;

pub use ids::{CapId, NodeId, OpId, ReqId, StateId};
pub use node::{NodeInstance, NodeMoveError, NodeSpec, SpecError, SpecResult};
pub use state::{Operation, State};
