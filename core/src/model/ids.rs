//! Identifier newtypes
//!
//! All identifiers in the model are opaque strings, unique within their
//! scope. Newtypes keep node, state, operation, capability and requirement
//! names from being mixed up at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for node identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

/// Newtype wrapper for state identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub String);

/// Newtype wrapper for operation identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpId(pub String);

/// Newtype wrapper for capability identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapId(pub String);

/// Newtype wrapper for requirement identifiers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReqId(pub String);

impl NodeId {
    /// View the identifier as a plain string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl StateId {
    /// View the identifier as a plain string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl OpId {
    /// View the identifier as a plain string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl CapId {
    /// View the identifier as a plain string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ReqId {
    /// View the identifier as a plain string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OpId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OpId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CapId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CapId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ReqId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReqId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
