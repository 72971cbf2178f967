//! Resolved requirement-to-capability edges

use std::fmt;

use crate::model::{Capability, ModuleId, Requirement};

/// A requirement of `requirer` satisfied by a capability of `provider`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub requirer: ModuleId,
    pub requirement: Requirement,
    pub provider: ModuleId,
    pub capability: Capability,
}

impl Wire {
    /// A module may wire to its own capabilities
    pub fn is_self_wire(&self) -> bool {
        self.requirer == self.provider
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.requirer, self.requirement, self.provider
        )
    }
}
