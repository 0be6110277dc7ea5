//! Identifier newtypes shared across the runtime.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Simulation time in milliseconds.
pub type TimeMs = u64;

/// Unique identifier of an actor in the hosting game.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable id of one granted ability instance.
///
/// Two grants of the same configuration get different ids. The display form
/// doubles as the modifier source key and the component-tag owner key, so
/// everything an ability attaches can be removed in one sweep.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct AbilityId(pub u64);

impl AbilityId {
    /// Key stamped on every modifier this ability registers.
    pub fn source_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ability:{}", self.0)
    }
}

/// Execution instance id, unique within its owning ability.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exec:{}", self.0)
    }
}
