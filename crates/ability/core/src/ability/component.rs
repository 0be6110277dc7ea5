//! Behavior components attached to an ability at construction.
//!
//! Components are the seam where game content plugs into the lifecycle:
//! each one reacts to apply, tick, incoming events and expiry through a
//! [`ComponentContext`] that lends it the owner's attributes and tags and the
//! ability's execution list.

use std::fmt;

use super::info::AbilityInfo;
use crate::attribute::{AttributeError, AttributeSet};
use crate::error::{FaultClass, RuntimeFault};
use crate::event::GameEvent;
use crate::execution::{ExecutionConfig, Executions};
use crate::ids::{InstanceId, TimeMs};
use crate::tag::TagContainer;

/// Errors reported by ability components.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ComponentError {
    #[error("component `{component}` failed: {reason}")]
    Failed { component: String, reason: String },

    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

impl ComponentError {
    pub fn failed(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            component: component.into(),
            reason: reason.into(),
        }
    }
}

impl RuntimeFault for ComponentError {
    fn class(&self) -> FaultClass {
        match self {
            Self::Failed { .. } => FaultClass::Component,
            Self::Attribute(inner) => inner.class(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Failed { .. } => "COMPONENT_FAILED",
            Self::Attribute(inner) => inner.error_code(),
        }
    }
}

/// Why an ability stopped being in effect.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpireReason {
    /// Removed by game code through the ability set.
    Revoked,
    /// Its lifetime ran out.
    Duration,
    /// Removed by a dispel effect.
    Dispelled,
    /// Superseded by another grant.
    Replaced,
    Custom(String),
}

impl ExpireReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Revoked => "revoked",
            Self::Duration => "duration",
            Self::Dispelled => "dispelled",
            Self::Replaced => "replaced",
            Self::Custom(reason) => reason,
        }
    }
}

impl fmt::Display for ExpireReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a component may touch while handling a lifecycle callback.
pub struct ComponentContext<'a, S = ()> {
    pub ability: &'a AbilityInfo,
    pub attributes: &'a mut AttributeSet,
    pub tags: &'a mut TagContainer,
    pub(crate) executions: &'a mut Executions<S>,
    pub(crate) expire_request: &'a mut Option<ExpireReason>,
}

impl<S> ComponentContext<'_, S> {
    /// Starts a new execution instance on the owning ability.
    pub fn activate(&mut self, config: ExecutionConfig<S>) -> InstanceId {
        self.executions.activate(config)
    }

    /// Number of the ability's instances still playing.
    pub fn executing_count(&self) -> usize {
        self.executions.executing_count()
    }

    /// Asks the ability to expire once the current callback pass finishes.
    /// The first request wins.
    pub fn request_expire(&mut self, reason: ExpireReason) {
        if self.expire_request.is_none() {
            *self.expire_request = Some(reason);
        }
    }

    pub fn expire_requested(&self) -> bool {
        self.expire_request.is_some()
    }
}

/// Behavior attached to an ability.
///
/// Every callback defaults to a no-op so components only implement what they
/// react to. Callbacks run in registration order.
pub trait AbilityComponent<S = ()> {
    fn name(&self) -> &str;

    /// Called once when the ability is granted.
    fn on_apply(&mut self, _ctx: &mut ComponentContext<'_, S>) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_tick(
        &mut self,
        _dt: TimeMs,
        _ctx: &mut ComponentContext<'_, S>,
    ) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called for every event dispatched to the owning set. The component
    /// decides whether the event is relevant.
    fn on_event(
        &mut self,
        _event: &GameEvent,
        _state: &S,
        _ctx: &mut ComponentContext<'_, S>,
    ) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called once when the ability expires, before its modifiers are swept.
    fn on_expire(
        &mut self,
        _reason: &ExpireReason,
        _ctx: &mut ComponentContext<'_, S>,
    ) -> Result<(), ComponentError> {
        Ok(())
    }
}
