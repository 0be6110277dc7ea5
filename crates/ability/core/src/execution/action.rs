//! Actions fired at timeline markers and the context they run in.
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::error::ActionError;
use crate::ability::AbilityInfo;
use crate::attribute::{AttributeError, AttributeSet, BaseChangeOutcome, ModifierSpec};
use crate::event::{EventCollector, GameEvent};
use crate::ids::{InstanceId, TimeMs};
use crate::tag::TagContainer;

/// Where in its execution an action is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionInfo<'a> {
    pub instance_id: InstanceId,
    pub timeline_id: &'a str,
    pub elapsed: TimeMs,
    pub marker: &'a str,
}

/// Everything an action may read or mutate, scoped to one marker firing.
pub struct ActionContext<'a, S = ()> {
    /// Event chain that started the execution, outermost first.
    pub trigger: &'a [GameEvent],
    pub ability: &'a AbilityInfo,
    pub execution: ExecutionInfo<'a>,
    pub attributes: &'a mut AttributeSet,
    pub tags: &'a mut TagContainer,
    /// Opaque game state owned by the hosting loop.
    pub state: &'a mut S,
    pub events: &'a mut EventCollector,
}

impl<S> ActionContext<'_, S> {
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// The event that directly caused the execution, if any.
    pub fn triggering_event(&self) -> Option<&GameEvent> {
        self.trigger.last()
    }
}

/// A unit of work bound to a marker.
///
/// Actions are shared between every execution activated from the same
/// binding table, so they take `&self`.
pub trait Action<S = ()> {
    fn name(&self) -> &str;

    fn execute(&self, ctx: &mut ActionContext<'_, S>) -> Result<(), ActionError>;
}

/// Adapter turning a closure into an [`Action`].
pub struct FnAction<F> {
    name: String,
    run: F,
}

impl<F> FnAction<F> {
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

impl<S, F> Action<S> for FnAction<F>
where
    F: Fn(&mut ActionContext<'_, S>) -> Result<(), ActionError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &mut ActionContext<'_, S>) -> Result<(), ActionError> {
        (self.run)(ctx)
    }
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction").field("name", &self.name).finish()
    }
}

/// Wraps a closure as a shareable action.
pub fn action_fn<S, F>(name: impl Into<String>, run: F) -> Rc<dyn Action<S>>
where
    F: Fn(&mut ActionContext<'_, S>) -> Result<(), ActionError> + 'static,
    S: 'static,
{
    Rc::new(FnAction::new(name, run))
}

// ============================================================================
// Built-in actions
// ============================================================================

/// Shifts an attribute's base value on the owning actor.
#[derive(Clone, Debug, PartialEq)]
pub struct ModifyBaseAction {
    pub attribute: String,
    pub delta: f64,
}

impl ModifyBaseAction {
    pub fn new(attribute: impl Into<String>, delta: f64) -> Self {
        Self {
            attribute: attribute.into(),
            delta,
        }
    }
}

impl<S> Action<S> for ModifyBaseAction {
    fn name(&self) -> &str {
        "modify_base"
    }

    fn execute(&self, ctx: &mut ActionContext<'_, S>) -> Result<(), ActionError> {
        match ctx.attributes.modify_base(&self.attribute, self.delta) {
            BaseChangeOutcome::UnknownAttribute => {
                Err(AttributeError::Undefined(self.attribute.clone()).into())
            }
            _ => Ok(()),
        }
    }
}

/// Registers a modifier sourced to the executing ability.
///
/// The modifier outlives the execution: cancelling the instance leaves it in
/// place until the ability expires and its source is swept.
#[derive(Clone, Debug, PartialEq)]
pub struct AddModifierAction {
    pub key: String,
    pub spec: ModifierSpec,
}

impl AddModifierAction {
    pub fn new(key: impl Into<String>, spec: ModifierSpec) -> Self {
        Self {
            key: key.into(),
            spec,
        }
    }
}

impl<S> Action<S> for AddModifierAction {
    fn name(&self) -> &str {
        "add_modifier"
    }

    fn execute(&self, ctx: &mut ActionContext<'_, S>) -> Result<(), ActionError> {
        let source = ctx.ability.source_key();
        let modifier = self
            .spec
            .instantiate(format!("{source}/{}", self.key), &source);
        if ctx.attributes.add_modifier(modifier) {
            Ok(())
        } else {
            Err(AttributeError::Undefined(self.spec.attribute.clone()).into())
        }
    }
}

/// Emits a domain event from the ability owner.
///
/// The target is copied from the triggering event so follow-up effects land
/// on whoever the activation aimed at.
#[derive(Clone, Debug, PartialEq)]
pub struct EmitEventAction {
    pub kind: String,
    pub payload: Value,
}

impl EmitEventAction {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

impl<S> Action<S> for EmitEventAction {
    fn name(&self) -> &str {
        "emit_event"
    }

    fn execute(&self, ctx: &mut ActionContext<'_, S>) -> Result<(), ActionError> {
        let mut event = GameEvent::new(self.kind.clone())
            .with_source(ctx.ability.owner)
            .with_payload(self.payload.clone());
        if let Some(target) = ctx.triggering_event().and_then(|e| e.target) {
            event = event.with_target(target);
        }
        ctx.emit(event);
        Ok(())
    }
}

/// Adds one duration stack of a tag on the owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddDurationTagAction {
    pub tag: String,
    pub duration: TimeMs,
}

impl AddDurationTagAction {
    pub fn new(tag: impl Into<String>, duration: TimeMs) -> Self {
        Self {
            tag: tag.into(),
            duration,
        }
    }
}

impl<S> Action<S> for AddDurationTagAction {
    fn name(&self) -> &str {
        "add_duration_tag"
    }

    fn execute(&self, ctx: &mut ActionContext<'_, S>) -> Result<(), ActionError> {
        ctx.tags.add_auto_duration_tag(&self.tag, self.duration);
        Ok(())
    }
}
