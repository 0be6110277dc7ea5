use std::fmt;

use tracing::debug;

use crate::ability::component::{AbilityComponent, ComponentContext, ComponentError};
use crate::ability::info::AbilityInfo;
use crate::event::GameEvent;
use crate::execution::{ExecutionConfig, MarkerActions};
use crate::ids::TimeMs;

type TriggerPredicate<S> = Box<dyn Fn(&GameEvent, &AbilityInfo, &S) -> bool>;

/// Starts a timeline playback when a matching event arrives.
///
/// Activation is gated, in order, by: event kind, owner filter, predicate,
/// blocking tags, the cooldown tag, and the single-instance guard. On
/// activation the cooldown tag (if any) is put on the owner as a duration tag
/// and the triggering event becomes the instance's trigger chain.
pub struct TimelineTrigger<S = ()> {
    event_kind: String,
    timeline_id: String,
    actions: MarkerActions<S>,
    predicate: Option<TriggerPredicate<S>>,
    owner_only: bool,
    cooldown: Option<(String, TimeMs)>,
    blocked_by: Vec<String>,
    single_instance: bool,
}

impl<S> TimelineTrigger<S> {
    pub fn new(
        event_kind: impl Into<String>,
        timeline_id: impl Into<String>,
        actions: MarkerActions<S>,
    ) -> Self {
        Self {
            event_kind: event_kind.into(),
            timeline_id: timeline_id.into(),
            actions,
            predicate: None,
            owner_only: false,
            cooldown: None,
            blocked_by: Vec::new(),
            single_instance: false,
        }
    }

    /// Extra condition evaluated against the event, ability and game state.
    #[must_use]
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&GameEvent, &AbilityInfo, &S) -> bool + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Only react to events whose source is the ability owner.
    #[must_use]
    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    /// Puts `tag` on the owner for `duration` ms on each activation and
    /// refuses to activate while it is present.
    #[must_use]
    pub fn with_cooldown(mut self, tag: impl Into<String>, duration: TimeMs) -> Self {
        self.cooldown = Some((tag.into(), duration));
        self
    }

    #[must_use]
    pub fn blocked_by(mut self, tag: impl Into<String>) -> Self {
        self.blocked_by.push(tag.into());
        self
    }

    /// Refuse to activate while a previous playback is still executing.
    #[must_use]
    pub fn single_instance(mut self) -> Self {
        self.single_instance = true;
        self
    }

    pub fn event_kind(&self) -> &str {
        &self.event_kind
    }

    pub fn timeline_id(&self) -> &str {
        &self.timeline_id
    }

    fn gate(
        &self,
        event: &GameEvent,
        state: &S,
        ctx: &ComponentContext<'_, S>,
    ) -> Option<&'static str> {
        if self.owner_only && event.source != Some(ctx.ability.owner) {
            return Some("not from owner");
        }
        if let Some(predicate) = &self.predicate {
            if !predicate(event, ctx.ability, state) {
                return Some("predicate rejected");
            }
        }
        if self.blocked_by.iter().any(|tag| ctx.tags.has_tag(tag)) {
            return Some("blocked by tag");
        }
        if let Some((tag, _)) = &self.cooldown {
            if ctx.tags.has_tag(tag) {
                return Some("on cooldown");
            }
        }
        if self.single_instance && ctx.executing_count() > 0 {
            return Some("already executing");
        }
        None
    }
}

impl<S> AbilityComponent<S> for TimelineTrigger<S> {
    fn name(&self) -> &str {
        "timeline_trigger"
    }

    fn on_event(
        &mut self,
        event: &GameEvent,
        state: &S,
        ctx: &mut ComponentContext<'_, S>,
    ) -> Result<(), ComponentError> {
        if !event.is(&self.event_kind) {
            return Ok(());
        }
        if let Some(reason) = self.gate(event, state, ctx) {
            debug!(
                target: "ability_core::ability",
                ability = %ctx.ability.id,
                event = %event.kind,
                reason,
                "trigger suppressed"
            );
            return Ok(());
        }

        if let Some((tag, duration)) = &self.cooldown {
            ctx.tags.add_auto_duration_tag(tag, *duration);
        }
        let config = ExecutionConfig::new(self.timeline_id.clone(), self.actions.clone())
            .with_trigger(vec![event.clone()]);
        let instance = ctx.activate(config);
        debug!(
            target: "ability_core::ability",
            ability = %ctx.ability.id,
            instance = %instance,
            timeline = %self.timeline_id,
            "execution activated"
        );
        Ok(())
    }
}

impl<S> fmt::Debug for TimelineTrigger<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineTrigger")
            .field("event_kind", &self.event_kind)
            .field("timeline_id", &self.timeline_id)
            .field("actions", &self.actions)
            .field("owner_only", &self.owner_only)
            .field("cooldown", &self.cooldown)
            .field("blocked_by", &self.blocked_by)
            .field("single_instance", &self.single_instance)
            .finish_non_exhaustive()
    }
}
