//! Per-actor ability set.
//!
//! Owns the actor's [`TagContainer`] and every granted [`Ability`], in grant
//! order. The driving loop talks to the runtime through three entry points:
//!
//! - [`AbilitySet::tick`]: advance the tag clock, then every live ability
//! - [`AbilitySet::tick_executions`]: advance every execution instance
//! - [`AbilitySet::receive_event`]: dispatch a domain event to every ability
//!
//! Abilities that expire during a tick are swept into revocation at the end
//! of that tick, so the tick never mutates the list it is iterating.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error, warn};

use crate::ability::{Ability, AbilitySnapshot, ExpireReason};
use crate::attribute::AttributeSet;
use crate::error::RuntimeFault;
use crate::event::GameEvent;
use crate::execution::ExecutionEnv;
use crate::ids::{AbilityId, ActorId, TimeMs};
use crate::observe::{Subscribers, Subscription};
use crate::tag::{TagChange, TagContainer, TagSnapshot};
use crate::timeline::TimelineRegistry;

/// Revoke reason recorded when the sweep removes an expired ability.
pub const SWEEP_REASON: &str = "expired";

/// Result of [`AbilitySet::grant_ability`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted(AbilityId),
    /// An ability with the same instance id is already held; nothing changed.
    DuplicateInstance(AbilityId),
}

impl GrantOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct AbilityGranted {
    pub owner: ActorId,
    pub ability_id: AbilityId,
    pub config_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct AbilityRevoked {
    pub owner: ActorId,
    pub ability_id: AbilityId,
    pub config_id: String,
    /// Why the set removed the ability (e.g. `"expired"`, `"dispel"`).
    pub reason: String,
    /// Why the ability itself expired.
    pub expire_reason: Option<ExpireReason>,
}

pub struct AbilitySet<S = ()> {
    owner: ActorId,
    tags: TagContainer,
    abilities: Vec<Ability<S>>,
    granted: Subscribers<AbilityGranted>,
    revoked: Subscribers<AbilityRevoked>,
}

impl<S> AbilitySet<S> {
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            tags: TagContainer::new(),
            abilities: Vec::new(),
            granted: Subscribers::new(),
            revoked: Subscribers::new(),
        }
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    // ========================================================================
    // Grant / revoke
    // ========================================================================

    /// Grants `ability`, running its apply effects against `attributes`.
    ///
    /// Instance ids must be unique within the set; any number of grants may
    /// share a configuration id.
    pub fn grant_ability(
        &mut self,
        mut ability: Ability<S>,
        attributes: &mut AttributeSet,
    ) -> GrantOutcome {
        let id = ability.id();
        if self.contains(id) {
            warn!(
                target: "ability_core::ability_set",
                owner = %self.owner,
                ability = %id,
                "ability instance already granted"
            );
            return GrantOutcome::DuplicateInstance(id);
        }

        ability.apply_effects(attributes, &mut self.tags);
        let notice = AbilityGranted {
            owner: self.owner,
            ability_id: id,
            config_id: ability.config_id().to_string(),
        };
        self.abilities.push(ability);
        debug!(
            target: "ability_core::ability_set",
            owner = %self.owner,
            ability = %id,
            config = %notice.config_id,
            "ability granted"
        );
        self.granted.notify(&notice);
        GrantOutcome::Granted(id)
    }

    /// Revokes the ability with instance id `id`.
    ///
    /// Expires it first if it is still live (with `expire_reason`, defaulting
    /// to [`ExpireReason::Revoked`]), removes its component tags and drops it.
    /// Returns false for unknown ids.
    pub fn revoke_ability(
        &mut self,
        id: AbilityId,
        reason: &str,
        expire_reason: Option<ExpireReason>,
        attributes: &mut AttributeSet,
    ) -> bool {
        let Some(index) = self.abilities.iter().position(|a| a.id() == id) else {
            return false;
        };

        let ability = &mut self.abilities[index];
        if !ability.is_expired() {
            ability.expire(
                expire_reason.unwrap_or(ExpireReason::Revoked),
                attributes,
                &mut self.tags,
            );
        }
        self.tags.remove_component_tags(id);
        let ability = self.abilities.remove(index);

        let notice = AbilityRevoked {
            owner: self.owner,
            ability_id: id,
            config_id: ability.config_id().to_string(),
            reason: reason.to_string(),
            expire_reason: ability.expire_reason().cloned(),
        };
        debug!(
            target: "ability_core::ability_set",
            owner = %self.owner,
            ability = %id,
            reason,
            "ability revoked"
        );
        self.revoked.notify(&notice);
        true
    }

    /// Revokes every ability built from `config_id`. Returns how many were
    /// removed.
    pub fn revoke_abilities_by_config_id(
        &mut self,
        config_id: &str,
        reason: &str,
        attributes: &mut AttributeSet,
    ) -> usize {
        let ids: Vec<AbilityId> = self
            .abilities
            .iter()
            .filter(|a| a.config_id() == config_id)
            .map(Ability::id)
            .collect();
        self.revoke_all(ids, reason, attributes)
    }

    /// Revokes every ability carrying `tag` on its [`AbilityInfo`](crate::AbilityInfo).
    pub fn revoke_abilities_by_tag(
        &mut self,
        tag: &str,
        reason: &str,
        attributes: &mut AttributeSet,
    ) -> usize {
        let ids: Vec<AbilityId> = self
            .abilities
            .iter()
            .filter(|a| a.has_tag(tag))
            .map(Ability::id)
            .collect();
        self.revoke_all(ids, reason, attributes)
    }

    fn revoke_all(
        &mut self,
        ids: Vec<AbilityId>,
        reason: &str,
        attributes: &mut AttributeSet,
    ) -> usize {
        ids.into_iter()
            .filter(|id| self.revoke_ability(*id, reason, None, attributes))
            .count()
    }

    fn sweep_expired(&mut self, attributes: &mut AttributeSet) -> usize {
        let expired: Vec<AbilityId> = self
            .abilities
            .iter()
            .filter(|a| a.is_expired())
            .map(Ability::id)
            .collect();
        self.revoke_all(expired, SWEEP_REASON, attributes)
    }

    // ========================================================================
    // Driving loop
    // ========================================================================

    /// Advances the set by `dt`.
    ///
    /// Tag expiry resolves first (`logic_time` overrides the tag clock), then
    /// every live ability ticks in grant order. Abilities expired before or
    /// during the tick are revoked at the end.
    pub fn tick(&mut self, dt: TimeMs, logic_time: Option<TimeMs>, attributes: &mut AttributeSet) {
        self.tags.tick(dt, logic_time);
        for ability in self.abilities.iter_mut() {
            if !ability.is_expired() {
                ability.tick(dt, attributes, &mut self.tags);
            }
        }
        self.sweep_expired(attributes);
    }

    /// Advances every execution instance by `dt` and returns the fired marker
    /// names, in grant then firing order.
    pub fn tick_executions(
        &mut self,
        dt: TimeMs,
        registry: &TimelineRegistry,
        attributes: &mut AttributeSet,
        state: &mut S,
    ) -> Vec<String> {
        let mut fired = Vec::new();
        {
            let mut env = ExecutionEnv {
                registry,
                attributes: &mut *attributes,
                tags: &mut self.tags,
                state,
            };
            for ability in self.abilities.iter_mut() {
                fired.extend(ability.tick_executions(dt, &mut env));
            }
        }
        self.sweep_expired(attributes);
        fired
    }

    /// Dispatches `event` to every live ability in grant order. A failing
    /// ability is logged and the rest still receive the event.
    pub fn receive_event(&mut self, event: &GameEvent, attributes: &mut AttributeSet, state: &S) {
        for ability in self.abilities.iter_mut() {
            if ability.is_expired() {
                continue;
            }
            if let Err(err) = ability.receive_event(event, attributes, &mut self.tags, state) {
                error!(
                    target: "ability_core::ability_set",
                    owner = %self.owner,
                    ability = %ability.id(),
                    event = %event.kind,
                    code = err.error_code(),
                    error = %err,
                    "event handling failed"
                );
            }
        }
    }

    /// Drains every instance's collected events, in grant order.
    pub fn flush_events(&mut self) -> Vec<GameEvent> {
        self.abilities
            .iter_mut()
            .flat_map(|ability| ability.flush_events())
            .collect()
    }

    /// Drops finished, flushed execution instances across all abilities.
    pub fn prune_finished_instances(&mut self) -> usize {
        self.abilities
            .iter_mut()
            .map(|ability| ability.prune_finished_instances())
            .sum()
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub fn add_loose_tag(&mut self, name: &str, stacks: u32) {
        self.tags.add_loose_tag(name, stacks);
    }

    pub fn remove_loose_tag(&mut self, name: &str, stacks: Option<u32>) -> u32 {
        self.tags.remove_loose_tag(name, stacks)
    }

    pub fn add_auto_duration_tag(&mut self, name: &str, duration: TimeMs) {
        self.tags.add_auto_duration_tag(name, duration);
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.has_tag(name)
    }

    pub fn tag_stacks(&self, name: &str) -> u32 {
        self.tags.tag_stacks(name)
    }

    pub fn all_tags(&self) -> BTreeMap<String, u32> {
        self.tags.all_tags()
    }

    pub fn on_tag_changed<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&TagChange) + 'static,
    {
        self.tags.on_tag_changed(listener)
    }

    pub fn remove_tag_listener(&mut self, subscription: Subscription) -> bool {
        self.tags.remove_tag_listener(subscription)
    }

    pub fn tags(&self) -> &TagContainer {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagContainer {
        &mut self.tags
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub fn on_ability_granted<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&AbilityGranted) + 'static,
    {
        self.granted.subscribe(listener)
    }

    pub fn remove_granted_listener(&mut self, subscription: Subscription) -> bool {
        self.granted.unsubscribe(subscription)
    }

    pub fn on_ability_revoked<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&AbilityRevoked) + 'static,
    {
        self.revoked.subscribe(listener)
    }

    pub fn remove_revoked_listener(&mut self, subscription: Subscription) -> bool {
        self.revoked.unsubscribe(subscription)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn contains(&self, id: AbilityId) -> bool {
        self.abilities.iter().any(|a| a.id() == id)
    }

    pub fn ability(&self, id: AbilityId) -> Option<&Ability<S>> {
        self.abilities.iter().find(|a| a.id() == id)
    }

    pub fn ability_mut(&mut self, id: AbilityId) -> Option<&mut Ability<S>> {
        self.abilities.iter_mut().find(|a| a.id() == id)
    }

    /// Granted abilities in grant order.
    pub fn abilities(&self) -> &[Ability<S>] {
        &self.abilities
    }

    pub fn abilities_by_config_id<'a>(
        &'a self,
        config_id: &'a str,
    ) -> impl Iterator<Item = &'a Ability<S>> + 'a {
        self.abilities.iter().filter(move |a| a.config_id() == config_id)
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    pub fn snapshot(&self) -> AbilitySetSnapshot {
        AbilitySetSnapshot {
            owner: self.owner,
            tags: self.tags.snapshot(),
            abilities: self.abilities.iter().map(Ability::snapshot).collect(),
        }
    }
}

impl<S> fmt::Debug for AbilitySet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilitySet")
            .field("owner", &self.owner)
            .field("tags", &self.tags)
            .field("abilities", &self.abilities)
            .finish()
    }
}

/// Shallow, serializable view of an ability set.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct AbilitySetSnapshot {
    pub owner: ActorId,
    pub tags: TagSnapshot,
    pub abilities: Vec<AbilitySnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{
        AbilityComponent, AbilityInfo, ComponentContext, ComponentError, DurationComponent,
        GrantTagsComponent,
    };
    use crate::ability::TimelineTrigger;
    use crate::attribute::{ModifierKind, ModifierSpec};
    use crate::execution::{AddModifierAction, MarkerActions};
    use crate::timeline::Timeline;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn tagged(id: u64, config: &str, tag: &str) -> Ability {
        Ability::builder(AbilityInfo::new(AbilityId(id), config, ActorId(1)).with_tags([tag]))
            .with_component(GrantTagsComponent::new(["held"]).with_stacks("poise", 3))
            .build()
    }

    /// Records whether a tag was visible when the ability ticked.
    struct TagProbe {
        tag: &'static str,
        seen: Rc<RefCell<Vec<bool>>>,
    }

    impl AbilityComponent for TagProbe {
        fn name(&self) -> &str {
            "tag_probe"
        }

        fn on_tick(
            &mut self,
            _dt: TimeMs,
            ctx: &mut ComponentContext<'_>,
        ) -> Result<(), ComponentError> {
            self.seen.borrow_mut().push(ctx.tags.has_tag(self.tag));
            Ok(())
        }
    }

    /// Fails every event it sees.
    struct Brittle;

    impl AbilityComponent for Brittle {
        fn name(&self) -> &str {
            "brittle"
        }

        fn on_event(
            &mut self,
            _event: &GameEvent,
            _state: &(),
            _ctx: &mut ComponentContext<'_>,
        ) -> Result<(), ComponentError> {
            Err(ComponentError::failed("brittle", "cannot handle events"))
        }
    }

    /// Asks its ability to expire when `kind` arrives.
    struct ExpireOn(&'static str);

    impl AbilityComponent for ExpireOn {
        fn name(&self) -> &str {
            "expire_on"
        }

        fn on_event(
            &mut self,
            event: &GameEvent,
            _state: &(),
            ctx: &mut ComponentContext<'_>,
        ) -> Result<(), ComponentError> {
            if event.kind == self.0 {
                ctx.request_expire(ExpireReason::Dispelled);
            }
            Ok(())
        }
    }

    fn empower_on_cast(id: u64) -> Ability {
        let spec = ModifierSpec::new("atk", ModifierKind::AddBase, 5.0);
        let action = Rc::new(AddModifierAction::new("empower", spec));
        let actions = MarkerActions::<()>::new().with("empower", action);
        Ability::builder(AbilityInfo::new(AbilityId(id), "empower", ActorId(1)))
            .with_component(TimelineTrigger::new("cast", "channel", actions))
            .build()
    }

    fn channel_registry() -> TimelineRegistry {
        [Timeline::new("channel", 1_000).with_marker("empower", 10)]
            .into_iter()
            .collect()
    }

    #[test]
    fn failing_ability_does_not_stop_event_dispatch() {
        let mut attributes = AttributeSet::new();
        attributes.define("atk", 10.0);
        let mut set = AbilitySet::<()>::new(ActorId(1));
        let brittle = Ability::builder(AbilityInfo::new(AbilityId(1), "brittle", ActorId(1)))
            .with_component(Brittle)
            .build();
        set.grant_ability(brittle, &mut attributes);
        set.grant_ability(empower_on_cast(2), &mut attributes);

        set.receive_event(&GameEvent::new("cast"), &mut attributes, &());

        let empower = set.ability(AbilityId(2)).unwrap();
        assert_eq!(empower.executing_instances().count(), 1);
        assert!(!set.ability(AbilityId(1)).unwrap().is_expired());
    }

    #[test]
    fn cancelled_executions_keep_modifiers_until_revoke() {
        let registry = channel_registry();
        let mut attributes = AttributeSet::new();
        attributes.define("atk", 10.0);
        let mut set = AbilitySet::<()>::new(ActorId(1));
        set.grant_ability(empower_on_cast(3), &mut attributes);

        set.receive_event(&GameEvent::new("cast"), &mut attributes, &());
        let fired = set.tick_executions(50, &registry, &mut attributes, &mut ());
        assert_eq!(fired, vec!["empower".to_string()]);
        assert_eq!(attributes.current_value("atk"), 15.0);

        assert_eq!(set.ability_mut(AbilityId(3)).unwrap().cancel_executions(), 1);
        set.tick_executions(50, &registry, &mut attributes, &mut ());
        assert_eq!(attributes.current_value("atk"), 15.0);
        assert!(set.contains(AbilityId(3)));

        assert!(set.revoke_ability(AbilityId(3), "manual", None, &mut attributes));
        assert_eq!(attributes.current_value("atk"), 10.0);
    }

    #[test]
    fn expiry_requested_by_event_is_swept_on_next_execution_tick() {
        let registry = channel_registry();
        let mut attributes = AttributeSet::new();
        let mut set = AbilitySet::<()>::new(ActorId(1));
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        set.on_ability_revoked(move |r| {
            sink.borrow_mut()
                .push((r.reason.clone(), r.expire_reason.clone()))
        });
        let fragile = Ability::builder(AbilityInfo::new(AbilityId(7), "ward", ActorId(1)))
            .with_component(ExpireOn("dispel"))
            .build();
        set.grant_ability(fragile, &mut attributes);

        set.receive_event(&GameEvent::new("dispel"), &mut attributes, &());
        assert_eq!(set.len(), 1);
        assert!(set.ability(AbilityId(7)).unwrap().is_expired());
        assert!(log.borrow().is_empty());

        set.tick_executions(10, &registry, &mut attributes, &mut ());
        assert!(set.is_empty());
        assert_eq!(
            *log.borrow(),
            vec![(SWEEP_REASON.to_string(), Some(ExpireReason::Dispelled))]
        );
    }

    #[test]
    fn duplicate_instance_is_rejected_same_config_is_not() {
        let mut attributes = AttributeSet::new();
        let mut set = AbilitySet::<()>::new(ActorId(1));

        assert!(set.grant_ability(tagged(1, "guard", "buff"), &mut attributes).is_granted());
        assert_eq!(
            set.grant_ability(tagged(1, "guard", "buff"), &mut attributes),
            GrantOutcome::DuplicateInstance(AbilityId(1))
        );
        assert!(set.grant_ability(tagged(2, "guard", "buff"), &mut attributes).is_granted());
        assert_eq!(set.len(), 2);
        assert_eq!(set.tag_stacks("poise"), 6);
        assert_eq!(set.abilities_by_config_id("guard").count(), 2);
    }

    #[test]
    fn revoke_is_idempotent() {
        let mut attributes = AttributeSet::new();
        let mut set = AbilitySet::<()>::new(ActorId(1));
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        set.on_ability_revoked(move |r| sink.borrow_mut().push(r.clone()));

        set.grant_ability(tagged(1, "guard", "buff"), &mut attributes);
        assert!(set.revoke_ability(
            AbilityId(1),
            "dispel",
            Some(ExpireReason::Dispelled),
            &mut attributes
        ));
        assert!(!set.revoke_ability(AbilityId(1), "dispel", None, &mut attributes));

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].reason, "dispel");
        assert_eq!(log[0].expire_reason, Some(ExpireReason::Dispelled));
        assert!(!set.has_tag("held"));
    }

    #[test]
    fn revoking_one_provenance_keeps_loose_tags() {
        let mut attributes = AttributeSet::new();
        let mut set = AbilitySet::<()>::new(ActorId(1));
        set.add_loose_tag("poise", 2);
        set.grant_ability(tagged(1, "guard", "buff"), &mut attributes);
        assert_eq!(set.tag_stacks("poise"), 5);

        set.revoke_ability(AbilityId(1), "manual", None, &mut attributes);
        assert_eq!(set.tag_stacks("poise"), 2);
    }

    #[test]
    fn bulk_revoke_by_tag_and_config() {
        let mut attributes = AttributeSet::new();
        let mut set = AbilitySet::<()>::new(ActorId(1));
        set.grant_ability(tagged(1, "guard", "buff"), &mut attributes);
        set.grant_ability(tagged(2, "curse", "debuff"), &mut attributes);
        set.grant_ability(tagged(3, "curse", "debuff"), &mut attributes);

        assert_eq!(set.revoke_abilities_by_tag("debuff", "cleanse", &mut attributes), 2);
        assert_eq!(set.revoke_abilities_by_config_id("guard", "reset", &mut attributes), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn tag_expiry_resolves_before_ability_ticks() {
        let mut attributes = AttributeSet::new();
        let mut set = AbilitySet::<()>::new(ActorId(1));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let probe = Ability::builder(AbilityInfo::new(AbilityId(1), "probe", ActorId(1)))
            .with_component(TagProbe {
                tag: "stunned",
                seen: Rc::clone(&seen),
            })
            .build();
        set.grant_ability(probe, &mut attributes);
        set.add_auto_duration_tag("stunned", 100);

        set.tick(50, None, &mut attributes);
        set.tick(50, None, &mut attributes);
        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn expired_abilities_are_swept_at_end_of_tick() {
        let mut attributes = AttributeSet::new();
        let mut set = AbilitySet::<()>::new(ActorId(1));
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        set.on_ability_revoked(move |r| {
            sink.borrow_mut()
                .push((r.reason.clone(), r.expire_reason.clone()))
        });

        let timed = Ability::builder(AbilityInfo::new(AbilityId(5), "haste", ActorId(1)))
            .with_component(DurationComponent::new(100))
            .build();
        set.grant_ability(timed, &mut attributes);

        set.tick(100, None, &mut attributes);
        assert!(set.is_empty());
        assert_eq!(
            *log.borrow(),
            vec![(SWEEP_REASON.to_string(), Some(ExpireReason::Duration))]
        );
    }

    #[test]
    fn snapshot_serializes() {
        let mut attributes = AttributeSet::new();
        let mut set = AbilitySet::<()>::new(ActorId(4));
        set.grant_ability(tagged(1, "guard", "buff"), &mut attributes);
        let json = serde_json::to_value(set.snapshot()).unwrap();
        assert_eq!(json["owner"], 4);
        assert_eq!(json["abilities"][0]["config_id"], "guard");
        assert_eq!(json["tags"]["totals"]["poise"], 3);
    }
}
