use crate::ability::{Ability, ExpireReason};
use crate::ability_set::{AbilitySet, AbilitySetSnapshot, GrantOutcome};
use crate::attribute::{AttributeSet, AttributeSetSnapshot};
use crate::event::GameEvent;
use crate::ids::{AbilityId, ActorId, TimeMs};
use crate::timeline::TimelineRegistry;

/// One combatant: an attribute set plus the abilities and tags acting on it.
///
/// Delegates to the two containers while lending each one the other, which
/// is the borrow shape every ability-set call needs.
#[derive(Debug)]
pub struct Actor<S = ()> {
    id: ActorId,
    attributes: AttributeSet,
    abilities: AbilitySet<S>,
}

impl<S> Actor<S> {
    pub fn new(id: ActorId) -> Self {
        Self::with_attributes(id, AttributeSet::new())
    }

    pub fn with_attributes(id: ActorId, attributes: AttributeSet) -> Self {
        Self {
            id,
            attributes,
            abilities: AbilitySet::new(id),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeSet {
        &mut self.attributes
    }

    pub fn abilities(&self) -> &AbilitySet<S> {
        &self.abilities
    }

    pub fn abilities_mut(&mut self) -> &mut AbilitySet<S> {
        &mut self.abilities
    }

    pub fn grant(&mut self, ability: Ability<S>) -> GrantOutcome {
        self.abilities.grant_ability(ability, &mut self.attributes)
    }

    pub fn revoke(
        &mut self,
        id: AbilityId,
        reason: &str,
        expire_reason: Option<ExpireReason>,
    ) -> bool {
        self.abilities
            .revoke_ability(id, reason, expire_reason, &mut self.attributes)
    }

    pub fn tick(&mut self, dt: TimeMs, logic_time: Option<TimeMs>) {
        self.abilities.tick(dt, logic_time, &mut self.attributes);
    }

    pub fn tick_executions(
        &mut self,
        dt: TimeMs,
        registry: &TimelineRegistry,
        state: &mut S,
    ) -> Vec<String> {
        self.abilities
            .tick_executions(dt, registry, &mut self.attributes, state)
    }

    pub fn receive_event(&mut self, event: &GameEvent, state: &S) {
        self.abilities.receive_event(event, &mut self.attributes, state);
    }

    pub fn flush_events(&mut self) -> Vec<GameEvent> {
        self.abilities.flush_events()
    }

    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id,
            attributes: self.attributes.snapshot(),
            abilities: self.abilities.snapshot(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ActorSnapshot {
    pub id: ActorId,
    pub attributes: AttributeSetSnapshot,
    pub abilities: AbilitySetSnapshot,
}
