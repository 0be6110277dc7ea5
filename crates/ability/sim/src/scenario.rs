//! Hero-versus-goblin duel on a fixed logic step.
//!
//! Each step the AI issues intent events, every actor receives them, tags and
//! components tick, timelines advance, and the domain events actions emit are
//! routed back onto the actors (damage to hit points, rallies to buffs).

use std::rc::Rc;

use ability_content::{AttributeTemplateLoader, SimConfig, TimelineLoader};
use ability_core::{
    Ability, AbilityId, AbilityInfo, Action, ActionError, Actor, ActorId, ActorSnapshot,
    AttributeChange, DurationComponent, EmitEventAction, GameEvent, GrantTagsComponent,
    HookDecision, MarkerActions, ModifierKind, ModifierSpec, ModifyBaseAction,
    StatModifierComponent, TimeMs, TimelineRegistry, TimelineTrigger, action_fn,
};
use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

pub const HERO: ActorId = ActorId(1);
pub const GOBLIN: ActorId = ActorId(2);

const DAMAGE: &str = "damage";
const RALLY: &str = "rally";
const FIREBALL_COST: f64 = 20.0;
/// Largest hit-point loss the hero's guard lets through in one change.
const GUARD_CAP: f64 = 25.0;

/// Game state threaded through every action.
#[derive(Debug, Default)]
pub struct Arena {
    pub fireball_casts: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimReport {
    pub elapsed_ms: TimeMs,
    pub winner: Option<ActorId>,
    pub fireball_casts: u32,
    pub damage_events: usize,
    pub markers_fired: usize,
    pub actors: Vec<ActorSnapshot>,
}

pub struct Duel {
    config: SimConfig,
    timelines: TimelineRegistry,
    actors: Vec<Actor<Arena>>,
    arena: Arena,
    now: TimeMs,
    next_ability_id: u64,
    damage_events: usize,
    markers_fired: usize,
}

impl Duel {
    /// Loads content named by `config` (or the embedded defaults) and sets up
    /// both combatants.
    pub fn new(config: SimConfig) -> Result<Self> {
        let timelines = match &config.content.timelines {
            Some(path) => TimelineLoader::load(path)?,
            None => TimelineLoader::embedded()?,
        };
        let timelines = TimelineLoader::into_registry(timelines)?;
        let templates = match &config.content.attributes {
            Some(path) => AttributeTemplateLoader::load(path)?,
            None => AttributeTemplateLoader::embedded()?,
        };

        let mut hero = Actor::with_attributes(
            HERO,
            AttributeTemplateLoader::find(&templates, "hero")?.build(&config.runtime),
        );
        let mut goblin = Actor::with_attributes(
            GOBLIN,
            AttributeTemplateLoader::find(&templates, "goblin")?.build(&config.runtime),
        );

        hero.attributes_mut().add_pre_change_hook("hp", |_, request| {
            if request.old_base - request.proposed > GUARD_CAP {
                HookDecision::Override(request.old_base - GUARD_CAP)
            } else {
                HookDecision::Proceed
            }
        });
        for actor in [&mut hero, &mut goblin] {
            let id = actor.id();
            actor
                .attributes_mut()
                .add_change_listener(move |change| log_hp_change(id, change));
        }

        hero.grant(fireball(AbilityId(1)));
        hero.grant(battle_cry(AbilityId(2)));
        goblin.grant(slash(AbilityId(3)));

        Ok(Self {
            config,
            timelines,
            actors: vec![hero, goblin],
            arena: Arena::default(),
            now: 0,
            next_ability_id: 100,
            damage_events: 0,
            markers_fired: 0,
        })
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor<Arena>> {
        self.actors.iter().find(|a| a.id() == id)
    }

    /// Steps until one side falls or the configured duration elapses.
    pub fn run(mut self) -> SimReport {
        let mut winner = None;
        while self.now < self.config.duration_ms {
            winner = self.step();
            if winner.is_some() {
                break;
            }
        }

        info!(
            elapsed_ms = self.now,
            winner = ?winner,
            casts = self.arena.fireball_casts,
            damage_events = self.damage_events,
            "duel finished"
        );
        SimReport {
            elapsed_ms: self.now,
            winner,
            fireball_casts: self.arena.fireball_casts,
            damage_events: self.damage_events,
            markers_fired: self.markers_fired,
            actors: self.actors.iter().map(Actor::snapshot).collect(),
        }
    }

    /// Advances one logic step and returns the winner once only one actor
    /// is standing.
    fn step(&mut self) -> Option<ActorId> {
        let dt = self.config.tick_ms;
        self.now += dt;

        for intent in self.intents() {
            for actor in self.actors.iter_mut() {
                actor.receive_event(&intent, &self.arena);
            }
        }
        for actor in self.actors.iter_mut() {
            actor.tick(dt, Some(self.now));
        }
        for actor in self.actors.iter_mut() {
            let fired = actor.tick_executions(dt, &self.timelines, &mut self.arena);
            self.markers_fired += fired.len();
        }

        let mut emitted = Vec::new();
        for actor in self.actors.iter_mut() {
            emitted.extend(actor.flush_events());
            actor.abilities_mut().prune_finished_instances();
        }
        for event in emitted {
            self.route(event);
        }

        let standing: Vec<ActorId> = self
            .actors
            .iter()
            .filter(|a| a.attributes().current_value("hp") > 0.0)
            .map(Actor::id)
            .collect();
        match standing.as_slice() {
            [survivor] => Some(*survivor),
            _ => None,
        }
    }

    /// What each side attempts this step. Triggers reject what is on
    /// cooldown, so intents are issued unconditionally apart from mana.
    fn intents(&self) -> Vec<GameEvent> {
        let mut intents = vec![GameEvent::new("battle_cry").with_source(HERO)];
        let mana = self
            .actor(HERO)
            .map(|hero| hero.attributes().current_value("mp"))
            .unwrap_or_default();
        if mana >= FIREBALL_COST {
            intents.push(
                GameEvent::new("cast_fireball")
                    .with_source(HERO)
                    .with_target(GOBLIN),
            );
        }
        intents.push(GameEvent::new("attack").with_source(GOBLIN).with_target(HERO));
        intents
    }

    fn route(&mut self, event: GameEvent) {
        match event.kind.as_str() {
            DAMAGE => {
                let amount = event.payload_f64("amount").unwrap_or_default();
                let Some(target) = event.target.and_then(|id| self.actor_mut(id)) else {
                    debug!(event = %event.kind, "damage without a live target");
                    return;
                };
                let dealt = (amount - target.attributes().current_value("def")).max(1.0);
                target.attributes_mut().modify_base("hp", -dealt);
                self.damage_events += 1;
            }
            RALLY => {
                let buff_id = AbilityId(self.next_ability_id);
                self.next_ability_id += 1;
                if let Some(actor) = event.source.and_then(|source| self.actor_mut(source)) {
                    let owner = actor.id();
                    actor.grant(rally_buff(buff_id, owner));
                }
            }
            other => debug!(event = other, "unrouted event"),
        }
    }

    fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor<Arena>> {
        self.actors.iter_mut().find(|a| a.id() == id)
    }
}

fn log_hp_change(actor: ActorId, change: &AttributeChange) {
    if change.attribute == "hp" {
        info!(
            actor = %actor,
            old = change.old_value,
            new = change.new_value,
            "hit points changed"
        );
    }
}

/// Emits damage scaled from the owner's current attack at the moment the
/// marker fires, so buffs granted mid-cast still count.
fn strike(scale: f64) -> Rc<dyn Action<Arena>> {
    action_fn::<Arena, _>("strike", move |ctx| {
        let target = ctx
            .triggering_event()
            .and_then(|e| e.target)
            .ok_or_else(|| ActionError::InvalidTarget("strike without a target".into()))?;
        let amount = ctx.attributes.current_value("atk") * scale;
        ctx.emit(
            GameEvent::new(DAMAGE)
                .with_source(ctx.ability.owner)
                .with_target(target)
                .with_payload(json!({ "amount": amount })),
        );
        Ok(())
    })
}

fn fireball(id: AbilityId) -> Ability<Arena> {
    let actions = MarkerActions::<Arena>::new()
        .with("cast", Rc::new(ModifyBaseAction::new("mp", -FIREBALL_COST)))
        .with(
            "cast",
            action_fn::<Arena, _>("count_cast", |ctx| {
                ctx.state.fireball_casts += 1;
                Ok(())
            }),
        )
        .with("hit*", strike(0.8));

    Ability::builder(AbilityInfo::new(id, "fireball", HERO).with_tags(["spell"]))
        .with_component(
            TimelineTrigger::new("cast_fireball", "fireball", actions)
                .owner_only()
                .blocked_by("silenced")
                .with_cooldown("cd:fireball", 1500),
        )
        .build()
}

fn battle_cry(id: AbilityId) -> Ability<Arena> {
    let actions = MarkerActions::<Arena>::new()
        .with("shout", Rc::new(EmitEventAction::new(RALLY, json!({}))));
    Ability::builder(AbilityInfo::new(id, "battle_cry", HERO))
        .with_component(
            TimelineTrigger::new("battle_cry", "battle_cry", actions)
                .owner_only()
                .with_cooldown("cd:battle_cry", 4000),
        )
        .build()
}

fn rally_buff(id: AbilityId, owner: ActorId) -> Ability<Arena> {
    Ability::builder(AbilityInfo::new(id, "rally", owner).with_source(owner))
        .with_component(StatModifierComponent::new(vec![ModifierSpec::new(
            "atk",
            ModifierKind::MulBase,
            0.5,
        )]))
        .with_component(DurationComponent::new(2000))
        .with_component(GrantTagsComponent::new(["enraged"]))
        .build()
}

fn slash(id: AbilityId) -> Ability<Arena> {
    let actions = MarkerActions::<Arena>::new().with("hit", strike(1.0));
    Ability::builder(AbilityInfo::new(id, "slash", GOBLIN))
        .with_component(
            TimelineTrigger::new("attack", "slash", actions)
                .owner_only()
                .single_instance()
                .with_cooldown("cd:slash", 900),
        )
        .build()
}
