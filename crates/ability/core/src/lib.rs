//! Deterministic ability and attribute runtime shared by combat simulators.
//!
//! `ability-core` is the substrate every skill, buff, cooldown and stat
//! computation is built on. It knows nothing about damage formulas, targeting
//! or AI; those live in the hosting game and talk to this crate through
//! [`GameEvent`]s, actions and the opaque game state passed to them.
//!
//! Components, leaf first:
//! - [`attribute`]: four-layer modifier calculation and the per-actor
//!   [`AttributeSet`] with cached breakdowns, constraints, hooks and listeners
//! - [`tag`]: the [`TagContainer`] multiset of loose, duration and
//!   ability-owned markers
//! - [`timeline`]: immutable marker timelines shared through a
//!   [`TimelineRegistry`]
//! - [`execution`]: [`ExecutionInstance`]s that walk a timeline and fire the
//!   actions bound to each marker exactly once
//! - [`ability`]: granted [`Ability`] instances composed of behavior components
//! - [`ability_set`]: the per-actor [`AbilitySet`] that grants, revokes, ticks
//!   and dispatches events
//!
//! Everything is single-threaded and step-driven: each `tick` or
//! `receive_event` call completes all of its mutations before returning.
pub mod ability;
pub mod ability_set;
pub mod actor;
pub mod attribute;
pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod ids;
pub mod observe;
pub mod tag;
pub mod timeline;

pub use ability::{
    Ability, AbilityBuilder, AbilityComponent, AbilityInfo, AbilitySnapshot, ComponentContext,
    ComponentError, DurationComponent, ExpireReason, GrantTagsComponent, MarkerTriggered,
    StatModifierComponent, TimelineTrigger,
};
pub use ability_set::{
    AbilityGranted, AbilityRevoked, AbilitySet, AbilitySetSnapshot, GrantOutcome,
};
pub use actor::{Actor, ActorSnapshot};
pub use attribute::{
    AttributeBreakdown, AttributeChange, AttributeError, AttributeModifier, AttributeSet,
    AttributeSetSnapshot, BaseChangeOutcome, BaseChangeRequest, BaseChanged, ChangeCause,
    HookDecision, ModifierKind, ModifierSpec, calculate,
};
pub use config::RuntimeConfig;
pub use error::{FaultClass, RuntimeFault};
pub use event::{EventCollector, GameEvent};
pub use execution::{
    Action, ActionContext, ActionError, AddDurationTagAction, AddModifierAction,
    EmitEventAction, ExecutionConfig, ExecutionEnv, ExecutionInfo, ExecutionInstance,
    ExecutionSnapshot, ExecutionState, Executions, FnAction, MarkerActions, ModifyBaseAction,
    action_fn,
};
pub use ids::{AbilityId, ActorId, InstanceId, TimeMs};
pub use observe::{Subscribers, Subscription};
pub use tag::{TagChange, TagContainer, TagSnapshot};
pub use timeline::{Timeline, TimelineIssue, TimelineMarker, TimelineRegistry};
