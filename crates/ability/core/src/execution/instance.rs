use std::collections::HashSet;
use std::fmt;

use tracing::{error, trace, warn};

use super::action::{ActionContext, ExecutionInfo};
use super::markers::MarkerActions;
use crate::ability::AbilityInfo;
use crate::attribute::AttributeSet;
use crate::error::RuntimeFault;
use crate::event::{EventCollector, GameEvent};
use crate::ids::{InstanceId, TimeMs};
use crate::tag::TagContainer;
use crate::timeline::TimelineRegistry;

/// Lifecycle of an execution instance. `Completed` and `Cancelled` are
/// terminal.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Executing,
    Completed,
    Cancelled,
}

impl ExecutionState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// What to play and how to react to it.
pub struct ExecutionConfig<S = ()> {
    pub timeline_id: String,
    pub actions: MarkerActions<S>,
    /// Event chain that caused the activation.
    pub trigger: Vec<GameEvent>,
}

impl<S> ExecutionConfig<S> {
    pub fn new(timeline_id: impl Into<String>, actions: MarkerActions<S>) -> Self {
        Self {
            timeline_id: timeline_id.into(),
            actions,
            trigger: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: Vec<GameEvent>) -> Self {
        self.trigger = trigger;
        self
    }
}

impl<S> Clone for ExecutionConfig<S> {
    fn clone(&self) -> Self {
        Self {
            timeline_id: self.timeline_id.clone(),
            actions: self.actions.clone(),
            trigger: self.trigger.clone(),
        }
    }
}

/// Mutable world an execution ticks against.
pub struct ExecutionEnv<'a, S = ()> {
    pub registry: &'a TimelineRegistry,
    pub attributes: &'a mut AttributeSet,
    pub tags: &'a mut TagContainer,
    pub state: &'a mut S,
}

/// One playback of a timeline.
///
/// Every marker fires at most once: on each tick, markers whose offset has
/// been reached are marked fired first and then run in ascending offset
/// order, so a zero-offset marker fires on the very first tick.
pub struct ExecutionInstance<S = ()> {
    id: InstanceId,
    timeline_id: String,
    actions: MarkerActions<S>,
    elapsed: TimeMs,
    state: ExecutionState,
    fired: HashSet<String>,
    trigger: Vec<GameEvent>,
    collector: EventCollector,
}

impl<S> ExecutionInstance<S> {
    pub fn new(id: InstanceId, config: ExecutionConfig<S>) -> Self {
        Self {
            id,
            timeline_id: config.timeline_id,
            actions: config.actions,
            elapsed: 0,
            state: ExecutionState::Executing,
            fired: HashSet::new(),
            trigger: config.trigger,
            collector: EventCollector::new(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn timeline_id(&self) -> &str {
        &self.timeline_id
    }

    pub fn elapsed(&self) -> TimeMs {
        self.elapsed
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn is_executing(&self) -> bool {
        self.state == ExecutionState::Executing
    }

    pub fn has_fired(&self, marker: &str) -> bool {
        self.fired.contains(marker)
    }

    pub fn trigger(&self) -> &[GameEvent] {
        &self.trigger
    }

    /// Advances the playback by `dt` and runs every newly reached marker.
    /// Returns the marker names fired during this tick, in firing order.
    pub fn tick(
        &mut self,
        dt: TimeMs,
        ability: &AbilityInfo,
        env: &mut ExecutionEnv<'_, S>,
    ) -> Vec<String> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        let Some(timeline) = env.registry.get(&self.timeline_id) else {
            warn!(
                target: "ability_core::execution",
                ability = %ability.id,
                instance = %self.id,
                timeline = %self.timeline_id,
                "unknown timeline; completing without actions"
            );
            self.state = ExecutionState::Completed;
            return Vec::new();
        };

        self.elapsed = self.elapsed.saturating_add(dt);

        let mut due = Vec::new();
        for marker in timeline.ordered_markers() {
            if marker.at <= self.elapsed && self.fired.insert(marker.name.clone()) {
                due.push(marker.name.clone());
            }
        }

        for marker in &due {
            self.run_marker(marker, ability, env);
        }

        if self.elapsed >= timeline.total_duration {
            self.state = ExecutionState::Completed;
            trace!(
                target: "ability_core::execution",
                ability = %ability.id,
                instance = %self.id,
                elapsed = self.elapsed,
                "execution completed"
            );
        }
        due
    }

    fn run_marker(&mut self, marker: &str, ability: &AbilityInfo, env: &mut ExecutionEnv<'_, S>) {
        trace!(
            target: "ability_core::execution",
            ability = %ability.id,
            instance = %self.id,
            marker,
            "marker fired"
        );

        for action in self.actions.resolve(marker) {
            let mut ctx = ActionContext {
                trigger: &self.trigger,
                ability,
                execution: ExecutionInfo {
                    instance_id: self.id,
                    timeline_id: &self.timeline_id,
                    elapsed: self.elapsed,
                    marker,
                },
                attributes: &mut *env.attributes,
                tags: &mut *env.tags,
                state: &mut *env.state,
                events: &mut self.collector,
            };
            if let Err(err) = action.execute(&mut ctx) {
                error!(
                    target: "ability_core::execution",
                    ability = %ability.id,
                    instance = %self.id,
                    marker,
                    action = action.name(),
                    code = err.error_code(),
                    error = %err,
                    "action failed"
                );
            }
        }
    }

    /// Stops the playback. Effects of already-fired markers stay.
    /// Returns false if the instance had already finished.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = ExecutionState::Cancelled;
        true
    }

    /// Events produced so far, without draining.
    pub fn collected_events(&self) -> &[GameEvent] {
        self.collector.events()
    }

    pub fn flush_events(&mut self) -> Vec<GameEvent> {
        self.collector.drain()
    }

    pub fn snapshot(&self) -> ExecutionSnapshot {
        let mut fired: Vec<String> = self.fired.iter().cloned().collect();
        fired.sort();
        ExecutionSnapshot {
            id: self.id,
            timeline_id: self.timeline_id.clone(),
            elapsed: self.elapsed,
            state: self.state,
            fired,
            pending_events: self.collector.len(),
        }
    }
}

impl<S> fmt::Debug for ExecutionInstance<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionInstance")
            .field("id", &self.id)
            .field("timeline_id", &self.timeline_id)
            .field("elapsed", &self.elapsed)
            .field("state", &self.state)
            .field("fired", &self.fired.len())
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ExecutionSnapshot {
    pub id: InstanceId,
    pub timeline_id: String,
    pub elapsed: TimeMs,
    pub state: ExecutionState,
    /// Fired marker names, sorted.
    pub fired: Vec<String>,
    pub pending_events: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::action::action_fn;
    use crate::ids::{AbilityId, ActorId};
    use crate::timeline::Timeline;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recording_actions(log: &Log, patterns: &[&str]) -> MarkerActions<()> {
        let mut actions = MarkerActions::new();
        for pattern in patterns {
            let sink = Rc::clone(log);
            actions.bind(
                *pattern,
                action_fn::<(), _>(format!("record_{pattern}"), move |ctx| {
                    sink.borrow_mut().push(ctx.execution.marker.to_string());
                    Ok(())
                }),
            );
        }
        actions
    }

    struct World {
        registry: TimelineRegistry,
        attributes: AttributeSet,
        tags: TagContainer,
        info: AbilityInfo,
    }

    impl World {
        fn new(timelines: Vec<Timeline>) -> Self {
            Self {
                registry: timelines.into_iter().collect(),
                attributes: AttributeSet::new(),
                tags: TagContainer::new(),
                info: AbilityInfo::new(AbilityId(1), "test", ActorId(0)),
            }
        }

        fn tick(&mut self, instance: &mut ExecutionInstance<()>, dt: TimeMs) -> Vec<String> {
            let mut state = ();
            let mut env = ExecutionEnv {
                registry: &self.registry,
                attributes: &mut self.attributes,
                tags: &mut self.tags,
                state: &mut state,
            };
            instance.tick(dt, &self.info, &mut env)
        }
    }

    #[test]
    fn markers_fire_once_in_offset_order() {
        let log: Log = Rc::default();
        let mut world = World::new(vec![
            Timeline::new("t", 300)
                .with_marker("c", 250)
                .with_marker("a", 100)
                .with_marker("b", 100),
        ]);
        let mut instance = ExecutionInstance::new(
            InstanceId(0),
            ExecutionConfig::new("t", recording_actions(&log, &["a", "b", "c"])),
        );

        let mut per_tick = Vec::new();
        for _ in 0..8 {
            per_tick.push(world.tick(&mut instance, 40));
        }

        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert!(per_tick[0].is_empty() && per_tick[1].is_empty());
        assert_eq!(per_tick[2], vec!["a", "b"]);
        assert_eq!(per_tick[6], vec!["c"]);
        assert_eq!(instance.state(), ExecutionState::Completed);
    }

    #[test]
    fn zero_offset_marker_fires_on_first_tick() {
        let log: Log = Rc::default();
        let mut world = World::new(vec![Timeline::new("t", 2000).with_marker("hit", 0)]);
        let mut instance = ExecutionInstance::new(
            InstanceId(0),
            ExecutionConfig::new("t", recording_actions(&log, &["hit"])),
        );

        world.tick(&mut instance, 2000);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(instance.state(), ExecutionState::Completed);

        assert!(world.tick(&mut instance, 2000).is_empty());
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn marker_past_end_needs_an_overshooting_tick() {
        let log: Log = Rc::default();
        let timelines = vec![Timeline::new("t", 100).with_marker("late", 150)];

        let mut world = World::new(timelines.clone());
        let mut exact = ExecutionInstance::new(
            InstanceId(0),
            ExecutionConfig::new("t", recording_actions(&log, &["late"])),
        );
        assert!(world.tick(&mut exact, 100).is_empty());
        assert_eq!(exact.state(), ExecutionState::Completed);
        assert!(log.borrow().is_empty());

        let mut world = World::new(timelines);
        let mut overshoot = ExecutionInstance::new(
            InstanceId(1),
            ExecutionConfig::new("t", recording_actions(&log, &["late"])),
        );
        assert_eq!(world.tick(&mut overshoot, 200), vec!["late".to_string()]);
        assert_eq!(overshoot.state(), ExecutionState::Completed);
        assert_eq!(*log.borrow(), vec!["late"]);
    }

    #[test]
    fn unknown_timeline_completes_immediately() {
        let log: Log = Rc::default();
        let mut world = World::new(Vec::new());
        let mut instance = ExecutionInstance::new(
            InstanceId(0),
            ExecutionConfig::new("missing", recording_actions(&log, &["hit"])),
        );
        assert!(world.tick(&mut instance, 10).is_empty());
        assert_eq!(instance.state(), ExecutionState::Completed);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failing_action_does_not_stop_the_rest() {
        let log: Log = Rc::default();
        let mut world = World::new(vec![
            Timeline::new("t", 100).with_marker("a", 0).with_marker("b", 50),
        ]);
        let mut actions = MarkerActions::<()>::new();
        actions.bind(
            "a",
            action_fn::<(), _>("boom", |_| Err(crate::execution::ActionError::failed("boom"))),
        );
        let sink = Rc::clone(&log);
        actions.bind(
            "*",
            action_fn::<(), _>("record", move |ctx| {
                sink.borrow_mut().push(ctx.execution.marker.to_string());
                Ok(())
            }),
        );
        let mut instance =
            ExecutionInstance::new(InstanceId(0), ExecutionConfig::new("t", actions));

        let fired = world.tick(&mut instance, 100);
        assert_eq!(fired, vec!["a", "b"]);
        assert_eq!(*log.borrow(), vec!["b"]);
    }

    #[test]
    fn cancel_is_terminal() {
        let log: Log = Rc::default();
        let mut world = World::new(vec![Timeline::new("t", 100).with_marker("late", 80)]);
        let mut instance = ExecutionInstance::new(
            InstanceId(0),
            ExecutionConfig::new("t", recording_actions(&log, &["late"])),
        );
        world.tick(&mut instance, 40);
        assert!(instance.cancel());
        assert!(!instance.cancel());
        world.tick(&mut instance, 100);
        assert!(log.borrow().is_empty());
        assert_eq!(instance.state(), ExecutionState::Cancelled);
    }

    #[test]
    fn collected_events_peek_then_flush() {
        let mut world = World::new(vec![Timeline::new("t", 10).with_marker("go", 0)]);
        let actions = MarkerActions::<()>::new().with(
            "go",
            action_fn::<(), _>("emit", |ctx| {
                ctx.emit(GameEvent::new("ping"));
                Ok(())
            }),
        );
        let mut instance =
            ExecutionInstance::new(InstanceId(3), ExecutionConfig::new("t", actions));
        world.tick(&mut instance, 10);

        assert_eq!(instance.collected_events().len(), 1);
        assert_eq!(instance.snapshot().pending_events, 1);
        assert_eq!(instance.flush_events()[0].kind, "ping");
        assert!(instance.collected_events().is_empty());
    }
}
