//! Granted abilities.
//!
//! An [`Ability`] is one grant of a configuration to an actor: an
//! [`AbilityInfo`], a fixed ordered list of behavior components, an expiry
//! state and the execution instances it has activated.
//!
//! Lifecycle: applied at grant → ticked and fed events → expired (once).
//! Expiry runs every component's `on_expire` and then sweeps every modifier
//! sourced to the ability.
pub mod component;
pub mod components;
pub mod info;

use std::fmt;

use tracing::{debug, error};

pub use component::{AbilityComponent, ComponentContext, ComponentError, ExpireReason};
pub use components::{
    DurationComponent, GrantTagsComponent, StatModifierComponent, TimelineTrigger,
};
pub use info::AbilityInfo;

use crate::attribute::AttributeSet;
use crate::error::RuntimeFault;
use crate::event::GameEvent;
use crate::execution::{
    ExecutionConfig, ExecutionEnv, ExecutionInstance, ExecutionSnapshot, Executions,
};
use crate::ids::{AbilityId, ActorId, InstanceId, TimeMs};
use crate::observe::{Subscribers, Subscription};
use crate::tag::TagContainer;

/// Notification sent when an execution instance fires a marker.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MarkerTriggered {
    pub ability_id: AbilityId,
    pub config_id: String,
    pub instance_id: InstanceId,
    pub marker: String,
}

/// How a component pass reacts to a failing component.
#[derive(Clone, Copy, PartialEq, Eq)]
enum OnError {
    LogAndContinue,
    Stop,
}

pub struct Ability<S = ()> {
    info: AbilityInfo,
    components: Vec<Box<dyn AbilityComponent<S>>>,
    expired: Option<ExpireReason>,
    executions: Executions<S>,
    triggered: Subscribers<MarkerTriggered>,
}

impl<S> Ability<S> {
    pub fn new(info: AbilityInfo, components: Vec<Box<dyn AbilityComponent<S>>>) -> Self {
        Self {
            info,
            components,
            expired: None,
            executions: Executions::new(),
            triggered: Subscribers::new(),
        }
    }

    pub fn builder(info: AbilityInfo) -> AbilityBuilder<S> {
        AbilityBuilder {
            info,
            components: Vec::new(),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn id(&self) -> AbilityId {
        self.info.id
    }

    pub fn config_id(&self) -> &str {
        &self.info.config_id
    }

    pub fn owner(&self) -> ActorId {
        self.info.owner
    }

    pub fn info(&self) -> &AbilityInfo {
        &self.info
    }

    pub fn is_expired(&self) -> bool {
        self.expired.is_some()
    }

    pub fn expire_reason(&self) -> Option<&ExpireReason> {
        self.expired.as_ref()
    }

    /// Whether the ability itself carries `tag` (not the owner's tag container).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.info.has_tag(tag)
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Runs every component's `on_apply` in registration order. Called once
    /// by the ability set at grant time.
    pub fn apply_effects(&mut self, attributes: &mut AttributeSet, tags: &mut TagContainer) {
        let (request, _) = self.run_components(
            attributes,
            tags,
            OnError::LogAndContinue,
            "on_apply",
            |component, ctx| component.on_apply(ctx),
        );
        if let Some(reason) = request {
            self.expire(reason, attributes, tags);
        }
    }

    /// Expires the ability. Returns false if it had already expired.
    ///
    /// Executing instances are cancelled, components see `on_expire`, then
    /// every modifier sourced to the ability is removed.
    pub fn expire(
        &mut self,
        reason: ExpireReason,
        attributes: &mut AttributeSet,
        tags: &mut TagContainer,
    ) -> bool {
        if self.expired.is_some() {
            return false;
        }
        self.expired = Some(reason.clone());
        self.executions.cancel_all();

        self.run_components(
            attributes,
            tags,
            OnError::LogAndContinue,
            "on_expire",
            |component, ctx| component.on_expire(&reason, ctx),
        );
        let removed = attributes.remove_modifiers_by_source(&self.info.source_key());

        debug!(
            target: "ability_core::ability",
            ability = %self.info.id,
            config = %self.info.config_id,
            reason = %reason,
            modifiers_removed = removed,
            "ability expired"
        );
        true
    }

    /// Advances components by `dt`. A component may request expiry, which
    /// takes effect once every component has ticked.
    pub fn tick(&mut self, dt: TimeMs, attributes: &mut AttributeSet, tags: &mut TagContainer) {
        if self.is_expired() {
            return;
        }
        let (request, _) = self.run_components(
            attributes,
            tags,
            OnError::LogAndContinue,
            "on_tick",
            |component, ctx| component.on_tick(dt, ctx),
        );
        if let Some(reason) = request {
            self.expire(reason, attributes, tags);
        }
    }

    /// Forwards `event` to every component, stopping at the first error.
    pub fn receive_event(
        &mut self,
        event: &GameEvent,
        attributes: &mut AttributeSet,
        tags: &mut TagContainer,
        state: &S,
    ) -> Result<(), ComponentError> {
        if self.is_expired() {
            return Ok(());
        }
        let (request, result) =
            self.run_components(attributes, tags, OnError::Stop, "on_event", |component, ctx| {
                component.on_event(event, state, ctx)
            });
        if let Some(reason) = request {
            self.expire(reason, attributes, tags);
        }
        result
    }

    fn run_components<F>(
        &mut self,
        attributes: &mut AttributeSet,
        tags: &mut TagContainer,
        on_error: OnError,
        callback: &str,
        mut f: F,
    ) -> (Option<ExpireReason>, Result<(), ComponentError>)
    where
        F: FnMut(
            &mut Box<dyn AbilityComponent<S>>,
            &mut ComponentContext<'_, S>,
        ) -> Result<(), ComponentError>,
    {
        let Self {
            info,
            components,
            executions,
            ..
        } = self;
        let info = &*info;
        let mut request = None;

        for component in components.iter_mut() {
            let mut ctx = ComponentContext {
                ability: info,
                attributes: &mut *attributes,
                tags: &mut *tags,
                executions: &mut *executions,
                expire_request: &mut request,
            };
            if let Err(err) = f(component, &mut ctx) {
                if on_error == OnError::Stop {
                    return (request, Err(err));
                }
                error!(
                    target: "ability_core::ability",
                    ability = %info.id,
                    component = component.name(),
                    callback,
                    code = err.error_code(),
                    error = %err,
                    "component failed"
                );
            }
        }
        (request, Ok(()))
    }

    // ========================================================================
    // Executions
    // ========================================================================

    /// Starts a new playback. Several may run at once.
    pub fn activate_new_execution_instance(&mut self, config: ExecutionConfig<S>) -> InstanceId {
        self.executions.activate(config)
    }

    /// Ticks every instance and returns the markers fired this step, in
    /// instance then firing order.
    pub fn tick_executions(&mut self, dt: TimeMs, env: &mut ExecutionEnv<'_, S>) -> Vec<String> {
        if self.is_expired() {
            return Vec::new();
        }

        let mut fired = Vec::new();
        for instance in self.executions.iter_mut() {
            for marker in instance.tick(dt, &self.info, env) {
                self.triggered.notify(&MarkerTriggered {
                    ability_id: self.info.id,
                    config_id: self.info.config_id.clone(),
                    instance_id: instance.id(),
                    marker: marker.clone(),
                });
                fired.push(marker);
            }
        }
        fired
    }

    pub fn executing_instances(&self) -> impl Iterator<Item = &ExecutionInstance<S>> {
        self.executions.executing()
    }

    pub fn execution(&self, id: InstanceId) -> Option<&ExecutionInstance<S>> {
        self.executions.get(id)
    }

    pub fn execution_mut(&mut self, id: InstanceId) -> Option<&mut ExecutionInstance<S>> {
        self.executions.get_mut(id)
    }

    pub fn executions(&self) -> &Executions<S> {
        &self.executions
    }

    pub fn prune_finished_instances(&mut self) -> usize {
        self.executions.prune_finished()
    }

    pub fn cancel_executions(&mut self) -> usize {
        self.executions.cancel_all()
    }

    /// Drains the events of every instance, oldest instance first.
    pub fn flush_events(&mut self) -> Vec<GameEvent> {
        self.executions
            .iter_mut()
            .flat_map(|instance| instance.flush_events())
            .collect()
    }

    pub fn add_triggered_listener<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&MarkerTriggered) + 'static,
    {
        self.triggered.subscribe(listener)
    }

    pub fn remove_triggered_listener(&mut self, subscription: Subscription) -> bool {
        self.triggered.unsubscribe(subscription)
    }

    pub fn snapshot(&self) -> AbilitySnapshot {
        AbilitySnapshot {
            id: self.info.id,
            config_id: self.info.config_id.clone(),
            owner: self.info.owner,
            tags: self.info.tags.clone(),
            expired: self.expired.as_ref().map(|r| r.as_str().to_string()),
            components: self.component_names().into_iter().map(String::from).collect(),
            executions: self.executions.iter().map(ExecutionInstance::snapshot).collect(),
        }
    }
}

impl<S> fmt::Debug for Ability<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ability")
            .field("info", &self.info)
            .field("components", &self.component_names())
            .field("expired", &self.expired)
            .field("executions", &self.executions.len())
            .finish()
    }
}

/// Collects components before the ability is sealed.
pub struct AbilityBuilder<S = ()> {
    info: AbilityInfo,
    components: Vec<Box<dyn AbilityComponent<S>>>,
}

impl<S> AbilityBuilder<S> {
    #[must_use]
    pub fn with_component<C>(mut self, component: C) -> Self
    where
        C: AbilityComponent<S> + 'static,
    {
        self.components.push(Box::new(component));
        self
    }

    #[must_use]
    pub fn with_boxed(mut self, component: Box<dyn AbilityComponent<S>>) -> Self {
        self.components.push(component);
        self
    }

    pub fn build(self) -> Ability<S> {
        Ability::new(self.info, self.components)
    }
}

/// Shallow, serializable view of one ability.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct AbilitySnapshot {
    pub id: AbilityId,
    pub config_id: String,
    pub owner: ActorId,
    pub tags: Vec<String>,
    pub expired: Option<String>,
    pub components: Vec<String>,
    pub executions: Vec<ExecutionSnapshot>,
}
