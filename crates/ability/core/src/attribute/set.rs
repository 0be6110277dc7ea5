//! Per-actor attribute container.
//!
//! Each attribute holds a base value, optional `min`/`max` constraints and the
//! modifiers currently targeting it. Breakdowns are computed lazily and cached
//! until the next base or modifier change to that attribute.
//!
//! Base changes run through pre-change hooks (which may veto or override the
//! requested value), are clamped, applied, then announced to post-change hooks
//! and change listeners. Hooks only get a shared reference, so they can read
//! other attributes but never mutate the set they are attached to.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::calculator::{AttributeBreakdown, calculate, clamp_value};
use super::error::AttributeError;
use super::modifier::AttributeModifier;
use crate::config::RuntimeConfig;
use crate::error::report_fault;
use crate::observe::{Subscribers, Subscription};

/// Proposed base change handed to pre-change hooks.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseChangeRequest {
    pub attribute: String,
    pub old_base: f64,
    /// Value the caller asked for.
    pub requested: f64,
    /// Value after earlier hooks in the chain had their say.
    pub proposed: f64,
}

/// Verdict of one pre-change hook.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HookDecision {
    Proceed,
    Veto,
    Override(f64),
}

/// Applied base change handed to post-change hooks.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseChanged {
    pub attribute: String,
    pub old_base: f64,
    pub new_base: f64,
    pub old_value: f64,
    pub new_value: f64,
}

/// Result of `set_base` / `modify_base`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BaseChangeOutcome {
    Applied { old: f64, new: f64 },
    /// The resolved, clamped value equals the current base.
    Unchanged,
    Vetoed,
    UnknownAttribute,
}

impl BaseChangeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    Base,
    Modifier,
}

/// Notification sent to change listeners.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AttributeChange {
    pub attribute: String,
    pub cause: ChangeCause,
    pub old_base: f64,
    pub new_base: f64,
    pub old_value: f64,
    pub new_value: f64,
}

pub type PreChangeHook = Box<dyn Fn(&AttributeSet, &BaseChangeRequest) -> HookDecision>;
pub type PostChangeHook = Box<dyn Fn(&AttributeSet, &BaseChanged)>;

struct AttributeEntry {
    base: f64,
    min: Option<f64>,
    max: Option<f64>,
    modifiers: Vec<AttributeModifier>,
    cache: Cell<Option<AttributeBreakdown>>,
    dirty: Cell<bool>,
}

impl AttributeEntry {
    fn new(base: f64, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            base: clamp_value(base, min, max),
            min,
            max,
            modifiers: Vec::new(),
            cache: Cell::new(None),
            dirty: Cell::new(true),
        }
    }

    fn invalidate(&self) {
        self.dirty.set(true);
    }

    fn fallback(&self) -> AttributeBreakdown {
        self.cache
            .get()
            .unwrap_or_else(|| AttributeBreakdown::from_base(self.base).clamped(self.min, self.max))
    }
}

/// Marks an attribute as being computed for as long as it lives.
struct ComputeGuard<'a> {
    computing: &'a RefCell<HashSet<String>>,
    name: String,
}

impl Drop for ComputeGuard<'_> {
    fn drop(&mut self) {
        self.computing.borrow_mut().remove(&self.name);
    }
}

/// Container of named attributes owned by one actor.
pub struct AttributeSet {
    entries: IndexMap<String, AttributeEntry>,
    pre_hooks: IndexMap<String, Vec<PreChangeHook>>,
    global_pre_hooks: Vec<PreChangeHook>,
    post_hooks: IndexMap<String, Vec<PostChangeHook>>,
    global_post_hooks: Vec<PostChangeHook>,
    listeners: Subscribers<AttributeChange>,
    computing: RefCell<HashSet<String>>,
    recomputes: Cell<u64>,
    config: RuntimeConfig,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            entries: IndexMap::new(),
            pre_hooks: IndexMap::new(),
            global_pre_hooks: Vec::new(),
            post_hooks: IndexMap::new(),
            global_post_hooks: Vec::new(),
            listeners: Subscribers::new(),
            computing: RefCell::new(HashSet::new()),
            recomputes: Cell::new(0),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ========================================================================
    // Definition
    // ========================================================================

    /// Defines (or redefines) an attribute.
    ///
    /// Redefinition resets the entry: modifiers are dropped and the cache is
    /// cleared. Hooks registered for the name are kept.
    pub fn define_attribute(
        &mut self,
        name: impl Into<String>,
        base: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) {
        let name = name.into();
        let entry = AttributeEntry::new(base, min, max);
        if self.entries.insert(name.clone(), entry).is_some() {
            debug!(
                target: "ability_core::attribute",
                attribute = %name,
                base,
                "attribute redefined; modifiers dropped"
            );
        }
    }

    /// Defines an unconstrained attribute.
    pub fn define(&mut self, name: impl Into<String>, base: f64) {
        self.define_attribute(name, base, None, None);
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Attribute names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn current_value(&self, name: &str) -> f64 {
        self.read(name)
            .map(|b| b.current)
            .unwrap_or(self.config.missing_attribute_value)
    }

    pub fn body_value(&self, name: &str) -> f64 {
        self.read(name)
            .map(|b| b.body)
            .unwrap_or(self.config.missing_attribute_value)
    }

    pub fn base_value(&self, name: &str) -> f64 {
        match self.entries.get(name) {
            Some(entry) => entry.base,
            None => {
                self.report_undefined(name, "base_value");
                self.config.missing_attribute_value
            }
        }
    }

    /// Full breakdown, or a neutral one for undefined attributes.
    pub fn breakdown(&self, name: &str) -> AttributeBreakdown {
        self.read(name)
            .unwrap_or_else(|| AttributeBreakdown::from_base(self.config.missing_attribute_value))
    }

    pub fn try_breakdown(&self, name: &str) -> Result<AttributeBreakdown, AttributeError> {
        self.resolve(name)
            .ok_or_else(|| AttributeError::Undefined(name.to_string()))
    }

    /// Modifiers currently targeting `name`, in insertion order.
    pub fn modifiers(&self, name: &str) -> &[AttributeModifier] {
        self.entries
            .get(name)
            .map(|entry| entry.modifiers.as_slice())
            .unwrap_or(&[])
    }

    pub fn bounds(&self, name: &str) -> Option<(Option<f64>, Option<f64>)> {
        self.entries.get(name).map(|entry| (entry.min, entry.max))
    }

    /// Number of breakdown recomputations performed so far.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes.get()
    }

    fn read(&self, name: &str) -> Option<AttributeBreakdown> {
        let breakdown = self.resolve(name);
        if breakdown.is_none() {
            self.report_undefined(name, "read");
        }
        breakdown
    }

    fn resolve(&self, name: &str) -> Option<AttributeBreakdown> {
        let entry = self.entries.get(name)?;

        let Some(_guard) = self.enter(name) else {
            report_fault(&AttributeError::Reentrant(name.to_string()), "breakdown");
            return Some(entry.fallback());
        };

        if !entry.dirty.get() {
            if let Some(cached) = entry.cache.get() {
                return Some(cached);
            }
        }

        let breakdown = calculate(entry.base, &entry.modifiers).clamped(entry.min, entry.max);
        entry.cache.set(Some(breakdown));
        entry.dirty.set(false);
        self.recomputes.set(self.recomputes.get() + 1);
        trace!(
            target: "ability_core::attribute",
            attribute = name,
            current = breakdown.current,
            "recomputed"
        );
        Some(breakdown)
    }

    fn enter(&self, name: &str) -> Option<ComputeGuard<'_>> {
        if !self.computing.borrow_mut().insert(name.to_string()) {
            return None;
        }
        Some(ComputeGuard {
            computing: &self.computing,
            name: name.to_string(),
        })
    }

    fn report_undefined(&self, name: &str, operation: &str) {
        report_fault(&AttributeError::Undefined(name.to_string()), operation);
    }

    // ========================================================================
    // Base mutation
    // ========================================================================

    /// Requests a new base value.
    ///
    /// Pre-change hooks run first (per-attribute, then global); any veto makes
    /// the call a no-op. The resolved value is clamped to the constraints
    /// after all hooks have run.
    pub fn set_base(&mut self, name: &str, value: f64) -> BaseChangeOutcome {
        let Some(entry) = self.entries.get(name) else {
            self.report_undefined(name, "set_base");
            return BaseChangeOutcome::UnknownAttribute;
        };
        let (old_base, min, max) = (entry.base, entry.min, entry.max);
        let old_value = self.resolve(name).map(|b| b.current).unwrap_or(old_base);

        let Some(resolved) = self.run_pre_hooks(name, old_base, value) else {
            debug!(
                target: "ability_core::attribute",
                attribute = name,
                value,
                "base change vetoed"
            );
            return BaseChangeOutcome::Vetoed;
        };
        let new_base = clamp_value(resolved, min, max);
        if new_base == old_base {
            return BaseChangeOutcome::Unchanged;
        }

        if let Some(entry) = self.entries.get_mut(name) {
            entry.base = new_base;
            entry.invalidate();
        }
        let new_value = self.resolve(name).map(|b| b.current).unwrap_or(new_base);

        let changed = BaseChanged {
            attribute: name.to_string(),
            old_base,
            new_base,
            old_value,
            new_value,
        };
        self.run_post_hooks(&changed);

        self.listeners.notify(&AttributeChange {
            attribute: name.to_string(),
            cause: ChangeCause::Base,
            old_base,
            new_base,
            old_value,
            new_value,
        });

        BaseChangeOutcome::Applied {
            old: old_base,
            new: new_base,
        }
    }

    /// Shifts the base value by `delta` through the same pipeline as
    /// [`set_base`](Self::set_base).
    pub fn modify_base(&mut self, name: &str, delta: f64) -> BaseChangeOutcome {
        let Some(base) = self.entries.get(name).map(|entry| entry.base) else {
            self.report_undefined(name, "modify_base");
            return BaseChangeOutcome::UnknownAttribute;
        };
        self.set_base(name, base + delta)
    }

    fn run_pre_hooks(&self, name: &str, old_base: f64, requested: f64) -> Option<f64> {
        let Some(_guard) = self.enter(name) else {
            report_fault(&AttributeError::Reentrant(name.to_string()), "pre_change_hooks");
            return Some(requested);
        };

        let mut request = BaseChangeRequest {
            attribute: name.to_string(),
            old_base,
            requested,
            proposed: requested,
        };
        let scoped = self.pre_hooks.get(name).into_iter().flatten();
        for hook in scoped.chain(self.global_pre_hooks.iter()) {
            match hook(self, &request) {
                HookDecision::Proceed => {}
                HookDecision::Veto => return None,
                HookDecision::Override(value) => request.proposed = value,
            }
        }
        Some(request.proposed)
    }

    fn run_post_hooks(&self, changed: &BaseChanged) {
        let Some(_guard) = self.enter(&changed.attribute) else {
            report_fault(
                &AttributeError::Reentrant(changed.attribute.clone()),
                "post_change_hooks",
            );
            return;
        };

        let scoped = self.post_hooks.get(&changed.attribute).into_iter().flatten();
        for hook in scoped.chain(self.global_post_hooks.iter()) {
            hook(self, changed);
        }
    }

    // ========================================================================
    // Modifiers
    // ========================================================================

    /// Adds a modifier to its target attribute.
    ///
    /// A modifier with the same id on that attribute is replaced. Returns
    /// false if the attribute is undefined.
    pub fn add_modifier(&mut self, modifier: AttributeModifier) -> bool {
        let name = modifier.attribute.clone();
        if !self.entries.contains_key(&name) {
            self.report_undefined(&name, "add_modifier");
            return false;
        }

        let before = self.observed_value(&name);
        if let Some(entry) = self.entries.get_mut(&name) {
            match entry.modifiers.iter_mut().find(|m| m.id == modifier.id) {
                Some(existing) => *existing = modifier,
                None => entry.modifiers.push(modifier),
            }
            entry.invalidate();
        }
        self.announce_modifier_change(&name, before);
        true
    }

    /// Removes the modifier with `modifier_id` from `attribute`.
    pub fn remove_modifier(&mut self, attribute: &str, modifier_id: &str) -> bool {
        if !self.entries.contains_key(attribute) {
            self.report_undefined(attribute, "remove_modifier");
            return false;
        }

        let before = self.observed_value(attribute);
        let removed = match self.entries.get_mut(attribute) {
            Some(entry) => {
                let count = entry.modifiers.len();
                entry.modifiers.retain(|m| m.id != modifier_id);
                let removed = entry.modifiers.len() != count;
                if removed {
                    entry.invalidate();
                }
                removed
            }
            None => false,
        };
        if removed {
            self.announce_modifier_change(attribute, before);
        }
        removed
    }

    /// Removes every modifier whose source is `source`, across all attributes.
    /// Returns the number of modifiers removed.
    pub fn remove_modifiers_by_source(&mut self, source: &str) -> usize {
        let affected: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.modifiers.iter().any(|m| m.is_from(source)))
            .map(|(name, _)| name.clone())
            .collect();

        let mut total = 0;
        for name in affected {
            let before = self.observed_value(&name);
            if let Some(entry) = self.entries.get_mut(&name) {
                let count = entry.modifiers.len();
                entry.modifiers.retain(|m| !m.is_from(source));
                total += count - entry.modifiers.len();
                entry.invalidate();
            }
            self.announce_modifier_change(&name, before);
        }

        if total > 0 {
            debug!(
                target: "ability_core::attribute",
                source,
                removed = total,
                "modifiers removed by source"
            );
        }
        total
    }

    /// Current value before a modifier mutation, only computed when someone
    /// is listening so that reads stay lazy otherwise.
    fn observed_value(&self, name: &str) -> Option<f64> {
        if self.listeners.is_empty() {
            return None;
        }
        self.resolve(name).map(|b| b.current)
    }

    fn announce_modifier_change(&mut self, name: &str, before: Option<f64>) {
        let Some(old_value) = before else {
            return;
        };
        let Some(new_value) = self.resolve(name).map(|b| b.current) else {
            return;
        };
        if old_value == new_value {
            return;
        }
        let base = self.entries.get(name).map(|e| e.base).unwrap_or_default();
        self.listeners.notify(&AttributeChange {
            attribute: name.to_string(),
            cause: ChangeCause::Modifier,
            old_base: base,
            new_base: base,
            old_value,
            new_value,
        });
    }

    // ========================================================================
    // Hooks & listeners
    // ========================================================================

    pub fn add_pre_change_hook<F>(&mut self, attribute: impl Into<String>, hook: F)
    where
        F: Fn(&AttributeSet, &BaseChangeRequest) -> HookDecision + 'static,
    {
        self.pre_hooks
            .entry(attribute.into())
            .or_default()
            .push(Box::new(hook));
    }

    pub fn add_global_pre_change_hook<F>(&mut self, hook: F)
    where
        F: Fn(&AttributeSet, &BaseChangeRequest) -> HookDecision + 'static,
    {
        self.global_pre_hooks.push(Box::new(hook));
    }

    pub fn add_post_change_hook<F>(&mut self, attribute: impl Into<String>, hook: F)
    where
        F: Fn(&AttributeSet, &BaseChanged) + 'static,
    {
        self.post_hooks
            .entry(attribute.into())
            .or_default()
            .push(Box::new(hook));
    }

    pub fn add_global_post_change_hook<F>(&mut self, hook: F)
    where
        F: Fn(&AttributeSet, &BaseChanged) + 'static,
    {
        self.global_post_hooks.push(Box::new(hook));
    }

    pub fn add_change_listener<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&AttributeChange) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn remove_change_listener(&mut self, subscription: Subscription) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    // ========================================================================
    // Debug
    // ========================================================================

    pub fn snapshot(&self) -> AttributeSetSnapshot {
        let attributes = self
            .entries
            .iter()
            .map(|(name, entry)| AttributeSnapshot {
                name: name.clone(),
                base: entry.base,
                min: entry.min,
                max: entry.max,
                breakdown: self.resolve(name).unwrap_or_else(|| entry.fallback()),
                modifiers: entry.modifiers.clone(),
            })
            .collect();
        AttributeSetSnapshot { attributes }
    }
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSet")
            .field("attributes", &self.entries.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.len())
            .field("recomputes", &self.recomputes.get())
            .finish()
    }
}

/// Shallow, serializable view of one attribute.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AttributeSnapshot {
    pub name: String,
    pub base: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub breakdown: AttributeBreakdown,
    pub modifiers: Vec<AttributeModifier>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct AttributeSetSnapshot {
    pub attributes: Vec<AttributeSnapshot>,
}

impl AttributeSetSnapshot {
    pub fn get(&self, name: &str) -> Option<&AttributeSnapshot> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn atk_set() -> AttributeSet {
        let mut set = AttributeSet::new();
        set.define("atk", 50.0);
        set
    }

    #[test]
    fn buff_applies_then_reverts_by_source() {
        let mut set = atk_set();
        set.add_modifier(AttributeModifier::add_base("a", "atk", 10.0).with_source("buffA"));
        set.add_modifier(AttributeModifier::mul_base("b", "atk", 0.2).with_source("buffA"));
        assert!((set.current_value("atk") - 72.0).abs() < 1e-9);

        assert_eq!(set.remove_modifiers_by_source("buffA"), 2);
        assert_eq!(set.current_value("atk"), 50.0);
    }

    #[test]
    fn reads_are_cached_until_invalidated() {
        let mut set = atk_set();
        set.current_value("atk");
        let baseline = set.recompute_count();

        set.add_modifier(AttributeModifier::add_final("x", "atk", 5.0));
        assert_eq!(set.current_value("atk"), 55.0);
        assert_eq!(set.recompute_count(), baseline + 1);
        assert_eq!(set.current_value("atk"), 55.0);
        assert_eq!(set.recompute_count(), baseline + 1);
    }

    #[test]
    fn same_modifier_id_replaces() {
        let mut set = atk_set();
        set.add_modifier(AttributeModifier::add_base("x", "atk", 5.0));
        set.add_modifier(AttributeModifier::add_base("x", "atk", 8.0));
        assert_eq!(set.modifiers("atk").len(), 1);
        assert_eq!(set.current_value("atk"), 58.0);

        assert!(set.remove_modifier("atk", "x"));
        assert!(!set.remove_modifier("atk", "x"));
    }

    #[test]
    fn clamp_applies_after_hook_override() {
        let mut set = AttributeSet::new();
        set.define_attribute("hp", 50.0, Some(0.0), Some(100.0));
        set.add_pre_change_hook("hp", |_, _| HookDecision::Override(250.0));

        let outcome = set.set_base("hp", 60.0);
        assert_eq!(outcome, BaseChangeOutcome::Applied { old: 50.0, new: 100.0 });
        assert_eq!(set.base_value("hp"), 100.0);

        set.set_base("hp", -30.0);
        assert_eq!(set.base_value("hp"), 100.0);
    }

    #[test]
    fn clamp_without_hooks() {
        let mut set = AttributeSet::new();
        set.define_attribute("hp", 50.0, Some(0.0), Some(100.0));
        set.modify_base("hp", -80.0);
        assert_eq!(set.current_value("hp"), 0.0);
        set.modify_base("hp", 500.0);
        assert_eq!(set.current_value("hp"), 100.0);
    }

    #[test]
    fn veto_leaves_base_untouched() {
        let mut set = atk_set();
        set.add_global_pre_change_hook(|_, req| {
            if req.proposed < 0.0 {
                HookDecision::Veto
            } else {
                HookDecision::Proceed
            }
        });
        assert_eq!(set.set_base("atk", -1.0), BaseChangeOutcome::Vetoed);
        assert_eq!(set.base_value("atk"), 50.0);
    }

    #[test]
    fn scoped_hooks_run_before_global_and_chain_overrides() {
        let mut set = atk_set();
        set.add_global_pre_change_hook(|_, req| HookDecision::Override(req.proposed + 1.0));
        set.add_pre_change_hook("atk", |_, req| HookDecision::Override(req.proposed * 2.0));
        set.set_base("atk", 10.0);
        assert_eq!(set.base_value("atk"), 21.0);
    }

    #[test]
    fn hooks_can_read_other_attributes() {
        let mut set = AttributeSet::new();
        set.define("hp", 10.0);
        set.define("max_hp", 40.0);
        set.add_pre_change_hook("hp", |attrs, req| {
            HookDecision::Override(req.proposed.min(attrs.current_value("max_hp")))
        });
        set.set_base("hp", 90.0);
        assert_eq!(set.base_value("hp"), 40.0);
    }

    #[test]
    fn reentrant_read_short_circuits_to_cache() {
        let seen = Rc::new(Cell::new(0.0));
        let mut set = atk_set();
        set.current_value("atk");
        let probe = Rc::clone(&seen);
        set.add_pre_change_hook("atk", move |attrs, _| {
            probe.set(attrs.current_value("atk"));
            HookDecision::Proceed
        });

        set.set_base("atk", 70.0);
        assert_eq!(seen.get(), 50.0);
        assert_eq!(set.current_value("atk"), 70.0);
    }

    #[test]
    fn post_hooks_see_new_value() {
        let seen = Rc::new(Cell::new(0.0));
        let mut set = atk_set();
        let probe = Rc::clone(&seen);
        set.add_post_change_hook("atk", move |attrs, changed| {
            assert_eq!(changed.new_base, 65.0);
            probe.set(attrs.current_value("atk"));
        });
        set.set_base("atk", 65.0);
        assert_eq!(seen.get(), 65.0);
    }

    #[test]
    fn listeners_receive_base_and_modifier_changes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut set = atk_set();
        let sink = Rc::clone(&log);
        let sub = set.add_change_listener(move |change| sink.borrow_mut().push(change.clone()));

        set.set_base("atk", 60.0);
        set.add_modifier(AttributeModifier::add_final("x", "atk", 5.0).with_source("s"));
        set.remove_modifiers_by_source("s");
        set.set_base("atk", 60.0);

        let log_ref = log.borrow();
        assert_eq!(log_ref.len(), 3);
        assert_eq!(log_ref[0].cause, ChangeCause::Base);
        assert_eq!((log_ref[0].old_value, log_ref[0].new_value), (50.0, 60.0));
        assert_eq!(log_ref[1].cause, ChangeCause::Modifier);
        assert_eq!(log_ref[1].new_value, 65.0);
        assert_eq!(log_ref[2].new_value, 60.0);
        drop(log_ref);

        assert!(set.remove_change_listener(sub));
        set.set_base("atk", 1.0);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn undefined_attribute_reads_neutral_default() {
        let mut set = AttributeSet::with_config(RuntimeConfig::with_missing_attribute_value(-1.0));
        assert_eq!(set.current_value("nope"), -1.0);
        assert_eq!(set.set_base("nope", 3.0), BaseChangeOutcome::UnknownAttribute);
        assert!(!set.add_modifier(AttributeModifier::add_base("x", "nope", 1.0)));
        assert_eq!(
            set.try_breakdown("nope"),
            Err(AttributeError::Undefined("nope".to_string()))
        );
    }

    #[test]
    fn redefinition_drops_modifiers() {
        let mut set = atk_set();
        set.add_modifier(AttributeModifier::add_base("x", "atk", 5.0));
        set.define("atk", 20.0);
        assert!(set.modifiers("atk").is_empty());
        assert_eq!(set.current_value("atk"), 20.0);
    }

    #[test]
    fn snapshot_serializes_breakdowns() {
        let mut set = atk_set();
        set.add_modifier(AttributeModifier::add_base("x", "atk", 5.0));
        let snapshot = set.snapshot();
        assert_eq!(snapshot.get("atk").map(|a| a.breakdown.current), Some(55.0));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["attributes"][0]["name"], "atk");
    }
}
