//! Tag multiset with three provenances.
//!
//! - **loose**: added and removed explicitly by game code
//! - **duration**: one stack per call, dropped when the container clock
//!   reaches its deadline
//! - **component**: owned by a granted ability and removed with it
//!
//! The queryable stack count of a name is the sum across provenances.
//! Listeners fire once per name whenever that sum changes.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::ids::{AbilityId, TimeMs};
use crate::observe::{Subscribers, Subscription};

/// Change of the total stack count of one tag.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TagChange {
    pub tag: String,
    pub old_stacks: u32,
    pub new_stacks: u32,
}

impl TagChange {
    pub fn appeared(&self) -> bool {
        self.old_stacks == 0 && self.new_stacks > 0
    }

    pub fn vanished(&self) -> bool {
        self.old_stacks > 0 && self.new_stacks == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
struct DurationEntry {
    name: String,
    expires_at: TimeMs,
}

/// Per-actor tag container with its own logical clock.
#[derive(Debug, Default)]
pub struct TagContainer {
    now: TimeMs,
    loose: IndexMap<String, u32>,
    durations: Vec<DurationEntry>,
    components: IndexMap<AbilityId, IndexMap<String, u32>>,
    listeners: Subscribers<TagChange>,
}

impl TagContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> TimeMs {
        self.now
    }

    // ========================================================================
    // Loose tags
    // ========================================================================

    pub fn add_loose_tag(&mut self, name: &str, stacks: u32) {
        if stacks == 0 {
            return;
        }
        let old = self.tag_stacks(name);
        let held = self.loose.entry(name.to_string()).or_insert(0);
        *held = held.saturating_add(stacks);
        self.notify_if_changed(name, old);
    }

    /// Removes `stacks` loose stacks (`None` clears the loose bucket).
    /// Returns the number of stacks actually removed.
    pub fn remove_loose_tag(&mut self, name: &str, stacks: Option<u32>) -> u32 {
        let Some(held) = self.loose.get(name).copied() else {
            return 0;
        };
        let old = self.tag_stacks(name);
        let removed = stacks.map_or(held, |s| s.min(held));
        if removed == held {
            self.loose.shift_remove(name);
        } else if let Some(count) = self.loose.get_mut(name) {
            *count -= removed;
        }
        self.notify_if_changed(name, old);
        removed
    }

    // ========================================================================
    // Duration tags
    // ========================================================================

    /// Adds one stack of `name` expiring `duration` ms from now.
    pub fn add_auto_duration_tag(&mut self, name: &str, duration: TimeMs) {
        let old = self.tag_stacks(name);
        let expires_at = self.now.saturating_add(duration);
        self.durations.push(DurationEntry {
            name: name.to_string(),
            expires_at,
        });
        trace!(target: "ability_core::tag", tag = name, expires_at, "duration tag added");
        self.notify_if_changed(name, old);
    }

    /// Longest remaining lifetime among the duration stacks of `name`.
    pub fn remaining_duration(&self, name: &str) -> Option<TimeMs> {
        self.durations
            .iter()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.expires_at.saturating_sub(self.now))
            .max()
    }

    // ========================================================================
    // Component tags
    // ========================================================================

    /// Adds tags owned by `owner`. Repeated names merge into the owner's
    /// existing bucket.
    pub fn add_component_tags<I, N>(&mut self, owner: AbilityId, tags: I)
    where
        I: IntoIterator<Item = (N, u32)>,
        N: Into<String>,
    {
        let tags: Vec<(String, u32)> = tags
            .into_iter()
            .map(|(name, stacks)| (name.into(), stacks))
            .filter(|(_, stacks)| *stacks > 0)
            .collect();
        if tags.is_empty() {
            return;
        }

        let before = self.totals_of(tags.iter().map(|(name, _)| name.as_str()));
        let bucket = self.components.entry(owner).or_default();
        for (name, stacks) in tags {
            let held = bucket.entry(name).or_insert(0);
            *held = held.saturating_add(stacks);
        }
        self.notify_all(before);
    }

    /// Removes every tag owned by `owner` at once. Returns false if the owner
    /// held nothing.
    pub fn remove_component_tags(&mut self, owner: AbilityId) -> bool {
        let Some(bucket) = self.components.get(&owner) else {
            return false;
        };
        let before = self.totals_of(bucket.keys().map(String::as_str));
        self.components.shift_remove(&owner);
        self.notify_all(before);
        true
    }

    // ========================================================================
    // Clock
    // ========================================================================

    /// Advances the clock and drops expired duration stacks.
    ///
    /// `now` becomes `logic_time` when given, otherwise `now + dt`. Entries
    /// whose deadline is at or before the new `now` expire. Returns the names
    /// that lost stacks, one per name.
    pub fn tick(&mut self, dt: TimeMs, logic_time: Option<TimeMs>) -> Vec<String> {
        self.now = logic_time.unwrap_or_else(|| self.now.saturating_add(dt));
        let now = self.now;

        let mut expired: Vec<String> = Vec::new();
        for entry in &self.durations {
            if entry.expires_at <= now && !expired.contains(&entry.name) {
                expired.push(entry.name.clone());
            }
        }
        if expired.is_empty() {
            return expired;
        }

        let before = self.totals_of(expired.iter().map(String::as_str));
        self.durations.retain(|entry| entry.expires_at > now);
        debug!(target: "ability_core::tag", now, tags = ?expired, "duration tags expired");
        self.notify_all(before);
        expired
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn has_tag(&self, name: &str) -> bool {
        self.tag_stacks(name) > 0
    }

    /// Total stacks of `name` across all provenances.
    pub fn tag_stacks(&self, name: &str) -> u32 {
        self.loose_stacks(name)
            .saturating_add(self.duration_stacks(name))
            .saturating_add(self.component_stacks(name))
    }

    pub fn loose_stacks(&self, name: &str) -> u32 {
        self.loose.get(name).copied().unwrap_or(0)
    }

    pub fn duration_stacks(&self, name: &str) -> u32 {
        let count = self.durations.iter().filter(|entry| entry.name == name).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn component_stacks(&self, name: &str) -> u32 {
        self.components
            .values()
            .filter_map(|bucket| bucket.get(name))
            .fold(0u32, |total, stacks| total.saturating_add(*stacks))
    }

    /// Stacks `owner` contributes to `name`.
    pub fn owned_stacks(&self, owner: AbilityId, name: &str) -> u32 {
        self.components
            .get(&owner)
            .and_then(|bucket| bucket.get(name))
            .copied()
            .unwrap_or(0)
    }

    /// Totals of every present tag, sorted by name.
    pub fn all_tags(&self) -> BTreeMap<String, u32> {
        let mut totals = BTreeMap::new();
        let names = self
            .loose
            .keys()
            .chain(self.durations.iter().map(|entry| &entry.name))
            .chain(self.components.values().flat_map(|bucket| bucket.keys()));
        for name in names {
            if !totals.contains_key(name) {
                totals.insert(name.clone(), self.tag_stacks(name));
            }
        }
        totals
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn on_tag_changed<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&TagChange) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn remove_tag_listener(&mut self, subscription: Subscription) -> bool {
        self.listeners.unsubscribe(subscription)
    }

    fn totals_of<'a>(&self, names: impl Iterator<Item = &'a str>) -> Vec<(String, u32)> {
        let mut totals: Vec<(String, u32)> = Vec::new();
        for name in names {
            if totals.iter().all(|(seen, _)| seen != name) {
                totals.push((name.to_string(), self.tag_stacks(name)));
            }
        }
        totals
    }

    fn notify_all(&mut self, before: Vec<(String, u32)>) {
        for (name, old) in before {
            self.notify_if_changed(&name, old);
        }
    }

    fn notify_if_changed(&mut self, name: &str, old_stacks: u32) {
        let new_stacks = self.tag_stacks(name);
        if new_stacks != old_stacks {
            self.listeners.notify(&TagChange {
                tag: name.to_string(),
                old_stacks,
                new_stacks,
            });
        }
    }

    // ========================================================================
    // Debug
    // ========================================================================

    pub fn snapshot(&self) -> TagSnapshot {
        TagSnapshot {
            now: self.now,
            totals: self.all_tags(),
            loose: self
                .loose
                .iter()
                .map(|(name, stacks)| (name.clone(), *stacks))
                .collect(),
            durations: self
                .durations
                .iter()
                .map(|entry| (entry.name.clone(), entry.expires_at))
                .collect(),
            components: self
                .components
                .iter()
                .map(|(owner, bucket)| {
                    let tags = bucket
                        .iter()
                        .map(|(name, stacks)| (name.clone(), *stacks))
                        .collect();
                    (owner.to_string(), tags)
                })
                .collect(),
        }
    }
}

/// Shallow, serializable view of a tag container.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct TagSnapshot {
    pub now: TimeMs,
    pub totals: BTreeMap<String, u32>,
    pub loose: BTreeMap<String, u32>,
    /// `(name, expires_at)` per duration stack, in insertion order.
    pub durations: Vec<(String, TimeMs)>,
    pub components: BTreeMap<String, BTreeMap<String, u32>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(tags: &mut TagContainer) -> Rc<RefCell<Vec<TagChange>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        tags.on_tag_changed(move |change| sink.borrow_mut().push(change.clone()));
        log
    }

    #[test]
    fn provenances_sum_and_stay_separate() {
        let mut tags = TagContainer::new();
        let a = AbilityId(1);
        tags.add_loose_tag("burning", 2);
        tags.add_component_tags(a, [("burning", 3)]);
        assert_eq!(tags.tag_stacks("burning"), 5);

        assert!(tags.remove_component_tags(a));
        assert_eq!(tags.tag_stacks("burning"), 2);
        assert_eq!(tags.loose_stacks("burning"), 2);
        assert!(!tags.remove_component_tags(a));
    }

    #[test]
    fn partial_and_full_loose_removal() {
        let mut tags = TagContainer::new();
        tags.add_loose_tag("guard", 3);
        assert_eq!(tags.remove_loose_tag("guard", Some(1)), 1);
        assert_eq!(tags.tag_stacks("guard"), 2);
        assert_eq!(tags.remove_loose_tag("guard", Some(10)), 2);
        assert!(!tags.has_tag("guard"));
        assert_eq!(tags.remove_loose_tag("guard", None), 0);
    }

    #[test]
    fn duration_stacks_expire_at_deadline() {
        let mut tags = TagContainer::new();
        tags.add_auto_duration_tag("cooldown", 100);
        tags.tick(40, None);
        tags.add_auto_duration_tag("cooldown", 100);
        assert_eq!(tags.tag_stacks("cooldown"), 2);
        assert_eq!(tags.remaining_duration("cooldown"), Some(100));

        tags.tick(60, None);
        assert_eq!(tags.now(), 100);
        assert_eq!(tags.tag_stacks("cooldown"), 1);

        let expired = tags.tick(0, Some(140));
        assert_eq!(expired, vec!["cooldown".to_string()]);
        assert!(!tags.has_tag("cooldown"));
        assert_eq!(tags.remaining_duration("cooldown"), None);
    }

    #[test]
    fn one_notification_per_name_on_expiry() {
        let mut tags = TagContainer::new();
        tags.add_auto_duration_tag("slow", 50);
        tags.add_auto_duration_tag("slow", 30);
        tags.add_loose_tag("slow", 1);
        let log = recorder(&mut tags);

        tags.tick(60, None);
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].old_stacks, 3);
        assert_eq!(log[0].new_stacks, 1);
    }

    #[test]
    fn listeners_fire_only_on_total_change() {
        let mut tags = TagContainer::new();
        let log = recorder(&mut tags);
        tags.add_loose_tag("stun", 1);
        tags.add_loose_tag("stun", 0);
        tags.add_component_tags(AbilityId(9), [("stun", 1), ("silence", 2)]);
        tags.remove_component_tags(AbilityId(9));

        let log = log.borrow();
        assert_eq!(log.len(), 5);
        assert!(log[0].appeared());
        assert_eq!((log[1].tag.as_str(), log[1].new_stacks), ("stun", 2));
        assert!(log[4].vanished());
    }

    #[test]
    fn all_tags_is_sorted_totals() {
        let mut tags = TagContainer::new();
        tags.add_loose_tag("b", 1);
        tags.add_auto_duration_tag("a", 10);
        tags.add_component_tags(AbilityId(1), [("b", 2)]);
        let all: Vec<_> = tags.all_tags().into_iter().collect();
        assert_eq!(all, vec![("a".to_string(), 1), ("b".to_string(), 3)]);

        let snapshot = tags.snapshot();
        assert_eq!(snapshot.components["ability:1"]["b"], 2);
    }

    #[test]
    fn stack_totals_saturate_instead_of_overflowing() {
        let mut tags = TagContainer::new();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        tags.on_tag_changed(move |change| sink.borrow_mut().push(change.new_stacks));

        tags.add_loose_tag("x", u32::MAX);
        tags.add_loose_tag("x", 5);
        tags.add_component_tags(AbilityId(1), [("x", 1)]);
        tags.add_component_tags(AbilityId(2), [("x", u32::MAX)]);
        tags.add_auto_duration_tag("x", 100);

        assert_eq!(tags.loose_stacks("x"), u32::MAX);
        assert_eq!(tags.component_stacks("x"), u32::MAX);
        assert_eq!(tags.tag_stacks("x"), u32::MAX);
        assert_eq!(tags.all_tags()["x"], u32::MAX);
        assert_eq!(*changes.borrow(), vec![u32::MAX]);

        assert!(tags.remove_component_tags(AbilityId(2)));
        tags.remove_loose_tag("x", None);
        assert_eq!(tags.tag_stacks("x"), 2);
    }
}
