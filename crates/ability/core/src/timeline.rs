//! Timeline assets and the read-only registry execution instances resolve
//! them through.
//!
//! A timeline is an immutable list of named markers at millisecond offsets
//! plus a total duration. Timelines are shared by every instance that plays
//! them, so the registry hands them out as `Arc<Timeline>`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ids::TimeMs;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineMarker {
    pub name: String,
    pub at: TimeMs,
}

impl TimelineMarker {
    pub fn new(name: impl Into<String>, at: TimeMs) -> Self {
        Self {
            name: name.into(),
            at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub id: String,
    pub total_duration: TimeMs,
    #[serde(default)]
    pub markers: Vec<TimelineMarker>,
}

/// Content problems found by [`Timeline::validate`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TimelineIssue {
    #[error("marker `{marker}` at {at}ms lies past the end ({total_duration}ms)")]
    MarkerPastEnd {
        marker: String,
        at: TimeMs,
        total_duration: TimeMs,
    },

    #[error("marker `{0}` is declared more than once")]
    DuplicateMarker(String),
}

impl Timeline {
    pub fn new(id: impl Into<String>, total_duration: TimeMs) -> Self {
        Self {
            id: id.into(),
            total_duration,
            markers: Vec::new(),
        }
    }

    /// Appends a marker (builder pattern). Declaration order breaks ties
    /// between markers at the same offset.
    #[must_use]
    pub fn with_marker(mut self, name: impl Into<String>, at: TimeMs) -> Self {
        self.markers.push(TimelineMarker::new(name, at));
        self
    }

    pub fn marker(&self, name: &str) -> Option<&TimelineMarker> {
        self.markers.iter().find(|m| m.name == name)
    }

    /// Markers in firing order: ascending offset, declaration order on ties.
    pub fn ordered_markers(&self) -> Vec<&TimelineMarker> {
        let mut markers: Vec<&TimelineMarker> = self.markers.iter().collect();
        markers.sort_by_key(|m| m.at);
        markers
    }

    /// Reports markers that can never fire as authored.
    ///
    /// A marker past the end fires only when the completing tick overshoots
    /// its offset; a tick landing exactly on the total duration completes the
    /// playback without it. Duplicates fire once since fired markers are
    /// tracked by name.
    pub fn validate(&self) -> Vec<TimelineIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for marker in &self.markers {
            if marker.at > self.total_duration {
                issues.push(TimelineIssue::MarkerPastEnd {
                    marker: marker.name.clone(),
                    at: marker.at,
                    total_duration: self.total_duration,
                });
            }
            if !seen.insert(marker.name.as_str()) {
                issues.push(TimelineIssue::DuplicateMarker(marker.name.clone()));
            }
        }
        issues
    }
}

/// Read-only lookup of timelines by id.
#[derive(Clone, Debug, Default)]
pub struct TimelineRegistry {
    timelines: HashMap<String, Arc<Timeline>>,
}

impl TimelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `timeline`, replacing any previous one with the same id.
    /// Validation issues are logged, not rejected.
    pub fn register(&mut self, timeline: Timeline) -> Option<Arc<Timeline>> {
        for issue in timeline.validate() {
            warn!(
                target: "ability_core::timeline",
                timeline = %timeline.id,
                %issue,
                "timeline issue"
            );
        }
        let id = timeline.id.clone();
        let previous = self.timelines.insert(id.clone(), Arc::new(timeline));
        if previous.is_some() {
            warn!(target: "ability_core::timeline", timeline = %id, "timeline replaced");
        }
        previous
    }

    pub fn get(&self, id: &str) -> Option<Arc<Timeline>> {
        self.timelines.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.timelines.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.timelines.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }
}

impl FromIterator<Timeline> for TimelineRegistry {
    fn from_iter<T: IntoIterator<Item = Timeline>>(iter: T) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}

impl Extend<Timeline> for TimelineRegistry {
    fn extend<T: IntoIterator<Item = Timeline>>(&mut self, iter: T) {
        for timeline in iter {
            self.register(timeline);
        }
    }
}
