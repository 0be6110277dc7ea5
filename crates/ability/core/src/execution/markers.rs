use std::fmt;
use std::rc::Rc;

use super::action::Action;
use crate::config::RuntimeConfig;

/// Marker → action-list bindings of one execution.
///
/// Bindings keep insertion order. A pattern ending in `*` matches every
/// marker starting with the rest of the pattern; exact names always win over
/// patterns, and among patterns the first bound wins.
pub struct MarkerActions<S = ()> {
    bindings: Vec<(String, Vec<Rc<dyn Action<S>>>)>,
}

impl<S> MarkerActions<S> {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Appends `action` to the list bound to `pattern`.
    pub fn bind(&mut self, pattern: impl Into<String>, action: Rc<dyn Action<S>>) -> &mut Self {
        let pattern = pattern.into();
        match self.bindings.iter_mut().find(|(p, _)| *p == pattern) {
            Some((_, actions)) => actions.push(action),
            None => self.bindings.push((pattern, vec![action])),
        }
        self
    }

    #[must_use]
    pub fn with(mut self, pattern: impl Into<String>, action: Rc<dyn Action<S>>) -> Self {
        self.bind(pattern, action);
        self
    }

    /// Actions to run when `marker` fires.
    pub fn resolve(&self, marker: &str) -> &[Rc<dyn Action<S>>] {
        if let Some((_, actions)) = self.bindings.iter().find(|(p, _)| p == marker) {
            return actions;
        }
        self.bindings
            .iter()
            .find(|(pattern, _)| {
                pattern
                    .strip_suffix(RuntimeConfig::WILDCARD)
                    .is_some_and(|prefix| marker.starts_with(prefix))
            })
            .map(|(_, actions)| actions.as_slice())
            .unwrap_or(&[])
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(p, _)| p.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<S> Default for MarkerActions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for MarkerActions<S> {
    fn clone(&self) -> Self {
        Self {
            bindings: self.bindings.clone(),
        }
    }
}

impl<S> fmt::Debug for MarkerActions<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (pattern, actions) in &self.bindings {
            let names: Vec<&str> = actions.iter().map(|a| a.name()).collect();
            map.entry(pattern, &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::action::action_fn;

    fn names(actions: &[Rc<dyn Action>]) -> Vec<&str> {
        actions.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn exact_beats_wildcard_and_first_wildcard_wins() {
        let table = MarkerActions::<()>::new()
            .with("hit*", action_fn::<(), _>("any_hit", |_| Ok(())))
            .with("h*", action_fn::<(), _>("any_h", |_| Ok(())))
            .with("hit2", action_fn::<(), _>("exact", |_| Ok(())));

        assert_eq!(names(table.resolve("hit1")), vec!["any_hit"]);
        assert_eq!(names(table.resolve("hit2")), vec!["exact"]);
        assert_eq!(names(table.resolve("heal")), vec!["any_h"]);
        assert!(table.resolve("cast").is_empty());
    }

    #[test]
    fn binding_twice_appends_in_order() {
        let mut table = MarkerActions::<()>::new();
        table
            .bind("cast", action_fn::<(), _>("first", |_| Ok(())))
            .bind("cast", action_fn::<(), _>("second", |_| Ok(())));
        assert_eq!(names(table.resolve("cast")), vec!["first", "second"]);
        assert_eq!(table.patterns().count(), 1);
    }
}
