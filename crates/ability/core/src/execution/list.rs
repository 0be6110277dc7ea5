use super::instance::{ExecutionConfig, ExecutionInstance};
use crate::ids::InstanceId;

/// Execution instances owned by one ability, in activation order.
///
/// Any number of instances may be executing at once; callers that want
/// single-instance semantics check [`executing`](Self::executing) first.
pub struct Executions<S = ()> {
    instances: Vec<ExecutionInstance<S>>,
    next_id: u64,
}

impl<S> Executions<S> {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
            next_id: 0,
        }
    }

    pub fn activate(&mut self, config: ExecutionConfig<S>) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.instances.push(ExecutionInstance::new(id, config));
        id
    }

    pub fn get(&self, id: InstanceId) -> Option<&ExecutionInstance<S>> {
        self.instances.iter().find(|i| i.id() == id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut ExecutionInstance<S>> {
        self.instances.iter_mut().find(|i| i.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionInstance<S>> {
        self.instances.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ExecutionInstance<S>> {
        self.instances.iter_mut()
    }

    /// Instances still playing.
    pub fn executing(&self) -> impl Iterator<Item = &ExecutionInstance<S>> {
        self.instances.iter().filter(|i| i.is_executing())
    }

    pub fn executing_count(&self) -> usize {
        self.executing().count()
    }

    /// Cancels every executing instance; returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        self.instances
            .iter_mut()
            .map(|i| i.cancel())
            .filter(|cancelled| *cancelled)
            .count()
    }

    /// Drops finished instances whose events were already flushed.
    /// Returns how many were dropped.
    pub fn prune_finished(&mut self) -> usize {
        let before = self.instances.len();
        self.instances
            .retain(|i| i.is_executing() || !i.collected_events().is_empty());
        before - self.instances.len()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl<S> Default for Executions<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::MarkerActions;

    #[test]
    fn ids_are_unique_and_sequential() {
        let mut executions = Executions::<()>::new();
        let a = executions.activate(ExecutionConfig::new("t", MarkerActions::new()));
        let b = executions.activate(ExecutionConfig::new("t", MarkerActions::new()));
        assert_ne!(a, b);
        assert_eq!(executions.executing_count(), 2);

        assert_eq!(executions.cancel_all(), 2);
        assert_eq!(executions.cancel_all(), 0);
        assert_eq!(executions.prune_finished(), 2);
        assert!(executions.is_empty());

        let c = executions.activate(ExecutionConfig::new("t", MarkerActions::new()));
        assert_eq!(c, InstanceId(2));
    }
}
