use crate::ability::component::{
    AbilityComponent, ComponentContext, ComponentError, ExpireReason,
};
use crate::ids::TimeMs;

/// Expires the ability once its lifetime has been ticked away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DurationComponent {
    duration: TimeMs,
    remaining: TimeMs,
}

impl DurationComponent {
    pub fn new(duration: TimeMs) -> Self {
        Self {
            duration,
            remaining: duration,
        }
    }

    pub fn duration(&self) -> TimeMs {
        self.duration
    }

    pub fn remaining(&self) -> TimeMs {
        self.remaining
    }
}

impl<S> AbilityComponent<S> for DurationComponent {
    fn name(&self) -> &str {
        "duration"
    }

    fn on_tick(
        &mut self,
        dt: TimeMs,
        ctx: &mut ComponentContext<'_, S>,
    ) -> Result<(), ComponentError> {
        self.remaining = self.remaining.saturating_sub(dt);
        if self.remaining == 0 {
            ctx.request_expire(ExpireReason::Duration);
        }
        Ok(())
    }
}
