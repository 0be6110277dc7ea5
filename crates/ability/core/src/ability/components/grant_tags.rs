use crate::ability::component::{
    AbilityComponent, ComponentContext, ComponentError, ExpireReason,
};
use crate::config::RuntimeConfig;

/// Puts component-owned tags on the owner while the ability is held.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrantTagsComponent {
    tags: Vec<(String, u32)>,
}

impl GrantTagsComponent {
    pub fn new<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|tag| (tag.into(), RuntimeConfig::DEFAULT_STACKS))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_stacks(mut self, tag: impl Into<String>, stacks: u32) -> Self {
        self.tags.push((tag.into(), stacks));
        self
    }

    pub fn tags(&self) -> &[(String, u32)] {
        &self.tags
    }
}

impl<S> AbilityComponent<S> for GrantTagsComponent {
    fn name(&self) -> &str {
        "grant_tags"
    }

    fn on_apply(&mut self, ctx: &mut ComponentContext<'_, S>) -> Result<(), ComponentError> {
        ctx.tags.add_component_tags(ctx.ability.id, self.tags.iter().cloned());
        Ok(())
    }

    fn on_expire(
        &mut self,
        _reason: &ExpireReason,
        ctx: &mut ComponentContext<'_, S>,
    ) -> Result<(), ComponentError> {
        ctx.tags.remove_component_tags(ctx.ability.id);
        Ok(())
    }
}
