use crate::ability::component::{AbilityComponent, ComponentContext, ComponentError};
use crate::attribute::{AttributeError, ModifierSpec};

/// Registers a fixed list of modifiers for as long as the ability is held.
///
/// Modifiers are sourced to the ability, so expiry sweeps them without any
/// bookkeeping here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatModifierComponent {
    modifiers: Vec<ModifierSpec>,
}

impl StatModifierComponent {
    pub fn new(modifiers: Vec<ModifierSpec>) -> Self {
        Self { modifiers }
    }

    #[must_use]
    pub fn with(mut self, spec: ModifierSpec) -> Self {
        self.modifiers.push(spec);
        self
    }

    pub fn modifiers(&self) -> &[ModifierSpec] {
        &self.modifiers
    }
}

impl<S> AbilityComponent<S> for StatModifierComponent {
    fn name(&self) -> &str {
        "stat_modifier"
    }

    fn on_apply(&mut self, ctx: &mut ComponentContext<'_, S>) -> Result<(), ComponentError> {
        let source = ctx.ability.source_key();
        let mut first_error = None;
        for (index, spec) in self.modifiers.iter().enumerate() {
            let modifier = spec.instantiate(format!("{source}#{index}"), &source);
            if !ctx.attributes.add_modifier(modifier) && first_error.is_none() {
                first_error = Some(AttributeError::Undefined(spec.attribute.clone()));
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
