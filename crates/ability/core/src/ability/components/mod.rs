//! Built-in ability components.
pub mod duration;
pub mod grant_tags;
pub mod stat_modifier;
pub mod trigger;

pub use duration::DurationComponent;
pub use grant_tags::GrantTagsComponent;
pub use stat_modifier::StatModifierComponent;
pub use trigger::TimelineTrigger;
