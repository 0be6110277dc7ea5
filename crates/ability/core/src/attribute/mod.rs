//! Attribute modifiers, the pure calculator and the per-actor container.
//!
//! Calculation order (all layers summed before they apply):
//! base → +AddBase → ×(1+MulBase) → body → +AddFinal → ×(1+MulFinal) → current
pub mod calculator;
pub mod error;
pub mod modifier;
pub mod set;

pub use calculator::{AttributeBreakdown, calculate};
pub use error::AttributeError;
pub use modifier::{AttributeModifier, ModifierKind, ModifierSpec};
pub use set::{
    AttributeChange, AttributeSet, AttributeSetSnapshot, AttributeSnapshot, BaseChangeOutcome,
    BaseChangeRequest, BaseChanged, ChangeCause, HookDecision, PostChangeHook, PreChangeHook,
};
