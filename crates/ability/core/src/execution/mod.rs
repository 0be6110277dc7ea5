//! Timeline playback.
//!
//! An [`ExecutionInstance`] walks one timeline, firing the actions bound to
//! each marker exactly once. Instances are owned by their ability through
//! [`Executions`] and ticked against an [`ExecutionEnv`] that lends them the
//! owner's attributes, tags and the hosting game's state.
pub mod action;
pub mod error;
pub mod instance;
pub mod list;
pub mod markers;

pub use action::{
    Action, ActionContext, AddDurationTagAction, AddModifierAction, EmitEventAction,
    ExecutionInfo, FnAction, ModifyBaseAction, action_fn,
};
pub use error::ActionError;
pub use instance::{
    ExecutionConfig, ExecutionEnv, ExecutionInstance, ExecutionSnapshot, ExecutionState,
};
pub use list::Executions;
pub use markers::MarkerActions;
