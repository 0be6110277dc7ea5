use crate::attribute::AttributeError;
use crate::error::{FaultClass, RuntimeFault};

/// Errors returned by actions bound to timeline markers.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("action failed: {0}")]
    Failed(String),

    #[error("no valid target: {0}")]
    InvalidTarget(String),

    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

impl ActionError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}

impl RuntimeFault for ActionError {
    fn class(&self) -> FaultClass {
        match self {
            Self::Failed(_) | Self::InvalidTarget(_) => FaultClass::Component,
            Self::Attribute(inner) => inner.class(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "ACTION_FAILED",
            Self::InvalidTarget(_) => "ACTION_INVALID_TARGET",
            Self::Attribute(inner) => inner.error_code(),
        }
    }
}
