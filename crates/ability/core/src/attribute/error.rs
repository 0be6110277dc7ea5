use crate::error::{FaultClass, RuntimeFault};

/// Errors raised by the attribute container.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("attribute `{0}` is not defined")]
    Undefined(String),

    #[error("reentrant computation of attribute `{0}`")]
    Reentrant(String),
}

impl RuntimeFault for AttributeError {
    fn class(&self) -> FaultClass {
        match self {
            Self::Undefined(_) => FaultClass::Configuration,
            Self::Reentrant(_) => FaultClass::Invariant,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Undefined(_) => "ATTRIBUTE_UNDEFINED",
            Self::Reentrant(_) => "ATTRIBUTE_REENTRANT",
        }
    }
}
