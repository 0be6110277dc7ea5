//! Common fault infrastructure for ability-core.
//!
//! Domain-specific errors (`AttributeError`, `ActionError`, `ComponentError`)
//! live next to the code that raises them. This module holds what they share:
//! the [`FaultClass`] taxonomy and the [`RuntimeFault`] trait.
//!
//! Nothing in the runtime unwinds to the driving loop. Detection sites log
//! through [`report_fault`] and return an explicit outcome instead.

use tracing::{error, warn};

/// Classification of a runtime fault, used to pick a log level and to let
/// recorders group failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FaultClass {
    /// Unknown attribute, ability or timeline. The caller referenced data that
    /// was never registered.
    ///
    /// Handling: warn and return a neutral default.
    Configuration,

    /// A hook, component or action reported a failure.
    ///
    /// Handling: log at error, skip the failing unit, keep processing the rest.
    Component,

    /// Reentrant attribute computation detected by the computing set.
    ///
    /// Handling: short-circuit to the last cached breakdown and warn.
    Invariant,
}

impl FaultClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Component => "component",
            Self::Invariant => "invariant",
        }
    }

    /// Returns true if this fault points at a bug in game content or code
    /// rather than at missing data.
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Component)
    }
}

/// Common trait for all ability-core errors.
///
/// - All error enums implement this trait
/// - Use `#[derive(thiserror::Error)]` for the Display/Error impl
/// - Classify by how the runtime handles the fault, not by its impact
pub trait RuntimeFault: core::fmt::Display + core::fmt::Debug {
    /// Returns the class of this fault.
    fn class(&self) -> FaultClass;

    /// Returns a static identifier for this fault, useful for grouping in
    /// tests and logs. Defaults to the type name.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Logs a fault at the level matching its class.
///
/// `context` names the unit that failed (an action name, a component name,
/// an attribute) so log lines can be grouped without parsing messages.
pub fn report_fault(fault: &dyn RuntimeFault, context: &str) {
    let class = fault.class();
    if class.is_failure() {
        error!(
            target: "ability_core::fault",
            class = class.as_str(),
            code = fault.error_code(),
            context,
            error = %fault,
            "runtime fault"
        );
    } else {
        warn!(
            target: "ability_core::fault",
            class = class.as_str(),
            code = fault.error_code(),
            context,
            error = %fault,
            "runtime fault"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("probe")]
    struct Probe;

    impl RuntimeFault for Probe {
        fn class(&self) -> FaultClass {
            FaultClass::Invariant
        }
    }

    #[test]
    fn default_error_code_uses_type_name() {
        assert!(Probe.error_code().ends_with("Probe"));
        assert_eq!(Probe.class().as_str(), "invariant");
    }

    #[test]
    fn only_component_faults_are_failures() {
        assert!(FaultClass::Component.is_failure());
        assert!(!FaultClass::Configuration.is_failure());
        assert!(!FaultClass::Invariant.is_failure());
    }
}
