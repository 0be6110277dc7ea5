/// Runtime configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Value reported for reads of an attribute that was never defined.
    pub missing_attribute_value: f64,
}

impl RuntimeConfig {
    // ===== compile-time constants =====
    /// Trailing character that turns a marker binding into a prefix pattern.
    pub const WILDCARD: char = '*';
    /// Stack count used when a tag is added without an explicit count.
    pub const DEFAULT_STACKS: u32 = 1;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MISSING_ATTRIBUTE_VALUE: f64 = 0.0;

    pub fn new() -> Self {
        Self {
            missing_attribute_value: Self::DEFAULT_MISSING_ATTRIBUTE_VALUE,
        }
    }

    pub fn with_missing_attribute_value(missing_attribute_value: f64) -> Self {
        Self {
            missing_attribute_value,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
