//! Attribute modifiers and the layer they apply to.

/// Layer a modifier contributes to.
///
/// Calculation order is fixed:
/// `current = ((base + ΣAddBase) × (1 + ΣMulBase) + ΣAddFinal) × (1 + ΣMulFinal)`
///
/// Multiplicative kinds carry *increments*: two `MulBase(+0.5)` modifiers give
/// a ×2 multiplier, not ×2.25.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    /// Absolute delta added to the base before the base multiplier.
    AddBase,
    /// Increment to the base multiplier.
    MulBase,
    /// Absolute delta added to the body before the final multiplier.
    AddFinal,
    /// Increment to the final multiplier.
    MulFinal,
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 4] = [
        ModifierKind::AddBase,
        ModifierKind::MulBase,
        ModifierKind::AddFinal,
        ModifierKind::MulFinal,
    ];

    pub const fn is_multiplicative(&self) -> bool {
        matches!(self, Self::MulBase | Self::MulFinal)
    }
}

/// A single contribution to one attribute.
///
/// Modifiers are immutable once built. `id` is the removal key within the
/// attribute; `source` groups modifiers for bulk removal (typically the
/// granting ability's source key).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeModifier {
    pub id: String,
    pub attribute: String,
    pub kind: ModifierKind,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Recorded for display. Calculation never orders by it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl AttributeModifier {
    pub fn new(
        id: impl Into<String>,
        attribute: impl Into<String>,
        kind: ModifierKind,
        value: f64,
    ) -> Self {
        Self {
            id: id.into(),
            attribute: attribute.into(),
            kind,
            value,
            source: None,
            priority: None,
        }
    }

    pub fn add_base(id: impl Into<String>, attribute: impl Into<String>, value: f64) -> Self {
        Self::new(id, attribute, ModifierKind::AddBase, value)
    }

    pub fn mul_base(id: impl Into<String>, attribute: impl Into<String>, value: f64) -> Self {
        Self::new(id, attribute, ModifierKind::MulBase, value)
    }

    pub fn add_final(id: impl Into<String>, attribute: impl Into<String>, value: f64) -> Self {
        Self::new(id, attribute, ModifierKind::AddFinal, value)
    }

    pub fn mul_final(id: impl Into<String>, attribute: impl Into<String>, value: f64) -> Self {
        Self::new(id, attribute, ModifierKind::MulFinal, value)
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn is_from(&self, source: &str) -> bool {
        self.source.as_deref() == Some(source)
    }
}

/// Data-only description of a modifier, used by content and components that
/// stamp ids and sources at apply time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModifierSpec {
    pub attribute: String,
    pub kind: ModifierKind,
    pub value: f64,
}

impl ModifierSpec {
    pub fn new(attribute: impl Into<String>, kind: ModifierKind, value: f64) -> Self {
        Self {
            attribute: attribute.into(),
            kind,
            value,
        }
    }

    /// Builds a concrete modifier with the given id and source.
    pub fn instantiate(&self, id: impl Into<String>, source: &str) -> AttributeModifier {
        AttributeModifier::new(id, self.attribute.clone(), self.kind, self.value)
            .with_source(source)
    }
}
