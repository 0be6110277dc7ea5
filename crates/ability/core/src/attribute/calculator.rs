//! Pure four-layer attribute calculation.
//!
//! ```text
//! body    = (base + ΣAddBase) × (1 + ΣMulBase)
//! current = (body + ΣAddFinal) × (1 + ΣMulFinal)
//! ```
//!
//! Each layer is summed before it is applied, so the result does not depend
//! on the order modifiers were added in.

use super::modifier::{AttributeModifier, ModifierKind};

/// Every intermediate of one attribute calculation.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttributeBreakdown {
    pub base: f64,
    pub add_base_sum: f64,
    pub mul_base_product: f64,
    pub body: f64,
    pub add_final_sum: f64,
    pub mul_final_product: f64,
    pub current: f64,
}

impl AttributeBreakdown {
    /// Breakdown of an attribute with no modifiers.
    pub fn from_base(base: f64) -> Self {
        Self {
            base,
            add_base_sum: 0.0,
            mul_base_product: 1.0,
            body: base,
            add_final_sum: 0.0,
            mul_final_product: 1.0,
            current: base,
        }
    }

    /// Folds `min`/`max` constraints into `body` and `current`.
    ///
    /// The lower bound wins when the bounds cross.
    #[must_use]
    pub fn clamped(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.body = clamp_value(self.body, min, max);
        self.current = clamp_value(self.current, min, max);
        self
    }
}

pub(crate) fn clamp_value(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let mut value = value;
    if let Some(max) = max {
        value = value.min(max);
    }
    if let Some(min) = min {
        value = value.max(min);
    }
    value
}

/// Computes the breakdown of `base` under `modifiers`.
///
/// Modifiers targeting other attributes are not filtered here; callers pass
/// the list already scoped to one attribute.
pub fn calculate(base: f64, modifiers: &[AttributeModifier]) -> AttributeBreakdown {
    let mut sums = [0.0_f64; 4];
    for modifier in modifiers {
        let slot = match modifier.kind {
            ModifierKind::AddBase => 0,
            ModifierKind::MulBase => 1,
            ModifierKind::AddFinal => 2,
            ModifierKind::MulFinal => 3,
        };
        sums[slot] += modifier.value;
    }
    let [add_base_sum, mul_base_sum, add_final_sum, mul_final_sum] = sums;

    let mul_base_product = 1.0 + mul_base_sum;
    let body = (base + add_base_sum) * mul_base_product;
    let mul_final_product = 1.0 + mul_final_sum;
    let current = (body + add_final_sum) * mul_final_product;

    AttributeBreakdown {
        base,
        add_base_sum,
        mul_base_product,
        body,
        add_final_sum,
        mul_final_product,
        current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn applies_layers_in_fixed_order() {
        let modifiers = vec![
            AttributeModifier::add_base("a", "atk", 10.0),
            AttributeModifier::mul_base("b", "atk", 0.2),
            AttributeModifier::add_final("c", "atk", 5.0),
            AttributeModifier::mul_final("d", "atk", 0.5),
        ];
        let breakdown = calculate(50.0, &modifiers);

        assert!(close(breakdown.body, 72.0));
        assert!(close(breakdown.current, (72.0 + 5.0) * 1.5));
        assert!(close(breakdown.mul_base_product, 1.2));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut modifiers = vec![
            AttributeModifier::mul_final("d", "atk", -0.25),
            AttributeModifier::add_base("a", "atk", 7.0),
            AttributeModifier::mul_base("b", "atk", 0.3),
            AttributeModifier::add_final("c", "atk", 2.5),
            AttributeModifier::add_base("e", "atk", -3.0),
        ];
        let forward = calculate(40.0, &modifiers);
        modifiers.reverse();
        let backward = calculate(40.0, &modifiers);

        assert!(close(forward.current, backward.current));
        assert!(close(forward.body, backward.body));
    }

    #[test]
    fn multiplicative_increments_sum() {
        let modifiers = vec![
            AttributeModifier::mul_base("a", "hp", 0.5),
            AttributeModifier::mul_base("b", "hp", 0.5),
        ];
        assert!(close(calculate(10.0, &modifiers).current, 20.0));
    }

    #[test]
    fn no_modifiers_is_identity() {
        assert_eq!(calculate(33.0, &[]), AttributeBreakdown::from_base(33.0));
    }

    #[test]
    fn clamp_affects_body_and_current_only() {
        let breakdown = calculate(90.0, &[AttributeModifier::add_final("a", "hp", 30.0)])
            .clamped(Some(0.0), Some(100.0));
        assert!(close(breakdown.base, 90.0));
        assert!(close(breakdown.body, 90.0));
        assert!(close(breakdown.current, 100.0));

        let crossed = AttributeBreakdown::from_base(5.0).clamped(Some(10.0), Some(1.0));
        assert!(close(crossed.current, 10.0));
    }
}
