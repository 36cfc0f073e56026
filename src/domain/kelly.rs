//! Kelly criterion sizing: base, confidence-weighted and fractional.
//!
//! With win probability `p`, fractional gain `g` and fractional loss `l`,
//! the net odds are `b = g / l` and the growth-optimal fraction is
//!
//! ```text
//! f* = (b·p − q) / b,   q = 1 − p
//! ```
//!
//! clamped at zero: a negative edge never produces short exposure.

use serde::Serialize;

pub const DEFAULT_RISK_AVERSION: f64 = 1.0;

/// Base Kelly fraction, never negative.
///
/// Degenerate inputs (`l <= 0`, `g <= 0`, or anything non-finite) yield 0.
pub fn kelly_fraction(p: f64, g: f64, l: f64) -> f64 {
    if !(p.is_finite() && g.is_finite() && l.is_finite()) {
        return 0.0;
    }
    if l <= 0.0 || g <= 0.0 {
        return 0.0;
    }
    let q = 1.0 - p;
    let b = g / l;
    let kelly = (b * p - q) / b;
    kelly.max(0.0)
}

/// Fractional Kelly: `kelly × scaling_factor`.
pub fn scaled_kelly(kelly: f64, scaling_factor: f64) -> f64 {
    kelly * scaling_factor
}

/// Confidence in each Kelly input, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceWeights {
    pub probability: f64,
    pub gain: f64,
    pub loss: f64,
}

impl ConfidenceWeights {
    pub fn uniform(confidence: f64) -> Self {
        Self {
            probability: confidence,
            gain: confidence,
            loss: confidence,
        }
    }

    pub fn mean(&self) -> f64 {
        (self.probability + self.gain + self.loss) / 3.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KellyResult {
    pub base_kelly: f64,
    pub confidence_weighted_kelly: f64,
    pub conservative_kelly: f64,
    pub optimistic_kelly: f64,
    pub confidence_factor: f64,
    pub risk_adjustment: f64,
    pub weights: ConfidenceWeights,
}

/// Kelly discounted by the confidence in its own inputs, with pessimistic
/// and optimistic brackets recomputed from shifted inputs.
pub fn confidence_weighted_kelly(
    p: f64,
    g: f64,
    l: f64,
    weights: ConfidenceWeights,
    risk_aversion: f64,
) -> KellyResult {
    let base_kelly = kelly_fraction(p, g, l);

    let confidence_factor = weights.mean();
    let risk_adjustment = 1.0 / (1.0 + risk_aversion * (1.0 - confidence_factor));

    let conservative_p = p * weights.probability;
    let conservative_g = g * weights.gain;
    let conservative_l = if weights.loss > 0.0 {
        l / weights.loss
    } else {
        l * 2.0
    };
    let conservative_kelly = kelly_fraction(conservative_p, conservative_g, conservative_l);

    let optimistic_p = p + (1.0 - weights.probability) * 0.1;
    let optimistic_g = g + (1.0 - weights.gain) * 0.05;
    let optimistic_l = l * (1.0 - (1.0 - weights.loss) * 0.5);
    let optimistic_kelly = kelly_fraction(optimistic_p, optimistic_g, optimistic_l);

    KellyResult {
        base_kelly,
        confidence_weighted_kelly: base_kelly * confidence_factor * risk_adjustment,
        conservative_kelly,
        optimistic_kelly,
        confidence_factor,
        risk_adjustment,
        weights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    #[test]
    fn favourable_bet() {
        // b = 2, (2·0.6 − 0.4) / 2 = 0.4
        assert_abs_diff_eq!(kelly_fraction(0.6, 0.2, 0.1), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn unfavourable_bet_clamps_to_zero() {
        // b = 0.5, (0.5·0.4 − 0.6) / 0.5 = −0.8
        assert_eq!(kelly_fraction(0.4, 0.1, 0.2), 0.0);
    }

    #[test]
    fn even_money_with_edge() {
        assert_abs_diff_eq!(kelly_fraction(0.55, 1.0, 1.0), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_inputs_yield_zero() {
        assert_eq!(kelly_fraction(0.6, 0.2, 0.0), 0.0);
        assert_eq!(kelly_fraction(0.6, 0.0, 0.1), 0.0);
        assert_eq!(kelly_fraction(f64::NAN, 0.2, 0.1), 0.0);
        assert_eq!(kelly_fraction(0.6, f64::INFINITY, 0.1), 0.0);
    }

    #[test]
    fn scaled_is_exact_product() {
        assert_eq!(scaled_kelly(0.4, 0.5), 0.2);
        assert_eq!(scaled_kelly(0.4, 0.25), 0.1);
    }

    #[test]
    fn full_confidence_matches_base() {
        let result = confidence_weighted_kelly(0.6, 0.2, 0.1, ConfidenceWeights::uniform(1.0), 1.0);
        assert_abs_diff_eq!(result.confidence_factor, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.risk_adjustment, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.confidence_weighted_kelly, result.base_kelly, epsilon = 1e-12);
        assert_abs_diff_eq!(result.conservative_kelly, result.base_kelly, epsilon = 1e-12);
        assert_abs_diff_eq!(result.optimistic_kelly, result.base_kelly, epsilon = 1e-12);
    }

    #[test]
    fn medium_confidence_scenario() {
        let weights = ConfidenceWeights {
            probability: 0.7,
            gain: 0.65,
            loss: 0.6,
        };
        let result = confidence_weighted_kelly(0.6, 0.2, 0.1, weights, 1.0);

        let cf = (0.7 + 0.65 + 0.6) / 3.0;
        let ra = 1.0 / (1.0 + (1.0 - cf));
        assert_abs_diff_eq!(result.confidence_factor, cf, epsilon = 1e-12);
        assert_abs_diff_eq!(result.risk_adjustment, ra, epsilon = 1e-12);
        assert_abs_diff_eq!(result.confidence_weighted_kelly, 0.4 * cf * ra, epsilon = 1e-12);

        let conservative = kelly_fraction(0.6 * 0.7, 0.2 * 0.65, 0.1 / 0.6);
        assert_abs_diff_eq!(result.conservative_kelly, conservative, epsilon = 1e-12);

        let optimistic = kelly_fraction(0.6 + 0.3 * 0.1, 0.2 + 0.35 * 0.05, 0.1 * (1.0 - 0.4 * 0.5));
        assert_abs_diff_eq!(result.optimistic_kelly, optimistic, epsilon = 1e-12);
        assert!(result.conservative_kelly <= result.base_kelly);
        assert!(result.optimistic_kelly >= result.base_kelly);
    }

    #[test]
    fn zero_loss_confidence_doubles_loss() {
        let weights = ConfidenceWeights {
            probability: 0.9,
            gain: 0.9,
            loss: 0.0,
        };
        let result = confidence_weighted_kelly(0.6, 0.2, 0.1, weights, 1.0);
        let expected = kelly_fraction(0.6 * 0.9, 0.2 * 0.9, 0.2);
        assert_abs_diff_eq!(result.conservative_kelly, expected, epsilon = 1e-12);
    }

    #[test]
    fn higher_risk_aversion_shrinks_weighted_kelly() {
        let weights = ConfidenceWeights::uniform(0.6);
        let mild = confidence_weighted_kelly(0.6, 0.2, 0.1, weights, 0.5);
        let strict = confidence_weighted_kelly(0.6, 0.2, 0.1, weights, 3.0);
        assert!(strict.confidence_weighted_kelly < mild.confidence_weighted_kelly);
    }

    proptest! {
        #[test]
        fn kelly_is_never_negative(p in 0.0..=1.0f64, g in 0.0..10.0f64, l in 1e-6..10.0f64) {
            prop_assert!(kelly_fraction(p, g, l) >= 0.0);
        }

        #[test]
        fn weighted_never_exceeds_base(
            p in 0.0..=1.0f64,
            g in 1e-4..1.0f64,
            l in 1e-4..1.0f64,
            c in 0.0..1.0f64,
        ) {
            let result = confidence_weighted_kelly(p, g, l, ConfidenceWeights::uniform(c), 1.0);
            prop_assert!(result.confidence_weighted_kelly <= result.base_kelly);
        }

        #[test]
        fn scaling_is_linear(k in 0.0..1.0f64, s in 0.0..=1.0f64) {
            prop_assert_eq!(scaled_kelly(k, s), k * s);
        }
    }
}
