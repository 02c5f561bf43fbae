// ============================================================================
// Risk Engine
// ============================================================================
//
// Pure EAL arithmetic over in-memory values. Nothing here touches the
// gateway, holds state, or produces side effects; callers can invoke these
// from any number of tasks without synchronization.
//
// Clamping rules: probability-like inputs clamp to [0, 1], frequency-like
// inputs clamp to >= 0, and the final delta clamps to >= 0. Nothing else
// is silently adjusted. A negative revenue base is an error, not a clamp.
//
// ============================================================================

use super::effects::EffectProvider;
use crate::model::Control;
use crate::core::{Result, RiskError};

/// Maturity scale ceiling; maturity contributes `maturity / 3` to quality.
pub const MATURITY_MAX: u8 = 3;

#[inline]
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[inline]
fn non_negative(value: f64) -> f64 {
    value.max(0.0)
}

/// Annualized loss expectancy before any controls.
///
/// `eal = max(frequency, 0) * clamp01(impact_pct) * revenue_per_year`
///
/// # Errors
/// `InvalidArgument` when `revenue_per_year` is negative; revenue is a
/// modeling base, not a probability, so no clamp applies.
pub fn base_eal(frequency: f64, impact_pct: f64, revenue_per_year: f64) -> Result<f64> {
    if revenue_per_year < 0.0 {
        return Err(RiskError::InvalidArgument(format!(
            "revenue_per_year must be >= 0, got {revenue_per_year}"
        )));
    }
    Ok(non_negative(frequency) * clamp01(impact_pct) * revenue_per_year)
}

/// Quality weight of one control:
/// `clamp01(coverage) * clamp01(evidence) * clamp01(freshness) * clamp01(maturity/3)`.
pub fn quality_weight(control: &Control) -> f64 {
    clamp01(control.coverage)
        * clamp01(control.evidence_weight)
        * clamp01(control.freshness)
        * clamp01(f64::from(control.maturity) / f64::from(MATURITY_MAX))
}

/// Apply every implemented control to a (frequency, impact_pct) pair.
///
/// Composition is sequential and multiplicative: each control scales the
/// already-reduced values by `(1 - effect * weight)` per dimension. The
/// product commutes, so ordering among controls cannot change the result;
/// each implemented control is applied exactly once.
///
/// Controls that are not implemented, or whose quality weight is zero,
/// contribute nothing.
pub fn apply_control_effects(
    frequency: f64,
    impact_pct: f64,
    controls: &[Control],
    effects: &dyn EffectProvider,
) -> (f64, f64) {
    let mut residual_frequency = non_negative(frequency);
    let mut residual_impact = clamp01(impact_pct);

    for control in controls {
        if !control.implemented {
            continue;
        }
        let weight = quality_weight(control);
        if weight <= 0.0 {
            continue;
        }
        let effect = effects.effect_for(control);
        residual_frequency *= 1.0 - clamp01(effect.frequency) * weight;
        residual_impact *= 1.0 - clamp01(effect.impact) * weight;
    }

    (non_negative(residual_frequency), clamp01(residual_impact))
}

/// Annualized loss expectancy after control effects.
///
/// Same clamping and revenue rules as [`base_eal`].
pub fn residual_eal(
    frequency: f64,
    impact_pct: f64,
    controls: &[Control],
    effects: &dyn EffectProvider,
    revenue_per_year: f64,
) -> Result<f64> {
    let (residual_frequency, residual_impact) =
        apply_control_effects(frequency, impact_pct, controls, effects);
    base_eal(residual_frequency, residual_impact, revenue_per_year)
}

/// EAL reduction attributable to controls: `max(0, base - residual)`.
///
/// Never negative, even when a caller supplies a residual above base; that
/// is a defensive clamp, not an error.
pub fn delta_eal(base: f64, residual: f64) -> f64 {
    non_negative(base - residual)
}
