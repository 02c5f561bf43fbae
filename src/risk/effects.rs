use crate::model::Control;

/// How strongly a fully-qualified control reduces each risk dimension.
///
/// Values are fractions in [0, 1]; the engine clamps anything outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlEffect {
    /// Reduction applied to scenario frequency.
    pub frequency: f64,
    /// Reduction applied to impact percentage.
    pub impact: f64,
}

impl ControlEffect {
    pub const FULL: ControlEffect = ControlEffect {
        frequency: 1.0,
        impact: 1.0,
    };
}

/// Seam for per-control effect strength.
///
/// Deployments may weight frequency and impact differently per control
/// family; the engine assumes nothing about symmetry.
pub trait EffectProvider: Send + Sync {
    fn effect_for(&self, control: &Control) -> ControlEffect;
}

/// Default provider: a fully-qualified control can reduce either dimension
/// to zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEffects;

impl EffectProvider for DefaultEffects {
    fn effect_for(&self, _control: &Control) -> ControlEffect {
        ControlEffect::FULL
    }
}
