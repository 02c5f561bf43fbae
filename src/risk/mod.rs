pub mod effects;
pub mod engine;

pub use effects::{ControlEffect, DefaultEffects, EffectProvider};
pub use engine::{
    apply_control_effects, base_eal, clamp01, delta_eal, quality_weight, residual_eal,
    MATURITY_MAX,
};
