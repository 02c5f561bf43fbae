pub mod service;

pub use service::{ControlAssessment, CustomerRisk, RiskService, ScenarioRisk};
