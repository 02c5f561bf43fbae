// ============================================================================
// RiskCore Library
// ============================================================================

//! Cyber-risk quantification core: idempotent provisioning of scenario and
//! control libraries, expected-annual-loss computation, and audited
//! soft-delete persistence.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use riskcore::{
//!     CustomerId, FixedActor, RiskService, ScenarioTemplate, SystemClock, Template,
//!     TemplateCatalog, TemplateId,
//! };
//!
//! # tokio_test::block_on(async {
//! let ransomware = ScenarioTemplate {
//!     id: TemplateId::new(),
//!     name: "Ransomware outbreak".into(),
//!     annual_frequency: 2.0,
//!     impact_pct: 0.1,
//!     tags: vec!["malware".into()],
//! };
//! let template_id = ransomware.id;
//! let catalog = TemplateCatalog::new().with_template(Template::Scenario(ransomware));
//!
//! let (service, _gateway) = RiskService::in_memory(
//!     catalog,
//!     Arc::new(SystemClock),
//!     Arc::new(FixedActor("analyst".into())),
//! );
//!
//! let scenarios = service
//!     .provision(CustomerId::new(), &[template_id])
//!     .await
//!     .unwrap();
//! let risk = service
//!     .scenario_risk(scenarios[&template_id], Some(1_000_000.0))
//!     .await
//!     .unwrap();
//! assert_eq!(risk.base_eal, 200_000.0);
//! # });
//! ```

pub mod core;
pub mod facade;
pub mod model;
pub mod provision;
pub mod risk;
pub mod store;

// Re-export main types for convenience
pub use crate::core::{
    ActorContext, Clock, CustomerId, EntityId, FixedActor, FixedClock, NoActor, Result,
    RiskError, SystemClock, TemplateId,
};
pub use facade::{ControlAssessment, CustomerRisk, RiskService, ScenarioRisk};
pub use model::{
    Control, ControlStatus, ControlTemplate, Customer, Revision, RevisionAction, Scenario,
    ScenarioTemplate, Template, TemplateCatalog,
};
pub use provision::{IdempotencyMapping, ProvisioningEngine};
pub use risk::{ControlEffect, DefaultEffects, EffectProvider};
pub use store::{InMemoryGateway, PersistenceGateway, UnitOfWork};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn catalog_with_one_scenario() -> (TemplateCatalog, TemplateId) {
        let template = ScenarioTemplate {
            id: TemplateId::new(),
            name: "Ransomware outbreak".into(),
            annual_frequency: 2.0,
            impact_pct: 0.1,
            tags: vec!["malware".into()],
        };
        let id = template.id;
        (
            TemplateCatalog::new().with_template(Template::Scenario(template)),
            id,
        )
    }

    #[tokio::test]
    async fn test_provision_then_compute() {
        let (catalog, template_id) = catalog_with_one_scenario();
        let (service, _gateway) = RiskService::in_memory(
            catalog,
            Arc::new(SystemClock),
            Arc::new(FixedActor("analyst".into())),
        );
        let customer_id = CustomerId::new();

        let provisioned = service.provision(customer_id, &[template_id]).await.unwrap();
        let scenario_id = provisioned[&template_id];

        let risk = service
            .scenario_risk(scenario_id, Some(1_000_000.0))
            .await
            .unwrap();
        assert_eq!(risk.base_eal, 200_000.0);
        assert_eq!(risk.residual_eal, 200_000.0);
        assert_eq!(risk.delta_eal, 0.0);
    }

    #[tokio::test]
    async fn test_compute_without_revenue_base_fails() {
        let (catalog, template_id) = catalog_with_one_scenario();
        let (service, _gateway) =
            RiskService::in_memory(catalog, Arc::new(SystemClock), Arc::new(NoActor));
        let customer_id = CustomerId::new();

        let provisioned = service.provision(customer_id, &[template_id]).await.unwrap();
        let err = service
            .scenario_risk(provisioned[&template_id], None)
            .await
            .unwrap_err();
        assert!(matches!(err, RiskError::InvalidArgument(_)));
    }
}
