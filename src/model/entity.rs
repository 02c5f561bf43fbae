// ============================================================================
// Materialized Entities
// ============================================================================
//
// Customer-owned, mutable copies of library templates. Born through the
// provisioning engine, mutated by application services afterwards, and only
// ever soft-deleted.
//
// Relationship fields are plain forward foreign keys (control -> scenario);
// there are no embedded back-references. Revision snapshots cover the scalar
// columns only, so collection fields must serialize as JSON arrays (the
// snapshot builder strips non-scalar values).
//
// ============================================================================

use serde::{Deserialize, Serialize};

use super::soft_delete::{SoftDeletable, SoftDeleteState};
use super::template::{ControlTemplate, ScenarioTemplate};
use crate::core::{CustomerId, EntityId, TemplateId};

/// Customer scenario: a loss event the customer tracks and quantifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: EntityId,
    pub customer_id: CustomerId,
    pub template_id: TemplateId,
    pub name: String,
    /// Expected occurrences per year.
    pub annual_frequency: f64,
    /// Impact as a fraction of annual revenue, in [0, 1].
    pub impact_pct: f64,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub soft_delete: SoftDeleteState,
}

impl Scenario {
    /// Materialize a customer copy from a library scenario.
    ///
    /// Copies the template's baseline values verbatim; the customer tunes
    /// them later through application services.
    pub fn materialize(customer_id: CustomerId, template: &ScenarioTemplate) -> Self {
        Self {
            id: EntityId::new(),
            customer_id,
            template_id: template.id,
            name: template.name.clone(),
            annual_frequency: template.annual_frequency,
            impact_pct: template.impact_pct,
            tags: template.tags.clone(),
            soft_delete: SoftDeleteState::live(),
        }
    }
}

impl SoftDeletable for Scenario {
    fn soft_delete(&self) -> &SoftDeleteState {
        &self.soft_delete
    }

    fn soft_delete_mut(&mut self) -> &mut SoftDeleteState {
        &mut self.soft_delete
    }
}

/// Lifecycle status of a customer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlStatus {
    Proposed,
    Planned,
    Implemented,
    Retired,
}

/// Customer control: a mitigation applied against one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Control {
    pub id: EntityId,
    pub customer_id: CustomerId,
    pub template_id: TemplateId,
    /// The scenario this control mitigates (forward FK, no back-pointer).
    pub scenario_id: EntityId,
    pub name: String,
    pub implemented: bool,
    /// Fraction of the scenario surface the control covers, in [0, 1].
    pub coverage: f64,
    /// Maturity on a 0..=3 scale.
    pub maturity: u8,
    /// Confidence in the supporting evidence, in [0, 1].
    pub evidence_weight: f64,
    /// How recently the control was assessed, in [0, 1].
    pub freshness: f64,
    pub cost: f64,
    /// Last computed EAL reduction attributed to this control.
    pub delta_eal: f64,
    /// delta_eal per unit cost; 0 when cost is 0.
    pub score: f64,
    pub status: ControlStatus,
    #[serde(flatten)]
    pub soft_delete: SoftDeleteState,
}

impl Control {
    /// Materialize a customer copy from a library control, attached to the
    /// scenario it will mitigate.
    ///
    /// Operational fields start in the "not yet assessed" state: not
    /// implemented, zero coverage/maturity/evidence/freshness, proposed.
    pub fn materialize(
        customer_id: CustomerId,
        scenario_id: EntityId,
        template: &ControlTemplate,
    ) -> Self {
        Self {
            id: EntityId::new(),
            customer_id,
            template_id: template.id,
            scenario_id,
            name: template.name.clone(),
            implemented: false,
            coverage: 0.0,
            maturity: 0,
            evidence_weight: 0.0,
            freshness: 0.0,
            cost: template.cost,
            delta_eal: 0.0,
            score: 0.0,
            status: ControlStatus::Proposed,
            soft_delete: SoftDeleteState::live(),
        }
    }
}

impl SoftDeletable for Control {
    fn soft_delete(&self) -> &SoftDeleteState {
        &self.soft_delete
    }

    fn soft_delete_mut(&mut self) -> &mut SoftDeleteState {
        &mut self.soft_delete
    }
}

/// Customer profile: the revenue base risk computations fall back to when
/// no override is supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub annual_revenue: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control_template() -> ControlTemplate {
        ControlTemplate {
            id: TemplateId::new(),
            name: "Offline backups".into(),
            cost: 25_000.0,
            effort: 3.0,
            tags: vec!["resilience".into()],
        }
    }

    #[test]
    fn test_scenario_materialize_copies_baseline() {
        let template = ScenarioTemplate {
            id: TemplateId::new(),
            name: "Phishing credential theft".into(),
            annual_frequency: 2.5,
            impact_pct: 0.05,
            tags: vec!["social".into()],
        };
        let customer = CustomerId::new();

        let scenario = Scenario::materialize(customer, &template);
        assert_eq!(scenario.customer_id, customer);
        assert_eq!(scenario.template_id, template.id);
        assert_eq!(scenario.annual_frequency, 2.5);
        assert_eq!(scenario.impact_pct, 0.05);
        assert!(!scenario.is_deleted());
    }

    #[test]
    fn test_control_materialize_defaults_unassessed() {
        let scenario_id = EntityId::new();
        let control = Control::materialize(CustomerId::new(), scenario_id, &control_template());

        assert_eq!(control.scenario_id, scenario_id);
        assert!(!control.implemented);
        assert_eq!(control.coverage, 0.0);
        assert_eq!(control.maturity, 0);
        assert_eq!(control.evidence_weight, 0.0);
        assert_eq!(control.freshness, 0.0);
        assert_eq!(control.status, ControlStatus::Proposed);
        assert_eq!(control.cost, 25_000.0);
        assert_eq!(control.delta_eal, 0.0);
    }

    #[test]
    fn test_soft_delete_flattens_into_scalar_columns() {
        let control = Control::materialize(CustomerId::new(), EntityId::new(), &control_template());
        let json = serde_json::to_value(&control).unwrap();
        let obj = json.as_object().unwrap();

        // Flattened, not nested under a "soft_delete" key.
        assert!(obj.contains_key("is_deleted"));
        assert!(!obj.contains_key("soft_delete"));
    }
}
