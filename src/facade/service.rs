// ============================================================================
// Risk Service Facade
// ============================================================================
//
// In-process entry point tying the engines together: provisioning, risk
// computation, audit history, and the application-service mutations that
// exercise the soft-delete/revision paths. Risk computation reads the
// materialized graph and persists nothing; provisioning and the mutations
// each commit one unit of work.
//
// ============================================================================

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::core::{
    ActorContext, Clock, CustomerId, EntityId, Result, RiskError, TemplateId,
};
use crate::model::{Control, ControlStatus, Revision, TemplateCatalog};
use crate::provision::ProvisioningEngine;
use crate::risk::{self, DefaultEffects, EffectProvider};
use crate::store::{InMemoryGateway, PendingChange, PersistenceGateway, Record, UnitOfWork};

/// Computed risk for one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRisk {
    pub scenario_id: EntityId,
    pub base_eal: f64,
    pub residual_frequency: f64,
    pub residual_impact_pct: f64,
    pub residual_eal: f64,
    pub delta_eal: f64,
}

/// Aggregate risk across a customer's scenarios.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRisk {
    pub customer_id: CustomerId,
    pub base_eal: f64,
    pub residual_eal: f64,
    pub delta_eal: f64,
    pub scenarios: Vec<ScenarioRisk>,
}

/// Assessment values an application service writes onto a control.
#[derive(Debug, Clone)]
pub struct ControlAssessment {
    pub implemented: bool,
    pub coverage: f64,
    pub maturity: u8,
    pub evidence_weight: f64,
    pub freshness: f64,
    pub status: ControlStatus,
}

pub struct RiskService {
    gateway: Arc<dyn PersistenceGateway>,
    provisioning: ProvisioningEngine,
    effects: Arc<dyn EffectProvider>,
}

impl RiskService {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        catalog: TemplateCatalog,
        clock: Arc<dyn Clock>,
        effects: Arc<dyn EffectProvider>,
    ) -> Self {
        let provisioning = ProvisioningEngine::new(gateway.clone(), catalog, clock);
        Self {
            gateway,
            provisioning,
            effects,
        }
    }

    /// Convenience constructor over the in-memory gateway with default
    /// control effects.
    pub fn in_memory(
        catalog: TemplateCatalog,
        clock: Arc<dyn Clock>,
        actor: Arc<dyn ActorContext>,
    ) -> (Self, Arc<InMemoryGateway>) {
        let gateway = Arc::new(InMemoryGateway::new(clock.clone(), actor));
        let service = Self::new(gateway.clone(), catalog, clock, Arc::new(DefaultEffects));
        (service, gateway)
    }

    // ========================================================================
    // Provisioning
    // ========================================================================

    /// Materialize scenario templates for a customer, exactly once per pair.
    pub async fn provision(
        &self,
        customer_id: CustomerId,
        template_ids: &[TemplateId],
    ) -> Result<BTreeMap<TemplateId, EntityId>> {
        self.provisioning.provision(customer_id, template_ids).await
    }

    /// Materialize control templates against the scenario they mitigate.
    pub async fn provision_controls(
        &self,
        customer_id: CustomerId,
        scenario_id: EntityId,
        template_ids: &[TemplateId],
    ) -> Result<BTreeMap<TemplateId, EntityId>> {
        self.provisioning
            .provision_controls(customer_id, scenario_id, template_ids)
            .await
    }

    // ========================================================================
    // Risk computation (read-only)
    // ========================================================================

    /// Compute risk for one scenario.
    ///
    /// Revenue comes from the override when given, else from the customer
    /// profile. Soft-deleted scenarios are invisible here and resolve as
    /// `NotFound`.
    pub async fn scenario_risk(
        &self,
        scenario_id: EntityId,
        override_revenue: Option<f64>,
    ) -> Result<ScenarioRisk> {
        let scenario = self
            .gateway
            .find_scenario(scenario_id)
            .await?
            .ok_or_else(|| RiskError::not_found("scenario", scenario_id))?;

        let revenue = self
            .resolve_revenue(scenario.customer_id, override_revenue)
            .await?;
        let controls = self.gateway.controls_for_scenario(scenario_id).await?;
        self.compute(&scenario.into(), &controls, revenue)
    }

    /// Aggregate risk across a customer's live scenarios, optionally
    /// restricted to a scenario id filter.
    pub async fn customer_risk(
        &self,
        customer_id: CustomerId,
        scenario_filter: Option<&[EntityId]>,
        override_revenue: Option<f64>,
    ) -> Result<CustomerRisk> {
        let revenue = self.resolve_revenue(customer_id, override_revenue).await?;
        let scenarios = self.gateway.scenarios_for_customer(customer_id).await?;

        let mut per_scenario = Vec::new();
        for scenario in scenarios {
            if let Some(filter) = scenario_filter {
                if !filter.contains(&scenario.id) {
                    continue;
                }
            }
            let controls = self.gateway.controls_for_scenario(scenario.id).await?;
            per_scenario.push(self.compute(&scenario.into(), &controls, revenue)?);
        }

        Ok(CustomerRisk {
            customer_id,
            base_eal: per_scenario.iter().map(|s| s.base_eal).sum(),
            residual_eal: per_scenario.iter().map(|s| s.residual_eal).sum(),
            delta_eal: per_scenario.iter().map(|s| s.delta_eal).sum(),
            scenarios: per_scenario,
        })
    }

    // ========================================================================
    // Audit history
    // ========================================================================

    /// Full revision history for one entity, in commit order.
    pub async fn revisions(&self, table: &str, entity_id: EntityId) -> Result<Vec<Revision>> {
        self.gateway.revisions(table, entity_id).await
    }

    // ========================================================================
    // Application-service mutations
    // ========================================================================

    /// Write an assessment onto a control.
    pub async fn update_control(
        &self,
        control_id: EntityId,
        assessment: ControlAssessment,
    ) -> Result<Control> {
        if assessment.maturity > risk::MATURITY_MAX {
            return Err(RiskError::InvalidArgument(format!(
                "maturity must be 0..={}, got {}",
                risk::MATURITY_MAX,
                assessment.maturity
            )));
        }

        let before = self
            .gateway
            .find_control(control_id)
            .await?
            .ok_or_else(|| RiskError::not_found("control", control_id))?;

        let mut after = before.clone();
        after.implemented = assessment.implemented;
        after.coverage = assessment.coverage;
        after.maturity = assessment.maturity;
        after.evidence_weight = assessment.evidence_weight;
        after.freshness = assessment.freshness;
        after.status = assessment.status;

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Update {
            before: Record::Control(before),
            after: Record::Control(after.clone()),
        })?;
        self.gateway.commit(&mut uow).await?;
        Ok(after)
    }

    /// Recompute and persist a control's EAL attribution and score.
    ///
    /// Attribution is the residual-EAL increase the scenario would see with
    /// this control removed; score is attribution per unit cost.
    pub async fn score_control(
        &self,
        control_id: EntityId,
        override_revenue: Option<f64>,
    ) -> Result<Control> {
        let before = self
            .gateway
            .find_control(control_id)
            .await?
            .ok_or_else(|| RiskError::not_found("control", control_id))?;
        let scenario = self
            .gateway
            .find_scenario(before.scenario_id)
            .await?
            .ok_or_else(|| RiskError::not_found("scenario", before.scenario_id))?;

        let revenue = self
            .resolve_revenue(scenario.customer_id, override_revenue)
            .await?;
        let controls = self.gateway.controls_for_scenario(scenario.id).await?;
        let others: Vec<Control> = controls
            .iter()
            .filter(|c| c.id != control_id)
            .cloned()
            .collect();

        let with_all = risk::residual_eal(
            scenario.annual_frequency,
            scenario.impact_pct,
            &controls,
            self.effects.as_ref(),
            revenue,
        )?;
        let without_this = risk::residual_eal(
            scenario.annual_frequency,
            scenario.impact_pct,
            &others,
            self.effects.as_ref(),
            revenue,
        )?;

        let mut after = before.clone();
        after.delta_eal = risk::delta_eal(without_this, with_all);
        after.score = if after.cost > 0.0 {
            after.delta_eal / after.cost
        } else {
            0.0
        };

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Update {
            before: Record::Control(before),
            after: Record::Control(after.clone()),
        })?;
        self.gateway.commit(&mut uow).await?;
        Ok(after)
    }

    /// Logically delete a scenario. The interceptor converts this into a
    /// soft-delete update with its Delete revision.
    pub async fn remove_scenario(&self, scenario_id: EntityId) -> Result<()> {
        let before = self
            .gateway
            .find_scenario(scenario_id)
            .await?
            .ok_or_else(|| RiskError::not_found("scenario", scenario_id))?;

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Delete {
            before: Record::Scenario(before),
        })?;
        self.gateway.commit(&mut uow).await?;
        info!(scenario = %scenario_id, "scenario removed");
        Ok(())
    }

    /// Logically delete a control.
    pub async fn remove_control(&self, control_id: EntityId) -> Result<()> {
        let before = self
            .gateway
            .find_control(control_id)
            .await?
            .ok_or_else(|| RiskError::not_found("control", control_id))?;

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Delete {
            before: Record::Control(before),
        })?;
        self.gateway.commit(&mut uow).await?;
        info!(control = %control_id, "control removed");
        Ok(())
    }

    /// Intentional restore of a soft-deleted scenario: the one sanctioned
    /// way a deletion stamp is ever cleared.
    pub async fn restore_scenario(&self, scenario_id: EntityId) -> Result<()> {
        let before = self
            .gateway
            .find_scenario_include_deleted(scenario_id)
            .await?
            .ok_or_else(|| RiskError::not_found("scenario", scenario_id))?;
        if !before.soft_delete.is_deleted {
            return Err(RiskError::InvalidArgument(format!(
                "scenario '{scenario_id}' is not deleted"
            )));
        }

        let mut after = before.clone();
        after.soft_delete.restore();

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Update {
            before: Record::Scenario(before),
            after: Record::Scenario(after),
        })?;
        self.gateway.commit(&mut uow).await?;
        info!(scenario = %scenario_id, "scenario restored");
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn resolve_revenue(
        &self,
        customer_id: CustomerId,
        override_revenue: Option<f64>,
    ) -> Result<f64> {
        let revenue = match override_revenue {
            Some(revenue) => revenue,
            None => {
                self.gateway
                    .find_customer(customer_id)
                    .await?
                    .ok_or_else(|| {
                        RiskError::InvalidArgument(format!(
                            "no revenue base: customer '{customer_id}' has no profile \
                             and no override was given"
                        ))
                    })?
                    .annual_revenue
            }
        };
        if revenue < 0.0 {
            return Err(RiskError::InvalidArgument(format!(
                "revenue must be >= 0, got {revenue}"
            )));
        }
        Ok(revenue)
    }

    fn compute(
        &self,
        inputs: &ScenarioInputs,
        controls: &[Control],
        revenue: f64,
    ) -> Result<ScenarioRisk> {
        let base = risk::base_eal(inputs.annual_frequency, inputs.impact_pct, revenue)?;
        let (residual_frequency, residual_impact_pct) = risk::apply_control_effects(
            inputs.annual_frequency,
            inputs.impact_pct,
            controls,
            self.effects.as_ref(),
        );
        let residual = risk::base_eal(residual_frequency, residual_impact_pct, revenue)?;

        Ok(ScenarioRisk {
            scenario_id: inputs.scenario_id,
            base_eal: base,
            residual_frequency,
            residual_impact_pct,
            residual_eal: residual,
            delta_eal: risk::delta_eal(base, residual),
        })
    }
}

/// The scenario fields risk computation actually consumes.
struct ScenarioInputs {
    scenario_id: EntityId,
    annual_frequency: f64,
    impact_pct: f64,
}

impl From<crate::model::Scenario> for ScenarioInputs {
    fn from(scenario: crate::model::Scenario) -> Self {
        Self {
            scenario_id: scenario.id,
            annual_frequency: scenario.annual_frequency,
            impact_pct: scenario.impact_pct,
        }
    }
}
