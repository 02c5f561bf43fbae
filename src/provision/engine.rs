// ============================================================================
// Provisioning Engine
// ============================================================================
//
// Materializes customer-owned copies of library templates exactly once per
// (customer, template) pair. The ledger's unique constraint is the only
// concurrency control: a caller that loses the insert race re-reads the
// ledger and defers to the winner. That retry happens exactly once.
//
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use super::ledger::IdempotencyMapping;
use crate::core::{Clock, CustomerId, EntityId, Result, RiskError, TemplateId};
use crate::model::{Control, Scenario, Template, TemplateCatalog};
use crate::store::{PendingChange, PersistenceGateway, Record, UnitOfWork};

/// What a control template materializes against. Scenario templates carry
/// no extra context.
enum MaterializeTarget {
    Scenario,
    Control { scenario_id: EntityId },
}

pub struct ProvisioningEngine {
    gateway: Arc<dyn PersistenceGateway>,
    catalog: TemplateCatalog,
    clock: Arc<dyn Clock>,
}

impl ProvisioningEngine {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        catalog: TemplateCatalog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            catalog,
            clock,
        }
    }

    /// Materialize scenario templates for a customer.
    ///
    /// Duplicate template ids collapse; an empty set is a no-op success.
    /// Returns the materialized entity id per requested template, whether it
    /// was created by this call or found already provisioned.
    ///
    /// # Errors
    /// - `InvalidArgument` if a listed template is a control template (those
    ///   need an owning scenario, see [`provision_controls`](Self::provision_controls)).
    /// - `NotFound` if a template id is not in the catalog.
    /// - `ConcurrencyConflict` if the single built-in race retry fails.
    pub async fn provision(
        &self,
        customer_id: CustomerId,
        template_ids: &[TemplateId],
    ) -> Result<BTreeMap<TemplateId, EntityId>> {
        let unique: BTreeSet<TemplateId> = template_ids.iter().copied().collect();
        let mut provisioned = BTreeMap::new();

        for template_id in unique {
            let entity_id = self
                .provision_one(customer_id, template_id, MaterializeTarget::Scenario)
                .await?;
            provisioned.insert(template_id, entity_id);
        }

        if !provisioned.is_empty() {
            info!(
                customer = %customer_id,
                count = provisioned.len(),
                "scenario provisioning complete"
            );
        }
        Ok(provisioned)
    }

    /// Materialize control templates for a customer against the scenario
    /// they mitigate.
    ///
    /// Same idempotency semantics as [`provision`](Self::provision); the
    /// scenario must exist, be visible, and belong to the customer.
    pub async fn provision_controls(
        &self,
        customer_id: CustomerId,
        scenario_id: EntityId,
        template_ids: &[TemplateId],
    ) -> Result<BTreeMap<TemplateId, EntityId>> {
        let scenario = self
            .gateway
            .find_scenario(scenario_id)
            .await?
            .ok_or_else(|| RiskError::not_found("scenario", scenario_id))?;
        if scenario.customer_id != customer_id {
            return Err(RiskError::InvalidArgument(format!(
                "scenario '{scenario_id}' does not belong to customer '{customer_id}'"
            )));
        }

        let unique: BTreeSet<TemplateId> = template_ids.iter().copied().collect();
        let mut provisioned = BTreeMap::new();

        for template_id in unique {
            let entity_id = self
                .provision_one(
                    customer_id,
                    template_id,
                    MaterializeTarget::Control { scenario_id },
                )
                .await?;
            provisioned.insert(template_id, entity_id);
        }
        Ok(provisioned)
    }

    /// Provision a single (customer, template) pair.
    async fn provision_one(
        &self,
        customer_id: CustomerId,
        template_id: TemplateId,
        target: MaterializeTarget,
    ) -> Result<EntityId> {
        // Fast path: the pair was already materialized. No new entity, no
        // new ledger row, no new revision.
        if let Some(mapping) = self.gateway.find_mapping(customer_id, template_id).await? {
            debug!(
                customer = %customer_id,
                template = %template_id,
                entity = %mapping.entity_id,
                "pair already provisioned"
            );
            return Ok(mapping.entity_id);
        }

        let record = self.materialize(customer_id, template_id, &target)?;
        let entity_id = record.entity_id();

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Insert(record))?;
        uow.stage(PendingChange::Insert(Record::Mapping(
            IdempotencyMapping::new(customer_id, template_id, entity_id, self.clock.utc_now()),
        )))?;

        match self.gateway.commit(&mut uow).await {
            Ok(()) => {
                debug!(
                    customer = %customer_id,
                    template = %template_id,
                    entity = %entity_id,
                    "materialized new entity"
                );
                Ok(entity_id)
            }
            Err(e) if e.is_unique_violation() => {
                // A concurrent caller won the race for this pair. Our
                // entity and ledger row were discarded with the aborted
                // unit; defer to the winner. This re-read is the single
                // retry the engine performs.
                match self.gateway.find_mapping(customer_id, template_id).await? {
                    Some(mapping) => {
                        debug!(
                            customer = %customer_id,
                            template = %template_id,
                            entity = %mapping.entity_id,
                            "lost provisioning race, deferring to winner"
                        );
                        Ok(mapping.entity_id)
                    }
                    None => Err(RiskError::ConcurrencyConflict(format!(
                        "ledger row for customer '{customer_id}' template '{template_id}' \
                         vanished after unique-constraint violation"
                    ))),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn materialize(
        &self,
        customer_id: CustomerId,
        template_id: TemplateId,
        target: &MaterializeTarget,
    ) -> Result<Record> {
        match (self.catalog.get(template_id)?, target) {
            (Template::Scenario(t), MaterializeTarget::Scenario) => {
                Ok(Record::Scenario(Scenario::materialize(customer_id, t)))
            }
            (Template::Control(t), MaterializeTarget::Control { scenario_id }) => Ok(
                Record::Control(Control::materialize(customer_id, *scenario_id, t)),
            ),
            (Template::Control(_), MaterializeTarget::Scenario) => {
                Err(RiskError::InvalidArgument(format!(
                    "template '{template_id}' is a control template and needs an owning scenario"
                )))
            }
            (Template::Scenario(_), MaterializeTarget::Control { .. }) => {
                Err(RiskError::InvalidArgument(format!(
                    "template '{template_id}' is a scenario template, not a control template"
                )))
            }
        }
    }
}
