// ============================================================================
// In-Memory Gateway
// ============================================================================
//
// Reference gateway backing the engines with plain maps. One RwLock guards
// all tables so a commit is atomic with respect to every reader and every
// other committer: the interceptor pass, the ledger uniqueness check, the
// row writes, and the revision appends happen under a single write guard.
//
// ============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::change::PendingChange;
use super::gateway::PersistenceGateway;
use super::interceptor::AuditInterceptor;
use super::record::Record;
use super::unit_of_work::UnitOfWork;
use crate::core::{
    ActorContext, Clock, CustomerId, EntityId, Result, RiskError, TemplateId,
};
use crate::model::{Control, Customer, Revision, Scenario};
use crate::provision::ledger::{IdempotencyMapping, LEDGER_UNIQUE_CONSTRAINT};

#[derive(Default)]
struct Tables {
    scenarios: HashMap<EntityId, Scenario>,
    controls: HashMap<EntityId, Control>,
    /// Ledger rows keyed by their unique (customer, template) pair.
    ledger: HashMap<(CustomerId, TemplateId), IdempotencyMapping>,
    /// Append-only; never truncated, never rewritten.
    revisions: Vec<Revision>,
    customers: HashMap<CustomerId, Customer>,
}

pub struct InMemoryGateway {
    tables: RwLock<Tables>,
    clock: Arc<dyn Clock>,
    actor: Arc<dyn ActorContext>,
}

impl InMemoryGateway {
    pub fn new(clock: Arc<dyn Clock>, actor: Arc<dyn ActorContext>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
            actor,
        }
    }

    /// Seed or replace a customer profile.
    ///
    /// Profiles are reference data for risk computation, outside the
    /// versioned entity set, so this writes directly.
    pub async fn put_customer(&self, customer: Customer) {
        let mut tables = self.tables.write().await;
        tables.customers.insert(customer.id, customer);
    }

    /// Total revision count across all tables (diagnostics/tests).
    pub async fn revision_count(&self) -> usize {
        self.tables.read().await.revisions.len()
    }

    /// Ledger row count (diagnostics/tests).
    pub async fn ledger_len(&self) -> usize {
        self.tables.read().await.ledger.len()
    }

    fn check_constraints(tables: &Tables, changes: &[PendingChange]) -> Result<()> {
        for change in changes {
            match change {
                PendingChange::Insert(Record::Mapping(m)) => {
                    if tables.ledger.contains_key(&m.key()) {
                        return Err(RiskError::UniqueViolation {
                            constraint: LEDGER_UNIQUE_CONSTRAINT.into(),
                        });
                    }
                }
                PendingChange::Insert(Record::Scenario(s)) => {
                    if tables.scenarios.contains_key(&s.id) {
                        return Err(RiskError::Execution(format!(
                            "duplicate scenario primary key '{}'",
                            s.id
                        )));
                    }
                }
                PendingChange::Insert(Record::Control(c)) => {
                    if tables.controls.contains_key(&c.id) {
                        return Err(RiskError::Execution(format!(
                            "duplicate control primary key '{}'",
                            c.id
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn apply(tables: &mut Tables, change: PendingChange) -> Result<()> {
        match change {
            PendingChange::Insert(record) | PendingChange::Update { after: record, .. } => {
                match record {
                    Record::Scenario(s) => {
                        tables.scenarios.insert(s.id, s);
                    }
                    Record::Control(c) => {
                        tables.controls.insert(c.id, c);
                    }
                    Record::Mapping(m) => {
                        tables.ledger.insert(m.key(), m);
                    }
                }
                Ok(())
            }
            // The interceptor rewrites every delete; one reaching this point
            // means its pass was skipped.
            PendingChange::Delete { before } => Err(RiskError::Execution(format!(
                "unintercepted delete reached the store for {} '{}'",
                before.table(),
                before.entity_id()
            ))),
        }
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn commit(&self, uow: &mut UnitOfWork) -> Result<()> {
        if !uow.state().is_active() {
            return Err(RiskError::Execution(format!(
                "Cannot commit: {} is {}",
                uow.id(),
                uow.state()
            )));
        }

        // One stamp per commit; every change and revision in the unit
        // observes the same now/actor.
        let now = self.clock.utc_now();
        let actor = self.actor.current_user();

        let intercepted =
            match AuditInterceptor::before_commit(uow.changes().to_vec(), now, actor.as_deref()) {
                Ok(intercepted) => intercepted,
                Err(e) => {
                    uow.abort()?;
                    return Err(e);
                }
            };

        let mut tables = self.tables.write().await;

        if let Err(e) = Self::check_constraints(&tables, &intercepted.changes) {
            drop(tables);
            uow.abort()?;
            return Err(e);
        }

        let change_count = intercepted.changes.len();
        for change in intercepted.changes {
            Self::apply(&mut tables, change)?;
        }
        tables.revisions.extend(intercepted.revisions);
        drop(tables);

        uow.commit()?;
        debug!(uow = %uow.id(), changes = change_count, "unit of work committed");
        Ok(())
    }

    async fn find_mapping(
        &self,
        customer_id: CustomerId,
        template_id: TemplateId,
    ) -> Result<Option<IdempotencyMapping>> {
        let tables = self.tables.read().await;
        Ok(tables.ledger.get(&(customer_id, template_id)).cloned())
    }

    async fn find_scenario(&self, id: EntityId) -> Result<Option<Scenario>> {
        let tables = self.tables.read().await;
        Ok(tables
            .scenarios
            .get(&id)
            .filter(|s| !s.soft_delete.is_deleted)
            .cloned())
    }

    async fn find_scenario_include_deleted(&self, id: EntityId) -> Result<Option<Scenario>> {
        let tables = self.tables.read().await;
        Ok(tables.scenarios.get(&id).cloned())
    }

    async fn find_control(&self, id: EntityId) -> Result<Option<Control>> {
        let tables = self.tables.read().await;
        Ok(tables
            .controls
            .get(&id)
            .filter(|c| !c.soft_delete.is_deleted)
            .cloned())
    }

    async fn find_control_include_deleted(&self, id: EntityId) -> Result<Option<Control>> {
        let tables = self.tables.read().await;
        Ok(tables.controls.get(&id).cloned())
    }

    async fn controls_for_scenario(&self, scenario_id: EntityId) -> Result<Vec<Control>> {
        let tables = self.tables.read().await;
        let mut controls: Vec<Control> = tables
            .controls
            .values()
            .filter(|c| c.scenario_id == scenario_id && !c.soft_delete.is_deleted)
            .cloned()
            .collect();
        controls.sort_by_key(|c| c.id);
        Ok(controls)
    }

    async fn scenarios_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Scenario>> {
        let tables = self.tables.read().await;
        let mut scenarios: Vec<Scenario> = tables
            .scenarios
            .values()
            .filter(|s| s.customer_id == customer_id && !s.soft_delete.is_deleted)
            .cloned()
            .collect();
        scenarios.sort_by_key(|s| s.id);
        Ok(scenarios)
    }

    async fn revisions(&self, table: &str, entity_id: EntityId) -> Result<Vec<Revision>> {
        let tables = self.tables.read().await;
        Ok(tables
            .revisions
            .iter()
            .filter(|r| r.table == table && r.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FixedActor, FixedClock};
    use crate::model::{ScenarioTemplate, SoftDeletable};
    use crate::store::record::SCENARIOS_TABLE;
    use chrono::Utc;

    fn gateway() -> InMemoryGateway {
        InMemoryGateway::new(
            Arc::new(FixedClock(Utc::now())),
            Arc::new(FixedActor("tester".into())),
        )
    }

    fn scenario(customer_id: CustomerId) -> Scenario {
        Scenario::materialize(
            customer_id,
            &ScenarioTemplate {
                id: TemplateId::new(),
                name: "API key leak".into(),
                annual_frequency: 3.0,
                impact_pct: 0.01,
                tags: vec![],
            },
        )
    }

    #[tokio::test]
    async fn test_commit_applies_changes_and_revisions() {
        let gw = gateway();
        let s = scenario(CustomerId::new());
        let id = s.id;

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Insert(Record::Scenario(s))).unwrap();
        gw.commit(&mut uow).await.unwrap();

        assert!(gw.find_scenario(id).await.unwrap().is_some());
        let revisions = gw.revisions(SCENARIOS_TABLE, id).await.unwrap();
        assert_eq!(revisions.len(), 1);
        assert_eq!(revisions[0].actor.as_deref(), Some("tester"));
    }

    #[tokio::test]
    async fn test_ledger_unique_violation_leaves_no_trace() {
        let gw = gateway();
        let customer_id = CustomerId::new();
        let template_id = TemplateId::new();

        let winner = scenario(customer_id);
        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Insert(Record::Scenario(winner.clone())))
            .unwrap();
        uow.stage(PendingChange::Insert(Record::Mapping(
            IdempotencyMapping::new(customer_id, template_id, winner.id, Utc::now()),
        )))
        .unwrap();
        gw.commit(&mut uow).await.unwrap();

        // A second unit for the same pair fails atomically: no second
        // scenario row, no second revision, and the unit is aborted.
        let loser = scenario(customer_id);
        let loser_id = loser.id;
        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Insert(Record::Scenario(loser))).unwrap();
        uow.stage(PendingChange::Insert(Record::Mapping(
            IdempotencyMapping::new(customer_id, template_id, loser_id, Utc::now()),
        )))
        .unwrap();

        let err = gw.commit(&mut uow).await.unwrap_err();
        assert!(err.is_unique_violation());
        assert!(gw.find_scenario(loser_id).await.unwrap().is_none());
        assert_eq!(gw.ledger_len().await, 1);
        assert_eq!(gw.revision_count().await, 2); // winner's scenario + mapping
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_hidden_from_default_reads() {
        let gw = gateway();
        let s = scenario(CustomerId::new());
        let id = s.id;

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Insert(Record::Scenario(s.clone())))
            .unwrap();
        gw.commit(&mut uow).await.unwrap();

        let mut uow = UnitOfWork::new();
        uow.stage(PendingChange::Delete {
            before: Record::Scenario(s),
        })
        .unwrap();
        gw.commit(&mut uow).await.unwrap();

        assert!(gw.find_scenario(id).await.unwrap().is_none());
        let kept = gw.find_scenario_include_deleted(id).await.unwrap().unwrap();
        assert!(kept.is_deleted());
        assert_eq!(kept.soft_delete.deleted_by.as_deref(), Some("tester"));
    }

    #[tokio::test]
    async fn test_customer_profile_round_trip() {
        let gw = gateway();
        let customer = Customer {
            id: CustomerId::new(),
            name: "Acme Logistics".into(),
            annual_revenue: 5_000_000.0,
        };
        let id = customer.id;
        gw.put_customer(customer).await;

        let found = gw.find_customer(id).await.unwrap().unwrap();
        assert_eq!(found.annual_revenue, 5_000_000.0);
        assert!(gw.find_customer(CustomerId::new()).await.unwrap().is_none());
    }
}
