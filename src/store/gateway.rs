use async_trait::async_trait;

use super::unit_of_work::UnitOfWork;
use crate::core::{CustomerId, EntityId, Result, TemplateId};
use crate::model::{Control, Customer, Revision, Scenario};
use crate::provision::ledger::IdempotencyMapping;

/// Transactional unit-of-work boundary over the relational store.
///
/// This is the external-collaborator seam: the engines and the facade only
/// ever talk to the store through it. Default read paths exclude
/// soft-deleted rows; the `_include_deleted` variants exist for audit and
/// restore flows.
///
/// Unique-constraint violations surface as
/// [`RiskError::UniqueViolation`](crate::core::RiskError::UniqueViolation)
/// from [`commit`](PersistenceGateway::commit), before any staged change is
/// applied.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Atomically apply one unit of work: audit interception, constraint
    /// checks, row changes, and revision appends all succeed or all fail.
    async fn commit(&self, uow: &mut UnitOfWork) -> Result<()>;

    /// Ledger lookup for one (customer, template) pair.
    async fn find_mapping(
        &self,
        customer_id: CustomerId,
        template_id: TemplateId,
    ) -> Result<Option<IdempotencyMapping>>;

    async fn find_scenario(&self, id: EntityId) -> Result<Option<Scenario>>;

    async fn find_scenario_include_deleted(&self, id: EntityId) -> Result<Option<Scenario>>;

    async fn find_control(&self, id: EntityId) -> Result<Option<Control>>;

    async fn find_control_include_deleted(&self, id: EntityId) -> Result<Option<Control>>;

    /// Live controls linked to one scenario (forward lookup only).
    async fn controls_for_scenario(&self, scenario_id: EntityId) -> Result<Vec<Control>>;

    /// Live scenarios owned by one customer.
    async fn scenarios_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Scenario>>;

    /// Full audit history of one entity, in commit order.
    async fn revisions(&self, table: &str, entity_id: EntityId) -> Result<Vec<Revision>>;

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>>;
}
