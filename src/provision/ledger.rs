// ============================================================================
// Idempotency Ledger
// ============================================================================
//
// Append-only mapping rows tying a (customer, template) pair to the single
// materialized entity created for it. The pair's uniqueness constraint is
// the only concurrency control provisioning relies on.
//
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CustomerId, EntityId, TemplateId};

/// Name of the unique constraint over (customer_id, template_id), as it
/// appears in `UniqueViolation` errors.
pub const LEDGER_UNIQUE_CONSTRAINT: &str = "uq_ledger_customer_template";

/// One ledger row. Immutable after creation; never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyMapping {
    pub customer_id: CustomerId,
    pub template_id: TemplateId,
    /// The one materialized entity this pair produced.
    pub entity_id: EntityId,
    pub created_at: DateTime<Utc>,
}

impl IdempotencyMapping {
    pub fn new(
        customer_id: CustomerId,
        template_id: TemplateId,
        entity_id: EntityId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            template_id,
            entity_id,
            created_at,
        }
    }

    /// The unique key this row occupies.
    pub fn key(&self) -> (CustomerId, TemplateId) {
        (self.customer_id, self.template_id)
    }
}
