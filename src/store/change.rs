// ============================================================================
// Pending Change Tracking
// ============================================================================
//
// Command Pattern over the gateway's row operations. A unit of work records
// changes as the application stages them; the gateway applies them at commit
// after the audit interceptor has had its pass.
//
// ============================================================================

use super::record::Record;
use crate::core::EntityId;

/// One staged row operation.
#[derive(Debug, Clone)]
pub enum PendingChange {
    /// Insert a new record.
    Insert(Record),

    /// Replace an existing record.
    Update { before: Record, after: Record },

    /// Delete an existing record. The interceptor rewrites this to a
    /// soft-delete update for record kinds that support it.
    Delete { before: Record },
}

impl PendingChange {
    /// Table affected by this change.
    pub fn table(&self) -> &'static str {
        match self {
            PendingChange::Insert(r) => r.table(),
            PendingChange::Update { after, .. } => after.table(),
            PendingChange::Delete { before } => before.table(),
        }
    }

    /// Primary key of the affected row.
    pub fn entity_id(&self) -> EntityId {
        match self {
            PendingChange::Insert(r) => r.entity_id(),
            PendingChange::Update { after, .. } => after.entity_id(),
            PendingChange::Delete { before } => before.entity_id(),
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, PendingChange::Delete { .. })
    }
}
