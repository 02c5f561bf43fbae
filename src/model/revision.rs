// ============================================================================
// Audit Revisions
// ============================================================================
//
// One revision per committed mutation of a versioned entity. Revisions are
// append-only: nothing in the crate updates or deletes one.
//
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::EntityId;

/// What the mutation did. `Delete` means logically deleted: the row itself
/// survives with its soft-delete stamp set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionAction {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for RevisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevisionAction::Create => write!(f, "CREATE"),
            RevisionAction::Update => write!(f, "UPDATE"),
            RevisionAction::Delete => write!(f, "DELETE"),
        }
    }
}

/// Flat property-name -> scalar-value snapshot of the entity's persisted
/// columns at the time of the action.
pub type Snapshot = Map<String, Value>;

/// Immutable audit record for one entity mutation.
#[derive(Debug, Clone, Serialize)]
pub struct Revision {
    /// Logical table the entity lives in.
    pub table: &'static str,
    pub entity_id: EntityId,
    pub action: RevisionAction,
    /// Acting user, when an actor context was present.
    pub actor: Option<String>,
    pub snapshot: Snapshot,
    pub recorded_at: DateTime<Utc>,
}

impl Revision {
    /// Read one scalar column back out of the snapshot.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.snapshot.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(RevisionAction::Create.to_string(), "CREATE");
        assert_eq!(RevisionAction::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_field_lookup() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("name".into(), Value::String("Backups".into()));

        let revision = Revision {
            table: "controls",
            entity_id: EntityId::new(),
            action: RevisionAction::Update,
            actor: Some("alice".into()),
            snapshot,
            recorded_at: Utc::now(),
        };

        assert_eq!(revision.field("name"), Some(&Value::String("Backups".into())));
        assert_eq!(revision.field("missing"), None);
    }
}
