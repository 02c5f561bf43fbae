// ============================================================================
// Persistable Records
// ============================================================================
//
// Closed enum over every row kind the gateway stores. Keeping this closed
// lets the interceptor and the in-memory tables stay fully typed: no
// downcasting, no reflection over marker interfaces.
//
// All record kinds are versioned (they get revisions); only scenarios and
// controls are soft-deletable. Ledger rows are immutable after creation.
//
// ============================================================================

use serde_json::Value;

use crate::core::{EntityId, Result, RiskError};
use crate::model::revision::Snapshot;
use crate::model::{Control, Scenario, SoftDeletable, SoftDeleteState};
use crate::provision::ledger::IdempotencyMapping;

pub const SCENARIOS_TABLE: &str = "scenarios";
pub const CONTROLS_TABLE: &str = "controls";
pub const LEDGER_TABLE: &str = "provisioning_ledger";

#[derive(Debug, Clone)]
pub enum Record {
    Scenario(Scenario),
    Control(Control),
    Mapping(IdempotencyMapping),
}

impl Record {
    /// Logical table this record belongs to.
    pub fn table(&self) -> &'static str {
        match self {
            Record::Scenario(_) => SCENARIOS_TABLE,
            Record::Control(_) => CONTROLS_TABLE,
            Record::Mapping(_) => LEDGER_TABLE,
        }
    }

    /// Primary key. Ledger rows are keyed by the materialized entity they
    /// point at (each entity appears in at most one mapping).
    pub fn entity_id(&self) -> EntityId {
        match self {
            Record::Scenario(s) => s.id,
            Record::Control(c) => c.id,
            Record::Mapping(m) => m.entity_id,
        }
    }

    /// Every stored record kind is versioned, including the catalog-adjacent
    /// ledger rows. Kept as an explicit predicate so the interceptor reads
    /// the same as it would with a mixed population.
    pub fn is_versioned(&self) -> bool {
        true
    }

    /// Ledger rows are written once and never changed afterwards.
    pub fn is_append_only(&self) -> bool {
        matches!(self, Record::Mapping(_))
    }

    /// Soft-delete state, for the record kinds that carry one.
    pub fn soft_delete_mut(&mut self) -> Option<&mut SoftDeleteState> {
        match self {
            Record::Scenario(s) => Some(s.soft_delete_mut()),
            Record::Control(c) => Some(c.soft_delete_mut()),
            Record::Mapping(_) => None,
        }
    }

    pub fn is_soft_deleted(&self) -> bool {
        match self {
            Record::Scenario(s) => s.is_deleted(),
            Record::Control(c) => c.is_deleted(),
            Record::Mapping(_) => false,
        }
    }

    /// Flat snapshot of the record's persisted scalar columns.
    ///
    /// Collection/relationship values (JSON arrays and nested objects) are
    /// excluded, matching the "scalar columns only" revision format.
    ///
    /// # Errors
    /// `AuditIntegrity` when the record does not serialize to a keyed map or
    /// the primary key column is missing from it. Both indicate a data-model
    /// defect and must abort the enclosing commit.
    pub fn snapshot_map(&self) -> Result<Snapshot> {
        let value = match self {
            Record::Scenario(s) => serde_json::to_value(s),
            Record::Control(c) => serde_json::to_value(c),
            Record::Mapping(m) => serde_json::to_value(m),
        }
        .map_err(|e| {
            RiskError::AuditIntegrity(format!(
                "snapshot serialization failed for {} '{}': {e}",
                self.table(),
                self.entity_id()
            ))
        })?;

        let Value::Object(map) = value else {
            return Err(RiskError::AuditIntegrity(format!(
                "snapshot for {} '{}' is not a keyed map",
                self.table(),
                self.entity_id()
            )));
        };

        let snapshot: Snapshot = map
            .into_iter()
            .filter(|(_, v)| !matches!(v, Value::Array(_) | Value::Object(_)))
            .collect();

        let key_column = match self {
            Record::Mapping(_) => "entity_id",
            _ => "id",
        };
        if !snapshot.contains_key(key_column) {
            return Err(RiskError::AuditIntegrity(format!(
                "snapshot for {} '{}' lost its primary key column",
                self.table(),
                self.entity_id()
            )));
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CustomerId, TemplateId};
    use crate::model::{ControlTemplate, ScenarioTemplate};
    use chrono::Utc;

    fn scenario() -> Scenario {
        Scenario::materialize(
            CustomerId::new(),
            &ScenarioTemplate {
                id: TemplateId::new(),
                name: "Insider data theft".into(),
                annual_frequency: 0.7,
                impact_pct: 0.03,
                tags: vec!["insider".into(), "data".into()],
            },
        )
    }

    #[test]
    fn test_snapshot_is_flat_and_keeps_primary_key() {
        let record = Record::Scenario(scenario());
        let snapshot = record.snapshot_map().unwrap();

        assert!(snapshot.contains_key("id"));
        assert!(snapshot.contains_key("annual_frequency"));
        assert!(snapshot.contains_key("is_deleted"));
        // Tag links are relationship values, not scalar columns.
        assert!(!snapshot.contains_key("tags"));
        assert!(snapshot.values().all(|v| !v.is_array() && !v.is_object()));
    }

    #[test]
    fn test_mapping_record_identity() {
        let entity = EntityId::new();
        let mut record = Record::Mapping(IdempotencyMapping::new(
            CustomerId::new(),
            TemplateId::new(),
            entity,
            Utc::now(),
        ));
        assert_eq!(record.table(), LEDGER_TABLE);
        assert_eq!(record.entity_id(), entity);
        assert!(record.soft_delete_mut().is_none());
    }

    #[test]
    fn test_control_snapshot_includes_operational_columns() {
        let record = Record::Control(Control::materialize(
            CustomerId::new(),
            EntityId::new(),
            &ControlTemplate {
                id: TemplateId::new(),
                name: "MFA everywhere".into(),
                cost: 10_000.0,
                effort: 2.0,
                tags: vec![],
            },
        ));
        let snapshot = record.snapshot_map().unwrap();
        for column in ["implemented", "coverage", "maturity", "status", "cost"] {
            assert!(snapshot.contains_key(column), "missing column {column}");
        }
    }
}
