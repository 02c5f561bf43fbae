// ============================================================================
// Audit Interceptor
// ============================================================================
//
// Runs inside the gateway's commit path, over the full pending-change set of
// one unit of work. Two policies, applied per change:
//
//   1. Soft-delete conversion: a Delete of a soft-deletable record becomes
//      an Update that sets the deletion stamp. The row is never physically
//      removed.
//   2. Revision recording: every versioned record gets one revision with an
//      action tag and a flat snapshot of its scalar columns.
//
// Both happen before any change is applied, so a failing snapshot aborts the
// whole commit and neither rows nor revisions become visible.
//
// ============================================================================

use chrono::{DateTime, Utc};
use tracing::debug;

use super::change::PendingChange;
use crate::core::{Result, RiskError};
use crate::model::revision::{Revision, RevisionAction, Snapshot};

/// Outcome of the interceptor pass: the (possibly rewritten) changes to
/// apply, plus the revisions to append alongside them.
#[derive(Debug)]
pub struct InterceptedCommit {
    pub changes: Vec<PendingChange>,
    pub revisions: Vec<Revision>,
}

pub struct AuditInterceptor;

impl AuditInterceptor {
    /// Process one unit of work's pending changes.
    ///
    /// `now` and `actor` are sampled once per commit so every stamp in the
    /// transaction agrees.
    ///
    /// # Errors
    /// `AuditIntegrity` when a snapshot cannot be built, or when an update
    /// or hard delete is staged against an append-only record kind. Any of
    /// these aborts the whole commit.
    pub fn before_commit(
        changes: Vec<PendingChange>,
        now: DateTime<Utc>,
        actor: Option<&str>,
    ) -> Result<InterceptedCommit> {
        let mut rewritten = Vec::with_capacity(changes.len());
        let mut revisions = Vec::with_capacity(changes.len());

        for change in changes {
            let (change, action, snapshot) = Self::intercept_one(change, now, actor)?;

            if let Some((action, snapshot)) = action.zip(snapshot) {
                revisions.push(Revision {
                    table: change.table(),
                    entity_id: change.entity_id(),
                    action,
                    actor: actor.map(str::to_owned),
                    snapshot,
                    recorded_at: now,
                });
            }
            rewritten.push(change);
        }

        Ok(InterceptedCommit {
            changes: rewritten,
            revisions,
        })
    }

    fn intercept_one(
        change: PendingChange,
        now: DateTime<Utc>,
        actor: Option<&str>,
    ) -> Result<(PendingChange, Option<RevisionAction>, Option<Snapshot>)> {
        match change {
            PendingChange::Insert(record) => {
                let snapshot = record.is_versioned().then(|| record.snapshot_map()).transpose()?;
                let action = snapshot.is_some().then_some(RevisionAction::Create);
                Ok((PendingChange::Insert(record), action, snapshot))
            }

            PendingChange::Update { before, after } => {
                if after.is_append_only() {
                    return Err(RiskError::AuditIntegrity(format!(
                        "update staged against immutable {} '{}'",
                        after.table(),
                        after.entity_id()
                    )));
                }
                // Post-change values for updates.
                let snapshot = after.is_versioned().then(|| after.snapshot_map()).transpose()?;
                let action = snapshot.is_some().then_some(RevisionAction::Update);
                Ok((PendingChange::Update { before, after }, action, snapshot))
            }

            PendingChange::Delete { before } => {
                // Pre-change values for deletes; the primary key is always
                // present in our records, so the "take the key from whichever
                // side is non-null" rule reduces to the before-image key.
                let snapshot = before.is_versioned().then(|| before.snapshot_map()).transpose()?;
                let action = snapshot.is_some().then_some(RevisionAction::Delete);

                let mut after = before.clone();
                let Some(state) = after.soft_delete_mut() else {
                    return Err(RiskError::AuditIntegrity(format!(
                        "hard delete staged against immutable {} '{}'",
                        before.table(),
                        before.entity_id()
                    )));
                };
                state.mark_deleted(now, actor.map(str::to_owned));

                debug!(
                    table = before.table(),
                    entity = %before.entity_id(),
                    "rewrote delete to soft-delete update"
                );
                Ok((PendingChange::Update { before, after }, action, snapshot))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CustomerId, EntityId, TemplateId};
    use crate::model::{Control, ControlTemplate, Scenario, ScenarioTemplate};
    use crate::provision::ledger::IdempotencyMapping;
    use crate::store::record::Record;
    use serde_json::Value;

    fn scenario() -> Scenario {
        Scenario::materialize(
            CustomerId::new(),
            &ScenarioTemplate {
                id: TemplateId::new(),
                name: "Supplier outage".into(),
                annual_frequency: 1.5,
                impact_pct: 0.04,
                tags: vec![],
            },
        )
    }

    fn control() -> Control {
        Control::materialize(
            CustomerId::new(),
            EntityId::new(),
            &ControlTemplate {
                id: TemplateId::new(),
                name: "Dual sourcing".into(),
                cost: 40_000.0,
                effort: 5.0,
                tags: vec![],
            },
        )
    }

    #[test]
    fn test_insert_yields_create_revision() {
        let record = Record::Scenario(scenario());
        let id = record.entity_id();

        let out = AuditInterceptor::before_commit(
            vec![PendingChange::Insert(record)],
            Utc::now(),
            Some("alice"),
        )
        .unwrap();

        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.revisions.len(), 1);
        let revision = &out.revisions[0];
        assert_eq!(revision.action, RevisionAction::Create);
        assert_eq!(revision.entity_id, id);
        assert_eq!(revision.actor.as_deref(), Some("alice"));
    }

    #[test]
    fn test_delete_rewritten_to_soft_delete_update() {
        let record = Record::Control(control());
        let now = Utc::now();

        let out = AuditInterceptor::before_commit(
            vec![PendingChange::Delete { before: record }],
            now,
            Some("bob"),
        )
        .unwrap();

        // The change applied to the store is an update carrying the stamp.
        let PendingChange::Update { after, .. } = &out.changes[0] else {
            panic!("delete not rewritten to update");
        };
        assert!(after.is_soft_deleted());

        // The revision still says Delete, and snapshots pre-change values.
        let revision = &out.revisions[0];
        assert_eq!(revision.action, RevisionAction::Delete);
        assert_eq!(revision.field("is_deleted"), Some(&Value::Bool(false)));
        assert_eq!(revision.actor.as_deref(), Some("bob"));
        assert_eq!(revision.recorded_at, now);
    }

    #[test]
    fn test_delete_without_actor_stamps_none() {
        let record = Record::Scenario(scenario());
        let out = AuditInterceptor::before_commit(
            vec![PendingChange::Delete { before: record }],
            Utc::now(),
            None,
        )
        .unwrap();

        let PendingChange::Update { after, .. } = &out.changes[0] else {
            panic!("delete not rewritten to update");
        };
        let Record::Scenario(s) = after else { panic!() };
        assert!(s.soft_delete.is_deleted);
        assert!(s.soft_delete.deleted_at.is_some());
        assert!(s.soft_delete.deleted_by.is_none());
    }

    #[test]
    fn test_update_snapshots_post_change_values() {
        let before = scenario();
        let mut after = before.clone();
        after.annual_frequency = 9.0;

        let out = AuditInterceptor::before_commit(
            vec![PendingChange::Update {
                before: Record::Scenario(before),
                after: Record::Scenario(after),
            }],
            Utc::now(),
            None,
        )
        .unwrap();

        let revision = &out.revisions[0];
        assert_eq!(revision.action, RevisionAction::Update);
        assert_eq!(
            revision.field("annual_frequency").and_then(Value::as_f64),
            Some(9.0)
        );
    }

    #[test]
    fn test_hard_delete_of_ledger_row_is_fatal() {
        let mapping = IdempotencyMapping::new(
            CustomerId::new(),
            TemplateId::new(),
            EntityId::new(),
            Utc::now(),
        );
        let err = AuditInterceptor::before_commit(
            vec![PendingChange::Delete {
                before: Record::Mapping(mapping),
            }],
            Utc::now(),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, RiskError::AuditIntegrity(_)));
    }

    #[test]
    fn test_update_of_ledger_row_is_fatal() {
        let mapping = IdempotencyMapping::new(
            CustomerId::new(),
            TemplateId::new(),
            EntityId::new(),
            Utc::now(),
        );
        let mut repointed = mapping.clone();
        repointed.entity_id = EntityId::new();

        let err = AuditInterceptor::before_commit(
            vec![PendingChange::Update {
                before: Record::Mapping(mapping),
                after: Record::Mapping(repointed),
            }],
            Utc::now(),
            None,
        )
        .unwrap_err();

        assert!(matches!(err, RiskError::AuditIntegrity(_)));
    }

    #[test]
    fn test_batch_shares_one_timestamp() {
        let now = Utc::now();
        let out = AuditInterceptor::before_commit(
            vec![
                PendingChange::Insert(Record::Scenario(scenario())),
                PendingChange::Insert(Record::Control(control())),
            ],
            now,
            Some("carol"),
        )
        .unwrap();

        assert_eq!(out.revisions.len(), 2);
        assert!(out.revisions.iter().all(|r| r.recorded_at == now));
    }
}
