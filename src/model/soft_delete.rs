use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical-deletion state embedded in every soft-deletable entity.
///
/// Once `is_deleted` flips to true, `deleted_at` and `deleted_by` are set
/// together and stay set; only an explicit restore clears them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftDeleteState {
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl SoftDeleteState {
    /// Fresh, live state.
    pub fn live() -> Self {
        Self::default()
    }

    /// Mark deleted with the transaction's stamp.
    pub fn mark_deleted(&mut self, at: DateTime<Utc>, by: Option<String>) {
        self.is_deleted = true;
        self.deleted_at = Some(at);
        self.deleted_by = by;
    }

    /// Intentional restore: clears the deletion stamp entirely.
    pub fn restore(&mut self) {
        self.is_deleted = false;
        self.deleted_at = None;
        self.deleted_by = None;
    }
}

/// Accessor trait for entities that carry a [`SoftDeleteState`].
pub trait SoftDeletable {
    fn soft_delete(&self) -> &SoftDeleteState;
    fn soft_delete_mut(&mut self) -> &mut SoftDeleteState;

    fn is_deleted(&self) -> bool {
        self.soft_delete().is_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_restore() {
        let mut state = SoftDeleteState::live();
        assert!(!state.is_deleted);

        let now = Utc::now();
        state.mark_deleted(now, Some("auditor".into()));
        assert!(state.is_deleted);
        assert_eq!(state.deleted_at, Some(now));
        assert_eq!(state.deleted_by.as_deref(), Some("auditor"));

        state.restore();
        assert_eq!(state, SoftDeleteState::live());
    }

    #[test]
    fn test_mark_without_actor() {
        let mut state = SoftDeleteState::live();
        state.mark_deleted(Utc::now(), None);
        assert!(state.is_deleted);
        assert!(state.deleted_at.is_some());
        assert!(state.deleted_by.is_none());
    }
}
