// ============================================================================
// Unit of Work
// ============================================================================
//
// State Pattern over the transactional lifecycle:
// Active -> Committed / Aborted. Staged changes accumulate while active and
// become visible only when the gateway commits the whole unit atomically.
//
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use super::change::PendingChange;
use crate::core::{Result, RiskError};

/// Global unit-of-work id counter.
static NEXT_UOW_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UowId(pub u64);

impl UowId {
    pub fn new() -> Self {
        UowId(NEXT_UOW_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for UowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "uow_{}", self.0)
    }
}

/// Lifecycle state of a unit of work.
///
/// ```text
/// Active ──commit──> Committed
///   │
///   └──abort──> Aborted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UowState {
    Active,
    Committed,
    Aborted,
}

impl UowState {
    pub fn is_active(&self) -> bool {
        matches!(self, UowState::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UowState::Committed | UowState::Aborted)
    }
}

impl std::fmt::Display for UowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UowState::Active => write!(f, "ACTIVE"),
            UowState::Committed => write!(f, "COMMITTED"),
            UowState::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// A transaction-shaped batch of staged changes.
///
/// # Thread safety
/// A unit of work belongs to a single caller; the gateway synchronizes
/// across units at commit time.
#[derive(Debug)]
pub struct UnitOfWork {
    id: UowId,
    state: UowState,
    changes: Vec<PendingChange>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self {
            id: UowId::new(),
            state: UowState::Active,
            changes: Vec::new(),
        }
    }

    pub fn id(&self) -> UowId {
        self.id
    }

    pub fn state(&self) -> UowState {
        self.state
    }

    pub fn changes(&self) -> &[PendingChange] {
        &self.changes
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Stage a change.
    ///
    /// # Errors
    /// Returns an error if the unit is no longer active.
    pub fn stage(&mut self, change: PendingChange) -> Result<()> {
        if !self.state.is_active() {
            return Err(RiskError::Execution(format!(
                "Cannot stage change: {} is {}",
                self.id, self.state
            )));
        }
        self.changes.push(change);
        Ok(())
    }

    /// Mark the unit committed.
    ///
    /// Called by the gateway only, after the interceptor pass succeeded and
    /// the changes were applied.
    pub(crate) fn commit(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(RiskError::Execution(format!(
                "Cannot commit: {} is already {}",
                self.id, self.state
            )));
        }
        self.state = UowState::Committed;
        Ok(())
    }

    /// Discard all staged changes and mark the unit aborted.
    pub fn abort(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(RiskError::Execution(format!(
                "Cannot abort: {} is already {}",
                self.id, self.state
            )));
        }
        self.changes.clear();
        self.state = UowState::Aborted;
        Ok(())
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}
