use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Audit integrity failure: {0}")]
    AuditIntegrity(String),

    #[error("Execution error: {0}")]
    Execution(String),
}

impl RiskError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Check whether this is the gateway's unique-constraint signal.
    ///
    /// The provisioning engine uses this to distinguish the benign
    /// "lost the materialization race" case from every other failure.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, RiskError::UniqueViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
