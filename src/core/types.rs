// ============================================================================
// Shared Identifier Types and Environment Seams
// ============================================================================
//
// Newtype identifiers keep the three id spaces (customer, template,
// materialized entity) from being mixed up at compile time. Clock and
// ActorContext are the two ambient inputs the core consumes; both are
// injected so tests can pin time and identity.
//
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Result, RiskError};

macro_rules! id_newtype {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse from a caller-supplied string.
            ///
            /// # Errors
            /// Returns `InvalidArgument` on an empty or malformed id.
            pub fn parse(raw: &str) -> Result<Self> {
                if raw.trim().is_empty() {
                    return Err(RiskError::InvalidArgument(format!(
                        "{} id must not be empty",
                        $prefix
                    )));
                }
                Uuid::parse_str(raw).map(Self).map_err(|e| {
                    RiskError::InvalidArgument(format!("malformed {} id '{raw}': {e}", $prefix))
                })
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }
    };
}

id_newtype!(CustomerId, "customer");
id_newtype!(TemplateId, "template");
id_newtype!(EntityId, "entity");

/// Source of the current UTC instant.
///
/// Provisioning timestamps, soft-delete stamps, and revision stamps all come
/// from here so a single transaction observes a single "now".
pub trait Clock: Send + Sync {
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Wall clock. The production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock pinned to a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn utc_now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Identity of the acting user, when one exists.
///
/// Background/seed work runs without an actor; revisions and soft-delete
/// stamps record `None` in that case rather than inventing a system user.
pub trait ActorContext: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

/// No acting user (batch/seed context).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoActor;

impl ActorContext for NoActor {
    fn current_user(&self) -> Option<String> {
        None
    }
}

/// A fixed acting user, for request-scoped contexts and tests.
#[derive(Debug, Clone)]
pub struct FixedActor(pub String);

impl ActorContext for FixedActor {
    fn current_user(&self) -> Option<String> {
        Some(self.0.clone())
    }
}
