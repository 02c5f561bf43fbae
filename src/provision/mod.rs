pub mod engine;
pub mod ledger;

pub use engine::ProvisioningEngine;
pub use ledger::{IdempotencyMapping, LEDGER_UNIQUE_CONSTRAINT};
