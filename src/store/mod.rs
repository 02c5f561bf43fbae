pub mod change;
pub mod gateway;
pub mod interceptor;
pub mod memory;
pub mod record;
pub mod unit_of_work;

pub use change::PendingChange;
pub use gateway::PersistenceGateway;
pub use interceptor::{AuditInterceptor, InterceptedCommit};
pub use memory::InMemoryGateway;
pub use record::{CONTROLS_TABLE, LEDGER_TABLE, Record, SCENARIOS_TABLE};
pub use unit_of_work::{UnitOfWork, UowId, UowState};
