pub mod error;
pub mod types;

pub use error::{Result, RiskError};
pub use types::{
    ActorContext, Clock, CustomerId, EntityId, FixedActor, FixedClock, NoActor, SystemClock,
    TemplateId,
};
