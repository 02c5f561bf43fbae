pub mod entity;
pub mod revision;
pub mod soft_delete;
pub mod template;

pub use entity::{Control, ControlStatus, Customer, Scenario};
pub use revision::{Revision, RevisionAction, Snapshot};
pub use soft_delete::{SoftDeletable, SoftDeleteState};
pub use template::{ControlTemplate, ScenarioTemplate, Template, TemplateCatalog};
