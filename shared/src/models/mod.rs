//! Domain models for the consignment ledger

mod alert;
mod catalog;
mod inventory;
mod location;
mod movement;
mod partner;
mod reconciliation;
mod user;

pub use alert::*;
pub use catalog::*;
pub use inventory::*;
pub use location::*;
pub use movement::*;
pub use partner::*;
pub use reconciliation::*;
pub use user::*;
