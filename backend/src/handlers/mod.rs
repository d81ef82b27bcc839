//! HTTP handlers
//!
//! Handlers only extract, call one service method and serialize.

pub mod alert;
pub mod catalog;
pub mod health;
pub mod inventory;
pub mod location;
pub mod movement;
pub mod partner;
pub mod reconciliation;

pub use alert::*;
pub use catalog::*;
pub use health::*;
pub use inventory::*;
pub use location::*;
pub use movement::*;
pub use partner::*;
pub use reconciliation::*;
