//! Ledger core services
//!
//! Each service is built from an `Arc<dyn LedgerStore>` and takes the acting
//! user explicitly on every mutating call. Authorization is checked first,
//! then validation, and only then is anything written.

pub mod alert;
pub mod catalog;
pub mod inventory;
pub mod location;
pub mod movement;
pub mod partner;
pub mod pricing;
pub mod reconciliation;
pub mod reversal;

pub use alert::AlertService;
pub use catalog::CatalogService;
pub use inventory::InventoryService;
pub use location::LocationService;
pub use movement::MovementService;
pub use partner::PartnerService;
pub use pricing::PricingService;
pub use reconciliation::ReconciliationService;
pub use reversal::ReversalService;
