//! Inventory domain
//!
//! Item CRUD plus rate-limited restocking with an append-only ledger.

pub mod items;
pub mod restock;

pub use items::{ItemService, DEFAULT_LOW_STOCK_THRESHOLD};
pub use restock::{RestockGovernor, RestockOutcome, RestockPolicy, MAX_RESTOCK_WINDOW_SECONDS};
