#![warn(missing_docs)]

//! Filament inventory ledger for printshop.
//!
//! This crate provides:
//! - Spool records and the exact (name, material, color) identity match
//! - The [`Inventory`] ledger: add, edit, delete, deduct, restore
//! - A wholesale-rewrite JSON record store for the persisted collections
//! - Startup zip backups of the data directory
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use printshop_ledger::{Inventory, JsonFileStore, Spool};
//!
//! let store = Arc::new(JsonFileStore::open("data")?);
//! let mut inventory = Inventory::open(store);
//!
//! let id = inventory.add_spool(Spool::new("Bambu Basic", "PLA", "Black", 1000.0, 19.99))?;
//! if inventory.would_go_negative(&id, 1200.0)? {
//!     // ask the operator first
//! }
//! inventory.deduct(&id, 1200.0)?;
//! ```

pub mod backup;
pub mod error;
pub mod inventory;
pub mod spool;
pub mod store;

pub use backup::{auto_backup, create_backup};
pub use error::{LedgerError, Result};
pub use inventory::{Inventory, InventorySummary};
pub use spool::{Spool, SpoolId, SpoolIdentity};
pub use store::{
    load_collection, save_collection, Collection, JsonFileStore, MemoryStore, RecordStore,
};
