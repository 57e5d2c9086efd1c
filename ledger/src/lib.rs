//! Tamper-evident decision ledger.
//!
//! Every decision is appended as a [`LedgerEntry`] whose SHA-256 hash covers
//! all of its fields and whose `previous_hash` links it to the entry appended
//! immediately before it. Entries are never mutated or deleted; tampering is
//! detected by recomputing hashes and walking the links.
//!
//! # Key Components
//!
//! - [`Ledger`]: append (`log`), `query`, `get_chain`, `verify`, `export`
//! - [`LedgerStore`]: durable keyed storage ([`MemoryStore`], [`SledStore`])
//! - [`DecisionLogger`]: the logging callback consumers depend on
//!
//! # Example
//!
//! ```ignore
//! use ledger::{Ledger, NewEntry, Outcome, QueryFilter};
//!
//! let ledger = Ledger::in_memory().await?;
//! let first = ledger
//!     .log(NewEntry::new("reviewer", "Approve release", "All checks green", Outcome::Success))
//!     .await?;
//! let entries = ledger.query(&QueryFilter::default()).await?;
//! assert!(ledger.verify().await?.valid);
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod hash;
pub mod ledger;
pub mod store;
pub mod types;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use export::{export, parse_json_export, ExportFormat};
pub use ledger::{DecisionLogger, Ledger};
pub use store::{LedgerStore, MemoryStore, SledStore, StorageError};
pub use types::*;
