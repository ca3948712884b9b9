//! stockbook-ledger — the append-only stock ledger service.

pub mod service;

pub use service::{LedgerService, PostStock, PostedStock};
