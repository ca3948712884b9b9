//! stockbook-store — storage backends for the inventory ledger.
//!
//! Two interchangeable backends sit behind the repository traits in
//! [`repo`]: [`memory::InMemoryStore`] for tests and single-process use,
//! and [`postgres::PostgresStore`] for durable deployments. Both promise
//! the same thing where it matters: compound mutations (capacity and
//! uniqueness checks, outbound stock issue) run atomically, so concurrent
//! callers cannot slip a write between a check and its insert.

pub mod memory;
pub mod postgres;
pub mod repo;
pub mod row;
pub mod seed;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use repo::{CategoryRepo, ItemRepo, RecordRepo};
pub use row::{
    CategoryCreated, CategoryRow, ItemRow, RecordKind, RecordRow, RecordView, StockIssue,
    StockReceipt, MAX_ACTIVE_CATEGORIES,
};
pub use seed::{seed_default_categories, DEFAULT_CATEGORY_NAMES};
