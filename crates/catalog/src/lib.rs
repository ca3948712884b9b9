//! stockbook-catalog — category and item lifecycle services.
//!
//! These services own the visibility and ownership rules; the storage
//! invariants they lean on (uniqueness, capacity, resurrection) are
//! enforced atomically inside `stockbook-store`.

pub mod category;
pub mod item;

pub use category::CategoryService;
pub use item::{ItemService, ItemWithStock};
