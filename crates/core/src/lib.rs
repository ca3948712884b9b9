//! `stockbook-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod message;
pub mod name;
pub mod tenancy;

pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, ItemId, RecordId};
pub use name::{EntityName, MAX_NAME_LEN, NameError};
pub use tenancy::{OwnerId, TenancyResolver, VisibilityScope};
