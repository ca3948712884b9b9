//! Storage rows shared by every backend.
//!
//! Rows carry raw persisted state. Name validation happens at the service
//! edge, so `name` fields here are plain strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stockbook_core::{CategoryId, EntityName, ItemId, OwnerId, RecordId};

/// Upper bound on active categories per owner.
pub const MAX_ACTIVE_CATEGORIES: usize = 50;

/// A category as persisted. Soft deletion keeps the row around so the same
/// owner can later resurrect it under the same name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: CategoryId,
    pub owner: OwnerId,
    pub name: String,
    pub deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl CategoryRow {
    pub fn new(owner: OwnerId, name: &EntityName) -> Self {
        Self {
            id: CategoryId::new(),
            owner,
            name: name.as_str().to_owned(),
            deleted: false,
            updated_at: Utc::now(),
        }
    }
}

/// An item as persisted. Items are soft-deleted too, but never resurrected:
/// re-registering a name after deletion creates a fresh row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: ItemId,
    pub owner: OwnerId,
    pub category_id: CategoryId,
    pub name: String,
    pub deleted: bool,
    pub updated_at: DateTime<Utc>,
}

impl ItemRow {
    pub fn new(owner: OwnerId, category_id: CategoryId, name: &EntityName) -> Self {
        Self {
            id: ItemId::new(),
            owner,
            category_id,
            name: name.as_str().to_owned(),
            deleted: false,
            updated_at: Utc::now(),
        }
    }
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    In,
    Out,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::In => "IN",
            RecordKind::Out => "OUT",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable ledger entry. Entries are never updated in place; physical
/// deletion of an inbound entry cascades to its outbound children.
///
/// `seq` is assigned at persist time and strictly increases per store. It
/// breaks ties between entries that share a `created_at` timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    pub id: RecordId,
    pub owner: OwnerId,
    pub item_id: ItemId,
    pub kind: RecordKind,
    pub quantity: i64,
    /// Unit price. Present on inbound entries only.
    pub price: Option<i64>,
    /// Expiry of the received lot. Present on inbound entries only.
    pub expiration_date: Option<NaiveDate>,
    /// The inbound entry this outbound entry draws from. `None` for inbound.
    pub source_record_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub seq: i64,
}

/// A ledger entry joined with the names needed to present it. Lookups go
/// through the deleted flag so history keeps rendering after an item or
/// category is retired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    pub record: RecordRow,
    pub item_name: String,
    pub category_name: String,
}

/// Request to append an inbound entry. Validated quantities and prices are
/// the caller's responsibility; the store only guards ledger consistency.
#[derive(Debug, Clone)]
pub struct StockReceipt {
    pub owner: OwnerId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub price: i64,
    pub expiration_date: Option<NaiveDate>,
}

/// Request to append an outbound entry drawing on an inbound source.
#[derive(Debug, Clone)]
pub struct StockIssue {
    pub owner: OwnerId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub source_record_id: RecordId,
}

/// Outcome of a category registration: either a brand new row or a
/// previously deleted one brought back under its old identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCreated {
    pub row: CategoryRow,
    pub resurrected: bool,
}
