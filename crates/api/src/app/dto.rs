use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use stockbook_catalog::ItemWithStock;
use stockbook_core::{CategoryId, ItemId, RecordId};
use stockbook_ledger::PostStock;
use stockbook_store::{CategoryRow, RecordKind, RecordView};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    pub category_name: String,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRecordRequest {
    pub item_id: ItemId,
    pub transaction_type: RecordKind,
    pub quantity: i64,
    pub price: Option<i64>,
    pub expiration_date: Option<NaiveDate>,
    pub source_record_id: Option<RecordId>,
}

impl ItemRecordRequest {
    pub fn into_post_stock(self) -> PostStock {
        PostStock {
            item_id: self.item_id,
            kind: self.transaction_type,
            quantity: self.quantity,
            price: self.price,
            expiration_date: self.expiration_date,
            source_record_id: self.source_record_id,
        }
    }
}

// -------------------------
// Query DTOs
// -------------------------

/// The one camelCase query key, kept for wire compatibility.
#[derive(Debug, Deserialize)]
pub struct CategoryItemsQuery {
    #[serde(rename = "categoryId")]
    pub category_id: CategoryId,
}

#[derive(Debug, Deserialize)]
pub struct CategoryKeyQuery {
    pub category_id: CategoryId,
}

#[derive(Debug, Deserialize)]
pub struct ItemListQuery {
    pub category_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemKeyQuery {
    pub item_id: ItemId,
}

#[derive(Debug, Deserialize)]
pub struct RecordKeyQuery {
    pub record_id: RecordId,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn category_to_json(row: &CategoryRow) -> serde_json::Value {
    json!({
        "id": row.id.to_string(),
        "name": row.name,
        "updated_at": row.updated_at,
    })
}

pub fn item_to_json(entry: &ItemWithStock) -> serde_json::Value {
    json!({
        "id": entry.item.id.to_string(),
        "name": entry.item.name,
        "category_id": entry.item.category_id.to_string(),
        "quantity": entry.net_quantity,
        "updated_at": entry.item.updated_at,
    })
}

pub fn record_to_json(view: &RecordView) -> serde_json::Value {
    json!({
        "id": view.record.id.to_string(),
        "item_name": view.item_name,
        "category_name": view.category_name,
        "quantity": view.record.quantity,
        "price": view.record.price,
        "transaction_type": view.record.kind.as_str(),
        "expiration_date": view.record.expiration_date,
        "created_at": view.record.created_at,
    })
}
