//! Posting and reading the stock ledger.
//!
//! Stock moves are owner-private: posting resolves the target item against
//! the caller's own scope only, never the shared defaults. Reads widen to
//! the visible scope for item resolution but still return only the
//! caller's entries.
//!
//! All structural validation happens here, before the store is touched.
//! The store is left with exactly the checks that have to be atomic with
//! the write.

use std::cmp::Reverse;
use std::slice;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockbook_core::{
    message, DomainError, DomainResult, ItemId, OwnerId, RecordId, TenancyResolver,
};
use stockbook_store::{
    ItemRepo, ItemRow, RecordKind, RecordRepo, RecordRow, RecordView, StockIssue, StockReceipt,
};

/// Command: post one ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostStock {
    pub item_id: ItemId,
    pub kind: RecordKind,
    pub quantity: i64,
    pub price: Option<i64>,
    pub expiration_date: Option<NaiveDate>,
    pub source_record_id: Option<RecordId>,
}

/// A freshly posted entry together with the item it moved stock for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostedStock {
    pub record: RecordRow,
    pub item: ItemRow,
}

fn validate(request: &PostStock) -> DomainResult<()> {
    match request.kind {
        RecordKind::In => {
            if request.quantity < 0 {
                return Err(DomainError::validation(message::QUANTITY_NEGATIVE));
            }
            if request.price.is_some_and(|p| p < 0) {
                return Err(DomainError::validation(message::PRICE_NEGATIVE));
            }
            if request.source_record_id.is_some() {
                return Err(DomainError::validation(message::SOURCE_RECORD_FORBIDDEN));
            }
        }
        RecordKind::Out => {
            if request.quantity <= 0 {
                return Err(DomainError::validation(message::OUT_QUANTITY_NOT_POSITIVE));
            }
            if request.source_record_id.is_none() {
                return Err(DomainError::validation(message::SOURCE_RECORD_REQUIRED));
            }
            if request.price.is_some() {
                return Err(DomainError::validation(message::PRICE_FORBIDDEN_ON_OUT));
            }
            if request.expiration_date.is_some() {
                return Err(DomainError::validation(message::EXPIRATION_FORBIDDEN_ON_OUT));
            }
        }
    }
    Ok(())
}

pub struct LedgerService<S> {
    store: S,
    tenancy: TenancyResolver,
}

impl<S> LedgerService<S>
where
    S: ItemRepo + RecordRepo,
{
    pub fn new(store: S, tenancy: TenancyResolver) -> Self {
        Self { store, tenancy }
    }

    /// Posts an entry. Inbound entries persist directly (zero quantity is a
    /// legal bookkeeping placeholder, price defaults to zero); outbound
    /// entries run the atomic source check inside the store.
    pub async fn post(&self, caller: &OwnerId, request: PostStock) -> DomainResult<PostedStock> {
        validate(&request)?;
        let item = ItemRepo::find_by_id(&self.store, slice::from_ref(caller), request.item_id)
            .await?
            .ok_or_else(|| DomainError::not_found(message::ITEM_NOT_FOUND))?;

        let record = match request.kind {
            RecordKind::In => {
                self.store
                    .append_in(StockReceipt {
                        owner: caller.clone(),
                        item_id: item.id,
                        quantity: request.quantity,
                        price: request.price.unwrap_or(0),
                        expiration_date: request.expiration_date,
                    })
                    .await?
            }
            RecordKind::Out => {
                let Some(source_record_id) = request.source_record_id else {
                    return Err(DomainError::validation(message::SOURCE_RECORD_REQUIRED));
                };
                self.store
                    .append_out(StockIssue {
                        owner: caller.clone(),
                        item_id: item.id,
                        quantity: request.quantity,
                        source_record_id,
                    })
                    .await?
            }
        };
        Ok(PostedStock { record, item })
    }

    /// One of the caller's entries, with its display names.
    pub async fn record(&self, caller: &OwnerId, id: RecordId) -> DomainResult<RecordView> {
        RecordRepo::find_by_id(&self.store, caller, id)
            .await?
            .ok_or_else(|| DomainError::not_found(message::RECORD_NOT_FOUND))
    }

    /// The caller's entries against one visible item, newest first. An
    /// item with no entries yields an empty sequence, not an error.
    pub async fn records_for_item(
        &self,
        caller: &OwnerId,
        item_id: ItemId,
    ) -> DomainResult<Vec<RecordView>> {
        let scope = self.tenancy.scope(caller.clone());
        let visible = ItemRepo::find_by_id(&self.store, scope.owners(), item_id)
            .await?
            .is_some();
        if !visible {
            return Err(DomainError::not_found(message::ITEM_NOT_FOUND));
        }
        let mut views = self.store.records_for_item(caller, item_id).await?;
        views.sort_by_key(|v| Reverse((v.record.created_at, v.record.seq)));
        Ok(views)
    }

    /// Everything the caller ever posted, newest first.
    pub async fn history(&self, caller: &OwnerId) -> DomainResult<Vec<RecordView>> {
        let mut views = self.store.history(caller).await?;
        views.sort_by_key(|v| Reverse((v.record.created_at, v.record.seq)));
        Ok(views)
    }

    /// Retracts an entry, cascading from an inbound entry to its children.
    /// Returns every removed id, the requested one first.
    pub async fn delete(&self, caller: &OwnerId, id: RecordId) -> DomainResult<Vec<RecordId>> {
        RecordRepo::delete(&self.store, caller, id).await
    }
}
