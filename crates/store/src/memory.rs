//! In-memory storage backend.
//!
//! A single `RwLock` guards all three tables, so every compound mutation
//! runs its guard checks and its write under one exclusive lock. That is
//! the whole concurrency story: competing outbound postings against the
//! same source, or competing creates against the same owner, serialize on
//! the write lock and the loser sees the winner's state.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stockbook_core::{
    message, CategoryId, DomainError, DomainResult, EntityName, ItemId, OwnerId, RecordId,
};

use crate::repo::{CategoryRepo, ItemRepo, RecordRepo};
use crate::row::{
    CategoryCreated, CategoryRow, ItemRow, RecordKind, RecordRow, RecordView, StockIssue,
    StockReceipt, MAX_ACTIVE_CATEGORIES,
};

/// Hands out `(created_at, seq)` pairs for ledger entries. Wall-clock time
/// can step backwards; the clock clamps to the last issued timestamp so
/// `created_at` never decreases, and `seq` breaks exact ties.
#[derive(Debug)]
struct LedgerClock {
    last: DateTime<Utc>,
    seq: i64,
}

impl Default for LedgerClock {
    fn default() -> Self {
        Self {
            last: DateTime::<Utc>::MIN_UTC,
            seq: 0,
        }
    }
}

impl LedgerClock {
    fn tick(&mut self) -> (DateTime<Utc>, i64) {
        let now = Utc::now().max(self.last);
        self.last = now;
        self.seq += 1;
        (now, self.seq)
    }
}

#[derive(Debug, Default)]
struct Tables {
    categories: HashMap<CategoryId, CategoryRow>,
    items: HashMap<ItemId, ItemRow>,
    records: HashMap<RecordId, RecordRow>,
    clock: LedgerClock,
}

impl Tables {
    fn active_category(&self, owners: &[OwnerId], id: CategoryId) -> Option<&CategoryRow> {
        self.categories
            .get(&id)
            .filter(|c| !c.deleted && owners.contains(&c.owner))
    }

    fn active_item(&self, owners: &[OwnerId], id: ItemId) -> Option<&ItemRow> {
        self.items
            .get(&id)
            .filter(|i| !i.deleted && owners.contains(&i.owner))
    }

    fn owned_record(&self, owner: &OwnerId, id: RecordId) -> Option<&RecordRow> {
        self.records.get(&id).filter(|r| r.owner == *owner)
    }

    fn children_total(&self, source: RecordId) -> i64 {
        self.records
            .values()
            .filter(|r| r.source_record_id == Some(source))
            .map(|r| r.quantity)
            .sum()
    }

    /// Joins a ledger entry with its item and category names, looking
    /// through soft-delete flags so history stays renderable.
    fn view(&self, record: &RecordRow) -> RecordView {
        let item_name = self
            .items
            .get(&record.item_id)
            .map(|i| i.name.clone())
            .unwrap_or_default();
        let category_name = self
            .items
            .get(&record.item_id)
            .and_then(|i| self.categories.get(&i.category_id))
            .map(|c| c.name.clone())
            .unwrap_or_default();
        RecordView {
            record: record.clone(),
            item_name,
            category_name,
        }
    }
}

/// Backend used by default and throughout the test suites.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| DomainError::unavailable("store lock poisoned"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| DomainError::unavailable("store lock poisoned"))
    }
}

#[async_trait]
impl CategoryRepo for InMemoryStore {
    async fn find_by_id(
        &self,
        owners: &[OwnerId],
        id: CategoryId,
    ) -> DomainResult<Option<CategoryRow>> {
        let tables = self.read()?;
        Ok(tables.active_category(owners, id).cloned())
    }

    async fn find_by_owners(&self, owners: &[OwnerId]) -> DomainResult<Vec<CategoryRow>> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .values()
            .filter(|c| !c.deleted && owners.contains(&c.owner))
            .cloned()
            .collect())
    }

    async fn find_by_name(
        &self,
        owners: &[OwnerId],
        name: &str,
    ) -> DomainResult<Option<CategoryRow>> {
        let tables = self.read()?;
        for owner in owners {
            let hit = tables
                .categories
                .values()
                .find(|c| !c.deleted && c.owner == *owner && c.name == name);
            if let Some(row) = hit {
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    async fn exists_by_owner_and_name(&self, owner: &OwnerId, name: &str) -> DomainResult<bool> {
        let tables = self.read()?;
        Ok(tables
            .categories
            .values()
            .any(|c| !c.deleted && c.owner == *owner && c.name == name))
    }

    async fn create(&self, owner: &OwnerId, name: &EntityName) -> DomainResult<CategoryCreated> {
        let mut tables = self.write()?;
        let active = tables
            .categories
            .values()
            .filter(|c| !c.deleted && c.owner == *owner)
            .count();
        if active >= MAX_ACTIVE_CATEGORIES {
            return Err(DomainError::conflict(message::CATEGORY_LIMIT_REACHED));
        }
        if tables
            .categories
            .values()
            .any(|c| !c.deleted && c.owner == *owner && c.name == name.as_str())
        {
            return Err(DomainError::conflict(message::CATEGORY_NAME_TAKEN));
        }
        let grave = tables
            .categories
            .values_mut()
            .find(|c| c.deleted && c.owner == *owner && c.name == name.as_str());
        if let Some(row) = grave {
            row.deleted = false;
            row.updated_at = Utc::now();
            return Ok(CategoryCreated {
                row: row.clone(),
                resurrected: true,
            });
        }
        let row = CategoryRow::new(owner.clone(), name);
        tables.categories.insert(row.id, row.clone());
        Ok(CategoryCreated {
            row,
            resurrected: false,
        })
    }

    async fn rename(
        &self,
        owner: &OwnerId,
        id: CategoryId,
        name: &EntityName,
    ) -> DomainResult<CategoryRow> {
        let mut tables = self.write()?;
        let owned = tables
            .categories
            .get(&id)
            .is_some_and(|c| !c.deleted && c.owner == *owner);
        if !owned {
            return Err(DomainError::not_found(message::CATEGORY_NOT_FOUND));
        }
        if tables
            .categories
            .values()
            .any(|c| !c.deleted && c.owner == *owner && c.id != id && c.name == name.as_str())
        {
            return Err(DomainError::conflict(message::CATEGORY_NAME_TAKEN));
        }
        let row = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(message::CATEGORY_NOT_FOUND))?;
        row.name = name.as_str().to_owned();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, owner: &OwnerId, id: CategoryId) -> DomainResult<()> {
        let mut tables = self.write()?;
        let owned = tables
            .categories
            .get(&id)
            .is_some_and(|c| !c.deleted && c.owner == *owner);
        if !owned {
            return Err(DomainError::not_found(message::CATEGORY_NOT_FOUND));
        }
        if tables
            .items
            .values()
            .any(|i| !i.deleted && i.category_id == id)
        {
            return Err(DomainError::invalid_operation(
                message::CATEGORY_HAS_ACTIVE_ITEMS,
            ));
        }
        let row = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(message::CATEGORY_NOT_FOUND))?;
        row.deleted = true;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn save(&self, row: CategoryRow) -> DomainResult<()> {
        let mut tables = self.write()?;
        tables.categories.insert(row.id, row);
        Ok(())
    }
}

#[async_trait]
impl ItemRepo for InMemoryStore {
    async fn find_by_id(&self, owners: &[OwnerId], id: ItemId) -> DomainResult<Option<ItemRow>> {
        let tables = self.read()?;
        Ok(tables.active_item(owners, id).cloned())
    }

    async fn find_by_category(
        &self,
        owners: &[OwnerId],
        category_id: CategoryId,
    ) -> DomainResult<Vec<ItemRow>> {
        let tables = self.read()?;
        Ok(tables
            .items
            .values()
            .filter(|i| !i.deleted && i.category_id == category_id && owners.contains(&i.owner))
            .cloned()
            .collect())
    }

    async fn exists_by_owner_and_name(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        name: &str,
    ) -> DomainResult<bool> {
        let tables = self.read()?;
        Ok(tables.items.values().any(|i| {
            !i.deleted && i.owner == *owner && i.category_id == category_id && i.name == name
        }))
    }

    async fn create(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        name: &EntityName,
    ) -> DomainResult<ItemRow> {
        let mut tables = self.write()?;
        let category_live = tables
            .categories
            .get(&category_id)
            .is_some_and(|c| !c.deleted);
        if !category_live {
            return Err(DomainError::not_found(message::CATEGORY_NOT_FOUND));
        }
        if tables.items.values().any(|i| {
            !i.deleted
                && i.owner == *owner
                && i.category_id == category_id
                && i.name == name.as_str()
        }) {
            return Err(DomainError::conflict(message::ITEM_NAME_TAKEN));
        }
        let row = ItemRow::new(owner.clone(), category_id, name);
        tables.items.insert(row.id, row.clone());
        Ok(row)
    }

    async fn rename(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        id: ItemId,
        name: &EntityName,
    ) -> DomainResult<ItemRow> {
        let mut tables = self.write()?;
        let owned = tables
            .items
            .get(&id)
            .is_some_and(|i| !i.deleted && i.owner == *owner && i.category_id == category_id);
        if !owned {
            return Err(DomainError::not_found(message::ITEM_NOT_FOUND));
        }
        if tables.items.values().any(|i| {
            !i.deleted
                && i.owner == *owner
                && i.category_id == category_id
                && i.id != id
                && i.name == name.as_str()
        }) {
            return Err(DomainError::conflict(message::ITEM_NAME_TAKEN));
        }
        let row = tables
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(message::ITEM_NOT_FOUND))?;
        row.name = name.as_str().to_owned();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, owner: &OwnerId, id: ItemId) -> DomainResult<()> {
        let mut tables = self.write()?;
        let owned = tables
            .items
            .get(&id)
            .is_some_and(|i| !i.deleted && i.owner == *owner);
        if !owned {
            return Err(DomainError::not_found(message::ITEM_NOT_FOUND));
        }
        let row = tables
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(message::ITEM_NOT_FOUND))?;
        row.deleted = true;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn save(&self, row: ItemRow) -> DomainResult<()> {
        let mut tables = self.write()?;
        tables.items.insert(row.id, row);
        Ok(())
    }
}

#[async_trait]
impl RecordRepo for InMemoryStore {
    async fn find_by_id(
        &self,
        owner: &OwnerId,
        id: RecordId,
    ) -> DomainResult<Option<RecordView>> {
        let tables = self.read()?;
        Ok(tables.owned_record(owner, id).map(|r| tables.view(r)))
    }

    async fn history(&self, owner: &OwnerId) -> DomainResult<Vec<RecordView>> {
        let tables = self.read()?;
        Ok(tables
            .records
            .values()
            .filter(|r| r.owner == *owner)
            .map(|r| tables.view(r))
            .collect())
    }

    async fn records_for_item(
        &self,
        owner: &OwnerId,
        item_id: ItemId,
    ) -> DomainResult<Vec<RecordView>> {
        let tables = self.read()?;
        Ok(tables
            .records
            .values()
            .filter(|r| r.owner == *owner && r.item_id == item_id)
            .map(|r| tables.view(r))
            .collect())
    }

    async fn append_in(&self, receipt: StockReceipt) -> DomainResult<RecordRow> {
        let mut tables = self.write()?;
        let (created_at, seq) = tables.clock.tick();
        let row = RecordRow {
            id: RecordId::new(),
            owner: receipt.owner,
            item_id: receipt.item_id,
            kind: RecordKind::In,
            quantity: receipt.quantity,
            price: Some(receipt.price),
            expiration_date: receipt.expiration_date,
            source_record_id: None,
            created_at,
            seq,
        };
        tables.records.insert(row.id, row.clone());
        Ok(row)
    }

    async fn append_out(&self, issue: StockIssue) -> DomainResult<RecordRow> {
        let mut tables = self.write()?;
        let source = match tables.owned_record(&issue.owner, issue.source_record_id) {
            Some(r) => (r.item_id, r.kind, r.quantity),
            None => return Err(DomainError::not_found(message::RECORD_NOT_FOUND)),
        };
        if source.0 != issue.item_id {
            return Err(DomainError::conflict(message::RECORD_ITEM_MISMATCH));
        }
        // An outbound source has no remaining quantity to draw from.
        if source.1 != RecordKind::In {
            return Err(DomainError::conflict(message::RECORD_NOT_FOUND));
        }
        let remaining = source.2 - tables.children_total(issue.source_record_id);
        if remaining < issue.quantity {
            return Err(DomainError::conflict(message::INSUFFICIENT_STOCK));
        }
        let (created_at, seq) = tables.clock.tick();
        let row = RecordRow {
            id: RecordId::new(),
            owner: issue.owner,
            item_id: issue.item_id,
            kind: RecordKind::Out,
            quantity: issue.quantity,
            price: None,
            expiration_date: None,
            source_record_id: Some(issue.source_record_id),
            created_at,
            seq,
        };
        tables.records.insert(row.id, row.clone());
        Ok(row)
    }

    async fn remaining_quantity(
        &self,
        owner: &OwnerId,
        id: RecordId,
    ) -> DomainResult<Option<i64>> {
        let tables = self.read()?;
        let remaining = tables
            .owned_record(owner, id)
            .filter(|r| r.kind == RecordKind::In)
            .map(|r| r.quantity - tables.children_total(r.id));
        Ok(remaining)
    }

    async fn net_quantity(&self, owner: &OwnerId, item_id: ItemId) -> DomainResult<i64> {
        let tables = self.read()?;
        Ok(tables
            .records
            .values()
            .filter(|r| r.owner == *owner && r.item_id == item_id)
            .map(|r| match r.kind {
                RecordKind::In => r.quantity,
                RecordKind::Out => -r.quantity,
            })
            .sum())
    }

    async fn delete(&self, owner: &OwnerId, id: RecordId) -> DomainResult<Vec<RecordId>> {
        let mut tables = self.write()?;
        let kind = match tables.owned_record(owner, id) {
            Some(r) => r.kind,
            None => return Err(DomainError::not_found(message::RECORD_NOT_FOUND)),
        };
        let mut deleted = vec![id];
        if kind == RecordKind::In {
            deleted.extend(
                tables
                    .records
                    .values()
                    .filter(|r| r.source_record_id == Some(id))
                    .map(|r| r.id),
            );
        }
        for record_id in &deleted {
            tables.records.remove(record_id);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{CategoryRepo, ItemRepo, RecordRepo};
    use std::sync::Arc;
    use tokio::sync::Barrier;

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id)
    }

    fn name(raw: &str) -> EntityName {
        EntityName::new(raw).unwrap()
    }

    async fn seeded_item(store: &InMemoryStore, who: &OwnerId) -> ItemRow {
        let category = CategoryRepo::create(store, who, &name("Pantry")).await.unwrap();
        ItemRepo::create(store, who, category.row.id, &name("Rice"))
            .await
            .unwrap()
    }

    async fn receive(store: &InMemoryStore, who: &OwnerId, item: ItemId, qty: i64) -> RecordRow {
        store
            .append_in(StockReceipt {
                owner: who.clone(),
                item_id: item,
                quantity: qty,
                price: 100,
                expiration_date: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_then_duplicate_name_conflicts() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        CategoryRepo::create(&store, &u1, &name("Books"))
            .await
            .unwrap();
        let err = CategoryRepo::create(&store, &u1, &name("Books"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(err.message(), message::CATEGORY_NAME_TAKEN);
    }

    #[tokio::test]
    async fn same_name_is_free_across_owners() {
        let store = InMemoryStore::new();
        CategoryRepo::create(&store, &owner("u1"), &name("Books"))
            .await
            .unwrap();
        CategoryRepo::create(&store, &owner("u2"), &name("Books"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resurrection_returns_the_original_identity() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let first = CategoryRepo::create(&store, &u1, &name("Books"))
            .await
            .unwrap();
        CategoryRepo::delete(&store, &u1, first.row.id).await.unwrap();
        assert!(CategoryRepo::find_by_id(&store, std::slice::from_ref(&u1), first.row.id)
            .await
            .unwrap()
            .is_none());

        let second = CategoryRepo::create(&store, &u1, &name("Books"))
            .await
            .unwrap();
        assert!(second.resurrected);
        assert_eq!(second.row.id, first.row.id);
        assert!(!second.row.deleted);
    }

    #[tokio::test]
    async fn category_cap_is_enforced_before_name_checks() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        for n in 0..MAX_ACTIVE_CATEGORIES {
            CategoryRepo::create(&store, &u1, &name(&format!("c{n}")))
                .await
                .unwrap();
        }
        let err = CategoryRepo::create(&store, &u1, &name("one more"))
            .await
            .unwrap_err();
        assert_eq!(err.message(), message::CATEGORY_LIMIT_REACHED);
        // Even a duplicate name reports the cap once the cap is hit.
        let err = CategoryRepo::create(&store, &u1, &name("c0"))
            .await
            .unwrap_err();
        assert_eq!(err.message(), message::CATEGORY_LIMIT_REACHED);
    }

    #[tokio::test]
    async fn rename_to_own_current_name_is_allowed() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let created = CategoryRepo::create(&store, &u1, &name("Books"))
            .await
            .unwrap();
        let renamed = CategoryRepo::rename(&store, &u1, created.row.id, &name("Books"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Books");
    }

    #[tokio::test]
    async fn rename_onto_another_active_category_conflicts() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        CategoryRepo::create(&store, &u1, &name("Books")).await.unwrap();
        let other = CategoryRepo::create(&store, &u1, &name("Games"))
            .await
            .unwrap();
        let err = CategoryRepo::rename(&store, &u1, other.row.id, &name("Books"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_is_blocked_while_items_are_active() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let err = CategoryRepo::delete(&store, &u1, item.category_id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidOperation(_)));
        assert_eq!(err.message(), message::CATEGORY_HAS_ACTIVE_ITEMS);

        ItemRepo::delete(&store, &u1, item.id).await.unwrap();
        CategoryRepo::delete(&store, &u1, item.category_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deleted_item_namesake_gets_a_fresh_row() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let first = seeded_item(&store, &u1).await;
        ItemRepo::delete(&store, &u1, first.id).await.unwrap();
        let second = ItemRepo::create(&store, &u1, first.category_id, &name("Rice"))
            .await
            .unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn item_create_under_retired_category_is_not_found() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let category = CategoryRepo::create(&store, &u1, &name("Pantry"))
            .await
            .unwrap();
        CategoryRepo::delete(&store, &u1, category.row.id)
            .await
            .unwrap();
        let err = ItemRepo::create(&store, &u1, category.row.id, &name("Rice"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn zero_quantity_receipt_is_preserved() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let posted = receive(&store, &u1, item.id, 0).await;
        assert_eq!(posted.quantity, 0);
        assert_eq!(
            store.remaining_quantity(&u1, posted.id).await.unwrap(),
            Some(0)
        );
        assert_eq!(store.net_quantity(&u1, item.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn issue_walks_the_guard_chain_in_order() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let source = receive(&store, &u1, item.id, 50).await;

        // Unknown source.
        let err = store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 1,
                source_record_id: RecordId::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(err.message(), message::RECORD_NOT_FOUND);

        // Someone else's source reads as absent.
        let err = store
            .append_out(StockIssue {
                owner: owner("u2"),
                item_id: item.id,
                quantity: 1,
                source_record_id: source.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        // Source pointing at a different item.
        let other = ItemRepo::create(&store, &u1, item.category_id, &name("Beans"))
            .await
            .unwrap();
        let err = store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: other.id,
                quantity: 1,
                source_record_id: source.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(err.message(), message::RECORD_ITEM_MISMATCH);

        // Draining the source exactly to zero is fine; one more is not.
        store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 50,
                source_record_id: source.id,
            })
            .await
            .unwrap();
        let err = store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 1,
                source_record_id: source.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(err.message(), message::INSUFFICIENT_STOCK);
    }

    #[tokio::test]
    async fn an_outbound_entry_cannot_be_a_source() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let source = receive(&store, &u1, item.id, 50).await;
        let issued = store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 10,
                source_record_id: source.id,
            })
            .await
            .unwrap();

        let err = store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 1,
                source_record_id: issued.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(err.message(), message::RECORD_NOT_FOUND);

        // And it never answers a remaining-quantity lookup.
        assert_eq!(
            store.remaining_quantity(&u1, issued.id).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn net_quantity_tracks_both_directions() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let a = receive(&store, &u1, item.id, 30).await;
        let b = receive(&store, &u1, item.id, 20).await;
        store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 25,
                source_record_id: a.id,
            })
            .await
            .unwrap();
        store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 5,
                source_record_id: b.id,
            })
            .await
            .unwrap();
        assert_eq!(store.net_quantity(&u1, item.id).await.unwrap(), 20);
        assert_eq!(store.remaining_quantity(&u1, a.id).await.unwrap(), Some(5));
        assert_eq!(store.remaining_quantity(&u1, b.id).await.unwrap(), Some(15));
    }

    #[tokio::test]
    async fn deleting_an_inbound_entry_cascades_to_children() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let source = receive(&store, &u1, item.id, 50).await;
        let first = store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 10,
                source_record_id: source.id,
            })
            .await
            .unwrap();
        let second = store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 15,
                source_record_id: source.id,
            })
            .await
            .unwrap();

        let deleted = RecordRepo::delete(&store, &u1, source.id).await.unwrap();
        assert_eq!(deleted[0], source.id);
        assert_eq!(deleted.len(), 3);
        assert!(deleted.contains(&first.id));
        assert!(deleted.contains(&second.id));
        assert!(store.history(&u1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_one_outbound_child_spares_the_rest() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let source = receive(&store, &u1, item.id, 50).await;
        let first = store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 10,
                source_record_id: source.id,
            })
            .await
            .unwrap();
        store
            .append_out(StockIssue {
                owner: u1.clone(),
                item_id: item.id,
                quantity: 15,
                source_record_id: source.id,
            })
            .await
            .unwrap();

        let deleted = RecordRepo::delete(&store, &u1, first.id).await.unwrap();
        assert_eq!(deleted, vec![first.id]);
        assert_eq!(store.history(&u1).await.unwrap().len(), 2);
        assert_eq!(
            store.remaining_quantity(&u1, source.id).await.unwrap(),
            Some(35)
        );
    }

    #[tokio::test]
    async fn history_joins_names_through_deleted_rows() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        receive(&store, &u1, item.id, 5).await;
        ItemRepo::delete(&store, &u1, item.id).await.unwrap();
        CategoryRepo::delete(&store, &u1, item.category_id)
            .await
            .unwrap();

        let history = store.history(&u1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].item_name, "Rice");
        assert_eq!(history[0].category_name, "Pantry");
    }

    #[tokio::test]
    async fn timestamps_never_decrease_and_sequence_is_total() {
        let store = InMemoryStore::new();
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let mut rows = Vec::new();
        for _ in 0..20 {
            rows.push(receive(&store, &u1, item.id, 1).await);
        }
        for pair in rows.windows(2) {
            assert!(pair[1].created_at >= pair[0].created_at);
            assert!(pair[1].seq > pair[0].seq);
        }
    }

    proptest::proptest! {
        /// Whatever sequence of issue attempts arrives, accepted children
        /// never draw more than the source holds and remaining never goes
        /// negative.
        #[test]
        fn children_never_exceed_source(
            source_qty in 0i64..500,
            requests in proptest::collection::vec(1i64..120, 0..40),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async move {
                let store = InMemoryStore::new();
                let u1 = owner("u1");
                let item = seeded_item(&store, &u1).await;
                let source = receive(&store, &u1, item.id, source_qty).await;

                let mut accepted = 0i64;
                for qty in requests {
                    let outcome = store
                        .append_out(StockIssue {
                            owner: u1.clone(),
                            item_id: item.id,
                            quantity: qty,
                            source_record_id: source.id,
                        })
                        .await;
                    match outcome {
                        Ok(_) => accepted += qty,
                        Err(err) => {
                            assert_eq!(err.message(), message::INSUFFICIENT_STOCK)
                        }
                    }
                }

                assert!(accepted <= source_qty);
                let remaining = store
                    .remaining_quantity(&u1, source.id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(remaining, source_qty - accepted);
                assert!(remaining >= 0);
                assert_eq!(
                    store.net_quantity(&u1, item.id).await.unwrap(),
                    source_qty - accepted
                );
            });
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_issues_never_both_win() {
        let store = Arc::new(InMemoryStore::new());
        let u1 = owner("u1");
        let item = seeded_item(&store, &u1).await;
        let source = receive(&store, &u1, item.id, 50).await;

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            let owner = u1.clone();
            let source_id = source.id;
            let item_id = item.id;
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                store
                    .append_out(StockIssue {
                        owner,
                        item_id,
                        quantity: 30,
                        source_record_id: source_id,
                    })
                    .await
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one of two competing issues may land");
        let loss = outcomes.into_iter().find(|r| r.is_err()).unwrap();
        assert_eq!(loss.unwrap_err().message(), message::INSUFFICIENT_STOCK);
        assert_eq!(
            store.remaining_quantity(&u1, source.id).await.unwrap(),
            Some(20)
        );
    }
}
