//! Repository traits implemented by every storage backend.
//!
//! Read methods take the owner set to search, in precedence order, so the
//! same method serves both caller-private lookups and the widened
//! caller-plus-defaults view. Mutations take a single owner: writes never
//! cross an ownership boundary.
//!
//! Compound mutations (`create`, `rename`, `delete`, `append_out`) run their
//! guard checks and the write as one atomic step inside the backend. Callers
//! must not pre-check and then write in two calls; that split reintroduces
//! the races these methods exist to close.

use async_trait::async_trait;
use std::sync::Arc;
use stockbook_core::{CategoryId, DomainResult, EntityName, ItemId, OwnerId, RecordId};

use crate::row::{
    CategoryCreated, CategoryRow, ItemRow, RecordRow, RecordView, StockIssue, StockReceipt,
};

/// Category persistence. All lookups exclude soft-deleted rows unless noted.
#[async_trait]
pub trait CategoryRepo: Send + Sync {
    /// Finds an active category by id among the given owners.
    async fn find_by_id(
        &self,
        owners: &[OwnerId],
        id: CategoryId,
    ) -> DomainResult<Option<CategoryRow>>;

    /// All active categories belonging to any of the given owners.
    /// Returned unordered; presentation decides the sort.
    async fn find_by_owners(&self, owners: &[OwnerId]) -> DomainResult<Vec<CategoryRow>>;

    /// Resolves an active category by exact name. Owners are tried in the
    /// order given and the first match wins.
    async fn find_by_name(
        &self,
        owners: &[OwnerId],
        name: &str,
    ) -> DomainResult<Option<CategoryRow>>;

    /// Whether the owner already has an active category with this name.
    async fn exists_by_owner_and_name(&self, owner: &OwnerId, name: &str) -> DomainResult<bool>;

    /// Registers a category for the owner, atomically enforcing the active
    /// cap and per-owner name uniqueness. A soft-deleted row with the same
    /// name is reactivated under its original id instead of inserting.
    ///
    /// Fails `Conflict` when the name is already active or the owner holds
    /// `MAX_ACTIVE_CATEGORIES` active categories.
    async fn create(&self, owner: &OwnerId, name: &EntityName) -> DomainResult<CategoryCreated>;

    /// Renames an owned active category. Fails `NotFound` when the id does
    /// not resolve for the owner and `Conflict` when another of the owner's
    /// active categories already has the name. Renaming to the current name
    /// succeeds.
    async fn rename(
        &self,
        owner: &OwnerId,
        id: CategoryId,
        name: &EntityName,
    ) -> DomainResult<CategoryRow>;

    /// Soft-deletes an owned active category. Fails `NotFound` when the id
    /// does not resolve for the owner and `InvalidOperation` while any
    /// active item still sits under the category.
    async fn delete(&self, owner: &OwnerId, id: CategoryId) -> DomainResult<()>;

    /// Writes the row as-is, replacing any row with the same id. Used by
    /// seeding; regular flows go through `create`.
    async fn save(&self, row: CategoryRow) -> DomainResult<()>;
}

/// Item persistence. All lookups exclude soft-deleted rows unless noted.
#[async_trait]
pub trait ItemRepo: Send + Sync {
    /// Finds an active item by id among the given owners.
    async fn find_by_id(&self, owners: &[OwnerId], id: ItemId) -> DomainResult<Option<ItemRow>>;

    /// All active items under the category belonging to any of the given
    /// owners. Returned unordered.
    async fn find_by_category(
        &self,
        owners: &[OwnerId],
        category_id: CategoryId,
    ) -> DomainResult<Vec<ItemRow>>;

    /// Whether the owner already has an active item with this name inside
    /// the category.
    async fn exists_by_owner_and_name(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        name: &str,
    ) -> DomainResult<bool>;

    /// Registers an item, atomically enforcing per-owner name uniqueness
    /// inside the category. Soft-deleted items are not resurrected; a new
    /// row with a fresh id is inserted even when a deleted namesake exists.
    ///
    /// Fails `Conflict` when the owner already has an active item with the
    /// name in this category, and `NotFound` when the category stopped
    /// being active since it was resolved.
    async fn create(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        name: &EntityName,
    ) -> DomainResult<ItemRow>;

    /// Renames an owned active item within the category. Fails `NotFound`
    /// when the id does not resolve under that category for the owner, and
    /// `Conflict` when another of the owner's active items there already
    /// has the name. Renaming to the current name succeeds.
    async fn rename(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        id: ItemId,
        name: &EntityName,
    ) -> DomainResult<ItemRow>;

    /// Soft-deletes an owned active item. Ledger entries for the item are
    /// left untouched. Fails `NotFound` when the id does not resolve.
    async fn delete(&self, owner: &OwnerId, id: ItemId) -> DomainResult<()>;

    /// Writes the row as-is, replacing any row with the same id.
    async fn save(&self, row: ItemRow) -> DomainResult<()>;
}

/// Ledger persistence. Entries are append-only: there is no update, and the
/// only delete is the physical cascade used to retract an entry.
#[async_trait]
pub trait RecordRepo: Send + Sync {
    /// Finds one of the owner's entries by id, joined with item and
    /// category names. Name lookups ignore the deleted flag so retired
    /// items keep their label in history.
    async fn find_by_id(&self, owner: &OwnerId, id: RecordId)
        -> DomainResult<Option<RecordView>>;

    /// Every entry the owner has recorded, across all items. Returned
    /// unordered; presentation sorts newest-first.
    async fn history(&self, owner: &OwnerId) -> DomainResult<Vec<RecordView>>;

    /// Every entry the owner has recorded against one item. Returned
    /// unordered.
    async fn records_for_item(
        &self,
        owner: &OwnerId,
        item_id: ItemId,
    ) -> DomainResult<Vec<RecordView>>;

    /// Appends an inbound entry and returns it with its assigned sequence
    /// and timestamp. Zero-quantity receipts are legal and preserved.
    async fn append_in(&self, receipt: StockReceipt) -> DomainResult<RecordRow>;

    /// Appends an outbound entry, atomically verifying the source: it must
    /// resolve for the owner (`NotFound` otherwise), belong to the named
    /// item (`Conflict`), be inbound (`Conflict`, since an outbound source
    /// has no remaining quantity to draw), and still hold at least the
    /// requested quantity once all prior children are subtracted
    /// (`Conflict`). Concurrent issues against the same source serialize so
    /// the remaining quantity can never go negative.
    async fn append_out(&self, issue: StockIssue) -> DomainResult<RecordRow>;

    /// Quantity still undrawn on an inbound entry: its quantity minus the
    /// sum of its outbound children. `None` when the id does not resolve to
    /// one of the owner's inbound entries.
    async fn remaining_quantity(
        &self,
        owner: &OwnerId,
        id: RecordId,
    ) -> DomainResult<Option<i64>>;

    /// Net stock for an item: total inbound minus total outbound across the
    /// owner's entries. Zero when the item has no entries.
    async fn net_quantity(&self, owner: &OwnerId, item_id: ItemId) -> DomainResult<i64>;

    /// Physically deletes one of the owner's entries. Deleting an inbound
    /// entry also deletes its outbound children in the same step. Returns
    /// every deleted id, the requested one first. Fails `NotFound` when the
    /// id does not resolve for the owner.
    async fn delete(&self, owner: &OwnerId, id: RecordId) -> DomainResult<Vec<RecordId>>;
}

#[async_trait]
impl<S> CategoryRepo for Arc<S>
where
    S: CategoryRepo + ?Sized,
{
    async fn find_by_id(
        &self,
        owners: &[OwnerId],
        id: CategoryId,
    ) -> DomainResult<Option<CategoryRow>> {
        (**self).find_by_id(owners, id).await
    }

    async fn find_by_owners(&self, owners: &[OwnerId]) -> DomainResult<Vec<CategoryRow>> {
        (**self).find_by_owners(owners).await
    }

    async fn find_by_name(
        &self,
        owners: &[OwnerId],
        name: &str,
    ) -> DomainResult<Option<CategoryRow>> {
        (**self).find_by_name(owners, name).await
    }

    async fn exists_by_owner_and_name(&self, owner: &OwnerId, name: &str) -> DomainResult<bool> {
        (**self).exists_by_owner_and_name(owner, name).await
    }

    async fn create(&self, owner: &OwnerId, name: &EntityName) -> DomainResult<CategoryCreated> {
        (**self).create(owner, name).await
    }

    async fn rename(
        &self,
        owner: &OwnerId,
        id: CategoryId,
        name: &EntityName,
    ) -> DomainResult<CategoryRow> {
        (**self).rename(owner, id, name).await
    }

    async fn delete(&self, owner: &OwnerId, id: CategoryId) -> DomainResult<()> {
        (**self).delete(owner, id).await
    }

    async fn save(&self, row: CategoryRow) -> DomainResult<()> {
        (**self).save(row).await
    }
}

#[async_trait]
impl<S> ItemRepo for Arc<S>
where
    S: ItemRepo + ?Sized,
{
    async fn find_by_id(&self, owners: &[OwnerId], id: ItemId) -> DomainResult<Option<ItemRow>> {
        (**self).find_by_id(owners, id).await
    }

    async fn find_by_category(
        &self,
        owners: &[OwnerId],
        category_id: CategoryId,
    ) -> DomainResult<Vec<ItemRow>> {
        (**self).find_by_category(owners, category_id).await
    }

    async fn exists_by_owner_and_name(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        name: &str,
    ) -> DomainResult<bool> {
        (**self)
            .exists_by_owner_and_name(owner, category_id, name)
            .await
    }

    async fn create(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        name: &EntityName,
    ) -> DomainResult<ItemRow> {
        (**self).create(owner, category_id, name).await
    }

    async fn rename(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        id: ItemId,
        name: &EntityName,
    ) -> DomainResult<ItemRow> {
        (**self).rename(owner, category_id, id, name).await
    }

    async fn delete(&self, owner: &OwnerId, id: ItemId) -> DomainResult<()> {
        (**self).delete(owner, id).await
    }

    async fn save(&self, row: ItemRow) -> DomainResult<()> {
        (**self).save(row).await
    }
}

#[async_trait]
impl<S> RecordRepo for Arc<S>
where
    S: RecordRepo + ?Sized,
{
    async fn find_by_id(
        &self,
        owner: &OwnerId,
        id: RecordId,
    ) -> DomainResult<Option<RecordView>> {
        (**self).find_by_id(owner, id).await
    }

    async fn history(&self, owner: &OwnerId) -> DomainResult<Vec<RecordView>> {
        (**self).history(owner).await
    }

    async fn records_for_item(
        &self,
        owner: &OwnerId,
        item_id: ItemId,
    ) -> DomainResult<Vec<RecordView>> {
        (**self).records_for_item(owner, item_id).await
    }

    async fn append_in(&self, receipt: StockReceipt) -> DomainResult<RecordRow> {
        (**self).append_in(receipt).await
    }

    async fn append_out(&self, issue: StockIssue) -> DomainResult<RecordRow> {
        (**self).append_out(issue).await
    }

    async fn remaining_quantity(
        &self,
        owner: &OwnerId,
        id: RecordId,
    ) -> DomainResult<Option<i64>> {
        (**self).remaining_quantity(owner, id).await
    }

    async fn net_quantity(&self, owner: &OwnerId, item_id: ItemId) -> DomainResult<i64> {
        (**self).net_quantity(owner, item_id).await
    }

    async fn delete(&self, owner: &OwnerId, id: RecordId) -> DomainResult<Vec<RecordId>> {
        (**self).delete(owner, id).await
    }
}
