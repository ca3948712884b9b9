//! Item lifecycle inside a named category.
//!
//! Items are addressed by category *name* on the way in (the clients work
//! with names, not ids) and resolved to a category row within the caller's
//! visibility scope before any item check runs.

use serde::Serialize;
use stockbook_core::{
    message, DomainError, DomainResult, EntityName, ItemId, NameError, OwnerId, TenancyResolver,
};
use stockbook_store::{CategoryRepo, ItemRepo, ItemRow, RecordRepo};

fn item_name(raw: &str) -> DomainResult<EntityName> {
    EntityName::new(raw).map_err(|err| match err {
        NameError::Blank => DomainError::validation(message::ITEM_NAME_REQUIRED),
        NameError::TooLong => DomainError::validation(message::ITEM_NAME_TOO_LONG),
    })
}

/// Lookup keys are matched verbatim, but a blank key is a request shape
/// problem, not a miss.
fn require_category_name(raw: &str) -> DomainResult<&str> {
    if raw.chars().all(char::is_whitespace) {
        return Err(DomainError::validation(message::CATEGORY_NAME_REQUIRED));
    }
    Ok(raw)
}

fn check_quantity(quantity: Option<i64>) -> DomainResult<()> {
    if quantity.is_some_and(|q| q < 0) {
        return Err(DomainError::validation(message::QUANTITY_NEGATIVE));
    }
    Ok(())
}

/// An item with the caller's net stock, how the item lists render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemWithStock {
    pub item: ItemRow,
    pub net_quantity: i64,
}

pub struct ItemService<S> {
    store: S,
    tenancy: TenancyResolver,
}

impl<S> ItemService<S>
where
    S: CategoryRepo + ItemRepo + RecordRepo,
{
    pub fn new(store: S, tenancy: TenancyResolver) -> Self {
        Self { store, tenancy }
    }

    /// Registers an item under the named category. The declared starting
    /// quantity is validated but carries no ledger weight; stock only moves
    /// through posted records, so a fresh item always nets zero.
    pub async fn create(
        &self,
        caller: &OwnerId,
        category_name: &str,
        name: &str,
        initial_quantity: Option<i64>,
    ) -> DomainResult<ItemRow> {
        let name = item_name(name)?;
        check_quantity(initial_quantity)?;
        let category_name = require_category_name(category_name)?;

        let scope = self.tenancy.scope(caller.clone());
        let category = self
            .store
            .find_by_name(scope.owners(), category_name)
            .await?
            .ok_or_else(|| DomainError::not_found(message::CATEGORY_NOT_FOUND))?;
        ItemRepo::create(&self.store, caller, category.id, &name).await
    }

    /// Active items visible under the named category, newest change first,
    /// with the caller's net stock. An empty result is a `NotFound`, not an
    /// empty page: clients treat a bare category as nothing registered.
    pub async fn list_by_category(
        &self,
        caller: &OwnerId,
        category_name: &str,
    ) -> DomainResult<Vec<ItemWithStock>> {
        let category_name = require_category_name(category_name)?;
        let scope = self.tenancy.scope(caller.clone());
        let category = self
            .store
            .find_by_name(scope.owners(), category_name)
            .await?
            .ok_or_else(|| DomainError::not_found(message::NO_ITEMS_REGISTERED))?;
        let mut items = self
            .store
            .find_by_category(scope.owners(), category.id)
            .await?;
        if items.is_empty() {
            return Err(DomainError::not_found(message::NO_ITEMS_REGISTERED));
        }
        items.sort_by_key(|i| std::cmp::Reverse((i.updated_at, i.id)));
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let net_quantity = self.store.net_quantity(caller, item.id).await?;
            out.push(ItemWithStock { item, net_quantity });
        }
        Ok(out)
    }

    /// Renames one of the caller's items. The category name must resolve to
    /// the item's current category; there is no move-between-categories
    /// operation, so a mismatched category reads as the item not existing
    /// there.
    pub async fn update(
        &self,
        caller: &OwnerId,
        item_id: ItemId,
        new_name: &str,
        category_name: &str,
        new_quantity: Option<i64>,
    ) -> DomainResult<ItemRow> {
        let name = item_name(new_name)?;
        check_quantity(new_quantity)?;
        let category_name = require_category_name(category_name)?;

        let scope = self.tenancy.scope(caller.clone());
        let category = self
            .store
            .find_by_name(scope.owners(), category_name)
            .await?
            .ok_or_else(|| DomainError::not_found(message::ITEM_NOT_FOUND))?;
        ItemRepo::rename(&self.store, caller, category.id, item_id, &name).await
    }

    pub async fn delete(&self, caller: &OwnerId, item_id: ItemId) -> DomainResult<()> {
        let scope = self.tenancy.scope(caller.clone());
        let row = ItemRepo::find_by_id(&self.store, scope.owners(), item_id)
            .await?
            .ok_or_else(|| DomainError::not_found(message::ITEM_NOT_FOUND))?;
        if !scope.can_mutate(&row.owner) {
            return Err(DomainError::invalid_operation(
                message::DEFAULT_ITEM_NOT_DELETABLE,
            ));
        }
        ItemRepo::delete(&self.store, caller, item_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stockbook_store::{InMemoryStore, StockReceipt};

    fn system() -> OwnerId {
        OwnerId::from_static("system")
    }

    fn caller() -> OwnerId {
        OwnerId::from_static("u1")
    }

    fn harness() -> (Arc<InMemoryStore>, ItemService<Arc<InMemoryStore>>) {
        let store = Arc::new(InMemoryStore::new());
        let service = ItemService::new(Arc::clone(&store), TenancyResolver::new(system()));
        (store, service)
    }

    fn valid(raw: &str) -> EntityName {
        EntityName::new(raw).unwrap()
    }

    #[tokio::test]
    async fn items_can_live_under_a_default_category() {
        let (store, service) = harness();
        CategoryRepo::create(store.as_ref(), &system(), &valid("Food"))
            .await
            .unwrap();

        let created = service
            .create(&caller(), "Food", "Rice", Some(3))
            .await
            .unwrap();
        assert_eq!(created.owner, caller());
        assert_eq!(created.name, "Rice");
        // The declared quantity is advisory; stock starts empty.
        assert_eq!(store.net_quantity(&caller(), created.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn own_category_shadows_the_default_namesake() {
        let (store, service) = harness();
        CategoryRepo::create(store.as_ref(), &system(), &valid("Food"))
            .await
            .unwrap();
        let own = CategoryRepo::create(store.as_ref(), &caller(), &valid("Food"))
            .await
            .unwrap();

        let created = service.create(&caller(), "Food", "Rice", None).await.unwrap();
        assert_eq!(created.category_id, own.row.id);
    }

    #[tokio::test]
    async fn create_validates_before_resolving_anything() {
        let (_, service) = harness();
        let err = service.create(&caller(), "Food", " ", None).await.unwrap_err();
        assert_eq!(err.message(), message::ITEM_NAME_REQUIRED);

        let err = service
            .create(&caller(), "Food", "Rice", Some(-1))
            .await
            .unwrap_err();
        assert_eq!(err.message(), message::QUANTITY_NEGATIVE);

        let err = service.create(&caller(), "  ", "Rice", None).await.unwrap_err();
        assert_eq!(err.message(), message::CATEGORY_NAME_REQUIRED);

        let err = service
            .create(&caller(), "Nowhere", "Rice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(err.message(), message::CATEGORY_NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_name_in_category_conflicts() {
        let (store, service) = harness();
        CategoryRepo::create(store.as_ref(), &caller(), &valid("Pantry"))
            .await
            .unwrap();
        service.create(&caller(), "Pantry", "Rice", None).await.unwrap();
        let err = service
            .create(&caller(), "Pantry", "Rice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(err.message(), message::ITEM_NAME_TAKEN);
    }

    #[tokio::test]
    async fn listing_orders_by_latest_change_and_carries_stock() {
        let (store, service) = harness();
        CategoryRepo::create(store.as_ref(), &caller(), &valid("Pantry"))
            .await
            .unwrap();
        let rice = service.create(&caller(), "Pantry", "Rice", None).await.unwrap();
        let beans = service.create(&caller(), "Pantry", "Beans", None).await.unwrap();
        store
            .append_in(StockReceipt {
                owner: caller(),
                item_id: rice.id,
                quantity: 12,
                price: 80,
                expiration_date: None,
            })
            .await
            .unwrap();

        let listed = service.list_by_category(&caller(), "Pantry").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].item.id, beans.id);
        assert_eq!(listed[1].item.id, rice.id);
        assert_eq!(listed[1].net_quantity, 12);

        // Renaming bumps the update time and reorders the list.
        service
            .update(&caller(), rice.id, "Brown rice", "Pantry", None)
            .await
            .unwrap();
        let listed = service.list_by_category(&caller(), "Pantry").await.unwrap();
        assert_eq!(listed[0].item.id, rice.id);
        assert_eq!(listed[0].item.name, "Brown rice");
    }

    #[tokio::test]
    async fn empty_category_reads_as_nothing_registered() {
        let (store, service) = harness();
        CategoryRepo::create(store.as_ref(), &caller(), &valid("Pantry"))
            .await
            .unwrap();
        let err = service
            .list_by_category(&caller(), "Pantry")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(err.message(), message::NO_ITEMS_REGISTERED);

        let err = service
            .list_by_category(&caller(), "Nowhere")
            .await
            .unwrap_err();
        assert_eq!(err.message(), message::NO_ITEMS_REGISTERED);
    }

    #[tokio::test]
    async fn update_cannot_reach_across_categories() {
        let (store, service) = harness();
        CategoryRepo::create(store.as_ref(), &caller(), &valid("Pantry"))
            .await
            .unwrap();
        CategoryRepo::create(store.as_ref(), &caller(), &valid("Freezer"))
            .await
            .unwrap();
        let rice = service.create(&caller(), "Pantry", "Rice", None).await.unwrap();

        let err = service
            .update(&caller(), rice.id, "Rice", "Freezer", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(err.message(), message::ITEM_NOT_FOUND);
    }

    #[tokio::test]
    async fn rename_to_own_name_passes_to_a_taken_name_conflicts() {
        let (store, service) = harness();
        CategoryRepo::create(store.as_ref(), &caller(), &valid("Pantry"))
            .await
            .unwrap();
        let rice = service.create(&caller(), "Pantry", "Rice", None).await.unwrap();
        service.create(&caller(), "Pantry", "Beans", None).await.unwrap();

        service
            .update(&caller(), rice.id, "Rice", "Pantry", None)
            .await
            .unwrap();
        let err = service
            .update(&caller(), rice.id, "Beans", "Pantry", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_is_scoped_and_respects_defaults() {
        let (store, service) = harness();
        let shared = CategoryRepo::create(store.as_ref(), &system(), &valid("Food"))
            .await
            .unwrap();
        let default_item = ItemRepo::create(store.as_ref(), &system(), shared.row.id, &valid("Salt"))
            .await
            .unwrap();

        let err = service.delete(&caller(), default_item.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidOperation(_)));

        let err = service.delete(&caller(), ItemId::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let own = service.create(&caller(), "Food", "Rice", None).await.unwrap();
        service.delete(&caller(), own.id).await.unwrap();
        // The name is reusable afterwards with a fresh identity.
        let again = service.create(&caller(), "Food", "Rice", None).await.unwrap();
        assert_ne!(again.id, own.id);
    }
}
