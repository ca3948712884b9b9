//! Category lifecycle behind the visibility rules.
//!
//! Reads run over the widened owner set {caller, system default}; writes
//! re-check that the resolved row is the caller's own before touching the
//! store. The compound checks themselves (capacity, uniqueness,
//! resurrection, the active-items guard) live in the repository so they
//! stay atomic.

use stockbook_core::{
    message, CategoryId, DomainError, DomainResult, EntityName, NameError, OwnerId,
    TenancyResolver,
};
use stockbook_store::{CategoryCreated, CategoryRepo, CategoryRow, ItemRepo, RecordRepo};

use crate::item::ItemWithStock;

fn category_name(raw: &str) -> DomainResult<EntityName> {
    EntityName::new(raw).map_err(|err| match err {
        NameError::Blank => DomainError::validation(message::CATEGORY_NAME_REQUIRED),
        NameError::TooLong => DomainError::validation(message::CATEGORY_NAME_TOO_LONG),
    })
}

pub struct CategoryService<S> {
    store: S,
    tenancy: TenancyResolver,
}

impl<S> CategoryService<S>
where
    S: CategoryRepo + ItemRepo + RecordRepo,
{
    pub fn new(store: S, tenancy: TenancyResolver) -> Self {
        Self { store, tenancy }
    }

    /// Union of the caller's and the default categories, sorted by name.
    /// The sort is stable, so equal names keep their store order.
    pub async fn list_visible(&self, caller: &OwnerId) -> DomainResult<Vec<CategoryRow>> {
        let scope = self.tenancy.scope(caller.clone());
        let mut rows = self.store.find_by_owners(scope.owners()).await?;
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    /// Items visible under one category, newest change first, each carrying
    /// the caller's net stock for it.
    pub async fn items_of(
        &self,
        caller: &OwnerId,
        category_id: CategoryId,
    ) -> DomainResult<Vec<ItemWithStock>> {
        let scope = self.tenancy.scope(caller.clone());
        let visible = CategoryRepo::find_by_id(&self.store, scope.owners(), category_id)
            .await?
            .is_some();
        if !visible {
            return Err(DomainError::not_found(message::CATEGORY_NOT_FOUND));
        }
        let mut items = self
            .store
            .find_by_category(scope.owners(), category_id)
            .await?;
        items.sort_by_key(|i| std::cmp::Reverse((i.updated_at, i.id)));
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let net_quantity = self.store.net_quantity(caller, item.id).await?;
            out.push(ItemWithStock { item, net_quantity });
        }
        Ok(out)
    }

    pub async fn create(&self, caller: &OwnerId, name: &str) -> DomainResult<CategoryCreated> {
        let name = category_name(name)?;
        CategoryRepo::create(&self.store, caller, &name).await
    }

    pub async fn update(
        &self,
        caller: &OwnerId,
        id: CategoryId,
        new_name: &str,
    ) -> DomainResult<CategoryRow> {
        let name = category_name(new_name)?;
        let scope = self.tenancy.scope(caller.clone());
        let row = CategoryRepo::find_by_id(&self.store, scope.owners(), id)
            .await?
            .ok_or_else(|| DomainError::not_found(message::CATEGORY_NOT_FOUND))?;
        if !scope.can_mutate(&row.owner) {
            return Err(DomainError::invalid_operation(
                message::DEFAULT_CATEGORY_NOT_EDITABLE,
            ));
        }
        CategoryRepo::rename(&self.store, caller, id, &name).await
    }

    pub async fn delete(&self, caller: &OwnerId, id: CategoryId) -> DomainResult<()> {
        let scope = self.tenancy.scope(caller.clone());
        let row = CategoryRepo::find_by_id(&self.store, scope.owners(), id)
            .await?
            .ok_or_else(|| DomainError::not_found(message::CATEGORY_NOT_FOUND))?;
        if !scope.can_mutate(&row.owner) {
            return Err(DomainError::invalid_operation(
                message::DEFAULT_CATEGORY_NOT_DELETABLE,
            ));
        }
        CategoryRepo::delete(&self.store, caller, id).await
    }
}
