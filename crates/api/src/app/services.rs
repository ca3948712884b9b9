use std::sync::Arc;

use stockbook_auth::{InMemoryTokenCache, TokenCache, DEFAULT_SESSION_TTL_SECS};
use stockbook_catalog::{CategoryService, ItemService, ItemWithStock};
use stockbook_core::{CategoryId, DomainResult, ItemId, OwnerId, RecordId, TenancyResolver};
use stockbook_ledger::{LedgerService, PostStock, PostedStock};
use stockbook_store::{
    seed_default_categories, CategoryCreated, CategoryRow, InMemoryStore, ItemRow, PostgresStore,
    RecordView,
};

#[cfg(feature = "redis")]
use stockbook_auth::RedisTokenCache;

/// One value holding every domain service, backed by either store. The
/// backend is picked once at startup; handlers stay backend-agnostic.
pub enum AppServices {
    InMemory {
        categories: CategoryService<Arc<InMemoryStore>>,
        items: ItemService<Arc<InMemoryStore>>,
        ledger: LedgerService<Arc<InMemoryStore>>,
    },
    Persistent {
        categories: CategoryService<Arc<PostgresStore>>,
        items: ItemService<Arc<PostgresStore>>,
        ledger: LedgerService<Arc<PostgresStore>>,
    },
}

pub async fn build_services() -> AppServices {
    let system = OwnerId::new(
        std::env::var("SYSTEM_USER_ID").unwrap_or_else(|_| "system".to_string()),
    );
    let tenancy = TenancyResolver::new(system.clone());

    let use_persistent = std::env::var("USE_PERSISTENT_STORE")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        match std::env::var("DATABASE_URL") {
            Ok(database_url) => {
                return build_persistent_services(&database_url, system, tenancy).await;
            }
            Err(_) => {
                tracing::warn!(
                    "USE_PERSISTENT_STORE=true but DATABASE_URL not set, falling back to in-memory"
                );
            }
        }
    }

    build_in_memory_services(system, tenancy).await
}

async fn build_in_memory_services(system: OwnerId, tenancy: TenancyResolver) -> AppServices {
    let store = Arc::new(InMemoryStore::new());

    seed_default_categories(&store, &system)
        .await
        .expect("failed to seed default categories");

    AppServices::InMemory {
        categories: CategoryService::new(store.clone(), tenancy.clone()),
        items: ItemService::new(store.clone(), tenancy.clone()),
        ledger: LedgerService::new(store, tenancy),
    }
}

async fn build_persistent_services(
    database_url: &str,
    system: OwnerId,
    tenancy: TenancyResolver,
) -> AppServices {
    let store = Arc::new(
        PostgresStore::connect(database_url)
            .await
            .expect("failed to connect to Postgres"),
    );

    seed_default_categories(&store, &system)
        .await
        .expect("failed to seed default categories");

    AppServices::Persistent {
        categories: CategoryService::new(store.clone(), tenancy.clone()),
        items: ItemService::new(store.clone(), tenancy.clone()),
        ledger: LedgerService::new(store, tenancy),
    }
}

/// Session cache for the auth middleware. Redis-backed when the feature and
/// `USE_REDIS_SESSIONS` are both on; any setup problem degrades to the
/// in-process map with a warning, never a hard failure.
pub fn build_session_cache() -> Arc<dyn TokenCache> {
    let ttl_secs = std::env::var("SESSION_TTL_SECS")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(DEFAULT_SESSION_TTL_SECS)
        .max(0);

    let use_redis = std::env::var("USE_REDIS_SESSIONS")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_redis {
        #[cfg(feature = "redis")]
        {
            let redis_url = std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string());
            match RedisTokenCache::new(&redis_url, ttl_secs as u64) {
                Ok(cache) => return Arc::new(cache),
                Err(err) => {
                    tracing::warn!(error = %err, "redis session cache unavailable, using in-memory sessions");
                }
            }
        }
        #[cfg(not(feature = "redis"))]
        {
            tracing::warn!(
                "USE_REDIS_SESSIONS=true but redis feature not enabled, using in-memory sessions"
            );
        }
    }

    Arc::new(InMemoryTokenCache::new(chrono::Duration::seconds(ttl_secs)))
}

impl AppServices {
    pub async fn list_categories(&self, caller: &OwnerId) -> DomainResult<Vec<CategoryRow>> {
        match self {
            AppServices::InMemory { categories, .. } => categories.list_visible(caller).await,
            AppServices::Persistent { categories, .. } => categories.list_visible(caller).await,
        }
    }

    pub async fn category_items(
        &self,
        caller: &OwnerId,
        category_id: CategoryId,
    ) -> DomainResult<Vec<ItemWithStock>> {
        match self {
            AppServices::InMemory { categories, .. } => {
                categories.items_of(caller, category_id).await
            }
            AppServices::Persistent { categories, .. } => {
                categories.items_of(caller, category_id).await
            }
        }
    }

    pub async fn create_category(
        &self,
        caller: &OwnerId,
        name: &str,
    ) -> DomainResult<CategoryCreated> {
        match self {
            AppServices::InMemory { categories, .. } => categories.create(caller, name).await,
            AppServices::Persistent { categories, .. } => categories.create(caller, name).await,
        }
    }

    pub async fn rename_category(
        &self,
        caller: &OwnerId,
        category_id: CategoryId,
        new_name: &str,
    ) -> DomainResult<CategoryRow> {
        match self {
            AppServices::InMemory { categories, .. } => {
                categories.update(caller, category_id, new_name).await
            }
            AppServices::Persistent { categories, .. } => {
                categories.update(caller, category_id, new_name).await
            }
        }
    }

    pub async fn delete_category(
        &self,
        caller: &OwnerId,
        category_id: CategoryId,
    ) -> DomainResult<()> {
        match self {
            AppServices::InMemory { categories, .. } => {
                categories.delete(caller, category_id).await
            }
            AppServices::Persistent { categories, .. } => {
                categories.delete(caller, category_id).await
            }
        }
    }

    pub async fn create_item(
        &self,
        caller: &OwnerId,
        category_name: &str,
        name: &str,
        initial_quantity: Option<i64>,
    ) -> DomainResult<ItemRow> {
        match self {
            AppServices::InMemory { items, .. } => {
                items.create(caller, category_name, name, initial_quantity).await
            }
            AppServices::Persistent { items, .. } => {
                items.create(caller, category_name, name, initial_quantity).await
            }
        }
    }

    pub async fn list_items(
        &self,
        caller: &OwnerId,
        category_name: &str,
    ) -> DomainResult<Vec<ItemWithStock>> {
        match self {
            AppServices::InMemory { items, .. } => {
                items.list_by_category(caller, category_name).await
            }
            AppServices::Persistent { items, .. } => {
                items.list_by_category(caller, category_name).await
            }
        }
    }

    pub async fn update_item(
        &self,
        caller: &OwnerId,
        item_id: ItemId,
        new_name: &str,
        category_name: &str,
        new_quantity: Option<i64>,
    ) -> DomainResult<ItemRow> {
        match self {
            AppServices::InMemory { items, .. } => {
                items.update(caller, item_id, new_name, category_name, new_quantity).await
            }
            AppServices::Persistent { items, .. } => {
                items.update(caller, item_id, new_name, category_name, new_quantity).await
            }
        }
    }

    pub async fn delete_item(&self, caller: &OwnerId, item_id: ItemId) -> DomainResult<()> {
        match self {
            AppServices::InMemory { items, .. } => items.delete(caller, item_id).await,
            AppServices::Persistent { items, .. } => items.delete(caller, item_id).await,
        }
    }

    pub async fn post_record(
        &self,
        caller: &OwnerId,
        request: PostStock,
    ) -> DomainResult<PostedStock> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.post(caller, request).await,
            AppServices::Persistent { ledger, .. } => ledger.post(caller, request).await,
        }
    }

    pub async fn record(&self, caller: &OwnerId, record_id: RecordId) -> DomainResult<RecordView> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.record(caller, record_id).await,
            AppServices::Persistent { ledger, .. } => ledger.record(caller, record_id).await,
        }
    }

    pub async fn item_records(
        &self,
        caller: &OwnerId,
        item_id: ItemId,
    ) -> DomainResult<Vec<RecordView>> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.records_for_item(caller, item_id).await,
            AppServices::Persistent { ledger, .. } => {
                ledger.records_for_item(caller, item_id).await
            }
        }
    }

    pub async fn history(&self, caller: &OwnerId) -> DomainResult<Vec<RecordView>> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.history(caller).await,
            AppServices::Persistent { ledger, .. } => ledger.history(caller).await,
        }
    }

    pub async fn delete_record(
        &self,
        caller: &OwnerId,
        record_id: RecordId,
    ) -> DomainResult<Vec<RecordId>> {
        match self {
            AppServices::InMemory { ledger, .. } => ledger.delete(caller, record_id).await,
            AppServices::Persistent { ledger, .. } => ledger.delete(caller, record_id).await,
        }
    }
}
