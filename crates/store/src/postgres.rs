//! PostgreSQL storage backend.
//!
//! DDL lives in `schema.sql` next to this crate's manifest. The row-level
//! guarantees the in-memory backend gets from its single lock are recovered
//! here with narrower tools: a `FOR UPDATE` lock on the source row
//! serializes competing outbound postings, a per-owner advisory lock
//! serializes category creation against the capacity count, and partial
//! unique indexes back the name-uniqueness checks so a lost race surfaces
//! as a unique violation instead of a duplicate row.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::Transaction;
use stockbook_core::{
    message, CategoryId, DomainError, DomainResult, EntityName, ItemId, OwnerId, RecordId,
};
use uuid::Uuid;

use crate::repo::{CategoryRepo, ItemRepo, RecordRepo};
use crate::row::{
    CategoryCreated, CategoryRow, ItemRow, RecordKind, RecordRow, RecordView, StockIssue,
    StockReceipt, MAX_ACTIVE_CATEGORIES,
};

const CATEGORY_COLUMNS: &str = "id, owner_id, name, deleted, updated_at";
const ITEM_COLUMNS: &str = "id, owner_id, category_id, name, deleted, updated_at";
const RECORD_COLUMNS: &str =
    "id, owner_id, item_id, kind, quantity, price, expiration_date, source_record_id, created_at, seq";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Storage-layer failures all surface as `Unavailable`; the caller cannot
/// act on the difference between a dead pool and a dropped connection.
fn map_sqlx_error(err: sqlx::Error) -> DomainError {
    tracing::error!(error = %err, "storage operation failed");
    DomainError::unavailable(message::STORAGE_UNAVAILABLE)
}

/// Like `map_sqlx_error`, but a unique violation becomes the given
/// `Conflict`. Used on inserts raced past their in-transaction checks.
fn map_unique_violation(conflict: &str, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some("23505") {
            return DomainError::conflict(conflict);
        }
    }
    map_sqlx_error(err)
}

/// Serializes every mutation for one owner. Guards the read-then-write
/// shape of the capacity and resurrection checks, which no row lock can
/// cover because the interesting row may not exist yet.
async fn lock_owner(tx: &mut Transaction<'_, Postgres>, owner: &OwnerId) -> DomainResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(owner.as_str())
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

fn owner_ids(owners: &[OwnerId]) -> Vec<String> {
    owners.iter().map(|o| o.as_str().to_owned()).collect()
}

fn parse_kind(raw: &str) -> DomainResult<RecordKind> {
    match raw {
        "IN" => Ok(RecordKind::In),
        "OUT" => Ok(RecordKind::Out),
        other => {
            tracing::error!(kind = other, "unrecognized ledger kind in storage");
            Err(DomainError::unavailable(message::STORAGE_UNAVAILABLE))
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRecord {
    id: Uuid,
    owner_id: String,
    name: String,
    deleted: bool,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRecord> for CategoryRow {
    fn from(rec: CategoryRecord) -> Self {
        CategoryRow {
            id: CategoryId::from_uuid(rec.id),
            owner: OwnerId::new(rec.owner_id),
            name: rec.name,
            deleted: rec.deleted,
            updated_at: rec.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRecord {
    id: Uuid,
    owner_id: String,
    category_id: Uuid,
    name: String,
    deleted: bool,
    updated_at: DateTime<Utc>,
}

impl From<ItemRecord> for ItemRow {
    fn from(rec: ItemRecord) -> Self {
        ItemRow {
            id: ItemId::from_uuid(rec.id),
            owner: OwnerId::new(rec.owner_id),
            category_id: CategoryId::from_uuid(rec.category_id),
            name: rec.name,
            deleted: rec.deleted,
            updated_at: rec.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerRecord {
    id: Uuid,
    owner_id: String,
    item_id: Uuid,
    kind: String,
    quantity: i64,
    price: Option<i64>,
    expiration_date: Option<NaiveDate>,
    source_record_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    seq: i64,
}

impl TryFrom<LedgerRecord> for RecordRow {
    type Error = DomainError;

    fn try_from(rec: LedgerRecord) -> DomainResult<Self> {
        Ok(RecordRow {
            id: RecordId::from_uuid(rec.id),
            owner: OwnerId::new(rec.owner_id),
            item_id: ItemId::from_uuid(rec.item_id),
            kind: parse_kind(&rec.kind)?,
            quantity: rec.quantity,
            price: rec.price,
            expiration_date: rec.expiration_date,
            source_record_id: rec.source_record_id.map(RecordId::from_uuid),
            created_at: rec.created_at,
            seq: rec.seq,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LedgerViewRecord {
    id: Uuid,
    owner_id: String,
    item_id: Uuid,
    kind: String,
    quantity: i64,
    price: Option<i64>,
    expiration_date: Option<NaiveDate>,
    source_record_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    seq: i64,
    item_name: String,
    category_name: String,
}

impl TryFrom<LedgerViewRecord> for RecordView {
    type Error = DomainError;

    fn try_from(rec: LedgerViewRecord) -> DomainResult<Self> {
        let record = RecordRow {
            id: RecordId::from_uuid(rec.id),
            owner: OwnerId::new(rec.owner_id),
            item_id: ItemId::from_uuid(rec.item_id),
            kind: parse_kind(&rec.kind)?,
            quantity: rec.quantity,
            price: rec.price,
            expiration_date: rec.expiration_date,
            source_record_id: rec.source_record_id.map(RecordId::from_uuid),
            created_at: rec.created_at,
            seq: rec.seq,
        };
        Ok(RecordView {
            record,
            item_name: rec.item_name,
            category_name: rec.category_name,
        })
    }
}

fn view_query(filter: &str) -> String {
    format!(
        "SELECT r.id, r.owner_id, r.item_id, r.kind, r.quantity, r.price, \
         r.expiration_date, r.source_record_id, r.created_at, r.seq, \
         i.name AS item_name, c.name AS category_name \
         FROM item_records r \
         JOIN items i ON i.id = r.item_id \
         JOIN categories c ON c.id = i.category_id \
         WHERE {filter}"
    )
}

#[async_trait]
impl CategoryRepo for PostgresStore {
    async fn find_by_id(
        &self,
        owners: &[OwnerId],
        id: CategoryId,
    ) -> DomainResult<Option<CategoryRow>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE id = $1 AND owner_id = ANY($2) AND NOT deleted"
        );
        let row: Option<CategoryRecord> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(owner_ids(owners))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(CategoryRow::from))
    }

    async fn find_by_owners(&self, owners: &[OwnerId]) -> DomainResult<Vec<CategoryRow>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE owner_id = ANY($1) AND NOT deleted"
        );
        let rows: Vec<CategoryRecord> = sqlx::query_as(&sql)
            .bind(owner_ids(owners))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(CategoryRow::from).collect())
    }

    async fn find_by_name(
        &self,
        owners: &[OwnerId],
        name: &str,
    ) -> DomainResult<Option<CategoryRow>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE owner_id = $1 AND name = $2 AND NOT deleted"
        );
        // Owners are tried in precedence order, first hit wins.
        for owner in owners {
            let row: Option<CategoryRecord> = sqlx::query_as(&sql)
                .bind(owner.as_str())
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            if let Some(rec) = row {
                return Ok(Some(rec.into()));
            }
        }
        Ok(None)
    }

    async fn exists_by_owner_and_name(&self, owner: &OwnerId, name: &str) -> DomainResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories \
             WHERE owner_id = $1 AND name = $2 AND NOT deleted)",
        )
        .bind(owner.as_str())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(exists)
    }

    async fn create(&self, owner: &OwnerId, name: &EntityName) -> DomainResult<CategoryCreated> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        lock_owner(&mut tx, owner).await?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM categories WHERE owner_id = $1 AND NOT deleted",
        )
        .bind(owner.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if active >= MAX_ACTIVE_CATEGORIES as i64 {
            return Err(DomainError::conflict(message::CATEGORY_LIMIT_REACHED));
        }

        // Active namesake sorts first; otherwise prefer the freshest grave.
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE owner_id = $1 AND name = $2 \
             ORDER BY deleted ASC, updated_at DESC LIMIT 1"
        );
        let existing: Option<CategoryRecord> = sqlx::query_as(&sql)
            .bind(owner.as_str())
            .bind(name.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        match existing {
            Some(rec) if !rec.deleted => Err(DomainError::conflict(message::CATEGORY_NAME_TAKEN)),
            Some(grave) => {
                let sql = format!(
                    "UPDATE categories SET deleted = FALSE, updated_at = NOW() \
                     WHERE id = $1 RETURNING {CATEGORY_COLUMNS}"
                );
                let rec: CategoryRecord = sqlx::query_as(&sql)
                    .bind(grave.id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_sqlx_error)?;
                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(CategoryCreated {
                    row: rec.into(),
                    resurrected: true,
                })
            }
            None => {
                let sql = format!(
                    "INSERT INTO categories (id, owner_id, name, deleted, updated_at) \
                     VALUES ($1, $2, $3, FALSE, NOW()) RETURNING {CATEGORY_COLUMNS}"
                );
                let rec: CategoryRecord = sqlx::query_as(&sql)
                    .bind(CategoryId::new().as_uuid())
                    .bind(owner.as_str())
                    .bind(name.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| map_unique_violation(message::CATEGORY_NAME_TAKEN, e))?;
                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(CategoryCreated {
                    row: rec.into(),
                    resurrected: false,
                })
            }
        }
    }

    async fn rename(
        &self,
        owner: &OwnerId,
        id: CategoryId,
        name: &EntityName,
    ) -> DomainResult<CategoryRow> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        lock_owner(&mut tx, owner).await?;

        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories \
             WHERE id = $1 AND owner_id = $2 AND NOT deleted)",
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if !owned {
            return Err(DomainError::not_found(message::CATEGORY_NOT_FOUND));
        }

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM categories \
             WHERE owner_id = $1 AND name = $2 AND id <> $3 AND NOT deleted)",
        )
        .bind(owner.as_str())
        .bind(name.as_str())
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if taken {
            return Err(DomainError::conflict(message::CATEGORY_NAME_TAKEN));
        }

        let sql = format!(
            "UPDATE categories SET name = $1, updated_at = NOW() \
             WHERE id = $2 RETURNING {CATEGORY_COLUMNS}"
        );
        let rec: CategoryRecord = sqlx::query_as(&sql)
            .bind(name.as_str())
            .bind(id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(message::CATEGORY_NAME_TAKEN, e))?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(rec.into())
    }

    async fn delete(&self, owner: &OwnerId, id: CategoryId) -> DomainResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Lock the row so item registration under this category waits.
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories \
             WHERE id = $1 AND owner_id = $2 AND NOT deleted FOR UPDATE"
        );
        let row: Option<CategoryRecord> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(owner.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if row.is_none() {
            return Err(DomainError::not_found(message::CATEGORY_NOT_FOUND));
        }

        let occupied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM items WHERE category_id = $1 AND NOT deleted)",
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if occupied {
            return Err(DomainError::invalid_operation(
                message::CATEGORY_HAS_ACTIVE_ITEMS,
            ));
        }

        sqlx::query("UPDATE categories SET deleted = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn save(&self, row: CategoryRow) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO categories (id, owner_id, name, deleted, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
             owner_id = EXCLUDED.owner_id, name = EXCLUDED.name, \
             deleted = EXCLUDED.deleted, updated_at = EXCLUDED.updated_at",
        )
        .bind(row.id.as_uuid())
        .bind(row.owner.as_str())
        .bind(&row.name)
        .bind(row.deleted)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl ItemRepo for PostgresStore {
    async fn find_by_id(&self, owners: &[OwnerId], id: ItemId) -> DomainResult<Option<ItemRow>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE id = $1 AND owner_id = ANY($2) AND NOT deleted"
        );
        let row: Option<ItemRecord> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(owner_ids(owners))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(ItemRow::from))
    }

    async fn find_by_category(
        &self,
        owners: &[OwnerId],
        category_id: CategoryId,
    ) -> DomainResult<Vec<ItemRow>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE category_id = $1 AND owner_id = ANY($2) AND NOT deleted"
        );
        let rows: Vec<ItemRecord> = sqlx::query_as(&sql)
            .bind(category_id.as_uuid())
            .bind(owner_ids(owners))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(ItemRow::from).collect())
    }

    async fn exists_by_owner_and_name(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        name: &str,
    ) -> DomainResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM items \
             WHERE owner_id = $1 AND category_id = $2 AND name = $3 AND NOT deleted)",
        )
        .bind(owner.as_str())
        .bind(category_id.as_uuid())
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(exists)
    }

    async fn create(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        name: &EntityName,
    ) -> DomainResult<ItemRow> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Share-lock the category so its delete cannot slip between the
        // liveness check and the insert.
        let live: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM categories WHERE id = $1 AND NOT deleted FOR SHARE",
        )
        .bind(category_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if live.is_none() {
            return Err(DomainError::not_found(message::CATEGORY_NOT_FOUND));
        }

        let sql = format!(
            "INSERT INTO items (id, owner_id, category_id, name, deleted, updated_at) \
             VALUES ($1, $2, $3, $4, FALSE, NOW()) RETURNING {ITEM_COLUMNS}"
        );
        let rec: ItemRecord = sqlx::query_as(&sql)
            .bind(ItemId::new().as_uuid())
            .bind(owner.as_str())
            .bind(category_id.as_uuid())
            .bind(name.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(message::ITEM_NAME_TAKEN, e))?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(rec.into())
    }

    async fn rename(
        &self,
        owner: &OwnerId,
        category_id: CategoryId,
        id: ItemId,
        name: &EntityName,
    ) -> DomainResult<ItemRow> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE id = $1 AND owner_id = $2 AND category_id = $3 AND NOT deleted FOR UPDATE"
        );
        let row: Option<ItemRecord> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(owner.as_str())
            .bind(category_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if row.is_none() {
            return Err(DomainError::not_found(message::ITEM_NOT_FOUND));
        }

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM items \
             WHERE owner_id = $1 AND category_id = $2 AND name = $3 AND id <> $4 AND NOT deleted)",
        )
        .bind(owner.as_str())
        .bind(category_id.as_uuid())
        .bind(name.as_str())
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if taken {
            return Err(DomainError::conflict(message::ITEM_NAME_TAKEN));
        }

        let sql = format!(
            "UPDATE items SET name = $1, updated_at = NOW() \
             WHERE id = $2 RETURNING {ITEM_COLUMNS}"
        );
        let rec: ItemRecord = sqlx::query_as(&sql)
            .bind(name.as_str())
            .bind(id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(message::ITEM_NAME_TAKEN, e))?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(rec.into())
    }

    async fn delete(&self, owner: &OwnerId, id: ItemId) -> DomainResult<()> {
        let done = sqlx::query(
            "UPDATE items SET deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 AND NOT deleted",
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        if done.rows_affected() == 0 {
            return Err(DomainError::not_found(message::ITEM_NOT_FOUND));
        }
        Ok(())
    }

    async fn save(&self, row: ItemRow) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO items (id, owner_id, category_id, name, deleted, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET \
             owner_id = EXCLUDED.owner_id, category_id = EXCLUDED.category_id, \
             name = EXCLUDED.name, deleted = EXCLUDED.deleted, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(row.id.as_uuid())
        .bind(row.owner.as_str())
        .bind(row.category_id.as_uuid())
        .bind(&row.name)
        .bind(row.deleted)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl RecordRepo for PostgresStore {
    async fn find_by_id(
        &self,
        owner: &OwnerId,
        id: RecordId,
    ) -> DomainResult<Option<RecordView>> {
        let sql = view_query("r.id = $1 AND r.owner_id = $2");
        let row: Option<LedgerViewRecord> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(RecordView::try_from).transpose()
    }

    async fn history(&self, owner: &OwnerId) -> DomainResult<Vec<RecordView>> {
        let sql = view_query("r.owner_id = $1");
        let rows: Vec<LedgerViewRecord> = sqlx::query_as(&sql)
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(RecordView::try_from).collect()
    }

    async fn records_for_item(
        &self,
        owner: &OwnerId,
        item_id: ItemId,
    ) -> DomainResult<Vec<RecordView>> {
        let sql = view_query("r.owner_id = $1 AND r.item_id = $2");
        let rows: Vec<LedgerViewRecord> = sqlx::query_as(&sql)
            .bind(owner.as_str())
            .bind(item_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.into_iter().map(RecordView::try_from).collect()
    }

    async fn append_in(&self, receipt: StockReceipt) -> DomainResult<RecordRow> {
        let sql = format!(
            "INSERT INTO item_records \
             (id, owner_id, item_id, kind, quantity, price, expiration_date, source_record_id) \
             VALUES ($1, $2, $3, 'IN', $4, $5, $6, NULL) RETURNING {RECORD_COLUMNS}"
        );
        let rec: LedgerRecord = sqlx::query_as(&sql)
            .bind(RecordId::new().as_uuid())
            .bind(receipt.owner.as_str())
            .bind(receipt.item_id.as_uuid())
            .bind(receipt.quantity)
            .bind(receipt.price)
            .bind(receipt.expiration_date)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rec.try_into()
    }

    async fn append_out(&self, issue: StockIssue) -> DomainResult<RecordRow> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Row lock on the source: competing issues queue here and the
        // second one recomputes against the first one's committed child.
        let source: Option<(Uuid, String, i64)> = sqlx::query_as(
            "SELECT item_id, kind, quantity FROM item_records \
             WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(issue.source_record_id.as_uuid())
        .bind(issue.owner.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        let (source_item, source_kind, source_quantity) = match source {
            Some(head) => head,
            None => return Err(DomainError::not_found(message::RECORD_NOT_FOUND)),
        };
        if source_item != *issue.item_id.as_uuid() {
            return Err(DomainError::conflict(message::RECORD_ITEM_MISMATCH));
        }
        if parse_kind(&source_kind)? != RecordKind::In {
            return Err(DomainError::conflict(message::RECORD_NOT_FOUND));
        }

        let drawn: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM item_records WHERE source_record_id = $1",
        )
        .bind(issue.source_record_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if source_quantity - drawn < issue.quantity {
            return Err(DomainError::conflict(message::INSUFFICIENT_STOCK));
        }

        let sql = format!(
            "INSERT INTO item_records \
             (id, owner_id, item_id, kind, quantity, price, expiration_date, source_record_id) \
             VALUES ($1, $2, $3, 'OUT', $4, NULL, NULL, $5) RETURNING {RECORD_COLUMNS}"
        );
        let rec: LedgerRecord = sqlx::query_as(&sql)
            .bind(RecordId::new().as_uuid())
            .bind(issue.owner.as_str())
            .bind(issue.item_id.as_uuid())
            .bind(issue.quantity)
            .bind(issue.source_record_id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;
        rec.try_into()
    }

    async fn remaining_quantity(
        &self,
        owner: &OwnerId,
        id: RecordId,
    ) -> DomainResult<Option<i64>> {
        let remaining: Option<i64> = sqlx::query_scalar(
            "SELECT r.quantity - COALESCE(SUM(c.quantity), 0) \
             FROM item_records r \
             LEFT JOIN item_records c ON c.source_record_id = r.id \
             WHERE r.id = $1 AND r.owner_id = $2 AND r.kind = 'IN' \
             GROUP BY r.id, r.quantity",
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(remaining)
    }

    async fn net_quantity(&self, owner: &OwnerId, item_id: ItemId) -> DomainResult<i64> {
        let net: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(CASE WHEN kind = 'IN' THEN quantity ELSE -quantity END), 0) \
             FROM item_records WHERE owner_id = $1 AND item_id = $2",
        )
        .bind(owner.as_str())
        .bind(item_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(net)
    }

    async fn delete(&self, owner: &OwnerId, id: RecordId) -> DomainResult<Vec<RecordId>> {
        let victims: Vec<(Uuid,)> = sqlx::query_as(
            "WITH victims AS ( \
                 DELETE FROM item_records \
                 WHERE owner_id = $2 AND (id = $1 OR source_record_id = $1) \
                 RETURNING id \
             ) SELECT id FROM victims",
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        if victims.is_empty() {
            return Err(DomainError::not_found(message::RECORD_NOT_FOUND));
        }
        let mut deleted: Vec<RecordId> =
            victims.into_iter().map(|(v,)| RecordId::from_uuid(v)).collect();
        // Requested id first, children after.
        deleted.sort_by_key(|r| *r != id);
        Ok(deleted)
    }
}
