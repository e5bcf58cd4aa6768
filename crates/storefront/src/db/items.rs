//! Item repository: catalog queries, listing filters and item images.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use bazaar_core::{CategoryId, ItemId, ItemImageId, Money, PageWindow, UserId};

use super::RepositoryError;
use crate::models::{Item, ItemImage, ItemSummary, NewItem, UpdateItem};

/// Columns selected for a full [`Item`].
const ITEM_COLUMNS: &str = r"
    SELECT i.id, i.category_id, c.name AS category_name, i.name, i.description,
           i.price_cents, i.stock, i.created_by, u.username AS created_by_username,
           i.created_at
    FROM item i
    JOIN category c ON c.id = i.category_id
    JOIN user_account u ON u.id = i.created_by
";

/// Columns selected for an [`ItemSummary`].
const SUMMARY_COLUMNS: &str = r"
    SELECT i.id, i.name, i.price_cents, i.stock,
           (SELECT path FROM item_image im WHERE im.item_id = i.id
            ORDER BY im.position LIMIT 1) AS image
    FROM item i
";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: ItemId,
    category_id: CategoryId,
    category_name: String,
    name: String,
    description: Option<String>,
    price_cents: i64,
    stock: i64,
    created_by: UserId,
    created_by_username: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = RepositoryError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            category_id: row.category_id,
            category_name: row.category_name,
            name: row.name,
            description: row.description,
            price: Money::from_cents(row.price_cents),
            stock: stock_from_db(row.id, row.stock)?,
            created_by: row.created_by,
            created_by_username: row.created_by_username,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: ItemId,
    name: String,
    price_cents: i64,
    stock: i64,
    image: Option<String>,
}

impl TryFrom<SummaryRow> for ItemSummary {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            stock: stock_from_db(row.id, row.stock)?,
            image: row.image,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: ItemImageId,
    item_id: ItemId,
    path: String,
    position: i64,
}

impl TryFrom<ImageRow> for ItemImage {
    type Error = RepositoryError;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        let position = u8::try_from(row.position).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid image position {}", row.position))
        })?;
        Ok(Self {
            id: row.id,
            item_id: row.item_id,
            path: row.path,
            position,
        })
    }
}

fn stock_from_db(id: ItemId, stock: i64) -> Result<u32, RepositoryError> {
    u32::try_from(stock)
        .map_err(|_| RepositoryError::DataCorruption(format!("item {id} has invalid stock {stock}")))
}

fn to_sql_int(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// =============================================================================
// Browse Filter
// =============================================================================

/// Catalog browse filter. Only unsold items are ever listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseFilter {
    /// Case-insensitive substring of name or description.
    pub query: Option<String>,
    /// Restrict to these categories; empty means all.
    pub categories: Vec<CategoryId>,
}

impl BrowseFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE i.stock > 0");

        if !self.categories.is_empty() {
            qb.push(" AND i.category_id IN (");
            let mut ids = qb.separated(", ");
            for id in &self.categories {
                ids.push_bind(*id);
            }
            ids.push_unseparated(")");
        }

        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", escape_like(query));
            qb.push(r" AND (i.name LIKE ")
                .push_bind(pattern.clone())
                .push(r" ESCAPE '\' OR i.description LIKE ")
                .push_bind(pattern)
                .push(r" ESCAPE '\')");
        }
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for item database operations.
pub struct ItemRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new item repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Count items matching a browse filter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_browse(&self, filter: &BrowseFilter) -> Result<u64, RepositoryError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM item i");
        filter.push_where(&mut qb);

        let count: i64 = qb.build_query_scalar().fetch_one(self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// One page of items matching a browse filter, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn browse(
        &self,
        filter: &BrowseFilter,
        page: &PageWindow,
    ) -> Result<Vec<ItemSummary>, RepositoryError> {
        let mut qb = QueryBuilder::new(SUMMARY_COLUMNS);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY i.id LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(to_sql_int(page.offset));

        let rows: Vec<SummaryRow> = qb.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Newest unsold items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self, limit: u32) -> Result<Vec<ItemSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_COLUMNS} WHERE i.stock > 0 ORDER BY i.created_at DESC, i.id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Unsold items in the same category as `item`, excluding it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related(&self, item: &Item, limit: u32) -> Result<Vec<ItemSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_COLUMNS} WHERE i.stock > 0 AND i.category_id = ? AND i.id <> ? \
             ORDER BY i.id LIMIT ?"
        ))
        .bind(item.category_id)
        .bind(item.id)
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Count items created by a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_owner(&self, owner: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM item WHERE created_by = ?")
            .bind(owner)
            .fetch_one(self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// One page of items created by a user, sold or not, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_owner(
        &self,
        owner: UserId,
        page: &PageWindow,
    ) -> Result<Vec<ItemSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(&format!(
            "{SUMMARY_COLUMNS} WHERE i.created_by = ? ORDER BY i.id LIMIT ? OFFSET ?"
        ))
        .bind(owner)
        .bind(i64::from(page.limit))
        .bind(to_sql_int(page.offset))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get an item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ItemId) -> Result<Option<Item>, RepositoryError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!("{ITEM_COLUMNS} WHERE i.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Images of an item, primary first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn images(&self, id: ItemId) -> Result<Vec<ItemImage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT id, item_id, path, position FROM item_image WHERE item_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every item, ordered by ID, for export.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!("{ITEM_COLUMNS} ORDER BY i.id"))
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Insert an item and its images (stored paths, in display order).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails; nothing is
    /// persisted in that case.
    pub async fn create(&self, item: &NewItem, image_paths: &[String]) -> Result<ItemId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: ItemId = sqlx::query_scalar(
            r"
            INSERT INTO item (category_id, name, description, price_cents, stock, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(item.category_id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.cents())
        .bind(i64::from(item.stock))
        .bind(item.created_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for (position, path) in (0_i64..).zip(image_paths) {
            sqlx::query("INSERT INTO item_image (item_id, path, position) VALUES (?, ?, ?)")
                .bind(id)
                .bind(path)
                .bind(position)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Update an item's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn update(&self, id: ItemId, update: &UpdateItem) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE item
            SET name = ?, description = ?, price_cents = ?, stock = ?
            WHERE id = ?
            ",
        )
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.price.cents())
        .bind(i64::from(update.stock))
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an item and its image rows, returning the image paths so the
    /// caller can remove the files.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    pub async fn delete(&self, id: ItemId) -> Result<Vec<String>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let paths: Vec<String> =
            sqlx::query_scalar("SELECT path FROM item_image WHERE item_id = ? ORDER BY position")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM item WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(paths)
    }
}
