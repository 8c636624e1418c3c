use sqlx::{sqlite::SqliteRow, Row};

use fitlens_core::catalog::RawProductRow;

use super::{ProductCatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductCatalogRepository {
    pool: DbPool,
}

impl SqlProductCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductCatalogRepository for SqlProductCatalogRepository {
    async fn list_raw(&self) -> Result<Vec<RawProductRow>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                sku,
                name,
                category,
                brand,
                price,
                CAST(rating AS TEXT) AS rating
             FROM products
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(product_from_row).collect()
    }
}

fn product_from_row(row: SqliteRow) -> Result<RawProductRow, RepositoryError> {
    Ok(RawProductRow {
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        brand: row.try_get("brand")?,
        price: row.try_get("price")?,
        rating: row.try_get::<Option<String>, _>("rating")?.as_deref().map(parse_rating),
    })
}

/// Text that is not a number reads as NaN, which cleaning drops with the row.
fn parse_rating(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(f64::NAN)
}
