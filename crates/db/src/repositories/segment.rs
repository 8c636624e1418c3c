use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use fitlens_core::segmentation::{CustomerId, SegmentRecord, SegmentSummary};

use super::{RepositoryError, SegmentRepository};
use crate::DbPool;

pub struct SqlSegmentRepository {
    pool: DbPool,
}

impl SqlSegmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SegmentRepository for SqlSegmentRepository {
    async fn replace_all(&self, records: &[SegmentRecord]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM customer_segments").execute(&mut *tx).await?;

        let mut written = 0_u64;
        for record in records {
            sqlx::query(
                "INSERT INTO customer_segments (
                    customer_id,
                    recency,
                    frequency,
                    sales,
                    is_outlier,
                    cluster,
                    updated_at
                 ) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.customer_id.0)
            .bind(record.recency)
            .bind(i64::from(record.frequency))
            .bind(record.sales.to_string())
            .bind(record.is_outlier)
            .bind(i64::from(record.cluster))
            .bind(record.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn list_all(&self) -> Result<Vec<SegmentRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                customer_id,
                recency,
                frequency,
                sales,
                is_outlier,
                cluster,
                updated_at
             FROM customer_segments
             ORDER BY customer_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(segment_from_row).collect()
    }

    async fn summary(&self) -> Result<Vec<SegmentSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                cluster,
                COUNT(*) AS customer_count,
                AVG(CAST(sales AS REAL)) AS avg_sales,
                AVG(frequency) AS avg_frequency,
                AVG(recency) AS avg_recency,
                MAX(updated_at) AS last_updated
             FROM customer_segments
             GROUP BY cluster
             ORDER BY cluster ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(summary_from_row).collect()
    }
}

fn segment_from_row(row: SqliteRow) -> Result<SegmentRecord, RepositoryError> {
    let sales_raw: String = row.try_get("sales")?;
    let sales = Decimal::from_str(&sales_raw).map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `sales`: `{sales_raw}` ({error})"))
    })?;

    Ok(SegmentRecord {
        customer_id: CustomerId(row.try_get("customer_id")?),
        recency: row.try_get("recency")?,
        frequency: parse_u32("frequency", row.try_get("frequency")?)?,
        sales,
        is_outlier: row.try_get("is_outlier")?,
        cluster: parse_u32("cluster", row.try_get("cluster")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn summary_from_row(row: SqliteRow) -> Result<SegmentSummary, RepositoryError> {
    let customer_count: i64 = row.try_get("customer_count")?;
    let last_updated: Option<String> = row.try_get("last_updated")?;

    Ok(SegmentSummary {
        cluster: parse_u32("cluster", row.try_get("cluster")?)?,
        customer_count: u64::try_from(customer_count).map_err(|_| {
            RepositoryError::Decode(format!("negative customer_count: {customer_count}"))
        })?,
        avg_sales: row.try_get("avg_sales")?,
        avg_frequency: row.try_get("avg_frequency")?,
        avg_recency: row.try_get("avg_recency")?,
        last_updated: last_updated.map(|value| parse_timestamp("last_updated", value)).transpose()?,
    })
}

fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}
