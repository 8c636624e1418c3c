use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use fitlens_core::segmentation::{CustomerId, OrderRecord};

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn list_by_status(&self, status: &str) -> Result<Vec<OrderRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                customer_id,
                total_amount,
                status,
                created_at
             FROM orders
             WHERE status = ?
             ORDER BY customer_id ASC, id ASC",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(order_from_row).collect()
    }
}

fn order_from_row(row: SqliteRow) -> Result<OrderRecord, RepositoryError> {
    let amount_raw: String = row.try_get("total_amount")?;
    let customer_id: String = row.try_get("customer_id")?;
    let amount = Decimal::from_str(amount_raw.trim()).map_err(|error| {
        RepositoryError::InvalidRecord(format!(
            "invalid decimal in `total_amount` for customer `{customer_id}`: `{amount_raw}` \
             ({error})"
        ))
    })?;

    Ok(OrderRecord {
        customer_id: CustomerId(customer_id),
        amount,
        placed_at: row.try_get("created_at")?,
        status: row.try_get("status")?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::SqlOrderRepository;
    use crate::migrations;
    use crate::repositories::{OrderRepository, RepositoryError};
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn insert_order(
        pool: &DbPool,
        id: &str,
        customer: &str,
        amount: &str,
        status: &str,
        created_at: Option<&str>,
    ) {
        sqlx::query(
            "INSERT INTO orders (id, customer_id, total_amount, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(customer)
        .bind(amount)
        .bind(status)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("insert order");
    }

    #[tokio::test]
    async fn list_by_status_filters_and_orders_by_customer() {
        let pool = setup_pool().await;
        insert_order(&pool, "o-3", "u-2", "15.50", "delivered", Some("2026-02-01 10:00:00")).await;
        insert_order(&pool, "o-1", "u-1", "100", "delivered", Some("2026-01-01T00:00:00Z")).await;
        insert_order(&pool, "o-2", "u-1", "20", "cancelled", Some("2026-01-02T00:00:00Z")).await;
        insert_order(&pool, "o-4", "u-3", "7", "delivered", None).await;

        let repo = SqlOrderRepository::new(pool);
        let orders = repo.list_by_status("delivered").await.expect("list");

        let customers: Vec<&str> =
            orders.iter().map(|order| order.customer_id.0.as_str()).collect();
        assert_eq!(customers, vec!["u-1", "u-2", "u-3"]);
        assert_eq!(orders[1].amount, Decimal::new(1_550, 2));
        assert_eq!(orders[1].placed_at.as_deref(), Some("2026-02-01 10:00:00"));
        assert_eq!(orders[2].placed_at, None);
        assert!(orders.iter().all(|order| order.status == "delivered"));
    }

    #[tokio::test]
    async fn malformed_amount_is_an_invalid_record() {
        let pool = setup_pool().await;
        insert_order(&pool, "o-1", "u-1", "twelve", "delivered", Some("2026-01-01")).await;

        let repo = SqlOrderRepository::new(pool);
        let result = repo.list_by_status("delivered").await;

        match result {
            Err(RepositoryError::InvalidRecord(message)) => assert!(message.contains("u-1")),
            other => panic!("expected invalid record error, got {other:?}"),
        }
    }
}
