//! Batch segmentation job: order snapshot in, replaced segment collection out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use fitlens_core::config::SegmentationConfig;
use fitlens_core::errors::ApplicationError;
use fitlens_core::segmentation::artifacts::{load_model_set, load_thresholds};
use fitlens_core::segmentation::segment_customers;

use crate::repositories::{OrderRepository, SegmentRepository};

/// Structured result of one run. Failures are reported here, not swallowed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationOutcome {
    pub success: bool,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub orders_read: usize,
    pub customers_segmented: usize,
    pub normal_customers: usize,
    pub outlier_customers: usize,
    pub error_class: Option<String>,
    pub message: String,
}

#[derive(Default)]
struct RunCounts {
    orders_read: usize,
    customers_segmented: usize,
    normal_customers: usize,
    outlier_customers: usize,
}

pub struct SegmentationJob<'a> {
    orders: &'a dyn OrderRepository,
    segments: &'a dyn SegmentRepository,
    config: &'a SegmentationConfig,
}

impl<'a> SegmentationJob<'a> {
    pub fn new(
        orders: &'a dyn OrderRepository,
        segments: &'a dyn SegmentRepository,
        config: &'a SegmentationConfig,
    ) -> Self {
        Self { orders, segments, config }
    }

    pub async fn run(&self) -> SegmentationOutcome {
        self.run_at(Utc::now()).await
    }

    /// Runs against a fixed clock. Recency and `updated_at` both derive from `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> SegmentationOutcome {
        let run_id = Uuid::new_v4().to_string();
        info!(
            event_name = "segmentation.run.start",
            correlation_id = %run_id,
            qualifying_status = %self.config.qualifying_status,
            "starting segmentation run"
        );

        let mut counts = RunCounts::default();
        match self.execute(now, &mut counts).await {
            Ok(()) => {
                info!(
                    event_name = "segmentation.run.completed",
                    correlation_id = %run_id,
                    orders_read = counts.orders_read,
                    customers_segmented = counts.customers_segmented,
                    normal_customers = counts.normal_customers,
                    outlier_customers = counts.outlier_customers,
                    "segmentation run completed"
                );
                SegmentationOutcome {
                    success: true,
                    run_id,
                    started_at: now,
                    orders_read: counts.orders_read,
                    customers_segmented: counts.customers_segmented,
                    normal_customers: counts.normal_customers,
                    outlier_customers: counts.outlier_customers,
                    error_class: None,
                    message: format!("segmented {} customers", counts.customers_segmented),
                }
            }
            Err(error) => {
                warn!(
                    event_name = "segmentation.run.failed",
                    correlation_id = %run_id,
                    error_class = error.error_class(),
                    error = %error,
                    "segmentation run failed; segment store left untouched"
                );
                SegmentationOutcome {
                    success: false,
                    run_id,
                    started_at: now,
                    orders_read: counts.orders_read,
                    customers_segmented: 0,
                    normal_customers: 0,
                    outlier_customers: 0,
                    error_class: Some(error.error_class().to_string()),
                    message: error.to_string(),
                }
            }
        }
    }

    async fn execute(
        &self,
        now: DateTime<Utc>,
        counts: &mut RunCounts,
    ) -> Result<(), ApplicationError> {
        let thresholds = load_thresholds(&self.config.thresholds_path)?;
        let models = load_model_set(self.config)?;

        let orders = self.orders.list_by_status(&self.config.qualifying_status).await?;
        counts.orders_read = orders.len();

        let records =
            segment_customers(&orders, &self.config.qualifying_status, &thresholds, &models, now)?;
        let outliers = records.iter().filter(|record| record.is_outlier).count();

        self.segments.replace_all(&records).await?;

        counts.customers_segmented = records.len();
        counts.outlier_customers = outliers;
        counts.normal_customers = records.len() - outliers;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use fitlens_core::config::SegmentationConfig;
    use fitlens_core::segmentation::{CustomerId, OrderRecord};

    use super::SegmentationJob;
    use crate::repositories::{
        InMemoryOrderRepository, InMemorySegmentRepository, SegmentRepository,
        SqlOrderRepository, SqlSegmentRepository,
    };
    use crate::{connect_with_settings, migrations};

    fn write(path: &Path, body: &str) {
        fs::write(path, body).expect("write artifact");
    }

    fn artifacts(dir: &TempDir) -> SegmentationConfig {
        let thresholds = dir.path().join("thresholds.json");
        let normal = dir.path().join("normal.json");
        let outlier = dir.path().join("outlier.json");
        write(
            &thresholds,
            r#"{"frequency": {"lower": 1, "upper": 3}, "sales": {"lower": 0, "upper": 1000}}"#,
        );
        write(
            &normal,
            r#"{"scaler": {"mean": [100, 2, 30], "scale": [100, 1, 30]},
                "model": {"centroids": [[-1, -1, 1], [1, 1, -1]]}}"#,
        );
        write(
            &outlier,
            r#"{"scaler": {"mean": [5000, 20, 10], "scale": [2000, 10, 10]},
                "model": {"centroids": [[0, 0, 0]]}}"#,
        );
        SegmentationConfig {
            qualifying_status: "delivered".to_string(),
            thresholds_path: thresholds,
            normal_profile_path: normal,
            outlier_profile_path: outlier,
        }
    }

    fn order(customer: &str, amount: i64, placed_at: &str, status: &str) -> OrderRecord {
        OrderRecord {
            customer_id: CustomerId(customer.to_string()),
            amount: Decimal::new(amount, 0),
            placed_at: Some(placed_at.to_string()),
            status: status.to_string(),
        }
    }

    fn snapshot() -> Vec<OrderRecord> {
        vec![
            order("u-1", 40, "2026-01-01T00:00:00Z", "delivered"),
            order("u-2", 300, "2026-02-20 00:00:00", "delivered"),
            order("u-3", 1_500, "2026-02-25T00:00:00Z", "delivered"),
            order("u-4", 75, "2026-02-01T00:00:00Z", "cancelled"),
        ]
    }

    #[tokio::test]
    async fn successful_run_replaces_segments_and_reports_counts() {
        let dir = TempDir::new().expect("tempdir");
        let config = artifacts(&dir);
        let orders = InMemoryOrderRepository::with_orders(snapshot());
        let segments = InMemorySegmentRepository::default();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        let outcome = SegmentationJob::new(&orders, &segments, &config).run_at(now).await;

        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.error_class, None);
        assert_eq!(outcome.orders_read, 3);
        assert_eq!(outcome.customers_segmented, 3);
        assert_eq!(outcome.outlier_customers, 1);
        assert_eq!(outcome.normal_customers, 2);

        let stored = segments.list_all().await.expect("list");
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|record| record.updated_at == now));
        assert!(stored.iter().any(|record| record.customer_id.0 == "u-3" && record.is_outlier));
    }

    #[tokio::test]
    async fn missing_artifact_fails_with_configuration_class() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = artifacts(&dir);
        config.outlier_profile_path = dir.path().join("absent.json");
        let orders = InMemoryOrderRepository::with_orders(snapshot());
        let segments = InMemorySegmentRepository::default();

        let outcome = SegmentationJob::new(&orders, &segments, &config).run().await;

        assert!(!outcome.success);
        assert_eq!(outcome.error_class.as_deref(), Some("configuration"));
        assert!(outcome.message.contains("absent.json"));
        assert!(segments.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn empty_snapshot_is_a_data_failure_and_keeps_previous_segments() {
        let dir = TempDir::new().expect("tempdir");
        let config = artifacts(&dir);
        let segments = InMemorySegmentRepository::default();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        let seeded = InMemoryOrderRepository::with_orders(snapshot());
        assert!(SegmentationJob::new(&seeded, &segments, &config).run_at(now).await.success);

        let empty = InMemoryOrderRepository::default();
        let outcome = SegmentationJob::new(&empty, &segments, &config).run_at(now).await;

        assert!(!outcome.success);
        assert_eq!(outcome.error_class.as_deref(), Some("data"));
        assert_eq!(segments.list_all().await.expect("list").len(), 3);
    }

    #[tokio::test]
    async fn unreadable_order_amount_is_a_data_failure() {
        let dir = TempDir::new().expect("tempdir");
        let config = artifacts(&dir);
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        sqlx::query(
            "INSERT INTO orders (id, customer_id, total_amount, status, created_at) VALUES
                ('o-1', 'u-1', '12,50 MAD', 'delivered', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert order");

        let orders = SqlOrderRepository::new(pool.clone());
        let segments = SqlSegmentRepository::new(pool);
        let outcome = SegmentationJob::new(&orders, &segments, &config).run().await;

        assert!(!outcome.success);
        assert_eq!(outcome.error_class.as_deref(), Some("data"));
        assert!(outcome.message.contains("total_amount"));
        assert!(segments.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn sqlite_backed_runs_are_deterministic() {
        let dir = TempDir::new().expect("tempdir");
        let config = artifacts(&dir);
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        sqlx::query(
            "INSERT INTO orders (id, customer_id, total_amount, status, created_at) VALUES
                ('o-1', 'u-1', '40', 'delivered', '2026-01-01T00:00:00Z'),
                ('o-2', 'u-2', '300.00', 'delivered', '2026-02-20 00:00:00'),
                ('o-3', 'u-2', '250.00', 'delivered', '2026-02-27T00:00:00+01:00'),
                ('o-4', 'u-3', '1500', 'delivered', '2026-02-25T00:00:00Z'),
                ('o-5', 'u-4', '75', 'returned', '2026-02-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert orders");

        let orders = SqlOrderRepository::new(pool.clone());
        let segments = SqlSegmentRepository::new(pool);
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let job = SegmentationJob::new(&orders, &segments, &config);

        let first_outcome = job.run_at(now).await;
        let first = segments.list_all().await.expect("first list");
        let second_outcome = job.run_at(now).await;
        let second = segments.list_all().await.expect("second list");

        assert!(first_outcome.success && second_outcome.success);
        assert_ne!(first_outcome.run_id, second_outcome.run_id);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        let u2 = first.iter().find(|record| record.customer_id.0 == "u-2").expect("u-2");
        assert_eq!(u2.frequency, 2);
        assert_eq!(u2.sales, Decimal::new(550, 0));
        assert_eq!(u2.recency, 2);
    }
}
