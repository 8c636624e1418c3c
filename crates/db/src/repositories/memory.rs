use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use tokio::sync::RwLock;

use fitlens_core::catalog::RawProductRow;
use fitlens_core::segmentation::{OrderRecord, SegmentRecord, SegmentSummary};

use super::{OrderRepository, ProductCatalogRepository, RepositoryError, SegmentRepository};

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<OrderRecord>>,
}

impl InMemoryOrderRepository {
    pub fn with_orders(orders: Vec<OrderRecord>) -> Self {
        Self { orders: RwLock::new(orders) }
    }

    pub async fn push(&self, order: OrderRecord) {
        self.orders.write().await.push(order);
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn list_by_status(&self, status: &str) -> Result<Vec<OrderRecord>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().filter(|order| order.status == status).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryProductCatalogRepository {
    rows: RwLock<Vec<RawProductRow>>,
}

impl InMemoryProductCatalogRepository {
    pub fn with_rows(rows: Vec<RawProductRow>) -> Self {
        Self { rows: RwLock::new(rows) }
    }

    pub async fn replace(&self, rows: Vec<RawProductRow>) {
        *self.rows.write().await = rows;
    }
}

#[async_trait::async_trait]
impl ProductCatalogRepository for InMemoryProductCatalogRepository {
    async fn list_raw(&self) -> Result<Vec<RawProductRow>, RepositoryError> {
        Ok(self.rows.read().await.clone())
    }
}

#[derive(Default)]
pub struct InMemorySegmentRepository {
    segments: RwLock<BTreeMap<String, SegmentRecord>>,
}

#[async_trait::async_trait]
impl SegmentRepository for InMemorySegmentRepository {
    async fn replace_all(&self, records: &[SegmentRecord]) -> Result<u64, RepositoryError> {
        let mut next = BTreeMap::new();
        for record in records {
            if next.insert(record.customer_id.0.clone(), record.clone()).is_some() {
                return Err(RepositoryError::Decode(format!(
                    "duplicate segment record for customer `{}`",
                    record.customer_id.0
                )));
            }
        }

        let written = next.len() as u64;
        *self.segments.write().await = next;
        Ok(written)
    }

    async fn list_all(&self) -> Result<Vec<SegmentRecord>, RepositoryError> {
        Ok(self.segments.read().await.values().cloned().collect())
    }

    async fn summary(&self) -> Result<Vec<SegmentSummary>, RepositoryError> {
        let segments = self.segments.read().await;

        let mut by_cluster: BTreeMap<u32, Vec<&SegmentRecord>> = BTreeMap::new();
        for record in segments.values() {
            by_cluster.entry(record.cluster).or_default().push(record);
        }

        Ok(by_cluster
            .into_iter()
            .map(|(cluster, members)| {
                let count = members.len() as f64;
                let sales: f64 =
                    members.iter().map(|record| record.sales.to_f64().unwrap_or(0.0)).sum();
                let frequency: f64 = members.iter().map(|record| f64::from(record.frequency)).sum();
                let recency: f64 = members.iter().map(|record| record.recency as f64).sum();
                SegmentSummary {
                    cluster,
                    customer_count: members.len() as u64,
                    avg_sales: sales / count,
                    avg_frequency: frequency / count,
                    avg_recency: recency / count,
                    last_updated: members.iter().map(|record| record.updated_at).max(),
                }
            })
            .collect())
    }
}
