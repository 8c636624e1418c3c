//! Customer segmentation: RFM features, outlier routing and cluster labels.

pub mod artifacts;
pub mod clusters;
pub mod features;
pub mod outliers;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub use clusters::{
    assign_clusters, AssignedCustomer, ClusterModel, FeatureRow, FeatureScaler, KMeansModel,
    ModelPair, ModelSet, StandardScaler,
};
pub use features::{extract_aggregates, CustomerAggregate, OrderRecord};
pub use outliers::{is_outlier, Bounds, PopulationProfile, ThresholdConfig};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

/// Persisted segment assignment; the collection is replaced wholesale per run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub customer_id: CustomerId,
    pub recency: i64,
    pub frequency: u32,
    pub sales: Decimal,
    pub is_outlier: bool,
    pub cluster: u32,
    pub updated_at: DateTime<Utc>,
}

impl SegmentRecord {
    pub fn from_assignment(assigned: AssignedCustomer, updated_at: DateTime<Utc>) -> Self {
        let is_outlier = assigned.is_outlier();
        let AssignedCustomer { aggregate, cluster, .. } = assigned;
        Self {
            customer_id: aggregate.customer_id,
            recency: aggregate.recency,
            frequency: aggregate.frequency,
            sales: aggregate.sales,
            is_outlier,
            cluster,
            updated_at,
        }
    }
}

/// Per-cluster rollup of the current segment collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub cluster: u32,
    pub customer_count: u64,
    pub avg_sales: f64,
    pub avg_frequency: f64,
    pub avg_recency: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Runs the pure part of a segmentation pass: every stage between the order
/// snapshot and the records handed to the segment store.
pub fn segment_customers(
    orders: &[OrderRecord],
    qualifying_status: &str,
    thresholds: &ThresholdConfig,
    models: &ModelSet,
    now: DateTime<Utc>,
) -> Result<Vec<SegmentRecord>, DomainError> {
    let aggregates = extract_aggregates(orders, qualifying_status, now)?;
    if aggregates.is_empty() {
        return Err(DomainError::Data(format!(
            "no orders with status `{qualifying_status}` to segment"
        )));
    }

    let assigned = assign_clusters(aggregates, thresholds, models)?;
    Ok(assigned.into_iter().map(|customer| SegmentRecord::from_assignment(customer, now)).collect())
}
