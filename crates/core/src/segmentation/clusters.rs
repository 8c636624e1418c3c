//! Dual-path cluster assignment.
//!
//! Customers are routed to a [`PopulationProfile`] and each profile is scaled
//! and labelled by its own [`ModelPair`]. Pairs are bound at load time so a
//! scaler fitted on one population can never feed the other population's model.

use serde::{Deserialize, Serialize};

use super::{CustomerAggregate, PopulationProfile, ThresholdConfig};
use crate::errors::DomainError;

pub const FEATURE_DIM: usize = 3;

pub type FeatureRow = [f64; FEATURE_DIM];

pub trait FeatureScaler: Send + Sync {
    fn transform(&self, rows: &[FeatureRow]) -> Vec<FeatureRow>;
}

pub trait ClusterModel: Send + Sync {
    fn predict(&self, rows: &[FeatureRow]) -> Vec<u32>;

    /// Labels returned by `predict` are in `0..cluster_count()`.
    fn cluster_count(&self) -> usize;
}

/// Standardization with per-column mean and scale, as fitted offline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: FeatureRow,
    pub scale: FeatureRow,
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, rows: &[FeatureRow]) -> Vec<FeatureRow> {
        rows.iter()
            .map(|row| {
                let mut scaled = [0.0; FEATURE_DIM];
                for (column, value) in row.iter().enumerate() {
                    // Zero-variance columns were fitted with a unit scale.
                    let scale =
                        if self.scale[column] == 0.0 { 1.0 } else { self.scale[column] };
                    scaled[column] = (value - self.mean[column]) / scale;
                }
                scaled
            })
            .collect()
    }
}

/// Nearest-centroid labelling over pretrained k-means centroids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KMeansModel {
    pub centroids: Vec<FeatureRow>,
}

impl KMeansModel {
    fn nearest(&self, row: &FeatureRow) -> u32 {
        let mut best_index = 0usize;
        let mut best_distance = f64::INFINITY;
        for (index, centroid) in self.centroids.iter().enumerate() {
            let distance: f64 =
                centroid.iter().zip(row.iter()).map(|(c, x)| (c - x) * (c - x)).sum();
            if distance < best_distance {
                best_distance = distance;
                best_index = index;
            }
        }
        best_index as u32
    }
}

impl ClusterModel for KMeansModel {
    fn predict(&self, rows: &[FeatureRow]) -> Vec<u32> {
        rows.iter().map(|row| self.nearest(row)).collect()
    }

    fn cluster_count(&self) -> usize {
        self.centroids.len()
    }
}

pub struct ModelPair {
    scaler: Box<dyn FeatureScaler>,
    model: Box<dyn ClusterModel>,
}

impl ModelPair {
    pub fn new(scaler: impl FeatureScaler + 'static, model: impl ClusterModel + 'static) -> Self {
        Self { scaler: Box::new(scaler), model: Box::new(model) }
    }

    pub fn cluster_count(&self) -> usize {
        self.model.cluster_count()
    }

    fn label(&self, rows: &[FeatureRow]) -> Vec<u32> {
        let scaled = self.scaler.transform(rows);
        self.model.predict(&scaled)
    }
}

impl std::fmt::Debug for ModelPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelPair").field("cluster_count", &self.cluster_count()).finish()
    }
}

#[derive(Debug)]
pub struct ModelSet {
    pub normal: ModelPair,
    pub outlier: ModelPair,
}

impl ModelSet {
    pub fn pair(&self, profile: PopulationProfile) -> &ModelPair {
        match profile {
            PopulationProfile::Normal => &self.normal,
            PopulationProfile::Outlier => &self.outlier,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignedCustomer {
    pub aggregate: CustomerAggregate,
    pub profile: PopulationProfile,
    pub cluster: u32,
}

impl AssignedCustomer {
    pub fn is_outlier(&self) -> bool {
        self.profile == PopulationProfile::Outlier
    }
}

pub fn assign_clusters(
    aggregates: Vec<CustomerAggregate>,
    thresholds: &ThresholdConfig,
    models: &ModelSet,
) -> Result<Vec<AssignedCustomer>, DomainError> {
    let (outliers, normal): (Vec<_>, Vec<_>) = aggregates
        .into_iter()
        .partition(|aggregate| {
            PopulationProfile::classify(aggregate, thresholds) == PopulationProfile::Outlier
        });

    let mut assigned = Vec::with_capacity(normal.len() + outliers.len());
    for (profile, partition) in
        PopulationProfile::ALL.into_iter().zip([normal, outliers].into_iter())
    {
        // Cluster models reject empty input, so an empty partition is skipped.
        if partition.is_empty() {
            continue;
        }

        let pair = models.pair(profile);
        let rows: Vec<FeatureRow> = partition.iter().map(CustomerAggregate::feature_row).collect();
        let labels = pair.label(&rows);

        if labels.len() != partition.len() {
            return Err(DomainError::InvariantViolation(format!(
                "{} model returned {} labels for {} customers",
                profile.as_str(),
                labels.len(),
                partition.len()
            )));
        }

        let cluster_count = pair.cluster_count();
        for (aggregate, cluster) in partition.into_iter().zip(labels) {
            if cluster as usize >= cluster_count {
                return Err(DomainError::InvariantViolation(format!(
                    "{} model produced label {cluster} outside 0..{cluster_count}",
                    profile.as_str()
                )));
            }
            assigned.push(AssignedCustomer { aggregate, profile, cluster });
        }
    }

    Ok(assigned)
}
