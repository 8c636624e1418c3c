pub mod catalog;
pub mod config;
pub mod errors;
pub mod recommend;
pub mod segmentation;
pub mod similarity;

pub use catalog::{
    clean_products, encode_products, parse_price, CleaningReport, FeatureMatrix, ProductRecord,
    RawProductRow,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use recommend::{
    CatalogHealth, CatalogIndex, Recommendation, RecommendationService, RefreshReport,
};
pub use segmentation::{
    assign_clusters, extract_aggregates, is_outlier, segment_customers, AssignedCustomer, Bounds,
    ClusterModel, CustomerAggregate, CustomerId, FeatureScaler, KMeansModel, ModelPair, ModelSet,
    OrderRecord, PopulationProfile, SegmentRecord, SegmentSummary, StandardScaler,
    ThresholdConfig,
};
pub use similarity::SimilarityMatrix;
