use async_trait::async_trait;
use thiserror::Error;

use fitlens_core::catalog::RawProductRow;
use fitlens_core::errors::{ApplicationError, DomainError};
use fitlens_core::segmentation::{OrderRecord, SegmentRecord, SegmentSummary};

pub mod memory;
pub mod order;
pub mod product;
pub mod segment;

pub use memory::{
    InMemoryOrderRepository, InMemoryProductCatalogRepository, InMemorySegmentRepository,
};
pub use order::SqlOrderRepository;
pub use product::SqlProductCatalogRepository;
pub use segment::SqlSegmentRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// A source row whose content cannot be read as the expected value.
    #[error("invalid source record: {0}")]
    InvalidRecord(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::InvalidRecord(message) => DomainError::Data(message).into(),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Read side of the order snapshot.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn list_by_status(&self, status: &str) -> Result<Vec<OrderRecord>, RepositoryError>;
}

/// Raw storefront catalog rows in import order.
#[async_trait]
pub trait ProductCatalogRepository: Send + Sync {
    async fn list_raw(&self) -> Result<Vec<RawProductRow>, RepositoryError>;
}

#[async_trait]
pub trait SegmentRepository: Send + Sync {
    /// Replaces the whole segment collection. Readers observe either the
    /// previous collection or the new one, never a mix.
    async fn replace_all(&self, records: &[SegmentRecord]) -> Result<u64, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<SegmentRecord>, RepositoryError>;

    async fn summary(&self) -> Result<Vec<SegmentSummary>, RepositoryError>;
}
