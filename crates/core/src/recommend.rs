//! Content-based recommendations over a precomputed similarity matrix.
//!
//! A [`CatalogIndex`] pairs the cleaned product table with the matrix built from
//! it and is immutable once built. [`RecommendationService`] owns the current
//! index and replaces it wholesale on refresh, so readers always see a matched
//! product/matrix pair.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{clean_products, encode_products, CleaningReport, ProductRecord, RawProductRow};
use crate::errors::DomainError;
use crate::similarity::SimilarityMatrix;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub score: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogHealth {
    pub ready: bool,
    pub product_count: usize,
}

#[derive(Debug)]
pub struct CatalogIndex {
    products: Vec<ProductRecord>,
    positions: HashMap<String, usize>,
    matrix: SimilarityMatrix,
    cleaning: CleaningReport,
    built_at: DateTime<Utc>,
}

impl CatalogIndex {
    pub fn build(rows: &[RawProductRow]) -> Result<Self, DomainError> {
        let (products, cleaning) = clean_products(rows);
        let features = encode_products(&products)?;
        let matrix = SimilarityMatrix::cosine(&features);

        let mut positions = HashMap::with_capacity(products.len());
        for (index, product) in products.iter().enumerate() {
            positions.entry(product.sku.clone()).or_insert(index);
        }

        Ok(Self { products, positions, matrix, cleaning, built_at: Utc::now() })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    pub fn matrix(&self) -> &SimilarityMatrix {
        &self.matrix
    }

    pub fn cleaning(&self) -> CleaningReport {
        self.cleaning
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn recommend(&self, sku: &str, limit: usize) -> Result<Vec<Recommendation>, DomainError> {
        if limit == 0 {
            return Err(DomainError::Data("limit must be at least 1".to_string()));
        }

        let target = *self
            .positions
            .get(sku)
            .ok_or_else(|| DomainError::ProductNotFound { sku: sku.to_string() })?;
        let scores = self.matrix.row(target).ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "product index {target} is outside the similarity matrix"
            ))
        })?;

        let mut ranked: Vec<(usize, f64)> = scores.iter().copied().enumerate().collect();
        // Stable sort: equal scores keep catalog order, lower index first.
        ranked.sort_by(|left, right| right.1.total_cmp(&left.1));

        let mut seen: HashSet<&str> = HashSet::from([sku]);
        let mut recommendations = Vec::with_capacity(limit);
        for (index, score) in ranked {
            if index == target {
                continue;
            }
            let product = &self.products[index];
            if !seen.insert(product.sku.as_str()) {
                continue;
            }
            recommendations.push(Recommendation {
                sku: product.sku.clone(),
                name: product.name.clone(),
                brand: product.brand.clone(),
                category: product.category.clone(),
                score,
            });
            if recommendations.len() >= limit {
                break;
            }
        }

        Ok(recommendations)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub product_count: usize,
    pub cleaning: CleaningReport,
}

/// Owns the live catalog index. Queries read a snapshot `Arc`; refresh builds a
/// complete replacement before swapping it in.
#[derive(Debug, Default)]
pub struct RecommendationService {
    current: RwLock<Option<Arc<CatalogIndex>>>,
}

impl RecommendationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: CatalogIndex) -> Self {
        Self { current: RwLock::new(Some(Arc::new(index))) }
    }

    /// Rebuilds from `rows`. On failure the previous index keeps serving.
    pub fn refresh(&self, rows: &[RawProductRow]) -> Result<RefreshReport, DomainError> {
        let index = CatalogIndex::build(rows)?;
        let report = RefreshReport { product_count: index.len(), cleaning: index.cleaning() };

        let next = Arc::new(index);
        match self.current.write() {
            Ok(mut current) => *current = Some(next),
            Err(poisoned) => *poisoned.into_inner() = Some(next),
        }

        Ok(report)
    }

    pub fn snapshot(&self) -> Option<Arc<CatalogIndex>> {
        match self.current.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn recommend(&self, sku: &str, limit: usize) -> Result<Vec<Recommendation>, DomainError> {
        let index = self.snapshot().ok_or_else(|| {
            DomainError::CatalogUnavailable("similarity matrix has not been built".to_string())
        })?;
        index.recommend(sku, limit)
    }

    pub fn health(&self) -> CatalogHealth {
        match self.snapshot() {
            Some(index) => CatalogHealth { ready: true, product_count: index.len() },
            None => CatalogHealth { ready: false, product_count: 0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::{CatalogIndex, RecommendationService};
    use crate::catalog::RawProductRow;
    use crate::errors::DomainError;

    fn raw(sku: &str, category: &str, brand: &str, price: &str, rating: f64) -> RawProductRow {
        RawProductRow {
            sku: Some(sku.to_owned()),
            name: Some(format!("Product {sku}")),
            category: Some(category.to_owned()),
            brand: Some(brand.to_owned()),
            price: Some(price.to_owned()),
            rating: Some(rating),
        }
    }

    fn catalog() -> Vec<RawProductRow> {
        vec![
            raw("A", "Running", "Kiprun", "100,00 MAD", 4.0),
            raw("B", "Running", "Kiprun", "120,00 MAD", 4.2),
            raw("C", "Cycling", "Btwin", "1 500,00 MAD", 3.1),
            raw("D", "Running", "Kalenji", "90,00 MAD", 4.0),
            raw("E", "Hiking", "Quechua", "300,00 MAD", 4.8),
            raw("B", "Running", "Kiprun", "999,00 MAD", 1.0),
        ]
    }

    #[test]
    fn three_product_catalog_returns_the_other_two_ranked() {
        let index = CatalogIndex::build(&[
            raw("A", "Running", "Kiprun", "100", 4.0),
            raw("B", "Running", "Kiprun", "110", 4.1),
            raw("C", "Cycling", "Btwin", "900", 2.0),
        ])
        .expect("build");

        let recommendations = index.recommend("A", 5).expect("recommend");

        let skus: Vec<&str> = recommendations.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["B", "C"]);
        assert!(recommendations[0].score >= recommendations[1].score);
    }

    #[test]
    fn target_is_excluded_and_skus_are_unique() {
        let index = CatalogIndex::build(&catalog()).expect("build");

        for product in index.products() {
            let recommendations = index.recommend(&product.sku, 10).expect("recommend");
            let skus: HashSet<&str> = recommendations.iter().map(|r| r.sku.as_str()).collect();

            assert!(!skus.contains(product.sku.as_str()));
            assert_eq!(skus.len(), recommendations.len());
            assert_eq!(recommendations.len(), index.len() - 1);
            assert!(recommendations.windows(2).all(|pair| pair[0].score >= pair[1].score));
        }
    }

    #[test]
    fn ties_keep_catalog_order() {
        let index = CatalogIndex::build(&[
            raw("T", "Swim", "Nabaiji", "10", 4.0),
            raw("X", "Swim", "Nabaiji", "10", 4.0),
            raw("Y", "Swim", "Nabaiji", "10", 4.0),
            raw("Z", "Swim", "Nabaiji", "10", 4.0),
        ])
        .expect("build");

        let skus: Vec<String> =
            index.recommend("Y", 3).expect("recommend").into_iter().map(|r| r.sku).collect();

        assert_eq!(skus, vec!["T", "X", "Z"]);
    }

    #[test]
    fn limit_truncates_results() {
        let index = CatalogIndex::build(&catalog()).expect("build");

        assert_eq!(index.recommend("A", 2).expect("recommend").len(), 2);
        assert!(matches!(index.recommend("A", 0), Err(DomainError::Data(_))));
    }

    #[test]
    fn unknown_sku_is_not_found() {
        let index = CatalogIndex::build(&catalog()).expect("build");

        assert_eq!(
            index.recommend("missing", 5),
            Err(DomainError::ProductNotFound { sku: "missing".to_owned() })
        );
    }

    #[test]
    fn service_is_unavailable_until_first_build() {
        let service = RecommendationService::new();

        assert!(matches!(service.recommend("A", 5), Err(DomainError::CatalogUnavailable(_))));
        assert!(!service.health().ready);

        let report = service.refresh(&catalog()).expect("refresh");

        assert_eq!(report.product_count, 5);
        assert_eq!(report.cleaning.dropped_duplicate_sku, 1);
        assert_eq!(service.health().product_count, 5);
        assert!(service.health().ready);
        assert!(service.recommend("A", 5).is_ok());
    }

    #[test]
    fn failed_refresh_keeps_previous_index() {
        let service = RecommendationService::new();
        service.refresh(&catalog()).expect("initial build");

        let result = service.refresh(&[raw("Q", "Swim", "Nabaiji", "free", 3.0)]);

        assert!(matches!(result, Err(DomainError::Data(_))));
        assert_eq!(service.health().product_count, 5);
        assert!(service.recommend("A", 1).is_ok());
    }

    #[test]
    fn concurrent_readers_see_complete_snapshots() {
        let service = Arc::new(RecommendationService::new());
        service.refresh(&catalog()).expect("initial build");

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let index = service.snapshot().expect("snapshot");
                        assert_eq!(index.matrix().size(), index.len());
                    }
                })
            })
            .collect();
        for _ in 0..10 {
            service.refresh(&catalog()).expect("refresh");
        }
        for reader in readers {
            reader.join().expect("reader thread");
        }
    }
}
