//! Product catalog ingestion for the similarity engine.

pub mod cleaning;
pub mod encoding;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use cleaning::{clean_products, parse_price, CleaningReport};
pub use encoding::{encode_products, FeatureMatrix};

/// A catalog row as exported by the storefront; nothing is guaranteed present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProductRow {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub price: Decimal,
    pub rating: f64,
}
