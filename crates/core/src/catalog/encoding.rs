use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;

use super::ProductRecord;
use crate::errors::DomainError;

/// Dense per-product feature rows; row `i` belongs to product `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Indicator columns in first-seen value order.
struct OneHot {
    prefix: &'static str,
    index: HashMap<String, usize>,
    values: Vec<String>,
}

impl OneHot {
    fn fit<'a>(prefix: &'static str, values: impl Iterator<Item = &'a str>) -> Self {
        let mut encoder = Self { prefix, index: HashMap::new(), values: Vec::new() };
        for value in values {
            if !encoder.index.contains_key(value) {
                encoder.index.insert(value.to_owned(), encoder.values.len());
                encoder.values.push(value.to_owned());
            }
        }
        encoder
    }

    fn column_names(&self) -> impl Iterator<Item = String> + '_ {
        self.values.iter().map(|value| format!("{}_{value}", self.prefix))
    }

    fn write(&self, value: &str, row: &mut [f64]) {
        if let Some(position) = self.index.get(value) {
            row[*position] = 1.0;
        }
    }
}

/// Min-max scaling fitted on the current product set only.
struct MinMax {
    min: f64,
    range: f64,
}

impl MinMax {
    fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self { min, range: max - min }
    }

    fn scale(&self, value: f64) -> f64 {
        // A constant column carries no signal and encodes as zero.
        if self.range == 0.0 {
            0.0
        } else {
            ((value - self.min) / self.range).clamp(0.0, 1.0)
        }
    }
}

pub fn encode_products(products: &[ProductRecord]) -> Result<FeatureMatrix, DomainError> {
    if products.is_empty() {
        return Err(DomainError::Data(
            "cannot compute similarity over an empty product catalog".to_string(),
        ));
    }

    let categories = OneHot::fit("category", products.iter().map(|p| p.category.as_str()));
    let brands = OneHot::fit("brand", products.iter().map(|p| p.brand.as_str()));

    let prices: Vec<f64> =
        products.iter().map(|product| product.price.to_f64().unwrap_or(0.0)).collect();
    let ratings: Vec<f64> = products.iter().map(|product| product.rating).collect();
    let price_scale = MinMax::fit(&prices);
    let rating_scale = MinMax::fit(&ratings);

    let columns: Vec<String> = categories
        .column_names()
        .chain(brands.column_names())
        .chain(["price".to_string(), "rating".to_string()])
        .collect();

    let category_width = categories.values.len();
    let brand_width = brands.values.len();
    let width = columns.len();

    let rows = products
        .iter()
        .enumerate()
        .map(|(index, product)| {
            let mut row = vec![0.0; width];
            categories.write(&product.category, &mut row[..category_width]);
            brands.write(&product.brand, &mut row[category_width..category_width + brand_width]);
            row[width - 2] = price_scale.scale(prices[index]);
            row[width - 1] = rating_scale.scale(ratings[index]);
            row
        })
        .collect();

    Ok(FeatureMatrix { columns, rows })
}
