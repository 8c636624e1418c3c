use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ProductRecord, RawProductRow};

/// Row accounting for one cleaning pass. Dropped rows are not errors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_incomplete: usize,
    pub dropped_unparsable_price: usize,
    pub dropped_duplicate_sku: usize,
}

/// Parses a decorated price such as `"1 234,50 MAD"` or `"299.00 MAD"`.
///
/// Whitespace of any kind is removed first (storefront exports use U+202F as
/// a thousands separator), then the first numeric run is taken. When both `.`
/// and `,` appear, the last one is the decimal separator; a single separator is
/// decimal; a repeated one separates thousands.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();

    let start = compact.find(|ch: char| ch.is_ascii_digit())?;
    let run: String = compact[start..]
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == ',')
        .collect();
    let run = run.trim_end_matches(['.', ',']);

    let dots = run.matches('.').count();
    let commas = run.matches(',').count();
    let normalized = match (dots, commas) {
        (0, 0) => run.to_owned(),
        (_, 0) if dots > 1 => run.replace('.', ""),
        (0, _) if commas > 1 => run.replace(',', ""),
        (_, 0) => run.to_owned(),
        (0, _) => run.replace(',', "."),
        _ => {
            let decimal = if run.rfind('.') > run.rfind(',') { '.' } else { ',' };
            let (thousands, decimal_count) =
                if decimal == '.' { (',', dots) } else { ('.', commas) };
            if decimal_count > 1 {
                return None;
            }
            run.replace(thousands, "").replace(decimal, ".")
        }
    };

    Decimal::from_str(&normalized).ok()
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_owned)
}

/// Drops incomplete and unparsable rows, then de-duplicates by sku keeping the
/// first occurrence. The returned order is the catalog index order.
pub fn clean_products(rows: &[RawProductRow]) -> (Vec<ProductRecord>, CleaningReport) {
    let mut report = CleaningReport { input_rows: rows.len(), ..CleaningReport::default() };
    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(rows.len());

    for row in rows {
        let (Some(sku), Some(name), Some(category), Some(brand), Some(raw_price), Some(rating)) = (
            present(&row.sku),
            present(&row.name),
            present(&row.category),
            present(&row.brand),
            present(&row.price),
            row.rating.filter(|rating| rating.is_finite()),
        ) else {
            report.dropped_incomplete += 1;
            continue;
        };

        let Some(price) = parse_price(&raw_price) else {
            report.dropped_unparsable_price += 1;
            continue;
        };

        if !seen.insert(sku.clone()) {
            report.dropped_duplicate_sku += 1;
            continue;
        }

        products.push(ProductRecord { sku, name, category, brand, price, rating });
    }

    report.kept_rows = products.len();
    (products, report)
}
