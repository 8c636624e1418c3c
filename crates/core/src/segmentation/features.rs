//! RFM feature extraction.
//!
//! Turns raw order rows into one [`CustomerAggregate`] per customer. Only orders
//! in the qualifying status contribute; timestamps are normalized to UTC before
//! any comparison so recency is well defined across mixed offsets.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CustomerId;
use crate::errors::DomainError;

const SECONDS_PER_DAY: i64 = 86_400;

const NAIVE_FORMATS: &[&str] =
    &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// One order row as read from the order source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub customer_id: CustomerId,
    pub amount: Decimal,
    /// Raw creation timestamp; `None` when the source row has no value.
    pub placed_at: Option<String>,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub customer_id: CustomerId,
    pub sales: Decimal,
    pub frequency: u32,
    pub recency: i64,
}

impl CustomerAggregate {
    /// Feature row in the column order the scalers were fitted on:
    /// Sales, Frequency, Recency.
    pub fn feature_row(&self) -> [f64; 3] {
        [self.sales_f64(), f64::from(self.frequency), self.recency as f64]
    }

    pub fn sales_f64(&self) -> f64 {
        self.sales.to_f64().unwrap_or(0.0)
    }
}

/// Parses an order timestamp into UTC.
///
/// RFC 3339 values keep their offset and are converted; naive values are taken
/// to already be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
}

/// Whole days elapsed between `latest` and `now`, floored.
pub fn days_between(latest: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - latest).num_seconds().div_euclid(SECONDS_PER_DAY)
}

struct Accumulator {
    sales: Decimal,
    frequency: u32,
    latest: DateTime<Utc>,
}

pub fn extract_aggregates(
    orders: &[OrderRecord],
    qualifying_status: &str,
    now: DateTime<Utc>,
) -> Result<Vec<CustomerAggregate>, DomainError> {
    let mut groups: BTreeMap<&CustomerId, Accumulator> = BTreeMap::new();

    for order in orders.iter().filter(|order| order.status == qualifying_status) {
        if order.customer_id.0.trim().is_empty() {
            return Err(DomainError::Data("qualifying order is missing a customer id".to_string()));
        }

        let placed_at = order
            .placed_at
            .as_deref()
            .ok_or_else(|| {
                DomainError::Data(format!(
                    "order for customer `{}` has no timestamp",
                    order.customer_id.0
                ))
            })
            .and_then(|raw| {
                parse_timestamp(raw).ok_or_else(|| {
                    DomainError::Data(format!(
                        "order for customer `{}` has an unparsable timestamp `{raw}`",
                        order.customer_id.0
                    ))
                })
            })?;

        groups
            .entry(&order.customer_id)
            .and_modify(|acc| {
                acc.sales += order.amount;
                acc.frequency += 1;
                if placed_at > acc.latest {
                    acc.latest = placed_at;
                }
            })
            .or_insert(Accumulator { sales: order.amount, frequency: 1, latest: placed_at });
    }

    Ok(groups
        .into_iter()
        .map(|(customer_id, acc)| CustomerAggregate {
            customer_id: customer_id.clone(),
            sales: acc.sales,
            frequency: acc.frequency,
            recency: days_between(acc.latest, now),
        })
        .collect())
}
