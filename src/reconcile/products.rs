//! Product feed reconciliation
//!
//! Deduplicates products on their trimmed source id, fills missing prices
//! with the batch median, defaults missing stock to zero and title-cases
//! categories.

use crate::constants::product_columns as col;
use crate::error::{EtlError, Result};
use crate::metrics::MetricsBucket;
use crate::models::{CanonicalProduct, Feed, RawRecord};
use crate::normalize::{derive_surrogate_id, parse_decimal, parse_integer, title_case};
use tracing::{debug, info};

use super::Reconciled;
use super::deduplication::deduplicate_first_by;

/// Reconcile raw product rows into canonical products.
///
/// Fails with [`EtlError::InsufficientData`] when prices are missing and no
/// row carries a price to take the median from.
pub fn reconcile_products(rows: Vec<RawRecord>) -> Result<Reconciled<CanonicalProduct>> {
    let mut metrics = MetricsBucket::new(rows.len());

    let (unique, duplicates) = deduplicate_first_by(rows, |row| row.get_owned(col::PRODUCT_ID));
    metrics.record_duplicates(duplicates);

    let prices = unique
        .iter()
        .map(parse_price)
        .collect::<Result<Vec<_>>>()?;

    let missing_prices = prices.iter().filter(|price| price.is_none()).count();
    metrics.record_missing(missing_prices);

    let known: Vec<f64> = prices.iter().flatten().copied().collect();
    let fill_price = if missing_prices > 0 {
        let median = median(&known).ok_or_else(|| {
            EtlError::insufficient_data("median price", "every product price is null")
        })?;
        debug!(
            "Filling {} missing prices with batch median {:.2}",
            missing_prices, median
        );
        median
    } else {
        0.0
    };

    let products = unique
        .iter()
        .zip(prices)
        .map(|(row, price)| build_product(row, price.unwrap_or(fill_price)))
        .collect::<Result<Vec<_>>>()?;
    metrics.record_loaded(products.len());

    info!("Product reconciliation: {}", metrics.summary());

    Ok(Reconciled::new(products, metrics))
}

/// Median of a set of values; the mean of the two middle values for an even
/// count. `None` for an empty set.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn parse_price(row: &RawRecord) -> Result<Option<f64>> {
    match parse_decimal(col::PRICE, row.get(col::PRICE))? {
        Some(price) if price < 0.0 => Err(EtlError::invalid_number(col::PRICE, price.to_string())),
        other => Ok(other),
    }
}

fn build_product(row: &RawRecord, price: f64) -> Result<CanonicalProduct> {
    let source_id = row
        .get_owned(col::PRODUCT_ID)
        .ok_or_else(|| EtlError::malformed_identifier(Feed::Products.entity_name(), ""))?;
    let surrogate_id = derive_surrogate_id(Feed::Products, &source_id)?;

    let stock_quantity = parse_integer(col::STOCK_QUANTITY, row.get(col::STOCK_QUANTITY))?
        .unwrap_or(0);
    if stock_quantity < 0 {
        return Err(EtlError::invalid_number(
            col::STOCK_QUANTITY,
            stock_quantity.to_string(),
        ));
    }

    Ok(CanonicalProduct {
        surrogate_id,
        product_name: row.get_owned(col::PRODUCT_NAME),
        category: row
            .get(col::CATEGORY)
            .map(title_case)
            .filter(|category| !category.is_empty()),
        price,
        stock_quantity,
        source_id,
    })
}
