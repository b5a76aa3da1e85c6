//! Sales feed reconciliation
//!
//! Deduplicates transactions, drops rows that cannot form a sale (no usable
//! date, customer or product) and enforces referential integrity against the
//! reconciled customer and product feeds. Both drop steps count towards the
//! same "missing" metric.

use crate::constants::sale_columns as col;
use crate::error::Result;
use crate::metrics::MetricsBucket;
use crate::models::{CanonicalSale, Feed, RawRecord, SurrogateId};
use crate::normalize::{derive_surrogate_id, normalize_date, parse_decimal, parse_integer};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::deduplication::deduplicate_first_by;
use super::{Reconciled, ReferenceSets};

/// Sale row that passed the completeness check
struct CandidateSale<'a> {
    transaction_id: String,
    transaction_date: NaiveDate,
    customer_ref: SurrogateId,
    product_ref: SurrogateId,
    row: &'a RawRecord,
}

/// Reconcile raw sales rows against the reconciled customer and product ids
pub fn reconcile_sales(
    rows: Vec<RawRecord>,
    references: &ReferenceSets,
) -> Result<Reconciled<CanonicalSale>> {
    let mut metrics = MetricsBucket::new(rows.len());

    let (unique, duplicates) =
        deduplicate_first_by(rows, |row| row.get_owned(col::TRANSACTION_ID));
    metrics.record_duplicates(duplicates);

    // Completeness: a sale needs a parseable date and both references
    let before_completeness = unique.len();
    let complete: Vec<(&RawRecord, NaiveDate)> = unique
        .iter()
        .filter_map(|row| {
            let date = normalize_date(row.get(col::TRANSACTION_DATE));
            let usable = date.is_some()
                && row.get(col::TRANSACTION_ID).is_some()
                && row.get(col::CUSTOMER_ID).is_some()
                && row.get(col::PRODUCT_ID).is_some();
            if !usable {
                debug!(
                    "Dropping incomplete sale {:?}",
                    row.get(col::TRANSACTION_ID)
                );
            }
            date.filter(|_| usable).map(|date| (row, date))
        })
        .collect();
    metrics.record_missing(before_completeness - complete.len());

    let candidates = complete
        .into_iter()
        .map(|(row, transaction_date)| candidate(row, transaction_date))
        .collect::<Result<Vec<_>>>()?;

    // Referential integrity against the reconciled feeds
    let before_referential = candidates.len();
    let valid: Vec<CandidateSale> = candidates
        .into_iter()
        .filter(|sale| {
            let known = references.contains_customer(sale.customer_ref)
                && references.contains_product(sale.product_ref);
            if !known {
                debug!(
                    "Dropping sale {}: customer {} or product {} not in reconciled feeds",
                    sale.transaction_id, sale.customer_ref, sale.product_ref
                );
            }
            known
        })
        .collect();
    let orphaned = before_referential - valid.len();
    if orphaned > 0 {
        warn!("{} sales reference unknown customers or products", orphaned);
    }
    metrics.record_missing(orphaned);

    let sales = valid
        .into_iter()
        .map(build_sale)
        .collect::<Result<Vec<_>>>()?;
    metrics.record_loaded(sales.len());

    info!("Sales reconciliation: {}", metrics.summary());

    Ok(Reconciled::new(sales, metrics))
}

fn candidate(row: &RawRecord, transaction_date: NaiveDate) -> Result<CandidateSale<'_>> {
    // Presence was checked by the completeness filter
    let transaction_id = row.get_owned(col::TRANSACTION_ID).unwrap_or_default();
    let customer_ref = derive_surrogate_id(
        Feed::Customers,
        row.get(col::CUSTOMER_ID).unwrap_or_default(),
    )?;
    let product_ref =
        derive_surrogate_id(Feed::Products, row.get(col::PRODUCT_ID).unwrap_or_default())?;

    Ok(CandidateSale {
        transaction_id,
        transaction_date,
        customer_ref,
        product_ref,
        row,
    })
}

fn build_sale(candidate: CandidateSale<'_>) -> Result<CanonicalSale> {
    let row = candidate.row;

    let quantity = parse_integer(col::QUANTITY, row.get(col::QUANTITY))?.unwrap_or_else(|| {
        warn!(
            "Sale {} has no quantity, defaulting to 0",
            candidate.transaction_id
        );
        0
    });
    let unit_price = parse_decimal(col::UNIT_PRICE, row.get(col::UNIT_PRICE))?.unwrap_or_else(|| {
        warn!(
            "Sale {} has no unit price, defaulting to 0",
            candidate.transaction_id
        );
        0.0
    });

    Ok(CanonicalSale {
        transaction_id: candidate.transaction_id,
        customer_ref: candidate.customer_ref,
        product_ref: candidate.product_ref,
        transaction_date: candidate.transaction_date,
        quantity,
        unit_price,
        status: row.get_owned(col::STATUS),
    })
}
