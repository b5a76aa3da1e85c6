//! Customer feed reconciliation
//!
//! Deduplicates customers on their source id, repairs missing emails with a
//! per-customer synthetic address and normalizes phone numbers and
//! registration dates. Customers are never dropped for a bad phone or date.
//! A customer whose email is already held by an earlier customer is dropped
//! and counted as a duplicate, since emails are unique in the customer table.

use crate::constants::UNKNOWN_EMAIL_PREFIX;
use crate::constants::customer_columns as col;
use crate::error::{EtlError, Result};
use crate::metrics::MetricsBucket;
use crate::models::{CanonicalCustomer, Feed, RawRecord};
use crate::normalize::{derive_surrogate_id, normalize_date, normalize_phone_with_country_code};
use tracing::{debug, info, warn};

use super::Reconciled;
use super::deduplication::deduplicate_first_by;

/// Reconcile raw customer rows into canonical customers
pub fn reconcile_customers(
    rows: Vec<RawRecord>,
    country_code: &str,
) -> Result<Reconciled<CanonicalCustomer>> {
    let mut metrics = MetricsBucket::new(rows.len());

    let (unique, duplicates) = deduplicate_first_by(rows, |row| row.get_owned(col::CUSTOMER_ID));
    metrics.record_duplicates(duplicates);

    // Counted before repair so the metric reflects what the feed was missing
    let missing_emails = unique.iter().filter(|row| row.get(col::EMAIL).is_none()).count();
    metrics.record_missing(missing_emails);

    let built = unique
        .iter()
        .map(|row| build_customer(row, country_code))
        .collect::<Result<Vec<_>>>()?;

    let (customers, shared_emails) =
        deduplicate_first_by(built, |customer| customer.email.clone());
    if shared_emails > 0 {
        warn!(
            "Dropped {} customers whose email belongs to an earlier customer",
            shared_emails
        );
    }
    metrics.record_duplicates(shared_emails);
    metrics.record_loaded(customers.len());

    info!("Customer reconciliation: {}", metrics.summary());

    Ok(Reconciled::new(customers, metrics))
}

/// Synthetic email for a customer without one. Derived from the source id so
/// repaired rows never collide with each other.
pub fn synthetic_email(source_id: &str) -> String {
    format!("{UNKNOWN_EMAIL_PREFIX}{source_id}")
}

fn build_customer(row: &RawRecord, country_code: &str) -> Result<CanonicalCustomer> {
    let source_id = row
        .get_owned(col::CUSTOMER_ID)
        .ok_or_else(|| EtlError::malformed_identifier(Feed::Customers.entity_name(), ""))?;
    let surrogate_id = derive_surrogate_id(Feed::Customers, &source_id)?;

    let email = match row.get_owned(col::EMAIL) {
        Some(email) => email,
        None => {
            debug!("Customer {} has no email, using synthetic address", source_id);
            synthetic_email(&source_id)
        }
    };

    let phone = normalize_phone_with_country_code(row.get(col::PHONE), country_code);
    if phone.is_none() && row.get(col::PHONE).is_some() {
        debug!("Customer {} phone could not be normalized", source_id);
    }

    Ok(CanonicalCustomer {
        surrogate_id,
        email,
        phone,
        first_name: row.get_owned(col::FIRST_NAME),
        last_name: row.get_owned(col::LAST_NAME),
        city: row.get_owned(col::CITY),
        registration_date: normalize_date(row.get(col::REGISTRATION_DATE)),
        source_id,
    })
}
