//! Tests for customer reconciliation

use super::*;
use crate::error::EtlError;
use crate::reconcile::customers::{reconcile_customers, synthetic_email};

#[test]
fn test_duplicate_and_missing_email_scenario() {
    let rows = vec![
        customer_row(Some("C001"), Some("a@x.com")),
        customer_row(Some("C001"), Some("b@x.com")),
        customer_row(Some("C002"), None),
    ];

    let result = reconcile_customers(rows, "91").unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.records[0].source_id, "C001");
    assert_eq!(result.records[0].email, "a@x.com");
    assert_eq!(result.records[1].source_id, "C002");
    assert_eq!(result.records[1].email, "unknown_C002");

    assert_eq!(result.metrics.processed, 3);
    assert_eq!(result.metrics.duplicates, 1);
    assert_eq!(result.metrics.missing, 1);
    assert_eq!(result.metrics.loaded, 2);
}

#[test]
fn test_output_plus_duplicates_equals_input() {
    let rows = vec![
        customer_row(Some("C001"), Some("a@x.com")),
        customer_row(Some("C002"), Some("b@x.com")),
        customer_row(Some("C001"), Some("c@x.com")),
        customer_row(Some("C003"), Some("d@x.com")),
        customer_row(Some("C002"), Some("e@x.com")),
    ];
    let input_count = rows.len();

    let result = reconcile_customers(rows, "91").unwrap();

    assert_eq!(result.len() + result.metrics.duplicates, input_count);
}

#[test]
fn test_shared_email_keeps_first_customer() {
    let rows = vec![
        customer_row(Some("C001"), Some("same@x.com")),
        customer_row(Some("C002"), Some("same@x.com")),
        customer_row(Some("C003"), Some("other@x.com")),
    ];

    let result = reconcile_customers(rows, "91").unwrap();

    let ids: Vec<&str> = result.records.iter().map(|c| c.source_id.as_str()).collect();
    assert_eq!(ids, vec!["C001", "C003"]);
    assert_eq!(result.metrics.processed, 3);
    assert_eq!(result.metrics.duplicates, 1);
    assert_eq!(result.metrics.loaded, 2);
}

#[test]
fn test_real_email_matching_synthetic_one_is_dropped() {
    let rows = vec![
        customer_row(Some("C002"), None),
        customer_row(Some("C005"), Some("unknown_C002")),
    ];

    let result = reconcile_customers(rows, "91").unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.records[0].source_id, "C002");
    assert_eq!(result.metrics.missing, 1);
    assert_eq!(result.metrics.duplicates, 1);
}

#[test]
fn test_blank_email_counts_as_missing() {
    let rows = vec![
        customer_row(Some("C010"), Some("   ")),
        customer_row(Some("C011"), Some("")),
    ];

    let result = reconcile_customers(rows, "91").unwrap();

    assert_eq!(result.metrics.missing, 2);
    assert_eq!(result.records[0].email, "unknown_C010");
    assert_eq!(result.records[1].email, "unknown_C011");
}

#[test]
fn test_missing_email_counted_after_dedup() {
    // The duplicate without email is removed before the missing count
    let rows = vec![
        customer_row(Some("C001"), Some("a@x.com")),
        customer_row(Some("C001"), None),
    ];

    let result = reconcile_customers(rows, "91").unwrap();

    assert_eq!(result.metrics.duplicates, 1);
    assert_eq!(result.metrics.missing, 0);
}

#[test]
fn test_phone_and_date_normalized() {
    let rows = vec![customer_row(Some("C007"), Some("a@x.com"))];

    let result = reconcile_customers(rows, "91").unwrap();
    let customer = &result.records[0];

    assert_eq!(customer.surrogate_id, SurrogateId(7));
    assert_eq!(customer.phone.as_deref(), Some("+91-9876543210"));
    assert_eq!(customer.registration_date, Some(date(2023, 5, 10)));
    assert_eq!(customer.city.as_deref(), Some("Pune"));
}

#[test]
fn test_bad_phone_and_date_do_not_drop_customer() {
    let mut row = customer_row(Some("C020"), Some("z@x.com"));
    row.set("phone", Some("123".to_string()));
    row.set("registration_date", Some("sometime".to_string()));

    let result = reconcile_customers(vec![row], "91").unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.records[0].phone, None);
    assert_eq!(result.records[0].registration_date, None);
}

#[test]
fn test_country_code_is_configurable() {
    let rows = vec![customer_row(Some("C001"), Some("a@x.com"))];
    let result = reconcile_customers(rows, "44").unwrap();
    assert_eq!(result.records[0].phone.as_deref(), Some("+44-9876543210"));
}

#[test]
fn test_malformed_identifier_aborts() {
    let rows = vec![
        customer_row(Some("C001"), Some("a@x.com")),
        customer_row(Some("CXYZ"), Some("b@x.com")),
    ];

    let err = reconcile_customers(rows, "91").unwrap_err();
    assert!(matches!(err, EtlError::MalformedIdentifier { .. }));
}

#[test]
fn test_absent_identifier_aborts() {
    let rows = vec![customer_row(None, Some("a@x.com"))];
    let err = reconcile_customers(rows, "91").unwrap_err();
    assert!(matches!(err, EtlError::MalformedIdentifier { .. }));
}

#[test]
fn test_empty_feed() {
    let result = reconcile_customers(Vec::new(), "91").unwrap();
    assert!(result.is_empty());
    assert_eq!(result.metrics, crate::metrics::MetricsBucket::default());
}

#[test]
fn test_synthetic_email() {
    assert_eq!(synthetic_email("C123"), "unknown_C123");
}
