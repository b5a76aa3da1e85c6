//! Tests for product reconciliation

use super::*;
use crate::error::EtlError;
use crate::reconcile::products::{median, reconcile_products};

#[test]
fn test_median_fill_scenario() {
    let rows = vec![
        product_row("P001", Some("electronics"), Some("100")),
        product_row("P002", Some("electronics"), None),
        product_row("P003", Some("electronics"), Some("300")),
    ];

    let result = reconcile_products(rows).unwrap();

    let prices: Vec<f64> = result.records.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![100.0, 200.0, 300.0]);
    assert_eq!(result.metrics.missing, 1);
    assert_eq!(result.metrics.loaded, 3);
}

#[test]
fn test_median_uses_deduplicated_rows() {
    // The duplicate P001 at 1000 must not pull the median up
    let rows = vec![
        product_row("P001", None, Some("10")),
        product_row("P001", None, Some("1000")),
        product_row("P002", None, Some("20")),
        product_row("P003", None, Some("30")),
        product_row("P004", None, None),
    ];

    let result = reconcile_products(rows).unwrap();

    assert_eq!(result.metrics.duplicates, 1);
    let filled = result
        .records
        .iter()
        .find(|p| p.source_id == "P004")
        .unwrap();
    assert_eq!(filled.price, 20.0);
}

#[test]
fn test_all_prices_null_is_insufficient_data() {
    let rows = vec![
        product_row("P001", None, None),
        product_row("P002", None, None),
    ];

    let err = reconcile_products(rows).unwrap_err();
    assert!(matches!(err, EtlError::InsufficientData { .. }));
}

#[test]
fn test_empty_feed_needs_no_median() {
    let result = reconcile_products(Vec::new()).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_source_id_trimmed_before_dedup() {
    let rows = vec![
        product_row(" P001 ", None, Some("5")),
        product_row("P001", None, Some("6")),
    ];

    let result = reconcile_products(rows).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.records[0].source_id, "P001");
    assert_eq!(result.records[0].price, 5.0);
}

#[test]
fn test_category_title_cased_and_trimmed() {
    let rows = vec![
        product_row("P001", Some("  ELECTRONICS "), Some("5")),
        product_row("P002", Some("home decor"), Some("5")),
        product_row("P003", None, Some("5")),
    ];

    let result = reconcile_products(rows).unwrap();

    assert_eq!(result.records[0].category.as_deref(), Some("Electronics"));
    assert_eq!(result.records[1].category.as_deref(), Some("Home Decor"));
    assert_eq!(result.records[2].category, None);
}

#[test]
fn test_missing_stock_defaults_to_zero() {
    let mut row = product_row("P009", None, Some("5"));
    row.set("stock_quantity", None);

    let result = reconcile_products(vec![row]).unwrap();

    assert_eq!(result.records[0].stock_quantity, 0);
    assert_eq!(result.records[0].surrogate_id, SurrogateId(9));
}

#[test]
fn test_negative_price_rejected() {
    let rows = vec![product_row("P001", None, Some("-4"))];
    let err = reconcile_products(rows).unwrap_err();
    assert!(matches!(err, EtlError::InvalidNumber { .. }));
}

#[test]
fn test_median() {
    assert_eq!(median(&[]), None);
    assert_eq!(median(&[4.0]), Some(4.0));
    assert_eq!(median(&[300.0, 100.0]), Some(200.0));
    assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
    assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), Some(2.5));
}
