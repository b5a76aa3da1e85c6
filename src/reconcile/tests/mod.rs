//! Tests for the reconciliation module
//!
//! Fixture helpers shared by the per-reconciler test files.

pub mod customer_tests;
pub mod product_tests;

use crate::models::{
    CanonicalCustomer, CanonicalProduct, CanonicalSale, RawRecord, SurrogateId,
};
use chrono::NaiveDate;

/// Raw customer row with the fields the reconciler looks at
pub fn customer_row(id: Option<&str>, email: Option<&str>) -> RawRecord {
    RawRecord::from_pairs([
        ("customer_id", id),
        ("first_name", Some("Asha")),
        ("last_name", Some("Rao")),
        ("email", email),
        ("phone", Some("98765-43210")),
        ("city", Some("Pune")),
        ("registration_date", Some("2023-05-10")),
    ])
}

/// Raw product row
pub fn product_row(id: &str, category: Option<&str>, price: Option<&str>) -> RawRecord {
    RawRecord::from_pairs([
        ("product_id", Some(id)),
        ("product_name", Some("Widget")),
        ("category", category),
        ("price", price),
        ("stock_quantity", Some("10")),
    ])
}

/// Raw sale row
pub fn sale_row(
    transaction_id: &str,
    customer_id: Option<&str>,
    product_id: Option<&str>,
    date: Option<&str>,
) -> RawRecord {
    RawRecord::from_pairs([
        ("transaction_id", Some(transaction_id)),
        ("customer_id", customer_id),
        ("product_id", product_id),
        ("transaction_date", date),
        ("quantity", Some("2")),
        ("unit_price", Some("10.0")),
        ("status", Some("Completed")),
    ])
}

pub fn canonical_customer(source_id: &str, id: i64) -> CanonicalCustomer {
    CanonicalCustomer {
        surrogate_id: SurrogateId(id),
        source_id: source_id.to_string(),
        first_name: None,
        last_name: None,
        email: format!("{}@example.com", source_id.to_lowercase()),
        phone: None,
        city: None,
        registration_date: None,
    }
}

pub fn canonical_product(source_id: &str, id: i64) -> CanonicalProduct {
    CanonicalProduct {
        surrogate_id: SurrogateId(id),
        source_id: source_id.to_string(),
        product_name: None,
        category: None,
        price: 100.0,
        stock_quantity: 0,
    }
}

pub fn canonical_sale(
    transaction_id: &str,
    customer: i64,
    product: i64,
    quantity: i64,
    unit_price: f64,
) -> CanonicalSale {
    CanonicalSale {
        transaction_id: transaction_id.to_string(),
        customer_ref: SurrogateId(customer),
        product_ref: SurrogateId(product),
        transaction_date: date(2024, 2, 1),
        quantity,
        unit_price,
        status: Some("Completed".to_string()),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
