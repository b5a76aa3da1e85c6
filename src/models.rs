//! Core data structures for the reconciliation pipeline.
//!
//! Defines the raw row representation handed over by the extraction
//! collaborator, the canonical records produced by the reconcilers, and the
//! order structures rebuilt from flat sales rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three input feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feed {
    Customers,
    Products,
    Sales,
}

impl Feed {
    /// All feeds, in report order
    pub const ALL: [Feed; 3] = [Feed::Customers, Feed::Products, Feed::Sales];

    /// Singular name used in log lines and error messages
    pub fn entity_name(&self) -> &'static str {
        match self {
            Feed::Customers => "customer",
            Feed::Products => "product",
            Feed::Sales => "sale",
        }
    }

    /// Columns the feed must carry
    pub fn required_columns(&self) -> &'static [&'static str] {
        use crate::constants::{customer_columns, product_columns, sale_columns};
        match self {
            Feed::Customers => customer_columns::ALL,
            Feed::Products => product_columns::ALL,
            Feed::Sales => sale_columns::ALL,
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feed::Customers => "customers",
            Feed::Products => "products",
            Feed::Sales => "sales",
        };
        f.write_str(name)
    }
}

/// One input row: column name to raw cell value, in source column order.
///
/// Blank and whitespace-only cells are reported as absent by [`RawRecord::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, Option<String>)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(column, value)` pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, Option<V>)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(column, value)| (column.into(), value.map(Into::into)))
                .collect(),
        }
    }

    /// Set a column, replacing an existing value in place
    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Trimmed value of a column, or `None` when the column is absent, null or blank
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Owned copy of [`RawRecord::get`]
    pub fn get_owned(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Raw rows of all three feeds for one run
#[derive(Debug, Clone, Default)]
pub struct FeedBatch {
    pub customers: Vec<RawRecord>,
    pub products: Vec<RawRecord>,
    pub sales: Vec<RawRecord>,
}

/// Integer join key derived from a feed's source identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SurrogateId(pub i64);

impl SurrogateId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCustomer {
    pub surrogate_id: SurrogateId,
    pub source_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub registration_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalProduct {
    pub surrogate_id: SurrogateId,
    pub source_id: String,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub price: f64,
    pub stock_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSale {
    pub transaction_id: String,
    pub customer_ref: SurrogateId,
    pub product_ref: SurrogateId,
    pub transaction_date: NaiveDate,
    pub quantity: i64,
    pub unit_price: f64,
    pub status: Option<String>,
}

impl CanonicalSale {
    /// Line value of this sale
    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Identity assigned to an order by the persistence collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderRef(pub u64);

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parent order rebuilt from the sales rows sharing a transaction id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub transaction_id: String,
    pub customer_ref: SurrogateId,
    pub order_date: NaiveDate,
    pub total_amount: f64,
    pub status: Option<String>,
}

/// Line item of an order, keyed by its transaction until the order is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub transaction_id: String,
    pub product_ref: SurrogateId,
    pub quantity: i64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// Order item linked to the identity of its persisted order
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedOrderItem {
    pub order_ref: OrderRef,
    pub item: OrderItem,
}
