//! Parquet-backed record sink
//!
//! Wraps an [`InMemoryStore`] and, on commit, writes the full table
//! snapshot as one parquet file per table. Files are written into a
//! temporary directory inside the output directory and renamed into place,
//! so a failed commit leaves the previous tables untouched.

use crate::config::CompressionAlgorithm;
use crate::error::{EtlError, Result};
use crate::models::{
    CanonicalCustomer, CanonicalProduct, CanonicalSale, LinkedOrderItem, Order, OrderRef,
};
use crate::normalize::format_date;
use polars::prelude::{DataFrame, ParquetWriter, PolarsResult};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use super::{InMemoryStore, RecordSink, Tables};

/// Names of the written tables, in write order
pub const TABLE_NAMES: [&str; 5] = ["customers", "products", "sales", "orders", "order_items"];

#[derive(Debug)]
pub struct ParquetStore {
    inner: InMemoryStore,
    output_dir: PathBuf,
    compression: CompressionAlgorithm,
}

impl ParquetStore {
    pub fn new(output_dir: impl Into<PathBuf>, compression: CompressionAlgorithm) -> Self {
        Self {
            inner: InMemoryStore::new(),
            output_dir: output_dir.into(),
            compression,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of a table's parquet file
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}.parquet"))
    }

    /// Committed tables held in memory
    pub fn committed(&self) -> &Tables {
        self.inner.committed()
    }

    fn write_tables(&self, tables: &Tables) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        let staging = TempDir::new_in(&self.output_dir)?;

        let frames = [
            customers_frame(tables.customers.values())?,
            products_frame(tables.products.values())?,
            sales_frame(tables.sales.values())?,
            orders_frame(&tables.orders)?,
            order_items_frame(&tables.order_items)?,
        ];

        for (name, mut frame) in TABLE_NAMES.iter().zip(frames) {
            let staged_path = staging.path().join(format!("{name}.parquet"));
            let file = File::create(&staged_path)?;
            ParquetWriter::new(file)
                .with_compression(self.compression.to_polars_compression())
                .finish(&mut frame)?;
            debug!("Staged {} rows for table {}", frame.height(), name);
        }

        for name in TABLE_NAMES {
            let file_name = format!("{name}.parquet");
            fs::rename(staging.path().join(&file_name), self.output_dir.join(&file_name))
                .map_err(|e| {
                    EtlError::persistence(format!("could not move table {name} into place: {e}"))
                })?;
        }

        info!(
            "Wrote {} tables to {}",
            TABLE_NAMES.len(),
            self.output_dir.display()
        );
        Ok(())
    }
}

impl RecordSink for ParquetStore {
    fn insert_customers(&mut self, customers: &[CanonicalCustomer]) -> Result<usize> {
        self.inner.insert_customers(customers)
    }

    fn insert_products(&mut self, products: &[CanonicalProduct]) -> Result<usize> {
        self.inner.insert_products(products)
    }

    fn insert_sales(&mut self, sales: &[CanonicalSale]) -> Result<usize> {
        self.inner.insert_sales(sales)
    }

    fn insert_orders(&mut self, orders: &[Order]) -> Result<HashMap<String, OrderRef>> {
        self.inner.insert_orders(orders)
    }

    fn insert_order_items(&mut self, items: &[LinkedOrderItem]) -> Result<usize> {
        self.inner.insert_order_items(items)
    }

    fn commit(&mut self) -> Result<()> {
        let snapshot = self.inner.snapshot();
        self.write_tables(&snapshot)?;
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.inner.rollback()
    }
}

fn customers_frame<'a>(
    customers: impl Iterator<Item = &'a CanonicalCustomer>,
) -> PolarsResult<DataFrame> {
    let customers: Vec<&CanonicalCustomer> = customers.collect();
    let registration: Vec<Option<String>> = customers
        .iter()
        .map(|c| c.registration_date.map(format_date))
        .collect();

    polars::df!(
        "customer_id" => customers.iter().map(|c| c.surrogate_id.value()).collect::<Vec<i64>>(),
        "source_id" => customers.iter().map(|c| c.source_id.as_str()).collect::<Vec<&str>>(),
        "first_name" => customers.iter().map(|c| c.first_name.as_deref()).collect::<Vec<Option<&str>>>(),
        "last_name" => customers.iter().map(|c| c.last_name.as_deref()).collect::<Vec<Option<&str>>>(),
        "email" => customers.iter().map(|c| c.email.as_str()).collect::<Vec<&str>>(),
        "phone" => customers.iter().map(|c| c.phone.as_deref()).collect::<Vec<Option<&str>>>(),
        "city" => customers.iter().map(|c| c.city.as_deref()).collect::<Vec<Option<&str>>>(),
        "registration_date" => registration.iter().map(|d| d.as_deref()).collect::<Vec<Option<&str>>>(),
    )
}

fn products_frame<'a>(
    products: impl Iterator<Item = &'a CanonicalProduct>,
) -> PolarsResult<DataFrame> {
    let products: Vec<&CanonicalProduct> = products.collect();

    polars::df!(
        "product_id" => products.iter().map(|p| p.surrogate_id.value()).collect::<Vec<i64>>(),
        "source_id" => products.iter().map(|p| p.source_id.as_str()).collect::<Vec<&str>>(),
        "product_name" => products.iter().map(|p| p.product_name.as_deref()).collect::<Vec<Option<&str>>>(),
        "category" => products.iter().map(|p| p.category.as_deref()).collect::<Vec<Option<&str>>>(),
        "price" => products.iter().map(|p| p.price).collect::<Vec<f64>>(),
        "stock_quantity" => products.iter().map(|p| p.stock_quantity).collect::<Vec<i64>>(),
    )
}

fn sales_frame<'a>(sales: impl Iterator<Item = &'a CanonicalSale>) -> PolarsResult<DataFrame> {
    let sales: Vec<&CanonicalSale> = sales.collect();
    let dates: Vec<String> = sales.iter().map(|s| format_date(s.transaction_date)).collect();

    polars::df!(
        "transaction_id" => sales.iter().map(|s| s.transaction_id.as_str()).collect::<Vec<&str>>(),
        "customer_id" => sales.iter().map(|s| s.customer_ref.value()).collect::<Vec<i64>>(),
        "product_id" => sales.iter().map(|s| s.product_ref.value()).collect::<Vec<i64>>(),
        "transaction_date" => dates.iter().map(String::as_str).collect::<Vec<&str>>(),
        "quantity" => sales.iter().map(|s| s.quantity).collect::<Vec<i64>>(),
        "unit_price" => sales.iter().map(|s| s.unit_price).collect::<Vec<f64>>(),
        "status" => sales.iter().map(|s| s.status.as_deref()).collect::<Vec<Option<&str>>>(),
    )
}

fn orders_frame(orders: &std::collections::BTreeMap<OrderRef, Order>) -> PolarsResult<DataFrame> {
    let dates: Vec<String> = orders.values().map(|o| format_date(o.order_date)).collect();

    polars::df!(
        "order_id" => orders.keys().map(|r| r.0).collect::<Vec<u64>>(),
        "transaction_id" => orders.values().map(|o| o.transaction_id.as_str()).collect::<Vec<&str>>(),
        "customer_id" => orders.values().map(|o| o.customer_ref.value()).collect::<Vec<i64>>(),
        "order_date" => dates.iter().map(String::as_str).collect::<Vec<&str>>(),
        "total_amount" => orders.values().map(|o| o.total_amount).collect::<Vec<f64>>(),
        "status" => orders.values().map(|o| o.status.as_deref()).collect::<Vec<Option<&str>>>(),
    )
}

fn order_items_frame(items: &[LinkedOrderItem]) -> PolarsResult<DataFrame> {
    polars::df!(
        "order_id" => items.iter().map(|l| l.order_ref.0).collect::<Vec<u64>>(),
        "product_id" => items.iter().map(|l| l.item.product_ref.value()).collect::<Vec<i64>>(),
        "quantity" => items.iter().map(|l| l.item.quantity).collect::<Vec<i64>>(),
        "unit_price" => items.iter().map(|l| l.item.unit_price).collect::<Vec<f64>>(),
        "subtotal" => items.iter().map(|l| l.item.subtotal).collect::<Vec<f64>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderItem, SurrogateId};
    use chrono::NaiveDate;
    use polars::prelude::{ParquetReader, SerReader};

    fn product(id: i64, price: f64) -> CanonicalProduct {
        CanonicalProduct {
            surrogate_id: SurrogateId(id),
            source_id: format!("P{id:03}"),
            product_name: Some("Lamp".to_string()),
            category: None,
            price,
            stock_quantity: 3,
        }
    }

    fn read(path: &Path) -> DataFrame {
        ParquetReader::new(File::open(path).unwrap()).finish().unwrap()
    }

    #[test]
    fn test_commit_writes_every_table() {
        let dir = TempDir::new().unwrap();
        let mut store = ParquetStore::new(dir.path().join("warehouse"), CompressionAlgorithm::Snappy);

        store
            .insert_customers(&[CanonicalCustomer {
                surrogate_id: SurrogateId(1),
                source_id: "C001".to_string(),
                first_name: Some("Asha".to_string()),
                last_name: None,
                email: "asha@example.com".to_string(),
                phone: Some("+91-9876543210".to_string()),
                city: None,
                registration_date: None,
            }])
            .unwrap();
        store.insert_products(&[product(1, 10.0), product(2, 20.0)]).unwrap();
        let refs = store
            .insert_orders(&[Order {
                transaction_id: "T1".to_string(),
                customer_ref: SurrogateId(1),
                order_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                total_amount: 30.0,
                status: Some("Completed".to_string()),
            }])
            .unwrap();
        store
            .insert_order_items(&[LinkedOrderItem {
                order_ref: refs["T1"],
                item: OrderItem {
                    transaction_id: "T1".to_string(),
                    product_ref: SurrogateId(1),
                    quantity: 3,
                    unit_price: 10.0,
                    subtotal: 30.0,
                },
            }])
            .unwrap();
        store.commit().unwrap();

        for table in TABLE_NAMES {
            assert!(store.table_path(table).exists(), "missing table {table}");
        }

        let products = read(&store.table_path("products"));
        assert_eq!(products.height(), 2);
        let orders = read(&store.table_path("orders"));
        assert_eq!(orders.height(), 1);
        let customers = read(&store.table_path("customers"));
        assert_eq!(customers.height(), 1);

        let leftovers: Vec<_> = fs::read_dir(store.output_dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_rollback_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = ParquetStore::new(dir.path().join("warehouse"), CompressionAlgorithm::Zstd);

        store.insert_products(&[product(1, 10.0)]).unwrap();
        store.rollback().unwrap();

        assert!(!store.table_path("products").exists());
        assert!(store.committed().products.is_empty());
    }
}
