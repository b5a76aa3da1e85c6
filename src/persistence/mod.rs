//! Persistence collaborator
//!
//! The transform stage hands finished collections to a [`RecordSink`] in
//! batches. Customers, products and sales are inserted with duplicate keys
//! ignored; orders are inserted fresh and the sink returns the identity it
//! generated for each, which links the order items.
//!
//! - [`memory`] - Staged/committed in-memory tables
//! - [`parquet`] - In-memory tables snapshotted to Parquet files on commit

pub mod memory;
pub mod parquet;

pub use memory::{InMemoryStore, Tables};
pub use parquet::ParquetStore;

use crate::error::{PipelineStage, Result};
use crate::models::{
    CanonicalCustomer, CanonicalProduct, CanonicalSale, LinkedOrderItem, Order, OrderRef,
};
use crate::reconcile::{ReconciliationOutcome, link_order_items};
use indicatif::ProgressBar;
use std::collections::HashMap;
use tracing::{error, info, warn};

/// Batch-insert contract of the persistence layer
pub trait RecordSink: Send {
    /// Insert customers, ignoring existing surrogate ids and emails. Returns
    /// the number of rows inserted.
    fn insert_customers(&mut self, customers: &[CanonicalCustomer]) -> Result<usize>;

    /// Insert products, ignoring existing surrogate ids
    fn insert_products(&mut self, products: &[CanonicalProduct]) -> Result<usize>;

    /// Insert sales, ignoring existing transaction ids
    fn insert_sales(&mut self, sales: &[CanonicalSale]) -> Result<usize>;

    /// Insert orders and return the generated identity per transaction id
    fn insert_orders(&mut self, orders: &[Order]) -> Result<HashMap<String, OrderRef>>;

    /// Insert order items linked to persisted orders
    fn insert_order_items(&mut self, items: &[LinkedOrderItem]) -> Result<usize>;

    /// Make all work since the last commit durable
    fn commit(&mut self) -> Result<()>;

    /// Discard all work since the last commit
    fn rollback(&mut self) -> Result<()>;
}

/// Row counts written by one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub customers: usize,
    pub products: usize,
    pub sales: usize,
    pub orders: usize,
    pub order_items: usize,
    pub skipped_items: usize,
}

/// Load a reconciled batch into the sink and commit.
///
/// On any failure the sink is rolled back and the error returned, tagged
/// with the load stage.
pub fn load_outcome(
    sink: &mut dyn RecordSink,
    outcome: &ReconciliationOutcome,
    progress: Option<&ProgressBar>,
) -> Result<LoadSummary> {
    match write_batches(sink, outcome, progress) {
        Ok(summary) => {
            info!(
                "Load committed: {} customers, {} products, {} sales, {} orders, {} items",
                summary.customers,
                summary.products,
                summary.sales,
                summary.orders,
                summary.order_items
            );
            Ok(summary)
        }
        Err(load_error) => {
            if let Err(rollback_error) = sink.rollback() {
                error!("Rollback after failed load also failed: {}", rollback_error);
            }
            Err(load_error.in_stage(PipelineStage::Load))
        }
    }
}

fn write_batches(
    sink: &mut dyn RecordSink,
    outcome: &ReconciliationOutcome,
    progress: Option<&ProgressBar>,
) -> Result<LoadSummary> {
    let step = |message: &str| {
        if let Some(pb) = progress {
            pb.set_message(message.to_string());
            pb.inc(1);
        }
    };

    let mut summary = LoadSummary::default();

    step("Loading customers");
    summary.customers = sink.insert_customers(&outcome.customers)?;
    step("Loading products");
    summary.products = sink.insert_products(&outcome.products)?;
    step("Loading sales");
    summary.sales = sink.insert_sales(&outcome.sales)?;

    step("Loading orders");
    let order_refs = sink.insert_orders(&outcome.orders.orders)?;
    summary.orders = order_refs.len();

    step("Loading order items");
    let (linked, skipped) = link_order_items(&outcome.orders.items, &order_refs);
    if skipped > 0 {
        warn!("{} order items skipped for unpersisted orders", skipped);
    }
    summary.skipped_items = skipped;
    summary.order_items = sink.insert_order_items(&linked)?;

    step("Committing");
    sink.commit()?;

    Ok(summary)
}

/// Number of progress steps [`load_outcome`] reports
pub const LOAD_STEPS: u64 = 6;
