//! Reconciliation of the customer, product and sales feeds
//!
//! This module is the transform stage of the pipeline: it turns raw feed rows
//! into canonical records and rebuilds orders from flat sales rows.
//!
//! # Architecture
//!
//! - [`deduplication`] - Stable first-occurrence deduplication
//! - [`customers`] - Customer dedup, email repair, phone/date normalization
//! - [`products`] - Product dedup, median price fill, category cleanup
//! - [`sales`] - Sales dedup, completeness check, referential filter
//! - [`orders`] - Order and line item reconstruction
//!
//! # Stage Order
//!
//! Customers and products are independent of each other. Sales are
//! validated against the surrogate ids of both reconciled feeds, so they run
//! only after both are final. Each stage returns its own
//! [`MetricsBucket`]; nothing is shared between stages.

pub mod customers;
pub mod deduplication;
pub mod orders;
pub mod products;
pub mod sales;

#[cfg(test)]
pub mod tests;

pub use customers::reconcile_customers;
pub use orders::{AggregatedOrders, GroupingPolicy, aggregate_orders, link_order_items};
pub use products::reconcile_products;
pub use sales::reconcile_sales;

use crate::error::{PipelineStage, Result};
use crate::metrics::{MetricsBucket, RunMetrics};
use crate::models::{
    CanonicalCustomer, CanonicalProduct, CanonicalSale, FeedBatch, RawRecord, SurrogateId,
};
use std::collections::HashSet;
use tracing::info;

/// Output of one reconciler: the canonical records and the feed's metrics
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
    pub records: Vec<T>,
    pub metrics: MetricsBucket,
}

impl<T> Reconciled<T> {
    pub fn new(records: Vec<T>, metrics: MetricsBucket) -> Self {
        Self { records, metrics }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Surrogate ids of the reconciled customer and product feeds, used by the
/// referential filter. Built once per run.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSets {
    customers: HashSet<SurrogateId>,
    products: HashSet<SurrogateId>,
}

impl ReferenceSets {
    pub fn new(customers: &[CanonicalCustomer], products: &[CanonicalProduct]) -> Self {
        Self {
            customers: customers.iter().map(|c| c.surrogate_id).collect(),
            products: products.iter().map(|p| p.surrogate_id).collect(),
        }
    }

    pub fn contains_customer(&self, id: SurrogateId) -> bool {
        self.customers.contains(&id)
    }

    pub fn contains_product(&self, id: SurrogateId) -> bool {
        self.products.contains(&id)
    }
}

/// Everything the transform stage produces for one run
#[derive(Debug, Clone, Default)]
pub struct ReconciliationOutcome {
    pub customers: Vec<CanonicalCustomer>,
    pub products: Vec<CanonicalProduct>,
    pub sales: Vec<CanonicalSale>,
    pub orders: AggregatedOrders,
    pub metrics: RunMetrics,
}

impl ReconciliationOutcome {
    /// Assemble the outcome from the per-feed results
    pub fn assemble(
        customers: Reconciled<CanonicalCustomer>,
        products: Reconciled<CanonicalProduct>,
        sales: Reconciled<CanonicalSale>,
        orders: AggregatedOrders,
    ) -> Self {
        let metrics = RunMetrics {
            customers: customers.metrics,
            products: products.metrics,
            sales: sales.metrics,
        };
        Self {
            customers: customers.records,
            products: products.records,
            sales: sales.records,
            orders,
            metrics,
        }
    }
}

/// Runs the reconcilers in dependency order on the current thread
#[derive(Debug, Clone)]
pub struct Reconciler {
    country_code: String,
    grouping_policy: GroupingPolicy,
}

impl Reconciler {
    pub fn new(country_code: impl Into<String>, grouping_policy: GroupingPolicy) -> Self {
        Self {
            country_code: country_code.into(),
            grouping_policy,
        }
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn grouping_policy(&self) -> GroupingPolicy {
        self.grouping_policy
    }

    pub fn customers(&self, rows: Vec<RawRecord>) -> Result<Reconciled<CanonicalCustomer>> {
        reconcile_customers(rows, &self.country_code)
            .map_err(|e| e.in_stage(PipelineStage::CustomerReconcile))
    }

    pub fn products(&self, rows: Vec<RawRecord>) -> Result<Reconciled<CanonicalProduct>> {
        reconcile_products(rows).map_err(|e| e.in_stage(PipelineStage::ProductReconcile))
    }

    /// Reconcile sales against the finished customer and product outputs
    pub fn sales(
        &self,
        rows: Vec<RawRecord>,
        customers: &[CanonicalCustomer],
        products: &[CanonicalProduct],
    ) -> Result<Reconciled<CanonicalSale>> {
        let references = ReferenceSets::new(customers, products);
        reconcile_sales(rows, &references).map_err(|e| e.in_stage(PipelineStage::SalesReconcile))
    }

    pub fn orders(&self, sales: &[CanonicalSale]) -> Result<AggregatedOrders> {
        aggregate_orders(sales, self.grouping_policy)
            .map_err(|e| e.in_stage(PipelineStage::OrderAggregation))
    }

    /// Reconcile a whole batch sequentially
    pub fn reconcile(&self, batch: FeedBatch) -> Result<ReconciliationOutcome> {
        info!(
            "Reconciling batch: {} customers, {} products, {} sales rows",
            batch.customers.len(),
            batch.products.len(),
            batch.sales.len()
        );

        let customers = self.customers(batch.customers)?;
        let products = self.products(batch.products)?;
        let sales = self.sales(batch.sales, &customers.records, &products.records)?;
        let orders = self.orders(&sales.records)?;

        Ok(ReconciliationOutcome::assemble(customers, products, sales, orders))
    }
}
