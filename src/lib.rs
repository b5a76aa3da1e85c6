//! Retail ETL Library
//!
//! Reconciles three raw retail feeds (customers, products and sales) into a
//! normalized relational schema and measures the data quality of each feed.
//!
//! This library provides tools for:
//! - Normalizing phone numbers, dates, categories and source identifiers
//! - Deduplicating and repairing the customer and product feeds
//! - Validating sales for completeness and referential integrity
//! - Rebuilding orders and line items from validated sales
//! - Loading the results through a transactional [`persistence::RecordSink`]
//! - Writing a plain-text data quality report

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod persistence;
pub mod pipeline;
pub mod reconcile;
pub mod report;

// Re-export commonly used types
pub use config::{CompressionAlgorithm, EtlConfig};
pub use error::{EtlError, PipelineStage, Result};
pub use metrics::{MetricsBucket, RunMetrics};
pub use models::{
    CanonicalCustomer, CanonicalProduct, CanonicalSale, Feed, FeedBatch, Order, OrderItem,
    RawRecord, SurrogateId,
};
pub use pipeline::{EtlPipeline, RunSummary};
pub use reconcile::{GroupingPolicy, ReconciliationOutcome, Reconciler};
