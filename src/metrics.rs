//! Data-quality metrics for a reconciliation run
//!
//! Each reconciler returns its own [`MetricsBucket`]; the pipeline collects
//! them into [`RunMetrics`], which the report generator reads.

use crate::models::Feed;
use serde::{Deserialize, Serialize};

/// Data-quality counters for one feed.
///
/// `processed = duplicates + missing + loaded` is not guaranteed: a missing
/// value that was repaired is counted but the row is still loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsBucket {
    /// Rows received from the feed
    pub processed: usize,
    /// Rows removed as duplicates of an earlier row
    pub duplicates: usize,
    /// Missing or invalid values detected (repaired or dropped)
    pub missing: usize,
    /// Rows in the reconciled output
    pub loaded: usize,
}

impl MetricsBucket {
    /// Bucket for a feed of `processed` input rows
    pub fn new(processed: usize) -> Self {
        Self {
            processed,
            ..Self::default()
        }
    }

    pub fn record_duplicates(&mut self, count: usize) {
        self.duplicates += count;
    }

    pub fn record_missing(&mut self, count: usize) {
        self.missing += count;
    }

    pub fn record_loaded(&mut self, count: usize) {
        self.loaded = count;
    }

    /// Share of input rows that reached the output, as a percentage
    pub fn load_rate(&self) -> f64 {
        if self.processed == 0 {
            100.0
        } else {
            (self.loaded as f64 / self.processed as f64) * 100.0
        }
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "{} processed -> {} loaded ({:.1}%) | duplicates: {} | missing: {}",
            self.processed,
            self.loaded,
            self.load_rate(),
            self.duplicates,
            self.missing
        )
    }
}

/// Metrics for all three feeds of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub customers: MetricsBucket,
    pub products: MetricsBucket,
    pub sales: MetricsBucket,
}

impl RunMetrics {
    pub fn bucket(&self, feed: Feed) -> &MetricsBucket {
        match feed {
            Feed::Customers => &self.customers,
            Feed::Products => &self.products,
            Feed::Sales => &self.sales,
        }
    }

    pub fn bucket_mut(&mut self, feed: Feed) -> &mut MetricsBucket {
        match feed {
            Feed::Customers => &mut self.customers,
            Feed::Products => &mut self.products,
            Feed::Sales => &mut self.sales,
        }
    }

    /// Buckets in report order: customers, products, sales
    pub fn iter(&self) -> impl Iterator<Item = (Feed, &MetricsBucket)> {
        Feed::ALL.into_iter().map(move |feed| (feed, self.bucket(feed)))
    }
}
