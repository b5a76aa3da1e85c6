//! End-to-end pipeline
//!
//! Orchestrates one run: extract the three feeds, reconcile customers and
//! products concurrently, reconcile sales against both, aggregate orders,
//! load everything into a [`RecordSink`] and finally write the data
//! quality report. Every failure surfaces tagged with the stage it came
//! from, and the report is only written after a successful load.

use crate::config::EtlConfig;
use crate::error::{EtlError, PipelineStage, Result};
use crate::extract::read_feeds;
use crate::metrics::RunMetrics;
use crate::models::FeedBatch;
use crate::persistence::{
    InMemoryStore, LOAD_STEPS, LoadSummary, ParquetStore, RecordSink, load_outcome,
};
use crate::reconcile::{ReconciliationOutcome, Reconciler};
use crate::report::{render_report, write_report};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{debug, info};

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub metrics: RunMetrics,
    pub load: LoadSummary,
    /// Report location, absent on a dry run
    pub report_path: Option<PathBuf>,
    /// Warehouse directory, absent on a dry run
    pub output_dir: Option<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "{} customers, {} products, {} sales, {} orders ({} items) in {:.2}s",
            self.load.customers,
            self.load.products,
            self.load.sales,
            self.load.orders,
            self.load.order_items,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Runs the ETL for one configuration
#[derive(Debug, Clone)]
pub struct EtlPipeline {
    config: EtlConfig,
    reconciler: Reconciler,
}

impl EtlPipeline {
    pub fn new(config: EtlConfig) -> Self {
        let reconciler = Reconciler::new(config.country_code.clone(), config.grouping_policy);
        Self { config, reconciler }
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Run against the sink the configuration selects: parquet tables in the
    /// output directory, or memory only for a dry run
    pub async fn run(&self) -> Result<RunSummary> {
        if self.config.dry_run {
            info!("Dry run: tables and report will not be written");
            let (summary, _) = self.run_with_sink(InMemoryStore::new()).await?;
            Ok(summary)
        } else {
            let store = ParquetStore::new(&self.config.output_dir, self.config.compression);
            let (summary, _) = self.run_with_sink(store).await?;
            Ok(summary)
        }
    }

    /// Run against a caller-supplied sink, handing the sink back afterwards
    pub async fn run_with_sink<S>(&self, sink: S) -> Result<(RunSummary, S)>
    where
        S: RecordSink + 'static,
    {
        let start = Instant::now();
        self.config
            .validate()
            .map_err(|e| e.in_stage(PipelineStage::Extract))?;

        let paths = self.config.feed_paths();
        let batch = read_feeds(&paths)
            .await
            .map_err(|e| e.in_stage(PipelineStage::Extract))?;

        let outcome = self.reconcile(batch).await?;
        let metrics = outcome.metrics;
        for (feed, bucket) in metrics.iter() {
            info!("{}: {}", feed, bucket.summary());
        }

        let progress = self.load_progress();
        let (load, sink) = task::spawn_blocking(move || {
            let mut sink = sink;
            let load = load_outcome(&mut sink, &outcome, progress.as_ref());
            if let Some(pb) = &progress {
                pb.finish_and_clear();
            }
            (load, sink)
        })
        .await
        .map_err(|e| EtlError::from(e).in_stage(PipelineStage::Load))?;
        let load = load?;

        let report_path = if self.config.dry_run {
            None
        } else {
            let report = render_report(&metrics, &paths);
            write_report(&self.config.report_path, &report)?;
            Some(self.config.report_path.clone())
        };

        let summary = RunSummary {
            metrics,
            load,
            report_path,
            output_dir: (!self.config.dry_run).then(|| self.config.output_dir.clone()),
            elapsed: start.elapsed(),
        };
        info!("Run complete: {}", summary.summary());
        Ok((summary, sink))
    }

    /// Customers and products are independent and reconciled concurrently;
    /// sales waits for both.
    async fn reconcile(&self, batch: FeedBatch) -> Result<ReconciliationOutcome> {
        let FeedBatch {
            customers,
            products,
            sales,
        } = batch;

        let customer_reconciler = self.reconciler.clone();
        let product_reconciler = self.reconciler.clone();
        let (customers, products) = tokio::try_join!(
            task::spawn_blocking(move || customer_reconciler.customers(customers)),
            task::spawn_blocking(move || product_reconciler.products(products)),
        )?;
        let customers = customers?;
        let products = products?;
        debug!(
            "Reference sets ready: {} customers, {} products",
            customers.len(),
            products.len()
        );

        let reconciler = self.reconciler.clone();
        task::spawn_blocking(move || {
            let sales = reconciler.sales(sales, &customers.records, &products.records)?;
            let orders = reconciler.orders(&sales.records)?;
            Ok(ReconciliationOutcome::assemble(
                customers, products, sales, orders,
            ))
        })
        .await?
    }

    fn load_progress(&self) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }

        let pb = ProgressBar::new(LOAD_STEPS);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Loading...");
        Some(pb)
    }
}
