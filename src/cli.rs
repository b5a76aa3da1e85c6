//! Command-line interface components.

use crate::config::{CompressionAlgorithm, EtlConfig};
use crate::constants::{
    DEFAULT_COUNTRY_CODE, DEFAULT_CUSTOMERS_FILE, DEFAULT_OUTPUT_DIR, DEFAULT_PRODUCTS_FILE,
    DEFAULT_REPORT_FILE, DEFAULT_SALES_FILE,
};
use crate::pipeline::{EtlPipeline, RunSummary};
use crate::reconcile::GroupingPolicy;
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug, Clone)]
#[command(name = "retail_etl")]
#[command(
    about = "Reconcile customer, product and sales feeds into a normalized warehouse with a data quality report"
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Customer feed CSV
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CUSTOMERS_FILE)]
    pub customers: PathBuf,

    /// Product feed CSV
    #[arg(long, value_name = "FILE", default_value = DEFAULT_PRODUCTS_FILE)]
    pub products: PathBuf,

    /// Sales feed CSV
    #[arg(long, value_name = "FILE", default_value = DEFAULT_SALES_FILE)]
    pub sales: PathBuf,

    /// Directory receiving the parquet tables
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Data quality report destination
    #[arg(long, value_name = "FILE", default_value = DEFAULT_REPORT_FILE)]
    pub report: PathBuf,

    /// Country calling code for normalized phone numbers
    #[arg(long, value_name = "DIGITS", default_value = DEFAULT_COUNTRY_CODE)]
    pub country_code: String,

    /// Fail when rows of one transaction disagree on customer, date or status
    #[arg(long)]
    pub strict_orders: bool,

    /// Parquet compression algorithm
    #[arg(long, value_enum, default_value_t = CompressionAlgorithm::Snappy)]
    pub compression: CompressionAlgorithm,

    /// Reconcile and load in memory only; write no tables and no report
    #[arg(long)]
    pub dry_run: bool,

    /// Hide the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress is shown unless quiet or explicitly disabled
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.no_progress
    }

    pub fn grouping_policy(&self) -> GroupingPolicy {
        if self.strict_orders {
            GroupingPolicy::Strict
        } else {
            GroupingPolicy::FirstWins
        }
    }

    /// Map the arguments onto a run configuration
    pub fn to_config(&self) -> EtlConfig {
        let mut config = EtlConfig::default()
            .with_customers_path(&self.customers)
            .with_products_path(&self.products)
            .with_sales_path(&self.sales)
            .with_output_dir(&self.output_dir)
            .with_report_path(&self.report)
            .with_country_code(&self.country_code)
            .with_grouping_policy(self.grouping_policy())
            .with_compression(self.compression);

        if !self.show_progress() {
            config = config.without_progress();
        }
        if self.dry_run {
            config = config.with_dry_run();
        }
        config
    }
}

/// Set up logging, run the pipeline and print the summary
pub async fn run(args: Args) -> Result<RunSummary> {
    setup_logging(&args);

    info!("Starting retail ETL");
    debug!("Command line arguments: {:?}", args);

    let config = args.to_config();
    config.validate().context("Invalid configuration")?;

    let pipeline = EtlPipeline::new(config);
    let summary = pipeline.run().await?;

    if !args.quiet {
        print_summary(&summary);
    }
    Ok(summary)
}

fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("retail_etl={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    debug!("Logging initialized at level: {}", log_level);
}

/// Print the colored run summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("\n{}", "ETL Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        summary.elapsed.as_millis().to_string().bright_white()
    );

    for (feed, bucket) in summary.metrics.iter() {
        println!(
            "  {} {} processed, {} duplicates, {} missing, {} loaded",
            format!("{:<10}", format!("{}:", feed)).bright_cyan(),
            bucket.processed.to_string().bright_white(),
            bucket.duplicates.to_string().bright_yellow(),
            bucket.missing.to_string().bright_yellow(),
            bucket.loaded.to_string().bright_white().bold()
        );
    }

    println!(
        "  {} {} ({} items)",
        "Orders:".bright_cyan(),
        summary.load.orders.to_string().bright_white().bold(),
        summary.load.order_items.to_string().bright_white()
    );
    if summary.load.skipped_items > 0 {
        println!(
            "  {} {}",
            "Items skipped:".bright_red(),
            summary.load.skipped_items.to_string().bright_red().bold()
        );
    }

    match (&summary.output_dir, &summary.report_path) {
        (Some(output_dir), Some(report)) => {
            println!(
                "  {} {}",
                "Tables:".bright_cyan(),
                output_dir.display().to_string().bright_white()
            );
            println!(
                "  {} {}",
                "Report:".bright_cyan(),
                report.display().to_string().bright_white()
            );
        }
        _ => println!("  {}", "Dry run: nothing written".bright_yellow()),
    }
}
