//! Run configuration and validation.
//!
//! Provides the [`EtlConfig`] structure describing where the feeds live,
//! where the warehouse tables and the data quality report are written, and
//! the knobs that change reconciliation behavior.

use crate::constants::{
    DEFAULT_COUNTRY_CODE, DEFAULT_CUSTOMERS_FILE, DEFAULT_OUTPUT_DIR, DEFAULT_PRODUCTS_FILE,
    DEFAULT_REPORT_FILE, DEFAULT_SALES_FILE,
};
use crate::error::{EtlError, Result};
use crate::extract::FeedPaths;
use crate::reconcile::GroupingPolicy;
use clap::ValueEnum;
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Configuration for one ETL run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Customer feed CSV
    pub customers_path: PathBuf,

    /// Product feed CSV
    pub products_path: PathBuf,

    /// Sales feed CSV
    pub sales_path: PathBuf,

    /// Directory receiving the warehouse tables
    pub output_dir: PathBuf,

    /// Data quality report destination
    pub report_path: PathBuf,

    /// Country calling code prefixed to normalized phone numbers
    pub country_code: String,

    /// How rows of one transaction with divergent header fields are handled
    pub grouping_policy: GroupingPolicy,

    /// Compression of the written parquet tables
    pub compression: CompressionAlgorithm,

    /// Show a progress spinner while loading
    pub show_progress: bool,

    /// Reconcile and load into memory only; write neither tables nor report
    pub dry_run: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            customers_path: PathBuf::from(DEFAULT_CUSTOMERS_FILE),
            products_path: PathBuf::from(DEFAULT_PRODUCTS_FILE),
            sales_path: PathBuf::from(DEFAULT_SALES_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            report_path: PathBuf::from(DEFAULT_REPORT_FILE),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            grouping_policy: GroupingPolicy::default(),
            compression: CompressionAlgorithm::default(),
            show_progress: true,
            dry_run: false,
        }
    }
}

impl EtlConfig {
    /// Read all feeds from one directory under their default file names
    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.customers_path = dir.join(DEFAULT_CUSTOMERS_FILE);
        self.products_path = dir.join(DEFAULT_PRODUCTS_FILE);
        self.sales_path = dir.join(DEFAULT_SALES_FILE);
        self
    }

    pub fn with_customers_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.customers_path = path.into();
        self
    }

    pub fn with_products_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.products_path = path.into();
        self
    }

    pub fn with_sales_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sales_path = path.into();
        self
    }

    /// Set the warehouse output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the report destination
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = path.into();
        self
    }

    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    pub fn with_grouping_policy(mut self, policy: GroupingPolicy) -> Self {
        self.grouping_policy = policy;
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    /// Disable the progress spinner
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Feed locations for extraction
    pub fn feed_paths(&self) -> FeedPaths {
        FeedPaths {
            customers: self.customers_path.clone(),
            products: self.products_path.clone(),
            sales: self.sales_path.clone(),
        }
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.country_code.is_empty() || !self.country_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(EtlError::configuration(format!(
                "Country code must be non-empty and all digits, got '{}'",
                self.country_code
            )));
        }

        for (name, path) in [
            ("customers", &self.customers_path),
            ("products", &self.products_path),
            ("sales", &self.sales_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(EtlError::configuration(format!(
                    "No path given for the {} feed",
                    name
                )));
            }
        }

        if self.output_dir.is_file() {
            return Err(EtlError::configuration(format!(
                "Output path is a file, not a directory: {}",
                self.output_dir.display()
            )));
        }

        if self.report_path.is_dir() {
            return Err(EtlError::configuration(format!(
                "Report path is a directory: {}",
                self.report_path.display()
            )));
        }

        debug!("Configuration validated: {:?}", self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_use_feed_file_names() {
        let config = EtlConfig::default();
        assert_eq!(config.customers_path, PathBuf::from("customers_raw.csv"));
        assert_eq!(config.report_path, PathBuf::from("data_quality_report.txt"));
        assert_eq!(config.country_code, "91");
        assert_eq!(config.grouping_policy, GroupingPolicy::FirstWins);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_input_dir_builder() {
        let config = EtlConfig::default().with_input_dir("/data/in");
        let paths = config.feed_paths();
        assert_eq!(paths.products, PathBuf::from("/data/in/products_raw.csv"));
        assert_eq!(paths.sales, PathBuf::from("/data/in/sales_raw.csv"));
    }

    #[test]
    fn test_bad_country_code_rejected() {
        let config = EtlConfig::default().with_country_code("+91");
        assert!(matches!(
            config.validate(),
            Err(EtlError::Configuration { .. })
        ));
    }

    #[test]
    fn test_report_path_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let config = EtlConfig::default().with_report_path(dir.path());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compression_mapping() {
        assert!(matches!(
            CompressionAlgorithm::Zstd.to_polars_compression(),
            ParquetCompression::Zstd(None)
        ));
        assert!(matches!(
            CompressionAlgorithm::default().to_polars_compression(),
            ParquetCompression::Snappy
        ));
    }
}
