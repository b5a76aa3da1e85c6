//! Feed extraction
//!
//! Reads the CSV feeds with polars, every column as a string so that no
//! value is coerced before the normalizers see it, and converts the frame
//! into [`RawRecord`] rows.

use crate::error::{EtlError, Result};
use crate::models::{Feed, FeedBatch, RawRecord};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{debug, info};

/// Read one feed file into raw rows, checking the feed's required columns
pub fn read_feed(path: &Path, feed: Feed) -> Result<Vec<RawRecord>> {
    if !path.exists() {
        return Err(EtlError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} feed not found at {}", feed, path.display()),
        )));
    }

    debug!("Reading {} feed from {}", feed, path.display());

    // Schema inference disabled: every column is read as a string
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    check_required_columns(&df, path, feed)?;
    let rows = frame_to_records(&df)?;

    info!("Extracted {} {} rows", rows.len(), feed);
    Ok(rows)
}

/// Convert a frame into raw rows, cells rendered as strings
pub fn frame_to_records(df: &DataFrame) -> Result<Vec<RawRecord>> {
    let mut columns: Vec<(String, StringChunked)> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let as_text = column.cast(&DataType::String)?;
        let values = as_text.as_materialized_series().str()?.clone();
        columns.push((column.name().trim().to_string(), values));
    }

    let mut rows = Vec::with_capacity(df.height());
    for index in 0..df.height() {
        let record = RawRecord::from_pairs(
            columns
                .iter()
                .map(|(name, values)| (name.as_str(), values.get(index))),
        );
        rows.push(record);
    }

    Ok(rows)
}

fn check_required_columns(df: &DataFrame, path: &Path, feed: Feed) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_string())
        .collect();

    match feed
        .required_columns()
        .iter()
        .find(|required| !present.iter().any(|name| name == *required))
    {
        Some(missing) => Err(EtlError::MissingColumn {
            path: path.to_path_buf(),
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}

/// Locations of the three feed files
#[derive(Debug, Clone)]
pub struct FeedPaths {
    pub customers: PathBuf,
    pub products: PathBuf,
    pub sales: PathBuf,
}

impl FeedPaths {
    pub fn path(&self, feed: Feed) -> &Path {
        match feed {
            Feed::Customers => &self.customers,
            Feed::Products => &self.products,
            Feed::Sales => &self.sales,
        }
    }

    /// File name of a feed as shown in the report
    pub fn file_name(&self, feed: Feed) -> String {
        let path = self.path(feed);
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

/// Read all three feeds concurrently on blocking tasks
pub async fn read_feeds(paths: &FeedPaths) -> Result<FeedBatch> {
    let spawn = |path: PathBuf, feed: Feed| task::spawn_blocking(move || read_feed(&path, feed));

    let (customers, products, sales) = tokio::try_join!(
        spawn(paths.customers.clone(), Feed::Customers),
        spawn(paths.products.clone(), Feed::Products),
        spawn(paths.sales.clone(), Feed::Sales),
    )?;

    Ok(FeedBatch {
        customers: customers?,
        products: products?,
        sales: sales?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_feed_keeps_values_as_text() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "products.csv",
            "product_id,product_name,category,price,stock_quantity\n\
             P001,Laptop,electronics,45999.00,\n\
             P002,Mouse,,799,50\n",
        );

        let rows = read_feed(&path, Feed::Products).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("price"), Some("45999.00"));
        assert_eq!(rows[0].get("stock_quantity"), None);
        assert_eq!(rows[1].get("category"), None);
        assert_eq!(rows[1].get("stock_quantity"), Some("50"));
    }

    #[test]
    fn test_padded_header_names_are_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "customers.csv",
            "customer_id, first_name, last_name, email, phone, city, registration_date\n\
             C001,Asha,Rao,a@x.com,9876543210,Pune,2023-01-01\n",
        );

        let rows = read_feed(&path, Feed::Customers).unwrap();

        assert_eq!(rows[0].get("email"), Some("a@x.com"));
        assert_eq!(rows[0].get("phone"), Some("9876543210"));
        assert_eq!(rows[0].get("registration_date"), Some("2023-01-01"));
    }

    #[test]
    fn test_phone_digits_not_coerced() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "customers.csv",
            "customer_id,first_name,last_name,email,phone,city,registration_date\n\
             C001,Asha,Rao,a@x.com,09876543210,Pune,2023-01-01\n",
        );

        let rows = read_feed(&path, Feed::Customers).unwrap();
        assert_eq!(rows[0].get("phone"), Some("09876543210"));
    }

    #[test]
    fn test_missing_column_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "sales.csv", "transaction_id,customer_id\nT1,C001\n");

        let err = read_feed(&path, Feed::Sales).unwrap_err();
        match err {
            EtlError::MissingColumn { column, .. } => assert_eq!(column, "product_id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_feed(&dir.path().join("nope.csv"), Feed::Sales).unwrap_err();
        assert!(matches!(err, EtlError::Io(_)));
    }
}
