//! Application constants for the retail ETL pipeline
//!
//! Column names for each feed, normalization constants, default file
//! locations and the report layout labels.

// =============================================================================
// Default File Locations
// =============================================================================

/// Default customer feed file
pub const DEFAULT_CUSTOMERS_FILE: &str = "customers_raw.csv";

/// Default product feed file
pub const DEFAULT_PRODUCTS_FILE: &str = "products_raw.csv";

/// Default sales feed file
pub const DEFAULT_SALES_FILE: &str = "sales_raw.csv";

/// Default data quality report file
pub const DEFAULT_REPORT_FILE: &str = "data_quality_report.txt";

/// Default directory for the Parquet table snapshot
pub const DEFAULT_OUTPUT_DIR: &str = "warehouse";

// =============================================================================
// Feed Columns
// =============================================================================

/// Customer feed columns
pub mod customer_columns {
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const FIRST_NAME: &str = "first_name";
    pub const LAST_NAME: &str = "last_name";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const CITY: &str = "city";
    pub const REGISTRATION_DATE: &str = "registration_date";

    pub const ALL: &[&str] = &[
        CUSTOMER_ID,
        FIRST_NAME,
        LAST_NAME,
        EMAIL,
        PHONE,
        CITY,
        REGISTRATION_DATE,
    ];
}

/// Product feed columns
pub mod product_columns {
    pub const PRODUCT_ID: &str = "product_id";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const CATEGORY: &str = "category";
    pub const PRICE: &str = "price";
    pub const STOCK_QUANTITY: &str = "stock_quantity";

    pub const ALL: &[&str] = &[PRODUCT_ID, PRODUCT_NAME, CATEGORY, PRICE, STOCK_QUANTITY];
}

/// Sales feed columns
pub mod sale_columns {
    pub const TRANSACTION_ID: &str = "transaction_id";
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const PRODUCT_ID: &str = "product_id";
    pub const TRANSACTION_DATE: &str = "transaction_date";
    pub const QUANTITY: &str = "quantity";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const STATUS: &str = "status";

    pub const ALL: &[&str] = &[
        TRANSACTION_ID,
        CUSTOMER_ID,
        PRODUCT_ID,
        TRANSACTION_DATE,
        QUANTITY,
        UNIT_PRICE,
        STATUS,
    ];
}

// =============================================================================
// Normalization
// =============================================================================

/// Country code prefixed to normalized phone numbers
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Number of trailing digits kept from a phone number
pub const PHONE_DIGITS: usize = 10;

/// Accepted input date patterns, tried in order. The order decides how
/// ambiguous day/month strings are read and must not change.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y"];

/// Canonical output date pattern
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Prefix for synthetic emails given to customers without one
pub const UNKNOWN_EMAIL_PREFIX: &str = "unknown_";

// =============================================================================
// Report Layout
// =============================================================================

pub mod report {
    pub const TITLE: &str = "DATA QUALITY REPORT";
    pub const UNDERLINE: &str = "===================";
    pub const PROCESSED: &str = "Number of records processed per file: ";
    pub const DUPLICATES: &str = "Number of duplicates removed:         ";
    pub const MISSING: &str = "Number of missing values handled:     ";
    pub const LOADED: &str = "Number of records loaded successfully:";
}
