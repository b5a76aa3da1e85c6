//! Error handling for reconciliation runs.
//!
//! Provides the error kinds raised by the normalizers, reconcilers and the
//! extraction/persistence collaborators, plus a stage wrapper so a failed
//! run can report where it stopped.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extract,
    CustomerReconcile,
    ProductReconcile,
    SalesReconcile,
    OrderAggregation,
    Load,
    Report,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Extract => "extract",
            PipelineStage::CustomerReconcile => "customer reconciliation",
            PipelineStage::ProductReconcile => "product reconciliation",
            PipelineStage::SalesReconcile => "sales reconciliation",
            PipelineStage::OrderAggregation => "order aggregation",
            PipelineStage::Load => "load",
            PipelineStage::Report => "report",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Malformed identifier in {feed} feed: '{value}' contains no usable digits")]
    MalformedIdentifier { feed: String, value: String },

    #[error("Insufficient data: {statistic} is undefined because {reason}")]
    InsufficientData { statistic: String, reason: String },

    #[error("Invalid number in column '{column}': '{value}'")]
    InvalidNumber { column: String, value: String },

    #[error("Transaction {transaction_id} has rows disagreeing on {field}")]
    DivergentTransaction {
        transaction_id: String,
        field: String,
    },

    #[error("Required column '{column}' missing from {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Persistence failure: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Background task failed: {message}")]
    TaskJoin { message: String },

    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: PipelineStage,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    /// Create a malformed identifier error
    pub fn malformed_identifier(feed: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            feed: feed.into(),
            value: value.into(),
        }
    }

    /// Create an insufficient data error
    pub fn insufficient_data(statistic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            statistic: statistic.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid number error
    pub fn invalid_number(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Create a persistence failure
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Tag an error with the stage it occurred in. Already-tagged errors keep
    /// their original stage.
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        match self {
            tagged @ Self::StageFailed { .. } => tagged,
            other => Self::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage the error was raised in, if it has been tagged
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying error with any stage wrapper removed
    pub fn root(&self) -> &EtlError {
        match self {
            Self::StageFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<tokio::task::JoinError> for EtlError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::TaskJoin {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
