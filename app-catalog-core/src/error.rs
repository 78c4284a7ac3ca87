//! Catalog error types
//!
//! Broadcast rejections are not errors; they come back as
//! [`BroadcastResult::Failure`](crate::overlay::BroadcastResult) values.

use thiserror::Error;

/// Errors raised by [`AppCatalog`](crate::AppCatalog) operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The wallet could not build the transaction
    #[error("Failed to create transaction: {0}")]
    Creation(String),

    /// Update or removal attempted on a listing fetched without its proof bundle
    #[error("Listing {outpoint} has no proof bundle (beef) and cannot be updated or removed.\n\nFetch it again with include_beef enabled.")]
    MissingProof { outpoint: String },

    /// Signing the spending transaction failed
    #[error("Failed to finalize transaction: {0}")]
    Finalization(String),

    /// A retrieved token did not decode into app metadata
    #[error("Malformed app listing: {0}")]
    Parse(String),

    /// Metadata is missing a required field
    #[error("Invalid app metadata: {0}")]
    InvalidMetadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A wallet request failed outright
    #[error("Wallet request failed: {0}")]
    Wallet(#[source] anyhow::Error),

    /// The lookup resolver could not be reached or answered with garbage
    #[error("Lookup failed: {0}")]
    Lookup(#[source] anyhow::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
