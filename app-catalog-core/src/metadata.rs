//! App listing metadata and its on-chain payload encoding

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Metadata describing one published app
///
/// Serialized as UTF-8 JSON into the first field of the listing token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedAppMetadata {
    /// Version of the app being listed
    pub version: String,

    pub name: String,

    pub description: String,

    /// Icon URL
    pub icon: String,

    /// Domain the app is served from
    pub domain: String,

    /// Identity key of the publisher; stamped from the wallet, never trusted from input
    #[serde(default)]
    pub publisher: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_urls: Option<Vec<String>>,

    /// Release date as an ISO-8601 string
    pub release_date: String,
}

impl PublishedAppMetadata {
    /// Encode as the token payload
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a token payload
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| CatalogError::Parse(format!("payload is not UTF-8: {e}")))?;
        serde_json::from_str(text)
            .map_err(|e| CatalogError::Parse(format!("payload is not app metadata: {e}")))
    }

    /// Replace the publisher with the signer's identity key
    pub fn with_publisher(mut self, identity_key: impl Into<String>) -> Self {
        self.publisher = identity_key.into();
        self
    }

    /// Check the fields a listing cannot be found without
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::InvalidMetadata("name is required".to_string()));
        }
        if self.domain.trim().is_empty() {
            return Err(CatalogError::InvalidMetadata(
                "domain is required".to_string(),
            ));
        }
        Ok(())
    }
}
