//! Overlay seams - topic broadcast and lookup
//!
//! Broadcasting never fails with an error: rejections come back as
//! [`BroadcastResult::Failure`] so callers can branch on them directly.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpBroadcaster, HttpLookupResolver};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::transaction::Beef;

/// Outcome of submitting a transaction to the overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BroadcastResult {
    Success(BroadcastSuccess),
    #[serde(rename = "error")]
    Failure(BroadcastFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastSuccess {
    pub txid: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastFailure {
    pub code: String,
    pub description: String,
}

impl BroadcastResult {
    pub fn success(txid: impl Into<String>, message: impl Into<String>) -> Self {
        BroadcastResult::Success(BroadcastSuccess {
            txid: txid.into(),
            message: message.into(),
        })
    }

    pub fn failure(code: impl Into<String>, description: impl Into<String>) -> Self {
        BroadcastResult::Failure(BroadcastFailure {
            code: code.into(),
            description: description.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BroadcastResult::Success(_))
    }

    pub fn txid(&self) -> Option<&str> {
        match self {
            BroadcastResult::Success(success) => Some(&success.txid),
            BroadcastResult::Failure(_) => None,
        }
    }
}

/// Submits transactions to overlay topics
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Submit the bundle's subject transaction along with its ancestry
    async fn broadcast(&self, tx: &Beef) -> BroadcastResult;
}

/// A lookup request addressed to one overlay service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupQuestion {
    pub service: String,
    pub query: serde_json::Value,
}

/// One output returned by a lookup service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupOutput {
    /// BEEF containing the transaction that owns the output
    pub beef: Vec<u8>,
    pub output_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<u8>>,
}

/// A lookup service's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LookupAnswer {
    OutputList {
        #[serde(default)]
        outputs: Vec<LookupOutput>,
    },
    Freeform {
        #[serde(default)]
        result: serde_json::Value,
    },
}

/// Queries overlay lookup services
#[async_trait]
pub trait LookupResolver: Send + Sync {
    async fn query(&self, question: &LookupQuestion) -> Result<LookupAnswer>;
}
