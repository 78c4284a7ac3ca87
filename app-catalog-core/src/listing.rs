//! Listings as retrieved from the overlay

use serde::{Deserialize, Serialize};

use crate::metadata::PublishedAppMetadata;
use crate::script::Script;
use crate::transaction::Outpoint;

/// The on-chain token carrying a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppToken {
    pub txid: String,
    pub output_index: u32,
    pub locking_script: Script,
    pub satoshis: u64,

    /// Proof bundle for the owning transaction; required to spend the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beef: Option<Vec<u8>>,
}

impl AppToken {
    pub fn outpoint(&self) -> Outpoint {
        Outpoint {
            txid: self.txid.clone(),
            index: self.output_index,
        }
    }

    /// Whether this token can be updated or removed
    pub fn is_spendable(&self) -> bool {
        self.beef.is_some()
    }
}

/// A listing: decoded metadata plus the token that anchors it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedApp {
    pub metadata: PublishedAppMetadata,
    pub token: AppToken,
}
