//! Wallet seam - the four wallet capabilities the catalog consumes
//!
//! Argument and result types follow the JSON shapes of the BRC-100 wallet
//! interface so that [`HttpWallet`] can pass them through unchanged.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpWallet;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::codec::{Counterparty, ProtocolId};
use crate::config::Network;
use crate::script::Script;

/// Trait for wallets that build and sign catalog transactions
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Return a hex public key (the identity key when `identity_key` is set)
    async fn get_public_key(&self, args: GetPublicKeyArgs) -> Result<String>;

    /// Network the wallet operates on
    async fn get_network(&self) -> Result<Network>;

    /// Build (and, without inputs to unlock, sign) a transaction
    async fn create_action(&self, args: CreateActionArgs) -> Result<CreateActionResult>;

    /// Finish a transaction returned as signable by `create_action`
    async fn sign_action(&self, args: SignActionArgs) -> Result<SignActionResult>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPublicKeyArgs {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub identity_key: bool,

    #[serde(default, rename = "protocolID", skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<ProtocolId>,

    #[serde(default, rename = "keyID", skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<Counterparty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_self: Option<bool>,
}

impl GetPublicKeyArgs {
    /// Ask for the wallet's identity key
    pub fn identity() -> Self {
        Self {
            identity_key: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionInput {
    /// `txid.index` of the output being spent
    pub outpoint: String,
    pub unlocking_script_length: u32,
    pub input_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionOutput {
    pub locking_script: Script,
    pub satoshis: u64,
    pub output_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionOptions {
    pub randomize_outputs: bool,
    pub accept_delayed_broadcast: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionArgs {
    pub description: String,

    /// BEEF proving the inputs being spent
    #[serde(default, rename = "inputBEEF", skip_serializing_if = "Option::is_none")]
    pub input_beef: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<CreateActionInput>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<CreateActionOutput>,

    pub options: CreateActionOptions,
}

/// A transaction waiting for unlocking scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignableTransaction {
    /// Atomic BEEF of the unsigned transaction
    pub tx: Vec<u8>,
    /// Handle to pass back to `sign_action`
    pub reference: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionResult {
    #[serde(default)]
    pub txid: Option<String>,

    /// Atomic BEEF of the finished transaction
    #[serde(default)]
    pub tx: Option<Vec<u8>>,

    #[serde(default)]
    pub signable_transaction: Option<SignableTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignActionSpend {
    pub unlocking_script: Script,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignActionArgs {
    /// Unlocking scripts keyed by input index
    pub spends: BTreeMap<u32, SignActionSpend>,
    pub reference: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignActionResult {
    #[serde(default)]
    pub txid: Option<String>,

    /// Atomic BEEF of the signed transaction
    #[serde(default)]
    pub tx: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_request_json() {
        let json = serde_json::to_value(GetPublicKeyArgs::identity()).unwrap();
        assert_eq!(json, serde_json::json!({"identityKey": true}));
    }

    #[test]
    fn test_create_action_wire_names() {
        let args = CreateActionArgs {
            description: "Update app listing".to_string(),
            input_beef: Some(vec![1, 2]),
            inputs: vec![CreateActionInput {
                outpoint: "ab.0".to_string(),
                unlocking_script_length: 73,
                input_description: "Previous listing".to_string(),
            }],
            outputs: vec![],
            options: CreateActionOptions {
                randomize_outputs: false,
                accept_delayed_broadcast: false,
            },
        };

        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["inputBEEF"], serde_json::json!([1, 2]));
        assert_eq!(json["inputs"][0]["unlockingScriptLength"], 73);
        assert_eq!(json["options"]["randomizeOutputs"], false);
        assert!(json.get("outputs").is_none());
    }

    #[test]
    fn test_sign_action_spends_keyed_by_index() {
        let mut spends = BTreeMap::new();
        spends.insert(
            0,
            SignActionSpend {
                unlocking_script: Script::new(vec![0x51]),
            },
        );
        let args = SignActionArgs {
            spends,
            reference: "ref-1".to_string(),
        };

        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["spends"]["0"]["unlockingScript"], "51");

        let back: SignActionArgs = serde_json::from_value(json).unwrap();
        assert_eq!(back, args);
    }
}
