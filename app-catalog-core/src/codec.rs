//! Token codec seam
//!
//! Producing a PushDrop locking script needs a derived public key and
//! producing the unlocking script needs a signature, so both live behind
//! [`TokenCodec`], which is usually backed by the same wallet the catalog
//! uses. Decoding is pure and defaults to [`pushdrop::decode`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{PROTOCOL_NAME, PROTOCOL_SECURITY_LEVEL};
use crate::pushdrop::{self, PushDropToken};
use crate::script::{Script, ScriptError};
use crate::transaction::Beef;

/// Wallet protocol identifier, serialized as `[securityLevel, "protocol name"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolId(pub u8, pub String);

impl ProtocolId {
    /// The protocol catalog tokens are locked under
    pub fn catalog() -> Self {
        Self(PROTOCOL_SECURITY_LEVEL, PROTOCOL_NAME.to_string())
    }

    pub fn security_level(&self) -> u8 {
        self.0
    }

    pub fn name(&self) -> &str {
        &self.1
    }
}

/// Whose key pairs with ours when deriving the locking key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Counterparty {
    /// Publicly derivable; anyone may compute the key
    Anyone,
    /// The caller's own key
    SelfKey,
    /// A specific counterparty by hex public key
    Other(String),
}

impl From<Counterparty> for String {
    fn from(counterparty: Counterparty) -> Self {
        counterparty.to_string()
    }
}

impl From<String> for Counterparty {
    fn from(value: String) -> Self {
        match value.as_str() {
            "anyone" => Counterparty::Anyone,
            "self" => Counterparty::SelfKey,
            _ => Counterparty::Other(value),
        }
    }
}

impl fmt::Display for Counterparty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counterparty::Anyone => f.write_str("anyone"),
            Counterparty::SelfKey => f.write_str("self"),
            Counterparty::Other(key) => f.write_str(key),
        }
    }
}

/// Which outputs the unlocking signature commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignOutputs {
    #[default]
    All,
    None,
    Single,
}

/// Everything needed to unlock a previously locked token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockRequest {
    pub protocol_id: ProtocolId,
    pub key_id: String,
    pub counterparty: Counterparty,
    pub sign_outputs: SignOutputs,
    pub anyone_can_pay: bool,
    /// Value of the output being spent
    pub source_satoshis: Option<u64>,
    /// Script of the output being spent
    pub locking_script: Option<Script>,
}

/// Produces the unlocking script for one input of a partially built transaction
#[async_trait]
pub trait Unlocker: Send + Sync {
    /// Sign input `input_index` of the bundle's subject transaction
    async fn sign(&self, tx: &Beef, input_index: usize) -> Result<Script>;

    /// Upper bound on the unlocking script size, for fee estimation
    fn estimate_length(&self) -> u32 {
        73
    }
}

/// Locks payloads into tokens and unlocks them again
#[async_trait]
pub trait TokenCodec: Send + Sync {
    /// Build a locking script carrying `fields`
    async fn lock(
        &self,
        fields: Vec<Vec<u8>>,
        protocol_id: &ProtocolId,
        key_id: &str,
        counterparty: &Counterparty,
        for_self: bool,
    ) -> Result<Script>;

    /// Prepare an unlocker for a token locked with the same parameters
    fn unlock(&self, request: UnlockRequest) -> Box<dyn Unlocker>;

    /// Read the data fields back out of a locking script
    fn decode(&self, script: &Script) -> std::result::Result<PushDropToken, ScriptError> {
        pushdrop::decode(script)
    }
}
