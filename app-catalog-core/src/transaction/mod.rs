//! Transactions and BEEF proof bundles
//!
//! Enough of the Bitcoin transaction format to read the outputs of an
//! overlay answer and to hand signed transactions to a broadcaster.
//! Merkle paths are carried through untouched; validation belongs to the
//! wallet and the overlay hosts.

mod beef;
mod wire;

pub use beef::{Beef, BeefTx, MerklePath, PathLeaf, ATOMIC_BEEF, BEEF_V1, BEEF_V2};

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::script::Script;
use wire::{Reader, Writer};

/// Errors raised while decoding transactions and BEEF
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("Unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Unsupported BEEF version 0x{0:08x}")]
    UnsupportedVersion(u32),

    #[error("Unknown BEEF transaction format {0}")]
    UnknownTxFormat(u8),

    #[error("{0} trailing bytes after transaction data")]
    TrailingBytes(usize),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid txid '{0}'")]
    InvalidTxid(String),

    #[error("Invalid outpoint '{0}', expected <txid>.<index>")]
    InvalidOutpoint(String),

    #[error("Atomic BEEF subject {0} is not in the bundle")]
    SubjectNotFound(String),
}

pub type Result<T> = std::result::Result<T, TxError>;

/// A transaction input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    /// Source txid in internal (little-endian) byte order
    pub source_txid: [u8; 32],
    pub source_output_index: u32,
    pub unlocking_script: Script,
    pub sequence: u32,
}

impl TxInput {
    pub fn outpoint(&self) -> Outpoint {
        Outpoint {
            txid: txid_to_hex(&self.source_txid),
            index: self.source_output_index,
        }
    }
}

/// A transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub satoshis: u64,
    pub locking_script: Script,
}

/// A Bitcoin transaction in wire form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Parse a raw transaction, rejecting trailing bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let tx = Self::read(&mut reader)?;
        if reader.remaining() > 0 {
            return Err(TxError::TrailingBytes(reader.remaining()));
        }
        Ok(tx)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str).map_err(|e| TxError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let version = reader.read_u32()?;

        let input_count = reader.read_varint()?;
        let mut inputs = Vec::with_capacity(input_count.min(1024) as usize);
        for _ in 0..input_count {
            let source_txid = reader.read_array::<32>()?;
            let source_output_index = reader.read_u32()?;
            let unlocking_script = Script::new(reader.read_var_bytes()?);
            let sequence = reader.read_u32()?;
            inputs.push(TxInput {
                source_txid,
                source_output_index,
                unlocking_script,
                sequence,
            });
        }

        let output_count = reader.read_varint()?;
        let mut outputs = Vec::with_capacity(output_count.min(1024) as usize);
        for _ in 0..output_count {
            let satoshis = reader.read_u64()?;
            let locking_script = Script::new(reader.read_var_bytes()?);
            outputs.push(TxOutput {
                satoshis,
                locking_script,
            });
        }

        let lock_time = reader.read_u32()?;

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    pub(crate) fn write(&self, writer: &mut Writer) {
        writer.write_u32(self.version);

        writer.write_varint(self.inputs.len() as u64);
        for input in &self.inputs {
            writer.write_bytes(&input.source_txid);
            writer.write_u32(input.source_output_index);
            writer.write_var_bytes(input.unlocking_script.as_bytes());
            writer.write_u32(input.sequence);
        }

        writer.write_varint(self.outputs.len() as u64);
        for output in &self.outputs {
            writer.write_u64(output.satoshis);
            writer.write_var_bytes(output.locking_script.as_bytes());
        }

        writer.write_u32(self.lock_time);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.write(&mut writer);
        writer.into_inner()
    }

    /// Double SHA-256 of the serialized transaction, internal byte order
    pub fn txid_bytes(&self) -> [u8; 32] {
        let first = Sha256::digest(self.to_bytes());
        Sha256::digest(first).into()
    }

    /// Transaction id as conventionally displayed (byte-reversed hex)
    pub fn txid(&self) -> String {
        txid_to_hex(&self.txid_bytes())
    }
}

/// Render internal-order txid bytes as display hex
pub fn txid_to_hex(txid: &[u8; 32]) -> String {
    let mut reversed = *txid;
    reversed.reverse();
    hex::encode(reversed)
}

/// Parse display hex into internal-order txid bytes
pub fn txid_from_hex(txid: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(txid).map_err(|_| TxError::InvalidTxid(txid.to_string()))?;
    let mut out: [u8; 32] = bytes
        .try_into()
        .map_err(|_| TxError::InvalidTxid(txid.to_string()))?;
    out.reverse();
    Ok(out)
}

/// Reference to one output of one transaction, written `txid.index`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Outpoint {
    pub txid: String,
    pub index: u32,
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.txid, self.index)
    }
}

impl FromStr for Outpoint {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self> {
        let (txid, index) = s
            .split_once('.')
            .ok_or_else(|| TxError::InvalidOutpoint(s.to_string()))?;
        txid_from_hex(txid)?;
        let index = index
            .parse()
            .map_err(|_| TxError::InvalidOutpoint(s.to_string()))?;
        Ok(Self {
            txid: txid.to_string(),
            index,
        })
    }
}
