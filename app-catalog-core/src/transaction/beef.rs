//! BEEF transaction bundles (BRC-62 / BRC-96) and the Atomic BEEF prefix (BRC-95)
//!
//! ```text
//! [01010101 <subject txid>]          ← Atomic BEEF only
//! <version: u32 LE>                  ← 0100BEEF (V1) or 0200BEEF (V2)
//! <varint nBumps> <BUMP>*            ← BRC-74 merkle paths
//! <varint nTx>    <tx entry>*        ← ancestors first, subject last
//! ```

use super::wire::{Reader, Writer};
use super::{txid_to_hex, Result, Transaction, TxError};

/// BEEF V1 version marker (bytes `01 00 BE EF`)
pub const BEEF_V1: u32 = 0xEFBE_0001;

/// BEEF V2 version marker (bytes `02 00 BE EF`)
pub const BEEF_V2: u32 = 0xEFBE_0002;

/// Atomic BEEF prefix (bytes `01 01 01 01`)
pub const ATOMIC_BEEF: u32 = 0x0101_0101;

const FORMAT_RAW_TX: u8 = 0;
const FORMAT_RAW_TX_AND_BUMP: u8 = 1;
const FORMAT_TXID_ONLY: u8 = 2;

const LEAF_DUPLICATE: u8 = 0x01;
const LEAF_TXID: u8 = 0x02;

/// One node in a merkle path level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathLeaf {
    pub offset: u64,
    /// Absent when the leaf duplicates its sibling
    pub hash: Option<[u8; 32]>,
    pub txid: bool,
    pub duplicate: bool,
}

/// A BRC-74 merkle path proving inclusion in a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    pub block_height: u64,
    pub path: Vec<Vec<PathLeaf>>,
}

impl MerklePath {
    fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let block_height = reader.read_varint()?;
        let tree_height = reader.read_u8()?;

        let mut path = Vec::with_capacity(tree_height as usize);
        for _ in 0..tree_height {
            let leaf_count = reader.read_varint()?;
            let mut level = Vec::with_capacity(leaf_count.min(1024) as usize);
            for _ in 0..leaf_count {
                let offset = reader.read_varint()?;
                let flags = reader.read_u8()?;
                let duplicate = flags & LEAF_DUPLICATE != 0;
                let hash = if duplicate {
                    None
                } else {
                    Some(reader.read_array::<32>()?)
                };
                level.push(PathLeaf {
                    offset,
                    hash,
                    txid: flags & LEAF_TXID != 0,
                    duplicate,
                });
            }
            path.push(level);
        }

        Ok(Self { block_height, path })
    }

    fn write(&self, writer: &mut Writer) {
        writer.write_varint(self.block_height);
        writer.write_u8(self.path.len() as u8);
        for level in &self.path {
            writer.write_varint(level.len() as u64);
            for leaf in level {
                writer.write_varint(leaf.offset);
                let mut flags = 0;
                if leaf.duplicate {
                    flags |= LEAF_DUPLICATE;
                }
                if leaf.txid {
                    flags |= LEAF_TXID;
                }
                writer.write_u8(flags);
                if let Some(hash) = &leaf.hash {
                    writer.write_bytes(hash);
                }
            }
        }
    }
}

/// A transaction entry in a BEEF bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeefTx {
    /// Full transaction, optionally proven by one of the bundle's merkle paths
    Raw {
        tx: Transaction,
        bump_index: Option<usize>,
    },
    /// Known to the recipient; only the txid travels (V2 only)
    TxidOnly([u8; 32]),
}

impl BeefTx {
    pub fn txid_bytes(&self) -> [u8; 32] {
        match self {
            BeefTx::Raw { tx, .. } => tx.txid_bytes(),
            BeefTx::TxidOnly(txid) => *txid,
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            BeefTx::Raw { tx, .. } => Some(tx),
            BeefTx::TxidOnly(_) => None,
        }
    }
}

/// A transaction together with the ancestry needed to validate it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Beef {
    pub version: u32,
    pub bumps: Vec<MerklePath>,
    pub txs: Vec<BeefTx>,
    /// Subject txid when the bundle was framed as Atomic BEEF
    pub atomic_txid: Option<[u8; 32]>,
}

impl Beef {
    /// A V1 bundle holding a single unproven transaction
    pub fn from_transaction(tx: Transaction) -> Self {
        Self {
            version: BEEF_V1,
            bumps: Vec::new(),
            txs: vec![BeefTx::Raw {
                tx,
                bump_index: None,
            }],
            atomic_txid: None,
        }
    }

    /// Parse BEEF or Atomic BEEF bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);

        let mut version = reader.read_u32()?;
        let mut atomic_txid = None;
        if version == ATOMIC_BEEF {
            atomic_txid = Some(reader.read_array::<32>()?);
            version = reader.read_u32()?;
        }

        if version != BEEF_V1 && version != BEEF_V2 {
            return Err(TxError::UnsupportedVersion(version));
        }

        let bump_count = reader.read_varint()?;
        let mut bumps = Vec::with_capacity(bump_count.min(64) as usize);
        for _ in 0..bump_count {
            bumps.push(MerklePath::read(&mut reader)?);
        }

        let tx_count = reader.read_varint()?;
        let mut txs = Vec::with_capacity(tx_count.min(1024) as usize);
        for _ in 0..tx_count {
            let entry = if version == BEEF_V2 {
                match reader.read_u8()? {
                    FORMAT_TXID_ONLY => BeefTx::TxidOnly(reader.read_array::<32>()?),
                    FORMAT_RAW_TX_AND_BUMP => {
                        let bump_index = Some(reader.read_varint()? as usize);
                        let tx = Transaction::read(&mut reader)?;
                        BeefTx::Raw { tx, bump_index }
                    }
                    FORMAT_RAW_TX => BeefTx::Raw {
                        tx: Transaction::read(&mut reader)?,
                        bump_index: None,
                    },
                    other => return Err(TxError::UnknownTxFormat(other)),
                }
            } else {
                let tx = Transaction::read(&mut reader)?;
                let bump_index = match reader.read_u8()? {
                    0 => None,
                    _ => Some(reader.read_varint()? as usize),
                };
                BeefTx::Raw { tx, bump_index }
            };
            txs.push(entry);
        }

        if reader.remaining() > 0 {
            return Err(TxError::TrailingBytes(reader.remaining()));
        }

        let beef = Self {
            version,
            bumps,
            txs,
            atomic_txid,
        };

        if let Some(txid) = &beef.atomic_txid {
            if beef.find_transaction(txid).is_none() {
                return Err(TxError::SubjectNotFound(txid_to_hex(txid)));
            }
        }

        Ok(beef)
    }

    /// Serialize, keeping the Atomic BEEF prefix when present
    ///
    /// A V1 bundle holding txid-only entries is written as V2, since V1
    /// cannot represent them.
    pub fn to_bytes(&self) -> Vec<u8> {
        let has_txid_only = self
            .txs
            .iter()
            .any(|entry| matches!(entry, BeefTx::TxidOnly(_)));
        let version = if has_txid_only { BEEF_V2 } else { self.version };

        let mut writer = Writer::new();
        if let Some(txid) = &self.atomic_txid {
            writer.write_u32(ATOMIC_BEEF);
            writer.write_bytes(txid);
        }
        writer.write_u32(version);

        writer.write_varint(self.bumps.len() as u64);
        for bump in &self.bumps {
            bump.write(&mut writer);
        }

        writer.write_varint(self.txs.len() as u64);
        for entry in &self.txs {
            match (entry, version == BEEF_V2) {
                (BeefTx::TxidOnly(txid), _) => {
                    writer.write_u8(FORMAT_TXID_ONLY);
                    writer.write_bytes(txid);
                }
                (BeefTx::Raw { tx, bump_index }, true) => {
                    match bump_index {
                        Some(index) => {
                            writer.write_u8(FORMAT_RAW_TX_AND_BUMP);
                            writer.write_varint(*index as u64);
                        }
                        None => writer.write_u8(FORMAT_RAW_TX),
                    }
                    tx.write(&mut writer);
                }
                (BeefTx::Raw { tx, bump_index }, false) => {
                    tx.write(&mut writer);
                    match bump_index {
                        Some(index) => {
                            writer.write_u8(1);
                            writer.write_varint(*index as u64);
                        }
                        None => writer.write_u8(0),
                    }
                }
            }
        }

        writer.into_inner()
    }

    /// Full transactions in bundle order
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.txs.iter().filter_map(BeefTx::transaction)
    }

    pub fn find_transaction(&self, txid: &[u8; 32]) -> Option<&Transaction> {
        self.transactions().find(|tx| &tx.txid_bytes() == txid)
    }

    /// The transaction this bundle is about
    ///
    /// For Atomic BEEF that is the named subject; otherwise the last full
    /// transaction, since ancestors always precede their descendants.
    pub fn subject(&self) -> Option<&Transaction> {
        match &self.atomic_txid {
            Some(txid) => self.find_transaction(txid),
            None => self.transactions().last(),
        }
    }

    /// Append a transaction unless the bundle already holds it in full
    ///
    /// A txid-only entry for the same transaction is upgraded in place so
    /// ancestors keep preceding their descendants.
    pub fn push_transaction(&mut self, tx: Transaction) {
        let txid = tx.txid_bytes();
        let entry = BeefTx::Raw {
            tx,
            bump_index: None,
        };
        match self.txs.iter().position(|e| e.txid_bytes() == txid) {
            Some(position) if matches!(self.txs[position], BeefTx::TxidOnly(_)) => {
                self.txs[position] = entry;
            }
            Some(_) => {}
            None => self.txs.push(entry),
        }
    }

    /// Frame the bundle as Atomic BEEF around its current subject
    pub fn into_atomic(mut self) -> Option<Self> {
        self.atomic_txid = None;
        let txid = self.subject()?.txid_bytes();
        self.atomic_txid = Some(txid);
        Some(self)
    }
}
