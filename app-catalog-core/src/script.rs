//! Bitcoin script bytes and push-data chunking
//!
//! Only the subset needed to build and read PushDrop tokens is modelled:
//! data pushes (direct, `OP_PUSHDATA1/2/4`), the small-integer opcodes and
//! opaque single-byte opcodes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_2DROP: u8 = 0x6d;
pub const OP_DROP: u8 = 0x75;
pub const OP_CHECKSIG: u8 = 0xac;

/// Errors raised while reading script bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Invalid script hex: {0}")]
    InvalidHex(String),

    #[error("Push at offset {offset} needs {needed} bytes but only {remaining} remain")]
    TruncatedPush {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Not a PushDrop script: {0}")]
    NotPushDrop(String),
}

/// A single parsed element of a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptChunk {
    /// An opcode that carries no data (including `OP_0` and `OP_1`..`OP_16`)
    Op(u8),
    /// Data pushed by a direct push or one of the `OP_PUSHDATA` opcodes
    Push(Vec<u8>),
}

impl ScriptChunk {
    /// Minimal encoding for pushing `data`, as the PushDrop template expects
    pub fn minimal_push(data: &[u8]) -> Self {
        match data {
            [] => ScriptChunk::Op(OP_0),
            [n @ 1..=16] => ScriptChunk::Op(OP_1 + n - 1),
            [0x81] => ScriptChunk::Op(OP_1NEGATE),
            _ => ScriptChunk::Push(data.to_vec()),
        }
    }

    /// The bytes this chunk leaves on the stack when read as a data field
    ///
    /// Returns `None` for opcodes that are not data.
    pub fn data(&self) -> Option<Vec<u8>> {
        match self {
            ScriptChunk::Push(data) => Some(data.clone()),
            ScriptChunk::Op(OP_0) => Some(Vec::new()),
            ScriptChunk::Op(OP_1NEGATE) => Some(vec![0x81]),
            ScriptChunk::Op(op @ OP_1..=OP_16) => Some(vec![op - OP_1 + 1]),
            ScriptChunk::Op(_) => None,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            ScriptChunk::Op(op) => out.push(*op),
            ScriptChunk::Push(data) => {
                let len = data.len();
                if len < OP_PUSHDATA1 as usize {
                    out.push(len as u8);
                } else if len <= u8::MAX as usize {
                    out.push(OP_PUSHDATA1);
                    out.push(len as u8);
                } else if len <= u16::MAX as usize {
                    out.push(OP_PUSHDATA2);
                    out.extend_from_slice(&(len as u16).to_le_bytes());
                } else {
                    out.push(OP_PUSHDATA4);
                    out.extend_from_slice(&(len as u32).to_le_bytes());
                }
                out.extend_from_slice(data);
            }
        }
    }
}

/// Raw script bytes, serialized as lowercase hex
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        hex::decode(hex_str)
            .map(Self)
            .map_err(|e| ScriptError::InvalidHex(e.to_string()))
    }

    pub fn from_chunks(chunks: &[ScriptChunk]) -> Self {
        let mut out = Vec::new();
        for chunk in chunks {
            chunk.write(&mut out);
        }
        Self(out)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split the script into opcodes and data pushes
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        let bytes = &self.0;
        let mut chunks = Vec::new();
        let mut pos = 0;

        while pos < bytes.len() {
            let offset = pos;
            let op = bytes[pos];
            pos += 1;

            let len = match op {
                0x01..=0x4b => op as usize,
                OP_PUSHDATA1 => read_len(bytes, &mut pos, 1, offset)?,
                OP_PUSHDATA2 => read_len(bytes, &mut pos, 2, offset)?,
                OP_PUSHDATA4 => read_len(bytes, &mut pos, 4, offset)?,
                _ => {
                    chunks.push(ScriptChunk::Op(op));
                    continue;
                }
            };

            let remaining = bytes.len() - pos;
            if len > remaining {
                return Err(ScriptError::TruncatedPush {
                    offset,
                    needed: len,
                    remaining,
                });
            }
            chunks.push(ScriptChunk::Push(bytes[pos..pos + len].to_vec()));
            pos += len;
        }

        Ok(chunks)
    }
}

fn read_len(bytes: &[u8], pos: &mut usize, width: usize, offset: usize) -> Result<usize, ScriptError> {
    let remaining = bytes.len() - *pos;
    if remaining < width {
        return Err(ScriptError::TruncatedPush {
            offset,
            needed: width,
            remaining,
        });
    }
    let len = bytes[*pos..*pos + width]
        .iter()
        .rev()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);
    *pos += width;
    Ok(len)
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Script {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Script {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Script::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}
