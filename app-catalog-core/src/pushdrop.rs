//! PushDrop token layout
//!
//! A PushDrop output locks to a single public key and carries arbitrary
//! data fields that are dropped from the stack before the script ends:
//!
//! ```text
//! <pubkey> OP_CHECKSIG <field 0> ... <field n-1> OP_2DROP ... [OP_DROP]
//! ```

use serde::{Deserialize, Serialize};

use crate::script::{Script, ScriptChunk, ScriptError, OP_2DROP, OP_CHECKSIG, OP_DROP};

/// Fields recovered from a PushDrop locking script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDropToken {
    /// Hex public key the token is locked to
    pub locking_public_key: String,

    /// Data fields in push order (a trailing signature field is kept as-is)
    pub fields: Vec<Vec<u8>>,
}

/// Build a PushDrop locking script for `public_key` carrying `fields`
pub fn lock_script(public_key: &[u8], fields: &[Vec<u8>]) -> Script {
    let mut chunks = Vec::with_capacity(fields.len() + 3);
    chunks.push(ScriptChunk::Push(public_key.to_vec()));
    chunks.push(ScriptChunk::Op(OP_CHECKSIG));
    chunks.extend(fields.iter().map(|f| ScriptChunk::minimal_push(f)));

    let mut remaining = fields.len();
    while remaining > 1 {
        chunks.push(ScriptChunk::Op(OP_2DROP));
        remaining -= 2;
    }
    if remaining == 1 {
        chunks.push(ScriptChunk::Op(OP_DROP));
    }

    Script::from_chunks(&chunks)
}

/// Read the locking key and data fields out of a PushDrop script
pub fn decode(script: &Script) -> Result<PushDropToken, ScriptError> {
    let chunks = script.chunks()?;

    let locking_public_key = match chunks.first() {
        Some(ScriptChunk::Push(key)) if !key.is_empty() => hex::encode(key),
        _ => {
            return Err(ScriptError::NotPushDrop(
                "script does not start with a public key push".to_string(),
            ))
        }
    };

    if chunks.get(1) != Some(&ScriptChunk::Op(OP_CHECKSIG)) {
        return Err(ScriptError::NotPushDrop(
            "public key is not followed by OP_CHECKSIG".to_string(),
        ));
    }

    let mut fields = Vec::new();
    for chunk in &chunks[2..] {
        if matches!(chunk, ScriptChunk::Op(OP_DROP) | ScriptChunk::Op(OP_2DROP)) {
            break;
        }
        match chunk.data() {
            Some(field) => fields.push(field),
            None => {
                return Err(ScriptError::NotPushDrop(format!(
                    "unexpected opcode {chunk:?} among data fields"
                )))
            }
        }
    }

    if fields.is_empty() {
        return Err(ScriptError::NotPushDrop("token carries no fields".to_string()));
    }

    Ok(PushDropToken {
        locking_public_key,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 33] = [0x02; 33];

    #[test]
    fn test_lock_and_decode_fields() {
        let fields = vec![b"{\"name\":\"X\"}".to_vec(), vec![], vec![0x30; 71]];
        let script = lock_script(&KEY, &fields);

        let token = decode(&script).unwrap();
        assert_eq!(token.locking_public_key, hex::encode(KEY));
        assert_eq!(token.fields, fields);
    }

    #[test]
    fn test_drop_opcodes_match_field_count() {
        let three = lock_script(&KEY, &[vec![0xaa; 20], vec![0xbb; 20], vec![0xcc; 20]]);
        let tail = &three.as_bytes()[three.len() - 2..];
        assert_eq!(tail, &[OP_2DROP, OP_DROP]);

        let one = lock_script(&KEY, &[vec![0xaa; 20]]);
        assert_eq!(one.as_bytes().last(), Some(&OP_DROP));
    }

    #[test]
    fn test_rejects_non_pushdrop_script() {
        // P2PKH: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
        let p2pkh = Script::from_hex("76a914000102030405060708090a0b0c0d0e0f1011121388ac").unwrap();
        assert!(matches!(decode(&p2pkh), Err(ScriptError::NotPushDrop(_))));

        let bare = lock_script(&KEY, &[]);
        assert!(matches!(decode(&bare), Err(ScriptError::NotPushDrop(_))));
    }
}
