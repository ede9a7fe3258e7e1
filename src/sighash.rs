//! Signature hash computation
//!
//! The digest signed for input `idx` is
//! `BLAKE256(hashType || BLAKE256(prefix) || BLAKE256(witness))` where the
//! prefix and witness are reduced forms of the transaction selected by the
//! hash type.

use crate::crypto::blake256;
use crate::error::{Result, WalletError};
use crate::script::check_script_parses;
use crate::transaction::{put_var_bytes, put_var_int, var_int_serialize_size, MsgTx, TxSerializeType};
use crate::types::Hash;

pub const SIG_HASH_OLD: u32 = 0x0;
pub const SIG_HASH_ALL: u32 = 0x1;
pub const SIG_HASH_NONE: u32 = 0x2;
pub const SIG_HASH_SINGLE: u32 = 0x3;
pub const SIG_HASH_ANY_ONE_CAN_PAY: u32 = 0x80;

/// Bits of the hash type that select the output commitment
pub const SIG_HASH_MASK: u32 = 0x1f;

/// Serialization type tag of the witness-signing encoding
const TX_SERIALIZE_WITNESS_SIGNING: u32 = 3;

fn commit_outputs(hash_type: u32) -> OutputCommitment {
    match hash_type & SIG_HASH_MASK {
        SIG_HASH_NONE => OutputCommitment::None,
        SIG_HASH_SINGLE => OutputCommitment::Single,
        _ => OutputCommitment::All,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputCommitment {
    All,
    None,
    Single,
}

/// Hash of the transaction prefix as seen by input `idx`.
fn prefix_hash(tx: &MsgTx, hash_type: u32, idx: usize) -> Hash {
    let commitment = commit_outputs(hash_type);
    let any_one_can_pay = hash_type & SIG_HASH_ANY_ONE_CAN_PAY != 0;

    let (inputs, sign_idx) = if any_one_can_pay {
        (&tx.tx_in[idx..=idx], 0)
    } else {
        (&tx.tx_in[..], idx)
    };
    let outputs = match commitment {
        OutputCommitment::None => &tx.tx_out[..0],
        OutputCommitment::Single => &tx.tx_out[..=idx],
        OutputCommitment::All => &tx.tx_out[..],
    };

    let mut size = 4 + var_int_serialize_size(inputs.len() as u64) + inputs.len() * (32 + 4 + 1 + 4);
    size += var_int_serialize_size(outputs.len() as u64);
    for out in outputs {
        size += 8 + 2 + var_int_serialize_size(out.pk_script.len() as u64) + out.pk_script.len();
    }
    size += 4 + 4;

    let mut buf = Vec::with_capacity(size);
    let version = tx.version as u32 | (TxSerializeType::NoWitness as u32) << 16;
    buf.extend_from_slice(&version.to_le_bytes());

    put_var_int(&mut buf, inputs.len() as u64);
    for (i, txin) in inputs.iter().enumerate() {
        let op = &txin.previous_out_point;
        buf.extend_from_slice(&op.hash);
        buf.extend_from_slice(&op.index.to_le_bytes());
        buf.push(op.tree);
        let sequence = if i != sign_idx && commitment != OutputCommitment::All {
            0
        } else {
            txin.sequence
        };
        buf.extend_from_slice(&sequence.to_le_bytes());
    }

    put_var_int(&mut buf, outputs.len() as u64);
    for (i, txout) in outputs.iter().enumerate() {
        let (value, pk_script) = if commitment == OutputCommitment::Single && i != idx {
            (-1i64, &[][..])
        } else {
            (txout.value, &txout.pk_script[..])
        };
        buf.extend_from_slice(&value.to_le_bytes());
        buf.extend_from_slice(&txout.version.to_le_bytes());
        put_var_bytes(&mut buf, pk_script);
    }

    buf.extend_from_slice(&tx.lock_time.to_le_bytes());
    buf.extend_from_slice(&tx.expiry.to_le_bytes());
    blake256(&buf)
}

/// Hash of the witness as seen by input `idx`: only the signed input carries
/// the script being signed.
fn witness_hash(tx: &MsgTx, script: &[u8], hash_type: u32, idx: usize) -> Hash {
    let any_one_can_pay = hash_type & SIG_HASH_ANY_ONE_CAN_PAY != 0;
    let (num_inputs, sign_idx) = if any_one_can_pay { (1, 0) } else { (tx.tx_in.len(), idx) };

    let mut buf = Vec::with_capacity(
        4 + var_int_serialize_size(num_inputs as u64)
            + num_inputs
            + var_int_serialize_size(script.len() as u64)
            + script.len(),
    );
    let version = tx.version as u32 | TX_SERIALIZE_WITNESS_SIGNING << 16;
    buf.extend_from_slice(&version.to_le_bytes());

    put_var_int(&mut buf, num_inputs as u64);
    for i in 0..num_inputs {
        if i == sign_idx {
            put_var_bytes(&mut buf, script);
        } else {
            put_var_int(&mut buf, 0);
        }
    }
    blake256(&buf)
}

/// CalcSignatureHash: digest to sign for input `idx` spending `script`
///
/// 1. The script must parse
/// 2. `idx` must name an input; with SigHashSingle it must also name an output
/// 3. A supplied `cached_prefix` (the transaction hash) replaces the prefix
///    hash when the type is SigHashAll without AnyOneCanPay
pub fn calc_signature_hash(
    script: &[u8],
    hash_type: u32,
    tx: &MsgTx,
    idx: usize,
    cached_prefix: Option<&Hash>,
) -> Result<Hash> {
    check_script_parses(0, script)?;

    if idx >= tx.tx_in.len() {
        return Err(WalletError::InvalidInputIndex {
            index: idx,
            inputs: tx.tx_in.len(),
        });
    }
    if commit_outputs(hash_type) == OutputCommitment::Single && idx >= tx.tx_out.len() {
        return Err(WalletError::InvalidSigHashSingleIndex {
            index: idx,
            outputs: tx.tx_out.len(),
        });
    }

    let use_cache = hash_type & SIG_HASH_MASK == SIG_HASH_ALL && hash_type & SIG_HASH_ANY_ONE_CAN_PAY == 0;
    let prefix = match cached_prefix {
        Some(hash) if use_cache => *hash,
        _ => prefix_hash(tx, hash_type, idx),
    };
    let witness = witness_hash(tx, script, hash_type, idx);

    let mut buf = Vec::with_capacity(4 + 32 + 32);
    buf.extend_from_slice(&hash_type.to_le_bytes());
    buf.extend_from_slice(&prefix);
    buf.extend_from_slice(&witness);
    Ok(blake256(&buf))
}
