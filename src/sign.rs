//! Transaction input signing and signature script merging
//!
//! Only pay-to-pubkey-hash outputs with ECDSA keys are signed directly.
//! Other script classes and signature suites are reported as unimplemented.

use crate::address::Address;
use crate::error::{Result, WalletError};
use crate::network::NetworkParams;
use crate::script::{add_data, check_script_parses, extract_pk_script_addrs, final_opcode_data, ScriptClass, ScriptTokenizer};
use crate::sighash::calc_signature_hash;
use crate::signature::sign_rfc6979;
use crate::transaction::MsgTx;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

/// Signature algorithm of a key or signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureSuite {
    EcdsaSecp256k1,
    Ed25519,
    SchnorrSecp256k1,
}

impl SignatureSuite {
    pub fn name(&self) -> &'static str {
        match self {
            SignatureSuite::EcdsaSecp256k1 => "ECDSA secp256k1",
            SignatureSuite::Ed25519 => "Ed25519",
            SignatureSuite::SchnorrSecp256k1 => "Schnorr secp256k1",
        }
    }
}

/// Result of signing one input: the signature script plus the
/// classification of the script that was signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInput {
    pub signature_script: Vec<u8>,
    pub class: ScriptClass,
    pub addresses: Vec<Address>,
    pub required_sigs: usize,
}

/// DER signature of input `idx` followed by the hash type byte.
pub fn raw_tx_in_signature(
    tx: &MsgTx,
    idx: usize,
    sub_script: &[u8],
    hash_type: u32,
    priv_key: &SecretKey,
) -> Result<Vec<u8>> {
    let sig_hash = calc_signature_hash(sub_script, hash_type, tx, idx, None)?;
    let mut sig = sign_rfc6979(priv_key, &sig_hash)?.serialize();
    sig.push(hash_type as u8);
    Ok(sig)
}

/// `<sig || hashType> <pubkey>` spending a pay-to-pubkey-hash output.
///
/// `compress` must match the key encoding used to build the paid address.
pub fn signature_script(
    tx: &MsgTx,
    idx: usize,
    sub_script: &[u8],
    hash_type: u32,
    priv_key: &SecretKey,
    compress: bool,
) -> Result<Vec<u8>> {
    let sig = raw_tx_in_signature(tx, idx, sub_script, hash_type, priv_key)?;
    let pub_key = PublicKey::from_secret_key(&Secp256k1::signing_only(), priv_key);
    let pk_data = if compress {
        pub_key.serialize().to_vec()
    } else {
        pub_key.serialize_uncompressed().to_vec()
    };

    let mut script = add_data(&sig);
    script.extend(add_data(&pk_data));
    Ok(script)
}

/// Sign input `idx` against the output script `sub_script`.
pub fn sign(
    priv_key: &SecretKey,
    net: &NetworkParams,
    tx: &MsgTx,
    idx: usize,
    sub_script: &[u8],
    hash_type: u32,
    suite: SignatureSuite,
) -> Result<SignedInput> {
    if suite != SignatureSuite::EcdsaSecp256k1 {
        return Err(WalletError::Unimplemented(format!("{} signatures", suite.name())));
    }
    let (class, addresses, required_sigs) = extract_pk_script_addrs(0, sub_script, net)?;

    let signature_script = match class {
        ScriptClass::PubKeyHash(_) => signature_script(tx, idx, sub_script, hash_type, priv_key, true)?,
        _ => return Err(WalletError::Unimplemented("un-implemented script class".to_string())),
    };
    tracing::trace!(idx, class = class.name(), "signed input");

    Ok(SignedInput {
        signature_script,
        class,
        addresses,
        required_sigs,
    })
}

/// `script` without its final push, or None when it does not parse.
fn strip_final_push(script: &[u8]) -> Option<&[u8]> {
    let mut tokenizer = ScriptTokenizer::new(0, script);
    let mut last_start = 0;
    loop {
        let start = tokenizer.byte_index();
        if !tokenizer.next() {
            break;
        }
        last_start = start;
    }
    if tokenizer.err().is_some() {
        return None;
    }
    Some(&script[..last_start])
}

fn parses(script: &[u8]) -> bool {
    !script.is_empty() && check_script_parses(0, script).is_ok()
}

/// MergeScripts: combine two partial signature scripts for `pk_script`
///
/// 1. ScriptHash: an empty or unparsable new script yields the previous
///    one, then an empty or unparsable previous script yields the new one;
///    when both parse, merge the scripts under the embedded redeem script
///    and push it again
/// 2. MultiSig: unimplemented
/// 3. Anything else: the longer script wins
pub fn merge_scripts(
    net: &NetworkParams,
    tx: &MsgTx,
    idx: usize,
    class: &ScriptClass,
    sig_script: &[u8],
    prev_script: Option<&[u8]>,
) -> Result<Vec<u8>> {
    match class {
        ScriptClass::ScriptHash(_) => {
            if !parses(sig_script) {
                return Ok(prev_script.map(<[u8]>::to_vec).unwrap_or_default());
            }
            let prev = match prev_script {
                Some(prev) if parses(prev) => prev,
                _ => return Ok(sig_script.to_vec()),
            };

            let redeem = final_opcode_data(0, sig_script)
                .ok_or_else(|| WalletError::ScriptParse("missing redeem script".to_string()))?;
            let (redeem_class, _, _) = extract_pk_script_addrs(0, redeem, net)?;
            if matches!(redeem_class, ScriptClass::ScriptHash(_)) {
                return Err(WalletError::UnsupportedScript("nested pay-to-script-hash".to_string()));
            }

            let sig_body = strip_final_push(sig_script).unwrap_or_default();
            let prev_body = strip_final_push(prev).unwrap_or_default();
            let mut merged = merge_scripts(net, tx, idx, &redeem_class, sig_body, Some(prev_body))?;
            merged.extend(add_data(redeem));
            Ok(merged)
        }
        ScriptClass::MultiSig(_) => Err(WalletError::Unimplemented("multisig signing".to_string())),
        _ => match prev_script {
            Some(prev) if prev.len() >= sig_script.len() => Ok(prev.to_vec()),
            _ => Ok(sig_script.to_vec()),
        },
    }
}

/// Sign input `idx` spending `pk_script` and merge the result with
/// `previous_script`, if any.
#[allow(clippy::too_many_arguments)]
pub fn sign_tx_output(
    priv_key: &SecretKey,
    net: &NetworkParams,
    tx: &MsgTx,
    idx: usize,
    pk_script: &[u8],
    hash_type: u32,
    previous_script: Option<&[u8]>,
    suite: SignatureSuite,
) -> Result<Vec<u8>> {
    let signed = sign(priv_key, net, tx, idx, pk_script, hash_type, suite)?;

    if signed.class.is_stake() {
        return Err(WalletError::Unimplemented(format!("{} signing", signed.class.name())));
    }
    if matches!(signed.class, ScriptClass::ScriptHash(_)) {
        return Err(WalletError::Unimplemented("scripthash signing".to_string()));
    }

    merge_scripts(net, tx, idx, &signed.class, &signed.signature_script, previous_script)
}
