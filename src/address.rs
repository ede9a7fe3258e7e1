//! Base58 check addresses
//!
//! Every address string is `base58(netID || payload || checksum)`. The
//! two-byte netID selects both the network and the address kind.

use crate::crypto::{decode_with_net_id, encode_with_net_id, hash160};
use crate::error::{Result, WalletError};
use crate::network::NetworkParams;
use secp256k1::PublicKey;

/// Signature suite tag carried in public key addresses
const STECDSA_SECP256K1: u8 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    PubKeyHash {
        hash: [u8; 20],
        net_id: [u8; 2],
    },
    ScriptHash {
        hash: [u8; 20],
        net_id: [u8; 2],
    },
    SecpPubKey {
        pub_key: PublicKey,
        compressed: bool,
        net_id: [u8; 2],
        pkh_net_id: [u8; 2],
    },
}

/// Accept only 33-byte 0x02/0x03 or 65-byte 0x04 encodings, then check the
/// point is on the curve. Hybrid (0x06/0x07) keys are rejected.
pub fn parse_strict_pub_key(serialized: &[u8]) -> Result<PublicKey> {
    if !is_strict_pub_key_encoding(serialized) {
        return Err(WalletError::InvalidPubKey(format!(
            "non-canonical encoding of {} bytes",
            serialized.len()
        )));
    }
    PublicKey::from_slice(serialized).map_err(|e| WalletError::InvalidPubKey(e.to_string()))
}

pub fn is_strict_pub_key_encoding(serialized: &[u8]) -> bool {
    match serialized.len() {
        33 => serialized[0] == 0x02 || serialized[0] == 0x03,
        65 => serialized[0] == 0x04,
        _ => false,
    }
}

fn hash20(hash: &[u8]) -> Result<[u8; 20]> {
    <[u8; 20]>::try_from(hash)
        .map_err(|_| WalletError::InvalidAddress(format!("hash must be 20 bytes, got {}", hash.len())))
}

impl Address {
    pub fn new_pub_key_hash(hash: &[u8], net: &NetworkParams) -> Result<Address> {
        Ok(Address::PubKeyHash {
            hash: hash20(hash)?,
            net_id: net.pub_key_hash_addr_id,
        })
    }

    pub fn new_script_hash_from_hash(hash: &[u8], net: &NetworkParams) -> Result<Address> {
        Ok(Address::ScriptHash {
            hash: hash20(hash)?,
            net_id: net.script_hash_addr_id,
        })
    }

    /// Pay-to-script-hash address of a redeem script.
    pub fn new_script_hash(script: &[u8], net: &NetworkParams) -> Address {
        Address::ScriptHash {
            hash: hash160(script),
            net_id: net.script_hash_addr_id,
        }
    }

    pub fn new_secp_pub_key(serialized: &[u8], net: &NetworkParams) -> Result<Address> {
        let pub_key = parse_strict_pub_key(serialized)?;
        Ok(Address::SecpPubKey {
            pub_key,
            compressed: serialized.len() == 33,
            net_id: net.pub_key_addr_id,
            pkh_net_id: net.pub_key_hash_addr_id,
        })
    }

    /// The string form of the address.
    pub fn encode(&self) -> String {
        match self {
            Address::PubKeyHash { hash, net_id } | Address::ScriptHash { hash, net_id } => {
                encode_with_net_id(*net_id, hash)
            }
            Address::SecpPubKey { pub_key, net_id, .. } => {
                let compressed = pub_key.serialize();
                let mut data = [0u8; 33];
                data[0] = STECDSA_SECP256K1;
                if compressed[0] == 0x03 {
                    data[0] |= 0x80;
                }
                data[1..].copy_from_slice(&compressed[1..]);
                encode_with_net_id(*net_id, &data)
            }
        }
    }

    /// The address a payment to this address would use. Public key addresses
    /// pay to the hash of their key.
    pub fn address(&self) -> String {
        match self {
            Address::SecpPubKey { pkh_net_id, .. } => {
                encode_with_net_id(*pkh_net_id, &hash160(&self.script_address()))
            }
            _ => self.encode(),
        }
    }

    /// Bytes committed to in the output script.
    pub fn script_address(&self) -> Vec<u8> {
        match self {
            Address::PubKeyHash { hash, .. } | Address::ScriptHash { hash, .. } => hash.to_vec(),
            Address::SecpPubKey { pub_key, compressed, .. } => {
                if *compressed {
                    pub_key.serialize().to_vec()
                } else {
                    pub_key.serialize_uncompressed().to_vec()
                }
            }
        }
    }

    pub fn hash160(&self) -> Option<[u8; 20]> {
        match self {
            Address::PubKeyHash { hash, .. } | Address::ScriptHash { hash, .. } => Some(*hash),
            Address::SecpPubKey { .. } => None,
        }
    }

    /// Decode an address string for `net`.
    ///
    /// Edwards and Schnorr key-hash addresses are recognized but
    /// unsupported.
    pub fn decode(s: &str, net: &NetworkParams) -> Result<Address> {
        let (net_id, data) = decode_with_net_id(s)?;
        if net_id == net.pub_key_hash_addr_id {
            Address::new_pub_key_hash(&data, net)
        } else if net_id == net.script_hash_addr_id {
            Address::new_script_hash_from_hash(&data, net)
        } else if net_id == net.pub_key_addr_id {
            if data.len() != 33 {
                return Err(WalletError::InvalidAddress(format!(
                    "public key payload must be 33 bytes, got {}",
                    data.len()
                )));
            }
            let suite = data[0] & 0x7f;
            if suite != STECDSA_SECP256K1 {
                return Err(WalletError::Unimplemented(format!("signature suite {}", suite)));
            }
            let mut compressed = [0u8; 33];
            compressed[0] = 0x02 | ((data[0] & 0x80) >> 7);
            compressed[1..].copy_from_slice(&data[1..]);
            Address::new_secp_pub_key(&compressed, net)
        } else if net_id == net.pkh_edwards_addr_id {
            Err(WalletError::Unimplemented("Edwards signatures".to_string()))
        } else if net_id == net.pkh_schnorr_addr_id {
            Err(WalletError::Unimplemented("Schnorr signatures".to_string()))
        } else {
            Err(WalletError::InvalidAddress(format!(
                "unknown address type {:02x}{:02x} for {}",
                net_id[0], net_id[1], net.name
            )))
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}
