//! Hash primitives and base58 checksum encoding

use crate::error::{Result, WalletError};
use crate::secret::SecretBytes;
use crate::types::Hash;
use blake_hash::{Blake256, Digest as BlakeDigest};
use hmac::{Hmac, Mac};
use ripemd::{Digest, Ripemd160};
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

/// Single round of BLAKE-256, the block hash function.
pub fn blake256(data: &[u8]) -> Hash {
    let digest = Blake256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// BLAKE-256 applied twice.
pub fn blake256d(data: &[u8]) -> Hash {
    blake256(&blake256(data))
}

/// RIPEMD160(BLAKE256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let digest = Ripemd160::digest(blake256(data));
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    out
}

pub fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64]> {
    let mut mac = Hmac::<Sha512>::new_from_slice(key)
        .map_err(|e| WalletError::KeyRange(format!("hmac key: {}", e)))?;
    mac.update(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// HMAC-SHA256 over the concatenation of `parts`.
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 32]> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| WalletError::KeyRange(format!("hmac key: {}", e)))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let h = blake256d(payload);
    [h[0], h[1], h[2], h[3]]
}

/// Base58 with a 4-byte BLAKE-256d checksum appended. The payload may hold
/// a private key, so the working buffer is zeroed on return.
pub fn b58_check_encode(payload: &[u8]) -> String {
    let mut buf = Zeroizing::new(Vec::with_capacity(payload.len() + 4));
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum(payload));
    bs58::encode(buf.as_slice()).into_string()
}

/// Inverse of [`b58_check_encode`]. Returns the payload without the checksum;
/// every intermediate buffer is zeroed on drop.
pub fn b58_check_decode(s: &str) -> Result<SecretBytes> {
    let mut raw = Zeroizing::new(
        bs58::decode(s)
            .into_vec()
            .map_err(|e| WalletError::InvalidAddress(format!("base58: {}", e)))?,
    );
    if raw.len() < 5 {
        return Err(WalletError::InvalidAddress("too short".to_string()));
    }
    let payload_len = raw.len() - 4;
    let (payload, sum) = raw.split_at(payload_len);
    if checksum(payload) != sum {
        return Err(WalletError::InvalidAddress("checksum mismatch".to_string()));
    }
    raw.truncate(payload_len);
    Ok(raw)
}

/// Base58 check encoding with a 2-byte network identifier prefix.
pub fn encode_with_net_id(net_id: [u8; 2], data: &[u8]) -> String {
    let mut payload = Vec::with_capacity(2 + data.len());
    payload.extend_from_slice(&net_id);
    payload.extend_from_slice(data);
    b58_check_encode(&payload)
}

/// Split a decoded base58 check string into its network identifier and data.
pub fn decode_with_net_id(s: &str) -> Result<([u8; 2], Vec<u8>)> {
    let payload = b58_check_decode(s)?;
    if payload.len() < 3 {
        return Err(WalletError::InvalidAddress("missing payload".to_string()));
    }
    Ok(([payload[0], payload[1]], payload[2..].to_vec()))
}
