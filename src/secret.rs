//! Secret custody: passphrase-derived keys and symmetric encryption
//!
//! Passphrase keys come from Argon2id. Every ciphertext is an
//! XChaCha20-Poly1305 box with its random nonce prepended. Decrypted
//! material is handed out as [`SecretBytes`], which is overwritten with
//! zeros when dropped.

use crate::constants::{CIPHER_NONCE_LEN, KDF_SALT_LEN, SYMMETRIC_KEY_LEN};
use crate::crypto::blake256;
use crate::error::{Result, WalletError};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Owned byte buffer zeroed on drop
pub type SecretBytes = Zeroizing<Vec<u8>>;

/// Argon2id cost settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfCost {
    /// Minimal cost, for tests and throwaway wallets only.
    pub const fn insecure_fast() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Serialized parameters needed to re-derive a passphrase key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    #[serde(with = "hex")]
    pub salt: Vec<u8>,
    /// BLAKE-256 of the derived key, checked on rekey
    #[serde(with = "hex")]
    pub digest: Vec<u8>,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    fn cost(&self) -> KdfCost {
        KdfCost {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

/// Symmetric key derived from a user passphrase
pub struct PassphraseKey {
    key: Zeroizing<[u8; SYMMETRIC_KEY_LEN]>,
    params: KdfParams,
}

impl std::fmt::Debug for PassphraseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassphraseKey").field("params", &self.params).finish_non_exhaustive()
    }
}

impl PassphraseKey {
    /// Derive a fresh key from `passphrase` under a new random salt.
    pub fn new(passphrase: &[u8], cost: KdfCost) -> Result<Self> {
        let mut salt = vec![0u8; KDF_SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = derive_key(passphrase, &salt, cost)?;
        let params = KdfParams {
            salt,
            digest: blake256(&key[..]).to_vec(),
            memory_kib: cost.memory_kib,
            iterations: cost.iterations,
            parallelism: cost.parallelism,
        };
        Ok(Self { key, params })
    }

    /// Re-derive a key from stored parameters. A passphrase that yields a
    /// different key is rejected before anything is decrypted.
    pub fn rekey(passphrase: &[u8], params: &KdfParams) -> Result<Self> {
        let key = derive_key(passphrase, &params.salt, params.cost())?;
        if blake256(&key[..]).as_slice() != params.digest.as_slice() {
            return Err(WalletError::Authentication("incorrect passphrase".to_string()));
        }
        Ok(Self {
            key,
            params: params.clone(),
        })
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        encrypt(&self.key[..], plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<SecretBytes> {
        decrypt(&self.key[..], ciphertext)
    }
}

fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    cost: KdfCost,
) -> Result<Zeroizing<[u8; SYMMETRIC_KEY_LEN]>> {
    let params = Params::new(
        cost.memory_kib,
        cost.iterations,
        cost.parallelism,
        Some(SYMMETRIC_KEY_LEN),
    )
    .map_err(|e| WalletError::Kdf(format!("invalid Argon2id params: {}", e)))?;
    let mut key = Zeroizing::new([0u8; SYMMETRIC_KEY_LEN]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(passphrase, salt, &mut key[..])
        .map_err(|e| WalletError::Kdf(format!("Argon2id derivation failed: {}", e)))?;
    Ok(key)
}

fn cipher(key: &[u8]) -> Result<XChaCha20Poly1305> {
    if key.len() != SYMMETRIC_KEY_LEN {
        return Err(WalletError::KeyRange(format!(
            "symmetric key must be {} bytes, got {}",
            SYMMETRIC_KEY_LEN,
            key.len()
        )));
    }
    Ok(XChaCha20Poly1305::new(Key::from_slice(key)))
}

/// Encrypt under a raw 32-byte key. Output is `nonce || ciphertext`.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher(key)?;
    let mut nonce = [0u8; CIPHER_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    let sealed = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| WalletError::Authentication(format!("encryption failed: {}", e)))?;
    let mut out = Vec::with_capacity(CIPHER_NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt a box produced by [`encrypt`].
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> Result<SecretBytes> {
    let cipher = cipher(key)?;
    if ciphertext.len() < CIPHER_NONCE_LEN {
        return Err(WalletError::Authentication("ciphertext too short".to_string()));
    }
    let (nonce, sealed) = ciphertext.split_at(CIPHER_NONCE_LEN);
    let opened = cipher
        .decrypt(XNonce::from_slice(nonce), sealed)
        .map_err(|_| WalletError::Authentication("decryption failed".to_string()))?;
    Ok(Zeroizing::new(opened))
}

/// Fresh random symmetric key
pub fn random_key() -> SecretBytes {
    let mut key = Zeroizing::new(vec![0u8; SYMMETRIC_KEY_LEN]);
    OsRng.fill_bytes(key.as_mut_slice());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_key_rekey() {
        let key = PassphraseKey::new(b"abc", KdfCost::insecure_fast()).unwrap();
        let sealed = key.encrypt(b"payload").unwrap();
        let again = PassphraseKey::rekey(b"abc", key.params()).unwrap();
        assert_eq!(again.decrypt(&sealed).unwrap().as_slice(), b"payload");
    }

    #[test]
    fn test_wrong_passphrase_rejected() {
        let key = PassphraseKey::new(b"abc", KdfCost::insecure_fast()).unwrap();
        let err = PassphraseKey::rekey(b"abd", key.params()).unwrap_err();
        assert!(matches!(err, WalletError::Authentication(_)));
    }

    #[test]
    fn test_empty_passphrase_allowed() {
        let key = PassphraseKey::new(b"", KdfCost::insecure_fast()).unwrap();
        assert!(PassphraseKey::rekey(b"", key.params()).is_ok());
    }

    #[test]
    fn test_raw_key_encrypt_decrypt() {
        let k = random_key();
        let sealed = encrypt(&k, b"dpub...").unwrap();
        assert_eq!(sealed.len(), CIPHER_NONCE_LEN + 7 + 16);
        assert_eq!(decrypt(&k, &sealed).unwrap().as_slice(), b"dpub...");
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let k = random_key();
        let mut sealed = encrypt(&k, b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        assert!(matches!(decrypt(&k, &sealed), Err(WalletError::Authentication(_))));
        assert!(decrypt(&k, &sealed[..10]).is_err());
    }

    #[test]
    fn test_bad_key_length() {
        assert!(matches!(encrypt(&[0u8; 16], b"x"), Err(WalletError::KeyRange(_))));
    }

    #[test]
    fn test_kdf_params_json() {
        let key = PassphraseKey::new(b"pw", KdfCost::insecure_fast()).unwrap();
        let json = serde_json::to_string(key.params()).unwrap();
        let back: KdfParams = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, key.params());
        assert!(json.contains("memoryKib"));
    }
}
