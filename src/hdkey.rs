//! Hierarchical deterministic keys (BIP32) and BIP44 path helpers
//!
//! An [`ExtendedKey`] is one node of the key tree. Private nodes hold a
//! 32-byte scalar, public nodes a 33-byte compressed point; both carry the
//! compressed public key so neutering never touches curve arithmetic.

use crate::address::Address;
use crate::constants::*;
use crate::crypto::{b58_check_decode, b58_check_encode, hash160, hmac_sha512};
use crate::error::{Derived, Result, WalletError};
use crate::network::NetworkParams;
use crate::secret::SecretBytes;
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKey {
    private_version: [u8; 4],
    public_version: [u8; 4],
    key: Vec<u8>,
    pub_key: Vec<u8>,
    chain_code: [u8; 32],
    parent_fingerprint: [u8; 4],
    depth: u8,
    child_index: u32,
    is_private: bool,
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("pub_key", &hex::encode(&self.pub_key))
            .field("depth", &self.depth)
            .field("child_index", &self.child_index)
            .field("is_private", &self.is_private)
            .finish_non_exhaustive()
    }
}

fn parameter_range(what: &str) -> WalletError {
    WalletError::ParameterRange(format!("invalid child: {}", what))
}

/// Random seed of `len` bytes from the OS generator. The length must lie
/// within the accepted seed bounds; `RECOMMENDED_SEED_LEN` is the usual
/// choice.
pub fn generate_seed(len: usize) -> Result<SecretBytes> {
    if !(MIN_SEED_BYTES..=MAX_SEED_BYTES).contains(&len) {
        return Err(WalletError::SeedLength(len));
    }
    let mut seed = Zeroizing::new(vec![0u8; len]);
    OsRng.fill_bytes(seed.as_mut_slice());
    Ok(seed)
}

/// NewMaster: seed → m
///
/// 1. Require MIN_SEED_BYTES ≤ |seed| ≤ MAX_SEED_BYTES
/// 2. I = HMAC-SHA512("Bitcoin seed", seed)
/// 3. (IL, IR) = split(I); IL must lie in [1, N)
/// 4. Return private node with secret IL and chain code IR
pub fn new_master(seed: &[u8], net: &NetworkParams) -> Result<ExtendedKey> {
    if seed.len() < MIN_SEED_BYTES || seed.len() > MAX_SEED_BYTES {
        return Err(WalletError::SeedLength(seed.len()));
    }
    let i = Zeroizing::new(hmac_sha512(MASTER_HMAC_KEY, seed)?);
    let (il, ir) = i.split_at(32);
    let secret = SecretKey::from_slice(il)
        .map_err(|_| WalletError::KeyRange("master secret outside [1, N)".to_string()))?;
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(ir);
    Ok(ExtendedKey::from_secret(
        (net.hd_private_key_id, net.hd_public_key_id),
        &secret,
        chain_code,
        [0; 4],
        0,
        0,
    ))
}

/// Derive both address branches of an account key purely to prove they
/// exist for this seed.
pub fn check_branch_keys(account_key: &ExtendedKey) -> Result<()> {
    account_key.child(EXTERNAL_BRANCH)?;
    account_key.child(INTERNAL_BRANCH)?;
    Ok(())
}

impl ExtendedKey {
    fn from_secret(
        versions: ([u8; 4], [u8; 4]),
        secret: &SecretKey,
        chain_code: [u8; 32],
        parent_fingerprint: [u8; 4],
        depth: u8,
        child_index: u32,
    ) -> Self {
        let secp = Secp256k1::signing_only();
        let pub_key = PublicKey::from_secret_key(&secp, secret).serialize().to_vec();
        Self {
            private_version: versions.0,
            public_version: versions.1,
            key: secret.secret_bytes().to_vec(),
            pub_key,
            chain_code,
            parent_fingerprint,
            depth,
            child_index,
            is_private: true,
        }
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn child_index(&self) -> u32 {
        self.child_index
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    /// Raw key material: the private scalar or the compressed point.
    pub fn key_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Compressed public key
    pub fn pub_key_bytes(&self) -> &[u8] {
        &self.pub_key
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_slice(&self.pub_key).map_err(|e| WalletError::InvalidPubKey(e.to_string()))
    }

    pub fn secret_key(&self) -> Result<SecretKey> {
        if !self.is_private {
            return Err(WalletError::NotPrivate);
        }
        SecretKey::from_slice(&self.key).map_err(|e| WalletError::KeyRange(e.to_string()))
    }

    /// Child: (node, i) → node_i
    ///
    /// Hardened (i ≥ 2^31): data = 0x00 || k || ser32(i), private nodes only.
    /// Normal: data = serP(K) || ser32(i).
    /// I = HMAC-SHA512(c, data); child key = IL + k (private) or IL·G + K
    /// (public); child chain code = IR.
    /// IL ≥ N, a zero private key or the point at infinity are reported as
    /// `ParameterRange`.
    pub fn child(&self, index: u32) -> Result<ExtendedKey> {
        let hardened = index >= HARDENED_KEY_START;
        if hardened && !self.is_private {
            return Err(WalletError::DeriveHardFromPublic);
        }

        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if hardened {
            data.push(0x00);
            data.extend_from_slice(&self.key);
        } else {
            data.extend_from_slice(&self.pub_key);
        }
        data.extend_from_slice(&index.to_be_bytes());

        let i = Zeroizing::new(hmac_sha512(&self.chain_code, &data)?);
        let mut il = Zeroizing::new([0u8; 32]);
        il.copy_from_slice(&i[..32]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&i[32..]);

        let tweak = Scalar::from_be_bytes(*il).map_err(|_| parameter_range("IL >= N"))?;
        if *il == [0u8; 32] {
            return Err(parameter_range("IL is zero"));
        }

        let fingerprint = hash160(&self.pub_key);
        let parent_fingerprint = [fingerprint[0], fingerprint[1], fingerprint[2], fingerprint[3]];
        let depth = self.depth.checked_add(1).ok_or(WalletError::MaxDepthExceeded)?;

        if self.is_private {
            let secret = SecretKey::from_slice(&self.key)
                .map_err(|e| WalletError::KeyRange(e.to_string()))?
                .add_tweak(&tweak)
                .map_err(|_| parameter_range("child key is zero"))?;
            Ok(ExtendedKey::from_secret(
                (self.private_version, self.public_version),
                &secret,
                chain_code,
                parent_fingerprint,
                depth,
                index,
            ))
        } else {
            let secp = Secp256k1::verification_only();
            let point = self
                .public_key()?
                .add_exp_tweak(&secp, &tweak)
                .map_err(|_| parameter_range("child point at infinity"))?;
            let pub_key = point.serialize().to_vec();
            Ok(ExtendedKey {
                private_version: self.private_version,
                public_version: self.public_version,
                key: pub_key.clone(),
                pub_key,
                chain_code,
                parent_fingerprint,
                depth,
                child_index: index,
                is_private: false,
            })
        }
    }

    /// m/44'/coin_type'
    pub fn derive_coin_type_key(&self, coin_type: u32) -> Result<ExtendedKey> {
        if coin_type >= HARDENED_KEY_START {
            return Err(WalletError::ParameterRange(format!("coin type {} too high", coin_type)));
        }
        let purpose = self.child(BIP44_PURPOSE + HARDENED_KEY_START)?;
        purpose.child(coin_type + HARDENED_KEY_START)
    }

    /// m/44'/coin_type'/account'
    pub fn derive_account_key(&self, account: u32) -> Result<ExtendedKey> {
        if account >= HARDENED_KEY_START {
            return Err(WalletError::ParameterRange(format!("account {} too high", account)));
        }
        self.child(account + HARDENED_KEY_START)
    }

    /// Public-only copy at the same tree position.
    pub fn neuter(&self) -> ExtendedKey {
        ExtendedKey {
            private_version: self.private_version,
            public_version: self.public_version,
            key: self.pub_key.clone(),
            pub_key: self.pub_key.clone(),
            chain_code: self.chain_code,
            parent_fingerprint: self.parent_fingerprint,
            depth: self.depth,
            child_index: self.child_index,
            is_private: false,
        }
    }

    /// Pay-to-pubkey-hash address of child `index`. An invalid child yields
    /// `Derived::Retry` carrying the sentinel address.
    pub fn derive_child_address(&self, index: u32, net: &NetworkParams) -> Result<Derived<String>> {
        match self.child(index) {
            Ok(child) => {
                let addr = Address::PubKeyHash {
                    hash: hash160(child.pub_key_bytes()),
                    net_id: net.pub_key_hash_addr_id,
                };
                Ok(Derived::Ok(addr.encode()))
            }
            Err(WalletError::ParameterRange(_)) => Ok(Derived::Retry(CRAZY_ADDRESS.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Base58 check serialization (xprv/xpub layout).
    pub fn string(&self) -> String {
        let mut buf = Zeroizing::new(Vec::with_capacity(SERIALIZED_KEY_LEN));
        if self.is_private {
            buf.extend_from_slice(&self.private_version);
        } else {
            buf.extend_from_slice(&self.public_version);
        }
        buf.push(self.depth);
        buf.extend_from_slice(&self.parent_fingerprint);
        buf.extend_from_slice(&self.child_index.to_be_bytes());
        buf.extend_from_slice(&self.chain_code);
        if self.is_private {
            buf.push(0x00);
        }
        buf.extend_from_slice(&self.key);
        b58_check_encode(&buf)
    }

    /// Parse a serialized extended key. The network is taken from its magic.
    pub fn decode(s: &str) -> Result<ExtendedKey> {
        let raw = b58_check_decode(s).map_err(|e| WalletError::InvalidExtendedKey(e.to_string()))?;
        if raw.len() != SERIALIZED_KEY_LEN {
            return Err(WalletError::InvalidExtendedKey(format!("length {}", raw.len())));
        }
        let version = [raw[0], raw[1], raw[2], raw[3]];
        let (net, is_private) = NetworkParams::by_hd_version(version)
            .ok_or_else(|| WalletError::InvalidExtendedKey("unknown version".to_string()))?;
        let depth = raw[4];
        let parent_fingerprint = [raw[5], raw[6], raw[7], raw[8]];
        let child_index = u32::from_be_bytes([raw[9], raw[10], raw[11], raw[12]]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&raw[13..45]);
        let key_data = &raw[45..78];

        if is_private {
            if key_data[0] != 0x00 {
                return Err(WalletError::InvalidExtendedKey("missing private key prefix".to_string()));
            }
            let secret = SecretKey::from_slice(&key_data[1..])
                .map_err(|_| WalletError::KeyRange("private key outside [1, N)".to_string()))?;
            Ok(ExtendedKey::from_secret(
                (net.hd_private_key_id, net.hd_public_key_id),
                &secret,
                chain_code,
                parent_fingerprint,
                depth,
                child_index,
            ))
        } else {
            let point = PublicKey::from_slice(key_data)
                .map_err(|e| WalletError::InvalidExtendedKey(e.to_string()))?;
            let pub_key = point.serialize().to_vec();
            Ok(ExtendedKey {
                private_version: net.hd_private_key_id,
                public_version: net.hd_public_key_id,
                key: pub_key.clone(),
                pub_key,
                chain_code,
                parent_fingerprint,
                depth,
                child_index,
                is_private: false,
            })
        }
    }

    /// Parse a serialized extended key, requiring it to belong to `net`.
    pub fn decode_for_net(s: &str, net: &NetworkParams) -> Result<ExtendedKey> {
        let key = Self::decode(s)?;
        if key.private_version != net.hd_private_key_id {
            return Err(WalletError::WrongNetwork(format!("extended key is not for {}", net.name)));
        }
        Ok(key)
    }
}
