//! # dcr-lightwallet-core
//!
//! Key, script and accounting core of a Decred light wallet.
//!
//! This crate holds the parts of a light wallet that do not touch the network:
//! BIP32/BIP44 key derivation, per-account address cursors and UTXO ledgers,
//! passphrase-protected key storage, standard script classification, and
//! deterministic transaction signing.
//!
//! ## Architecture
//!
//! - `hdkey`: extended keys and child derivation
//! - `account` / `account_manager`: address cursor, UTXO ledger, encrypted keys
//! - `script` / `opcode`: tokenizer, classifier and script builders
//! - `sighash` / `signature` / `sign`: signature hashes, RFC6979 ECDSA, signer
//! - `address`, `transaction`, `network`, `secret`, `crypto`: supporting pieces
//!
//! ## Design Principles
//!
//! 1. **Synchronous**: every operation completes or fails before returning
//! 2. **Explicit network**: parameters are passed in, never global
//! 3. **Secrets zeroed on drop**: open keys and decrypted buffers
//!
//! ## Usage
//!
//! ```rust
//! use dcr_lightwallet_core::LightWallet;
//!
//! let wallet = LightWallet::mainnet();
//! let script = hex::decode("76a914ad06dd6ddee55cbca9a9e3713bd7587509a3056488ac").unwrap();
//! let (_, addrs, required) = wallet.extract_pk_script_addrs(&script).unwrap();
//! assert_eq!(required, 1);
//! assert_eq!(addrs.len(), 1);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod crypto;
pub mod network;
pub mod secret;
pub mod hdkey;
pub mod address;
pub mod transaction;
pub mod opcode;
pub mod script;
pub mod signature;
pub mod sighash;
pub mod sign;
pub mod account;
pub mod account_manager;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{Derived, Result, WalletError};
pub use account::Account;
pub use account_manager::{create_new_account_manager, AccountManager};
pub use address::Address;
pub use hdkey::ExtendedKey;
pub use network::{NetworkParams, MAINNET, SIMNET, TESTNET3};
pub use script::ScriptClass;
pub use secret::KdfCost;
pub use sign::SignatureSuite;
pub use transaction::{MsgTx, OutPoint, TxIn, TxOut};

use secp256k1::SecretKey;

/// Network-bound entry point to the wallet core
///
/// # Examples
///
/// ```
/// use dcr_lightwallet_core::{KdfCost, LightWallet};
///
/// let wallet = LightWallet::for_network("testnet3").unwrap();
/// let seed = [7u8; 32];
/// let mut manager = wallet
///     .create_account_manager(&seed, b"", b"secret", KdfCost::insecure_fast())
///     .unwrap();
/// let account = manager.open_account(0, b"secret").unwrap();
/// let addr = account.get_next_payment_address().unwrap();
/// assert!(addr.starts_with('T'));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LightWallet {
    net: &'static NetworkParams,
}

impl LightWallet {
    pub fn new(net: &'static NetworkParams) -> Self {
        Self { net }
    }

    pub fn mainnet() -> Self {
        Self::new(&MAINNET)
    }

    /// Look up the network by name (`mainnet`, `testnet3`, `simnet`).
    pub fn for_network(name: &str) -> Result<Self> {
        Ok(Self::new(NetworkParams::by_name(name)?))
    }

    pub fn network(&self) -> &'static NetworkParams {
        self.net
    }

    /// Fresh random seed of the recommended length
    pub fn generate_seed(&self) -> Result<secret::SecretBytes> {
        hdkey::generate_seed(RECOMMENDED_SEED_LEN)
    }

    /// Master extended key for `seed`
    ///
    /// ```
    /// use dcr_lightwallet_core::LightWallet;
    ///
    /// let master = LightWallet::mainnet().new_master(&[1u8; 32]).unwrap();
    /// assert!(master.is_private());
    /// assert!(LightWallet::mainnet().new_master(&[1u8; 8]).is_err());
    /// ```
    pub fn new_master(&self, seed: &[u8]) -> Result<ExtendedKey> {
        hdkey::new_master(seed, self.net)
    }

    pub fn create_account_manager(
        &self,
        seed: &[u8],
        pub_passphrase: &[u8],
        priv_passphrase: &[u8],
        cost: KdfCost,
    ) -> Result<AccountManager> {
        create_new_account_manager(seed, pub_passphrase, priv_passphrase, self.net, cost)
    }

    pub fn decode_address(&self, addr: &str) -> Result<Address> {
        Address::decode(addr, self.net)
    }

    /// Output script paying to a base58 address
    pub fn pay_to_addr_script(&self, addr: &str) -> Result<Vec<u8>> {
        script::make_pay_to_addr_script(addr, self.net)
    }

    /// Class, addresses and required signatures of a version 0 output script
    pub fn extract_pk_script_addrs(&self, pk_script: &[u8]) -> Result<(ScriptClass, Vec<Address>, usize)> {
        script::extract_pk_script_addrs(DEFAULT_SCRIPT_VERSION, pk_script, self.net)
    }

    pub fn calc_signature_hash(&self, script: &[u8], hash_type: u32, tx: &MsgTx, idx: usize) -> Result<Hash> {
        sighash::calc_signature_hash(script, hash_type, tx, idx, None)
    }

    /// Sign input `idx` with ECDSA, merging with any previous script.
    pub fn sign_tx_output(
        &self,
        priv_key: &SecretKey,
        tx: &MsgTx,
        idx: usize,
        pk_script: &[u8],
        hash_type: u32,
        previous_script: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        sign::sign_tx_output(
            priv_key,
            self.net,
            tx,
            idx,
            pk_script,
            hash_type,
            previous_script,
            SignatureSuite::EcdsaSecp256k1,
        )
    }

    /// Sign input `idx` of `tx` with the key `account` holds for the address
    /// paid by `pk_script`.
    pub fn sign_with_account(
        &self,
        account: &Account,
        tx: &MsgTx,
        idx: usize,
        pk_script: &[u8],
        hash_type: u32,
    ) -> Result<Vec<u8>> {
        let (_, addrs, _) = self.extract_pk_script_addrs(pk_script)?;
        let addr = addrs
            .first()
            .ok_or_else(|| WalletError::UnsupportedScript("script pays no address".to_string()))?;
        let priv_key = account.get_priv_key_for_address(&addr.address())?;
        self.sign_tx_output(&priv_key, tx, idx, pk_script, hash_type, None)
    }
}

impl Default for LightWallet {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sighash::SIG_HASH_ALL;

    #[test]
    fn test_default_is_mainnet() {
        assert_eq!(LightWallet::default().network().name, "mainnet");
        assert!(LightWallet::for_network("nonet").is_err());
    }

    #[test]
    fn test_generated_seed_creates_manager() {
        let wallet = LightWallet::new(&SIMNET);
        let seed = wallet.generate_seed().unwrap();
        assert_eq!(seed.len(), RECOMMENDED_SEED_LEN);
        let manager = wallet
            .create_account_manager(&seed, b"", b"pw", KdfCost::insecure_fast())
            .unwrap();
        assert_eq!(manager.accounts().len(), 1);
    }

    #[test]
    fn test_sign_with_account() {
        let wallet = LightWallet::for_network("simnet").unwrap();
        let mut manager = wallet
            .create_account_manager(&[3u8; 32], b"", b"pw", KdfCost::insecure_fast())
            .unwrap();
        let account = manager.open_account(0, b"pw").unwrap();
        let addr = account.get_next_payment_address().unwrap();
        let pk_script = wallet.pay_to_addr_script(&addr).unwrap();

        let mut tx = MsgTx::new();
        tx.add_tx_in(TxIn::new(OutPoint { hash: [9u8; 32], index: 0, tree: 0 }, 1000, vec![]));
        tx.add_tx_out(TxOut::new(900, pk_script.clone()));

        let sig_script = wallet.sign_with_account(account, &tx, 0, &pk_script, SIG_HASH_ALL).unwrap();
        // <sig||hashType> <33-byte pubkey>
        let pub_key = script::final_opcode_data(0, &sig_script).unwrap();
        assert_eq!(pub_key.len(), 33);
        assert_eq!(*sig_script.last().unwrap(), pub_key[32]);

        let stranger = Address::new_pub_key_hash(&[5u8; 20], wallet.network()).unwrap();
        let unknown = script::pay_to_addr_script(&stranger).unwrap();
        assert!(matches!(
            wallet.sign_with_account(account, &tx, 0, &unknown, SIG_HASH_ALL),
            Err(WalletError::UnknownAddress(_))
        ));
    }
}
