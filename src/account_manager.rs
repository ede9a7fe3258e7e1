//! Account manager: wallet creation and passphrase-gated key access
//!
//! Two passphrase keys protect three random crypto keys. The public crypto
//! key encrypts extended public keys, the private crypto key encrypts
//! extended private keys, and the script key is reserved for scripts.

use crate::account::Account;
use crate::constants::{DCR_COIN_ID, DEFAULT_ACCOUNT_NAME};
use crate::error::{Result, WalletError};
use crate::hdkey::{check_branch_keys, new_master, ExtendedKey};
use crate::network::NetworkParams;
use crate::secret::{encrypt, random_key, KdfCost, KdfParams, PassphraseKey, SecretBytes};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountManager {
    #[serde(with = "hex")]
    crypto_key_pub_enc: Vec<u8>,
    #[serde(with = "hex")]
    crypto_key_priv_enc: Vec<u8>,
    #[serde(with = "hex")]
    crypto_key_script_enc: Vec<u8>,
    #[serde(with = "hex")]
    coin_type_legacy_pub_enc: Vec<u8>,
    #[serde(with = "hex")]
    coin_type_legacy_priv_enc: Vec<u8>,
    #[serde(rename = "coinTypeSLIP0044PubEnc", with = "hex")]
    coin_type_slip0044_pub_enc: Vec<u8>,
    #[serde(rename = "coinTypeSLIP0044PrivEnc", with = "hex")]
    coin_type_slip0044_priv_enc: Vec<u8>,
    /// Account 0 under the legacy coin type
    base_account: Account,
    priv_params: KdfParams,
    pub_params: KdfParams,
    watching_only: bool,
    accounts: Vec<Account>,
}

fn encrypt_key(crypto_key: &[u8], key: &ExtendedKey) -> Result<Vec<u8>> {
    let encoded = SecretBytes::new(key.string().into_bytes());
    encrypt(crypto_key, &encoded)
}

/// CreateNewAccountManager: build a wallet from `seed`
///
/// 1. The private passphrase must not be empty
/// 2. Derive the legacy and SLIP0044 coin-type keys and their account 0 keys,
///    checking both branches of each account can be derived
/// 3. Wrap three random crypto keys under the passphrase keys
/// 4. Store every extended key encrypted under the matching crypto key
/// 5. The SLIP0044 account becomes account 0 with one payment address
pub fn create_new_account_manager(
    seed: &[u8],
    pub_passphrase: &[u8],
    priv_passphrase: &[u8],
    net: &NetworkParams,
    cost: KdfCost,
) -> Result<AccountManager> {
    if priv_passphrase.is_empty() {
        return Err(WalletError::EmptyPassphrase);
    }

    let root = new_master(seed, net)?;
    let (legacy_coin_type, slip0044_coin_type) = net.coin_types();
    let coin_type_legacy_priv = root.derive_coin_type_key(legacy_coin_type)?;
    let coin_type_slip0044_priv = root.derive_coin_type_key(slip0044_coin_type)?;

    let acct_legacy_priv = coin_type_legacy_priv.derive_account_key(0)?;
    let acct_slip0044_priv = coin_type_slip0044_priv.derive_account_key(0)?;
    check_branch_keys(&acct_legacy_priv)?;
    check_branch_keys(&acct_slip0044_priv)?;

    let acct_legacy_pub = acct_legacy_priv.neuter();
    let acct_slip0044_pub = acct_slip0044_priv.neuter();

    let master_key_pub = PassphraseKey::new(pub_passphrase, cost)?;
    let master_key_priv = PassphraseKey::new(priv_passphrase, cost)?;

    let crypto_key_pub = random_key();
    let crypto_key_priv = random_key();
    let crypto_key_script = random_key();

    let crypto_key_pub_enc = master_key_pub.encrypt(&crypto_key_pub)?;
    let crypto_key_priv_enc = master_key_priv.encrypt(&crypto_key_priv)?;
    let crypto_key_script_enc = master_key_priv.encrypt(&crypto_key_script)?;

    let coin_type_legacy_pub = coin_type_legacy_priv.neuter();
    let coin_type_slip0044_pub = coin_type_slip0044_priv.neuter();
    let coin_type_legacy_pub_enc = encrypt_key(&crypto_key_pub, &coin_type_legacy_pub)?;
    let coin_type_legacy_priv_enc = encrypt_key(&crypto_key_priv, &coin_type_legacy_priv)?;
    let coin_type_slip0044_pub_enc = encrypt_key(&crypto_key_pub, &coin_type_slip0044_pub)?;
    let coin_type_slip0044_priv_enc = encrypt_key(&crypto_key_priv, &coin_type_slip0044_priv)?;

    let base_account = Account::new(
        encrypt_key(&crypto_key_pub, &acct_legacy_pub)?,
        encrypt_key(&crypto_key_priv, &acct_legacy_priv)?,
        DEFAULT_ACCOUNT_NAME,
        DCR_COIN_ID,
        net.name,
    )?;

    let mut zeroth_account = Account::new(
        encrypt_key(&crypto_key_pub, &acct_slip0044_pub)?,
        encrypt_key(&crypto_key_priv, &acct_slip0044_priv)?,
        DEFAULT_ACCOUNT_NAME,
        DCR_COIN_ID,
        net.name,
    )?;
    zeroth_account.open(&crypto_key_priv)?;
    zeroth_account.generate_next_payment_address()?;
    zeroth_account.close();

    tracing::debug!(
        network = net.name,
        coin_type_legacy_pub = %coin_type_legacy_pub.string(),
        coin_type_slip0044_pub = %coin_type_slip0044_pub.string(),
        acct_legacy_pub = %acct_legacy_pub.string(),
        acct_slip0044_pub = %acct_slip0044_pub.string(),
        "created account manager"
    );

    let mut manager = AccountManager {
        crypto_key_pub_enc,
        crypto_key_priv_enc,
        crypto_key_script_enc,
        coin_type_legacy_pub_enc,
        coin_type_legacy_priv_enc,
        coin_type_slip0044_pub_enc,
        coin_type_slip0044_priv_enc,
        base_account,
        priv_params: master_key_priv.params().clone(),
        pub_params: master_key_pub.params().clone(),
        watching_only: false,
        accounts: vec![],
    };
    manager.add_account(zeroth_account);
    Ok(manager)
}

impl AccountManager {
    /// Append an account. Its position becomes its index.
    pub fn add_account(&mut self, account: Account) {
        self.accounts.push(account);
    }

    pub fn account(&self, idx: usize) -> Result<&Account> {
        self.accounts.get(idx).ok_or(WalletError::AccountNotFound(idx))
    }

    pub fn account_mut(&mut self, idx: usize) -> Result<&mut Account> {
        self.accounts.get_mut(idx).ok_or(WalletError::AccountNotFound(idx))
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn base_account(&self) -> &Account {
        &self.base_account
    }

    pub fn watching_only(&self) -> bool {
        self.watching_only
    }

    fn crypto_key_priv(&self, passphrase: &[u8]) -> Result<SecretBytes> {
        PassphraseKey::rekey(passphrase, &self.priv_params)?.decrypt(&self.crypto_key_priv_enc)
    }

    fn crypto_key_pub(&self, passphrase: &[u8]) -> Result<SecretBytes> {
        PassphraseKey::rekey(passphrase, &self.pub_params)?.decrypt(&self.crypto_key_pub_enc)
    }

    /// Open account `idx` with the private passphrase.
    pub fn open_account(&mut self, idx: usize, passphrase: &[u8]) -> Result<&mut Account> {
        if idx >= self.accounts.len() {
            return Err(WalletError::AccountNotFound(idx));
        }
        let crypto_key = self.crypto_key_priv(passphrase)?;
        let account = self.account_mut(idx)?;
        account.open(&crypto_key)?;
        Ok(account)
    }

    /// Private extended key of account `idx`, unlocked by the private passphrase
    pub fn acct_private_key(&self, idx: usize, passphrase: &[u8]) -> Result<ExtendedKey> {
        let account = self.account(idx)?;
        let crypto_key = self.crypto_key_priv(passphrase)?;
        account.private_extended_key(&crypto_key)
    }

    /// Public extended key of account `idx`, unlocked by the public passphrase
    pub fn acct_public_key(&self, idx: usize, passphrase: &[u8]) -> Result<ExtendedKey> {
        let account = self.account(idx)?;
        let crypto_key = self.crypto_key_pub(passphrase)?;
        account.public_extended_key(&crypto_key)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let manager: AccountManager = serde_json::from_str(s)?;
        manager.base_account.net()?;
        for account in &manager.accounts {
            account.net()?;
        }
        Ok(manager)
    }
}
