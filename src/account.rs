//! BIP44 account: address cursor, UTXO ledger and key custody
//!
//! Extended keys are stored encrypted. While an account is open it holds
//! the account private key and the two neutered branch keys; `close()`
//! drops them, which zeroes their buffers.

use crate::constants::*;
use crate::error::{Derived, Result, WalletError};
use crate::hdkey::ExtendedKey;
use crate::network::NetworkParams;
use crate::secret::decrypt;
use crate::transaction::MsgTx;
use crate::types::{Balance, Utxo};
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Keys held only while the account is open
#[derive(Debug)]
struct OpenKeys {
    priv_key: ExtendedKey,
    ext_pub: ExtendedKey,
    int_pub: ExtendedKey,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(with = "hex")]
    pub_key_encrypted: Vec<u8>,
    #[serde(with = "hex")]
    priv_key_encrypted: Vec<u8>,
    name: String,
    #[serde(rename = "coinID")]
    coin_id: String,
    #[serde(rename = "netID")]
    net_id: String,
    /// -1 until the first address is generated
    last_external_index: i64,
    last_internal_index: i64,
    external_addresses: Vec<String>,
    internal_addresses: Vec<String>,
    cursor: usize,
    /// address -> txids touching it
    txs: BTreeMap<String, Vec<String>>,
    /// "{txid}#{vout}" -> output
    utxos: BTreeMap<String, Utxo>,
    balance: Balance,
    #[serde(skip)]
    mempool: HashMap<String, MsgTx>,
    #[serde(skip)]
    keys: Option<OpenKeys>,
}


fn next_index(addresses: &[String], last_index: i64, branch: &str) -> Result<u32> {
    if addresses.len() as i64 != last_index + 1 {
        return Err(WalletError::IndexMismatch(format!(
            "{} branch has {} addresses but last index {}",
            branch,
            addresses.len(),
            last_index
        )));
    }
    u32::try_from(last_index + 1)
        .map_err(|_| WalletError::IndexMismatch(format!("{} branch index overflow", branch)))
}

/// Append the address at the branch's next index. An invalid child records
/// the sentinel address and the index still advances.
fn extend_branch<F>(addresses: &mut Vec<String>, last_index: &mut i64, branch: &str, derive: F) -> Result<String>
where
    F: FnOnce(u32) -> Result<Derived<String>>,
{
    let idx = next_index(addresses, *last_index, branch)?;
    let addr = match derive(idx)? {
        Derived::Ok(addr) => addr,
        Derived::Retry(addr) => {
            tracing::warn!(branch, index = idx, "invalid child key, recording placeholder address");
            addr
        }
    };
    addresses.push(addr.clone());
    *last_index = idx as i64;
    Ok(addr)
}

impl Account {
    /// Create a closed account. The coin and network must be known.
    pub fn new(
        pub_key_encrypted: Vec<u8>,
        priv_key_encrypted: Vec<u8>,
        name: &str,
        coin_id: &str,
        net_id: &str,
    ) -> Result<Self> {
        NetworkParams::for_coin(coin_id, net_id)?;
        Ok(Self {
            pub_key_encrypted,
            priv_key_encrypted,
            name: name.to_string(),
            coin_id: coin_id.to_string(),
            net_id: net_id.to_string(),
            last_external_index: -1,
            last_internal_index: -1,
            external_addresses: vec![],
            internal_addresses: vec![],
            cursor: 0,
            txs: BTreeMap::new(),
            utxos: BTreeMap::new(),
            balance: Balance::default(),
            mempool: HashMap::new(),
            keys: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coin_id(&self) -> &str {
        &self.coin_id
    }

    pub fn net_id(&self) -> &str {
        &self.net_id
    }

    pub fn net(&self) -> Result<&'static NetworkParams> {
        NetworkParams::for_coin(&self.coin_id, &self.net_id)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn external_addresses(&self) -> &[String] {
        &self.external_addresses
    }

    pub fn internal_addresses(&self) -> &[String] {
        &self.internal_addresses
    }

    pub fn last_external_index(&self) -> i64 {
        self.last_external_index
    }

    pub fn last_internal_index(&self) -> i64 {
        self.last_internal_index
    }

    /// Balance as of the last `calc_balance`
    pub fn balance(&self) -> Balance {
        self.balance
    }

    // ------------------------------------------------------------------
    // Transaction and UTXO ledger
    // ------------------------------------------------------------------

    /// Known txids for `addr`
    pub fn addr_txs(&self, addr: &str) -> &[String] {
        self.txs.get(addr).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn address_utxos(&self, addr: &str) -> Vec<&Utxo> {
        self.utxos
            .values()
            .filter(|u| u.address.as_deref() == Some(addr))
            .collect()
    }

    pub fn utxoscan(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos.values()
    }

    pub fn add_utxo(&mut self, utxo: Utxo) {
        self.utxos.insert(utxo.key(), utxo);
    }

    pub fn get_utxo(&self, txid: &str, vout: u32) -> Option<&Utxo> {
        self.utxos.get(&Utxo::make_key(txid, vout))
    }

    /// True for txids in the mempool or funding a watched output.
    pub fn cares_about_txid(&self, txid: &str) -> bool {
        self.mempool.contains_key(txid) || self.has_utxo_with_txid(txid)
    }

    pub fn has_utxo_with_txid(&self, txid: &str) -> bool {
        self.utxos.values().any(|u| u.txid == txid)
    }

    pub fn utxos_for_txid(&self, txid: &str) -> Vec<Utxo> {
        self.utxos.values().filter(|u| u.txid == txid).cloned().collect()
    }

    pub fn spend_utxos(&mut self, utxos: &[Utxo]) {
        for utxo in utxos {
            self.spend_utxo(utxo);
        }
    }

    /// Remove and return the output, if watched.
    pub fn spend_utxo(&mut self, utxo: &Utxo) -> Option<Utxo> {
        self.utxos.remove(&utxo.key())
    }

    pub fn spend_txid_vout(&mut self, txid: &str, vout: u32) -> Option<Utxo> {
        self.utxos.remove(&Utxo::make_key(txid, vout))
    }

    /// Replace the UTXO set with outputs reported by the chain.
    pub fn resolve_utxos(&mut self, blockchain_utxos: Vec<Utxo>) {
        self.utxos = blockchain_utxos.into_iter().map(|u| (u.key(), u)).collect();
    }

    /// Select outputs, smallest first, until `requested` atoms are covered.
    ///
    /// Outputs rejected by `approve` are skipped. The flag reports whether
    /// the selection reaches the requested amount.
    pub fn get_utxos(&self, requested: i64, approve: Option<&dyn Fn(&Utxo) -> bool>) -> (Vec<Utxo>, bool) {
        let mut candidates: Vec<&Utxo> = self.utxos.values().collect();
        candidates.sort_by_key(|u| u.satoshis);

        let mut matches = vec![];
        let mut collected = 0i64;
        for utxo in candidates {
            if let Some(approve) = approve {
                if !approve(utxo) {
                    continue;
                }
            }
            matches.push(utxo.clone());
            collected += utxo.satoshis;
            if collected >= requested {
                break;
            }
        }
        (matches, collected >= requested)
    }

    pub fn add_mempool_tx(&mut self, tx: MsgTx) {
        self.mempool.insert(tx.txid(), tx);
    }

    /// Record that `txid` touches `addr`. Duplicates are ignored.
    pub fn add_txid(&mut self, addr: &str, txid: &str) {
        let txids = self.txs.entry(addr.to_string()).or_default();
        if !txids.iter().any(|t| t == txid) {
            txids.push(txid.to_string());
        }
    }

    /// Drop `tx` from the mempool and stamp its outputs with the block
    /// height. Coinbase-like outputs also get a maturity height.
    pub fn confirm_tx(&mut self, tx: &MsgTx, block_height: u32) -> Result<()> {
        let net = self.net()?;
        let txid = tx.txid();
        self.mempool.remove(&txid);
        let coinbase = tx.looks_like_coinbase();
        for utxo in self.utxos.values_mut().filter(|u| u.txid == txid) {
            utxo.height = Some(block_height);
            if coinbase {
                utxo.maturity = Some(block_height.saturating_add(net.coinbase_maturity));
            }
        }
        tracing::debug!(%txid, block_height, coinbase, "confirmed transaction");
        Ok(())
    }

    /// Recompute the balance at `tip_height`, store it and return it.
    pub fn calc_balance(&mut self, tip_height: u32) -> Balance {
        let mut balance = Balance::default();
        for utxo in self.utxos.values() {
            balance.total += utxo.satoshis;
            if utxo.is_spendable(tip_height) {
                balance.available += utxo.satoshis;
            }
        }
        self.balance = balance;
        balance
    }

    // ------------------------------------------------------------------
    // Address cursor
    // ------------------------------------------------------------------

    fn open_keys(&self) -> Result<&OpenKeys> {
        self.keys.as_ref().ok_or(WalletError::AccountClosed)
    }

    /// Derive the next external address without moving the cursor.
    pub fn generate_next_payment_address(&mut self) -> Result<String> {
        let net = self.net()?;
        let keys = self.keys.as_ref().ok_or(WalletError::AccountClosed)?;
        extend_branch(
            &mut self.external_addresses,
            &mut self.last_external_index,
            "external",
            |idx| keys.ext_pub.derive_child_address(idx, net),
        )
    }

    /// Advance the cursor, deriving addresses as needed.
    pub fn get_next_payment_address(&mut self) -> Result<String> {
        self.cursor += 1;
        while self.cursor >= self.external_addresses.len() {
            self.generate_next_payment_address()?;
        }
        Ok(self.external_addresses[self.cursor].clone())
    }

    /// Ensure `gap` addresses exist past the later of the cursor and the
    /// highest external address seen in a transaction. The cursor stays put.
    pub fn generate_gap_addresses(&mut self, gap: usize) -> Result<()> {
        if self.keys.is_none() {
            tracing::warn!(account = %self.name, "attempting to generate gap addresses on a closed account");
            return Ok(());
        }
        let highest = self
            .external_addresses
            .iter()
            .enumerate()
            .filter(|(_, addr)| self.txs.contains_key(*addr))
            .map(|(i, _)| i)
            .max()
            .unwrap_or(0);
        let tip = highest.max(self.cursor) + gap;
        while self.external_addresses.len() < tip {
            self.generate_next_payment_address()?;
        }
        Ok(())
    }

    /// Derive a fresh internal (change) address.
    pub fn get_change_address(&mut self) -> Result<String> {
        let net = self.net()?;
        let keys = self.keys.as_ref().ok_or(WalletError::AccountClosed)?;
        extend_branch(
            &mut self.internal_addresses,
            &mut self.last_internal_index,
            "internal",
            |idx| keys.int_pub.derive_child_address(idx, net),
        )
    }

    /// Internal addresses followed by external addresses
    pub fn all_addresses(&self) -> Vec<String> {
        self.internal_addresses
            .iter()
            .chain(self.external_addresses.iter())
            .cloned()
            .collect()
    }

    /// Addresses holding UTXOs plus the external addresses from ten before
    /// the cursor up to the cursor.
    pub fn addresses_of_interest(&self) -> Vec<String> {
        let mut set: BTreeSet<String> = self.utxos.values().filter_map(|u| u.address.clone()).collect();
        let start = self.cursor.saturating_sub(ADDRESS_WATCH_BEHIND);
        for addr in self.external_addresses.iter().take(self.cursor + 1).skip(start) {
            set.insert(addr.clone());
        }
        set.into_iter().collect()
    }

    /// External address at the cursor
    pub fn payment_address(&self) -> Option<&str> {
        self.external_addresses.get(self.cursor).map(String::as_str)
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    fn decode_key(&self, crypto_key: &[u8], encrypted: &[u8]) -> Result<ExtendedKey> {
        let plain = decrypt(crypto_key, encrypted)?;
        let s = std::str::from_utf8(&plain)
            .map_err(|_| WalletError::InvalidExtendedKey("stored key is not UTF-8".to_string()))?;
        ExtendedKey::decode_for_net(s, self.net()?)
    }

    /// Decrypt the account private key with the private crypto key.
    pub fn private_extended_key(&self, crypto_key: &[u8]) -> Result<ExtendedKey> {
        self.decode_key(crypto_key, &self.priv_key_encrypted)
    }

    /// Decrypt the account public key with the public crypto key.
    pub fn public_extended_key(&self, crypto_key: &[u8]) -> Result<ExtendedKey> {
        self.decode_key(crypto_key, &self.pub_key_encrypted)
    }

    /// Open: decrypt the private key and derive both branch public keys.
    pub fn open(&mut self, crypto_key: &[u8]) -> Result<()> {
        let priv_key = self.private_extended_key(crypto_key)?;
        let pub_x = priv_key.neuter();
        let ext_pub = pub_x.child(EXTERNAL_BRANCH)?;
        let int_pub = pub_x.child(INTERNAL_BRANCH)?;
        self.keys = Some(OpenKeys {
            priv_key,
            ext_pub,
            int_pub,
        });
        tracing::debug!(account = %self.name, "opened account");
        Ok(())
    }

    /// Drop the open keys. Their buffers are zeroed on drop.
    pub fn close(&mut self) {
        if self.keys.take().is_some() {
            tracing::debug!(account = %self.name, "closed account");
        }
    }

    pub fn is_open(&self) -> bool {
        self.keys.is_some()
    }

    /// Branch and index of an address owned by this account
    pub fn branch_and_index(&self, addr: &str) -> Option<(u32, u32)> {
        if let Some(i) = self.external_addresses.iter().position(|a| a == addr) {
            return Some((EXTERNAL_BRANCH, i as u32));
        }
        self.internal_addresses
            .iter()
            .position(|a| a == addr)
            .map(|i| (INTERNAL_BRANCH, i as u32))
    }

    pub fn get_priv_key_for_address(&self, addr: &str) -> Result<SecretKey> {
        let (branch, idx) = self
            .branch_and_index(addr)
            .ok_or_else(|| WalletError::UnknownAddress(addr.to_string()))?;
        let keys = self.open_keys()?;
        keys.priv_key.child(branch)?.child(idx)?.secret_key()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a closed account, checking its network is known.
    pub fn from_json(s: &str) -> Result<Self> {
        let account: Account = serde_json::from_str(s)?;
        account.net()?;
        Ok(account)
    }
}
