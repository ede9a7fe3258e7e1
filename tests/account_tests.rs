//! Integration tests for accounts and the account manager

use dcr_lightwallet_core::*;
use proptest::prelude::*;

const TEST_SEED: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
const PASSWORD: &[u8] = b"abc";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn manager() -> AccountManager {
    init_logging();
    let seed = hex::decode(TEST_SEED).unwrap();
    create_new_account_manager(&seed, b"", PASSWORD, &MAINNET, KdfCost::insecure_fast()).unwrap()
}

fn utxo(txid: &str, vout: u32, satoshis: i64, maturity: Option<u32>) -> Utxo {
    Utxo {
        address: None,
        txid: txid.to_string(),
        vout,
        script_pub_key: vec![],
        amount: satoshis as f64 / ATOMS_PER_COIN as f64,
        satoshis,
        height: None,
        maturity,
    }
}

#[test]
fn test_public_and_private_account_keys_agree() {
    let am = manager();
    let from_priv = am.acct_private_key(0, PASSWORD).unwrap().neuter();
    let from_pub = am.acct_public_key(0, b"").unwrap();
    assert_eq!(
        from_priv.derive_child_address(5, &MAINNET).unwrap(),
        from_pub.derive_child_address(5, &MAINNET).unwrap()
    );
}

#[test]
fn test_account_ledger() {
    let mut am = manager();
    let acct = am.open_account(0, PASSWORD).unwrap();
    for _ in 0..20 {
        acct.get_next_payment_address().unwrap();
    }
    assert_eq!(acct.cursor(), 20);
    assert_eq!(acct.external_addresses().len(), 21);

    let satoshis = 5 * ATOMS_PER_COIN;
    let txid = "abcdefghijkl";
    let coins = utxo(txid, 2, satoshis, Some(1));

    acct.add_utxo(coins.clone());
    assert_eq!(acct.utxoscan().count(), 1);
    assert_eq!(acct.calc_balance(1).total, satoshis);
    assert_eq!(acct.calc_balance(1).available, satoshis);
    assert_eq!(acct.calc_balance(0).available, 0);
    assert!(acct.get_utxo(txid, 2).is_some());
    assert!(acct.get_utxo("", 0).is_none());
    assert!(acct.cares_about_txid(txid));

    let utxos = acct.utxos_for_txid(txid);
    assert_eq!(utxos.len(), 1);
    acct.spend_utxos(&utxos);
    assert_eq!(acct.utxoscan().count(), 0);

    acct.add_utxo(coins.clone());
    assert_eq!(acct.utxoscan().count(), 1);
    assert_eq!(acct.spend_utxo(&coins), Some(coins.clone()));
    assert_eq!(acct.utxoscan().count(), 0);
    assert_eq!(acct.spend_utxo(&coins), None);
}

#[test]
fn test_change_addresses() {
    let mut am = manager();
    let acct = am.open_account(0, PASSWORD).unwrap();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..10 {
        let addr = acct.get_change_address().unwrap();
        assert!(addr.starts_with("Ds"));
        assert!(seen.insert(addr));
    }
    assert_eq!(acct.last_internal_index(), 9);
    assert_eq!(acct.all_addresses().len(), 11);
}

#[test]
fn test_reopen_after_close_keeps_cursor() {
    let mut am = manager();
    let addr = {
        let acct = am.open_account(0, PASSWORD).unwrap();
        let addr = acct.get_next_payment_address().unwrap();
        acct.close();
        addr
    };
    let acct = am.account(0).unwrap();
    assert!(!acct.is_open());
    assert_eq!(acct.payment_address(), Some(addr.as_str()));

    let acct = am.open_account(0, PASSWORD).unwrap();
    let key = acct.get_priv_key_for_address(&addr).unwrap();
    let pub_key = secp256k1::PublicKey::from_secret_key(&secp256k1::Secp256k1::new(), &key);
    let expected = Address::new_pub_key_hash(&crypto::hash160(&pub_key.serialize()), &MAINNET).unwrap();
    assert_eq!(expected.encode(), addr);
}

#[test]
fn test_manager_persistence() {
    let mut am = manager();
    {
        let acct = am.open_account(0, PASSWORD).unwrap();
        acct.generate_gap_addresses(DEFAULT_GAP_LIMIT).unwrap();
        acct.add_utxo(utxo("ff", 0, 42, None));
    }
    let json = am.to_json().unwrap();
    let restored = AccountManager::from_json(&json).unwrap();
    let acct = restored.account(0).unwrap();
    assert!(!acct.is_open());
    assert_eq!(acct.external_addresses().len(), DEFAULT_GAP_LIMIT);
    assert_eq!(acct.get_utxo("ff", 0).map(|u| u.satoshis), Some(42));
    // Open keys never reach the record.
    assert!(!json.contains("dprv"));
}

proptest! {
    #[test]
    fn prop_balance_is_idempotent_and_bounded(
        amounts in prop::collection::vec((1i64..1_000_000, prop::option::of(0u32..50)), 0..20),
        tip in 0u32..60,
    ) {
        let am = manager();
        let mut acct = Account::from_json(&am.account(0).unwrap().to_json().unwrap()).unwrap();
        let mut total = 0;
        for (i, (sats, maturity)) in amounts.iter().enumerate() {
            acct.add_utxo(utxo("aa", i as u32, *sats, *maturity));
            total += sats;
        }
        let first = acct.calc_balance(tip);
        let second = acct.calc_balance(tip);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first.total, total);
        prop_assert!(first.available <= first.total);
        prop_assert_eq!(acct.balance(), first);
    }
}
