//! Integration tests for BIP32/BIP44 key derivation

use dcr_lightwallet_core::hdkey::{check_branch_keys, new_master};
use dcr_lightwallet_core::*;
use proptest::prelude::*;

const TEST_SEED: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

fn seed() -> Vec<u8> {
    hex::decode(TEST_SEED).unwrap()
}

#[test]
fn test_master_public_key_string() {
    let master = new_master(&seed(), &MAINNET).unwrap();
    assert_eq!(
        master.neuter().string(),
        "dpubZ9169KDAEUnyo8vdTJcpFWeaUEKH3G6detaXv46HxtQcENwxGBbRqbfTCJ9BUnWPCkE8WApKPJ4h7EAapnXCZq1a9AqWWzs1n31VdfwbrQk"
    );
}

#[test]
fn test_bip44_path_per_network() {
    for net in [&MAINNET, &TESTNET3, &SIMNET] {
        let master = new_master(&seed(), net).unwrap();
        let (legacy, slip0044) = net.coin_types();
        for coin_type in [legacy, slip0044] {
            let acct = master
                .derive_coin_type_key(coin_type)
                .unwrap()
                .derive_account_key(0)
                .unwrap();
            assert_eq!(acct.depth(), 3);
            assert_eq!(acct.child_index(), HARDENED_KEY_START);
            check_branch_keys(&acct).unwrap();

            let decoded = ExtendedKey::decode_for_net(&acct.neuter().string(), net).unwrap();
            assert_eq!(decoded, acct.neuter());
        }
    }
}

#[test]
fn test_networks_give_distinct_serializations() {
    let mainnet = new_master(&seed(), &MAINNET).unwrap();
    let testnet = new_master(&seed(), &TESTNET3).unwrap();
    let simnet = new_master(&seed(), &SIMNET).unwrap();
    assert_eq!(mainnet.key_bytes(), testnet.key_bytes());
    assert!(mainnet.string().starts_with("dprv"));
    assert!(testnet.string().starts_with("tprv"));
    assert!(simnet.string().starts_with("sprv"));
}

#[test]
fn test_seed_errors() {
    assert!(matches!(new_master(&[], &MAINNET), Err(WalletError::SeedLength(0))));
    assert!(matches!(
        new_master(&[0u8; MAX_SEED_BYTES + 1], &MAINNET),
        Err(WalletError::SeedLength(_))
    ));
}

proptest! {
    /// Neutering then deriving a non-hardened child gives the same public key
    /// as deriving the private child then neutering.
    #[test]
    fn prop_public_derivation_matches_private(
        seed in prop::collection::vec(any::<u8>(), MIN_SEED_BYTES..=MAX_SEED_BYTES),
        index in 0u32..HARDENED_KEY_START,
    ) {
        let master = new_master(&seed, &MAINNET);
        prop_assume!(master.is_ok());
        let master = master.unwrap();

        let from_private = master.child(index);
        let from_public = master.neuter().child(index);
        match (from_private, from_public) {
            (Ok(private_child), Ok(public_child)) => {
                prop_assert_eq!(private_child.neuter(), public_child);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            _ => prop_assert!(false, "private and public derivation disagree"),
        }
    }

    #[test]
    fn prop_serialization_round_trip(seed in prop::array::uniform32(any::<u8>()), index in any::<u32>()) {
        let master = new_master(&seed, &SIMNET).unwrap();
        if let Ok(child) = master.child(index) {
            prop_assert_eq!(ExtendedKey::decode(&child.string()).unwrap(), child.clone());
            prop_assert_eq!(ExtendedKey::decode(&child.neuter().string()).unwrap(), child.neuter());
        }
    }
}
