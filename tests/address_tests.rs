//! Integration tests for address encoding across networks

use dcr_lightwallet_core::*;
use proptest::prelude::*;

#[test]
fn test_network_lookup() {
    assert_eq!(NetworkParams::by_name("mainnet").unwrap().name, MAINNET.name);
    assert_eq!(NetworkParams::for_coin(DCR_COIN_ID, "testnet3").unwrap().name, TESTNET3.name);
    assert!(NetworkParams::for_coin("btc", "mainnet").is_err());
    assert!(LightWallet::for_network("regtest").is_err());
}

#[test]
fn test_decode_checks_network() {
    let wallet = LightWallet::new(&TESTNET3);
    assert!(wallet.decode_address("Tso2MVTUeVrjHTBFedFhiyM7yVTbieqp91h").is_ok());
    assert!(wallet.decode_address("DsUZxxoHJSty8DCfwfartwTYbuhmVct7tJu").is_err());
    assert!(wallet.decode_address("").is_err());
}

proptest! {
    #[test]
    fn prop_hash_addresses_round_trip(hash in prop::array::uniform20(any::<u8>()), net_idx in 0usize..3) {
        let net = [&MAINNET, &TESTNET3, &SIMNET][net_idx];
        for addr in [
            Address::new_pub_key_hash(&hash, net).unwrap(),
            Address::new_script_hash_from_hash(&hash, net).unwrap(),
        ] {
            let encoded = addr.encode();
            let decoded = Address::decode(&encoded, net).unwrap();
            prop_assert_eq!(&decoded, &addr);
            prop_assert_eq!(decoded.hash160(), Some(hash));
            prop_assert_eq!(decoded.script_address(), hash.to_vec());
        }
    }
}
