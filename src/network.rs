//! Network parameters for the supported Decred networks
//!
//! Nothing in the crate reads a process-wide network. Functions that need
//! address prefixes, HD magics or maturity rules take a `&NetworkParams`.

use crate::constants::DCR_COIN_ID;
use crate::error::{Result, WalletError};

/// Immutable per-network constants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    pub name: &'static str,
    /// Extended private key magic
    pub hd_private_key_id: [u8; 4],
    /// Extended public key magic
    pub hd_public_key_id: [u8; 4],
    pub pub_key_addr_id: [u8; 2],
    pub pub_key_hash_addr_id: [u8; 2],
    pub pkh_edwards_addr_id: [u8; 2],
    pub pkh_schnorr_addr_id: [u8; 2],
    pub script_hash_addr_id: [u8; 2],
    pub private_key_id: [u8; 2],
    /// Blocks before coinbase and stakebase outputs can be spent
    pub coinbase_maturity: u32,
    pub legacy_coin_type: u32,
    pub slip0044_coin_type: u32,
}

pub const MAINNET: NetworkParams = NetworkParams {
    name: "mainnet",
    hd_private_key_id: [0x02, 0xfd, 0xa4, 0xe8], // dprv
    hd_public_key_id: [0x02, 0xfd, 0xa9, 0x26],  // dpub
    pub_key_addr_id: [0x13, 0x86],               // Dk
    pub_key_hash_addr_id: [0x07, 0x3f],          // Ds
    pkh_edwards_addr_id: [0x07, 0x1f],           // De
    pkh_schnorr_addr_id: [0x07, 0x01],           // DS
    script_hash_addr_id: [0x07, 0x1a],           // Dc
    private_key_id: [0x22, 0xde],                // Pm
    coinbase_maturity: 256,
    legacy_coin_type: 20,
    slip0044_coin_type: 42,
};

pub const TESTNET3: NetworkParams = NetworkParams {
    name: "testnet3",
    hd_private_key_id: [0x04, 0x35, 0x83, 0x97], // tprv
    hd_public_key_id: [0x04, 0x35, 0x87, 0xd1],  // tpub
    pub_key_addr_id: [0x28, 0xf7],               // Tk
    pub_key_hash_addr_id: [0x0f, 0x21],          // Ts
    pkh_edwards_addr_id: [0x0f, 0x01],           // Te
    pkh_schnorr_addr_id: [0x0e, 0xe3],           // TS
    script_hash_addr_id: [0x0e, 0xfc],           // Tc
    private_key_id: [0x23, 0x0e],                // Pt
    coinbase_maturity: 16,
    legacy_coin_type: 11,
    slip0044_coin_type: 1,
};

pub const SIMNET: NetworkParams = NetworkParams {
    name: "simnet",
    hd_private_key_id: [0x04, 0x20, 0xb9, 0x03], // sprv
    hd_public_key_id: [0x04, 0x20, 0xbd, 0x3d],  // spub
    pub_key_addr_id: [0x27, 0x6f],               // Sk
    pub_key_hash_addr_id: [0x0e, 0x91],          // Ss
    pkh_edwards_addr_id: [0x0e, 0x71],           // Se
    pkh_schnorr_addr_id: [0x0e, 0x53],           // SS
    script_hash_addr_id: [0x0e, 0x6c],           // Sc
    private_key_id: [0x23, 0x07],                // Ps
    coinbase_maturity: 16,
    legacy_coin_type: 115,
    slip0044_coin_type: 1,
};

const ALL_NETWORKS: [&NetworkParams; 3] = [&MAINNET, &TESTNET3, &SIMNET];

impl NetworkParams {
    /// Look up parameters by network name.
    pub fn by_name(name: &str) -> Result<&'static NetworkParams> {
        ALL_NETWORKS
            .iter()
            .copied()
            .find(|net| net.name == name)
            .ok_or_else(|| WalletError::UnknownNetwork(name.to_string()))
    }

    /// Look up parameters for an asset symbol and network name.
    pub fn for_coin(coin_id: &str, net_name: &str) -> Result<&'static NetworkParams> {
        if coin_id != DCR_COIN_ID {
            return Err(WalletError::UnknownNetwork(format!("unsupported asset {}", coin_id)));
        }
        Self::by_name(net_name)
    }

    /// Find the network whose HD magic matches `version`, reporting whether
    /// the magic is the private one.
    pub fn by_hd_version(version: [u8; 4]) -> Option<(&'static NetworkParams, bool)> {
        ALL_NETWORKS.iter().copied().find_map(|net| {
            if net.hd_private_key_id == version {
                Some((net, true))
            } else if net.hd_public_key_id == version {
                Some((net, false))
            } else {
                None
            }
        })
    }

    /// Legacy and SLIP0044 coin types, in that order.
    pub fn coin_types(&self) -> (u32, u32) {
        (self.legacy_coin_type, self.slip0044_coin_type)
    }
}
