//! Core wallet types shared across modules

use serde::{Deserialize, Serialize};

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Account balance in atoms.
///
/// `total` sums every known UTXO; `available` leaves out those that are
/// unconfirmed or still maturing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub total: i64,
    pub available: i64,
}

/// Unspent transaction output watched by an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub address: Option<String>,
    pub txid: String,
    pub vout: u32,
    #[serde(with = "hex")]
    pub script_pub_key: ByteString,
    /// Value in coins, as reported by the chain backend
    pub amount: f64,
    /// Value in atoms
    pub satoshis: i64,
    pub height: Option<u32>,
    pub maturity: Option<u32>,
}

impl Utxo {
    /// Key of an output in the account's UTXO map
    pub fn make_key(txid: &str, vout: u32) -> String {
        format!("{}#{}", txid, vout)
    }

    pub fn key(&self) -> String {
        Self::make_key(&self.txid, self.vout)
    }

    /// Maturing outputs become spendable at their maturity height; others
    /// once confirmed.
    pub fn is_spendable(&self, tip_height: u32) -> bool {
        match self.maturity {
            Some(maturity) => tip_height >= maturity,
            None => self.height.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(height: Option<u32>, maturity: Option<u32>) -> Utxo {
        Utxo {
            address: None,
            txid: "ab".to_string(),
            vout: 1,
            script_pub_key: vec![],
            amount: 1.0,
            satoshis: 100_000_000,
            height,
            maturity,
        }
    }

    #[test]
    fn test_utxo_key() {
        assert_eq!(utxo(None, None).key(), "ab#1");
        assert_eq!(Utxo::make_key("cd", 0), "cd#0");
    }

    #[test]
    fn test_spendable_unconfirmed() {
        assert!(!utxo(None, None).is_spendable(100));
        assert!(utxo(Some(5), None).is_spendable(5));
    }

    #[test]
    fn test_spendable_maturity() {
        let u = utxo(Some(10), Some(26));
        assert!(!u.is_spendable(25));
        assert!(u.is_spendable(26));
        assert!(utxo(None, Some(1)).is_spendable(1));
    }

    #[test]
    fn test_utxo_json_field_names() {
        let json = serde_json::to_value(utxo(Some(3), None)).unwrap();
        assert_eq!(json["scriptPubKey"], "");
        assert_eq!(json["height"], 3);
    }
}
