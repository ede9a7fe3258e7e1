//! Decred transaction wire format
//!
//! A transaction serializes as a prefix (outpoints, sequences, outputs,
//! lock time, expiry) and a witness (input values and signature scripts).
//! The transaction hash commits to the prefix only.

use crate::crypto::blake256;
use crate::error::{Result, WalletError};
use crate::types::{ByteString, Hash};
use serde::{Deserialize, Serialize};

/// Serialization type stored in the upper 16 bits of the version field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxSerializeType {
    Full = 0,
    NoWitness = 1,
    OnlyWitness = 2,
}

impl TxSerializeType {
    fn from_u16(v: u16) -> Result<Self> {
        match v {
            0 => Ok(TxSerializeType::Full),
            1 => Ok(TxSerializeType::NoWitness),
            2 => Ok(TxSerializeType::OnlyWitness),
            other => Err(WalletError::Serialization(format!("unknown serialization type {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
    pub tree: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_out_point: OutPoint,
    pub sequence: u32,
    pub value_in: i64,
    pub block_height: u32,
    pub block_index: u32,
    #[serde(with = "hex")]
    pub signature_script: ByteString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: i64,
    pub version: u16,
    #[serde(with = "hex")]
    pub pk_script: ByteString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTx {
    pub ser_type: TxSerializeType,
    pub version: u16,
    pub tx_in: Vec<TxIn>,
    pub tx_out: Vec<TxOut>,
    pub lock_time: u32,
    pub expiry: u32,
}

impl TxIn {
    pub fn new(previous_out_point: OutPoint, value_in: i64, signature_script: ByteString) -> Self {
        Self {
            previous_out_point,
            sequence: crate::constants::SEQUENCE_FINAL,
            value_in,
            block_height: 0,
            block_index: 0,
            signature_script,
        }
    }
}

impl TxOut {
    pub fn new(value: i64, pk_script: ByteString) -> Self {
        Self {
            value,
            version: crate::constants::DEFAULT_SCRIPT_VERSION,
            pk_script,
        }
    }
}

/// Bytes needed to encode `n` as a variable-length integer
pub fn var_int_serialize_size(n: u64) -> usize {
    if n < 0xfd {
        1
    } else if n <= 0xffff {
        3
    } else if n <= 0xffff_ffff {
        5
    } else {
        9
    }
}

pub fn put_var_int(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

/// Length-prefixed byte string
pub fn put_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    put_var_int(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.data.len() - self.pos < n {
            return Err(WalletError::Serialization(format!(
                "need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.data.len() - self.pos
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn var_int(&mut self) -> Result<u64> {
        match self.u8()? {
            0xfd => Ok(self.u16()? as u64),
            0xfe => Ok(self.u32()? as u64),
            0xff => Ok(u64::from_le_bytes(self.array()?)),
            n => Ok(n as u64),
        }
    }

    fn var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.var_int()?;
        let len = usize::try_from(len)
            .map_err(|_| WalletError::Serialization(format!("length {} too large", len)))?;
        Ok(self.take(len)?.to_vec())
    }

    /// Element count, bounded by what the remaining bytes could hold.
    fn count(&mut self, min_element: usize) -> Result<usize> {
        let n = self.var_int()?;
        let remaining = (self.data.len() - self.pos) as u64;
        if n > remaining / min_element as u64 {
            return Err(WalletError::Serialization(format!("count {} exceeds payload", n)));
        }
        Ok(n as usize)
    }
}

impl MsgTx {
    pub fn new() -> Self {
        Self {
            ser_type: TxSerializeType::Full,
            version: crate::constants::TX_VERSION,
            tx_in: vec![],
            tx_out: vec![],
            lock_time: 0,
            expiry: 0,
        }
    }

    fn encode_prefix(&self, buf: &mut Vec<u8>) {
        put_var_int(buf, self.tx_in.len() as u64);
        for txin in &self.tx_in {
            let op = &txin.previous_out_point;
            buf.extend_from_slice(&op.hash);
            buf.extend_from_slice(&op.index.to_le_bytes());
            buf.push(op.tree);
            buf.extend_from_slice(&txin.sequence.to_le_bytes());
        }
        put_var_int(buf, self.tx_out.len() as u64);
        for txout in &self.tx_out {
            buf.extend_from_slice(&txout.value.to_le_bytes());
            buf.extend_from_slice(&txout.version.to_le_bytes());
            put_var_bytes(buf, &txout.pk_script);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf.extend_from_slice(&self.expiry.to_le_bytes());
    }

    fn encode_witness(&self, buf: &mut Vec<u8>) {
        put_var_int(buf, self.tx_in.len() as u64);
        for txin in &self.tx_in {
            buf.extend_from_slice(&txin.value_in.to_le_bytes());
            buf.extend_from_slice(&txin.block_height.to_le_bytes());
            buf.extend_from_slice(&txin.block_index.to_le_bytes());
            put_var_bytes(buf, &txin.signature_script);
        }
    }

    /// Serialize with an explicit serialization type.
    pub fn serialize_as(&self, ser_type: TxSerializeType) -> Vec<u8> {
        let mut buf = Vec::new();
        let version = (self.version as u32) | ((ser_type as u32) << 16);
        buf.extend_from_slice(&version.to_le_bytes());
        match ser_type {
            TxSerializeType::Full => {
                self.encode_prefix(&mut buf);
                self.encode_witness(&mut buf);
            }
            TxSerializeType::NoWitness => self.encode_prefix(&mut buf),
            TxSerializeType::OnlyWitness => self.encode_witness(&mut buf),
        }
        buf
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.serialize_as(self.ser_type)
    }

    /// Parse a Full or NoWitness serialization. Trailing bytes are an error.
    pub fn deserialize(data: &[u8]) -> Result<MsgTx> {
        let mut r = Reader { data, pos: 0 };
        let version = r.u32()?;
        let ser_type = TxSerializeType::from_u16((version >> 16) as u16)?;
        if ser_type == TxSerializeType::OnlyWitness {
            return Err(WalletError::Serialization("witness-only transactions are not decodable".to_string()));
        }
        let mut tx = MsgTx {
            ser_type,
            version: (version & 0xffff) as u16,
            ..MsgTx::new()
        };

        let n_in = r.count(41)?;
        for _ in 0..n_in {
            let hash = r.array::<32>()?;
            let index = r.u32()?;
            let tree = r.u8()?;
            let sequence = r.u32()?;
            tx.tx_in.push(TxIn {
                previous_out_point: OutPoint { hash, index, tree },
                sequence,
                value_in: 0,
                block_height: 0,
                block_index: 0,
                signature_script: vec![],
            });
        }
        let n_out = r.count(11)?;
        for _ in 0..n_out {
            let value = r.i64()?;
            let version = r.u16()?;
            let pk_script = r.var_bytes()?;
            tx.tx_out.push(TxOut { value, version, pk_script });
        }
        tx.lock_time = r.u32()?;
        tx.expiry = r.u32()?;

        if ser_type == TxSerializeType::Full {
            let n_witness = r.count(17)?;
            if n_witness != tx.tx_in.len() {
                return Err(WalletError::Serialization(format!(
                    "witness count {} does not match input count {}",
                    n_witness,
                    tx.tx_in.len()
                )));
            }
            for txin in tx.tx_in.iter_mut() {
                txin.value_in = r.i64()?;
                txin.block_height = r.u32()?;
                txin.block_index = r.u32()?;
                txin.signature_script = r.var_bytes()?;
            }
        }

        if r.pos != data.len() {
            return Err(WalletError::Serialization(format!(
                "{} trailing bytes",
                data.len() - r.pos
            )));
        }
        Ok(tx)
    }

    /// BLAKE-256 of the prefix serialization
    pub fn hash(&self) -> Hash {
        blake256(&self.serialize_as(TxSerializeType::NoWitness))
    }

    /// Transaction hash as byte-reversed hex
    pub fn txid(&self) -> String {
        let mut h = self.hash();
        h.reverse();
        hex::encode(h)
    }

    /// Coinbase and stakebase transactions spend the all-zero outpoint.
    pub fn looks_like_coinbase(&self) -> bool {
        self.tx_in
            .first()
            .map(|txin| txin.previous_out_point.hash == [0u8; 32])
            .unwrap_or(false)
    }

    pub fn add_tx_in(&mut self, txin: TxIn) {
        self.tx_in.push(txin);
    }

    pub fn add_tx_out(&mut self, txout: TxOut) {
        self.tx_out.push(txout);
    }
}

impl Default for MsgTx {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a byte-reversed hex transaction hash.
pub fn hash_from_txid(txid: &str) -> Result<Hash> {
    let mut raw = hex::decode(txid).map_err(|e| WalletError::Serialization(e.to_string()))?;
    if raw.len() != 32 {
        return Err(WalletError::Serialization(format!("txid must be 32 bytes, got {}", raw.len())));
    }
    raw.reverse();
    let mut h = [0u8; 32];
    h.copy_from_slice(&raw);
    Ok(h)
}
