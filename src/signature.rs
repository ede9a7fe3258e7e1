//! ECDSA over secp256k1 with deterministic RFC6979 nonces
//!
//! Scalar arithmetic is done on 256-bit integers modulo the group order;
//! point arithmetic goes through libsecp256k1.

use crate::crypto::hmac_sha256;
use crate::error::{Result, WalletError};
use primitive_types::{U256, U512};
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use zeroize::Zeroizing;

/// Order of the secp256k1 group
const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// DER tag for an ASN.1 SEQUENCE
const ASN1_SEQUENCE: u8 = 0x30;
/// DER tag for an ASN.1 INTEGER
const ASN1_INTEGER: u8 = 0x02;

pub fn curve_order() -> U256 {
    U256::from_big_endian(&CURVE_ORDER)
}

fn half_order() -> U256 {
    curve_order() >> 1
}

fn truncate(x: U512) -> U256 {
    let mut buf = [0u8; 64];
    x.to_big_endian(&mut buf);
    U256::from_big_endian(&buf[32..])
}

fn reduce(x: U512) -> U256 {
    truncate(x % U512::from(curve_order()))
}

fn mul_mod(a: U256, b: U256) -> U256 {
    reduce(a.full_mul(b))
}

fn add_mod(a: U256, b: U256) -> U256 {
    reduce(U512::from(a) + U512::from(b))
}

/// Modular inverse by Fermat's little theorem; the order is prime.
fn inv_mod(a: U256) -> U256 {
    let mut exp = curve_order() - U256::from(2u8);
    let mut base = reduce(U512::from(a));
    let mut result = U256::one();
    while !exp.is_zero() {
        if exp.bit(0) {
            result = mul_mod(result, base);
        }
        base = mul_mod(base, base);
        exp = exp >> 1;
    }
    result
}

fn to_bytes(x: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    x.to_big_endian(&mut out);
    out
}

/// Leftmost bits of `hash` as an integer, truncated to the order's bit length.
pub fn hash_to_int(hash: &[u8]) -> U256 {
    let order_bits = curve_order().bits();
    let order_bytes = (order_bits + 7) / 8;
    let hash = if hash.len() > order_bytes { &hash[..order_bytes] } else { hash };
    let ret = U256::from_big_endian(hash);
    let excess = hash.len() * 8;
    if excess > order_bits {
        return ret >> (excess - order_bits);
    }
    ret
}

fn bits_to_octets(hash: &[u8]) -> [u8; 32] {
    let z1 = hash_to_int(hash);
    let order = curve_order();
    if z1 >= order {
        return to_bytes(z1 - order);
    }
    to_bytes(z1)
}

/// Seed material for the nonce generator:
/// `int2octets(key) || bits2octets(hash) || extra || version`.
///
/// With both present the extra data comes first and the version second. A
/// version without extra data is preceded by 32 zero bytes.
fn nonce_seed_material(
    priv_key: &[u8; 32],
    hash: &[u8],
    extra: Option<&[u8; 32]>,
    version: Option<&[u8; 16]>,
) -> Zeroizing<Vec<u8>> {
    let mut bx = Zeroizing::new(Vec::with_capacity(32 * 3 + 16));
    bx.extend_from_slice(Zeroizing::new(to_bytes(reduce(U512::from_big_endian(priv_key)))).as_slice());
    bx.extend_from_slice(&bits_to_octets(hash));
    match (extra, version) {
        (Some(extra), Some(version)) => {
            bx.extend_from_slice(extra);
            bx.extend_from_slice(version);
        }
        (Some(extra), None) => bx.extend_from_slice(extra),
        (None, Some(version)) => {
            bx.extend_from_slice(&[0u8; 32]);
            bx.extend_from_slice(version);
        }
        (None, None) => {}
    }
    bx
}

/// RFC6979 section 3.2 nonce using HMAC-SHA256.
///
/// `extra` (32 bytes) and `version` (16 bytes) are appended to the seed
/// material in that order. The seed material and the HMAC-DRBG state are
/// zeroed on return.
pub fn nonce_rfc6979(
    priv_key: &[u8; 32],
    hash: &[u8],
    extra: Option<&[u8; 32]>,
    version: Option<&[u8; 16]>,
) -> Result<U256> {
    let order = curve_order();

    // Step A is the caller hashing the message.
    let bx = nonce_seed_material(priv_key, hash, extra, version);

    // Step B
    let mut v = Zeroizing::new([0x01u8; 32]);
    // Step C
    let mut k = Zeroizing::new([0x00u8; 32]);
    // Step D
    *k = hmac_sha256(&*k, &[&*v, &[0x00], &bx])?;
    // Step E
    *v = hmac_sha256(&*k, &[&*v])?;
    // Step F
    *k = hmac_sha256(&*k, &[&*v, &[0x01], &bx])?;
    // Step G
    *v = hmac_sha256(&*k, &[&*v])?;

    // Step H
    loop {
        // The HMAC output is exactly as long as the order, so one round fills T.
        *v = hmac_sha256(&*k, &[&*v])?;
        let secret = hash_to_int(&*v);
        if !secret.is_zero() && secret < order {
            return Ok(secret);
        }
        *k = hmac_sha256(&*k, &[&*v, &[0x00]])?;
        *v = hmac_sha256(&*k, &[&*v])?;
    }
}

/// Strip leading zero bytes, then prepend one if the high bit is set so the
/// DER integer stays positive.
pub fn canonicalize_int(val: &[u8]) -> Vec<u8> {
    let first = val.iter().position(|b| *b != 0).unwrap_or(val.len().saturating_sub(1));
    let mut out = Vec::with_capacity(33);
    let trimmed = if val.is_empty() { &[0u8][..] } else { &val[first..] };
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    r: U256,
    s: U256,
}

impl Signature {
    pub fn new(r: U256, s: U256) -> Self {
        Self { r, s }
    }

    pub fn r(&self) -> [u8; 32] {
        to_bytes(self.r)
    }

    pub fn s(&self) -> [u8; 32] {
        to_bytes(self.s)
    }

    /// Serialize: DER encoding with S forced into the lower half of the order
    ///
    /// 0x30 <len> 0x02 <len r> <r> 0x02 <len s> <s>
    pub fn serialize(&self) -> Vec<u8> {
        let s = if self.s > half_order() { curve_order() - self.s } else { self.s };
        let rb = canonicalize_int(&to_bytes(self.r));
        let sb = canonicalize_int(&to_bytes(s));

        let len = 6 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(len);
        out.push(ASN1_SEQUENCE);
        out.push((len - 2) as u8);
        out.push(ASN1_INTEGER);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(ASN1_INTEGER);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Verify: r and s in [1, N) and x(u1*G + u2*Q) mod N == r
    /// where w = s^-1, u1 = e*w, u2 = r*w.
    pub fn verify(&self, hash: &[u8], pub_key: &PublicKey) -> bool {
        let order = curve_order();
        if self.r.is_zero() || self.s.is_zero() || self.r >= order || self.s >= order {
            return false;
        }
        let e = reduce(U512::from(hash_to_int(hash)));
        let w = inv_mod(self.s);
        let u1 = mul_mod(e, w);
        let u2 = mul_mod(self.r, w);

        let secp = Secp256k1::new();
        let u2q = match Scalar::from_be_bytes(to_bytes(u2))
            .ok()
            .and_then(|tweak| pub_key.mul_tweak(&secp, &tweak).ok())
        {
            Some(point) => point,
            None => return false,
        };
        let point = if u1.is_zero() {
            u2q
        } else {
            let u1g = match SecretKey::from_slice(&to_bytes(u1)) {
                Ok(sk) => PublicKey::from_secret_key(&secp, &sk),
                Err(_) => return false,
            };
            match u1g.combine(&u2q) {
                Ok(point) => point,
                // Point at infinity
                Err(_) => return false,
            }
        };
        let x = U256::from_big_endian(&point.serialize()[1..33]);
        reduce(U512::from(x)) == self.r
    }
}

/// Verify an `(r, s)` pair over `hash` against `pub_key`.
pub fn verify_sig(pub_key: &PublicKey, hash: &[u8], r: U256, s: U256) -> bool {
    Signature::new(r, s).verify(hash, pub_key)
}

/// Deterministic ECDSA signature of `hash` with RFC6979 nonce generation.
///
/// The raw S is the negation of the textbook value, so it may sit in the
/// upper half of the order. Both forms verify.
pub fn sign_rfc6979(priv_key: &SecretKey, hash: &[u8]) -> Result<Signature> {
    let order = curve_order();
    let d_bytes = priv_key.secret_bytes();
    let d = U256::from_big_endian(&d_bytes);

    let k = nonce_rfc6979(&d_bytes, hash, None, None)?;
    let k_key = SecretKey::from_slice(&to_bytes(k)).map_err(|e| WalletError::KeyRange(e.to_string()))?;
    let secp = Secp256k1::signing_only();
    let kg = PublicKey::from_secret_key(&secp, &k_key);

    let r = reduce(U512::from(U256::from_big_endian(&kg.serialize()[1..33])));
    if r.is_zero() {
        return Err(WalletError::ZeroSignatureComponent("r"));
    }

    let e = hash_to_int(hash);
    let s = mul_mod(add_mod(mul_mod(d, r), e), inv_mod(k));
    // Negated unconditionally; serialize() restores the low-S form.
    let s = reduce(U512::from(order - s));
    if s.is_zero() {
        return Err(WalletError::ZeroSignatureComponent("s"));
    }
    Ok(Signature { r, s })
}
