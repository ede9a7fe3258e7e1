//! Script tokenizing, standard-form classification and script builders
//!
//! There is no script interpreter here. Standard output scripts are
//! recognized by exact byte templates; the tokenizer is only used where a
//! template has variable shape (multisig) or to split signature scripts.

use crate::address::{is_strict_pub_key_encoding, parse_strict_pub_key, Address};
use crate::constants::{
    DEFAULT_SCRIPT_VERSION, MAX_OPS_PER_SCRIPT, MAX_PUBKEYS_PER_MULTISIG, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_SIZE,
};
use crate::error::{Result, WalletError};
use crate::network::NetworkParams;
use crate::opcode::*;
use crate::types::ByteString;

/// Single-pass decoder of a script into (opcode, data) tokens.
///
/// Once a parse error is recorded the tokenizer is done and produces no more
/// tokens. `opcode()`/`data()` keep reporting the last good token.
#[derive(Debug, Clone)]
pub struct ScriptTokenizer<'a> {
    script: &'a [u8],
    version: u16,
    offset: usize,
    op: Option<u8>,
    data: &'a [u8],
    err: Option<WalletError>,
}

impl<'a> ScriptTokenizer<'a> {
    pub fn new(version: u16, script: &'a [u8]) -> Self {
        Self {
            script,
            version,
            offset: 0,
            op: None,
            data: &[],
            err: None,
        }
    }

    fn fail(&mut self, msg: String) -> bool {
        self.err = Some(WalletError::ScriptParse(msg));
        false
    }

    /// Parse the next token. Returns false at the end of the script or on a
    /// parse error; on error the offset stays at the failing opcode.
    pub fn next(&mut self) -> bool {
        if self.done() {
            return false;
        }
        let script = self.script;
        let op = script[self.offset];
        let length = opcode_length(op);

        if length == 1 {
            // OP_0, OP_1NEGATE and OP_1..OP_16 carry their value in the opcode
            self.offset += 1;
            self.op = Some(op);
            self.data = &[];
            return true;
        }

        if length > 1 {
            let need = length as usize;
            let rest = &script[self.offset..];
            if rest.len() < need {
                return self.fail(format!(
                    "opcode {} requires {} bytes, but script only has {} remaining",
                    opcode_name(op),
                    need,
                    rest.len()
                ));
            }
            self.offset += need;
            self.op = Some(op);
            self.data = &rest[1..need];
            return true;
        }

        let size_len = (-length) as usize;
        let rest = &script[self.offset + 1..];
        if rest.len() < size_len {
            return self.fail(format!(
                "opcode {} requires {} bytes, but script only has {} remaining",
                opcode_name(op),
                size_len,
                rest.len()
            ));
        }
        let data_len = match size_len {
            1 => rest[0] as usize,
            2 => u16::from_le_bytes([rest[0], rest[1]]) as usize,
            _ => u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize,
        };
        let payload = &rest[size_len..];
        if data_len > payload.len() {
            return self.fail(format!(
                "opcode {} pushes {} bytes, but script only has {} remaining",
                opcode_name(op),
                data_len,
                payload.len()
            ));
        }
        self.offset += 1 + size_len + data_len;
        self.op = Some(op);
        self.data = &payload[..data_len];
        true
    }

    pub fn done(&self) -> bool {
        self.err.is_some() || self.offset >= self.script.len()
    }

    pub fn opcode(&self) -> Option<u8> {
        self.op
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Offset of the next byte to parse
    pub fn byte_index(&self) -> usize {
        self.offset
    }

    pub fn err(&self) -> Option<&WalletError> {
        self.err.as_ref()
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn script(&self) -> &'a [u8] {
        self.script
    }
}

/// Ok when every token of the script parses and the script stays within
/// the size, push and non-push operation limits.
pub fn check_script_parses(version: u16, script: &[u8]) -> Result<()> {
    if script.len() > MAX_SCRIPT_SIZE {
        return Err(WalletError::ScriptParse(format!(
            "script size {} exceeds max {}",
            script.len(),
            MAX_SCRIPT_SIZE
        )));
    }
    let mut tokenizer = ScriptTokenizer::new(version, script);
    let mut ops = 0;
    while tokenizer.next() {
        if tokenizer.data().len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(WalletError::ScriptParse(format!(
                "push of {} bytes at offset {} exceeds max element size {}",
                tokenizer.data().len(),
                tokenizer.byte_index(),
                MAX_SCRIPT_ELEMENT_SIZE
            )));
        }
        if tokenizer.opcode().is_some_and(|op| op > OP_16) {
            ops += 1;
            if ops > MAX_OPS_PER_SCRIPT {
                return Err(WalletError::ScriptParse(format!(
                    "more than {} non-push operations",
                    MAX_OPS_PER_SCRIPT
                )));
            }
        }
    }
    match tokenizer.err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Data pushed by the final opcode, or None for an empty or malformed script.
pub fn final_opcode_data(version: u16, script: &[u8]) -> Option<&[u8]> {
    if script.is_empty() {
        return None;
    }
    let mut tokenizer = ScriptTokenizer::new(version, script);
    let mut data = None;
    while tokenizer.next() {
        data = Some(tokenizer.data());
    }
    if tokenizer.err().is_some() {
        return None;
    }
    data
}

/// Hash committed to by a stake-tagged output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakeTarget {
    PubKeyHash([u8; 20]),
    ScriptHash([u8; 20]),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigDetails {
    pub required_sigs: usize,
    pub pub_keys: Vec<ByteString>,
    pub num_pub_keys: usize,
    pub valid: bool,
}

impl MultisigDetails {
    fn invalid() -> Self {
        Self {
            required_sigs: 0,
            pub_keys: vec![],
            num_pub_keys: 0,
            valid: false,
        }
    }
}

/// Standard script forms, each with the payload extracted from the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptClass {
    NonStandard,
    PubKey(ByteString),
    PubKeyHash([u8; 20]),
    ScriptHash([u8; 20]),
    MultiSig(MultisigDetails),
    StakeSubmission(StakeTarget),
    StakeGen(StakeTarget),
    StakeRevocation(StakeTarget),
    StakeSubChange(StakeTarget),
}

impl ScriptClass {
    pub fn is_stake(&self) -> bool {
        matches!(
            self,
            ScriptClass::StakeSubmission(_)
                | ScriptClass::StakeGen(_)
                | ScriptClass::StakeRevocation(_)
                | ScriptClass::StakeSubChange(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScriptClass::NonStandard => "nonstandard",
            ScriptClass::PubKey(_) => "pubkey",
            ScriptClass::PubKeyHash(_) => "pubkeyhash",
            ScriptClass::ScriptHash(_) => "scripthash",
            ScriptClass::MultiSig(_) => "multisig",
            ScriptClass::StakeSubmission(_) => "stakesubmission",
            ScriptClass::StakeGen(_) => "stakegen",
            ScriptClass::StakeRevocation(_) => "stakerevoke",
            ScriptClass::StakeSubChange(_) => "sstxchange",
        }
    }
}

fn hash20(bytes: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(bytes);
    out
}

/// OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
pub fn extract_pub_key_hash(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() == 25
        && script[0] == OP_DUP
        && script[1] == OP_HASH160
        && script[2] == OP_DATA_20
        && script[23] == OP_EQUALVERIFY
        && script[24] == OP_CHECKSIG
    {
        return Some(hash20(&script[3..23]));
    }
    None
}

/// OP_HASH160 <20 bytes> OP_EQUAL
pub fn extract_script_hash(script: &[u8]) -> Option<[u8; 20]> {
    if script.len() == 23
        && script[0] == OP_HASH160
        && script[1] == OP_DATA_20
        && script[22] == OP_EQUAL
    {
        return Some(hash20(&script[2..22]));
    }
    None
}

/// OP_DATA_33 <0x02|0x03 ...> OP_CHECKSIG or OP_DATA_65 <0x04 ...> OP_CHECKSIG
pub fn extract_pub_key(script: &[u8]) -> Option<&[u8]> {
    if script.len() == 35
        && script[0] == OP_DATA_33
        && (script[1] == 0x02 || script[1] == 0x03)
        && script[34] == OP_CHECKSIG
    {
        return Some(&script[1..34]);
    }
    if script.len() == 67 && script[0] == OP_DATA_65 && script[1] == 0x04 && script[66] == OP_CHECKSIG {
        return Some(&script[1..66]);
    }
    None
}

/// <stake opcode> OP_HASH160 <20 bytes> OP_EQUAL
pub fn extract_stake_script_hash(script: &[u8], stake_op: u8) -> Option<[u8; 20]> {
    if script.len() == 24
        && script[0] == stake_op
        && script[1] == OP_HASH160
        && script[2] == OP_DATA_20
        && script[23] == OP_EQUAL
    {
        return Some(hash20(&script[3..23]));
    }
    None
}

/// <stake opcode> followed by a standard pay-to-pubkey-hash script
pub fn extract_stake_pub_key_hash(script: &[u8], stake_op: u8) -> Option<[u8; 20]> {
    if script.first() != Some(&stake_op) {
        return None;
    }
    extract_pub_key_hash(&script[1..])
}

/// NUM_SIGS PUBKEY... NUM_PUBKEYS OP_CHECKMULTISIG
pub fn extract_multisig_script_details(version: u16, script: &[u8], extract_pub_keys: bool) -> MultisigDetails {
    if version != DEFAULT_SCRIPT_VERSION {
        return MultisigDetails::invalid();
    }
    if script.len() < 3 || script[script.len() - 1] != OP_CHECKMULTISIG {
        return MultisigDetails::invalid();
    }

    let mut tokenizer = ScriptTokenizer::new(version, script);
    let required_sigs = match (tokenizer.next(), tokenizer.opcode()) {
        (true, Some(op)) if is_small_int(op) => as_small_int(op),
        _ => return MultisigDetails::invalid(),
    };

    let mut num_pub_keys = 0;
    let mut pub_keys = vec![];
    while tokenizer.next() {
        let data = tokenizer.data();
        if !is_strict_pub_key_encoding(data) {
            break;
        }
        num_pub_keys += 1;
        if extract_pub_keys {
            pub_keys.push(data.to_vec());
        }
    }
    if tokenizer.done() {
        return MultisigDetails::invalid();
    }

    match tokenizer.opcode() {
        Some(op) if is_small_int(op) && as_small_int(op) == num_pub_keys => {}
        _ => return MultisigDetails::invalid(),
    }
    if num_pub_keys > MAX_PUBKEYS_PER_MULTISIG || required_sigs > num_pub_keys {
        return MultisigDetails::invalid();
    }

    // Only the trailing OP_CHECKMULTISIG may remain.
    if script.len() - tokenizer.byte_index() != 1 {
        return MultisigDetails::invalid();
    }
    MultisigDetails {
        required_sigs,
        pub_keys,
        num_pub_keys,
        valid: true,
    }
}

fn stake_target(script: &[u8], stake_op: u8) -> Option<StakeTarget> {
    extract_stake_pub_key_hash(script, stake_op)
        .map(StakeTarget::PubKeyHash)
        .or_else(|| extract_stake_script_hash(script, stake_op).map(StakeTarget::ScriptHash))
}

/// Classify a script into one of the standard forms, checked in order:
/// P2PKH, P2SH, P2PK, multisig, then the four stake-tagged forms.
/// Non-zero versions and unmatched scripts are `NonStandard`.
pub fn get_script_class(version: u16, script: &[u8]) -> ScriptClass {
    if version != DEFAULT_SCRIPT_VERSION {
        return ScriptClass::NonStandard;
    }
    if let Some(hash) = extract_pub_key_hash(script) {
        return ScriptClass::PubKeyHash(hash);
    }
    if let Some(hash) = extract_script_hash(script) {
        return ScriptClass::ScriptHash(hash);
    }
    if let Some(pub_key) = extract_pub_key(script) {
        return ScriptClass::PubKey(pub_key.to_vec());
    }
    let details = extract_multisig_script_details(version, script, true);
    if details.valid {
        return ScriptClass::MultiSig(details);
    }
    if let Some(target) = stake_target(script, OP_SSTX) {
        return ScriptClass::StakeSubmission(target);
    }
    if let Some(target) = stake_target(script, OP_SSGEN) {
        return ScriptClass::StakeGen(target);
    }
    if let Some(target) = stake_target(script, OP_SSRTX) {
        return ScriptClass::StakeRevocation(target);
    }
    if let Some(target) = stake_target(script, OP_SSTXCHANGE) {
        return ScriptClass::StakeSubChange(target);
    }
    ScriptClass::NonStandard
}

fn stake_target_addrs(target: &StakeTarget, net: &NetworkParams) -> Result<Vec<Address>> {
    Ok(vec![match target {
        StakeTarget::PubKeyHash(hash) => Address::new_pub_key_hash(hash, net)?,
        StakeTarget::ScriptHash(hash) => Address::new_script_hash_from_hash(hash, net)?,
    }])
}

fn secp_pub_key_addr(serialized: &[u8], net: &NetworkParams) -> Result<Address> {
    let pub_key = parse_strict_pub_key(serialized)?;
    Address::new_secp_pub_key(&pub_key.serialize(), net)
}

/// Class, addresses and required signature count of an output script.
///
/// Fails with `UnsupportedScript` for non-zero versions and non-standard
/// scripts, and with `InvalidPubKey` when an embedded key is off the curve.
pub fn extract_pk_script_addrs(
    version: u16,
    pk_script: &[u8],
    net: &NetworkParams,
) -> Result<(ScriptClass, Vec<Address>, usize)> {
    if version != DEFAULT_SCRIPT_VERSION {
        return Err(WalletError::UnsupportedScript(format!("invalid script version {}", version)));
    }
    let class = get_script_class(version, pk_script);
    let (addrs, required) = match &class {
        ScriptClass::NonStandard => {
            return Err(WalletError::UnsupportedScript("unsupported script".to_string()))
        }
        ScriptClass::PubKeyHash(hash) => (vec![Address::new_pub_key_hash(hash, net)?], 1),
        ScriptClass::ScriptHash(hash) => (vec![Address::new_script_hash_from_hash(hash, net)?], 1),
        ScriptClass::PubKey(pub_key) => (vec![secp_pub_key_addr(pub_key, net)?], 1),
        ScriptClass::MultiSig(details) => {
            let addrs = details
                .pub_keys
                .iter()
                .map(|pk| secp_pub_key_addr(pk, net))
                .collect::<Result<Vec<_>>>()?;
            (addrs, details.required_sigs)
        }
        ScriptClass::StakeSubmission(target)
        | ScriptClass::StakeGen(target)
        | ScriptClass::StakeRevocation(target)
        | ScriptClass::StakeSubChange(target) => (stake_target_addrs(target, net)?, 1),
    };
    Ok((class, addrs, required))
}

/// Canonical push of `data`: small-integer opcodes where possible, then
/// OP_DATA_n, then the smallest OP_PUSHDATA that fits.
pub fn add_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    if len == 0 || (len == 1 && data[0] == 0) {
        return vec![OP_0];
    }
    if len == 1 && data[0] <= 16 {
        return vec![OP_1 - 1 + data[0]];
    }
    if len == 1 && data[0] == 0x81 {
        return vec![OP_1NEGATE];
    }

    let mut out = Vec::with_capacity(len + 5);
    if len < OP_PUSHDATA1 as usize {
        out.push(OP_DATA_1 - 1 + len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
    out
}

pub fn pay_to_pub_key_hash_script(pk_hash: &[u8]) -> Result<Vec<u8>> {
    if pk_hash.len() != 20 {
        return Err(WalletError::InvalidAddress(format!(
            "cannot create script with pubkey hash length {}, expected 20",
            pk_hash.len()
        )));
    }
    let mut script = vec![OP_DUP, OP_HASH160];
    script.extend(add_data(pk_hash));
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    Ok(script)
}

pub fn pay_to_script_hash_script(script_hash: &[u8]) -> Result<Vec<u8>> {
    if script_hash.len() != 20 {
        return Err(WalletError::InvalidAddress(format!(
            "cannot create script with script hash length {}, expected 20",
            script_hash.len()
        )));
    }
    let mut script = vec![OP_HASH160];
    script.extend(add_data(script_hash));
    script.push(OP_EQUAL);
    Ok(script)
}

pub fn pay_to_pub_key_script(serialized_pub_key: &[u8]) -> Vec<u8> {
    let mut script = add_data(serialized_pub_key);
    script.push(OP_CHECKSIG);
    script
}

/// Output script paying to `addr`.
pub fn pay_to_addr_script(addr: &Address) -> Result<Vec<u8>> {
    match addr {
        Address::PubKeyHash { hash, .. } => pay_to_pub_key_hash_script(hash),
        Address::ScriptHash { hash, .. } => pay_to_script_hash_script(hash),
        Address::SecpPubKey { .. } => Ok(pay_to_pub_key_script(&addr.script_address())),
    }
}

/// Decode `addr` for `net` and build its output script.
pub fn make_pay_to_addr_script(addr: &str, net: &NetworkParams) -> Result<Vec<u8>> {
    pay_to_addr_script(&Address::decode(addr, net)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MAINNET;

    /// (opcode, data, byte index after the token)
    type Token = (u8, Vec<u8>, usize);

    fn run_tokenizer(script: &[u8]) -> (Vec<Token>, usize, bool) {
        let mut tokenizer = ScriptTokenizer::new(0, script);
        let mut tokens = vec![];
        while tokenizer.next() {
            assert!(tokenizer.err().is_none());
            tokens.push((
                tokenizer.opcode().unwrap(),
                tokenizer.data().to_vec(),
                tokenizer.byte_index(),
            ));
        }
        assert!(tokenizer.done());
        (tokens, tokenizer.byte_index(), tokenizer.err().is_some())
    }

    // ============================================================================
    // TOKENIZER TESTS
    // ============================================================================

    #[test]
    fn test_op_data_pushes() {
        for op in OP_DATA_1..OP_DATA_75 {
            let data = vec![1u8; op as usize];
            let mut script = vec![op];
            script.extend_from_slice(&data);
            let (tokens, idx, err) = run_tokenizer(&script);
            assert_eq!(tokens, vec![(op, data.clone(), 1 + op as usize)]);
            assert_eq!(idx, 1 + op as usize);
            assert!(!err);

            // One byte short
            let mut short = vec![op];
            short.extend_from_slice(&data[1..]);
            let (tokens, idx, err) = run_tokenizer(&short);
            assert!(tokens.is_empty());
            assert_eq!(idx, 0);
            assert!(err);
        }
    }

    #[test]
    fn test_pushdata_variants() {
        let data = vec![1u8; 76];
        let cases: [(u8, Vec<u8>); 3] = [
            (OP_PUSHDATA1, vec![0x4c]),
            (OP_PUSHDATA2, vec![0x4c, 0x00]),
            (OP_PUSHDATA4, vec![0x4c, 0x00, 0x00, 0x00]),
        ];
        for (op, len_bytes) in cases.iter() {
            let mut script = vec![*op];
            script.extend_from_slice(len_bytes);
            script.extend_from_slice(&data);
            let header = 1 + len_bytes.len();
            let (tokens, idx, err) = run_tokenizer(&script);
            assert_eq!(tokens, vec![(*op, data.clone(), header + 76)]);
            assert_eq!(idx, header + 76);
            assert!(!err);

            // No data length
            let (tokens, idx, err) = run_tokenizer(&[*op]);
            assert!(tokens.is_empty());
            assert_eq!(idx, 0);
            assert!(err);

            // Short by one byte
            let mut short = vec![*op];
            short.extend_from_slice(len_bytes);
            short.extend_from_slice(&data[1..]);
            let (tokens, idx, err) = run_tokenizer(&short);
            assert!(tokens.is_empty());
            assert_eq!(idx, 0);
            assert!(err);
        }
    }

    #[test]
    fn test_small_int_opcodes() {
        let mut ops = vec![OP_0];
        ops.extend(OP_1..OP_16);
        for op in ops {
            let (tokens, idx, err) = run_tokenizer(&[op]);
            assert_eq!(tokens, vec![(op, vec![], 1)]);
            assert_eq!(idx, 1);
            assert!(!err);
        }
    }

    #[test]
    fn test_tokenize_p2pkh_like() {
        let mut script = vec![OP_DUP, OP_HASH160, OP_DATA_20];
        script.extend_from_slice(&[1u8; 20]);
        script.extend_from_slice(&[OP_EQUAL, OP_CHECKSIG]);
        let (tokens, idx, err) = run_tokenizer(&script);
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[2], (OP_DATA_20, vec![1u8; 20], 23));
        assert_eq!(idx, 25);
        assert!(!err);
    }

    #[test]
    fn test_tokenize_short_p2pkh() {
        let mut script = vec![OP_DUP, OP_HASH160, OP_DATA_20];
        script.extend_from_slice(&[1u8; 17]);
        script.extend_from_slice(&[OP_EQUAL, OP_CHECKSIG]);
        let (tokens, idx, err) = run_tokenizer(&script);
        assert_eq!(tokens, vec![(OP_DUP, vec![], 1), (OP_HASH160, vec![], 2)]);
        assert_eq!(idx, 2);
        assert!(err);
    }

    #[test]
    fn test_tokenize_overlapped_p2pkh() {
        let mut script = vec![OP_DUP, OP_HASH160, OP_DATA_20];
        script.extend_from_slice(&[1u8; 19]);
        script.extend_from_slice(&[OP_EQUAL, OP_CHECKSIG]);
        let (tokens, idx, err) = run_tokenizer(&script);
        let mut overlapped = vec![1u8; 19];
        overlapped.push(OP_EQUAL);
        assert_eq!(tokens[2], (OP_DATA_20, overlapped, 23));
        assert_eq!(tokens[3], (OP_CHECKSIG, vec![], 24));
        assert_eq!(idx, 24);
        assert!(!err);
    }

    #[test]
    fn test_tokenize_p2sh_variants() {
        let mut script = vec![OP_HASH160, OP_DATA_20];
        script.extend_from_slice(&[1u8; 18]);
        script.push(OP_EQUAL);
        let (tokens, idx, err) = run_tokenizer(&script);
        assert_eq!(tokens, vec![(OP_HASH160, vec![], 1)]);
        assert_eq!(idx, 1);
        assert!(err);

        let mut script = vec![OP_HASH160, OP_DATA_20];
        script.extend_from_slice(&[1u8; 19]);
        script.push(OP_EQUAL);
        let (tokens, idx, err) = run_tokenizer(&script);
        assert_eq!(tokens.len(), 2);
        assert_eq!(idx, 22);
        assert!(!err);
    }

    #[test]
    fn test_no_tokens_after_error() {
        let mut tokenizer = ScriptTokenizer::new(0, &[OP_DATA_45]);
        assert!(!tokenizer.next());
        assert!(tokenizer.done());
        assert!(!tokenizer.next());
        assert!(matches!(tokenizer.err(), Some(WalletError::ScriptParse(_))));
    }

    #[test]
    fn test_final_opcode_data() {
        let mut script = add_data(&[9u8; 30]);
        script.extend(add_data(&[7u8; 40]));
        assert_eq!(final_opcode_data(0, &script), Some(&[7u8; 40][..]));
        assert_eq!(final_opcode_data(0, &[]), None);
        assert_eq!(final_opcode_data(0, &[OP_DATA_45]), None);
        assert!(check_script_parses(0, &script).is_ok());
        assert!(check_script_parses(0, &[OP_PUSHDATA2, 0x01]).is_err());
    }

    #[test]
    fn test_script_limits() {
        assert!(check_script_parses(0, &add_data(&[1u8; MAX_SCRIPT_ELEMENT_SIZE])).is_ok());
        assert!(matches!(
            check_script_parses(0, &add_data(&[1u8; MAX_SCRIPT_ELEMENT_SIZE + 1])),
            Err(WalletError::ScriptParse(_))
        ));

        assert!(check_script_parses(0, &vec![OP_DUP; MAX_OPS_PER_SCRIPT]).is_ok());
        assert!(check_script_parses(0, &vec![OP_DUP; MAX_OPS_PER_SCRIPT + 1]).is_err());
        // Small-int pushes do not count as operations.
        assert!(check_script_parses(0, &vec![OP_1; MAX_OPS_PER_SCRIPT + 1]).is_ok());

        let mut oversized = Vec::new();
        while oversized.len() <= MAX_SCRIPT_SIZE {
            oversized.extend(add_data(&[2u8; 75]));
        }
        assert!(check_script_parses(0, &oversized).is_err());
    }

    // ============================================================================
    // CLASSIFIER TESTS
    // ============================================================================

    fn h(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn test_extract_p2pk_compressed() {
        let script = h("2102192d74d0cb94344c9569c2e77901573d8d7903c3ebec3a957724895dca52c6b4ac");
        let (class, addrs, n) = extract_pk_script_addrs(0, &script, &MAINNET).unwrap();
        assert!(matches!(class, ScriptClass::PubKey(_)));
        assert_eq!(n, 1);
        assert_eq!(
            addrs[0].script_address(),
            h("02192d74d0cb94344c9569c2e77901573d8d7903c3ebec3a957724895dca52c6b4")
        );
    }

    #[test]
    fn test_extract_p2pkh_and_p2sh() {
        let script = h("76a914ad06dd6ddee55cbca9a9e3713bd7587509a3056488ac");
        let (class, addrs, n) = extract_pk_script_addrs(0, &script, &MAINNET).unwrap();
        assert_eq!(class, ScriptClass::PubKeyHash(hash20(&h("ad06dd6ddee55cbca9a9e3713bd7587509a30564"))));
        assert_eq!(n, 1);
        assert_eq!(
            addrs,
            vec![Address::new_pub_key_hash(&h("ad06dd6ddee55cbca9a9e3713bd7587509a30564"), &MAINNET).unwrap()]
        );

        let script = h("a91463bcc565f9e68ee0189dd5cc67f1b0e5f02f45cb87");
        let (class, addrs, _) = extract_pk_script_addrs(0, &script, &MAINNET).unwrap();
        assert!(matches!(class, ScriptClass::ScriptHash(_)));
        assert_eq!(addrs[0].script_address(), h("63bcc565f9e68ee0189dd5cc67f1b0e5f02f45cb"));
    }

    #[test]
    fn test_extract_multisig_1_of_2() {
        let script = h("514104cc71eb30d653c0c3163990c47b976f3fb3f37cccdcbedb169a1dfef58bbfbfaff7d8a473e7e2e6d317b87bafe8bde97e3cf8f065dec022b51d11fcdd0d348ac4410461cbdcc5409fb4b4d42b51d33381354d80e550078cb532a34bfa2fcfdeb7d76519aecc62770f5b0e4ef8551946d8a540911abe3e7854a26f39f58b25c15342af52ae");
        let (class, addrs, n) = extract_pk_script_addrs(0, &script, &MAINNET).unwrap();
        match class {
            ScriptClass::MultiSig(details) => {
                assert_eq!(details.num_pub_keys, 2);
                assert_eq!(details.required_sigs, 1);
                assert!(details.valid);
            }
            other => panic!("unexpected class {:?}", other),
        }
        assert_eq!(n, 1);
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].script_address().len(), 33);
    }

    #[test]
    fn test_extract_multisig_invalid_pubkeys() {
        let script = h("5141042200007353455857696b696c65616b73204361626c6567617465204261636b75700a0a6361626c65676174652d3230313031323034313831312e377a0a0a446f41046e6c6f61642074686520666f6c6c6f77696e67207472616e73616374696f6e732077697468205361746f736869204e616b616d6f746f277320646f776e6c6f61410420746f6f6c2077686963680a63616e20626520666f756e6420696e207472616e73616374696f6e2036633533636439383731313965663739376435616463636453ae");
        assert!(matches!(
            extract_pk_script_addrs(0, &script, &MAINNET),
            Err(WalletError::InvalidPubKey(_))
        ));
    }

    #[test]
    fn test_multisig_more_sigs_than_keys_is_nonstandard() {
        let key = h("02192d74d0cb94344c9569c2e77901573d8d7903c3ebec3a957724895dca52c6b4");
        let mut script = vec![OP_1 + 1];
        script.extend(add_data(&key));
        script.extend([OP_1, OP_CHECKMULTISIG]);
        assert!(!extract_multisig_script_details(0, &script, false).valid);
        assert_eq!(get_script_class(0, &script), ScriptClass::NonStandard);

        script[0] = OP_1;
        assert!(extract_multisig_script_details(0, &script, false).valid);
    }

    #[test]
    fn test_extract_unsupported() {
        let missing_checksig = h("410411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3");
        for script in [missing_checksig, vec![], vec![OP_DATA_45]] {
            assert!(matches!(
                extract_pk_script_addrs(0, &script, &MAINNET),
                Err(WalletError::UnsupportedScript(_))
            ));
        }
        let p2pkh = h("76a914ad06dd6ddee55cbca9a9e3713bd7587509a3056488ac");
        assert!(matches!(
            extract_pk_script_addrs(1, &p2pkh, &MAINNET),
            Err(WalletError::UnsupportedScript(_))
        ));
        assert_eq!(get_script_class(1, &p2pkh), ScriptClass::NonStandard);
    }

    #[test]
    fn test_stake_tagged_scripts() {
        let p2pkh = h("76a914ad06dd6ddee55cbca9a9e3713bd7587509a3056488ac");
        let p2sh = h("a91463bcc565f9e68ee0189dd5cc67f1b0e5f02f45cb87");
        for (op, make) in [
            (OP_SSTX, ScriptClass::StakeSubmission as fn(StakeTarget) -> ScriptClass),
            (OP_SSGEN, ScriptClass::StakeGen),
            (OP_SSRTX, ScriptClass::StakeRevocation),
            (OP_SSTXCHANGE, ScriptClass::StakeSubChange),
        ] {
            let mut tagged = vec![op];
            tagged.extend_from_slice(&p2pkh);
            let (class, addrs, _) = extract_pk_script_addrs(0, &tagged, &MAINNET).unwrap();
            assert_eq!(class, make(StakeTarget::PubKeyHash(hash20(&p2pkh[3..23]))));
            assert!(class.is_stake());
            assert_eq!(addrs[0].script_address(), p2pkh[3..23].to_vec());

            let mut tagged = vec![op];
            tagged.extend_from_slice(&p2sh);
            let (class, addrs, _) = extract_pk_script_addrs(0, &tagged, &MAINNET).unwrap();
            assert_eq!(class, make(StakeTarget::ScriptHash(hash20(&p2sh[2..22]))));
            assert!(matches!(addrs[0], Address::ScriptHash { .. }));
        }
    }

    // ============================================================================
    // BUILDER TESTS
    // ============================================================================

    #[test]
    fn test_add_data_canonical() {
        assert_eq!(add_data(&[]), vec![OP_0]);
        assert_eq!(add_data(&[0]), vec![OP_0]);
        assert_eq!(add_data(&[5]), vec![0x55]);
        assert_eq!(add_data(&[16]), vec![OP_16]);
        assert_eq!(add_data(&[0x81]), vec![OP_1NEGATE]);
        assert_eq!(add_data(&[17]), vec![OP_DATA_1, 17]);
        assert_eq!(add_data(&[1u8; 75])[0], OP_DATA_75);
        assert_eq!(&add_data(&[1u8; 76])[..2], &[OP_PUSHDATA1, 76]);
        assert_eq!(&add_data(&[1u8; 256])[..3], &[OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(&add_data(&vec![1u8; 0x10000])[..5], &[OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_pay_to_addr_scripts() {
        let addr = Address::decode("DsUZxxoHJSty8DCfwfartwTYbuhmVct7tJu", &MAINNET).unwrap();
        let script = pay_to_addr_script(&addr).unwrap();
        assert_eq!(script.len(), 25);
        assert_eq!(extract_pub_key_hash(&script).unwrap().to_vec(), addr.script_address());

        let script = make_pay_to_addr_script("DcqgK4N4Ccucu2Sq4VDAdu4wH4LASLhzLVp", &MAINNET).unwrap();
        assert_eq!(script, h("a914c7da5095683436f4435fc4e7163dcafda1a2d00787"));

        assert!(pay_to_pub_key_hash_script(&[0u8; 19]).is_err());
        let pk = h("02192d74d0cb94344c9569c2e77901573d8d7903c3ebec3a957724895dca52c6b4");
        assert_eq!(extract_pub_key(&pay_to_pub_key_script(&pk)), Some(&pk[..]));
    }
}
