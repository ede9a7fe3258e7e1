//! Script opcodes
//!
//! Only the subset needed to tokenize and classify standard scripts is
//! named here. Every byte value is a valid opcode for tokenizing purposes.

pub const OP_0: u8 = 0x00;
pub const OP_FALSE: u8 = OP_0;
pub const OP_DATA_1: u8 = 0x01;
pub const OP_DATA_20: u8 = 0x14;
pub const OP_DATA_33: u8 = 0x21;
pub const OP_DATA_45: u8 = 0x2d;
pub const OP_DATA_65: u8 = 0x41;
pub const OP_DATA_75: u8 = 0x4b;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_TRUE: u8 = OP_1;
pub const OP_16: u8 = 0x60;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

// Stake tagging
pub const OP_SSTX: u8 = 0xba;
pub const OP_SSGEN: u8 = 0xbb;
pub const OP_SSRTX: u8 = 0xbc;
pub const OP_SSTXCHANGE: u8 = 0xbd;

/// Encoded length of an opcode.
///
/// Positive: total bytes including the opcode (OP_DATA_n is n + 1).
/// Negative: the opcode is followed by a little-endian length of that many
/// bytes (OP_PUSHDATA1/2/4).
pub fn opcode_length(op: u8) -> i32 {
    match op {
        OP_DATA_1..=OP_DATA_75 => op as i32 + 1,
        OP_PUSHDATA1 => -1,
        OP_PUSHDATA2 => -2,
        OP_PUSHDATA4 => -4,
        _ => 1,
    }
}

pub fn opcode_name(op: u8) -> String {
    match op {
        OP_0 => "OP_0".to_string(),
        OP_DATA_1..=OP_DATA_75 => format!("OP_DATA_{}", op),
        OP_PUSHDATA1 => "OP_PUSHDATA1".to_string(),
        OP_PUSHDATA2 => "OP_PUSHDATA2".to_string(),
        OP_PUSHDATA4 => "OP_PUSHDATA4".to_string(),
        OP_1NEGATE => "OP_1NEGATE".to_string(),
        OP_1..=OP_16 => format!("OP_{}", op - OP_1 + 1),
        OP_DUP => "OP_DUP".to_string(),
        OP_EQUAL => "OP_EQUAL".to_string(),
        OP_EQUALVERIFY => "OP_EQUALVERIFY".to_string(),
        OP_HASH160 => "OP_HASH160".to_string(),
        OP_CHECKSIG => "OP_CHECKSIG".to_string(),
        OP_CHECKMULTISIG => "OP_CHECKMULTISIG".to_string(),
        OP_SSTX => "OP_SSTX".to_string(),
        OP_SSGEN => "OP_SSGEN".to_string(),
        OP_SSRTX => "OP_SSRTX".to_string(),
        OP_SSTXCHANGE => "OP_SSTXCHANGE".to_string(),
        other => format!("OP_UNKNOWN{}", other),
    }
}

/// OP_0 or OP_1 through OP_16
pub fn is_small_int(op: u8) -> bool {
    op == OP_0 || (OP_1..=OP_16).contains(&op)
}

/// Value of a small integer opcode. Only meaningful when [`is_small_int`].
pub fn as_small_int(op: u8) -> usize {
    if op == OP_0 {
        0
    } else {
        (op - (OP_1 - 1)) as usize
    }
}
