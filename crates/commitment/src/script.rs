//! Minimal tapscript assembly: the opcodes the leaf families need and a
//! builder with minimal-encoding push semantics.

/// An empty push (also the number 0).
pub const OP_0: u8 = 0x00;
/// Pushes the next byte's worth of data (lengths 76..=255).
pub const OP_PUSHDATA1: u8 = 0x4c;
/// `OP_1` .. `OP_16` are `0x51 + (n - 1)`.
pub const OP_1: u8 = 0x51;
/// Drops the top stack element.
pub const OP_DROP: u8 = 0x75;
/// Pushes the byte length of the top stack element.
pub const OP_SIZE: u8 = 0x82;
/// Byte-wise equality check.
pub const OP_EQUAL: u8 = 0x87;
/// `OP_EQUAL` then `OP_VERIFY`.
pub const OP_EQUALVERIFY: u8 = 0x88;
/// Numeric equality check.
pub const OP_NUMEQUAL: u8 = 0x9c;
/// `OP_NUMEQUAL` then `OP_VERIFY`.
pub const OP_NUMEQUALVERIFY: u8 = 0x9d;
/// `RIPEMD160(SHA256(x))` of the top stack element.
pub const OP_HASH160: u8 = 0xa9;
/// Schnorr signature check against an x-only key.
pub const OP_CHECKSIG: u8 = 0xac;
/// `OP_CHECKSIG` then `OP_VERIFY`.
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
/// Enforces a relative timelock against the input's sequence field.
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;
/// Signature check that adds its result to a running counter.
pub const OP_CHECKSIGADD: u8 = 0xba;

/// Serializes `n` in the variable-length integer format used for length
/// prefixes.
pub fn compact_size(n: u64) -> Vec<u8> {
    match n {
        0..=0xfc => vec![n as u8],
        0xfd..=0xffff => {
            let mut out = vec![0xfd];
            out.extend_from_slice(&(n as u16).to_le_bytes());
            out
        }
        0x1_0000..=0xffff_ffff => {
            let mut out = vec![0xfe];
            out.extend_from_slice(&(n as u32).to_le_bytes());
            out
        }
        _ => {
            let mut out = vec![0xff];
            out.extend_from_slice(&n.to_le_bytes());
            out
        }
    }
}

/// Length-prefixed serialization of a byte string, `compact_size(len) ||
/// bytes`. Used for leaf hashing and sighash script fields.
pub fn ser_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = compact_size(bytes.len() as u64);
    out.extend_from_slice(bytes);
    out
}

/// Incremental script builder with minimal push encodings.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder(Vec<u8>);

impl ScriptBuilder {
    /// Starts an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw opcode.
    pub fn push_opcode(mut self, opcode: u8) -> Self {
        self.0.push(opcode);
        self
    }

    /// Appends a data push with the minimal length encoding.
    ///
    /// Tapscript pushes here are at most 32 bytes, so the direct-length
    /// and `OP_PUSHDATA1` forms cover every caller.
    pub fn push_slice(mut self, data: &[u8]) -> Self {
        debug_assert!(data.len() <= u8::MAX as usize);
        if data.len() > 75 {
            self.0.push(OP_PUSHDATA1);
        }
        self.0.push(data.len() as u8);
        self.0.extend_from_slice(data);
        self
    }

    /// Appends a number with minimal script-number encoding: `OP_0` /
    /// `OP_1..OP_16` for small values, otherwise a little-endian push
    /// with a sign-carrying top byte.
    pub fn push_int(self, value: i64) -> Self {
        match value {
            0 => self.push_opcode(OP_0),
            1..=16 => self.push_opcode(OP_1 + (value as u8 - 1)),
            _ => {
                let negative = value < 0;
                let mut magnitude = value.unsigned_abs();
                let mut bytes = Vec::new();
                while magnitude > 0 {
                    bytes.push((magnitude & 0xff) as u8);
                    magnitude >>= 8;
                }
                // The top bit of the last byte carries the sign; grow by a
                // byte when the magnitude already occupies it.
                if bytes.last().is_some_and(|byte| byte & 0x80 != 0) {
                    bytes.push(if negative { 0x80 } else { 0x00 });
                } else if negative {
                    let last = bytes.len() - 1;
                    bytes[last] |= 0x80;
                }
                self.push_slice(&bytes)
            }
        }
    }

    /// The assembled script bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}
