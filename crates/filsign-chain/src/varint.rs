//! Unsigned LEB128 varints, as used in ID address payloads and CID prefixes.

/// Longest encoding of a `u64`.
const MAX_LEN: usize = 10;

/// Appends the varint encoding of `value` to `out`.
pub fn write_uvarint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        // Truncation is intended: only the low seven bits are kept.
        #[allow(clippy::cast_possible_truncation)]
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Encodes `value` as a standalone varint.
#[must_use]
pub fn to_uvarint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_LEN);
    write_uvarint(&mut out, value);
    out
}

/// Reads one minimally-encoded varint from the front of `data`.
///
/// Returns the value and the number of bytes consumed, or `None` when the
/// input is truncated, overflows 64 bits, or carries a redundant trailing
/// zero group.
#[must_use]
pub fn read_uvarint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate().take(MAX_LEN) {
        let group = u64::from(byte & 0x7f);
        if i == MAX_LEN - 1 && group > 1 {
            return None;
        }
        value |= group << (7 * i);
        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return None;
            }
            return Some((value, i + 1));
        }
    }
    None
}
