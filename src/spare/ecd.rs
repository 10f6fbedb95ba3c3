// src/spare/ecd.rs
use byteorder::{ByteOrder, LittleEndian};

/// Number of feedback iterations per page. Consumes 0x84 little-endian words,
/// i.e. the full 0x210-byte raw page including the spare metadata bytes.
const ECD_ROUNDS: u32 = 0x1066;

/// Feedback polynomial of the flash controller's error-detection code.
const ECD_POLYNOMIAL: u32 = 0x6954559;

/// Offset of the stored ECD bytes within a raw page (just past the
/// 512-byte data region, inside the spare window).
pub const ECD_OFFSET: usize = 524;

/// Compute the 4-byte error-detection code over the raw page starting at
/// `offset`. Bit-for-bit the scheme used by the target hardware's flash
/// controller: a 26-bit linear-feedback accumulator folded over inverted
/// 32-bit little-endian words, inverted and packed with fixed shifts.
///
/// `data[offset..offset + 0x210]` must be in bounds.
pub fn calculate_ecd(data: &[u8], offset: usize) -> [u8; 4] {
    let mut val: u32 = 0;
    let mut v: u32 = 0;
    let mut count = offset;
    for i in 0..ECD_ROUNDS {
        if i & 31 == 0 {
            v = !LittleEndian::read_u32(&data[count..count + 4]);
            count += 4;
        }
        val ^= v & 1;
        v >>= 1;
        if val & 1 != 0 {
            val ^= ECD_POLYNOMIAL;
        }
        val >>= 1;
    }
    val = !val;
    [
        (val << 6) as u8,
        (val >> 2) as u8,
        (val >> 10) as u8,
        (val >> 18) as u8,
    ]
}

/// Verify the stored ECD of the raw page starting at `offset`: recompute the
/// code and compare it against the 4 bytes at `offset + 524`.
pub fn check_page_ecd(data: &[u8], offset: usize) -> bool {
    let calculated = calculate_ecd(data, offset);
    calculated == data[offset + ECD_OFFSET..offset + ECD_OFFSET + 4]
}
