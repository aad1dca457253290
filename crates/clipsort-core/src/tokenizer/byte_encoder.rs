//! Byte-to-unicode remapping used by CLIP's byte-level BPE.
//!
//! Printable Latin-1 bytes map to themselves; the remaining 68 bytes
//! (controls, space, soft hyphen, ...) are shifted to code points 256.. in
//! byte order. Merge rules are written over these symbols, so every byte
//! sequence can be merged without special cases.

/// Number of distinct byte symbols.
pub const BYTE_SYMBOLS: usize = 256;

/// The byte→symbol table, computed at compile time.
pub static BYTE_ENCODER: [char; BYTE_SYMBOLS] = build_table();

/// Bytes that keep their own code point.
const fn is_printable(byte: u8) -> bool {
    matches!(byte, b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF)
}

const fn build_table() -> [char; BYTE_SYMBOLS] {
    let mut table = ['\0'; BYTE_SYMBOLS];
    let mut shifted = 0u32;
    let mut byte = 0usize;
    while byte < BYTE_SYMBOLS {
        let code = if is_printable(byte as u8) {
            byte as u32
        } else {
            shifted += 1;
            255 + shifted
        };
        table[byte] = match char::from_u32(code) {
            Some(c) => c,
            None => panic!("byte symbol outside the unicode scalar range"),
        };
        byte += 1;
    }
    table
}

/// Remap every UTF-8 byte of `text` to its printable symbol.
pub fn encode_bytes(text: &str) -> String {
    text.bytes().map(|b| BYTE_ENCODER[b as usize]).collect()
}
