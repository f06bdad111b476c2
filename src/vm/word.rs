//! 256-bit word helpers.
//!
//! Every value on the stack, in the constants table, in the context grid and
//! in the store is a `Word`. Booleans are produced as 0 / 1 and consumed as
//! zero / non-zero.

use sha3::{Digest, Keccak256};

pub use revm::primitives::U256;

pub type Word = U256;

/// 32-byte caller identity; the store namespace.
pub type Caller = [u8; 32];

pub fn word_bool(v: bool) -> Word {
    if v { U256::from(1u64) } else { U256::ZERO }
}

pub fn word_is_zero(w: &Word) -> bool {
    *w == U256::ZERO
}

pub fn caller_word(caller: &Caller) -> Word {
    U256::from_be_bytes(*caller)
}

pub fn word_to_bytes(w: &Word) -> [u8; 32] {
    w.to_be_bytes::<32>()
}

/// keccak256 over the big-endian bytes of each word, in order.
pub fn keccak_words(words: &[Word]) -> Word {
    let mut h = Keccak256::new();
    for w in words {
        h.update(word_to_bytes(w));
    }
    let out: [u8; 32] = h.finalize().into();
    U256::from_be_bytes(out)
}

/// Parse a decimal or `0x`-prefixed hex word.
pub fn parse_word(s: &str) -> Result<Word, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(s, 10),
    };
    parsed.map_err(|e| format!("invalid word {s:?}: {e}"))
}
