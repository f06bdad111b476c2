//! Sentinel-delimited lists on an output stack.
//!
//! Domain callers (flows, order books) return variable-length lists by
//! pushing a sentinel word followed by fixed-size tuples. The VM knows nothing
//! about this; these helpers decode the finished stack.

use sha3::{Digest, Keccak256};
use thiserror::Error;

use crate::vm::word::{Word, U256};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SentinelError {
    #[error("sentinel not found on stack")]
    Missing,
    #[error("{len} words after sentinel is not a multiple of tuple size {tuple_size}")]
    Ragged { len: usize, tuple_size: usize },
    #[error("tuple size must be non-zero")]
    ZeroTupleSize,
}

/// keccak256 of `label`, for deriving a sentinel no real value will hit.
pub fn sentinel_from_label(label: &str) -> Word {
    let out: [u8; 32] = Keccak256::digest(label.as_bytes()).into();
    U256::from_be_bytes(out)
}

/// Scan down from the top of `stack` for the nearest `sentinel`; split the
/// words above it into `tuple_size` tuples (push order) and truncate `stack`
/// to below the sentinel. Call repeatedly to peel several lists.
pub fn consume_sentinel_tuples(
    stack:      &mut Vec<Word>,
    sentinel:   Word,
    tuple_size: usize,
) -> Result<Vec<Vec<Word>>, SentinelError> {
    if tuple_size == 0 {
        return Err(SentinelError::ZeroTupleSize);
    }
    let pos = stack.iter().rposition(|w| *w == sentinel).ok_or(SentinelError::Missing)?;
    let len = stack.len() - pos - 1;
    if len % tuple_size != 0 {
        return Err(SentinelError::Ragged { len, tuple_size });
    }
    let tail = stack.split_off(pos);
    Ok(tail[1..].chunks(tuple_size).map(|c| c.to_vec()).collect())
}
