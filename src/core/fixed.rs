use crate::error::{BlockchainError, Result};
use std::borrow::Cow;
use std::fmt;

/// Size of a hash slot: a hex-encoded SHA-256 digest
pub const HASH_SIZE: usize = 64;
/// Size of a block's data slot
pub const DATA_SIZE: usize = 256;

/// A byte slot of fixed capacity `N`, zero-filled past its contents.
///
/// Blocks and wire messages carry hashes and payloads in slots like these so
/// their layout never depends on the length of what they hold. The text form
/// of a slot is everything before the first zero byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedBytes<const N: usize>([u8; N]);

/// A current-hash or previous-hash slot
pub type HashField = FixedBytes<HASH_SIZE>;
/// A block payload slot
pub type DataField = FixedBytes<DATA_SIZE>;

impl<const N: usize> FixedBytes<N> {
    pub fn zeroed() -> Self {
        FixedBytes([0u8; N])
    }

    /// Copy `bytes` into a fresh slot, failing if they exceed the capacity.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > N {
            return Err(BlockchainError::DataTooLarge {
                len: bytes.len(),
                max: N,
            });
        }
        let mut slot = [0u8; N];
        slot[..bytes.len()].copy_from_slice(bytes);
        Ok(FixedBytes(slot))
    }

    pub fn from_array(bytes: [u8; N]) -> Self {
        FixedBytes(bytes)
    }

    pub fn as_array(&self) -> &[u8; N] {
        &self.0
    }

    /// Meaningful bytes: the slot up to its first zero byte.
    pub fn text_bytes(&self) -> &[u8] {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(N);
        &self.0[..end]
    }

    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.text_bytes())
    }
}

impl<const N: usize> Default for FixedBytes<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const N: usize> fmt::Display for FixedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl<const N: usize> fmt::Debug for FixedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_zero_fills_tail() {
        let slot = HashField::new(b"abcd").unwrap();
        assert_eq!(slot.text_bytes(), b"abcd");
        assert!(slot.as_array()[4..].iter().all(|b| *b == 0));
        assert_eq!(slot.to_string(), "abcd");
    }

    #[test]
    fn test_new_rejects_oversized_input() {
        let too_big = vec![b'x'; DATA_SIZE + 1];
        match DataField::new(&too_big) {
            Err(BlockchainError::DataTooLarge { len, max }) => {
                assert_eq!(len, DATA_SIZE + 1);
                assert_eq!(max, DATA_SIZE);
            }
            other => panic!("expected DataTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_full_slot_has_no_terminator() {
        let full = vec![b'f'; HASH_SIZE];
        let slot = HashField::new(&full).unwrap();
        assert_eq!(slot.text_bytes().len(), HASH_SIZE);
        assert!(HashField::zeroed().text_bytes().is_empty());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = HashField::new(b"aaaa").unwrap();
        let b = HashField::new(b"aaab").unwrap();
        assert!(a < b);
    }
}
