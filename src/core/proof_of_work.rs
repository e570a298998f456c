use crate::core::{Block, HashField};
use crate::utils::{sha256_hex, CancellationToken};

/// Suffix every mined block hash must end with.
pub const ACCEPTANCE_MARKER: &str = "1234";

/// Proof-of-work rules: a block's hash is the hex SHA-256 of its index,
/// previous hash, payload and nonce rendered as text, and the block counts as
/// mined once that hash ends with [`ACCEPTANCE_MARKER`].
pub struct ProofOfWork;

impl ProofOfWork {
    fn prepare_data(index: u64, prev_hash: &HashField, data: &[u8], nonce: u64) -> Vec<u8> {
        let mut data_bytes = vec![];
        data_bytes.extend(index.to_string().as_bytes());
        data_bytes.extend(prev_hash.text_bytes());
        data_bytes.extend(data);
        data_bytes.extend(nonce.to_string().as_bytes());
        data_bytes
    }

    /// Hash the block's fields with the given nonce.
    pub fn compute_hash(block: &Block, nonce: u64) -> HashField {
        let preimage = Self::prepare_data(
            block.get_index(),
            block.get_prev_hash(),
            block.get_data().text_bytes(),
            nonce,
        );
        // A hex SHA-256 digest is exactly HASH_SIZE bytes.
        HashField::new(sha256_hex(&preimage).as_bytes()).unwrap_or_default()
    }

    /// The acceptance predicate on a stored hash.
    pub fn is_accepted(hash: &HashField) -> bool {
        hash.text_bytes().ends_with(ACCEPTANCE_MARKER.as_bytes())
    }

    /// Check that the stored hash matches the block's contents and is accepted.
    pub fn validate(block: &Block) -> bool {
        let expected = Self::compute_hash(block, block.get_nonce());
        expected == *block.get_curr_hash() && Self::is_accepted(&expected)
    }

    /// Search nonces starting at `start_nonce` until the hash is accepted.
    ///
    /// With `force`, `start_nonce` itself is hashed and tested first;
    /// otherwise the search tests `stored_hash` and then moves on to
    /// `start_nonce + 1`. Returns `None` if `cancel` fires before a nonce is
    /// found.
    pub fn run(
        block: &Block,
        start_nonce: u64,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Option<(u64, HashField)> {
        let mut nonce = start_nonce;
        let mut hash = *block.get_curr_hash();
        if force {
            hash = Self::compute_hash(block, nonce);
        }
        let mut attempts: u64 = 0;
        while !Self::is_accepted(&hash) {
            attempts += 1;
            if attempts % 4096 == 0 && cancel.is_some_and(CancellationToken::is_cancelled) {
                return None;
            }
            nonce = nonce.wrapping_add(1);
            hash = Self::compute_hash(block, nonce);
        }
        Some((nonce, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_block() -> Block {
        Block::new_block(1, HashField::new(b"prev").unwrap(), b"payload").unwrap()
    }

    #[test]
    fn test_prepare_data_concatenates_text_forms() {
        let prev = HashField::new(b"ab").unwrap();
        let data = ProofOfWork::prepare_data(7, &prev, b"xyz", 42);
        assert_eq!(data, b"7abxyz42".to_vec());
    }

    #[test]
    fn test_mined_block_validates() {
        let block = test_block();
        assert!(ProofOfWork::validate(&block));
        assert!(block.get_curr_hash().to_text().ends_with(ACCEPTANCE_MARKER));
    }

    #[test]
    fn test_tampered_nonce_fails_validation() {
        let mut block = test_block();
        let nonce = block.get_nonce();
        let prev = *block.get_prev_hash();
        let curr = *block.get_curr_hash();
        let data = *block.get_data();
        block.overwrite(nonce + 1, prev, curr, data);
        assert!(!ProofOfWork::validate(&block));
    }

    #[test]
    fn test_run_stops_when_cancelled() {
        let block = Block::new_unmined(3, HashField::new(b"p").unwrap(), b"d").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Either the first 4096 attempts find a nonce or the search gives up.
        if let Some((nonce, hash)) = ProofOfWork::run(&block, 0, true, Some(&cancel)) {
            assert!(nonce < 4096);
            assert!(ProofOfWork::is_accepted(&hash));
        }
    }
}
