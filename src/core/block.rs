use crate::core::{DataField, HashField, ProofOfWork};
use crate::error::Result;
use crate::utils::CancellationToken;
use log::debug;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    index: u64,
    nonce: u64,
    prev_hash: HashField,
    curr_hash: HashField,
    data: DataField,
}

impl Block {
    /// Create a block and mine it before returning.
    ///
    /// Fails if `data` does not fit the data slot. The nonce search is
    /// CPU-bound; with a four-character marker it takes about 16^4 attempts.
    pub fn new_block(index: u64, prev_hash: HashField, data: &[u8]) -> Result<Block> {
        let mut block = Self::new_unmined(index, prev_hash, data)?;
        block.mine(true);
        Ok(block)
    }

    /// Create a block with nonce 0 and no hash; the caller mines it.
    pub fn new_unmined(index: u64, prev_hash: HashField, data: &[u8]) -> Result<Block> {
        Ok(Block {
            index,
            nonce: 0,
            prev_hash,
            curr_hash: HashField::zeroed(),
            data: DataField::new(data)?,
        })
    }

    /// Build a block from fields supplied by a peer. Nothing is re-hashed.
    pub fn from_parts(
        index: u64,
        nonce: u64,
        prev_hash: HashField,
        curr_hash: HashField,
        data: DataField,
    ) -> Block {
        Block {
            index,
            nonce,
            prev_hash,
            curr_hash,
            data,
        }
    }

    /// Mine this block.
    ///
    /// With `force` the current nonce is hashed and tested first, which
    /// validates an externally supplied nonce before searching further.
    /// Without it the stored hash is trusted, so an already-mined block is
    /// left untouched.
    pub fn mine(&mut self, force: bool) {
        if let Some((nonce, hash)) = ProofOfWork::run(self, self.nonce, force, None) {
            self.nonce = nonce;
            self.curr_hash = hash;
        }
    }

    /// Like [`Block::mine`] but gives up once `cancel` fires.
    /// Returns whether the block ended up mined.
    pub fn mine_cancellable(&mut self, force: bool, cancel: &CancellationToken) -> bool {
        match ProofOfWork::run(self, self.nonce, force, Some(cancel)) {
            Some((nonce, hash)) => {
                self.nonce = nonce;
                self.curr_hash = hash;
                debug!("Mined block {} with nonce {nonce}", self.index);
                true
            }
            None => false,
        }
    }

    pub fn is_mined(&self) -> bool {
        ProofOfWork::validate(self)
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_prev_hash(&self) -> &HashField {
        &self.prev_hash
    }

    pub fn get_curr_hash(&self) -> &HashField {
        &self.curr_hash
    }

    pub fn get_data(&self) -> &DataField {
        &self.data
    }

    // Setters below never re-mine; callers decide whether to.

    pub fn set_prev_hash(&mut self, prev_hash: HashField) {
        self.prev_hash = prev_hash;
    }

    pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
        self.data = DataField::new(data)?;
        Ok(())
    }

    /// Replace every field but the index with authoritative values.
    pub fn overwrite(
        &mut self,
        nonce: u64,
        prev_hash: HashField,
        curr_hash: HashField,
        data: DataField,
    ) {
        self.nonce = nonce;
        self.prev_hash = prev_hash;
        self.curr_hash = curr_hash;
        self.data = data;
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "========== Block {} ==========", self.index)?;
        writeln!(f, "P-hash : {}", self.prev_hash)?;
        writeln!(f, "C-hash : {}", self.curr_hash)?;
        writeln!(f, "Data : {}", self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ACCEPTANCE_MARKER, DATA_SIZE};
    use crate::error::BlockchainError;

    #[test]
    fn test_new_block_is_mined() {
        let block = Block::new_block(1, HashField::new(b"1234").unwrap(), b"hello").unwrap();
        assert!(block.is_mined());
        assert_eq!(block.get_index(), 1);
        assert_eq!(block.get_data().to_text(), "hello");
        assert!(block.get_curr_hash().to_text().ends_with(ACCEPTANCE_MARKER));
    }

    #[test]
    fn test_new_block_rejects_oversized_data() {
        let data = vec![b'a'; DATA_SIZE + 1];
        let result = Block::new_block(1, HashField::zeroed(), &data);
        assert!(matches!(
            result,
            Err(BlockchainError::DataTooLarge { .. })
        ));
    }

    #[test]
    fn test_data_at_capacity_is_accepted() {
        let data = vec![b'a'; DATA_SIZE];
        let block = Block::new_block(2, HashField::zeroed(), &data).unwrap();
        assert_eq!(block.get_data().text_bytes().len(), DATA_SIZE);
    }

    #[test]
    fn test_unforced_mine_keeps_stale_but_accepted_hash() {
        let mut block = Block::new_block(1, HashField::new(b"a").unwrap(), b"x").unwrap();
        let before = *block.get_curr_hash();
        block.set_prev_hash(HashField::new(b"b").unwrap());
        block.mine(false);
        assert_eq!(*block.get_curr_hash(), before);
        assert!(!block.is_mined());

        block.mine(true);
        assert!(block.is_mined());
    }

    #[test]
    fn test_overwrite_does_not_rehash() {
        let mut block = Block::new_block(1, HashField::zeroed(), b"x").unwrap();
        let fake = HashField::new(b"not-a-real-hash").unwrap();
        block.overwrite(99, HashField::zeroed(), fake, DataField::new(b"y").unwrap());
        assert_eq!(block.get_nonce(), 99);
        assert_eq!(*block.get_curr_hash(), fake);
        assert!(!block.is_mined());
    }

    #[test]
    fn test_display_renders_banner() {
        let block = Block::new_block(3, HashField::new(b"p").unwrap(), b"data").unwrap();
        let text = block.to_string();
        assert!(text.starts_with("========== Block 3 =========="));
        assert!(text.contains("Data : data"));
    }
}
