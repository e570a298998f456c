// The ledger: an in-memory list of mined blocks, each linked to its parent by
// prev_hash. Index 0 is the genesis block shared by every node.

use crate::core::{Block, DataField, HashField, ProofOfWork, DATA_SIZE, HASH_SIZE};
use crate::error::{BlockchainError, Result};
use log::info;
use once_cell::sync::Lazy;
use std::fmt;

const GENESIS_PREV_HASH: &[u8] = b"1234";
const GENESIS_DATA: &[u8] = b"The Genisys Block";

// Every node mines the same genesis block, so it only needs mining once.
static GENESIS: Lazy<Block> = Lazy::new(|| {
    let mut prev_hash = [0u8; HASH_SIZE];
    prev_hash[..GENESIS_PREV_HASH.len()].copy_from_slice(GENESIS_PREV_HASH);
    let mut data = [0u8; DATA_SIZE];
    data[..GENESIS_DATA.len()].copy_from_slice(GENESIS_DATA);

    let mut block = Block::from_parts(
        0,
        0,
        HashField::from_array(prev_hash),
        HashField::zeroed(),
        DataField::from_array(data),
    );
    block.mine(true);
    block
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blockchain {
    blocks: Vec<Block>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// A chain holding only the genesis block.
    pub fn new() -> Blockchain {
        Blockchain {
            blocks: vec![GENESIS.clone()],
        }
    }

    pub fn genesis() -> &'static Block {
        &GENESIS
    }

    /// Mine a new block holding `data` on top of the tail.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        let block = Block::new_block(self.length(), *self.tail_hash(), data)?;
        info!(
            "Appended block {} with hash {}",
            block.get_index(),
            block.get_curr_hash()
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Push a block mined elsewhere. It must extend the current tail.
    pub fn push_block(&mut self, block: Block) -> Result<()> {
        if block.get_index() != self.length() {
            return Err(BlockchainError::InvalidBlock(format!(
                "block index {} does not follow chain length {}",
                block.get_index(),
                self.length()
            )));
        }
        if block.get_prev_hash() != self.tail_hash() {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} does not link to the current tail",
                block.get_index()
            )));
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Absorb a block received from a peer.
    ///
    /// `idx == length` appends, `idx < length` overwrites in place. Fields are
    /// taken verbatim: neither linkage nor proof-of-work is checked.
    pub fn update_block(
        &mut self,
        idx: u64,
        nonce: u64,
        prev_hash: HashField,
        curr_hash: HashField,
        data: DataField,
    ) -> Result<()> {
        let len = self.length();
        if idx == len {
            self.blocks
                .push(Block::from_parts(idx, nonce, prev_hash, curr_hash, data));
            return Ok(());
        }
        let block = self.block_mut(idx)?;
        block.overwrite(nonce, prev_hash, curr_hash, data);
        Ok(())
    }

    /// Local edit: replace a block's payload, re-mine it and repair the chain.
    pub fn update_data(&mut self, idx: u64, data: &[u8]) -> Result<()> {
        let block = self.block_mut(idx)?;
        block.set_data(data)?;
        block.mine(true);
        self.repair();
        Ok(())
    }

    /// Relink every block whose prev_hash no longer matches its parent and
    /// re-mine it. A single pass reaches the fixpoint because each fix happens
    /// before the child of the fixed block is inspected. Returns the number of
    /// blocks re-mined.
    pub fn repair(&mut self) -> usize {
        let mut repaired = 0;
        for i in 1..self.blocks.len() {
            let parent_hash = *self.blocks[i - 1].get_curr_hash();
            let child = &mut self.blocks[i];
            if *child.get_prev_hash() != parent_hash {
                child.set_prev_hash(parent_hash);
                child.mine(true);
                repaired += 1;
            }
        }
        if repaired > 0 {
            info!("Repaired {repaired} block(s)");
        }
        repaired
    }

    /// Index of the first block with a broken link or invalid proof-of-work.
    pub fn verify(&self) -> Option<u64> {
        for (i, block) in self.blocks.iter().enumerate() {
            if !ProofOfWork::validate(block) {
                return Some(i as u64);
            }
            if i > 0 && block.get_prev_hash() != self.blocks[i - 1].get_curr_hash() {
                return Some(i as u64);
            }
        }
        None
    }

    pub fn get_hash(&self, idx: u64) -> Option<&HashField> {
        self.get_block(idx).map(Block::get_curr_hash)
    }

    pub fn get_block(&self, idx: u64) -> Option<&Block> {
        usize::try_from(idx).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn length(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn tail_hash(&self) -> &HashField {
        // The genesis block is never removed.
        self.blocks
            .last()
            .map(Block::get_curr_hash)
            .unwrap_or(GENESIS.get_curr_hash())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn block_mut(&mut self, idx: u64) -> Result<&mut Block> {
        let len = self.length();
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.blocks.get_mut(i))
            .ok_or(BlockchainError::IndexOutOfRange { idx, len })
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        Ok(())
    }
}
