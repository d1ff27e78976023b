use crate::Block;
use anyhow::Result;

/// Trait the storage backends implement so a chain survives restarts.
/// This lives in `ledger-core` to avoid a circular dependency.
pub trait BlockStore: Send + Sync {
    fn put_block(&self, block: &Block) -> Result<()>;
    fn get_block(&self, index: u64) -> Result<Option<Block>>;
    /// Index of the highest stored block, `None` when nothing is stored.
    fn tip_height(&self) -> Result<Option<u64>>;
    /// Remove every block with index `>= index`.
    fn truncate_from(&self, index: u64) -> Result<()>;
    fn close(&self) -> Result<()>;

    /// Every stored block in index order, stopping at the first gap.
    fn load_chain(&self) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let Some(tip) = self.tip_height()? else {
            return Ok(blocks);
        };
        for index in 0..=tip {
            match self.get_block(index)? {
                Some(block) => blocks.push(block),
                None => break,
            }
        }
        Ok(blocks)
    }

    /// Replace everything from `blocks[0].index` onward with `blocks`.
    fn replace_tail(&self, blocks: &[Block]) -> Result<()> {
        let Some(first) = blocks.first() else {
            return Ok(());
        };
        self.truncate_from(first.index)?;
        for block in blocks {
            self.put_block(block)?;
        }
        Ok(())
    }
}
