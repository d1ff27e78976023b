use anyhow::{Context, Result};
use ledger_core::{Block, BlockStore};
use sled::{Batch, Db, IVec, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";

#[derive(Clone)]
pub struct SledStore {
  db: Db,
  blocks: Tree,
}

fn index_from_key(key: &IVec) -> Result<u64> {
  let arr = <[u8; 8]>::try_from(&key[..]).context("block key is not 8 bytes")?;
  Ok(u64::from_be_bytes(arr))
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let db = sled::open(path).context("opening sled database")?;
    let blocks = db.open_tree(TREE_BLOCKS)?;
    info!("sled store opened with {} blocks", blocks.len());
    Ok(Self { db, blocks })
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  /// Drop every stored block.
  pub fn clear(&self) -> Result<()> {
    self.blocks.clear()?;
    self.db.flush()?;
    Ok(())
  }
}

impl BlockStore for SledStore {
  fn put_block(&self, block: &Block) -> Result<()> {
    let key = block.index.to_be_bytes();
    let bytes = bincode::serialize(block)?;
    self.blocks.insert(key, bytes)?;
    self.db.flush()?;
    debug!("stored block {}", block.index);
    Ok(())
  }

  fn get_block(&self, index: u64) -> Result<Option<Block>> {
    let key = index.to_be_bytes();
    self
      .blocks
      .get(key)?
      .map(|ivec: IVec| {
        bincode::deserialize(&ivec).with_context(|| format!("decoding block {index}"))
      })
      .transpose()
  }

  fn tip_height(&self) -> Result<Option<u64>> {
    self
      .blocks
      .last()?
      .map(|(key, _)| index_from_key(&key))
      .transpose()
  }

  fn truncate_from(&self, index: u64) -> Result<()> {
    let mut batch = Batch::default();
    let mut removed = 0usize;
    for entry in self.blocks.range(index.to_be_bytes()..) {
      let (key, _) = entry?;
      batch.remove(key);
      removed += 1;
    }
    self.blocks.apply_batch(batch)?;
    self.db.flush()?;
    debug!("removed {} blocks from index {}", removed, index);
    Ok(())
  }

  fn close(&self) -> Result<()> {
    self.db.flush()?;
    Ok(())
  }
}
