pub(crate) const BLOCKS_PER_BATCH: u64 = 25;
pub(crate) const MAX_BLOCKS_PER_REQUEST: u64 = BLOCKS_PER_BATCH * 10;
