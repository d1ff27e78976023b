use crate::constants::{HALVING_INTERVAL, INITIAL_BLOCK_REWARD};

/// Emission curve: how much a block at a given index may mint.
pub trait RewardSchedule: Send + Sync {
    fn reward(&self, index: u64) -> u64;
}

/// Starts at `initial` and halves every `halving_interval` blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalvingSchedule {
    pub initial: u64,
    pub halving_interval: u64,
}

impl Default for HalvingSchedule {
    fn default() -> Self {
        Self {
            initial: INITIAL_BLOCK_REWARD,
            halving_interval: HALVING_INTERVAL,
        }
    }
}

impl RewardSchedule for HalvingSchedule {
    fn reward(&self, index: u64) -> u64 {
        let halvings = index.checked_div(self.halving_interval).unwrap_or(0);
        if halvings >= u64::BITS as u64 {
            0
        } else {
            self.initial >> halvings
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_on_interval_boundaries() {
        let s = HalvingSchedule::default();
        assert_eq!(s.reward(1), 50);
        assert_eq!(s.reward(999), 50);
        assert_eq!(s.reward(1000), 25);
        assert_eq!(s.reward(2500), 12);
        assert_eq!(s.reward(u64::MAX), 0);
    }

    #[test]
    fn zero_interval_never_halves() {
        let s = HalvingSchedule {
            initial: 10,
            halving_interval: 0,
        };
        assert_eq!(s.reward(1_000_000), 10);
    }
}
