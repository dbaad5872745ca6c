//! Combinatorial ranking over a shrinking candidate address set
//!
//! Each emitted location is written as its rank within the addresses not
//! yet emitted, a factorial-number-system encoding of the occupied set
//! and its order. The rank for `k` remaining candidates fits in
//! `width_for(k)` bits, and the value `k` itself is one past the largest
//! legal rank, which is what the codec uses as its sentinel.

use crate::types::location::Location;

/// Minimum bits able to carry every value in `0..=count`: ranks below
/// `count` plus the sentinel `count` itself.
#[inline]
pub fn width_for(count: u32) -> u32 {
    if count == 0 {
        1
    } else {
        32 - count.leading_zeros()
    }
}

/// The not-yet-emitted candidate addresses, sorted ascending.
#[derive(Debug)]
pub struct Candidates {
    addrs: Vec<Location>,
}

impl Candidates {
    /// All addresses `1..=limit`.
    pub fn new(limit: Location) -> Self {
        Candidates { addrs: (1..=limit).collect() }
    }

    /// Number of candidates still available.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.addrs.len() as u32
    }

    /// Removes `addr`, returning the rank it occupied.
    pub fn take_address(&mut self, addr: Location) -> Option<u32> {
        let idx = self.addrs.binary_search(&addr).ok()?;
        self.addrs.remove(idx);
        Some(idx as u32)
    }

    /// Removes and returns the candidate at `rank` (order statistics).
    pub fn take_rank(&mut self, rank: u32) -> Option<Location> {
        if (rank as usize) < self.addrs.len() {
            Some(self.addrs.remove(rank as usize))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_covers_sentinel() {
        // Goal: width_for(k) can represent every rank plus the sentinel k
        assert_eq!(width_for(0), 1);
        assert_eq!(width_for(1), 1);
        assert_eq!(width_for(2), 2);
        assert_eq!(width_for(3), 2);
        assert_eq!(width_for(4), 3);
        assert_eq!(width_for(7), 3);
        assert_eq!(width_for(8), 4);
        for k in 0u32..1000 {
            assert!(k < (1u64 << width_for(k)) as u32 || k == 0);
        }
    }

    #[test]
    fn rank_and_address_are_inverse() {
        let mut by_addr = Candidates::new(6);
        let mut by_rank = Candidates::new(6);

        for addr in [3u32, 1, 6, 4] {
            let rank = by_addr.take_address(addr).unwrap();
            assert_eq!(by_rank.take_rank(rank), Some(addr));
        }
        assert_eq!(by_addr.remaining(), 2);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut cands = Candidates::new(2);
        assert_eq!(cands.take_address(9), None);
        assert_eq!(cands.take_rank(2), None);
        assert_eq!(cands.take_rank(0), Some(1));
    }
}
