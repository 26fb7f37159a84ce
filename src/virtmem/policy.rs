use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::virtmem::page_table::PageTable;

pub trait ReplacementPolicy {
    /// Picks the frame that receives `page`. If the frame is in use, its page
    /// is evicted by the caller.
    fn select_frame(&mut self, table: &PageTable, page: usize) -> usize;
}

/// First free frame, otherwise the frame of a uniformly chosen resident page.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn random_resident_frame(&mut self, table: &PageTable) -> usize {
        let nth = self.rng.random_range(0..table.resident_count());
        table
            .resident_pages()
            .nth(nth)
            .and_then(|page| table.entry(page))
            .map(|mapping| mapping.frame)
            .unwrap_or(0)
    }
}

impl ReplacementPolicy for RandomPolicy {
    fn select_frame(&mut self, table: &PageTable, _page: usize) -> usize {
        match table.free_frame() {
            Some(frame) => frame,
            None => self.random_resident_frame(table),
        }
    }
}

/// Hands out frames round robin, so the frame loaded longest ago is replaced next.
#[derive(Debug, Default)]
pub struct FifoPolicy {
    next: usize,
}

impl ReplacementPolicy for FifoPolicy {
    fn select_frame(&mut self, table: &PageTable, _page: usize) -> usize {
        let frame = self.next % table.nframes();
        self.next += 1;
        frame
    }
}

/// First free frame, otherwise the lowest resident page below the faulting
/// one, otherwise a random resident page.
#[derive(Debug)]
pub struct CustomPolicy {
    fallback: RandomPolicy,
}

impl CustomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            fallback: RandomPolicy::new(seed),
        }
    }
}

impl ReplacementPolicy for CustomPolicy {
    fn select_frame(&mut self, table: &PageTable, page: usize) -> usize {
        if let Some(frame) = table.free_frame() {
            return frame;
        }

        table
            .resident_pages()
            .next()
            .filter(|lowest| *lowest < page)
            .and_then(|resident| table.entry(resident))
            .map(|mapping| mapping.frame)
            .unwrap_or_else(|| self.fallback.random_resident_frame(table))
    }
}
