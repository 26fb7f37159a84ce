use rand::Rng;
use rand::rngs::StdRng;

use crate::virtmem::page_table::VirtualMemory;

const SCAN_PASSES: usize = 10;
const FOCUS_BURSTS: usize = 100;
const FOCUS_WRITES: usize = 100;
const FOCUS_WINDOW: usize = 25;

/// Sequential fill, then repeated sequential read passes.
pub fn scan(memory: &mut VirtualMemory) -> u64 {
    for address in 0..memory.len() {
        memory.write(address, (address % 256) as u8);
    }

    (0..SCAN_PASSES).map(|_| checksum(memory)).sum()
}

/// Random fill followed by an in-place sort.
pub fn sort(memory: &mut VirtualMemory, rng: &mut StdRng) -> u64 {
    for address in 0..memory.len() {
        memory.write(address, rng.random());
    }

    quicksort(memory);
    checksum(memory)
}

/// Bursts of random writes that stay inside a small window.
pub fn focus(memory: &mut VirtualMemory, rng: &mut StdRng) -> u64 {
    let len = memory.len();
    for address in 0..len {
        memory.write(address, 0);
    }

    for _ in 0..FOCUS_BURSTS {
        let start = rng.random_range(0..len);
        for _ in 0..FOCUS_WRITES {
            let address = (start + rng.random_range(0..FOCUS_WINDOW)) % len;
            memory.write(address, rng.random());
        }
    }

    checksum(memory)
}

fn checksum(memory: &mut VirtualMemory) -> u64 {
    (0..memory.len())
        .map(|address| u64::from(memory.read(address)))
        .sum()
}

// three-way partitioning, bytes repeat a lot
fn quicksort(memory: &mut VirtualMemory) {
    let mut ranges = vec![(0, memory.len())];
    while let Some((lo, hi)) = ranges.pop() {
        if hi - lo < 2 {
            continue;
        }

        let pivot = memory.read(lo + (hi - lo) / 2);
        let (mut lt, mut idx, mut gt) = (lo, lo, hi);
        while idx < gt {
            let value = memory.read(idx);
            if value < pivot {
                swap(memory, lt, idx);
                lt += 1;
                idx += 1;
            } else if value > pivot {
                gt -= 1;
                swap(memory, idx, gt);
            } else {
                idx += 1;
            }
        }

        ranges.push((lo, lt));
        ranges.push((gt, hi));
    }
}

fn swap(memory: &mut VirtualMemory, a: usize, b: usize) {
    if a == b {
        return;
    }
    let (value_a, value_b) = (memory.read(a), memory.read(b));
    memory.write(a, value_b);
    memory.write(b, value_a);
}

#[cfg(test)]
mod test {
    use rand::SeedableRng;

    use super::*;
    use crate::virtmem::Algorithm;

    fn contents(memory: &mut VirtualMemory) -> Vec<u8> {
        (0..memory.len()).map(|address| memory.read(address)).collect()
    }

    #[test]
    fn test_sort_sorts() {
        let mut memory = VirtualMemory::new(8, 3, 32, Algorithm::Fifo.policy(0));
        let mut rng = StdRng::seed_from_u64(3);
        _ = sort(&mut memory, &mut rng);

        let data = contents(&mut memory);
        assert_eq!(data.len(), 256);
        assert!(data.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_scan_checksum() {
        let mut memory = VirtualMemory::new(4, 2, 64, Algorithm::Rand.policy(0));
        // 256 bytes, one of each value
        assert_eq!(scan(&mut memory), 10 * (0..256u64).sum::<u64>());
    }

    #[test]
    fn test_focus_is_seeded() {
        let run = |seed| {
            let mut memory = VirtualMemory::new(8, 2, 16, Algorithm::Custom.policy(0));
            let checksum = focus(&mut memory, &mut StdRng::seed_from_u64(seed));
            (checksum, memory.stats())
        };

        assert_eq!(run(11), run(11));
    }
}
