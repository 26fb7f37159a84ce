use crate::experiment::MetricSample;
use crate::virtmem::policy::ReplacementPolicy;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protection {
    Read,
    ReadWrite,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub frame: usize,
    pub protection: Protection,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// page -> frame mapping, plus the reverse frame -> page mapping
#[derive(Debug, Clone)]
pub struct PageTable {
    entries: Vec<Option<Mapping>>,
    owners: Vec<Option<usize>>,
}

impl PageTable {
    pub fn new(npages: usize, nframes: usize) -> Self {
        Self {
            entries: vec![None; npages],
            owners: vec![None; nframes],
        }
    }

    pub fn npages(&self) -> usize {
        self.entries.len()
    }

    pub fn nframes(&self) -> usize {
        self.owners.len()
    }

    pub fn entry(&self, page: usize) -> Option<Mapping> {
        self.entries[page]
    }

    /// The page currently held by `frame`.
    pub fn owner(&self, frame: usize) -> Option<usize> {
        self.owners[frame]
    }

    pub fn free_frame(&self) -> Option<usize> {
        self.owners.iter().position(Option::is_none)
    }

    /// Resident pages in ascending page order.
    pub fn resident_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_some())
            .map(|(page, _)| page)
    }

    pub fn resident_count(&self) -> usize {
        self.owners.iter().filter(|owner| owner.is_some()).count()
    }

    fn map(&mut self, page: usize, frame: usize, protection: Protection) {
        self.entries[page] = Some(Mapping { frame, protection });
        self.owners[frame] = Some(page);
    }

    fn unmap(&mut self, page: usize) {
        if let Some(Mapping { frame, .. }) = self.entries[page].take() {
            self.owners[frame] = None;
        }
    }
}

/// Byte-addressable memory of `npages * page_size` bytes backed by
/// `nframes` physical frames and a disk.
///
/// Touching an unmapped page, or writing to a read-only one, is a page
/// fault. Pages are always loaded read-only, so the first write to a freshly
/// loaded page faults a second time and only upgrades the protection. Dirty
/// (read-write) pages are written back to disk when evicted.
pub struct VirtualMemory {
    page_size: usize,
    table: PageTable,
    physmem: Vec<u8>,
    disk: Vec<u8>,
    policy: Box<dyn ReplacementPolicy>,
    stats: MetricSample,
}

impl VirtualMemory {
    pub fn new(
        npages: usize,
        nframes: usize,
        page_size: usize,
        policy: Box<dyn ReplacementPolicy>,
    ) -> Self {
        Self {
            page_size,
            table: PageTable::new(npages, nframes),
            physmem: vec![0; nframes * page_size],
            disk: vec![0; npages * page_size],
            policy,
            stats: MetricSample::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.npages() * self.page_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn page_table(&self) -> &PageTable {
        &self.table
    }

    /// Disk reads, disk writes and page faults so far.
    pub fn stats(&self) -> MetricSample {
        self.stats
    }

    pub fn read(&mut self, address: usize) -> u8 {
        let frame = self.resolve(address, Access::Read);
        self.physmem[frame * self.page_size + address % self.page_size]
    }

    pub fn write(&mut self, address: usize, value: u8) {
        let frame = self.resolve(address, Access::Write);
        self.physmem[frame * self.page_size + address % self.page_size] = value;
    }

    fn resolve(&mut self, address: usize, access: Access) -> usize {
        let page = address / self.page_size;
        loop {
            match (self.table.entry(page), access) {
                (
                    Some(Mapping {
                        frame,
                        protection: Protection::ReadWrite,
                    }),
                    _,
                )
                | (
                    Some(Mapping {
                        frame,
                        protection: Protection::Read,
                    }),
                    Access::Read,
                ) => return frame,
                (mapping, _) => self.page_fault(page, mapping),
            }
        }
    }

    fn page_fault(&mut self, page: usize, mapping: Option<Mapping>) {
        self.stats.faults += 1;

        // write to a resident read-only page
        if let Some(Mapping { frame, .. }) = mapping {
            self.table.map(page, frame, Protection::ReadWrite);
            return;
        }

        let frame = self.policy.select_frame(&self.table, page);
        if let Some(victim) = self.table.owner(frame) {
            self.evict(victim);
        }
        self.load(page, frame);
    }

    fn evict(&mut self, page: usize) {
        if let Some(Mapping {
            frame,
            protection: Protection::ReadWrite,
        }) = self.table.entry(page)
        {
            self.stats.writes += 1;
            let (disk, physmem) = (self.page_range(page), self.page_range(frame));
            self.disk[disk].copy_from_slice(&self.physmem[physmem]);
        }
        self.table.unmap(page);
    }

    fn load(&mut self, page: usize, frame: usize) {
        self.stats.reads += 1;
        let (disk, physmem) = (self.page_range(page), self.page_range(frame));
        self.physmem[physmem].copy_from_slice(&self.disk[disk]);
        self.table.map(page, frame, Protection::Read);
    }

    fn page_range(&self, idx: usize) -> std::ops::Range<usize> {
        idx * self.page_size..(idx + 1) * self.page_size
    }
}

impl std::fmt::Debug for VirtualMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualMemory")
            .field("page_size", &self.page_size)
            .field("table", &self.table)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::virtmem::Algorithm;

    fn memory(npages: usize, nframes: usize, algorithm: Algorithm) -> VirtualMemory {
        VirtualMemory::new(npages, nframes, 16, algorithm.policy(0))
    }

    #[test]
    fn test_read_then_write_faults_twice() {
        let mut memory = memory(4, 2, Algorithm::Fifo);

        assert_eq!(memory.read(0), 0);
        assert_eq!(memory.stats(), MetricSample::new(1, 0, 1));
        assert_eq!(
            memory.page_table().entry(0),
            Some(Mapping {
                frame: 0,
                protection: Protection::Read
            })
        );

        memory.write(1, 7);
        assert_eq!(memory.stats(), MetricSample::new(1, 0, 2));
        assert_eq!(memory.read(1), 7);
        assert_eq!(memory.stats(), MetricSample::new(1, 0, 2));
    }

    #[test]
    fn test_dirty_pages_survive_eviction() {
        let mut memory = memory(3, 1, Algorithm::Fifo);

        memory.write(0, 42);
        memory.write(16, 43);
        // page 0 was dirty
        assert_eq!(memory.stats().writes, 1);
        assert_eq!(memory.page_table().owner(0), Some(1));
        assert_eq!(memory.page_table().entry(0), None);

        _ = memory.read(32);
        assert_eq!(memory.stats().writes, 2);
        assert_eq!(memory.read(0), 42);
        // page 2 was only read
        assert_eq!(memory.stats().writes, 2);
        assert_eq!(memory.read(16), 43);
    }

    #[test]
    fn test_resident_pages() {
        let mut memory = memory(4, 4, Algorithm::Rand);
        for page in [3, 1, 2] {
            _ = memory.read(page * 16);
        }

        let table = memory.page_table();
        assert_eq!(table.resident_pages().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(table.resident_count(), 3);
        assert_eq!(table.free_frame(), Some(3));
        assert_eq!(table.owner(0), Some(3));
    }
}
