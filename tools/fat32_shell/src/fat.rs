/// FAT chain manager.
///
/// The first FAT copy is the only one read or written. Each entry is a 28-bit
/// value: 0 = free, 2..=max = next cluster of the chain, >= 0x0FFF_FFF8 = end
/// of chain. The top 4 bits are reserved and preserved on write.

use crate::disk::BlockDev;
use crate::error::FsError;
use crate::fat32::Fat32;

// ─── Constants ─────────────────────────────────────────────────────────────────

pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const FAT32_EOC_MIN:  u32 = 0x0FFF_FFF8;
pub const FAT32_EOC:      u32 = 0x0FFF_FFFF;
pub const FAT_FREE:       u32 = 0;

/// End-of-chain test. The raw legacy marker 0xFFFF_FFFF passes too.
pub fn is_eoc(value: u32) -> bool { (value & FAT_ENTRY_MASK) >= FAT32_EOC_MIN }

// ─── Implementation ────────────────────────────────────────────────────────────

impl<D: BlockDev> Fat32<D> {
    /// Read the (masked) FAT entry of `cluster`.
    pub fn read_fat_entry(&mut self, cluster: u32) -> Result<u32, FsError> {
        self.check_fat_index(cluster)?;
        let mut raw = [0u8; 4];
        self.disk.read_at(self.geo.fat_entry_offset(cluster), &mut raw)?;
        Ok(u32::from_le_bytes(raw) & FAT_ENTRY_MASK)
    }

    /// Store `value` in the FAT entry of `cluster`, keeping the reserved top bits.
    pub fn write_fat_entry(&mut self, cluster: u32, value: u32) -> Result<(), FsError> {
        self.check_fat_index(cluster)?;
        let off = self.geo.fat_entry_offset(cluster);
        let mut raw = [0u8; 4];
        self.disk.read_at(off, &mut raw)?;
        let old = u32::from_le_bytes(raw);
        let new = (old & !FAT_ENTRY_MASK) | (value & FAT_ENTRY_MASK);
        log::debug!("fat[{cluster}] = {:#010x}", value & FAT_ENTRY_MASK);
        self.disk.write_at(off, &new.to_le_bytes())?;
        Ok(())
    }

    /// First free cluster from index 2 upward. Does not claim it.
    ///
    /// Linear scan: O(total clusters) per call.
    pub fn allocate_free_cluster(&mut self) -> Result<u32, FsError> {
        Ok(self.find_free_clusters(1)?[0])
    }

    /// The first `count` free clusters in FAT order, or `NoSpace` if the FAT
    /// holds fewer. Nothing is written, so a failed caller leaks nothing.
    pub fn find_free_clusters(&mut self, count: usize) -> Result<Vec<u32>, FsError> {
        let mut found = Vec::with_capacity(count);
        if count == 0 {
            return Ok(found);
        }
        let bps = self.geo.bytes_per_sector as usize;
        let per_sector = (bps / 4) as u32;
        let last = self.geo.max_cluster();
        let mut sec = vec![0u8; bps];

        for fat_sec in 0..self.geo.fat_size {
            let first = fat_sec * per_sector;
            if first > last { break; }
            self.disk.read_at(self.geo.fat_offset() + fat_sec as u64 * bps as u64, &mut sec)?;
            for (i, raw) in sec.chunks_exact(4).enumerate() {
                let cluster = first + i as u32;
                if cluster < 2 { continue; }
                if cluster > last { break; }
                let entry = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) & FAT_ENTRY_MASK;
                if entry == FAT_FREE {
                    found.push(cluster);
                    if found.len() == count {
                        return Ok(found);
                    }
                }
            }
        }
        Err(FsError::NoSpace)
    }

    /// Make `cluster` the last cluster of its chain.
    pub fn terminate_chain(&mut self, cluster: u32) -> Result<(), FsError> {
        self.write_fat_entry(cluster, FAT32_EOC)
    }

    /// Link `new_cluster` after `tail` and make it the new end of the chain.
    pub fn extend_chain(&mut self, tail: u32, new_cluster: u32) -> Result<(), FsError> {
        self.check_cluster(new_cluster)?;
        self.write_fat_entry(tail, new_cluster)?;
        self.terminate_chain(new_cluster)
    }

    /// Claim the first free cluster as a fresh one-cluster chain.
    pub fn allocate_chain(&mut self) -> Result<u32, FsError> {
        let cluster = self.allocate_free_cluster()?;
        self.terminate_chain(cluster)?;
        log::debug!("allocated cluster {cluster}");
        Ok(cluster)
    }

    /// Every cluster of the chain starting at `start`, in order.
    pub fn chain(&mut self, start: u32) -> Result<Vec<u32>, FsError> {
        self.check_cluster(start)?;
        let mut out = vec![start];
        let mut cur = start;
        loop {
            let next = self.read_fat_entry(cur)?;
            if is_eoc(next) { break; }
            // A free or out-of-range link, or more links than clusters, is corruption.
            if !self.geo.is_data_cluster(next) || out.len() > self.geo.total_clusters as usize {
                log::warn!("broken chain from {start}: cluster {cur} links to {next:#x}");
                return Err(FsError::BadCluster(next));
            }
            out.push(next);
            cur = next;
        }
        Ok(out)
    }

    fn check_fat_index(&self, cluster: u32) -> Result<(), FsError> {
        if cluster < self.geo.fat_entry_count() { Ok(()) } else { Err(FsError::BadCluster(cluster)) }
    }
}
