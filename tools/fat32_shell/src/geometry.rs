/// Boot sector decoding and the addressing constants derived from it.
///
/// Fields are read at their fixed byte offsets in the little-endian on-disk
/// layout; nothing depends on host struct layout.

use crate::error::FsError;

pub const BOOT_SECTOR_SIZE: usize = 512;

const BOOT_SIG_LEAD:  u8 = 0x55;
const BOOT_SIG_TRAIL: u8 = 0xAA;

// ─── BPB (BIOS Parameter Block) ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSector {
    pub bytes_per_sector:      u16,
    pub sectors_per_cluster:   u8,
    pub reserved_sector_count: u16,
    pub num_fats:              u8,
    pub root_entry_count:      u16,
    pub total_sectors_16:      u16,
    pub fat_size_16:           u16,
    pub total_sectors_32:      u32,
    pub fat_size_32:           u32,
    pub root_cluster:          u32,
}

fn le16(buf: &[u8], off: usize) -> u16 { u16::from_le_bytes([buf[off], buf[off + 1]]) }

fn le32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

impl BootSector {
    /// Decode and validate sector 0 of a FAT32 volume.
    pub fn parse(sec: &[u8]) -> Result<Self, FsError> {
        if sec.len() < BOOT_SECTOR_SIZE {
            return Err(FsError::InvalidBootSector("sector shorter than 512 bytes"));
        }
        if sec[510] != BOOT_SIG_LEAD || sec[511] != BOOT_SIG_TRAIL {
            return Err(FsError::InvalidBootSector("missing 0x55AA signature"));
        }

        let bs = BootSector {
            bytes_per_sector:      le16(sec, 11),
            sectors_per_cluster:   sec[13],
            reserved_sector_count: le16(sec, 14),
            num_fats:              sec[16],
            root_entry_count:      le16(sec, 17),
            total_sectors_16:      le16(sec, 19),
            fat_size_16:           le16(sec, 22),
            total_sectors_32:      le32(sec, 32),
            fat_size_32:           le32(sec, 36),
            root_cluster:          le32(sec, 44),
        };
        bs.validate()?;
        Ok(bs)
    }

    fn validate(&self) -> Result<(), FsError> {
        if !matches!(self.bytes_per_sector, 512 | 1024 | 2048 | 4096) {
            return Err(FsError::InvalidBootSector("bytes per sector must be 512, 1024, 2048 or 4096"));
        }
        if self.sectors_per_cluster == 0 || !self.sectors_per_cluster.is_power_of_two() {
            return Err(FsError::InvalidBootSector("sectors per cluster must be a non-zero power of two"));
        }
        if self.reserved_sector_count == 0 {
            return Err(FsError::InvalidBootSector("reserved sector count is zero"));
        }
        if self.num_fats == 0 {
            return Err(FsError::InvalidBootSector("FAT count is zero"));
        }
        // FAT12/FAT16 have fat_size_16 != 0; only FAT32 is supported.
        if self.fat_size_16 != 0 || self.fat_size_32 == 0 {
            return Err(FsError::InvalidBootSector("not a FAT32 volume"));
        }
        let geo = Geometry::from_boot_sector(self);
        if geo.first_data_sector >= geo.total_sectors || geo.total_clusters == 0 {
            return Err(FsError::InvalidBootSector("data region is empty"));
        }
        if !geo.is_data_cluster(self.root_cluster) {
            return Err(FsError::InvalidBootSector("root cluster outside the data region"));
        }
        Ok(())
    }

    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_32 != 0 { self.total_sectors_32 } else { self.total_sectors_16 as u32 }
    }
}

// ─── Geometry ──────────────────────────────────────────────────────────────────

/// Sector and cluster addressing for a mounted volume. Pure arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub bytes_per_sector:    u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors:    u32,
    pub num_fats:            u32,
    pub fat_size:            u32,
    pub root_cluster:        u32,
    pub total_sectors:       u32,
    pub first_data_sector:   u32,
    pub total_clusters:      u32,
}

impl Geometry {
    pub fn from_boot_sector(bs: &BootSector) -> Self {
        let bytes_per_sector    = bs.bytes_per_sector as u32;
        let sectors_per_cluster = bs.sectors_per_cluster.max(1) as u32;
        let reserved_sectors    = bs.reserved_sector_count as u32;
        let num_fats            = bs.num_fats as u32;
        let fat_size            = bs.fat_size_32;
        let total_sectors       = bs.total_sectors();

        let first_data_sector = reserved_sectors.saturating_add(num_fats.saturating_mul(fat_size));
        let total_clusters    = total_sectors.saturating_sub(first_data_sector) / sectors_per_cluster;

        Self {
            bytes_per_sector, sectors_per_cluster, reserved_sectors, num_fats, fat_size,
            root_cluster: bs.root_cluster, total_sectors, first_data_sector, total_clusters,
        }
    }

    /// First sector of `cluster`. Callers must have checked `is_data_cluster`.
    pub fn cluster_to_sector(&self, cluster: u32) -> u64 {
        debug_assert!(cluster >= 2);
        self.first_data_sector as u64 + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }

    pub fn cluster_offset(&self, cluster: u32) -> u64 {
        self.cluster_to_sector(cluster) * self.bytes_per_sector as u64
    }

    pub fn cluster_size(&self) -> usize {
        (self.sectors_per_cluster * self.bytes_per_sector) as usize
    }

    pub fn entries_per_cluster(&self) -> usize { self.cluster_size() / crate::dir::DIR_ENTRY_SIZE }

    /// Byte offset of the first FAT copy.
    pub fn fat_offset(&self) -> u64 { self.reserved_sectors as u64 * self.bytes_per_sector as u64 }

    pub fn fat_entry_offset(&self, cluster: u32) -> u64 { self.fat_offset() + cluster as u64 * 4 }

    /// Number of 4-byte slots one FAT copy can hold.
    pub fn fat_entry_count(&self) -> u32 {
        ((self.fat_size as u64 * self.bytes_per_sector as u64) / 4).min(u32::MAX as u64) as u32
    }

    /// Highest cluster that is both backed by data sectors and described by the FAT.
    pub fn max_cluster(&self) -> u32 {
        (self.total_clusters + 1).min(self.fat_entry_count().saturating_sub(1))
    }

    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        cluster >= 2 && cluster <= self.max_cluster()
    }

    pub fn image_size(&self) -> u64 { self.total_sectors as u64 * self.bytes_per_sector as u64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bpb(bps: u16, spc: u8, reserved: u16, fats: u8, fat_size: u32, total: u32) -> [u8; 512] {
        let mut sec = [0u8; 512];
        sec[11..13].copy_from_slice(&bps.to_le_bytes());
        sec[13] = spc;
        sec[14..16].copy_from_slice(&reserved.to_le_bytes());
        sec[16] = fats;
        sec[32..36].copy_from_slice(&total.to_le_bytes());
        sec[36..40].copy_from_slice(&fat_size.to_le_bytes());
        sec[44..48].copy_from_slice(&2u32.to_le_bytes());
        sec[510] = 0x55;
        sec[511] = 0xAA;
        sec
    }

    #[test]
    fn parse_typical_volume() {
        let sec = bpb(512, 8, 32, 2, 1000, 262_144);
        let bs = BootSector::parse(&sec).unwrap();
        assert_eq!(bs.bytes_per_sector, 512);
        assert_eq!(bs.sectors_per_cluster, 8);
        assert_eq!(bs.reserved_sector_count, 32);
        assert_eq!(bs.num_fats, 2);
        assert_eq!(bs.fat_size_32, 1000);
        assert_eq!(bs.root_cluster, 2);
    }

    #[test]
    fn geometry_constants() {
        let bs = BootSector::parse(&bpb(512, 8, 32, 2, 1000, 262_144)).unwrap();
        let geo = Geometry::from_boot_sector(&bs);
        assert_eq!(geo.first_data_sector, 32 + 2 * 1000);
        assert_eq!(geo.cluster_to_sector(2), 2032);
        assert_eq!(geo.cluster_to_sector(5), 2032 + 3 * 8);
        assert_eq!(geo.cluster_offset(3), (2032 + 8) * 512);
        assert_eq!(geo.cluster_size(), 4096);
        assert_eq!(geo.entries_per_cluster(), 128);
        assert_eq!(geo.total_clusters, (262_144 - 2032) / 8);
        assert_eq!(geo.fat_entry_count(), 1000 * 512 / 4);
        assert_eq!(geo.fat_entry_offset(7), 32 * 512 + 28);
        assert_eq!(geo.image_size(), 262_144 * 512);
    }

    #[test]
    fn cluster_range_is_bounded_by_fat_and_data() {
        let bs = BootSector::parse(&bpb(512, 1, 32, 2, 1, 200)).unwrap();
        let geo = Geometry::from_boot_sector(&bs);
        // one FAT sector describes 128 clusters, data region has 166
        assert_eq!(geo.max_cluster(), 127);
        assert!(!geo.is_data_cluster(0));
        assert!(!geo.is_data_cluster(1));
        assert!(geo.is_data_cluster(2));
        assert!(geo.is_data_cluster(127));
        assert!(!geo.is_data_cluster(128));
    }

    #[test]
    fn reject_missing_signature() {
        let mut sec = bpb(512, 8, 32, 2, 1000, 262_144);
        sec[511] = 0;
        assert!(matches!(BootSector::parse(&sec), Err(FsError::InvalidBootSector(_))));
    }

    #[test]
    fn reject_odd_sector_size() {
        let sec = bpb(500, 8, 32, 2, 1000, 262_144);
        assert!(matches!(BootSector::parse(&sec), Err(FsError::InvalidBootSector(_))));
    }

    #[test]
    fn reject_fat16() {
        let mut sec = bpb(512, 8, 32, 2, 1000, 262_144);
        sec[22..24].copy_from_slice(&9u16.to_le_bytes());
        assert!(matches!(BootSector::parse(&sec), Err(FsError::InvalidBootSector(_))));
    }

    #[test]
    fn reject_blank_sector() {
        assert!(BootSector::parse(&[0u8; 512]).is_err());
    }
}
