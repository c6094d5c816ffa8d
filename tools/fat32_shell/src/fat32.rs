/// Minimal read/write FAT32 driver.
///
/// Assumes the FAT32 volume starts at byte 0 of the image (raw image, no MBR).
/// Short names only; long-name fragments are recognised and skipped.
///
/// All disk I/O is abstracted behind `BlockDev`, making the driver
/// unit-testable with an in-memory mock. The FAT chain manager lives in
/// `fat.rs`, directory operations in `dir_ops.rs` and file data in
/// `file_io.rs`; all of them extend `Fat32`.

use crate::disk::BlockDev;
use crate::error::FsError;
use crate::geometry::{BOOT_SECTOR_SIZE, BootSector, Geometry};

// ─── Public types ──────────────────────────────────────────────────────────────

pub struct Fat32<D> {
    pub disk: D,
    pub boot: BootSector,
    pub geo:  Geometry,
}

// ─── Implementation ────────────────────────────────────────────────────────────

impl<D: BlockDev> Fat32<D> {
    /// Mount a FAT32 volume: parse the BPB from sector 0 and derive the layout.
    pub fn mount(mut disk: D) -> Result<Self, FsError> {
        let mut sec = [0u8; BOOT_SECTOR_SIZE];
        disk.read_at(0, &mut sec)?;
        let boot = BootSector::parse(&sec)?;
        let geo = Geometry::from_boot_sector(&boot);
        log::info!(
            "mounted FAT32: {} bytes/sector, {} sectors/cluster, {} clusters, root at {}",
            geo.bytes_per_sector, geo.sectors_per_cluster, geo.total_clusters, geo.root_cluster
        );
        Ok(Self { disk, boot, geo })
    }

    pub fn root_cluster(&self) -> u32 { self.geo.root_cluster }

    pub fn into_disk(self) -> D { self.disk }

    pub(crate) fn check_cluster(&self, cluster: u32) -> Result<(), FsError> {
        if self.geo.is_data_cluster(cluster) { Ok(()) } else { Err(FsError::BadCluster(cluster)) }
    }

    // ─── Cluster I/O ───────────────────────────────────────────────────────────

    /// Read one whole cluster in a single positioned read.
    pub fn read_cluster(&mut self, cluster: u32) -> Result<Vec<u8>, FsError> {
        self.check_cluster(cluster)?;
        let mut buf = vec![0u8; self.geo.cluster_size()];
        self.disk.read_at(self.geo.cluster_offset(cluster), &mut buf)?;
        Ok(buf)
    }

    /// Write one whole cluster in a single positioned write.
    pub fn write_cluster(&mut self, cluster: u32, data: &[u8]) -> Result<(), FsError> {
        self.check_cluster(cluster)?;
        debug_assert_eq!(data.len(), self.geo.cluster_size());
        log::trace!("write cluster {cluster}");
        self.disk.write_at(self.geo.cluster_offset(cluster), data)?;
        Ok(())
    }
}
