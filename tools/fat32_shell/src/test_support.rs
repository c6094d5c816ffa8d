//! Test fixtures shared by the unit tests.

use std::io::{self, Cursor, Read, Write};

use crate::disk::BlockDev;

// ── Mock block device backed by Vec<u8> ──────────────────────────────────────

/// In-memory image that records every write as `(offset, len)`.
pub struct MemDisk {
    pub data:   Vec<u8>,
    pub writes: Vec<(u64, usize)>,
}

impl MemDisk {
    pub fn new(data: Vec<u8>) -> Self { MemDisk { data, writes: Vec::new() } }

    /// Writes that overlap `[offset, offset + len)`.
    pub fn writes_to(&self, offset: u64, len: usize) -> usize {
        let end = offset + len as u64;
        self.writes.iter().filter(|&&(o, l)| o < end && o + l as u64 > offset).count()
    }
}

impl BlockDev for MemDisk {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let off = offset as usize;
        if off + buf.len() > self.data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "read past end"));
        }
        buf.copy_from_slice(&self.data[off..off + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let off = offset as usize;
        if off + buf.len() > self.data.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "write past end"));
        }
        self.data[off..off + buf.len()].copy_from_slice(buf);
        self.writes.push((offset, buf.len()));
        Ok(())
    }
}

// ── Hand-built images ────────────────────────────────────────────────────────

pub const TINY_RESERVED: u32 = 32;

/// A minimal FAT32 volume: 512-byte sectors, one sector per cluster (16
/// directory entries), two FATs, `clusters` data clusters, empty root at 2.
pub fn tiny_image(clusters: u32) -> MemDisk {
    let bps = 512u32;
    let fat_size = ((clusters + 2) * 4).div_ceil(bps);
    let total = TINY_RESERVED + 2 * fat_size + clusters;
    let mut data = vec![0u8; (total * bps) as usize];

    data[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
    data[3..11].copy_from_slice(b"MSWIN4.1");
    data[11..13].copy_from_slice(&(bps as u16).to_le_bytes());
    data[13] = 1;
    data[14..16].copy_from_slice(&(TINY_RESERVED as u16).to_le_bytes());
    data[16] = 2;
    data[21] = 0xF8;
    data[32..36].copy_from_slice(&total.to_le_bytes());
    data[36..40].copy_from_slice(&fat_size.to_le_bytes());
    data[44..48].copy_from_slice(&2u32.to_le_bytes());
    data[510] = 0x55;
    data[511] = 0xAA;

    for copy in 0..2 {
        let fat = ((TINY_RESERVED + copy * fat_size) * bps) as usize;
        data[fat..fat + 4].copy_from_slice(&0x0FFF_FFF8u32.to_le_bytes());
        data[fat + 4..fat + 8].copy_from_slice(&0x0FFF_FFFFu32.to_le_bytes());
        data[fat + 8..fat + 12].copy_from_slice(&0x0FFF_FFFFu32.to_le_bytes());
    }
    MemDisk::new(data)
}

// ── fatfs-built images ───────────────────────────────────────────────────────

/// Create an in-memory FAT32 image using the `fatfs` std crate.
///
/// FAT32 requires ≥65 525 data clusters, so the image must be ~34 MB or more
/// for `fatfs` to pick FAT32. We use 40 MB.
pub fn make_disk() -> MemDisk {
    const SIZE: usize = 40 * 1024 * 1024;
    let mut cursor = Cursor::new(vec![0u8; SIZE]);
    fatfs::format_volume(
        &mut cursor,
        fatfs::FormatVolumeOptions::new().fat_type(fatfs::FatType::Fat32),
    ).expect("format_volume failed");
    MemDisk::new(cursor.into_inner())
}

/// Format a volume and populate its root via `fatfs`: `dirs` become
/// directories, `files` become files with the given content.
pub fn disk_with(dirs: &[&str], files: &[(&str, &[u8])]) -> MemDisk {
    let mut disk = make_disk();
    {
        let mut cursor = Cursor::new(&mut disk.data);
        let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new())
            .expect("FileSystem::new failed");
        let root = fs.root_dir();
        for name in dirs {
            root.create_dir(name).expect("create_dir failed");
        }
        for (name, content) in files {
            let mut f = root.create_file(name).expect("create_file failed");
            f.truncate().unwrap();
            f.write_all(content).unwrap();
        }
    }
    disk
}

/// Names and directory flags of `path` (relative to root) as `fatfs` sees them.
pub fn list_via_fatfs(disk: &mut MemDisk, path: &str) -> Vec<(String, bool)> {
    let mut cursor = Cursor::new(&mut disk.data);
    let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new()).unwrap();
    let dir = if path.is_empty() { fs.root_dir() } else { fs.root_dir().open_dir(path).unwrap() };
    dir.iter().map(|e| e.unwrap()).map(|e| (e.file_name(), e.is_dir())).collect()
}

/// Contents of file `path` as `fatfs` reads it.
pub fn read_via_fatfs(disk: &mut MemDisk, path: &str) -> Vec<u8> {
    let mut cursor = Cursor::new(&mut disk.data);
    let fs = fatfs::FileSystem::new(&mut cursor, fatfs::FsOptions::new()).unwrap();
    let mut f = fs.root_dir().open_file(path).unwrap();
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).unwrap();
    buf
}
