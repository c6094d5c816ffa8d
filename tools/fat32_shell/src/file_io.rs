/// File data access along cluster chains.
///
/// Offsets are byte positions within the file. A file with starting cluster 0
/// has no data clusters yet; its first write allocates one.

use crate::dir::{DIR_ENTRY_SIZE, DirEntry};
use crate::disk::BlockDev;
use crate::error::FsError;
use crate::fat32::Fat32;
use crate::open_files::{Access, OpenFile};

impl<D: BlockDev> Fat32<D> {
    /// Up to `len` bytes from `offset`, never past `size`.
    pub fn read_file(&mut self, start: u32, size: u32, offset: u32, len: u32) -> Result<Vec<u8>, FsError> {
        let end = size.min(offset.saturating_add(len));
        if start == 0 || offset >= end {
            return Ok(Vec::new());
        }
        let cs = self.geo.cluster_size() as u64;
        let chain = self.chain(start)?;
        let mut out = Vec::with_capacity((end - offset) as usize);
        let mut pos = offset as u64;

        while pos < end as u64 {
            let idx = (pos / cs) as usize;
            let Some(&cluster) = chain.get(idx) else {
                log::warn!("chain from {start} ends before byte {pos} of a {size}-byte file");
                break;
            };
            let data = self.read_cluster(cluster)?;
            let from = (pos % cs) as usize;
            let to = (cs as usize).min(from + (end as u64 - pos) as usize);
            out.extend_from_slice(&data[from..to]);
            pos += (to - from) as u64;
        }
        Ok(out)
    }

    /// Write `data` at `offset`, growing the chain as needed. Returns the
    /// (possibly newly allocated) starting cluster.
    pub fn write_file(&mut self, start: u32, offset: u32, data: &[u8]) -> Result<u32, FsError> {
        if data.is_empty() {
            return Ok(start);
        }
        let end = offset as u64 + data.len() as u64;
        if end > u32::MAX as u64 {
            return Err(FsError::NoSpace);
        }
        let cs = self.geo.cluster_size() as u64;
        let needed = end.div_ceil(cs) as usize;

        let mut chain = if start == 0 { Vec::new() } else { self.chain(start)? };
        let fresh = self.find_free_clusters(needed.saturating_sub(chain.len()))?;
        for &c in &fresh {
            match chain.last() {
                Some(&tail) => self.extend_chain(tail, c)?,
                None => self.terminate_chain(c)?,
            }
            chain.push(c);
        }

        let mut pos = offset as u64;
        let mut rest = data;
        while !rest.is_empty() {
            let cluster = chain[(pos / cs) as usize];
            let mut buf = if fresh.contains(&cluster) {
                vec![0u8; cs as usize]
            } else {
                self.read_cluster(cluster)?
            };
            let from = (pos % cs) as usize;
            let n = rest.len().min(cs as usize - from);
            buf[from..from + n].copy_from_slice(&rest[..n]);
            self.write_cluster(cluster, &buf)?;
            rest = &rest[n..];
            pos += n as u64;
        }
        log::debug!("wrote {} bytes at {offset} into chain {}", data.len(), chain[0]);
        Ok(chain[0])
    }

    /// Read through an open handle and advance its offset.
    pub fn read_open(&mut self, file: &mut OpenFile, len: u32) -> Result<Vec<u8>, FsError> {
        if !file.mode.contains(Access::READ) {
            return Err(FsError::AccessDenied { name: file.name.clone(), needed: "reading" });
        }
        let bytes = self.read_file(file.cluster, file.size, file.offset, len)?;
        file.offset += bytes.len() as u32;
        Ok(bytes)
    }

    /// Write through an open handle, persist the entry's cluster and size, and
    /// advance the offset.
    pub fn write_open(&mut self, file: &mut OpenFile, data: &[u8]) -> Result<(), FsError> {
        if !file.mode.contains(Access::WRITE) {
            return Err(FsError::AccessDenied { name: file.name.clone(), needed: "writing" });
        }
        let start = self.write_file(file.cluster, file.offset, data)?;
        let size = file.size.max(file.offset + data.len() as u32);

        let raw = self.read_cluster(file.entry_cluster)?;
        let off = file.entry_slot * DIR_ENTRY_SIZE;
        let mut entry = DirEntry::decode(&raw[off..off + DIR_ENTRY_SIZE]);
        if entry.cluster != start || entry.size != size {
            entry.cluster = start;
            entry.size = size;
            self.update_entry(file.entry_cluster, file.entry_slot, &entry)?;
        }

        file.cluster = start;
        file.size = size;
        file.offset += data.len() as u32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::EntryKind;
    use crate::test_support::{MemDisk, disk_with, read_via_fatfs, tiny_image};

    fn open(fs: &mut Fat32<MemDisk>, name: &str, mode: Access) -> OpenFile {
        let root = fs.root_cluster();
        let l = fs.lookup_kind(root, name, EntryKind::File).unwrap();
        OpenFile {
            name: name.into(), cluster: l.entry.cluster, entry_cluster: l.cluster, entry_slot: l.slot,
            mode, offset: 0, size: l.entry.size, path: "img".into(),
        }
    }

    #[test]
    fn read_file_written_by_fatfs() {
        let content: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let mut fs = Fat32::mount(disk_with(&[], &[("DATA.BIN", content.as_slice())])).unwrap();
        let mut f = open(&mut fs, "DATA    BIN", Access::READ);
        assert_eq!(fs.read_open(&mut f, 10_000).unwrap(), content);
        assert_eq!(f.offset, 3000);
        assert!(fs.read_open(&mut f, 10).unwrap().is_empty());
    }

    #[test]
    fn read_across_cluster_boundary() {
        let content: Vec<u8> = (0..2048u32).map(|i| (i * 7) as u8).collect();
        let mut fs = Fat32::mount(disk_with(&[], &[("X.BIN", content.as_slice())])).unwrap();
        let l = fs.lookup(fs.root_cluster(), "X       BIN").unwrap().unwrap();
        let got = fs.read_file(l.entry.cluster, l.entry.size, 500, 100).unwrap();
        assert_eq!(got, &content[500..600]);
        let tail = fs.read_file(l.entry.cluster, l.entry.size, 2000, 500).unwrap();
        assert_eq!(tail, &content[2000..]);
    }

    #[test]
    fn write_grows_empty_file_and_fatfs_reads_it() {
        let mut fs = Fat32::mount(disk_with(&[], &[("NOTE.TXT", b"")])).unwrap();
        let mut f = open(&mut fs, "NOTE    TXT", Access::all());
        assert_eq!(f.cluster, 0);

        let text: Vec<u8> = b"hello fat32 ".iter().copied().cycle().take(1500).collect();
        fs.write_open(&mut f, &text).unwrap();
        assert_ne!(f.cluster, 0);
        assert_eq!(f.size, 1500);
        let clusters = 1500usize.div_ceil(fs.geo.cluster_size());
        assert_eq!(fs.chain(f.cluster).unwrap().len(), clusters);

        f.offset = 0;
        assert_eq!(fs.read_open(&mut f, 1500).unwrap(), text);
        let mut disk = fs.into_disk();
        assert_eq!(read_via_fatfs(&mut disk, "NOTE.TXT"), text);
    }

    #[test]
    fn overwrite_in_the_middle_keeps_size() {
        let mut fs = Fat32::mount(disk_with(&[], &[("A.TXT", b"0123456789")])).unwrap();
        let mut f = open(&mut fs, "A       TXT", Access::all());
        f.offset = 3;
        fs.write_open(&mut f, b"abc").unwrap();
        assert_eq!(f.size, 10);
        assert_eq!(f.offset, 6);
        f.offset = 0;
        assert_eq!(fs.read_open(&mut f, 100).unwrap(), b"012abc6789");
    }

    #[test]
    fn append_extends_size() {
        let mut fs = Fat32::mount(tiny_image(32)).unwrap();
        let root = fs.root_cluster();
        fs.create_file(root, "LOG", false).unwrap();
        let mut f = open(&mut fs, "LOG", Access::WRITE);
        fs.write_open(&mut f, &[b'a'; 400]).unwrap();
        fs.write_open(&mut f, &[b'b'; 400]).unwrap();
        assert_eq!(f.size, 800);

        let entry = fs.lookup(root, "LOG").unwrap().unwrap().entry;
        assert_eq!(entry.size, 800);
        assert_eq!(fs.chain(entry.cluster).unwrap().len(), 2);
        let data = fs.read_file(entry.cluster, entry.size, 390, 20).unwrap();
        assert_eq!(data, [&[b'a'; 10][..], &[b'b'; 10][..]].concat());
    }

    #[test]
    fn access_mode_is_enforced() {
        let mut fs = Fat32::mount(disk_with(&[], &[("A.TXT", b"data")])).unwrap();
        let mut ro = open(&mut fs, "A       TXT", Access::READ);
        assert!(matches!(fs.write_open(&mut ro, b"x"), Err(FsError::AccessDenied { .. })));
        let mut wo = open(&mut fs, "A       TXT", Access::WRITE);
        assert!(matches!(fs.read_open(&mut wo, 1), Err(FsError::AccessDenied { .. })));
    }

    #[test]
    fn write_without_space_changes_nothing() {
        let mut fs = Fat32::mount(tiny_image(3)).unwrap();
        let root = fs.root_cluster();
        fs.create_file(root, "BIG", false).unwrap();
        let mut f = open(&mut fs, "BIG", Access::WRITE);
        let snapshot = fs.disk.data.clone();
        // one cluster left in the volume, three needed
        assert!(matches!(fs.write_open(&mut f, &[1u8; 1300]), Err(FsError::NoSpace)));
        assert!(fs.disk.data == snapshot);
        assert_eq!((f.size, f.offset), (0, 0));
    }
}
