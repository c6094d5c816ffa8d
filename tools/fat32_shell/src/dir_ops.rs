/// Directory operations: listing, lookup, and entry creation.
///
/// A directory is walked along its whole FAT chain, head cluster first, up to
/// the first end marker. Creation finds its slot and every cluster it needs
/// before the first FAT write, so a failure leaves the volume untouched.

use crate::dir::{self, DirEntry, EntryKind};
use crate::disk::BlockDev;
use crate::error::FsError;
use crate::fat32::Fat32;

/// A directory record together with where it lives on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub entry:   DirEntry,
    /// Cluster of the directory chain holding the record.
    pub cluster: u32,
    /// Index of the record within that cluster.
    pub slot:    usize,
}

/// Every cluster of a directory and its slots up to and including the first
/// end marker.
struct DirScan {
    chain: Vec<u32>,
    slots: Vec<Located>,
}

/// Names that can never be created. A leading NUL would read as the end
/// marker and a leading 0x05 as an escaped 0xE5.
fn check_name(name: &str) -> Result<(), FsError> {
    let lead = name.as_bytes().first().copied();
    if name.is_empty() || name == "." || name == ".." || name.contains('/')
        || matches!(lead, Some(0x00 | dir::ESCAPED_E5))
    {
        return Err(FsError::InvalidName(name.into()));
    }
    Ok(())
}

impl<D: BlockDev> Fat32<D> {
    /// Map the on-disk "root" alias (cluster 0, as stored in `..`) to the root.
    pub fn resolve_dir(&self, cluster: u32) -> u32 {
        if cluster == 0 { self.geo.root_cluster } else { cluster }
    }

    fn scan(&mut self, dir: u32) -> Result<DirScan, FsError> {
        let chain = self.chain(self.resolve_dir(dir))?;
        let mut slots = Vec::new();
        'walk: for &cluster in &chain {
            let bytes = self.read_cluster(cluster)?;
            for (slot, entry) in dir::decode(&bytes).into_iter().enumerate() {
                slots.push(Located { entry, cluster, slot });
                if entry.kind() == EntryKind::End { break 'walk; }
            }
        }
        Ok(DirScan { chain, slots })
    }

    /// Files and subdirectories of `dir` in on-disk order. Long-name
    /// fragments, volume labels and deleted slots are skipped.
    pub fn list(&mut self, dir: u32) -> Result<Vec<DirEntry>, FsError> {
        Ok(self.scan(dir)?.slots.into_iter()
            .map(|l| l.entry)
            .filter(DirEntry::is_visible)
            .collect())
    }

    /// First visible entry of `dir` whose name is exactly `name`.
    pub fn lookup(&mut self, dir: u32, name: &str) -> Result<Option<Located>, FsError> {
        Ok(self.scan(dir)?.slots.into_iter()
            .find(|l| l.entry.is_visible() && l.entry.name_matches(name)))
    }

    /// Like `lookup`, but the entry must exist and be of `kind`.
    pub fn lookup_kind(&mut self, dir: u32, name: &str, kind: EntryKind) -> Result<Located, FsError> {
        match self.lookup(dir, name)? {
            None => Err(FsError::NotFound(name.into())),
            Some(l) if l.entry.kind() != kind => {
                Err(FsError::WrongKind { name: name.into(), wanted: kind })
            }
            Some(l) => Ok(l),
        }
    }

    /// Head cluster of the parent of `dir`, read from its `..` entry.
    pub fn parent_of(&mut self, dir: u32) -> Result<u32, FsError> {
        let dir = self.resolve_dir(dir);
        if dir == self.geo.root_cluster {
            return Ok(dir);
        }
        match self.lookup(dir, "..")? {
            Some(l) => Ok(self.resolve_dir(l.entry.cluster)),
            None => {
                log::warn!("directory at cluster {dir} has no '..' entry, assuming root");
                Ok(self.geo.root_cluster)
            }
        }
    }

    /// Create subdirectory `name` in `parent` and return its cluster.
    pub fn make_directory(&mut self, parent: u32, name: &str, grow: bool) -> Result<u32, FsError> {
        self.create_entry(parent, name, EntryKind::Directory, grow)
    }

    /// Create an empty file `name` in `parent` and return its cluster.
    pub fn create_file(&mut self, parent: u32, name: &str, grow: bool) -> Result<u32, FsError> {
        self.create_entry(parent, name, EntryKind::File, grow)
    }

    /// Overwrite the record at `cluster`/`slot` with `entry`.
    pub fn update_entry(&mut self, cluster: u32, slot: usize, entry: &DirEntry) -> Result<(), FsError> {
        let mut bytes = self.read_cluster(cluster)?;
        let off = slot * dir::DIR_ENTRY_SIZE;
        entry.encode(&mut bytes[off..off + dir::DIR_ENTRY_SIZE]);
        self.write_cluster(cluster, &bytes)
    }

    fn create_entry(&mut self, parent: u32, name: &str, kind: EntryKind, grow: bool) -> Result<u32, FsError> {
        check_name(name)?;
        let parent = self.resolve_dir(parent);
        let scan = self.scan(parent)?;

        let stored = dir::pad_name(name);
        if name.len() > dir::SHORT_NAME_LEN {
            log::warn!("name '{name}' stored as '{}'", dir::stored_name(name));
        }
        if scan.slots.iter().any(|l| l.entry.is_visible() && l.entry.name == stored) {
            return Err(FsError::AlreadyExists(name.into()));
        }

        let free = scan.slots.iter().find(|l| l.entry.is_free()).copied();
        if free.is_none() && !grow {
            return Err(FsError::DirectoryFull);
        }

        // Claim nothing until every cluster is known to be available.
        let clusters = self.find_free_clusters(if free.is_some() { 1 } else { 2 })?;
        let cluster = clusters[0];
        self.terminate_chain(cluster)?;

        if kind == EntryKind::Directory {
            let own_parent = if parent == self.geo.root_cluster { 0 } else { parent };
            let mut bytes = vec![0u8; self.geo.cluster_size()];
            bytes[..2 * dir::DIR_ENTRY_SIZE].copy_from_slice(&dir::encode(&dir::dot_entries(cluster, own_parent)));
            self.write_cluster(cluster, &bytes)?;
        }

        let (slot_cluster, slot, was_end) = match free {
            Some(l) => (l.cluster, l.slot, l.entry.kind() == EntryKind::End),
            None => {
                let ext = clusters[1];
                let tail = scan.chain.last().copied().unwrap_or(parent);
                self.write_cluster(ext, &vec![0u8; self.geo.cluster_size()])?;
                self.extend_chain(tail, ext)?;
                log::debug!("directory {parent} grown by cluster {ext}");
                (ext, 0, true)
            }
        };

        let entry = match kind {
            EntryKind::Directory => DirEntry::new_dir(name, cluster),
            _ => DirEntry::new_file(name, cluster),
        };
        let mut bytes = self.read_cluster(slot_cluster)?;
        let off = slot * dir::DIR_ENTRY_SIZE;
        entry.encode(&mut bytes[off..off + dir::DIR_ENTRY_SIZE]);

        // The consumed end marker moves one slot down.
        if was_end {
            let next = off + dir::DIR_ENTRY_SIZE;
            if next < bytes.len() {
                DirEntry::mark_end(&mut bytes[next..]);
            } else if let Some(pos) = scan.chain.iter().position(|&c| c == slot_cluster)
                && let Some(&following) = scan.chain.get(pos + 1)
            {
                let mut head = self.read_cluster(following)?;
                DirEntry::mark_end(&mut head);
                self.write_cluster(following, &head)?;
            }
        }
        self.write_cluster(slot_cluster, &bytes)?;

        log::info!("created {kind:?} '{name}' at cluster {cluster} in directory {parent}");
        Ok(cluster)
    }
}
