/// Directory entry codec: 32-byte on-disk records <-> `DirEntry`.
///
/// Names are the raw 11-byte short-name field. No 8.3 split, no dot
/// insertion, no case folding: `FOO.TXT` is stored as `FOO.TXT    `.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

// ─── Constants ─────────────────────────────────────────────────────────────────

pub const DIR_ENTRY_SIZE: usize = 32;
pub const SHORT_NAME_LEN: usize = 11;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attr: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN    = 0x02;
        const SYSTEM    = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE   = 0x20;
        const LONG_NAME = Self::READ_ONLY.bits() | Self::HIDDEN.bits()
                        | Self::SYSTEM.bits() | Self::VOLUME_ID.bits();

        // The disk may set any bits
        const _ = !0;
    }
}

/// Special values of the first name byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, TryFromPrimitive, IntoPrimitive, PartialEq, Eq)]
enum NameMarker {
    End     = 0x00,
    Deleted = 0xE5,
}

/// Stand-in for a real 0xE5 lead byte in a stored name.
pub const ESCAPED_E5: u8 = 0x05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// No more entries in this directory.
    End,
    Deleted,
    LongName,
    VolumeLabel,
    Directory,
    File,
}

// ─── Directory entry (32 bytes) ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name:       [u8; SHORT_NAME_LEN],
    pub attr:       Attr,
    pub nt_res:     u8,
    pub crt_tenths: u8,
    pub crt_time:   u16,
    pub crt_date:   u16,
    pub acc_date:   u16,
    pub wrt_time:   u16,
    pub wrt_date:   u16,
    pub cluster:    u32,
    pub size:       u32,
}

impl DirEntry {
    /// The end-of-directory marker: an all-zero record.
    pub const END: DirEntry = DirEntry {
        name: [0; SHORT_NAME_LEN], attr: Attr::empty(),
        nt_res: 0, crt_tenths: 0, crt_time: 0, crt_date: 0, acc_date: 0,
        wrt_time: 0, wrt_date: 0, cluster: 0, size: 0,
    };

    pub fn new(name: &str, attr: Attr, cluster: u32, size: u32) -> Self {
        DirEntry { name: pad_name(name), attr, cluster, size, ..Self::END }
    }

    pub fn new_dir(name: &str, cluster: u32) -> Self { Self::new(name, Attr::DIRECTORY, cluster, 0) }

    pub fn new_file(name: &str, cluster: u32) -> Self { Self::new(name, Attr::ARCHIVE, cluster, 0) }

    pub fn decode(raw: &[u8]) -> Self {
        let le16 = |off: usize| u16::from_le_bytes([raw[off], raw[off + 1]]);
        let mut name = [0u8; SHORT_NAME_LEN];
        name.copy_from_slice(&raw[0..SHORT_NAME_LEN]);
        DirEntry {
            name,
            attr:       Attr::from_bits_retain(raw[11]),
            nt_res:     raw[12],
            crt_tenths: raw[13],
            crt_time:   le16(14),
            crt_date:   le16(16),
            acc_date:   le16(18),
            wrt_time:   le16(22),
            wrt_date:   le16(24),
            cluster:    ((le16(20) as u32) << 16) | le16(26) as u32,
            size:       u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    pub fn encode(&self, raw: &mut [u8]) {
        raw[0..SHORT_NAME_LEN].copy_from_slice(&self.name);
        raw[11] = self.attr.bits();
        raw[12] = self.nt_res;
        raw[13] = self.crt_tenths;
        raw[14..16].copy_from_slice(&self.crt_time.to_le_bytes());
        raw[16..18].copy_from_slice(&self.crt_date.to_le_bytes());
        raw[18..20].copy_from_slice(&self.acc_date.to_le_bytes());
        raw[20..22].copy_from_slice(&((self.cluster >> 16) as u16).to_le_bytes());
        raw[22..24].copy_from_slice(&self.wrt_time.to_le_bytes());
        raw[24..26].copy_from_slice(&self.wrt_date.to_le_bytes());
        raw[26..28].copy_from_slice(&(self.cluster as u16).to_le_bytes());
        raw[28..32].copy_from_slice(&self.size.to_le_bytes());
    }

    pub fn kind(&self) -> EntryKind {
        match NameMarker::try_from(self.name[0]) {
            Ok(NameMarker::End) => EntryKind::End,
            Ok(NameMarker::Deleted) => EntryKind::Deleted,
            Err(_) if self.attr.contains(Attr::LONG_NAME) => EntryKind::LongName,
            Err(_) if self.attr.contains(Attr::VOLUME_ID) => EntryKind::VolumeLabel,
            Err(_) if self.attr.contains(Attr::DIRECTORY) => EntryKind::Directory,
            Err(_) => EntryKind::File,
        }
    }

    /// A slot a new entry may be written into.
    pub fn is_free(&self) -> bool { matches!(self.kind(), EntryKind::End | EntryKind::Deleted) }

    /// A file or directory the shell shows and looks up.
    pub fn is_visible(&self) -> bool { matches!(self.kind(), EntryKind::Directory | EntryKind::File) }

    /// Name bytes with the lead-byte escape undone and pad spaces stripped.
    fn name_bytes(&self) -> Vec<u8> {
        let end = self.name.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        let mut bytes = self.name[..end].to_vec();
        if bytes.first() == Some(&ESCAPED_E5) {
            bytes[0] = NameMarker::Deleted.into();
        }
        bytes
    }

    /// The name field with trailing pad spaces stripped.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name_bytes()).into_owned()
    }

    pub fn name_matches(&self, query: &str) -> bool {
        self.name_bytes() == query.as_bytes()
    }

    pub fn mark_end(raw: &mut [u8]) { raw[0] = NameMarker::End.into(); }
}

// ─── Cluster codec ─────────────────────────────────────────────────────────────

/// Split a directory cluster into its records, every slot included.
pub fn decode(cluster: &[u8]) -> Vec<DirEntry> {
    cluster.chunks_exact(DIR_ENTRY_SIZE).map(DirEntry::decode).collect()
}

/// Pack records back into bytes, one 32-byte slot each.
pub fn encode(entries: &[DirEntry]) -> Vec<u8> {
    let mut out = vec![0u8; entries.len() * DIR_ENTRY_SIZE];
    for (de, raw) in entries.iter().zip(out.chunks_exact_mut(DIR_ENTRY_SIZE)) {
        de.encode(raw);
    }
    out
}

/// Left-justify `name` in an 11-byte space-padded field. Longer names are cut.
/// A leading 0xE5 byte is stored as 0x05 so the record does not read as deleted.
pub fn pad_name(name: &str) -> [u8; SHORT_NAME_LEN] {
    let mut buf = [b' '; SHORT_NAME_LEN];
    for (i, b) in name.bytes().take(SHORT_NAME_LEN).enumerate() {
        buf[i] = b;
    }
    if buf[0] == u8::from(NameMarker::Deleted) {
        buf[0] = ESCAPED_E5;
    }
    buf
}

/// What `name` reads back as once stored.
pub fn stored_name(name: &str) -> String {
    DirEntry { name: pad_name(name), ..DirEntry::END }.name()
}

/// The `.` and `..` records that open every subdirectory. `parent` is 0 when
/// the parent is the root.
pub fn dot_entries(own: u32, parent: u32) -> [DirEntry; 2] {
    [DirEntry::new_dir(".", own), DirEntry::new_dir("..", parent)]
}
