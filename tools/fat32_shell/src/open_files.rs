use bitflags::bitflags;
use heapless::Vec;

use crate::error::FsError;

pub const MAX_OPEN_FILES: usize = 10;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Access: u8 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
    }
}

impl Access {
    /// Parse a shell mode token: `-r`, `-w`, `-rw` or `-wr`.
    pub fn parse(token: &str) -> Result<Self, FsError> {
        match token {
            "-r" => Ok(Access::READ),
            "-w" => Ok(Access::WRITE),
            "-rw" | "-wr" => Ok(Access::READ | Access::WRITE),
            _ => Err(FsError::InvalidMode(token.into())),
        }
    }

    pub fn label(self) -> &'static str {
        if self == Access::READ | Access::WRITE {
            "rw"
        } else if self.contains(Access::WRITE) {
            "w"
        } else {
            "r"
        }
    }
}

/// An open handle on a file of the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub name:    String,
    /// First cluster of the file data, 0 while the file is empty.
    pub cluster: u32,
    /// Directory cluster and slot holding the file's entry.
    pub entry_cluster: u32,
    pub entry_slot:    usize,
    pub mode:    Access,
    pub offset:  u32,
    pub size:    u32,
    /// Working-directory path at open time.
    pub path:    String,
}

/// Fixed-capacity table of open files, keyed by exact name.
#[derive(Debug, Default)]
pub struct OpenFileTable {
    files: Vec<OpenFile, MAX_OPEN_FILES>,
}

impl OpenFileTable {
    pub fn new() -> Self { Self::default() }

    pub fn is_open(&self, name: &str) -> bool { self.files.iter().any(|f| f.name == name) }

    pub fn insert(&mut self, file: OpenFile) -> Result<(), FsError> {
        if self.is_open(&file.name) {
            return Err(FsError::AlreadyOpen(file.name));
        }
        self.files.push(file).map_err(|_| FsError::TableFull)
    }

    pub fn remove(&mut self, name: &str) -> Result<OpenFile, FsError> {
        let idx = self.files.iter().position(|f| f.name == name)
            .ok_or_else(|| FsError::NotOpen(name.into()))?;
        Ok(self.files.remove(idx))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut OpenFile, FsError> {
        self.files.iter_mut().find(|f| f.name == name).ok_or_else(|| FsError::NotOpen(name.into()))
    }

    pub fn is_full(&self) -> bool { self.files.is_full() }

    pub fn len(&self) -> usize { self.files.len() }

    pub fn is_empty(&self) -> bool { self.files.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &OpenFile> { self.files.iter() }
}
