/// Byte-addressed access to the backing FAT32 image.
///
/// Every call positions itself before transferring. Nothing may rely on where
/// a previous call left the underlying cursor.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

// ─── Block device abstraction ──────────────────────────────────────────────────

pub trait BlockDev {
    /// Fill `buf` from `offset`. A short read is an error, never zero-filled.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
    /// Write all of `buf` at `offset`. Writing past the end of the image is an error.
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;
}

// ─── Image file backend ────────────────────────────────────────────────────────

/// A seekable image of fixed length. Never grows: the volume size is fixed at
/// format time and a write past it means the geometry is wrong.
pub struct ImageFile<F> {
    inner: F,
    len:   u64,
}

impl ImageFile<File> {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::new(file)
    }
}

impl<F: Read + Write + Seek> ImageFile<F> {
    pub fn new(mut inner: F) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len })
    }

    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn into_inner(self) -> F { self.inner }

    fn check_range(&self, offset: u64, len: usize) -> io::Result<()> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{len} bytes at {offset:#x} run past the end of the image ({:#x})", self.len),
            )),
        }
    }
}

impl<F: Read + Write + Seek> BlockDev for ImageFile<F> {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.check_range(offset, buf.len())?;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.check_range(offset, buf.len())?;
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(buf)?;
        self.inner.flush()
    }
}
