use core::fmt;
use std::io;

use crate::dir::EntryKind;

/// Every failure a shell command can report.
///
/// Only `Io` is fatal: the image may be half-written, so the session ends.
/// Everything else is reported at the command boundary and the loop goes on.
#[derive(Debug)]
pub enum FsError {
    NotFound(String),
    WrongKind { name: String, wanted: EntryKind },
    AlreadyExists(String),
    InvalidName(String),
    DirectoryFull,
    NoSpace,
    InvalidMode(String),
    AlreadyOpen(String),
    NotOpen(String),
    TableFull,
    AccessDenied { name: String, needed: &'static str },
    OffsetOutOfRange { name: String, offset: u32, size: u32 },
    AtRoot,
    ArgumentCount { command: String, expected: &'static str },
    UnknownCommand(String),
    BadNumber(String),
    BadCluster(u32),
    InvalidBootSector(&'static str),
    Io(io::Error),
}

impl FsError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FsError::Io(_))
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound(name) => write!(f, "'{name}' not found"),
            FsError::WrongKind { name, wanted: EntryKind::Directory } => {
                write!(f, "'{name}' is not a directory")
            }
            FsError::WrongKind { name, .. } => write!(f, "'{name}' is a directory"),
            FsError::AlreadyExists(name) => {
                write!(f, "directory or file with the name '{name}' already exists")
            }
            FsError::InvalidName(name) => write!(f, "invalid name '{name}'"),
            FsError::DirectoryFull => write!(f, "no free entry left in the directory"),
            FsError::NoSpace => write!(f, "no free cluster available"),
            FsError::InvalidMode(mode) => write!(f, "invalid mode '{mode}'"),
            FsError::AlreadyOpen(name) => write!(f, "file '{name}' is already open"),
            FsError::NotOpen(name) => write!(f, "file '{name}' is not open"),
            FsError::TableFull => write!(f, "maximum number of open files reached"),
            FsError::AccessDenied { name, needed } => {
                write!(f, "file '{name}' is not open for {needed}")
            }
            FsError::OffsetOutOfRange { name, offset, size } => {
                write!(f, "offset {offset} is past the end of '{name}' ({size} bytes)")
            }
            FsError::AtRoot => write!(f, "already at the root directory"),
            FsError::ArgumentCount { command, expected } => {
                write!(f, "incorrect number of arguments for '{command}' (usage: {expected})")
            }
            FsError::UnknownCommand(_) => write!(f, "Unknown command"),
            FsError::BadNumber(text) => write!(f, "'{text}' is not a valid number"),
            FsError::BadCluster(cluster) => {
                write!(f, "cluster {cluster:#x} is outside the data region")
            }
            FsError::InvalidBootSector(why) => write!(f, "invalid boot sector: {why}"),
            FsError::Io(e) => write!(f, "I/O error on image: {e}"),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        FsError::Io(e)
    }
}
