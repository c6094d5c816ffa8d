/// Interactive command loop over a mounted image.
///
/// Every command runs to completion before the next line is read. Errors
/// other than I/O failures are printed and leave the session unchanged.

use std::io::{BufRead, Write};

use crate::cwd::WorkingDir;
use crate::dir::{self, EntryKind};
use crate::disk::BlockDev;
use crate::error::FsError;
use crate::fat32::Fat32;
use crate::open_files::{Access, OpenFile, OpenFileTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Session<D> {
    pub fs:        Fat32<D>,
    pub cwd:       WorkingDir,
    pub files:     OpenFileTable,
    pub grow_dirs: bool,
}

/// Text after the first `n` whitespace-separated tokens, trimmed.
fn rest_after(line: &str, n: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..n {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest.trim_end()
}

/// Strip one pair of surrounding double quotes.
fn unquote(text: &str) -> &str {
    text.strip_prefix('"').and_then(|t| t.strip_suffix('"')).unwrap_or(text)
}

fn number(text: &str) -> Result<u32, FsError> {
    text.parse().map_err(|_| FsError::BadNumber(text.into()))
}

fn expect_args(args: &[&str], count: usize, usage: &'static str) -> Result<(), FsError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(FsError::ArgumentCount { command: args[0].into(), expected: usage })
    }
}

impl<D: BlockDev> Session<D> {
    pub fn new(fs: Fat32<D>, image_path: impl Into<String>, grow_dirs: bool) -> Self {
        let cwd = WorkingDir::new(fs.root_cluster(), image_path);
        Session { fs, cwd, files: OpenFileTable::new(), grow_dirs }
    }

    pub fn prompt(&self) -> String { format!("[{}]/>", self.cwd.path()) }

    /// Run one command line.
    pub fn execute(&mut self, line: &str, out: &mut impl Write) -> Result<Flow, FsError> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = args.first() else { return Ok(Flow::Continue) };
        log::trace!("command: {line:?}");

        match command {
            "info" => {
                expect_args(&args, 1, "info")?;
                self.info(out)?;
            }
            "ls" => {
                expect_args(&args, 1, "ls")?;
                let entries = self.fs.list(self.cwd.current())?;
                writeln!(out, "Listing directory contents:")?;
                for entry in entries {
                    let tag = if entry.kind() == EntryKind::Directory { "[DIR]" } else { "[FILE]" };
                    writeln!(out, "{tag} {}", entry.name())?;
                }
            }
            "cd" => {
                expect_args(&args, 2, "cd <name>")?;
                self.cwd.change_directory(&mut self.fs, args[1])?;
            }
            "mkdir" => {
                expect_args(&args, 2, "mkdir <name>")?;
                self.fs.make_directory(self.cwd.current(), args[1], self.grow_dirs)?;
                writeln!(out, "Directory '{}' created successfully.", dir::stored_name(args[1]))?;
            }
            "creat" => {
                expect_args(&args, 2, "creat <name>")?;
                self.fs.create_file(self.cwd.current(), args[1], self.grow_dirs)?;
                writeln!(out, "File '{}' created successfully.", dir::stored_name(args[1]))?;
            }
            "open" => {
                expect_args(&args, 3, "open <name> <-r|-w|-rw|-wr>")?;
                self.open(args[1], args[2])?;
                writeln!(out, "File '{}' opened in mode '{}'.", args[1], args[2])?;
            }
            "close" => {
                expect_args(&args, 2, "close <name>")?;
                self.files.remove(args[1])?;
                writeln!(out, "File '{}' closed successfully.", args[1])?;
            }
            "lsof" => {
                expect_args(&args, 1, "lsof")?;
                self.list_open(out)?;
            }
            "lseek" => {
                expect_args(&args, 3, "lseek <name> <offset>")?;
                let offset = number(args[2])?;
                let file = self.files.get_mut(args[1])?;
                if offset > file.size {
                    return Err(FsError::OffsetOutOfRange { name: file.name.clone(), offset, size: file.size });
                }
                file.offset = offset;
                writeln!(out, "Offset of '{}' set to {offset}.", args[1])?;
            }
            "read" => {
                expect_args(&args, 3, "read <name> <size>")?;
                let len = number(args[2])?;
                let file = self.files.get_mut(args[1])?;
                let bytes = self.fs.read_open(file, len)?;
                writeln!(out, "{}", String::from_utf8_lossy(&bytes))?;
            }
            "write" => {
                if args.len() < 3 {
                    return Err(FsError::ArgumentCount { command: command.into(), expected: "write <name> <string>" });
                }
                let data = unquote(rest_after(line, 2)).as_bytes();
                let file = self.files.get_mut(args[1])?;
                self.fs.write_open(file, data)?;
                writeln!(out, "Wrote {} bytes to '{}'.", data.len(), args[1])?;
            }
            "exit" => {
                expect_args(&args, 1, "exit")?;
                writeln!(out, "Exiting...")?;
                return Ok(Flow::Exit);
            }
            other => return Err(FsError::UnknownCommand(other.into())),
        }
        Ok(Flow::Continue)
    }

    fn info(&self, out: &mut impl Write) -> Result<(), FsError> {
        let geo = &self.fs.geo;
        writeln!(out, "Position of root cluster (in cluster #): {}", geo.root_cluster)?;
        writeln!(out, "Bytes per sector: {}", geo.bytes_per_sector)?;
        writeln!(out, "Sectors per cluster: {}", geo.sectors_per_cluster)?;
        writeln!(out, "Total number of clusters in data region: {}", geo.total_clusters)?;
        writeln!(out, "Number of entries in one FAT: {}", geo.fat_entry_count())?;
        writeln!(out, "Size of image (in bytes): {}", geo.image_size())?;
        Ok(())
    }

    fn open(&mut self, name: &str, mode: &str) -> Result<(), FsError> {
        if self.files.is_open(name) {
            return Err(FsError::AlreadyOpen(name.into()));
        }
        let found = self.fs.lookup_kind(self.cwd.current(), name, EntryKind::File)?;
        let mode = Access::parse(mode)?;
        self.files.insert(OpenFile {
            name:          name.into(),
            cluster:       found.entry.cluster,
            entry_cluster: found.cluster,
            entry_slot:    found.slot,
            mode,
            offset:        0,
            size:          found.entry.size,
            path:          self.cwd.path(),
        })
    }

    fn list_open(&self, out: &mut impl Write) -> Result<(), FsError> {
        if self.files.is_empty() {
            writeln!(out, "No files are currently open.")?;
            return Ok(());
        }
        writeln!(out, "{:<6}{:<13}{:<6}{:<8}PATH", "INDEX", "NAME", "MODE", "OFFSET")?;
        for (i, f) in self.files.iter().enumerate() {
            writeln!(out, "{i:<6}{:<13}{:<6}{:<8}{}", f.name, f.mode.label(), f.offset, f.path)?;
        }
        Ok(())
    }
}

/// Prompt, read, execute until `exit`, end of input, or a fatal error.
pub fn run<D: BlockDev>(
    session: &mut Session<D>,
    mut input: impl BufRead,
    out: &mut impl Write,
) -> Result<(), FsError> {
    log::info!("session started at {}", session.cwd.path());
    loop {
        write!(out, "{}", session.prompt())?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            writeln!(out, "Exiting...")?;
            break;
        }
        match session.execute(&line, out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) if e.is_fatal() => {
                log::error!("aborting session: {e}");
                return Err(e);
            }
            Err(e @ FsError::UnknownCommand(_)) => writeln!(out, "{e}")?,
            Err(e) => writeln!(out, "Error: {e}")?,
        }
    }
    log::info!("session ended");
    Ok(())
}
