// Library crate root: the FAT32 image driver and the shell session built on it.
// The binary in main.rs only wires configuration, logging and stdio to `shell::run`.

pub mod config;
pub mod cwd;
pub mod dir;
pub mod dir_ops;
pub mod disk;
pub mod error;
pub mod fat;
pub mod fat32;
pub mod file_io;
pub mod geometry;
pub mod logger;
pub mod open_files;
pub mod shell;

#[cfg(test)]
mod test_support;
