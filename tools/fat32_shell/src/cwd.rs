/// Working-directory state: current directory, its parent, and the display path.

use crate::dir::EntryKind;
use crate::disk::BlockDev;
use crate::error::FsError;
use crate::fat32::Fat32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDir {
    current: u32,
    parent:  u32,
    root:    u32,
    /// Display path of the root (the image path).
    base:    String,
    /// Names descended through from the root.
    trail:   Vec<String>,
}

impl WorkingDir {
    pub fn new(root: u32, base: impl Into<String>) -> Self {
        WorkingDir { current: root, parent: root, root, base: base.into(), trail: Vec::new() }
    }

    pub fn current(&self) -> u32 { self.current }

    pub fn parent(&self) -> u32 { self.parent }

    pub fn at_root(&self) -> bool { self.current == self.root }

    pub fn path(&self) -> String {
        let mut path = self.base.clone();
        for name in &self.trail {
            path.push('/');
            path.push_str(name);
        }
        path
    }

    /// Move into `name`. On error nothing changes.
    pub fn change_directory<D: BlockDev>(&mut self, fs: &mut Fat32<D>, name: &str) -> Result<(), FsError> {
        match name {
            "." => Ok(()),
            ".." => {
                if self.at_root() {
                    return Err(FsError::AtRoot);
                }
                let current = self.parent;
                let parent = fs.parent_of(current)?;
                self.current = current;
                self.parent = parent;
                self.trail.pop();
                Ok(())
            }
            _ => {
                let found = fs.lookup_kind(self.current, name, EntryKind::Directory)?;
                let target = fs.resolve_dir(found.entry.cluster);
                self.parent = self.current;
                self.current = target;
                self.trail.push(name.to_string());
                log::debug!("cd {name}: cluster {target}");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{disk_with, make_disk};

    #[test]
    fn into_docs_and_back() {
        let mut fs = Fat32::mount(disk_with(&["DOCS"], &[])).unwrap();
        let root = fs.root_cluster();
        let mut cwd = WorkingDir::new(root, "disk.img");
        let start = cwd.clone();

        cwd.change_directory(&mut fs, "DOCS").unwrap();
        assert_ne!(cwd.current(), root);
        assert_eq!(cwd.parent(), root);
        assert_eq!(cwd.path(), "disk.img/DOCS");

        cwd.change_directory(&mut fs, "..").unwrap();
        assert_eq!(cwd.current(), root);
        assert_eq!(cwd.path(), "disk.img");
        assert_eq!(cwd, start);
    }

    #[test]
    fn dotdot_at_root_changes_nothing() {
        let mut fs = Fat32::mount(make_disk()).unwrap();
        let mut cwd = WorkingDir::new(fs.root_cluster(), "/tmp/fat32.img");
        let start = cwd.clone();
        assert!(matches!(cwd.change_directory(&mut fs, ".."), Err(FsError::AtRoot)));
        assert_eq!(cwd, start);
    }

    #[test]
    fn failed_cd_changes_nothing() {
        let mut fs = Fat32::mount(disk_with(&[], &[("A.TXT", b"a")])).unwrap();
        let mut cwd = WorkingDir::new(fs.root_cluster(), "img");
        let start = cwd.clone();
        assert!(matches!(cwd.change_directory(&mut fs, "MISSING"), Err(FsError::NotFound(_))));
        assert!(matches!(cwd.change_directory(&mut fs, "A       TXT"), Err(FsError::WrongKind { .. })));
        cwd.change_directory(&mut fs, ".").unwrap();
        assert_eq!(cwd, start);
    }

    #[test]
    fn nested_navigation_tracks_parents() {
        let mut fs = Fat32::mount(make_disk()).unwrap();
        let root = fs.root_cluster();
        let a = fs.make_directory(root, "A", false).unwrap();
        let b = fs.make_directory(a, "B", false).unwrap();
        let c = fs.make_directory(b, "C", false).unwrap();

        let mut cwd = WorkingDir::new(root, "img");
        for name in ["A", "B", "C"] {
            cwd.change_directory(&mut fs, name).unwrap();
        }
        assert_eq!((cwd.current(), cwd.parent()), (c, b));
        assert_eq!(cwd.path(), "img/A/B/C");

        cwd.change_directory(&mut fs, "..").unwrap();
        assert_eq!((cwd.current(), cwd.parent()), (b, a));
        cwd.change_directory(&mut fs, "..").unwrap();
        assert_eq!((cwd.current(), cwd.parent()), (a, root));
        cwd.change_directory(&mut fs, "..").unwrap();
        assert!(cwd.at_root());
        assert_eq!(cwd.path(), "img");
    }
}
