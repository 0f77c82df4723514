//! A [`Stage`] associates a directory with an optional [`Journal`] of
//! product signatures recorded there.
//!
//! Grounded on the teacher crate's `ArtifactStore` directory handling:
//! `mkdir -p` semantics and a platform-chosen default basename for the
//! per-directory state file.

use crate::journal::Journal;
use crate::platform::host_journal_basename;
use anyhow::{bail, Context, Result};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub struct StageData {
    dir: PathBuf,
    journal: Option<Journal>,
}

pub type StageHandle = Rc<RefCell<StageData>>;

impl StageData {
    /// Create (if needed) the stage directory and open its journal at
    /// `dir/basename`, where `basename` defaults to the host's platform
    /// journal filename when `None`.
    pub(crate) fn new(dir: PathBuf, basename: Option<&str>, with_journal: bool) -> Result<StageHandle> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create stage directory {}", dir.display()))?;
        let journal = if with_journal {
            let basename = basename.unwrap_or_else(host_journal_basename);
            Some(Journal::open(dir.join(basename))?)
        } else {
            None
        };
        Ok(Rc::new(RefCell::new(StageData { dir, journal })))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    pub fn journal_mut(&mut self) -> Option<&mut Journal> {
        self.journal.as_mut()
    }

    /// Create `relative` under this stage's directory and return its
    /// absolute path. `relative` must not be absolute — a stage's
    /// subdirectories are always addressed relative to the stage itself.
    pub fn make_subdir(&self, relative: &Path) -> Result<PathBuf> {
        if relative.is_absolute() {
            bail!(
                "stage subdirectory path must be relative, got {}",
                relative.display()
            );
        }
        let full = self.dir.join(relative);
        fs::create_dir_all(&full)
            .with_context(|| format!("Failed to create stage subdirectory {}", full.display()))?;
        Ok(full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn new_creates_directory_and_journal() {
        let root = tempdir().unwrap();
        let dir = root.path().join("stage");
        let stage = StageData::new(dir.clone(), None, true).unwrap();
        assert!(dir.is_dir());
        assert!(stage.borrow().journal().is_some());
    }

    #[test]
    fn new_without_journal_leaves_it_none() {
        let root = tempdir().unwrap();
        let stage = StageData::new(root.path().join("s"), None, false).unwrap();
        assert!(stage.borrow().journal().is_none());
    }

    #[test]
    fn make_subdir_rejects_absolute_path() {
        let root = tempdir().unwrap();
        let stage = StageData::new(root.path().join("s"), None, false).unwrap();
        let err = stage.borrow().make_subdir(Path::new("/etc")).unwrap_err();
        assert!(err.to_string().contains("relative"));
    }

    #[test]
    fn make_subdir_creates_nested_directory() {
        let root = tempdir().unwrap();
        let stage = StageData::new(root.path().join("s"), None, false).unwrap();
        let sub = stage.borrow().make_subdir(Path::new("a/b")).unwrap();
        assert!(sub.is_dir());
        assert_eq!(sub, root.path().join("s").join("a/b"));
    }

    #[test]
    fn custom_basename_is_honored() {
        let root = tempdir().unwrap();
        let dir = root.path().join("s");
        let stage = StageData::new(dir.clone(), Some("custom.jnl"), true).unwrap();
        stage
            .borrow_mut()
            .journal_mut()
            .unwrap()
            .put("k", &crate::signature::Signature::from_raw("v"))
            .unwrap();
        assert!(dir.join("custom.jnl").exists());
    }
}
