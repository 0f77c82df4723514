//! The append-only, crash-safe product→signature log.
//!
//! File format (bit-exact): UTF-8, LF-terminated lines of the form
//! `<op> <sig> <name>`, where `<op>` is `+` (assert) or `-` (retract) and
//! `<name>` absorbs everything after the first two whitespace-separated
//! fields. Unknown ops are ignored on read.
//!
//! Grounded on the teacher crate's `ArtifactStore`: open-fold-compact on
//! open, `with_context`-qualified `anyhow` errors, and an atomic
//! unlink-then-rewrite for compaction.

use crate::signature::Signature;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// An open, append-only journal backed by a file on disk.
pub struct Journal {
    path: PathBuf,
    map: BTreeMap<String, Signature>,
}

impl Journal {
    /// Open (or create) the journal at `path`, folding any existing records
    /// and then compacting the file to just the live `+` records.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read journal {}", path.display()))?;
            fold(&text)
        } else {
            BTreeMap::new()
        };

        let mut journal = Journal { path, map };
        journal.compact()?;
        Ok(journal)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.map.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Signature)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Record `name`'s current signature. `name` must be non-empty;
    /// `signature` must be non-empty and whitespace-free.
    pub fn put(&mut self, name: &str, signature: &Signature) -> Result<()> {
        if name.is_empty() {
            bail!("journal key must not be empty");
        }
        if signature.is_empty() || signature.as_str().chars().any(char::is_whitespace) {
            bail!("journal signature must be non-empty and whitespace-free");
        }
        self.map.insert(name.to_string(), signature.clone());
        self.append_line(&format!("+ {} {}\n", signature.as_str(), name))
    }

    /// Remove any assertion for `name`, returning its prior signature.
    pub fn delete(&mut self, name: &str) -> Result<Option<Signature>> {
        let prior = self.map.remove(name);
        self.append_line(&format!("- - {name}\n"))?;
        Ok(prior)
    }

    /// Unlink the journal file and reset the in-memory map.
    pub fn clear(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove journal {}", self.path.display()))?;
        }
        self.map.clear();
        Ok(())
    }

    fn append_line(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open journal {} for append", self.path.display()))?;
        f.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to journal {}", self.path.display()))?;
        f.sync_data().ok();
        Ok(())
    }

    /// Rewrite the file to hold only `+` records for the current map, so it
    /// does not grow without bound across runs. Unlink failures degrade to a
    /// warning (the stale file is simply overwritten by the open-for-write
    /// that follows); open-for-write failure is fatal.
    fn compact(&mut self) -> Result<()> {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                crate::error::cast_warning(
                    self.path.parent(),
                    format!("could not remove stale journal before compaction: {e}"),
                );
            }
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open journal {} for compaction", self.path.display()))?;
        for (name, sig) in &self.map {
            writeln!(f, "+ {} {}", sig.as_str(), name)?;
        }
        f.sync_data().ok();
        Ok(())
    }
}

/// Fold journal records left-to-right: `+` sets, `-` removes. Unknown ops are
/// ignored. A record need only have two whitespace-separated fields before
/// the name for the name to be parsed; fewer than that is ignored as noise.
fn fold(text: &str) -> BTreeMap<String, Signature> {
    let mut map = BTreeMap::new();
    for line in text.lines() {
        let mut parts = line.splitn(3, char::is_whitespace);
        let op = match parts.next() {
            Some(op) => op,
            None => continue,
        };
        let rest = line[op.len()..].trim_start();
        let mut rest_parts = rest.splitn(2, char::is_whitespace);
        let sig = match rest_parts.next() {
            Some(s) if !s.is_empty() => s,
            _ => continue,
        };
        let name = match rest_parts.next() {
            Some(n) => n.trim_start(),
            None => continue,
        };
        if name.is_empty() {
            continue;
        }
        match op {
            "+" => {
                map.insert(name.to_string(), Signature::from_raw(sig.to_string()));
            }
            "-" => {
                map.remove(name);
            }
            _ => {}
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let journal = Journal::open(dir.path().join("j")).unwrap();
        assert!(journal.iter().next().is_none());
    }

    #[test]
    fn put_then_reopen_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("j");
        {
            let mut journal = Journal::open(&path).unwrap();
            journal.put("/a/out", &Signature::from_raw("sig1")).unwrap();
            journal.put("/a/out2", &Signature::from_raw("sig2")).unwrap();
        }
        let reopened = Journal::open(&path).unwrap();
        assert_eq!(reopened.get("/a/out").unwrap().as_str(), "sig1");
        assert_eq!(reopened.get("/a/out2").unwrap().as_str(), "sig2");
    }

    #[test]
    fn put_then_delete_then_reopen_has_no_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("j");
        {
            let mut journal = Journal::open(&path).unwrap();
            journal.put("k", &Signature::from_raw("s")).unwrap();
            journal.delete("k").unwrap();
        }
        let reopened = Journal::open(&path).unwrap();
        assert!(!reopened.has("k"));
    }

    #[test]
    fn delete_returns_prior_signature() {
        let dir = tempdir().unwrap();
        let mut journal = Journal::open(dir.path().join("j")).unwrap();
        journal.put("k", &Signature::from_raw("s1")).unwrap();
        let prior = journal.delete("k").unwrap();
        assert_eq!(prior.unwrap().as_str(), "s1");
        assert_eq!(journal.delete("k").unwrap(), None);
    }

    #[test]
    fn name_may_contain_spaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("j");
        {
            let mut journal = Journal::open(&path).unwrap();
            journal
                .put("a name with spaces", &Signature::from_raw("sig"))
                .unwrap();
        }
        let reopened = Journal::open(&path).unwrap();
        assert_eq!(reopened.get("a name with spaces").unwrap().as_str(), "sig");
    }

    #[test]
    fn compaction_drops_dead_entries_from_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("j");
        {
            let mut journal = Journal::open(&path).unwrap();
            journal.put("k", &Signature::from_raw("s1")).unwrap();
            journal.delete("k").unwrap();
            journal.put("k2", &Signature::from_raw("s2")).unwrap();
        }
        // Reopening compacts; the raw file should now contain no retraction
        // records at all, just the live `+ s2 k2`.
        let _ = Journal::open(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("+ s2 k2"));
    }

    #[test]
    fn clear_unlinks_and_resets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("j");
        let mut journal = Journal::open(&path).unwrap();
        journal.put("k", &Signature::from_raw("s")).unwrap();
        journal.clear().unwrap();
        assert!(!path.exists());
        assert!(!journal.has("k"));
    }

    #[test]
    fn put_rejects_empty_or_whitespace_signature() {
        let dir = tempdir().unwrap();
        let mut journal = Journal::open(dir.path().join("j")).unwrap();
        assert!(journal.put("k", &Signature::empty()).is_err());
        assert!(journal
            .put("k", &Signature::from_raw("has space"))
            .is_err());
    }
}
