//! The flag surface a run is configured with, independent of how it was
//! parsed (CLI, embedding caller, tests).

use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Emit progress and diagnostic lines as spells are resolved.
    pub verbose: bool,
    /// Ignore cached signatures; treat every spell as out of date.
    pub force: bool,
    /// Compute signatures and decide what would run, but never execute an
    /// action or write to a journal.
    pub preview: bool,
    /// Replace every product-creating action with an unlink action.
    pub undo: bool,
    /// NAME=VALUE definitions handed to loaders (`--define`).
    pub defines: HashMap<String, String>,
    /// When set, write a structured description of the resolved plan here
    /// after the run (most useful together with `--preview`).
    pub plan_json: Option<PathBuf>,
}

impl Options {
    pub fn define(&self, name: &str) -> Option<&str> {
        self.defines.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_off() {
        let o = Options::default();
        assert!(!o.verbose && !o.force && !o.preview && !o.undo);
        assert!(o.defines.is_empty());
        assert!(o.plan_json.is_none());
    }

    #[test]
    fn define_looks_up_by_name() {
        let mut o = Options::default();
        o.defines.insert("ARCH".to_string(), "arm64".to_string());
        assert_eq!(o.define("ARCH"), Some("arm64"));
        assert_eq!(o.define("MISSING"), None);
    }
}
