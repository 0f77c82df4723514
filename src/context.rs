//! A [`Context`] associates a directory with the spells declared there.
//!
//! Exactly one `Context` exists per canonicalized directory for the lifetime
//! of a run (enforced by the `Engine`'s registry); a context is never torn
//! down once created.

use crate::spell::SpellHandle;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub struct ContextData {
    dir: PathBuf,
    by_name: HashMap<String, Vec<SpellHandle>>,
    defaults: Vec<SpellHandle>,
}

/// Shared handle to a context. Held by the `Engine`'s registry (the owning
/// reference) and cloned wherever code needs to address "the context a spell
/// was declared in" (a non-owning cross-reference in spirit, though in this
/// single-run process nothing is ever torn down before the other).
pub type ContextHandle = Rc<RefCell<ContextData>>;

impl ContextData {
    pub(crate) fn new(dir: PathBuf) -> ContextHandle {
        Rc::new(RefCell::new(ContextData {
            dir,
            by_name: HashMap::new(),
            defaults: Vec::new(),
        }))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register a spell under `name`, or as a default spell if `name` is
    /// `None`. Insertion order is preserved; duplicate names are allowed.
    pub(crate) fn register_spell(&mut self, name: Option<&str>, spell: SpellHandle) {
        match name {
            Some(name) => self
                .by_name
                .entry(name.to_string())
                .or_default()
                .push(spell),
            None => self.defaults.push(spell),
        }
    }

    /// Fetch the spells registered under `name`, or the default spells if
    /// `name` is `None`. Empty if nothing is registered under that name.
    pub fn fetch_spells(&self, name: Option<&str>) -> Vec<SpellHandle> {
        match name {
            Some(name) => self.by_name.get(name).cloned().unwrap_or_default(),
            None => self.defaults.clone(),
        }
    }
}
