//! The deferral constructor: a spell whose only job is to pull in spells
//! registered in sibling directories.

use crate::engine::Engine;
use crate::error::{cast_warning, EngineError};
use crate::loader::Loader;
use crate::signature::Profile;
use crate::spell::{Factor, SpellHandle};
use anyhow::Result;
use std::path::PathBuf;

/// Build a spell whose factors are the spells registered (by `names`, or
/// the default spells when `names` is `None`) in each of `dirs`'s contexts.
/// A context not yet registered for a directory is constructed on the spot,
/// which triggers `loader` to populate it.
///
/// `if_present` turns a missing directory from a fatal load error into a
/// skipped-with-warning directory.
pub fn deferral(
    engine: &Engine,
    loader: &dyn Loader,
    dirs: &[PathBuf],
    names: Option<&[String]>,
    if_present: bool,
) -> Result<SpellHandle> {
    let mut factors = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            if if_present {
                cast_warning(Some(dir.as_path()), "deferral target does not exist, skipping");
                continue;
            }
            return Err(EngineError::load(dir, "deferral target directory does not exist").into());
        }

        let ctx = engine.ensure_context(dir, loader)?;
        let fetched = match names {
            Some(names) => names
                .iter()
                .flat_map(|name| ctx.borrow().fetch_spells(Some(name)))
                .collect::<Vec<_>>(),
            None => ctx.borrow().fetch_spells(None),
        };
        factors.extend(fetched.into_iter().map(Factor::Spell));
    }

    let profile = Profile::from(describe(dirs, names));
    engine.new_spell(None, factors, Vec::new(), Some(profile), None, None)
}

fn describe(dirs: &[PathBuf], names: Option<&[String]>) -> String {
    let dirs_joined = dirs
        .iter()
        .map(|d| d.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(",");
    match names {
        Some(names) => format!("deferral {dirs_joined} [{}]", names.join(",")),
        None => format!("deferral {dirs_joined} [default]"),
    }
}
