//! The file copy constructor: copy a set of source files into a destination
//! directory, optionally setting permissions and ownership.

use crate::engine::Engine;
use crate::process::Action;
use crate::signature::Profile;
use crate::spell::{Factor, SpellHandle};
use anyhow::{anyhow, Context, Result};
use nix::unistd::{chown, Group, User};
use std::fs;
use std::path::{Path, PathBuf};

/// An owning user/group pair, resolved to numeric ids at action time (not at
/// construction time, since the ids only matter if the action actually
/// runs, and resolving them is itself a syscall).
#[derive(Debug, Clone)]
pub struct Owner {
    pub user: String,
    pub group: String,
}

/// Build a spell that copies `sources` into `destdir`, one product per
/// source at `destdir/basename(src)`. Each source is also a factor (as a
/// named, unresolved string), so its own modification time enters the
/// profile the same way any other source-file factor would.
pub fn file_copy(
    engine: &Engine,
    destdir: &Path,
    sources: &[PathBuf],
    mode: Option<u32>,
    owner: Option<Owner>,
) -> Result<SpellHandle> {
    let products: Vec<PathBuf> = sources
        .iter()
        .map(|src| {
            let base = src
                .file_name()
                .ok_or_else(|| anyhow!("source path has no file name: {}", src.display()))?;
            Ok(destdir.join(base))
        })
        .collect::<Result<_>>()?;

    let factors: Vec<Factor> = sources
        .iter()
        .map(|src| Factor::Name(src.to_string_lossy().into_owned()))
        .collect();

    let profile = Profile::from(format!(
        "filecopy {} [{}] mode={:?} owner={:?}",
        destdir.display(),
        sources
            .iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(","),
        mode,
        owner.as_ref().map(|o| format!("{}:{}", o.user, o.group)),
    ));

    let sources_owned = sources.to_vec();
    let products_owned = products.clone();
    let action = Action::Closure(Box::new(move || {
        match copy_and_configure(&sources_owned, &products_owned, mode, &owner) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("error: {e}");
                for p in &products_owned {
                    let _ = fs::remove_file(p);
                }
                1
            }
        }
    }));

    engine.new_spell(None, factors, products, Some(profile), Some(action), None)
}

fn copy_and_configure(
    sources: &[PathBuf],
    products: &[PathBuf],
    mode: Option<u32>,
    owner: &Option<Owner>,
) -> Result<()> {
    for (src, dst) in sources.iter().zip(products.iter()) {
        fs::copy(src, dst)
            .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    }

    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        for dst in products {
            fs::set_permissions(dst, fs::Permissions::from_mode(mode))
                .with_context(|| format!("Failed to set permissions on {}", dst.display()))?;
        }
    }

    if let Some(owner) = owner {
        let uid = User::from_name(&owner.user)?
            .ok_or_else(|| anyhow!("no such user: {}", owner.user))?
            .uid;
        let gid = Group::from_name(&owner.group)?
            .ok_or_else(|| anyhow!("no such group: {}", owner.group))?
            .gid;
        for dst in products {
            chown(dst, Some(uid), Some(gid))
                .with_context(|| format!("Failed to chown {}", dst.display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use tempfile::tempdir;

    #[test]
    fn copies_file_and_records_product() {
        let root = tempdir().unwrap();
        let src_dir = root.path().join("src");
        let dst_dir = root.path().join("dst");
        fs::create_dir_all(&src_dir).unwrap();
        fs::create_dir_all(&dst_dir).unwrap();
        let src = src_dir.join("a.txt");
        fs::write(&src, b"hello").unwrap();

        let engine = Engine::new(Options::default());
        let ctx = engine.context_for(root.path()).unwrap();
        let _guard = engine.push(&ctx).unwrap();

        let spell = file_copy(&engine, &dst_dir, &[src], None, None).unwrap();
        assert_eq!(spell.borrow().products(), &[dst_dir.join("a.txt")]);

        let sig = crate::spell::invoke(&spell, &engine).unwrap();
        assert!(!sig.is_empty());
        assert_eq!(fs::read(dst_dir.join("a.txt")).unwrap(), b"hello");
    }

    #[test]
    fn copy_failure_fails_the_action_and_leaves_no_product() {
        // A directory has an mtime (so factor resolution succeeds) but
        // `fs::copy` refuses to treat it as a regular file, so the action
        // itself should fail.
        let root = tempdir().unwrap();
        let dst_dir = root.path().join("dst");
        fs::create_dir_all(&dst_dir).unwrap();
        let src_as_dir = root.path().join("not_a_file");
        fs::create_dir_all(&src_as_dir).unwrap();

        let engine = Engine::new(Options::default());
        let ctx = engine.context_for(root.path()).unwrap();
        let _guard = engine.push(&ctx).unwrap();

        let spell = file_copy(&engine, &dst_dir, &[src_as_dir], None, None).unwrap();
        let result = crate::spell::invoke(&spell, &engine);
        assert!(result.is_err());
        assert!(!dst_dir.join("not_a_file").exists());
    }
}
