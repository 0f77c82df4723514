//! The `Engine`: the registries (contexts, stages, products), the current
//! context stack, and the validated spell/stage constructors that sit in
//! front of the bare data-model types.
//!
//! Grounded on the teacher crate's `BuildContext` (a process-wide registry
//! threaded through the pipeline, holding the artifact store and the
//! resolved target graph) for the shape of "one struct, several maps, handed
//! around by shared reference rather than singleton statics".

use crate::context::{ContextData, ContextHandle};
use crate::error::EngineError;
use crate::loader::Loader;
use crate::options::Options;
use crate::process::{unlink_action, Action};
use crate::signature::Profile;
use crate::spell::{Factor, SpellData, SpellHandle};
use crate::stage::StageData;
use crate::stage::StageHandle;
use anyhow::{bail, Result};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

/// One spell reached during a resolution pass, as recorded for
/// `--plan-json`. Recorded once per spell — by `spell::invoke`, at the point
/// its run decision is made — whether that spell was a requested target or a
/// factor pulled in recursively, and regardless of `--preview`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub products: Vec<PathBuf>,
    /// Whether this spell's action would run (or did run, outside preview).
    pub would_run: bool,
    /// Why: e.g. "forced", "product missing on disk", "journal entry missing
    /// or stale", "no products", "up to date".
    pub reason: String,
    pub signature: String,
}

pub struct Engine {
    options: Options,
    contexts: RefCell<HashMap<PathBuf, ContextHandle>>,
    stages: RefCell<HashMap<PathBuf, StageHandle>>,
    products: RefCell<HashMap<PathBuf, SpellHandle>>,
    stack: RefCell<Vec<ContextHandle>>,
    plan: RefCell<Vec<PlanEntry>>,
    pid: u32,
    start_time: SystemTime,
}

/// RAII guard returned by [`Engine::push`]; pops the context stack — and
/// restores the prior working directory, if this push actually changed it —
/// on drop, including on an early return through `?`.
pub struct ContextGuard<'e> {
    engine: &'e Engine,
    prior_cwd: Option<PathBuf>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.engine.stack.borrow_mut().pop();
        if let Some(cwd) = self.prior_cwd.take() {
            if let Err(e) = std::env::set_current_dir(&cwd) {
                crate::error::cast_warning(
                    Some(cwd.as_path()),
                    format!("failed to restore working directory: {e}"),
                );
            }
        }
    }
}

impl Engine {
    pub fn new(options: Options) -> Self {
        Engine {
            options,
            contexts: RefCell::new(HashMap::new()),
            stages: RefCell::new(HashMap::new()),
            products: RefCell::new(HashMap::new()),
            stack: RefCell::new(Vec::new()),
            plan: RefCell::new(Vec::new()),
            pid: std::process::id(),
            start_time: SystemTime::now(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn current(&self) -> Option<ContextHandle> {
        self.stack.borrow().last().cloned()
    }

    /// Push `ctx` as the current context for the lifetime of the returned
    /// guard, changing the process working directory to match. Pushing the
    /// already-current context is a no-op pair: the working directory is
    /// left alone, and the guard restores nothing on drop.
    ///
    /// The engine is single-threaded and synchronous by design (no
    /// parallel task execution is in scope), so a process-wide working
    /// directory is safe to mutate here; tests that exercise `push` must
    /// not run concurrently with each other.
    pub fn push(&self, ctx: &ContextHandle) -> Result<ContextGuard<'_>> {
        let is_noop = self
            .stack
            .borrow()
            .last()
            .map(|top| Rc::ptr_eq(top, ctx))
            .unwrap_or(false);

        let prior_cwd = if is_noop {
            None
        } else {
            let cwd = std::env::current_dir()?;
            std::env::set_current_dir(ctx.borrow().dir())?;
            Some(cwd)
        };

        self.stack.borrow_mut().push(ctx.clone());
        Ok(ContextGuard {
            engine: self,
            prior_cwd,
        })
    }

    /// Get or create the context for `dir` (canonicalized so the same
    /// physical directory always maps to the same `Context`, however it was
    /// spelled when requested).
    pub fn context_for(&self, dir: &Path) -> Result<ContextHandle> {
        let key = canonicalize_best_effort(dir);
        if let Some(existing) = self.contexts.borrow().get(&key) {
            return Ok(existing.clone());
        }
        let ctx = ContextData::new(key.clone());
        self.contexts.borrow_mut().insert(key, ctx.clone());
        Ok(ctx)
    }

    /// Get or create the context for `dir`; if it didn't already exist,
    /// push it (see [`Engine::push`]) and run `loader` against it before
    /// returning, popping afterward. This is the entry point the Driver and
    /// the deferral constructor use — plain `context_for` is for call sites
    /// that only need the registry entry, not a fresh load.
    pub fn ensure_context(&self, dir: &Path, loader: &dyn Loader) -> Result<ContextHandle> {
        let key = canonicalize_best_effort(dir);
        if let Some(existing) = self.contexts.borrow().get(&key) {
            return Ok(existing.clone());
        }
        let ctx = ContextData::new(key.clone());
        self.contexts.borrow_mut().insert(key, ctx.clone());
        let _guard = self.push(&ctx)?;
        loader.load(self, &ctx)?;
        Ok(ctx)
    }

    /// Construct the stage for `dir`. Unlike `context_for`, this is not a
    /// get-or-create: a directory gets exactly one stage per run, and
    /// re-registering an already-known stage directory is a consistency
    /// error, same as a duplicate product.
    pub fn stage_for(&self, dir: &Path, basename: Option<&str>, with_journal: bool) -> Result<StageHandle> {
        let key = canonicalize_best_effort(dir);
        if self.stages.borrow().contains_key(&key) {
            return Err(EngineError::consistency(format!(
                "stage already registered for directory: {}",
                key.display()
            ))
            .into());
        }
        let stage = StageData::new(key.clone(), basename, with_journal)?;
        self.stages.borrow_mut().insert(key, stage.clone());
        Ok(stage)
    }

    /// The profile text for an action-less spell with no explicit profile:
    /// stable within a run, distinct across runs.
    pub fn default_profile(&self) -> String {
        let since_epoch = self
            .start_time
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        format!("spellcraft {} {}", self.pid, since_epoch.as_secs())
    }

    /// Construct and register a spell under the current context.
    ///
    /// `profile` is the caller-supplied profile, if any; when `None`, a
    /// default is derived from `action` (its literal text for shell/argv) or
    /// from [`Engine::default_profile`] when there is no action at all. A
    /// closure action with no explicit profile is a usage error: there is no
    /// text to derive one from.
    ///
    /// In undo mode, a non-empty product list causes the action to be
    /// replaced with one that unlinks every product, and the profile with a
    /// deterministic string describing that.
    #[allow(clippy::too_many_arguments)]
    pub fn new_spell(
        &self,
        name: Option<&str>,
        factors: Vec<Factor>,
        products: Vec<PathBuf>,
        profile: Option<Profile>,
        action: Option<Action>,
        stage: Option<StageHandle>,
    ) -> Result<SpellHandle> {
        let ctx = self
            .current()
            .ok_or_else(|| EngineError::usage("spell construction requires a current context"))?;
        let ctx_dir = ctx.borrow().dir().to_path_buf();

        let products: Vec<PathBuf> = products
            .into_iter()
            .map(|p| normalize_absolute(&ctx_dir, &p))
            .collect();

        if !products.is_empty() && action.is_none() && !self.options.undo {
            return Err(
                EngineError::usage("a spell with products must have an action").with_dir(&ctx_dir)
            .into());
        }

        for p in &products {
            if self.products.borrow().contains_key(p) {
                return Err(EngineError::consistency(format!(
                    "product already claimed by another spell: {}",
                    p.display()
                ))
                .with_dir(&ctx_dir)
                .into());
            }
        }

        let (action, profile) = if self.options.undo && !products.is_empty() {
            let undo_profile = Profile::from(format!(
                "undo {}",
                products
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(" ")
            ));
            (Some(unlink_action(products.clone())), undo_profile)
        } else {
            let profile = match profile {
                Some(p) => p,
                None => match &action {
                    Some(a) => match a.default_profile() {
                        Some(text) => Profile::from(text),
                        None => bail!(
                            "{}",
                            EngineError::usage("a closure action requires an explicit profile")
                        ),
                    },
                    None => Profile::from(self.default_profile()),
                },
            };
            (action, profile)
        };

        let handle = SpellData::new_raw(&ctx, stage, factors, products.clone(), profile, action);
        ctx.borrow_mut().register_spell(name, handle.clone());
        for p in &products {
            self.products.borrow_mut().insert(p.clone(), handle.clone());
        }
        Ok(handle)
    }

    pub fn record_plan(&self, entry: PlanEntry) {
        self.plan.borrow_mut().push(entry);
    }

    pub fn plan(&self) -> Vec<PlanEntry> {
        self.plan.borrow().clone()
    }

    /// Write the accumulated plan to `options.plan_json`, if set. A path of
    /// `-` means stdout rather than a file named `-`.
    pub fn write_plan_json(&self) -> Result<()> {
        if let Some(path) = &self.options.plan_json {
            let text = serde_json::to_string_pretty(&self.plan())?;
            if path.as_os_str() == "-" {
                println!("{text}");
            } else {
                std::fs::write(path, text)?;
            }
        }
        Ok(())
    }
}

fn canonicalize_best_effort(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| normalize_absolute(&std::env::current_dir().unwrap_or_default(), dir))
}

/// Join `p` onto `base` if relative, then lexically collapse `.`/`..`
/// components without touching the filesystem (a build product usually
/// doesn't exist yet, so `fs::canonicalize` isn't an option).
fn normalize_absolute(base: &Path, p: &Path) -> PathBuf {
    let joined = if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    };
    let mut out = PathBuf::new();
    for comp in joined.components() {
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
