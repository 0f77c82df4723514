//! A [`Spell`] is a DAG node: a set of factors it depends on, the products
//! it builds, a profile describing its own inputs, and an optional action to
//! bring its products up to date.
//!
//! `invoke` is the heart of the engine: the recursive, memoized signature
//! computation and run-decision described by the system's data model.
//! Grounded on the teacher crate's `build_target`/`BuildStep::execute` chain
//! in `pipeline/executor.rs` for the overall "resolve deps, compute a
//! fingerprint, decide whether to rebuild, act" shape, adapted to a single
//! signature rather than a content hash tree.

use crate::context::ContextHandle;
use crate::engine::{Engine, PlanEntry};
use crate::error::EngineError;
use crate::process::Action;
use crate::signature::{hash_profile, Profile, Signature};
use crate::stage::StageHandle;
use anyhow::Result;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

/// One of a spell's dependencies: either another spell directly, or a name
/// resolved against the spell's own context at invocation time (falling back
/// to a source file's modification time if nothing is registered under that
/// name).
#[derive(Clone)]
pub enum Factor {
    Spell(SpellHandle),
    Name(String),
}

pub struct SpellData {
    context: Weak<RefCell<crate::context::ContextData>>,
    journal_stage: Option<StageHandle>,
    factors: Vec<Factor>,
    products: Vec<PathBuf>,
    profile: Profile,
    action: Option<Action>,
    signature: Option<Signature>,
}

/// Shared handle to a spell. Owned by its context's `by_name`/`defaults`
/// lists and by the engine's product index; a spell never outlives the run.
pub type SpellHandle = Rc<RefCell<SpellData>>;

impl SpellData {
    /// Construct a spell directly, with none of the engine-level validation
    /// (current-context requirement, product conflict detection, undo-mode
    /// rewrite) that `Engine::new_spell` layers on top. Used internally by
    /// the engine, and by tests that only care about the data model.
    pub(crate) fn new_raw(
        context: &ContextHandle,
        journal_stage: Option<StageHandle>,
        factors: Vec<Factor>,
        products: Vec<PathBuf>,
        profile: Profile,
        action: Option<Action>,
    ) -> SpellHandle {
        Rc::new(RefCell::new(SpellData {
            context: Rc::downgrade(context),
            journal_stage,
            factors,
            products,
            profile,
            action,
            signature: None,
        }))
    }

    pub fn context(&self) -> ContextHandle {
        self.context
            .upgrade()
            .expect("a spell's context outlives the spell for the life of a run")
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn products(&self) -> &[PathBuf] {
        &self.products
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn cached_signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }
}

/// Compute (or return the cached) signature for `spell`, running its action
/// first if the comparison against the journal says it's out of date.
///
/// Procedure:
/// 1. Short-circuit if this spell was already invoked this run.
/// 2. Resolve the spell's own profile text.
/// 3. Push the spell's context for the duration of factor resolution and
///    action execution.
/// 4. Fold every factor's signature (or a source file's mtime) into the
///    profile text, tracking whether any action-less factor forces a rerun.
/// 5. Hash the accumulated profile into this spell's signature.
/// 6. Decide whether to run: forced, no products, a product missing on
///    disk, or the journal disagrees with the freshly computed signature. A
///    spell whose signature came out empty has nothing a journal could ever
///    record, so this decision degrades to product existence alone and
///    never touches the journal.
/// 7. Record a plan entry describing the decision (and why), regardless of
///    preview mode, so `--plan-json` reflects every spell reached.
/// 8. If running (and not in preview mode), invoke the action and record the
///    new signature for every product in the journal (skipped for an empty
///    signature, since the journal cannot hold one).
/// 9. Pop the context.
/// 10. Cache and return the signature.
pub fn invoke(spell: &SpellHandle, engine: &Engine) -> Result<Signature> {
    if let Some(sig) = spell.borrow().cached_signature() {
        return Ok(sig.clone());
    }

    let ctx = spell.borrow().context();
    let _guard = engine.push(&ctx)?;

    let mut profile = spell.borrow().profile.resolve();
    let mut force = engine.options().force;

    let factors = spell.borrow().factors.clone();
    for factor in &factors {
        match factor {
            Factor::Spell(dep) => {
                if !Rc::ptr_eq(dep, spell) {
                    let sig = invoke(dep, engine)?;
                    if !dep.borrow().has_action() {
                        force = true;
                    }
                    profile.push(' ');
                    profile.push_str(sig.as_str());
                }
            }
            Factor::Name(name) => {
                let resolved = ctx.borrow().fetch_spells(Some(name));
                if resolved.is_empty() {
                    let meta = std::fs::metadata(name).map_err(|_| {
                        EngineError::resolution(format!(
                            "no spell or source file named `{name}`"
                        ))
                        .with_dir(ctx.borrow().dir())
                    })?;
                    let mtime = meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                        .map(|d| d.as_secs())
                        .unwrap_or(0);
                    profile.push(' ');
                    profile.push_str(name);
                    profile.push(' ');
                    profile.push_str(&mtime.to_string());
                } else {
                    for dep in &resolved {
                        if !Rc::ptr_eq(dep, spell) {
                            let sig = invoke(dep, engine)?;
                            if !dep.borrow().has_action() {
                                force = true;
                            }
                            profile.push(' ');
                            profile.push_str(sig.as_str());
                        }
                    }
                }
            }
        }
    }

    let signature = hash_profile(&profile);

    let products = spell.borrow().products.clone();
    let any_product_missing = products.iter().any(|p| !p.exists());

    // `(should_run, reason)` — the reason is recorded on the plan entry and
    // (in `--verbose`) printed, so every branch below must set both.
    let (should_run, reason): (bool, &'static str) = if engine.options().undo {
        if force {
            (true, "forced")
        } else if products.iter().any(|p| p.exists()) {
            (true, "undo: product exists")
        } else {
            (false, "undo: no products exist")
        }
    } else if signature.is_empty() {
        // A spell with an empty profile produces no signature-bearing
        // output (§3/§4.4): the journal never holds an entry for it, so the
        // run decision and journal bookkeeping both degrade to "does the
        // product exist," never consulting the journal at all.
        if force {
            (true, "forced")
        } else if products.is_empty() {
            (true, "no products")
        } else if any_product_missing {
            (true, "product missing on disk")
        } else {
            (false, "up to date (no signature)")
        }
    } else {
        let journal_missing_or_stale = {
            let data = spell.borrow();
            match &data.journal_stage {
                None => !products.is_empty(),
                Some(stage) => products.iter().any(|p| {
                    let key = p.to_string_lossy().into_owned();
                    stage
                        .borrow()
                        .journal()
                        .and_then(|j| j.get(&key).cloned())
                        .as_ref()
                        != Some(&signature)
                }),
            }
        };
        if force {
            (true, "forced")
        } else if products.is_empty() {
            (true, "no products")
        } else if any_product_missing {
            (true, "product missing on disk")
        } else if journal_missing_or_stale {
            (true, "journal entry missing or stale")
        } else {
            (false, "up to date")
        }
    };

    if engine.options().verbose {
        let label = products
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(no products)".to_string());
        println!("[spellcraft] {label}: {reason}");
    }

    engine.record_plan(PlanEntry {
        products: products.clone(),
        would_run: should_run,
        reason: reason.to_string(),
        signature: signature.as_str().to_string(),
    });

    if should_run {
        if let Some(action) = spell.borrow_mut().action.as_mut() {
            let code = action.run(engine.options().preview)?;
            if code != 0 {
                return Err(EngineError::action(code).into());
            }
        }
        if !engine.options().preview {
            let data = spell.borrow();
            if let Some(stage) = &data.journal_stage {
                let mut stage_mut = stage.borrow_mut();
                if let Some(journal) = stage_mut.journal_mut() {
                    for p in &products {
                        let key = p.to_string_lossy().into_owned();
                        if engine.options().undo {
                            journal.delete(&key)?;
                        } else if !signature.is_empty() {
                            journal.put(&key, &signature)?;
                        }
                    }
                }
            }
        }
    }

    {
        let mut data = spell.borrow_mut();
        data.signature = Some(signature.clone());
        data.action = None;
    }
    Ok(signature)
}
