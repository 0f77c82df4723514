//! The top-level entry point: bootstrap the root context, resolve the
//! caller's requested targets against the current directory's context, and
//! invoke them.

use crate::engine::{Engine, PlanEntry};
use crate::error::{cast_error, EngineError};
use crate::loader::Loader;
use crate::options::Options;
use crate::spell;
use anyhow::{anyhow, Result};
use std::path::Path;

/// What a run produced: a process exit code (0 on success) and, for
/// `--preview` consumers, the full resolved plan.
pub struct ExecutionResult {
    pub code: i32,
    pub plan: Vec<PlanEntry>,
}

/// Run the engine once: build the root context at `top_dir` (triggering
/// `loader`), resolve `targets` against the context for `current_dir`
/// (which must be `top_dir` or one of its descendants reachable through
/// deferrals), and invoke each resolved spell in order.
///
/// An empty `targets` list resolves the default spells of the current
/// directory's context, mirroring a bare invocation naming no target.
pub fn execute(
    top_dir: &Path,
    current_dir: &Path,
    targets: &[String],
    options: Options,
    loader: &dyn Loader,
) -> Result<ExecutionResult> {
    let engine = Engine::new(options);
    if engine.current().is_some() {
        return Err(EngineError::usage("execute requires no current context").into());
    }

    engine.ensure_context(top_dir, loader)?;
    let cwd_ctx = engine.ensure_context(current_dir, loader)?;

    let mut code = 0;
    let _guard = engine.push(&cwd_ctx)?;

    let requested: Vec<Option<&str>> = if targets.is_empty() {
        vec![None]
    } else {
        targets.iter().map(|t| Some(t.as_str())).collect()
    };

    for name in requested {
        if engine.options().verbose {
            println!("[spellcraft] resolving target {}", name.unwrap_or("(default)"));
        }
        let spells = cwd_ctx.borrow().fetch_spells(name);
        if spells.is_empty() {
            if let Some(n) = name {
                cast_error(
                    Some(cwd_ctx.borrow().dir()),
                    &anyhow!("no such target: {n}"),
                );
                code = 1;
            }
            continue;
        }
        for s in spells {
            // `spell::invoke` records this spell's own `PlanEntry` (and every
            // factor's, recursively) as it computes each run decision.
            if let Err(e) = spell::invoke(&s, &engine) {
                cast_error(Some(cwd_ctx.borrow().dir()), &e);
                code = 1;
            }
        }
    }

    drop(_guard);
    engine.write_plan_json()?;
    Ok(ExecutionResult {
        code,
        plan: engine.plan(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ClosureLoader;
    use crate::signature::Profile;
    use tempfile::tempdir;

    #[test]
    fn invokes_default_target_when_none_named() {
        let root = tempdir().unwrap();
        let loader = ClosureLoader::new(|engine: &Engine, ctx: &crate::context::ContextHandle| {
            let _g = engine.push(ctx)?;
            engine.new_spell(None, Vec::new(), Vec::new(), Some(Profile::from("x")), None, None)?;
            Ok(())
        });
        let result = execute(root.path(), root.path(), &[], Options::default(), &loader).unwrap();
        assert_eq!(result.code, 0);
        assert_eq!(result.plan.len(), 1);
    }

    #[test]
    fn unknown_named_target_is_reported_and_nonzero() {
        let root = tempdir().unwrap();
        let loader = crate::loader::NullLoader;
        let result = execute(
            root.path(),
            root.path(),
            &["missing".to_string()],
            Options::default(),
            &loader,
        )
        .unwrap();
        assert_eq!(result.code, 1);
    }

    #[test]
    fn plan_includes_every_spell_reached_including_factors() {
        let root = tempdir().unwrap();
        let loader = ClosureLoader::new(|engine: &Engine, ctx: &crate::context::ContextHandle| {
            let _g = engine.push(ctx)?;
            let leaf = engine.new_spell(
                None,
                Vec::new(),
                Vec::new(),
                Some(Profile::from("leaf")),
                None,
                None,
            )?;
            engine.new_spell(
                Some("top"),
                vec![crate::spell::Factor::Spell(leaf)],
                Vec::new(),
                Some(Profile::from("top")),
                None,
                None,
            )?;
            Ok(())
        });
        let result = execute(
            root.path(),
            root.path(),
            &["top".to_string()],
            Options::default(),
            &loader,
        )
        .unwrap();
        assert_eq!(result.code, 0);
        // Both the requested target and the factor it pulled in recursively
        // get their own plan entry.
        assert_eq!(result.plan.len(), 2);
        assert!(result.plan.iter().all(|e| e.would_run));
        assert!(result.plan.iter().any(|e| e.reason == "no products"));
    }

    #[test]
    fn preview_mode_writes_plan_json() {
        let root = tempdir().unwrap();
        let plan_path = root.path().join("plan.json");
        let loader = ClosureLoader::new(|engine: &Engine, ctx: &crate::context::ContextHandle| {
            let _g = engine.push(ctx)?;
            engine.new_spell(None, Vec::new(), Vec::new(), Some(Profile::from("x")), None, None)?;
            Ok(())
        });
        let mut options = Options::default();
        options.preview = true;
        options.plan_json = Some(plan_path.clone());
        execute(root.path(), root.path(), &[], options, &loader).unwrap();
        assert!(plan_path.exists());
    }
}
