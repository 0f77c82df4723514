//! The `Loader` trait: how a `Context`'s description gets turned into
//! registered spells and stages.
//!
//! The engine has no opinion on the source language or file format of a
//! description; discovering a candidate filename is handled separately by
//! [`crate::platform::discover_description`]. What matters to the engine is
//! only that loading a context is a single call that, as a side effect,
//! populates the context's spell tables.

use crate::context::ContextHandle;
use crate::engine::Engine;
use anyhow::Result;

/// Populates `ctx` with spells and stages, given the engine it should
/// register them against.
pub trait Loader {
    fn load(&self, engine: &Engine, ctx: &ContextHandle) -> Result<()>;
}

/// A loader backed by a plain closure — the usual way to drive the engine
/// from tests, and a natural adapter for an embedding caller that already
/// has its own description format.
pub struct ClosureLoader<F>(F)
where
    F: Fn(&Engine, &ContextHandle) -> Result<()>;

impl<F> ClosureLoader<F>
where
    F: Fn(&Engine, &ContextHandle) -> Result<()>,
{
    pub fn new(f: F) -> Self {
        ClosureLoader(f)
    }
}

impl<F> Loader for ClosureLoader<F>
where
    F: Fn(&Engine, &ContextHandle) -> Result<()>,
{
    fn load(&self, engine: &Engine, ctx: &ContextHandle) -> Result<()> {
        (self.0)(engine, ctx)
    }
}

/// A loader that registers nothing. Useful for a context that exists only to
/// be a deferral target's empty sibling, or in tests that build spells by
/// hand after construction.
pub struct NullLoader;

impl Loader for NullLoader {
    fn load(&self, _engine: &Engine, _ctx: &ContextHandle) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::signature::Profile;
    use std::path::PathBuf;

    #[test]
    fn closure_loader_runs_its_closure() {
        let engine = Engine::new(Options::default());
        let ctx = engine.context_for(&PathBuf::from("/tmp")).unwrap();
        let loader = ClosureLoader::new(|engine: &Engine, _ctx: &ContextHandle| {
            let _guard = engine.push(_ctx)?;
            engine.new_spell(
                Some("all"),
                Vec::new(),
                Vec::new(),
                Some(Profile::from("x")),
                None,
                None,
            )?;
            Ok(())
        });
        loader.load(&engine, &ctx).unwrap();
        assert_eq!(ctx.borrow().fetch_spells(Some("all")).len(), 1);
    }

    #[test]
    fn null_loader_registers_nothing() {
        let engine = Engine::new(Options::default());
        let ctx = engine.context_for(&PathBuf::from("/tmp")).unwrap();
        NullLoader.load(&engine, &ctx).unwrap();
        assert!(ctx.borrow().fetch_spells(None).is_empty());
    }
}
