//! A hierarchical, content-addressed build engine.
//!
//! A directory is a [`Context`](context::ContextData); a context's
//! description registers one or more [`Spell`](spell::SpellData)s, each with
//! a set of [`Factor`](spell::Factor)s it depends on, a list of product
//! paths it's responsible for, and an optional action that brings those
//! products up to date. Invoking a spell ([`spell::invoke`]) recursively
//! invokes its factors, folds their signatures into its own
//! [`Profile`](signature::Profile), hashes the result into a
//! [`Signature`](signature::Signature), and compares that against what was
//! last recorded for its products in a [`Journal`](journal::Journal) — only
//! running the action when something changed.
//!
//! The [`Engine`](engine::Engine) owns every context, stage and product
//! registered during a run, along with the current-context stack a loader's
//! description is evaluated against. [`driver::execute`] is the top-level
//! entry point: it bootstraps the root context, resolves the caller's
//! requested targets, and invokes them.

pub mod constructors;
pub mod context;
pub mod driver;
pub mod engine;
pub mod error;
pub mod journal;
pub mod loader;
pub mod options;
pub mod platform;
pub mod process;
pub mod signature;
pub mod spell;
pub mod stage;

pub use engine::Engine;
pub use error::EngineError;
pub use options::Options;
