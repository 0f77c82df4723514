//! Error kinds for the engine.
//!
//! The distilled error taxonomy (Usage, Load, Resolution, Filesystem, Action,
//! Consistency) is modeled as one enum rather than `anyhow::Error` everywhere,
//! so callers that care (the CLI, tests) can match on `kind()`. Construction
//! helpers still read naturally with `?` via `From` impls for `std::io::Error`.

use std::fmt;
use std::path::{Path, PathBuf};

/// One of the error kinds named by the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Load,
    Resolution,
    Filesystem,
    Action,
    Consistency,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Usage => "usage error",
            ErrorKind::Load => "load error",
            ErrorKind::Resolution => "resolution error",
            ErrorKind::Filesystem => "filesystem error",
            ErrorKind::Action => "action failed",
            ErrorKind::Consistency => "consistency error",
        };
        f.write_str(s)
    }
}

/// A fatal engine error, optionally qualified by the context directory that
/// was current when it was raised.
#[derive(Debug)]
pub struct EngineError {
    kind: ErrorKind,
    message: String,
    dir: Option<PathBuf>,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EngineError {
            kind,
            message: message.into(),
            dir: None,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage, message)
    }

    pub fn load(dir: &Path, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Load, message).with_dir(dir)
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Filesystem, message)
    }

    pub fn action(code: i32) -> Self {
        Self::new(ErrorKind::Action, format!("Action failed (exit code {code})"))
    }

    pub fn consistency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Consistency, message)
    }

    /// Attach (or replace) the context directory this error is qualified by.
    pub fn with_dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dir {
            Some(dir) => write!(f, "{}: {}", dir.display(), self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::filesystem(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Print a non-fatal diagnostic, prefixed with the given directory when known.
pub fn cast_warning(dir: Option<&Path>, message: impl AsRef<str>) {
    match dir {
        Some(dir) => eprintln!("[WARN] {}: {}", dir.display(), message.as_ref()),
        None => eprintln!("[WARN] {}", message.as_ref()),
    }
}

/// Print a fatal diagnostic. Does not terminate the process itself; callers
/// propagate the error and the CLI entry point maps it to a nonzero exit code.
pub fn cast_error(dir: Option<&Path>, err: &anyhow::Error) {
    match dir {
        Some(dir) => eprintln!("error: {}: {}", dir.display(), err),
        None => eprintln!("error: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_dir_is_bare_message() {
        let err = EngineError::usage("bad flag");
        assert_eq!(err.to_string(), "bad flag");
    }

    #[test]
    fn display_with_dir_prefixes_it() {
        let err = EngineError::resolution("no such spell").with_dir(Path::new("/a/b"));
        assert_eq!(err.to_string(), "/a/b: no such spell");
    }

    #[test]
    fn with_dir_replaces_a_prior_dir() {
        let err = EngineError::load(Path::new("/first"), "boom").with_dir(Path::new("/second"));
        assert_eq!(err.to_string(), "/second: boom");
    }

    #[test]
    fn io_error_becomes_filesystem_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: EngineError = io.into();
        assert_eq!(err.kind(), ErrorKind::Filesystem);
    }

    #[test]
    fn action_error_includes_the_exit_code() {
        let err = EngineError::action(3);
        assert!(err.to_string().contains('3'));
        assert_eq!(err.kind(), ErrorKind::Action);
    }
}
