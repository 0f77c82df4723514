//! The action executor: running a spell's action (shell string, argv
//! vector, or closure) and reporting its integer result code.
//!
//! `Cmd` mirrors the teacher crate's `crate::process::Cmd` builder (referenced
//! throughout `build/kernel.rs`, `executor/binaries.rs` and friends, though
//! the module itself was not present in the retrieved source) rather than
//! calling `std::process::Command` ad hoc at each call site.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

/// The outcome of a non-interactive `Cmd::run`.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandResult {
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(1)
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// A builder around `std::process::Command` with the engine's error
/// conventions: a custom fatal-error message, and an `allow_fail` escape
/// hatch for callers that want the exit code rather than a `bail!`.
pub struct Cmd {
    program: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
    error_msg: Option<String>,
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Cmd {
            program: program.into(),
            args: Vec::new(),
            dir: None,
            error_msg: None,
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// Don't `bail!` on a nonzero exit; return the `CommandResult` as-is.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    fn build(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Run to completion, capturing stdout/stderr.
    pub fn run(self) -> Result<CommandResult> {
        let mut cmd = self.build();
        let output = cmd
            .output()
            .with_context(|| format!("Failed to spawn `{}`", self.program))?;
        let result = CommandResult {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        };
        if !result.success() && !self.allow_fail {
            let msg = self
                .error_msg
                .clone()
                .unwrap_or_else(|| format!("`{}` failed", self.program));
            bail!("{msg} (exit code {})", result.code());
        }
        Ok(result)
    }

    /// Run to completion with inherited stdio, so the user sees output live.
    /// Returns the process exit code.
    pub fn run_interactive(self) -> Result<i32> {
        let mut cmd = self.build();
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let status = cmd
            .status()
            .with_context(|| format!("Failed to spawn `{}`", self.program))?;
        let code = status.code().unwrap_or(1);
        if !status.success() && !self.allow_fail {
            let msg = self
                .error_msg
                .clone()
                .unwrap_or_else(|| format!("`{}` failed", self.program));
            bail!("{msg} (exit code {code})");
        }
        Ok(code)
    }
}

/// Run `command` through the platform shell. Used by `Action::Shell`.
pub fn spawn_shell(command: &str) -> Result<i32> {
    if cfg!(windows) {
        Cmd::new("cmd").arg("/C").arg(command).run_interactive()
    } else {
        Cmd::new("/bin/sh").arg("-c").arg(command).run_interactive()
    }
}

/// Run `argv[0]` with the remaining elements as arguments. Used by
/// `Action::Argv`. Panics if `argv` is empty — that's a construction-time
/// usage error the caller should have rejected already.
pub fn spawn_argv(argv: &[String]) -> Result<i32> {
    let (program, rest) = argv.split_first().expect("argv must be non-empty");
    Cmd::new(program.clone()).args(rest.to_vec()).run_interactive()
}

/// A spell's action: what `invoke` runs when the signature comparison says
/// it must. Shell and argv variants print a one-line description before
/// running, mirroring the teacher crate's habit of a `println!` ahead of
/// every `Cmd::run`; closures run silently (the caller is expected to log
/// what it's doing itself, since the engine doesn't know).
pub enum Action {
    Shell(String),
    Argv(Vec<String>),
    Closure(Box<dyn FnMut() -> i32>),
}

impl Action {
    /// Execute the action. In preview mode, the description is still
    /// printed (for shell/argv) but nothing actually runs and 0 ("would
    /// succeed") is returned.
    pub fn run(&mut self, preview: bool) -> Result<i32> {
        match self {
            Action::Shell(s) => {
                println!("{s}");
                if preview {
                    return Ok(0);
                }
                spawn_shell(s)
            }
            Action::Argv(argv) => {
                println!("{}", argv.join(" "));
                if preview {
                    return Ok(0);
                }
                spawn_argv(argv)
            }
            Action::Closure(f) => {
                if preview {
                    return Ok(0);
                }
                Ok(f())
            }
        }
    }

    /// The default profile text for a shell/argv action when no explicit
    /// profile was supplied. Closures require a caller-supplied profile and
    /// have no textual form here.
    pub fn default_profile(&self) -> Option<String> {
        match self {
            Action::Shell(s) => Some(s.clone()),
            Action::Argv(argv) => Some(argv.join(" ")),
            Action::Closure(_) => None,
        }
    }
}

/// Build the synthetic unlink action substituted for a spell's action in
/// undo mode: remove every product that still exists, in order, stopping at
/// (and reporting) the first removal failure that isn't "already gone".
pub fn unlink_action(products: Vec<PathBuf>) -> Action {
    Action::Closure(Box::new(move || {
        for p in &products {
            match std::fs::remove_file(p) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    eprintln!("error: failed to remove {}: {e}", p.display());
                    return 1;
                }
            }
        }
        0
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_run_captures_output() {
        let result = Cmd::new("printf").arg("hello").run().unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, b"hello");
    }

    #[test]
    fn cmd_run_fails_on_nonzero_exit() {
        let result = Cmd::new("sh").arg("-c").arg("exit 3").run();
        assert!(result.is_err());
    }

    #[test]
    fn cmd_allow_fail_suppresses_error() {
        let result = Cmd::new("sh")
            .arg("-c")
            .arg("exit 3")
            .allow_fail()
            .run()
            .unwrap();
        assert_eq!(result.code(), 3);
    }

    #[test]
    fn action_preview_mode_never_runs_closure() {
        let mut ran = false;
        // Can't capture `&mut ran` across the 'static closure bound used by
        // Action::Closure, so use a shared cell instead.
        let flag = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag2 = flag.clone();
        let mut action = Action::Closure(Box::new(move || {
            flag2.set(true);
            0
        }));
        let code = action.run(true).unwrap();
        assert_eq!(code, 0);
        assert!(!flag.get());
        ran = ran || flag.get();
        let _ = ran;
    }

    #[test]
    fn unlink_action_removes_existing_files_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("out");
        std::fs::write(&f, b"x").unwrap();
        let missing = dir.path().join("missing");
        let mut action = unlink_action(vec![f.clone(), missing]);
        let code = action.run(false).unwrap();
        assert_eq!(code, 0);
        assert!(!f.exists());
    }
}
