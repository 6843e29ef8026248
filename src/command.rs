use crate::env::Environment;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Status reported when a command was not found on the search path.
pub const NOT_FOUND_STATUS: ExitCode = 127;

/// Status used when a child could not be started or did not exit normally.
pub const FALLBACK_STATUS: ExitCode = 1;

/// Status of a line rejected by the parser.
pub const SYNTAX_ERROR_STATUS: ExitCode = 2;

/// Commands implemented inside the shell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Echo,
    Cd,
    Pwd,
    Exit,
    Type,
    History,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Echo,
        Builtin::Cd,
        Builtin::Pwd,
        Builtin::Exit,
        Builtin::Type,
        Builtin::History,
    ];

    /// Canonical name of the command, e.g. "echo" or "cd".
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Echo => "echo",
            Builtin::Cd => "cd",
            Builtin::Pwd => "pwd",
            Builtin::Exit => "exit",
            Builtin::Type => "type",
            Builtin::History => "history",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Whether output redirection applies to this builtin.
    pub fn honors_redirection(self) -> bool {
        matches!(self, Builtin::Echo)
    }
}

/// How a command name was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Builtin(Builtin),
    /// An executable found on disk.
    External(PathBuf),
    NotFound,
}

/// A command ready to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub kind: CommandKind,
    /// The name as typed by the user.
    pub name: String,
    pub args: Vec<String>,
}

/// Result of running one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub status: ExitCode,
    /// Message for the error stream, if the command failed in the shell itself.
    pub diagnostic: Option<String>,
}

impl ExecutionOutcome {
    pub fn success() -> Self {
        Self::with_status(0)
    }

    pub fn with_status(status: ExitCode) -> Self {
        Self {
            status,
            diagnostic: None,
        }
    }

    pub fn failure(status: ExitCode, diagnostic: impl ToString) -> Self {
        Self {
            status,
            diagnostic: Some(diagnostic.to_string()),
        }
    }
}

/// Everything needed to start an external program.
pub struct Invocation<'a> {
    pub program: &'a Path,
    pub args: &'a [String],
    pub env: &'a Environment,
    /// Receives both stdout and stderr; `None` inherits the shell's streams.
    pub output: Option<&'a File>,
}

/// Operating system capabilities the dispatcher depends on.
///
/// The real implementation is [`crate::external::OsHost`]; tests substitute a
/// recording fake.
pub trait Host {
    /// Make `dir` the working directory of the process.
    fn change_dir(&mut self, dir: &Path) -> std::io::Result<()>;

    /// Run a program to completion and return its exit code.
    fn run(&mut self, invocation: Invocation<'_>) -> std::io::Result<ExitCode>;
}
