use std::path::PathBuf;
use thiserror::Error;

/// Recoverable failures of a single command line.
///
/// Rendered for the user with `{:#}` through `anyhow`, which appends the
/// underlying I/O error of variants that carry a `source`.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("cd: {0}: No such file or directory")]
    NoSuchDirectory(String),

    #[error("cd: {0}: Not a directory")]
    NotADirectory(String),

    #[error("cd: HOME not set")]
    HomeNotSet,

    #[error("cd: {target}")]
    ChangeDir {
        target: String,
        source: std::io::Error,
    },

    #[error("type: missing operand")]
    MissingOperand,

    #[error("{}", path.display())]
    OpenRedirect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: failed to execute", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// Standard input was closed or could not be read; ends the session.
    #[error("input closed: {0}")]
    InputClosed(String),
}
