use crate::command::{Builtin, ExecutionOutcome, ExitCode, Host};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::find_command_path;
use anyhow::{Context as _, Result};
use argh::{EarlyExit, FromArgs};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Session state a builtin may read or change.
pub(crate) struct Context<'a> {
    pub env: &'a mut Environment,
    pub host: &'a mut dyn Host,
    pub history: &'a [String],
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are executed directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized {
    const KIND: Builtin;

    /// Builds the command from its operands (`argv` without the command name).
    fn parse(args: &[&str]) -> Result<Self, EarlyExit>;

    /// Executes the command, writing its normal output to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode>;
}

/// Parses `args` with [`argh`] as positionals only.
///
/// A leading `--` ends option parsing, so `help`, `--help` and words starting
/// with `-` reach the builtin as ordinary operands.
fn parse_operands<T: FromArgs + BuiltinCommand>(args: &[&str]) -> Result<T, EarlyExit> {
    let args: Vec<&str> = std::iter::once("--").chain(args.iter().copied()).collect();
    T::from_args(&[T::KIND.name()], &args)
}

/// Parses `args` for the builtin `T` and runs it.
///
/// Errors raised by the builtin become a diagnostic with status 1; they never
/// end the session.
fn invoke<T: BuiltinCommand>(
    args: &[String],
    stdout: &mut dyn Write,
    ctx: &mut Context<'_>,
) -> ExecutionOutcome {
    let name = T::KIND.name();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let cmd = match T::parse(&args) {
        Ok(cmd) => cmd,
        Err(EarlyExit { output, status }) => {
            return match status {
                Ok(()) => match stdout.write_all(output.as_bytes()) {
                    Ok(()) => ExecutionOutcome::success(),
                    Err(e) => ExecutionOutcome::failure(1, format!("{name}: {e}")),
                },
                Err(()) => ExecutionOutcome::failure(1, format!("{name}: {}", output.trim_end())),
            };
        }
    };

    match cmd.execute(stdout, ctx) {
        Ok(status) => ExecutionOutcome::with_status(status),
        Err(e) => {
            debug!(builtin = name, error = %e, "builtin failed");
            ExecutionOutcome::failure(1, format!("{e:#}"))
        }
    }
}

/// Runs `builtin` with `args`.
pub(crate) fn run_builtin(
    builtin: Builtin,
    args: &[String],
    stdout: &mut dyn Write,
    ctx: &mut Context<'_>,
) -> ExecutionOutcome {
    match builtin {
        Builtin::Echo => invoke::<Echo>(args, stdout, ctx),
        Builtin::Cd => invoke::<Cd>(args, stdout, ctx),
        Builtin::Pwd => invoke::<Pwd>(args, stdout, ctx),
        Builtin::Exit => invoke::<Exit>(args, stdout, ctx),
        Builtin::Type => invoke::<Type>(args, stdout, ctx),
        Builtin::History => invoke::<History>(args, stdout, ctx),
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Pwd {
    const KIND: Builtin = Builtin::Pwd;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        parse_operands(args)
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        writeln!(stdout, "{}", ctx.env.current_dir.display()).context("pwd")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Without a target, or with `~`, changes to the directory named by HOME.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Only the first one is used.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    const KIND: Builtin = Builtin::Cd;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        parse_operands(args)
    }

    fn execute(self, _stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        let (shown, target) = match self.targets.first().map(String::as_str) {
            None | Some("~") => {
                let home = ctx.env.home().ok_or(ShellError::HomeNotSet)?;
                (home.display().to_string(), home)
            }
            Some(t) => (t.to_string(), PathBuf::from(t)),
        };

        let new_dir = ctx.env.current_dir.join(&target);
        let canonical = fs::canonicalize(&new_dir).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ShellError::NoSuchDirectory(shown.clone()),
            _ => ShellError::ChangeDir {
                target: shown.clone(),
                source,
            },
        })?;
        if !canonical.is_dir() {
            return Err(ShellError::NotADirectory(shown).into());
        }

        ctx.host
            .change_dir(&canonical)
            .map_err(|source| ShellError::ChangeDir {
                target: shown,
                source,
            })?;
        debug!(dir = %canonical.display(), "changed directory");
        ctx.env
            .set_var("PWD", canonical.to_string_lossy().into_owned());
        ctx.env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the shell with status 0.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with status 0
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    const KIND: Builtin = Builtin::Exit;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        parse_operands(args)
    }

    fn execute(self, _stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        ctx.env.should_exit = true;
        Ok(0)
    }
}

/// Write the arguments to standard output, separated by spaces.
///
/// Only a leading `-n` is an option (no trailing newline); every other word,
/// including `help` and words starting with `-`, is printed as-is.
pub struct Echo {
    pub no_newline: bool,
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    const KIND: Builtin = Builtin::Echo;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        let (no_newline, args) = match args.split_first() {
            Some((&"-n", rest)) => (true, rest),
            _ => (false, args),
        };
        Ok(Echo {
            no_newline,
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn execute(self, stdout: &mut dyn Write, _ctx: &mut Context<'_>) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s).context("echo")?;
        } else {
            writeln!(stdout, "{}", s).context("echo")?;
        }
        stdout.flush().context("echo")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Describe how each name would be interpreted as a command.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to look up.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    const KIND: Builtin = Builtin::Type;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        parse_operands(args)
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        if self.names.is_empty() {
            return Err(ShellError::MissingOperand.into());
        }

        let search_path = ctx.env.search_path();
        let mut status = 0;
        for name in &self.names {
            if Builtin::from_name(name).is_some() {
                writeln!(stdout, "{name} is a shell builtin")?;
                continue;
            }
            match find_command_path(&search_path, &ctx.env.current_dir, Path::new(name)) {
                Some(path) => writeln!(stdout, "{name} is {}", path.display())?,
                None => {
                    writeln!(stdout, "{name}: not found")?;
                    status = 1;
                }
            }
        }
        Ok(status)
    }
}

#[derive(FromArgs)]
/// Print the lines entered in this session, oldest first.
pub struct History {
    #[argh(positional)]
    /// print only the last COUNT entries.
    pub count: Option<usize>,
}

impl BuiltinCommand for History {
    const KIND: Builtin = Builtin::History;

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        parse_operands(args)
    }

    fn execute(self, stdout: &mut dyn Write, ctx: &mut Context<'_>) -> Result<ExitCode> {
        let total = ctx.history.len();
        let skip = self.count.map_or(0, |n| total.saturating_sub(n));
        for (i, line) in ctx.history.iter().enumerate().skip(skip) {
            writeln!(stdout, "{:>5}  {}", i + 1, line)?;
        }
        Ok(0)
    }
}
