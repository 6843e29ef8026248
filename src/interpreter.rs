use crate::builtin::{self, Context};
use crate::command::{
    Builtin, CommandKind, ExecutionOutcome, FALLBACK_STATUS, Host, Invocation, NOT_FOUND_STATUS,
    ResolvedCommand, SYNTAX_ERROR_STATUS,
};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::{OsHost, find_command_path};
use crate::lexer;
use crate::parser::{self, Redirection};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Prompt shown before every line.
pub const PROMPT: &str = "$ ";

/// Decides what `argv[0]` refers to.
///
/// Returns `None` for an empty command line.
pub fn resolve(mut argv: Vec<String>, env: &Environment) -> Option<ResolvedCommand> {
    if argv.is_empty() {
        return None;
    }
    let name = argv.remove(0);
    let kind = match Builtin::from_name(&name) {
        Some(builtin) => CommandKind::Builtin(builtin),
        None => match find_command_path(&env.search_path(), &env.current_dir, Path::new(&name)) {
            Some(path) => CommandKind::External(path.into_owned()),
            None => CommandKind::NotFound,
        },
    };
    debug!(%name, ?kind, "resolved command");
    Some(ResolvedCommand {
        kind,
        name,
        args: argv,
    })
}

/// A minimal interactive shell: tokenizes lines, resolves commands and runs them.
///
/// The interpreter owns the session state (environment, working directory and
/// history) and reaches the operating system only through its [`Host`].
///
/// Example
/// ```
/// use minishell::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// let outcome = sh.execute_line("echo 'hello   world'", &mut out).unwrap();
/// assert_eq!(outcome.status, 0);
/// assert_eq!(out, b"hello   world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    history: Vec<String>,
    host: Box<dyn Host>,
}

impl Interpreter {
    /// Create an interpreter over an explicit environment and host.
    pub fn new(env: Environment, host: Box<dyn Host>) -> Self {
        Self {
            env,
            history: Vec::new(),
            host,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Whether `exit` has been run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Runs one line of input as typed by the user.
    ///
    /// Normal command output goes to `stdout`; failures of the shell itself are
    /// returned as the outcome's diagnostic. Only a failure to write to `stdout`
    /// is reported as `Err`.
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExecutionOutcome> {
        let tokens = lexer::split_into_tokens(line.trim());
        let parsed = match parser::extract_redirection(tokens) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ExecutionOutcome::failure(SYNTAX_ERROR_STATUS, e)),
        };
        match resolve(parsed.argv, &self.env) {
            Some(resolved) => self.dispatch(resolved, parsed.redirect.as_ref(), stdout),
            None => Ok(ExecutionOutcome::success()),
        }
    }

    /// Runs a resolved command.
    ///
    /// Redirection applies to `echo` and external programs only; for the other
    /// builtins it is ignored and the target file is not touched.
    pub fn dispatch(
        &mut self,
        resolved: ResolvedCommand,
        redirect: Option<&Redirection>,
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExecutionOutcome> {
        let ResolvedCommand { kind, name, args } = resolved;
        match kind {
            CommandKind::Builtin(builtin) => {
                let mut ctx = Context {
                    env: &mut self.env,
                    host: self.host.as_mut(),
                    history: &self.history,
                };
                let outcome = match redirect.filter(|_| builtin.honors_redirection()) {
                    Some(redirect) => {
                        let mut file = match open_redirect(&ctx.env.current_dir, redirect) {
                            Ok(file) => file,
                            Err(e) => return Ok(redirect_failure(e)),
                        };
                        builtin::run_builtin(builtin, &args, &mut file, &mut ctx)
                    }
                    None => builtin::run_builtin(builtin, &args, stdout, &mut ctx),
                };
                Ok(outcome)
            }
            CommandKind::External(program) => {
                let file = match redirect {
                    Some(redirect) => match open_redirect(&self.env.current_dir, redirect) {
                        Ok(file) => Some(file),
                        Err(e) => return Ok(redirect_failure(e)),
                    },
                    None => None,
                };
                // Our own buffered output must land before the child's.
                stdout.flush()?;
                debug!(program = %program.display(), ?args, "spawning");
                let invocation = Invocation {
                    program: &program,
                    args: &args,
                    env: &self.env,
                    output: file.as_ref(),
                };
                Ok(match self.host.run(invocation) {
                    Ok(status) => ExecutionOutcome::with_status(status),
                    Err(source) => {
                        let err = anyhow::Error::from(ShellError::Spawn { program, source });
                        ExecutionOutcome::failure(FALLBACK_STATUS, format!("{err:#}"))
                    }
                })
            }
            CommandKind::NotFound => {
                writeln!(stdout, "{name}: command not found")?;
                Ok(ExecutionOutcome::with_status(NOT_FOUND_STATUS))
            }
        }
    }

    /// Records `line` in the history, runs it and reports diagnostics on stderr.
    pub fn run_line(&mut self, line: &str) -> anyhow::Result<ExecutionOutcome> {
        let line = line.trim();
        if !line.is_empty() {
            self.history.push(line.to_string());
        }
        let outcome = self.execute_line(line, &mut std::io::stdout().lock())?;
        if let Some(diagnostic) = &outcome.diagnostic {
            eprintln!("{diagnostic}");
        }
        debug!(status = outcome.status, "line finished");
        Ok(outcome)
    }

    /// Read-Eval-Print Loop.
    ///
    /// Returns `Ok(())` once `exit` has run. End of input and read failures are
    /// returned as errors.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.trim())?;
                    }
                    self.run_line(&line)?;
                    if self.should_exit() {
                        info!("exit requested");
                        return Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    return Err(ShellError::InputClosed("end of input".to_string()).into());
                }
                Err(err) => return Err(ShellError::InputClosed(err.to_string()).into()),
            }
        }
    }
}

impl Default for Interpreter {
    /// An interpreter over the real process environment and operating system.
    fn default() -> Self {
        Self::new(Environment::new(), Box::new(OsHost))
    }
}

fn redirect_failure(err: anyhow::Error) -> ExecutionOutcome {
    ExecutionOutcome::failure(FALLBACK_STATUS, format!("{err:#}"))
}

/// Opens the redirection target, relative to `current_dir`.
///
/// The file is closed when the returned handle is dropped at the end of the
/// command.
fn open_redirect(current_dir: &Path, redirect: &Redirection) -> anyhow::Result<File> {
    let path = current_dir.join(&redirect.target);
    let mut options = OpenOptions::new();
    options.create(true);
    if redirect.append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(&path).map_err(|source| {
        ShellError::OpenRedirect {
            path: redirect.target.clone(),
            source,
        }
        .into()
    })
}
