//! Separates output redirection from the words of a command.

use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Where a command's output goes instead of the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    /// File that receives the output.
    pub target: PathBuf,
    /// `true` for `>>`: append instead of truncating.
    pub append: bool,
}

/// A command line after redirection has been split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The command name followed by its arguments.
    pub argv: Vec<String>,
    /// Output redirection, if the line had one.
    pub redirect: Option<Redirection>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsingError {
    /// A redirection operator was the last word on the line.
    #[error("syntax error: missing output file after `{0}`")]
    MissingOutputFile(String),
}

/// Classification of a single word as a redirection operator.
enum Operator<'a> {
    /// `>`, `1>` or `>>`; the target is the following word.
    Standalone { append: bool },
    /// `>file` or `>>file`; the target is glued to the operator.
    Merged { append: bool, target: &'a str },
}

/// A word starting with `>>` is a merged append (`>>file` appends to `file`),
/// not `>` with an inline target of `>file`.
fn classify(token: &str) -> Option<Operator<'_>> {
    match token {
        ">" | "1>" => Some(Operator::Standalone { append: false }),
        ">>" => Some(Operator::Standalone { append: true }),
        t => {
            if let Some(target) = t.strip_prefix(">>") {
                Some(Operator::Merged {
                    append: true,
                    target,
                })
            } else {
                t.strip_prefix('>').map(|target| Operator::Merged {
                    append: false,
                    target,
                })
            }
        }
    }
}

/// Splits `tokens` into the command words and an optional output redirection.
///
/// Only the first redirection-like word is honored. Everything from that word
/// onward belongs to the redirection and is dropped from the command.
pub fn extract_redirection(mut tokens: Vec<String>) -> Result<ParsedCommand, ParsingError> {
    let Some((pos, operator)) = tokens
        .iter()
        .enumerate()
        .find_map(|(i, t)| classify(t).map(|op| (i, op)))
    else {
        return Ok(ParsedCommand {
            argv: tokens,
            redirect: None,
        });
    };

    let redirect = match operator {
        Operator::Standalone { append } => match tokens.get(pos + 1) {
            Some(target) => Redirection {
                target: PathBuf::from(target),
                append,
            },
            None => return Err(ParsingError::MissingOutputFile(tokens[pos].clone())),
        },
        Operator::Merged { append, target } => Redirection {
            target: PathBuf::from(target),
            append,
        },
    };

    tokens.truncate(pos);
    debug!(argv = ?tokens, ?redirect, "extracted output redirection");
    Ok(ParsedCommand {
        argv: tokens,
        redirect: Some(redirect),
    })
}
