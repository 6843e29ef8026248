//! A small interactive command interpreter.
//!
//! A line of input goes through three stages: [`lexer`] splits it into words
//! honoring quotes and backslash escapes, [`parser`] separates an output
//! redirection from the command words, and [`Interpreter`] resolves the command
//! name to a builtin or an executable on `PATH` and runs it.
//!
//! The public modules [`command`] and [`env`] expose the data types passed
//! between the stages and the [`command::Host`] trait through which the
//! interpreter reaches the operating system.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod external;
mod interpreter;
pub mod lexer;
pub mod parser;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, PROMPT, resolve};
