use minishell::Interpreter;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match Interpreter::default().repl() {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{e:#}");
            process::exit(1);
        }
    }
}
