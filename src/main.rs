use argh::FromArgs;
use jobshell::Interpreter;
use jobshell::config::ShellConfig;
use jobshell::signals;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Interactive shell with aliases, background jobs and simple redirections.
struct Args {
    #[argh(option, default = "ShellConfig::default().prompt")]
    /// text printed before each command line.
    prompt: String,

    #[argh(option, default = "ShellConfig::default().max_line")]
    /// longest accepted command line in bytes; longer lines are rejected.
    max_line: usize,

    #[argh(option, default = "String::from(\"warn\")")]
    /// log filter used when RUST_LOG is not set, e.g. `debug` or `jobshell=trace`.
    log_filter: String,
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let config = ShellConfig {
        prompt: args.prompt,
        max_line: args.max_line,
        ..ShellConfig::default()
    };
    let mut sh = Interpreter::with_config(config);

    if let Err(e) = signals::install(Arc::clone(&sh.env().jobs)) {
        eprintln!("jobshell: {}", e);
        return ExitCode::FAILURE;
    }

    match sh.repl() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("jobshell: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
