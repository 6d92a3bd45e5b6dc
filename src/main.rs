//! Purpose: `sendit` CLI entry point.
//! Role: Binary crate root; parses args, installs logging, runs the bridge host.
//! Invariants: stdout belongs to the host protocol; logs and errors go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, IsTerminal};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod stdio_host;

use sendit::api::{DEFAULT_CHANNEL, Error, to_exit_code};

#[derive(Parser, Debug)]
#[command(
    name = "sendit",
    version,
    about = "Bridge UI channel calls to an interactive message composer"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the bridge over newline-delimited JSON on stdin/stdout.
    Serve(ServeArgs),
    /// Print the version as JSON.
    Version,
    /// Generate shell completions.
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Channel name reported in notices and logs.
    #[arg(long, default_value = DEFAULT_CHANNEL)]
    channel: String,
    /// Start with the composer unable to send (answers SMS_NOT_AVAILABLE).
    #[arg(long)]
    unavailable: bool,
}

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            init_tracing();
            stdio_host::serve(stdio_host::HostConfig {
                channel: args.channel,
                can_send: !args.unavailable,
            })
        }
        Command::Version => {
            println!(
                "{}",
                json!({ "name": "sendit", "version": env!("CARGO_PKG_VERSION") })
            );
            Ok(())
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "sendit", &mut io::stdout());
            Ok(())
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        if let Some(hint) = err.hint() {
            eprintln!("hint: {hint}");
        }
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"code\":\"INTERNAL\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("code".to_string(), json!(err.code()));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or(err.code())),
    );
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(source) = std::error::Error::source(err) {
        inner.insert("cause".to_string(), json!(source.to_string()));
    }
    json!({ "error": Value::Object(inner) })
}
