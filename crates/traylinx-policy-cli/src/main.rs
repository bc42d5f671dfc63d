//! Traylinx Policy CLI
//!
//! Checks a single agent action against the security policy and reports the
//! verdict through its exit status, so wrappers can gate the real operation:
//!
//!   traylinx-policy shell "rm -rf build"      Check a shell command
//!   traylinx-policy file delete notes.md      Check a file operation
//!   traylinx-policy pull python:3.11          Check an image pull
//!   traylinx-policy compose docker-compose.yml
//!   traylinx-policy run-flags                 Print hardened `docker run` flags
//!
//! Exit status is 0 when the action may proceed, 1 when it must not, and 2
//! when the check itself could not run.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use traylinx_policy::{PolicyConfig, PolicyDecision, PolicyEngine, PolicyResult};

#[derive(Debug, Parser)]
#[command(
    name = "traylinx-policy",
    version,
    about = "Check agent actions against the security policy"
)]
struct Cli {
    /// Sandbox root for file and path checks [default: current directory]
    #[arg(long, global = true, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Policy config file (TOML if it ends in .toml, JSON otherwise)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Never prompt; actions needing confirmation are decided without asking
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Print the verdict as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Confirm every prompt automatically
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    /// Log every policy decision to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a shell command before running it
    Shell {
        /// The full command line, quoted as one argument
        #[arg(allow_hyphen_values = true)]
        command: String,
    },
    /// Check a file operation (read, write, delete, ...)
    File {
        /// Operation name
        operation: String,
        /// Target path, relative to the workdir or absolute
        path: PathBuf,
    },
    /// Check a container image before pulling it
    Pull {
        /// Image reference
        image: String,
    },
    /// Audit a compose file before bringing it up
    Compose {
        /// Path to the compose YAML file
        file: PathBuf,
    },
    /// Print the flags every container launch must carry, one per line
    RunFlags,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("traylinx-policy: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Run the check, returning whether the action may proceed.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = match &cli.config {
        Some(path) => {
            let config = PolicyConfig::from_path(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            config.validate().context("invalid policy config")?;
            config
        }
        None => PolicyConfig::default(),
    };

    let workdir = match cli.workdir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };
    let engine = PolicyEngine::new(&workdir, config, !cli.non_interactive);

    let result = match &cli.command {
        Command::Shell { command } => engine.check_shell_command(command),
        Command::File { operation, path } => engine.check_file_operation(operation, path),
        Command::Pull { image } => engine.check_docker_pull(image),
        Command::Compose { file } => engine.check_docker_compose(&load_compose(file)?),
        Command::RunFlags => {
            let flags = engine.container_flags();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&flags)?);
            } else {
                for flag in flags {
                    println!("{flag}");
                }
            }
            return Ok(true);
        }
    };

    report(&result, cli.json)?;

    let proceed = match result.decision {
        PolicyDecision::Allow => true,
        PolicyDecision::Deny => false,
        PolicyDecision::AskUser if cli.yes => true,
        PolicyDecision::AskUser => {
            let stdin = io::stdin();
            confirm(&mut stdin.lock(), &mut io::stderr()).context("reading confirmation")?
        }
    };
    Ok(proceed)
}

/// Read a compose file with YAML anchors and `<<` merge keys applied.
fn load_compose(file: &Path) -> anyhow::Result<serde_json::Value> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let mut compose: serde_yaml::Value =
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", file.display()))?;
    compose
        .apply_merge()
        .with_context(|| format!("resolving merge keys in {}", file.display()))?;
    serde_json::to_value(&compose).with_context(|| format!("converting {}", file.display()))
}

fn report(result: &PolicyResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!("{}: {}", result.decision.as_str().to_uppercase(), result.reason);
    for suggestion in &result.suggestions {
        println!("  - {suggestion}");
    }
    Ok(())
}

/// Ask `Proceed? [y/N]`; only `y` or `yes` confirms.
fn confirm(input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "Proceed? [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
