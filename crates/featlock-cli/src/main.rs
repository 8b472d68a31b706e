mod commands;

use clap::{Parser, Subcommand};
use commands::{Context, Failure, EXIT_FAILURE};
use featlock_schema::Settings;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEVCONTAINER_DIR: &str = ".devcontainer";

#[derive(Debug, Parser)]
#[command(
    name = "featlock",
    version,
    about = "Lock and drift-check devcontainer feature versions"
)]
struct Cli {
    /// Workspace containing the `.devcontainer` directory.
    #[arg(long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Settings file (defaults to `.devcontainer/featlock.toml` in the workspace).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Snapshot the configured features and write the lock if anything changed.
    Generate {
        /// Lock file path.
        lock: Option<PathBuf>,
    },
    /// Compare the configured features against the lock.
    Check {
        /// Lock file path.
        lock: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("FEATLOCK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let result = build_context(&cli).and_then(|ctx| match cli.command {
        Commands::Generate { .. } => commands::generate::run(&ctx),
        Commands::Check { .. } => commands::check::run(&ctx),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(failure) => {
            eprintln!("error: {}", failure.message);
            if let Some(detail) = &failure.detail {
                eprintln!("{detail}");
            }
            ExitCode::from(failure.code)
        }
    }
}

fn build_context(cli: &Cli) -> Result<Context, Failure> {
    let workspace = &cli.workspace;
    let settings = load_settings(workspace, cli.settings.as_deref())?
        .with_env_overrides(|key| std::env::var(key).ok());

    let devcontainer = settings.devcontainer.as_ref().map_or_else(
        || workspace.join(DEVCONTAINER_DIR).join("devcontainer.json"),
        |p| workspace.join(p),
    );
    let lock_arg = match &cli.command {
        Commands::Generate { lock } | Commands::Check { lock } => lock.clone(),
    };
    let lock = lock_arg.unwrap_or_else(|| {
        settings.lock.as_ref().map_or_else(
            || workspace.join(DEVCONTAINER_DIR).join("features.lock"),
            |p| workspace.join(p),
        )
    });

    Ok(Context {
        devcontainer,
        lock,
        settings,
        json: cli.json,
    })
}

fn load_settings(workspace: &Path, explicit: Option<&Path>) -> Result<Settings, Failure> {
    let loaded = match explicit {
        Some(path) => Settings::load(path).map_err(|e| (path.to_path_buf(), e)),
        None => {
            let path = workspace.join(DEVCONTAINER_DIR).join("featlock.toml");
            Settings::load_or_default(&path).map_err(|e| (path, e))
        }
    };
    loaded.map_err(|(path, e)| Failure::new(format!("{}: {e}", path.display()), EXIT_FAILURE))
}
