mod commands;

use blueprint_core::{Config, Engine};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_BLUEPRINT_ERROR, EXIT_FAILURE, EXIT_STORE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "blueprint",
    version,
    about = "Reverse-engineer server configuration into diffable, versioned blueprints"
)]
struct Cli {
    /// Path to the blueprint store directory.
    #[arg(long, default_value = "~/.blueprints", global = true)]
    store: String,

    /// Read configuration from this file instead of /etc/blueprint.toml and
    /// ~/.blueprint.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

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
    /// List stored blueprints.
    List,
    /// Print a stored blueprint as JSON.
    Show {
        name: String,
        /// Full or abbreviated revision id (defaults to the branch head).
        #[arg(short, long)]
        revision: Option<String>,
        /// Print resource counts instead of the document.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },
    /// Commit a blueprint document under a name, applying ignore rules.
    Commit {
        name: String,
        /// Blueprint JSON file, or `-` for stdin.
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Directory holding the source tarballs the document names.
        #[arg(long, default_value = ".")]
        sources: PathBuf,
        /// Commit message.
        #[arg(short, long)]
        message: Option<String>,
        /// Ignore files to read instead of /etc/blueprintignore and
        /// ~/.blueprintignore.
        #[arg(long = "ignore-file")]
        ignore_files: Vec<PathBuf>,
    },
    /// Subtract one blueprint from another.
    Diff {
        minuend: String,
        subtrahend: String,
        /// Commit the difference under this name instead of printing it.
        target: Option<String>,
    },
    /// Delete a blueprint's branch.
    Destroy { name: String },
    /// Show the revision history of a blueprint.
    Log { name: String },
    /// Print ignore rules: those stored with a blueprint, or the local ones.
    Rules {
        name: Option<String>,
        #[arg(short, long, requires = "name")]
        revision: Option<String>,
        /// Report whether each path would be ignored.
        #[arg(long)]
        check: Vec<String>,
    },
    /// Remove objects no blueprint can reach.
    Gc {
        /// Only report what would be removed.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Verify store integrity.
    VerifyStore,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
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
            tracing_subscriber::EnvFilter::try_from_env("BLUEPRINT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let store_path = expand_tilde(&cli.store);
    tracing::debug!("using store at {}", store_path.display());
    let engine = Engine::new(&store_path, config);
    let json_output = cli.json;

    let result = match cli.command {
        Commands::List => commands::list::run(&engine, json_output),
        Commands::Show {
            name,
            revision,
            summary,
        } => commands::show::run(&engine, &name, revision.as_deref(), summary, json_output),
        Commands::Commit {
            name,
            input,
            sources,
            message,
            ignore_files,
        } => commands::commit::run(
            &engine,
            &name,
            &input,
            &sources,
            message,
            &ignore_files,
            json_output,
        ),
        Commands::Diff {
            minuend,
            subtrahend,
            target,
        } => commands::diff::run(
            &engine,
            &minuend,
            &subtrahend,
            target.as_deref(),
            json_output,
        ),
        Commands::Destroy { name } => commands::destroy::run(&engine, &name, json_output),
        Commands::Log { name } => commands::log::run(&engine, &name, json_output),
        Commands::Rules {
            name,
            revision,
            check,
        } => commands::rules::run(
            &engine,
            name.as_deref(),
            revision.as_deref(),
            &check,
            json_output,
        ),
        Commands::Gc { dry_run } => commands::gc::run(&engine, dry_run, json_output),
        Commands::VerifyStore => commands::verify_store::run(&engine, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("blueprint error:")
                || msg.starts_with("failed to parse blueprint")
                || msg.starts_with("invalid blueprint name")
                || msg.starts_with("invalid ignore rule")
            {
                EXIT_BLUEPRINT_ERROR
            } else if msg.starts_with("store error:") || msg.starts_with("store lock:") {
                EXIT_STORE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
