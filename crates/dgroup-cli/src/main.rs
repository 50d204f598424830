mod cmd;
mod output;
mod store;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dgroup",
    about = "Reconcile deployment groups against a declared configuration",
    version,
    propagate_version = true
)]
struct Cli {
    /// Directory holding the group store
    #[arg(long, global = true, env = "DGROUP_STORE", default_value = ".dgroup")]
    store: PathBuf,

    /// Reconciler settings file (poll budget, backoff, validation rules)
    #[arg(long, global = true, env = "DGROUP_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a group file without touching the store
    Validate { file: PathBuf },

    /// Show what apply would change
    Plan { file: PathBuf },

    /// Create or update the group described by a file
    Apply { file: PathBuf },

    /// Show a stored group and its attributes
    Show {
        #[arg(long)]
        app: String,
        #[arg(long)]
        group: String,
    },

    /// Delete a group and wait until it is gone
    Destroy {
        #[arg(long)]
        app: String,
        #[arg(long)]
        group: String,
        /// Stop waiting after this many seconds, even if the poll budget allows more
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Inspect reconciler settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = cmd::Context {
        store: cli.store,
        config: cli.config,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Validate { file } => cmd::validate::run(&ctx, &file),
        Commands::Plan { file } => cmd::plan::run(&ctx, &file),
        Commands::Apply { file } => cmd::apply::run(&ctx, &file),
        Commands::Show { app, group } => cmd::show::run(&ctx, &app, &group),
        Commands::Destroy {
            app,
            group,
            timeout,
        } => cmd::destroy::run(&ctx, &app, &group, timeout),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
