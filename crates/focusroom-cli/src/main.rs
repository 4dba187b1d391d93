use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focusroom-cli", version, about = "Focusroom CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Focus session control (state persisted between invocations)
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Run a session in the foreground with simulated background sound
    Run(commands::run::RunArgs),
    /// Background sound catalog and previews
    Sound {
        #[command(subcommand)]
        action: commands::sound::SoundAction,
    },
    /// Focused-task ranking
    Tasks {
        #[command(subcommand)]
        action: commands::tasks::TasksAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Recently reported sessions
    History {
        /// Number of sessions to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Session statistics
    Stats,
}

/// Initializes the logging subsystem. Logs go to stderr so stdout stays
/// machine readable.
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("FOCUSROOM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Run(args) => commands::run::run(args),
        Commands::Sound { action } => commands::sound::run(action),
        Commands::Tasks { action } => commands::tasks::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::History { limit } => commands::history::run(limit),
        Commands::Stats => commands::stats::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
