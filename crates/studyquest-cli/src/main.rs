use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "studyquest-cli", version, about = "Studyquest progression CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Player profiles
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Daily streak operations
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// Quiz duels
    Duel {
        #[command(subcommand)]
        action: commands::duel::DuelAction,
    },
    /// Claim a reward
    Claim {
        claimable: Uuid,
        #[arg(long)]
        actor: Uuid,
    },
    /// Badge evaluation
    Badges {
        #[command(subcommand)]
        action: commands::badges::BadgesAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Profile { action } => commands::profile::run(action),
        Commands::Streak { action } => commands::streak::run(action),
        Commands::Duel { action } => commands::duel::run(action),
        Commands::Claim { claimable, actor } => commands::claim::run(claimable, actor),
        Commands::Badges { action } => commands::badges::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
