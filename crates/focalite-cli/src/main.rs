use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use focalite_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod desktop;

#[derive(Parser)]
#[command(name = "focalite", version, about = "Focalite focus timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// User preferences (durations, auto-loop, sounds, accent colour)
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Daily progress statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn init_tracing(default_directive: &str) {
    let filter = std::env::var("FOCALITE_LOG")
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "focalite", &mut std::io::stdout());
        return;
    }

    init_tracing(&Config::load_or_default().log_level);

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Prefs { action } => commands::prefs::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Completions { .. } => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
