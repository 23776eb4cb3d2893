mod cmd;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use rolesync_core::config::DEFAULT_PORT;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "rolesync",
    about = "Keep a Discord subscriber role in sync with a subscription service",
    version,
    propagate_version = true
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        #[command(flatten)]
        settings: Settings,

        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Reconcile a single user once and print the outcome
    Reconcile {
        #[command(flatten)]
        settings: Settings,

        /// Subscription service user id
        #[arg(long)]
        user_id: String,

        /// Only revoke the role (same as POST /remove-role)
        #[arg(long)]
        remove: bool,
    },

    /// Validate settings and check the guild can be reached
    Check {
        #[command(flatten)]
        settings: Settings,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve { settings, port } => cmd::serve::run(&settings, port),
        Commands::Reconcile {
            settings,
            user_id,
            remove,
        } => cmd::reconcile::run(&settings, &user_id, remove, cli.json),
        Commands::Check { settings } => cmd::check::run(&settings, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
