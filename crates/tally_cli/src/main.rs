//! Tally CLI - commit and project counts across code forges.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::commands::count::CountArgs;
#[cfg(any(feature = "github", feature = "gitlab", feature = "gitea"))]
use crate::config::Forge;

#[derive(Parser)]
#[command(name = "tally")]
#[command(version)]
#[command(about = "Count your commits and projects across code forges")]
#[command(
    long_about = "Tally lists every repository visible to you on GitHub, GitLab or a \
Gitea-based forge (Codeberg, Forgejo), counts the commits you authored in each \
within an optional date range, and reports how many commits you made and in \
how many projects."
)]
#[command(after_long_help = r#"EXAMPLES
    Count this year's GitHub activity:
        $ tally github --username octocat --from 2024-01-01

    Count only repositories with at least 5 of your commits:
        $ tally gitlab --min-commits 5 --email me@example.com

    Use a self-hosted Forgejo instance and print JSON:
        $ tally gitea --host https://git.example.com --output json

    Generate shell completions:
        $ tally completions bash > ~/.local/share/bash-completion/completions/tally

CONFIGURATION
    Tally reads configuration from, in increasing priority:
      1. ~/.config/tally/config.toml (or $XDG_CONFIG_HOME/tally/config.toml)
      2. ./tally.toml
      3. Environment variables (TALLY_* prefix) and a .env file
      4. Command-line flags

ENVIRONMENT VARIABLES
    TALLY_USERNAME            Your login
    TALLY_ACCESS_TOKEN        Personal access token for every platform
    TALLY_EMAILS              Comma-separated commit e-mails
    TALLY_NAMES               Comma-separated commit author names
    TALLY_GITHUB__TOKEN       GitHub token (likewise TALLY_GITLAB__TOKEN, TALLY_GITEA__TOKEN)
    TALLY_GITLAB__HOST        GitLab host (default: https://gitlab.com)
    TALLY_GITEA__HOST         Gitea/Forgejo host (default: https://codeberg.org)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count activity on GitHub
    #[cfg(feature = "github")]
    Github {
        #[command(flatten)]
        args: CountArgs,
    },
    /// Count activity on GitLab
    #[cfg(feature = "gitlab")]
    Gitlab {
        #[command(flatten)]
        args: CountArgs,
    },
    /// Count activity on Gitea, Forgejo or Codeberg
    #[cfg(feature = "gitea")]
    Gitea {
        #[command(flatten)]
        args: CountArgs,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cancel = CancellationToken::new();
    shutdown::setup_shutdown_handler(cancel.clone());

    // Structured logging only when not drawing progress bars
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("tally=info,tally_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    let (forge, args) = match cli.command {
        Commands::Completions { shell } => return commands::meta::handle_completions(shell),
        Commands::Man { output } => return commands::meta::handle_man(output),
        #[cfg(feature = "github")]
        Commands::Github { args } => (Forge::GitHub, args),
        #[cfg(feature = "gitlab")]
        Commands::Gitlab { args } => (Forge::GitLab, args),
        #[cfg(feature = "gitea")]
        Commands::Gitea { args } => (Forge::Gitea, args),
    };

    // Config file -> env vars -> defaults; flags are layered on top
    let config = config::Config::load();
    commands::count::handle_count(forge, args, &config, cancel).await
}
