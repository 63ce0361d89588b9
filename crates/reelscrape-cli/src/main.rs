//! Reelscrape CLI: scrape a profile's post feed into JSON and CSV.

mod cli;

use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use cli::extract_cmd::ExtractArgs;
use cli::logging::LogFormat;
use cli::scrape_cmd::ScrapeArgs;

#[derive(Parser)]
#[command(
    name = "reelscrape",
    about = "Scrape every post of a profile feed into JSON and CSV",
    version,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    scrape: ScrapeArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a profile (default).
    Scrape(ScrapeArgs),

    /// Extract items from a saved page without launching a browser.
    Extract(ExtractArgs),

    /// Check that a Chromium binary can be found.
    Doctor,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   reelscrape completions bash > ~/.local/share/bash-completion/completions/reelscrape
    ///   reelscrape completions zsh > ~/.zfunc/_reelscrape
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    cli::logging::init(&cli.log_level, cli.log_format);

    match cli.command.unwrap_or(Commands::Scrape(cli.scrape)) {
        Commands::Scrape(args) => cli::scrape_cmd::run(args).await,

        Commands::Extract(args) => {
            cli::extract_cmd::run(args)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Doctor => {
            cli::doctor::run()?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "reelscrape", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}
