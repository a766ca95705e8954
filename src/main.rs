//! artbook - art-book metadata lens for catalog product pages

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use artbook_lens::cli::{Cli, Commands, ConfigCommands, HistoryCommands};
use artbook_lens::error::Result;

mod commands;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ARTBOOK_LOG")
                .unwrap_or_else(|_| EnvFilter::new("artbook_lens=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("\n{}", hint.dimmed());
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { source, url, json } => commands::cmd_inspect(&source, url, json),
        Commands::Show { source, url, json } => commands::cmd_show(&source, url, json),
        Commands::Title { raw } => commands::cmd_title(&raw),
        Commands::Price { text, euro } => commands::cmd_price(&text, euro),
        Commands::Pages { title, author, maker } => commands::cmd_pages(title, author, maker),

        Commands::History(HistoryCommands::List { limit, json }) => {
            commands::cmd_history_list(limit, json)
        }
        Commands::History(HistoryCommands::Remove { url }) => commands::cmd_history_remove(&url),
        Commands::History(HistoryCommands::Clear) => commands::cmd_history_clear(),

        Commands::Config(ConfigCommands::Show) => commands::cmd_config_show(),
        Commands::Config(ConfigCommands::Path) => commands::cmd_config_path(),

        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
