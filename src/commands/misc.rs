//! Miscellaneous commands: title, price, config, completions

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;

use artbook_lens::cli::{Cli, CompletionShell};
use artbook_lens::config::Config;
use artbook_lens::error::{LensError, Result};
use artbook_lens::extract::{extract_price_eur, extract_price_yen};
use artbook_lens::normalize::{detect_bonus_label, normalize_title};
use artbook_lens::page_facts::PageSnapshot;
use artbook_lens::price::{format_eur, format_yen};

pub fn cmd_title(raw: &str) -> Result<()> {
    println!("{}", normalize_title(raw));
    if let Some(label) = detect_bonus_label(raw) {
        println!("{} {}", "bonus:".dimmed(), label);
    }
    Ok(())
}

pub fn cmd_price(text: &str, euro: bool) -> Result<()> {
    // run the same matchers the page extractor uses
    let page = PageSnapshot {
        body_text: text.to_string(),
        ..Default::default()
    };
    let (value, shown) = if euro {
        let v = extract_price_eur(&page);
        (v, format_eur(v))
    } else {
        let v = extract_price_yen(&page);
        (v, format_yen(v))
    };
    match value {
        Some(_) => {
            println!("{}", shown);
            Ok(())
        }
        None => Err(LensError::ExtractionError(format!("No price in '{}'", text))),
    }
}

pub fn cmd_config_show() -> Result<()> {
    let config = Config::load()?;
    let content = toml::to_string_pretty(&config)
        .map_err(|e| LensError::ConfigError(e.to_string()))?;
    println!("{}", content);
    Ok(())
}

pub fn cmd_config_path() -> Result<()> {
    let config_path = Config::config_path()?;
    let status = if config_path.exists() { "" } else { " (not created, using defaults)" };
    println!("Config:   {}{}", config_path.display(), status.dimmed());
    println!("Database: {}", Config::db_path()?.display());
    Ok(())
}

/// Generate shell completions
pub fn cmd_completions(shell: CompletionShell) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
        CompletionShell::Powershell => Shell::PowerShell,
    };
    generate(shell, &mut cmd, "artbook", &mut io::stdout());
    Ok(())
}
