//! History commands

use colored::Colorize;
use std::sync::Arc;

use artbook_lens::config::Config;
use artbook_lens::db::Database;
use artbook_lens::error::Result;
use artbook_lens::history::History;
use artbook_lens::price::{format_eur, format_yen};

fn open_history() -> Result<History> {
    let config = Config::load()?;
    Ok(History::new(Arc::new(Database::open()?), config.history_limit))
}

pub fn cmd_history_list(limit: usize, json: bool) -> Result<()> {
    let entries: Vec<_> = open_history()?.load()?.into_iter().take(limit).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No history yet. Run `artbook show <url>` to add one.");
        return Ok(());
    }

    println!("\nHistory:\n");
    for entry in entries {
        let when = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(entry.detected_at)
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let price = if entry.out_of_stock {
            "out of stock".yellow().to_string()
        } else {
            format!("{} ({})", format_eur(entry.price_eur), format_yen(entry.price_yen))
        };
        println!("  {}  {}", entry.title_raw.bold(), price);
        println!("    {}  {}", when.dimmed(), entry.url);
    }
    Ok(())
}

pub fn cmd_history_remove(url: &str) -> Result<()> {
    let history = open_history()?;
    let before = history.load()?.len();
    let after = history.remove(url)?.len();
    if after < before {
        println!("Removed {}", url);
    } else {
        println!("No history entry for {}", url);
    }
    Ok(())
}

pub fn cmd_history_clear() -> Result<()> {
    open_history()?.clear()?;
    println!("History cleared.");
    Ok(())
}
