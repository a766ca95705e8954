//! Page commands: inspect, show, pages

use chrono::Utc;
use colored::Colorize;
use std::sync::Arc;

use artbook_lens::cache::PagesCache;
use artbook_lens::config::Config;
use artbook_lens::db::Database;
use artbook_lens::display::{DisplayController, PanelView};
use artbook_lens::error::{LensError, Result};
use artbook_lens::extract::Extractor;
use artbook_lens::fetch::{inline_cover, load_html, HttpFetcher};
use artbook_lens::page_facts::PageSnapshot;
use artbook_lens::price::{format_eur, format_yen};
use artbook_lens::record::ProductRecord;
use artbook_lens::resolve::PageCountResolver;

/// Load a page and extract its record
fn extract_record(config: &Config, source: &str, url: Option<String>) -> Result<ProductRecord> {
    let html = load_html(&HttpFetcher, source)?;
    let location = url.unwrap_or_else(|| source.to_string());
    let snapshot = PageSnapshot::from_html(&location, &html);

    let extractor = Extractor::new(config.site.clone());
    if !extractor.is_product_page(&snapshot) {
        return Err(LensError::NotAProductPage(location));
    }
    extractor
        .extract(&snapshot)
        .ok_or_else(|| LensError::ExtractionError(format!("No title or cover on {}", location)))
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or("—")
        .to_string()
}

/// Print the extracted record
pub fn cmd_inspect(source: &str, url: Option<String>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let record = extract_record(&config, source, url)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("\n{}\n", record.title_raw.bold());
    println!("  URL:       {}", record.url);
    println!("  Japanese:  {}", or_dash(Some(&record.title_jp)));
    println!("  Author:    {}", or_dash(record.author.as_deref()));
    println!("  Maker:     {}", or_dash(record.maker.as_deref()));
    println!(
        "  Pages:     {}",
        record.pages.map(|p| p.to_string()).unwrap_or_else(|| "—".into())
    );
    println!("  Yen:       {}", format_yen(record.price_yen));
    println!("  Euro:      {}", format_eur(record.price_eur));
    if record.out_of_stock {
        println!("  Stock:     {}", "out of stock".yellow());
    } else {
        println!("  Stock:     {}", "available".green());
    }
    println!("  Cover:     {}", record.cover_url);
    Ok(())
}

fn print_view(view: &PanelView) {
    println!("\n{}", view.title.bold());
    if let Some(ref jp) = view.title_jp {
        println!("{}", jp.dimmed());
    }
    println!();
    if let Some(ref href) = view.title_href {
        println!("  URL:     {}", href);
    }
    println!("  Pages:   {}", view.pages);
    println!("  Price:   {} {}", view.price_eur.bold(), view.price_yen);
    if let Some(ref links) = view.links {
        println!("\n  Amazon:     {}", links.amazon_en);
        println!("  eBay:       {}", links.ebay_en);
        println!("  Amazon JP:  {}", links.amazon_jp);
        println!("  eBay JP:    {}", links.ebay_jp);
        println!("  Lens:       {}", links.lens);
        println!("  Video:      {}", links.video);
    }
    if !view.status.is_empty() {
        println!("\n  {}", view.status.yellow());
    }
}

/// Run a page through the panel pipeline and record it in history
pub fn cmd_show(source: &str, url: Option<String>, json: bool) -> Result<()> {
    let config = Config::load()?;
    let mut record = extract_record(&config, source, url)?;
    record.stamp_now();
    record.cover_data_url = inline_cover(&HttpFetcher, &record.cover_url, config.max_cover_bytes);

    let db = Arc::new(Database::open()?);
    let mut display = DisplayController::new(config, db, Arc::new(HttpFetcher));
    let view = display
        .render(&record)
        .ok_or_else(|| LensError::ExtractionError("Nothing to render".into()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
    } else {
        print_view(view);
    }
    Ok(())
}

/// Resolve a page count from the catalog lookups
pub fn cmd_pages(title: String, author: Option<String>, maker: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let db = Arc::new(Database::open()?);
    let resolver = PageCountResolver::new(
        PagesCache::new(db, config.pages_cache_ttl_ms()),
        Arc::new(HttpFetcher),
    );
    let record = ProductRecord {
        title_raw: title,
        author,
        maker,
        ..Default::default()
    };

    match resolver.resolve(&record, Utc::now().timestamp_millis()) {
        Some(pages) => println!("{}", pages),
        None => println!("{}", "No page count found.".dimmed()),
    }
    Ok(())
}
