use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::filters::apply::parse_date;
use crate::filters::{FilterCriteria, parse_query};
use crate::index_storage::CacheStore;
use crate::operations::export_metadata;
use crate::store::RecordStore;
use crate::utils::{format_timestamp, sanitize_for_display};

const TITLE_WIDTH: usize = 70;
const PREVIEW_WIDTH: usize = 110;

#[derive(Parser)]
#[command(name = "chat-history-manager")]
#[command(version)]
#[command(about = "Search and export cached conversation history", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Snapshot directory (defaults to the platform cache directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search cached conversations
    Search {
        /// Query: words, `a | b`, `/regex/`, `id:<ids>`, `not:<term>`
        query: String,

        /// Only conversations updated on or after this date (YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,

        /// Only conversations updated on or before this date (YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,

        /// Match indexed conversation content as well as titles
        #[arg(long)]
        content: bool,

        /// Maximum number of results to print
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show statistics about the cached conversations
    Stats,
    /// Write `{id, name, updated_at}` for cached conversations to a JSON file
    ExportMetadata {
        /// Output file
        out: PathBuf,

        /// Only export conversations matching this query
        query: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let cache = match &cli.cache_dir {
        Some(dir) => CacheStore::new(dir),
        None => CacheStore::open_default()?,
    };

    match cli.command {
        Some(Commands::Search { query, after, before, content, limit }) => {
            let criteria = build_criteria(&query, after.as_deref(), before.as_deref(), content)?;
            search(&cache, &config, criteria, limit)?;
        }
        Some(Commands::Stats) => {
            show_stats(&cache, &config)?;
        }
        Some(Commands::ExportMetadata { out, query }) => {
            export(&cache, &config, &out, query.as_deref())?;
        }
        Some(Commands::Config) => {
            print!("{}", config.to_toml()?);
        }
        None => {
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn build_criteria(
    query: &str,
    after: Option<&str>,
    before: Option<&str>,
    content: bool,
) -> Result<FilterCriteria> {
    let mut criteria = FilterCriteria::new(parse_query(query)).with_content(content);
    if let Some(value) = after {
        let date = parse_date(value).with_context(|| format!("Invalid --after date: {}", value))?;
        criteria = criteria.after_date(date);
    }
    if let Some(value) = before {
        let date =
            parse_date(value).with_context(|| format!("Invalid --before date: {}", value))?;
        criteria = criteria.before_date(date);
    }
    Ok(criteria)
}

fn load_store(cache: &CacheStore, config: &AppConfig) -> Result<RecordStore> {
    let mut store = RecordStore::new();
    cache.restore_into(&mut store, &config.cache)?;
    Ok(store)
}

fn search(cache: &CacheStore, config: &AppConfig, criteria: FilterCriteria, limit: usize) -> Result<()> {
    let mut store = load_store(cache, config)?;
    if store.is_empty() {
        println!("No cached conversations in {}", cache.dir().display());
        return Ok(());
    }

    store.apply_filter(criteria);
    let total = store.visible_count();

    for record in store.visible().take(limit) {
        let label = record.match_source().map(|s| format!("  [{}]", s.label())).unwrap_or_default();
        println!(
            "{:>12}  {}{}",
            format_timestamp(&record.updated_at),
            sanitize_for_display(record.title(), TITLE_WIDTH),
            label
        );
        println!("{:>12}  {}", "", record.id());
        if !record.match_preview().is_empty() {
            println!("{:>12}  {}", "", sanitize_for_display(record.match_preview(), PREVIEW_WIDTH));
        }
    }

    if total > limit {
        println!("... {} more (use --limit to show more)", total - limit);
    }
    println!("{} of {} conversations matched", total, store.len());
    Ok(())
}

fn show_stats(cache: &CacheStore, config: &AppConfig) -> Result<()> {
    let store = load_store(cache, config)?;
    let stats = store.stats();

    println!("Conversation Cache Statistics");
    println!("=============================");
    println!("Total conversations: {}", stats.total);
    println!("  Content indexed: {}", stats.indexed);
    println!();
    println!("Cache directory: {}", cache.dir().display());

    if let Some(newest) = store.newest_update() {
        println!("Newest update: {}", newest.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(oldest) = store.records().map(|r| r.updated_at).min() {
        println!("Oldest update: {}", oldest.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

fn export(cache: &CacheStore, config: &AppConfig, out: &Path, query: Option<&str>) -> Result<()> {
    let mut store = load_store(cache, config)?;
    if store.is_empty() {
        bail!("No cached conversations in {}", cache.dir().display());
    }
    if let Some(query) = query {
        store.apply_filter(FilterCriteria::new(parse_query(query)));
    }

    let ids: Vec<String> = store.visible().map(|r| r.id().to_string()).collect();
    let summary = export_metadata(&store, &ids, out)
        .with_context(|| format!("Failed to export to {}", out.display()))?;

    println!("Exported {} conversations to {}", summary.exported, summary.path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_criteria_parses_dates() {
        let criteria = build_criteria("rust", Some("2025-01-01"), Some("2025-02-01"), true).unwrap();
        assert!(criteria.after.is_some());
        assert!(criteria.before.is_some());
        assert!(criteria.search_content);
    }

    #[test]
    fn test_build_criteria_rejects_bad_date() {
        let err = build_criteria("rust", Some("01/02/2025"), None, false).unwrap_err();
        assert!(err.to_string().contains("--after"));
    }
}
