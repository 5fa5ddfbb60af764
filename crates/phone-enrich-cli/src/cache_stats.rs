//! `phone-enrich cache stats`

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use phone_enrich_cache::LookupCache;

pub fn cmd_cache_stats(path: &Path) -> Result<()> {
    let cache = LookupCache::open(path)
        .with_context(|| format!("failed to open cache {}", path.display()))?;
    let stats = cache.stats();

    println!("{} {}", "Cache".green().bold(), path.display().to_string().bold());
    println!("  entries:    {}", stats.entries);
    println!("  found:      {}", stats.found);
    println!("  not found:  {}", stats.not_found);
    println!("  errors:     {}", stats.errors);
    println!("  candidates: {}", stats.candidates);
    match (stats.oldest, stats.newest) {
        (Some(oldest), Some(newest)) => {
            println!("  oldest:     {}", oldest.to_rfc3339());
            println!("  newest:     {}", newest.to_rfc3339());
        }
        _ => println!("  {}", "(empty)".yellow()),
    }
    Ok(())
}
