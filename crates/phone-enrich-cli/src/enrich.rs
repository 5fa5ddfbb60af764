//! `phone-enrich enrich`

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use phone_enrich_engine::{run, EnrichConfig, EnrichJob, RunReport, WindowConfig};
use phone_enrich_lookup::{Fetcher, HttpPeopleSearch};
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::EnrichArgs;

/// Config file (or defaults) with the command-line flags applied on top.
pub fn build_config(args: &EnrichArgs) -> Result<EnrichConfig> {
    let mut config = match &args.config {
        Some(path) => EnrichConfig::from_json_file(path)?,
        None => EnrichConfig::default(),
    };

    if let Some(path) = &args.cache_path {
        config.cache_path = path.clone();
    }
    if let Some(sleep) = args.sleep_sec {
        config.sleep_sec = sleep;
    }
    if let Some(jitter) = args.jitter_sec {
        config.jitter_sec = jitter;
    }
    config.refresh |= args.refresh;
    config.retry_errors |= args.retry_errors;
    if args.max_age_days.is_some() {
        config.max_age_days = args.max_age_days;
    }

    // window flags replace the file's window as a whole
    let window = WindowConfig {
        from_row: args.from_row,
        to_row: args.to_row,
        limit: args.limit,
        last: args.last,
    };
    if window != WindowConfig::default() {
        config.window = window;
    }

    let columns = &mut config.columns;
    for (flag, column) in [
        (&args.name_column, &mut columns.name),
        (&args.address_column, &mut columns.address),
    ] {
        if let Some(value) = flag {
            *column = value.clone();
        }
    }
    for (flag, column) in [
        (&args.city_column, &mut columns.city),
        (&args.state_column, &mut columns.state),
        (&args.unit_column, &mut columns.unit),
    ] {
        if flag.is_some() {
            column.clone_from(flag);
        }
    }
    if let Some(order) = args.name_order {
        config.scoring.name_order = order.into();
    }

    config.validate()?;
    Ok(config)
}

pub fn cmd_enrich(args: &EnrichArgs) -> Result<()> {
    let config = build_config(args)?;
    tracing::debug!(?config, "resolved configuration");

    // First signal asks the loop to stop at the next row boundary; a second
    // one terminates immediately.
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register_conditional_shutdown(signal, 1, Arc::clone(&stop))
            .context("failed to install signal handler")?;
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .context("failed to install signal handler")?;
    }

    let search = HttpPeopleSearch::new(&config.lookup).context("failed to set up lookup client")?;
    let mut fetcher = Fetcher::with_thread_sleeper(search, config.pacer(), config.backoff());
    let mut cache = config
        .open_cache()
        .with_context(|| format!("failed to open cache {}", config.cache_path.display()))?;

    if !args.json {
        eprintln!(
            "{} {} → {}",
            "Enriching".green().bold(),
            args.input.display(),
            args.output.display()
        );
        eprintln!(
            "  {} cache {}, {}s between requests",
            "→".cyan(),
            config.cache_path.display(),
            config.sleep_sec
        );
    }

    let job = EnrichJob {
        input: args.input.clone(),
        output: args.output.clone(),
        config,
        restart: args.restart,
    };
    let report = run(&job, &mut cache, &mut fetcher, &stop)
        .with_context(|| format!("enrichment of {} failed", job.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&job, &report);
    }
    Ok(())
}

fn fills(counts: &[usize; 4]) -> String {
    format!(
        "P1={}, P2={}, P3={}, P4={}",
        counts[0], counts[1], counts[2], counts[3]
    )
}

fn print_summary(job: &EnrichJob, report: &RunReport) {
    let window = report.window;
    match report.resumed_from {
        Some(row) => println!(
            "{} rows {}-{} (resumed at row {})",
            "Processed".green().bold(),
            window.start,
            window.end,
            row
        ),
        None => println!(
            "{} rows {}-{}",
            "Processed".green().bold(),
            window.start,
            window.end
        ),
    }
    println!(
        "  {} {} rows, {} cache hits, {} live fetches, {} failed",
        "→".cyan(),
        report.rows_processed,
        report.cache_hits,
        report.live_fetches,
        report.fetch_failures
    );
    println!(
        "  {} {} matched, {} not found, {} filtered, {} lookup errors, {} skipped",
        "→".cyan(),
        report.matched,
        report.no_candidates,
        report.all_filtered,
        report.lookup_failed,
        report.skipped
    );
    println!("Summary: {}", fills(&report.output_fills));
    println!("Total rows in enriched file: {}", report.output_rows);
    println!(
        "This session: {} in rows {}-{}",
        fills(&report.session_fills),
        window.start,
        window.end
    );
    println!("{} {}", "wrote".green().bold(), job.output.display().to_string().bold());
    if report.interrupted {
        println!(
            "{} stopped at a row boundary; run the same command again to resume",
            "interrupted:".yellow().bold()
        );
    }
}
