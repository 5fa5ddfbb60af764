//! `phone-enrich score`: offline ranking of a saved result page.

use std::fs;

use anyhow::{Context, Result};
use colored::Colorize;
use phone_enrich_lookup::parse_result_page;
use phone_enrich_match::{score, LocationLine, Rejection, ScoringConfig, Target};

use crate::ScoreArgs;

pub fn cmd_score(args: &ScoreArgs) -> Result<()> {
    let html = fs::read_to_string(&args.html)
        .with_context(|| format!("failed to read {}", args.html.display()))?;
    let candidates = parse_result_page(&html);

    let mut config = ScoringConfig::default();
    if let Some(order) = args.name_order {
        config.name_order = order.into();
    }
    let line = LocationLine::parse_with_city(&args.address, &args.city);
    let target = Target {
        name: args.name.clone(),
        street: line.street,
        city: args.city.clone(),
        state: args.state.clone(),
    };

    let ranking = score(&target, &candidates, &config);
    println!(
        "{} {} candidates from {} ({:?})",
        "Parsed".green().bold(),
        candidates.len(),
        args.html.display(),
        ranking.status()
    );

    for scored in &ranking.accepted {
        let c = &scored.candidate;
        println!(
            "  {} #{} {:.3} (name {:.2}, address {:.2}) {} | {}, {} {} | {}",
            "✓".green(),
            scored.rank + 1,
            scored.score,
            scored.name_score,
            scored.address_score,
            c.name,
            c.street,
            c.city,
            c.state,
            c.phones.join(", ")
        );
    }
    for rejected in &ranking.rejected {
        let reason = match &rejected.reason {
            Rejection::BusinessName => "business name".to_string(),
            Rejection::LocationMismatch => "different city/state".to_string(),
            Rejection::NoPhones => "no phones".to_string(),
            Rejection::BelowThreshold { score } => {
                format!("score {score:.3} below {:.2}", config.min_score)
            }
        };
        println!(
            "  {} #{} {} ({})",
            "✗".red(),
            rejected.rank + 1,
            rejected.name,
            reason
        );
    }

    let slots = ranking.phones(&config);
    for slot in 0..config.max_phones {
        println!("Phone{}: {}", slot + 1, slots.slot(slot));
    }
    Ok(())
}
