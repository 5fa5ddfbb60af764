//! Integration tests for the complete enrichment pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Result page → Parser → Cache entry → Scorer → Output row
//! - Hand-edited cache files → Driver → Rewritten cache (extra fields kept)
//! - Refresh → Cache overwrite
//!
//! Run with: cargo test --test integration_tests

use std::fs;
use std::sync::atomic::AtomicBool;

use phone_enrich_cache::{CacheKey, LookupCache, LookupOutcome};
use phone_enrich_engine::{run, EnrichConfig, EnrichJob};
use phone_enrich_lookup::{
    parse_result_page, Fetcher, LookupError, LookupQuery, PeopleSearch, RecordingSleeper,
};
use phone_enrich_match::Candidate;
use tempfile::tempdir;

const RESULTS_PAGE: &str =
    include_str!("../crates/phone-enrich-lookup/tests/fixtures/results_page.html");

/// Serves one saved result page for every query, like the live site would.
struct SavedPage {
    html: &'static str,
    requests: usize,
}

impl PeopleSearch for SavedPage {
    fn search(&mut self, _query: &LookupQuery) -> Result<Vec<Candidate>, LookupError> {
        self.requests += 1;
        Ok(parse_result_page(self.html))
    }
}

fn run_with(config: EnrichConfig, input: &std::path::Path, output: &std::path::Path) -> usize {
    let job = EnrichJob {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        config,
        restart: false,
    };
    let mut cache = job.config.open_cache().expect("cache");
    let mut fetcher = Fetcher::new(
        SavedPage {
            html: RESULTS_PAGE,
            requests: 0,
        },
        job.config.pacer(),
        job.config.backoff(),
        RecordingSleeper::new(),
    );
    run(&job, &mut cache, &mut fetcher, &AtomicBool::new(false)).expect("run");
    fetcher.search().requests
}

// ============================================================================
// Page → cache → scorer → output
// ============================================================================

#[test]
fn test_parsed_page_flows_into_output() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    fs::write(
        &input,
        "Folio,Name,Address\n\
         01-001,SMITH JOHN A,100 Ocean Dr\n\
         01-002,SMITH JOHN,\"500 Collins Ave, Miami Beach, FL 33139\"\n",
    )
    .expect("input");

    let config = EnrichConfig {
        cache_path: dir.path().join("cache.json"),
        sleep_sec: 0.0,
        ..Default::default()
    };
    let requests = run_with(config.clone(), &input, &output);
    // different cities, so two identities; the first also runs its
    // middle-initial search
    assert_eq!(requests, 3);

    let mut reader = csv::Reader::from_path(&output).expect("output");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    // Miami row: John A Smith's two phones
    assert_eq!(&rows[0][3], "(305) 555-0100");
    assert_eq!(&rows[0][4], "(786) 555-0101");
    // Miami Beach row: only the Miami Beach card survives the location filter
    assert_eq!(&rows[1][3], "(305) 555-0200");
    assert_eq!(&rows[1][4], "");

    let cache = LookupCache::open(&config.cache_path).expect("cache");
    let entry = cache
        .get(&CacheKey::new("SMITH JOHN A", "Miami", "FL"))
        .expect("entry");
    assert_eq!(entry.outcome, LookupOutcome::Found);
    assert_eq!(entry.candidates.len(), 2);
    assert_eq!(entry.candidates[0].aka, vec!["Johnny Smith", "J A Smith"]);
}

// ============================================================================
// Cache file compatibility
// ============================================================================

#[test]
fn test_hand_edited_cache_fields_survive_refresh() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    let cache_path = dir.path().join("cache.json");
    fs::write(&input, "Name,Address\nSMITH JOHN A,100 Ocean Dr\n").expect("input");
    fs::write(
        &cache_path,
        r#"{
  "smith john a|miami|fl": {
    "candidates": [],
    "fetched_at": "2024-01-01T00:00:00Z",
    "outcome": "not_found",
    "reviewed_by": "ops"
  }
}"#,
    )
    .expect("cache");

    // cached not-found: no request, no phones
    let config = EnrichConfig {
        cache_path: cache_path.clone(),
        sleep_sec: 0.0,
        ..Default::default()
    };
    assert_eq!(run_with(config.clone(), &input, &output), 0);

    // refresh fetches (plain and middle-initial search), overwrites the
    // payload and keeps the reviewer note
    let refreshed = EnrichConfig {
        refresh: true,
        ..config
    };
    assert_eq!(run_with(refreshed, &input, &output), 2);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&cache_path).expect("read")).expect("json");
    let entry = &raw["smith john a|miami|fl"];
    assert_eq!(entry["outcome"], serde_json::json!("found"));
    assert_eq!(entry["reviewed_by"], serde_json::json!("ops"));
    assert!(fs::read_to_string(&output)
        .expect("output")
        .contains("(305) 555-0100"));
}

#[test]
fn test_cache_written_by_one_run_is_read_by_the_next() {
    let dir = tempdir().expect("tempdir");
    let input = dir.path().join("in.csv");
    fs::write(&input, "Name,Address\nSMITH JOHN A,100 Ocean Dr\n").expect("input");
    let config = EnrichConfig {
        cache_path: dir.path().join("nested/cache/people.json"),
        sleep_sec: 0.0,
        ..Default::default()
    };

    assert_eq!(run_with(config.clone(), &input, &dir.path().join("a.csv")), 2);
    assert_eq!(run_with(config, &input, &dir.path().join("b.csv")), 0);
    assert_eq!(
        fs::read(dir.path().join("a.csv")).expect("a"),
        fs::read(dir.path().join("b.csv")).expect("b")
    );
}
