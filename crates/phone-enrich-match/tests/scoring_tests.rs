use phone_enrich_match::{
    score, score_candidate, Candidate, MatchStatus, Rejection, ScoringConfig, Target,
};

fn miami_target(name: &str, street: &str) -> Target {
    Target {
        name: name.to_string(),
        street: street.to_string(),
        city: "Miami".to_string(),
        state: "FL".to_string(),
    }
}

#[test]
fn business_candidate_is_dropped_and_first_phone_fills_slot_one() {
    let config = ScoringConfig::default();
    let target = miami_target("John A Smith", "");
    let candidates = vec![
        Candidate::new("John Smith", "", "Miami", "FL", &["305-555-0100"]),
        Candidate::new("Jon Smith LLC", "", "Miami", "FL", &["305-555-0200"]),
    ];

    let ranking = score(&target, &candidates, &config);
    assert_eq!(ranking.accepted.len(), 1);
    assert_eq!(ranking.accepted[0].candidate.name, "John Smith");
    assert_eq!(ranking.rejected.len(), 1);
    assert_eq!(ranking.rejected[0].reason, Rejection::BusinessName);

    let slots = ranking.phones(&config);
    assert_eq!(slots.slot(0), "305-555-0100");
    assert_eq!(slots.slot(1), "");
}

#[test]
fn llc_scores_zero_even_with_perfect_address() {
    let target = miami_target("SMITH JON", "100 Ocean Dr");
    let cand = Candidate::new("Jon Smith LLC", "100 Ocean Dr", "Miami", "FL", &["3055550200"]);
    let s = score_candidate(&target, &cand, &ScoringConfig::default());
    assert_eq!(s.total, 0.0);
    assert_eq!(s.rejection, Some(Rejection::BusinessName));
}

#[test]
fn business_target_matches_nobody() {
    let target = miami_target("SMITH FAMILY TRUST", "100 Ocean Dr");
    let cand = Candidate::new("John Smith", "100 Ocean Dr", "Miami", "FL", &["3055550100"]);
    let s = score_candidate(&target, &cand, &ScoringConfig::default());
    assert_eq!(s.rejection, Some(Rejection::BusinessName));
}

#[test]
fn business_like_surnames_still_match() {
    let config = ScoringConfig::default();
    for (target_name, candidate_name) in [("CHURCH MARY", "Mary Church"), ("BANKS JOHN", "John Banks")] {
        let target = miami_target(target_name, "");
        let candidates = vec![Candidate::new(candidate_name, "", "Miami", "FL", &["305-555-0100"])];
        let ranking = score(&target, &candidates, &config);
        assert_eq!(ranking.status(), MatchStatus::Matched, "{target_name}");
        assert!(ranking.rejected.is_empty(), "{target_name}");
        assert_eq!(ranking.phones(&config).slot(0), "305-555-0100");
    }
}

#[test]
fn city_mismatch_scores_zero_even_with_exact_name() {
    let target = miami_target("John Smith", "100 Ocean Dr");
    let cand = Candidate::new("John Smith", "100 Ocean Dr", "Orlando", "FL", &["4075550100"]);
    let s = score_candidate(&target, &cand, &ScoringConfig::default());
    assert_eq!(s.total, 0.0);
    assert_eq!(s.rejection, Some(Rejection::LocationMismatch));
}

#[test]
fn city_and_state_compare_case_insensitively() {
    let target = miami_target("John Smith", "");
    let cand = Candidate::new("John Smith", "", "MIAMI", "Florida", &["3055550100"]);
    let s = score_candidate(&target, &cand, &ScoringConfig::default());
    assert!(s.rejection.is_none());
}

#[test]
fn candidate_without_phones_is_filtered() {
    let target = miami_target("John Smith", "");
    let cand = Candidate::new("John Smith", "", "Miami", "FL", &[]);
    let ranking = score(&target, &[cand], &ScoringConfig::default());
    assert_eq!(ranking.status(), MatchStatus::AllFiltered);
    assert_eq!(ranking.rejected[0].reason, Rejection::NoPhones);
}

#[test]
fn low_scores_are_dropped_not_used_to_fill_slots() {
    let config = ScoringConfig::default();
    let target = miami_target("GARCIA MARIA", "100 Ocean Dr");
    let cand = Candidate::new("Peter Brown", "9 Bay Rd", "Miami", "FL", &["3055550100"]);
    let ranking = score(&target, &[cand], &config);
    assert!(ranking.accepted.is_empty());
    assert!(matches!(
        ranking.rejected[0].reason,
        Rejection::BelowThreshold { .. }
    ));
    assert!(ranking.phones(&config).is_empty());
}

#[test]
fn same_identity_different_house_numbers_rank_differently() {
    let config = ScoringConfig::default();
    let candidates = vec![
        Candidate::new("John Smith", "100 Ocean Dr", "Miami", "FL", &["305-555-0100"]),
        Candidate::new("John Smith", "200 Ocean Dr", "Miami", "FL", &["305-555-0200"]),
    ];

    let first = score(&miami_target("SMITH JOHN", "100 OCEAN DR"), &candidates, &config);
    let second = score(&miami_target("SMITH JOHN", "200 OCEAN DRIVE"), &candidates, &config);

    assert_eq!(first.phones(&config).slot(0), "305-555-0100");
    assert_eq!(second.phones(&config).slot(0), "305-555-0200");
    assert_eq!(first.phones(&config).slot(1), "305-555-0200");
}

#[test]
fn ties_keep_service_order() {
    let config = ScoringConfig::default();
    let candidates = vec![
        Candidate::new("John Smith", "", "Miami", "FL", &["3055550101"]),
        Candidate::new("John Smith", "", "Miami", "FL", &["3055550102"]),
        Candidate::new("John Smith", "", "Miami", "FL", &["3055550103"]),
    ];
    let ranking = score(&miami_target("John Smith", ""), &candidates, &config);
    let ranks: Vec<usize> = ranking.accepted.iter().map(|c| c.rank).collect();
    assert_eq!(ranks, vec![0, 1, 2]);
}

#[test]
fn at_most_four_phones() {
    let config = ScoringConfig::default();
    let candidates: Vec<Candidate> = (0..4)
        .map(|i| {
            let a = format!("305555{:04}", i * 2);
            let b = format!("305555{:04}", i * 2 + 1);
            Candidate::new("John Smith", "", "Miami", "FL", &[a.as_str(), b.as_str()])
        })
        .collect();
    let slots = score(&miami_target("John Smith", ""), &candidates, &config).phones(&config);
    assert_eq!(slots.len(), 4);
    assert_eq!(slots.slot(3), "3055550003");
}
