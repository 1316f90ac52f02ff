// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn accounts(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn ranking(order: &[usize]) -> PeerRanking {
    PeerRanking { ranking: order.to_vec(), reasoning: String::new() }
}

#[test]
fn aggregate_rank_averages_positions() {
    let accounts = accounts(&["a", "b", "c"]);
    // a is ranked 1st and 2nd; b 2nd and 1st; c 3rd twice.
    let rankings = vec![ranking(&[1, 2, 3]), ranking(&[2, 1, 3])];
    let agg = aggregate_rank(&accounts, &rankings);

    assert_eq!(agg.len(), 3);
    assert_eq!(agg[0].1, 1.5);
    assert_eq!(agg[1].1, 1.5);
    assert_eq!(agg[2], ("c".to_string(), 3.0));
}

#[test]
fn aggregate_rank_is_permutation_invariant() {
    let accounts = accounts(&["a", "b", "c"]);
    let forward = vec![ranking(&[1, 3, 2]), ranking(&[2, 1, 3]), ranking(&[3, 2, 1])];
    let mut reversed = forward.clone();
    reversed.reverse();

    assert_eq!(aggregate_rank(&accounts, &forward), aggregate_rank(&accounts, &reversed));
}

#[test]
fn out_of_range_indices_are_ignored() {
    let accounts = accounts(&["a", "b"]);
    let rankings = vec![ranking(&[1, 2, 9]), ranking(&[0, 2, 1])];
    let agg = aggregate_rank(&accounts, &rankings);

    // index 9 and 0 contribute nothing; "b" was ranked 2nd then 2nd, "a" 1st then 3rd.
    let a = agg.iter().find(|(name, _)| name == "a").unwrap();
    let b = agg.iter().find(|(name, _)| name == "b").unwrap();
    assert_eq!(a.1, 2.0);
    assert_eq!(b.1, 2.0);
}

#[test]
fn aggregate_rank_sorts_ascending() {
    let accounts = accounts(&["a", "b"]);
    let rankings = vec![ranking(&[2, 1])];
    let agg = aggregate_rank(&accounts, &rankings);
    assert_eq!(agg[0].0, "b");
    assert_eq!(agg[1].0, "a");
}

#[test]
fn labels_run_a_to_z_and_beyond() {
    assert_eq!(label(0), "A");
    assert_eq!(label(2), "C");
    assert_eq!(label(25), "Z");
    assert_eq!(label(26), "AA");
    assert_eq!(label(27), "AB");
}

#[test]
fn parse_json_reply_handles_plain_and_wrapped() {
    let direct: Option<PeerRanking> =
        parse_json_reply(r#"{"ranking": [2, 1], "reasoning": "b is sharper"}"#);
    assert_eq!(direct.unwrap().ranking, vec![2, 1]);

    let wrapped: Option<PeerRanking> = parse_json_reply(
        "Here is my ranking:\n```json\n{\"ranking\": [1], \"reasoning\": \"\"}\n```\nthanks",
    );
    assert_eq!(wrapped.unwrap().ranking, vec![1]);

    let garbage: Option<PeerRanking> = parse_json_reply("no json here");
    assert!(garbage.is_none());
}

#[test]
fn member_analysis_round_trips_camel_case() {
    let json = r#"{
        "complexity": "moderate",
        "estimatedDurationMinutes": 45,
        "requiredSkills": ["rust"],
        "recommendedApproach": "incremental",
        "risks": ["scope creep"]
    }"#;
    let analysis: MemberAnalysis = serde_json::from_str(json).unwrap();
    assert_eq!(analysis.estimated_duration_minutes, 45);
    let back = serde_json::to_value(&analysis).unwrap();
    assert_eq!(back["requiredSkills"][0], "rust");
}

#[test]
fn consensus_uses_spec_field_names() {
    let consensus = ConsensusAnalysis {
        consensus_complexity: "complex".into(),
        consensus_duration_minutes: 90,
        consensus_skills: vec!["rust".into()],
        recommended_approach: "split the work".into(),
        confidence: 0.8,
        dissenting_views: Some("b disagreed".into()),
    };
    let value = serde_json::to_value(&consensus).unwrap();
    assert!(value.get("consensusComplexity").is_some());
    assert!(value.get("dissenting_views").is_some());
}
