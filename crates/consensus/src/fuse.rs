//! ROVER-style word-level voting.
//!
//! Each cluster's hypotheses are folded one by one into a growing consensus
//! of aligned columns: hypothesis tokens are matched against existing
//! columns with Levenshtein-style insert/delete/substitute costs, then each
//! column elects a winner by confidence-weighted vote. The fold is a pure
//! function `(consensus, hypothesis) -> consensus`, so the whole fusion of
//! one cluster is a reduction over its members in deterministic order.
//!
//! Clusters are independent once built, so they fuse in parallel; the
//! ordered collect at the end is the only synchronization point.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::config::Config;
use crate::types::{Cluster, FusedSegment, FusedText, Segment, SegmentId};

// Alignment costs. A substitution that matches an existing column word is
// free; a near-miss (above the similarity floor) is cheaper than an
// unrelated word so typos align as substitutions instead of gap pairs.
const NEAR_MATCH_COST: f64 = 0.5;
const SUBSTITUTE_COST: f64 = 1.0;
const GAP_COST: f64 = 1.0;

/// Fuse every cluster, in parallel, preserving cluster order.
pub fn fuse_all(arena: &[Segment], clusters: &[Cluster], config: &Config) -> Vec<FusedSegment> {
    clusters
        .par_iter()
        .map(|c| fuse_cluster(arena, c, config))
        .collect()
}

/// Fuse one cluster into a single [`FusedSegment`].
///
/// The fused span is the union of the members' spans; provenance records
/// which segment each source contributed. A cluster with no usable words
/// yields [`FusedText::NoConfidentText`].
pub fn fuse_cluster(arena: &[Segment], cluster: &Cluster, config: &Config) -> FusedSegment {
    let hyps = hypotheses(arena, cluster, config);

    let mut consensus: Vec<Column> = Vec::new();
    for index in 0..hyps.len() {
        consensus = fold_hypothesis(consensus, &hyps, index, config);
    }

    let winners = vote(&consensus, &hyps);

    let provenance: BTreeMap<_, _> = cluster
        .members
        .iter()
        .map(|&id| (arena[id].source.clone(), id))
        .collect();

    FusedSegment {
        start_ms: cluster.start_ms,
        end_ms: cluster.end_ms,
        text: if winners.is_empty() {
            FusedText::NoConfidentText
        } else {
            FusedText::Text(winners.join(" "))
        },
        provenance,
    }
}

struct Token {
    surface: String,
    folded: String,
}

struct Hypothesis {
    tokens: Vec<Token>,
    weight: f64,
}

/// One consensus column: `(hypothesis index, token index)` per contributor.
/// Hypotheses absent from a column have a gap there.
struct Column {
    cells: Vec<(usize, usize)>,
}

/// Member segments as token sequences, ordered by source priority then by
/// arena position (which reflects original input order). That order anchors
/// the consensus on the most trusted source and makes tie-breaks by
/// "earlier hypothesis index" match the configured ranking.
fn hypotheses(arena: &[Segment], cluster: &Cluster, config: &Config) -> Vec<Hypothesis> {
    let mut ids: Vec<SegmentId> = cluster.members.clone();
    ids.sort_by_key(|&id| (config.priority_rank(&arena[id].source), id));

    ids.into_iter()
        .map(|id| {
            let segment = &arena[id];
            Hypothesis {
                tokens: segment
                    .text
                    .split_whitespace()
                    .map(|w| Token {
                        surface: w.to_string(),
                        folded: w.to_lowercase(),
                    })
                    .collect(),
                weight: segment.confidence.unwrap_or(config.confidence_prior),
            }
        })
        .collect()
}

/// Align hypothesis `index` against the consensus and fold its tokens in.
///
/// Standard edit-distance DP over (columns, tokens). Ties prefer the
/// diagonal so semantically null gap slots stay minimal.
fn fold_hypothesis(
    consensus: Vec<Column>,
    hyps: &[Hypothesis],
    index: usize,
    config: &Config,
) -> Vec<Column> {
    let tokens = &hyps[index].tokens;
    let m = consensus.len();
    let n = tokens.len();

    #[derive(Clone, Copy, PartialEq)]
    enum Op {
        Diag,
        Up,
        Left,
    }

    let mut cost = vec![vec![0.0_f64; n + 1]; m + 1];
    let mut op = vec![vec![Op::Diag; n + 1]; m + 1];
    for i in 1..=m {
        cost[i][0] = i as f64 * GAP_COST;
        op[i][0] = Op::Up;
    }
    for j in 1..=n {
        cost[0][j] = j as f64 * GAP_COST;
        op[0][j] = Op::Left;
    }

    for i in 1..=m {
        for j in 1..=n {
            let diag = cost[i - 1][j - 1]
                + substitution_cost(&consensus[i - 1], hyps, &tokens[j - 1], config);
            let up = cost[i - 1][j] + GAP_COST;
            let left = cost[i][j - 1] + GAP_COST;

            let (best, best_op) = if diag <= up && diag <= left {
                (diag, Op::Diag)
            } else if up <= left {
                (up, Op::Up)
            } else {
                (left, Op::Left)
            };
            cost[i][j] = best;
            op[i][j] = best_op;
        }
    }

    let mut ops = Vec::with_capacity(m + n);
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        let o = op[i][j];
        ops.push(o);
        match o {
            Op::Diag => {
                i -= 1;
                j -= 1;
            }
            Op::Up => i -= 1,
            Op::Left => j -= 1,
        }
    }
    ops.reverse();

    let mut result: Vec<Column> = Vec::with_capacity(m + n);
    let mut columns = consensus.into_iter();
    let mut tj = 0usize;
    for o in ops {
        match o {
            Op::Diag => {
                let mut column = columns.next().expect("diag consumes a column");
                column.cells.push((index, tj));
                result.push(column);
                tj += 1;
            }
            Op::Up => {
                result.push(columns.next().expect("up consumes a column"));
            }
            Op::Left => {
                result.push(Column {
                    cells: vec![(index, tj)],
                });
                tj += 1;
            }
        }
    }

    result
}

fn substitution_cost(column: &Column, hyps: &[Hypothesis], token: &Token, config: &Config) -> f64 {
    let mut best_similarity = 0.0_f64;
    for &(h, t) in &column.cells {
        let existing = &hyps[h].tokens[t].folded;
        if *existing == token.folded {
            return 0.0;
        }
        best_similarity = best_similarity.max(strsim::normalized_levenshtein(existing, &token.folded));
    }
    if best_similarity >= config.word_similarity_floor {
        NEAR_MATCH_COST
    } else {
        SUBSTITUTE_COST
    }
}

/// Elect each column's winner by confidence-weighted, case-insensitive
/// vote. A gap can win (the column emits nothing). Ties resolve to the
/// earliest hypothesis, i.e. source priority then input order.
fn vote(consensus: &[Column], hyps: &[Hypothesis]) -> Vec<String> {
    struct Candidate {
        folded: String,
        surface: String,
        weight: f64,
        rank: usize,
    }

    let mut winners = Vec::new();
    for column in consensus {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut present = vec![false; hyps.len()];

        // Cells were appended in fold order, so candidates surface in
        // ascending hypothesis rank and the first contributor of a word
        // determines its rank and surface form.
        for &(h, t) in &column.cells {
            present[h] = true;
            let token = &hyps[h].tokens[t];
            match candidates.iter_mut().find(|c| c.folded == token.folded) {
                Some(c) => c.weight += hyps[h].weight,
                None => candidates.push(Candidate {
                    folded: token.folded.clone(),
                    surface: token.surface.clone(),
                    weight: hyps[h].weight,
                    rank: h,
                }),
            }
        }

        let mut gap_weight = 0.0;
        let mut gap_rank = usize::MAX;
        for (h, hyp) in hyps.iter().enumerate() {
            if !present[h] {
                gap_weight += hyp.weight;
                gap_rank = gap_rank.min(h);
            }
        }

        let mut winner: Option<Candidate> = None;
        for c in candidates {
            let better = match &winner {
                None => true,
                Some(w) => c.weight > w.weight || (c.weight == w.weight && c.rank < w.rank),
            };
            if better {
                winner = Some(c);
            }
        }

        if let Some(w) = winner {
            let gap_wins = gap_weight > w.weight || (gap_weight == w.weight && gap_rank < w.rank);
            if !gap_wins {
                winners.push(w.surface);
            }
        }
    }

    winners
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(source: &str, start_ms: i64, end_ms: i64, text: &str, confidence: Option<f64>) -> Segment {
        Segment {
            source: source.to_string(),
            start_ms,
            end_ms,
            text: text.to_string(),
            confidence,
        }
    }

    fn fuse(arena: &[Segment], config: &Config) -> FusedSegment {
        let cluster = Cluster::from_members((0..arena.len()).collect(), arena);
        fuse_cluster(arena, &cluster, config)
    }

    #[test]
    fn weighted_vote_picks_the_cat_sat() {
        let arena = vec![
            seg("a", 0, 1000, "the cat sat", Some(0.9)),
            seg("b", 0, 1000, "the cat sad", Some(0.3)),
            seg("c", 0, 1000, "teh cat sat", Some(0.4)),
        ];
        let fused = fuse(&arena, &Config::default());

        assert_eq!(fused.text, FusedText::Text("the cat sat".to_string()));
    }

    #[test]
    fn single_hypothesis_passes_through() {
        let arena = vec![seg("a", 0, 1000, "Hello World today", Some(0.2))];
        let fused = fuse(&arena, &Config::default());

        assert_eq!(fused.text, FusedText::Text("Hello World today".to_string()));
    }

    #[test]
    fn equal_weights_break_by_source_priority() {
        let config = Config {
            source_priority: vec!["b".to_string(), "a".to_string()],
            ..Config::default()
        };
        let arena = vec![
            seg("a", 0, 1000, "hello", Some(0.5)),
            seg("b", 0, 1000, "howdy", Some(0.5)),
        ];
        let fused = fuse(&arena, &config);

        assert_eq!(fused.text, FusedText::Text("howdy".to_string()));
    }

    #[test]
    fn equal_weights_without_priority_break_by_input_order() {
        let arena = vec![
            seg("a", 0, 1000, "hello", Some(0.5)),
            seg("b", 0, 1000, "howdy", Some(0.5)),
        ];
        let fused = fuse(&arena, &Config::default());

        assert_eq!(fused.text, FusedText::Text("hello".to_string()));
    }

    #[test]
    fn unknown_confidence_weighs_in_at_the_prior() {
        let config = Config {
            confidence_prior: 0.9,
            ..Config::default()
        };
        let arena = vec![
            seg("a", 0, 1000, "left", Some(0.5)),
            seg("b", 0, 1000, "right", None),
        ];
        let fused = fuse(&arena, &config);

        assert_eq!(fused.text, FusedText::Text("right".to_string()));
    }

    #[test]
    fn gap_can_win_a_column() {
        let arena = vec![
            seg("a", 0, 1000, "the", Some(0.9)),
            seg("b", 0, 1000, "the cat", Some(0.2)),
        ];
        let fused = fuse(&arena, &Config::default());

        // "cat" (0.2) loses to a's gap (0.9) in the second column.
        assert_eq!(fused.text, FusedText::Text("the".to_string()));
    }

    #[test]
    fn winner_surface_form_comes_from_highest_priority_contributor() {
        let arena = vec![
            seg("a", 0, 1000, "Sat", Some(0.4)),
            seg("b", 0, 1000, "sat", Some(0.4)),
        ];
        let fused = fuse(&arena, &Config::default());

        assert_eq!(fused.text, FusedText::Text("Sat".to_string()));
    }

    #[test]
    fn empty_cluster_text_is_marked_not_blanked() {
        let arena = vec![seg("a", 0, 1000, "", None)];
        let fused = fuse(&arena, &Config::default());

        assert_eq!(fused.text, FusedText::NoConfidentText);
    }

    #[test]
    fn provenance_records_each_contributing_source() {
        let arena = vec![
            seg("a", 0, 1000, "the cat", Some(0.9)),
            seg("b", 100, 1100, "the cap", Some(0.4)),
        ];
        let fused = fuse(&arena, &Config::default());

        assert_eq!(fused.provenance.get("a"), Some(&0));
        assert_eq!(fused.provenance.get("b"), Some(&1));
        assert_eq!((fused.start_ms, fused.end_ms), (0, 1100));
    }

    #[test]
    fn typo_aligns_as_substitution_not_gap_pair() {
        // Diagonal preference lines "teh" up against "the" in one column; a
        // gap-pair alignment would leave both words in the output.
        let arena = vec![
            seg("a", 0, 1000, "the cat", Some(0.6)),
            seg("b", 0, 1000, "teh cat", Some(0.5)),
        ];
        let fused = fuse(&arena, &Config::default());

        assert_eq!(fused.text, FusedText::Text("the cat".to_string()));
    }

    #[test]
    fn fuse_all_preserves_cluster_order() {
        let arena = vec![
            seg("a", 0, 1000, "one", Some(0.9)),
            seg("a", 2000, 3000, "two", Some(0.9)),
        ];
        let clusters = vec![
            Cluster::from_members(vec![0], &arena),
            Cluster::from_members(vec![1], &arena),
        ];
        let fused = fuse_all(&arena, &clusters, &Config::default());

        assert_eq!(fused[0].text, FusedText::Text("one".to_string()));
        assert_eq!(fused[1].text, FusedText::Text("two".to_string()));
    }
}
