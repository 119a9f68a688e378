//! Temporal alignment: group segments from different sources that describe
//! the same stretch of speech, despite each backend choosing different
//! segmentation boundaries.
//!
//! Alignment is interval-graph clustering. Segments are nodes; an edge
//! connects two segments from different sources whose spans share at least
//! `overlap_threshold` of the shorter duration. Connected components become
//! clusters. A component where one source contributes several segments is
//! split by a small dynamic-programming partition search so the
//! one-segment-per-source invariant holds.

use std::collections::HashMap;

use itertools::Itertools;

use crate::config::Config;
use crate::types::{Cluster, Segment, SegmentId};

/// Cluster the arena's segments into an ordered sequence covering the full
/// input timeline. Every segment lands in exactly one cluster; segments
/// with no cross-source counterpart become singletons.
pub fn cluster(arena: &[Segment], config: &Config) -> Vec<Cluster> {
    let mut order: Vec<SegmentId> = (0..arena.len()).collect();
    order.sort_by_key(|&id| (arena[id].start_ms, arena[id].end_ms, id));

    let mut dsu = Dsu::new(arena.len());
    for (pos, &a) in order.iter().enumerate() {
        for &b in &order[pos + 1..] {
            if arena[b].start_ms >= arena[a].end_ms {
                break;
            }
            if arena[a].source != arena[b].source
                && is_candidate(&arena[a], &arena[b], config.overlap_threshold)
            {
                dsu.union(a, b);
            }
        }
    }

    // Components in sweep order, so clusters come out roughly chronological.
    let mut slots: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<SegmentId>> = Vec::new();
    for &id in &order {
        let root = dsu.find(id);
        let slot = *slots.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(id);
    }

    let mut clusters: Vec<Cluster> = Vec::new();
    for members in components {
        if has_duplicate_source(&members, arena) {
            tracing::debug!(
                segments = members.len(),
                "ambiguous split, partitioning component"
            );
            clusters.extend(split_component(members, arena));
        } else {
            clusters.push(Cluster::from_members(members, arena));
        }
    }

    clusters.sort_by_key(|c| (c.start_ms, c.end_ms));

    // Clusters from different components can still end up with overlapping
    // spans; merge them when that keeps every source unique, otherwise let
    // the assembler trim the boundary.
    let mut merged: Vec<Cluster> = Vec::new();
    for c in clusters {
        match merged.last_mut() {
            Some(prev) if c.start_ms < prev.end_ms && prev.is_source_disjoint(&c, arena) => {
                let mut members = prev.members.clone();
                members.extend(&c.members);
                *prev = Cluster::from_members(members, arena);
            }
            _ => merged.push(c),
        }
    }

    merged
}

fn is_candidate(a: &Segment, b: &Segment, threshold: f64) -> bool {
    let overlap = a.overlap_ms(b);
    if overlap <= 0 {
        return false;
    }
    let shorter = a.duration_ms().min(b.duration_ms());
    overlap as f64 >= threshold * shorter as f64
}

fn has_duplicate_source(members: &[SegmentId], arena: &[Segment]) -> bool {
    members
        .iter()
        .map(|&id| arena[id].source.as_str())
        .duplicates()
        .next()
        .is_some()
}

/// Partition a start-ordered component into contiguous groups, each holding
/// at most one segment per source, maximizing total cross-source overlap
/// within groups. `dp[k]` is the best score for the first `k` segments.
fn split_component(mut members: Vec<SegmentId>, arena: &[Segment]) -> Vec<Cluster> {
    members.sort_by_key(|&id| (arena[id].start_ms, arena[id].end_ms, id));
    let n = members.len();

    const UNREACHED: i64 = i64::MIN;
    let mut dp: Vec<(i64, usize)> = vec![(UNREACHED, 0); n + 1];
    dp[0] = (0, 0);

    for k in 1..=n {
        // Growing the group leftwards can only re-introduce a duplicate, so
        // stop at the first invalid extension.
        for j in (0..k).rev() {
            let group = &members[j..k];
            if has_duplicate_source(group, arena) {
                break;
            }
            if dp[j].0 == UNREACHED {
                continue;
            }
            let score = dp[j].0 + group_score(group, arena);
            if score > dp[k].0 {
                dp[k] = (score, j);
            }
        }
    }

    let mut bounds = Vec::new();
    let mut k = n;
    while k > 0 {
        let j = dp[k].1;
        bounds.push((j, k));
        k = j;
    }
    bounds.reverse();

    bounds
        .into_iter()
        .map(|(j, k)| Cluster::from_members(members[j..k].to_vec(), arena))
        .collect()
}

/// Total pairwise cross-source overlap within one candidate group.
fn group_score(group: &[SegmentId], arena: &[Segment]) -> i64 {
    let mut score = 0;
    for (i, &a) in group.iter().enumerate() {
        for &b in &group[i + 1..] {
            if arena[a].source != arena[b].source {
                score += arena[a].overlap_ms(&arena[b]);
            }
        }
    }
    score
}

struct Dsu {
    parent: Vec<usize>,
}

impl Dsu {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower root wins, keeping component identity deterministic.
            let (lo, hi) = (ra.min(rb), ra.max(rb));
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(source: &str, start_ms: i64, end_ms: i64) -> Segment {
        Segment {
            source: source.to_string(),
            start_ms,
            end_ms,
            text: "x".to_string(),
            confidence: None,
        }
    }

    fn sources_of<'a>(c: &Cluster, arena: &'a [Segment]) -> Vec<&'a str> {
        c.members.iter().map(|&id| arena[id].source.as_str()).collect()
    }

    #[test]
    fn overlapping_cross_source_segments_cluster_together() {
        let arena = vec![seg("a", 0, 1000), seg("b", 200, 1200)];
        let clusters = cluster(&arena, &Config::default());

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, [0, 1]);
        assert_eq!((clusters[0].start_ms, clusters[0].end_ms), (0, 1200));
    }

    #[test]
    fn span_overlap_merges_source_disjoint_clusters() {
        // 100ms shared of a 1000ms shorter segment is below the 0.5
        // threshold, so no candidate edge forms — but the resulting cluster
        // spans overlap and the sources are disjoint, so the merge pass
        // unifies them.
        let arena = vec![seg("a", 0, 1000), seg("b", 900, 2000)];
        let clusters = cluster(&arena, &Config::default());

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, [0, 1]);
    }

    #[test]
    fn disjoint_segments_stay_separate() {
        let arena = vec![seg("a", 0, 1000), seg("b", 1500, 2500)];
        let clusters = cluster(&arena, &Config::default());

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, [0]);
        assert_eq!(clusters[1].members, [1]);
    }

    #[test]
    fn unmatched_segment_becomes_singleton() {
        let arena = vec![
            seg("a", 0, 1000),
            seg("b", 100, 1000),
            seg("a", 5000, 6000),
        ];
        let clusters = cluster(&arena, &Config::default());

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].members, [2]);
    }

    #[test]
    fn ambiguous_split_resolves_by_overlap() {
        // "b" contributes two segments against one long "a" segment; the
        // partition keeps b1 with the a-segment it overlaps and spins b2 off.
        let arena = vec![
            seg("a", 0, 2000),
            seg("b", 0, 900),
            seg("b", 1100, 2000),
        ];
        let clusters = cluster(&arena, &Config::default());

        for c in &clusters {
            let sources = sources_of(c, &arena);
            let mut unique = sources.clone();
            unique.dedup();
            assert_eq!(sources.len(), unique.len(), "one segment per source");
        }
        assert_eq!(clusters.len(), 2);
        let mut first: Vec<SegmentId> = clusters[0].members.clone();
        first.sort();
        assert_eq!(first, [0, 1]);
        assert_eq!(clusters[1].members, [2]);
    }

    #[test]
    fn merge_is_refused_when_source_would_repeat() {
        // Component {a1, b, a2} splits into {a1, b} and {a2}; their spans
        // overlap but both contain source "a", so they stay separate.
        let arena = vec![
            seg("a", 0, 1000),
            seg("b", 0, 2000),
            seg("a", 1000, 2000),
        ];
        let clusters = cluster(&arena, &Config::default());

        assert_eq!(clusters.len(), 2);
        for c in &clusters {
            let sources = sources_of(c, &arena);
            let mut unique = sources.clone();
            unique.dedup();
            assert_eq!(sources.len(), unique.len());
        }
    }

    #[test]
    fn every_segment_lands_in_exactly_one_cluster() {
        let arena = vec![
            seg("a", 0, 1000),
            seg("b", 100, 900),
            seg("c", 50, 950),
            seg("a", 2000, 3000),
            seg("b", 2100, 3100),
        ];
        let clusters = cluster(&arena, &Config::default());

        let mut seen: Vec<SegmentId> = clusters.iter().flat_map(|c| c.members.clone()).collect();
        seen.sort();
        assert_eq!(seen, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn clusters_come_out_ordered_by_start() {
        let arena = vec![
            seg("a", 5000, 6000),
            seg("b", 0, 1000),
            seg("a", 0, 900),
        ];
        let clusters = cluster(&arena, &Config::default());

        let starts: Vec<i64> = clusters.iter().map(|c| c.start_ms).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn zero_threshold_accepts_any_positive_overlap() {
        let config = Config {
            overlap_threshold: 0.0,
            ..Config::default()
        };
        let arena = vec![seg("a", 0, 1000), seg("b", 999, 2000)];
        let clusters = cluster(&arena, &config);
        assert_eq!(clusters.len(), 1);
    }
}
