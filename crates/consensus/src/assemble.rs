//! Timeline assembly: turn the ordered fused segments into a valid track.
//!
//! Four smoothing passes, each a small pure transform over the segment
//! list: drop no-text segments (recording their spans as gaps), trim
//! overlaps so subtitles never stack, absorb sub-threshold silences, and
//! merge too-short segments into their successor. The passes are arranged
//! so that running the assembler on its own output changes nothing.

use crate::config::Config;
use crate::types::{FusedSegment, FusedText, Gap, GapReason, Track};

/// Assembler output: the track plus the indices of segments that remain
/// below the minimum display duration because no merge was possible.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub track: Track,
    pub short_flagged: Vec<usize>,
}

pub fn assemble(fused: Vec<FusedSegment>, config: &Config) -> Assembly {
    let mut gaps: Vec<Gap> = Vec::new();

    // No-text clusters never render; their spans stay on record so the
    // caller can see that speech was detected there but not transcribed.
    let mut kept: Vec<FusedSegment> = Vec::new();
    for segment in fused {
        match segment.text {
            FusedText::NoConfidentText => gaps.push(Gap {
                start_ms: segment.start_ms,
                end_ms: segment.end_ms,
                reason: GapReason::NoConfidentText,
            }),
            FusedText::Text(_) => kept.push(segment),
        }
    }
    kept.sort_by_key(|s| (s.start_ms, s.end_ms));

    let trimmed = trim_overlaps(kept);
    let absorbed = absorb_gaps(trimmed, config, &mut gaps);
    let merged = merge_short(absorbed, config);

    let short_flagged: Vec<usize> = merged
        .iter()
        .enumerate()
        .filter(|(_, s)| s.duration_ms() < config.min_display_ms)
        .map(|(i, _)| i)
        .collect();

    gaps.sort_by_key(|g| (g.start_ms, g.end_ms));

    Assembly {
        track: Track {
            segments: merged,
            gaps,
        },
        short_flagged,
    }
}

/// Shrink the earlier of two overlapping segments to the later's start.
/// When the earlier segment extended past the later one (nested spans), the
/// later segment inherits the tail end so the timeline stays covered. A
/// segment emptied by trimming disappears; its span is covered by its
/// successor.
fn trim_overlaps(sorted: Vec<FusedSegment>) -> Vec<FusedSegment> {
    let mut result: Vec<FusedSegment> = Vec::with_capacity(sorted.len());
    for mut segment in sorted {
        while let Some(prev) = result.last_mut() {
            if prev.end_ms > segment.start_ms {
                segment.end_ms = segment.end_ms.max(prev.end_ms);
                prev.end_ms = segment.start_ms;
                if prev.end_ms <= prev.start_ms {
                    tracing::debug!(
                        start_ms = prev.start_ms,
                        "segment fully covered by successor, dropping"
                    );
                    result.pop();
                    continue;
                }
            }
            break;
        }
        result.push(segment);
    }
    result
}

/// Extend each segment over a following silence no longer than
/// `max_fillable_gap_ms`; record longer silences as explicit gaps.
fn absorb_gaps(mut segments: Vec<FusedSegment>, config: &Config, gaps: &mut Vec<Gap>) -> Vec<FusedSegment> {
    for i in 1..segments.len() {
        let gap = segments[i].start_ms - segments[i - 1].end_ms;
        if gap <= 0 {
            continue;
        }
        if gap <= config.max_fillable_gap_ms {
            segments[i - 1].end_ms = segments[i].start_ms;
        } else {
            gaps.push(Gap {
                start_ms: segments[i - 1].end_ms,
                end_ms: segments[i].start_ms,
                reason: GapReason::Silence,
            });
        }
    }
    segments
}

/// Merge a segment shorter than the minimum display duration into its
/// contiguous successor, unless the result would exceed the maximum
/// segment duration. Merging cascades: a still-short merge result keeps
/// absorbing successors, so a second assembly pass finds nothing to do.
fn merge_short(segments: Vec<FusedSegment>, config: &Config) -> Vec<FusedSegment> {
    let mut result: Vec<FusedSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match result.pop() {
            Some(prev)
                if prev.duration_ms() < config.min_display_ms
                    && prev.end_ms == segment.start_ms
                    && segment.end_ms - prev.start_ms <= config.max_segment_ms =>
            {
                result.push(merge_pair(prev, segment));
            }
            Some(prev) => {
                result.push(prev);
                result.push(segment);
            }
            None => result.push(segment),
        }
    }
    result
}

fn merge_pair(earlier: FusedSegment, later: FusedSegment) -> FusedSegment {
    let text = match (&earlier.text, &later.text) {
        (FusedText::Text(a), FusedText::Text(b)) => FusedText::Text(format!("{a} {b}")),
        // No-text segments were removed before merging.
        _ => unreachable!("merge operates on rendered segments only"),
    };

    let mut provenance = earlier.provenance;
    for (source, id) in later.provenance {
        provenance.entry(source).or_insert(id);
    }

    FusedSegment {
        start_ms: earlier.start_ms,
        end_ms: later.end_ms,
        text,
        provenance,
    }
}
