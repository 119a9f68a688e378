use subfuse_stt_interface::SourceTranscript;

use crate::report::{DropReason, DroppedEntry};
use crate::types::{Segment, Transcript};

fn to_ms(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

fn reject(dropped: &mut Vec<DroppedEntry>, source: &str, entry_index: usize, reason: DropReason) {
    tracing::warn!(source, entry_index, ?reason, "dropping malformed entry");
    dropped.push(DroppedEntry {
        source: source.to_string(),
        entry_index,
        reason,
    });
}

/// Convert one backend's raw entries into a canonical [`Transcript`]:
/// millisecond timing, sorted by start, non-overlapping within the source.
///
/// Malformed entries (empty text, non-finite or inverted times) are skipped
/// with a warning and recorded — one bad entry never poisons its source.
/// Missing confidence stays `None`; out-of-range confidence is clamped.
pub fn normalize(raw: &SourceTranscript) -> (Transcript, Vec<DroppedEntry>) {
    let mut dropped = Vec::new();

    let mut indexed: Vec<(usize, Segment)> = Vec::with_capacity(raw.entries.len());
    for (index, entry) in raw.entries.iter().enumerate() {
        if !entry.start.is_finite() || !entry.end.is_finite() {
            reject(&mut dropped, &raw.source, index, DropReason::NonFiniteTime);
            continue;
        }
        let text = entry.text.trim();
        if text.is_empty() {
            reject(&mut dropped, &raw.source, index, DropReason::EmptyText);
            continue;
        }
        let start_ms = to_ms(entry.start);
        let end_ms = to_ms(entry.end);
        if end_ms <= start_ms {
            reject(&mut dropped, &raw.source, index, DropReason::InvertedTime);
            continue;
        }
        indexed.push((
            index,
            Segment {
                source: raw.source.clone(),
                start_ms,
                end_ms,
                text: text.to_string(),
                confidence: entry.confidence.map(|c| c.clamp(0.0, 1.0)),
            },
        ));
    }

    indexed.sort_by_key(|(index, s)| (s.start_ms, s.end_ms, *index));

    // Backends occasionally emit entries that bleed into each other. Clamp
    // each start to the previous end so the per-source non-overlap invariant
    // holds; an entry fully covered by its predecessor is dropped.
    let mut segments: Vec<Segment> = Vec::with_capacity(indexed.len());
    for (index, mut segment) in indexed {
        if let Some(prev) = segments.last() {
            if segment.start_ms < prev.end_ms {
                segment.start_ms = prev.end_ms;
            }
            if segment.start_ms >= segment.end_ms {
                reject(&mut dropped, &raw.source, index, DropReason::OverlapConsumed);
                continue;
            }
        }
        segments.push(segment);
    }

    (
        Transcript {
            source: raw.source.clone(),
            segments,
        },
        dropped,
    )
}
