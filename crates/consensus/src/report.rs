use crate::types::SourceId;

/// Why the normalizer refused one raw entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DropReason {
    /// Text was empty or whitespace-only.
    EmptyText,
    /// A timestamp was NaN or infinite.
    NonFiniteTime,
    /// `end <= start` (after rounding to ms).
    InvertedTime,
    /// The entry was entirely swallowed by an earlier entry of the same
    /// source after overlap clamping.
    OverlapConsumed,
}

/// One raw entry the normalizer dropped, identified by its index in the
/// source's original entry list.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DroppedEntry {
    pub source: SourceId,
    pub entry_index: usize,
    pub reason: DropReason,
}

/// Structured record of everything a run dropped or flagged, so the caller
/// can audit exactly what did not make it into the track.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    /// Malformed raw entries, skipped without aborting their source.
    pub dropped: Vec<DroppedEntry>,
    /// Clusters that fused to no usable text (their spans appear as
    /// [`crate::types::GapReason::NoConfidentText`] gaps on the track).
    pub no_text_clusters: usize,
    /// Indices into `track.segments` that remain shorter than the minimum
    /// display duration because merging them was not possible.
    pub short_flagged: Vec<usize>,
}

impl RunReport {
    pub fn dropped_for(&self, source: &str) -> usize {
        self.dropped.iter().filter(|d| d.source == source).count()
    }
}
