use std::collections::BTreeMap;

/// Identifier of one STT backend, e.g. `"whisper"` or `"google-cloud"`.
pub type SourceId = String;

/// Index into the flat per-run segment arena.
///
/// Clusters and provenance reference segments by index rather than by
/// ownership, so a run is a handful of flat `Vec`s and clusters can be
/// fused independently without shared state.
pub type SegmentId = usize;

/// One timed phrase from one backend, normalized to millisecond precision.
///
/// Produced by [`crate::normalize::normalize`]; immutable afterwards.
/// `start_ms < end_ms` always holds, and segments of the same source never
/// overlap. `confidence` stays `None` when the backend reported none —
/// "unknown" and "low" are different signals to the voter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    pub source: SourceId,
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: String,
    pub confidence: Option<f64>,
}

impl Segment {
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Length of the time span shared with `other`, in ms. Zero when disjoint.
    pub fn overlap_ms(&self, other: &Segment) -> i64 {
        (self.end_ms.min(other.end_ms) - self.start_ms.max(other.start_ms)).max(0)
    }
}

/// One backend's full normalized output for the clip: segments sorted by
/// start time, non-overlapping, all sharing one `source`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transcript {
    pub source: SourceId,
    pub segments: Vec<Segment>,
}

/// Segments from different sources judged to describe the same stretch of
/// speech. At most one member per source. Built by the aligner, consumed by
/// the fusion engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Arena indices, sorted by the referenced segment's start time.
    pub members: Vec<SegmentId>,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Cluster {
    pub fn from_members(mut members: Vec<SegmentId>, arena: &[Segment]) -> Self {
        members.sort_by_key(|&id| (arena[id].start_ms, arena[id].end_ms, id));
        let start_ms = members.iter().map(|&id| arena[id].start_ms).min().unwrap_or(0);
        let end_ms = members.iter().map(|&id| arena[id].end_ms).max().unwrap_or(0);
        Self {
            members,
            start_ms,
            end_ms,
        }
    }

    /// True when `other`'s members can join this cluster without any source
    /// contributing twice.
    pub fn is_source_disjoint(&self, other: &Cluster, arena: &[Segment]) -> bool {
        self.members.iter().all(|&a| {
            other
                .members
                .iter()
                .all(|&b| arena[a].source != arena[b].source)
        })
    }
}

/// Result of fusing one cluster. A cluster that produced no usable words is
/// an explicit [`FusedText::NoConfidentText`], never a silent empty string.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum FusedText {
    Text(String),
    NoConfidentText,
}

impl FusedText {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FusedText::Text(t) => Some(t.as_str()),
            FusedText::NoConfidentText => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FusedSegment {
    pub start_ms: i64,
    pub end_ms: i64,
    pub text: FusedText,
    /// Which original segment each source contributed, for auditing.
    /// Sources absent from the cluster are absent from the map.
    pub provenance: BTreeMap<SourceId, SegmentId>,
}

impl FusedSegment {
    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }
}

/// Why a stretch of the timeline carries no subtitle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GapReason {
    /// No source produced speech here.
    Silence,
    /// A cluster covered this span but fused to no usable text.
    NoConfidentText,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gap {
    pub start_ms: i64,
    pub end_ms: i64,
    pub reason: GapReason,
}

/// The final subtitle-ready artifact: fused segments with non-decreasing
/// start times and no pairwise overlap, plus the gaps left unfilled so
/// coverage of the input timeline stays auditable.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Track {
    pub segments: Vec<FusedSegment>,
    pub gaps: Vec<Gap>,
}

impl Track {
    /// `(start_ms, end_ms, text)` triples for an external subtitle writer.
    pub fn cues(&self) -> impl Iterator<Item = (i64, i64, &str)> {
        self.segments
            .iter()
            .filter_map(|s| s.text.as_str().map(|t| (s.start_ms, s.end_ms, t)))
    }
}
