use crate::error::{Error, Result};
use crate::types::SourceId;

/// Tuning knobs for one fusion run. Read-only once the pipeline starts.
///
/// The numeric defaults are engineering choices, not fixed semantics —
/// callers with calibrated backends should tune them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum fraction of the shorter segment's duration that two segments
    /// from different sources must share to be clustered together.
    pub overlap_threshold: f64,

    /// Vote weight assumed for a segment whose backend reported no
    /// confidence at all.
    pub confidence_prior: f64,

    /// Normalized word similarity at or above which an alignment
    /// substitution counts as a near-match ("teh" vs "the") rather than a
    /// full replacement.
    pub word_similarity_floor: f64,

    /// Backend reliability ranking, most trusted first. Used to break vote
    /// ties and to order the consensus fold. Sources not listed rank after
    /// all listed ones, in input order.
    pub source_priority: Vec<SourceId>,

    /// Subtitles shorter than this are merged into the following segment
    /// (when possible) to avoid flicker.
    pub min_display_ms: i64,

    /// A merge is rejected when the combined segment would exceed this.
    pub max_segment_ms: i64,

    /// Inter-segment silences up to this long are absorbed into the
    /// preceding segment; longer ones stay unfilled.
    pub max_fillable_gap_ms: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.5,
            confidence_prior: 0.5,
            word_similarity_floor: 0.8,
            source_priority: Vec::new(),
            min_display_ms: 800,
            max_segment_ms: 7000,
            max_fillable_gap_ms: 300,
        }
    }
}

impl Config {
    /// Reject invalid settings before any processing starts.
    pub fn validate(&self) -> Result<()> {
        fn fraction(name: &str, value: f64) -> Result<()> {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
            Ok(())
        }

        fraction("overlap_threshold", self.overlap_threshold)?;
        fraction("confidence_prior", self.confidence_prior)?;
        fraction("word_similarity_floor", self.word_similarity_floor)?;

        for (name, value) in [
            ("min_display_ms", self.min_display_ms),
            ("max_segment_ms", self.max_segment_ms),
            ("max_fillable_gap_ms", self.max_fillable_gap_ms),
        ] {
            if value < 0 {
                return Err(Error::Config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }

        if self.max_segment_ms < self.min_display_ms {
            return Err(Error::Config(format!(
                "max_segment_ms ({}) must be >= min_display_ms ({})",
                self.max_segment_ms, self.min_display_ms
            )));
        }

        Ok(())
    }

    /// Rank of a source in the priority order; unlisted sources rank last.
    pub(crate) fn priority_rank(&self, source: &str) -> usize {
        self.source_priority
            .iter()
            .position(|s| s == source)
            .unwrap_or(self.source_priority.len())
    }
}
