use subfuse_stt_interface::SourceTranscript;

use crate::align;
use crate::assemble;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fuse;
use crate::normalize::normalize;
use crate::report::RunReport;
use crate::types::{FusedText, Segment, Track, Transcript};

/// Everything one fusion run produced: the subtitle-ready track and the
/// audit trail of what was dropped, flagged or left unfilled.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FusionRun {
    pub track: Track,
    pub report: RunReport,
}

/// Single entry point over the four pipeline stages: normalize each
/// source, align segments across sources, fuse each cluster, assemble the
/// track. One instance can serve many runs; the configuration is validated
/// once and read-only afterwards.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    /// Fails fast on invalid configuration, before any transcript is seen.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the full pipeline over one clip's transcripts.
    ///
    /// A source whose entries are all malformed degrades the run to fewer
    /// effective sources; a run left with no usable source at all is a
    /// caller error ([`Error::NoUsableInput`]). With a single source the
    /// pipeline degenerates to pass-through modulo assembler smoothing.
    pub fn run(&self, inputs: &[SourceTranscript]) -> Result<FusionRun> {
        for (i, input) in inputs.iter().enumerate() {
            if inputs[..i].iter().any(|other| other.source == input.source) {
                return Err(Error::Config(format!(
                    "duplicate source id '{}'",
                    input.source
                )));
            }
        }

        let mut dropped = Vec::new();
        let mut transcripts: Vec<Transcript> = Vec::new();
        for input in inputs {
            let (transcript, entry_drops) = normalize(input);
            dropped.extend(entry_drops);
            if transcript.segments.is_empty() {
                tracing::warn!(source = %input.source, "source contributed no usable segments");
            } else {
                transcripts.push(transcript);
            }
        }

        if transcripts.is_empty() {
            return Err(Error::NoUsableInput);
        }

        let arena: Vec<Segment> = transcripts
            .into_iter()
            .flat_map(|t| t.segments)
            .collect();

        let clusters = align::cluster(&arena, &self.config);
        tracing::debug!(
            segments = arena.len(),
            clusters = clusters.len(),
            "aligned segments into clusters"
        );

        let fused = fuse::fuse_all(&arena, &clusters, &self.config);
        let no_text_clusters = fused
            .iter()
            .filter(|f| f.text == FusedText::NoConfidentText)
            .count();

        let assembly = assemble::assemble(fused, &self.config);

        Ok(FusionRun {
            track: assembly.track,
            report: RunReport {
                dropped,
                no_text_clusters,
                short_flagged: assembly.short_flagged,
            },
        })
    }
}
