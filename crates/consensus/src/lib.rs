//! # Multi-hypothesis transcript fusion
//!
//! Two or three STT backends transcribe the same clip and disagree: about
//! words, about segment boundaries, about how sure they are. This crate
//! merges those competing transcripts into one subtitle-ready track.
//!
//! ## Pipeline
//!
//! Data flows strictly forward through four stages:
//!
//! 1. [`normalize`] — each backend's raw entries become a canonical,
//!    sorted, millisecond-precision [`Transcript`]; malformed entries are
//!    dropped and recorded, never fatal.
//! 2. [`align`] — segments from different sources describing the same
//!    stretch of speech are clustered despite mismatched boundaries.
//! 3. [`fuse`] — each cluster elects its text by ROVER-style
//!    confidence-weighted word voting over an incrementally built
//!    consensus alignment.
//! 4. [`assemble`] — fused segments are smoothed into a monotonic,
//!    non-overlapping [`Track`] with explicit gaps.
//!
//! [`Pipeline`] drives all four; the stage modules stay public for callers
//! that want to run or test a stage in isolation.

pub mod align;
pub mod assemble;
pub mod config;
pub mod error;
pub mod fuse;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{FusionRun, Pipeline};
pub use report::{DropReason, DroppedEntry, RunReport};
pub use types::{
    Cluster, FusedSegment, FusedText, Gap, GapReason, Segment, SegmentId, SourceId, Track,
    Transcript,
};
