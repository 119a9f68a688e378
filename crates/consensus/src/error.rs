pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors only. Per-segment anomalies (bad timing, empty text) are
/// recorded in [`crate::report::RunReport`] instead and never abort a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no usable input transcripts")]
    NoUsableInput,
}
