//! Typed errors for the codec core.
//!
//! The original C++ implementation treats most of these conditions as
//! assertions or silent truncation; here they are surfaced as values so a
//! caller can tell "give me a bigger buffer" apart from "the bitstream is
//! corrupt" apart from "you are asking for something this build doesn't
//! support".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported wire format version {found}, expected {expected}")]
    UnsupportedVersion { found: u8, expected: u8 },

    #[error("input exhausted: needed at least {needed} more byte(s) at offset {offset}")]
    TruncatedInput { offset: usize, needed: usize },

    #[error("output buffer too small: needed at least {needed} byte(s), got {available}")]
    OutputTooSmall { needed: usize, available: usize },

    #[error("invariant violated in {component}: {detail}")]
    Invariant {
        component: &'static str,
        detail: String,
    },

    #[error("allocation failed while growing {what}")]
    Allocation { what: &'static str },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("a worker thread panicked while processing a frame")]
    WorkerPanicked,
}

pub type CodecResult<T> = Result<T, CodecError>;
