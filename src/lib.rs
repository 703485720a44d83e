//! Adaptive statistical modelling and entropy-coding engine for a lossless
//! screen-capture codec.
//!
//! [`context`] holds the per-context byte models, promoted through seven
//! representations as evidence accumulates; [`rans`] is the block-pipelined
//! rANS entropy coder they feed into. [`pixel`] and [`block`] build the
//! per-pixel predictors and per-block change/motion decisions the frame
//! pipeline in [`frame`] drives over a sequence of raw RGB24 frames, with
//! [`worker`] providing the parallel dispatch the pipeline uses for
//! classification and loss masking.

pub mod block;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod pixel;
pub mod prob;
pub mod rans;
pub mod worker;

pub use config::CodecConfig;
pub use error::{CodecError, CodecResult};
pub use frame::{Codec, FrameTypeRequest};
