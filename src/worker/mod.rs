//! Parallel task dispatch used by the frame pipeline for classification,
//! block decision, and loss masking.

pub mod squad;

pub use squad::Squad;
