//! Frame-level pipeline: raw RGB24 storage, the entropy-coded bitstream
//! framing, and the I/P-frame dispatcher that ties the pixel and block
//! layers together into `compress`/`decompress`.

pub mod buffer;
pub mod dispatcher;
pub mod stream;

pub use buffer::FrameBuffer;
pub use dispatcher::{Codec, FrameTypeRequest};
pub use stream::{EntropyReader, EntropyWriter};
