//! Per-pixel prediction and literal-colour modelling.
//!
//! A pixel is either predicted for free from its neighbours (see
//! [`predictor`]) or, when no predictor fits, written as a literal RGB
//! triple through an adaptive [`ColorModel`] — three chained byte contexts
//! (green conditioned on a coarse red bucket, blue conditioned on a coarse
//! green bucket), matching the original's practice of using nearby channel
//! values as context for the next.

pub mod predictor;
pub mod rle;

use crate::context::Context;
use crate::prob::Interval;

/// Channel values are bucketed by this many low bits before being used as
/// another channel's context index.
const BUCKET_SHIFT: u32 = 5;
const BUCKETS: usize = 1 << (8 - BUCKET_SHIFT);

#[derive(Clone, Debug)]
pub struct ColorModel {
    r_ctx: Context,
    g_ctx: Vec<Context>,
    b_ctx: Vec<Context>,
}

impl Default for ColorModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorModel {
    pub fn new() -> Self {
        Self {
            r_ctx: Context::new(),
            g_ctx: vec![Context::new(); BUCKETS],
            b_ctx: vec![Context::new(); BUCKETS],
        }
    }

    /// Resets every channel context, as happens at the start of an I-frame.
    pub fn renew(&mut self) {
        self.r_ctx.renew();
        for c in self.g_ctx.iter_mut() {
            c.renew();
        }
        for c in self.b_ctx.iter_mut() {
            c.renew();
        }
    }

    /// Encodes a literal pixel, returning the three intervals (one per
    /// channel, in r/g/b order) the caller must push to the rANS pipeline.
    pub fn encode(&mut self, pixel: [u8; 3]) -> [Interval; 3] {
        let iv_r = self.r_ctx.encode(pixel[0]);
        let g_bucket = (pixel[0] >> BUCKET_SHIFT) as usize;
        let iv_g = self.g_ctx[g_bucket].encode(pixel[1]);
        let b_bucket = (pixel[1] >> BUCKET_SHIFT) as usize;
        let iv_b = self.b_ctx[b_bucket].encode(pixel[2]);
        [iv_r, iv_g, iv_b]
    }

    /// Decodes one channel at a time since later channels' context depends
    /// on earlier ones' decoded value. The caller supplies a closure that
    /// pulls one symbol (bypass byte or modelled freq-lookup) per channel.
    pub fn decode<F>(&mut self, mut next_channel: F) -> crate::error::CodecResult<[u8; 3]>
    where
        F: FnMut(&mut Context) -> crate::error::CodecResult<u8>,
    {
        let r = next_channel(&mut self.r_ctx)?;
        let g_bucket = (r >> BUCKET_SHIFT) as usize;
        let g = next_channel(&mut self.g_ctx[g_bucket])?;
        let b_bucket = (g >> BUCKET_SHIFT) as usize;
        let b = next_channel(&mut self.b_ctx[b_bucket])?;
        Ok([r, g, b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renew_resets_every_bucket() {
        let mut model = ColorModel::new();
        model.encode([10, 20, 30]);
        model.renew();
        assert_eq!(model.r_ctx.kind(), 0);
        assert!(model.g_ctx.iter().all(|c| c.kind() == 0));
    }
}
