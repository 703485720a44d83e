//! Single-block rANS decoding, the mirror of [`super::encoder`].

use super::RANS_L;
use crate::error::{CodecError, CodecResult};
use crate::prob::{Interval, PROB_BITS, PROB_SCALE};

pub struct RansDecoder<'a> {
    state: u32,
    data: &'a [u8],
    pos: usize,
}

impl<'a> RansDecoder<'a> {
    pub fn new(data: &'a [u8]) -> CodecResult<Self> {
        if data.len() < 4 {
            return Err(CodecError::TruncatedInput {
                offset: 0,
                needed: 4 - data.len(),
            });
        }
        let state = (data[0] as u32) << 24
            | (data[1] as u32) << 16
            | (data[2] as u32) << 8
            | data[3] as u32;
        Ok(Self {
            state,
            data,
            pos: 4,
        })
    }

    fn read_byte(&mut self) -> CodecResult<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(CodecError::TruncatedInput {
                offset: self.pos,
                needed: 1,
            })?;
        self.pos += 1;
        Ok(b)
    }

    /// The cumulative-frequency slot a context's `decode` should be given.
    pub fn get_freq(&self) -> u32 {
        self.state & (PROB_SCALE - 1)
    }

    /// Folds the just-identified interval back out of the state and
    /// renormalizes, pulling more bytes from the stream as needed.
    pub fn advance(&mut self, iv: Interval) -> CodecResult<()> {
        let freq = iv.freq as u32;
        self.state = freq * (self.state >> PROB_BITS) + self.get_freq() - iv.cum_freq as u32;
        while self.state < RANS_L {
            let b = self.read_byte()?;
            self.state = (self.state << 8) | b as u32;
        }
        Ok(())
    }

    /// Reads one raw, unmodelled byte off the bypass channel.
    pub fn read_bypass_byte(&mut self) -> CodecResult<u8> {
        self.read_byte()
    }

    pub fn bytes_consumed(&self) -> usize {
        self.pos
    }
}
