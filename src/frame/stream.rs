//! Connects the adaptive models in [`crate::context`] to the block-pipelined
//! rANS codec in [`crate::rans`], including the length-prefixed block
//! framing and the decode-side re-synchronisation every
//! [`crate::rans::BLOCK_INTERVALS`] symbols described in `spec.md` §4.B.

use crate::context::{Context, FixedContext};
use crate::error::{CodecError, CodecResult};
use crate::pixel::ColorModel;
use crate::prob::Interval;
use crate::rans::{encode_block, RansDecoder, RansPipeline, BLOCK_INTERVALS};

/// Accumulates intervals through a [`RansPipeline`] and serialises the
/// resulting blocks as `u32`-length-prefixed records.
pub struct EntropyWriter {
    pipeline: RansPipeline,
}

impl Default for EntropyWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyWriter {
    pub fn new() -> Self {
        Self {
            pipeline: RansPipeline::new(),
        }
    }

    pub fn push(&mut self, iv: Interval) -> CodecResult<()> {
        self.pipeline.push(iv)
    }

    pub fn encode_byte(&mut self, ctx: &mut Context, c: u8) -> CodecResult<()> {
        self.push(ctx.encode(c))
    }

    pub fn encode_fixed<const N: usize>(&mut self, ctx: &mut FixedContext<N>, symbol: u32) -> CodecResult<()> {
        self.push(ctx.encode(symbol))
    }

    pub fn encode_bool(&mut self, flag: bool) -> CodecResult<()> {
        self.push(FixedContext::<2>::encode_bool(flag))
    }

    pub fn encode_rgb(&mut self, color: &mut ColorModel, pixel: [u8; 3]) -> CodecResult<()> {
        for iv in color.encode(pixel) {
            self.push(iv)?;
        }
        Ok(())
    }

    pub fn finish(self) -> CodecResult<Vec<u8>> {
        let blocks = self.pipeline.finish()?;
        let mut out = Vec::new();
        for block in blocks {
            out.extend_from_slice(&(block.len() as u32).to_le_bytes());
            out.extend_from_slice(&block);
        }
        Ok(out)
    }
}

/// Single block's worth of intervals encoded outside the pipeline (used for
/// tiny payloads, such as the flat-frame colour, where spinning up a
/// background worker would cost more than it saves).
pub fn encode_single_block(intervals: &[Interval]) -> Vec<u8> {
    let bytes = encode_block(intervals);
    let mut out = Vec::with_capacity(bytes.len() + 4);
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&bytes);
    out
}

/// Reads length-prefixed rANS blocks back out, transparently moving to the
/// next block every `BLOCK_INTERVALS` symbols.
pub struct EntropyReader<'a> {
    blocks: Vec<&'a [u8]>,
    block_idx: usize,
    decoder: RansDecoder<'a>,
    remaining: usize,
}

impl<'a> EntropyReader<'a> {
    pub fn new(data: &'a [u8]) -> CodecResult<Self> {
        let mut blocks = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            if data.len() - pos < 4 {
                return Err(CodecError::TruncatedInput {
                    offset: pos,
                    needed: 4 - (data.len() - pos),
                });
            }
            let len = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
            pos += 4;
            if data.len() - pos < len {
                return Err(CodecError::TruncatedInput {
                    offset: pos,
                    needed: len - (data.len() - pos),
                });
            }
            blocks.push(&data[pos..pos + len]);
            pos += len;
        }
        if blocks.is_empty() {
            return Err(CodecError::TruncatedInput { offset: 0, needed: 4 });
        }
        let decoder = RansDecoder::new(blocks[0])?;
        Ok(Self {
            blocks,
            block_idx: 0,
            decoder,
            remaining: BLOCK_INTERVALS,
        })
    }

    fn advance_symbol(&mut self) -> CodecResult<()> {
        self.remaining -= 1;
        if self.remaining == 0 && self.block_idx + 1 < self.blocks.len() {
            self.block_idx += 1;
            self.decoder = RansDecoder::new(self.blocks[self.block_idx])?;
            self.remaining = BLOCK_INTERVALS;
        }
        Ok(())
    }

    fn advance_interval(&mut self, iv: Interval) -> CodecResult<()> {
        self.decoder.advance(iv)?;
        self.advance_symbol()
    }

    pub fn decode_byte(&mut self, ctx: &mut Context) -> CodecResult<u8> {
        let freq = self.decoder.get_freq();
        match ctx.decode(freq) {
            Some((c, iv)) => {
                self.advance_interval(iv)?;
                Ok(c)
            }
            None => {
                let b = self.decoder.read_bypass_byte()?;
                self.advance_symbol()?;
                ctx.update(b);
                Ok(b)
            }
        }
    }

    pub fn decode_fixed<const N: usize>(&mut self, ctx: &mut FixedContext<N>) -> CodecResult<u32> {
        let freq = self.decoder.get_freq();
        let (symbol, iv) = ctx.decode(freq);
        self.advance_interval(iv)?;
        Ok(symbol)
    }

    pub fn decode_bool(&mut self) -> CodecResult<bool> {
        let freq = self.decoder.get_freq();
        let flag = FixedContext::<2>::decode_bool(freq);
        let iv = FixedContext::<2>::encode_bool(flag);
        self.advance_interval(iv)?;
        Ok(flag)
    }

    pub fn decode_rgb(&mut self, color: &mut ColorModel) -> CodecResult<[u8; 3]> {
        color.decode(|ctx| self.decode_byte(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reader_roundtrip_mixed_symbols() {
        let mut ctx_enc = Context::new();
        let mut ctx_dec = Context::new();
        let mut writer = EntropyWriter::new();
        let data: Vec<u8> = (0..200u32).map(|i| (i % 13) as u8).collect();
        for &b in &data {
            writer.encode_byte(&mut ctx_enc, b).unwrap();
        }
        let bytes = writer.finish().unwrap();
        let mut reader = EntropyReader::new(&bytes).unwrap();
        for &b in &data {
            assert_eq!(reader.decode_byte(&mut ctx_dec).unwrap(), b);
        }
    }

    #[test]
    fn single_block_helper_roundtrips() {
        let iv = Interval::new(10, 5);
        let bytes = encode_single_block(&[iv]);
        let mut reader = EntropyReader::new(&bytes).unwrap();
        let freq = reader.decoder.get_freq();
        assert!(freq >= 10 && freq < 15);
    }
}
