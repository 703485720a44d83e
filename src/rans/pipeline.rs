//! Double-buffered block pipeline.
//!
//! The frame encoder keeps producing intervals while the previous block of
//! up to [`super::BLOCK_INTERVALS`] of them is being folded into a byte
//! stream on a background thread, so the (fairly expensive) normalization
//! work in [`super::encoder::encode_block`] overlaps with whatever produces
//! the next block's intervals (pixel prediction, motion search, ...).
//!
//! This is the safe-Rust shape of the original's `RansMTCoder`: a fixed
//! double buffer plus one worker thread signalled through ordinary
//! synchronization instead of a pair of Win32 events.

use std::thread::JoinHandle;

use super::encoder::encode_block;
use super::BLOCK_INTERVALS;
use crate::error::{CodecError, CodecResult};
use crate::prob::Interval;

pub struct RansPipeline {
    pending: Vec<Interval>,
    worker: Option<JoinHandle<Vec<u8>>>,
    blocks: Vec<Vec<u8>>,
}

impl Default for RansPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RansPipeline {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(BLOCK_INTERVALS),
            worker: None,
            blocks: Vec::new(),
        }
    }

    /// Queues one more interval. Once a full block has accumulated, hands it
    /// off to the background worker, first collecting whatever the previous
    /// worker produced so blocks come out in submission order.
    pub fn push(&mut self, iv: Interval) -> CodecResult<()> {
        self.pending.push(iv);
        if self.pending.len() >= BLOCK_INTERVALS {
            self.rotate()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> CodecResult<()> {
        let full = std::mem::replace(&mut self.pending, Vec::with_capacity(BLOCK_INTERVALS));
        self.collect_worker()?;
        self.worker = Some(std::thread::spawn(move || encode_block(&full)));
        Ok(())
    }

    fn collect_worker(&mut self) -> CodecResult<()> {
        if let Some(handle) = self.worker.take() {
            let bytes = handle.join().map_err(|_| CodecError::WorkerPanicked)?;
            self.blocks.push(bytes);
        }
        Ok(())
    }

    /// Flushes any partial final block, waits for the last worker, and
    /// returns the encoded blocks in the order they were submitted.
    pub fn finish(mut self) -> CodecResult<Vec<Vec<u8>>> {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.collect_worker()?;
            self.blocks.push(encode_block(&tail));
        } else {
            self.collect_worker()?;
        }
        Ok(self.blocks)
    }
}
