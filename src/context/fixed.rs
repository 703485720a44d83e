//! Fixed-arity adaptive models, used wherever the alphabet size is known up
//! front and small: pixel predictor ids, block types, RLE run lengths,
//! bounding-rect coordinates, motion vector components. Unlike the byte
//! contexts these never need to promote between representations — they
//! start, and stay, as one dense weighted table over `0..N`.

use crate::context::scale;
use crate::prob::{Interval, PROB_SCALE};

const STEP: u32 = 16;

#[derive(Clone, Debug)]
pub struct FixedContext<const N: usize> {
    weights: [u32; N],
}

impl<const N: usize> Default for FixedContext<N> {
    fn default() -> Self {
        Self { weights: [1; N] }
    }
}

impl<const N: usize> FixedContext<N> {
    pub fn renew(&mut self) {
        self.weights = [1; N];
    }

    fn known(&self) -> Vec<(u32, u32)> {
        self.weights.iter().enumerate().map(|(i, &w)| (i as u32, w)).collect()
    }

    fn total(&self) -> u64 {
        self.weights.iter().map(|&w| w as u64).sum()
    }

    fn rescale_if_needed(&mut self) {
        if self.total() as u32 + STEP > PROB_SCALE {
            for w in self.weights.iter_mut() {
                *w = (*w - (*w >> 1)).max(1);
            }
        }
    }

    pub fn encode(&mut self, symbol: u32) -> Interval {
        debug_assert!((symbol as usize) < N);
        let known = self.known();
        let total = scale::total_weight(self.total(), N, N);
        let interval = scale::locate_symbol(&known, total, N, symbol);
        self.weights[symbol as usize] += STEP;
        self.rescale_if_needed();
        interval
    }

    pub fn decode(&mut self, freq: u32) -> (u32, Interval) {
        let known = self.known();
        let total = scale::total_weight(self.total(), N, N);
        let (symbol, interval) = scale::locate_by_freq(&known, total, N, freq);
        self.weights[symbol as usize] += STEP;
        self.rescale_if_needed();
        (symbol, interval)
    }

    /// A fair coin used for the "same motion vector as previous block" flag.
    pub fn encode_bool(flag: bool) -> Interval {
        if flag {
            Interval::new((PROB_SCALE / 2) as u16, (PROB_SCALE / 2) as u16)
        } else {
            Interval::new(0, (PROB_SCALE / 2) as u16)
        }
    }

    pub fn decode_bool(freq: u32) -> bool {
        freq >= PROB_SCALE / 2
    }
}
