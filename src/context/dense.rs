//! Kind 7: the terminal representation. Holds an explicit weight for all
//! 256 byte values, so there is nothing left to promote to — every context
//! that grows enough eventually lands here and stays.
//!
//! Decode keeps a small lookup table (`dec_table`, one entry per 128 units
//! of scaled frequency) mapping a query's top bits directly to a symbol
//! near its true position, refreshed whenever the weights are rescaled.
//! Decode then walks forward or back from that hint by the handful of
//! slots the table has gone stale by since the last rescale, rather than
//! scanning all 256 symbols from zero.

use crate::prob::{Interval, PROB_SCALE};

const STEP: u32 = 16;
const ALPHABET: usize = 256;
const DEC_BUCKET_BITS: u32 = 7;
const DEC_TABLE_LEN: usize = (PROB_SCALE >> DEC_BUCKET_BITS) as usize;

#[derive(Clone, Debug)]
pub struct DenseCtx {
    weights: Box<[u32; 256]>,
    dec_table: [u8; DEC_TABLE_LEN],
}

impl DenseCtx {
    fn from_weights(weights: [u32; 256]) -> Self {
        let mut ctx = Self {
            weights: Box::new(weights),
            dec_table: [0; DEC_TABLE_LEN],
        };
        ctx.rebuild_dec_table();
        ctx
    }

    /// Promotes from kind 6 (the hash table) once it can no longer hold a
    /// new distinct symbol. Symbols the hash table had seen keep their
    /// weight; everything else starts at the implicit baseline.
    pub fn promote_from_hash(known: &[(u32, u32)]) -> Self {
        let mut weights = [1u32; 256];
        for &(sym, w) in known {
            weights[sym as usize] = w.max(1);
        }
        Self::from_weights(weights)
    }

    /// Promotes directly from kind 3 (the 256-entry flat symbol list) once
    /// its own capacity is exhausted — every symbol the list had recorded
    /// is known to have occurred at least twice (it overflowed on a
    /// repeat), so each gets a head start over the baseline.
    pub fn promote_from_list(symbols: &[u8]) -> Self {
        let mut weights = [1u32; 256];
        for &s in symbols {
            weights[s as usize] = 2 * STEP;
        }
        Self::from_weights(weights)
    }

    fn total(&self) -> u64 {
        self.weights.iter().map(|&w| w as u64).sum()
    }

    fn boundary(before: u64, total: u64) -> u32 {
        ((before * PROB_SCALE as u64) / total) as u32
    }

    fn rescale_if_needed(&mut self) {
        if self.total() as u32 + STEP > PROB_SCALE {
            for w in self.weights.iter_mut() {
                *w = (*w - (*w >> 1)).max(1);
            }
            self.rebuild_dec_table();
        }
    }

    /// Refreshes the bucket-to-symbol hint table from the current weights.
    /// `dec_table[b]` holds the last symbol whose interval starts at or
    /// before scaled frequency `b << DEC_BUCKET_BITS`.
    fn rebuild_dec_table(&mut self) {
        let total = self.total();
        let mut acc: u64 = 0;
        let mut sym = 0usize;
        for bucket in 0..DEC_TABLE_LEN {
            let target = (bucket as u64) << DEC_BUCKET_BITS;
            while sym + 1 < ALPHABET {
                let next = Self::boundary(acc + self.weights[sym] as u64, total);
                if next as u64 > target {
                    break;
                }
                acc += self.weights[sym] as u64;
                sym += 1;
            }
            self.dec_table[bucket] = sym as u8;
        }
    }

    pub fn encode(&mut self, c: u8) -> Interval {
        let total = self.total();
        let before: u64 = self.weights[..c as usize].iter().map(|&w| w as u64).sum();
        let w = self.weights[c as usize] as u64;
        let b0 = Self::boundary(before, total);
        let b1 = Self::boundary(before + w, total);
        let interval = Interval::new(b0 as u16, (b1 - b0) as u16);
        self.weights[c as usize] += STEP;
        self.rescale_if_needed();
        interval
    }

    pub fn decode(&mut self, freq: u32) -> (u8, Interval) {
        let total = self.total();
        let bucket = ((freq >> DEC_BUCKET_BITS) as usize).min(DEC_TABLE_LEN - 1);
        let mut sym = self.dec_table[bucket] as usize;
        let mut acc: u64 = self.weights[..sym].iter().map(|&w| w as u64).sum();

        let (c, interval) = loop {
            let w = self.weights[sym] as u64;
            let b0 = Self::boundary(acc, total);
            let b1 = Self::boundary(acc + w, total);
            if freq >= b0 && freq < b1 {
                break (sym as u8, Interval::new(b0 as u16, (b1 - b0) as u16));
            }
            if freq < b0 {
                sym -= 1;
                acc -= self.weights[sym] as u64;
            } else {
                acc += w;
                sym += 1;
            }
        };

        self.weights[c as usize] += STEP;
        self.rescale_if_needed();
        (c, interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_after_promotion_from_hash() {
        let mut enc = DenseCtx::promote_from_hash(&[(7, 500), (99, 1200)]);
        let mut dec = DenseCtx::promote_from_hash(&[(7, 500), (99, 1200)]);
        for c in [7u8, 99, 0, 255, 7, 7, 128] {
            let iv = enc.encode(c);
            let (d, iv2) = dec.decode(iv.cum_freq as u32);
            assert_eq!(d, c);
            assert_eq!(iv, iv2);
        }
    }
}
