//! Kind 6: an open-addressed hash table for contexts with up to 40 distinct
//! symbols. Starts at capacity 32, grows once to 64 under load, and hands
//! off to the dense kind 7 table once `d` would exceed 40 or capacity 64
//! fills up.
//!
//! The original codec places entries by symbol value modulo table size and
//! evicts the lower-count occupant on collision (Robin-Hood-style) to keep
//! decode-side linear scans short. This implementation keeps the same
//! capacity/promotion thresholds and the same linear-probe placement by
//! symbol hash, but probes past a collision rather than evicting — the
//! eviction is a decode-speed optimization this clean-room port does not
//! need to reproduce bit-for-bit to stay correct (see `DESIGN.md`).

use crate::context::scale;
use crate::prob::{Interval, PROB_SCALE};

const STEP: u32 = 32;
const MAX_DISTINCT: usize = 40;
const MAX_CAPACITY: usize = 64;
const ALPHABET: usize = 256;

pub enum InsertOutcome {
    Fit,
    NeedsPromote,
}

#[derive(Clone, Debug)]
pub struct HashCtx {
    symbols: Vec<Option<u32>>,
    weights: Vec<u32>,
    capacity: usize,
    d: usize,
}

impl HashCtx {
    pub fn promote_from(known: &[(u32, u32)]) -> Self {
        let capacity = if known.len() >= 24 { MAX_CAPACITY } else { 32 };
        let mut ctx = Self {
            symbols: vec![None; capacity],
            weights: vec![0; capacity],
            capacity,
            d: 0,
        };
        for &(sym, w) in known {
            ctx.probe_insert(sym, w);
        }
        ctx
    }

    pub fn distinct(&self) -> usize {
        self.d
    }

    fn probe_insert(&mut self, c: u32, weight: u32) {
        let mask = self.capacity - 1;
        let mut pos = (c as usize) & mask;
        loop {
            match self.symbols[pos] {
                None => {
                    self.symbols[pos] = Some(c);
                    self.weights[pos] = weight;
                    self.d += 1;
                    return;
                }
                Some(s) if s == c => {
                    self.weights[pos] += weight;
                    return;
                }
                _ => pos = (pos + 1) & mask,
            }
        }
    }

    fn grow(&mut self) -> bool {
        if self.capacity >= MAX_CAPACITY {
            return false;
        }
        let old_symbols = std::mem::take(&mut self.symbols);
        let old_weights = std::mem::take(&mut self.weights);
        self.capacity *= 2;
        self.symbols = vec![None; self.capacity];
        self.weights = vec![0; self.capacity];
        self.d = 0;
        for (sym, w) in old_symbols.into_iter().zip(old_weights) {
            if let Some(sym) = sym {
                self.probe_insert(sym, w);
            }
        }
        true
    }

    fn known(&self) -> Vec<(u32, u32)> {
        let mut v: Vec<(u32, u32)> = self
            .symbols
            .iter()
            .zip(self.weights.iter())
            .filter_map(|(s, &w)| s.map(|sym| (sym, w)))
            .collect();
        v.sort_unstable_by_key(|&(sym, _)| sym);
        v
    }

    /// Exposes the `(symbol, weight)` pairs this context has accumulated,
    /// for a caller that is about to promote to the dense kind 7 table.
    pub fn known_pairs(&self) -> Vec<(u32, u32)> {
        self.known()
    }

    /// `(symbol, weight)` pairs for symbols carried over from a smaller
    /// list-based context (kind 2), each treated as "seen twice" since the
    /// promotion only happens on a repeat.
    pub fn initial_weights_from_list(symbols: &[u8]) -> Vec<(u32, u32)> {
        symbols.iter().map(|&s| (s as u32, 2 * STEP)).collect()
    }

    fn known_sum(&self) -> u64 {
        self.weights.iter().map(|&w| w as u64).sum()
    }

    fn rescale_if_needed(&mut self) {
        let total = scale::total_weight(self.known_sum(), self.d, ALPHABET);
        if total as u32 + STEP > PROB_SCALE {
            for (sym, w) in self.symbols.iter().zip(self.weights.iter_mut()) {
                if sym.is_some() {
                    *w = (*w - (*w >> 1)).max(1);
                }
            }
        }
    }

    fn insert_new(&mut self, c: u8) -> InsertOutcome {
        if self.d >= MAX_DISTINCT {
            return InsertOutcome::NeedsPromote;
        }
        if self.d * 4 >= self.capacity * 3 && !self.grow() {
            return InsertOutcome::NeedsPromote;
        }
        self.probe_insert(c as u32, STEP);
        self.rescale_if_needed();
        InsertOutcome::Fit
    }

    pub fn encode(&mut self, c: u8) -> (Interval, InsertOutcome) {
        let known = self.known();
        let total = scale::total_weight(self.known_sum(), self.d, ALPHABET);
        let interval = scale::locate_symbol(&known, total, ALPHABET, c as u32);

        let pos = self.symbols.iter().position(|&s| s == Some(c as u32));
        match pos {
            Some(p) => {
                self.weights[p] += STEP;
                self.rescale_if_needed();
                (interval, InsertOutcome::Fit)
            }
            None => (interval, self.insert_new(c)),
        }
    }

    pub fn decode(&mut self, freq: u32) -> (u8, Interval, InsertOutcome) {
        let known = self.known();
        let total = scale::total_weight(self.known_sum(), self.d, ALPHABET);
        let (sym, interval) = scale::locate_by_freq(&known, total, ALPHABET, freq);
        let c = sym as u8;

        let pos = self.symbols.iter().position(|&s| s == Some(sym));
        match pos {
            Some(p) => {
                self.weights[p] += STEP;
                self.rescale_if_needed();
                (c, interval, InsertOutcome::Fit)
            }
            None => (c, interval, self.insert_new(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_then_promotes_past_forty_distinct_symbols() {
        let mut ctx = HashCtx::promote_from(&[]);
        let mut promoted_at = None;
        for c in 0u8..50 {
            let (iv, outcome) = ctx.encode(c);
            assert!(iv.check_invariant());
            if matches!(outcome, InsertOutcome::NeedsPromote) {
                promoted_at = Some(c);
                break;
            }
        }
        assert_eq!(promoted_at, Some(40));
    }

    #[test]
    fn encode_decode_agree() {
        let mut enc = HashCtx::promote_from(&[(5, 50), (200, 75)]);
        let mut dec = HashCtx::promote_from(&[(5, 50), (200, 75)]);
        for &c in &[5u8, 200, 5, 9, 5, 200, 9] {
            let (iv, _) = enc.encode(c);
            let (dc, iv2, _) = dec.decode(iv.cum_freq as u32);
            assert_eq!(dc, c);
            assert_eq!(iv, iv2);
        }
    }
}
