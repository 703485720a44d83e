//! Kinds 4-5: small explicit-weight tables. A context reaches these once a
//! symbol has repeated while `d` (the number of distinct symbols seen) is
//! still small: kind 4 holds up to 4 symbols inline (fits next to the
//! discriminant with no heap allocation), kind 5 holds up to 16 on the
//! heap. Both share the same growth step and the same interval math from
//! [`super::scale`]; they differ only in capacity.

use crate::context::scale;
use crate::prob::Interval;

const STEP: u32 = 50;
const ALPHABET: usize = 256;

#[derive(Clone, Debug)]
pub struct SmallCtx<const S: usize> {
    symbols: [u32; S],
    weights: [u32; S],
    d: usize,
}

impl<const S: usize> SmallCtx<S> {
    /// Builds from a [`super::list::ListCtx`] whose `d`-th distinct symbol
    /// (`c`) just repeated: every symbol seen gets the baseline weight,
    /// except `c`, which gets double (it has now been seen twice).
    pub fn promote_from_list(symbols: &[u8], c: u8) -> Self {
        let mut pairs: Vec<u32> = symbols.iter().map(|&b| b as u32).collect();
        pairs.sort_unstable();
        let mut out = Self {
            symbols: [0; S],
            weights: [0; S],
            d: pairs.len(),
        };
        for (i, &sym) in pairs.iter().enumerate() {
            out.symbols[i] = sym;
            out.weights[i] = if sym == c as u32 { 2 * STEP } else { STEP };
        }
        out
    }

    /// Builds a larger `SmallCtx` from a smaller one that just overflowed.
    pub fn promote_from<const R: usize>(old: &SmallCtx<R>) -> Self {
        let mut out = Self {
            symbols: [0; S],
            weights: [0; S],
            d: old.d,
        };
        out.symbols[..old.d].copy_from_slice(&old.symbols[..old.d]);
        out.weights[..old.d].copy_from_slice(&old.weights[..old.d]);
        out
    }

    pub fn distinct(&self) -> usize {
        self.d
    }

    fn known(&self) -> Vec<(u32, u32)> {
        (0..self.d).map(|i| (self.symbols[i], self.weights[i])).collect()
    }

    /// Exposes the `(symbol, weight)` pairs this context has accumulated,
    /// for a caller that is about to promote to a larger representation.
    pub fn known_pairs(&self) -> Vec<(u32, u32)> {
        self.known()
    }

    fn known_sum(&self) -> u64 {
        self.weights[..self.d].iter().map(|&w| w as u64).sum()
    }

    fn rescale_if_needed(&mut self) {
        let total = scale::total_weight(self.known_sum(), self.d, ALPHABET);
        if total as u32 + STEP > crate::prob::PROB_SCALE {
            scale::rescale_weights(&mut self.weights[..self.d]);
        }
    }

    fn bump(&mut self, pos: usize) {
        self.weights[pos] += STEP;
        self.rescale_if_needed();
    }

    fn insert_new(&mut self, c: u8) -> bool {
        if self.d >= S {
            return false;
        }
        // keep sorted by symbol value for the shared scale helpers.
        let pos = self.symbols[..self.d]
            .iter()
            .position(|&s| s > c as u32)
            .unwrap_or(self.d);
        self.symbols.copy_within(pos..self.d, pos + 1);
        self.weights.copy_within(pos..self.d, pos + 1);
        self.symbols[pos] = c as u32;
        self.weights[pos] = STEP;
        self.d += 1;
        self.rescale_if_needed();
        true
    }

    /// Returns `Some(interval)` and whether the context still has room
    /// (`true`) or must be promoted by the caller right after this call
    /// (`false`) — the interval returned in that case is still valid and
    /// must be used to encode `c`.
    pub fn encode(&mut self, c: u8) -> (Interval, bool) {
        let known = self.known();
        let total = scale::total_weight(self.known_sum(), self.d, ALPHABET);
        let interval = scale::locate_symbol(&known, total, ALPHABET, c as u32);

        if let Some(pos) = self.symbols[..self.d].iter().position(|&s| s == c as u32) {
            self.bump(pos);
            (interval, true)
        } else {
            let fit = self.insert_new(c);
            (interval, fit)
        }
    }

    pub fn decode(&mut self, freq: u32) -> (u8, Interval, bool) {
        let known = self.known();
        let total = scale::total_weight(self.known_sum(), self.d, ALPHABET);
        let (sym, interval) = scale::locate_by_freq(&known, total, ALPHABET, freq);
        let c = sym as u8;

        if let Some(pos) = self.symbols[..self.d].iter().position(|&s| s == sym) {
            self.bump(pos);
            (c, interval, true)
        } else {
            let fit = self.insert_new(c);
            (c, interval, fit)
        }
    }
}
