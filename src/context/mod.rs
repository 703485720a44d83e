//! Adaptive per-context byte statistics with seven growable
//! representations, promoted from the cheapest (a flat list of symbols
//! seen once) to the most expressive (a dense 256-entry weighted table) as
//! evidence accumulates. A codec instance keeps a large array of these
//! (indexed by a small pixel-neighbourhood context, see
//! [`crate::pixel::predictor`]), so kinds 0-3 deliberately cost nothing
//! beyond a handful of bytes until a context actually sees repeats.

mod dense;
pub mod fixed;
mod hash;
mod list;
mod scale;
mod small;

pub use fixed::FixedContext;
pub use list::FindResult;

use crate::prob::Interval;
use dense::DenseCtx;
use hash::{HashCtx, InsertOutcome};
use list::ListCtx;
use small::SmallCtx;

#[derive(Clone, Debug)]
pub enum Context {
    Empty,
    List1(ListCtx<14>),
    List2(Box<ListCtx<64>>),
    List3(Box<ListCtx<256>>),
    Small4(SmallCtx<4>),
    Small5(Box<SmallCtx<16>>),
    Hash6(Box<HashCtx>),
    Dense7(Box<DenseCtx>),
}

impl Default for Context {
    fn default() -> Self {
        Context::Empty
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> u8 {
        match self {
            Context::Empty => 0,
            Context::List1(_) => 1,
            Context::List2(_) => 2,
            Context::List3(_) => 3,
            Context::Small4(_) => 4,
            Context::Small5(_) => 5,
            Context::Hash6(_) => 6,
            Context::Dense7(_) => 7,
        }
    }

    /// Resets to the freshly-created state, as happens for every adaptive
    /// byte context when the codec starts a new I-frame.
    pub fn renew(&mut self) {
        *self = Context::Empty;
    }

    /// Encodes `c`, returning the interval the entropy coder must write.
    /// For kinds 0-3 this is always a bypass interval (no statistics exist
    /// yet to model `c`'s probability); the context still records that it
    /// has seen `c` and may promote to a modelling kind as a side effect.
    pub fn encode(&mut self, c: u8) -> Interval {
        match self {
            Context::Empty => {
                *self = Context::List1(ListCtx::new(c));
                Interval::bypass(c)
            }
            Context::List1(l) => {
                match l.find_or_add(c) {
                    FindResult::Found => {
                        *self = if l.distinct() <= 4 {
                            Context::Small4(SmallCtx::promote_from_list(l.symbols(), c))
                        } else {
                            Context::Small5(Box::new(SmallCtx::promote_from_list(l.symbols(), c)))
                        };
                    }
                    FindResult::Added => {}
                    FindResult::NoRoom => {
                        *self = Context::List2(Box::new(ListCtx::promote_from(l, c)));
                    }
                }
                Interval::bypass(c)
            }
            Context::List2(l) => {
                match l.find_or_add(c) {
                    FindResult::Found => {
                        let weights = HashCtx::initial_weights_from_list(l.symbols());
                        *self = Context::Hash6(Box::new(HashCtx::promote_from(&weights)));
                    }
                    FindResult::Added => {}
                    FindResult::NoRoom => {
                        *self = Context::List3(Box::new(ListCtx::promote_from(l, c)));
                    }
                }
                Interval::bypass(c)
            }
            Context::List3(l) => {
                match l.find_or_add(c) {
                    FindResult::Found => {
                        *self = Context::Dense7(Box::new(DenseCtx::promote_from_list(l.symbols())));
                    }
                    FindResult::Added => {}
                    FindResult::NoRoom => unreachable!(
                        "a 256-entry list over a 256-symbol alphabet can never run out of room"
                    ),
                }
                Interval::bypass(c)
            }
            Context::Small4(s) => {
                let (interval, fit) = s.encode(c);
                if !fit {
                    *self = Context::Small5(Box::new(SmallCtx::promote_from(s)));
                }
                interval
            }
            Context::Small5(s) => {
                let (interval, fit) = s.encode(c);
                if !fit {
                    let known = s.known_pairs();
                    *self = Context::Hash6(Box::new(HashCtx::promote_from(&known)));
                }
                interval
            }
            Context::Hash6(h) => {
                let (interval, outcome) = h.encode(c);
                if let InsertOutcome::NeedsPromote = outcome {
                    let known = h.known_pairs();
                    *self = Context::Dense7(Box::new(DenseCtx::promote_from_hash(&known)));
                }
                interval
            }
            Context::Dense7(d) => d.encode(c),
        }
    }

    /// Decodes a symbol given the rANS cumulative-frequency position.
    /// Returns `None` for kinds 0-3: no statistics exist yet to decode
    /// from, so the caller must instead read `c` directly off the bypass
    /// channel and call [`Context::update`].
    pub fn decode(&mut self, freq: u32) -> Option<(u8, Interval)> {
        match self {
            Context::Empty | Context::List1(_) | Context::List2(_) | Context::List3(_) => None,
            Context::Small4(s) => {
                let (c, interval, fit) = s.decode(freq);
                if !fit {
                    *self = Context::Small5(Box::new(SmallCtx::promote_from(s)));
                }
                Some((c, interval))
            }
            Context::Small5(s) => {
                let (c, interval, fit) = s.decode(freq);
                if !fit {
                    let known = s.known_pairs();
                    *self = Context::Hash6(Box::new(HashCtx::promote_from(&known)));
                }
                Some((c, interval))
            }
            Context::Hash6(h) => {
                let (c, interval, outcome) = h.decode(freq);
                if let InsertOutcome::NeedsPromote = outcome {
                    let known = h.known_pairs();
                    *self = Context::Dense7(Box::new(DenseCtx::promote_from_hash(&known)));
                }
                Some((c, interval))
            }
            Context::Dense7(d) => Some(d.decode(freq)),
        }
    }

    /// Called by the decoder after reading a raw bypass byte for a
    /// not-yet-modelled context (kinds 0-3), so the context still learns
    /// about `c` even though it did not decode it.
    pub fn update(&mut self, c: u8) {
        match self {
            Context::Empty => *self = Context::List1(ListCtx::new(c)),
            Context::List1(l) => {
                match l.find_or_add(c) {
                    FindResult::Found => {
                        *self = if l.distinct() <= 4 {
                            Context::Small4(SmallCtx::promote_from_list(l.symbols(), c))
                        } else {
                            Context::Small5(Box::new(SmallCtx::promote_from_list(l.symbols(), c)))
                        };
                    }
                    FindResult::Added => {}
                    FindResult::NoRoom => {
                        *self = Context::List2(Box::new(ListCtx::promote_from(l, c)));
                    }
                }
            }
            Context::List2(l) => match l.find_or_add(c) {
                FindResult::Found => {
                    let weights = HashCtx::initial_weights_from_list(l.symbols());
                    *self = Context::Hash6(Box::new(HashCtx::promote_from(&weights)));
                }
                FindResult::Added => {}
                FindResult::NoRoom => {
                    *self = Context::List3(Box::new(ListCtx::promote_from(l, c)));
                }
            },
            Context::List3(l) => match l.find_or_add(c) {
                FindResult::Found => {
                    *self = Context::Dense7(Box::new(DenseCtx::promote_from_list(l.symbols())));
                }
                FindResult::Added => {}
                FindResult::NoRoom => unreachable!(
                    "a 256-entry list over a 256-symbol alphabet can never run out of room"
                ),
            },
            // kinds >= 4 already update their own statistics inside `decode`.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_through_kinds_in_order_as_a_symbol_repeats() {
        let mut ctx = Context::new();
        assert_eq!(ctx.kind(), 0);
        ctx.encode(5);
        assert_eq!(ctx.kind(), 1);
        ctx.encode(5); // repeat -> promotes to 4 (d=1 <= 4)
        assert_eq!(ctx.kind(), 4);
    }

    #[test]
    fn kind1_promotes_to_list2_then_list3_then_dense_on_repeat() {
        let mut ctx = Context::new();
        for c in 0u8..14 {
            ctx.encode(c);
        }
        assert_eq!(ctx.kind(), 1);
        ctx.encode(200); // 15th distinct symbol -> kind 2
        assert_eq!(ctx.kind(), 2);
        for c in 15u8..64 {
            ctx.encode(c);
        }
        assert_eq!(ctx.kind(), 2);
        ctx.encode(250); // 65th distinct symbol -> kind 3
        assert_eq!(ctx.kind(), 3);
    }

    #[test]
    fn full_roundtrip_across_many_promotions() {
        let mut enc = Context::new();
        let mut dec = Context::new();
        let mut stream = Vec::new();

        for i in 0..500u32 {
            let c = (i % 37) as u8;
            let iv = enc.encode(c);
            stream.push((c, iv));
        }

        for (c, iv) in stream {
            if iv.is_bypass() {
                assert_eq!(iv.cum_freq as u8, c);
                dec.update(c);
            } else {
                let (dc, div) = dec.decode(iv.cum_freq as u32).unwrap();
                assert_eq!(dc, c);
                assert_eq!(div, iv);
            }
        }
    }
}
