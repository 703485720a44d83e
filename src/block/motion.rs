//! Five-stage motion search for a differing block.
//!
//! Tried in order until one produces an exact match (every byte of the
//! block's bounding rectangle, shifted by the candidate vector, equals the
//! corresponding bytes in `prev`): the previous block's vector, the vector
//! of the block above, a far vertical sweep, a far horizontal sweep, and
//! finally a low-range two-dimensional search. Matching is always exact —
//! this codec is lossless, so a near-miss is not a match.

use super::grid::Rect;

#[derive(Clone, Copy, Debug)]
pub struct MotionParams {
    pub msr_x: i32,
    pub msr_y: i32,
    pub msrlow_x: i32,
    pub msrlow_y: i32,
}

fn rect_matches(
    cur: &[u8],
    prev: &[u8],
    stride: usize,
    rect: Rect,
    frame_w: usize,
    frame_h: usize,
    dx: i32,
    dy: i32,
) -> bool {
    let (x1, y1, x2, y2) = (rect.x1 as i32, rect.y1 as i32, rect.x2 as i32, rect.y2 as i32);
    if x1 + dx < 0 || y1 + dy < 0 || x2 + dx > frame_w as i32 || y2 + dy > frame_h as i32 {
        return false;
    }
    let width_bytes = (x2 - x1) as usize * 3;
    for y in y1..y2 {
        let cur_off = (y as usize) * stride + (x1 as usize) * 3;
        let prev_off = ((y + dy) as usize) * stride + ((x1 + dx) as usize) * 3;
        if cur[cur_off..cur_off + width_bytes] != prev[prev_off..prev_off + width_bytes] {
            return false;
        }
    }
    true
}

/// Outward-from-zero offsets `0, 1, -1, 2, -2, ...` up to `±limit`.
fn sweep(limit: i32) -> impl Iterator<Item = i32> {
    (0..=limit).flat_map(|k| if k == 0 { vec![0] } else { vec![k, -k] })
}

/// Column-exhaustive offsets `0, -1, -2, ..., -limit, 1, 2, ..., limit`:
/// every negative offset before any positive one, matching the low-range
/// search's nested `for (x = x1; x >= rx1; x--) ... for (x = x1+1; x < rx2; x++)`
/// loop pair in the original codec rather than sweeping outward.
fn column_major(limit: i32) -> impl Iterator<Item = i32> {
    (0..=limit).map(|k| -k).chain(1..=limit)
}

pub fn find_motion_vector(
    cur: &[u8],
    prev: &[u8],
    stride: usize,
    rect: Rect,
    frame_w: usize,
    frame_h: usize,
    last_mv: (i32, i32),
    above_mv: Option<(i32, i32)>,
    params: &MotionParams,
) -> Option<(i32, i32)> {
    let matches = |dx: i32, dy: i32| rect_matches(cur, prev, stride, rect, frame_w, frame_h, dx, dy);

    if matches(last_mv.0, last_mv.1) {
        return Some(last_mv);
    }

    if let Some(mv) = above_mv {
        if mv != last_mv && matches(mv.0, mv.1) {
            return Some(mv);
        }
    }

    for dy in sweep(params.msr_y) {
        if matches(0, dy) {
            return Some((0, dy));
        }
    }

    for dx in sweep(params.msr_x) {
        if matches(dx, 0) {
            return Some((dx, 0));
        }
    }

    for dx in column_major(params.msrlow_x) {
        for dy in column_major(params.msrlow_y) {
            if matches(dx, dy) {
                return Some((dx, dy));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(w: usize, h: usize, stride: usize, color: [u8; 3]) -> Vec<u8> {
        let mut buf = vec![0u8; stride * h];
        for y in 0..h {
            for x in 0..w {
                let off = y * stride + x * 3;
                buf[off..off + 3].copy_from_slice(&color);
            }
        }
        buf
    }

    #[test]
    fn finds_pure_horizontal_shift() {
        // the rect under test (0..32) is narrower than the frame (40 wide)
        // so a positive dx has somewhere to source its content from: a rect
        // that exactly spans the whole frame can never shift without
        // reading outside the buffer, by construction.
        let w = 40;
        let h = 16;
        let stride = w * 3;
        let mut prev = solid_frame(w, h, stride, [0, 0, 0]);
        for y in 0..h {
            prev[y * stride + 8 * 3] = 9;
        }
        let mut cur = solid_frame(w, h, stride, [0, 0, 0]);
        for y in 0..h {
            cur[y * stride + 5 * 3] = 9;
        }
        let rect = Rect { x1: 0, y1: 0, x2: 32, y2: h as u16 };
        let params = MotionParams { msr_x: 16, msr_y: 16, msrlow_x: 8, msrlow_y: 8 };
        let mv = find_motion_vector(&cur, &prev, stride, rect, w, h, (0, 0), None, &params);
        assert_eq!(mv, Some((3, 0)));
    }

    #[test]
    fn prefers_last_mv_shortcut() {
        let w = 20;
        let h = 16;
        let stride = w * 3;
        let prev = solid_frame(w, h, stride, [1, 2, 3]);
        let cur = solid_frame(w, h, stride, [1, 2, 3]);
        let rect = Rect { x1: 0, y1: 0, x2: 16, y2: h as u16 };
        let params = MotionParams { msr_x: 16, msr_y: 16, msrlow_x: 8, msrlow_y: 8 };
        let mv = find_motion_vector(&cur, &prev, stride, rect, w, h, (2, 0), None, &params);
        assert_eq!(mv, Some((2, 0)));
    }

    #[test]
    fn no_match_returns_none() {
        let w = 16;
        let h = 16;
        let stride = w * 3;
        let prev = solid_frame(w, h, stride, [1, 2, 3]);
        let cur = solid_frame(w, h, stride, [9, 9, 9]);
        let rect = Rect { x1: 0, y1: 0, x2: w as u16, y2: h as u16 };
        let params = MotionParams { msr_x: 4, msr_y: 4, msrlow_x: 2, msrlow_y: 2 };
        let mv = find_motion_vector(&cur, &prev, stride, rect, w, h, (0, 0), None, &params);
        assert_eq!(mv, None);
    }
}
