//! Top-level frame compress/decompress orchestration: the flat-frame fast
//! path, I/P frame-type decision, and the full I-frame and P-frame codecs
//! built out of the pixel, block, and entropy layers.

use std::sync::Mutex;

use log::{debug, info, trace};

use crate::block::decision::{detect_change, type_code};
use crate::block::grid::{
    BlockGrid, BlockPos, Rect, FULLY_DIFFERS, FULLY_DIFFERS_MOTION, PARTIALLY_DIFFERS,
    PARTIALLY_DIFFERS_MOTION, UNCHANGED,
};
use crate::block::motion::{find_motion_vector, MotionParams};
use crate::block::rowstate::RowTable;
use crate::config::CodecConfig;
use crate::context::{Context, FixedContext};
use crate::error::{CodecError, CodecResult};
use crate::frame::buffer::FrameBuffer;
use crate::frame::stream::{EntropyReader, EntropyWriter};
use crate::pixel::predictor::{self, Neighbourhood};
use crate::pixel::rle::{Run, RunBuilder};
use crate::pixel::ColorModel;
use crate::worker::Squad;

const WIRE_VERSION: u8 = 4;
const MARKER_P_IDENTICAL: u8 = 0x00;
const MARKER_P_GENERAL: u8 = 0x01;
const MARKER_I_FLAT_LOW: u8 = 0x01;
const MARKER_I_FULL_LOW: u8 = 0x02;

fn version_nibble() -> u8 {
    (WIRE_VERSION - 1) << 4
}

/// An I/P-frame requester's hint; the flat-frame fast path overrides both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameTypeRequest {
    Auto,
    ForceI,
}

pub struct Codec {
    config: CodecConfig,
    color: ColorModel,
    predictor_ctx: [FixedContext<6>; 6],
    run_ctx: [FixedContext<256>; 6],
    block_type_ctx: FixedContext<5>,
    block_index_lo: Context,
    block_index_hi: Context,
    rect_ctx: FixedContext<16>,
    mv_lo_ctx: Context,
    mv_hi_ctx: Context,
    prev: Option<FrameBuffer>,
    last_flat_color: Option<[u8; 3]>,
    last_mv: (i32, i32),
    first_frame: bool,
}

impl Codec {
    pub fn new(config: CodecConfig) -> CodecResult<Self> {
        config.validate()?;
        info!("codec init: {}x{}", config.width, config.height);
        Ok(Self {
            config,
            color: ColorModel::new(),
            predictor_ctx: Default::default(),
            run_ctx: std::array::from_fn(|_| FixedContext::default()),
            block_type_ctx: FixedContext::default(),
            block_index_lo: Context::new(),
            block_index_hi: Context::new(),
            rect_ctx: FixedContext::default(),
            mv_lo_ctx: Context::new(),
            mv_hi_ctx: Context::new(),
            prev: None,
            last_flat_color: None,
            last_mv: (0, 0),
            first_frame: true,
        })
    }

    /// Resets every adaptive context, as happens at the start of a fresh
    /// I-frame (`RenewI` in the original).
    fn renew_i(&mut self) {
        debug!("renew_i");
        self.color.renew();
        self.predictor_ctx = Default::default();
        self.run_ctx = std::array::from_fn(|_| FixedContext::default());
        self.block_type_ctx = FixedContext::default();
        self.block_index_lo = Context::new();
        self.block_index_hi = Context::new();
        self.rect_ctx = FixedContext::default();
        self.mv_lo_ctx = Context::new();
        self.mv_hi_ctx = Context::new();
    }

    fn motion_params(&self) -> MotionParams {
        MotionParams {
            msr_x: self.config.msr_x,
            msr_y: self.config.msr_y,
            msrlow_x: self.config.msrlow_x,
            msrlow_y: self.config.msrlow_y,
        }
    }

    /// Applies `pixel & ~((1 << loss) - 1)` plus the correction bit across
    /// the whole frame, matching the original's `DoLoss`, and zeroes the
    /// stride padding bytes beyond each row's last real pixel column. Runs
    /// one row-band per worker, the way `decide_blocks` and
    /// `classify_i_parallel` do.
    fn apply_loss(&self, frame: &mut FrameBuffer) -> CodecResult<()> {
        if self.config.loss == 0 {
            return Ok(());
        }
        let mask = !((1u32 << self.config.loss) - 1) as u8;
        let corr = 1u8 << (self.config.loss - 1);
        let width = frame.width;
        let height = frame.height;
        let stride = frame.stride;
        let squad = Squad::new(self.config.worker_count());
        let per_worker: Vec<Mutex<Vec<u8>>> =
            (0..squad.worker_count()).map(|_| Mutex::new(Vec::new())).collect();

        squad.run_parallel(|worker| {
            let (start, count) = squad.segment(height, worker);
            let mut band = vec![0u8; count * stride];
            for row in 0..count {
                let src_off = (start + row) * stride;
                let dst_off = row * stride;
                for x in 0..width {
                    for c in 0..3 {
                        band[dst_off + x * 3 + c] = (frame.data[src_off + x * 3 + c] & mask) | corr;
                    }
                }
                // padding beyond the last real pixel column carries no
                // pixel data; zero it rather than loss-masking it.
                for b in &mut band[dst_off + width * 3..dst_off + stride] {
                    *b = 0;
                }
            }
            *per_worker[worker].lock().unwrap() = band;
        })?;

        let mut offset = 0;
        for slot in per_worker {
            let band = slot.into_inner().unwrap();
            frame.data[offset..offset + band.len()].copy_from_slice(&band);
            offset += band.len();
        }
        Ok(())
    }

    pub fn compress(&mut self, raw: &[u8], request: FrameTypeRequest) -> anyhow::Result<Vec<u8>> {
        let mut frame = FrameBuffer::from_bytes(
            self.config.width as usize,
            self.config.height as usize,
            self.config.stride(),
            raw.to_vec(),
        );
        self.apply_loss(&mut frame)?;

        if let Some(color) = frame.flat_color() {
            trace!("flat frame detected: {color:?}");
            let changed = self.last_flat_color != Some(color);
            self.first_frame = false;
            if changed {
                self.renew_i();
                self.prev = Some(frame);
                self.last_flat_color = Some(color);
                let mut out = vec![MARKER_I_FLAT_LOW | version_nibble()];
                out.extend_from_slice(&color);
                return Ok(out);
            }
            // a repeat of the same flat colour: no reset, no re-encoding,
            // just the one-byte identical-P marker.
            self.prev = Some(frame);
            return Ok(vec![MARKER_P_IDENTICAL]);
        }
        self.last_flat_color = None;

        let want_i = self.first_frame || request == FrameTypeRequest::ForceI;
        self.first_frame = false;
        if want_i {
            Ok(self.compress_i(frame)?)
        } else {
            Ok(self.compress_p(frame)?)
        }
    }

    pub fn decompress(&mut self, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        if data.is_empty() {
            return Err(CodecError::TruncatedInput { offset: 0, needed: 1 }.into());
        }
        let marker = data[0];
        if marker == MARKER_P_IDENTICAL {
            let prev = self
                .prev
                .as_ref()
                .ok_or(CodecError::Invariant {
                    component: "dispatcher",
                    detail: "identical P-frame with no previous frame".into(),
                })?
                .clone();
            self.first_frame = false;
            return Ok(prev.data);
        }
        if marker & 0x0f == MARKER_I_FLAT_LOW && data.len() == 4 {
            let color = [data[1], data[2], data[3]];
            let changed = self.last_flat_color != Some(color);
            if changed {
                self.renew_i();
                let mut frame = FrameBuffer::new(
                    self.config.width as usize,
                    self.config.height as usize,
                    self.config.stride(),
                );
                frame.fill(color);
                self.prev = Some(frame);
                self.last_flat_color = Some(color);
            }
            self.first_frame = false;
            return Ok(self.prev.as_ref().unwrap().data.clone());
        }
        self.last_flat_color = None;
        if marker == MARKER_P_GENERAL && data.len() > 1 {
            self.first_frame = false;
            return Ok(self.decompress_p(&data[1..])?);
        }
        if marker & 0x0f == MARKER_I_FULL_LOW {
            if marker & 0xf0 != version_nibble() {
                return Err(CodecError::UnsupportedVersion {
                    found: (marker >> 4) + 1,
                    expected: WIRE_VERSION,
                }
                .into());
            }
            self.first_frame = false;
            return Ok(self.decompress_i(&data[1..])?);
        }
        Err(CodecError::Invariant {
            component: "dispatcher",
            detail: format!("unrecognised frame marker byte 0x{marker:02x}"),
        }
        .into())
    }

    fn neighbourhood_i(frame: &FrameBuffer, x: usize, y: usize) -> Neighbourhood {
        Neighbourhood {
            left: (x > 0).then(|| frame.pixel(x - 1, y)),
            above: (y > 0).then(|| frame.pixel(x, y - 1)),
            above_right: (y > 0 && x + 1 < frame.width).then(|| frame.pixel(x + 1, y - 1)),
            co_located: None,
        }
    }

    /// Splits the frame into row-bands, one per worker (the same
    /// `Squad::segment` partitioning `decide_blocks` uses), and has each
    /// worker run predictor classification and RLE accumulation over its
    /// own rows independently, writing into its own output slot. A run
    /// can't span a band boundary once the per-worker results are
    /// concatenated, which costs a handful of extra run bytes at worst —
    /// never correctness, since every pixel still gets exactly one
    /// (predictor, literal) entry in raster order.
    fn classify_i_parallel(&self, frame: &FrameBuffer) -> CodecResult<(Vec<Run>, Vec<[u8; 3]>)> {
        let width = frame.width;
        let height = frame.height;
        let squad = Squad::new(self.config.worker_count());
        let per_worker: Vec<Mutex<(Vec<Run>, Vec<[u8; 3]>)>> = (0..squad.worker_count())
            .map(|_| Mutex::new((Vec::new(), Vec::new())))
            .collect();

        squad.run_parallel(|worker| {
            let (start, count) = squad.segment(height, worker);
            let mut builder = RunBuilder::new();
            for y in start..start + count {
                for x in 0..width {
                    let nb = Self::neighbourhood_i(frame, x, y);
                    let actual = frame.pixel(x, y);
                    let id = predictor::classify_i(actual, &nb);
                    let literal = (id == predictor::LITERAL).then_some(actual);
                    builder.push(id, literal);
                }
            }
            *per_worker[worker].lock().unwrap() = builder.finish();
        })?;

        let mut runs = Vec::new();
        let mut literals = Vec::new();
        for slot in per_worker {
            let (r, l) = slot.into_inner().unwrap();
            runs.extend(r);
            literals.extend(l);
        }
        Ok((runs, literals))
    }

    fn compress_i(&mut self, frame: FrameBuffer) -> CodecResult<Vec<u8>> {
        self.renew_i();
        let (runs, mut literals) = self.classify_i_parallel(&frame)?;
        literals.reverse();

        let mut writer = EntropyWriter::new();
        let mut last_ptype = 0u8;
        for run in &runs {
            writer.encode_fixed(&mut self.predictor_ctx[last_ptype as usize], run.predictor as u32)?;
            writer.encode_fixed(&mut self.run_ctx[run.predictor as usize], run.len as u32)?;
            last_ptype = run.predictor;
            if run.predictor == predictor::LITERAL {
                for _ in 0..run.len {
                    let px = literals.pop().expect("one literal per LITERAL-run pixel");
                    writer.encode_rgb(&mut self.color, px)?;
                }
            }
        }
        let body = writer.finish()?;

        self.prev = Some(frame);
        let mut out = vec![MARKER_I_FULL_LOW | version_nibble()];
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decompress_i(&mut self, body: &[u8]) -> CodecResult<Vec<u8>> {
        self.renew_i();
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let stride = self.config.stride();
        let mut frame = FrameBuffer::new(width, height, stride);

        let mut reader = EntropyReader::new(body)?;
        let mut last_ptype = 0u8;
        let mut x = 0usize;
        let mut y = 0usize;
        while y < height {
            let id = reader.decode_fixed(&mut self.predictor_ctx[last_ptype as usize])? as u8;
            let n = reader.decode_fixed(&mut self.run_ctx[id as usize])?;
            last_ptype = id;
            for _ in 0..n {
                if y >= height {
                    break;
                }
                let nb = Self::neighbourhood_i(&frame, x, y);
                let pixel = if id == predictor::LITERAL {
                    reader.decode_rgb(&mut self.color)?
                } else {
                    predictor::predict(id, &nb).ok_or(CodecError::Invariant {
                        component: "pixel::predictor",
                        detail: "predictor referenced a pixel outside the frame".into(),
                    })?
                };
                frame.set_pixel(x, y, pixel);
                x += 1;
                if x >= width {
                    x = 0;
                    y += 1;
                }
            }
        }
        self.prev = Some(frame.clone());
        Ok(frame.data)
    }

    /// Runs change detection and motion search across the whole block grid,
    /// one row-band per worker to start; a worker that exhausts its band
    /// steals any row still `Untouched` in `row_table` rather than sitting
    /// idle. A worker's motion-vector "last seen" shortcut is local to its
    /// own run (seeded from `self.last_mv`, carried across a steal even
    /// though the stolen row isn't contiguous with its prior one — it's
    /// just a search shortcut, not a correctness requirement), while the
    /// "above" shortcut reads a neighbouring row once that row has
    /// been published through `row_table`, so a band boundary never sees a
    /// torn or stale result.
    fn decide_blocks(
        &self,
        frame: &FrameBuffer,
        prev: &FrameBuffer,
        grid: &BlockGrid,
        params: &MotionParams,
    ) -> CodecResult<(Vec<u8>, Vec<Option<Rect>>, Vec<Option<(i32, i32)>>)> {
        let width = frame.width;
        let height = frame.height;
        let stride = frame.stride;
        let n = grid.len();
        let types = Mutex::new(vec![0u8; n]);
        let rects: Mutex<Vec<Option<Rect>>> = Mutex::new(vec![None; n]);
        let mvs: Mutex<Vec<Option<(i32, i32)>>> = Mutex::new(vec![None; n]);
        let row_table = RowTable::new(grid.nby);
        let squad = Squad::new(self.config.worker_count());
        let base_mv = self.last_mv;

        squad.run_parallel(|worker| {
            let (start, count) = squad.segment(grid.nby, worker);
            let mut cursor = base_mv;

            let mut process_row = |by: usize| {
                if by > 0 {
                    while !row_table.is_done(by - 1) {
                        std::thread::yield_now();
                    }
                }
                for bx in 0..grid.nbx {
                    let pos = BlockPos { bx, by };
                    let idx = grid.index(pos);
                    let bounds = pos.bounds(width, height);
                    if let Some(changed) = detect_change(&frame.data, &prev.data, stride, bounds) {
                        let mut tcode = type_code(bounds, changed);
                        let above_mv = if by > 0 {
                            mvs.lock().unwrap()[grid.index(BlockPos { bx, by: by - 1 })]
                        } else {
                            None
                        };
                        if let Some(mv) = find_motion_vector(
                            &frame.data, &prev.data, stride, changed, width, height,
                            cursor, above_mv, params,
                        ) {
                            cursor = mv;
                            tcode = if tcode == FULLY_DIFFERS { FULLY_DIFFERS_MOTION } else { PARTIALLY_DIFFERS_MOTION };
                            mvs.lock().unwrap()[idx] = Some(mv);
                        }
                        types.lock().unwrap()[idx] = tcode;
                        rects.lock().unwrap()[idx] = Some(changed);
                    } else {
                        types.lock().unwrap()[idx] = UNCHANGED;
                    }
                }
                row_table.mark_done(by);
            };

            for by in start..start + count {
                row_table.claim(by);
                process_row(by);
            }
            // band exhausted: scan for any row another worker hasn't reached
            // yet (e.g. its band is longer, or it's stalled) and take it.
            while let Some(by) = row_table.steal() {
                process_row(by);
            }
        })?;

        Ok((
            types.into_inner().unwrap(),
            rects.into_inner().unwrap(),
            mvs.into_inner().unwrap(),
        ))
    }

    fn compress_p(&mut self, frame: FrameBuffer) -> CodecResult<Vec<u8>> {
        let prev = self.prev.clone().ok_or(CodecError::Invariant {
            component: "dispatcher",
            detail: "P-frame requested with no previous frame".into(),
        })?;

        if frame.data == prev.data {
            self.prev = Some(frame);
            return Ok(vec![MARKER_P_IDENTICAL]);
        }

        let width = frame.width;
        let height = frame.height;
        let stride = frame.stride;
        let grid = BlockGrid::new(width, height);
        let params = self.motion_params();

        let (block_types, block_rects, block_mvs) = self.decide_blocks(&frame, &prev, &grid, &params)?;

        let mut first_changed = None;
        let mut last_changed = None;
        for (idx, &t) in block_types.iter().enumerate() {
            if t != UNCHANGED {
                first_changed.get_or_insert(idx);
                last_changed = Some(idx);
            }
        }

        let (first_changed, last_changed) = match (first_changed, last_changed) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                self.prev = Some(frame);
                return Ok(vec![MARKER_P_IDENTICAL]);
            }
        };

        let mut writer = EntropyWriter::new();
        let lo = (first_changed & 0xff) as u8;
        let hi = ((first_changed >> 8) & 0xff) as u8;
        writer.encode_byte(&mut self.block_index_lo, lo)?;
        writer.encode_byte(&mut self.block_index_hi, hi)?;
        let lo = (last_changed & 0xff) as u8;
        let hi = ((last_changed >> 8) & 0xff) as u8;
        writer.encode_byte(&mut self.block_index_lo, lo)?;
        writer.encode_byte(&mut self.block_index_hi, hi)?;

        let mut rle_builder = RunBuilder::new();
        for idx in first_changed..=last_changed {
            rle_builder.push(block_types[idx], None);
        }
        let (runs, _) = rle_builder.finish();
        for run in &runs {
            writer.encode_fixed(&mut self.block_type_ctx, run.predictor as u32)?;
            writer.encode_fixed(&mut self.run_ctx[0], run.len as u32)?;
        }

        for idx in first_changed..=last_changed {
            if block_types[idx] == UNCHANGED {
                continue;
            }
            let bounds = grid.pos(idx).bounds(width, height);
            let rect = block_rects[idx].unwrap();
            writer.encode_fixed(&mut self.rect_ctx, (rect.x1 - bounds.x1) as u32)?;
            writer.encode_fixed(&mut self.rect_ctx, (rect.y1 - bounds.y1) as u32)?;
            writer.encode_fixed(&mut self.rect_ctx, (rect.x2 - bounds.x1) as u32)?;
            writer.encode_fixed(&mut self.rect_ctx, (rect.y2 - bounds.y1) as u32)?;

            if let Some(mv) = block_mvs[idx] {
                self.encode_motion_vector(&mut writer, mv)?;
            } else {
                self.encode_block_rle(&mut writer, &frame, &prev, rect)?;
            }
        }

        let body = writer.finish()?;
        self.prev = Some(frame);
        let mut out = vec![MARKER_P_GENERAL];
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn encode_motion_vector(&mut self, writer: &mut EntropyWriter, mv: (i32, i32)) -> CodecResult<()> {
        let same_as_last = mv == self.last_mv;
        writer.encode_bool(same_as_last)?;
        if !same_as_last {
            self.encode_mv_component(writer, mv.0)?;
            self.encode_mv_component(writer, mv.1)?;
        }
        self.last_mv = mv;
        Ok(())
    }

    fn encode_mv_component(&mut self, writer: &mut EntropyWriter, v: i32) -> CodecResult<()> {
        let biased = (v + 32768) as u16;
        writer.encode_byte(&mut self.mv_lo_ctx, (biased & 0xff) as u8)?;
        writer.encode_byte(&mut self.mv_hi_ctx, (biased >> 8) as u8)
    }

    fn encode_block_rle(
        &mut self,
        writer: &mut EntropyWriter,
        frame: &FrameBuffer,
        prev: &FrameBuffer,
        rect: Rect,
    ) -> CodecResult<()> {
        let mut builder = RunBuilder::new();
        for y in rect.y1..rect.y2 {
            for x in rect.x1..rect.x2 {
                let actual = frame.pixel(x as usize, y as usize);
                let nb = Neighbourhood {
                    left: (x > rect.x1).then(|| frame.pixel(x as usize - 1, y as usize)),
                    above: (y > rect.y1).then(|| frame.pixel(x as usize, y as usize - 1)),
                    above_right: (y > rect.y1 && x + 1 < rect.x2)
                        .then(|| frame.pixel(x as usize + 1, y as usize - 1)),
                    co_located: Some(prev.pixel(x as usize, y as usize)),
                };
                let id = if y == rect.y1 {
                    predictor::classify_p_row0(actual, nb.co_located.unwrap())
                } else {
                    predictor::classify_p(actual, &nb)
                };
                let literal = (id == predictor::LITERAL).then_some(actual);
                builder.push(id, literal);
            }
        }
        let (runs, mut literals) = builder.finish();
        literals.reverse();
        let mut last_ptype = 0u8;
        for run in &runs {
            writer.encode_fixed(&mut self.predictor_ctx[last_ptype as usize], run.predictor as u32)?;
            writer.encode_fixed(&mut self.run_ctx[run.predictor as usize], run.len as u32)?;
            last_ptype = run.predictor;
            if run.predictor == predictor::LITERAL {
                for _ in 0..run.len {
                    let px = literals.pop().expect("one literal per LITERAL-run pixel");
                    writer.encode_rgb(&mut self.color, px)?;
                }
            }
        }
        Ok(())
    }

    fn decompress_p(&mut self, body: &[u8]) -> CodecResult<Vec<u8>> {
        let prev = self.prev.clone().ok_or(CodecError::Invariant {
            component: "dispatcher",
            detail: "P-frame decoded with no previous frame".into(),
        })?;
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let stride = self.config.stride();
        let grid = BlockGrid::new(width, height);
        let mut frame = prev.clone();

        let mut reader = EntropyReader::new(body)?;
        let lo = reader.decode_byte(&mut self.block_index_lo)?;
        let hi = reader.decode_byte(&mut self.block_index_hi)?;
        let first_changed = (lo as usize) | ((hi as usize) << 8);
        let lo = reader.decode_byte(&mut self.block_index_lo)?;
        let hi = reader.decode_byte(&mut self.block_index_hi)?;
        let last_changed = (lo as usize) | ((hi as usize) << 8);

        let count = last_changed - first_changed + 1;
        let mut block_types = Vec::with_capacity(count);
        while block_types.len() < count {
            let t = reader.decode_fixed(&mut self.block_type_ctx)? as u8;
            let n = reader.decode_fixed(&mut self.run_ctx[0])?;
            for _ in 0..n {
                block_types.push(t);
            }
        }

        for (offset, &tcode) in block_types.iter().enumerate() {
            let idx = first_changed + offset;
            if tcode == UNCHANGED {
                continue;
            }
            let pos = grid.pos(idx);
            let bounds = pos.bounds(width, height);
            let rx1 = reader.decode_fixed(&mut self.rect_ctx)?;
            let ry1 = reader.decode_fixed(&mut self.rect_ctx)?;
            let rx2 = reader.decode_fixed(&mut self.rect_ctx)?;
            let ry2 = reader.decode_fixed(&mut self.rect_ctx)?;
            let rect = Rect {
                x1: bounds.x1 + rx1 as u16,
                y1: bounds.y1 + ry1 as u16,
                x2: bounds.x1 + rx2 as u16,
                y2: bounds.y1 + ry2 as u16,
            };

            if tcode == FULLY_DIFFERS_MOTION || tcode == PARTIALLY_DIFFERS_MOTION {
                let same_as_last = reader.decode_bool()?;
                let mv = if same_as_last {
                    self.last_mv
                } else {
                    let mvx = self.decode_mv_component(&mut reader)?;
                    let mvy = self.decode_mv_component(&mut reader)?;
                    (mvx, mvy)
                };
                self.last_mv = mv;
                let width_bytes = (rect.x2 - rect.x1) as usize * 3;
                let mut row_buf = vec![0u8; width_bytes];
                for y in rect.y1..rect.y2 {
                    let dst_off = y as usize * stride + rect.x1 as usize * 3;
                    let src_y = (y as i32 + mv.1) as usize;
                    let src_x = (rect.x1 as i32 + mv.0) as usize;
                    let src_off = src_y * stride + src_x * 3;
                    // copy through a scratch row since source and
                    // destination ranges may overlap for small shifts
                    row_buf.copy_from_slice(&frame.data[src_off..src_off + width_bytes]);
                    frame.data[dst_off..dst_off + width_bytes].copy_from_slice(&row_buf);
                }
            } else {
                self.decode_block_rle(&mut reader, &mut frame, &prev, rect)?;
            }
        }

        self.prev = Some(frame.clone());
        Ok(frame.data)
    }

    fn decode_mv_component(&mut self, reader: &mut EntropyReader) -> CodecResult<i32> {
        let lo = reader.decode_byte(&mut self.mv_lo_ctx)?;
        let hi = reader.decode_byte(&mut self.mv_hi_ctx)?;
        let biased = (lo as u16) | ((hi as u16) << 8);
        Ok(biased as i32 - 32768)
    }

    fn decode_block_rle(
        &mut self,
        reader: &mut EntropyReader,
        frame: &mut FrameBuffer,
        prev: &FrameBuffer,
        rect: Rect,
    ) -> CodecResult<()> {
        let mut last_ptype = 0u8;
        let mut x = rect.x1;
        let mut y = rect.y1;
        while y < rect.y2 {
            let id = reader.decode_fixed(&mut self.predictor_ctx[last_ptype as usize])? as u8;
            let n = reader.decode_fixed(&mut self.run_ctx[id as usize])?;
            last_ptype = id;
            for _ in 0..n {
                if y >= rect.y2 {
                    break;
                }
                let nb = Neighbourhood {
                    left: (x > rect.x1).then(|| frame.pixel(x as usize - 1, y as usize)),
                    above: (y > rect.y1).then(|| frame.pixel(x as usize, y as usize - 1)),
                    above_right: (y > rect.y1 && x + 1 < rect.x2)
                        .then(|| frame.pixel(x as usize + 1, y as usize - 1)),
                    co_located: Some(prev.pixel(x as usize, y as usize)),
                };
                let pixel = if id == predictor::LITERAL {
                    reader.decode_rgb(&mut self.color)?
                } else {
                    predictor::predict(id, &nb).ok_or(CodecError::Invariant {
                        component: "pixel::predictor",
                        detail: "P-frame predictor referenced a pixel outside its block".into(),
                    })?
                };
                frame.set_pixel(x as usize, y as usize, pixel);
                x += 1;
                if x >= rect.x2 {
                    x = rect.x1;
                    y += 1;
                }
            }
        }
        Ok(())
    }
}
