//! End-to-end frame-pipeline scenarios: flat fast path, full I-frames,
//! P-frame block decisions (change-only, motion-matched), and loss masking.

use screenpress_ans::config::CodecConfig;
use screenpress_ans::frame::FrameTypeRequest;
use screenpress_ans::Codec;

fn solid_frame(config: &CodecConfig, color: [u8; 3]) -> Vec<u8> {
    let stride = config.stride();
    let mut buf = vec![0u8; stride * config.height as usize];
    for y in 0..config.height as usize {
        for x in 0..config.width as usize {
            let off = y * stride + x * 3;
            buf[off..off + 3].copy_from_slice(&color);
        }
    }
    buf
}

fn half_black_half_white(config: &CodecConfig) -> Vec<u8> {
    let stride = config.stride();
    let w = config.width as usize;
    let h = config.height as usize;
    let mut buf = vec![0u8; stride * h];
    for y in 0..h {
        for x in 0..w {
            let color = if x < w / 2 { [0, 0, 0] } else { [255, 255, 255] };
            let off = y * stride + x * 3;
            buf[off..off + 3].copy_from_slice(&color);
        }
    }
    buf
}

/// A per-column gradient, distinct enough at every column that a block
/// content match only ever occurs at the horizontal shift it was built for.
fn gradient_frame(config: &CodecConfig) -> Vec<u8> {
    let stride = config.stride();
    let w = config.width as usize;
    let h = config.height as usize;
    let mut buf = vec![0u8; stride * h];
    for y in 0..h {
        for x in 0..w {
            let off = y * stride + x * 3;
            let v = x as u8;
            buf[off..off + 3].copy_from_slice(&[v, v, v]);
        }
    }
    buf
}

#[test]
fn one_by_one_flat_frame_encodes_to_four_bytes() {
    let config = CodecConfig::new(1, 1);
    let mut encoder = Codec::new(config.clone()).unwrap();
    let mut decoder = Codec::new(config.clone()).unwrap();
    let frame = solid_frame(&config, [10, 20, 30]);

    let encoded = encoder.compress(&frame, FrameTypeRequest::Auto).unwrap();
    assert_eq!(encoded.len(), 4);
    assert_eq!(&encoded[1..], &[10, 20, 30]);

    let decoded = decoder.decompress(&encoded).unwrap();
    assert_eq!(decoded, frame);
}

#[test]
fn second_identical_flat_frame_collapses_to_one_byte() {
    let config = CodecConfig::new(16, 16);
    let mut encoder = Codec::new(config.clone()).unwrap();
    let frame = solid_frame(&config, [200, 0, 5]);

    let first = encoder.compress(&frame, FrameTypeRequest::Auto).unwrap();
    assert_eq!(first.len(), 4);

    let second = encoder.compress(&frame, FrameTypeRequest::Auto).unwrap();
    assert_eq!(second, vec![0x00]);
}

#[test]
fn flat_fast_path_round_trips_through_colour_changes() {
    let config = CodecConfig::new(8, 8);
    let mut encoder = Codec::new(config.clone()).unwrap();
    let mut decoder = Codec::new(config.clone()).unwrap();

    for color in [[1, 2, 3], [1, 2, 3], [9, 9, 9], [9, 9, 9], [1, 2, 3]] {
        let frame = solid_frame(&config, color);
        let encoded = encoder.compress(&frame, FrameTypeRequest::Auto).unwrap();
        let decoded = decoder.decompress(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }
}

#[test]
fn half_black_half_white_i_frame_round_trips() {
    let config = CodecConfig::new(16, 16);
    let mut encoder = Codec::new(config.clone()).unwrap();
    let mut decoder = Codec::new(config.clone()).unwrap();
    let frame = half_black_half_white(&config);

    let encoded = encoder.compress(&frame, FrameTypeRequest::Auto).unwrap();
    assert_eq!(encoded[0] & 0x0f, 0x02);
    let decoded = decoder.decompress(&encoded).unwrap();
    assert_eq!(decoded, frame);
}

#[test]
fn single_changed_block_without_motion_match_round_trips() {
    let config = CodecConfig::new(32, 16);
    let mut encoder = Codec::new(config.clone()).unwrap();
    let mut decoder = Codec::new(config.clone()).unwrap();

    let base = gradient_frame(&config);
    let encoded0 = encoder.compress(&base, FrameTypeRequest::Auto).unwrap();
    let decoded0 = decoder.decompress(&encoded0).unwrap();
    assert_eq!(decoded0, base);

    // overwrite the second 16x16 block with a flat colour that appears
    // nowhere else in the gradient, so no shift of it can match prev.
    let stride = config.stride();
    let mut changed = base.clone();
    for y in 0..16 {
        for x in 16..32 {
            let off = y * stride + x * 3;
            changed[off..off + 3].copy_from_slice(&[200, 201, 202]);
        }
    }

    let encoded1 = encoder.compress(&changed, FrameTypeRequest::Auto).unwrap();
    assert_eq!(encoded1[0], 0x01);
    let decoded1 = decoder.decompress(&encoded1).unwrap();
    assert_eq!(decoded1, changed);
}

#[test]
fn shifted_block_is_recovered_through_a_motion_vector() {
    let config = CodecConfig::new(32, 16);
    let mut encoder = Codec::new(config.clone()).unwrap();
    let mut decoder = Codec::new(config.clone()).unwrap();

    let base = gradient_frame(&config);
    let encoded0 = encoder.compress(&base, FrameTypeRequest::Auto).unwrap();
    let decoded0 = decoder.decompress(&encoded0).unwrap();
    assert_eq!(decoded0, base);

    // the first 16x16 block becomes what used to be three columns to its
    // right; the second block is left untouched.
    let stride = config.stride();
    let mut shifted = base.clone();
    for y in 0..16 {
        for x in 0..16 {
            let src_off = y * stride + (x + 3) * 3;
            let dst_off = y * stride + x * 3;
            let px = [base[src_off], base[src_off + 1], base[src_off + 2]];
            shifted[dst_off..dst_off + 3].copy_from_slice(&px);
        }
    }

    let encoded1 = encoder.compress(&shifted, FrameTypeRequest::Auto).unwrap();
    assert_eq!(encoded1[0], 0x01);
    let decoded1 = decoder.decompress(&encoded1).unwrap();
    assert_eq!(decoded1, shifted);
}

#[test]
fn repeating_the_same_motion_vector_shrinks_the_encoding() {
    // Two consecutive P-frames that both shift the same block by the same
    // vector: the second should encode smaller than the first, since it
    // only needs the one-bit "same motion vector as last time" flag.
    let config = CodecConfig::new(32, 16);
    let mut encoder = Codec::new(config.clone()).unwrap();

    let base = gradient_frame(&config);
    encoder.compress(&base, FrameTypeRequest::Auto).unwrap();

    let shift_by_three = |src: &[u8]| -> Vec<u8> {
        let stride = config.stride();
        let mut out = src.to_vec();
        for y in 0..16 {
            for x in 0..16 {
                let src_off = y * stride + (x + 3) * 3;
                let dst_off = y * stride + x * 3;
                out[dst_off..dst_off + 3].copy_from_slice(&src[src_off..src_off + 3]);
            }
        }
        out
    };

    let first_shift = shift_by_three(&base);
    let encoded_first = encoder.compress(&first_shift, FrameTypeRequest::Auto).unwrap();

    let second_shift = shift_by_three(&first_shift);
    let encoded_second = encoder.compress(&second_shift, FrameTypeRequest::Auto).unwrap();

    assert!(encoded_second.len() < encoded_first.len());
}

#[test]
fn round_trip_identity_holds_for_a_short_sequence_with_loss() {
    for loss in [0u8, 2] {
        let config = CodecConfig::new(16, 16).with_loss(loss);
        let mut encoder = Codec::new(config.clone()).unwrap();
        let mut decoder = Codec::new(config.clone()).unwrap();

        let first = half_black_half_white(&config);
        let encoded0 = encoder.compress(&first, FrameTypeRequest::Auto).unwrap();
        let decoded0 = decoder.decompress(&encoded0).unwrap();

        let expected0 = expected_after_loss(&first, loss);
        assert_eq!(decoded0, expected0);

        let mut second = first.clone();
        second[0] = second[0].wrapping_add(17);
        second[1] = second[1].wrapping_add(3);
        let encoded1 = encoder.compress(&second, FrameTypeRequest::Auto).unwrap();
        let decoded1 = decoder.decompress(&encoded1).unwrap();
        let expected1 = expected_after_loss(&second, loss);
        assert_eq!(decoded1, expected1);
    }
}

fn expected_after_loss(raw: &[u8], loss: u8) -> Vec<u8> {
    if loss == 0 {
        return raw.to_vec();
    }
    let mask = !((1u32 << loss) - 1) as u8;
    let corr = 1u8 << (loss - 1);
    raw.iter().map(|&b| (b & mask) | corr).collect()
}

#[test]
fn loss_two_masks_every_byte_to_the_correction_bit() {
    let config = CodecConfig::new(4, 4).with_loss(2);
    let mut encoder = Codec::new(config.clone()).unwrap();
    let mut decoder = Codec::new(config.clone()).unwrap();
    let frame: Vec<u8> = (0..config.stride() * 4).map(|i| (i * 37) as u8).collect();

    let encoded = encoder.compress(&frame, FrameTypeRequest::Auto).unwrap();
    let decoded = decoder.decompress(&encoded).unwrap();
    for &b in &decoded {
        assert_eq!(b & 0b11, 0b10);
    }
}
