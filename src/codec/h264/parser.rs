use bytes::{BufMut, Bytes, BytesMut};

use super::types::SPSInfo;
use crate::utils::BitReader;
use crate::Result;

/// Strips emulation prevention bytes: the `0x03` of every `0x00 0x00 0x03`
/// triplet is dropped. Input without any such triplet is returned as is.
pub fn remove_emulation_prevention(data: &Bytes) -> Bytes {
    let mut positions = Vec::new();
    let mut i = 0;
    while i + 2 < data.len() {
        if data[i] == 0x00 && data[i + 1] == 0x00 && data[i + 2] == 0x03 {
            positions.push(i + 2);
            i += 2;
        } else {
            i += 1;
        }
    }

    if positions.is_empty() {
        return data.clone();
    }

    let mut out = BytesMut::with_capacity(data.len() - positions.len());
    let mut skip = positions.into_iter().peekable();
    for (i, &byte) in data.iter().enumerate() {
        if skip.peek() == Some(&i) {
            skip.next();
            continue;
        }
        out.put_u8(byte);
    }
    out.freeze()
}

/// Decodes width, height and sample aspect ratio from an SPS NAL unit
/// (header byte included, emulation prevention already removed).
pub fn parse_sps(data: &[u8]) -> Result<SPSInfo> {
    let mut reader = BitReader::new(data);

    reader.read_u8()?; // NAL header
    let profile_idc = reader.read_u8()?;
    let profile_compat = reader.read_bits(5)? as u8; // constraint_set0..4 flags
    reader.skip_bits(3)?; // reserved_zero_3bits
    let level_idc = reader.read_u8()?;
    reader.skip_golomb()?; // seq_parameter_set_id

    if matches!(
        profile_idc,
        100 | 110 | 122 | 244 | 44 | 83 | 86 | 118 | 128 | 138
    ) {
        let chroma_format_idc = reader.read_golomb()?;
        if chroma_format_idc == 3 {
            reader.skip_bits(1)?; // separate_colour_plane_flag
        }
        reader.skip_golomb()?; // bit_depth_luma_minus8
        reader.skip_golomb()?; // bit_depth_chroma_minus8
        reader.skip_bits(1)?; // qpprime_y_zero_transform_bypass_flag

        if reader.read_bool()? {
            // seq_scaling_matrix_present_flag
            let count = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..count {
                if reader.read_bool()? {
                    skip_scaling_list(&mut reader, if i < 6 { 16 } else { 64 })?;
                }
            }
        }
    }

    reader.skip_golomb()?; // log2_max_frame_num_minus4
    let pic_order_cnt_type = reader.read_golomb()?;
    if pic_order_cnt_type == 0 {
        reader.skip_golomb()?; // log2_max_pic_order_cnt_lsb_minus4
    } else if pic_order_cnt_type == 1 {
        reader.skip_bits(1)?; // delta_pic_order_always_zero_flag
        reader.skip_signed_golomb()?; // offset_for_non_ref_pic
        reader.skip_signed_golomb()?; // offset_for_top_to_bottom_field
        let cycle = reader.read_golomb()?;
        for _ in 0..cycle {
            reader.skip_signed_golomb()?; // offset_for_ref_frame[i]
        }
    }

    reader.skip_golomb()?; // max_num_ref_frames
    reader.skip_bits(1)?; // gaps_in_frame_num_value_allowed_flag
    let pic_width_in_mbs_minus1 = reader.read_golomb()? as u64;
    let pic_height_in_map_units_minus1 = reader.read_golomb()? as u64;
    let frame_mbs_only_flag = reader.read_bits(1)? as u64;
    if frame_mbs_only_flag == 0 {
        reader.skip_bits(1)?; // mb_adaptive_frame_field_flag
    }
    reader.skip_bits(1)?; // direct_8x8_inference_flag

    let (mut crop_left, mut crop_right, mut crop_top, mut crop_bottom) = (0u64, 0u64, 0u64, 0u64);
    if reader.read_bool()? {
        // frame_cropping_flag
        crop_left = reader.read_golomb()? as u64;
        crop_right = reader.read_golomb()? as u64;
        crop_top = reader.read_golomb()? as u64;
        crop_bottom = reader.read_golomb()? as u64;
    }

    let mut pixel_ratio = (1, 1);
    // VUI is optional and often truncated in the wild; the frame size is
    // already known, so a short read here keeps the default ratio.
    if let Ok(ratio) = read_vui_aspect_ratio(&mut reader) {
        pixel_ratio = ratio;
    }

    let width = ((pic_width_in_mbs_minus1 + 1) * 16).saturating_sub((crop_left + crop_right) * 2);
    let crop_unit_y = if frame_mbs_only_flag == 1 { 2 } else { 4 };
    let height = ((2 - frame_mbs_only_flag) * (pic_height_in_map_units_minus1 + 1) * 16)
        .saturating_sub(crop_unit_y * (crop_top + crop_bottom));

    Ok(SPSInfo {
        profile_idc,
        profile_compat,
        level_idc,
        width: width as u32,
        height: height as u32,
        pixel_ratio,
    })
}

fn read_vui_aspect_ratio(reader: &mut BitReader) -> Result<(u32, u32)> {
    if !reader.read_bool()? || !reader.read_bool()? {
        // no VUI, or no aspect_ratio_info
        return Ok((1, 1));
    }
    let ratio = match reader.read_u8()? {
        1 => (1, 1),
        2 => (12, 11),
        3 => (10, 11),
        4 => (16, 11),
        5 => (40, 33),
        6 => (24, 11),
        7 => (20, 11),
        8 => (32, 11),
        9 => (80, 33),
        10 => (18, 11),
        11 => (15, 11),
        12 => (64, 33),
        13 => (160, 99),
        14 => (4, 3),
        15 => (3, 2),
        16 => (2, 1),
        255 => {
            // Extended_SAR
            let sar_width = reader.read_u16()? as u32;
            let sar_height = reader.read_u16()? as u32;
            (sar_width, sar_height)
        }
        _ => (1, 1),
    };
    Ok(ratio)
}

fn skip_scaling_list(reader: &mut BitReader, size: usize) -> Result<()> {
    let mut last_scale = 8i32;
    let mut next_scale = 8i32;

    for _ in 0..size {
        if next_scale != 0 {
            let delta_scale = reader.read_signed_golomb()? as i64;
            next_scale = (last_scale as i64 + delta_scale + 256).rem_euclid(256) as i32;
        }
        last_scale = if next_scale == 0 { last_scale } else { next_scale };
    }

    Ok(())
}

/// Reads `slice_type` from the start of a slice NAL unit (header byte included).
pub fn read_slice_type(data: &[u8]) -> Result<u32> {
    let mut reader = BitReader::new(data);
    reader.read_u8()?; // NAL header
    reader.skip_golomb()?; // first_mb_in_slice
    reader.read_golomb()
}

/// I and SI slices, in both the plain and the "all slices of the picture" ranges.
pub fn is_intra_slice_type(slice_type: u32) -> bool {
    matches!(slice_type, 2 | 4 | 7 | 9)
}

/// `avc1.PPCCLL` from the profile, compatibility and level bytes following the NAL header.
pub fn codec_string(sps: &[u8]) -> Option<String> {
    let bytes = sps.get(1..4)?;
    Some(format!("avc1.{:02x}{:02x}{:02x}", bytes[0], bytes[1], bytes[2]))
}
