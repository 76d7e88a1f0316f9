use super::track::{AudioSample, AudioTrack};
use crate::codec::aac;
use crate::codec::mpeg_audio;
use crate::error::{DemuxError, Result};
use bytes::{Bytes, BytesMut};

/// Splits an AAC PES into ADTS frames.
///
/// Bytes of a frame cut by the end of the PES are kept on the track and prepended
/// to the next one; the first frame completed that way is stamped one frame after
/// the previous frame when the PES timestamp disagrees by more than one tick.
pub(crate) fn parse_aac_pes(
    track: &mut AudioTrack,
    payload: &Bytes,
    pts: i64,
    duration: f64,
) -> Result<()> {
    let overflow = track.overflow.take();
    let had_overflow = overflow.is_some();
    let data = match overflow {
        Some(overflow) => {
            let mut merged = BytesMut::with_capacity(overflow.len() + payload.len());
            merged.extend_from_slice(&overflow);
            merged.extend_from_slice(payload);
            merged.freeze()
        }
        None => payload.clone(),
    };
    let len = data.len();

    let start = aac::find_adts_header(&data, 0).ok_or(DemuxError::NoAdtsHeader)?;
    if start > 0 {
        log::warn!("AAC PES did not start with ADTS header, offset: {}", start);
    }

    if track.config.is_none() {
        match aac::audio_config(&data, start) {
            Ok(config) => {
                track.sample_rate = config.sample_rate;
                track.channel_count = config.channel_configuration;
                track.codec = Some(config.codec.clone());
                track.config = Some(config);
                track.duration = duration;
            }
            Err(e) => {
                log::error!("invalid ADTS header: {}", e);
                return Ok(());
            }
        }
    }

    let frame_duration = aac::frame_duration(track.sample_rate);
    let mut pts = pts as f64;
    if let (true, Some(last_pts)) = (had_overflow, track.last_pts) {
        let expected = last_pts + frame_duration;
        if (expected - pts).abs() > 1.0 {
            log::debug!(
                "AAC: align PTS for overlapping frames by {}",
                (expected - pts).round()
            );
            pts = expected;
        }
    }

    let mut offset = start;
    let mut frame_index = 0u32;
    let mut last_stamp = None;
    while offset < len {
        if !aac::is_adts_header(&data, offset) {
            offset += 1;
            continue;
        }
        if offset + 5 >= len {
            break;
        }
        let Some(frame) = aac::parse_frame_header(&data, offset) else {
            // corrupt frame length
            offset += 1;
            continue;
        };
        if offset + frame.total_length() > len {
            break;
        }

        let stamp = pts + frame_index as f64 * frame_duration;
        let ts = stamp.round() as i64;
        track.samples.push(AudioSample {
            unit: data.slice(offset + frame.header_length..offset + frame.total_length()),
            pts: ts,
            dts: ts,
        });
        last_stamp = Some(stamp);
        offset += frame.total_length();
        frame_index += 1;
    }

    track.overflow = (offset < len).then(|| data.slice(offset..));
    if last_stamp.is_some() {
        track.last_pts = last_stamp;
    }
    Ok(())
}

/// Splits an MPEG-1/2 audio PES into frames, header included.
pub(crate) fn parse_mpeg_pes(track: &mut AudioTrack, data: &Bytes, pts: i64) {
    let len = data.len();
    let mut offset = 0;
    let mut frame_index = 0u32;

    while offset < len {
        if !mpeg_audio::is_header(data, offset) {
            offset += 1;
            continue;
        }
        let Some(header) = mpeg_audio::parse_frame(data, offset) else {
            break;
        };

        let frame_duration =
            header.samples_per_frame as f64 * 90_000.0 / header.sample_rate as f64;
        let stamp = (pts as f64 + frame_index as f64 * frame_duration).round() as i64;

        track.config = None;
        track.channel_count = header.channel_count;
        track.sample_rate = header.sample_rate;
        track.codec = Some(mpeg_audio::MPEG_AUDIO_CODEC.to_string());
        track.samples.push(AudioSample {
            unit: data.slice(offset..offset + header.frame_length),
            pts: stamp,
            dts: stamp,
        });

        offset += header.frame_length;
        frame_index += 1;
    }
}
