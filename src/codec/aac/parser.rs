use super::types::{
    AACConfig, ADTSHeader, AdtsFrame, ProfileType, AAC_SAMPLES_PER_FRAME, ADTS_HEADER_LENGTH,
    ADTS_HEADER_LENGTH_WITH_CRC,
};
use crate::utils::BitReader;
use crate::{DemuxError, Result};

/// `0xFFF` sync word with the layer bits zero.
pub fn is_adts_header(data: &[u8], offset: usize) -> bool {
    offset + 1 < data.len() && data[offset] == 0xFF && (data[offset + 1] & 0xF6) == 0xF0
}

/// Finds the first ADTS sync pattern at or after `from`.
pub fn find_adts_header(data: &[u8], from: usize) -> Option<usize> {
    (from..data.len().saturating_sub(1)).find(|&offset| is_adts_header(data, offset))
}

/// Header and payload lengths of the frame at `offset`. `None` when the header is
/// unreadable or announces no payload. The frame may extend past `data`.
pub fn parse_frame_header(data: &[u8], offset: usize) -> Option<AdtsFrame> {
    if !is_adts_header(data, offset) || offset + 5 >= data.len() {
        return None;
    }

    let header_length = if data[offset + 1] & 0x01 != 0 {
        ADTS_HEADER_LENGTH
    } else {
        ADTS_HEADER_LENGTH_WITH_CRC
    };
    let full_length = (((data[offset + 3] & 0x03) as usize) << 11)
        | ((data[offset + 4] as usize) << 3)
        | ((data[offset + 5] & 0xE0) as usize >> 5);

    if full_length <= header_length {
        return None;
    }

    Some(AdtsFrame {
        header_length,
        frame_length: full_length - header_length,
    })
}

/// Like [`parse_frame_header`], but only for frames fully contained in `data`.
pub fn parse_frame(data: &[u8], offset: usize) -> Option<AdtsFrame> {
    parse_frame_header(data, offset).filter(|frame| offset + frame.total_length() <= data.len())
}

pub fn parse_adts_header(data: &[u8]) -> Result<ADTSHeader> {
    if data.len() < ADTS_HEADER_LENGTH {
        return Err(DemuxError::Parser("ADTS header too short".into()));
    }

    let mut reader = BitReader::new(data);

    let sync_word = reader.read_bits(12)?;
    if sync_word != 0xFFF {
        return Err(DemuxError::Parser("Invalid ADTS sync word".into()));
    }

    Ok(ADTSHeader {
        sync_word,
        id: reader.read_bits(1)? as u8,
        layer: reader.read_bits(2)? as u8,
        protection_absent: reader.read_bool()?,
        profile: ProfileType::from(reader.read_bits(2)? as u8),
        sample_rate_index: reader.read_bits(4)? as u8,
        private_bit: reader.read_bool()?,
        channel_configuration: reader.read_bits(3)? as u8,
        original_copy: reader.read_bool()?,
        home: reader.read_bool()?,
        copyright_id_bit: reader.read_bool()?,
        copyright_id_start: reader.read_bool()?,
        frame_length: reader.read_bits(13)? as u16,
        buffer_fullness: reader.read_bits(11)? as u16,
        number_of_raw_blocks: reader.read_bits(2)? as u8,
    })
}

/// Derives the track configuration from the ADTS header at `offset`.
pub fn audio_config(data: &[u8], offset: usize) -> Result<AACConfig> {
    let header = parse_adts_header(data.get(offset..).unwrap_or_default())?;
    let sample_rate = header.sample_rate().ok_or_else(|| {
        DemuxError::Codec(format!(
            "invalid ADTS sampling index: {}",
            header.sample_rate_index
        ))
    })?;

    let object_type = header.profile.object_type();
    let index = header.sample_rate_index;
    let channels = header.channel_configuration;
    let audio_specific_config = [
        (object_type << 3) | ((index & 0x0E) >> 1),
        ((index & 0x01) << 7) | (channels << 3),
    ];

    log::debug!(
        "manifest codec: mp4a.40.{}, ADTS sampling rate: {} Hz, channel config: {}",
        object_type,
        sample_rate,
        channels
    );

    Ok(AACConfig {
        profile: header.profile,
        sample_rate_index: index,
        sample_rate,
        channel_configuration: channels,
        audio_specific_config,
        codec: format!("mp4a.40.{}", object_type),
    })
}

/// Duration of one AAC frame in 90 kHz ticks.
pub fn frame_duration(sample_rate: u32) -> f64 {
    AAC_SAMPLES_PER_FRAME as f64 * 90_000.0 / sample_rate as f64
}
