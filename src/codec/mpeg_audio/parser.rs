/// Bitrates in kbps, five columns of 14 entries (MPEG-1 layers I/II/III, then
/// MPEG-2/2.5 layer I, then MPEG-2/2.5 layers II/III).
const BITRATES: [u32; 70] = [
    32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, //
    32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, //
    32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, //
    32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, //
    8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160,
];

const SAMPLE_RATES: [u32; 9] = [
    44100, 48000, 32000, // MPEG-1
    22050, 24000, 16000, // MPEG-2
    11025, 12000, 8000, // MPEG-2.5
];

// [version][layer]
const SAMPLES_COEFFICIENTS: [[u32; 4]; 4] = [
    [0, 72, 144, 12],  // MPEG-2.5
    [0, 0, 0, 0],      // reserved
    [0, 72, 144, 12],  // MPEG-2
    [0, 144, 144, 12], // MPEG-1
];

// [layer]
const BYTES_IN_SLOT: [u32; 4] = [0, 1, 1, 4];

/// Minimum bytes that must be buffered after a header before a frame is parsed.
pub const MIN_FRAME_BYTES: usize = 24;

pub const MPEG_AUDIO_CODEC: &str = "mp4a.40.34";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpegAudioHeader {
    /// 0 = MPEG-2.5, 2 = MPEG-2, 3 = MPEG-1
    pub version: u8,
    /// 1 = layer III, 2 = layer II, 3 = layer I
    pub layer: u8,
    pub bit_rate: u32,
    pub sample_rate: u32,
    pub channel_count: u8,
    pub samples_per_frame: u32,
    pub frame_length: usize,
}

/// Frame sync with a non-reserved layer.
pub fn is_header(data: &[u8], offset: usize) -> bool {
    offset + 1 < data.len()
        && data[offset] == 0xFF
        && (data[offset + 1] & 0xE0) == 0xE0
        && (data[offset + 1] & 0x06) != 0x00
}

/// Decodes the header at `offset`. `None` for reserved or free-format values.
pub fn parse_header(data: &[u8], offset: usize) -> Option<MpegAudioHeader> {
    if offset + 3 >= data.len() {
        return None;
    }

    let version = (data[offset + 1] >> 3) & 3;
    let layer = (data[offset + 1] >> 1) & 3;
    let bit_rate_index = (data[offset + 2] >> 4) & 15;
    let sample_rate_index = (data[offset + 2] >> 2) & 3;
    if version == 1 || bit_rate_index == 0 || bit_rate_index == 15 || sample_rate_index == 3 {
        return None;
    }

    let padding = ((data[offset + 2] >> 1) & 1) as u32;
    let channel_mode = data[offset + 3] >> 6;

    let column = if version == 3 {
        3 - layer as usize
    } else if layer == 3 {
        3
    } else {
        4
    };
    let bit_rate = BITRATES[column * 14 + bit_rate_index as usize - 1] * 1000;

    let row = match version {
        3 => 0,
        2 => 1,
        _ => 2,
    };
    let sample_rate = SAMPLE_RATES[row * 3 + sample_rate_index as usize];

    let coefficient = SAMPLES_COEFFICIENTS[version as usize][layer as usize];
    let slot = BYTES_IN_SLOT[layer as usize];
    let frame_length = ((coefficient * bit_rate / sample_rate + padding) * slot) as usize;

    Some(MpegAudioHeader {
        version,
        layer,
        bit_rate,
        sample_rate,
        channel_count: if channel_mode == 3 { 1 } else { 2 },
        samples_per_frame: coefficient * 8 * slot,
        frame_length,
    })
}

/// Header of a frame that is fully contained in `data` starting at `offset`.
pub fn parse_frame(data: &[u8], offset: usize) -> Option<MpegAudioHeader> {
    if offset + MIN_FRAME_BYTES > data.len() {
        return None;
    }
    let header = parse_header(data, offset)?;
    if header.frame_length == 0 || offset + header.frame_length > data.len() {
        return None;
    }
    Some(header)
}
