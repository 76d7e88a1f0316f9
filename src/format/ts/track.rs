use super::pes::PesBuffer;
use crate::codec::aac::AACConfig;
use crate::codec::h264::AvcSample;
use bytes::Bytes;
use std::mem;

pub const VIDEO_TRACK_ID: u32 = 1;
pub const AUDIO_TRACK_ID: u32 = 2;
pub const ID3_TRACK_ID: u32 = 3;
pub const TEXT_TRACK_ID: u32 = 4;

/// Time scale of every timestamp in the input.
pub const INPUT_TIME_SCALE: u32 = 90_000;

/// Sample type tag of CEA-608 caption data.
pub const CEA608_SAMPLE_TYPE: u8 = 3;

#[derive(Debug, Clone)]
pub struct VideoTrack {
    pub id: u32,
    pub pid: Option<u16>,
    pub input_time_scale: u32,
    pub samples: Vec<AvcSample>,
    /// Samples dropped while waiting for a keyframe
    pub dropped: usize,
    pub codec: Option<String>,
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: (u32, u32),
    pub sps: Option<Bytes>,
    pub pps: Option<Bytes>,
    pub duration: f64,
    pub(crate) nalu_state: i8,
    pub(crate) aud_found: bool,
    pub(crate) pes_data: Option<PesBuffer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    pub unit: Bytes,
    pub pts: i64,
    pub dts: i64,
}

impl AudioSample {
    pub fn byte_length(&self) -> usize {
        self.unit.len()
    }
}

#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub id: u32,
    pub pid: Option<u16>,
    pub input_time_scale: u32,
    pub samples: Vec<AudioSample>,
    pub is_aac: bool,
    pub codec: Option<String>,
    pub sample_rate: u32,
    pub channel_count: u8,
    /// AudioSpecificConfig, AAC only
    pub config: Option<AACConfig>,
    pub duration: f64,
    pub(crate) pes_data: Option<PesBuffer>,
    /// Bytes of an ADTS frame cut by the end of the previous PES.
    pub(crate) overflow: Option<Bytes>,
    pub(crate) last_pts: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Id3Sample {
    pub data: Bytes,
    pub pts: i64,
    pub dts: i64,
}

#[derive(Debug, Clone)]
pub struct Id3Track {
    pub id: u32,
    pub pid: Option<u16>,
    pub input_time_scale: u32,
    pub samples: Vec<Id3Sample>,
    pub(crate) pes_data: Option<PesBuffer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionSample {
    pub sample_type: u8,
    pub pts: i64,
    /// cc_count byte, em_data byte, then three bytes per caption pair
    pub bytes: Vec<u8>,
}

impl CaptionSample {
    pub fn cea608(pts: i64, bytes: Vec<u8>) -> Self {
        Self {
            sample_type: CEA608_SAMPLE_TYPE,
            pts,
            bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextTrack {
    pub id: u32,
    pub input_time_scale: u32,
    pub samples: Vec<CaptionSample>,
}

impl VideoTrack {
    pub fn new(duration: f64) -> Self {
        Self {
            id: VIDEO_TRACK_ID,
            pid: None,
            input_time_scale: INPUT_TIME_SCALE,
            samples: Vec::new(),
            dropped: 0,
            codec: None,
            width: 0,
            height: 0,
            pixel_ratio: (1, 1),
            sps: None,
            pps: None,
            duration,
            nalu_state: 0,
            aud_found: false,
            pes_data: None,
        }
    }

    /// Moves the samples out, leaving parser state behind.
    pub(crate) fn snapshot(&mut self) -> Self {
        let samples = mem::take(&mut self.samples);
        let dropped = mem::take(&mut self.dropped);
        Self {
            samples,
            dropped,
            pes_data: None,
            ..self.clone()
        }
    }
}

impl AudioTrack {
    pub fn new(duration: f64) -> Self {
        Self {
            id: AUDIO_TRACK_ID,
            pid: None,
            input_time_scale: INPUT_TIME_SCALE,
            samples: Vec::new(),
            is_aac: true,
            codec: None,
            sample_rate: 0,
            channel_count: 0,
            config: None,
            duration,
            pes_data: None,
            overflow: None,
            last_pts: None,
        }
    }

    pub(crate) fn snapshot(&mut self) -> Self {
        Self {
            samples: mem::take(&mut self.samples),
            pes_data: None,
            overflow: None,
            ..self.clone()
        }
    }
}

impl Id3Track {
    pub fn new() -> Self {
        Self {
            id: ID3_TRACK_ID,
            pid: None,
            input_time_scale: INPUT_TIME_SCALE,
            samples: Vec::new(),
            pes_data: None,
        }
    }

    pub(crate) fn snapshot(&mut self) -> Self {
        Self {
            samples: mem::take(&mut self.samples),
            pes_data: None,
            ..self.clone()
        }
    }
}

impl Default for Id3Track {
    fn default() -> Self {
        Self::new()
    }
}

impl TextTrack {
    pub fn new() -> Self {
        Self {
            id: TEXT_TRACK_ID,
            input_time_scale: INPUT_TIME_SCALE,
            samples: Vec::new(),
        }
    }

    /// Inserts after the last sample whose pts is not greater, so samples stay
    /// sorted and equal timestamps keep arrival order.
    pub fn insert_in_order(&mut self, sample: CaptionSample) {
        let index = self
            .samples
            .iter()
            .rposition(|existing| existing.pts <= sample.pts)
            .map_or(0, |i| i + 1);
        self.samples.insert(index, sample);
    }

    pub(crate) fn snapshot(&mut self) -> Self {
        Self {
            samples: mem::take(&mut self.samples),
            ..self.clone()
        }
    }
}

impl Default for TextTrack {
    fn default() -> Self {
        Self::new()
    }
}
