use bytes::Bytes;

/// One NAL unit cut out of an Annex-B byte stream, header byte included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NALUnit {
    pub nal_type: u8,
    pub data: Bytes,
    /// Start-code detector state when the unit was cut at the end of a chunk
    /// (0 for units closed by a following start code). A non-zero value means
    /// the trailing zero bytes may belong to a start code finished in the next chunk.
    pub state: i8,
}

impl NALUnit {
    pub fn new(nal_type: u8, data: Bytes, state: i8) -> Self {
        Self {
            nal_type,
            data,
            state,
        }
    }

    pub fn unit_type(&self) -> NALUnitType {
        NALUnitType::from(self.nal_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    /// Coded slice of a non-IDR picture
    Ndr,
    Idr,
    Sei,
    Sps,
    Pps,
    AccessUnitDelimiter,
    FillerData,
    Unknown(u8),
}

impl From<u8> for NALUnitType {
    fn from(value: u8) -> Self {
        match value & 0x1F {
            1 => NALUnitType::Ndr,
            5 => NALUnitType::Idr,
            6 => NALUnitType::Sei,
            7 => NALUnitType::Sps,
            8 => NALUnitType::Pps,
            9 => NALUnitType::AccessUnitDelimiter,
            12 => NALUnitType::FillerData,
            other => NALUnitType::Unknown(other),
        }
    }
}

impl NALUnitType {
    pub fn name(&self) -> &'static str {
        match self {
            NALUnitType::Ndr => "NDR",
            NALUnitType::Idr => "IDR",
            NALUnitType::Sei => "SEI",
            NALUnitType::Sps => "SPS",
            NALUnitType::Pps => "PPS",
            NALUnitType::AccessUnitDelimiter => "AUD",
            NALUnitType::FillerData => "FILLER",
            NALUnitType::Unknown(_) => "unknown",
        }
    }
}

/// Fields decoded from a sequence parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SPSInfo {
    pub profile_idc: u8,
    pub profile_compat: u8,
    pub level_idc: u8,
    pub width: u32,
    pub height: u32,
    /// Sample aspect ratio as (horizontal, vertical).
    pub pixel_ratio: (u32, u32),
}

/// An access unit: the NAL units of one picture plus its timing.
#[derive(Debug, Clone, PartialEq)]
pub struct AvcSample {
    pub key: bool,
    /// Set once a VCL NAL unit (slice) joined the sample.
    pub frame: bool,
    pub pts: i64,
    pub dts: i64,
    pub units: Vec<NALUnit>,
    /// Position in the track's sample list, assigned when pushed.
    pub id: usize,
    /// NAL type names collected while trace logging is enabled.
    pub debug: String,
}

impl AvcSample {
    pub fn new(key: bool, pts: i64, dts: i64, debug: impl Into<String>) -> Self {
        Self {
            key,
            frame: false,
            pts,
            dts,
            units: Vec::new(),
            id: 0,
            debug: debug.into(),
        }
    }
}
