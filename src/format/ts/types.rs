use crate::error::{DemuxError, Result};
use bytes::{BufMut, BytesMut};

// Packet layout
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;
pub const SYNC_BYTE: u8 = 0x47;
/// Bytes searched for the first packet boundary.
pub const SYNC_SCAN_LIMIT: usize = 4096;

// PIDs
pub const PID_PAT: u16 = 0x0000;
pub const PID_SDT: u16 = 0x0011;
pub const PID_NULL: u16 = 0x1FFF;

// Table IDs
pub const TABLE_ID_PAT: u8 = 0x00;
pub const TABLE_ID_PMT: u8 = 0x02;

// Elementary Stream Types
pub const STREAM_TYPE_MPEG1_AUDIO: u8 = 0x03;
pub const STREAM_TYPE_MPEG2_AUDIO: u8 = 0x04;
pub const STREAM_TYPE_AAC: u8 = 0x0f;
pub const STREAM_TYPE_METADATA: u8 = 0x15;
pub const STREAM_TYPE_H264: u8 = 0x1b;
pub const STREAM_TYPE_H265: u8 = 0x24;
pub const STREAM_TYPE_SAMPLE_AES_AAC: u8 = 0xcf;
pub const STREAM_TYPE_SAMPLE_AES_H264: u8 = 0xdb;

// PES
pub const PES_START_CODE_PREFIX: u32 = 0x000001;
/// Contiguous bytes needed to read a PES header carrying both PTS and DTS.
pub const MAX_PES_HEADER_SIZE: usize = 19;
pub const PTS_HZ: i64 = 90_000;
/// PTS/DTS distance beyond which DTS is considered corrupt.
pub const MAX_PTS_DTS_DIVERGENCE: i64 = 60 * PTS_HZ;

/// Fixed 4-byte transport packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TSHeader {
    pub sync_byte: u8, // Always 0x47
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    pub pid: u16,
    pub scrambling_control: u8,
    /// 1 = payload only, 2 = adaptation field only, 3 = both
    pub adaptation_field_control: u8,
    pub continuity_counter: u8,
}

impl Default for TSHeader {
    fn default() -> Self {
        Self {
            sync_byte: SYNC_BYTE,
            transport_error: false,
            payload_unit_start: false,
            transport_priority: false,
            pid: 0,
            scrambling_control: 0,
            adaptation_field_control: 1,
            continuity_counter: 0,
        }
    }
}

impl TSHeader {
    pub fn parse(data: &[u8]) -> Result<TSHeader> {
        if data.len() < TS_HEADER_SIZE {
            return Err(DemuxError::InvalidData("TS packet too short".into()));
        }

        if data[0] != SYNC_BYTE {
            return Err(DemuxError::InvalidData("Invalid sync byte".into()));
        }

        Ok(TSHeader {
            sync_byte: data[0],
            transport_error: (data[1] & 0x80) != 0,
            payload_unit_start: (data[1] & 0x40) != 0,
            transport_priority: (data[1] & 0x20) != 0,
            pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_control: (data[3] & 0x30) >> 4,
            continuity_counter: data[3] & 0x0F,
        })
    }

    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control > 1
    }

    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & 0x01 != 0
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.sync_byte);

        let mut b1 = 0u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }
        b1 |= ((self.pid >> 8) & 0x1f) as u8;
        buf.put_u8(b1);

        buf.put_u8((self.pid & 0xff) as u8);

        buf.put_u8(
            (self.scrambling_control << 6)
                | ((self.adaptation_field_control & 0x03) << 4)
                | (self.continuity_counter & 0x0f),
        );
    }
}

/// Where the payload of a packet with a given PID goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PidRoute {
    Pat,
    Pmt,
    Video,
    Audio,
    Id3,
    /// SDT and null packets
    Ignored,
    /// Not (yet) announced by the PMT
    Unknown,
}

/// Elementary PIDs announced by one PMT section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtPids {
    pub avc: Option<u16>,
    pub audio: Option<u16>,
    pub id3: Option<u16>,
    /// False when the audio PID carries MPEG-1/2 audio.
    pub is_aac: bool,
}

impl Default for PmtPids {
    fn default() -> Self {
        Self {
            avc: None,
            audio: None,
            id3: None,
            is_aac: true,
        }
    }
}
