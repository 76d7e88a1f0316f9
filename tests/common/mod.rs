#![allow(dead_code)]

use bytes::{BufMut, BytesMut};
use std::collections::HashMap;
use tsdemux::format::ts::{PESHeader, TSHeader, TS_PACKET_SIZE};
use tsdemux::utils::Crc32Mpeg2;

pub const PMT_PID: u16 = 0x1000;
pub const VIDEO_PID: u16 = 0x0100;
pub const AUDIO_PID: u16 = 0x0101;
pub const ID3_PID: u16 = 0x0102;

const PAYLOAD_SIZE: usize = TS_PACKET_SIZE - 4;

pub const AUD: &[u8] = &[0x09, 0xF0];
/// Baseline 320x240 level 3.0
pub const SPS: &[u8] = &[0x67, 0x42, 0x00, 0x1E, 0xF4, 0x0A, 0x0F, 0xC8];
pub const PPS: &[u8] = &[0x68, 0xCE, 0x38, 0x80];
pub const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x00, 0x33];
pub const P_SLICE: &[u8] = &[0x41, 0x9A, 0x02, 0x03, 0x04];

/// Writes transport packets with per-PID continuity counters.
#[derive(Default)]
pub struct TsBuilder {
    buf: BytesMut,
    counters: HashMap<u16, u8>,
}

impl TsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pat(mut self, pmt_pid: u16) -> Self {
        let section = vec![
            0x00, // Table ID (PAT)
            0xB0, // Section syntax indicator + length MSB
            13,   // Section length
            0x00, 0x01, // Transport stream ID
            0xC1, // Version (0) + current/next (1)
            0x00, // Section number
            0x00, // Last section number
            0x00, 0x01, // Program number
            0xE0 | (pmt_pid >> 8) as u8,
            pmt_pid as u8,
        ];
        self.section(0x0000, section);
        self
    }

    pub fn pmt(mut self, pmt_pid: u16, streams: &[(u8, u16)]) -> Self {
        let mut section = vec![
            0x02, // Table ID (PMT)
            0xB0,
            (13 + streams.len() * 5) as u8,
            0x00, 0x01, // Program number
            0xC1,
            0x00,
            0x00,
            0xE0 | (VIDEO_PID >> 8) as u8, // PCR PID
            VIDEO_PID as u8,
            0xF0, 0x00, // Program info length
        ];
        for &(stream_type, pid) in streams {
            section.extend_from_slice(&[
                stream_type,
                0xE0 | (pid >> 8) as u8,
                pid as u8,
                0xF0, 0x00, // ES info length
            ]);
        }
        self.section(pmt_pid, section);
        self
    }

    /// Packetizes one PES, stuffing the adaptation field of the last packet.
    pub fn pes(self, pid: u16, header: PESHeader, payload: &[u8]) -> Self {
        self.pes_with_head(pid, header, payload, PAYLOAD_SIZE)
    }

    /// Like `pes`, but the first packet carries only `head` bytes of the PES.
    pub fn pes_with_head(
        mut self,
        pid: u16,
        header: PESHeader,
        payload: &[u8],
        head: usize,
    ) -> Self {
        let mut pes = BytesMut::new();
        header.write_to(&mut pes);
        pes.extend_from_slice(payload);
        let rest = pes.split_off(head.min(pes.len()));
        self.packet(pid, true, &pes);
        for chunk in rest.chunks(PAYLOAD_SIZE) {
            self.packet(pid, false, chunk);
        }
        self
    }

    pub fn null(mut self) -> Self {
        self.packet(0x1FFF, false, &[0xFF; PAYLOAD_SIZE]);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    fn section(&mut self, pid: u16, mut section: Vec<u8>) {
        let crc = Crc32Mpeg2::calculate(&section);
        section.extend_from_slice(&crc.to_be_bytes());

        let mut payload = vec![0x00]; // Pointer field
        payload.extend(section);
        payload.resize(PAYLOAD_SIZE, 0xFF);
        self.packet(pid, true, &payload);
    }

    fn packet(&mut self, pid: u16, payload_unit_start: bool, payload: &[u8]) {
        assert!(payload.len() <= PAYLOAD_SIZE);
        let stuffing = PAYLOAD_SIZE - payload.len();

        let counter = self.counters.entry(pid).or_insert(0);
        let header = TSHeader {
            payload_unit_start,
            pid,
            adaptation_field_control: if stuffing > 0 { 3 } else { 1 },
            continuity_counter: *counter,
            ..Default::default()
        };
        *counter = (*counter + 1) & 0x0F;

        header.write_to(&mut self.buf);
        if stuffing > 0 {
            self.buf.put_u8((stuffing - 1) as u8); // Adaptation field length
            if stuffing > 1 {
                self.buf.put_u8(0x00); // Flags
                self.buf.put_bytes(0xFF, stuffing - 2);
            }
        }
        self.buf.extend_from_slice(payload);
    }
}

pub fn video_pes(pts: u64) -> PESHeader {
    PESHeader::new(0xE0).with_pts(pts).with_dts(pts)
}

pub fn audio_pes(pts: u64, payload_len: usize) -> PESHeader {
    PESHeader::new(0xC0).with_pts(pts).bounded(payload_len)
}

pub fn id3_pes(pts: u64, payload_len: usize) -> PESHeader {
    PESHeader::new(0xBD).with_pts(pts).bounded(payload_len)
}

/// Audio or ID3 PES header with a zero packet length.
pub fn unbounded_pes(stream_id: u8, pts: u64) -> PESHeader {
    PESHeader::new(stream_id).with_pts(pts)
}

pub fn annexb(units: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for unit in units {
        out.extend_from_slice(&[0, 0, 0, 1]);
        out.extend_from_slice(unit);
    }
    out
}

/// AAC-LC 48 kHz stereo frame with `payload` raw bytes.
pub fn adts_frame(payload: usize) -> Vec<u8> {
    let total = 7 + payload;
    let mut frame = vec![
        0xFF,
        0xF1,
        0x4C,
        0x80 | ((total >> 11) & 0x03) as u8,
        ((total >> 3) & 0xFF) as u8,
        (((total & 0x07) << 5) as u8) | 0x1F,
        0xFC,
    ];
    frame.extend(std::iter::repeat(0xAB).take(payload));
    frame
}

pub fn adts_frames(count: usize, payload: usize) -> Vec<u8> {
    (0..count).flat_map(|_| adts_frame(payload)).collect()
}

/// MPEG-1 layer III, 128 kbit/s, 44.1 kHz.
pub fn mp3_frame() -> Vec<u8> {
    let mut frame = vec![0xFF, 0xFB, 0x90, 0x00];
    frame.resize(417, 0);
    frame
}

/// SEI NAL unit with one ATSC A/53 caption payload.
pub fn caption_sei(pairs: &[[u8; 3]]) -> Vec<u8> {
    let mut payload = vec![181, 0x00, 0x31, b'G', b'A', b'9', b'4', 0x03];
    payload.push(0xC0 | pairs.len() as u8);
    payload.push(0xFF);
    for pair in pairs {
        payload.extend_from_slice(pair);
    }
    payload.push(0xFF);

    let mut sei = vec![0x06, 0x04, payload.len() as u8];
    sei.extend(payload);
    sei.push(0x80);
    sei
}
