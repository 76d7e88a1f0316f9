use super::types::*;
use crate::error::{DemuxError, Result};
use crate::utils::Crc32Mpeg2;

/// First offset within the leading [`SYNC_SCAN_LIMIT`] bytes where three packets in a
/// row start with the sync byte.
pub fn find_sync_offset(data: &[u8]) -> Option<usize> {
    let window = data
        .len()
        .saturating_sub(2 * TS_PACKET_SIZE)
        .min(SYNC_SCAN_LIMIT);

    (0..window).find(|&i| {
        data[i] == SYNC_BYTE
            && data[i + TS_PACKET_SIZE] == SYNC_BYTE
            && data[i + 2 * TS_PACKET_SIZE] == SYNC_BYTE
    })
}

/// Packet level parsing of PSI tables.
#[derive(Debug, Clone, Default)]
pub struct TSPacketParser {
    /// Reject PAT/PMT sections with a bad CRC32.
    pub verify_crc: bool,
    /// Accept MPEG-1/2 audio stream types.
    pub mpeg_audio_supported: bool,
}

impl TSPacketParser {
    pub fn new(verify_crc: bool, mpeg_audio_supported: bool) -> Self {
        Self {
            verify_crc,
            mpeg_audio_supported,
        }
    }

    /// Offset of the payload of the packet starting at `start`, or `None` for packets
    /// that carry nothing past their adaptation field.
    pub fn payload_offset(&self, data: &[u8], start: usize, header: &TSHeader) -> Option<usize> {
        let end = start + TS_PACKET_SIZE;
        let offset = if header.has_adaptation_field() {
            start + TS_HEADER_SIZE + 1 + *data.get(start + TS_HEADER_SIZE)? as usize
        } else {
            start + TS_HEADER_SIZE
        };

        if !header.has_payload() || offset >= end {
            return None;
        }
        Some(offset)
    }

    /// Skips the pointer field that precedes a section starting in this packet.
    pub fn section_offset(&self, data: &[u8], offset: usize, payload_unit_start: bool) -> usize {
        if payload_unit_start {
            offset + data.get(offset).copied().unwrap_or(0) as usize + 1
        } else {
            offset
        }
    }

    /// Returns the PMT PID of the first program.
    pub fn parse_pat(&self, data: &[u8], offset: usize, end: usize) -> Result<u16> {
        if offset + 12 > end || end > data.len() {
            return Err(DemuxError::InvalidData("PAT too short".into()));
        }
        self.check_section(data, offset, end, TABLE_ID_PAT)?;

        Ok((((data[offset + 10] & 0x1F) as u16) << 8) | data[offset + 11] as u16)
    }

    /// Walks the elementary stream loop and keeps the first PID of each supported kind.
    pub fn parse_pmt(
        &self,
        data: &[u8],
        offset: usize,
        end: usize,
        sample_aes: bool,
    ) -> Result<PmtPids> {
        if offset + 12 > end || end > data.len() {
            return Err(DemuxError::InvalidData("PMT too short".into()));
        }
        self.check_section(data, offset, end, TABLE_ID_PMT)?;

        let mut pids = PmtPids::default();
        let section_length = (((data[offset + 1] & 0x0F) as usize) << 8) | data[offset + 2] as usize;
        let table_end = (offset + 3 + section_length).saturating_sub(4).min(end);
        let program_info_length =
            (((data[offset + 10] & 0x0F) as usize) << 8) | data[offset + 11] as usize;

        let mut pos = offset + 12 + program_info_length;
        while pos + 5 <= table_end {
            let stream_type = data[pos];
            let pid = (((data[pos + 1] & 0x1F) as u16) << 8) | data[pos + 2] as u16;

            match stream_type {
                STREAM_TYPE_SAMPLE_AES_AAC | STREAM_TYPE_AAC => {
                    if stream_type == STREAM_TYPE_SAMPLE_AES_AAC && !sample_aes {
                        log::info!("unknown stream type: {:#04x}", stream_type);
                    } else if pids.audio.is_none() {
                        pids.audio = Some(pid);
                    }
                }
                STREAM_TYPE_METADATA => {
                    if pids.id3.is_none() {
                        pids.id3 = Some(pid);
                    }
                }
                STREAM_TYPE_SAMPLE_AES_H264 | STREAM_TYPE_H264 => {
                    if stream_type == STREAM_TYPE_SAMPLE_AES_H264 && !sample_aes {
                        log::info!("unknown stream type: {:#04x}", stream_type);
                    } else if pids.avc.is_none() {
                        pids.avc = Some(pid);
                    }
                }
                STREAM_TYPE_MPEG1_AUDIO | STREAM_TYPE_MPEG2_AUDIO => {
                    if !self.mpeg_audio_supported {
                        log::info!("MPEG audio found, not supported in this configuration");
                    } else if pids.audio.is_none() {
                        pids.audio = Some(pid);
                        pids.is_aac = false;
                    }
                }
                STREAM_TYPE_H265 => {
                    log::warn!("HEVC stream type found, not supported for now");
                }
                other => {
                    log::info!("unknown stream type: {:#04x}", other);
                }
            }

            let es_info_length =
                (((data[pos + 3] & 0x0F) as usize) << 8) | data[pos + 4] as usize;
            pos += es_info_length + 5;
        }

        Ok(pids)
    }

    fn check_section(&self, data: &[u8], offset: usize, end: usize, table_id: u8) -> Result<()> {
        if !self.verify_crc {
            return Ok(());
        }
        if data[offset] != table_id {
            return Err(DemuxError::Parser(format!(
                "unexpected table id {:#04x}",
                data[offset]
            )));
        }

        let section_length = (((data[offset + 1] & 0x0F) as usize) << 8) | data[offset + 2] as usize;
        let section_end = offset + 3 + section_length;
        if section_end > end || !Crc32Mpeg2::section_is_valid(&data[offset..section_end]) {
            return Err(DemuxError::Parser(format!(
                "PSI section {:#04x} failed CRC check",
                table_id
            )));
        }
        Ok(())
    }
}
