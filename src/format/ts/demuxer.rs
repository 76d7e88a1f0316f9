use super::audio::{parse_aac_pes, parse_mpeg_pes};
use super::avc::{AvcAssembler, AvcContext};
use super::parser::{find_sync_offset, TSPacketParser};
use super::pes::{PesBuffer, PesUnit};
use super::sample_aes::{DecryptData, DecrypterFactory, SampleAesDecrypter};
use super::track::{AudioTrack, Id3Sample, Id3Track, TextTrack, VideoTrack};
use super::types::*;
use crate::config::DemuxConfig;
use crate::error::{DemuxError, Result};
use bytes::{Bytes, BytesMut};
use std::mem;

/// Everything produced by one `append` (or `flush`) call.
#[derive(Debug, Clone)]
pub struct DemuxOutput {
    pub audio: AudioTrack,
    pub video: VideoTrack,
    pub id3: Id3Track,
    pub text: TextTrack,
    pub time_offset: f64,
    pub contiguous: bool,
    pub accurate_time_offset: bool,
    pub init_pts: Option<i64>,
    pub init_dts: Option<i64>,
}

impl DemuxOutput {
    /// Appends the samples of a later output. Track metadata and timestamp bases
    /// are taken from `next`, captions are merged in pts order.
    pub fn merge(&mut self, next: DemuxOutput) {
        let DemuxOutput {
            mut audio,
            mut video,
            mut id3,
            text,
            init_pts,
            init_dts,
            ..
        } = next;

        let base = self.video.samples.len();
        for sample in video.samples.iter_mut() {
            sample.id += base;
        }
        let mut samples = mem::take(&mut self.video.samples);
        samples.append(&mut video.samples);
        let dropped = self.video.dropped + video.dropped;
        self.video = VideoTrack {
            samples,
            dropped,
            ..video
        };

        let mut samples = mem::take(&mut self.audio.samples);
        samples.append(&mut audio.samples);
        self.audio = AudioTrack { samples, ..audio };

        let mut samples = mem::take(&mut self.id3.samples);
        samples.append(&mut id3.samples);
        self.id3 = Id3Track { samples, ..id3 };

        for caption in text.samples {
            self.text.insert_in_order(caption);
        }

        self.init_pts = init_pts;
        self.init_dts = init_dts;
    }
}

/// MPEG-2 transport stream demuxer.
///
/// Bytes may arrive in chunks of any size: partial packets, PES packets and access
/// units are carried over to the next [`TSDemuxer::append`]. Call
/// [`TSDemuxer::flush`] at the end of the stream to get the samples still held back.
pub struct TSDemuxer {
    config: DemuxConfig,
    parser: TSPacketParser,
    pmt_parsed: bool,
    pmt_id: Option<u16>,
    video: VideoTrack,
    audio: AudioTrack,
    id3: Id3Track,
    text: TextTrack,
    avc: AvcAssembler,
    /// Partial packet left at the end of the previous append.
    remainder: Option<Bytes>,
    synced: bool,
    contiguous: bool,
    time_offset: f64,
    accurate_time_offset: bool,
    duration: f64,
    init_pts: Option<i64>,
    init_dts: Option<i64>,
    decrypter: Option<Box<dyn SampleAesDecrypter>>,
    decrypter_factory: Option<DecrypterFactory>,
}

impl Default for TSDemuxer {
    fn default() -> Self {
        Self::new(DemuxConfig::global())
    }
}

impl TSDemuxer {
    pub fn new(config: DemuxConfig) -> Self {
        Self {
            parser: TSPacketParser::new(config.verify_psi_crc, config.mpeg_audio_supported),
            avc: AvcAssembler::new(config.force_key_frame_on_discontinuity),
            config,
            pmt_parsed: false,
            pmt_id: None,
            video: VideoTrack::new(0.0),
            audio: AudioTrack::new(0.0),
            id3: Id3Track::new(),
            text: TextTrack::new(),
            remainder: None,
            synced: false,
            contiguous: false,
            time_offset: 0.0,
            accurate_time_offset: false,
            duration: 0.0,
            init_pts: None,
            init_dts: None,
            decrypter: None,
            decrypter_factory: None,
        }
    }

    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    /// True when `data` holds three consecutive TS packets.
    pub fn probe(data: &[u8]) -> bool {
        match find_sync_offset(data) {
            Some(offset) => {
                if offset > 0 {
                    log::warn!("MPEG2-TS detected but first sync word found @ offset {}", offset);
                }
                true
            }
            None => false,
        }
    }

    /// Demuxes one chunk of the stream.
    ///
    /// Fails with [`DemuxError::NoSyncFound`] when no packet boundary can be found and
    /// with [`DemuxError::NoAdtsHeader`] when an AAC PES holds no ADTS frame.
    pub fn append(
        &mut self,
        data: impl Into<Bytes>,
        time_offset: f64,
        contiguous: bool,
        accurate_time_offset: bool,
    ) -> Result<DemuxOutput> {
        let data = self.with_remainder(data.into());
        self.contiguous = contiguous;
        if !contiguous {
            self.avc.start_window();
        }
        self.time_offset = time_offset;
        self.accurate_time_offset = accurate_time_offset;

        let sync_offset = if self.synced {
            0
        } else {
            match find_sync_offset(&data) {
                Some(offset) => {
                    if offset > 0 {
                        log::warn!(
                            "MPEG2-TS detected but first sync word found @ offset {}, junk ahead ?",
                            offset
                        );
                    }
                    self.synced = true;
                    offset
                }
                None if data.len() < 3 * TS_PACKET_SIZE => {
                    self.remainder = (!data.is_empty()).then_some(data);
                    return self.deliver();
                }
                None => return Err(DemuxError::NoSyncFound),
            }
        };

        let mut unknown_pids = false;
        let mut start = sync_offset;
        while start + TS_PACKET_SIZE <= data.len() {
            if data[start] != SYNC_BYTE {
                log::warn!("TS packet did not start with 0x47 @ offset {}", start);
                match data[start + 1..].iter().position(|&b| b == SYNC_BYTE) {
                    Some(skip) => start += skip + 1,
                    None => start = data.len(),
                }
                continue;
            }

            let end = start + TS_PACKET_SIZE;
            let header = TSHeader::parse(&data[start..end])?;
            let Some(offset) = self.parser.payload_offset(&data, start, &header) else {
                start = end;
                continue;
            };
            let stt = header.payload_unit_start;

            match self.route(header.pid) {
                route @ (PidRoute::Video | PidRoute::Audio | PidRoute::Id3) => {
                    self.push_payload(route, stt, data.slice(offset..end))?;
                }
                PidRoute::Pat if stt => {
                    let offset = self.parser.section_offset(&data, offset, stt);
                    match self.parser.parse_pat(&data, offset, end) {
                        Ok(pmt_id) => self.pmt_id = Some(pmt_id),
                        Err(e) => log::warn!("skipping PAT: {}", e),
                    }
                }
                PidRoute::Pmt if stt => {
                    let offset = self.parser.section_offset(&data, offset, stt);
                    match self
                        .parser
                        .parse_pmt(&data, offset, end, self.decrypter.is_some())
                    {
                        Ok(pids) => {
                            self.apply_pmt(&pids);
                            if unknown_pids && !self.pmt_parsed {
                                log::debug!("reparse from beginning");
                                unknown_pids = false;
                                self.pmt_parsed = true;
                                start = sync_offset;
                                continue;
                            }
                            self.pmt_parsed = true;
                        }
                        Err(e) => log::warn!("skipping PMT: {}", e),
                    }
                }
                PidRoute::Unknown => unknown_pids = true,
                _ => {}
            }
            start = end;
        }
        self.remainder = (start < data.len()).then(|| data.slice(start..));

        for route in [PidRoute::Video, PidRoute::Audio, PidRoute::Id3] {
            self.finish_pes(route, true)?;
        }

        self.deliver()
    }

    /// Parses every PES still buffered and closes the open access unit.
    pub fn flush(&mut self) -> Result<DemuxOutput> {
        self.remainder = None;
        for route in [PidRoute::Video, PidRoute::Audio, PidRoute::Id3] {
            self.finish_pes(route, false)?;
        }

        let mut ctx = AvcContext {
            video: &mut self.video,
            text: &mut self.text,
            contiguous: self.contiguous,
            duration: self.duration,
        };
        self.avc.flush(&mut ctx);

        self.deliver()
    }

    /// Forgets every PID and all carried-over state. Required at stream start and
    /// after a discontinuity or track switch.
    pub fn reset(&mut self, duration: f64) {
        self.pmt_parsed = false;
        self.pmt_id = None;
        self.video = VideoTrack::new(duration);
        self.audio = AudioTrack::new(duration);
        self.id3 = Id3Track::new();
        self.text = TextTrack::new();
        self.avc.reset();
        self.remainder = None;
        self.synced = false;
        self.duration = duration;
    }

    /// Clears the duration and timestamp bases. Track state is left alone.
    pub fn destroy(&mut self) {
        self.init_pts = None;
        self.init_dts = None;
        self.duration = 0.0;
    }

    pub fn set_timestamp_base(&mut self, init_pts: Option<i64>, init_dts: Option<i64>) {
        self.init_pts = init_pts;
        self.init_dts = init_dts;
    }

    /// Registers how decrypters are built once SAMPLE-AES key material arrives.
    pub fn set_decrypter_factory(
        &mut self,
        factory: impl Fn(&DecryptData) -> Box<dyn SampleAesDecrypter> + Send + 'static,
    ) {
        self.decrypter_factory = Some(Box::new(factory));
    }

    /// Installs a decrypter for SAMPLE-AES key material, or removes it for anything else.
    pub fn set_decryption_info(&mut self, decrypt_data: Option<DecryptData>) {
        self.decrypter = match decrypt_data {
            Some(data) if data.is_sample_aes() => match &self.decrypter_factory {
                Some(factory) => Some(factory(&data)),
                None => {
                    log::warn!("SAMPLE-AES key provided but no decrypter registered");
                    None
                }
            },
            _ => None,
        };
    }

    fn with_remainder(&mut self, data: Bytes) -> Bytes {
        match self.remainder.take() {
            Some(head) => {
                let mut merged = BytesMut::with_capacity(head.len() + data.len());
                merged.extend_from_slice(&head);
                merged.extend_from_slice(&data);
                merged.freeze()
            }
            None => data,
        }
    }

    fn route(&self, pid: u16) -> PidRoute {
        match pid {
            _ if Some(pid) == self.video.pid => PidRoute::Video,
            _ if Some(pid) == self.audio.pid => PidRoute::Audio,
            _ if Some(pid) == self.id3.pid => PidRoute::Id3,
            PID_PAT => PidRoute::Pat,
            _ if Some(pid) == self.pmt_id => PidRoute::Pmt,
            PID_SDT | PID_NULL => PidRoute::Ignored,
            _ => PidRoute::Unknown,
        }
    }

    /// PIDs only move forward: a PMT that omits a stream keeps the known PID.
    fn apply_pmt(&mut self, pids: &PmtPids) {
        if let Some(pid) = pids.avc {
            self.video.pid = Some(pid);
        }
        if let Some(pid) = pids.audio {
            self.audio.pid = Some(pid);
            self.audio.is_aac = pids.is_aac;
        }
        if let Some(pid) = pids.id3 {
            self.id3.pid = Some(pid);
        }
    }

    fn pes_slot(&mut self, route: PidRoute) -> Option<&mut Option<PesBuffer>> {
        match route {
            PidRoute::Video => Some(&mut self.video.pes_data),
            PidRoute::Audio => Some(&mut self.audio.pes_data),
            PidRoute::Id3 => Some(&mut self.id3.pes_data),
            _ => None,
        }
    }

    fn push_payload(&mut self, route: PidRoute, stt: bool, payload: Bytes) -> Result<()> {
        if stt {
            self.finish_pes(route, false)?;
            if let Some(slot) = self.pes_slot(route) {
                *slot = Some(PesBuffer::new());
            }
        }
        if let Some(Some(buffer)) = self.pes_slot(route) {
            buffer.push(payload);
        }
        Ok(())
    }

    /// Parses the buffered PES of `route`. With `open` set (end of an append), an
    /// incomplete PES is kept. An unbounded video PES is parsed up to here and
    /// continues into the next call; unbounded audio and ID3 PES wait for their end.
    fn finish_pes(&mut self, route: PidRoute, open: bool) -> Result<()> {
        let Some(mut buffer) = self.pes_slot(route).and_then(Option::take) else {
            return Ok(());
        };

        match buffer.parse() {
            Some(pes) if open && pes.len == 0 && route != PidRoute::Video => {
                if let Some(slot) = self.pes_slot(route) {
                    *slot = Some(buffer);
                }
            }
            Some(pes) => {
                let unbounded = open && pes.len == 0;
                let (pts, dts) = (pes.pts, pes.dts);
                self.dispatch(route, pes, unbounded)?;
                if unbounded {
                    if let Some(slot) = self.pes_slot(route) {
                        *slot = Some(PesBuffer::continuing(pts, dts));
                    }
                }
            }
            None if open => {
                if let Some(slot) = self.pes_slot(route) {
                    *slot = Some(buffer);
                }
            }
            None => {
                if !buffer.is_empty() {
                    log::warn!("discarding incomplete {:?} PES", route);
                }
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, route: PidRoute, pes: PesUnit, open: bool) -> Result<()> {
        let (Some(pts), Some(dts)) = (pes.pts, pes.dts) else {
            log::warn!("dropping {:?} PES without PTS", route);
            return Ok(());
        };

        match route {
            PidRoute::Video => {
                let mut ctx = AvcContext {
                    video: &mut self.video,
                    text: &mut self.text,
                    contiguous: self.contiguous,
                    duration: self.duration,
                };
                self.avc
                    .parse_pes(&pes.data, pts, dts, pes.continuation, open, &mut ctx);
            }
            PidRoute::Audio if self.audio.is_aac => {
                parse_aac_pes(&mut self.audio, &pes.data, pts, self.duration)?;
            }
            PidRoute::Audio => parse_mpeg_pes(&mut self.audio, &pes.data, pts),
            PidRoute::Id3 => self.id3.samples.push(Id3Sample {
                data: pes.data,
                pts,
                dts,
            }),
            _ => {}
        }
        Ok(())
    }

    fn deliver(&mut self) -> Result<DemuxOutput> {
        let mut output = DemuxOutput {
            audio: self.audio.snapshot(),
            video: self.video.snapshot(),
            id3: self.id3.snapshot(),
            text: self.text.snapshot(),
            time_offset: self.time_offset,
            contiguous: self.contiguous,
            accurate_time_offset: self.accurate_time_offset,
            init_pts: self.init_pts,
            init_dts: self.init_dts,
        };

        if let Some(decrypter) = self.decrypter.as_mut() {
            if output.audio.is_aac {
                decrypter.decrypt_aac_samples(&mut output.audio.samples)?;
            }
            decrypter.decrypt_avc_samples(&mut output.video.samples)?;
        }

        Ok(output)
    }
}
