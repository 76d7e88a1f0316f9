//! Groups the NAL units of video PES packets into access units.
//!
//! An access unit is closed by an AUD, or, on streams that never carried an AUD,
//! by the arrival of the next PES with NAL units in it. The unit under
//! construction survives across `append` calls.

use super::track::{CaptionSample, TextTrack, VideoTrack};
use crate::codec::h264::{
    codec_string, is_intra_slice_type, parse_sps, read_slice_type, remove_emulation_prevention,
    scan_nal_units, sei, AvcSample, NALUnit, NALUnitType,
};
use bytes::Bytes;

/// Tracks touched while parsing one video PES.
pub(crate) struct AvcContext<'a> {
    pub video: &'a mut VideoTrack,
    pub text: &'a mut TextTrack,
    pub contiguous: bool,
    pub duration: f64,
}

/// Last NAL unit of a PES that is still being received.
#[derive(Debug, Clone)]
struct PendingUnit {
    unit: NALUnit,
    pts: i64,
    dts: i64,
}

#[derive(Debug, Default)]
pub(crate) struct AvcAssembler {
    sample: Option<AvcSample>,
    pending: Option<PendingUnit>,
    /// An SPS was seen in the current PES.
    sps_found: bool,
    /// Access units kept since the parse window started.
    window_samples: usize,
    force_key_frame: bool,
}

impl AvcAssembler {
    pub fn new(force_key_frame: bool) -> Self {
        Self {
            force_key_frame,
            ..Default::default()
        }
    }

    pub fn reset(&mut self) {
        self.sample = None;
        self.pending = None;
        self.sps_found = false;
        self.window_samples = 0;
    }

    /// Starts a parse window that does not continue the previous one.
    pub fn start_window(&mut self) {
        self.window_samples = 0;
    }

    /// Parses one video PES payload.
    ///
    /// `continuation` marks the header-less remainder of an unbounded PES and `open`
    /// marks a payload that may still continue in the next call; its last NAL unit
    /// is held back until it is known to be complete.
    pub fn parse_pes(
        &mut self,
        data: &Bytes,
        pts: i64,
        dts: i64,
        continuation: bool,
        open: bool,
        ctx: &mut AvcContext,
    ) {
        let scan = scan_nal_units(data, &mut ctx.video.nalu_state);

        if !continuation {
            self.finish_pending(ctx);
            self.sps_found = false;
        }

        if scan.needs_previous_unit() {
            match self.pending.as_mut() {
                Some(pending) => scan.continue_unit(&mut pending.unit),
                None => {
                    if let Some(last) = self.last_unit(ctx.video) {
                        scan.continue_unit(last);
                    }
                }
            }
        }

        let mut units = scan.units;
        if continuation {
            if let Some(pending) = self.pending.take() {
                units.insert(0, pending.unit);
            }
        }

        // streams without AUD: a new PES closes the open access unit
        if !continuation && self.sample.is_some() && !units.is_empty() && !ctx.video.aud_found {
            if let Some(sample) = self.sample.take() {
                self.push_access_unit(sample, ctx);
            }
            self.sample = Some(AvcSample::new(false, pts, dts, ""));
        }

        if open {
            if let Some(unit) = units.pop() {
                self.pending = Some(PendingUnit { unit, pts, dts });
            }
        }

        for unit in units {
            self.process_unit(unit, pts, dts, ctx);
        }
    }

    /// Completes the held back unit and pushes the open access unit.
    pub fn flush(&mut self, ctx: &mut AvcContext) {
        self.finish_pending(ctx);
        if let Some(sample) = self.sample.take() {
            self.push_access_unit(sample, ctx);
        }
    }

    fn finish_pending(&mut self, ctx: &mut AvcContext) {
        if let Some(PendingUnit { unit, pts, dts }) = self.pending.take() {
            self.process_unit(unit, pts, dts, ctx);
        }
    }

    /// Unit that bytes preceding the first start code of a PES belong to.
    fn last_unit<'a>(&'a mut self, video: &'a mut VideoTrack) -> Option<&'a mut NALUnit> {
        match self.sample.as_mut() {
            Some(sample) if !sample.units.is_empty() => sample.units.last_mut(),
            _ => video.samples.last_mut()?.units.last_mut(),
        }
    }

    fn process_unit(&mut self, unit: NALUnit, pts: i64, dts: i64, ctx: &mut AvcContext) {
        let debug = log::log_enabled!(log::Level::Trace);
        let unit_type = unit.unit_type();

        let push = match unit_type {
            NALUnitType::Ndr | NALUnitType::Idr => {
                let sample = self
                    .sample
                    .get_or_insert_with(|| AvcSample::new(true, pts, dts, ""));
                if debug {
                    sample.debug.push_str(unit_type.name());
                    sample.debug.push(' ');
                }
                sample.frame = true;

                if unit_type == NALUnitType::Idr {
                    sample.key = true;
                } else if self.sps_found && unit.data.len() > 4 {
                    match read_slice_type(&unit.data) {
                        Ok(slice_type) if is_intra_slice_type(slice_type) => sample.key = true,
                        Ok(_) => {}
                        Err(e) => log::debug!("unreadable slice header: {}", e),
                    }
                }
                true
            }
            NALUnitType::Sei => {
                self.trace(debug, "SEI");
                let rbsp = remove_emulation_prevention(&unit.data);
                match sei::extract_cea608(&rbsp) {
                    Ok(Some(bytes)) => ctx.text.insert_in_order(CaptionSample::cea608(pts, bytes)),
                    Ok(None) => {}
                    Err(e) => log::debug!("truncated SEI payload: {}", e),
                }
                true
            }
            NALUnitType::Sps => {
                self.sps_found = true;
                self.trace(debug, "SPS");
                update_sps(ctx.video, &unit.data, ctx.duration);
                true
            }
            NALUnitType::Pps => {
                self.trace(debug, "PPS");
                if ctx.video.pps.is_none() {
                    ctx.video.pps = Some(unit.data.clone());
                }
                true
            }
            NALUnitType::AccessUnitDelimiter => {
                ctx.video.aud_found = true;
                if let Some(sample) = self.sample.take() {
                    self.push_access_unit(sample, ctx);
                }
                self.sample = Some(AvcSample::new(false, pts, dts, if debug { "AUD " } else { "" }));
                false
            }
            NALUnitType::FillerData => {
                self.trace(debug, "FILLER");
                false
            }
            NALUnitType::Unknown(nal_type) => {
                if let Some(sample) = self.sample.as_mut() {
                    sample.debug.push_str(&format!("unknown NAL {} ", nal_type));
                }
                false
            }
        };

        if push {
            if let Some(sample) = self.sample.as_mut() {
                sample.units.push(unit);
            }
        }
    }

    fn trace(&mut self, debug: bool, name: &str) {
        if let (true, Some(sample)) = (debug, self.sample.as_mut()) {
            sample.debug.push_str(name);
            sample.debug.push(' ');
        }
    }

    fn push_access_unit(&mut self, mut sample: AvcSample, ctx: &mut AvcContext) {
        if !sample.debug.is_empty() {
            log::trace!("{}/{}:{}", sample.pts, sample.dts, sample.debug);
        }
        if sample.units.is_empty() || !sample.frame {
            return;
        }

        let video = &mut *ctx.video;
        let nb_samples = video.samples.len();
        if !self.force_key_frame
            || sample.key
            || (video.sps.is_some() && (self.window_samples > 0 || ctx.contiguous))
        {
            sample.id = nb_samples;
            video.samples.push(sample);
            self.window_samples += 1;
        } else {
            video.dropped += 1;
        }
    }
}

/// Parses an SPS when the track has none yet or its profile/level bytes changed.
fn update_sps(video: &mut VideoTrack, data: &Bytes, duration: f64) {
    let changed = match &video.sps {
        Some(sps) => sps.get(1..4) != data.get(1..4),
        None => true,
    };
    if !changed {
        return;
    }

    match parse_sps(&remove_emulation_prevention(data)) {
        Ok(info) => {
            video.width = info.width;
            video.height = info.height;
            video.pixel_ratio = info.pixel_ratio;
            video.codec = codec_string(data);
            video.sps = Some(data.clone());
            video.duration = duration;
            log::info!(
                "AVC {}x{} {}",
                info.width,
                info.height,
                video.codec.as_deref().unwrap_or("")
            );
        }
        Err(e) => log::warn!("failed to parse SPS: {}", e),
    }
}
