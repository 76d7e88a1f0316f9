mod common;

use bytes::Bytes;
use common::*;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use tsdemux::config::DemuxConfig;
use tsdemux::error::{DemuxError, Result};
use tsdemux::format::ts::{
    AudioSample, DecryptData, DemuxOutput, PESHeader, SampleAesDecrypter, TSDemuxer,
    TSSegmentReader, STREAM_TYPE_AAC, STREAM_TYPE_H264, STREAM_TYPE_H265, STREAM_TYPE_METADATA,
    STREAM_TYPE_MPEG1_AUDIO, STREAM_TYPE_SAMPLE_AES_AAC, STREAM_TYPE_SAMPLE_AES_H264,
};
use tsdemux::codec::h264::AvcSample;
use tsdemux::format::SegmentDemuxer;

const ID3_PAYLOAD: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x05TEST!";

fn all_streams() -> Vec<(u8, u16)> {
    vec![
        (STREAM_TYPE_H264, VIDEO_PID),
        (STREAM_TYPE_AAC, AUDIO_PID),
        (STREAM_TYPE_METADATA, ID3_PID),
    ]
}

/// Keyframe with SPS, PPS and a caption, two P frames, three AAC frames and an ID3 tag.
fn segment() -> Vec<u8> {
    let sei = caption_sei(&[[0xFC, 0x94, 0x20]]);
    let audio = adts_frames(3, 100);
    TsBuilder::new()
        .pat(PMT_PID)
        .pmt(PMT_PID, &all_streams())
        .pes(VIDEO_PID, video_pes(180_000), &annexb(&[AUD, SPS, PPS, &sei, IDR]))
        .pes(AUDIO_PID, audio_pes(180_000, audio.len()), &audio)
        .pes(ID3_PID, id3_pes(180_000, ID3_PAYLOAD.len()), ID3_PAYLOAD)
        .pes(VIDEO_PID, video_pes(183_000), &annexb(&[AUD, P_SLICE]))
        .pes(VIDEO_PID, video_pes(186_000), &annexb(&[AUD, P_SLICE]))
        .null()
        .build()
}

fn demux_all(demuxer: &mut TSDemuxer, data: Vec<u8>, contiguous: bool) -> Result<DemuxOutput> {
    let mut output = demuxer.append(data, 0.0, contiguous, false)?;
    output.merge(demuxer.flush()?);
    Ok(output)
}

type VideoSummary = Vec<(i64, i64, bool, usize, Vec<Bytes>)>;

fn video_summary(samples: &[AvcSample]) -> VideoSummary {
    samples
        .iter()
        .map(|s| {
            let units = s.units.iter().map(|u| u.data.clone()).collect();
            (s.pts, s.dts, s.key, s.id, units)
        })
        .collect()
}

fn audio_summary(samples: &[AudioSample]) -> Vec<(i64, Bytes)> {
    samples.iter().map(|s| (s.pts, s.unit.clone())).collect()
}

#[test]
fn test_full_segment() -> Result<()> {
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let output = demux_all(&mut demuxer, segment(), false)?;

    let video = &output.video;
    assert_eq!(video.pid, Some(VIDEO_PID));
    assert_eq!((video.width, video.height), (320, 240));
    assert_eq!(video.codec.as_deref(), Some("avc1.42001e"));
    assert_eq!(video.sps.as_deref(), Some(SPS));
    assert_eq!(video.pps.as_deref(), Some(PPS));
    assert_eq!(video.dropped, 0);

    let pts: Vec<i64> = video.samples.iter().map(|s| s.pts).collect();
    let keys: Vec<bool> = video.samples.iter().map(|s| s.key).collect();
    let ids: Vec<usize> = video.samples.iter().map(|s| s.id).collect();
    assert_eq!(pts, vec![180_000, 183_000, 186_000]);
    assert_eq!(keys, vec![true, false, false]);
    assert_eq!(ids, vec![0, 1, 2]);
    // AUD is not kept
    assert_eq!(video.samples[0].units.len(), 4);
    assert_eq!(&video.samples[1].units[0].data[..], P_SLICE);

    let audio = &output.audio;
    assert!(audio.is_aac);
    assert_eq!(audio.codec.as_deref(), Some("mp4a.40.2"));
    assert_eq!(audio.sample_rate, 48_000);
    assert_eq!(audio.channel_count, 2);
    let pts: Vec<i64> = audio.samples.iter().map(|s| s.pts).collect();
    assert_eq!(pts, vec![180_000, 181_920, 183_840]);
    assert!(audio.samples.iter().all(|s| s.byte_length() == 100));

    assert_eq!(output.id3.samples.len(), 1);
    assert_eq!(&output.id3.samples[0].data[..], ID3_PAYLOAD);
    assert_eq!(output.id3.samples[0].pts, 180_000);

    assert_eq!(output.text.samples.len(), 1);
    assert_eq!(output.text.samples[0].pts, 180_000);
    assert_eq!(output.text.samples[0].sample_type, 3);
    assert_eq!(output.text.samples[0].bytes, vec![0xC1, 0xFF, 0xFC, 0x94, 0x20]);
    Ok(())
}

#[test]
fn test_flush_releases_open_access_unit() -> Result<()> {
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());

    let output = demuxer.append(segment(), 0.0, false, false)?;
    assert_eq!(output.video.samples.len(), 2);
    assert_eq!(output.audio.samples.len(), 3);

    let tail = demuxer.flush()?;
    assert_eq!(tail.video.samples.len(), 1);
    assert_eq!(tail.video.samples[0].pts, 186_000);
    assert!(tail.audio.samples.is_empty());
    assert_eq!(tail.audio.codec.as_deref(), Some("mp4a.40.2"));
    Ok(())
}

#[test]
fn test_split_input_matches_single_append() -> Result<()> {
    let data = segment();
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let whole = demux_all(&mut demuxer, data.clone(), false)?;

    for chunk_size in [1, 61, 188, 500] {
        let mut demuxer = TSDemuxer::new(DemuxConfig::default());
        let mut merged: Option<DemuxOutput> = None;
        for (i, chunk) in data.chunks(chunk_size).enumerate() {
            let output = demuxer.append(chunk.to_vec(), 0.0, i > 0, false)?;
            match merged.as_mut() {
                Some(merged) => merged.merge(output),
                None => merged = Some(output),
            }
        }
        let mut merged = merged.expect("at least one chunk");
        merged.merge(demuxer.flush()?);

        assert_eq!(
            video_summary(&merged.video.samples),
            video_summary(&whole.video.samples),
            "chunk size {}",
            chunk_size
        );
        assert_eq!(
            audio_summary(&merged.audio.samples),
            audio_summary(&whole.audio.samples),
            "chunk size {}",
            chunk_size
        );
        assert_eq!(merged.id3.samples.len(), whole.id3.samples.len());
        assert_eq!(merged.text.samples.len(), whole.text.samples.len());
        assert_eq!(merged.video.dropped, 0);
    }
    Ok(())
}

#[test]
fn test_output_carries_call_parameters() -> Result<()> {
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    demuxer.set_timestamp_base(Some(180_000), Some(179_000));

    let output = demuxer.append(segment(), 10.0, true, true)?;
    assert!((output.time_offset - 10.0).abs() < f64::EPSILON);
    assert!(output.contiguous);
    assert!(output.accurate_time_offset);
    assert_eq!(output.init_pts, Some(180_000));
    assert_eq!(output.init_dts, Some(179_000));
    assert_eq!(output.video.id, 1);
    assert_eq!(output.audio.id, 2);
    assert_eq!(output.id3.id, 3);
    assert_eq!(output.text.id, 4);
    assert_eq!(output.video.input_time_scale, 90_000);
    Ok(())
}

#[test]
fn test_junk_before_first_packet() -> Result<()> {
    let mut data = vec![0x00, 0x12, 0x47, 0x34];
    data.extend(segment());
    assert!(TSDemuxer::probe(&data));

    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let output = demux_all(&mut demuxer, data, false)?;
    assert_eq!(output.video.samples.len(), 3);
    Ok(())
}

#[test]
fn test_probe_rejects_non_ts() {
    assert!(!TSDemuxer::probe(&[0u8; 1024]));
    assert!(!TSDemuxer::probe(&segment()[..300]));
}

#[test]
fn test_streams_before_pmt_are_reparsed() -> Result<()> {
    let data = TsBuilder::new()
        .pat(PMT_PID)
        .pes(VIDEO_PID, video_pes(0), &annexb(&[AUD, SPS, PPS, IDR]))
        .pmt(PMT_PID, &all_streams())
        .pes(VIDEO_PID, video_pes(3_000), &annexb(&[AUD, P_SLICE]))
        .null()
        .build();

    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let output = demux_all(&mut demuxer, data, false)?;
    let pts: Vec<i64> = output.video.samples.iter().map(|s| s.pts).collect();
    assert_eq!(pts, vec![0, 3_000]);
    Ok(())
}

#[test]
fn test_hevc_stream_is_ignored() -> Result<()> {
    let audio = adts_frames(1, 20);
    let data = TsBuilder::new()
        .pat(PMT_PID)
        .pmt(PMT_PID, &[(STREAM_TYPE_H265, VIDEO_PID), (STREAM_TYPE_AAC, AUDIO_PID)])
        .pes(VIDEO_PID, video_pes(0), &[0, 0, 0, 1, 0x40, 0x01, 0x0C])
        .pes(AUDIO_PID, audio_pes(0, audio.len()), &audio)
        .null()
        .build();

    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let output = demux_all(&mut demuxer, data, false)?;
    assert_eq!(output.video.pid, None);
    assert!(output.video.samples.is_empty());
    assert_eq!(output.audio.pid, Some(AUDIO_PID));
    assert_eq!(output.audio.samples.len(), 1);
    Ok(())
}

#[test]
fn test_no_sync_found() {
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let result = demuxer.append(vec![0x11u8; 2048], 0.0, false, false);
    assert!(matches!(result, Err(DemuxError::NoSyncFound)));
}

#[test]
fn test_aac_without_adts_header_fails() {
    let garbage = vec![0u8; 64];
    let data = TsBuilder::new()
        .pat(PMT_PID)
        .pmt(PMT_PID, &all_streams())
        .pes(AUDIO_PID, audio_pes(0, garbage.len()), &garbage)
        .null()
        .build();

    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let result = demuxer.append(data, 0.0, false, false);
    assert!(matches!(result, Err(DemuxError::NoAdtsHeader)));
}

fn p_frame_first_segment() -> Vec<u8> {
    TsBuilder::new()
        .pat(PMT_PID)
        .pmt(PMT_PID, &all_streams())
        .pes(VIDEO_PID, video_pes(0), &annexb(&[AUD, P_SLICE]))
        .pes(VIDEO_PID, video_pes(3_000), &annexb(&[AUD, SPS, PPS, IDR]))
        .pes(VIDEO_PID, video_pes(6_000), &annexb(&[AUD, P_SLICE]))
        .null()
        .build()
}

#[test]
fn test_frames_before_first_keyframe_are_dropped() -> Result<()> {
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let output = demux_all(&mut demuxer, p_frame_first_segment(), false)?;

    assert_eq!(output.video.dropped, 1);
    let pts: Vec<i64> = output.video.samples.iter().map(|s| s.pts).collect();
    assert_eq!(pts, vec![3_000, 6_000]);
    Ok(())
}

#[test]
fn test_contiguous_segment_keeps_leading_frames() -> Result<()> {
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    demux_all(&mut demuxer, segment(), false)?;

    let output = demux_all(&mut demuxer, p_frame_first_segment(), true)?;
    assert_eq!(output.video.dropped, 0);
    assert_eq!(output.video.samples.len(), 3);

    // same stream after a seek: SPS is known but nothing was kept yet
    let output = demux_all(&mut demuxer, p_frame_first_segment(), false)?;
    assert_eq!(output.video.dropped, 1);
    assert_eq!(output.video.samples.len(), 2);

    let config = DemuxConfig {
        force_key_frame_on_discontinuity: false,
        ..DemuxConfig::default()
    };
    let mut lenient = TSDemuxer::new(config);
    let output = demux_all(&mut lenient, p_frame_first_segment(), false)?;
    assert_eq!(output.video.samples.len(), 3);
    Ok(())
}

#[test]
fn test_reset_forgets_streams() -> Result<()> {
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    demux_all(&mut demuxer, segment(), false)?;

    demuxer.reset(6.0);
    let output = demuxer.flush()?;
    assert_eq!(output.video.pid, None);
    assert_eq!(output.audio.pid, None);
    assert_eq!(output.video.sps, None);

    let output = demux_all(&mut demuxer, segment(), false)?;
    assert_eq!(output.video.samples.len(), 3);
    assert!((output.video.duration - 6.0).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn test_mpeg_audio_stream() -> Result<()> {
    let mut audio = mp3_frame();
    audio.extend(mp3_frame());
    let data = TsBuilder::new()
        .pat(PMT_PID)
        .pmt(PMT_PID, &[(STREAM_TYPE_MPEG1_AUDIO, AUDIO_PID)])
        .pes(AUDIO_PID, audio_pes(90_000, audio.len()), &audio)
        .null()
        .build();

    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let output = demux_all(&mut demuxer, data.clone(), false)?;
    assert!(!output.audio.is_aac);
    assert_eq!(output.audio.codec.as_deref(), Some("mp4a.40.34"));
    assert_eq!(output.audio.sample_rate, 44_100);
    let pts: Vec<i64> = output.audio.samples.iter().map(|s| s.pts).collect();
    assert_eq!(pts, vec![90_000, 92_351]);
    assert_eq!(output.audio.samples[0].byte_length(), 417);

    let config = DemuxConfig {
        mpeg_audio_supported: false,
        ..DemuxConfig::default()
    };
    let output = demux_all(&mut TSDemuxer::new(config), data, false)?;
    assert_eq!(output.audio.pid, None);
    Ok(())
}

#[test]
fn test_captions_sorted_by_pts() -> Result<()> {
    let first = caption_sei(&[[0xFC, 0x94, 0x20]]);
    let second = caption_sei(&[[0xFC, 0x94, 0xAE]]);
    // decode order differs from presentation order
    let data = TsBuilder::new()
        .pat(PMT_PID)
        .pmt(PMT_PID, &all_streams())
        .pes(
            VIDEO_PID,
            PESHeader::new(0xE0).with_pts(186_000).with_dts(180_000),
            &annexb(&[AUD, SPS, PPS, &first, IDR]),
        )
        .pes(
            VIDEO_PID,
            PESHeader::new(0xE0).with_pts(183_000).with_dts(183_000),
            &annexb(&[AUD, &second, P_SLICE]),
        )
        .null()
        .build();

    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let output = demux_all(&mut demuxer, data, false)?;
    let pts: Vec<i64> = output.text.samples.iter().map(|s| s.pts).collect();
    assert_eq!(pts, vec![183_000, 186_000]);
    assert_eq!(output.text.samples[0].bytes[4], 0xAE);
    Ok(())
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl SampleAesDecrypter for Recorder {
    fn decrypt_aac_samples(&mut self, samples: &mut [AudioSample]) -> Result<()> {
        self.calls.lock().unwrap().push("aac");
        for sample in samples.iter_mut() {
            sample.unit = Bytes::from(vec![0u8; sample.unit.len()]);
        }
        Ok(())
    }

    fn decrypt_avc_samples(&mut self, _samples: &mut [AvcSample]) -> Result<()> {
        self.calls.lock().unwrap().push("avc");
        Ok(())
    }
}

fn encrypted_segment() -> Vec<u8> {
    let audio = adts_frames(2, 32);
    TsBuilder::new()
        .pat(PMT_PID)
        .pmt(
            PMT_PID,
            &[
                (STREAM_TYPE_SAMPLE_AES_H264, VIDEO_PID),
                (STREAM_TYPE_SAMPLE_AES_AAC, AUDIO_PID),
            ],
        )
        .pes(VIDEO_PID, video_pes(0), &annexb(&[AUD, SPS, PPS, IDR]))
        .pes(AUDIO_PID, audio_pes(0, audio.len()), &audio)
        .null()
        .build()
}

#[test]
fn test_sample_aes_streams_need_key() -> Result<()> {
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let output = demux_all(&mut demuxer, encrypted_segment(), false)?;
    assert_eq!(output.video.pid, None);
    assert_eq!(output.audio.pid, None);
    Ok(())
}

#[test]
fn test_sample_aes_decrypter_sees_samples() -> Result<()> {
    let recorder = Recorder::default();
    let calls = recorder.calls.clone();

    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    demuxer.set_decrypter_factory(move |_| -> Box<dyn SampleAesDecrypter> {
        Box::new(recorder.clone())
    });
    demuxer.set_decryption_info(Some(DecryptData::new(
        "SAMPLE-AES",
        Some(Bytes::from_static(&[0x11; 16])),
        Some(Bytes::from_static(&[0x22; 16])),
    )));

    let output = demux_all(&mut demuxer, encrypted_segment(), false)?;
    assert_eq!(output.video.pid, Some(VIDEO_PID));
    assert_eq!(output.audio.samples.len(), 2);
    assert!(output.audio.samples.iter().all(|s| s.unit.iter().all(|&b| b == 0)));
    assert_eq!(output.video.samples.len(), 1);

    // one pass per append and one per flush
    assert_eq!(*calls.lock().unwrap(), vec!["aac", "avc", "aac", "avc"]);

    demuxer.set_decryption_info(None);
    calls.lock().unwrap().clear();
    demuxer.flush()?;
    assert!(calls.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_segment_reader_matches_append() -> Result<()> {
    let data = segment();
    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let whole = demux_all(&mut demuxer, data.clone(), false)?;

    let mock = tokio_test::io::Builder::new()
        .read(&data[..700])
        .read(&data[700..1500])
        .read(&data[1500..])
        .build();
    let config = DemuxConfig {
        read_chunk_size: 256,
        ..DemuxConfig::default()
    };
    let mut reader = TSSegmentReader::new(mock, TSDemuxer::new(config));
    let output = reader.demux_segment(0.0, false, false).await?;

    assert_eq!(
        video_summary(&output.video.samples),
        video_summary(&whole.video.samples)
    );
    assert_eq!(
        audio_summary(&output.audio.samples),
        audio_summary(&whole.audio.samples)
    );
    assert_eq!(output.text.samples.len(), 1);
    assert!(!output.contiguous);
    Ok(())
}

#[test]
fn test_adts_overflow_across_appends() -> Result<()> {
    let second = adts_frame(10);
    let mut head = adts_frame(10);
    head.extend_from_slice(&second[..8]);
    let mut tail = second[8..].to_vec();
    tail.extend(adts_frame(10));

    let mut demuxer = TSDemuxer::new(DemuxConfig::default());
    let first = TsBuilder::new()
        .pat(PMT_PID)
        .pmt(PMT_PID, &all_streams())
        .pes(AUDIO_PID, audio_pes(0, head.len()), &head)
        .build();
    let output = demuxer.append(first, 0.0, false, false)?;
    assert_eq!(audio_summary(&output.audio.samples).len(), 1);

    // PES timestamp half a frame early
    let next = TsBuilder::new()
        .pes(AUDIO_PID, audio_pes(960, tail.len()), &tail)
        .null()
        .build();
    let output = demuxer.append(next, 0.0, true, false)?;
    let pts: Vec<i64> = output.audio.samples.iter().map(|s| s.pts).collect();
    assert_eq!(pts, vec![1_920, 3_840]);
    Ok(())
}

#[test]
fn test_unbounded_audio_and_id3_split_after_header() -> Result<()> {
    let audio = adts_frames(5, 30);
    // PES header plus one payload byte in the first packet of each PES
    let data = TsBuilder::new()
        .pat(PMT_PID)
        .pmt(PMT_PID, &all_streams())
        .pes_with_head(AUDIO_PID, unbounded_pes(0xC0, 90_000), &audio, 15)
        .pes_with_head(ID3_PID, unbounded_pes(0xBD, 90_000), ID3_PAYLOAD, 15)
        .build();
    let packets = data.len() / 188;

    let whole = demux_all(&mut TSDemuxer::new(DemuxConfig::default()), data.clone(), false)?;
    let pts: Vec<i64> = whole.audio.samples.iter().map(|s| s.pts).collect();
    assert_eq!(pts, vec![90_000, 91_920, 93_840, 95_760, 97_680]);
    assert_eq!(whole.id3.samples.len(), 1);
    assert_eq!(&whole.id3.samples[0].data[..], ID3_PAYLOAD);

    for split in 1..packets {
        let mut demuxer = TSDemuxer::new(DemuxConfig::default());
        let mut output = demuxer.append(data[..split * 188].to_vec(), 0.0, false, false)?;
        output.merge(demuxer.append(data[split * 188..].to_vec(), 0.0, true, false)?);
        output.merge(demuxer.flush()?);

        assert_eq!(
            audio_summary(&output.audio.samples),
            audio_summary(&whole.audio.samples),
            "split after packet {}",
            split
        );
        assert_eq!(output.id3.samples.len(), 1, "split after packet {}", split);
        assert_eq!(&output.id3.samples[0].data[..], ID3_PAYLOAD);
    }
    Ok(())
}

#[test]
fn test_psi_crc_verification() -> Result<()> {
    let mut data = segment();
    // first CRC byte of the PMT section: packet 1, after header, pointer and 27 section bytes
    data[188 + 5 + 27] ^= 0xFF;

    let output = demux_all(&mut TSDemuxer::new(DemuxConfig::default()), data.clone(), false)?;
    assert_eq!(output.video.pid, Some(VIDEO_PID));

    let config = DemuxConfig {
        verify_psi_crc: true,
        ..DemuxConfig::default()
    };
    let output = demux_all(&mut TSDemuxer::new(config), data, false)?;
    assert_eq!(output.video.pid, None);
    assert!(output.video.samples.is_empty());
    Ok(())
}
