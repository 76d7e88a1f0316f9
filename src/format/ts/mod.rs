//! # MPEG Transport Stream (TS) Demuxing
//!
//! Turns 188-byte transport packets into elementary stream tracks:
//!
//! - Sync detection and PAT/PMT driven PID routing
//! - PES reassembly across packets and across `append` calls
//! - H.264 access unit assembly with SPS, keyframe and CEA-608 caption extraction
//! - AAC (ADTS) and MPEG-1/2 audio frame splitting
//! - Timed ID3 metadata passthrough
//! - Optional SAMPLE-AES decryption hook
//!
//! ## Example Usage
//!
//! ### Feeding a demuxer
//!
//! ```rust
//! use tsdemux::config::DemuxConfig;
//! use tsdemux::format::ts::{TSDemuxer, TS_PACKET_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Three null packets
//! let mut segment = Vec::new();
//! for _ in 0..3 {
//!     let mut packet = vec![0xFF; TS_PACKET_SIZE];
//!     packet[..4].copy_from_slice(&[0x47, 0x1F, 0xFF, 0x10]);
//!     segment.extend(packet);
//! }
//! assert!(TSDemuxer::probe(&segment));
//!
//! let mut demuxer = TSDemuxer::new(DemuxConfig::default());
//! let output = demuxer.append(segment, 0.0, false, false)?;
//! assert!(output.video.samples.is_empty());
//! assert!(output.audio.pid.is_none());
//!
//! let tail = demuxer.flush()?;
//! assert!(tail.audio.samples.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading from an async source
//!
//! ```rust,no_run
//! use tsdemux::format::ts::{TSDemuxer, TSSegmentReader};
//! use tsdemux::format::SegmentDemuxer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = tokio::fs::File::open("segment.ts").await?;
//!     let mut reader = TSSegmentReader::new(file, TSDemuxer::default());
//!
//!     let output = reader.demux_segment(10.0, true, true).await?;
//!     println!("{} video samples", output.video.samples.len());
//!     Ok(())
//! }
//! ```

pub(crate) mod audio;
pub(crate) mod avc;

/// Stream state machine and per-call output
pub mod demuxer;

/// Sync scan and PSI section parsing
pub mod parser;

/// PES reassembly and header handling
pub mod pes;

/// Async segment reader
pub mod reader;

/// SAMPLE-AES key material and decrypter hook
pub mod sample_aes;

/// Output tracks and samples
pub mod track;

/// Core TS types and constants
pub mod types;

pub use demuxer::{DemuxOutput, TSDemuxer};
pub use parser::{find_sync_offset, TSPacketParser};
pub use pes::{read_timestamp, write_timestamp, PESHeader, PesBuffer, PesUnit};
pub use reader::TSSegmentReader;
pub use sample_aes::{DecryptData, DecrypterFactory, KeyMethod, SampleAesDecrypter};
pub use track::{
    AudioSample, AudioTrack, CaptionSample, Id3Sample, Id3Track, TextTrack, VideoTrack,
};
pub use types::{
    PidRoute, PmtPids, TSHeader, STREAM_TYPE_AAC, STREAM_TYPE_H264, STREAM_TYPE_H265,
    STREAM_TYPE_METADATA, STREAM_TYPE_MPEG1_AUDIO, STREAM_TYPE_MPEG2_AUDIO,
    STREAM_TYPE_SAMPLE_AES_AAC, STREAM_TYPE_SAMPLE_AES_H264, TS_PACKET_SIZE,
};
