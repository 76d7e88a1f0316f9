#![doc(html_root_url = "https://docs.rs/tsdemux/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tsdemux - MPEG-2 Transport Stream Demuxer
//!
//! `tsdemux` splits MPEG-2 transport stream segments, as served by HLS, into
//! elementary stream samples ready for remuxing: H.264 access units, AAC or
//! MPEG audio frames, timed ID3 metadata and CEA-608 captions.
//!
//! ## Features
//!
//! ### Container
//! - Sync detection and probing
//! - PAT/PMT parsing with optional CRC32 checking
//! - PES reassembly, including across `append` calls
//!
//! ### Elementary Streams
//! - H.264/AVC access unit assembly with SPS decoding and keyframe detection
//! - CEA-608 captions from SEI user data
//! - AAC audio from ADTS with frame-accurate timestamps
//! - MPEG-1/2 audio layers I-III
//! - SAMPLE-AES decrypter hook
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! tsdemux = "0.1.0"
//! ```
//!
//! ```rust,no_run
//! use tsdemux::TSDemuxer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let segment = std::fs::read("segment.ts")?;
//! if TSDemuxer::probe(&segment) {
//!     let mut demuxer = TSDemuxer::default();
//!     let mut output = demuxer.append(segment, 0.0, false, true)?;
//!     output.merge(demuxer.flush()?);
//!
//!     for sample in &output.video.samples {
//!         println!("pts={} key={} units={}", sample.pts, sample.key, sample.units.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `codec`: Elementary stream parsers
//!   - H.264 NAL scanning, SPS and SEI
//!   - ADTS headers and audio configuration
//!   - MPEG audio frame headers
//!
//! - `format`: Container handling
//!   - TS packets, PSI and PES
//!   - Demuxer state machine and async segment reader
//!
//! - `config`: Demuxer tuning loaded from file and environment
//!
//! - `error`: Error handling types and utilities
//!
//! - `utils`: Bitstream reading and CRC calculations
//!

/// Codec implementations for video and audio formats
pub mod codec;

/// Configuration module
pub mod config;

/// Error types and utilities
pub mod error;

/// Media format implementations
pub mod format;

/// Common utilities and helper functions
pub mod utils;

pub use error::{DemuxError, Result};
pub use format::ts::{DemuxOutput, TSDemuxer};
