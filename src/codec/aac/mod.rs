//! AAC audio carried in ADTS framing.
//!
//! ```rust
//! use tsdemux::codec::aac::{audio_config, parse_frame};
//!
//! let mut frame = vec![0xFF, 0xF1, 0x50, 0x80, 0x02, 0x1F, 0xFC];
//! frame.resize(16, 0);
//!
//! let config = audio_config(&frame, 0).unwrap();
//! assert_eq!(config.codec, "mp4a.40.2");
//! assert_eq!(parse_frame(&frame, 0).unwrap().frame_length, 9);
//! ```

pub mod parser;
pub mod types;

pub use parser::{
    audio_config, find_adts_header, frame_duration, is_adts_header, parse_adts_header,
    parse_frame, parse_frame_header,
};
pub use types::{AACConfig, ADTSHeader, AdtsFrame, ProfileType, ADTS_SAMPLE_RATES};
