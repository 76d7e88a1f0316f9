//! MPEG-1/2 audio (layers I, II and III) frame headers.

pub mod parser;

pub use parser::{is_header, parse_frame, parse_header, MpegAudioHeader, MPEG_AUDIO_CODEC};
