/// AAC in ADTS framing
pub mod aac;
/// H.264/AVC Annex-B streams
pub mod h264;
/// MPEG-1/2 audio layers I-III
pub mod mpeg_audio;

pub use h264::types::{NALUnit, NALUnitType};
