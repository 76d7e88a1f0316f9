//! # H.264/AVC Elementary Stream Parsing
//!
//! The pieces the TS demuxer needs to turn an Annex-B byte stream into access units:
//!
//! - Start-code scanning that resumes across chunk boundaries ([`nal`])
//! - Emulation prevention removal, SPS and slice header decoding ([`parser`])
//! - CEA-608 caption extraction from SEI messages ([`sei`])
//!
//! ## Example: Splitting an Annex-B buffer
//!
//! ```rust
//! use bytes::Bytes;
//! use tsdemux::codec::h264::{scan_nal_units, NALUnitType};
//!
//! let data = Bytes::from_static(&[0, 0, 0, 1, 0x09, 0xF0, 0, 0, 1, 0x65, 0x88, 0x84]);
//! let mut state = 0;
//! let scan = scan_nal_units(&data, &mut state);
//!
//! let types: Vec<_> = scan.units.iter().map(|u| u.unit_type()).collect();
//! assert_eq!(types, vec![NALUnitType::AccessUnitDelimiter, NALUnitType::Idr]);
//! ```

/// Annex-B start code scanning
pub mod nal;
/// SPS, slice header and emulation prevention handling
pub mod parser;
/// Caption extraction from SEI NAL units
pub mod sei;
/// NAL unit and access unit types
pub mod types;

#[doc(inline)]
pub use nal::{scan_nal_units, NalScan};
#[doc(inline)]
pub use parser::{
    codec_string, is_intra_slice_type, parse_sps, read_slice_type, remove_emulation_prevention,
};
#[doc(inline)]
pub use types::{AvcSample, NALUnit, NALUnitType, SPSInfo};
