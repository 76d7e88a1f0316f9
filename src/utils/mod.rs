//! # Utility Functions and Types
//!
//! Bit-level reading for H.264 syntax elements and the MPEG-2 CRC32 used by
//! PSI tables.
//!
//! ```rust
//! use tsdemux::utils::BitReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // "1" "010" "011": ue(v) values 0, 1, 2
//! let data = vec![0b1010_0110];
//! let mut reader = BitReader::new(&data);
//!
//! assert_eq!(reader.read_golomb()?, 0);
//! assert_eq!(reader.read_golomb()?, 1);
//! assert_eq!(reader.read_golomb()?, 2);
//! # Ok(())
//! # }
//! ```

/// Bitstream reading utilities
pub mod bits;

/// CRC calculation implementations
pub mod crc;

pub use bits::BitReader;
pub use crc::Crc32Mpeg2;
