//! CEA-608 caption extraction from SEI `user_data_registered_itu_t_t35` payloads.

use crate::utils::BitReader;
use crate::Result;

/// SEI payload type carrying ITU-T T.35 registered user data.
pub const PAYLOAD_TYPE_USER_DATA_REGISTERED: u32 = 4;
/// ITU-T T.35 country code for the United States.
pub const COUNTRY_CODE_USA: u8 = 181;
/// ATSC provider code.
pub const PROVIDER_CODE_ATSC: u16 = 49;
/// "GA94" user identifier.
pub const USER_IDENTIFIER_GA94: u32 = 0x4741_3934;
/// cc_data() wrapping CEA-608 byte pairs.
pub const USER_DATA_TYPE_CC: u8 = 3;

/// Scans an SEI NAL unit (header byte included, emulation prevention removed)
/// and returns the raw cc_data bytes of the first ATSC A/53 caption payload.
///
/// The returned array starts with the `cc_count` byte and the `em_data` byte,
/// followed by three bytes per caption pair.
pub fn extract_cea608(rbsp: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut reader = BitReader::new(rbsp);
    reader.read_u8()?; // NAL header

    while reader.bytes_available() > 1 {
        let payload_type = read_ff_coded(&mut reader)?;
        let payload_size = read_ff_coded(&mut reader)? as usize;

        if payload_type == PAYLOAD_TYPE_USER_DATA_REGISTERED && reader.bytes_available() != 0 {
            return read_atsc_captions(&mut reader);
        }

        if payload_size < reader.bytes_available() {
            reader.skip_bytes(payload_size)?;
        } else {
            break;
        }
    }

    Ok(None)
}

/// Payload type and size are sums of bytes, each 0xFF continuing the value.
fn read_ff_coded(reader: &mut BitReader) -> Result<u32> {
    let mut value = 0u32;
    loop {
        let byte = reader.read_u8()?;
        value = value.saturating_add(byte as u32);
        if byte != 0xFF {
            return Ok(value);
        }
    }
}

fn read_atsc_captions(reader: &mut BitReader) -> Result<Option<Vec<u8>>> {
    if reader.read_u8()? != COUNTRY_CODE_USA
        || reader.read_u16()? != PROVIDER_CODE_ATSC
        || reader.read_u32()? != USER_IDENTIFIER_GA94
        || reader.read_u8()? != USER_DATA_TYPE_CC
    {
        return Ok(None);
    }

    let first_byte = reader.read_u8()?;
    let second_byte = reader.read_u8()?;
    let cc_count = (first_byte & 0x1F) as usize;

    let mut bytes = Vec::with_capacity(2 + cc_count * 3);
    bytes.push(first_byte);
    bytes.push(second_byte);
    for _ in 0..cc_count {
        bytes.push(reader.read_u8()?);
        bytes.push(reader.read_u8()?);
        bytes.push(reader.read_u8()?);
    }

    Ok(Some(bytes))
}
