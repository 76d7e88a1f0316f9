/// Sampling frequencies indexed by the 4-bit ADTS `sampling_frequency_index`.
pub const ADTS_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// PCM samples carried by one AAC frame.
pub const AAC_SAMPLES_PER_FRAME: u32 = 1024;

/// ADTS header without / with the trailing CRC.
pub const ADTS_HEADER_LENGTH: usize = 7;
pub const ADTS_HEADER_LENGTH_WITH_CRC: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    Main = 0,
    LC = 1,
    SSR = 2,
    LTP = 3,
}

impl From<u8> for ProfileType {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => ProfileType::Main,
            1 => ProfileType::LC,
            2 => ProfileType::SSR,
            _ => ProfileType::LTP,
        }
    }
}

impl ProfileType {
    /// MPEG-4 audio object type (ADTS profile + 1).
    pub fn object_type(&self) -> u8 {
        *self as u8 + 1
    }
}

/// Stream configuration derived from the first ADTS header of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AACConfig {
    pub profile: ProfileType,
    pub sample_rate_index: u8,
    pub sample_rate: u32,
    pub channel_configuration: u8,
    /// Two-byte AudioSpecificConfig.
    pub audio_specific_config: [u8; 2],
    /// `mp4a.40.<object type>`
    pub codec: String,
}

#[derive(Debug, Clone)]
pub struct ADTSHeader {
    pub sync_word: u32,             // 12 bits
    pub id: u8,                     // 1 bit, 0=MPEG-4, 1=MPEG-2
    pub layer: u8,                  // 2 bits
    pub protection_absent: bool,    // 1 bit
    pub profile: ProfileType,       // 2 bits
    pub sample_rate_index: u8,      // 4 bits
    pub private_bit: bool,          // 1 bit
    pub channel_configuration: u8,  // 3 bits
    pub original_copy: bool,        // 1 bit
    pub home: bool,                 // 1 bit
    pub copyright_id_bit: bool,     // 1 bit
    pub copyright_id_start: bool,   // 1 bit
    pub frame_length: u16,          // 13 bits, header included
    pub buffer_fullness: u16,       // 11 bits
    pub number_of_raw_blocks: u8,   // 2 bits
}

impl ADTSHeader {
    pub fn sync_word_valid(&self) -> bool {
        self.sync_word == 0xFFF
    }

    pub fn sample_rate(&self) -> Option<u32> {
        ADTS_SAMPLE_RATES.get(self.sample_rate_index as usize).copied()
    }

    pub fn header_length(&self) -> usize {
        if self.protection_absent {
            ADTS_HEADER_LENGTH
        } else {
            ADTS_HEADER_LENGTH_WITH_CRC
        }
    }
}

/// Location of one complete ADTS frame inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdtsFrame {
    pub header_length: usize,
    /// Raw AAC payload length, header excluded.
    pub frame_length: usize,
}

impl AdtsFrame {
    pub fn total_length(&self) -> usize {
        self.header_length + self.frame_length
    }
}
