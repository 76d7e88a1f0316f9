use super::types::{MAX_PES_HEADER_SIZE, MAX_PTS_DTS_DIVERGENCE, PES_START_CODE_PREFIX};
use bytes::{BufMut, Bytes, BytesMut};

/// Payload fragments of one PES packet, collected from consecutive TS packets.
#[derive(Debug, Clone, Default)]
pub struct PesBuffer {
    pub fragments: Vec<Bytes>,
    /// Total bytes across all fragments
    pub size: usize,
    /// Timestamps of an unbounded PES that was already partly parsed. The buffered
    /// bytes continue it and carry no PES header.
    pub continuation: Option<(Option<i64>, Option<i64>)>,
}

/// One reassembled PES packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PesUnit {
    pub data: Bytes,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    /// Declared payload length, 0 for unbounded packets
    pub len: usize,
    /// Header-less remainder of an unbounded PES
    pub continuation: bool,
}

impl PesBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn continuing(pts: Option<i64>, dts: Option<i64>) -> Self {
        Self {
            continuation: Some((pts, dts)),
            ..Self::default()
        }
    }

    pub fn push(&mut self, fragment: Bytes) {
        self.size += fragment.len();
        self.fragments.push(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Reassembles the buffered PES. `None` while the declared length is not yet
    /// satisfied or the bytes do not form a PES packet.
    pub fn parse(&mut self) -> Option<PesUnit> {
        if self.size == 0 {
            return None;
        }

        if let Some((pts, dts)) = self.continuation {
            return Some(PesUnit {
                data: self.concat(0),
                pts,
                dts,
                len: 0,
                continuation: true,
            });
        }

        self.merge_head(MAX_PES_HEADER_SIZE);
        let head = &self.fragments[0];
        if head.len() < 9 {
            return None;
        }

        let prefix = ((head[0] as u32) << 16) | ((head[1] as u32) << 8) | head[2] as u32;
        if prefix != PES_START_CODE_PREFIX {
            log::debug!("PES did not start with start code prefix");
            return None;
        }

        let pes_len = ((head[4] as usize) << 8) | head[5] as usize;
        if pes_len != 0 && pes_len > self.size - 6 {
            return None;
        }

        let flags = head[7];
        let mut pts = None;
        let mut dts = None;
        if flags & 0xC0 != 0 {
            pts = Some(read_timestamp(head.get(9..14)?));
            if flags & 0x40 != 0 {
                let decoded = read_timestamp(head.get(14..19)?);
                dts = match pts {
                    Some(pts) if pts - decoded > MAX_PTS_DTS_DIVERGENCE => {
                        log::warn!(
                            "{}ms PTS/DTS gap, aligning DTS on PTS",
                            (pts - decoded) / 90
                        );
                        Some(pts)
                    }
                    _ => Some(decoded),
                };
            } else {
                dts = pts;
            }
        }

        let header_len = head[8] as usize;
        let payload_start = header_len + 9;
        if self.size <= payload_start {
            return None;
        }

        Some(PesUnit {
            data: self.concat(payload_start),
            pts,
            dts,
            len: pes_len.saturating_sub(header_len + 3),
            continuation: false,
        })
    }

    /// Joins leading fragments until the first one holds `min` bytes or only one is left.
    fn merge_head(&mut self, min: usize) {
        while self.fragments.len() > 1 && self.fragments[0].len() < min {
            let second = self.fragments.remove(1);
            let mut merged = BytesMut::with_capacity(self.fragments[0].len() + second.len());
            merged.extend_from_slice(&self.fragments[0]);
            merged.extend_from_slice(&second);
            self.fragments[0] = merged.freeze();
        }
    }

    fn concat(&self, skip: usize) -> Bytes {
        if self.fragments.len() == 1 {
            return self.fragments[0].slice(skip.min(self.fragments[0].len())..);
        }

        let mut data = BytesMut::with_capacity(self.size.saturating_sub(skip));
        let mut skip = skip;
        for fragment in &self.fragments {
            if skip >= fragment.len() {
                skip -= fragment.len();
                continue;
            }
            data.extend_from_slice(&fragment[skip..]);
            skip = 0;
        }
        data.freeze()
    }
}

/// Decodes a 33-bit PES timestamp, wrapping values above 2^32 - 1 to negative.
pub fn read_timestamp(bytes: &[u8]) -> i64 {
    let value = (((bytes[0] & 0x0E) as i64) << 29)
        | ((bytes[1] as i64) << 22)
        | (((bytes[2] & 0xFE) as i64) << 14)
        | ((bytes[3] as i64) << 7)
        | (((bytes[4] & 0xFE) as i64) >> 1);

    if value > 0xFFFF_FFFF {
        value - (1 << 33)
    } else {
        value
    }
}

/// Writes a 33-bit timestamp with its marker bits.
pub fn write_timestamp(buf: &mut BytesMut, marker: u8, ts: u64) {
    let pts = ts & 0x1FFFFFFFF; // 33 bits

    // First byte: marker bits and 3 MSB of timestamp
    buf.put_u8(marker | ((pts >> 29) & 0x0E) as u8 | 0x01);

    // Middle 16 bits and marker
    buf.put_u16((((pts >> 14) & 0xFFFE) | 0x01) as u16);

    // Final 15 bits and marker
    buf.put_u16((((pts << 1) & 0xFFFE) | 0x01) as u16);
}

/// PES header writer, used to build streams in tests and tools.
#[derive(Debug, Clone, Default)]
pub struct PESHeader {
    pub stream_id: u8,
    /// 0 for unbounded packets
    pub packet_length: u16,
    pub data_alignment: bool,
    pub pts: Option<u64>,
    pub dts: Option<u64>,
}

impl PESHeader {
    pub fn new(stream_id: u8) -> Self {
        Self {
            stream_id,
            ..Default::default()
        }
    }

    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = Some(pts);
        self
    }

    pub fn with_dts(mut self, dts: u64) -> Self {
        self.dts = Some(dts);
        self
    }

    pub fn header_data_length(&self) -> u8 {
        match (self.pts, self.dts) {
            (Some(_), Some(_)) => 10,
            (Some(_), None) => 5,
            _ => 0,
        }
    }

    /// Sets `packet_length` for a payload of `payload_len` bytes.
    pub fn bounded(mut self, payload_len: usize) -> Self {
        self.packet_length = (3 + self.header_data_length() as usize + payload_len) as u16;
        self
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8((PES_START_CODE_PREFIX >> 16) as u8);
        buf.put_u8((PES_START_CODE_PREFIX >> 8) as u8);
        buf.put_u8(PES_START_CODE_PREFIX as u8);
        buf.put_u8(self.stream_id);
        buf.put_u16(self.packet_length);

        let mut flags = 0x80u8;
        if self.data_alignment {
            flags |= 0x04;
        }
        buf.put_u8(flags);

        let pts_dts_flags = match (self.pts, self.dts) {
            (Some(_), Some(_)) => 0xC0,
            (Some(_), None) => 0x80,
            _ => 0x00,
        };
        buf.put_u8(pts_dts_flags);
        buf.put_u8(self.header_data_length());

        if let Some(pts) = self.pts {
            let marker = if self.dts.is_some() { 0x30 } else { 0x20 };
            write_timestamp(buf, marker, pts);
        }
        if let (Some(_), Some(dts)) = (self.pts, self.dts) {
            write_timestamp(buf, 0x10, dts);
        }
    }
}
