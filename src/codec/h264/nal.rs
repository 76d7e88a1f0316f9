//! Annex-B start-code scanning that survives chunk boundaries.
//!
//! The detector counts zero bytes (states 0..=3) and cuts a unit when a `0x01`
//! follows at least two zeros. Its state is handed back to the caller so the
//! next chunk picks up where this one stopped. State `-1` means a start code
//! ended exactly at the end of the chunk and the unit type byte is the first
//! byte of the next one.

use super::types::NALUnit;
use bytes::{Bytes, BytesMut};

/// NAL units found in one chunk, plus how the chunk's leading bytes relate to
/// the unit that was still open when the chunk began.
#[derive(Debug, Default)]
pub struct NalScan {
    pub units: Vec<NALUnit>,
    /// Zero bytes at the end of the previous unit that turned out to be the
    /// beginning of a start code completed in this chunk.
    pub strip_previous: usize,
    /// Bytes before the first start code of this chunk (the whole chunk when it
    /// holds no start code). They continue the previous unit.
    pub carry: Option<Bytes>,
}

impl NalScan {
    /// Folds the leading part of the chunk into the unit that was open before it.
    pub fn continue_unit(&self, last: &mut NALUnit) {
        if self.strip_previous > 0 && last.state != 0 {
            let keep = last.data.len().saturating_sub(self.strip_previous);
            last.data.truncate(keep);
        }
        if let Some(carry) = &self.carry {
            let mut merged = BytesMut::with_capacity(last.data.len() + carry.len());
            merged.extend_from_slice(&last.data);
            merged.extend_from_slice(carry);
            last.data = merged.freeze();
        }
    }

    pub fn needs_previous_unit(&self) -> bool {
        self.strip_previous > 0 || self.carry.is_some()
    }
}

/// Splits `data` into NAL units, updating the persisted detector `state`.
pub fn scan_nal_units(data: &Bytes, state: &mut i8) -> NalScan {
    let len = data.len();
    let mut scan = NalScan::default();
    if len == 0 {
        return scan;
    }

    let last_state = *state;
    let mut st = last_state;
    let mut i = 0usize;
    let mut unit_start: Option<(usize, u8)> = None;
    let mut code_seen = false;

    if st == -1 {
        unit_start = Some((0, data[0] & 0x1F));
        code_seen = true;
        st = 0;
        i = 1;
    }

    while i < len {
        let value = data[i];
        i += 1;

        // zero runs dominate, keep them out of the general path
        if st == 0 {
            st = if value == 0 { 1 } else { 0 };
            continue;
        }
        if st == 1 {
            st = if value == 0 { 2 } else { 0 };
            continue;
        }

        if value == 0 {
            st = 3;
        } else if value == 1 {
            let code_start = i as isize - st as isize - 1;
            match unit_start {
                Some((start, nal_type)) => {
                    let end = code_start.max(start as isize) as usize;
                    scan.units
                        .push(NALUnit::new(nal_type, data.slice(start..end), 0));
                }
                None => {
                    code_seen = true;
                    if last_state > 0 && i <= (4 - last_state) as usize {
                        scan.strip_previous = last_state as usize;
                    }
                    if code_start > 0 {
                        scan.carry = Some(data.slice(..code_start as usize));
                    }
                }
            }

            if i < len {
                unit_start = Some((i, data[i] & 0x1F));
                st = 0;
            } else {
                // type byte not available yet
                unit_start = None;
                st = -1;
            }
        } else {
            st = 0;
        }
    }

    if let Some((start, nal_type)) = unit_start {
        if st >= 0 {
            scan.units.push(NALUnit::new(nal_type, data.slice(start..), st));
        }
    }
    if !code_seen {
        scan.carry = Some(data.clone());
    }

    *state = st;
    scan
}
