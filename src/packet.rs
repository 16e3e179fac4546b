//! Decode the CST816-style touch register block (7 bytes read from register 0x00).

use crate::sample::RawSample;

/// Size of the register block read per poll.
pub const PACKET_SIZE: usize = 7;

/// Register the block read starts at.
pub const TOUCH_REGISTER: u8 = 0x00;

pub const IDX_STATUS: usize = 0;
pub const IDX_EVENT_FINGERS: usize = 1; // low nibble = finger count
pub const IDX_X_HIGH: usize = 2; // low nibble = x[11:8]
pub const IDX_X_LOW: usize = 3;
pub const IDX_Y_HIGH: usize = 4; // low nibble = y[11:8]
pub const IDX_Y_LOW: usize = 5;

/// Largest value a 12-bit axis can report.
pub const RAW_MAX: u16 = 0x0FFF;

/// Number of active fingers reported in the block.
pub fn finger_count(buf: &[u8]) -> u8 {
    buf.get(IDX_EVENT_FINGERS).map_or(0, |b| b & 0x0F)
}

/// Parse one register block into a raw sample.
/// Returns None if the block is too short or reports zero fingers.
pub fn decode(buf: &[u8]) -> Option<RawSample> {
    if buf.len() < IDX_Y_LOW + 1 {
        return None;
    }
    if finger_count(buf) == 0 {
        return None;
    }
    let rx = (u16::from(buf[IDX_X_HIGH] & 0x0F) << 8) | u16::from(buf[IDX_X_LOW]);
    let ry = (u16::from(buf[IDX_Y_HIGH] & 0x0F) << 8) | u16::from(buf[IDX_Y_LOW]);
    Some(RawSample::touching(rx, ry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_12_bit_axes() {
        let buf = [0x00, 0x01, 0xA3, 0x21, 0x4F, 0xFF, 0x00];
        let s = decode(&buf).unwrap();
        assert_eq!(s.rx, 0x321);
        assert_eq!(s.ry, 0xFFF);
        assert!(s.touching);
    }

    #[test]
    fn zero_fingers_is_no_sample() {
        let buf = [0x00, 0x30, 0x01, 0x00, 0x01, 0x00, 0x00];
        assert_eq!(finger_count(&buf), 0);
        assert!(decode(&buf).is_none());
    }

    #[test]
    fn short_block_is_no_sample() {
        assert!(decode(&[0x00, 0x01, 0x02]).is_none());
        assert!(decode(&[]).is_none());
    }
}
