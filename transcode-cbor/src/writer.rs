//! Low-level CBOR head/argument and payload writer (spec §4.6.1, §4.6.2:
//! "directly writes wire bytes; no intermediate token buffer"). Every method
//! appends straight to the borrowed [`transcode_core::Buffer`]; there is no
//! internal state beyond that borrow.

use transcode_core::Buffer;

use crate::head::*;

pub(crate) struct CborWriter<'a> {
    buf: &'a mut Buffer,
}

impl<'a> CborWriter<'a> {
    pub(crate) fn new(buf: &'a mut Buffer) -> Self {
        Self { buf }
    }

    /// Write a head byte and argument for `major`, choosing the shortest
    /// encoding that fits `value` (spec §4.6.1's argument table).
    pub(crate) fn write_uint(&mut self, major: u8, value: u64) {
        match value {
            0..=23 => self.buf.write_byte(head_byte(major, value as u8)),
            24..=0xff => {
                self.buf.write_byte(head_byte(major, MINOR_ONE_BYTE));
                self.buf.write_byte(value as u8);
            }
            0x100..=0xffff => {
                self.buf.write_byte(head_byte(major, MINOR_TWO_BYTES));
                self.buf.write(&(value as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.buf.write_byte(head_byte(major, MINOR_FOUR_BYTES));
                self.buf.write(&(value as u32).to_be_bytes());
            }
            _ => {
                self.buf.write_byte(head_byte(major, MINOR_EIGHT_BYTES));
                self.buf.write(&value.to_be_bytes());
            }
        }
    }

    /// Write a definite-length byte/text string: a length-prefixed head
    /// followed by the raw payload.
    pub(crate) fn write_bytes(&mut self, major: u8, bytes: &[u8]) {
        self.write_uint(major, bytes.len() as u64);
        self.buf.write(bytes);
    }

    /// Open an indefinite-length list/map/string (minor 31); the caller
    /// writes chunks/items/entries and then [`CborWriter::write_break`].
    pub(crate) fn write_indefinite_head(&mut self, major: u8) {
        self.buf.write_byte(head_byte(major, MINOR_INDEFINITE));
    }

    pub(crate) fn write_break(&mut self) {
        self.buf.write_byte(head_byte(MAJOR_SIMPLE, MINOR_BREAK));
    }

    pub(crate) fn write_simple(&mut self, minor: u8) {
        self.buf.write_byte(head_byte(MAJOR_SIMPLE, minor));
    }

    pub(crate) fn write_bool(&mut self, value: bool) {
        self.write_simple(if value { MINOR_TRUE } else { MINOR_FALSE });
    }

    pub(crate) fn write_null(&mut self) {
        self.write_simple(MINOR_NULL);
    }

    /// Encoding never produces Float16 (spec §4.6.1); 32-bit source values
    /// use Float32, everything else Float64.
    pub(crate) fn write_float32(&mut self, value: f32) {
        self.buf.write_byte(head_byte(MAJOR_SIMPLE, MINOR_FLOAT32));
        self.buf.write(&value.to_be_bytes());
    }

    pub(crate) fn write_float64(&mut self, value: f64) {
        self.buf.write_byte(head_byte(MAJOR_SIMPLE, MINOR_FLOAT64));
        self.buf.write(&value.to_be_bytes());
    }

    pub(crate) fn write_tag(&mut self, tag: u64) {
        self.write_uint(MAJOR_TAG, tag);
    }

    /// Write a signed integer as major 0 (non-negative) or major 1
    /// (negative, stored as `-1-value` per spec §4.6.1).
    pub(crate) fn write_signed(&mut self, value: i64) {
        if value >= 0 {
            self.write_uint(MAJOR_UINT, value as u64);
        } else {
            self.write_uint(MAJOR_NEG, (!value) as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(f: impl FnOnce(&mut CborWriter)) -> Vec<u8> {
        let mut buf = Buffer::new();
        f(&mut CborWriter::new(&mut buf));
        buf.into_vec()
    }

    #[test]
    fn small_uint_is_one_byte() {
        assert_eq!(encode(|w| w.write_uint(MAJOR_UINT, 10)), vec![0x0a]);
    }

    #[test]
    fn uint_24_uses_one_extra_byte() {
        assert_eq!(encode(|w| w.write_uint(MAJOR_UINT, 24)), vec![0x18, 24]);
    }

    #[test]
    fn uint_256_uses_two_extra_bytes() {
        assert_eq!(encode(|w| w.write_uint(MAJOR_UINT, 256)), vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn negative_minus_one_is_neg_major_zero() {
        // -1 -> stored 0 under major 1: head (1<<5)|0 = 0x20
        assert_eq!(encode(|w| w.write_signed(-1)), vec![0x20]);
    }

    #[test]
    fn decimal_fraction_tag_matches_worked_example() {
        // spec §8 scenario 3: BigDecimal("273.15") -> c4 82 21 19 6a b3
        let bytes = encode(|w| {
            w.write_tag(4);
            w.write_uint(MAJOR_LIST, 2);
            w.write_signed(-2);
            w.write_uint(MAJOR_UINT, 27315);
        });
        assert_eq!(bytes, vec![0xc4, 0x82, 0x21, 0x19, 0x6a, 0xb3]);
    }
}
