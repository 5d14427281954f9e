//! [`BigInteger`] and [`BigDecimal`] — opaque value types with text and
//! byte-array marshalling only (spec §1 scope note: "Big-number arithmetic
//! ... treated as an opaque value type"). No arithmetic operators are
//! provided; these exist solely so CBOR tags 2/3/4 (§4.6.1) can round-trip
//! through the wire and through decimal text.

#[cfg(feature = "alloc")]
use alloc::{string::String, vec, vec::Vec};

/// An arbitrary-precision integer, stored as a sign plus a big-endian
/// base-256 magnitude (no required normalization of leading zero bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigInteger {
    negative: bool,
    magnitude: Vec<u8>,
}

impl BigInteger {
    /// Zero.
    pub fn zero() -> Self {
        Self {
            negative: false,
            magnitude: vec![0],
        }
    }

    /// A non-negative integer from its big-endian magnitude (CBOR tag 2
    /// payload).
    pub fn from_unsigned_bytes(bytes: &[u8]) -> Self {
        Self {
            negative: false,
            magnitude: bytes.to_vec(),
        }
    }

    /// A negative integer from a CBOR tag-3 payload, whose *logical* value
    /// is `-1 - asUnsigned(bytes)` (spec §4.6.1).
    pub fn from_negative_bignum_bytes(bytes: &[u8]) -> Self {
        let magnitude = add_one(bytes);
        Self {
            negative: true,
            magnitude,
        }
    }

    /// Whether this value is strictly negative.
    pub fn is_negative(&self) -> bool {
        self.negative && self.magnitude.iter().any(|&b| b != 0)
    }

    /// The big-endian magnitude (tag-2 wire payload for non-negative
    /// values; for negative values, apply [`BigInteger::to_negative_bignum_bytes`]
    /// instead to get the tag-3 payload).
    pub fn magnitude_bytes(&self) -> &[u8] {
        &self.magnitude
    }

    /// The CBOR tag-3 payload for a negative value: `asUnsigned(bytes) ==
    /// logicalMagnitude - 1`.
    pub fn to_negative_bignum_bytes(&self) -> Vec<u8> {
        sub_one(&self.magnitude)
    }

    /// Render as a decimal string, e.g. `"-12345"`.
    pub fn to_decimal_string(&self) -> String {
        let digits = to_decimal_digits(&self.magnitude);
        let mut s = String::with_capacity(digits.len() + 1);
        if self.is_negative() {
            s.push('-');
        }
        s.push_str(&digits);
        s
    }

    /// Parse a decimal string (optional leading `-`) into a big integer.
    pub fn from_decimal_str(s: &str) -> Option<Self> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let magnitude = from_decimal_digits(digits);
        Some(Self { negative, magnitude })
    }
}

/// A decimal fraction `mantissa * 10^exponent` (CBOR tag 4, spec §4.6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigDecimal {
    mantissa: BigInteger,
    exponent: i64,
}

impl BigDecimal {
    /// Build from a mantissa and base-10 exponent.
    pub fn new(mantissa: BigInteger, exponent: i64) -> Self {
        Self { mantissa, exponent }
    }

    /// The mantissa.
    pub fn mantissa(&self) -> &BigInteger {
        &self.mantissa
    }

    /// The base-10 exponent.
    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    /// Render as decimal text, e.g. `"273.15"`.
    pub fn to_decimal_string(&self) -> String {
        let mut digits = to_decimal_digits(self.mantissa.magnitude_bytes());
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        if self.exponent >= 0 {
            for _ in 0..self.exponent {
                digits.push('0');
            }
            return alloc::format!("{sign}{digits}");
        }
        let frac_len = (-self.exponent) as usize;
        if digits.len() <= frac_len {
            let pad = frac_len - digits.len();
            let mut padded = String::from("0.");
            for _ in 0..pad {
                padded.push('0');
            }
            padded.push_str(&digits);
            alloc::format!("{sign}{padded}")
        } else {
            let split = digits.len() - frac_len;
            let frac = digits.split_off(split);
            alloc::format!("{sign}{digits}.{frac}")
        }
    }

    /// Parse decimal text like `"273.15"` or `"-4e10"` into mantissa and
    /// exponent form.
    pub fn from_decimal_str(s: &str) -> Option<Self> {
        let (mantissa_part, exp_part) = match s.split_once(['e', 'E']) {
            Some((m, e)) => (m, e.parse::<i64>().ok()?),
            None => (s, 0),
        };
        let (negative, mantissa_part) = match mantissa_part.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa_part),
        };
        let (int_part, frac_part) = match mantissa_part.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa_part, ""),
        };
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let mut combined = String::with_capacity(int_part.len() + frac_part.len());
        combined.push_str(int_part);
        combined.push_str(frac_part);
        if combined.is_empty() {
            combined.push('0');
        }
        let magnitude = from_decimal_digits(&combined);
        let exponent = exp_part - frac_part.len() as i64;
        Some(Self {
            mantissa: BigInteger { negative, magnitude },
            exponent,
        })
    }
}

/// base-256 magnitude + 1, big-endian.
fn add_one(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let mut carry = 1u16;
    for byte in out.iter_mut().rev() {
        let sum = *byte as u16 + carry;
        *byte = sum as u8;
        carry = sum >> 8;
        if carry == 0 {
            break;
        }
    }
    if carry != 0 {
        out.insert(0, carry as u8);
    }
    out
}

/// base-256 magnitude - 1, big-endian (inverse of [`add_one`]).
fn sub_one(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for byte in out.iter_mut().rev() {
        if *byte == 0 {
            *byte = 0xff;
            continue;
        }
        *byte -= 1;
        break;
    }
    out
}

/// Convert a big-endian base-256 magnitude to decimal digit text, via
/// repeated division by 10.
fn to_decimal_digits(bytes: &[u8]) -> String {
    let mut digits_le = Vec::new();
    let mut work: Vec<u8> = bytes.to_vec();
    while work.iter().any(|&b| b != 0) {
        let mut remainder: u32 = 0;
        for byte in work.iter_mut() {
            let acc = remainder * 256 + *byte as u32;
            *byte = (acc / 10) as u8;
            remainder = acc % 10;
        }
        digits_le.push(b'0' + remainder as u8);
    }
    if digits_le.is_empty() {
        digits_le.push(b'0');
    }
    digits_le.reverse();
    String::from_utf8(digits_le).expect("ASCII digits")
}

/// Convert decimal digit text to a big-endian base-256 magnitude, via
/// repeated multiply-by-10-and-add.
fn from_decimal_digits(digits: &str) -> Vec<u8> {
    let mut magnitude: Vec<u8> = vec![0];
    for b in digits.bytes() {
        let digit = (b - b'0') as u32;
        let mut carry = digit;
        for byte in magnitude.iter_mut().rev() {
            let acc = *byte as u32 * 10 + carry;
            *byte = acc as u8;
            carry = acc >> 8;
        }
        if carry != 0 {
            magnitude.insert(0, carry as u8);
        }
    }
    while magnitude.len() > 1 && magnitude[0] == 0 {
        magnitude.remove(0);
    }
    magnitude
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_fraction_text() {
        let d = BigDecimal::new(BigInteger::from_decimal_str("27315").unwrap(), -2);
        assert_eq!(d.to_decimal_string(), "273.15");
    }

    #[test]
    fn decimal_fraction_parse_roundtrip() {
        let d = BigDecimal::from_decimal_str("273.15").unwrap();
        assert_eq!(d.mantissa().to_decimal_string(), "27315");
        assert_eq!(d.exponent(), -2);
        assert_eq!(d.to_decimal_string(), "273.15");
    }

    #[test]
    fn negative_bignum_logical_value() {
        // payload bytes asUnsigned == u64::MAX -> logical -1 - u64::MAX == -2^64
        // (spec §8 scenario 4: "stored argument ULong.MAX_VALUE")
        let bytes = [0xff; 8];
        let n = BigInteger::from_negative_bignum_bytes(&bytes);
        assert_eq!(n.to_decimal_string(), "-18446744073709551616");
    }

    #[test]
    fn big_integer_decimal_roundtrip() {
        let n = BigInteger::from_decimal_str("123456789012345678901234567890").unwrap();
        assert_eq!(n.to_decimal_string(), "123456789012345678901234567890");
    }
}
