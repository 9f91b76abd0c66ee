//! ASCII hex decoding for co-processor records.
//!
//! All co-processor numbers travel as uppercase or lowercase hex digit pairs.
//! These helpers decode fixed-width fields without allocation and report
//! `None` on any non-hex character.

/// Convert a hex character to its value.
#[inline]
#[must_use]
pub const fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Decode a 2-character hex pair (high nibble first) as u8.
#[inline]
#[must_use]
pub fn hex_u8(s: &[u8]) -> Option<u8> {
    match s {
        [high, low] => Some((hex_digit(*high)? << 4) | hex_digit(*low)?),
        _ => None,
    }
}

/// Decode an arbitrary run of hex digits as a big-endian u64.
///
/// Returns `None` for an empty slice, more than 16 digits, or any
/// non-hex character.
#[must_use]
pub fn hex_u64(s: &[u8]) -> Option<u64> {
    if s.is_empty() || s.len() > 16 {
        return None;
    }
    s.iter().try_fold(0u64, |acc, &b| {
        hex_digit(b).map(|digit| (acc << 4) | u64::from(digit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_digit() {
        assert_eq!(hex_digit(b'0'), Some(0));
        assert_eq!(hex_digit(b'9'), Some(9));
        assert_eq!(hex_digit(b'A'), Some(10));
        assert_eq!(hex_digit(b'f'), Some(15));
        assert_eq!(hex_digit(b'G'), None);
        assert_eq!(hex_digit(b'$'), None);
    }

    #[test]
    fn test_hex_u8() {
        assert_eq!(hex_u8(b"00"), Some(0x00));
        assert_eq!(hex_u8(b"7F"), Some(0x7F));
        assert_eq!(hex_u8(b"fe"), Some(0xFE));
        assert_eq!(hex_u8(b"F"), None);
        assert_eq!(hex_u8(b"FFF"), None);
        assert_eq!(hex_u8(b"Z0"), None);
    }

    #[test]
    fn test_hex_u64() {
        assert_eq!(hex_u64(b"1"), Some(1));
        assert_eq!(hex_u64(b"0000000100000002"), Some(0x0000_0001_0000_0002));
        assert_eq!(hex_u64(b"FFFFFFFFFFFFFFFF"), Some(u64::MAX));
        assert_eq!(hex_u64(b""), None);
        assert_eq!(hex_u64(b"00000000000000000"), None);
        assert_eq!(hex_u64(b"00x0"), None);
    }
}
