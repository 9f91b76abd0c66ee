//! Record parser for co-processor reports.
//!
//! A record is classified by its leading tag byte and its length:
//!
//! | Tag | Length | Layout | Meaning |
//! |-----|--------|--------|---------|
//! | `A` | 7 | `A` + 2 hex battery ADC + 4 hex IR code | Battery and IR telemetry |
//! | `A` | 3 | `A` + 2 filler chars | Previous action complete |
//! | `V` | 4 | `V` + 3 version chars | Firmware version |
//! | `E` | 19 | `EMM` + 16 hex | Encoder counters |
//! | `I`, `S` | any | - | Acknowledged, no payload |
//!
//! Lengths exclude the `$` terminator, which the [`Framer`](crate::Framer)
//! strips.

use crate::hex::{hex_u64, hex_u8};

/// Record length of a battery/IR telemetry report.
pub const TELEMETRY_RECORD_LEN: usize = 7;

/// Record length of an action-complete acknowledgement.
pub const ACK_RECORD_LEN: usize = 3;

/// Record length of a firmware version report.
pub const VERSION_RECORD_LEN: usize = 4;

/// Record length of an encoder report.
pub const ENCODER_RECORD_LEN: usize = 19;

/// Number of characters in a firmware version string.
pub const VERSION_LEN: usize = VERSION_RECORD_LEN - 1;

/// Sub-header that follows the `E` tag in encoder reports.
const ENCODER_HEADER: &[u8; 2] = b"MM";

/// Firmware version reported by the co-processor (three raw characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion(pub [u8; VERSION_LEN]);

impl FirmwareVersion {
    /// Raw version bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Version as text, if the co-processor sent valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.0).ok()
    }
}

/// A decoded co-processor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub enum Record {
    /// Battery ADC sample and the IR remote code currently seen.
    Telemetry {
        /// Raw battery ADC reading.
        battery_raw: u8,
        /// IR remote code, 0 when no key is held.
        ir_code: u16,
    },
    /// The co-processor finished the previous action.
    ActionComplete,
    /// Firmware version string.
    Version(FirmwareVersion),
    /// Info report (no payload is interpreted).
    Info,
    /// Status report (no payload is interpreted).
    Status,
    /// Encoder counters for motor 1 and motor 2, already sign-corrected to
    /// the controller's orientation.
    Encoder {
        /// Counts for motor 1 and motor 2.
        counts: [i32; 2],
    },
}

/// Record parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Zero-length record.
    Empty,
    /// Leading tag byte is not a known record type.
    UnknownTag(u8),
    /// Known tag with a length that matches none of its shapes.
    BadLength {
        /// The record tag.
        tag: u8,
        /// The record length, terminator excluded.
        len: usize,
    },
    /// Encoder record without the `MM` sub-header.
    BadHeader,
    /// A hex field contained a non-hex character.
    BadHex,
}

/// Parse one framed record (terminator already stripped).
///
/// # Example
///
/// ```
/// use exonaut_proto::{parse_record, Record};
///
/// let record = parse_record(b"A7F0000").unwrap();
/// assert_eq!(record, Record::Telemetry { battery_raw: 0x7F, ir_code: 0 });
///
/// assert_eq!(parse_record(b"A00").unwrap(), Record::ActionComplete);
/// ```
pub fn parse_record(frame: &[u8]) -> Result<Record, ParseError> {
    let (&tag, _) = frame.split_first().ok_or(ParseError::Empty)?;

    match (tag, frame.len()) {
        (b'A', TELEMETRY_RECORD_LEN) => parse_telemetry(frame),
        (b'A', ACK_RECORD_LEN) => Ok(Record::ActionComplete),
        (b'V', VERSION_RECORD_LEN) => {
            let mut version = [0u8; VERSION_LEN];
            version.copy_from_slice(&frame[1..]);
            Ok(Record::Version(FirmwareVersion(version)))
        }
        (b'I', _) => Ok(Record::Info),
        (b'S', _) => Ok(Record::Status),
        (b'E', ENCODER_RECORD_LEN) => parse_encoder(frame),
        (b'A' | b'V' | b'E', len) => Err(ParseError::BadLength { tag, len }),
        _ => Err(ParseError::UnknownTag(tag)),
    }
}

/// `A` + battery pair + IR low pair + IR high pair.
fn parse_telemetry(frame: &[u8]) -> Result<Record, ParseError> {
    let battery_raw = hex_u8(&frame[1..3]).ok_or(ParseError::BadHex)?;
    let ir_low = hex_u8(&frame[3..5]).ok_or(ParseError::BadHex)?;
    let ir_high = hex_u8(&frame[5..7]).ok_or(ParseError::BadHex)?;

    Ok(Record::Telemetry {
        battery_raw,
        ir_code: u16::from_le_bytes([ir_low, ir_high]),
    })
}

/// `EMM` + 16 hex digits.
///
/// The co-processor prints its two little-endian `i32` counters as one
/// byte-reversed 8-byte hex string: the last eight digits are motor 1, the
/// first eight motor 2, each most significant digit first.
fn parse_encoder(frame: &[u8]) -> Result<Record, ParseError> {
    if &frame[1..3] != ENCODER_HEADER {
        return Err(ParseError::BadHeader);
    }

    let raw = hex_u64(&frame[3..]).ok_or(ParseError::BadHex)?;
    let motor1 = raw as u32 as i32;
    let motor2 = (raw >> 32) as u32 as i32;

    Ok(Record::Encoder {
        counts: [motor1.wrapping_neg(), motor2.wrapping_neg()],
    })
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn test_parse_telemetry() {
        let record = parse_record(b"A7F2B3C").unwrap();
        assert_eq!(
            record,
            Record::Telemetry {
                battery_raw: 0x7F,
                ir_code: 0x3C2B,
            }
        );
    }

    #[test]
    fn test_parse_telemetry_lowercase_hex() {
        let record = parse_record(b"Aff0a00").unwrap();
        assert_eq!(
            record,
            Record::Telemetry {
                battery_raw: 0xFF,
                ir_code: 0x000A,
            }
        );
    }

    #[test]
    fn test_parse_telemetry_bad_hex() {
        assert_eq!(parse_record(b"AZZ0000"), Err(ParseError::BadHex));
        assert_eq!(parse_record(b"A0000G0"), Err(ParseError::BadHex));
    }

    #[test]
    fn test_parse_action_complete() {
        assert_eq!(parse_record(b"AOK").unwrap(), Record::ActionComplete);
    }

    #[test]
    fn test_parse_a_wrong_length() {
        assert_eq!(
            parse_record(b"A1A2B3C4"),
            Err(ParseError::BadLength { tag: b'A', len: 8 })
        );
        assert_eq!(
            parse_record(b"A1"),
            Err(ParseError::BadLength { tag: b'A', len: 2 })
        );
    }

    #[test]
    fn test_parse_version() {
        let record = parse_record(b"V105").unwrap();
        let Record::Version(version) = record else {
            panic!("expected version record, got {:?}", record);
        };
        assert_eq!(version.as_str(), Some("105"));
        assert_eq!(version.as_bytes(), b"105");
    }

    #[test]
    fn test_parse_version_wrong_length() {
        assert_eq!(
            parse_record(b"V1.0.5"),
            Err(ParseError::BadLength { tag: b'V', len: 6 })
        );
    }

    #[test]
    fn test_parse_info_and_status() {
        assert_eq!(parse_record(b"IROK").unwrap(), Record::Info);
        assert_eq!(parse_record(b"I").unwrap(), Record::Info);
        assert_eq!(parse_record(b"S1234").unwrap(), Record::Status);
    }

    #[test]
    fn test_parse_encoder_zero() {
        let record = parse_record(b"EMM0000000000000000").unwrap();
        assert_eq!(record, Record::Encoder { counts: [0, 0] });
    }

    #[test]
    fn test_parse_encoder_groups() {
        // First group is motor 2, second group motor 1; both negated.
        let record = parse_record(b"EMM0000000100000002").unwrap();
        assert_eq!(record, Record::Encoder { counts: [-2, -1] });
    }

    #[test]
    fn test_parse_encoder_negative_raw() {
        // Raw -100 for motor 1 (0xFFFFFF9C) becomes +100.
        let record = parse_record(b"EMM00000400FFFFFF9C").unwrap();
        assert_eq!(record, Record::Encoder { counts: [100, -1024] });
    }

    #[test]
    fn test_parse_encoder_matches_byte_reversed_groups() {
        for (m1, m2) in [(1i32, -1i32), (123_456, -654_321), (i32::MAX, 0x0102_0304)] {
            // Co-processor memory: m1 then m2, little-endian, printed reversed.
            let mut bytes = [0u8; 8];
            bytes[..4].copy_from_slice(&m1.to_le_bytes());
            bytes[4..].copy_from_slice(&m2.to_le_bytes());
            let mut line = std::string::String::from("EMM");
            for b in bytes.iter().rev() {
                line.push_str(&format!("{:02X}", b));
            }

            let record = parse_record(line.as_bytes()).unwrap();
            assert_eq!(record, Record::Encoder { counts: [-m1, -m2] });
        }
    }

    #[test]
    fn test_parse_encoder_bad_header() {
        assert_eq!(
            parse_record(b"EXX0000000000000000"),
            Err(ParseError::BadHeader)
        );
    }

    #[test]
    fn test_parse_encoder_bad_hex() {
        assert_eq!(
            parse_record(b"EMM00000000000000Q0"),
            Err(ParseError::BadHex)
        );
    }

    #[test]
    fn test_parse_encoder_wrong_length() {
        assert_eq!(
            parse_record(b"EMM00000000"),
            Err(ParseError::BadLength { tag: b'E', len: 11 })
        );
    }

    #[test]
    fn test_parse_unknown_tag() {
        assert_eq!(parse_record(b"X123"), Err(ParseError::UnknownTag(b'X')));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_record(b""), Err(ParseError::Empty));
    }
}
