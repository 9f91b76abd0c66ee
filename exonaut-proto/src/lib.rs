//! Wire protocol of the ExoNaut motor co-processor.
//!
//! The robot's ESP32 talks to a secondary microcontroller that drives the
//! encoder motors, samples the battery and decodes the IR remote. The link
//! is a plain UART (115200 baud, 8N1) with two unrelated encodings:
//!
//! - **Receive** (co-processor to controller): ASCII records terminated by
//!   `$`, classified by a leading tag byte. See [`record`].
//! - **Transmit** (controller to co-processor): fixed binary packets with a
//!   `0x55 0x55` sync header. See [`command`].
//!
//! This crate provides:
//!
//! - [`framer`]: splits the receive stream into records ([`Framer`])
//! - [`record`]: decodes records into typed [`Record`] values ([`parse_record`])
//! - [`command`]: encodes [`Command`] packets
//! - [`units`]: percent speed to native unit conversion, turn geometry
//! - [`hex`]: fixed-width ASCII hex decoding
//!
//! # Example
//!
//! ```
//! use exonaut_proto::{parse_record, Framer, Record};
//!
//! let mut framer = Framer::new();
//! let mut records = 0;
//! for &byte in b"A7F0000$V105$" {
//!     if let Ok(Some(frame)) = framer.push_byte(byte) {
//!         match parse_record(&frame) {
//!             Ok(Record::Telemetry { battery_raw, .. }) => assert_eq!(battery_raw, 0x7F),
//!             Ok(Record::Version(v)) => assert_eq!(v.as_str(), Some("105")),
//!             other => panic!("unexpected {:?}", other),
//!         }
//!         records += 1;
//!     }
//! }
//! assert_eq!(records, 2);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod framer;
pub mod hex;
pub mod record;
pub mod units;

/// Baud rate of the co-processor link.
pub const UART_BAUDRATE: u32 = 115_200;

pub use command::{
    Command, Packet, SerializeError, BUS_SERVO_PERIPHERAL_ID, MAX_PACKET_SIZE,
    MOTOR_PERIPHERAL_ID, SYNC_HEADER,
};
pub use framer::{Frame, FrameError, Framer, FRAME_TERMINATOR, MAX_RECORD_LENGTH};
pub use record::{parse_record, FirmwareVersion, ParseError, Record};
pub use units::MotorType;
