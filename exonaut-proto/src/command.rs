//! Binary command packets sent to the co-processor.
//!
//! Every packet starts with the `0x55 0x55` sync header followed by a length
//! byte (number of bytes after the header), a peripheral id, a command id and
//! the command payload.
//!
//! ```text
//! 55 55 <len> <peripheral> <command> <payload...>
//! ```
//!
//! # Example
//!
//! ```
//! use exonaut_proto::Command;
//!
//! let packet = Command::SetSpeed { native: [0, 0] }.encode();
//! assert_eq!(&packet[..], &[0x55, 0x55, 0x05, 55, 0x02, 0x00, 0x00]);
//! ```

use heapless::Vec;

use crate::units::{native_speed, MotorType};

/// Sync header preceding every packet.
pub const SYNC_HEADER: [u8; 2] = [0x55, 0x55];

/// Peripheral id of the encoder motor controller.
pub const MOTOR_PERIPHERAL_ID: u8 = 55;

/// Peripheral id of the serial bus servo port.
pub const BUS_SERVO_PERIPHERAL_ID: u8 = 0x03;

/// Motor controller command: select the motor type.
pub const CMD_MOTOR_TYPE: u8 = 0x01;

/// Motor controller command: set both wheel speeds.
pub const CMD_SET_SPEED: u8 = 0x02;

/// Motor controller command: report (and latch) encoder counters.
pub const CMD_QUERY_ENCODERS: u8 = 0x03;

/// Bus servo command: move to a pose.
pub const CMD_SERVO_POSE: u8 = 0x01;

/// Largest encoded packet (bus servo pose).
pub const MAX_PACKET_SIZE: usize = 10;

/// An encoded packet.
pub type Packet = Vec<u8, MAX_PACKET_SIZE>;

/// Error type for serialization operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerializeError {
    /// The output buffer is too small to hold the packet.
    BufferTooSmall,
}

impl core::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
        }
    }
}

/// A command for the co-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Select the encoder motor variant.
    SetMotorType(MotorType),
    /// Set both wheel speeds in native units (motor 1, motor 2).
    SetSpeed {
        /// Native speed per motor.
        native: [i8; 2],
    },
    /// Ask the co-processor to report its encoder counters.
    QueryEncoders,
    /// Move a serial bus servo.
    BusServoPose {
        /// Servo id on the bus.
        id: u8,
        /// Target position.
        position: u16,
        /// Move duration in milliseconds.
        time_ms: u16,
    },
}

impl Command {
    /// Speed command from percent-scale wheel speeds.
    #[must_use]
    pub fn speed_percent(motor1: f32, motor2: f32) -> Self {
        Self::SetSpeed {
            native: [native_speed(motor1), native_speed(motor2)],
        }
    }

    /// Total encoded size in bytes, sync header included.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        SYNC_HEADER.len() + 3 + self.payload_len()
    }

    const fn payload_len(&self) -> usize {
        match self {
            Self::SetMotorType(_) => 1,
            Self::SetSpeed { .. } => 2,
            Self::QueryEncoders => 0,
            Self::BusServoPose { .. } => 5,
        }
    }

    const fn address(&self) -> (u8, u8) {
        match self {
            Self::SetMotorType(_) => (MOTOR_PERIPHERAL_ID, CMD_MOTOR_TYPE),
            Self::SetSpeed { .. } => (MOTOR_PERIPHERAL_ID, CMD_SET_SPEED),
            Self::QueryEncoders => (MOTOR_PERIPHERAL_ID, CMD_QUERY_ENCODERS),
            Self::BusServoPose { .. } => (BUS_SERVO_PERIPHERAL_ID, CMD_SERVO_POSE),
        }
    }

    /// Serialize to the provided buffer.
    ///
    /// Returns the number of bytes written on success.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if the buffer is shorter
    /// than [`encoded_len`](Self::encoded_len).
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        let len = self.encoded_len();
        if buf.len() < len {
            return Err(SerializeError::BufferTooSmall);
        }

        let (peripheral, command) = self.address();
        buf[..2].copy_from_slice(&SYNC_HEADER);
        buf[2] = (len - SYNC_HEADER.len()) as u8;
        buf[3] = peripheral;
        buf[4] = command;

        let payload = &mut buf[5..len];
        match *self {
            Self::SetMotorType(motor_type) => payload[0] = motor_type.id(),
            Self::SetSpeed { native } => {
                payload[0] = native[0] as u8;
                payload[1] = native[1] as u8;
            }
            Self::QueryEncoders => {}
            Self::BusServoPose {
                id,
                position,
                time_ms,
            } => {
                payload[..2].copy_from_slice(&time_ms.to_le_bytes());
                payload[2] = id;
                payload[3..5].copy_from_slice(&position.to_le_bytes());
            }
        }

        Ok(len)
    }

    /// Encode into a fixed-capacity packet.
    #[must_use]
    pub fn encode(&self) -> Packet {
        let mut packet = Packet::new();
        let written = packet
            .resize(self.encoded_len(), 0)
            .ok()
            .and_then(|()| self.serialize(&mut packet).ok());
        debug_assert!(written.is_some(), "packet exceeds MAX_PACKET_SIZE");
        packet
    }
}
