//! Physical-to-native unit conversion for the motor co-processor.
//!
//! Callers express wheel speed as a percentage (roughly -100..100). The
//! co-processor expects a signed pulse count per 10 ms sample. The
//! conversion chain is:
//!
//! ```text
//! percent -> deg/s equivalent (x 90/55) -> rev/s (/ 60, sign flipped)
//!         -> pulses/s (x 680) -> native (x 0.01, rounded)
//! ```

/// Encoder pulses per wheel revolution used by the native speed unit.
pub const NATIVE_PULSES_PER_REVOLUTION: f32 = 680.0;

/// Gain from requested wheel speed to pivot speed in a turn.
pub const TURN_SPEED_GAIN: f32 = 0.2988;

/// Encoder motor variant fitted to the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorType {
    /// Stock TT gear motor, 680 pulses per revolution.
    #[default]
    Standard = 1,
    /// High-ratio gear motor, 1431 pulses per revolution.
    HighResolution = 2,
}

impl MotorType {
    /// Protocol id sent in the motor-type command.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Look up a motor type by protocol id.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Standard),
            2 => Some(Self::HighResolution),
            _ => None,
        }
    }

    /// Encoder pulses per output shaft revolution.
    #[inline]
    #[must_use]
    pub const fn pulses_per_revolution(self) -> u16 {
        match self {
            Self::Standard => 680,
            Self::HighResolution => 1400 + 31,
        }
    }
}

/// Convert a percent-scale speed into the co-processor's native unit.
///
/// Values outside the signed byte range wrap like the co-processor's own
/// byte truncation; no clamping happens here.
///
/// ```
/// use exonaut_proto::units::native_speed;
///
/// assert_eq!(native_speed(0.0), 0);
/// assert_eq!(native_speed(55.0), -10);
/// assert_eq!(native_speed(-55.0), 10);
/// ```
#[must_use]
pub fn native_speed(percent: f32) -> i8 {
    let deg_per_sec = percent / 55.0 * 90.0;
    let rev_per_sec = -deg_per_sec / 60.0;
    let pulses_per_sec = rev_per_sec * NATIVE_PULSES_PER_REVOLUTION;
    libm::roundf(pulses_per_sec * 0.01) as i32 as i8
}

/// Per-motor pivot speed for a turn of `angle` degrees at `speed`.
///
/// Positive angles drive motor 1 forward; the caller mirrors the value for
/// motor 2.
#[inline]
#[must_use]
pub fn turn_motor_speed(speed: f32, angle: f32) -> f32 {
    if angle > 0.0 {
        TURN_SPEED_GAIN * speed
    } else {
        -TURN_SPEED_GAIN * speed
    }
}

/// Estimated time in milliseconds to pivot `angle` degrees at `speed`.
///
/// A zero speed never completes a turn and yields 0.
#[must_use]
pub fn turn_duration_ms(speed: f32, angle: f32) -> u32 {
    let speed = libm::fabsf(speed);
    if speed == 0.0 {
        return 0;
    }
    let ms = libm::fabsf(angle) / speed * 1000.0;
    if ms >= u32::MAX as f32 {
        u32::MAX
    } else {
        ms as u32
    }
}
