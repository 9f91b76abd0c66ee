//! Shared telemetry state.
//!
//! One [`Telemetry`] value is created at start-up (usually as a `static`) and
//! shared by reference between the background reader, which writes decoded
//! records into it, and the controller, which reads it and stores commanded
//! speeds and encoder bases. Every accessor is a short critical section on an
//! `embassy_sync` blocking mutex, so multi-byte fields are never torn.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use exonaut_proto::units::NATIVE_PULSES_PER_REVOLUTION;
use exonaut_proto::{FirmwareVersion, Record};

use crate::controller::MotorSelect;
use crate::ir::{IrDebouncer, IrEvent};

/// Battery millivolts per raw ADC step.
pub const VOLTAGE_SCALE: f32 = 51.765;

/// Weight of the previous voltage in the exponential smoothing filter.
pub const VOLTAGE_SMOOTHING: f32 = 0.99;

/// Voltage sentinel before the first battery sample.
pub const VOLTAGE_UNSET: f32 = -1.0;

/// Point-in-time copy of the shared state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    /// Smoothed battery voltage in millivolts, [`VOLTAGE_UNSET`] until sampled.
    pub voltage: f32,
    /// Co-processor firmware version, once reported.
    pub firmware_version: Option<FirmwareVersion>,
    /// IR key currently held, 0 when idle.
    pub ir_key: u16,
    /// Consecutive repeats of the held IR key.
    pub ir_repeat_count: u16,
    /// Raw encoder counters for motor 1 and motor 2.
    pub encoder_count: [i32; 2],
    /// Counter values captured by the last encoder reset.
    pub encoder_count_base: [i32; 2],
    /// Commanded speeds, stored sign-inverted.
    pub speed: [f32; 2],
    /// Encoder pulses per wheel revolution for the configured motor type.
    pub pulses_per_revolution: u16,
    /// Set by every encoder report.
    pub counter_updated: bool,
    /// Number of encoder reports received (wrapping).
    pub encoder_generation: u32,
    /// Set when the co-processor acknowledges an action.
    pub action_finished: bool,
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecord {
    /// Initial state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            voltage: VOLTAGE_UNSET,
            firmware_version: None,
            ir_key: 0,
            ir_repeat_count: 0,
            encoder_count: [0; 2],
            encoder_count_base: [0; 2],
            speed: [0.0; 2],
            pulses_per_revolution: NATIVE_PULSES_PER_REVOLUTION as u16,
            counter_updated: false,
            encoder_generation: 0,
            action_finished: true,
        }
    }

    /// Encoder counts relative to the last reset.
    #[inline]
    #[must_use]
    pub fn relative_counts(&self) -> [i32; 2] {
        [
            self.encoder_count[0].wrapping_sub(self.encoder_count_base[0]),
            self.encoder_count[1].wrapping_sub(self.encoder_count_base[1]),
        ]
    }

    /// Wheel revolutions since the last reset.
    #[must_use]
    pub fn turns(&self) -> [f32; 2] {
        let ppr = f32::from(self.pulses_per_revolution.max(1));
        let [m1, m2] = self.relative_counts();
        [m1 as f32 / ppr, m2 as f32 / ppr]
    }
}

struct Inner {
    record: TelemetryRecord,
    ir: IrDebouncer,
}

impl Inner {
    const fn new() -> Self {
        Self {
            record: TelemetryRecord::new(),
            ir: IrDebouncer::new(),
        }
    }
}

/// Shared telemetry context.
///
/// Use `CriticalSectionRawMutex` when the reader and controller run in
/// different executors or interrupt priorities, `NoopRawMutex` on a single
/// thread.
pub struct Telemetry<M: RawMutex> {
    inner: Mutex<M, RefCell<Inner>>,
}

impl<M: RawMutex> Default for Telemetry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> Telemetry<M> {
    /// Create the initial state.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner::new())),
        }
    }

    /// Create state with a custom IR long-press threshold.
    pub const fn with_ir_threshold(threshold: u16) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                record: TelemetryRecord::new(),
                ir: IrDebouncer::with_threshold(threshold),
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Copy of the whole state.
    pub fn snapshot(&self) -> TelemetryRecord {
        self.with(|inner| {
            let mut record = inner.record;
            record.ir_key = inner.ir.key();
            record.ir_repeat_count = inner.ir.repeat_count();
            record
        })
    }

    /// Apply a decoded record.
    ///
    /// Returns the IR event produced by a telemetry record, if any.
    pub fn apply(&self, record: &Record) -> Option<IrEvent> {
        match *record {
            Record::Telemetry {
                battery_raw,
                ir_code,
            } => {
                self.record_battery(battery_raw);
                self.update_ir(ir_code)
            }
            Record::ActionComplete => {
                self.set_action_finished(true);
                None
            }
            Record::Version(version) => {
                self.set_version(version);
                None
            }
            Record::Info | Record::Status => None,
            Record::Encoder { counts } => {
                self.record_encoders(counts);
                None
            }
        }
    }

    /// Smoothed battery voltage in millivolts, `None` before the first sample.
    pub fn battery_millivolts(&self) -> Option<f32> {
        let voltage = self.with(|inner| inner.record.voltage);
        (voltage >= 0.0).then_some(voltage)
    }

    /// Feed one raw battery ADC sample into the smoothing filter.
    pub fn record_battery(&self, raw: u8) {
        let sample = f32::from(raw) * VOLTAGE_SCALE;
        self.with(|inner| {
            let voltage = &mut inner.record.voltage;
            *voltage = if *voltage < 0.0 {
                sample
            } else {
                *voltage * VOLTAGE_SMOOTHING + sample * (1.0 - VOLTAGE_SMOOTHING)
            };
        });
    }

    /// Store the co-processor firmware version.
    pub fn set_version(&self, version: FirmwareVersion) {
        self.with(|inner| inner.record.firmware_version = Some(version));
    }

    /// Co-processor firmware version, once reported.
    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.with(|inner| inner.record.firmware_version)
    }

    /// Store raw encoder counters from a report.
    pub fn record_encoders(&self, counts: [i32; 2]) {
        self.with(|inner| {
            let record = &mut inner.record;
            record.encoder_count = counts;
            record.counter_updated = true;
            record.encoder_generation = record.encoder_generation.wrapping_add(1);
        });
    }

    /// Number of encoder reports received so far (wrapping).
    pub fn encoder_generation(&self) -> u32 {
        self.with(|inner| inner.record.encoder_generation)
    }

    /// Read and clear the counter-updated flag.
    pub fn take_counter_updated(&self) -> bool {
        self.with(|inner| core::mem::take(&mut inner.record.counter_updated))
    }

    /// Raw encoder counters.
    pub fn encoder_counts(&self) -> [i32; 2] {
        self.with(|inner| inner.record.encoder_count)
    }

    /// Capture the current raw counters as the zero point of the selected
    /// motors.
    pub fn rebase_encoders(&self, motor: MotorSelect) {
        self.with(|inner| {
            let record = &mut inner.record;
            for index in motor.indices() {
                record.encoder_count_base[index] = record.encoder_count[index];
            }
        });
    }

    /// Wheel revolutions since the last reset, motor 1 then motor 2.
    pub fn encoder_turns(&self) -> [f32; 2] {
        self.with(|inner| inner.record.turns())
    }

    /// Remember the commanded speeds (stored sign-inverted).
    pub fn store_speed(&self, motor1: f32, motor2: f32) {
        self.with(|inner| inner.record.speed = [-motor1, -motor2]);
    }

    /// Last commanded speeds, motor 1 then motor 2.
    pub fn motor_speeds(&self) -> [f32; 2] {
        let [m1, m2] = self.with(|inner| inner.record.speed);
        [-m1, -m2]
    }

    /// Encoder pulses per wheel revolution.
    pub fn pulses_per_revolution(&self) -> u16 {
        self.with(|inner| inner.record.pulses_per_revolution)
    }

    /// Set encoder pulses per wheel revolution.
    pub fn set_pulses_per_revolution(&self, pulses: u16) {
        self.with(|inner| inner.record.pulses_per_revolution = pulses);
    }

    /// Whether the co-processor has acknowledged the last action.
    pub fn action_finished(&self) -> bool {
        self.with(|inner| inner.record.action_finished)
    }

    /// Set or clear the action-finished flag.
    pub fn set_action_finished(&self, finished: bool) {
        self.with(|inner| inner.record.action_finished = finished);
    }

    /// IR key currently held, 0 when idle.
    pub fn ir_key(&self) -> u16 {
        self.with(|inner| inner.ir.key())
    }

    /// Consecutive repeats of the held IR key.
    pub fn ir_repeat_count(&self) -> u16 {
        self.with(|inner| inner.ir.repeat_count())
    }

    /// Feed one IR code sample into the debouncer.
    pub fn update_ir(&self, code: u16) -> Option<IrEvent> {
        self.with(|inner| inner.ir.update(code))
    }
}
