//! Motor command API.
//!
//! [`Exonaut`] owns the transmit half of the link and a delay source, and
//! shares the [`Telemetry`] context with the background reader. Commands are
//! encoded with [`exonaut_proto::Command`] and written immediately; encoder
//! round-trips wait for the co-processor's report according to the
//! configured [`AckPolicy`].

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use exonaut_proto::units::{turn_duration_ms, turn_motor_speed};
use exonaut_proto::{Command, FirmwareVersion, MotorType};

use crate::link::{LinkError, LinkTx};
use crate::telemetry::Telemetry;

/// Pause between the steps of the start-up sequence.
pub const STARTUP_STEP_MS: u32 = 100;

/// Motor selection for per-motor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorSelect {
    /// Both motors.
    #[default]
    Both,
    /// Motor 1 only.
    Motor1,
    /// Motor 2 only.
    Motor2,
}

impl MotorSelect {
    /// Map a numeric motor id (0 = both, 1, 2).
    ///
    /// Any other id selects both motors.
    #[must_use]
    pub const fn from_id(id: u8) -> Self {
        match id {
            1 => Self::Motor1,
            2 => Self::Motor2,
            _ => Self::Both,
        }
    }

    /// Whether motor 1 is selected.
    #[inline]
    #[must_use]
    pub const fn includes_motor1(self) -> bool {
        matches!(self, Self::Both | Self::Motor1)
    }

    /// Whether motor 2 is selected.
    #[inline]
    #[must_use]
    pub const fn includes_motor2(self) -> bool {
        matches!(self, Self::Both | Self::Motor2)
    }

    /// Selected motor indices (0 = motor 1, 1 = motor 2).
    pub fn indices(self) -> impl Iterator<Item = usize> {
        [self.includes_motor1(), self.includes_motor2()]
            .into_iter()
            .enumerate()
            .filter_map(|(index, selected)| selected.then_some(index))
    }
}

/// How encoder queries wait for the co-processor's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckPolicy {
    /// Poll until a new encoder report arrives, failing after the settle
    /// time.
    ///
    /// Reports carry no sequence number, so any report applied after the
    /// query was issued ends the wait. A report already in flight while the
    /// query is being written is indistinguishable from the answer and may
    /// carry counts from before the query.
    #[default]
    AwaitReport,
    /// Sleep for the settle time and use whatever counts are stored.
    FixedDelay,
}

/// Controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Maximum wait for an encoder report, in milliseconds.
    pub settle_ms: u32,
    /// Poll step while awaiting a report, in milliseconds.
    pub ack_poll_ms: u32,
    /// Encoder query wait strategy.
    pub ack_policy: AckPolicy,
    /// Motor type selected by [`Exonaut::begin`].
    pub motor_type: MotorType,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            settle_ms: 30,
            ack_poll_ms: 2,
            ack_policy: AckPolicy::AwaitReport,
            motor_type: MotorType::Standard,
        }
    }
}

/// Error type for controller operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// Writing to the link failed.
    Link(LinkError),
    /// No encoder report arrived within the settle time.
    Timeout,
}

impl From<LinkError> for ControlError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

/// Driver for the ExoNaut motor co-processor.
pub struct Exonaut<'a, T, D, M: RawMutex> {
    link: T,
    delay: D,
    telemetry: &'a Telemetry<M>,
    config: ControllerConfig,
}

impl<'a, T: LinkTx, D: DelayNs, M: RawMutex> Exonaut<'a, T, D, M> {
    /// Create a controller with the default configuration.
    pub fn new(link: T, delay: D, telemetry: &'a Telemetry<M>) -> Self {
        Self::with_config(link, delay, telemetry, ControllerConfig::default())
    }

    /// Create a controller with a custom configuration.
    pub fn with_config(
        link: T,
        delay: D,
        telemetry: &'a Telemetry<M>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            link,
            delay,
            telemetry,
            config,
        }
    }

    /// Bring the co-processor into a known state: motors stopped, encoders
    /// zeroed, motor type configured.
    ///
    /// A silent co-processor during the encoder reset is logged and
    /// tolerated; link failures are returned.
    pub async fn begin(&mut self) -> Result<(), ControlError> {
        info!("starting motor co-processor");
        self.set_speed(0.0, 0.0).await?;
        self.delay.delay_ms(STARTUP_STEP_MS).await;
        match self.reset_encoder_counter(MotorSelect::Both).await {
            Err(ControlError::Timeout) => warn!("no encoder report during start-up"),
            other => other?,
        }
        self.delay.delay_ms(STARTUP_STEP_MS).await;
        self.set_motor_type(self.config.motor_type).await?;
        self.delay.delay_ms(STARTUP_STEP_MS).await;
        Ok(())
    }

    async fn send(&mut self, command: Command) -> Result<(), ControlError> {
        trace!("tx {:?}", command);
        let packet = command.encode();
        self.link.write_all(&packet).await.map_err(|e| {
            error!("link write failed: {:?}", e);
            ControlError::Link(e)
        })
    }

    /// Set both wheel speeds in percent (motor 1, motor 2).
    pub async fn set_speed(&mut self, motor1: f32, motor2: f32) -> Result<(), ControlError> {
        self.telemetry.store_speed(motor1, motor2);
        self.send(Command::speed_percent(motor1, motor2)).await
    }

    /// Set one motor's speed, or both, keeping the other motor's commanded
    /// speed.
    pub async fn set_motor_speed(
        &mut self,
        motor: MotorSelect,
        speed: f32,
    ) -> Result<(), ControlError> {
        let [current1, current2] = self.telemetry.motor_speeds();
        let motor1 = if motor.includes_motor1() { speed } else { current1 };
        let motor2 = if motor.includes_motor2() { speed } else { current2 };
        self.set_speed(motor1, motor2).await
    }

    /// Last commanded speeds, motor 1 then motor 2.
    pub fn motor_speeds(&self) -> [f32; 2] {
        self.telemetry.motor_speeds()
    }

    /// Stop the selected motors, keeping any other motor running.
    pub async fn stop_motor(&mut self, motor: MotorSelect) -> Result<(), ControlError> {
        self.set_motor_speed(motor, 0.0).await
    }

    /// Select the encoder motor variant and its pulses per revolution.
    pub async fn set_motor_type(&mut self, motor_type: MotorType) -> Result<(), ControlError> {
        self.send(Command::SetMotorType(motor_type)).await?;
        self.telemetry
            .set_pulses_per_revolution(motor_type.pulses_per_revolution());
        debug!("motor type {:?}", motor_type);
        Ok(())
    }

    /// Start pivoting `angle` degrees (positive = left) at `speed`.
    ///
    /// Returns the estimated duration in milliseconds. The motors keep
    /// turning until the caller changes the speed.
    pub async fn turn_start(&mut self, speed: f32, angle: f32) -> Result<u32, ControlError> {
        let motor = turn_motor_speed(speed, angle);
        self.set_speed(motor, -motor).await?;
        Ok(turn_duration_ms(speed, angle))
    }

    /// Start a pivot and wait for its estimated duration.
    ///
    /// The motors are left running, as with [`turn_start`](Self::turn_start).
    pub async fn turn(&mut self, speed: f32, angle: f32) -> Result<(), ControlError> {
        let ms = self.turn_start(speed, angle).await?;
        self.delay.delay_ms(ms).await;
        Ok(())
    }

    /// Ask for fresh counters and wait per the configured [`AckPolicy`].
    async fn query_encoders(&mut self) -> Result<(), ControlError> {
        let generation = self.telemetry.encoder_generation();
        self.send(Command::QueryEncoders).await?;

        match self.config.ack_policy {
            AckPolicy::FixedDelay => {
                self.delay.delay_ms(self.config.settle_ms).await;
                Ok(())
            }
            AckPolicy::AwaitReport => {
                let step = self.config.ack_poll_ms.max(1);
                let mut waited = 0;
                while self.telemetry.encoder_generation() == generation {
                    if waited >= self.config.settle_ms {
                        warn!("encoder report timed out after {:?} ms", waited);
                        return Err(ControlError::Timeout);
                    }
                    self.delay.delay_ms(step).await;
                    waited += step;
                }
                Ok(())
            }
        }
    }

    /// Zero the encoder counters of the selected motors.
    ///
    /// On [`ControlError::Timeout`] the new zero point is still taken from
    /// the last known counters.
    pub async fn reset_encoder_counter(&mut self, motor: MotorSelect) -> Result<(), ControlError> {
        let result = self.query_encoders().await;
        if let Err(ControlError::Link(e)) = result {
            return Err(ControlError::Link(e));
        }
        self.telemetry.rebase_encoders(motor);
        result
    }

    /// Wheel revolutions since the last reset, motor 1 then motor 2.
    pub async fn read_encoder_count(&mut self) -> Result<[f32; 2], ControlError> {
        self.query_encoders().await?;
        Ok(self.telemetry.encoder_turns())
    }

    /// Initialise the serial bus servo port.
    pub async fn begin_bus_servo(&mut self) -> Result<(), ControlError> {
        self.bus_servo_set_pose(0, 0, 0).await
    }

    /// Move bus servo `id` to `position` over `time_ms` milliseconds.
    pub async fn bus_servo_set_pose(
        &mut self,
        id: u8,
        position: u16,
        time_ms: u16,
    ) -> Result<(), ControlError> {
        self.send(Command::BusServoPose {
            id,
            position,
            time_ms,
        })
        .await
    }

    /// Smoothed battery voltage in millivolts, `None` before the first sample.
    pub fn battery_millivolts(&self) -> Option<f32> {
        self.telemetry.battery_millivolts()
    }

    /// Co-processor firmware version, once reported.
    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.telemetry.firmware_version()
    }

    /// Whether the co-processor has acknowledged the last action.
    pub fn action_finished(&self) -> bool {
        self.telemetry.action_finished()
    }

    /// Shared telemetry context.
    pub fn telemetry(&self) -> &'a Telemetry<M> {
        self.telemetry
    }

    /// Active configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Get a reference to the link.
    pub fn link(&self) -> &T {
        &self.link
    }

    /// Get a mutable reference to the link.
    pub fn link_mut(&mut self) -> &mut T {
        &mut self.link
    }

    /// Decompose the controller into its link and delay.
    pub fn into_parts(self) -> (T, D) {
        (self.link, self.delay)
    }
}
