//! ExoNaut main controller firmware for ESP32.
//!
//! This crate provides the embedded glue between the ESP32 UART and the
//! platform-agnostic driver in [`exonaut_core`].
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | UART2 RX | 16   | Records from the motor co-processor |
//! | UART2 TX | 17   | Command packets to the motor co-processor |
//!
//! The link runs at 115200 baud, 8N1.
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with two concurrent tasks:
//!
//! - **Reader Task**: Reads UART data, frames and parses records, updates
//!   the shared [`Telemetry`] and queues IR remote events
//! - **Control Task** (main): Starts the co-processor, reacts to IR events
//!   and polls the encoders
//!
//! Both share one [`Telemetry`] behind a `CriticalSectionRawMutex`; IR
//! events travel over a bounded [`IrChannel`] that drops on full.
//!
//! # Modules
//!
//! - [`uart_link`]: UART halves as link endpoints ([`UartLinkRx`], [`UartLinkTx`])
//!
//! # Re-exports
//!
//! This crate re-exports the main [`exonaut_core`] items for convenience.

#![no_std]

pub use exonaut_core::{
    AckPolicy, ControlError, ControllerConfig, Exonaut, IrChannel, IrEvent, IrEventKind,
    LinkError, LinkReader, MotorSelect, Telemetry,
};

pub mod uart_link;

pub use uart_link::{UartLinkRx, UartLinkTx};

