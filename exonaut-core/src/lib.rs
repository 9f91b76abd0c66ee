//! Platform-agnostic driver for the ExoNaut motor co-processor.
//!
//! This crate builds on [`exonaut_proto`] and adds everything that needs
//! state or async I/O, without any platform-specific dependencies. It runs
//! on the robot under embassy and on host for testing.
//!
//! # Overview
//!
//! - [`link`]: receive/transmit traits for the UART ([`LinkRx`], [`LinkTx`])
//! - [`telemetry`]: shared state written by the reader ([`Telemetry`])
//! - [`ir`]: IR remote debouncing ([`IrDebouncer`], [`IrEvent`])
//! - [`reader`]: background receive pipeline ([`LinkReader`])
//! - [`controller`]: motor, encoder and bus servo commands ([`Exonaut`])
//!
//! A firmware creates one [`Telemetry`] and one [`IrChannel`] as statics,
//! spawns a task running [`LinkReader::run`] on the receive half and drives
//! the robot through an [`Exonaut`] on the transmit half.
//!
//! # Example
//!
//! ```rust
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use exonaut_core::{IrEventKind, Telemetry};
//! use exonaut_proto::parse_record;
//!
//! let telemetry = Telemetry::<NoopRawMutex>::new();
//! let event = telemetry.apply(&parse_record(b"A7F4500").unwrap());
//!
//! assert!(telemetry.battery_millivolts().is_some());
//! assert_eq!(event.map(|e| e.kind), Some(IrEventKind::Press));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt (for embedded logging)
//! - **`log`**: Log through the `log` facade
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod controller;
pub mod ir;
pub mod link;
pub mod reader;
pub mod telemetry;

#[cfg(test)]
mod test_support;

// Re-export main types at crate root
pub use controller::{AckPolicy, ControlError, ControllerConfig, Exonaut, MotorSelect};
pub use ir::{
    IrDebouncer, IrEvent, IrEventKind, IrState, LONG_PRESS_THRESHOLD, MAX_LONG_PRESS_THRESHOLD,
};
pub use link::{LinkError, LinkRx, LinkTx};
pub use reader::{
    IrChannel, IrReceiver, IrSender, LinkReader, ReaderError, ReaderStats, IR_QUEUE_DEPTH,
};
pub use telemetry::{Telemetry, TelemetryRecord};
