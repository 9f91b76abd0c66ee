//! Serial link traits and error types.
//!
//! The co-processor link is split into a receive half, owned by the
//! background reader, and a transmit half, owned by the controller. Both are
//! abstracted so the driver runs against any UART (or a mock on host).

use core::future::Future;

/// Error type for link operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// UART/communication I/O error.
    Io,
    /// Receive FIFO overrun, bytes were lost.
    Overrun,
    /// UART framing error.
    Framing,
    /// The peripheral is gone or the link was closed.
    Disconnected,
}

/// Async receive half of the co-processor link.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait LinkRx {
    /// Wait until at least one byte is available and read as many as fit.
    ///
    /// Returns the number of bytes written to `buf` (never 0 on success).
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, LinkError>>;
}

/// Async transmit half of the co-processor link.
pub trait LinkTx {
    /// Write an entire packet.
    fn write_all(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), LinkError>>;
}
