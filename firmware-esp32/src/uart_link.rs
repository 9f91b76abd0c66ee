//! UART halves as co-processor link endpoints.
//!
//! Wraps the async esp-hal UART halves so the reader and controller in
//! [`exonaut_core`] can own them.

use embedded_io_async::{Read, Write};
use esp_hal::uart::{Error as UartError, UartRx, UartTx};
use esp_hal::Async;
use exonaut_core::{LinkError, LinkRx, LinkTx};

/// Convert UART errors to [`LinkError`].
///
/// This is a helper function instead of a `From` impl to avoid orphan rule issues
/// (both `UartError` and `LinkError` are defined in external crates).
#[inline]
fn uart_error_to_link_error(e: UartError) -> LinkError {
    match e {
        UartError::RxFifoOvf => LinkError::Overrun,
        UartError::RxFrameError => LinkError::Framing,
        _ => LinkError::Io,
    }
}

/// Receive half of the co-processor link.
pub struct UartLinkRx<'d> {
    rx: UartRx<'d, Async>,
}

impl<'d> UartLinkRx<'d> {
    /// Create a link endpoint from the given UART receiver.
    #[must_use]
    pub fn new(rx: UartRx<'d, Async>) -> Self {
        Self { rx }
    }
}

impl LinkRx for UartLinkRx<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        loop {
            let n = Read::read(&mut self.rx, buf)
                .await
                .map_err(uart_error_to_link_error)?;
            if n > 0 {
                return Ok(n);
            }
        }
    }
}

/// Transmit half of the co-processor link.
pub struct UartLinkTx<'d> {
    tx: UartTx<'d, Async>,
}

impl<'d> UartLinkTx<'d> {
    /// Create a link endpoint from the given UART transmitter.
    #[must_use]
    pub fn new(tx: UartTx<'d, Async>) -> Self {
        Self { tx }
    }
}

impl LinkTx for UartLinkTx<'_> {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        Write::write_all(&mut self.tx, bytes)
            .await
            .map_err(uart_error_to_link_error)?;
        Write::flush(&mut self.tx)
            .await
            .map_err(uart_error_to_link_error)
    }
}
