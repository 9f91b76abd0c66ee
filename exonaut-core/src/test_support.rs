//! Host test helpers: a blocking executor and mock link halves.

extern crate std;

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
use std::collections::VecDeque;
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal_async::delay::DelayNs;

use crate::link::{LinkError, LinkRx, LinkTx};
use crate::telemetry::Telemetry;

// Helper to run a future to completion (simple blocking executor)
pub fn block_on<F: Future>(mut f: F) -> F::Output {
    fn noop_raw_waker() -> RawWaker {
        fn noop(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
        RawWaker::new(core::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
    let mut cx = Context::from_waker(&waker);

    // SAFETY: We don't move f after pinning
    let mut f = unsafe { Pin::new_unchecked(&mut f) };

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {
                panic!("Mock future returned Pending unexpectedly");
            }
        }
    }
}

/// Receive half that replays scripted reads, then reports `Disconnected`.
pub struct MockRx {
    reads: VecDeque<Result<Vec<u8>, LinkError>>,
}

impl MockRx {
    pub fn new(reads: Vec<Result<Vec<u8>, LinkError>>) -> Self {
        Self {
            reads: reads.into(),
        }
    }

    /// One read per chunk of `bytes`.
    pub fn chunked(bytes: &[u8], chunk: usize) -> Self {
        Self::new(bytes.chunks(chunk).map(|c| Ok(c.to_vec())).collect())
    }

    pub fn is_drained(&self) -> bool {
        self.reads.is_empty()
    }
}

impl LinkRx for MockRx {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self.reads.pop_front() {
            Some(Ok(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    self.reads.push_front(Ok(bytes.split_off(n)));
                }
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Err(LinkError::Disconnected),
        }
    }
}

/// Transmit half that records every packet.
pub struct MockTx {
    packets: Vec<Vec<u8>>,
    fail: Option<LinkError>,
}

impl MockTx {
    pub fn new() -> Self {
        Self {
            packets: Vec::new(),
            fail: None,
        }
    }

    pub fn failing(error: LinkError) -> Self {
        Self {
            packets: Vec::new(),
            fail: Some(error),
        }
    }

    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.packets.clone()
    }
}

impl LinkTx for MockTx {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if let Some(e) = self.fail {
            return Err(e);
        }
        self.packets.push(bytes.to_vec());
        Ok(())
    }
}

/// Delay that only adds up the requested time.
///
/// With [`with_report`](Self::with_report) every delay also stores an
/// encoder report, standing in for the co-processor answering a query.
pub struct MockDelay<'a> {
    telemetry: &'a Telemetry<NoopRawMutex>,
    report: Option<[i32; 2]>,
    total_ms: u32,
}

impl<'a> MockDelay<'a> {
    pub fn new(telemetry: &'a Telemetry<NoopRawMutex>) -> Self {
        Self {
            telemetry,
            report: None,
            total_ms: 0,
        }
    }

    pub fn with_report(mut self, counts: [i32; 2]) -> Self {
        self.report = Some(counts);
        self
    }

    pub fn total_ms(&self) -> u32 {
        self.total_ms
    }

    fn elapse(&mut self, ms: u32) {
        self.total_ms += ms;
        if let Some(counts) = self.report {
            self.telemetry.record_encoders(counts);
        }
    }
}

impl DelayNs for MockDelay<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapse(ns / 1_000_000);
    }

    async fn delay_us(&mut self, us: u32) {
        self.elapse(us / 1_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.elapse(ms);
    }
}
