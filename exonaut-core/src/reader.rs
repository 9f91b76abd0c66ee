//! Background reader: link bytes to shared state and IR events.
//!
//! [`LinkReader`] owns the receive half of the link and runs the whole
//! receive pipeline inline:
//!
//! ```text
//! LinkRx -> Framer -> parse_record -> Telemetry::apply -> IR event queue
//! ```
//!
//! Malformed records, overflowing records and link errors are counted and
//! logged; none of them stop the reader.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use exonaut_proto::{parse_record, FrameError, Framer, ParseError, Record, MAX_RECORD_LENGTH};

use crate::ir::IrEvent;
use crate::link::{LinkError, LinkRx};
use crate::telemetry::Telemetry;

/// Capacity of the IR event queue.
pub const IR_QUEUE_DEPTH: usize = 10;

/// IR event queue shared by the reader and the application.
pub type IrChannel<M> = Channel<M, IrEvent, IR_QUEUE_DEPTH>;

/// Producer side of the IR event queue.
pub type IrSender<'a, M> = Sender<'a, M, IrEvent, IR_QUEUE_DEPTH>;

/// Consumer side of the IR event queue.
pub type IrReceiver<'a, M> = Receiver<'a, M, IrEvent, IR_QUEUE_DEPTH>;

/// Error type for reader operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReaderError {
    /// Error from the receive link.
    Link(LinkError),
    /// A complete record failed to parse and was discarded.
    Malformed(ParseError),
    /// A record exceeded the frame buffer and is being discarded.
    Overflow,
}

impl From<LinkError> for ReaderError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl From<ParseError> for ReaderError {
    fn from(e: ParseError) -> Self {
        Self::Malformed(e)
    }
}

impl From<FrameError> for ReaderError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Overflow => Self::Overflow,
        }
    }
}

/// Running counters kept by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReaderStats {
    /// Records parsed and applied.
    pub records: u32,
    /// Records discarded as malformed.
    pub malformed: u32,
    /// Records discarded for exceeding the frame buffer.
    pub overflows: u32,
    /// IR events dropped because the queue was full.
    pub dropped_events: u32,
    /// Receive errors reported by the link.
    pub link_errors: u32,
}

/// Receive pipeline for the co-processor link.
pub struct LinkReader<'a, R, M: RawMutex> {
    rx: R,
    framer: Framer,
    telemetry: &'a Telemetry<M>,
    events: IrSender<'a, M>,
    stats: ReaderStats,
}

impl<'a, R: LinkRx, M: RawMutex> LinkReader<'a, R, M> {
    /// Create a reader feeding `telemetry` and the IR queue behind `events`.
    pub fn new(rx: R, telemetry: &'a Telemetry<M>, events: IrSender<'a, M>) -> Self {
        Self {
            rx,
            framer: Framer::new(),
            telemetry,
            events,
            stats: ReaderStats::default(),
        }
    }

    /// Run the reader indefinitely.
    ///
    /// This method never returns under normal operation.
    pub async fn run(&mut self) -> ! {
        loop {
            let _ = self.process_one().await;
        }
    }

    /// Read one chunk from the link and push every byte through the
    /// pipeline.
    ///
    /// Returns the number of records applied. Per-record failures inside the
    /// chunk are counted in [`stats`](Self::stats) and do not fail the call.
    pub async fn process_one(&mut self) -> Result<usize, ReaderError> {
        let mut buf = [0u8; MAX_RECORD_LENGTH];
        let n = match self.rx.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                self.stats.link_errors = self.stats.link_errors.wrapping_add(1);
                warn!("link read failed: {:?}", e);
                // Bytes may have been lost; do not splice two records.
                self.framer.reset();
                return Err(ReaderError::Link(e));
            }
        };

        let mut applied = 0;
        for &byte in &buf[..n] {
            if let Ok(Some(_)) = self.push_byte(byte) {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Push one byte through framer, parser and state.
    ///
    /// Returns the applied record when `byte` completed one.
    pub fn push_byte(&mut self, byte: u8) -> Result<Option<Record>, ReaderError> {
        let frame = match self.framer.push_byte(byte) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.stats.overflows = self.stats.overflows.wrapping_add(1);
                warn!("record exceeds {:?} bytes, discarding", MAX_RECORD_LENGTH);
                return Err(e.into());
            }
        };

        let record = match parse_record(&frame) {
            Ok(record) => record,
            Err(e) => {
                self.stats.malformed = self.stats.malformed.wrapping_add(1);
                debug!("discarding malformed record: {:?}", e);
                return Err(e.into());
            }
        };

        trace!("rx {:?}", record);
        self.stats.records = self.stats.records.wrapping_add(1);

        if let Some(event) = self.telemetry.apply(&record) {
            debug!("ir {:?}", event);
            if self.events.try_send(event).is_err() {
                self.stats.dropped_events = self.stats.dropped_events.wrapping_add(1);
                warn!("IR queue full, dropping {:?}", event);
            }
        }

        Ok(Some(record))
    }

    /// Counters since construction.
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Get a reference to the receive link.
    pub fn rx(&self) -> &R {
        &self.rx
    }

    /// Get a mutable reference to the receive link.
    pub fn rx_mut(&mut self) -> &mut R {
        &mut self.rx
    }

    /// Decompose the reader into its receive link.
    pub fn into_inner(self) -> R {
        self.rx
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use std::vec;
    use std::vec::Vec;

    use super::*;
    use crate::ir::{IrEventKind, LONG_PRESS_THRESHOLD};
    use crate::telemetry::VOLTAGE_SCALE;
    use crate::test_support::{block_on, MockRx};

    fn drain(channel: &IrChannel<NoopRawMutex>) -> Vec<IrEvent> {
        core::iter::from_fn(|| channel.try_receive().ok()).collect()
    }

    /// Process every scripted read until the mock disconnects.
    fn pump<M: RawMutex>(reader: &mut LinkReader<'_, MockRx, M>) -> usize {
        let mut applied = 0;
        while !reader.rx().is_drained() {
            if let Ok(n) = block_on(reader.process_one()) {
                applied += n;
            }
        }
        applied
    }

    #[test]
    fn test_telemetry_record_updates_voltage_once() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let rx = MockRx::new(vec![Ok(b"A1A2B3C$".to_vec())]);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        assert_eq!(block_on(reader.process_one()), Ok(1));
        let mv = telemetry.battery_millivolts().unwrap();
        assert!((mv - 0x1A as f32 * VOLTAGE_SCALE).abs() < 1e-3);
    }

    #[test]
    fn test_eight_char_telemetry_rejected() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let rx = MockRx::new(vec![Ok(b"A1A2B3C4$".to_vec())]);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        assert_eq!(block_on(reader.process_one()), Ok(0));
        assert_eq!(telemetry.battery_millivolts(), None);
        assert_eq!(reader.stats().malformed, 1);
    }

    #[test]
    fn test_push_byte_reports_malformed() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let mut reader = LinkReader::new(MockRx::new(vec![]), &telemetry, channel.sender());

        let mut last = Ok(None);
        for &b in b"Q12$" {
            last = reader.push_byte(b);
        }
        assert_eq!(
            last,
            Err(ReaderError::Malformed(ParseError::UnknownTag(b'Q')))
        );
    }

    #[test]
    fn test_records_split_across_reads() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let stream = b"V105$EMM00000000FFFFFFFE$A00$";
        let rx = MockRx::chunked(stream, 3);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        assert_eq!(pump(&mut reader), 3);
        assert_eq!(telemetry.firmware_version().unwrap().as_str(), Some("105"));
        assert_eq!(telemetry.encoder_counts(), [2, 0]);
        assert_eq!(telemetry.encoder_generation(), 1);
        assert_eq!(reader.stats().records, 3);
    }

    #[test]
    fn test_overflow_discards_until_terminator() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let mut stream = vec![b'I'; 100];
        stream.extend_from_slice(b"$V200$");
        let rx = MockRx::new(vec![Ok(stream)]);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        let applied = block_on(reader.process_one()).unwrap();
        // The first read is capped at one record buffer; pull the rest.
        let applied = applied + pump(&mut reader);

        assert_eq!(applied, 1);
        assert_eq!(reader.stats().overflows, 1);
        assert_eq!(telemetry.firmware_version().unwrap().as_str(), Some("200"));
    }

    #[test]
    fn test_unterminated_bytes_never_dispatched() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let rx = MockRx::new(vec![Ok(b"A7F0000".to_vec())]);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        assert_eq!(block_on(reader.process_one()), Ok(0));
        assert_eq!(telemetry.battery_millivolts(), None);
    }

    #[test]
    fn test_link_error_resets_framer_and_continues() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let rx = MockRx::new(vec![
            Ok(b"V1".to_vec()),
            Err(LinkError::Overrun),
            Ok(b"05$V300$".to_vec()),
        ]);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        assert_eq!(block_on(reader.process_one()), Ok(0));
        assert_eq!(
            block_on(reader.process_one()),
            Err(ReaderError::Link(LinkError::Overrun))
        );
        // "05" is a malformed remainder, "V300" is intact.
        assert_eq!(block_on(reader.process_one()), Ok(1));
        assert_eq!(telemetry.firmware_version().unwrap().as_str(), Some("300"));
        assert_eq!(reader.stats().link_errors, 1);
        assert_eq!(reader.stats().malformed, 1);
    }

    #[test]
    fn test_ir_events_queued() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let mut stream = Vec::new();
        for _ in 0..=LONG_PRESS_THRESHOLD {
            stream.extend_from_slice(b"A801600$");
        }
        stream.extend_from_slice(b"A800000$");
        let rx = MockRx::chunked(&stream, 16);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        pump(&mut reader);
        let kinds: Vec<_> = drain(&channel).iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                IrEventKind::Press,
                IrEventKind::LongPress,
                IrEventKind::LongRelease,
            ]
        );
        assert_eq!(telemetry.ir_key(), 0);
    }

    #[test]
    fn test_ack_record_does_not_feed_ir() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let rx = MockRx::new(vec![
            Ok(b"A801600$A801600$".to_vec()),
            Ok(b"A00$A00$".to_vec()),
        ]);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        assert_eq!(block_on(reader.process_one()), Ok(2));
        assert_eq!(drain(&channel).len(), 1);
        let repeats = telemetry.ir_repeat_count();
        assert_eq!(repeats, 1);

        telemetry.set_action_finished(false);
        assert_eq!(block_on(reader.process_one()), Ok(2));
        assert!(telemetry.action_finished());
        assert_eq!(telemetry.ir_key(), 0x0016);
        assert_eq!(telemetry.ir_repeat_count(), repeats);
        assert!(drain(&channel).is_empty());
    }

    #[test]
    fn test_full_ir_queue_drops_events() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let mut stream = Vec::new();
        // Alternate two keys: every record is a Press.
        for i in 0..(IR_QUEUE_DEPTH + 3) {
            let record: &[u8] = if i % 2 == 0 { b"A800100$" } else { b"A800200$" };
            stream.extend_from_slice(record);
        }
        let rx = MockRx::chunked(&stream, 8);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        pump(&mut reader);
        assert_eq!(reader.stats().dropped_events, 3);
        assert_eq!(drain(&channel).len(), IR_QUEUE_DEPTH);
    }

    #[test]
    fn test_empty_frames_skipped() {
        let telemetry = Telemetry::<NoopRawMutex>::new();
        let channel = IrChannel::new();
        let rx = MockRx::new(vec![Ok(b"$$\r\n$S$".to_vec())]);
        let mut reader = LinkReader::new(rx, &telemetry, channel.sender());

        assert_eq!(block_on(reader.process_one()), Ok(1));
        assert_eq!(reader.stats().malformed, 0);
    }
}
