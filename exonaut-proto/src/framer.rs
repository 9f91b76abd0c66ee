//! Delimiter framing for the co-processor receive stream.
//!
//! The co-processor sends ASCII records terminated by a literal `$`. There is
//! no length prefix and no checksum; record boundaries are purely
//! delimiter-based. CR and LF may appear anywhere and are ignored.
//!
//! ```text
//! A7F0000$EMM0000000000000000$V105$
//! ```
//!
//! # Example
//!
//! ```
//! use exonaut_proto::Framer;
//!
//! let mut framer = Framer::new();
//! let mut frames = 0;
//! for &byte in b"V105$A00$" {
//!     if let Ok(Some(frame)) = framer.push_byte(byte) {
//!         assert!(frame.len() == 4 || frame.len() == 3);
//!         frames += 1;
//!     }
//! }
//! assert_eq!(frames, 2);
//! ```

use heapless::Vec;

/// Record terminator byte.
pub const FRAME_TERMINATOR: u8 = b'$';

/// Maximum number of payload bytes in one record (terminator excluded).
pub const MAX_RECORD_LENGTH: usize = 63;

/// One complete record, terminator stripped.
pub type Frame = Vec<u8, MAX_RECORD_LENGTH>;

/// Framing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// The record exceeded [`MAX_RECORD_LENGTH`]; it is dropped up to the
    /// next terminator.
    Overflow,
}

/// Byte-at-a-time record framer with a fixed-capacity buffer.
#[derive(Debug, Default)]
pub struct Framer {
    buffer: Frame,
    discarding: bool,
}

impl Framer {
    /// Create an empty framer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            discarding: false,
        }
    }

    /// Drop any partial record.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Bytes accumulated for the record in progress.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether the record in progress overflowed and is being skipped.
    #[inline]
    #[must_use]
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Feed a byte to the framer.
    ///
    /// Returns `Some(frame)` when a terminator completes a non-empty record.
    /// Returns [`FrameError::Overflow`] once for the first byte that does not
    /// fit; the rest of that record, including its terminator, is swallowed.
    pub fn push_byte(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match byte {
            b'\r' | b'\n' => Ok(None),
            FRAME_TERMINATOR => {
                if self.discarding {
                    self.reset();
                    return Ok(None);
                }
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                Ok(Some(core::mem::take(&mut self.buffer)))
            }
            _ if self.discarding => Ok(None),
            _ => {
                if self.buffer.push(byte).is_err() {
                    self.discarding = true;
                    self.buffer.clear();
                    return Err(FrameError::Overflow);
                }
                Ok(None)
            }
        }
    }
}
