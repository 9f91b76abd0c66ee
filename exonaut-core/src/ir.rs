//! IR remote debounce state machine.
//!
//! The co-processor reports the IR code it currently sees in every
//! telemetry record (roughly every 20 ms), 0 when no key is held. The
//! debouncer turns that level signal into discrete key events:
//!
//! ```text
//!            code != 0             same code x threshold
//!   Idle ---------------> Pressed/Held ---------------> LongHeld
//!    ^      (Press)            |          (LongPress)      |
//!    |                         | code == 0                 | code == 0
//!    +------- (Release) -------+------ (LongRelease) ------+
//! ```
//!
//! Switching directly from one nonzero code to another emits a `Press` for
//! the new key without a release for the old one.

/// Repeat count at which a held key becomes a long press.
pub const LONG_PRESS_THRESHOLD: u16 = 30;

/// Largest accepted threshold; the repeat counter saturates one above it.
pub const MAX_LONG_PRESS_THRESHOLD: u16 = u16::MAX - 1;

/// Kind of IR key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrEventKind {
    /// A new key was seen.
    Press,
    /// The key was released before reaching the long-press threshold.
    Release,
    /// The key has been held for the long-press threshold.
    LongPress,
    /// The key was released after a long press.
    LongRelease,
}

impl IrEventKind {
    /// Numeric event id used by ExoNaut sketches (1, 2, 4, 5).
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Press => 1,
            Self::Release => 2,
            Self::LongPress => 4,
            Self::LongRelease => 5,
        }
    }
}

/// A debounced IR key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrEvent {
    /// The key code the event refers to.
    pub code: u16,
    /// What happened to the key.
    pub kind: IrEventKind,
}

impl IrEvent {
    const fn new(code: u16, kind: IrEventKind) -> Self {
        Self { code, kind }
    }
}

/// Observable debouncer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrState {
    /// No key held.
    Idle,
    /// A key was just pressed.
    Pressed,
    /// A key is held, below the long-press threshold.
    Held,
    /// A key is held at or above the long-press threshold.
    LongHeld,
}

/// Level-to-event IR debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrDebouncer {
    key: u16,
    repeats: u16,
    threshold: u16,
}

impl Default for IrDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl IrDebouncer {
    /// Create a debouncer with the default long-press threshold.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_threshold(LONG_PRESS_THRESHOLD)
    }

    /// Create a debouncer with a custom long-press threshold, clamped to
    /// `1..=MAX_LONG_PRESS_THRESHOLD`.
    #[must_use]
    pub const fn with_threshold(threshold: u16) -> Self {
        let threshold = if threshold == 0 {
            1
        } else if threshold > MAX_LONG_PRESS_THRESHOLD {
            MAX_LONG_PRESS_THRESHOLD
        } else {
            threshold
        };
        Self {
            key: 0,
            repeats: 0,
            threshold,
        }
    }

    /// Currently held key, 0 when idle.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> u16 {
        self.key
    }

    /// Number of consecutive repeats of the held key.
    ///
    /// Saturates one above the threshold.
    #[inline]
    #[must_use]
    pub const fn repeat_count(&self) -> u16 {
        self.repeats
    }

    /// Long-press threshold in repeats.
    #[inline]
    #[must_use]
    pub const fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> IrState {
        if self.key == 0 {
            IrState::Idle
        } else if self.repeats == 0 {
            IrState::Pressed
        } else if self.repeats < self.threshold {
            IrState::Held
        } else {
            IrState::LongHeld
        }
    }

    /// Feed the code from one telemetry record.
    ///
    /// Returns the event produced by this transition, if any.
    pub fn update(&mut self, code: u16) -> Option<IrEvent> {
        if code != self.key {
            let event = if code != 0 {
                IrEvent::new(code, IrEventKind::Press)
            } else if self.repeats >= self.threshold {
                IrEvent::new(self.key, IrEventKind::LongRelease)
            } else {
                IrEvent::new(self.key, IrEventKind::Release)
            };
            self.key = code;
            self.repeats = 0;
            return Some(event);
        }

        if code == 0 {
            self.repeats = 0;
            return None;
        }

        if self.repeats <= self.threshold {
            self.repeats = self.repeats.saturating_add(1);
        }
        (self.repeats == self.threshold).then(|| IrEvent::new(code, IrEventKind::LongPress))
    }
}
