// Implements the extended time base used by both capture channels.

// Key Features:
// - Widens the 16-bit free-running capture counter to a 32-bit timestamp
// - Resolves the read race between the overflow flag and the captured value
// - Holds the extension word advanced by the counter overflow interrupt

// Detailed Operation:
// The hardware counter wraps from 0xFFFF to 0x0000 and raises an overflow flag.
// The overflow handler increments the extension word, which becomes the high half
// of every timestamp. A capture interrupt can run after the wrap but before the
// overflow handler: in that window the flag is still pending and the extension word
// is one behind. A captured value with the top bit clear was taken after the wrap,
// so for that reading the high half is the extension word plus one. A captured
// value with the top bit set was latched before the wrap and keeps the stored word.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

pub mod interval;

/// Duration in timer ticks.
pub type Ticks = u32;

/// Top bit of the raw counter: clear means the value was latched after a wrap.
const PRE_WRAP_MASK: u16 = 0x8000;

/// Wide timestamp in timer ticks since an arbitrary epoch.
///
/// Values wrap at 32 bits and are only compared through [`interval::elapsed`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtendedTime(u32);

impl ExtendedTime {
    pub const ZERO: Self = Self(0);

    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Getter for the raw tick value
    pub const fn ticks(&self) -> u32 {
        self.0
    }

    /// Extension word part of the timestamp
    pub const fn high_word(&self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Hardware counter part of the timestamp
    pub const fn low_word(&self) -> u16 {
        self.0 as u16
    }
}

/// Builds an [`ExtendedTime`] from one capture.
///
/// # Arguments
/// * `raw_counter` - captured 16-bit counter value
/// * `overflow_pending` - counter overflow flag as seen inside the capture interrupt
/// * `extension_word` - overflow count maintained by the overflow interrupt
pub const fn assemble(raw_counter: u16, overflow_pending: bool, extension_word: u16) -> ExtendedTime {
    let high = if overflow_pending && (raw_counter & PRE_WRAP_MASK) == 0 {
        // Wrapped before the capture, overflow handler has not run yet
        extension_word.wrapping_add(1)
    } else {
        extension_word
    };
    ExtendedTime(((high as u32) << 16) | raw_counter as u32)
}

/// Overflow extension of the hardware counter.
///
/// Owned by the overflow interrupt; capture handlers only read it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimerExtension {
    word: u16, // Number of counter wraps serviced so far (wrapping)
}

impl TimerExtension {
    pub const fn new() -> Self {
        Self { word: 0 }
    }

    /// Call exactly once per counter wrap, after the hardware flag is cleared.
    #[inline(always)]
    pub fn on_overflow(&mut self) {
        self.word = self.word.wrapping_add(1);
    }

    /// Getter for the current extension word
    #[inline(always)]
    pub fn word(&self) -> u16 {
        self.word
    }

    /// Timestamp for a capture taken while this extension word was current
    #[inline(always)]
    pub fn extend(&self, raw_counter: u16, overflow_pending: bool) -> ExtendedTime {
        assemble(raw_counter, overflow_pending, self.word)
    }
}
