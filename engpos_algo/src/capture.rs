// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

/// Port bit carrying the primary (crank) input level
pub const PRIMARY_INPUT_MASK: u8 = 0x01;
/// Port bit carrying the secondary (cam) input level
pub const SECONDARY_INPUT_MASK: u8 = 0x02;

/// Everything the capture interrupt samples for one edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureEvent {
    /// Free-running counter read on interrupt entry
    pub counter_at_entry: u16,
    /// Counter value latched by the capture unit at the edge
    pub edge_stamp: u16,
    /// Input port levels sampled on interrupt entry
    pub port_state: u8,
    /// Counter overflow flag still set, overflow interrupt not yet run
    pub overflow_pending: bool,
}

impl CaptureEvent {
    /// Ticks between the edge and the start of its interrupt handler
    #[inline(always)]
    pub fn latency(&self) -> u16 {
        ticks_between(self.edge_stamp, self.counter_at_entry)
    }

    /// Level of the input selected by `mask` right after the edge
    #[inline(always)]
    pub fn level_high(&self, mask: u8) -> bool {
        self.port_state & mask != 0
    }
}

/// Read access to the 16-bit free-running counter, used to time the handlers.
pub trait FreeRunningCounter {
    fn now(&self) -> u16;
}

impl<F> FreeRunningCounter for F
where
    F: Fn() -> u16,
{
    fn now(&self) -> u16 {
        self()
    }
}

/// Difference of two raw counter readings across at most one wrap
#[inline(always)]
pub const fn ticks_between(start: u16, end: u16) -> u16 {
    end.wrapping_sub(start)
}

/// Capture timer status flags (STM32 TIMx_SR layout), cleared by writing 0.
pub mod status {
    /// Counter wrapped
    pub const UIF: u32 = 1 << 0;
    /// Channel 1 (primary) captured an edge
    pub const CC1IF: u32 = 1 << 1;
    /// Channel 2 (secondary) captured an edge
    pub const CC2IF: u32 = 1 << 2;
    /// Channel 1 captured again before CCR1 was read
    pub const CC1OF: u32 = 1 << 9;
    /// Channel 2 captured again before CCR2 was read
    pub const CC2OF: u32 = 1 << 10;

    /// Word that clears exactly `flags` and writes 1 to every other bit.
    ///
    /// Never read-modify-write the status register: a flag set between the read and
    /// the write would be written back as 0 and lost.
    #[inline(always)]
    pub const fn clear_word(flags: u32) -> u32 {
        !flags
    }
}
