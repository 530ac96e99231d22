// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::time_base::interval::elapsed;
use crate::time_base::{ExtendedTime, Ticks};

/// Secondary (cam) channel state.
///
/// Records timestamps of qualifying edges and relates them to the primary tally.
/// It does not check ratios or hold a sync state of its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct SecondaryCapture {
    last_edge_time: ExtendedTime, // Timestamp of the previous qualifying edge
    last_interval: Ticks,         // Time between the last two qualifying edges

    cross_channel_count: u32,          // Accepted primary leading edges, wrapping
    count_at_last_edge: u32,           // Tally latched at the previous qualifying edge
    primary_pulses_per_secondary: u32, // Primary pulses between the last two qualifying edges
}

impl SecondaryCapture {
    pub const fn new() -> Self {
        Self {
            last_edge_time: ExtendedTime::ZERO,
            last_interval: 0,
            cross_channel_count: 0,
            count_at_last_edge: 0,
            primary_pulses_per_secondary: 0,
        }
    }

    /// Called by the primary decoder for every accepted leading edge
    #[inline(always)]
    pub fn note_primary_pulse(&mut self) {
        self.cross_channel_count = self.cross_channel_count.wrapping_add(1);
    }

    /// Records a qualifying edge, returns the interval since the previous one
    pub fn on_edge(&mut self, edge_time: ExtendedTime) -> Ticks {
        let interval = elapsed(self.last_edge_time, edge_time);
        self.last_edge_time = edge_time;
        self.last_interval = interval;

        self.primary_pulses_per_secondary = self.cross_channel_count.wrapping_sub(self.count_at_last_edge);
        self.count_at_last_edge = self.cross_channel_count;

        interval
    }

    pub fn last_edge_time(&self) -> ExtendedTime {
        self.last_edge_time
    }

    pub fn last_interval(&self) -> Ticks {
        self.last_interval
    }

    /// Getter for the running primary tally
    pub fn cross_channel_count(&self) -> u32 {
        self.cross_channel_count
    }

    pub fn primary_pulses_per_secondary(&self) -> u32 {
        self.primary_pulses_per_secondary
    }
}
