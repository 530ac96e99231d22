// Implements the primary (crank) tooth decoder, a per-edge state machine that keeps
// the tooth index synchronized with a missing-tooth wheel.

// Key Features:
// - Rebuilds full tooth periods from consecutive high and low phase widths
// - Detects the landmark gap with a ratio window on the full tooth period
// - Checks regular teeth against the previous period and edge parity
// - Falls back to landmark search on any failed check, never stops retrying

// Detailed Operation:
// The tooth index encodes synchronization: 0 searches for the landmark, 1 marks a
// landmark just accepted and 2.. count edges since it. Leading edges land on odd
// indices and trailing edges on even ones. On a leading edge the period of the
// tooth just completed is the sum of this phase and the phase stored at the
// trailing edge before it. Until a trailing edge has been stored there is no full
// period and the edge is rejected without touching the reference. In search state
// (index 0) or when a revolution worth of edges has been counted, only a period
// inside the landmark window is accepted.
// Otherwise the period must sit inside the tooth window, except right after the
// landmark where the reference is the long gap period and the tooth is taken as is.
// A trailing edge is valid only after a leading edge. Any failure returns the index
// to 0 and the next landmark resynchronizes the decoder.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::config::DecoderConfig;
use crate::time_base::interval::elapsed;
use crate::time_base::{ExtendedTime, Ticks};

/// Synchronization view of the tooth index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncStatus {
    /// Searching for the landmark (index 0)
    Unsynced,
    /// Landmark accepted on this tooth (index 1)
    LandmarkFound,
    /// Counting teeth since the landmark (index 2..)
    Synced,
}

impl SyncStatus {
    pub const fn from_tooth_index(tooth_index: u16) -> Self {
        match tooth_index {
            0 => SyncStatus::Unsynced,
            1 => SyncStatus::LandmarkFound,
            _ => SyncStatus::Synced,
        }
    }

    pub const fn is_synced(&self) -> bool {
        !matches!(self, SyncStatus::Unsynced)
    }
}

/// Result of classifying one primary edge
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeClass {
    /// First edge after reset, nothing to compare against
    Unclassified,
    /// Leading edge that closed the landmark gap
    Landmark,
    /// Leading edge of a regular tooth
    Tooth,
    /// Trailing edge in the expected order
    Trailing,
    /// Leading edge outside its ratio window
    LeadingRejected,
    /// Trailing edge without a leading edge before it
    TrailingRejected,
}

impl EdgeClass {
    pub const fn is_leading(&self) -> bool {
        matches!(
            self,
            EdgeClass::Landmark | EdgeClass::Tooth | EdgeClass::LeadingRejected
        )
    }

    pub const fn is_trailing(&self) -> bool {
        matches!(self, EdgeClass::Trailing | EdgeClass::TrailingRejected)
    }

    pub const fn is_accepted(&self) -> bool {
        matches!(
            self,
            EdgeClass::Landmark | EdgeClass::Tooth | EdgeClass::Trailing
        )
    }
}

/// Primary channel decoder state
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimaryDecoder {
    tooth_index: u16,              // 0 = unsynced, 1 = landmark, 2.. = counting
    last_edge_time: ExtendedTime,  // Timestamp of the previous edge
    last_full_tooth_period: Ticks, // Reference period for the ratio checks
    pending_phase: Ticks,          // Phase width stored at the last trailing edge
    last_interval: Ticks,          // Interval measured at the previous edge
}

impl PrimaryDecoder {
    pub const fn new() -> Self {
        Self {
            tooth_index: 0,
            last_edge_time: ExtendedTime::ZERO,
            last_full_tooth_period: 0,
            pending_phase: 0,
            last_interval: 0,
        }
    }

    /// Classifies one edge and advances the tooth index.
    ///
    /// # Arguments
    /// * `cfg` - wheel geometry and ratio windows
    /// * `edge_time` - extended timestamp of the edge
    /// * `leading` - true for the leading (rising) transition
    pub fn on_edge(&mut self, cfg: &DecoderConfig, edge_time: ExtendedTime, leading: bool) -> EdgeClass {
        let interval = elapsed(self.last_edge_time, edge_time);
        self.last_edge_time = edge_time;

        let class = if self.last_interval == 0 {
            EdgeClass::Unclassified
        } else if leading {
            self.on_leading(cfg, interval)
        } else {
            self.on_trailing(interval)
        };

        self.last_interval = interval;
        class
    }

    fn on_leading(&mut self, cfg: &DecoderConfig, interval: Ticks) -> EdgeClass {
        if self.pending_phase == 0 {
            // No trailing edge since reset, half a tooth is not a reference
            self.tooth_index = 0;
            return EdgeClass::LeadingRejected;
        }

        let full_period = interval.wrapping_add(self.pending_phase);
        let reference = self.last_full_tooth_period;
        let was_synced = self.tooth_index != 0;

        let class = if self.tooth_index == 0 || self.tooth_index == cfg.landmark_index() {
            if cfg.landmark_window().contains(full_period, reference) {
                self.tooth_index = 1;
                EdgeClass::Landmark
            } else {
                self.tooth_index = 0;
                EdgeClass::LeadingRejected
            }
        } else if self.tooth_index == 2
            || (self.tooth_index % 2 == 0 && cfg.tooth_window().contains(full_period, reference))
        {
            self.tooth_index += 1;
            EdgeClass::Tooth
        } else {
            self.tooth_index = 0;
            EdgeClass::LeadingRejected
        };

        // Reference follows every leading edge, a rejected one included
        self.last_full_tooth_period = full_period;

        match class {
            EdgeClass::Landmark if !was_synced => {
                debug!("PRIMARY: landmark found, period {} ticks", full_period)
            }
            EdgeClass::LeadingRejected if was_synced => {
                debug!("PRIMARY: sync lost, period {} ticks against {}", full_period, reference)
            }
            _ => {}
        }
        class
    }

    fn on_trailing(&mut self, interval: Ticks) -> EdgeClass {
        let class = if self.tooth_index % 2 == 1 {
            self.tooth_index += 1;
            EdgeClass::Trailing
        } else {
            if self.tooth_index != 0 {
                debug!("PRIMARY: sync lost, trailing edge at tooth {}", self.tooth_index);
            }
            self.tooth_index = 0;
            EdgeClass::TrailingRejected
        };
        self.pending_phase = interval;
        class
    }

    /// Getter for the tooth index
    pub fn tooth_index(&self) -> u16 {
        self.tooth_index
    }

    pub fn sync_status(&self) -> SyncStatus {
        SyncStatus::from_tooth_index(self.tooth_index)
    }

    /// Getter for the last full tooth period in ticks
    pub fn last_full_tooth_period(&self) -> Ticks {
        self.last_full_tooth_period
    }

    pub fn last_interval(&self) -> Ticks {
        self.last_interval
    }

    pub fn last_edge_time(&self) -> ExtendedTime {
        self.last_edge_time
    }

    /// Phase width waiting to be combined at the next leading edge
    pub fn pending_phase(&self) -> Ticks {
        self.pending_phase
    }

    // Call this to drop synchronization and all timing history
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::wheel::ToothWheel;
    use rstest::rstest;

    const HALF: u32 = 500;

    /// Feeds edges one interval at a time
    struct Feed {
        decoder: PrimaryDecoder,
        cfg: DecoderConfig,
        now: u32,
    }

    impl Feed {
        fn new(cfg: DecoderConfig) -> Self {
            Self {
                decoder: PrimaryDecoder::new(),
                cfg,
                now: 10_000,
            }
        }

        fn edge(&mut self, interval: u32, leading: bool) -> EdgeClass {
            self.now = self.now.wrapping_add(interval);
            self.decoder
                .on_edge(&self.cfg, ExtendedTime::from_ticks(self.now), leading)
        }

        /// One regular tooth: leading edge after a low phase, trailing after a high phase
        fn tooth(&mut self) {
            self.edge(HALF, true);
            self.edge(HALF, false);
        }

        /// First edge is unclassified, the trailing edge after it stores a phase
        fn start(&mut self) {
            assert_eq!(self.edge(HALF, true), EdgeClass::Unclassified);
            assert_eq!(self.edge(HALF, false), EdgeClass::TrailingRejected);
        }

        /// Runs the wheel until the decoder has just accepted a landmark
        fn sync(&mut self) {
            self.start();
            for _ in 0..5 {
                self.tooth();
            }
            // Gap: one missing tooth stretches the low phase by a full period
            assert_eq!(self.edge(HALF + 2 * HALF, true), EdgeClass::Landmark);
            assert_eq!(self.decoder.tooth_index(), 1);
        }
    }

    #[test]
    fn first_edge_is_not_classified() {
        let mut feed = Feed::new(DecoderConfig::default());
        assert_eq!(feed.edge(HALF, true), EdgeClass::Unclassified);
        assert_eq!(feed.decoder.tooth_index(), 0);
        assert_eq!(feed.decoder.last_interval(), 10_000 + HALF);
        assert_eq!(feed.decoder.last_full_tooth_period(), 0);
    }

    #[test]
    fn leading_edge_without_stored_phase_sets_no_reference() {
        let mut feed = Feed::new(DecoderConfig::default());
        assert_eq!(feed.edge(HALF, false), EdgeClass::Unclassified);
        assert_eq!(feed.edge(HALF, true), EdgeClass::LeadingRejected);
        assert_eq!(feed.decoder.last_full_tooth_period(), 0);
        feed.edge(HALF, false);
        // A full tooth against half a tooth would pass the landmark window
        assert_eq!(feed.edge(HALF, true), EdgeClass::LeadingRejected);
        assert_eq!(feed.decoder.last_full_tooth_period(), 2 * HALF);
        assert_eq!(feed.decoder.tooth_index(), 0);
    }

    #[test]
    fn regular_teeth_do_not_synchronize() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.start();
        for _ in 0..40 {
            feed.tooth();
            assert_eq!(feed.decoder.sync_status(), SyncStatus::Unsynced);
        }
    }

    #[test]
    fn counts_full_revolution_and_reanchors() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();

        for revolution in 0..3 {
            feed.edge(HALF, false);
            assert_eq!(feed.decoder.tooth_index(), 2);
            // 34 regular teeth follow the landmark tooth
            for tooth in 0..34 {
                assert_eq!(feed.edge(HALF, true), EdgeClass::Tooth);
                assert_eq!(feed.decoder.tooth_index(), 3 + 2 * tooth);
                assert_eq!(feed.edge(HALF, false), EdgeClass::Trailing);
            }
            assert_eq!(feed.decoder.tooth_index(), 70, "revolution {}", revolution);
            assert_eq!(feed.edge(3 * HALF, true), EdgeClass::Landmark);
            assert_eq!(feed.decoder.tooth_index(), 1);
            assert_eq!(feed.decoder.last_full_tooth_period(), 4 * HALF);
        }
    }

    #[test]
    fn tooth_after_landmark_skips_ratio_check() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();
        feed.edge(HALF, false);
        // Reference is the 2000 tick gap, 1000 would sit on the lower bound
        assert_eq!(feed.edge(HALF, true), EdgeClass::Tooth);
        assert_eq!(feed.decoder.tooth_index(), 3);
        assert_eq!(feed.decoder.last_full_tooth_period(), 2 * HALF);
    }

    #[rstest]
    #[case(3 * 2 * HALF)]
    #[case(2 * HALF)]
    fn landmark_search_rejects_out_of_window_period(#[case] full_period: u32) {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();
        feed.edge(HALF, false);
        for _ in 0..34 {
            feed.tooth();
        }
        assert_eq!(feed.decoder.tooth_index(), 70);
        assert_eq!(feed.edge(full_period - HALF, true), EdgeClass::LeadingRejected);
        assert_eq!(feed.decoder.tooth_index(), 0);
    }

    #[test]
    fn long_tooth_in_mid_revolution_loses_sync() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();
        feed.edge(HALF, false);
        feed.tooth();
        feed.tooth();
        // Three times the running period
        assert_eq!(feed.edge(6 * HALF - HALF, true), EdgeClass::LeadingRejected);
        assert_eq!(feed.decoder.sync_status(), SyncStatus::Unsynced);
    }

    #[test]
    fn regular_tooth_after_disturbance_is_not_a_landmark() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();
        feed.edge(HALF, false);
        feed.tooth();
        feed.edge(6 * HALF - HALF, true); // 3x tooth, sync lost
        feed.edge(HALF, false);
        // Reference is now the long period, a regular tooth is far below the window
        assert_eq!(feed.edge(HALF, true), EdgeClass::LeadingRejected);
        assert_eq!(feed.decoder.tooth_index(), 0);
    }

    #[test]
    fn double_trailing_edge_loses_sync() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();
        assert_eq!(feed.edge(HALF, false), EdgeClass::Trailing);
        assert_eq!(feed.edge(HALF, false), EdgeClass::TrailingRejected);
        assert_eq!(feed.decoder.tooth_index(), 0);
        assert_eq!(feed.decoder.pending_phase(), HALF);
    }

    #[test]
    fn double_leading_edge_loses_sync() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();
        feed.edge(HALF, false);
        feed.tooth();
        assert_eq!(feed.decoder.tooth_index(), 4);
        feed.edge(HALF, true);
        assert_eq!(feed.decoder.tooth_index(), 5);
        assert_eq!(feed.edge(HALF, true), EdgeClass::LeadingRejected);
        assert_eq!(feed.decoder.tooth_index(), 0);
    }

    #[test]
    fn resynchronizes_on_next_landmark() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();
        feed.edge(HALF, false);
        feed.edge(HALF, false); // parity fault
        assert_eq!(feed.decoder.tooth_index(), 0);
        for _ in 0..10 {
            feed.tooth();
        }
        assert_eq!(feed.edge(3 * HALF, true), EdgeClass::Landmark);
        assert_eq!(feed.decoder.sync_status(), SyncStatus::LandmarkFound);
    }

    #[test]
    fn sixty_minus_two_uses_wider_gap() {
        let mut feed = Feed::new(DecoderConfig::for_wheel(ToothWheel::Wheel60m2));
        feed.start();
        for _ in 0..3 {
            feed.tooth();
        }
        // Two missing teeth: a 1.5x gap is not enough
        assert_eq!(feed.edge(3 * HALF, true), EdgeClass::LeadingRejected);
        feed.edge(HALF, false);
        feed.tooth();
        assert_eq!(feed.edge(5 * HALF, true), EdgeClass::Landmark);
        feed.edge(HALF, false);
        for _ in 0..57 {
            feed.tooth();
        }
        assert_eq!(feed.decoder.tooth_index(), 116);
        assert_eq!(feed.edge(5 * HALF, true), EdgeClass::Landmark);
    }

    #[test]
    fn reset_clears_history() {
        let mut feed = Feed::new(DecoderConfig::default());
        feed.sync();
        feed.decoder.reset();
        assert_eq!(feed.decoder.tooth_index(), 0);
        assert_eq!(feed.decoder.last_interval(), 0);
        assert_eq!(feed.decoder.last_full_tooth_period(), 0);
    }

    #[rstest]
    #[case(0, SyncStatus::Unsynced)]
    #[case(1, SyncStatus::LandmarkFound)]
    #[case(2, SyncStatus::Synced)]
    #[case(70, SyncStatus::Synced)]
    fn sync_status_from_index(#[case] index: u16, #[case] status: SyncStatus) {
        assert_eq!(SyncStatus::from_tooth_index(index), status);
    }
}
