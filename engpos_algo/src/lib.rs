// Engine position decoder core: turns crank and cam edge captures into a
// synchronized tooth index and tooth period.

// Key Features:
// - Extends the 16-bit capture counter to a 32-bit time base
// - Decodes missing-tooth crank wheels with ratio windows and edge parity
// - Timestamps cam edges and relates them to the crank tally
// - Records interrupt latency and handler runtime for inspection

// Detailed Operation:
// `EngineDecoder` owns every piece of decoder state. The firmware calls one entry
// point per hardware event: a primary capture, a secondary capture or a counter
// overflow. Each call runs in constant time and never fails; losing
// synchronization only shows as tooth index 0. Consumers copy an `EngineSnapshot`
// inside a critical section instead of touching the state directly.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod capture;
pub mod decoder;
pub mod diagnostics;
pub mod shared;
pub mod snapshot;
#[cfg(any(test, feature = "stimulus"))]
pub mod stimulus;
pub mod time_base;

use capture::{ticks_between, CaptureEvent, FreeRunningCounter, PRIMARY_INPUT_MASK, SECONDARY_INPUT_MASK};
use decoder::{DecoderConfig, EdgeClass, PrimaryDecoder, SecondaryCapture};
use diagnostics::RuntimeDiagnostics;
use snapshot::EngineSnapshot;
use time_base::{Ticks, TimerExtension};

/// Decoder context: configuration plus all per-channel state.
pub struct EngineDecoder {
    config: DecoderConfig, // Wheel geometry, ratio windows, input polarities

    extension: TimerExtension,  // Overflow extension of the capture counter
    primary: PrimaryDecoder,    // Crank tooth state machine
    secondary: SecondaryCapture, // Cam edge recorder

    diagnostics: RuntimeDiagnostics,
}

impl EngineDecoder {
    /// Creates a decoder with zeroed state.
    ///
    /// # Arguments
    /// * `config` - wheel and input configuration
    pub const fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            extension: TimerExtension::new(),
            primary: PrimaryDecoder::new(),
            secondary: SecondaryCapture::new(),
            diagnostics: RuntimeDiagnostics::new(),
        }
    }

    /// Primary (crank) capture handler.
    ///
    /// # Arguments
    /// * `event` - values sampled on interrupt entry
    /// * `counter` - free-running counter, read again to time this handler
    pub fn on_primary_edge(&mut self, event: CaptureEvent, counter: &impl FreeRunningCounter) -> EdgeClass {
        self.diagnostics.record_primary_latency(event.latency());
        self.diagnostics.count_primary_tooth();

        let edge_time = self.extension.extend(event.edge_stamp, event.overflow_pending);
        let leading = self
            .config
            .primary_polarity()
            .is_leading(event.level_high(PRIMARY_INPUT_MASK));

        let class = self.primary.on_edge(&self.config, edge_time, leading);

        match class {
            EdgeClass::Landmark | EdgeClass::Tooth => {
                self.secondary.note_primary_pulse();
                self.diagnostics
                    .record_primary_leading_runtime(ticks_between(event.counter_at_entry, counter.now()));
            }
            EdgeClass::Trailing | EdgeClass::TrailingRejected => {
                self.diagnostics
                    .record_primary_trailing_runtime(ticks_between(event.counter_at_entry, counter.now()));
            }
            EdgeClass::Unclassified | EdgeClass::LeadingRejected => {}
        }
        class
    }

    /// Secondary (cam) capture handler.
    ///
    /// Returns the interval since the previous qualifying edge, or `None` when the
    /// edge has the other polarity.
    pub fn on_secondary_edge(&mut self, event: CaptureEvent, counter: &impl FreeRunningCounter) -> Option<Ticks> {
        self.diagnostics.record_secondary_latency(event.latency());

        let qualifying = self
            .config
            .secondary_polarity()
            .is_leading(event.level_high(SECONDARY_INPUT_MASK));

        let interval = if qualifying {
            let edge_time = self.extension.extend(event.edge_stamp, event.overflow_pending);
            let interval = self.secondary.on_edge(edge_time);
            self.diagnostics
                .record_secondary_leading_runtime(ticks_between(event.counter_at_entry, counter.now()));
            Some(interval)
        } else {
            self.diagnostics
                .record_secondary_trailing_runtime(ticks_between(event.counter_at_entry, counter.now()));
            None
        };

        self.diagnostics.count_secondary_tooth();
        interval
    }

    /// Counter overflow handler; call once per wrap after clearing the hardware flag.
    #[inline(always)]
    pub fn on_timer_overflow(&mut self) {
        self.extension.on_overflow();
    }

    /// Copies the consumer-visible fields.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            tooth_index: self.primary.tooth_index(),
            sync_status: self.primary.sync_status(),
            last_full_tooth_period: self.primary.last_full_tooth_period(),
            last_primary_edge: self.primary.last_edge_time(),
            last_secondary_edge: self.secondary.last_edge_time(),
            secondary_interval: self.secondary.last_interval(),
            primary_pulses_per_secondary: self.secondary.primary_pulses_per_secondary(),
            diagnostics: self.diagnostics,
        }
    }

    /// Replaces the configuration and restarts synchronization.
    ///
    /// The extension word follows the hardware counter and is kept.
    pub fn reconfigure(&mut self, config: DecoderConfig) {
        info!("DECODER: reconfigured for {}-{} wheel", config.teeth(), config.missing_teeth());
        self.config = config;
        self.reset();
    }

    // Drops all decoder history, e.g. after a stall
    pub fn reset(&mut self) {
        self.primary.reset();
        self.secondary = SecondaryCapture::new();
        self.diagnostics = RuntimeDiagnostics::new();
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn primary(&self) -> &PrimaryDecoder {
        &self.primary
    }

    pub fn secondary(&self) -> &SecondaryCapture {
        &self.secondary
    }

    pub fn diagnostics(&self) -> &RuntimeDiagnostics {
        &self.diagnostics
    }

    /// Getter for the overflow extension word
    pub fn extension_word(&self) -> u16 {
        self.extension.word()
    }
}

impl Default for EngineDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}
