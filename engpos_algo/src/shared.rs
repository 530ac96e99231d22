// Shared decoder for firmware that binds plain interrupt handlers instead of
// framework-managed resources.

// Key Features:
// - Keeps the decoder in a critical-section mutex, suitable for a `static`
// - Runs every handler and every read inside `critical_section::with`
// - Hands out snapshots that are consistent across fields

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use core::cell::RefCell;

use critical_section::Mutex;

use crate::capture::{CaptureEvent, FreeRunningCounter};
use crate::decoder::{DecoderConfig, EdgeClass};
use crate::snapshot::EngineSnapshot;
use crate::time_base::Ticks;
use crate::EngineDecoder;

pub struct SharedDecoder {
    inner: Mutex<RefCell<EngineDecoder>>,
}

impl SharedDecoder {
    pub const fn new(config: DecoderConfig) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(EngineDecoder::new(config))),
        }
    }

    /// Runs `f` on the decoder with interrupts masked.
    pub fn with<R>(&self, f: impl FnOnce(&mut EngineDecoder) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    pub fn on_primary_edge(&self, event: CaptureEvent, counter: &impl FreeRunningCounter) -> EdgeClass {
        self.with(|decoder| decoder.on_primary_edge(event, counter))
    }

    pub fn on_secondary_edge(&self, event: CaptureEvent, counter: &impl FreeRunningCounter) -> Option<Ticks> {
        self.with(|decoder| decoder.on_secondary_edge(event, counter))
    }

    pub fn on_timer_overflow(&self) {
        self.with(|decoder| decoder.on_timer_overflow())
    }

    /// Consistent copy of the consumer fields
    pub fn snapshot(&self) -> EngineSnapshot {
        self.with(|decoder| decoder.snapshot())
    }

    pub fn reconfigure(&self, config: DecoderConfig) {
        self.with(|decoder| decoder.reconfigure(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PRIMARY_INPUT_MASK;
    use crate::decoder::{SyncStatus, ToothWheel};

    static DECODER: SharedDecoder = SharedDecoder::new(DecoderConfig::for_wheel(ToothWheel::Wheel36m1));

    #[test]
    fn static_decoder_tracks_edges() {
        DECODER.on_timer_overflow();
        DECODER.on_primary_edge(
            CaptureEvent {
                counter_at_entry: 0x0110,
                edge_stamp: 0x0100,
                port_state: PRIMARY_INPUT_MASK,
                overflow_pending: false,
            },
            &|| 0x0120,
        );

        let snap = DECODER.snapshot();
        assert_eq!(snap.sync_status, SyncStatus::Unsynced);
        assert_eq!(snap.last_primary_edge.ticks(), 0x0001_0100);
        assert_eq!(snap.primary_teeth_seen(), 1);
        assert_eq!(snap.diagnostics.primary_input_latency(), 0x10);
        assert_eq!(snap, DECODER.with(|decoder| decoder.snapshot()));
    }

    #[test]
    fn reconfigure_through_lock() {
        let shared = SharedDecoder::new(DecoderConfig::default());
        shared.reconfigure(DecoderConfig::for_wheel(ToothWheel::Wheel60m2));
        assert_eq!(shared.with(|decoder| decoder.config().landmark_index()), 116);
    }
}
