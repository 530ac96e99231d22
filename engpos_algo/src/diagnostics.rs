// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

/// Interrupt latency, handler runtime and edge counters.
///
/// Written by the edge handlers only. Readers outside a critical section may see a
/// value mid-update, which is acceptable for these fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuntimeDiagnostics {
    primary_input_latency: u16,   // Edge to handler entry, ticks
    secondary_input_latency: u16, // Edge to handler entry, ticks

    primary_leading_runtime: u16,    // Handler cost of the last accepted leading edge
    primary_trailing_runtime: u16,   // Handler cost of the last trailing edge
    secondary_leading_runtime: u16,  // Handler cost of the last qualifying edge
    secondary_trailing_runtime: u16, // Handler cost of the last other edge

    primary_teeth_seen: u32,   // Every primary edge, wrapping
    secondary_teeth_seen: u32, // Every secondary edge, wrapping
}

impl RuntimeDiagnostics {
    pub const fn new() -> Self {
        Self {
            primary_input_latency: 0,
            secondary_input_latency: 0,
            primary_leading_runtime: 0,
            primary_trailing_runtime: 0,
            secondary_leading_runtime: 0,
            secondary_trailing_runtime: 0,
            primary_teeth_seen: 0,
            secondary_teeth_seen: 0,
        }
    }

    pub(crate) fn record_primary_latency(&mut self, ticks: u16) {
        self.primary_input_latency = ticks;
    }

    pub(crate) fn record_secondary_latency(&mut self, ticks: u16) {
        self.secondary_input_latency = ticks;
    }

    pub(crate) fn record_primary_leading_runtime(&mut self, ticks: u16) {
        self.primary_leading_runtime = ticks;
    }

    pub(crate) fn record_primary_trailing_runtime(&mut self, ticks: u16) {
        self.primary_trailing_runtime = ticks;
    }

    pub(crate) fn record_secondary_leading_runtime(&mut self, ticks: u16) {
        self.secondary_leading_runtime = ticks;
    }

    pub(crate) fn record_secondary_trailing_runtime(&mut self, ticks: u16) {
        self.secondary_trailing_runtime = ticks;
    }

    pub(crate) fn count_primary_tooth(&mut self) {
        self.primary_teeth_seen = self.primary_teeth_seen.wrapping_add(1);
    }

    pub(crate) fn count_secondary_tooth(&mut self) {
        self.secondary_teeth_seen = self.secondary_teeth_seen.wrapping_add(1);
    }

    pub fn primary_input_latency(&self) -> u16 {
        self.primary_input_latency
    }

    pub fn secondary_input_latency(&self) -> u16 {
        self.secondary_input_latency
    }

    pub fn primary_leading_runtime(&self) -> u16 {
        self.primary_leading_runtime
    }

    pub fn primary_trailing_runtime(&self) -> u16 {
        self.primary_trailing_runtime
    }

    pub fn secondary_leading_runtime(&self) -> u16 {
        self.secondary_leading_runtime
    }

    pub fn secondary_trailing_runtime(&self) -> u16 {
        self.secondary_trailing_runtime
    }

    pub fn primary_teeth_seen(&self) -> u32 {
        self.primary_teeth_seen
    }

    pub fn secondary_teeth_seen(&self) -> u32 {
        self.secondary_teeth_seen
    }
}
