// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::decoder::SyncStatus;
use crate::diagnostics::RuntimeDiagnostics;
use crate::time_base::{ExtendedTime, Ticks};

/// Consumer view of the decoder, copied in one go.
///
/// Take it inside a critical section (resource lock) so the tooth index and
/// period belong to the same edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineSnapshot {
    pub tooth_index: u16,
    pub sync_status: SyncStatus,
    pub last_full_tooth_period: Ticks,
    pub last_primary_edge: ExtendedTime,

    pub last_secondary_edge: ExtendedTime,
    pub secondary_interval: Ticks,
    pub primary_pulses_per_secondary: u32,

    pub diagnostics: RuntimeDiagnostics,
}

impl EngineSnapshot {
    /// False while the decoder searches for the landmark; nothing may be scheduled then
    pub fn position_valid(&self) -> bool {
        self.sync_status.is_synced()
    }

    pub fn primary_teeth_seen(&self) -> u32 {
        self.diagnostics.primary_teeth_seen()
    }

    pub fn secondary_teeth_seen(&self) -> u32 {
        self.diagnostics.secondary_teeth_seen()
    }
}
