// Generates the event stream a missing-tooth wheel produces at the capture timer.

// Key Features:
// - Crank edges for any catalogue wheel at a constant tooth period
// - Optional cam pulse once every two revolutions
// - Counter overflows with a configurable service delay, so captures can see a
//   pending overflow exactly as the hardware reports it
// - Events come out in the order their interrupts would run

// Detailed Operation:
// Time is kept as a 64-bit tick count starting with the counter and extension
// word at zero. Each present tooth is high for the first half of its slot and low
// for the second half; the missing teeth stretch the low phase before the next
// revolution. A capture is handled `entry_latency` ticks after its edge and an
// overflow `overflow_lag` ticks after the wrap. The lag is never shorter than the
// entry latency, otherwise an edge latched before a wrap could be handled after the
// overflow interrupt, which the extension rule cannot tell apart.

// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::capture::{CaptureEvent, PRIMARY_INPUT_MASK, SECONDARY_INPUT_MASK};
use crate::decoder::ToothWheel;
use crate::EngineDecoder;

const COUNTER_WRAP: u64 = 1 << 16;
/// Largest overflow service delay the extension rule can absorb
const MAX_OVERFLOW_LAG: u16 = 0x7FFF;

/// One hardware event, in dispatch order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StimulusEvent {
    Overflow,
    Primary(CaptureEvent),
    Secondary(CaptureEvent),
}

impl StimulusEvent {
    /// Feeds the event to its handler; `handler_cost` is the runtime reported by the counter.
    pub fn dispatch(self, decoder: &mut EngineDecoder, handler_cost: u16) {
        match self {
            StimulusEvent::Overflow => decoder.on_timer_overflow(),
            StimulusEvent::Primary(event) => {
                let exit = event.counter_at_entry.wrapping_add(handler_cost);
                decoder.on_primary_edge(event, &|| exit);
            }
            StimulusEvent::Secondary(event) => {
                let exit = event.counter_at_entry.wrapping_add(handler_cost);
                decoder.on_secondary_edge(event, &|| exit);
            }
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, StimulusEvent::Primary(_))
    }
}

/// Wheel speed and interrupt timing of a stimulus run
#[derive(Clone, Copy, Debug)]
pub struct StimulusConfig {
    pub wheel: ToothWheel,
    /// Ticks per tooth slot, present or missing
    pub tooth_period: u32,
    /// Ticks from an edge to its capture handler
    pub entry_latency: u16,
    /// Ticks from a counter wrap to the overflow handler
    pub overflow_lag: u16,
    /// Edge within the revolution the run starts on (0 = first leading edge after the gap)
    pub start_edge: u16,
    /// Time of the first crank edge
    pub start_time: u64,
    /// Tooth slot of the cam pulse, emitted every second revolution
    pub cam_tooth: Option<u8>,
}

impl StimulusConfig {
    pub const fn new(wheel: ToothWheel, tooth_period: u32) -> Self {
        Self {
            wheel,
            tooth_period,
            entry_latency: 24,
            overflow_lag: 64,
            start_edge: 0,
            start_time: 1_000,
            cam_tooth: None,
        }
    }

    pub const fn with_start(mut self, start_edge: u16, start_time: u64) -> Self {
        self.start_edge = start_edge;
        self.start_time = start_time;
        self
    }

    pub const fn with_latency(mut self, entry_latency: u16, overflow_lag: u16) -> Self {
        self.entry_latency = entry_latency;
        self.overflow_lag = overflow_lag;
        self
    }

    pub const fn with_cam(mut self, cam_tooth: u8) -> Self {
        self.cam_tooth = Some(cam_tooth);
        self
    }
}

/// Endless, time-ordered stream of wheel events
pub struct WheelStimulus {
    cfg: StimulusConfig,
    edges_per_rev: u64,
    first_wheel_time: u64, // Wheel time of the starting edge

    next_edge: u64,       // Crank edge counter since the start of the run
    next_cam: u64,        // Cam edge counter, two per cam pulse
    next_wrap: u64,       // Next counter wrap to service (1 = first wrap)
    overflow_lag: u64,

    primary_high: bool,
    secondary_high: bool,
}

impl WheelStimulus {
    pub fn new(cfg: StimulusConfig) -> Self {
        let edges_per_rev = cfg.wheel.edges_per_revolution() as u64;
        let overflow_lag = cfg.overflow_lag.max(cfg.entry_latency).min(MAX_OVERFLOW_LAG) as u64;

        let mut stimulus = Self {
            cfg,
            edges_per_rev,
            first_wheel_time: 0,
            next_edge: 0,
            next_cam: 0,
            next_wrap: 1,
            overflow_lag,
            primary_high: false,
            secondary_high: false,
        };
        stimulus.first_wheel_time = stimulus.crank_wheel_time(cfg.start_edge as u64 % edges_per_rev);
        // Skip cam edges that fall before the run starts
        if cfg.cam_tooth.is_some() {
            while stimulus.cam_wheel_time(stimulus.next_cam) < stimulus.first_wheel_time {
                stimulus.next_cam += 1;
            }
        }
        // Pin levels as they are just before the first edge
        let first = cfg.start_edge as u64 % edges_per_rev;
        stimulus.primary_high = first % 2 == 1;
        stimulus.secondary_high = stimulus.next_cam % 2 == 1;
        stimulus
    }

    /// Crank edges per revolution of the configured wheel
    pub fn edges_per_revolution(&self) -> u64 {
        self.edges_per_rev
    }

    /// Wheel time of crank edge `edge`, counted from the first leading edge after the gap
    fn crank_wheel_time(&self, edge: u64) -> u64 {
        let period = self.cfg.tooth_period as u64;
        let revolution = edge / self.edges_per_rev;
        let within = edge % self.edges_per_rev;
        let trailing = within % 2;
        revolution * self.cfg.wheel.nr_of_teeth() as u64 * period + (within / 2) * period + trailing * (period / 2)
    }

    /// Wheel time of cam edge `edge`; rising edges are even, one pulse every two revolutions
    fn cam_wheel_time(&self, edge: u64) -> u64 {
        let period = self.cfg.tooth_period as u64;
        let tooth = self.cfg.cam_tooth.unwrap_or(0) as u64;
        let cycle = edge / 2;
        let falling = edge % 2;
        2 * cycle * self.cfg.wheel.nr_of_teeth() as u64 * period + tooth * period + period / 4 + falling * period
    }

    fn to_run_time(&self, wheel_time: u64) -> u64 {
        self.cfg.start_time + wheel_time - self.first_wheel_time
    }

    fn next_crank_time(&self) -> u64 {
        let start = self.cfg.start_edge as u64 % self.edges_per_rev;
        self.to_run_time(self.crank_wheel_time(start + self.next_edge))
    }

    fn next_cam_time(&self) -> Option<u64> {
        self.cfg
            .cam_tooth
            .map(|_| self.to_run_time(self.cam_wheel_time(self.next_cam)))
    }

    fn port_state(&self) -> u8 {
        let mut state = 0;
        if self.primary_high {
            state |= PRIMARY_INPUT_MASK;
        }
        if self.secondary_high {
            state |= SECONDARY_INPUT_MASK;
        }
        state
    }

    fn capture(&self, edge_time: u64) -> CaptureEvent {
        let entry = edge_time + self.cfg.entry_latency as u64;
        let wraps_before_entry = entry / COUNTER_WRAP;
        CaptureEvent {
            counter_at_entry: entry as u16,
            edge_stamp: edge_time as u16,
            port_state: self.port_state(),
            overflow_pending: wraps_before_entry >= self.next_wrap,
        }
    }
}

impl Iterator for WheelStimulus {
    type Item = StimulusEvent;

    fn next(&mut self) -> Option<StimulusEvent> {
        let latency = self.cfg.entry_latency as u64;
        let crank_time = self.next_crank_time();
        let cam_time = self.next_cam_time();
        let overflow_dispatch = self.next_wrap * COUNTER_WRAP + self.overflow_lag;

        let crank_first = cam_time.map_or(true, |cam| crank_time <= cam);
        let capture_time = if crank_first { crank_time } else { cam_time.unwrap_or(crank_time) };

        // Captures win ties against the overflow
        if overflow_dispatch < capture_time + latency {
            self.next_wrap += 1;
            return Some(StimulusEvent::Overflow);
        }

        if crank_first {
            self.primary_high = !self.primary_high;
            self.next_edge += 1;
            Some(StimulusEvent::Primary(self.capture(crank_time)))
        } else {
            self.secondary_high = !self.secondary_high;
            self.next_cam += 1;
            Some(StimulusEvent::Secondary(self.capture(capture_time)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primaries(stimulus: WheelStimulus, count: usize) -> impl Iterator<Item = CaptureEvent> {
        stimulus
            .filter_map(|event| match event {
                StimulusEvent::Primary(capture) => Some(capture),
                _ => None,
            })
            .take(count)
    }

    #[test]
    fn crank_edges_alternate_and_follow_the_wheel() {
        let cfg = StimulusConfig::new(ToothWheel::Wheel36m1, 1_000);
        let edges: Vec<_> = primaries(WheelStimulus::new(cfg), 72).collect();

        for (idx, edge) in edges.iter().enumerate() {
            assert_eq!(edge.level_high(PRIMARY_INPUT_MASK), idx % 2 == 0, "edge {}", idx);
        }
        // Regular half periods, then the gap after the last trailing edge
        assert_eq!(edges[1].edge_stamp.wrapping_sub(edges[0].edge_stamp), 500);
        assert_eq!(edges[2].edge_stamp.wrapping_sub(edges[1].edge_stamp), 500);
        assert_eq!(edges[70].edge_stamp.wrapping_sub(edges[69].edge_stamp), 1_500);
    }

    #[test]
    fn overflows_arrive_once_per_wrap() {
        let cfg = StimulusConfig::new(ToothWheel::Wheel36m1, 1_000);
        let overflows = WheelStimulus::new(cfg)
            .take(2_000)
            .filter(|event| *event == StimulusEvent::Overflow)
            .count();
        // 2000 events, almost all crank edges at 500 ticks each
        assert!((14..=16).contains(&overflows), "{} overflows", overflows);
    }

    #[test]
    fn capture_after_unserviced_wrap_reports_pending() {
        let cfg = StimulusConfig::new(ToothWheel::Wheel36m1, 1_000)
            .with_start(0, COUNTER_WRAP - 100)
            .with_latency(200, 1_000);
        let mut stimulus = WheelStimulus::new(cfg);

        // Edge before the wrap, handled after it
        let StimulusEvent::Primary(first) = stimulus.next().unwrap() else {
            panic!("expected a crank edge");
        };
        assert!(first.overflow_pending);
        assert_eq!(first.edge_stamp, 0xFF9C);

        // Edge 400 ticks after the wrap, overflow still waiting
        let StimulusEvent::Primary(second) = stimulus.next().unwrap() else {
            panic!("expected a crank edge");
        };
        assert!(second.overflow_pending);
        assert_eq!(second.edge_stamp, 400);

        assert_eq!(stimulus.next(), Some(StimulusEvent::Overflow));
        let StimulusEvent::Primary(third) = stimulus.next().unwrap() else {
            panic!("expected a crank edge");
        };
        assert!(!third.overflow_pending);
    }

    #[test]
    fn cam_pulse_every_second_revolution() {
        let cfg = StimulusConfig::new(ToothWheel::Wheel36m1, 1_000).with_cam(10);
        let mut crank_edges = 0u32;
        let mut cam_rising_at = Vec::new();
        for event in WheelStimulus::new(cfg).take(400) {
            match event {
                StimulusEvent::Primary(_) => crank_edges += 1,
                StimulusEvent::Secondary(capture) if capture.level_high(SECONDARY_INPUT_MASK) => {
                    cam_rising_at.push(crank_edges)
                }
                _ => {}
            }
        }
        assert_eq!(cam_rising_at.len(), 3);
        assert_eq!(cam_rising_at[1] - cam_rising_at[0], 140);
        assert_eq!(cam_rising_at[2] - cam_rising_at[1], 140);
    }
}
