// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::ratio::{Ratio, RatioWindow};

/// Logical transition that counts as the leading edge of an input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    Rising,
    Falling,
}

impl Polarity {
    /// Decides from the pin level sampled right after the edge
    #[inline(always)]
    pub const fn is_leading(&self, level_high: bool) -> bool {
        match *self {
            Polarity::Rising => level_high,
            Polarity::Falling => !level_high,
        }
    }
}

/// Missing-tooth crank wheels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ToothWheel {
    Wheel12m1,
    Wheel24m1,
    Wheel36m1,
    Wheel36m2,
    Wheel60m1,
    Wheel60m2,
}

impl ToothWheel {
    /// Returns the number of tooth positions, present or not
    pub const fn nr_of_teeth(&self) -> u8 {
        match *self {
            ToothWheel::Wheel12m1 => 12,
            ToothWheel::Wheel24m1 => 24,
            ToothWheel::Wheel36m1 | ToothWheel::Wheel36m2 => 36,
            ToothWheel::Wheel60m1 | ToothWheel::Wheel60m2 => 60,
        }
    }

    /// Returns the number of missing teeth forming the landmark gap
    pub const fn nr_of_missing_teeth(&self) -> u8 {
        match *self {
            ToothWheel::Wheel12m1
            | ToothWheel::Wheel24m1
            | ToothWheel::Wheel36m1
            | ToothWheel::Wheel60m1 => 1,
            ToothWheel::Wheel36m2 | ToothWheel::Wheel60m2 => 2,
        }
    }

    /// Returns the number of physical teeth
    pub const fn nr_of_present_teeth(&self) -> u8 {
        self.nr_of_teeth() - self.nr_of_missing_teeth()
    }

    /// Two edges per physical tooth
    pub const fn edges_per_revolution(&self) -> u16 {
        edges_per_revolution(self.nr_of_teeth(), self.nr_of_missing_teeth())
    }
}

pub(crate) const fn edges_per_revolution(teeth: u8, missing: u8) -> u16 {
    2 * (teeth as u16 - missing as u16)
}

/// Landmark window for a gap of `missing` teeth.
///
/// The full period across the gap is nominally `missing + 1` teeth, the window is
/// half a tooth either side of it: 1.5×..2.5× for one missing tooth.
pub const fn landmark_window(missing: u8) -> RatioWindow {
    let halves = 2 * missing as u16;
    RatioWindow::new(
        Ratio::from_q8((halves + 1) << 7),
        Ratio::from_q8((halves + 3) << 7),
    )
}

/// Regular tooth window, 0.5×..2.0× of the previous tooth
pub const TOOTH_WINDOW: RatioWindow = RatioWindow::new(Ratio::HALF, Ratio::DOUBLE);
