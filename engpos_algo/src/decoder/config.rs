// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use thiserror::Error;

use super::ratio::RatioWindow;
use super::wheel::{edges_per_revolution, landmark_window, Polarity, ToothWheel, TOOTH_WINDOW};

/// Reasons a decoder configuration is refused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The wheel has no gap to find
    #[error("wheel has no missing tooth")]
    NoMissingTeeth,
    /// Missing teeth leave no physical tooth
    #[error("{teeth}-{missing} wheel has no present tooth")]
    NoPresentTeeth { teeth: u8, missing: u8 },
    /// Landmark window lower bound is not below the upper bound
    #[error("landmark ratio window is empty")]
    EmptyLandmarkWindow,
    /// Tooth window lower bound is not below the upper bound
    #[error("tooth ratio window is empty")]
    EmptyToothWindow,
}

/// Primary and secondary decoder settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderConfig {
    teeth: u8,   // Tooth positions on the wheel
    missing: u8, // Teeth removed to form the landmark gap

    landmark_index: u16,          // Tooth index at which the next landmark is due
    landmark_window: RatioWindow, // Gap period relative to the previous tooth
    tooth_window: RatioWindow,    // Regular tooth period relative to the previous tooth

    primary_polarity: Polarity,
    secondary_polarity: Polarity,
}

impl DecoderConfig {
    /// Default settings for a catalogue wheel
    pub const fn for_wheel(wheel: ToothWheel) -> Self {
        let missing = wheel.nr_of_missing_teeth();
        Self {
            teeth: wheel.nr_of_teeth(),
            missing,
            landmark_index: wheel.edges_per_revolution(),
            landmark_window: landmark_window(missing),
            tooth_window: TOOTH_WINDOW,
            primary_polarity: Polarity::Rising,
            secondary_polarity: Polarity::Rising,
        }
    }

    /// Settings for any missing-tooth wheel with explicit ratio windows
    pub fn new(
        teeth: u8,
        missing: u8,
        landmark_window: RatioWindow,
        tooth_window: RatioWindow,
    ) -> Result<Self, ConfigError> {
        if missing == 0 {
            return Err(ConfigError::NoMissingTeeth);
        }
        if missing >= teeth {
            return Err(ConfigError::NoPresentTeeth { teeth, missing });
        }
        if !landmark_window.is_valid() {
            return Err(ConfigError::EmptyLandmarkWindow);
        }
        if !tooth_window.is_valid() {
            return Err(ConfigError::EmptyToothWindow);
        }

        Ok(Self {
            teeth,
            missing,
            landmark_index: edges_per_revolution(teeth, missing),
            landmark_window,
            tooth_window,
            primary_polarity: Polarity::Rising,
            secondary_polarity: Polarity::Rising,
        })
    }

    pub const fn with_primary_polarity(mut self, polarity: Polarity) -> Self {
        self.primary_polarity = polarity;
        self
    }

    pub const fn with_secondary_polarity(mut self, polarity: Polarity) -> Self {
        self.secondary_polarity = polarity;
        self
    }

    pub const fn teeth(&self) -> u8 {
        self.teeth
    }

    pub const fn missing_teeth(&self) -> u8 {
        self.missing
    }

    /// Number of accepted edges from one landmark to the next
    pub const fn landmark_index(&self) -> u16 {
        self.landmark_index
    }

    pub const fn landmark_window(&self) -> RatioWindow {
        self.landmark_window
    }

    pub const fn tooth_window(&self) -> RatioWindow {
        self.tooth_window
    }

    pub const fn primary_polarity(&self) -> Polarity {
        self.primary_polarity
    }

    pub const fn secondary_polarity(&self) -> Polarity {
        self.secondary_polarity
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::for_wheel(ToothWheel::Wheel36m1)
    }
}
