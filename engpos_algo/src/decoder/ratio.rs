// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use crate::time_base::Ticks;

/// Period multiplier in Q8 fixed point (256 = 1.0).
///
/// Multiples of 0.5 give the same result as the shift-and-add forms
/// (`p + (p >> 1)` for 1.5, `(p << 1) + (p >> 1)` for 2.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ratio(u16);

impl Ratio {
    const SHIFT: u32 = 8;

    pub const HALF: Ratio = Ratio(128);
    pub const ONE: Ratio = Ratio(256);
    pub const ONE_AND_HALF: Ratio = Ratio(384);
    pub const DOUBLE: Ratio = Ratio(512);
    pub const TWO_AND_HALF: Ratio = Ratio(640);

    /// Ratio from a raw Q8 value
    pub const fn from_q8(raw: u16) -> Self {
        Self(raw)
    }

    /// Ratio of `halves / 2`, e.g. 5 -> 2.5
    pub const fn from_halves(halves: u8) -> Self {
        Self((halves as u16) << (Self::SHIFT - 1))
    }

    pub const fn q8(&self) -> u16 {
        self.0
    }

    /// Scales a period, truncating toward zero.
    #[inline(always)]
    pub const fn of(&self, period: Ticks) -> u64 {
        ((period as u64) * (self.0 as u64)) >> Self::SHIFT
    }
}

/// Open interval `(lower × reference, upper × reference)` for period checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RatioWindow {
    pub lower: Ratio,
    pub upper: Ratio,
}

impl RatioWindow {
    pub const fn new(lower: Ratio, upper: Ratio) -> Self {
        Self { lower, upper }
    }

    /// Window is usable only if it is not empty
    pub const fn is_valid(&self) -> bool {
        self.lower.0 < self.upper.0
    }

    /// True if `candidate` lies strictly inside the window around `reference`
    #[inline(always)]
    pub const fn contains(&self, candidate: Ticks, reference: Ticks) -> bool {
        let candidate = candidate as u64;
        candidate > self.lower.of(reference) && candidate < self.upper.of(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1000)]
    #[case(1001)]
    #[case(7)]
    #[case(0xFFFF_FFFF)]
    fn matches_shift_forms(#[case] p: u32) {
        let p64 = p as u64;
        assert_eq!(Ratio::HALF.of(p), p64 >> 1);
        assert_eq!(Ratio::ONE_AND_HALF.of(p), p64 + (p64 >> 1));
        assert_eq!(Ratio::DOUBLE.of(p), p64 << 1);
        assert_eq!(Ratio::TWO_AND_HALF.of(p), (p64 << 1) + (p64 >> 1));
    }

    #[test]
    fn from_halves() {
        assert_eq!(Ratio::from_halves(1), Ratio::HALF);
        assert_eq!(Ratio::from_halves(3), Ratio::ONE_AND_HALF);
        assert_eq!(Ratio::from_halves(5), Ratio::TWO_AND_HALF);
    }

    #[rstest]
    #[case(1500, false)]
    #[case(1501, true)]
    #[case(2000, true)]
    #[case(2499, true)]
    #[case(2500, false)]
    #[case(3000, false)]
    fn window_is_open_interval(#[case] candidate: u32, #[case] expected: bool) {
        let window = RatioWindow::new(Ratio::ONE_AND_HALF, Ratio::TWO_AND_HALF);
        assert_eq!(window.contains(candidate, 1000), expected);
    }

    #[test]
    fn zero_reference_accepts_nothing() {
        let window = RatioWindow::new(Ratio::HALF, Ratio::DOUBLE);
        assert!(!window.contains(0, 0));
        assert!(!window.contains(100, 0));
    }

    #[test]
    fn empty_window_is_invalid() {
        assert!(!RatioWindow::new(Ratio::DOUBLE, Ratio::DOUBLE).is_valid());
        assert!(!RatioWindow::new(Ratio::DOUBLE, Ratio::HALF).is_valid());
        assert!(RatioWindow::new(Ratio::HALF, Ratio::DOUBLE).is_valid());
    }
}
