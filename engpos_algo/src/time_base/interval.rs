// Licensed under the Apache License, Version 2.0
// Copyright 2024 Anton Khrustalev, creapunk.com

use super::{ExtendedTime, Ticks};

/// Largest value of the wide counter, used as the wrap modulus.
///
/// One tick short of the true 2^32 modulus: an interval that spans the wrap of
/// the wide counter reads one tick short.
pub const WIDE_MAX: u32 = 0xFFFF_FFFF;

/// Elapsed ticks from `previous` to `current`.
///
/// Anything not strictly later than `previous` is treated as a wrap of the wide counter.
#[inline(always)]
pub const fn elapsed(previous: ExtendedTime, current: ExtendedTime) -> Ticks {
    let previous = previous.ticks();
    let current = current.ticks();
    if current > previous {
        current - previous
    } else {
        // current <= previous, so the sum cannot overflow
        current + (WIDE_MAX - previous)
    }
}
