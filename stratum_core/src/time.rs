// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame clock values.
//!
//! The host that ticks the frame driver supplies [`HostTime`] readings in
//! whatever monotonic unit it counts in. Phase durations in a
//! [`FrameSummary`](crate::trace::FrameSummary) are differences of those
//! readings; a [`Timebase`] turns them into wall-clock units for display.

use core::fmt;

/// A monotonic clock reading in host ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`; zero if the clock went backwards.
    #[inline]
    #[must_use]
    pub const fn ticks_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Ticks-to-nanoseconds ratio: `nanos = ticks * numer / denom`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator.
    pub numer: u32,
    /// Denominator; never zero.
    pub denom: u32,
}

impl Timebase {
    /// Ticks are nanoseconds.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Ticks are microseconds.
    pub const MICROS: Self = Self {
        numer: 1_000,
        denom: 1,
    };

    /// Creates a timebase.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(denom != 0, "timebase denominator must not be zero");
        Self { numer, denom }
    }

    /// Converts ticks to nanoseconds, saturating at `u64::MAX`.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "range checked before narrowing"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        let wide = ticks as u128 * self.numer as u128 / self.denom as u128;
        if wide > u64::MAX as u128 {
            u64::MAX
        } else {
            wide as u64
        }
    }

    /// Converts ticks to fractional microseconds.
    #[inline]
    #[must_use]
    pub fn ticks_to_micros(self, ticks: u64) -> f64 {
        self.ticks_to_nanos(ticks) as f64 / 1_000.0
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_ticks_saturate() {
        assert_eq!(HostTime(1_500).ticks_since(HostTime(1_000)), 500, "forward");
        assert_eq!(HostTime(1_000).ticks_since(HostTime(1_500)), 0, "backwards");
    }

    #[test]
    fn timebases_convert_to_micros() {
        assert_eq!(Timebase::NANOS.ticks_to_micros(2_500), 2.5, "nanosecond ticks");
        assert_eq!(Timebase::MICROS.ticks_to_micros(16), 16.0, "microsecond ticks");
        // 24 MHz host counter.
        let tb = Timebase::new(125, 3);
        assert_eq!(tb.ticks_to_nanos(24_000_000), 1_000_000_000, "one second");
    }

    #[test]
    fn huge_tick_counts_saturate() {
        let tb = Timebase::new(1_000, 1);
        assert_eq!(tb.ticks_to_nanos(u64::MAX), u64::MAX, "clamped");
    }
}
