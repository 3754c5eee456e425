//! Simulated time with nanosecond resolution.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A point on the simulated timeline, stored as whole nanoseconds.
///
/// The same type doubles as a span between two instants: subtracting two
/// `SimTime` values yields a `SimTime`, and adding one to another shifts an
/// instant forward. Integer storage keeps timestamp comparison exact, so two
/// events scheduled for the same instant always compare equal.
///
/// # Examples
///
/// ```
/// use radio_energy_sim::sim::time::SimTime;
///
/// let start = SimTime::from_secs_f64(1.0);
/// let end = SimTime::from_secs_f64(2.25);
/// assert_eq!((end - start).as_secs_f64(), 1.25);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of the simulated timeline.
    pub const ZERO: SimTime = SimTime(0);

    const NANOS_PER_SEC: f64 = 1e9;

    /// Creates a time value from seconds.
    ///
    /// # Panics
    ///
    /// Panics if `secs` is negative or not finite.
    pub fn from_secs_f64(secs: f64) -> Self {
        assert!(secs.is_finite() && secs >= 0.0, "time must be >= 0");
        Self((secs * Self::NANOS_PER_SEC).round() as u64)
    }

    /// Creates a time value from whole nanoseconds.
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Returns the value in whole nanoseconds.
    pub fn as_nanos(self) -> u64 {
        self.0
    }

    /// Returns the value in seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / Self::NANOS_PER_SEC
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        self.0 += rhs.0;
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    /// # Panics
    ///
    /// Panics if `rhs` is later than `self`; a span on this timeline is
    /// never negative.
    fn sub(self, rhs: SimTime) -> SimTime {
        assert!(rhs.0 <= self.0, "elapsed time must not be negative");
        SimTime(self.0 - rhs.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::SimTime;

    #[test]
    fn from_secs_round_trips() {
        let t = SimTime::from_secs_f64(2.25);
        assert_eq!(t.as_nanos(), 2_250_000_000);
        assert_eq!(t.as_secs_f64(), 2.25);
    }

    #[test]
    fn zero_is_default() {
        assert_eq!(SimTime::default(), SimTime::ZERO);
        assert_eq!(SimTime::ZERO.as_secs_f64(), 0.0);
    }

    #[test]
    fn add_and_sub_are_exact() {
        let a = SimTime::from_secs_f64(1.0);
        let b = SimTime::from_secs_f64(0.25);
        assert_eq!(a + b, SimTime::from_secs_f64(1.25));
        assert_eq!(a - b, SimTime::from_secs_f64(0.75));
    }

    #[test]
    fn ordering_follows_timeline() {
        assert!(SimTime::from_secs_f64(1.0) < SimTime::from_secs_f64(1.5));
        assert!(SimTime::from_secs_f64(2.0) > SimTime::ZERO);
    }

    #[test]
    #[should_panic]
    fn negative_seconds_panics() {
        SimTime::from_secs_f64(-1.0);
    }

    #[test]
    #[should_panic]
    fn negative_span_panics() {
        let _ = SimTime::from_secs_f64(1.0) - SimTime::from_secs_f64(2.0);
    }

    #[test]
    fn display_formats_seconds() {
        let t = SimTime::from_secs_f64(3.75);
        assert_eq!(format!("{t}"), "3.750s");
    }
}
