//! Time sources for the clock register bank
//!
//! The handler never reads the system clock directly. It asks a [`TimeSource`]
//! for a [`ClockReading`], which keeps request handling pure and lets tests pin
//! the time.

use std::sync::Arc;

use chrono::{Datelike, Local, Timelike};

use crate::constants::{
    CLOCK_REGISTER_COUNT, REG_DAY, REG_HOUR, REG_MINUTE, REG_MONTH, REG_SECOND, REG_YEAR,
};

/// Calendar fields sampled at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockReading {
    pub day: u16,
    pub month: u16,
    pub year: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
}

impl ClockReading {
    pub fn new(day: u16, month: u16, year: u16, hour: u16, minute: u16, second: u16) -> Self {
        Self {
            day,
            month,
            year,
            hour,
            minute,
            second,
        }
    }

    /// Sample the calendar fields of any chrono date-time
    pub fn from_datetime<T: Datelike + Timelike>(dt: &T) -> Self {
        Self {
            day: dt.day() as u16,
            month: dt.month() as u16,
            // Years outside 0..=65535 cannot be represented in one register
            year: dt.year().clamp(0, i32::from(u16::MAX)) as u16,
            hour: dt.hour() as u16,
            minute: dt.minute() as u16,
            // Leap seconds are reported by chrono as second 59
            second: dt.second().min(59) as u16,
        }
    }

    /// Project into the register bank, ordered by address:
    /// `[day, month, year, hour, minute, second]`
    pub fn registers(&self) -> [u16; CLOCK_REGISTER_COUNT as usize] {
        let mut bank = [0u16; CLOCK_REGISTER_COUNT as usize];
        bank[REG_DAY as usize] = self.day;
        bank[REG_MONTH as usize] = self.month;
        bank[REG_YEAR as usize] = self.year;
        bank[REG_HOUR as usize] = self.hour;
        bank[REG_MINUTE as usize] = self.minute;
        bank[REG_SECOND as usize] = self.second;
        bank
    }
}

/// Source of the current time
///
/// Implementations must be cheap and side-effect free; one is called for every
/// successful read request, from any number of sessions at once.
pub trait TimeSource: Send + Sync {
    /// Sample the clock now
    fn read(&self) -> ClockReading;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn read(&self) -> ClockReading {
        (**self).read()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn read(&self) -> ClockReading {
        (**self).read()
    }
}

/// Local system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn read(&self) -> ClockReading {
        ClockReading::from_datetime(&Local::now())
    }
}

/// Clock frozen at a single reading
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub ClockReading);

impl TimeSource for FixedClock {
    fn read(&self) -> ClockReading {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_registers_order() {
        let reading = ClockReading::new(15, 6, 2025, 10, 30, 45);
        assert_eq!(reading.registers(), [15, 6, 2025, 10, 30, 45]);
    }

    #[test]
    fn test_from_datetime() {
        let dt = NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 58)
            .unwrap();
        let reading = ClockReading::from_datetime(&dt);
        assert_eq!(reading, ClockReading::new(31, 12, 2025, 23, 59, 58));
    }

    #[test]
    fn test_fixed_clock_through_arc() {
        let clock: Arc<dyn TimeSource> =
            Arc::new(FixedClock(ClockReading::new(1, 1, 2000, 0, 0, 0)));
        assert_eq!(clock.read().year, 2000);
    }

    #[test]
    fn test_system_clock_fields_in_range() {
        let reading = SystemClock.read();
        assert!((1..=31).contains(&reading.day));
        assert!((1..=12).contains(&reading.month));
        assert!(reading.year >= 2024);
        assert!(reading.hour <= 23);
        assert!(reading.minute <= 59);
        assert!(reading.second <= 59);
    }
}
