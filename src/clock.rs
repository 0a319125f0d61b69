//! Calendar time for the model.
//!
//! Timestep `0` is the start date. Burn-in timesteps are negative and share the same
//! month arithmetic, so `Clock::at` works for any index.
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1 to 12.
    pub month: u32,
}

impl YearMonth {
    fn months_since_epoch(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn from_months_since_epoch(months: i64) -> YearMonth {
        YearMonth {
            year: months.div_euclid(12) as i32,
            month: (months.rem_euclid(12) + 1) as u32,
        }
    }

    /// Decimal year, e.g. March 1997 is `1997 + 2/12`.
    #[must_use]
    pub fn as_float(self) -> f64 {
        f64::from(self.year) + f64::from(self.month - 1) / 12.0
    }
}

#[derive(Clone, Debug)]
pub struct Clock {
    start: YearMonth,
    current: YearMonth,
    end: YearMonth,
    timestep_months: u32,
    timestep: i64,
}

impl Clock {
    /// # Panics
    ///
    /// Panics if `timestep_months` is zero.
    #[must_use]
    pub fn new(start: YearMonth, end: YearMonth, timestep_months: u32) -> Clock {
        assert!(timestep_months > 0, "Timestep must be at least one month");
        Clock {
            start,
            current: start,
            end,
            timestep_months,
            timestep: 0,
        }
    }

    /// A clock positioned at `timestep` (negative during burn-in).
    #[must_use]
    pub fn at(&self, timestep: i64) -> Clock {
        let months = self.start.months_since_epoch() + timestep * i64::from(self.timestep_months);
        Clock {
            current: YearMonth::from_months_since_epoch(months),
            timestep,
            ..self.clone()
        }
    }

    /// Advances one timestep, carrying into the next year as needed.
    pub fn increment(&mut self) {
        *self = self.at(self.timestep + 1);
    }

    /// False once the current date reaches the end date.
    #[must_use]
    pub fn in_bounds(&self) -> bool {
        self.current < self.end
    }

    #[must_use]
    pub fn timestep(&self) -> i64 {
        self.timestep
    }

    #[must_use]
    pub fn timestep_months(&self) -> u32 {
        self.timestep_months
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.current.year
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        self.current.month
    }

    #[must_use]
    pub fn start(&self) -> YearMonth {
        self.start
    }

    #[must_use]
    pub fn time_float(&self) -> f64 {
        self.current.as_float()
    }

    /// Number of timesteps from the start until the clock leaves bounds.
    #[must_use]
    pub fn total_timesteps(&self) -> i64 {
        let months = self.end.months_since_epoch() - self.start.months_since_epoch();
        let step = i64::from(self.timestep_months);
        (months + step - 1).div_euclid(step).max(0)
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth { year, month }
    }

    #[test]
    fn increment_carries_years() {
        let mut clock = Clock::new(ym(1997, 11), ym(2000, 1), 1);
        clock.increment();
        assert_eq!((clock.year(), clock.month()), (1997, 12));
        clock.increment();
        assert_eq!((clock.year(), clock.month()), (1998, 1));
        assert_eq!(clock.timestep(), 2);
    }

    #[test]
    fn multi_month_steps() {
        let mut clock = Clock::new(ym(1997, 1), ym(2000, 1), 5);
        clock.increment();
        clock.increment();
        clock.increment();
        assert_eq!((clock.year(), clock.month()), (1998, 4));
    }

    #[test]
    fn in_bounds_until_end() {
        let mut clock = Clock::new(ym(1997, 1), ym(1997, 4), 1);
        let mut steps = 0;
        while clock.in_bounds() {
            clock.increment();
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(clock.total_timesteps(), 3);
    }

    #[test]
    fn negative_timesteps_count_back() {
        let clock = Clock::new(ym(1997, 2), ym(2000, 1), 1);
        let burn_in = clock.at(-3);
        assert_eq!((burn_in.year(), burn_in.month()), (1996, 11));
        assert_eq!(burn_in.timestep(), -3);
    }

    #[test]
    fn float_time() {
        let clock = Clock::new(ym(1997, 1), ym(2000, 1), 1).at(6);
        assert_approx_eq!(clock.time_float(), 1997.5);
    }

    #[test]
    #[should_panic(expected = "Timestep must be at least one month")]
    fn zero_timestep() {
        let _ = Clock::new(ym(1997, 1), ym(2000, 1), 0);
    }
}
