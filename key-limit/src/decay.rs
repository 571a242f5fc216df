use std::time::Duration;

/// Whole units accrued over `elapsed` at `per_second`.
///
/// Truncates toward zero: 3.4s at 2 units/s accrues 6, not 6.8. Callers
/// rewrite their `last seen` timestamp to "now" on every call, so the
/// fractional remainder is discarded rather than carried forward. Both
/// buckets share this arithmetic; it is part of their contract, not an
/// accident of implementation.
pub(crate) fn accrued_units(elapsed: Duration, per_second: f64) -> usize {
    (elapsed.as_secs_f64() * per_second) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_toward_zero() {
        let cases = [
            (Duration::from_millis(3400), 2.0, 6),
            (Duration::from_millis(990), 1.0, 0),
            (Duration::from_millis(1000), 1.0, 1),
            (Duration::from_millis(2000), 2.5, 5),
            (Duration::from_millis(900), 2.5, 2),
            (Duration::ZERO, 10.0, 0),
        ];

        for (elapsed, rate, expected) in cases {
            assert_eq!(
                accrued_units(elapsed, rate),
                expected,
                "elapsed {elapsed:?} at {rate}/s"
            );
        }
    }

    #[test]
    fn test_sub_unit_progress_is_lost() {
        // Three separate 400ms reads at 2/s each truncate to 0, even though
        // one 1200ms read would accrue 2.
        let split: usize = (0..3)
            .map(|_| accrued_units(Duration::from_millis(400), 2.0))
            .sum();
        assert_eq!(split, 0);
        assert_eq!(accrued_units(Duration::from_millis(1200), 2.0), 2);
    }
}
