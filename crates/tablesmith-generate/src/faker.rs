//! Random-value provider capability and its `fake`-backed implementation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use fake::Fake;
use fake::faker::boolean::en::Boolean;
use fake::faker::chrono::en::DateTimeBetween;
use fake::faker::lorem::en::Word;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

/// Source of realistic random values used by the synthesizer.
pub trait ValueProvider {
    /// Uniform integer in `min..=max`.
    fn int_range(&mut self, min: i64, max: i64) -> i64;
    /// A single word.
    fn word(&mut self) -> String;
    /// A date-time no later than the provider's upper bound.
    fn date_time(&mut self) -> NaiveDateTime;
    fn boolean(&mut self) -> bool;
    /// Signed number with up to `left_digits` integer digits and
    /// `right_digits` fractional digits.
    fn float(&mut self, left_digits: u32, right_digits: u32) -> f64;
    /// Non-negative decimal with up to `left_digits` integer digits and
    /// exactly `right_digits` fractional digits.
    fn decimal(&mut self, left_digits: u32, right_digits: u32) -> Decimal;
    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// Deterministic provider over a seeded ChaCha stream and the `fake` corpus.
#[derive(Debug, Clone)]
pub struct FakerProvider {
    rng: ChaCha8Rng,
    earliest: DateTime<Utc>,
    latest: DateTime<Utc>,
}

impl FakerProvider {
    /// Provider whose date-times fall between the Unix epoch and `until`.
    pub fn new(seed: u64, until: NaiveDate) -> Self {
        let latest = until.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            earliest: DateTime::<Utc>::default(),
            latest,
        }
    }
}

impl ValueProvider for FakerProvider {
    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        self.rng.random_range(min..=max)
    }

    fn word(&mut self) -> String {
        Word().fake_with_rng(&mut self.rng)
    }

    fn date_time(&mut self) -> NaiveDateTime {
        let value: DateTime<Utc> =
            DateTimeBetween(self.earliest, self.latest).fake_with_rng(&mut self.rng);
        value.naive_utc()
    }

    fn boolean(&mut self) -> bool {
        Boolean(50).fake_with_rng(&mut self.rng)
    }

    fn float(&mut self, left_digits: u32, right_digits: u32) -> f64 {
        let whole = self.rng.random_range(0..10_i64.pow(left_digits));
        let fraction_base = 10_i64.pow(right_digits);
        let fraction = self.rng.random_range(0..fraction_base);
        let magnitude = (whole * fraction_base + fraction) as f64 / fraction_base as f64;
        if self.rng.random_bool(0.5) {
            -magnitude
        } else {
            magnitude
        }
    }

    fn decimal(&mut self, left_digits: u32, right_digits: u32) -> Decimal {
        let bound = 10_i128.pow(left_digits + right_digits);
        let mantissa = self.rng.random_range(0..bound);
        Decimal::from_i128_with_scale(mantissa, right_digits)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(seed: u64) -> FakerProvider {
        FakerProvider::new(seed, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap())
    }

    #[test]
    fn same_seed_yields_same_stream() {
        let mut a = provider(7);
        let mut b = provider(7);
        for _ in 0..20 {
            assert_eq!(a.word(), b.word());
            assert_eq!(a.int_range(0, 9999), b.int_range(0, 9999));
            assert_eq!(a.date_time(), b.date_time());
        }
    }

    #[test]
    fn decimal_respects_digit_budget() {
        let mut provider = provider(11);
        for _ in 0..200 {
            let value = provider.decimal(8, 2);
            assert_eq!(value.scale(), 2);
            assert!(!value.is_sign_negative());
            assert!(value < Decimal::new(100_000_000, 0));
        }
    }

    #[test]
    fn float_stays_within_five_integer_digits() {
        let mut provider = provider(3);
        for _ in 0..200 {
            let value = provider.float(5, 2);
            assert!(value.abs() < 100_000.0);
        }
    }

    #[test]
    fn date_times_do_not_pass_the_upper_bound() {
        let mut provider = provider(5);
        let bound = NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        for _ in 0..100 {
            assert!(provider.date_time() <= bound);
        }
    }
}
