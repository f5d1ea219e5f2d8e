use chrono::{Datelike, Local, NaiveDate};
use rand::Rng;

/// Seed type shared by the generator, sessions and history records
pub type Seed = u32;

/// Seeded pseudo-random source using the Mulberry32 mixing function.
///
/// The stream depends only on the seed, so every player who plays the daily
/// challenge on the same date sees the same text on any platform.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    state: u32,
}

impl SeededRandom {
    pub fn new(seed: Seed) -> Self {
        Self { state: seed }
    }

    /// Next uniform float in [0, 1)
    pub fn next(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let s = self.state;
        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        (t ^ (t >> 14)) as f64 / 4_294_967_296.0
    }

    /// Integer in [min, max) by floor scaling. Slightly biased for tiny ranges.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        (self.next() * (max - min) as f64).floor() as i64 + min
    }

    /// Uniformly choose one element, `None` for an empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_int(0, items.len() as i64) as usize;
        items.get(idx)
    }

    /// Cumulative-weight draw over `items`.
    ///
    /// The draw is scaled by the total weight and each weight is subtracted in
    /// order; the first item that brings the remainder to zero or below wins.
    /// Floating-point residue can leave the remainder positive after the last
    /// weight, in which case the last item is returned.
    pub fn weighted_pick<'a, T>(&mut self, items: &'a [T], weights: &[f64]) -> Option<&'a T> {
        let last = items.last()?;
        let total: f64 = weights.iter().sum();
        let mut remainder = self.next() * total;

        for (item, weight) in items.iter().zip(weights) {
            remainder -= weight;
            if remainder <= 0.0 {
                return Some(item);
            }
        }

        Some(last)
    }
}

/// Stable seed for a calendar date: `year * 10000 + month * 100 + day`
pub fn date_to_seed(date: NaiveDate) -> Seed {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// Seed of today's daily challenge in local time
pub fn today_seed() -> Seed {
    date_to_seed(Local::now().date_naive())
}

/// Non-deterministic seed in [0, 2^31 - 1) for practice runs
pub fn random_seed() -> Seed {
    rand::thread_rng().gen_range(0..i32::MAX as u32)
}
