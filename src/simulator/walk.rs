//! Bounded random walk

use std::ops::RangeInclusive;

use rand::Rng;

/// Integer value that drifts by at most `step` per tick and stays in range
#[derive(Debug, Clone)]
pub struct RandomWalk {
    value: i64,
    min: i64,
    max: i64,
    step: i64,
}

impl RandomWalk {
    /// Start at the midpoint of `range`
    pub fn new(range: RangeInclusive<i64>, step: i64) -> Self {
        let (min, max) = ordered(range);
        let mid = ((i128::from(min) + i128::from(max)) / 2) as i64;
        Self::starting_at(mid, min..=max, step)
    }

    /// Start at `value` (clamped into `range`)
    pub fn starting_at(value: i64, range: RangeInclusive<i64>, step: i64) -> Self {
        let (min, max) = ordered(range);
        Self {
            value: value.clamp(min, max),
            min,
            max,
            step: step.saturating_abs(),
        }
    }

    /// Current value
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Advance one tick and return the new value
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> i64 {
        if self.step > 0 {
            let delta = rng.gen_range(-self.step..=self.step);
            self.value = self.value.saturating_add(delta).clamp(self.min, self.max);
        }
        self.value
    }
}

fn ordered(range: RangeInclusive<i64>) -> (i64, i64) {
    let (a, b) = range.into_inner();
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
