/**
 * RecoLab
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use scoped_pool::Pool;
use serde_derive::Serialize;

use crate::error::{RecoError, Result};
use crate::recommender::Predictions;
use crate::store::RatingStore;

/// Number of users accumulated by one pool job.
const SHARD_SIZE: usize = 256;

/// Partial error sums. Merging is associative and commutative, so partial results computed on
/// different threads can be combined in any order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErrorAccumulator {
    pub sum_of_squared_errors: f64,
    pub sum_of_absolute_errors: f64,
    pub covered: usize,
    pub cold_starts: usize,
    pub total: usize,
}

impl ErrorAccumulator {

    pub fn add(&mut self, predicted: Option<(f64, bool)>, actual: f64) {
        self.total += 1;

        if let Some((value, cold_start)) = predicted {
            let error = value - actual;
            self.sum_of_squared_errors += error * error;
            self.sum_of_absolute_errors += error.abs();
            self.covered += 1;
            if cold_start {
                self.cold_starts += 1;
            }
        }
    }

    pub fn merge(self, other: ErrorAccumulator) -> ErrorAccumulator {
        ErrorAccumulator {
            sum_of_squared_errors: self.sum_of_squared_errors + other.sum_of_squared_errors,
            sum_of_absolute_errors: self.sum_of_absolute_errors + other.sum_of_absolute_errors,
            covered: self.covered + other.covered,
            cold_starts: self.cold_starts + other.cold_starts,
            total: self.total + other.total,
        }
    }

    pub fn report(&self) -> AccuracyReport {
        let (rmse, mae) = if self.covered > 0 {
            let covered = self.covered as f64;
            (
                Some((self.sum_of_squared_errors / covered).sqrt()),
                Some(self.sum_of_absolute_errors / covered),
            )
        } else {
            (None, None)
        };

        AccuracyReport {
            rmse,
            mae,
            coverage: ratio(self.covered, self.total),
            covered: self.covered,
            total: self.total,
            cold_starts: self.cold_starts,
            cold_start_rate: ratio(self.cold_starts, self.covered),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Out-of-sample accuracy of a set of predictions. RMSE and MAE are computed over the covered
/// pairs only and are absent if nothing was covered. Fallback predictions count as covered, how
/// many of them there were is reported separately.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub rmse: Option<f64>,
    pub mae: Option<f64>,
    pub coverage: f64,
    pub covered: usize,
    pub total: usize,
    pub cold_starts: usize,
    pub cold_start_rate: f64,
}

/// Compares `predictions` against the held-out ratings in `actual`.
pub fn evaluate(predictions: &Predictions, actual: &RatingStore) -> Result<AccuracyReport> {
    ensure_not_empty(actual)?;

    let accumulator = actual.users().into_iter()
        .map(|user| accumulate(predictions, actual, user))
        .fold(ErrorAccumulator::default(), ErrorAccumulator::merge);

    Ok(accumulator.report())
}

/// Like [`evaluate`], with users sharded over the pool. The shards do not depend on the pool
/// size, so neither does the result.
pub fn evaluate_on(
    pool: &Pool,
    predictions: &Predictions,
    actual: &RatingStore,
) -> Result<AccuracyReport> {

    ensure_not_empty(actual)?;

    let users = actual.users();
    let mut partials = vec![ErrorAccumulator::default(); (users.len() + SHARD_SIZE - 1) / SHARD_SIZE];

    pool.scoped(|scope| {
        for (chunk, partial) in users.chunks(SHARD_SIZE).zip(partials.iter_mut()) {
            scope.execute(move || {
                *partial = chunk.iter()
                    .map(|user| accumulate(predictions, actual, *user))
                    .fold(ErrorAccumulator::default(), ErrorAccumulator::merge);
            });
        }
    });

    let accumulator = partials.into_iter()
        .fold(ErrorAccumulator::default(), ErrorAccumulator::merge);

    Ok(accumulator.report())
}

fn ensure_not_empty(actual: &RatingStore) -> Result<()> {
    if actual.is_empty() {
        return Err(RecoError::config("cannot evaluate against an empty set of ratings"));
    }
    Ok(())
}

fn accumulate(predictions: &Predictions, actual: &RatingStore, user: u32) -> ErrorAccumulator {
    let mut items: Vec<(u32, f64)> = actual.row(user).collect();
    items.sort_unstable_by_key(|&(item, _)| item);

    let mut accumulator = ErrorAccumulator::default();
    for (item, value) in items {
        let predicted = predictions.get(user, item)
            .map(|prediction| (prediction.value, prediction.cold_start));
        accumulator.add(predicted, value);
    }

    accumulator
}
