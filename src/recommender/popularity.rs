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

use fnv::FnvHashMap;

use crate::error::{RecoError, Result};
use crate::recommender::Prediction;
use crate::store::RatingStore;

/// Non-personalized baseline which predicts the mean training rating of an item.
#[derive(Clone, Debug)]
pub struct PopularityModel {
    item_means: FnvHashMap<u32, f64>,
    global_mean: f64,
}

impl PopularityModel {

    pub fn fit(train: &RatingStore) -> Result<Self> {

        let global_mean = train.global_mean()
            .ok_or_else(|| RecoError::config("cannot fit the popularity baseline without ratings"))?;

        let item_means = train.items().into_iter()
            .filter_map(|item| train.col_mean(item).map(|mean| (item, mean)))
            .collect();

        Ok(PopularityModel { item_means, global_mean })
    }

    /// The user plays no role here. Items without training ratings get the global mean.
    pub fn predict(&self, item: u32) -> Prediction {
        match self.item_means.get(&item) {
            Some(mean) => Prediction::estimated(*mean),
            None => Prediction::fallback(self.global_mean),
        }
    }

    pub fn item_mean(&self, item: u32) -> Option<f64> {
        self.item_means.get(&item).cloned()
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }
}

#[cfg(test)]
mod tests {

    use super::PopularityModel;
    use crate::config::Scale;
    use crate::store::RatingStore;

    const A: u32 = 0;
    const B: u32 = 1;
    const C: u32 = 2;

    const X: u32 = 10;
    const Y: u32 = 11;
    const W: u32 = 12;

    #[test]
    fn item_means() {
        let train = RatingStore::from_ratings(
            vec![(A, X, 4.0), (B, X, 2.0), (C, X, 5.0), (A, Y, 2.0), (B, Y, 1.0)],
            Scale::default(),
            true,
        ).unwrap();

        let model = PopularityModel::fit(&train).unwrap();

        assert!((model.item_mean(X).unwrap() - 11.0 / 3.0).abs() < 1e-9);
        assert_eq!(model.item_mean(Y), Some(1.5));

        // The user does not matter, unseen users included
        let prediction = model.predict(Y);
        assert_eq!(prediction.value, 1.5);
        assert!(!prediction.cold_start);

        let squared_error = (prediction.value - 2.0).powi(2);
        assert_eq!(squared_error, 0.25);
    }

    #[test]
    fn unseen_items_fall_back_to_the_global_mean() {
        let train = RatingStore::from_ratings(
            vec![(A, X, 4.0), (B, X, 2.0), (C, X, 5.0), (A, Y, 2.0), (B, Y, 1.0)],
            Scale::default(),
            true,
        ).unwrap();

        let model = PopularityModel::fit(&train).unwrap();
        let prediction = model.predict(W);

        assert!(prediction.cold_start);
        assert!((prediction.value - 2.8).abs() < 1e-9);
        assert!((model.global_mean() - 2.8).abs() < 1e-9);
    }

    #[test]
    fn empty_train_cannot_be_fitted() {
        assert!(PopularityModel::fit(&RatingStore::default()).is_err());
    }
}
