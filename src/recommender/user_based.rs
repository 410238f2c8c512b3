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
use scoped_pool::Pool;

use crate::config::{Normalization, RecommenderConfig};
use crate::error::{RecoError, Result};
use crate::neighbors::{self, Neighbor};
use crate::normalize;
use crate::recommender::{prepare, Prediction};
use crate::similarity::{self, Axis, Similarity, SimilarityMatrix};
use crate::store::RatingStore;
use crate::types;

/// User-based collaborative filtering. The estimate for (u, i) is the mean of u plus the
/// similarity-weighted average deviation from their means of the k users most similar to u
/// who rated i.
#[derive(Clone, Debug)]
pub struct UserBasedModel {
    /// Training ratings, mean-centered per user if configured.
    ratings: RatingStore,
    means: FnvHashMap<u32, f64>,
    similarities: SimilarityMatrix,
    measure: Similarity,
    normalization: Normalization,
    k: usize,
    global_mean: f64,
}

impl UserBasedModel {

    pub fn fit(train: &RatingStore, config: &RecommenderConfig, pool: &Pool) -> Result<Self> {

        let global_mean = train.global_mean()
            .ok_or_else(|| RecoError::config("cannot fit UBCF without ratings"))?;

        let (ratings, means) = prepare(train, config.normalize)?;
        let similarities =
            similarity::pairwise(&ratings, Axis::Users, config.similarity_method, pool);

        Ok(UserBasedModel {
            ratings,
            means,
            similarities,
            measure: config.similarity_method,
            normalization: config.normalize,
            k: config.k,
            global_mean,
        })
    }

    pub fn similarities(&self) -> &SimilarityMatrix {
        &self.similarities
    }

    pub fn predict(&self, user: u32, item: u32, context: &RatingStore) -> Prediction {

        let (mean, neighbors) = match context.row_vector(user).filter(|row| !row.is_empty()) {
            Some(row) => match self.neighbors_of_profile(user, row) {
                Some(found) => found,
                None => return Prediction::fallback(self.global_mean),
            },
            None => match self.means.get(&user) {
                Some(mean) => {
                    let neighbors = self.similarities.row(user)
                        .map(|similarities| neighbors::select(user, similarities, self.k))
                        .unwrap_or_default();
                    (*mean, neighbors)
                },
                None => return Prediction::fallback(self.global_mean),
            },
        };

        let mut weighted_deviations = 0.0;
        let mut sum_of_weights = 0.0;

        for neighbor in neighbors {
            if let Some(rating) = self.ratings.get(neighbor.id, item) {
                let deviation = match self.normalization {
                    Normalization::Center => rating,
                    Normalization::None => rating - self.means[&neighbor.id],
                };
                weighted_deviations += neighbor.similarity * deviation;
                sum_of_weights += neighbor.similarity.abs();
            }
        }

        if sum_of_weights > 0.0 {
            Prediction::estimated(mean + weighted_deviations / sum_of_weights)
        } else {
            Prediction::fallback(mean)
        }
    }

    /// Mean and neighborhood of a user known only through `profile`, e.g. a test user whose
    /// revealed ratings were not part of training.
    fn neighbors_of_profile(
        &self,
        user: u32,
        profile: &types::SparseVector,
    ) -> Option<(f64, Vec<Neighbor>)> {

        let (centered, mean) = normalize::center_vector(profile)?;

        let query = match self.normalization {
            Normalization::Center => &centered,
            Normalization::None => profile,
        };

        let similarities =
            similarity::similarities_to(Some(user), query, &self.ratings, Axis::Users, self.measure);

        Some((mean, neighbors::select(user, &similarities, self.k)))
    }
}

#[cfg(test)]
mod tests {

    use scoped_pool::Pool;

    use super::UserBasedModel;
    use crate::config::{Normalization, RecommenderConfig, Scale};
    use crate::similarity::Similarity;
    use crate::store::RatingStore;

    const A: u32 = 0;
    const B: u32 = 1;
    const D: u32 = 3;

    const X: u32 = 0;
    const Y: u32 = 1;
    const Z: u32 = 2;
    const V: u32 = 3;

    fn train() -> RatingStore {
        RatingStore::from_ratings(
            vec![(A, X, 5.0), (A, Y, 3.0), (A, Z, 4.0), (B, X, 3.0), (B, Y, 1.0), (B, Z, 2.0)],
            Scale::default(),
            true,
        ).unwrap()
    }

    fn revealed() -> RatingStore {
        RatingStore::from_ratings(vec![(D, X, 5.0), (D, Z, 4.0)], Scale::default(), true).unwrap()
    }

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 1e-9
    }

    #[test]
    fn worked_example() {
        let pool = Pool::new(2);

        for measure in &[Similarity::Cosine, Similarity::Pearson] {
            for normalization in &[Normalization::Center, Normalization::None] {
                let config = RecommenderConfig::user_based(2)
                    .with_similarity(*measure)
                    .with_normalization(*normalization);

                let model = UserBasedModel::fit(&train(), &config, &pool).unwrap();
                let prediction = model.predict(D, Y, &revealed());

                assert!(!prediction.cold_start);
                assert!(close_enough_to(prediction.value, 3.5), "{:?}", prediction);
            }
        }

        pool.shutdown();
    }

    #[test]
    fn train_users_use_the_fitted_similarities() {
        let pool = Pool::new(1);
        let config = RecommenderConfig::user_based(1).with_similarity(Similarity::Pearson);
        let model = UserBasedModel::fit(&train(), &config, &pool).unwrap();

        assert!(close_enough_to(model.similarities().get(A, B).unwrap(), 1.0));

        // A's only neighbor is B, who rated Y one below their mean
        let prediction = model.predict(A, Y, &RatingStore::default());
        assert!(close_enough_to(prediction.value, 3.0));
        assert!(!prediction.cold_start);

        pool.shutdown();
    }

    #[test]
    fn cold_starts() {
        let pool = Pool::new(1);
        let model = UserBasedModel::fit(&train(), &RecommenderConfig::user_based(2), &pool).unwrap();

        // Nobody rated V: fall back to the user's own mean
        let prediction = model.predict(D, V, &revealed());
        assert!(prediction.cold_start);
        assert!(close_enough_to(prediction.value, 4.5));

        // Unknown user without revealed ratings: global mean
        let prediction = model.predict(42, Y, &revealed());
        assert!(prediction.cold_start);
        assert!(close_enough_to(prediction.value, 3.0));

        pool.shutdown();
    }
}
