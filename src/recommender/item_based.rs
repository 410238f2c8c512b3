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

use std::borrow::Cow;

use fnv::FnvHashMap;
use scoped_pool::Pool;
use tracing::debug;

use crate::config::{Normalization, RecommenderConfig};
use crate::error::{RecoError, Result};
use crate::neighbors;
use crate::normalize;
use crate::recommender::{prepare, Prediction};
use crate::similarity::{self, Axis, SimilarityMatrix};
use crate::store::RatingStore;
use crate::types::{self, SparseVector};

/// Item-based collaborative filtering. Only the k most similar items are retained per item, the
/// estimate for (u, i) is the similarity-weighted average of u's ratings for those neighbors of
/// i that u has rated.
#[derive(Clone, Debug)]
pub struct ItemBasedModel {
    /// Training ratings, mean-centered per user if configured.
    ratings: RatingStore,
    user_means: FnvHashMap<u32, f64>,
    item_means: FnvHashMap<u32, f64>,
    similarities: SimilarityMatrix,
    normalization: Normalization,
    k: usize,
    global_mean: f64,
}

impl ItemBasedModel {

    pub fn fit(train: &RatingStore, config: &RecommenderConfig, pool: &Pool) -> Result<Self> {

        let global_mean = train.global_mean()
            .ok_or_else(|| RecoError::config("cannot fit IBCF without ratings"))?;

        let item_means = train.items().into_iter()
            .filter_map(|item| train.col_mean(item).map(|mean| (item, mean)))
            .collect();

        let (ratings, user_means) = prepare(train, config.normalize)?;

        let all_similarities =
            similarity::pairwise(&ratings, Axis::Items, config.similarity_method, pool);
        let similarities = all_similarities.prune(config.k);

        debug!(
            "Pruned item similarities from {} to {} entries (k={})",
            all_similarities.num_entries(),
            similarities.num_entries(),
            config.k,
        );

        Ok(ItemBasedModel {
            ratings,
            user_means,
            item_means,
            similarities,
            normalization: config.normalize,
            k: config.k,
            global_mean,
        })
    }

    pub fn similarities(&self) -> &SimilarityMatrix {
        &self.similarities
    }

    pub fn predict(&self, user: u32, item: u32, context: &RatingStore) -> Prediction {

        let profile = match context.row_vector(user).filter(|row| !row.is_empty()) {
            Some(row) => self.profile_from(row),
            None => self.ratings.row_vector(user)
                .map(|row| (Cow::Borrowed(row), self.user_means.get(&user).cloned().unwrap_or(0.0))),
        };

        let estimate = profile.and_then(|(ratings, mean)| self.estimate(item, &ratings, mean));

        match estimate {
            Some(value) => Prediction::estimated(value),
            None => match self.item_means.get(&item) {
                Some(mean) => Prediction::fallback(*mean),
                None => Prediction::fallback(self.global_mean),
            },
        }
    }

    /// Weighted average over the retained neighbors of `item` which appear in `ratings`.
    /// `ratings` are in the model's rating space, `mean` maps them back to the rating scale.
    fn estimate(&self, item: u32, ratings: &SparseVector, mean: f64) -> Option<f64> {

        let candidates = self.similarities.row(item)?;

        let mut weighted_ratings = 0.0;
        let mut sum_of_weights = 0.0;

        for neighbor in neighbors::select(item, candidates, self.k) {
            if let Some(rating) = ratings.get(&neighbor.id) {
                weighted_ratings += neighbor.similarity * rating;
                sum_of_weights += neighbor.similarity.abs();
            }
        }

        if sum_of_weights > 0.0 {
            let estimate = weighted_ratings / sum_of_weights;
            match self.normalization {
                Normalization::Center => Some(mean + estimate),
                Normalization::None => Some(estimate),
            }
        } else {
            None
        }
    }

    /// Ratings and mean of a user known only through `profile`, brought into the rating space
    /// of the model.
    fn profile_from<'a>(&self, profile: &'a SparseVector) -> Option<(Cow<'a, SparseVector>, f64)> {
        match self.normalization {
            Normalization::Center => normalize::center_vector(profile)
                .map(|(centered, mean)| (Cow::Owned(centered), mean)),
            Normalization::None => types::mean(profile)
                .map(|mean| (Cow::Borrowed(profile), mean)),
        }
    }
}
