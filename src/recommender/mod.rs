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

// Rating prediction models. The variants form a closed set, selected by `Method` and
// dispatched through `RecommenderModel`. Models are immutable once fitted.

use std::time::Instant;

use fnv::FnvHashMap;
use scoped_pool::Pool;
use tracing::{debug, info};

use crate::config::{Method, Normalization, RecommenderConfig};
use crate::error::{RecoError, Result};
use crate::normalize;
use crate::store::RatingStore;

pub mod item_based;
pub mod popularity;
pub mod user_based;

pub use self::item_based::ItemBasedModel;
pub use self::popularity::PopularityModel;
pub use self::user_based::UserBasedModel;

/// Number of users whose predictions are computed by one pool job.
const SHARD_SIZE: usize = 128;

/// An estimated rating. `cold_start` marks estimates which come from a fallback mean because no
/// usable neighbor or item statistic was available.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    pub value: f64,
    pub cold_start: bool,
}

impl Prediction {

    pub fn estimated(value: f64) -> Self {
        Prediction { value, cold_start: false }
    }

    pub fn fallback(value: f64) -> Self {
        Prediction { value, cold_start: true }
    }
}

/// Predictions for a batch of (user, item) queries.
#[derive(Clone, Debug, Default)]
pub struct Predictions {
    by_user: FnvHashMap<u32, FnvHashMap<u32, Prediction>>,
}

impl Predictions {

    pub fn insert(&mut self, user: u32, item: u32, prediction: Prediction) {
        self.by_user.entry(user)
            .or_insert_with(|| FnvHashMap::with_capacity_and_hasher(10, Default::default()))
            .insert(item, prediction);
    }

    pub fn get(&self, user: u32, item: u32) -> Option<Prediction> {
        self.by_user.get(&user).and_then(|row| row.get(&item)).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_user.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_cold_starts(&self) -> usize {
        self.by_user.values()
            .flat_map(|row| row.values())
            .filter(|prediction| prediction.cold_start)
            .count()
    }
}

#[derive(Clone, Debug)]
pub enum RecommenderModel {
    Popularity(PopularityModel),
    UserBased(UserBasedModel),
    ItemBased(ItemBasedModel),
}

impl RecommenderModel {

    /// Validates `config` and fits the selected variant on `train`.
    pub fn fit(config: &RecommenderConfig, train: &RatingStore, pool: &Pool) -> Result<Self> {

        config.validate()?;

        if train.is_empty() {
            return Err(RecoError::config(format!(
                "cannot fit {} on an empty training set", config.method)));
        }

        let start = Instant::now();

        let model = match config.method {
            Method::Popular => RecommenderModel::Popularity(PopularityModel::fit(train)?),
            Method::UserBased => RecommenderModel::UserBased(UserBasedModel::fit(train, config, pool)?),
            Method::ItemBased => RecommenderModel::ItemBased(ItemBasedModel::fit(train, config, pool)?),
        };

        info!("Fitted {} on {} ratings in {}ms", config.method, train.num_ratings(),
            start.elapsed().as_millis());

        Ok(model)
    }

    pub fn method(&self) -> Method {
        match self {
            RecommenderModel::Popularity(_) => Method::Popular,
            RecommenderModel::UserBased(_) => Method::UserBased,
            RecommenderModel::ItemBased(_) => Method::ItemBased,
        }
    }

    /// Estimates the rating of `user` for `item`. If `context` holds ratings of `user` (the
    /// revealed ratings of a test user), they are used as the user's profile, otherwise the
    /// user's training ratings are used.
    pub fn predict(&self, user: u32, item: u32, context: &RatingStore) -> Prediction {
        match self {
            RecommenderModel::Popularity(model) => model.predict(item),
            RecommenderModel::UserBased(model) => model.predict(user, item, context),
            RecommenderModel::ItemBased(model) => model.predict(user, item, context),
        }
    }

    /// Predicts every (user, item) pair rated in `queries`, the rating values of `queries` are
    /// never read. Users are sharded over the pool, each job fills its own partial result.
    pub fn predict_batch(
        &self,
        context: &RatingStore,
        queries: &RatingStore,
        pool: &Pool,
    ) -> Predictions {

        let start = Instant::now();
        let users = queries.users();

        let mut shards: Vec<Vec<(u32, u32, Prediction)>> = users.chunks(SHARD_SIZE)
            .map(|_| Vec::new())
            .collect();

        pool.scoped(|scope| {
            for (chunk, shard) in users.chunks(SHARD_SIZE).zip(shards.iter_mut()) {
                scope.execute(move || {
                    for &user in chunk {
                        for (item, _) in queries.row(user) {
                            shard.push((user, item, self.predict(user, item, context)));
                        }
                    }
                });
            }
        });

        let mut predictions = Predictions::default();
        for shard in shards {
            for (user, item, prediction) in shard {
                predictions.insert(user, item, prediction);
            }
        }

        debug!(
            "{} predicted {} ratings for {} users ({} cold starts) in {}ms",
            self.method(),
            predictions.len(),
            users.len(),
            predictions.num_cold_starts(),
            start.elapsed().as_millis(),
        );

        predictions
    }
}

/// The ratings the neighborhood models work on, plus the raw mean rating of every user.
fn prepare(
    train: &RatingStore,
    normalization: Normalization,
) -> Result<(RatingStore, FnvHashMap<u32, f64>)> {

    match normalization {
        Normalization::Center => {
            let centered = normalize::center(train)?;
            Ok((centered.store, centered.means))
        },
        Normalization::None => {
            let means = train.users().into_iter()
                .filter_map(|user| train.row_mean(user).map(|mean| (user, mean)))
                .collect();
            Ok((train.clone(), means))
        },
    }
}

#[cfg(test)]
mod tests {

    use scoped_pool::Pool;

    use super::{Prediction, Predictions, RecommenderModel};
    use crate::config::{Method, RecommenderConfig, Scale};
    use crate::store::RatingStore;

    fn train() -> RatingStore {
        RatingStore::from_ratings(
            vec![(0, 0, 5.0), (0, 1, 3.0), (0, 2, 4.0), (1, 0, 3.0), (1, 1, 1.0), (1, 2, 2.0)],
            Scale::default(),
            true,
        ).unwrap()
    }

    #[test]
    fn fit_dispatches_on_the_configured_method() {
        let pool = Pool::new(2);

        let configs = [
            RecommenderConfig::popular(),
            RecommenderConfig::user_based(5),
            RecommenderConfig::item_based(5),
        ];

        for config in &configs {
            let model = RecommenderModel::fit(config, &train(), &pool).unwrap();
            assert_eq!(model.method(), config.method);
        }

        pool.shutdown();
    }

    #[test]
    fn invalid_configurations_and_empty_train_are_rejected() {
        let pool = Pool::new(1);

        assert!(RecommenderModel::fit(&RecommenderConfig::user_based(0), &train(), &pool).is_err());
        assert!(RecommenderModel::fit(&RecommenderConfig::item_based(0), &train(), &pool).is_err());
        assert!(RecommenderModel::fit(
            &RecommenderConfig::popular(), &RatingStore::default(), &pool).is_err());

        pool.shutdown();
    }

    #[test]
    fn batch_predictions_cover_all_queries() {
        let pool = Pool::new(3);

        let context = RatingStore::from_ratings(
            vec![(7, 0, 5.0), (7, 2, 4.0), (8, 0, 1.0), (8, 1, 2.0)],
            Scale::default(),
            true,
        ).unwrap();

        let queries = RatingStore::from_ratings(
            vec![(7, 1, 3.0), (8, 2, 1.0), (8, 9, 4.0)],
            Scale::default(),
            true,
        ).unwrap();

        for config in &[RecommenderConfig::popular(), RecommenderConfig::user_based(2),
                        RecommenderConfig::item_based(2)] {
            let model = RecommenderModel::fit(config, &train(), &pool).unwrap();
            let predictions = model.predict_batch(&context, &queries, &pool);

            assert_eq!(predictions.len(), 3);
            for (user, item) in queries.pairs() {
                assert_eq!(predictions.get(user, item), Some(model.predict(user, item, &context)));
            }

            // Nobody rated item 9 in train
            assert!(predictions.get(8, 9).unwrap().cold_start);
            assert!(predictions.num_cold_starts() >= 1);
        }

        pool.shutdown();
    }

    #[test]
    fn predictions_store() {
        let mut predictions = Predictions::default();
        assert!(predictions.is_empty());

        predictions.insert(1, 2, Prediction::estimated(3.5));
        predictions.insert(1, 3, Prediction::fallback(2.0));
        predictions.insert(1, 3, Prediction::fallback(2.5));

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions.num_cold_starts(), 1);
        assert_eq!(predictions.get(1, 3), Some(Prediction::fallback(2.5)));
        assert_eq!(predictions.get(2, 3), None);
        assert_eq!(Method::Popular.name(), "POPULAR");
    }
}
