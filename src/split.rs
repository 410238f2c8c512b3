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

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::config::EvaluationScheme;
use crate::error::{RecoError, Result};
use crate::store::RatingStore;

/// One train/test partition of a rating store. For every test user, the ratings in `test_known`
/// and `test_unknown` are disjoint and together form all ratings of that user.
#[derive(Clone, Debug)]
pub struct Fold {
    pub index: usize,
    /// All ratings of the users assigned to the training partition.
    pub train: RatingStore,
    /// Exactly `given` revealed ratings per test user.
    pub test_known: RatingStore,
    /// The held-out remainder of each test user's ratings.
    pub test_unknown: RatingStore,
    /// Test users dropped from this fold because they have fewer than `given` ratings.
    pub excluded: Vec<u32>,
}

impl Fold {
    pub fn test_users(&self) -> Vec<u32> {
        self.test_known.users()
    }
}

/// Partitions `store` into `scheme.folds` independent folds. All randomness comes from a single
/// RNG seeded with `scheme.seed`, so the same store and scheme always produce the same folds.
pub fn split(store: &RatingStore, scheme: &EvaluationScheme) -> Result<Vec<Fold>> {
    let mut rng = StdRng::seed_from_u64(scheme.seed);
    split_with(store, scheme, &mut rng)
}

pub fn split_with<R: Rng>(
    store: &RatingStore,
    scheme: &EvaluationScheme,
    rng: &mut R,
) -> Result<Vec<Fold>> {

    scheme.validate()?;

    if store.is_empty() {
        return Err(RecoError::config("cannot split an empty rating store"));
    }

    (0..scheme.folds)
        .map(|index| split_fold(store, scheme, index, &mut *rng))
        .collect()
}

/// Rounded share of train users. With at least two users both partitions keep one user.
fn num_train_users(num_users: usize, train_proportion: f64) -> usize {
    let rounded = (num_users as f64 * train_proportion).round() as usize;
    if num_users < 2 {
        rounded.min(num_users)
    } else {
        rounded.max(1).min(num_users - 1)
    }
}

fn split_fold<R: Rng>(
    store: &RatingStore,
    scheme: &EvaluationScheme,
    index: usize,
    rng: &mut R,
) -> Result<Fold> {

    // Start from a sorted order so the outcome only depends on the RNG
    let mut users = store.users();
    users.shuffle(rng);

    let num_train_users = num_train_users(users.len(), scheme.train_proportion);
    let (train_users, test_users) = users.split_at(num_train_users);

    if test_users.is_empty() {
        return Err(RecoError::NoTestUsers { fold: index, num_users: users.len() });
    }

    let mut train = RatingStore::empty_like(store);
    let mut test_known = RatingStore::empty_like(store);
    let mut test_unknown = RatingStore::empty_like(store);
    let mut excluded = Vec::new();

    for &user in train_users {
        for (item, value) in store.row(user) {
            train.put(user, item, value)?;
        }
    }

    for &user in test_users {

        let mut ratings: Vec<(u32, f64)> = store.row(user).collect();

        if ratings.len() < scheme.given {
            warn!(
                "Fold {}: excluding test user {} with {} ratings, {} are required",
                index, user, ratings.len(), scheme.given,
            );
            excluded.push(user);
            continue;
        }

        ratings.sort_unstable_by_key(|&(item, _)| item);
        ratings.shuffle(rng);

        let (known, unknown) = ratings.split_at(scheme.given);

        for &(item, value) in known {
            test_known.put(user, item, value)?;
        }
        for &(item, value) in unknown {
            test_unknown.put(user, item, value)?;
        }
    }

    excluded.sort_unstable();

    if test_known.is_empty() {
        return Err(RecoError::Split { fold: index, excluded: excluded.len(), given: scheme.given });
    }

    info!(
        "Fold {}: {} train users with {} ratings, {} test users with {} known and {} unknown \
         ratings, {} test users excluded",
        index,
        train.num_users(),
        train.num_ratings(),
        test_known.num_users(),
        test_known.num_ratings(),
        test_unknown.num_ratings(),
        excluded.len(),
    );

    Ok(Fold { index, train, test_known, test_unknown, excluded })
}

#[cfg(test)]
mod tests {

    use super::split;
    use crate::config::{EvaluationScheme, Scale};
    use crate::error::RecoError;
    use crate::store::RatingStore;

    fn ratings(num_users: u32) -> RatingStore {
        let ratings = (0..num_users)
            .flat_map(|user| (0..(2 + user % 5)).map(move |n| {
                (user, (user + n * 11) % 30, f64::from(1 + (user * n) % 5))
            }));

        RatingStore::from_ratings(ratings, Scale::default(), true).unwrap()
    }

    fn scheme(train_proportion: f64, given: usize, folds: usize, seed: u64) -> EvaluationScheme {
        EvaluationScheme { train_proportion, given, folds, seed }
    }

    #[test]
    fn test_users_are_partitioned_exactly() {
        let store = ratings(40);
        let folds = split(&store, &scheme(0.5, 3, 1, 7)).unwrap();
        let fold = &folds[0];

        assert_eq!(fold.train.num_users() + fold.test_users().len() + fold.excluded.len(), 40);

        for user in fold.test_users() {
            assert!(!fold.train.contains_user(user));
            assert_eq!(fold.test_known.row(user).count(), 3);

            let num_unknown = fold.test_unknown.row(user).count();
            assert_eq!(num_unknown + 3, store.row(user).count());

            for (item, value) in store.row(user) {
                let known = fold.test_known.get(user, item);
                let unknown = fold.test_unknown.get(user, item);
                assert!(known.is_some() != unknown.is_some());
                assert_eq!(known.or(unknown), Some(value));
            }
        }

        for user in fold.train.users() {
            assert_eq!(fold.train.row(user).count(), store.row(user).count());
        }

        for user in &fold.excluded {
            assert!(store.row(*user).count() < 3);
            assert!(!fold.test_known.contains_user(*user));
            assert!(!fold.test_unknown.contains_user(*user));
        }
    }

    #[test]
    fn train_proportion_decides_the_number_of_train_users() {
        let store = ratings(20);
        let fold = &split(&store, &scheme(0.75, 1, 1, 3)).unwrap()[0];

        assert_eq!(fold.train.num_users(), 15);
        assert_eq!(fold.test_users().len(), 5);
        assert!(fold.excluded.is_empty());
    }

    #[test]
    fn same_seed_same_folds() {
        let store = ratings(30);

        let first = split(&store, &scheme(0.6, 2, 3, 11)).unwrap();
        let second = split(&store, &scheme(0.6, 2, 3, 11)).unwrap();

        assert_eq!(first.len(), 3);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.train.pairs(), b.train.pairs());
            assert_eq!(a.test_known.pairs(), b.test_known.pairs());
            assert_eq!(a.test_unknown.pairs(), b.test_unknown.pairs());
            assert_eq!(a.excluded, b.excluded);
        }
    }

    #[test]
    fn folds_are_resampled_independently() {
        let store = ratings(60);
        let folds = split(&store, &scheme(0.5, 2, 2, 5)).unwrap();

        assert_eq!(folds[0].index, 0);
        assert_eq!(folds[1].index, 1);
        assert_ne!(folds[0].train.users(), folds[1].train.users());
    }

    #[test]
    fn fold_fails_when_every_test_user_is_excluded() {
        let store = ratings(10);

        match split(&store, &scheme(0.5, 50, 1, 1)) {
            Err(RecoError::Split { fold, excluded, given }) => {
                assert_eq!(fold, 0);
                assert_eq!(excluded, 5);
                assert_eq!(given, 50);
            },
            other => panic!("unexpected result {:?}", other.map(|folds| folds.len())),
        }
    }

    #[test]
    fn small_user_counts_keep_both_partitions() {
        let store = RatingStore::from_ratings(
            (0..5_u32).flat_map(|user| (0..4_u32).map(move |item| (user, item, 3.0))),
            Scale::default(),
            true,
        ).unwrap();

        // round(5 * 0.9) would put all five users into train
        let fold = &split(&store, &EvaluationScheme::default()).unwrap()[0];
        assert_eq!(fold.train.num_users(), 4);
        assert_eq!(fold.test_users().len(), 1);
        assert!(fold.excluded.is_empty());

        // round(5 * 0.05) would leave train empty
        let fold = &split(&store, &scheme(0.05, 2, 1, 9)).unwrap()[0];
        assert_eq!(fold.train.num_users(), 1);
        assert_eq!(fold.test_users().len(), 4);
    }

    #[test]
    fn a_single_user_leaves_no_test_users() {
        let store = RatingStore::from_ratings(
            vec![(0, 0, 4.0), (0, 1, 2.0), (0, 2, 5.0)],
            Scale::default(),
            true,
        ).unwrap();

        match split(&store, &scheme(0.5, 1, 1, 3)) {
            Err(RecoError::NoTestUsers { fold, num_users }) => {
                assert_eq!(fold, 0);
                assert_eq!(num_users, 1);
            },
            other => panic!("unexpected result {:?}", other.map(|folds| folds.len())),
        }
    }

    #[test]
    fn invalid_input_is_rejected_up_front() {
        let store = ratings(10);

        assert!(split(&store, &scheme(0.0, 2, 1, 1)).is_err());
        assert!(split(&store, &scheme(0.5, 0, 1, 1)).is_err());
        assert!(split(&store, &scheme(0.5, 2, 0, 1)).is_err());
        assert!(split(&RatingStore::default(), &scheme(0.5, 2, 1, 1)).is_err());
    }
}
