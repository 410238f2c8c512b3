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

use crate::config::Scale;
use crate::error::{RecoError, Result};
use crate::store::RatingStore;
use crate::types::{self, SparseVector};

/// Mean-centered ratings together with the per-user means that were subtracted, so that every
/// original rating can be restored as `centered + mean`.
#[derive(Clone, Debug)]
pub struct Centered {
    pub store: RatingStore,
    pub means: FnvHashMap<u32, f64>,
}

impl Centered {

    pub fn mean(&self, user: u32) -> Option<f64> {
        self.means.get(&user).cloned()
    }

    /// Maps a value in centered space back to the rating scale of `user`.
    pub fn restore(&self, user: u32, centered_value: f64) -> Option<f64> {
        self.mean(user).map(|mean| centered_value + mean)
    }
}

/// Subtracts each user's mean rating from all of that user's ratings.
pub fn center(store: &RatingStore) -> Result<Centered> {

    // Centered values leave the rating scale, and duplicates cannot occur here.
    let mut centered = RatingStore::new(Scale::unbounded(), false);
    let mut means = FnvHashMap::with_capacity_and_hasher(store.num_users(), Default::default());

    for user in store.users() {
        let (centered_row, mean) = store.row_vector(user)
            .and_then(center_vector)
            .ok_or_else(|| RecoError::config(format!("user {} has no ratings to center", user)))?;

        for (item, value) in centered_row {
            centered.put(user, item, value)?;
        }
        means.insert(user, mean);
    }

    Ok(Centered { store: centered, means })
}

/// Centers a single rating vector, `None` if it is empty.
pub fn center_vector(vector: &SparseVector) -> Option<(SparseVector, f64)> {
    let mean = types::mean(vector)?;

    let centered = vector.iter()
        .map(|(key, value)| (*key, value - mean))
        .collect();

    Some((centered, mean))
}

#[cfg(test)]
mod tests {

    use super::{center, center_vector};
    use crate::config::Scale;
    use crate::store::RatingStore;
    use crate::types;

    #[test]
    fn centered_rows_have_zero_mean() {
        let store = RatingStore::from_ratings(
            vec![(0, 0, 5.0), (0, 1, 3.0), (0, 2, 4.0), (1, 0, 3.0), (1, 1, 1.0), (2, 2, 2.5)],
            Scale::default(),
            true,
        ).unwrap();

        let centered = center(&store).unwrap();

        assert_eq!(centered.mean(0), Some(4.0));
        assert_eq!(centered.mean(1), Some(2.0));
        assert_eq!(centered.mean(2), Some(2.5));
        assert_eq!(centered.mean(3), None);

        assert_eq!(centered.store.get(0, 0), Some(1.0));
        assert_eq!(centered.store.get(0, 1), Some(-1.0));
        assert_eq!(centered.store.get(2, 2), Some(0.0));

        for user in store.users() {
            let mean = types::mean(centered.store.row_vector(user).unwrap()).unwrap();
            assert!(mean.abs() < 1e-9);
        }
    }

    #[test]
    fn centering_is_reversible() {
        let store = RatingStore::from_ratings(
            vec![(0, 0, 1.0), (0, 1, 2.0), (0, 2, 4.5), (1, 3, 3.5)],
            Scale::default(),
            true,
        ).unwrap();

        let centered = center(&store).unwrap();

        for (user, item) in store.pairs() {
            let restored = centered.restore(user, centered.store.get(user, item).unwrap()).unwrap();
            assert!((restored - store.get(user, item).unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_vectors_cannot_be_centered() {
        assert!(center_vector(&types::new_sparse_vector(0)).is_none());
        assert!(center(&RatingStore::default()).unwrap().store.is_empty());
    }
}
