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

use serde_derive::Serialize;

use crate::config::Scale;
use crate::error::{DataError, Result};
use crate::types::{self, SparseMatrix, SparseVector};

/// Counts derived from a rating store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub num_users: usize,
    pub num_items: usize,
    pub num_ratings: usize,
}

/// Sparse user x item rating matrix. Every rating is indexed twice, once in the row of its user
/// and once in the column of its item, so both views are hash lookups. Unrated pairs are absent,
/// they are never stored as zeros.
#[derive(Clone, Debug)]
pub struct RatingStore {
    rows: SparseMatrix,
    cols: SparseMatrix,
    scale: Scale,
    strict: bool,
}

impl RatingStore {

    pub fn new(scale: Scale, strict: bool) -> Self {
        RatingStore {
            rows: types::new_sparse_matrix(0),
            cols: types::new_sparse_matrix(0),
            scale,
            strict,
        }
    }

    /// A store with the same scale and duplicate policy, but no ratings.
    pub fn empty_like(other: &RatingStore) -> Self {
        RatingStore::new(other.scale, other.strict)
    }

    pub fn from_ratings<I>(ratings: I, scale: Scale, strict: bool) -> Result<Self>
        where I: IntoIterator<Item=(u32, u32, f64)> {

        let mut store = RatingStore::new(scale, strict);
        for (user, item, value) in ratings {
            store.put(user, item, value)?;
        }

        Ok(store)
    }

    /// Stores a rating. Out-of-scale values are rejected. Rating the same pair twice with the
    /// same value is a no-op, with a different value it fails in strict mode and overwrites
    /// otherwise.
    pub fn put(&mut self, user: u32, item: u32, value: f64) -> Result<()> {

        if !self.scale.contains(value) {
            return Err(DataError::OutOfScale {
                user,
                item,
                value,
                min: self.scale.min,
                max: self.scale.max,
            }.into());
        }

        if let Some(existing) = self.get(user, item) {
            if existing == value {
                return Ok(());
            }
            if self.strict {
                return Err(DataError::Conflict { user, item, existing, value }.into());
            }
        }

        self.rows.entry(user)
            .or_insert_with(|| types::new_sparse_vector(10))
            .insert(item, value);

        self.cols.entry(item)
            .or_insert_with(|| types::new_sparse_vector(10))
            .insert(user, value);

        Ok(())
    }

    pub fn get(&self, user: u32, item: u32) -> Option<f64> {
        self.rows.get(&user).and_then(|row| row.get(&item)).cloned()
    }

    /// The (item, rating) pairs of a user, empty if the user is unknown.
    pub fn row<'a>(&'a self, user: u32) -> impl Iterator<Item=(u32, f64)> + 'a {
        self.rows.get(&user)
            .into_iter()
            .flat_map(|row| row.iter().map(|(item, value)| (*item, *value)))
    }

    /// The (user, rating) pairs of an item, empty if the item is unknown.
    pub fn col<'a>(&'a self, item: u32) -> impl Iterator<Item=(u32, f64)> + 'a {
        self.cols.get(&item)
            .into_iter()
            .flat_map(|col| col.iter().map(|(user, value)| (*user, *value)))
    }

    pub fn row_vector(&self, user: u32) -> Option<&SparseVector> {
        self.rows.get(&user)
    }

    pub fn col_vector(&self, item: u32) -> Option<&SparseVector> {
        self.cols.get(&item)
    }

    pub fn rows(&self) -> &SparseMatrix {
        &self.rows
    }

    pub fn cols(&self) -> &SparseMatrix {
        &self.cols
    }

    /// Users with at least one rating, in ascending order.
    pub fn users(&self) -> Vec<u32> {
        types::sorted_keys(&self.rows)
    }

    /// Items with at least one rating, in ascending order.
    pub fn items(&self) -> Vec<u32> {
        types::sorted_keys(&self.cols)
    }

    /// All rated (user, item) pairs, ordered by user and then by item.
    pub fn pairs(&self) -> Vec<(u32, u32)> {
        let mut pairs = Vec::with_capacity(self.num_ratings());
        for user in self.users() {
            if let Some(row) = self.rows.get(&user) {
                for item in types::sorted_keys(row) {
                    pairs.push((user, item));
                }
            }
        }
        pairs
    }

    pub fn contains_user(&self, user: u32) -> bool {
        self.rows.contains_key(&user)
    }

    pub fn contains_item(&self, item: u32) -> bool {
        self.cols.contains_key(&item)
    }

    pub fn num_users(&self) -> usize {
        self.rows.len()
    }

    pub fn num_items(&self) -> usize {
        self.cols.len()
    }

    pub fn num_ratings(&self) -> usize {
        self.rows.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            num_users: self.num_users(),
            num_items: self.num_items(),
            num_ratings: self.num_ratings(),
        }
    }

    pub fn row_mean(&self, user: u32) -> Option<f64> {
        self.rows.get(&user).and_then(types::mean)
    }

    pub fn col_mean(&self, item: u32) -> Option<f64> {
        self.cols.get(&item).and_then(types::mean)
    }

    /// Mean over all stored ratings, `None` for an empty store.
    pub fn global_mean(&self) -> Option<f64> {
        let num_ratings = self.num_ratings();
        if num_ratings == 0 {
            return None;
        }

        let sum: f64 = self.users().iter()
            .filter_map(|user| self.rows.get(user))
            .map(|row| row.values().sum::<f64>())
            .sum();

        Some(sum / num_ratings as f64)
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl Default for RatingStore {
    fn default() -> Self {
        RatingStore::new(Scale::default(), true)
    }
}

#[cfg(test)]
mod tests {

    use super::RatingStore;
    use crate::config::Scale;
    use crate::error::{DataError, RecoError};

    fn ratings() -> RatingStore {
        RatingStore::from_ratings(
            vec![(0, 10, 4.0), (0, 11, 2.0), (1, 10, 5.0), (2, 12, 1.0)],
            Scale::default(),
            true,
        ).unwrap()
    }

    #[test]
    fn both_views_agree() {
        let store = ratings();

        assert_eq!(store.get(0, 10), Some(4.0));
        assert_eq!(store.get(0, 12), None);
        assert_eq!(store.get(7, 10), None);

        let mut row: Vec<(u32, f64)> = store.row(0).collect();
        row.sort_by_key(|&(item, _)| item);
        assert_eq!(row, vec![(10, 4.0), (11, 2.0)]);

        let mut col: Vec<(u32, f64)> = store.col(10).collect();
        col.sort_by_key(|&(user, _)| user);
        assert_eq!(col, vec![(0, 4.0), (1, 5.0)]);

        assert_eq!(store.row(42).count(), 0);
        assert_eq!(store.col(42).count(), 0);
    }

    #[test]
    fn stats_and_means() {
        let store = ratings();
        let stats = store.stats();

        assert_eq!(stats.num_users, 3);
        assert_eq!(stats.num_items, 3);
        assert_eq!(stats.num_ratings, 4);

        assert_eq!(store.users(), vec![0, 1, 2]);
        assert_eq!(store.items(), vec![10, 11, 12]);
        assert_eq!(store.pairs(), vec![(0, 10), (0, 11), (1, 10), (2, 12)]);

        assert_eq!(store.row_mean(0), Some(3.0));
        assert_eq!(store.col_mean(10), Some(4.5));
        assert_eq!(store.global_mean(), Some(3.0));
        assert_eq!(RatingStore::default().global_mean(), None);
    }

    #[test]
    fn out_of_scale_ratings_are_rejected() {
        let mut store = RatingStore::default();

        match store.put(0, 0, 6.0) {
            Err(RecoError::Data(DataError::OutOfScale { value, .. })) => assert_eq!(value, 6.0),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(store.put(0, 0, 0.5).is_err());
        assert!(store.put(0, 0, std::f64::NAN).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn duplicates_in_strict_mode() {
        let mut store = RatingStore::default();
        store.put(0, 0, 3.0).unwrap();
        store.put(0, 0, 3.0).unwrap();

        match store.put(0, 0, 4.0) {
            Err(RecoError::Data(DataError::Conflict { existing, value, .. })) => {
                assert_eq!(existing, 3.0);
                assert_eq!(value, 4.0);
            },
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(store.get(0, 0), Some(3.0));
        assert_eq!(store.num_ratings(), 1);
    }

    #[test]
    fn duplicates_in_lenient_mode_overwrite() {
        let mut store = RatingStore::new(Scale::default(), false);
        store.put(0, 0, 3.0).unwrap();
        store.put(0, 0, 4.0).unwrap();

        assert_eq!(store.get(0, 0), Some(4.0));
        assert_eq!(store.col(0).collect::<Vec<_>>(), vec![(0, 4.0)]);
        assert_eq!(store.num_ratings(), 1);
    }
}
