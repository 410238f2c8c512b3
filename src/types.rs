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

/// Sparse vector of ratings or scores, keyed by user or item index. Absent keys are unknown
/// values, never zeros.
pub type SparseVector = FnvHashMap<u32, f64>;

/// Sparse matrix stored as a map of rows.
pub type SparseMatrix = FnvHashMap<u32, SparseVector>;

pub fn new_sparse_vector(capacity: usize) -> SparseVector {
    FnvHashMap::with_capacity_and_hasher(capacity, Default::default())
}

pub fn new_sparse_matrix(num_rows: usize) -> SparseMatrix {
    FnvHashMap::with_capacity_and_hasher(num_rows, Default::default())
}

/// Arithmetic mean of the values of a sparse vector, `None` for an empty vector.
pub fn mean(vector: &SparseVector) -> Option<f64> {
    if vector.is_empty() {
        None
    } else {
        Some(vector.values().sum::<f64>() / vector.len() as f64)
    }
}

/// Keys of a sparse vector or matrix in ascending order.
pub fn sorted_keys<V>(map: &FnvHashMap<u32, V>) -> Vec<u32> {
    let mut keys: Vec<u32> = map.keys().cloned().collect();
    keys.sort_unstable();
    keys
}
