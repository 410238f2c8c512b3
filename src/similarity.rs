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

use std::time::Instant;

use scoped_pool::Pool;
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::neighbors;
use crate::store::RatingStore;
use crate::types::{self, SparseMatrix, SparseVector};

/// Number of entities whose similarity rows are computed by one pool job.
const SHARD_SIZE: usize = 64;

/// Sums of squares below this are treated as zero, they only arise from rounding.
const MIN_SQUARED_NORM: f64 = 1e-12;

/// Similarity measures, both evaluated on co-rated dimensions only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    Pearson,
    Cosine,
}

impl Similarity {

    /// Similarity of two sparse vectors, `None` where it is undefined. Undefined similarities
    /// must be treated as absent, not as zero.
    pub fn between(&self, vector_a: &SparseVector, vector_b: &SparseVector) -> Option<f64> {
        let co_rated = co_rated_keys(vector_a, vector_b);

        match self {
            Similarity::Pearson => pearson(vector_a, vector_b, &co_rated),
            Similarity::Cosine => cosine(vector_a, vector_b, &co_rated),
        }
    }
}

/// Keys present in both vectors, in ascending order. We look up the keys
/// of the smaller one in the larger one. The sort makes the summation order independent of the argument order,
/// which keeps sim(a, b) and sim(b, a) bit-identical.
fn co_rated_keys(vector_a: &SparseVector, vector_b: &SparseVector) -> Vec<u32> {
    let (smaller, larger) = if vector_a.len() <= vector_b.len() {
        (vector_a, vector_b)
    } else {
        (vector_b, vector_a)
    };

    let mut keys: Vec<u32> = smaller.keys()
        .filter(|key| larger.contains_key(key))
        .cloned()
        .collect();

    keys.sort_unstable();
    keys
}

/// Pearson correlation with means taken over the co-rated keys only.
fn pearson(vector_a: &SparseVector, vector_b: &SparseVector, co_rated: &[u32]) -> Option<f64> {
    if co_rated.len() < 2 {
        return None;
    }

    let n = co_rated.len() as f64;
    let mean_a = co_rated.iter().map(|key| vector_a[key]).sum::<f64>() / n;
    let mean_b = co_rated.iter().map(|key| vector_b[key]).sum::<f64>() / n;

    let mut dot = 0.0;
    let mut squares_a = 0.0;
    let mut squares_b = 0.0;

    for key in co_rated {
        let deviation_a = vector_a[key] - mean_a;
        let deviation_b = vector_b[key] - mean_b;
        dot += deviation_a * deviation_b;
        squares_a += deviation_a * deviation_a;
        squares_b += deviation_b * deviation_b;
    }

    if squares_a < MIN_SQUARED_NORM || squares_b < MIN_SQUARED_NORM {
        return None;
    }

    Some(clamp(dot / (squares_a.sqrt() * squares_b.sqrt())))
}

fn cosine(vector_a: &SparseVector, vector_b: &SparseVector, co_rated: &[u32]) -> Option<f64> {
    if co_rated.is_empty() {
        return None;
    }

    let mut dot = 0.0;
    let mut squares_a = 0.0;
    let mut squares_b = 0.0;

    for key in co_rated {
        let value_a = vector_a[key];
        let value_b = vector_b[key];
        dot += value_a * value_b;
        squares_a += value_a * value_a;
        squares_b += value_b * value_b;
    }

    if squares_a < MIN_SQUARED_NORM || squares_b < MIN_SQUARED_NORM {
        return None;
    }

    Some(clamp(dot / (squares_a.sqrt() * squares_b.sqrt())))
}

#[inline(always)]
fn clamp(similarity: f64) -> f64 {
    similarity.max(-1.0).min(1.0)
}

/// Whether similarities are computed between users (rows) or items (columns).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Users,
    Items,
}

impl Axis {
    /// The vectors to compare, plus the transposed view used to find candidates sharing a key.
    fn views(self, store: &RatingStore) -> (&SparseMatrix, &SparseMatrix) {
        match self {
            Axis::Users => (store.rows(), store.cols()),
            Axis::Items => (store.cols(), store.rows()),
        }
    }
}

/// Similarities of `vector` to all rows (or columns) of `store` it shares at least one key with.
/// Candidates come from the transposed view, so we never scan entities without any overlap.
/// `entity` is excluded from the result if it is part of the store.
pub fn similarities_to(
    entity: Option<u32>,
    vector: &SparseVector,
    store: &RatingStore,
    axis: Axis,
    measure: Similarity,
) -> SparseVector {

    let (vectors, index) = axis.views(store);

    let mut candidates: Vec<u32> = Vec::new();
    for key in vector.keys() {
        if let Some(entities) = index.get(key) {
            candidates.extend(entities.keys());
        }
    }
    candidates.sort_unstable();
    candidates.dedup();

    let mut similarities = types::new_sparse_vector(candidates.len());

    for other in candidates {
        if Some(other) == entity {
            continue;
        }
        if let Some(other_vector) = vectors.get(&other) {
            if let Some(similarity) = measure.between(vector, other_vector) {
                similarities.insert(other, similarity);
            }
        }
    }

    similarities
}

/// Sparse matrix of pairwise similarities. Absent entries are undefined similarities.
#[derive(Clone, Debug, Default)]
pub struct SimilarityMatrix {
    rows: SparseMatrix,
}

impl SimilarityMatrix {

    pub fn get(&self, entity_a: u32, entity_b: u32) -> Option<f64> {
        self.rows.get(&entity_a).and_then(|row| row.get(&entity_b)).cloned()
    }

    pub fn row(&self, entity: u32) -> Option<&SparseVector> {
        self.rows.get(&entity)
    }

    /// Number of entities with at least one defined similarity.
    pub fn num_entities(&self) -> usize {
        self.rows.len()
    }

    pub fn num_entries(&self) -> usize {
        self.rows.values().map(|row| row.len()).sum()
    }

    /// Keeps only the `k` most similar entities per row.
    pub fn prune(&self, k: usize) -> SimilarityMatrix {
        let mut rows = types::new_sparse_matrix(self.rows.len());

        for (entity, row) in self.rows.iter() {
            let kept: SparseVector = neighbors::select(*entity, row, k)
                .into_iter()
                .map(|neighbor| (neighbor.id, neighbor.similarity))
                .collect();

            if !kept.is_empty() {
                rows.insert(*entity, kept);
            }
        }

        SimilarityMatrix { rows }
    }
}

/// All pairwise similarities between the users or the items of `store`. The entities are split
/// into shards which are processed on the pool, every job owns the rows of its shard, so no
/// locking is required and the result does not depend on the number of threads.
pub fn pairwise(
    store: &RatingStore,
    axis: Axis,
    measure: Similarity,
    pool: &Pool,
) -> SimilarityMatrix {

    let start = Instant::now();

    let (vectors, _) = axis.views(store);
    let entities = types::sorted_keys(vectors);

    let mut shards: Vec<Vec<(u32, SparseVector)>> = entities.chunks(SHARD_SIZE)
        .map(|chunk| Vec::with_capacity(chunk.len()))
        .collect();

    pool.scoped(|scope| {
        for (chunk, shard) in entities.chunks(SHARD_SIZE).zip(shards.iter_mut()) {
            scope.execute(move || {
                for &entity in chunk {
                    if let Some(vector) = vectors.get(&entity) {
                        let row = similarities_to(Some(entity), vector, store, axis, measure);
                        shard.push((entity, row));
                    }
                }
            });
        }
    });

    let mut rows = types::new_sparse_matrix(entities.len());
    for shard in shards {
        for (entity, row) in shard {
            if !row.is_empty() {
                rows.insert(entity, row);
            }
        }
    }

    let similarities = SimilarityMatrix { rows };

    debug!(
        "{:?} similarities: {} entities, {} defined entries, {}ms",
        axis,
        entities.len(),
        similarities.num_entries(),
        start.elapsed().as_millis(),
    );

    similarities
}
