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

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::SparseVector;

/// A candidate neighbor and its similarity to the entity we select neighbors for.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Neighbor {
    pub id: u32,
    pub similarity: f64,
}

/// Ordering for our bounded max-heap: the weakest neighbor must be on top, so stronger neighbors
/// compare as smaller. Equal similarities are decided by the identifier, the lower one wins.
fn cmp_strongest_first(neighbor_a: &Neighbor, neighbor_b: &Neighbor) -> Ordering {
    match neighbor_b.similarity.partial_cmp(&neighbor_a.similarity) {
        Some(Ordering::Equal) | None => neighbor_a.id.cmp(&neighbor_b.id),
        Some(ordering) => ordering,
    }
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_strongest_first(self, other)
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_strongest_first(self, other))
    }
}

/// The `k` entities most similar to `entity`, strongest first. The entity itself and undefined
/// similarities are skipped. Fewer than `k` neighbors are returned if no more are available.
pub fn select(entity: u32, similarities: &SparseVector, k: usize) -> Vec<Neighbor> {
    select_from(entity, similarities.iter().map(|(id, similarity)| (*id, *similarity)), k)
}

pub fn select_from<I>(entity: u32, similarities: I, k: usize) -> Vec<Neighbor>
    where I: IntoIterator<Item=(u32, f64)> {

    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k);

    for (id, similarity) in similarities {

        if id == entity || similarity.is_nan() {
            continue;
        }

        let candidate = Neighbor { id, similarity };

        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(mut weakest) = heap.peek_mut() {
            if candidate < *weakest {
                *weakest = candidate;
            }
        }
    }

    heap.into_sorted_vec()
}

#[cfg(test)]
mod tests {

    use std::f64::EPSILON;

    use super::{select, select_from, Neighbor};
    use crate::types;

    fn within_epsilon(value: f64, expected: f64) -> bool {
        (value - expected).abs() < EPSILON
    }

    #[test]
    fn neighbor_ordering_puts_strongest_first() {
        let neighbor_a = Neighbor { id: 1, similarity: 0.5 };
        let neighbor_b = Neighbor { id: 2, similarity: 0.9 };
        let neighbor_c = Neighbor { id: 3, similarity: 0.5 };

        assert!(neighbor_b < neighbor_a);
        assert!(neighbor_a < neighbor_c);
        assert!(neighbor_b < neighbor_c);
    }

    #[test]
    fn topk() {
        let similarities = vec![(1, 0.5), (2, -0.3), (3, 0.3), (4, 0.95), (5, 0.7)];

        let top_k = select_from(0, similarities, 3);

        assert_eq!(top_k.len(), 3);

        assert_eq!(top_k[0].id, 4);
        assert!(within_epsilon(top_k[0].similarity, 0.95));

        assert_eq!(top_k[1].id, 5);
        assert!(within_epsilon(top_k[1].similarity, 0.7));

        assert_eq!(top_k[2].id, 1);
        assert!(within_epsilon(top_k[2].similarity, 0.5));
    }

    #[test]
    fn ties_go_to_the_lower_identifier() {
        let mut similarities = types::new_sparse_vector(5);
        for id in &[9, 3, 7, 5] {
            similarities.insert(*id, 0.8);
        }

        let ids: Vec<u32> = select(0, &similarities, 2).iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[test]
    fn self_and_undefined_similarities_are_skipped() {
        let similarities = vec![(0, 1.0), (1, std::f64::NAN), (2, 0.1)];

        let top_k = select_from(0, similarities, 5);

        assert_eq!(top_k, vec![Neighbor { id: 2, similarity: 0.1 }]);
    }

    #[test]
    fn never_pads() {
        assert!(select_from(0, vec![(1, 0.4), (2, 0.2)], 0).is_empty());
        assert_eq!(select_from(0, vec![(1, 0.4), (2, 0.2)], 10).len(), 2);
        assert!(select(0, &types::new_sparse_vector(0), 3).is_empty());
    }
}
