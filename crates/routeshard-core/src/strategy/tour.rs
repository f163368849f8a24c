//! Exhaustive round-trip route search over a distance matrix.
//!
//! Position `k` of the search space is the `k`-th lexicographic ordering of
//! every city except the start city, so a space over `n` cities has
//! `(n-1)!` positions.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::Deserialize;
use serde_json::json;

use super::{SearchStrategy, StrategyError};
use crate::SpaceIndex;

#[derive(Deserialize)]
#[serde(untagged)]
enum TourDataset {
    Described {
        matrix: Vec<Vec<u64>>,
        #[serde(default)]
        city: usize,
    },
    Bare(Vec<Vec<u64>>),
}

struct Graph {
    matrix: Vec<Vec<u64>>,
    start: usize,
}

impl Graph {
    fn parse(dataset: &[u8]) -> Result<Self, StrategyError> {
        let parsed: TourDataset = serde_json::from_slice(dataset)
            .map_err(|e| StrategyError::InvalidDataset(e.to_string()))?;
        let (matrix, start) = match parsed {
            TourDataset::Described { matrix, city } => (matrix, city),
            TourDataset::Bare(matrix) => (matrix, 0),
        };

        let n = matrix.len();
        if n == 0 {
            return Err(StrategyError::InvalidDataset("empty distance matrix".into()));
        }
        if let Some(row) = matrix.iter().position(|row| row.len() != n) {
            return Err(StrategyError::InvalidDataset(format!(
                "distance matrix is not square (row {row})"
            )));
        }
        if start >= n {
            return Err(StrategyError::InvalidDataset(format!(
                "start city {start} out of bounds for {n} cities"
            )));
        }

        Ok(Self { matrix, start })
    }

    fn others(&self) -> Vec<usize> {
        (0..self.matrix.len()).filter(|&c| c != self.start).collect()
    }

    fn round_trip_cost(&self, order: &[usize]) -> u64 {
        let mut cost = 0u64;
        let mut at = self.start;
        for &next in order {
            cost = cost.saturating_add(self.matrix[at][next]);
            at = next;
        }
        cost.saturating_add(self.matrix[at][self.start])
    }
}

/// Brute-force enumeration of every round trip from the start city.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceTour;

impl BruteForceTour {
    pub const NAME: &'static str = "brute-force-tour";
}

impl SearchStrategy for BruteForceTour {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn space_size(&self, dataset: &[u8]) -> Result<SpaceIndex, StrategyError> {
        let graph = Graph::parse(dataset)?;
        Ok(SpaceIndex::factorial(graph.matrix.len() as u64 - 1))
    }

    fn solve_chunk(
        &self,
        dataset: &[u8],
        start: &SpaceIndex,
        end: &SpaceIndex,
    ) -> Result<serde_json::Value, StrategyError> {
        let graph = Graph::parse(dataset)?;
        let mut order = graph.others();
        let total = SpaceIndex::factorial(order.len() as u64);

        let end = if end > &total { &total } else { end };
        let count = (end - start)
            .to_u64()
            .ok_or_else(|| StrategyError::RangeTooWide(format!("{start}..{end}")))?;

        let mut best: Option<(u64, Vec<usize>)> = None;
        let mut processed = 0u64;

        if count > 0 {
            unrank(&mut order, start.as_biguint());
            loop {
                let cost = graph.round_trip_cost(&order);
                if best.as_ref().map_or(true, |(c, _)| cost < *c) {
                    best = Some((cost, order.clone()));
                }
                processed += 1;
                if processed == count || !next_permutation(&mut order) {
                    break;
                }
            }
        }

        let (total_cost, route) = match best {
            Some((cost, order)) => {
                let mut route = Vec::with_capacity(order.len() + 2);
                route.push(graph.start);
                route.extend(order);
                route.push(graph.start);
                (json!(cost), route)
            }
            None => (serde_json::Value::Null, Vec::new()),
        };

        Ok(json!({
            "totalCost": total_cost,
            "route": route,
            "processed": processed,
            "start": start.to_string(),
            "end": end.to_string(),
        }))
    }
}

/// Rearrange sorted `items` into their `rank`-th lexicographic permutation.
/// Ranks past the last permutation wrap around.
fn unrank(items: &mut [usize], rank: &BigUint) {
    let mut pool = items.to_vec();
    pool.sort_unstable();
    let mut rank = rank.clone();

    for slot in 0..items.len() {
        let block = SpaceIndex::factorial((pool.len() - 1) as u64);
        let block = block.as_biguint();
        let pick = (&rank / block).to_usize().unwrap_or(0) % pool.len();
        rank %= block;
        items[slot] = pool.remove(pick);
    }
}

/// Advance to the next lexicographic permutation; false once the last one
/// has been reached.
fn next_permutation(items: &mut [usize]) -> bool {
    if items.len() < 2 {
        return false;
    }
    let Some(pivot) = (0..items.len() - 1).rev().find(|&i| items[i] < items[i + 1]) else {
        return false;
    };
    let Some(successor) = (pivot + 1..items.len())
        .rev()
        .find(|&j| items[j] > items[pivot])
    else {
        return false;
    };
    items.swap(pivot, successor);
    items[pivot + 1..].reverse();
    true
}
