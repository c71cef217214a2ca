use catbridge_primitives::{constants::BATCH_SIZE, Buf32};
use serde::{Deserialize, Serialize};

use crate::{
    data::{AggregationData, BatchRequest},
    errors::CovenantError,
};

/// Binary tree of [`AggregationData`] over a batch of requests.
///
/// Shares its shape with the batch Merkle tree but folds the amount sums into every node, which
/// lets an expansion split the committed total back down to the individual requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumTree {
    /// Bottom-up; the first level sits directly above the requests, the last holds the root.
    levels: Vec<Vec<AggregationData>>,
}

impl SumTree {
    pub fn build<R: BatchRequest>(requests: &[R]) -> Result<Self, CovenantError> {
        if requests.len() < 2 || !requests.len().is_power_of_two() {
            return Err(CovenantError::BatchSize {
                expected: BATCH_SIZE,
                actual: requests.len(),
            });
        }

        let first = requests
            .chunks(2)
            .map(|pair| AggregationData::from_leaves(&pair[0], &pair[1]))
            .collect::<Result<Vec<_>, _>>()?;

        let mut levels = vec![first];
        while let Some(level) = levels.last().filter(|l| l.len() > 1) {
            let next = level
                .chunks(2)
                .map(|pair| AggregationData::from_nodes(&pair[0], &pair[1]))
                .collect::<Result<Vec<_>, _>>()?;
            levels.push(next);
        }

        Ok(Self { levels })
    }

    pub fn root(&self) -> &AggregationData {
        &self.levels[self.levels.len() - 1][0]
    }

    pub fn root_hash(&self) -> Buf32 {
        self.root().hash()
    }

    pub fn total(&self) -> u64 {
        self.root().sum_amount
    }

    pub fn levels(&self) -> &[Vec<AggregationData>] {
        &self.levels
    }

    /// Number of node levels, the root included.
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Node at `depth` below the root (the root is depth 0).
    pub fn node(&self, depth: usize, index: usize) -> Option<&AggregationData> {
        let level = self.levels.len().checked_sub(depth + 1)?;
        self.levels[level].get(index)
    }
}
