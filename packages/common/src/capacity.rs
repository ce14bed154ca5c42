use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::round::{RoundOutOfRange, rounds, validate_round};

/// Default capacities used when no configuration has been saved yet.
pub const DEFAULT_LIMITS: &[(i32, i32)] = &[
    (1, 30),
    (2, 28),
    (3, 25),
    (4, 22),
    (5, 20),
    (6, 18),
    (7, 15),
    (8, 10),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitsError {
    #[error(transparent)]
    Round(#[from] RoundOutOfRange),
    #[error("Capacity for round {round} must be >= 0, got {capacity}")]
    Negative { round: i32, capacity: i32 },
}

/// Per-round admission capacities, keyed by round number.
///
/// Serialized as a JSON object (`{"1": 30, "2": 28}`) both on the wire and in the
/// team snapshot column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct ParticipantLimits(BTreeMap<i32, i32>);

impl ParticipantLimits {
    pub fn defaults() -> Self {
        DEFAULT_LIMITS.iter().copied().collect()
    }

    pub fn get(&self, round: i32) -> Option<i32> {
        self.0.get(&round).copied()
    }

    pub fn insert(&mut self, round: i32, capacity: i32) {
        self.0.insert(round, capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.0.iter().map(|(r, c)| (*r, *c))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Playable rounds that have no capacity.
    pub fn missing_rounds(&self) -> Vec<i32> {
        rounds().filter(|r| !self.0.contains_key(r)).collect()
    }

    pub fn validate(&self) -> Result<(), LimitsError> {
        for (&round, &capacity) in &self.0 {
            validate_round(round)?;
            if capacity < 0 {
                return Err(LimitsError::Negative { round, capacity });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

impl FromIterator<(i32, i32)> for ParticipantLimits {
    fn from_iter<I: IntoIterator<Item = (i32, i32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
