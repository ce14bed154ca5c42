use std::ops::RangeInclusive;

/// First playable round.
pub const FIRST_ROUND: i32 = 1;
/// Last playable round.
pub const FINAL_ROUND: i32 = 8;
/// Sentinel `current_round` for a team that cleared every round.
pub const FINISHED_ROUND: i32 = FINAL_ROUND + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Round must be between {FIRST_ROUND} and {FINAL_ROUND}, got {0}")]
pub struct RoundOutOfRange(pub i32);

/// All playable rounds in order.
pub fn rounds() -> RangeInclusive<i32> {
    FIRST_ROUND..=FINAL_ROUND
}

pub fn validate_round(round: i32) -> Result<i32, RoundOutOfRange> {
    if rounds().contains(&round) {
        Ok(round)
    } else {
        Err(RoundOutOfRange(round))
    }
}

/// The round a team moves to after clearing `round`, saturating at [`FINISHED_ROUND`].
pub fn next_round(round: i32) -> i32 {
    round.saturating_add(1).min(FINISHED_ROUND)
}
