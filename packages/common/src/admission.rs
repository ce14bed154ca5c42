use serde::Serialize;

use crate::access::TeamProgress;
use crate::TeamStatus;

/// Result of the advancement decision for one team and one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Admission {
    Advanced,
    Eliminated,
}

impl Admission {
    pub fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced)
    }
}

/// Admit by arrival rank.
///
/// `arrival_rank` is 1-based and counts the deciding team's own log entry.
/// The boundary is inclusive: the `capacity`-th arrival is the last one admitted.
pub fn admit(arrival_rank: u64, capacity: u64) -> Admission {
    if arrival_rank <= capacity {
        Admission::Advanced
    } else {
        Admission::Eliminated
    }
}

/// Re-derive the outcome already recorded for `round` from the team's state.
///
/// Returns `None` when the team record carries no decision for that round.
pub fn recorded_outcome(team: &TeamProgress, round: i32) -> Option<Admission> {
    match team.status {
        TeamStatus::Eliminated if team.eliminated_round == Some(round) => {
            Some(Admission::Eliminated)
        }
        _ if team.current_round > round => Some(Admission::Advanced),
        _ => None,
    }
}
