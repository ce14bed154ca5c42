use serde::{Deserialize, Serialize};

use crate::TeamStatus;

/// Playability of one round for one team.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RoundAccess {
    Locked,
    Unlocked,
    /// No longer playable. Says nothing about whether the team advanced.
    Completed,
}

/// The slice of a team record that decides round access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeamProgress {
    pub current_round: i32,
    pub status: TeamStatus,
    pub eliminated_round: Option<i32>,
    pub event_access: bool,
}

impl TeamProgress {
    /// Resolve the access state of `round`.
    ///
    /// `submitted` is the round ledger's flag for this team and round.
    /// An eliminated team is frozen: rounds up to its elimination round read as
    /// completed and every later round stays locked.
    pub fn access(&self, round: i32, submitted: bool) -> RoundAccess {
        if self.status == TeamStatus::Eliminated {
            let cut_at = self.eliminated_round.unwrap_or(self.current_round);
            return if round <= cut_at {
                RoundAccess::Completed
            } else {
                RoundAccess::Locked
            };
        }

        if submitted || round < self.current_round {
            return RoundAccess::Completed;
        }

        if round == self.current_round && self.event_access {
            RoundAccess::Unlocked
        } else {
            RoundAccess::Locked
        }
    }

    /// Whether the team may submit an answer for `round` right now.
    pub fn can_play(&self, round: i32) -> bool {
        self.event_access && self.status.is_active() && self.current_round == round
    }
}
