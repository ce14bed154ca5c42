pub mod access;
pub mod admission;
pub mod answer;
pub mod capacity;
pub mod ranking;
pub mod round;
pub mod team_status;

pub use access::{RoundAccess, TeamProgress};
pub use admission::Admission;
pub use capacity::ParticipantLimits;
pub use team_status::TeamStatus;
