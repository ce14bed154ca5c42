pub mod admin_user;
pub mod event_state;
pub mod override_log;
pub mod round_capacity;
pub mod round_record;
pub mod submission_log;
pub mod team;
