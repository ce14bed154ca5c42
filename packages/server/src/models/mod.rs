pub mod auth;
pub mod event;
pub mod round;
pub mod shared;
pub mod team;
