pub mod advancement;
pub mod control;
pub mod directory;
pub mod ledger;
