pub mod rates;
pub mod schedule;
pub mod setup;
pub mod ui;
pub mod update;
