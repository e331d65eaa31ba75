pub mod parameters;
pub mod schedule;
