pub mod exposure;
pub mod parameters;
