pub mod add_on;
pub mod exposure;
pub mod parameters;
