pub mod margin;
pub mod parameters;
