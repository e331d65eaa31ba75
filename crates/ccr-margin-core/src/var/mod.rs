pub mod engine;

mod historical;
mod monte_carlo;
mod parametric;
