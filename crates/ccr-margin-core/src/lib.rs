pub mod error;
pub mod model;
pub mod types;

mod math;

#[cfg(feature = "sa_ccr")]
pub mod sa_ccr;

#[cfg(feature = "pfe")]
pub mod pfe;

#[cfg(feature = "var")]
pub mod var;

#[cfg(feature = "grid_schedule")]
pub mod grid;

#[cfg(feature = "simm")]
pub mod simm;

pub use error::CcrMarginError;
pub use types::*;

/// Standard result type for all ccr-margin operations
pub type CcrMarginResult<T> = Result<T, CcrMarginError>;
