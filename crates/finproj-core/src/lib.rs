pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "amortization")]
pub mod amortization;

#[cfg(feature = "projection")]
pub mod projection;

#[cfg(feature = "returns")]
pub mod returns;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

#[cfg(feature = "scoring")]
pub mod scoring;

pub use error::FinProjError;
pub use types::*;

/// Standard result type for all projection and return operations
pub type FinProjResult<T> = Result<T, FinProjError>;
