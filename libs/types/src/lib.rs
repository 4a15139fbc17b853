//! Types library for the yield-skimming vault
//!
//! Shared type definitions used by the vault contracts: holder identifiers,
//! RAY fixed-point numerics and the arithmetic error taxonomy.
//!
//! # Modules
//! - `ids`: Unique identifiers (AccountId, AssetId)
//! - `numeric`: 256-bit integers, RAY exchange rates, rounding-aware mul/div
//! - `time`: Timestamp alias and duration constants
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod time;
pub mod errors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::time::*;
    pub use crate::errors::*;
}
