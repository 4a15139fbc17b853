//! Error types for fixed-point arithmetic
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Arithmetic errors raised by `numeric`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Arithmetic overflow in {context}")]
    Overflow { context: &'static str },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: &'static str },

    #[error("Unsupported rate precision: {decimals} decimals (max {max})")]
    UnsupportedPrecision { decimals: u8, max: u8 },

    #[error("Arithmetic underflow in {context}")]
    Underflow { context: &'static str },
}
