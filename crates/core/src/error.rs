//! Error types for multiplier configuration and value scaling.

use thiserror::Error;

/// Errors raised while resolving the frame multiplier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A multiplier of zero would stop time entirely.
    #[error("frame multiplier must be at least 1")]
    ZeroMultiplier,
    /// The configured limiter name is not recognised.
    #[error("unknown fps limiter `{0}`")]
    UnknownLimiter(String),
}

/// Errors raised when a value cannot be rescaled by the active multiplier.
///
/// These are fatal: they mean the multiplier is incompatible with the
/// constants encoded in the battle data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScaleError {
    /// Multiplying a value overflowed its storage width.
    #[error("scaling {value} by {multiplier} overflows a {bits}-bit field")]
    Overflow {
        /// Value before scaling.
        value: i64,
        /// Active multiplier.
        multiplier: u8,
        /// Storage width of the field in bits.
        bits: u8,
    },
    /// A script literal is too large to be multiplied in place.
    #[error(
        "script operand {value:#04x} cannot be multiplied by {multiplier} (limit {limit:#04x})"
    )]
    ScriptOperand {
        /// Operand before scaling.
        value: u8,
        /// Active multiplier.
        multiplier: u8,
        /// Exclusive upper bound on operands for this multiplier.
        limit: u16,
    },
}
