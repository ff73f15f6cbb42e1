//! Error types for the lumped network simulator.
//!
//! This module provides a unified error type [`LumpedError`] that covers
//! every failure that can occur while reading a netlist, evaluating source
//! expressions, reducing the network graph and time stepping.
//!
//! Structural problems (too few or too many equations) are *not* errors:
//! they are expected, user-correctable situations and are reported through
//! [`crate::solver::SolveReport`] status codes instead.

use thiserror::Error;

/// Result type alias using [`LumpedError`].
pub type Result<T> = std::result::Result<T, LumpedError>;

/// Unified error type for all lumped-network operations.
#[derive(Error, Debug)]
pub enum LumpedError {
    // ============ Expression Errors ============
    /// Character not allowed in an expression
    #[error("Unexpected character '{character}' at column {column} in expression")]
    UnexpectedCharacter { character: char, column: usize },

    /// Malformed numeric literal
    #[error("Unable to scan number '{text}' at column {column}")]
    BadNumber { text: String, column: usize },

    /// Identifier that is neither a function, a constant nor `t`
    #[error("Unknown identifier '{name}' (supported: {supported})")]
    UnknownIdentifier { name: String, supported: String },

    /// Token found where another one was required
    #[error("Unexpected token '{found}' at column {column}, expected {expected}")]
    UnexpectedToken {
        found: String,
        column: usize,
        expected: String,
    },

    /// Expression ended early
    #[error("Expression ended unexpectedly, expected {expected}")]
    UnexpectedEnd { expected: String },

    // ============ Netlist Errors ============
    /// Syntax error in a netlist line
    #[error("Netlist error at line {line}: {message}")]
    Netlist { line: usize, message: String },

    // ============ Graph Reduction Errors ============
    /// Nothing to solve
    #[error("No system to solve: the network has no element")]
    EmptyNetwork,

    /// A connected group of endpoints contains only wires
    #[error("Wire-only component, no element terminates wires {wires:?}")]
    GraphReduction { wires: Vec<String> },

    /// A component has no branch point (a pure cycle of series elements)
    #[error("Unsupported topology: elements {elements:?} form a loop without any branch point")]
    UnsupportedTopology { elements: Vec<String> },

    /// Path walk did not reach a branch point within the edge budget
    #[error("Path walk from node {start} exceeded {limit} steps")]
    PathWalkOverflow { start: usize, limit: usize },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix at t = {time}")]
    SingularMatrix { time: f64 },

    /// Diode switching did not settle
    #[error("Diode switching did not settle after {iterations} iterations at t = {time}")]
    SimulationFault { iterations: usize, time: f64 },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    /// Broken internal invariant (a bug, never a user error)
    #[error("Internal error: {message}")]
    Internal { message: String },

    // ============ I/O Errors ============
    /// Error reading a netlist file
    #[error("Failed to read netlist file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error writing an export
    #[error("Failed to write output: {source}")]
    OutputError {
        #[source]
        source: std::io::Error,
    },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl LumpedError {
    /// Create a netlist error
    pub fn netlist(line: usize, message: impl Into<String>) -> Self {
        Self::Netlist {
            line,
            message: message.into(),
        }
    }

    /// Create an unexpected-token error
    pub fn unexpected_token(
        found: impl Into<String>,
        column: usize,
        expected: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            found: found.into(),
            column,
            expected: expected.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }

    /// Create an internal invariant error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error comes from the source-expression evaluator.
    pub fn is_expression_error(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedCharacter { .. }
                | Self::BadNumber { .. }
                | Self::UnknownIdentifier { .. }
                | Self::UnexpectedToken { .. }
                | Self::UnexpectedEnd { .. }
        )
    }
}
