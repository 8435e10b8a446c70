// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! Error kinds surfaced by the builder.
//!
//! The builder never attempts local recovery: every error propagates out of the
//! current scope, and session teardown (see [`crate::connection`]) guarantees the
//! pending subroutine is still released on the error path.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A gate, measurement, or other operation was attempted on a qubit handle
    /// that has already been freed or measured destructively.
    #[error("qubit {qubit_id} is not active")]
    QubitNotActive { qubit_id: u64 },

    /// A symbolic allocator (qubit ids, registers of a given role, array
    /// addresses, or label sequence numbers) ran out of room.
    #[error("allocator for {class} is exhausted")]
    AllocatorExhausted { class: &'static str },

    /// A control-flow scope was closed out of order, i.e. not as the innermost
    /// currently-open scope.
    #[error("scope misuse: expected to close {expected}, but innermost open scope is {found}")]
    ScopeMisuse {
        expected: &'static str,
        found: &'static str,
    },

    /// A pattern passed to the inspector violates the wildcard placement rules.
    #[error("invalid pattern: {reason}")]
    PatternInvalid { reason: &'static str },

    /// Downstream-detectable inconsistency in the emitted IR: an undefined
    /// branch target, or a duplicate id within one resource class.
    #[error("IR inconsistency: {reason}")]
    IrInconsistency { reason: String },
}
