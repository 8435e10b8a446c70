// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! The quantum-program builder and its intermediate representation.
//!
//! Application code manipulates handles to qubits, classical registers, and
//! arrays, and expresses classical control flow through scoped constructs on
//! [`Builder`]. The builder records each operation as it happens and lowers
//! high-level operations into a linear [`subroutine::PreSubroutine`]: an
//! ordered list of typed instructions and branch labels ready for downstream
//! assembly into a binary quantum-network instruction stream.
//!
//! This crate does not perform that assembly, simulate qubits, or talk to a
//! transport; see [`connection::DebugConnection`] for the inspectable,
//! runtime-free session used by tests and by [`mod@crate`]'s own CLI demos.

pub mod allocator;
pub mod array;
pub mod builder;
pub mod config;
pub mod connection;
pub mod epr;
pub mod error;
pub mod future;
pub mod ir;
pub mod qubit;
pub mod rotation;
pub mod scope;
pub mod subroutine;

pub use array::Array;
pub use builder::{Builder, CompareKind, GateTarget};
pub use config::LogConfig;
pub use connection::{DebugConnection, NetworkInfo, StaticNetworkInfo};
pub use epr::{EPRSocket, EprResult, EprType};
pub use error::{Error, Result};
pub use future::{ArrayFuture, Future, RegFuture};
pub use ir::{ArrayHandle, ICmd, Label, Opcode, Operand, Register, Role};
pub use qubit::{EntanglementInfo, Qubit};
pub use subroutine::{Item, Pattern, PreSubroutine};
