// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! Deferred classical scalars: [`Future`] values backed by either an array
//! cell or a register.
//!
//! A `Future` never implicitly coerces into the value it refers to; reading
//! one is always an explicit [`Future::load`] call that emits `LOAD` (or
//! elides it, for a register-backed future, returning the register directly).

use crate::builder::{Builder, CompareKind};
use crate::error::Result;
use crate::ir::{ArrayHandle, Operand, Register};

/// Either an immediate array slot or a register holding a loop-varying index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOperand {
    Immediate(u32),
    Register(Register),
}

impl From<IndexOperand> for Operand {
    fn from(idx: IndexOperand) -> Self {
        match idx {
            IndexOperand::Immediate(i) => Operand::Immediate(i64::from(i)),
            IndexOperand::Register(r) => Operand::Register(r),
        }
    }
}

/// A deferred scalar backed by a cell in one of the node's classical arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayFuture {
    pub(crate) array: ArrayHandle,
    pub(crate) index: IndexOperand,
}

impl ArrayFuture {
    #[must_use]
    pub fn array(&self) -> ArrayHandle {
        self.array
    }

    /// Reads this cell into a fresh register, emitting `LOAD`.
    pub fn load(&self, builder: &mut Builder) -> Result<Register> {
        builder.emit_load(self.array, self.index.clone())
    }

    /// Compares this cell's value against `value` and runs `body` if the
    /// comparison holds, per the inverse-branch discipline in the control-flow
    /// contexts: the branch instruction fires (skipping `body`) exactly when the
    /// predicate is false.
    pub fn if_eq(&self, builder: &mut Builder, value: i64, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        let reg = self.load(builder)?;
        builder.if_compare(CompareKind::Eq, Operand::Register(reg), Operand::Immediate(value), body)
    }

    pub fn if_ne(&self, builder: &mut Builder, value: i64, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        let reg = self.load(builder)?;
        builder.if_compare(CompareKind::Ne, Operand::Register(reg), Operand::Immediate(value), body)
    }

    pub fn if_ez(&self, builder: &mut Builder, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        let reg = self.load(builder)?;
        builder.if_compare(CompareKind::Ez, Operand::Register(reg), Operand::Immediate(0), body)
    }

    pub fn if_nz(&self, builder: &mut Builder, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        let reg = self.load(builder)?;
        builder.if_compare(CompareKind::Nz, Operand::Register(reg), Operand::Immediate(0), body)
    }
}

/// A deferred scalar that lives only in a register: no array cell is ever
/// allocated for it, so reads never emit `LOAD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegFuture {
    pub(crate) register: Register,
}

impl RegFuture {
    #[must_use]
    pub fn register(&self) -> Register {
        self.register
    }

    /// Returns the backing register directly; no instruction is emitted.
    #[must_use]
    pub fn load(&self, _builder: &mut Builder) -> Register {
        self.register
    }

    pub fn if_eq(&self, builder: &mut Builder, value: i64, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        builder.if_compare(CompareKind::Eq, Operand::Register(self.register), Operand::Immediate(value), body)
    }

    pub fn if_ne(&self, builder: &mut Builder, value: i64, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        builder.if_compare(CompareKind::Ne, Operand::Register(self.register), Operand::Immediate(value), body)
    }

    pub fn if_ez(&self, builder: &mut Builder, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        builder.if_compare(CompareKind::Ez, Operand::Register(self.register), Operand::Immediate(0), body)
    }

    pub fn if_nz(&self, builder: &mut Builder, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        builder.if_compare(CompareKind::Nz, Operand::Register(self.register), Operand::Immediate(0), body)
    }
}

/// Tagged union of the two backing stores a deferred scalar can have.
#[derive(Debug, Clone, PartialEq)]
pub enum Future {
    Array(ArrayFuture),
    Reg(RegFuture),
}

impl Future {
    pub fn load(&self, builder: &mut Builder) -> Result<Register> {
        match self {
            Future::Array(f) => f.load(builder),
            Future::Reg(f) => Ok(f.load(builder)),
        }
    }

    pub fn if_eq(&self, builder: &mut Builder, value: i64, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        match self {
            Future::Array(f) => f.if_eq(builder, value, body),
            Future::Reg(f) => f.if_eq(builder, value, body),
        }
    }

    pub fn if_ne(&self, builder: &mut Builder, value: i64, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        match self {
            Future::Array(f) => f.if_ne(builder, value, body),
            Future::Reg(f) => f.if_ne(builder, value, body),
        }
    }

    pub fn if_ez(&self, builder: &mut Builder, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        match self {
            Future::Array(f) => f.if_ez(builder, body),
            Future::Reg(f) => f.if_ez(builder, body),
        }
    }

    pub fn if_nz(&self, builder: &mut Builder, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        match self {
            Future::Array(f) => f.if_nz(builder, body),
            Future::Reg(f) => f.if_nz(builder, body),
        }
    }
}
