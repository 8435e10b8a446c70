// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! The instruction and operand types that make up a [`crate::subroutine::PreSubroutine`].
//!
//! This mirrors the closed opcode set and operand kinds from the data model: an
//! [`ICmd`] is a tagged `(opcode, operands)` pair, never a per-instruction struct
//! variant, so that new instructions never require touching every consumer that
//! matches on instruction shape (the pattern matcher in particular only ever
//! needs to compare [`Opcode`]s).

use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

/// The closed opcode set. See the data model for the semantics of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Opcode {
    QAlloc,
    QFree,
    Init,
    Meas,
    X,
    Y,
    Z,
    H,
    S,
    T,
    K,
    RotX,
    RotY,
    RotZ,
    CNot,
    CPhase,
    Set,
    Add,
    Store,
    Load,
    Array,
    CreateEpr,
    RecvEpr,
    WaitAll,
    Beq,
    Bne,
    Bez,
    Bnz,
    Jmp,
    RetReg,
    RetArr,
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A register's resource class. `Q` holds virtual qubit ids during lowering,
/// `R` is general scratch, `C` is used for loop counters and user-pinned
/// registers, and `Epr` is reserved for entanglement-generation metadata
/// (ent-info slot counts, remote node ids) that never participates in gate
/// operands directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Q,
    R,
    C,
    Epr,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Q => "Q",
            Role::R => "R",
            Role::C => "C",
            Role::Epr => "W",
        };
        write!(f, "{s}")
    }
}

/// `(role, index)`. Indices are handed out per-role by the register allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    pub role: Role,
    pub index: u32,
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role, self.index)
    }
}

/// `(address, length)`. `address` is a stable index into the subroutine's array
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayHandle {
    pub address: u32,
    pub length: u32,
}

impl Display for ArrayHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}[{}]", self.address, self.length)
    }
}

/// The name of a [`crate::subroutine::Item::Label`], unique within one subroutine.
/// Cheaply cloned (`Rc<str>`) since operands and scope-close machinery both need
/// to hold on to label names independently of the subroutine that defines them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub Rc<str>);

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An operand value. Every `ICmd` carries zero or more of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// An immediate integer.
    Immediate(i64),
    /// A register identifier.
    Register(Register),
    /// An array handle, used directly by `ARRAY`/`CREATE_EPR`/`WAIT_ALL`.
    Array(ArrayHandle),
    /// `(array, index-operand)`. The index may itself be an immediate or a
    /// register, so loop-varying indices can be expressed without a new operand
    /// kind.
    ArrayEntry(ArrayHandle, Box<Operand>),
    /// A reference to a branch label.
    Label(Label),
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Immediate(v) => write!(f, "{v}"),
            Operand::Register(r) => write!(f, "{r}"),
            Operand::Array(a) => write!(f, "{a}"),
            Operand::ArrayEntry(a, idx) => write!(f, "{a}[{idx}]"),
            Operand::Label(l) => write!(f, "{l}"),
        }
    }
}

/// A single instruction: an opcode plus its operands, in the order they were
/// emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ICmd {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
}

impl ICmd {
    #[must_use]
    pub fn new(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self { opcode, operands }
    }
}

impl Display for ICmd {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for (i, op) in self.operands.iter().enumerate() {
            if i == 0 {
                write!(f, " ")?;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}
