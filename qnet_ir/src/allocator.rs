// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! Symbolic allocators for the four disjoint resource classes a subroutine
//! needs: virtual qubit ids, registers (per [`Role`]), array addresses, and
//! branch-label sequence numbers.
//!
//! The qubit allocator recycles freed ids by favoring the lowest free slot
//! before minting a new one, the same policy as the teacher's partial-eval
//! `ResourceManager::allocate_qubit`. Registers, arrays, and labels are handed
//! out by monotonically increasing counters and are never recycled within a
//! subroutine, which is what keeps invariant I3 (uniqueness within a class)
//! trivially true for them.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::ir::{ArrayHandle, Label, Register, Role};

/// Allocates and recycles virtual qubit ids.
///
/// Recycling only ever returns a slot to the free list when the owning handle
/// is freed, so the "unique among simultaneously active qubits" half of the
/// virtual-qubit-id invariant holds by construction: two live qubits can never
/// share a slot.
#[derive(Debug, Default)]
pub struct QubitAllocator {
    in_use: Vec<bool>,
}

impl QubitAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh virtual qubit id, favoring the lowest previously-freed
    /// slot over minting a new one.
    pub fn allocate(&mut self) -> Result<u64> {
        if let Some(id) = self.in_use.iter().position(|in_use| !in_use) {
            self.in_use[id] = true;
            Ok(id as u64)
        } else {
            if self.in_use.len() == usize::try_from(u32::MAX).unwrap_or(usize::MAX) {
                return Err(Error::AllocatorExhausted {
                    class: "virtual qubit id",
                });
            }
            self.in_use.push(true);
            Ok((self.in_use.len() - 1) as u64)
        }
    }

    /// Releases a virtual qubit id for future reuse. A no-op if the id is
    /// already free, matching the permissive re-activation handling noted as an
    /// open question: double-freeing at this layer is harmless bookkeeping.
    pub fn free(&mut self, id: u64) {
        if let Some(slot) = self.in_use.get_mut(id as usize) {
            *slot = false;
        }
    }
}

/// Allocates fresh register indices, one monotonic counter per [`Role`].
#[derive(Debug, Default)]
pub struct RegisterAllocator {
    next: [u32; 4],
}

impl RegisterAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(role: Role) -> usize {
        match role {
            Role::Q => 0,
            Role::R => 1,
            Role::C => 2,
            Role::Epr => 3,
        }
    }

    /// Allocates a fresh register in the given role.
    pub fn allocate(&mut self, role: Role) -> Result<Register> {
        let slot = Self::slot(role);
        let index = self.next[slot];
        self.next[slot] = index.checked_add(1).ok_or(Error::AllocatorExhausted {
            class: "register",
        })?;
        Ok(Register { role, index })
    }
}

/// Allocates array addresses (the stable index into a subroutine's array
/// table).
#[derive(Debug, Default)]
pub struct ArrayAllocator {
    next_address: u32,
}

impl ArrayAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a handle for a fresh array of the given length.
    pub fn allocate(&mut self, length: u32) -> Result<ArrayHandle> {
        let address = self.next_address;
        self.next_address = address
            .checked_add(1)
            .ok_or(Error::AllocatorExhausted { class: "array" })?;
        Ok(ArrayHandle { address, length })
    }
}

/// The label-name prefix, selected by the control-flow construct that opened
/// the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    IfExit,
    Else,
    LoopStart,
    LoopExit,
    TryStart,
    TryExit,
}

impl LabelKind {
    fn prefix(self) -> &'static str {
        match self {
            LabelKind::IfExit => "IF_EXIT",
            LabelKind::Else => "ELSE",
            LabelKind::LoopStart => "LOOP_START",
            LabelKind::LoopExit => "LOOP_EXIT",
            LabelKind::TryStart => "TRY_START",
            LabelKind::TryExit => "TRY_EXIT",
        }
    }
}

/// Allocates unique label names `<KIND><seq>`, `seq` incrementing globally per
/// subroutine so that two labels of the same kind never collide (invariant I2).
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next_seq: u32,
}

impl LabelAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh, subroutine-unique label of the given kind.
    pub fn allocate(&mut self, kind: LabelKind) -> Result<Label> {
        let seq = self.next_seq;
        self.next_seq = seq.checked_add(1).ok_or(Error::AllocatorExhausted {
            class: "branch label",
        })?;
        Ok(Label(Rc::from(format!("{}{seq}", kind.prefix()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qubit_ids_recycle_lowest_free_slot() {
        let mut alloc = QubitAllocator::new();
        let a = alloc.allocate().unwrap();
        let b = alloc.allocate().unwrap();
        assert_eq!((a, b), (0, 1));
        alloc.free(a);
        let c = alloc.allocate().unwrap();
        assert_eq!(c, 0, "freed id should be reused before minting a new one");
        let d = alloc.allocate().unwrap();
        assert_eq!(d, 2);
    }

    #[test]
    fn registers_are_disjoint_per_role_and_monotonic() {
        let mut alloc = RegisterAllocator::new();
        let q0 = alloc.allocate(Role::Q).unwrap();
        let r0 = alloc.allocate(Role::R).unwrap();
        let q1 = alloc.allocate(Role::Q).unwrap();
        assert_eq!(q0.index, 0);
        assert_eq!(q1.index, 1);
        assert_eq!(r0.index, 0);
    }

    #[test]
    fn labels_are_unique_even_for_same_kind() {
        let mut alloc = LabelAllocator::new();
        let a = alloc.allocate(LabelKind::IfExit).unwrap();
        let b = alloc.allocate(LabelKind::IfExit).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.0.as_ref(), "IF_EXIT0");
        assert_eq!(b.0.as_ref(), "IF_EXIT1");
    }

    #[test]
    fn arrays_get_increasing_addresses() {
        let mut alloc = ArrayAllocator::new();
        let a = alloc.allocate(4).unwrap();
        let b = alloc.allocate(2).unwrap();
        assert_eq!(a.address, 0);
        assert_eq!(b.address, 1);
        assert_eq!(b.length, 2);
    }
}
