// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! Handles onto qubits allocated in the quantum node.

use crate::array::Array;
use crate::builder::{Builder, GateTarget};
use crate::error::{Error, Result};
use crate::future::{ArrayFuture, Future, RegFuture};
use crate::ir::{Opcode, Register, Role};

/// Entanglement-generation metadata attached to a qubit produced by
/// [`crate::epr::EPRSocket::recv`] or the synchronous half of `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntanglementInfo {
    pub remote_node_id: u32,
}

/// A handle to a qubit allocated (or pending allocation, in the EPR
/// post-routine case) in the quantum node.
///
/// Operations are methods here rather than free functions so call sites read
/// `q.h(&mut builder)` the way the source SDK reads `q.H()` — the builder
/// reference stands in for the implicit session the Python SDK captures in
/// `self._conn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Qubit {
    target: GateTarget,
    active: bool,
    ent_info: Option<EntanglementInfo>,
}

impl Qubit {
    /// Allocates a fresh virtual id and emits `QALLOC`/`INIT` for it.
    pub fn new(builder: &mut Builder) -> Result<Self> {
        let id = builder.new_qubit_id()?;
        builder.add_new_qubit_commands(id)?;
        Ok(Self {
            target: GateTarget::Immediate(id),
            active: true,
            ent_info: None,
        })
    }

    /// Wraps an already-allocated virtual id without emitting `QALLOC`/`INIT`,
    /// for qubits synthesized by `CREATE_EPR`/`RECV_EPR`.
    pub(crate) fn from_existing(id: u64, ent_info: Option<EntanglementInfo>) -> Self {
        Self {
            target: GateTarget::Immediate(id),
            active: true,
            ent_info,
        }
    }

    /// Wraps a register-indirect gate target, for the post-routine of a
    /// multi-pair `create()` call where the virtual qubit id is only known at
    /// runtime (loaded from a qubit-id array).
    pub(crate) fn from_register(reg: Register) -> Self {
        Self {
            target: GateTarget::Indirect(reg),
            active: true,
            ent_info: None,
        }
    }

    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn virtual_id(&self) -> Option<u64> {
        match self.target {
            GateTarget::Immediate(id) => Some(id),
            GateTarget::Indirect(_) => None,
        }
    }

    #[must_use]
    pub fn entanglement_info(&self) -> Option<EntanglementInfo> {
        self.ent_info
    }

    /// # Errors
    /// Returns [`Error::QubitNotActive`] if this handle has already been
    /// freed or measured destructively.
    pub fn assert_active(&self) -> Result<()> {
        if self.active {
            Ok(())
        } else {
            Err(Error::QubitNotActive {
                qubit_id: self.virtual_id().unwrap_or(u64::MAX),
            })
        }
    }

    fn single(&self, builder: &mut Builder, opcode: Opcode) -> Result<()> {
        self.assert_active()?;
        builder.add_single_qubit_commands(opcode, self.target)
    }

    pub fn x(&self, builder: &mut Builder) -> Result<()> {
        self.single(builder, Opcode::X)
    }

    pub fn y(&self, builder: &mut Builder) -> Result<()> {
        self.single(builder, Opcode::Y)
    }

    pub fn z(&self, builder: &mut Builder) -> Result<()> {
        self.single(builder, Opcode::Z)
    }

    pub fn h(&self, builder: &mut Builder) -> Result<()> {
        self.single(builder, Opcode::H)
    }

    pub fn s(&self, builder: &mut Builder) -> Result<()> {
        self.single(builder, Opcode::S)
    }

    pub fn t(&self, builder: &mut Builder) -> Result<()> {
        self.single(builder, Opcode::T)
    }

    pub fn k(&self, builder: &mut Builder) -> Result<()> {
        self.single(builder, Opcode::K)
    }

    fn rotation(&self, builder: &mut Builder, opcode: Opcode, n: i64, d: u8, angle: Option<f64>) -> Result<()> {
        self.assert_active()?;
        builder.add_single_qubit_rotation_commands(opcode, self.target, n, d, angle)
    }

    pub fn rot_x(&self, builder: &mut Builder, n: i64, d: u8) -> Result<()> {
        self.rotation(builder, Opcode::RotX, n, d, None)
    }

    pub fn rot_x_angle(&self, builder: &mut Builder, angle: f64) -> Result<()> {
        self.rotation(builder, Opcode::RotX, 0, 0, Some(angle))
    }

    pub fn rot_y(&self, builder: &mut Builder, n: i64, d: u8) -> Result<()> {
        self.rotation(builder, Opcode::RotY, n, d, None)
    }

    pub fn rot_y_angle(&self, builder: &mut Builder, angle: f64) -> Result<()> {
        self.rotation(builder, Opcode::RotY, 0, 0, Some(angle))
    }

    pub fn rot_z(&self, builder: &mut Builder, n: i64, d: u8) -> Result<()> {
        self.rotation(builder, Opcode::RotZ, n, d, None)
    }

    pub fn rot_z_angle(&self, builder: &mut Builder, angle: f64) -> Result<()> {
        self.rotation(builder, Opcode::RotZ, 0, 0, Some(angle))
    }

    pub fn cnot(&self, builder: &mut Builder, target: &Qubit) -> Result<()> {
        self.assert_active()?;
        target.assert_active()?;
        builder.add_two_qubit_commands(Opcode::CNot, self.target, target.target)
    }

    pub fn cphase(&self, builder: &mut Builder, target: &Qubit) -> Result<()> {
        self.assert_active()?;
        target.assert_active()?;
        builder.add_two_qubit_commands(Opcode::CPhase, self.target, target.target)
    }

    /// Measures the qubit. If no `future` is supplied, one is created: an
    /// array-backed future by default, or a register-backed one if
    /// `store_array` is false.
    pub fn measure(&mut self, builder: &mut Builder, future: Option<Future>, inplace: bool, store_array: bool) -> Result<Future> {
        self.assert_active()?;

        let future = match future {
            Some(f) => f,
            None if store_array => {
                let array = builder.new_array(1)?;
                Future::Array(array.get_future_index(0))
            }
            None => Future::Reg(RegFuture {
                register: builder.allocate_register(Role::R)?,
            }),
        };

        let (out_reg, array_write) = match &future {
            Future::Array(ArrayFuture { array, index }) => (builder.allocate_register(Role::R)?, Some((*array, index.clone()))),
            Future::Reg(RegFuture { register }) => (*register, None),
        };

        builder.add_measure_commands(self.target, out_reg, array_write, inplace)?;

        if matches!(future, Future::Reg(_)) {
            builder.declare_return_register(out_reg);
        }

        if !inplace {
            self.active = false;
        }

        Ok(future)
    }

    /// Resets the qubit to \|0> in place, without reallocating it.
    pub fn reset(&self, builder: &mut Builder) -> Result<()> {
        self.assert_active()?;
        match self.target {
            GateTarget::Immediate(id) => builder.add_init_qubit_commands(id),
            GateTarget::Indirect(_) => Err(Error::IrInconsistency {
                reason: "cannot re-init a register-indirect qubit handle".into(),
            }),
        }
    }

    /// Unallocates the qubit: `QFREE` and deactivation.
    pub fn free(&mut self, builder: &mut Builder) -> Result<()> {
        self.assert_active()?;
        match self.target {
            GateTarget::Immediate(id) => {
                builder.add_qfree_commands(id)?;
                self.active = false;
                Ok(())
            }
            GateTarget::Indirect(_) => Err(Error::IrInconsistency {
                reason: "cannot free a register-indirect qubit handle".into(),
            }),
        }
    }

    pub(crate) fn gate_target(&self) -> GateTarget {
        self.target
    }

    /// Returns a deferred scalar over `array[index]`, for building a qubit-id
    /// array used as a `CREATE_EPR`/`RECV_EPR` destination.
    #[must_use]
    pub fn future_index(array: &Array, index: u32) -> ArrayFuture {
        array.get_future_index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_qubit_is_active_and_has_virtual_id() {
        let mut b = Builder::new();
        let q = Qubit::new(&mut b).unwrap();
        assert!(q.active());
        assert!(q.virtual_id().is_some());
    }

    #[test]
    fn gate_on_freed_qubit_is_rejected() {
        let mut b = Builder::new();
        let mut q = Qubit::new(&mut b).unwrap();
        q.free(&mut b).unwrap();
        assert!(matches!(q.x(&mut b), Err(Error::QubitNotActive { .. })));
    }

    #[test]
    fn non_inplace_measure_deactivates_qubit() {
        let mut b = Builder::new();
        let mut q = Qubit::new(&mut b).unwrap();
        q.measure(&mut b, None, false, true).unwrap();
        assert!(!q.active());
    }

    #[test]
    fn inplace_measure_keeps_qubit_active() {
        let mut b = Builder::new();
        let mut q = Qubit::new(&mut b).unwrap();
        q.measure(&mut b, None, true, true).unwrap();
        assert!(q.active());
    }

    #[test]
    fn register_backed_future_skips_array_allocation() {
        let mut b = Builder::new();
        let mut q = Qubit::new(&mut b).unwrap();
        let future = q.measure(&mut b, None, false, false).unwrap();
        assert!(matches!(future, Future::Reg(_)));
    }
}
