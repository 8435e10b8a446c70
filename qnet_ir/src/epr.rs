// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! Entanglement-generation (EPR) sockets.
//!
//! An `EPRSocket` is bound to one peer node and composes array allocation
//! with `CREATE_EPR`/`RECV_EPR` + `WAIT_ALL`, optionally followed by a
//! synthesised loop over freshly generated pairs (§4.5 of the component
//! design: the *sequential* path, used so the emitted program size stays
//! independent of the pair count).

use crate::array::Array;
use crate::builder::Builder;
use crate::error::Result;
use crate::future::{ArrayFuture, IndexOperand};
use crate::ir::{Opcode, Operand, Register, Role};
use crate::qubit::{EntanglementInfo, Qubit};

/// Which entanglement-generation protocol a `create`/`recv` call requests.
/// `K` ("create-and-keep") leaves a usable qubit on each node; `M`
/// ("measure-directly") returns only the measurement outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EprType {
    K,
    M,
}

impl EprType {
    fn code(self) -> i64 {
        match self {
            EprType::K => 0,
            EprType::M => 1,
        }
    }

    /// Classical slots reserved per pair in the entanglement-info array. The
    /// exact per-type record layout is a downstream-assembler concern; the
    /// core only needs it as a sizing parameter.
    fn slots_per_pair(self) -> u32 {
        match self {
            EprType::K => 10,
            EprType::M => 7,
        }
    }
}

/// The outcome of a `create`/`recv` call: kept qubits for type `K`, or
/// measurement-outcome futures for type `M`.
#[derive(Debug, Clone, PartialEq)]
pub enum EprResult {
    Qubits(Vec<Qubit>),
    Outcomes(Vec<ArrayFuture>),
}

/// An entanglement-generation endpoint bound to one peer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EPRSocket {
    remote_node_id: u32,
}

impl EPRSocket {
    #[must_use]
    pub fn new(remote_node_id: u32) -> Self {
        Self { remote_node_id }
    }

    #[must_use]
    pub fn remote_node_id(&self) -> u32 {
        self.remote_node_id
    }

    fn request(&self, builder: &mut Builder, opcode: Opcode, number: u32, epr_type: EprType) -> Result<(Array, Option<Array>)> {
        let ent_info_array = builder.new_array(number * epr_type.slots_per_pair())?;
        let qubit_id_array = match epr_type {
            EprType::K => Some(builder.new_array(number)?),
            EprType::M => None,
        };

        let mut operands = vec![
            Operand::Immediate(i64::from(self.remote_node_id)),
            Operand::Immediate(epr_type.code()),
            Operand::Immediate(i64::from(number)),
            Operand::Array(ent_info_array.handle()),
        ];
        if let Some(qubit_id_array) = qubit_id_array {
            operands.push(Operand::Array(qubit_id_array.handle()));
        }
        builder.emit_instruction(opcode, operands);

        Ok((ent_info_array, qubit_id_array))
    }

    /// Generates `number` pairs and returns them unrolled: one `Qubit`
    /// (type `K`) or one outcome future (type `M`) per pair, with every
    /// virtual qubit id already known to the builder at this call.
    pub fn create(&self, builder: &mut Builder, number: u32, epr_type: EprType) -> Result<EprResult> {
        self.generate(builder, Opcode::CreateEpr, number, epr_type)
    }

    /// Mirrors [`Self::create`], for the receiving side of the handshake.
    pub fn recv(&self, builder: &mut Builder, number: u32, epr_type: EprType) -> Result<EprResult> {
        self.generate(builder, Opcode::RecvEpr, number, epr_type)
    }

    fn generate(&self, builder: &mut Builder, opcode: Opcode, number: u32, epr_type: EprType) -> Result<EprResult> {
        let (ent_info_array, qubit_id_array) = self.request(builder, opcode, number, epr_type)?;
        builder.emit_instruction(Opcode::WaitAll, vec![Operand::Array(ent_info_array.handle())]);

        match epr_type {
            EprType::K => {
                let qubit_id_array = qubit_id_array.expect("type K always allocates a qubit-id array");
                let mut qubits = Vec::with_capacity(number as usize);
                for pair in 0..number {
                    let id = builder.new_qubit_id()?;
                    let reg = builder.allocate_register(Role::R)?;
                    builder.emit_set(reg, id as i64);
                    builder.emit_store(reg, qubit_id_array.handle(), IndexOperand::Immediate(pair))?;
                    builder.register_active_qubit(id);
                    qubits.push(Qubit::from_existing(
                        id,
                        Some(EntanglementInfo {
                            remote_node_id: self.remote_node_id,
                        }),
                    ));
                }
                builder.declare_return_array(qubit_id_array.handle());
                builder.declare_return_array(ent_info_array.handle());
                Ok(EprResult::Qubits(qubits))
            }
            EprType::M => {
                let outcomes = (0..number)
                    .map(|pair| ent_info_array.get_future_index(pair * epr_type.slots_per_pair()))
                    .collect();
                builder.declare_return_array(ent_info_array.handle());
                Ok(EprResult::Outcomes(outcomes))
            }
        }
    }

    /// Synthesises a single runtime loop over `number` freshly generated
    /// pairs (type `K` only): each iteration loads the pair's virtual qubit
    /// id from the qubit-id array into a register, wraps it as a
    /// register-indirect `Qubit`, and invokes `post_routine` with that qubit
    /// and the loop counter. `post_routine`'s body is emitted exactly once
    /// and executed `number` times at runtime, so the subroutine's size does
    /// not grow with `number`.
    pub fn create_sequential(
        &self,
        builder: &mut Builder,
        number: u32,
        post_routine: impl FnOnce(&mut Builder, &Qubit, Register) -> Result<()>,
    ) -> Result<()> {
        let (ent_info_array, qubit_id_array) = self.request(builder, Opcode::CreateEpr, number, EprType::K)?;
        let qubit_id_array = qubit_id_array.expect("type K always allocates a qubit-id array");
        builder.emit_instruction(Opcode::WaitAll, vec![Operand::Array(ent_info_array.handle())]);

        builder.loop_scope(i64::from(number), |builder, counter| {
            let reg = qubit_id_array.get_future_index_reg(counter).load(builder)?;
            let future_qubit = Qubit::from_register(reg);
            post_routine(builder, &future_qubit, counter)
        })?;

        builder.declare_return_array(qubit_id_array.handle());
        builder.declare_return_array(ent_info_array.handle());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subroutine::Pattern;

    #[test]
    fn create_emits_array_then_create_epr_then_wait_all() {
        let mut b = Builder::new();
        let socket = EPRSocket::new(1);
        socket.create(&mut b, 2, EprType::K).unwrap();
        let sub = b.pop_pending_subroutine().unwrap();
        assert!(sub
            .match_pattern(&[
                Pattern::Op(Opcode::Array),
                Pattern::AnyZeroOrMore,
                Pattern::Op(Opcode::CreateEpr),
                Pattern::Op(Opcode::WaitAll),
            ])
            .unwrap());
    }

    #[test]
    fn create_measure_type_skips_qubit_id_array() {
        let mut b = Builder::new();
        let socket = EPRSocket::new(1);
        let result = socket.create(&mut b, 3, EprType::M).unwrap();
        assert!(matches!(result, EprResult::Outcomes(outcomes) if outcomes.len() == 3));
    }

    #[test]
    fn create_sequential_synthesises_single_loop() {
        let mut b = Builder::new();
        let socket = EPRSocket::new(1);
        socket
            .create_sequential(&mut b, 4, |builder, q, _pair| q.h(builder))
            .unwrap();
        let sub = b.pop_pending_subroutine().unwrap();
        assert!(sub
            .match_pattern(&[
                Pattern::Op(Opcode::CreateEpr),
                Pattern::Op(Opcode::WaitAll),
                Pattern::AnyZeroOrMore,
                Pattern::Op(Opcode::Load),
                Pattern::AnyZeroOrMore,
                Pattern::Op(Opcode::H),
            ])
            .unwrap());
    }
}
