// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! The builder: the single source of truth for a node's pending subroutine.
//!
//! Every operation on every public handle (qubits, futures, arrays, EPR
//! sockets, control-flow contexts) ultimately calls back into a `Builder`
//! method, which is the only place that touches the allocators and the
//! command stream. This mirrors the teacher's circuit tracer, which is
//! likewise the sole owner of its pending operation list and scope stack.

use log::debug;
use rustc_hash::FxHashSet;

use crate::allocator::{ArrayAllocator, LabelAllocator, LabelKind, QubitAllocator, RegisterAllocator};
use crate::array::Array;
use crate::error::{Error, Result};
use crate::future::IndexOperand;
use crate::ir::{ArrayHandle, ICmd, Label, Opcode, Operand, Register, Role};
use crate::rotation::angle_to_fraction;
use crate::scope::{ScopeKind, ScopeStack};
use crate::subroutine::{Item, PreSubroutine};

/// A gate operand that is either an immediate virtual qubit id or a register
/// already holding one, loaded there by a prior `LOAD` (the post-`CREATE_EPR`
/// case, where the qubit id is only known at runtime).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTarget {
    Immediate(u64),
    Indirect(Register),
}

impl From<u64> for GateTarget {
    fn from(id: u64) -> Self {
        GateTarget::Immediate(id)
    }
}

impl From<Register> for GateTarget {
    fn from(reg: Register) -> Self {
        GateTarget::Indirect(reg)
    }
}

/// Which comparison an `if_*` context performs; determines the inverse branch
/// opcode emitted to skip the body when the predicate is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    Eq,
    Ne,
    Ez,
    Nz,
}

impl CompareKind {
    fn inverse_opcode(self) -> Opcode {
        match self {
            CompareKind::Eq => Opcode::Bne,
            CompareKind::Ne => Opcode::Beq,
            CompareKind::Ez => Opcode::Bnz,
            CompareKind::Nz => Opcode::Bez,
        }
    }

    /// Whether the comparison takes two operands (`Eq`/`Ne`) or tests a single
    /// value against zero (`Ez`/`Nz`).
    fn is_binary(self) -> bool {
        matches!(self, CompareKind::Eq | CompareKind::Ne)
    }
}

/// The pending state for one node's subroutine: allocators, command stream,
/// and the set of virtual qubit ids currently considered active.
#[derive(Debug, Default)]
pub struct Builder {
    qubit_alloc: QubitAllocator,
    reg_alloc: RegisterAllocator,
    array_alloc: ArrayAllocator,
    label_alloc: LabelAllocator,
    commands: Vec<Item>,
    arrays: Vec<ArrayHandle>,
    return_registers: Vec<Register>,
    return_arrays: Vec<ArrayHandle>,
    active_qubits: FxHashSet<u64>,
    scopes: ScopeStack,
}

impl Builder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active_qubits(&self) -> &FxHashSet<u64> {
        &self.active_qubits
    }

    #[must_use]
    pub fn is_qubit_active(&self, id: u64) -> bool {
        self.active_qubits.contains(&id)
    }

    fn emit(&mut self, opcode: Opcode, operands: Vec<Operand>) {
        self.commands.push(Item::Cmd(ICmd::new(opcode, operands)));
    }

    /// Emits an arbitrary instruction, for callers (e.g. the EPR socket) that
    /// assemble opcodes not covered by a dedicated `emit_*` helper.
    pub(crate) fn emit_instruction(&mut self, opcode: Opcode, operands: Vec<Operand>) {
        self.emit(opcode, operands);
    }

    fn emit_label_item(&mut self, label: Label) {
        self.commands.push(Item::Label(label));
    }

    fn gate_register(&mut self, target: GateTarget) -> Result<Register> {
        match target {
            GateTarget::Indirect(reg) => Ok(reg),
            GateTarget::Immediate(vid) => {
                let reg = self.reg_alloc.allocate(Role::Q)?;
                self.emit(Opcode::Set, vec![Operand::Register(reg), Operand::Immediate(vid as i64)]);
                Ok(reg)
            }
        }
    }

    // ---- qubit lifecycle -------------------------------------------------

    /// Allocates a fresh virtual qubit id without emitting any instructions.
    pub fn new_qubit_id(&mut self) -> Result<u64> {
        self.qubit_alloc.allocate()
    }

    /// `QALLOC <id>; INIT <id>`, and marks `id` active.
    pub fn add_new_qubit_commands(&mut self, id: u64) -> Result<()> {
        self.emit(Opcode::QAlloc, vec![Operand::Immediate(id as i64)]);
        self.emit(Opcode::Init, vec![Operand::Immediate(id as i64)]);
        self.active_qubits.insert(id);
        Ok(())
    }

    /// `INIT <id>`, resetting the qubit to \|0> without reallocating it.
    pub fn add_init_qubit_commands(&mut self, id: u64) -> Result<()> {
        self.emit(Opcode::Init, vec![Operand::Immediate(id as i64)]);
        Ok(())
    }

    /// Marks `id` active without emitting any instructions, for qubits
    /// synthesized outside [`Self::add_new_qubit_commands`] (e.g. the
    /// type-K EPR path, where the virtual id already exists by the time a
    /// `Qubit` handle is built for it).
    pub fn register_active_qubit(&mut self, id: u64) {
        self.active_qubits.insert(id);
    }

    /// `QFREE <id>`, and marks `id` inactive.
    pub fn add_qfree_commands(&mut self, id: u64) -> Result<()> {
        self.emit(Opcode::QFree, vec![Operand::Immediate(id as i64)]);
        self.active_qubits.remove(&id);
        Ok(())
    }

    // ---- gates -------------------------------------------------------------

    /// Emits the `SET` binding `target`'s register (if not already indirect)
    /// followed by a single-qubit gate instruction.
    pub fn add_single_qubit_commands(&mut self, opcode: Opcode, target: GateTarget) -> Result<()> {
        let reg = self.gate_register(target)?;
        self.emit(opcode, vec![Operand::Register(reg)]);
        Ok(())
    }

    /// Same, for a two-qubit gate: control and target are each loaded into
    /// their own register independently.
    pub fn add_two_qubit_commands(&mut self, opcode: Opcode, control: GateTarget, target: GateTarget) -> Result<()> {
        let control_reg = self.gate_register(control)?;
        let target_reg = self.gate_register(target)?;
        self.emit(opcode, vec![Operand::Register(control_reg), Operand::Register(target_reg)]);
        Ok(())
    }

    /// A parameterized rotation of angle `n * pi / 2^d`. If `angle` is given,
    /// `n`/`d` are derived from it via a dyadic (Solovay-Kitaev-style) binary
    /// fraction search instead of being taken literally.
    pub fn add_single_qubit_rotation_commands(
        &mut self,
        opcode: Opcode,
        target: GateTarget,
        n: i64,
        d: u8,
        angle: Option<f64>,
    ) -> Result<()> {
        let (n, d) = match angle {
            Some(angle) => angle_to_fraction(angle),
            None => (n, d),
        };
        let reg = self.gate_register(target)?;
        self.emit(opcode, vec![Operand::Register(reg), Operand::Immediate(n), Operand::Immediate(i64::from(d))]);
        Ok(())
    }

    /// `MEAS <id> -> R_out`, then (in this order) `QFREE` unless `inplace`,
    /// then `STORE` into the future's backing cell if it is array-backed.
    /// Register-backed futures are written directly by `MEAS`, so no `STORE`
    /// is ever emitted for them.
    pub fn add_measure_commands(
        &mut self,
        target: GateTarget,
        future_register: Register,
        future_array: Option<(ArrayHandle, IndexOperand)>,
        inplace: bool,
    ) -> Result<()> {
        let q_reg = self.gate_register(target)?;
        self.emit(Opcode::Meas, vec![Operand::Register(q_reg), Operand::Register(future_register)]);

        if !inplace {
            if let GateTarget::Immediate(vid) = target {
                self.emit(Opcode::QFree, vec![Operand::Immediate(vid as i64)]);
                self.active_qubits.remove(&vid);
            }
        }

        if let Some((array, index)) = future_array {
            self.emit_store(future_register, array, index)?;
        }

        Ok(())
    }

    // ---- registers, arrays, memory -----------------------------------------

    pub fn allocate_register(&mut self, role: Role) -> Result<Register> {
        self.reg_alloc.allocate(role)
    }

    /// Declares a fresh classical array of `length` cells.
    pub fn new_array(&mut self, length: u32) -> Result<Array> {
        let handle = self.array_alloc.allocate(length)?;
        self.arrays.push(handle);
        self.emit(Opcode::Array, vec![Operand::Array(handle)]);
        Ok(Array::new(handle))
    }

    pub fn emit_set(&mut self, reg: Register, value: i64) {
        self.emit(Opcode::Set, vec![Operand::Register(reg), Operand::Immediate(value)]);
    }

    pub fn emit_add(&mut self, dest: Register, src: Register, delta: i64) {
        self.emit(Opcode::Add, vec![Operand::Register(dest), Operand::Register(src), Operand::Immediate(delta)]);
    }

    pub fn emit_store(&mut self, value: Register, array: ArrayHandle, index: IndexOperand) -> Result<()> {
        self.emit(
            Opcode::Store,
            vec![Operand::Register(value), Operand::ArrayEntry(array, Box::new(index.into()))],
        );
        Ok(())
    }

    pub fn emit_load(&mut self, array: ArrayHandle, index: IndexOperand) -> Result<Register> {
        let reg = self.reg_alloc.allocate(Role::R)?;
        self.emit(
            Opcode::Load,
            vec![Operand::Register(reg), Operand::ArrayEntry(array, Box::new(index.into()))],
        );
        Ok(reg)
    }

    pub fn emit_label(&mut self, label: Label) {
        self.emit_label_item(label);
    }

    pub fn emit_jmp(&mut self, label: Label) {
        self.emit(Opcode::Jmp, vec![Operand::Label(label)]);
    }

    /// Declares `reg` as a value the downstream runtime must hand back to the
    /// application after the subroutine completes. The corresponding
    /// `RET_REG` instruction is emitted once, at subroutine finalisation (see
    /// [`Self::pop_pending_subroutine`]), after every instruction the
    /// application itself emits.
    pub fn declare_return_register(&mut self, reg: Register) {
        self.return_registers.push(reg);
    }

    /// Same as [`Self::declare_return_register`], for whole arrays.
    pub fn declare_return_array(&mut self, array: ArrayHandle) {
        self.return_arrays.push(array);
    }

    // ---- control flow -------------------------------------------------------

    /// `conn.if_eq(a, b, body)` on two plain operands (immediate or
    /// register), with no `Future` involved. The `Future`-typed comparisons
    /// in [`crate::future`] are the special case where one operand is first
    /// loaded from an array cell; this is the shared lowering both go through.
    pub fn if_eq(&mut self, a: Operand, b: Operand, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        self.if_compare(CompareKind::Eq, a, b, body)
    }

    pub fn if_ne(&mut self, a: Operand, b: Operand, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        self.if_compare(CompareKind::Ne, a, b, body)
    }

    pub fn if_ez(&mut self, a: Operand, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        self.if_compare(CompareKind::Ez, a, Operand::Immediate(0), body)
    }

    pub fn if_nz(&mut self, a: Operand, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        self.if_compare(CompareKind::Nz, a, Operand::Immediate(0), body)
    }

    /// Runs `body` guarded by an inverse-branch comparison: the exit label is
    /// jumped to (skipping `body`) exactly when the comparison is false.
    pub fn if_compare(
        &mut self,
        kind: CompareKind,
        a: Operand,
        b: Operand,
        body: impl FnOnce(&mut Builder) -> Result<()>,
    ) -> Result<()> {
        let exit_label = self.label_alloc.allocate(LabelKind::IfExit)?;
        let operands = if kind.is_binary() {
            vec![a, b, Operand::Label(exit_label.clone())]
        } else {
            vec![a, Operand::Label(exit_label.clone())]
        };
        self.emit(kind.inverse_opcode(), operands);

        self.scopes.push(ScopeKind::If, exit_label.clone());
        body(self)?;
        self.scopes.pop(ScopeKind::If)?;

        self.emit_label_item(exit_label);
        Ok(())
    }

    /// A counted loop: `count` iterations over a fresh `C`-role counter
    /// register, starting at zero. `body` receives the counter register, so it
    /// can index array cells that vary per iteration.
    pub fn loop_scope(&mut self, count: i64, body: impl FnOnce(&mut Builder, Register) -> Result<()>) -> Result<()> {
        let counter = self.reg_alloc.allocate(Role::C)?;
        self.loop_scope_with_register(counter, count, body)
    }

    /// Same as [`Self::loop_scope`], but over a caller-supplied register
    /// (e.g. a specific pinned index) instead of a freshly allocated one.
    pub fn loop_scope_with_register(
        &mut self,
        counter: Register,
        count: i64,
        body: impl FnOnce(&mut Builder, Register) -> Result<()>,
    ) -> Result<()> {
        self.emit_set(counter, 0);

        let start_label = self.label_alloc.allocate(LabelKind::LoopStart)?;
        let exit_label = self.label_alloc.allocate(LabelKind::LoopExit)?;

        self.emit_label_item(start_label.clone());
        self.emit(
            Opcode::Beq,
            vec![Operand::Register(counter), Operand::Immediate(count), Operand::Label(exit_label.clone())],
        );

        self.scopes.push(ScopeKind::Loop, exit_label.clone());
        body(self, counter)?;
        self.scopes.pop(ScopeKind::Loop)?;

        self.emit_add(counter, counter, 1);
        self.emit_jmp(start_label);
        self.emit_label_item(exit_label);
        Ok(())
    }

    /// Retries `body` up to `max_tries` times; `body` should call
    /// [`Self::try_succeed`] once it has achieved what it was retrying for, to
    /// jump straight to the scope's exit label instead of looping again.
    pub fn try_until_success(&mut self, max_tries: i64, body: impl FnOnce(&mut Builder) -> Result<()>) -> Result<()> {
        let counter = self.reg_alloc.allocate(Role::C)?;
        self.emit_set(counter, 0);

        let start_label = self.label_alloc.allocate(LabelKind::TryStart)?;
        let exit_label = self.label_alloc.allocate(LabelKind::TryExit)?;

        self.emit_label_item(start_label.clone());
        self.emit(
            Opcode::Beq,
            vec![Operand::Register(counter), Operand::Immediate(max_tries), Operand::Label(exit_label.clone())],
        );

        self.scopes.push(ScopeKind::Try, exit_label.clone());
        body(self)?;
        self.scopes.pop(ScopeKind::Try)?;

        self.emit_add(counter, counter, 1);
        self.emit_jmp(start_label);
        self.emit_label_item(exit_label);
        Ok(())
    }

    /// Jumps to the exit label of the innermost open `try` scope, to be
    /// called from within a `try_until_success` body on success.
    pub fn try_succeed(&mut self) -> Result<()> {
        let exit_label = self.scopes.innermost_exit_label(ScopeKind::Try)?;
        self.emit_jmp(exit_label);
        Ok(())
    }

    // ---- subroutine boundary -------------------------------------------------

    /// Takes the pending command stream and resets the builder's per-subroutine
    /// state (allocators, command stream, declared arrays/returns, scope
    /// stack) so a new subroutine can be built. The active-qubit set persists
    /// across subroutine boundaries: qubits remain allocated in the node
    /// between subroutine calls on the same connection.
    ///
    /// # Errors
    /// Returns [`Error::ScopeMisuse`] if a control-flow scope was left open.
    pub fn pop_pending_subroutine(&mut self) -> Result<PreSubroutine> {
        if !self.scopes.is_empty() {
            return Err(Error::ScopeMisuse {
                expected: "<subroutine boundary>",
                found: "open control-flow scope",
            });
        }
        for &array in &self.return_arrays {
            self.emit(Opcode::RetArr, vec![Operand::Array(array)]);
        }
        for &reg in &self.return_registers {
            self.emit(Opcode::RetReg, vec![Operand::Register(reg)]);
        }

        debug!("popping pending subroutine with {} commands", self.commands.len());

        let sub = PreSubroutine {
            commands: std::mem::take(&mut self.commands),
            arrays: std::mem::take(&mut self.arrays),
            return_registers: std::mem::take(&mut self.return_registers),
            return_arrays: std::mem::take(&mut self.return_arrays),
        };

        self.reg_alloc = RegisterAllocator::new();
        self.array_alloc = ArrayAllocator::new();
        self.label_alloc = LabelAllocator::new();

        Ok(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subroutine::Pattern;

    #[test]
    fn new_qubit_then_gate_emits_alloc_init_set_gate() {
        let mut b = Builder::new();
        let id = b.new_qubit_id().unwrap();
        b.add_new_qubit_commands(id).unwrap();
        b.add_single_qubit_commands(Opcode::H, id.into()).unwrap();
        let sub = b.pop_pending_subroutine().unwrap();
        assert!(sub
            .match_pattern(&[
                Pattern::Op(Opcode::QAlloc),
                Pattern::Op(Opcode::Init),
                Pattern::Op(Opcode::Set),
                Pattern::Op(Opcode::H),
            ])
            .unwrap());
    }

    #[test]
    fn measure_orders_meas_qfree_store() {
        let mut b = Builder::new();
        let id = b.new_qubit_id().unwrap();
        b.add_new_qubit_commands(id).unwrap();
        let array = b.new_array(1).unwrap();
        let out_reg = b.allocate_register(Role::R).unwrap();
        b.add_measure_commands(id.into(), out_reg, Some((array.handle(), IndexOperand::Immediate(0))), false)
            .unwrap();
        let sub = b.pop_pending_subroutine().unwrap();
        assert!(sub
            .match_pattern(&[Pattern::Op(Opcode::Meas), Pattern::Op(Opcode::QFree), Pattern::Op(Opcode::Store)])
            .unwrap());
    }

    #[test]
    fn if_scope_emits_inverse_branch_and_exit_label() {
        let mut b = Builder::new();
        let reg = b.allocate_register(Role::R).unwrap();
        b.if_compare(CompareKind::Ne, Operand::Register(reg), Operand::Immediate(0), |_| Ok(()))
            .unwrap();
        let sub = b.pop_pending_subroutine().unwrap();
        assert!(sub
            .match_pattern(&[Pattern::Op(Opcode::Beq), Pattern::BranchLabel])
            .unwrap());
    }

    #[test]
    fn loop_scope_emits_start_compare_body_increment_jump_exit() {
        let mut b = Builder::new();
        b.loop_scope(3, |b, _counter| {
            let id = b.new_qubit_id()?;
            b.add_new_qubit_commands(id)
        })
        .unwrap();
        let sub = b.pop_pending_subroutine().unwrap();
        assert!(sub
            .match_pattern(&[
                Pattern::BranchLabel,
                Pattern::Op(Opcode::Beq),
                Pattern::AnyZeroOrMore,
                Pattern::Op(Opcode::Add),
                Pattern::Op(Opcode::Jmp),
                Pattern::BranchLabel,
            ])
            .unwrap());
    }

    #[test]
    fn if_eq_on_plain_operands_needs_no_future() {
        let mut b = Builder::new();
        b.if_eq(Operand::Immediate(42), Operand::Immediate(42), |b| {
            let id = b.new_qubit_id()?;
            b.add_new_qubit_commands(id)
        })
        .unwrap();
        let sub = b.pop_pending_subroutine().unwrap();
        assert!(sub.match_pattern(&[Pattern::Op(Opcode::Bne), Pattern::BranchLabel]).unwrap());
    }

    #[test]
    fn mismatched_scope_close_is_rejected() {
        let mut b = Builder::new();
        // Manually push an if-scope and fail to close it before popping the subroutine.
        b.scopes.push(ScopeKind::If, Label("IF_EXIT0".into()));
        assert!(matches!(b.pop_pending_subroutine(), Err(Error::ScopeMisuse { .. })));
    }

    #[test]
    fn active_qubits_persist_across_subroutine_boundary() {
        let mut b = Builder::new();
        let id = b.new_qubit_id().unwrap();
        b.add_new_qubit_commands(id).unwrap();
        b.pop_pending_subroutine().unwrap();
        assert!(b.is_qubit_active(id));
    }
}
