// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! End-to-end scenarios exercising the builder the way application code
//! actually calls it: one [`DebugConnection`], a handful of qubits/futures/
//! EPR sockets, then a pattern match against the closed subroutine.

use qnet_ir::{
    DebugConnection, EPRSocket, EprResult, EprType, Error, Opcode, Operand, Pattern, Qubit, Register, Role,
};

fn conn() -> DebugConnection {
    DebugConnection::with_nodes("alice", [(0, "alice".to_owned()), (1, "bob".to_owned())])
}

/// A couple of qubits and a run of single-qubit gates lower to
/// `QALLOC`/`INIT` per qubit followed by `SET`+gate pairs, in call order.
#[test]
fn simple_gate_sequence() {
    let mut conn = conn();
    let q1 = Qubit::new(conn.builder()).unwrap();
    let q2 = Qubit::new(conn.builder()).unwrap();
    q1.h(conn.builder()).unwrap();
    q2.x(conn.builder()).unwrap();
    q1.cnot(conn.builder(), &q2).unwrap();

    let sub = conn.close().unwrap();
    assert!(sub
        .match_pattern(&[
            Pattern::Op(Opcode::QAlloc),
            Pattern::Op(Opcode::Init),
            Pattern::Op(Opcode::QAlloc),
            Pattern::Op(Opcode::Init),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::H),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::X),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::CNot),
        ])
        .unwrap());
}

/// `CREATE_EPR` followed by user-code gates on the resulting qubit must
/// still have `RET_ARR` then `RET_REG` trail at the very end of the
/// subroutine, after everything the application itself emitted.
#[test]
fn epr_create_then_measure_defers_returns_to_the_end() {
    let mut conn = conn();
    let socket = EPRSocket::new(1);
    let EprResult::Qubits(qubits) = socket.create(conn.builder(), 1, EprType::K).unwrap() else {
        unreachable!("type K always returns qubits")
    };
    let mut epr = qubits[0];
    epr.rot_z(conn.builder(), 1, 1).unwrap();
    epr.h(conn.builder()).unwrap();
    epr.measure(conn.builder(), None, false, false).unwrap();

    let sub = conn.close().unwrap();
    assert!(sub
        .match_pattern(&[
            Pattern::Op(Opcode::Array),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::CreateEpr),
            Pattern::Op(Opcode::WaitAll),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::RotZ),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::H),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::RetArr),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::RetReg),
        ])
        .unwrap());
}

/// Measuring into a register future, then branching on `!= 0`, lowers to
/// `MEAS, QFREE, STORE, LOAD, BEQ` (the inverse branch for `if_ne`), a label.
#[test]
fn measure_then_branch_on_future_uses_inverse_branch() {
    let mut conn = conn();
    let mut q = Qubit::new(conn.builder()).unwrap();
    let m = q.measure(conn.builder(), None, false, true).unwrap();
    m.if_ne(conn.builder(), 0, |builder| {
        let inner = Qubit::new(builder)?;
        inner.x(builder)
    })
    .unwrap();

    let sub = conn.close().unwrap();
    assert!(sub
        .match_pattern(&[
            Pattern::Op(Opcode::Meas),
            Pattern::Op(Opcode::QFree),
            Pattern::Op(Opcode::Store),
            Pattern::Op(Opcode::Load),
            Pattern::Op(Opcode::Beq),
            Pattern::AnyZeroOrMore,
            Pattern::BranchLabel,
        ])
        .unwrap());
}

/// A counted loop lowers to a start label, a bound-check branch, the
/// body, an increment, a jump back, and an exit label.
#[test]
fn loop_context_closes_scope_and_jumps_back() {
    let mut conn = conn();
    let q = Qubit::new(conn.builder()).unwrap();
    conn.builder().loop_scope(3, |builder, _counter| q.h(builder)).unwrap();

    let sub = conn.close().unwrap();
    assert!(sub
        .match_pattern(&[
            Pattern::BranchLabel,
            Pattern::Op(Opcode::Beq),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::H),
            Pattern::AnyZeroOrMore,
            Pattern::Op(Opcode::Add),
            Pattern::Op(Opcode::Jmp),
            Pattern::BranchLabel,
        ])
        .unwrap());
}

/// A loop pinned to a caller-supplied register (rather than a freshly
/// allocated counter) still closes correctly and uses that exact register in
/// the bound check.
#[test]
fn loop_over_explicit_pinned_register() {
    let mut conn = conn();
    let pinned = Register { role: Role::C, index: 9 };
    conn.builder()
        .loop_scope_with_register(pinned, 4, |builder, counter| {
            assert_eq!(counter, pinned);
            let id = builder.new_qubit_id()?;
            builder.add_new_qubit_commands(id)
        })
        .unwrap();

    let sub = conn.close().unwrap();
    assert!(sub
        .commands
        .iter()
        .any(|item| matches!(item, qnet_ir::Item::Cmd(cmd) if cmd.opcode == Opcode::Beq
            && matches!(&cmd.operands[0], Operand::Register(r) if *r == pinned))));
}

/// Nested control-flow contexts close in strict LIFO order regardless of
/// which construct is outer and which is inner.
#[test]
fn nested_scopes_close_lifo_in_every_combination() {
    for combo in ["if_if", "loop_loop", "loop_if", "if_loop"] {
        let mut conn = conn();
        let q = Qubit::new(conn.builder()).unwrap();
        match combo {
            "if_if" => {
                conn.builder()
                    .if_eq(Operand::Immediate(1), Operand::Immediate(1), |builder| {
                        builder.if_eq(Operand::Immediate(2), Operand::Immediate(2), |builder| q.h(builder))
                    })
                    .unwrap();
            }
            "loop_loop" => {
                conn.builder()
                    .loop_scope(2, |builder, _o| builder.loop_scope(2, |builder, _i| q.h(builder)))
                    .unwrap();
            }
            "loop_if" => {
                conn.builder()
                    .loop_scope(2, |builder, _counter| {
                        builder.if_eq(Operand::Immediate(1), Operand::Immediate(1), |builder| q.h(builder))
                    })
                    .unwrap();
            }
            "if_loop" => {
                conn.builder()
                    .if_eq(Operand::Immediate(1), Operand::Immediate(1), |builder| {
                        builder.loop_scope(2, |builder, _counter| q.h(builder))
                    })
                    .unwrap();
            }
            _ => unreachable!(),
        }

        let sub = conn.close().unwrap();
        assert!(sub.contains(Opcode::H), "combo {combo} should still emit the nested gate");
    }
}

/// A scope left open (here, because the body returned an error before
/// closing it) is rejected at the next subroutine boundary rather than
/// silently dropped.
#[test]
fn scope_left_open_by_an_erroring_body_is_rejected_at_close() {
    let mut conn = conn();
    let open_err = conn
        .builder()
        .if_eq(Operand::Immediate(0), Operand::Immediate(0), |_builder| {
            Err(Error::IrInconsistency {
                reason: "body aborted".into(),
            })
        })
        .unwrap_err();
    assert!(matches!(open_err, Error::IrInconsistency { .. }));

    let close_err = conn.pop_pending_subroutine().unwrap_err();
    assert!(matches!(close_err, Error::ScopeMisuse { .. }));
}
