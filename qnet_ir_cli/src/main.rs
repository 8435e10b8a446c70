// Copyright (c) netqasm-rs contributors.
// Licensed under the MIT License.

//! A small demo harness for the builder: runs one of a handful of canned
//! programs against a [`DebugConnection`] and prints the resulting
//! pre-subroutine.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::info;
use qnet_ir::{DebugConnection, EPRSocket, EprType, Qubit};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Program {
    /// Allocate a couple of qubits and apply a handful of gates.
    Simple,
    /// Create an EPR pair with a peer node, rotate and measure it.
    Epr,
    /// Measure a qubit and branch on the outcome.
    Branch,
    /// Apply a gate inside a counted loop.
    Loop,
    /// Nest an if inside a loop inside an if, to exercise scope nesting.
    Nested,
}

#[derive(Debug, Parser)]
#[command(version, about = "Build and print a pre-subroutine from a canned demo program")]
struct Cli {
    /// Program to build.
    #[arg(long, value_enum, default_value_t = Program::Simple)]
    program: Program,

    /// Log verbosity passed through to `env_logger`.
    #[arg(long, default_value = "warn")]
    log_level: log::LevelFilter,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new().filter_level(cli.log_level).init();

    match run(cli.program) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(program: Program) -> qnet_ir::Result<()> {
    info!("building demo program {program:?}");
    let mut conn = DebugConnection::with_nodes("alice", [(0, "alice".to_owned()), (1, "bob".to_owned())]);

    match program {
        Program::Simple => build_simple(&mut conn)?,
        Program::Epr => build_epr(&mut conn)?,
        Program::Branch => build_branch(&mut conn)?,
        Program::Loop => build_loop(&mut conn)?,
        Program::Nested => build_nested(&mut conn)?,
    }

    let sub = conn.close()?;
    println!("{sub}");
    Ok(())
}

fn build_simple(conn: &mut DebugConnection) -> qnet_ir::Result<()> {
    let q1 = Qubit::new(conn.builder())?;
    let q2 = Qubit::new(conn.builder())?;
    q1.h(conn.builder())?;
    q2.x(conn.builder())?;
    q1.x(conn.builder())?;
    q2.h(conn.builder())?;
    Ok(())
}

fn build_epr(conn: &mut DebugConnection) -> qnet_ir::Result<()> {
    let socket = EPRSocket::new(1);
    let pairs = socket.create(conn.builder(), 1, EprType::K)?;
    let qnet_ir::EprResult::Qubits(qubits) = pairs else {
        unreachable!("type K create always returns qubits")
    };
    let epr = &qubits[0];
    epr.rot_z_angle(conn.builder(), std::f64::consts::PI)?;
    epr.h(conn.builder())?;
    Ok(())
}

fn build_branch(conn: &mut DebugConnection) -> qnet_ir::Result<()> {
    let mut q = Qubit::new(conn.builder())?;
    let m = q.measure(conn.builder(), None, false, true)?;
    m.if_ne(conn.builder(), 0, |builder| {
        let inner = Qubit::new(builder)?;
        inner.x(builder)
    })?;
    m.if_ez(conn.builder(), |builder| {
        let inner = Qubit::new(builder)?;
        inner.z(builder)
    })?;
    Ok(())
}

fn build_loop(conn: &mut DebugConnection) -> qnet_ir::Result<()> {
    let q = Qubit::new(conn.builder())?;
    conn.builder().loop_scope(2, |builder, _counter| q.h(builder))?;
    Ok(())
}

fn build_nested(conn: &mut DebugConnection) -> qnet_ir::Result<()> {
    let q = Qubit::new(conn.builder())?;
    conn.builder().loop_scope(2, |builder, _outer_counter| {
        builder.loop_scope(2, |builder, _inner_counter| q.h(builder))
    })?;
    Ok(())
}
