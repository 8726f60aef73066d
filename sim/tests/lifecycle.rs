// Loading, termination and reset behaviour of the pipeline simulator

mod common;

use common::{load, run_pipe, Program, LIMIT};
use y86_psim::{
    framework::CpuSim,
    isa::{Addr, ConditionCode, Inst, OpFn, Reg, Stat},
    Memory, ObjectImage, PipeSim, DEFAULT_MEM_SIZE,
};

#[test]
fn test_empty_image_fails_before_any_cycle() -> anyhow::Result<()> {
    let text = "  | # nothing but comments\n0x000:  | .pos 0\n";
    let image = ObjectImage::parse(text)?;
    let mut pipe = PipeSim::new(Memory::new(DEFAULT_MEM_SIZE));
    let err = pipe.load(&image).unwrap_err();
    anyhow::ensure!(err.to_string().contains("no lines of code found"));
    anyhow::ensure!(pipe.counters().cycles == 0);
    Ok(())
}

#[test]
fn test_fault_freezes_architectural_state() -> anyhow::Result<()> {
    let text = Program::new()
        .insts(&[
            Inst::IRMOVQ(Reg::RAX, 5),
            Inst::RMMOVQ(Reg::RAX, Addr(0x100, Reg::RNONE)),
            Inst::RMMOVQ(Reg::RAX, Addr(DEFAULT_MEM_SIZE as u64 - 4, Reg::RNONE)),
            Inst::OPQ(OpFn::SUB, Reg::RAX, Reg::RAX),
            Inst::RMMOVQ(Reg::RAX, Addr(0x108, Reg::RNONE)),
            Inst::IRMOVQ(Reg::RBX, 1),
            Inst::HALT,
        ])
        .build();
    let initial = load(&text)?;
    let mut pipe = run_pipe(&text)?;

    anyhow::ensure!(pipe.status() == Stat::Adr);
    anyhow::ensure!(pipe.is_terminate());
    anyhow::ensure!(pipe.registers().get(Reg::RAX) == 5);
    anyhow::ensure!(pipe.registers().get(Reg::RBX) == 0);
    // the subq right behind the faulting store must not touch the flags
    anyhow::ensure!(pipe.cc() == ConditionCode::default());

    let changed = y86_psim::mem_diff(&initial, pipe.mem());
    anyhow::ensure!(changed == vec![(0x100, 0, 5)], "{changed:x?}");

    let cycles = pipe.counters().cycles;
    anyhow::ensure!(pipe.step() == Stat::Adr);
    anyhow::ensure!(pipe.counters().cycles == cycles);
    Ok(())
}

#[test]
fn test_halt_stops_younger_stores() -> anyhow::Result<()> {
    let text = Program::new()
        .insts(&[
            Inst::IRMOVQ(Reg::RAX, 5),
            Inst::HALT,
            Inst::RMMOVQ(Reg::RAX, Addr(0x100, Reg::RNONE)),
            Inst::PUSHQ(Reg::RAX),
        ])
        .build();
    let pipe = run_pipe(&text)?;
    anyhow::ensure!(pipe.status() == Stat::Hlt);
    anyhow::ensure!(pipe.mem().read_u64(0x100)? == 0);
    anyhow::ensure!(pipe.registers().get(Reg::RSP) == 0);
    Ok(())
}

#[test]
fn test_reset_is_idempotent() -> anyhow::Result<()> {
    let text = Program::new()
        .insts(&[
            Inst::IRMOVQ(Reg::RSP, 0x200),
            Inst::IRMOVQ(Reg::RCX, 3),
            Inst::PUSHQ(Reg::RCX),
            Inst::POPQ(Reg::RDX),
            Inst::OPQ(OpFn::ADD, Reg::RDX, Reg::RCX),
            Inst::HALT,
        ])
        .build();
    let image = ObjectImage::parse(&text)?;
    let mut pipe = PipeSim::new(Memory::new(DEFAULT_MEM_SIZE)).with_trace(true);

    pipe.load(&image)?;
    let first = pipe.run(LIMIT, 5 * LIMIT);
    let first_trace = pipe.trace().to_vec();
    let first_regs = *pipe.registers();

    pipe.reset();
    anyhow::ensure!(pipe.trace().is_empty());
    anyhow::ensure!(pipe.cc() == ConditionCode::default());

    pipe.load(&image)?;
    let second = pipe.run(LIMIT, 5 * LIMIT);

    anyhow::ensure!(first == second);
    anyhow::ensure!(first_trace == pipe.trace());
    anyhow::ensure!(first_regs == *pipe.registers());
    anyhow::ensure!(pipe.registers().get(Reg::RCX) == 6);
    Ok(())
}

#[test]
fn test_cycle_budget() -> anyhow::Result<()> {
    // jmp to itself
    let text = Program::new()
        .inst(Inst::JX(y86_psim::isa::CondFn::YES, 0))
        .build();
    let mut pipe = PipeSim::new(load(&text)?);
    let out = pipe.run(LIMIT, 5 * LIMIT);
    anyhow::ensure!(out.status == Stat::Aok);
    anyhow::ensure!(out.counters.instructions == LIMIT);
    anyhow::ensure!(!pipe.is_terminate());
    Ok(())
}
