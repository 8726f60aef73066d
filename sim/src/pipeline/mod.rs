//! The five-stage Y86-64 pipeline.
//!
//! A clock cycle is simulated in this order:
//!
//! 1. every pipeline register applies the control tag computed last cycle;
//! 2. the stages run downstream to upstream: write back, memory, execute,
//!    decode, fetch;
//! 3. the control logic computes the tags for the next clock edge;
//! 4. counters are updated and termination is checked.
//!
//! The order in step 2 is what makes forwarding work. Execute and memory
//! place their results in `M.next`/`W.next` before decode reads them, and a
//! `ret` or mispredicted jump has already settled in the committed
//! registers before fetch selects its address. Write back updates the
//! register file before decode reads it.

mod decode;
mod execute;
mod fetch;
mod forward;
mod hazard;
mod memory;
mod stages;
mod trace;
mod writeback;

pub use decode::{operands, Operands};
pub use fetch::PcSource;
pub use forward::{ForwardSource, Forwarding};
pub use hazard::Hazards;
pub use stages::{Dstage, Estage, Fstage, Mstage, PipeRegs, Wstage};
pub use trace::{CycleRecord, StageView};

use crate::{
    framework::{Control, CpuSim},
    hardware::{Memory, RegFile},
    isa::{ConditionCode, Stat},
    object::ObjectImage,
};

/// Performance counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PerfCounters {
    /// Every simulated cycle, pipeline fill included.
    pub cycles: u64,
    /// Cycles from the first committed instruction on.
    pub busy_cycles: u64,
    /// Instructions committed by write back, `halt` included.
    pub instructions: u64,
    /// Cycles in which a load-use hazard held decode.
    pub load_use_stalls: u64,
    /// Cycles in which a `ret` in flight held fetch.
    pub ret_stalls: u64,
    pub mispredicts: u64,
    /// Operands that decode took from an in-flight instruction.
    pub forwards: u64,
}

impl PerfCounters {
    /// Cycles per instruction over the busy cycles.
    pub fn cpi(&self) -> Option<f64> {
        (self.instructions > 0).then(|| self.busy_cycles as f64 / self.instructions as f64)
    }
}

/// Result of [`PipeSim::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: Stat,
    pub counters: PerfCounters,
}

/// Pipeline simulator. Owns the pipeline registers and the architectural
/// state they operate on.
#[derive(Debug, Clone)]
pub struct PipeSim {
    regs: PipeRegs,
    mem: Memory,
    reg_file: RegFile,
    cc: ConditionCode,
    status: Stat,
    counters: PerfCounters,
    /// No instruction has reached write back yet.
    starting_up: bool,
    /// See [`PipeSim::is_terminate`].
    terminate: bool,
    fetch_pc: u64,
    record_trace: bool,
    trace: Vec<CycleRecord>,
}

impl PipeSim {
    /// Initialize the simulator with given memory. Every pipeline register
    /// starts as a bubble and fetch starts at address 0.
    pub fn new(memory: Memory) -> Self {
        Self {
            regs: PipeRegs::default(),
            mem: memory,
            reg_file: RegFile::default(),
            cc: ConditionCode::default(),
            status: Stat::Aok,
            counters: PerfCounters::default(),
            starting_up: true,
            terminate: false,
            fetch_pc: 0,
            record_trace: false,
            trace: Vec::new(),
        }
    }

    /// Keep a [`CycleRecord`] of every cycle, see [`PipeSim::trace`].
    pub fn with_trace(mut self, record: bool) -> Self {
        self.record_trace = record;
        self
    }

    /// Copy an object image into memory. Returns the number of bytes loaded.
    pub fn load(&mut self, image: &ObjectImage) -> anyhow::Result<usize> {
        image.load_into(&mut self.mem)
    }

    /// Simulate one clock cycle and return the program status.
    pub fn step(&mut self) -> Stat {
        if self.terminate {
            return self.status;
        }
        self.counters.cycles += 1;

        if self.regs.commit() {
            tracing::warn!(
                "cycle {}: pipeline register committed a stall/bubble conflict",
                self.counters.cycles
            );
            self.status = Stat::Pip;
            self.terminate = true;
            return self.status;
        }

        let prog_stat = writeback::update(&self.regs.w.current, &mut self.reg_file);
        self.regs.w.next = memory::update(&self.regs.m.current, &mut self.mem);
        self.regs.m.next = execute::update(
            &self.regs.e.current,
            &mut self.cc,
            self.regs.w.next.stat,
            self.regs.w.current.stat,
        );

        let fwd = Forwarding::new(
            &self.regs.m.next,
            &self.regs.w.next,
            &self.regs.m.current,
            &self.regs.w.current,
        );
        let decoded = decode::update(&self.regs.d.current, &fwd, &self.reg_file);
        self.regs.e.next = decoded.e_next;

        let (f_next, d_next) = fetch::update(
            &self.regs.f.current,
            &self.regs.m.current,
            &self.regs.w.current,
            &self.mem,
        );
        self.fetch_pc = d_next.pc;
        self.regs.f.next = f_next;
        self.regs.d.next = d_next;

        let hazards = hazard::control(&mut self.regs);
        self.count(&hazards, &decoded);

        self.status = prog_stat;
        if prog_stat != Stat::Aok {
            tracing::info!(
                "cycle {}: program status {} at pc {:#x}",
                self.counters.cycles,
                prog_stat,
                self.regs.w.current.pc
            );
            self.terminate = true;
        }

        if self.record_trace || tracing::enabled!(tracing::Level::DEBUG) {
            let record = CycleRecord::capture(
                self.counters.cycles,
                self.fetch_pc,
                &self.regs,
                self.cc,
                prog_stat,
            );
            tracing::debug!("\n{}", record);
            if self.record_trace {
                self.trace.push(record);
            }
        }
        self.status
    }

    fn count(&mut self, hazards: &Hazards, decoded: &decode::Decoded) {
        let c = &mut self.counters;
        if hazards.load_use {
            c.load_use_stalls += 1;
        }
        if hazards.ret_in_flight && !hazards.load_use {
            c.ret_stalls += 1;
        }
        if hazards.mispredict {
            c.mispredicts += 1;
        }
        // only count operands of an instruction that actually moves on to E
        if self.regs.e.control == Control::Load && decoded.e_next.stat != Stat::Bub {
            c.forwards += decoded.fwd_a.is_forwarded() as u64;
            c.forwards += decoded.fwd_b.is_forwarded() as u64;
        }

        if self.regs.w.current.stat != Stat::Bub {
            self.starting_up = false;
            c.instructions += 1;
            c.busy_cycles += 1;
        } else if !self.starting_up {
            c.busy_cycles += 1;
        }
    }

    /// Step until the program stops or either budget is used up. Running out
    /// of budget is not an error; the status is whatever the last cycle
    /// reported.
    pub fn run(&mut self, max_instr: u64, max_cycle: u64) -> RunOutcome {
        while !self.terminate
            && self.counters.instructions < max_instr
            && self.counters.cycles < max_cycle
        {
            self.step();
        }
        if !self.terminate {
            tracing::info!(
                "budget exhausted after {} instructions, {} cycles",
                self.counters.instructions,
                self.counters.cycles
            );
        }
        RunOutcome {
            status: self.status,
            counters: self.counters,
        }
    }

    /// Return to the power-on state: bubbles in every pipeline register,
    /// zeroed memory and registers, default condition codes, cleared counters
    /// and trace.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.reg_file.clear();
        self.cc = ConditionCode::default();
        self.status = Stat::Aok;
        self.counters = PerfCounters::default();
        self.starting_up = true;
        self.terminate = false;
        self.fetch_pc = 0;
        self.trace.clear();
    }

    /// Whether the simulation is terminated
    pub fn is_terminate(&self) -> bool {
        self.terminate
    }

    pub fn counters(&self) -> &PerfCounters {
        &self.counters
    }

    pub fn pipe_regs(&self) -> &PipeRegs {
        &self.regs
    }

    pub fn trace(&self) -> &[CycleRecord] {
        &self.trace
    }
}

impl CpuSim for PipeSim {
    fn step(&mut self) {
        PipeSim::step(self);
    }

    fn is_terminate(&self) -> bool {
        self.terminate
    }

    fn program_counter(&self) -> u64 {
        self.fetch_pc
    }

    fn cycle_count(&self) -> u64 {
        self.counters.cycles
    }

    fn status(&self) -> Stat {
        self.status
    }

    fn registers(&self) -> &RegFile {
        &self.reg_file
    }

    fn mem(&self) -> &Memory {
        &self.mem
    }

    fn cc(&self) -> ConditionCode {
        self.cc
    }
}
