//! End-of-run summary printed by `psim`.

use ansi_term::Colour;

use crate::{
    check::CheckReport,
    framework::CpuSim,
    hardware::{Memory, RegFile},
    isa::{ConditionCode, Reg, Stat},
    pipeline::{PerfCounters, PipeSim},
    utils::{mem_diff, reg_diff},
};

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunReport {
    pub status: Stat,
    pub cc: ConditionCode,
    pub counters: PerfCounters,
    /// `(register, initial, final)`
    pub registers: Vec<(Reg, u64, u64)>,
    /// `(address, initial, final)`
    pub memory: Vec<(u64, u64, u64)>,
    pub check: Option<CheckReport>,
    /// 0 prints only the check verdict and CPI, 1 adds the state summary,
    /// 2 adds the performance counters.
    pub verbosity: u8,
    /// Paint the status name.
    pub color: bool,
}

impl RunReport {
    /// Summarize `pipe` against the memory it started from. Registers start
    /// at zero.
    pub fn new(initial: &Memory, pipe: &PipeSim) -> Self {
        Self {
            status: pipe.status(),
            cc: pipe.cc(),
            counters: *pipe.counters(),
            registers: reg_diff(&RegFile::default(), pipe.registers()),
            memory: mem_diff(initial, pipe.mem()),
            check: None,
            verbosity: 1,
            color: false,
        }
    }

    pub fn with_check(mut self, check: CheckReport) -> Self {
        self.check = Some(check);
        self
    }

    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn status_name(&self) -> String {
        if !self.color {
            return self.status.to_string();
        }
        let colour = match self.status {
            Stat::Aok | Stat::Hlt => Colour::Green,
            Stat::Bub => Colour::Fixed(8),
            Stat::Adr | Stat::Ins | Stat::Pip => Colour::Red,
        };
        colour.bold().paint(self.status.name()).to_string()
    }

    pub fn cpi(&self) -> f64 {
        self.counters.cpi().unwrap_or(1.0)
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = &self.counters;
        if self.verbosity > 0 {
            writeln!(f, "{} instructions executed", c.instructions)?;
            writeln!(f, "Status = {}", self.status_name())?;
            writeln!(f, "Condition Codes: {}", self.cc)?;
            writeln!(f, "Changed Register State:")?;
            for (reg, old, new) in &self.registers {
                writeln!(f, "{}:\t{:#018x}\t{:#018x}", reg, old, new)?;
            }
            writeln!(f, "Changed Memory State:")?;
            for (addr, old, new) in &self.memory {
                writeln!(f, "{:#06x}:\t{:#018x}\t{:#018x}", addr, old, new)?;
            }
        }
        if let Some(check) = &self.check {
            if self.verbosity > 0 || check.is_match() {
                writeln!(f, "{}", check)?;
            } else {
                writeln!(f, "ISA Check Fails")?;
            }
        }
        if self.verbosity > 1 {
            writeln!(
                f,
                "Stalls: {} load/use, {} ret; {} mispredicted branches; {} forwarded operands",
                c.load_use_stalls, c.ret_stalls, c.mispredicts, c.forwards
            )?;
        }
        write!(
            f,
            "CPI: {} cycles/{} instructions = {:.2}",
            c.busy_cycles,
            c.instructions,
            self.cpi()
        )
    }
}
