//! Compare the final state of the pipeline against the sequential reference.

use crate::{
    framework::CpuSim,
    isa::{ConditionCode, Reg},
    utils::{mem_diff, reg_diff},
};

/// Differences between the reference (ISA) state and the pipeline state.
/// Each entry is `(where, isa value, pipeline value)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CheckReport {
    pub registers: Vec<(Reg, u64, u64)>,
    pub memory: Vec<(u64, u64, u64)>,
    pub cc: Option<(ConditionCode, ConditionCode)>,
}

impl CheckReport {
    pub fn is_match(&self) -> bool {
        self.registers.is_empty() && self.memory.is_empty() && self.cc.is_none()
    }
}

/// Diff registers, memory and condition codes of two simulators.
pub fn compare(isa: &dyn CpuSim, pipe: &dyn CpuSim) -> CheckReport {
    let (isa_cc, pipe_cc) = (isa.cc(), pipe.cc());
    let report = CheckReport {
        registers: reg_diff(isa.registers(), pipe.registers()),
        memory: mem_diff(isa.mem(), pipe.mem()),
        cc: (isa_cc != pipe_cc).then_some((isa_cc, pipe_cc)),
    };
    if !report.is_match() {
        tracing::warn!(
            "reference mismatch: {} registers, {} memory words, cc {}",
            report.registers.len(),
            report.memory.len(),
            report.cc.map_or("agree", |_| "differ")
        );
    }
    report
}

impl std::fmt::Display for CheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.registers.is_empty() {
            writeln!(f, "ISA Register != Pipeline Register File")?;
            for (reg, isa, pipe) in &self.registers {
                writeln!(f, "{}:\t{:#018x}\t{:#018x}", reg, isa, pipe)?;
            }
        }
        if !self.memory.is_empty() {
            writeln!(f, "ISA Memory != Pipeline Memory")?;
            for (addr, isa, pipe) in &self.memory {
                writeln!(f, "{:#06x}:\t{:#018x}\t{:#018x}", addr, isa, pipe)?;
            }
        }
        if let Some((isa, pipe)) = &self.cc {
            writeln!(
                f,
                "ISA Cond. Codes ({}) != Pipeline Cond. Codes ({})",
                isa, pipe
            )?;
        }
        if self.is_match() {
            write!(f, "ISA Check Succeeds")
        } else {
            write!(f, "ISA Check Fails")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hardware::Memory, isa::Inst, pipeline::PipeSim, seq::SeqSim};

    #[test]
    fn test_detects_divergence() {
        let mut mem = Memory::new(64);
        mem.write(0, &Inst::IRMOVQ(Reg::RDX, 5).encode()).unwrap();
        let mut seq = SeqSim::new(mem.clone());
        seq.run(1);
        let pipe = PipeSim::new(mem);

        let report = compare(&seq, &pipe);
        assert!(!report.is_match());
        assert_eq!(report.registers, vec![(Reg::RDX, 5, 0)]);
        let text = report.to_string();
        assert!(text.starts_with("ISA Register != Pipeline Register File"));
        assert!(text.ends_with("ISA Check Fails"));
    }
}
