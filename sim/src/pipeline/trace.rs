use super::stages::PipeRegs;
use crate::{
    framework::Control,
    isa::{ConditionCode, Inst, Stat},
};

/// What one pipeline stage held during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StageView {
    pub pc: u64,
    pub inst: Inst,
    pub stat: Stat,
    /// Tag that will be applied to this register at the next clock edge.
    pub control: Control,
}

/// Snapshot of the pipeline taken after the control logic ran.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CycleRecord {
    pub cycle: u64,
    /// Address fetched this cycle.
    pub fetch_pc: u64,
    pub pred_pc: u64,
    /// D, E, M and W.
    pub stages: [StageView; 4],
    pub f_control: Control,
    pub cc: ConditionCode,
    pub status: Stat,
}

impl CycleRecord {
    pub fn capture(
        cycle: u64,
        fetch_pc: u64,
        regs: &PipeRegs,
        cc: ConditionCode,
        status: Stat,
    ) -> Self {
        let view = |pc, inst, stat, control| StageView {
            pc,
            inst,
            stat,
            control,
        };
        let (d, e, m, w) = (
            &regs.d.current,
            &regs.e.current,
            &regs.m.current,
            &regs.w.current,
        );
        Self {
            cycle,
            fetch_pc,
            pred_pc: regs.f.next.pred_pc,
            stages: [
                view(d.pc, d.inst, d.stat, regs.d.control),
                view(e.pc, e.inst, e.stat, regs.e.control),
                view(m.pc, m.inst, m.stat, regs.m.control),
                view(w.pc, w.inst, w.stat, regs.w.control),
            ],
            f_control: regs.f.control,
            cc,
            status,
        }
    }
}

impl std::fmt::Display for CycleRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Cycle {}. CC={}, Stat={}",
            self.cycle, self.cc, self.status
        )?;
        writeln!(
            f,
            "F: pc = {:#06x}  predPC = {:#06x}  [{}]",
            self.fetch_pc, self.pred_pc, self.f_control
        )?;
        for (name, view) in ["D", "E", "M", "W"].iter().zip(&self.stages) {
            let inst = match view.stat {
                Stat::Bub => "----".to_string(),
                _ => view.inst.to_string(),
            };
            write!(
                f,
                "{}: pc = {:#06x}  {:<24} {}  [{}]",
                name, view.pc, inst, view.stat, view.control
            )?;
            if *name != "W" {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
