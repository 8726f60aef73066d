use super::stages::{Dstage, Fstage, Mstage, Wstage};
use crate::{
    hardware::Memory,
    isa::{Inst, Stat},
};

/// Sources of the fetch address, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcSource {
    /// Return address loaded by a `ret` now in write back.
    Return,
    /// Fall-through address of a `jXX` that turned out not taken.
    Recovery,
    /// Address predicted by the previous fetch.
    Predicted,
}

/// Select the address to fetch from.
pub fn select_pc(f: &Fstage, m: &Mstage, w: &Wstage) -> (u64, PcSource) {
    let candidates = [
        (matches!(w.inst, Inst::RET), w.valm, PcSource::Return),
        (
            matches!(m.inst, Inst::JX(..)) && !m.cnd,
            m.vala,
            PcSource::Recovery,
        ),
    ];
    candidates
        .into_iter()
        .find(|(applies, ..)| *applies)
        .map(|(_, pc, source)| (pc, source))
        .unwrap_or((f.pred_pc, PcSource::Predicted))
}

/// Jumps and calls are predicted taken; everything else falls through.
pub fn predict(inst: &Inst, valp: u64) -> u64 {
    match *inst {
        Inst::JX(_, dest) | Inst::CALL(dest) => dest,
        _ => valp,
    }
}

/// Fetch stage: read one instruction and compute the next predicted PC.
pub fn update(f: &Fstage, m: &Mstage, w: &Wstage, mem: &Memory) -> (Fstage, Dstage) {
    let (pc, source) = select_pc(f, m, w);
    if source != PcSource::Predicted {
        tracing::trace!("fetch redirected to {:#x} ({:?})", pc, source);
    }

    let (stat, inst, valp) = match Inst::read(mem, pc) {
        Ok((inst @ Inst::HALT, valp)) => (Stat::Hlt, inst, valp),
        Ok((inst, valp)) => (Stat::Aok, inst, valp),
        Err(stat) => {
            tracing::trace!("fetch fault at {:#x}: {}", pc, stat);
            (stat, Inst::NOP, pc.wrapping_add(1))
        }
    };

    let f_next = Fstage {
        pred_pc: predict(&inst, valp),
    };
    let d_next = Dstage {
        stat,
        inst,
        pc,
        valp,
    };
    (f_next, d_next)
}
