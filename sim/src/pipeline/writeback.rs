use super::stages::Wstage;
use crate::{hardware::RegFile, isa::Stat};

/// Write back stage. Commits `valE` then `valM`, so a `popq %rsp` ends with
/// the popped value. Returns the program status for this cycle: the
/// instruction's status, with a bubble reported as `Aok`.
pub fn update(w: &Wstage, regs: &mut RegFile) -> Stat {
    match w.stat {
        Stat::Aok => {
            regs.set(w.dste, w.vale);
            regs.set(w.dstm, w.valm);
            Stat::Aok
        }
        Stat::Bub => Stat::Aok,
        stat => stat,
    }
}
