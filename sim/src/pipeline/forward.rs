//! Operand forwarding for the decode stage.
//!
//! A source register is matched against the destinations still in flight,
//! youngest producer first, and only falls back to the register file when no
//! in-flight instruction targets it. The youngest producer is the one whose
//! value the program order says the reader must see.

use super::stages::{Mstage, Wstage};
use crate::{hardware::RegFile, isa::Reg};

/// Where a decoded operand came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ForwardSource {
    /// ALU result computed by execute this cycle (`e_valE`).
    ExecuteE,
    /// Value loaded by the memory stage this cycle (`m_valM`).
    MemoryM,
    /// ALU result sitting in the M register (`M_valE`).
    MemoryE,
    /// Loaded value sitting in the W register (`W_valM`).
    WritebackM,
    /// ALU result sitting in the W register (`W_valE`).
    WritebackE,
    /// No in-flight producer; read the register file.
    RegFile,
}

impl ForwardSource {
    pub fn is_forwarded(self) -> bool {
        self != ForwardSource::RegFile
    }
}

/// One in-flight (destination, value) pair.
#[derive(Debug, Clone, Copy)]
struct Provider {
    source: ForwardSource,
    dst: Reg,
    val: u64,
}

/// Snapshot of every in-flight producer, in priority order.
#[derive(Debug, Clone)]
pub struct Forwarding {
    providers: [Provider; 5],
}

impl Forwarding {
    /// Collect producers from this cycle's execute and memory results
    /// (`m_next` and `w_next`) and from the committed M and W registers.
    pub fn new(m_next: &Mstage, w_next: &Wstage, m: &Mstage, w: &Wstage) -> Self {
        let p = |source, dst, val| Provider { source, dst, val };
        Self {
            providers: [
                p(ForwardSource::ExecuteE, m_next.dste, m_next.vale),
                p(ForwardSource::MemoryM, w_next.dstm, w_next.valm),
                p(ForwardSource::MemoryE, m.dste, m.vale),
                p(ForwardSource::WritebackM, w.dstm, w.valm),
                p(ForwardSource::WritebackE, w.dste, w.vale),
            ],
        }
    }

    /// Value of `src` as the decoding instruction must see it. `RNONE` never
    /// matches a producer and reads as zero.
    pub fn resolve(&self, src: Reg, regs: &RegFile) -> (u64, ForwardSource) {
        if src.is_none() {
            return (0, ForwardSource::RegFile);
        }
        self.providers
            .iter()
            .find(|p| p.dst == src)
            .map(|p| (p.val, p.source))
            .unwrap_or_else(|| (regs.get(src), ForwardSource::RegFile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::StageState;

    fn m_with(dste: Reg, vale: u64) -> Mstage {
        Mstage {
            dste,
            vale,
            ..Mstage::bubble()
        }
    }

    fn w_with(dste: Reg, vale: u64, dstm: Reg, valm: u64) -> Wstage {
        Wstage {
            dste,
            vale,
            dstm,
            valm,
            ..Wstage::bubble()
        }
    }

    #[test]
    fn test_youngest_producer_wins() {
        let mut regs = RegFile::default();
        regs.set(Reg::RAX, 1);

        let fwd = Forwarding::new(
            &m_with(Reg::RAX, 4),
            &w_with(Reg::RNONE, 0, Reg::RAX, 3),
            &m_with(Reg::RAX, 2),
            &w_with(Reg::RAX, 5, Reg::RNONE, 0),
        );
        assert_eq!(fwd.resolve(Reg::RAX, &regs), (4, ForwardSource::ExecuteE));

        let fwd = Forwarding::new(
            &Mstage::bubble(),
            &w_with(Reg::RNONE, 0, Reg::RAX, 3),
            &m_with(Reg::RAX, 2),
            &Wstage::bubble(),
        );
        assert_eq!(fwd.resolve(Reg::RAX, &regs), (3, ForwardSource::MemoryM));
    }

    #[test]
    fn test_write_back_memory_before_alu() {
        // popq %rsp: both destinations name %rsp, the loaded value wins
        let regs = RegFile::default();
        let fwd = Forwarding::new(
            &Mstage::bubble(),
            &Wstage::bubble(),
            &Mstage::bubble(),
            &w_with(Reg::RSP, 0x108, Reg::RSP, 0x42),
        );
        let (val, source) = fwd.resolve(Reg::RSP, &regs);
        assert_eq!((val, source), (0x42, ForwardSource::WritebackM));
    }

    #[test]
    fn test_fallback_and_no_register() {
        let mut regs = RegFile::default();
        regs.set(Reg::RBX, 9);
        let fwd = Forwarding::new(
            &Mstage::bubble(),
            &Wstage::bubble(),
            &Mstage::bubble(),
            &Wstage::bubble(),
        );
        assert_eq!(fwd.resolve(Reg::RBX, &regs), (9, ForwardSource::RegFile));
        assert_eq!(fwd.resolve(Reg::RNONE, &regs), (0, ForwardSource::RegFile));
    }
}
