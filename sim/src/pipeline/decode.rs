use super::{
    forward::{ForwardSource, Forwarding},
    stages::{Dstage, Estage},
};
use crate::{
    hardware::RegFile,
    isa::{Addr, Inst, Reg},
};

/// Register ids an instruction reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operands {
    pub srca: Reg,
    pub srcb: Reg,
    /// Destination of the ALU result.
    pub dste: Reg,
    /// Destination of the loaded value.
    pub dstm: Reg,
}

/// Source and destination registers of `inst`.
pub fn operands(inst: &Inst) -> Operands {
    use Reg::{RNONE, RSP};
    let (srca, srcb, dste, dstm) = match *inst {
        Inst::HALT | Inst::NOP | Inst::JX(..) => (RNONE, RNONE, RNONE, RNONE),
        Inst::CMOVX(_, ra, rb) => (ra, RNONE, rb, RNONE),
        Inst::IRMOVQ(rb, _) => (RNONE, RNONE, rb, RNONE),
        Inst::RMMOVQ(ra, Addr(_, rb)) => (ra, rb, RNONE, RNONE),
        Inst::MRMOVQ(Addr(_, rb), ra) => (RNONE, rb, RNONE, ra),
        Inst::OPQ(_, ra, rb) => (ra, rb, rb, RNONE),
        Inst::IOPQ(_, rb, _) => (RNONE, rb, rb, RNONE),
        Inst::CALL(_) => (RNONE, RSP, RSP, RNONE),
        Inst::RET => (RSP, RSP, RSP, RNONE),
        Inst::PUSHQ(ra) => (ra, RSP, RSP, RNONE),
        Inst::POPQ(ra) => (RSP, RSP, RSP, ra),
    };
    Operands {
        srca,
        srcb,
        dste,
        dstm,
    }
}

/// Decode stage output plus how each operand was obtained.
#[derive(Debug, Clone, Copy)]
pub struct Decoded {
    pub e_next: Estage,
    pub fwd_a: ForwardSource,
    pub fwd_b: ForwardSource,
}

/// Decode stage: read both operands through the forwarding network.
/// `call` and `jXX` carry their return/fall-through address in `valA`.
pub fn update(d: &Dstage, fwd: &Forwarding, regs: &RegFile) -> Decoded {
    let Operands {
        srca,
        srcb,
        dste,
        dstm,
    } = operands(&d.inst);

    let (vala, fwd_a) = match d.inst {
        Inst::CALL(_) | Inst::JX(..) => (d.valp, ForwardSource::RegFile),
        _ => fwd.resolve(srca, regs),
    };
    let (valb, fwd_b) = fwd.resolve(srcb, regs);

    Decoded {
        e_next: Estage {
            stat: d.stat,
            inst: d.inst,
            pc: d.pc,
            vala,
            valb,
            dste,
            dstm,
            srca,
            srcb,
        },
        fwd_a,
        fwd_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::OpFn;

    #[test]
    fn test_stack_operands() {
        let pop = operands(&Inst::POPQ(Reg::RBX));
        assert_eq!((pop.srca, pop.srcb), (Reg::RSP, Reg::RSP));
        assert_eq!((pop.dste, pop.dstm), (Reg::RSP, Reg::RBX));

        let push = operands(&Inst::PUSHQ(Reg::RDI));
        assert_eq!((push.srca, push.dste), (Reg::RDI, Reg::RSP));
        assert_eq!(push.dstm, Reg::RNONE);
    }

    #[test]
    fn test_arith_operands() {
        let op = operands(&Inst::OPQ(OpFn::ADD, Reg::RAX, Reg::RCX));
        assert_eq!((op.srca, op.srcb, op.dste), (Reg::RAX, Reg::RCX, Reg::RCX));
        let iop = operands(&Inst::IOPQ(OpFn::XOR, Reg::R9, 1));
        assert_eq!((iop.srca, iop.srcb), (Reg::RNONE, Reg::R9));
        assert_eq!(iop.dste, Reg::R9);
        let load = operands(&Inst::MRMOVQ(Addr(0, Reg::RBP), Reg::RSI));
        assert_eq!((load.srcb, load.dstm), (Reg::RBP, Reg::RSI));
        assert_eq!(load.dste, Reg::RNONE);
    }
}
