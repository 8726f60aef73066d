use super::stages::{Estage, Mstage};
use crate::isa::{arithmetic_compute, ConditionCode, Inst, OpFn, Reg, Stat};

/// Execute stage.
///
/// `m_stat` is the status the memory stage produced this cycle and `w_stat`
/// the status held in write back. While either is an exception the condition
/// codes are left alone, so no instruction younger than a faulting one can
/// change them.
pub fn update(e: &Estage, cc: &mut ConditionCode, m_stat: Stat, w_stat: Stat) -> Mstage {
    let (alua, alub, alufun) = match e.inst {
        Inst::CMOVX(..) => (e.vala, 0, OpFn::ADD),
        Inst::OPQ(op, ..) => (e.vala, e.valb, op),
        Inst::IRMOVQ(_, v) => (v, 0, OpFn::ADD),
        Inst::IOPQ(op, _, v) => (v, e.valb, op),
        Inst::RMMOVQ(_, addr) | Inst::MRMOVQ(addr, _) => (addr.0, e.valb, OpFn::ADD),
        Inst::CALL(_) | Inst::PUSHQ(_) => (8u64.wrapping_neg(), e.valb, OpFn::ADD),
        Inst::RET | Inst::POPQ(_) => (8, e.valb, OpFn::ADD),
        Inst::HALT | Inst::NOP | Inst::JX(..) => (0, 0, OpFn::ADD),
    };
    let vale = arithmetic_compute(alua, alub, alufun);

    let cnd = match e.inst {
        Inst::CMOVX(c, ..) | Inst::JX(c, _) => cc.test(c),
        _ => false,
    };

    let set_cc = matches!(e.inst, Inst::OPQ(..) | Inst::IOPQ(..))
        && !m_stat.is_exception()
        && !w_stat.is_exception();
    if set_cc {
        cc.set(alua, alub, vale, alufun);
        tracing::trace!("set cc from {:#x} and {:#x}: {}", alua, alub, cc);
    }

    // a conditional move that does not fire writes nothing
    let dste = match e.inst {
        Inst::CMOVX(..) if !cnd => Reg::RNONE,
        _ => e.dste,
    };

    Mstage {
        stat: e.stat,
        inst: e.inst,
        pc: e.pc,
        cnd,
        vale,
        vala: e.vala,
        dste,
        dstm: e.dstm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{framework::StageState, isa::CondFn};

    fn estage(inst: Inst, vala: u64, valb: u64) -> Estage {
        let ops = super::super::decode::operands(&inst);
        Estage {
            stat: Stat::Aok,
            inst,
            vala,
            valb,
            dste: ops.dste,
            dstm: ops.dstm,
            srca: ops.srca,
            srcb: ops.srcb,
            ..Estage::bubble()
        }
    }

    #[test]
    fn test_alu_and_cc() {
        let mut cc = ConditionCode::default();
        let m = update(
            &estage(Inst::OPQ(OpFn::SUB, Reg::RAX, Reg::RBX), 3, 3),
            &mut cc,
            Stat::Aok,
            Stat::Bub,
        );
        assert_eq!(m.vale, 0);
        assert!(cc.zf);

        let m = update(
            &estage(Inst::IOPQ(OpFn::ADD, Reg::RBX, 5), 0, 10),
            &mut cc,
            Stat::Aok,
            Stat::Aok,
        );
        assert_eq!(m.vale, 15);
        assert!(!cc.zf);
    }

    #[test]
    fn test_cc_frozen_by_pending_fault() {
        let mut cc = ConditionCode::default();
        let inst = Inst::OPQ(OpFn::ADD, Reg::RAX, Reg::RBX);
        update(&estage(inst, 1, 1), &mut cc, Stat::Adr, Stat::Aok);
        update(&estage(inst, 1, 1), &mut cc, Stat::Aok, Stat::Hlt);
        assert_eq!(cc, ConditionCode::default());
    }

    #[test]
    fn test_cmov_not_taken_drops_destination() {
        // Z=1 at power on, so cmovne does not fire
        let mut cc = ConditionCode::default();
        let inst = Inst::CMOVX(CondFn::NE, Reg::RAX, Reg::RDX);
        let m = update(&estage(inst, 7, 0), &mut cc, Stat::Aok, Stat::Aok);
        assert_eq!((m.cnd, m.dste, m.vale), (false, Reg::RNONE, 7));

        let inst = Inst::CMOVX(CondFn::E, Reg::RAX, Reg::RDX);
        let m = update(&estage(inst, 7, 0), &mut cc, Stat::Aok, Stat::Aok);
        assert_eq!((m.cnd, m.dste), (true, Reg::RDX));
    }

    #[test]
    fn test_stack_adjust() {
        let mut cc = ConditionCode::default();
        let push = estage(Inst::PUSHQ(Reg::RAX), 1, 0x100);
        assert_eq!(update(&push, &mut cc, Stat::Aok, Stat::Aok).vale, 0xf8);
        let ret = estage(Inst::RET, 0x100, 0x100);
        assert_eq!(update(&ret, &mut cc, Stat::Aok, Stat::Aok).vale, 0x108);
    }
}
