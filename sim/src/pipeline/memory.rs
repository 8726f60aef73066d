use super::stages::{Mstage, Wstage};
use crate::{
    hardware::Memory,
    isa::{Inst, Stat},
};

enum Access {
    Read(u64),
    Write(u64, u64),
    Idle,
}

fn access(m: &Mstage) -> Access {
    match m.inst {
        Inst::RMMOVQ(..) | Inst::PUSHQ(_) | Inst::CALL(_) => Access::Write(m.vale, m.vala),
        Inst::MRMOVQ(..) => Access::Read(m.vale),
        Inst::POPQ(_) | Inst::RET => Access::Read(m.vala),
        Inst::HALT
        | Inst::NOP
        | Inst::CMOVX(..)
        | Inst::IRMOVQ(..)
        | Inst::OPQ(..)
        | Inst::JX(..)
        | Inst::IOPQ(..) => Access::Idle,
    }
}

/// Memory stage: at most one data access. A failed access turns the status
/// into [`Stat::Adr`]; only instructions with status `Aok` touch memory.
pub fn update(m: &Mstage, mem: &mut Memory) -> Wstage {
    let mut stat = m.stat;
    let mut valm = 0;

    if m.stat == Stat::Aok {
        let result = match access(m) {
            Access::Read(addr) => mem.read_u64(addr).map(|v| valm = v),
            Access::Write(addr, val) => {
                tracing::trace!("write memory: addr = {:#x}, datain = {:#x}", addr, val);
                mem.write_u64(addr, val)
            }
            Access::Idle => Ok(()),
        };
        if let Err(fault) = result {
            tracing::debug!("{} at pc {:#x}", fault, m.pc);
            stat = stat.merge(Stat::Adr);
        }
    }

    Wstage {
        stat,
        inst: m.inst,
        pc: m.pc,
        vale: m.vale,
        valm,
        dste: m.dste,
        dstm: m.dstm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        framework::StageState,
        isa::{Addr, Reg},
    };

    #[test]
    fn test_load_store() {
        let mut mem = Memory::new(64);
        let store = Mstage {
            stat: Stat::Aok,
            inst: Inst::RMMOVQ(Reg::RAX, Addr(0, Reg::RBX)),
            vale: 0x10,
            vala: 0xdead,
            ..Mstage::bubble()
        };
        assert_eq!(update(&store, &mut mem).stat, Stat::Aok);
        assert_eq!(mem.read_u64(0x10).unwrap(), 0xdead);

        let pop = Mstage {
            stat: Stat::Aok,
            inst: Inst::POPQ(Reg::RCX),
            vale: 0x18,
            vala: 0x10,
            dste: Reg::RSP,
            dstm: Reg::RCX,
            ..Mstage::bubble()
        };
        let w = update(&pop, &mut mem);
        assert_eq!((w.valm, w.vale, w.dstm), (0xdead, 0x18, Reg::RCX));
    }

    #[test]
    fn test_fault_overrides_status() {
        let mut mem = Memory::new(64);
        let load = Mstage {
            stat: Stat::Aok,
            inst: Inst::MRMOVQ(Addr(0x40, Reg::RNONE), Reg::RAX),
            vale: 0x40,
            dstm: Reg::RAX,
            ..Mstage::bubble()
        };
        assert_eq!(update(&load, &mut mem).stat, Stat::Adr);

        let call = Mstage {
            stat: Stat::Aok,
            inst: Inst::CALL(0),
            vale: 0u64.wrapping_sub(8),
            vala: 9,
            ..Mstage::bubble()
        };
        assert_eq!(update(&call, &mut mem).stat, Stat::Adr);
        assert!(mem.as_bytes().iter().all(|&b| b == 0));
    }
}
