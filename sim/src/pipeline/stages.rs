//! Payloads of the five pipeline registers. Each register is named after the
//! stage that reads it: `D` holds what fetch produced for decode, and so on.

use crate::{
    framework::{PipeReg, StageState},
    isa::{Inst, Reg, Stat},
};

/// Fetch stage register. Never bubbled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fstage {
    pub pred_pc: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dstage {
    pub stat: Stat,
    pub inst: Inst,
    pub pc: u64,
    pub valp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Estage {
    pub stat: Stat,
    pub inst: Inst,
    pub pc: u64,
    pub vala: u64,
    pub valb: u64,
    pub dste: Reg,
    pub dstm: Reg,
    pub srca: Reg,
    pub srcb: Reg,
}

/// Memory Access Stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mstage {
    pub stat: Stat,
    pub inst: Inst,
    pub pc: u64,
    /// Condition outcome for `jXX` and `cmovXX`.
    pub cnd: bool,
    pub vale: u64,
    pub vala: u64,
    pub dste: Reg,
    pub dstm: Reg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wstage {
    pub stat: Stat,
    pub inst: Inst,
    pub pc: u64,
    pub vale: u64,
    pub valm: u64,
    pub dste: Reg,
    pub dstm: Reg,
}

impl StageState for Fstage {
    fn bubble() -> Self {
        Self::default()
    }
}

impl StageState for Dstage {
    fn bubble() -> Self {
        Self {
            stat: Stat::Bub,
            inst: Inst::NOP,
            pc: 0,
            valp: 0,
        }
    }
}

impl StageState for Estage {
    fn bubble() -> Self {
        Self {
            stat: Stat::Bub,
            inst: Inst::NOP,
            pc: 0,
            vala: 0,
            valb: 0,
            dste: Reg::RNONE,
            dstm: Reg::RNONE,
            srca: Reg::RNONE,
            srcb: Reg::RNONE,
        }
    }
}

impl StageState for Mstage {
    fn bubble() -> Self {
        Self {
            stat: Stat::Bub,
            inst: Inst::NOP,
            pc: 0,
            cnd: false,
            vale: 0,
            vala: 0,
            dste: Reg::RNONE,
            dstm: Reg::RNONE,
        }
    }
}

impl StageState for Wstage {
    fn bubble() -> Self {
        Self {
            stat: Stat::Bub,
            inst: Inst::NOP,
            pc: 0,
            vale: 0,
            valm: 0,
            dste: Reg::RNONE,
            dstm: Reg::RNONE,
        }
    }
}

/// All pipeline registers, upstream first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipeRegs {
    pub f: PipeReg<Fstage>,
    pub d: PipeReg<Dstage>,
    pub e: PipeReg<Estage>,
    pub m: PipeReg<Mstage>,
    pub w: PipeReg<Wstage>,
}

impl PipeRegs {
    /// Apply every register's control tag. Returns `true` if any of them
    /// carried [`crate::framework::Control::Error`].
    pub fn commit(&mut self) -> bool {
        use crate::framework::Control::Error;
        let tags = [
            self.f.commit(),
            self.d.commit(),
            self.e.commit(),
            self.m.commit(),
            self.w.commit(),
        ];
        tags.contains(&Error)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
