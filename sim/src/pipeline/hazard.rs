//! Pipeline control logic. Every signal is a pure function of the committed
//! register contents and of the values the stages computed this cycle.

use super::stages::PipeRegs;
use crate::{framework::Control, isa::Inst};

/// The instruction in E loads a register that the instruction now being
/// decoded reads.
pub fn load_use(regs: &PipeRegs) -> bool {
    let e = &regs.e.current;
    let d_next = &regs.e.next;
    matches!(e.inst, Inst::MRMOVQ(..) | Inst::POPQ(_))
        && !e.dstm.is_none()
        && (e.dstm == d_next.srca || e.dstm == d_next.srcb)
}

/// A `ret` is in decode, execute or memory; its target is unknown until it
/// leaves the memory stage.
pub fn ret_in_flight(regs: &PipeRegs) -> bool {
    let (d, e, m) = (&regs.d.current, &regs.e.current, &regs.m.current);
    [d.inst, e.inst, m.inst].contains(&Inst::RET)
}

/// The jump in E was predicted taken but its condition is false.
pub fn mispredicted(regs: &PipeRegs) -> bool {
    matches!(regs.e.current.inst, Inst::JX(..)) && !regs.m.next.cnd
}

/// The instruction leaving the memory stage, or the one in write back, has
/// halted or faulted.
pub fn exception_downstream(regs: &PipeRegs) -> bool {
    regs.w.next.stat.is_exception() || regs.w.current.stat.is_exception()
}

/// Hazards detected in one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hazards {
    pub load_use: bool,
    pub ret_in_flight: bool,
    pub mispredict: bool,
    pub exception: bool,
    pub w_exception: bool,
}

impl Hazards {
    pub fn detect(regs: &PipeRegs) -> Self {
        Self {
            load_use: load_use(regs),
            ret_in_flight: ret_in_flight(regs),
            mispredict: mispredicted(regs),
            exception: exception_downstream(regs),
            w_exception: regs.w.current.stat.is_exception(),
        }
    }

    /// Control tags for F, D, E, M and W, in that order.
    pub fn controls(&self) -> [Control; 5] {
        let Hazards {
            load_use,
            ret_in_flight,
            mispredict,
            exception,
            w_exception,
        } = *self;
        [
            Control::from_signals(load_use || ret_in_flight, false),
            Control::from_signals(load_use, mispredict || (!load_use && ret_in_flight)),
            Control::from_signals(false, mispredict || load_use),
            Control::from_signals(false, exception),
            Control::from_signals(w_exception, false),
        ]
    }
}

/// Detect hazards and store next cycle's control tag in every register.
pub fn control(regs: &mut PipeRegs) -> Hazards {
    let hazards = Hazards::detect(regs);
    let [f, d, e, m, w] = hazards.controls();
    for (name, tag) in [("F", f), ("D", d), ("E", e), ("M", m), ("W", w)] {
        if tag == Control::Error {
            tracing::warn!("pipeline register {} asked to stall and bubble", name);
        }
    }
    regs.f.control = f;
    regs.d.control = d;
    regs.e.control = e;
    regs.m.control = m;
    regs.w.control = w;
    hazards
}
