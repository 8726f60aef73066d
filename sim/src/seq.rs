//! Sequential reference model: executes one whole instruction per step,
//! straight from the instruction set semantics. Used to cross-check the
//! pipeline.

use crate::{
    framework::CpuSim,
    hardware::{AddressFault, Memory, RegFile},
    isa::{arithmetic_compute, Addr, ConditionCode, Inst, Reg, Stat},
};

#[derive(Debug, Clone)]
pub struct SeqSim {
    mem: Memory,
    regs: RegFile,
    cc: ConditionCode,
    pc: u64,
    status: Stat,
    n_insts: u64,
}

impl SeqSim {
    pub fn new(memory: Memory) -> Self {
        Self {
            mem: memory,
            regs: RegFile::default(),
            cc: ConditionCode::default(),
            pc: 0,
            status: Stat::Aok,
            n_insts: 0,
        }
    }

    pub fn instructions(&self) -> u64 {
        self.n_insts
    }

    /// Execute up to `max_instr` instructions, stopping early on halt or a
    /// fault. Returns the final status.
    pub fn run(&mut self, max_instr: u64) -> Stat {
        while self.status == Stat::Aok && self.n_insts < max_instr {
            self.step_inst();
        }
        self.status
    }

    /// Execute one instruction. A faulting instruction changes nothing but
    /// the status.
    pub fn step_inst(&mut self) -> Stat {
        if self.status != Stat::Aok {
            return self.status;
        }
        self.n_insts += 1;

        let (inst, valp) = match Inst::read(&self.mem, self.pc) {
            Ok(r) => r,
            Err(stat) => {
                self.status = stat;
                return stat;
            }
        };
        match self.execute(inst, valp) {
            Ok(next_pc) => self.pc = next_pc,
            Err(fault) => {
                tracing::debug!("reference model: {} at pc {:#x}", fault, self.pc);
                self.status = Stat::Adr;
            }
        }
        self.status
    }

    /// Apply `inst` and return the address of the next instruction. Memory
    /// accesses happen before any register update, so an `Err` leaves the
    /// registers untouched.
    fn execute(&mut self, inst: Inst, valp: u64) -> Result<u64, AddressFault> {
        let regs = &mut self.regs;
        let rsp = regs.get(Reg::RSP);
        match inst {
            Inst::HALT => {
                self.status = Stat::Hlt;
                return Ok(self.pc);
            }
            Inst::NOP => {}
            Inst::CMOVX(c, ra, rb) => {
                if self.cc.test(c) {
                    regs.set(rb, regs.get(ra));
                }
            }
            Inst::IRMOVQ(rb, v) => regs.set(rb, v),
            Inst::RMMOVQ(ra, Addr(d, rb)) => {
                let addr = regs.get(rb).wrapping_add(d);
                self.mem.write_u64(addr, regs.get(ra))?;
            }
            Inst::MRMOVQ(Addr(d, rb), ra) => {
                let addr = regs.get(rb).wrapping_add(d);
                regs.set(ra, self.mem.read_u64(addr)?);
            }
            Inst::OPQ(op, ra, rb) => {
                let (va, vb) = (regs.get(ra), regs.get(rb));
                let ve = arithmetic_compute(va, vb, op);
                self.cc.set(va, vb, ve, op);
                regs.set(rb, ve);
            }
            Inst::IOPQ(op, rb, v) => {
                let vb = regs.get(rb);
                let ve = arithmetic_compute(v, vb, op);
                self.cc.set(v, vb, ve, op);
                regs.set(rb, ve);
            }
            Inst::JX(c, dest) => {
                if self.cc.test(c) {
                    return Ok(dest);
                }
            }
            Inst::CALL(dest) => {
                let new_rsp = rsp.wrapping_sub(8);
                self.mem.write_u64(new_rsp, valp)?;
                regs.set(Reg::RSP, new_rsp);
                return Ok(dest);
            }
            Inst::RET => {
                let target = self.mem.read_u64(rsp)?;
                regs.set(Reg::RSP, rsp.wrapping_add(8));
                return Ok(target);
            }
            Inst::PUSHQ(ra) => {
                let new_rsp = rsp.wrapping_sub(8);
                self.mem.write_u64(new_rsp, regs.get(ra))?;
                regs.set(Reg::RSP, new_rsp);
            }
            Inst::POPQ(ra) => {
                let val = self.mem.read_u64(rsp)?;
                regs.set(Reg::RSP, rsp.wrapping_add(8));
                regs.set(ra, val);
            }
        }
        Ok(valp)
    }
}

impl CpuSim for SeqSim {
    fn step(&mut self) {
        self.step_inst();
    }

    fn is_terminate(&self) -> bool {
        self.status != Stat::Aok
    }

    fn program_counter(&self) -> u64 {
        self.pc
    }

    fn cycle_count(&self) -> u64 {
        self.n_insts
    }

    fn status(&self) -> Stat {
        self.status
    }

    fn registers(&self) -> &RegFile {
        &self.regs
    }

    fn mem(&self) -> &Memory {
        &self.mem
    }

    fn cc(&self) -> ConditionCode {
        self.cc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{CondFn, OpFn};

    fn seq_with(insts: &[Inst]) -> SeqSim {
        let mut mem = Memory::new(0x200);
        let mut addr = 0;
        for inst in insts {
            mem.write(addr, &inst.encode()).unwrap();
            addr += inst.len();
        }
        SeqSim::new(mem)
    }

    #[test]
    fn test_call_ret() {
        let prog = [Inst::IRMOVQ(Reg::RSP, 0x100), Inst::CALL(0x20), Inst::HALT];
        let mut seq = seq_with(&prog);
        let callee = Inst::IRMOVQ(Reg::RAX, 7);
        seq.mem.write(0x20, &callee.encode()).unwrap();
        seq.mem.write(0x2a, &Inst::RET.encode()).unwrap();

        assert_eq!(seq.run(100), Stat::Hlt);
        assert_eq!(seq.regs.get(Reg::RAX), 7);
        assert_eq!(seq.regs.get(Reg::RSP), 0x100);
        // return address pushed by the call
        assert_eq!(seq.mem.read_u64(0xf8).unwrap(), 19);
        assert_eq!(seq.instructions(), 5);
    }

    #[test]
    fn test_loop_with_condition() {
        // count %rcx down from 3, adding it into %rax
        let mut seq = seq_with(&[
            Inst::IRMOVQ(Reg::RCX, 3),
            Inst::OPQ(OpFn::ADD, Reg::RCX, Reg::RAX),
            Inst::IOPQ(OpFn::SUB, Reg::RCX, 1),
            Inst::JX(CondFn::NE, 10),
            Inst::HALT,
        ]);
        assert_eq!(seq.run(100), Stat::Hlt);
        assert_eq!(seq.regs.get(Reg::RAX), 6);
        assert!(seq.cc.zf);
    }

    #[test]
    fn test_fault_commits_nothing() {
        let mut seq = seq_with(&[
            Inst::IRMOVQ(Reg::RSP, 0x1000),
            Inst::POPQ(Reg::RAX),
            Inst::HALT,
        ]);
        assert_eq!(seq.run(100), Stat::Adr);
        assert_eq!(seq.regs.get(Reg::RSP), 0x1000);
        assert_eq!(seq.pc, 10);
    }
}
