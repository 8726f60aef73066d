//! Instruction Set definition for Y86-64 Architecture

use crate::hardware::Memory;

macro_rules! define_code {
    {
        @mod $modname:ident;
        @type $typ:ty;
        $( $cname:ident = $cval:expr; )*
    } => {
        pub mod $modname {
            $(pub const $cname : $typ = $cval; )*
            #[allow(unused)]
            pub fn name_of(code: $typ) -> &'static str {
                match code {
                    $($cname => stringify!($cname), )*
                    _ => "no name"
                }
            }
        }
    };
}

define_code! {
    @mod inst_code;
    @type u8;
    HALT = 0x0;
    NOP = 0x1;
    CMOVX = 0x2;
    IRMOVQ = 0x3;
    RMMOVQ = 0x4;
    MRMOVQ = 0x5;
    OPQ = 0x6;
    JX = 0x7;
    CALL = 0x8;
    RET = 0x9;
    PUSHQ = 0xa;
    POPQ = 0xb;
    // extended instruction
    IOPQ = 0xc;
}

define_code! {
    @mod reg_code;
    @type u8;
    RAX = 0;
    RCX = 1;
    RDX = 2;
    RBX = 3;
    RSP = 4;
    RBP = 5;
    RSI = 6;
    RDI = 7;
    R8 = 8;
    R9 = 9;
    R10 = 0xa;
    R11 = 0xb;
    R12 = 0xc;
    R13 = 0xd;
    R14 = 0xe;
    RNONE = 0xf;
}

define_code! {
    @mod op_code;
    @type u8;
    ADD = 0;
    SUB = 1;
    AND = 2;
    XOR = 3;
}

define_code! {
    @mod cond_fn;
    @type u8;
    YES = 0;
    LE = 1;
    L = 2;
    E = 3;
    NE = 4;
    GE = 5;
    G = 6;
}

/// Register identifiers. `RNONE` is the "no register" id: reading it yields
/// zero and writing it has no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::upper_case_acronyms)]
pub enum Reg {
    RAX = reg_code::RAX as isize,
    RCX = reg_code::RCX as isize,
    RDX = reg_code::RDX as isize,
    RBX = reg_code::RBX as isize,
    RSP = reg_code::RSP as isize,
    RBP = reg_code::RBP as isize,
    RSI = reg_code::RSI as isize,
    RDI = reg_code::RDI as isize,
    R8 = reg_code::R8 as isize,
    R9 = reg_code::R9 as isize,
    R10 = reg_code::R10 as isize,
    R11 = reg_code::R11 as isize,
    R12 = reg_code::R12 as isize,
    R13 = reg_code::R13 as isize,
    R14 = reg_code::R14 as isize,
    RNONE = reg_code::RNONE as isize,
}

impl Reg {
    /// The fifteen program registers, in encoding order.
    pub const ALL: [Reg; 15] = [
        Reg::RAX, Reg::RCX, Reg::RDX, Reg::RBX, Reg::RSP, Reg::RBP, Reg::RSI, Reg::RDI, Reg::R8,
        Reg::R9, Reg::R10, Reg::R11, Reg::R12, Reg::R13, Reg::R14,
    ];

    /// Decode a register nibble. Only the low four bits are looked at, and
    /// every one of the sixteen values names a register (0xf is `RNONE`).
    pub fn from_nibble(code: u8) -> Reg {
        match code & 0xf {
            reg_code::RNONE => Reg::RNONE,
            c => Self::ALL[c as usize],
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_none(self) -> bool {
        self == Reg::RNONE
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::RAX => "%rax",
            Reg::RCX => "%rcx",
            Reg::RDX => "%rdx",
            Reg::RBX => "%rbx",
            Reg::RSP => "%rsp",
            Reg::RBP => "%rbp",
            Reg::RSI => "%rsi",
            Reg::RDI => "%rdi",
            Reg::R8 => "%r8",
            Reg::R9 => "%r9",
            Reg::R10 => "%r10",
            Reg::R11 => "%r11",
            Reg::R12 => "%r12",
            Reg::R13 => "%r13",
            Reg::R14 => "%r14",
            Reg::RNONE => "----",
        }
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::upper_case_acronyms)]
pub enum CondFn {
    /// jmp or rrmovq
    YES = 0,
    LE = 1,
    L = 2,
    E = 3,
    NE = 4,
    GE = 5,
    G = 6,
}

impl CondFn {
    pub fn from_ifun(ifun: u8) -> Option<Self> {
        use cond_fn::*;
        Some(match ifun {
            YES => Self::YES,
            LE => Self::LE,
            L => Self::L,
            E => Self::E,
            NE => Self::NE,
            GE => Self::GE,
            G => Self::G,
            _ => return None,
        })
    }

    /// Mnemonic suffix, empty for the unconditional case.
    fn suffix(self) -> &'static str {
        match self {
            CondFn::YES => "",
            CondFn::LE => "le",
            CondFn::L => "l",
            CondFn::E => "e",
            CondFn::NE => "ne",
            CondFn::GE => "ge",
            CondFn::G => "g",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::upper_case_acronyms)]
pub enum OpFn {
    ADD = 0,
    SUB = 1,
    AND = 2,
    XOR = 3,
}

impl OpFn {
    pub fn from_ifun(ifun: u8) -> Option<Self> {
        use op_code::*;
        Some(match ifun {
            ADD => Self::ADD,
            SUB => Self::SUB,
            AND => Self::AND,
            XOR => Self::XOR,
            _ => return None,
        })
    }

    fn stem(self) -> &'static str {
        match self {
            OpFn::ADD => "add",
            OpFn::SUB => "sub",
            OpFn::AND => "and",
            OpFn::XOR => "xor",
        }
    }
}

/// Compute `b op a`, which is what `OPq rA, rB` stores into `rB`.
pub fn arithmetic_compute(a: u64, b: u64, op: OpFn) -> u64 {
    match op {
        OpFn::ADD => b.wrapping_add(a),
        OpFn::SUB => b.wrapping_sub(a),
        OpFn::XOR => b ^ a,
        OpFn::AND => b & a,
    }
}

/// Memory operand `D(rB)`: displacement and base register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Addr(pub u64, pub Reg);

impl std::fmt::Display for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}({})", self.0, self.1)
    }
}

/// Y86 instructions, decoded once in the fetch stage. Each variant carries
/// only the operands its encoding has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::upper_case_acronyms)]
pub enum Inst {
    HALT,
    NOP,
    /// `rrmovq/cmovXX rA, rB`
    CMOVX(CondFn, Reg, Reg),
    /// `irmovq V, rB`
    IRMOVQ(Reg, u64),
    /// `rmmovq rA, D(rB)`
    RMMOVQ(Reg, Addr),
    /// `mrmovq D(rB), rA`
    MRMOVQ(Addr, Reg),
    /// `OPq rA, rB`
    OPQ(OpFn, Reg, Reg),
    JX(CondFn, u64),
    CALL(u64),
    RET,
    PUSHQ(Reg),
    POPQ(Reg),
    /// `iOPq V, rB`
    IOPQ(OpFn, Reg, u64),
}

impl Inst {
    /// Encoded length in bytes.
    pub fn len(&self) -> u64 {
        use Inst::*;
        match self {
            HALT | RET | NOP => 1,
            OPQ(..) | CMOVX(..) | PUSHQ(_) | POPQ(_) => 2,
            JX(..) | CALL(_) => 9,
            IRMOVQ(..) | RMMOVQ(..) | MRMOVQ(..) | IOPQ(..) => 10,
        }
    }

    pub fn icode(&self) -> u8 {
        use inst_code::*;
        match self {
            Inst::HALT => HALT,
            Inst::NOP => NOP,
            Inst::CMOVX(..) => CMOVX,
            Inst::IRMOVQ(..) => IRMOVQ,
            Inst::RMMOVQ(..) => RMMOVQ,
            Inst::MRMOVQ(..) => MRMOVQ,
            Inst::OPQ(..) => OPQ,
            Inst::JX(..) => JX,
            Inst::CALL(_) => CALL,
            Inst::RET => RET,
            Inst::PUSHQ(_) => PUSHQ,
            Inst::POPQ(_) => POPQ,
            Inst::IOPQ(..) => IOPQ,
        }
    }

    pub fn ifun(&self) -> u8 {
        match self {
            Inst::CMOVX(c, ..) | Inst::JX(c, _) => *c as u8,
            Inst::OPQ(op, ..) | Inst::IOPQ(op, ..) => *op as u8,
            _ => 0,
        }
    }

    /// Mnemonic, e.g. `cmovle`, `jmp`, `iaddq`.
    pub fn name(&self) -> String {
        match self {
            Inst::HALT => "halt".into(),
            Inst::NOP => "nop".into(),
            Inst::CMOVX(CondFn::YES, ..) => "rrmovq".into(),
            Inst::CMOVX(c, ..) => format!("cmov{}", c.suffix()),
            Inst::IRMOVQ(..) => "irmovq".into(),
            Inst::RMMOVQ(..) => "rmmovq".into(),
            Inst::MRMOVQ(..) => "mrmovq".into(),
            Inst::OPQ(op, ..) => format!("{}q", op.stem()),
            Inst::JX(CondFn::YES, _) => "jmp".into(),
            Inst::JX(c, _) => format!("j{}", c.suffix()),
            Inst::CALL(_) => "call".into(),
            Inst::RET => "ret".into(),
            Inst::PUSHQ(_) => "pushq".into(),
            Inst::POPQ(_) => "popq".into(),
            Inst::IOPQ(op, ..) => format!("i{}q", op.stem()),
        }
    }

    /// Machine code of this instruction.
    pub fn encode(&self) -> Vec<u8> {
        let head = self.icode() << 4 | self.ifun();
        let regs = |ra: Reg, rb: Reg| ra.code() << 4 | rb.code();
        let mut out = vec![head];
        match *self {
            Inst::HALT | Inst::NOP | Inst::RET => {}
            Inst::CMOVX(_, ra, rb) | Inst::OPQ(_, ra, rb) => out.push(regs(ra, rb)),
            Inst::IRMOVQ(rb, v) | Inst::IOPQ(_, rb, v) => {
                out.push(regs(Reg::RNONE, rb));
                out.extend_from_slice(&v.to_le_bytes());
            }
            Inst::RMMOVQ(ra, Addr(d, rb)) | Inst::MRMOVQ(Addr(d, rb), ra) => {
                out.push(regs(ra, rb));
                out.extend_from_slice(&d.to_le_bytes());
            }
            Inst::JX(_, dest) | Inst::CALL(dest) => out.extend_from_slice(&dest.to_le_bytes()),
            Inst::PUSHQ(ra) | Inst::POPQ(ra) => out.push(regs(ra, Reg::RNONE)),
        }
        out
    }

    /// Fetch and decode the instruction at `pc`, returning it with the address
    /// of its sequential successor.
    ///
    /// Reading past the end of memory gives [`Stat::Adr`]; an unknown icode or
    /// a function code the icode does not define gives [`Stat::Ins`].
    pub fn read(mem: &Memory, pc: u64) -> Result<(Inst, u64), Stat> {
        let head = mem.read_byte(pc).map_err(|_| Stat::Adr)?;
        let (icode, ifun) = (head >> 4, head & 0xf);

        let regs = |at: u64| -> Result<(Reg, Reg), Stat> {
            let b = mem.read_byte(at).map_err(|_| Stat::Adr)?;
            Ok((Reg::from_nibble(b >> 4), Reg::from_nibble(b)))
        };
        let word = |at: u64| mem.read_u64(at).map_err(|_| Stat::Adr);
        let cond = || CondFn::from_ifun(ifun).ok_or(Stat::Ins);
        let op = || OpFn::from_ifun(ifun).ok_or(Stat::Ins);
        let plain = || if ifun == 0 { Ok(()) } else { Err(Stat::Ins) };

        use inst_code::*;
        let inst = match icode {
            HALT => plain().map(|_| Inst::HALT)?,
            NOP => plain().map(|_| Inst::NOP)?,
            CMOVX => {
                let c = cond()?;
                let (ra, rb) = regs(pc + 1)?;
                Inst::CMOVX(c, ra, rb)
            }
            IRMOVQ => {
                plain()?;
                let (_, rb) = regs(pc + 1)?;
                Inst::IRMOVQ(rb, word(pc + 2)?)
            }
            RMMOVQ => {
                plain()?;
                let (ra, rb) = regs(pc + 1)?;
                Inst::RMMOVQ(ra, Addr(word(pc + 2)?, rb))
            }
            MRMOVQ => {
                plain()?;
                let (ra, rb) = regs(pc + 1)?;
                Inst::MRMOVQ(Addr(word(pc + 2)?, rb), ra)
            }
            OPQ => {
                let op = op()?;
                let (ra, rb) = regs(pc + 1)?;
                Inst::OPQ(op, ra, rb)
            }
            JX => Inst::JX(cond()?, word(pc + 1)?),
            CALL => {
                plain()?;
                Inst::CALL(word(pc + 1)?)
            }
            RET => plain().map(|_| Inst::RET)?,
            PUSHQ => {
                plain()?;
                Inst::PUSHQ(regs(pc + 1)?.0)
            }
            POPQ => {
                plain()?;
                Inst::POPQ(regs(pc + 1)?.0)
            }
            IOPQ => {
                let op = op()?;
                let (_, rb) = regs(pc + 1)?;
                Inst::IOPQ(op, rb, word(pc + 2)?)
            }
            _ => return Err(Stat::Ins),
        };
        Ok((inst, pc.wrapping_add(inst.len())))
    }
}

impl std::fmt::Display for Inst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name();
        match self {
            Inst::HALT | Inst::NOP | Inst::RET => write!(f, "{name}"),
            Inst::CMOVX(_, ra, rb) | Inst::OPQ(_, ra, rb) => write!(f, "{name} {ra}, {rb}"),
            Inst::IRMOVQ(rb, v) | Inst::IOPQ(_, rb, v) => write!(f, "{name} ${v:#x}, {rb}"),
            Inst::RMMOVQ(ra, addr) => write!(f, "{name} {ra}, {addr}"),
            Inst::MRMOVQ(addr, ra) => write!(f, "{name} {addr}, {ra}"),
            Inst::JX(_, dest) | Inst::CALL(dest) => write!(f, "{name} {dest:#x}"),
            Inst::PUSHQ(ra) | Inst::POPQ(ra) => write!(f, "{name} {ra}"),
        }
    }
}

/// A data structure that simulates the condition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConditionCode {
    pub sf: bool,
    pub of: bool,
    pub zf: bool,
}

/// Power-on state: zero flag set, the others clear.
impl Default for ConditionCode {
    fn default() -> Self {
        Self {
            sf: false,
            of: false,
            zf: true,
        }
    }
}

impl ConditionCode {
    /// Test if the condition code satisfies the given condition function.
    pub fn test(self, cfn: CondFn) -> bool {
        let Self { sf, zf, of } = self;
        match cfn {
            CondFn::YES => true,
            CondFn::E => zf,
            CondFn::NE => !zf,
            CondFn::L => sf ^ of,
            CondFn::LE => zf || (sf ^ of),
            CondFn::GE => !(sf ^ of),
            CondFn::G => !zf && !(sf ^ of),
        }
    }

    /// Flags produced by `e = b op a`.
    pub fn set(&mut self, a: u64, b: u64, e: u64, opfun: OpFn) {
        const W_1: usize = std::mem::size_of::<u64>() * 8 - 1;
        *self = ConditionCode {
            sf: (e >> W_1 & 1) != 0,
            zf: e == 0,
            of: match opfun {
                // a, b have the same sign and a, e have different sign
                OpFn::ADD => (!(a ^ b) & (a ^ e)) >> W_1 != 0,
                // (b - a): a, b have different sign and b, e have different sign
                OpFn::SUB => ((a ^ b) & (b ^ e)) >> W_1 != 0,
                _ => false,
            },
        };
    }
}

impl std::fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Z={} S={} O={}",
            self.zf as u8, self.sf as u8, self.of as u8
        )
    }
}

/// Status carried by every instruction from fetch to write back.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Stat {
    /// Indicates that everything is fine.
    #[default]
    Aok = 0,
    /// Indicates that the stage is bubbled. A bubbled stage execute the NOP
    /// instruction. Initially, all stages are in the bubble state.
    Bub = 1,
    /// The halt state. This state is assigned when the instruction fetcher
    /// reads the halt instruction.
    Hlt = 2,
    /// This state is assigned when the instruction memory or data memory is
    /// accessed with an invalid address.
    Adr = 3,
    /// This state is assigned when the instruction fetcher reads an invalid
    /// instruction code.
    Ins = 4,
    /// A pipeline register was asked to stall and bubble in the same cycle.
    Pip = 5,
}

impl Stat {
    /// `Hlt`, `Adr` and `Ins`: the statuses that freeze write back.
    pub fn is_exception(self) -> bool {
        matches!(self, Stat::Hlt | Stat::Adr | Stat::Ins)
    }

    fn severity(self) -> u8 {
        match self {
            Stat::Aok | Stat::Bub => 0,
            Stat::Hlt => 1,
            Stat::Adr | Stat::Ins => 2,
            Stat::Pip => 3,
        }
    }

    /// Combine a status found by a later stage with the one carried so far.
    /// The result is never less severe than `self`.
    pub fn merge(self, later: Stat) -> Stat {
        if later.severity() > self.severity() {
            later
        } else {
            self
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stat::Aok => "AOK",
            Stat::Bub => "BUB",
            Stat::Hlt => "HLT",
            Stat::Adr => "ADR",
            Stat::Ins => "INS",
            Stat::Pip => "PIP",
        }
    }
}

impl std::fmt::Display for Stat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
