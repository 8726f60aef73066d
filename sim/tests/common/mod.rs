#![allow(dead_code)]

use y86_psim::{isa::Inst, Memory, ObjectImage, PipeSim, SeqSim, DEFAULT_MEM_SIZE};

pub const LIMIT: u64 = 10000;

/// Builds `.yo` text the way the assembler lays it out.
#[derive(Default)]
pub struct Program {
    lines: Vec<String>,
    pc: u64,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Address of the next emitted item.
    pub fn pc(&self) -> u64 {
        self.pc
    }

    fn emit(&mut self, bytes: &[u8], text: &str) {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let line = format!("{:#05x}: {:<20} | {}", self.pc, hex, text);
        self.lines.push(line);
    }

    pub fn at(mut self, addr: u64) -> Self {
        self.pc = addr;
        self.emit(&[], &format!(".pos {addr:#x}"));
        self
    }

    pub fn inst(mut self, inst: Inst) -> Self {
        self.emit(&inst.encode(), &inst.to_string());
        self.pc += inst.len();
        self
    }

    pub fn insts(self, insts: &[Inst]) -> Self {
        insts.iter().fold(self, |p, &inst| p.inst(inst))
    }

    pub fn quad(mut self, val: u64) -> Self {
        self.emit(&val.to_le_bytes(), &format!(".quad {val:#x}"));
        self.pc += 8;
        self
    }

    pub fn build(&self) -> String {
        let mut text = String::from("                            | # generated\n");
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

pub fn load(text: &str) -> anyhow::Result<Memory> {
    let image = ObjectImage::parse(text)?;
    let mut mem = Memory::new(DEFAULT_MEM_SIZE);
    image.load_into(&mut mem)?;
    Ok(mem)
}

/// Run the pipeline to completion with the default budgets.
pub fn run_pipe(text: &str) -> anyhow::Result<PipeSim> {
    let mut pipe = PipeSim::new(load(text)?).with_trace(true);
    pipe.run(LIMIT, 5 * LIMIT);
    Ok(pipe)
}

pub fn run_seq(text: &str) -> anyhow::Result<SeqSim> {
    let mut seq = SeqSim::new(load(text)?);
    seq.run(LIMIT);
    Ok(seq)
}
