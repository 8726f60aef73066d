//! Storage units shared by every simulator: byte-addressable memory and the
//! program register file.

use crate::{
    isa::Reg,
    utils::{get_u64, put_u64},
};

/// Default size of the memory that stores instructions, data and the stack.
pub const DEFAULT_MEM_SIZE: usize = 1 << 13;

/// A memory reference that does not fit inside the memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFault {
    pub addr: u64,
    pub width: usize,
}

impl std::fmt::Display for AddressFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid memory address {:#x} (width {})",
            self.addr, self.width
        )
    }
}

impl std::error::Error for AddressFault {}

/// Flat little-endian byte storage with a capacity fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    data: Box<[u8]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEM_SIZE)
    }
}

impl Memory {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn range(&self, addr: u64, width: usize) -> Result<std::ops::Range<usize>, AddressFault> {
        let fault = AddressFault { addr, width };
        let start = usize::try_from(addr).map_err(|_| fault)?;
        let end = start.checked_add(width).ok_or(fault)?;
        if end > self.data.len() {
            return Err(fault);
        }
        Ok(start..end)
    }

    /// Read `width` bytes starting at `addr`.
    pub fn read(&self, addr: u64, width: usize) -> Result<&[u8], AddressFault> {
        let range = self.range(addr, width)?;
        Ok(&self.data[range])
    }

    /// Write `bytes` starting at `addr`. The access width is `bytes.len()`.
    /// Nothing is written when any byte would fall outside the memory.
    pub fn write(&mut self, addr: u64, bytes: &[u8]) -> Result<(), AddressFault> {
        let range = self.range(addr, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_byte(&self, addr: u64) -> Result<u8, AddressFault> {
        Ok(self.read(addr, 1)?[0])
    }

    pub fn read_u64(&self, addr: u64) -> Result<u64, AddressFault> {
        Ok(get_u64(self.read(addr, 8)?))
    }

    pub fn write_u64(&mut self, addr: u64, val: u64) -> Result<(), AddressFault> {
        let range = self.range(addr, 8)?;
        put_u64(&mut self.data[range], val);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

/// Fifteen 64-bit program registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegFile([u64; 15]);

impl RegFile {
    /// Value of `reg`; `RNONE` reads as zero.
    pub fn get(&self, reg: Reg) -> u64 {
        match reg {
            Reg::RNONE => 0,
            r => self.0[r.code() as usize],
        }
    }

    /// Write `reg`; writing `RNONE` does nothing.
    pub fn set(&mut self, reg: Reg, val: u64) {
        if reg != Reg::RNONE {
            tracing::trace!("register write: {} = {:#x}", reg, val);
            self.0[reg.code() as usize] = val;
        }
    }

    /// Registers and their values in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = (Reg, u64)> + '_ {
        Reg::ALL.iter().map(|&r| (r, self.get(r)))
    }

    pub fn clear(&mut self) {
        self.0 = [0; 15];
    }
}
