//! Pieces shared by the pipelined simulator and the sequential reference:
//! the [`CpuSim`] interface and the double-buffered pipeline register.
mod pipe_reg;

pub use pipe_reg::{Control, PipeReg, StageState};

use crate::{
    hardware::{Memory, RegFile},
    isa::{ConditionCode, Stat},
};

/// A simulator that advances in discrete steps over architectural state.
///
/// For the pipeline one step is one clock cycle; for the sequential model
/// one step is one instruction.
pub trait CpuSim {
    /// Advance by one step. Does nothing once [`CpuSim::is_terminate`] holds.
    fn step(&mut self);

    /// Whether the simulation is terminated
    fn is_terminate(&self) -> bool;

    /// Get the current program counter
    fn program_counter(&self) -> u64;

    fn cycle_count(&self) -> u64;

    /// Last reported program status.
    fn status(&self) -> Stat;

    fn registers(&self) -> &RegFile;

    fn mem(&self) -> &Memory;

    fn cc(&self) -> ConditionCode;
}
