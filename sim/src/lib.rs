//! Cycle-accurate simulator of the five-stage Y86-64 pipeline, with a
//! sequential reference model to check it against.

pub mod check;
pub mod framework;
pub mod hardware;
pub mod isa;
pub mod object;
pub mod pipeline;
pub mod report;
pub mod seq;
mod utils;

pub use hardware::{Memory, RegFile, DEFAULT_MEM_SIZE};
pub use object::{load_object_file, ObjectImage};
pub use pipeline::{PerfCounters, PipeSim, RunOutcome};
pub use seq::SeqSim;
pub use utils::{mem_diff, reg_diff};
