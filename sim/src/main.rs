use std::{io::IsTerminal, path::PathBuf};

use anyhow::{Context, Result};
use binutils::{clap, verbose};
use clap::Parser;
use y86_psim::{
    check, framework::CpuSim, report::RunReport, Memory, ObjectImage, PipeSim, SeqSim,
    DEFAULT_MEM_SIZE,
};

/// Y86-64 pipeline simulator
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = binutils::get_styles(),
)]
struct Args {
    /// Path to the input .yo object file (read from stdin if omitted)
    input: Option<PathBuf>,

    /// Maximum number of instructions to execute
    #[arg(short = 'l', long, default_value_t = 10000)]
    limit: u64,

    /// Maximum number of cycles to simulate (default is 5 times the limit)
    #[arg(long)]
    cycles: Option<u64>,

    /// Also run the sequential reference model and compare the final states
    #[arg(short = 't', long)]
    check: bool,

    /// Memory size in bytes
    #[arg(long, default_value_t = DEFAULT_MEM_SIZE)]
    mem_size: usize,

    /// Write logs to this file as JSON lines instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    // -q prints only the CPI line, -vv adds the per-cycle pipeline trace
    #[command(flatten)]
    verbose: verbose::Verbosity,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = args
        .log_file
        .as_ref()
        .map(|path| {
            std::fs::File::create(path)
                .with_context(|| format!("could not create log file `{}`", path.display()))
        })
        .transpose()?;
    let log_level = binutils::verbosity_to_level(args.verbose.log_level());
    binutils::logging_setup(log_level, log_file.as_ref());

    let verbosity = match args.verbose.log_level() {
        None => 0,
        Some(lv) if lv >= verbose::Level::Info => 2,
        Some(_) => 1,
    };

    let content = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read file `{}`", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("could not read stdin")?,
    };
    let image = ObjectImage::parse(&content)?;

    let mut mem = Memory::new(args.mem_size);
    image.load_into(&mut mem)?;
    let initial = mem.clone();

    let max_cycle = args.cycles.unwrap_or(args.limit.saturating_mul(5));
    let mut pipe = PipeSim::new(mem);
    let outcome = pipe.run(args.limit, max_cycle);
    tracing::info!(
        "pipeline stopped at pc {:#x}: status {}, {} cycles",
        pipe.program_counter(),
        outcome.status,
        pipe.cycle_count()
    );

    let mut report = RunReport::new(&initial, &pipe)
        .verbosity(verbosity)
        .color(std::io::stdout().is_terminal());
    if args.check {
        let mut seq = SeqSim::new(initial.clone());
        seq.run(args.limit);
        tracing::info!(
            "reference model stopped at pc {:#x} after {} instructions",
            seq.program_counter(),
            seq.cycle_count()
        );
        report = report.with_check(check::compare(&seq, &pipe));
    }
    println!("{report}");
    Ok(())
}
