use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use okapi_vm::{decoder::TableDecoder, exec::CoreExecutor, Cpu, CpuConfig, Program};

/// Exit code reserved for interpreter faults; program-directed codes own the
/// rest of the range.
const TRAP_EXIT_CODE: i32 = 70;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run an okapi artifact on the interpreter")]
struct Opts {
    /// Registers available to each frame
    #[arg(long)]
    registers: Option<usize>,
    /// Maximum call depth
    #[arg(long)]
    max_depth: Option<usize>,
    /// Print the final machine state as JSON to stderr
    #[arg(long)]
    dump_state: bool,
    #[arg(value_name = "ARTIFACT")]
    input: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let raw = std::fs::read(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let program = Program::from_bytes(&raw)
        .with_context(|| format!("loading {}", opts.input.display()))?;

    let mut cfg = CpuConfig::default();
    if let Some(n) = opts.registers {
        cfg.registers_per_frame = n;
    }
    if let Some(n) = opts.max_depth {
        cfg.max_call_depth = n;
    }

    let mut cpu = Cpu::new(cfg);
    cpu.reset(program.entry);

    let dec = TableDecoder::new();
    let exec = CoreExecutor;
    let mut out = std::io::stdout().lock();
    let result = cpu.run(&program, &dec, &exec, &mut out);
    out.flush()?;

    if opts.dump_state {
        eprintln!("{}", serde_json::to_string_pretty(&cpu)?);
    }

    match result {
        Ok(code) => std::process::exit(code),
        Err(trap) => {
            eprintln!("trap: {trap}");
            std::process::exit(TRAP_EXIT_CODE);
        }
    }
}
