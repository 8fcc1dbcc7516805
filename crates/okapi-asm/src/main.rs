use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use okapi_asm::assemble;

#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble okapi source into a runnable artifact")]
struct Opts {
    /// Assembly source file
    #[arg(short, long)]
    input: PathBuf,
    /// Output artifact path
    #[arg(short, long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let source = std::fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let program = assemble(&source)
        .map_err(|e| anyhow!("{}: {e}", opts.input.display()))?;

    std::fs::write(&opts.output, program.to_bytes())
        .with_context(|| format!("writing {}", opts.output.display()))?;
    Ok(())
}
