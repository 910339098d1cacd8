// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! arbor-gen command line: schema file in, generated sources out.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arbor_gen::emit;

/// Compiles a tree specification into generated source files.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The tree specification to compile.
    schema: PathBuf,

    /// Output path for the generated Rust module.
    out: PathBuf,

    /// Also emit a Python module to this path.
    #[clap(long)]
    python: Option<PathBuf>,

    /// Also dump the resolved specification as JSON to this path.
    #[clap(long)]
    emit_ir: Option<PathBuf>,
}

fn run(args: &Args) -> Result<()> {
    let source = fs::read_to_string(&args.schema)
        .with_context(|| format!("failed to read {}", args.schema.display()))?;
    let file_name = args.schema.display().to_string();

    let spec = arbor_gen::compile(&source, &file_name)?;
    info!(
        nodes = spec.nodes.len(),
        module = %spec.module_name,
        "schema compiled"
    );

    fs::write(&args.out, emit::rust::generate(&spec))
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    info!(path = %args.out.display(), "wrote Rust module");

    if let Some(python) = &args.python {
        fs::write(python, emit::python::generate(&spec))
            .with_context(|| format!("failed to write {}", python.display()))?;
        info!(path = %python.display(), "wrote Python module");
    }

    if let Some(ir) = &args.emit_ir {
        let json = serde_json::to_string_pretty(&spec).context("failed to encode IR")?;
        fs::write(ir, json).with_context(|| format!("failed to write {}", ir.display()))?;
        info!(path = %ir.display(), "wrote IR dump");
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
