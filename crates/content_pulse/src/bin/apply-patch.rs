use std::{io::Read, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use content_pulse::{patch::parse_patch, tracing::init_tracing_subscriber};

#[derive(Parser)]
#[command(
    name = "apply-patch",
    about = "Writes the files of a `=== FILE: <path> ===` bundle to disk"
)]
struct Cli {
    /// Bundle to apply, read from stdin when omitted
    input: Option<PathBuf>,

    /// Directory the paths in the bundle are relative to
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// List the target files without writing them
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let input = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let patch = parse_patch(&input)?;
    let targets = patch.apply(&cli.root, cli.dry_run)?;

    for target in &targets {
        println!("{}", target.display());
    }
    tracing::info!(
        files = targets.len(),
        dry_run = cli.dry_run,
        "Patch applied"
    );

    Ok(())
}
