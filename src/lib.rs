pub mod cli;
pub mod loader;
pub mod model;
pub mod processor;
pub mod writer;

use anyhow::{Context, bail};

use cli::{Cli, Command};
use processor::diagnostics::Diagnostics;

pub fn run(args: Cli) -> anyhow::Result<()> {
    match args.command {
        Command::Objects { input } => {
            let parsed = loader::load_config_file(&input)?;
            let json = serde_json::to_string_pretty(&parsed.value)
                .with_context(|| "Serializing object table")?;
            println!("{json}");
        }
        Command::Blocks { input, output } => {
            let parsed = loader::load_blocks_file(&input)?;
            let json = serde_json::to_string_pretty(&parsed.value)
                .with_context(|| "Serializing uniform blocks")?;
            println!("{json}");

            if let Some(output) = output {
                std::fs::create_dir_all(&output)
                    .with_context(|| format!("Creating {}", output.display()))?;
                writer::bin::emit(&parsed.value, &output)
                    .with_context(|| "Writing block binaries")?;
            }
        }
        Command::Fmt { input, blocks } => {
            let mut out = std::io::stdout().lock();
            let written = if blocks {
                let parsed = loader::load_blocks_file(&input)?;
                writer::text::write_blocks(&mut out, &parsed.value)
            } else {
                let parsed = loader::load_config_file(&input)?;
                writer::text::write_object_table(&mut out, &parsed.value)
            };
            written.with_context(|| "Writing formatted output")?;
        }
        Command::Check { input, blocks } => {
            let diagnostics = if blocks {
                loader::load_blocks_file(&input)?.diagnostics
            } else {
                loader::load_config_file(&input)?.diagnostics
            };
            report(&input, &diagnostics)?;
        }
    }
    Ok(())
}

fn report(input: &std::path::Path, diagnostics: &Diagnostics) -> anyhow::Result<()> {
    for diagnostic in diagnostics.iter() {
        eprintln!("{}: {diagnostic}", input.display());
    }
    if !diagnostics.is_empty() {
        bail!("{}: {} diagnostics", input.display(), diagnostics.len());
    }
    println!("{}: ok", input.display());
    Ok(())
}
