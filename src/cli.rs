use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Log every pipeline stage, not just diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the object table of a file as JSON
    Objects {
        /// Input description file
        input: PathBuf,
    },
    /// Print the uniform blocks of a file as JSON
    Blocks {
        /// Input description file
        input: PathBuf,
        /// Also write each block's bytes into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Re-serialize a file in canonical form
    Fmt {
        /// Input description file
        input: PathBuf,
        /// Treat the input as uniform blocks instead of objects
        #[arg(long)]
        blocks: bool,
    },
    /// Report diagnostics; fails if there are any
    Check {
        /// Input description file
        input: PathBuf,
        /// Treat the input as uniform blocks instead of objects
        #[arg(long)]
        blocks: bool,
    },
}
