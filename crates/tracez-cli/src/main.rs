#![doc = include_str!("../README.md")]

mod cli;
mod commands;
mod prompt;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = commands::build_engine(&cli)?;

    match &cli.command {
        Commands::Tasks { format } => commands::tasks::run(&engine, *format),
        Commands::Prompt { task, format } => commands::prompt::run(&engine, task, *format),
        Commands::Verify {
            task,
            target_line,
            completion,
            format,
        } => commands::verify::run(&engine, task, *target_line, completion.as_deref(), *format),
        Commands::Batch { input } => commands::batch::run(&engine, input),
    }
}
