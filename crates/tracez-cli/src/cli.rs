//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracez_engine::EngineOptions;

#[derive(Parser)]
#[command(name = "tracez")]
#[command(about = "Score model-predicted branch traces against a solver and an instrumented run")]
#[command(version)]
pub(crate) struct Cli {
    /// Directory of extra `*.json` task definitions
    #[arg(long, global = true)]
    pub(crate) tasks_dir: Option<PathBuf>,

    /// Solver timeout per feasibility query in seconds (0 = unbounded)
    #[arg(long, global = true, default_value_t = 30)]
    pub(crate) solver_timeout: u64,

    /// Timeout for the instrumented run in seconds (0 = unbounded)
    #[arg(long, global = true, default_value_t = 10)]
    pub(crate) execution_timeout: u64,

    /// Write each feasibility query as SMT-LIB2 into this directory
    #[arg(long, global = true)]
    pub(crate) dump_smt: Option<PathBuf>,

    /// Do not explain infeasible traces with an unsat core
    #[arg(long, global = true, default_value_t = false)]
    pub(crate) no_unsat_core: bool,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

impl Cli {
    pub(crate) fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            solver_timeout_secs: self.solver_timeout,
            execution_timeout_secs: self.execution_timeout,
            dump_smt: self.dump_smt.clone(),
            diagnose_unsat_core: !self.no_unsat_core,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List registered tasks
    Tasks {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Render the model-facing prompt for a task
    Prompt {
        #[arg(long)]
        task: String,

        /// `text` prints system and user prompt; `json` a chat message list
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Score one completion against a task
    Verify {
        #[arg(long)]
        task: String,

        /// Target line (defaults to the task's target)
        #[arg(long)]
        target_line: Option<u32>,

        /// File holding the model output (`-` or absent: stdin)
        #[arg(long)]
        completion: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Score a JSON-lines file of `{task, target_line?, completion}` requests
    Batch {
        /// Input file (`-`: stdin)
        #[arg(long)]
        input: PathBuf,
    },
}
