// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! # gradeplan
//!
//! ```bash
//! # Solve with the defaults and print the result
//! gradeplan solve --instance plant.json
//!
//! # Config file plus overrides, result written to a file
//! gradeplan solve --instance plant.json --config solve.json --workers 4 --output result.json
//!
//! # Only load and validate an instance
//! gradeplan validate --instance plant.json
//! ```
//!
//! Logging goes to stderr and is filtered by `RUST_LOG` (default `info`).

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gradeplan_model::{
    config::SolveConfig,
    loading::{load_config_from_path, load_instance_from_path},
};
use gradeplan_scheduler::{error::ScheduleError, plan, result::ScheduleResult};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gradeplan")]
#[command(about = "Multi-plant, multi-grade production scheduler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan an instance and print the result as JSON
    Solve(SolveArgs),
    /// Load and validate an instance without solving it
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Instance document (JSON)
    #[arg(short, long)]
    instance: PathBuf,

    /// Solve configuration (JSON); absent fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wall-clock limit in minutes
    #[arg(long)]
    time_limit_minutes: Option<u64>,

    /// Number of parallel search workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Extra days appended to the horizon
    #[arg(long)]
    buffer_days: Option<usize>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl SolveArgs {
    /// The configuration file, if any, with the command line flags applied
    /// on top.
    fn solve_config(&self) -> anyhow::Result<SolveConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_from_path(path)
                .with_context(|| format!("failed to load config `{}`", path.display()))?,
            None => SolveConfig::default(),
        };
        if let Some(minutes) = self.time_limit_minutes {
            config = config.with_time_limit_minutes(minutes);
        }
        if let Some(workers) = self.workers {
            config = config.with_worker_count(workers);
        }
        if let Some(seed) = self.seed {
            config = config.with_random_seed(seed);
        }
        if let Some(buffer_days) = self.buffer_days {
            config = config.with_buffer_days(buffer_days);
        }
        config.validate().context("invalid solve configuration")?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Instance document (JSON)
    #[arg(short, long)]
    instance: PathBuf,
}

fn main() -> anyhow::Result<()> {
    gradeplan_scheduler::logging::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Solve(args) => solve(&args),
        Command::Validate(args) => validate(&args),
    }
}

fn solve(args: &SolveArgs) -> anyhow::Result<()> {
    let instance = load_instance_from_path(&args.instance)
        .with_context(|| format!("failed to load instance `{}`", args.instance.display()))?;
    let config = args.solve_config()?;
    tracing::info!(config = %config, "configuration");

    let result = match plan(&instance, &config) {
        Ok(result) => result,
        Err(ScheduleError::ModelInvalid(error)) => {
            tracing::error!(%error, "the backend rejected the model");
            ScheduleResult::model_invalid(&error)
        }
        Err(error) => return Err(error).context("scheduling failed"),
    };

    let json = result
        .to_json_pretty()
        .context("failed to serialize the result")?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write result to `{}`", path.display()))?,
        None => println!("{}", json),
    }

    tracing::info!(
        status = %result.status,
        objective = ?result.objective,
        runtime_seconds = result.runtime_seconds,
        "finished"
    );
    Ok(())
}

fn validate(args: &ValidateArgs) -> anyhow::Result<()> {
    let instance = load_instance_from_path(&args.instance)
        .with_context(|| format!("failed to load instance `{}`", args.instance.display()))?;
    println!(
        "instance `{}` is valid: {} grades, {} lines, {} days from {}",
        args.instance.display(),
        instance.num_grades(),
        instance.num_lines(),
        instance.num_core_days(),
        instance.calendar().start()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_args(argv: &[&str]) -> SolveArgs {
        match Cli::try_parse_from(argv) {
            Ok(Cli {
                command: Command::Solve(args),
            }) => args,
            other => panic!("expected solve arguments, got {:?}", other),
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = solve_args(&[
            "gradeplan",
            "solve",
            "--instance",
            "plant.json",
            "--time-limit-minutes",
            "2",
            "--workers",
            "3",
            "--seed",
            "9",
            "--buffer-days",
            "0",
        ]);
        let config = args.solve_config().unwrap();
        assert_eq!(config.time_limit_minutes, 2);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.random_seed, 9);
        assert_eq!(config.buffer_days, 0);
        assert_eq!(config.stockout_penalty, 10);
    }

    #[test]
    fn test_invalid_override_is_an_error() {
        let args = solve_args(&["gradeplan", "solve", "-i", "plant.json", "--workers", "0"]);
        assert!(args.solve_config().is_err());
    }

    #[test]
    fn test_instance_is_required() {
        assert!(Cli::try_parse_from(["gradeplan", "solve"]).is_err());
        assert!(Cli::try_parse_from(["gradeplan", "validate", "--instance", "x.json"]).is_ok());
    }
}
