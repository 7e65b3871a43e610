use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simplelog::LevelFilter;

mod assignnames;
mod change;
mod engineargs;
mod render;
mod submit;

/// Evaluates scripted choice parameters of job configuration forms.
#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Logging level.
    #[arg(long, default_value = "Warn")]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Command {
    AssignNames(assignnames::Command),
    Change(change::Command),
    Render(render::Command),
    Submit(submit::Command),
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())
        .with_context(|| "configuring logging")?;

    use Command::*;
    match &args.command {
        AssignNames(cmd) => assignnames::run(cmd),
        Change(cmd) => change::run(cmd),
        Render(cmd) => render::run(cmd),
        Submit(cmd) => submit::run(cmd),
    }
}
