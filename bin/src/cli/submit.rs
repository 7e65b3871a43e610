use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::engineargs;
use crate::formfile;

/// Converts the values submitted with a form into parameter values, and prints them as JSON.
#[derive(Args, Debug)]
pub struct Command {
    /// Path to the form definition.
    #[arg(long)]
    form: PathBuf,

    /// Path to a JSON file holding the submitted entries, a list of `{"name": ..., "value":
    /// ...}` objects.
    submission: PathBuf,
}

pub fn run(cmd: &Command) -> Result<()> {
    let form = formfile::load_form(&cmd.form)?;
    let content = std::fs::read_to_string(&cmd.submission)
        .with_context(|| format!("reading submission {:?}", cmd.submission))?;
    let entries: Vec<serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("parsing submission {:?}", cmd.submission))?;

    let values = formfile::submitted_values(&form, &entries);
    engineargs::print_json(&values)
}
