use std::path::PathBuf;

use anyhow::{Context, Result};
use cascade::Form;
use clap::Args;

use crate::formfile;

/// Prints a form's configuration as it would be saved, with a random name generated for every
/// parameter that lacks one.
#[derive(Args, Debug)]
pub struct Command {
    /// Path to the form definition.
    form: PathBuf,
}

pub fn run(cmd: &Command) -> Result<()> {
    let config = formfile::read_form_config(&cmd.form)?;
    let missing = config
        .parameters
        .iter()
        .filter(|parameter| parameter.random_name.is_none())
        .count();
    let form = Form::from_config(config)
        .with_context(|| format!("loading form from {:?}", cmd.form))?;
    log::info!("Generated random names for {missing} parameter(s).");

    let yaml = form
        .to_config()
        .to_yaml_string()
        .with_context(|| "serialising form")?;
    print!("{yaml}");
    Ok(())
}
