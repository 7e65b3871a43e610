use anyhow::Result;

mod cli;
mod formfile;

fn main() -> Result<()> {
    cli::run()
}
