use crate::cli::{
    actions::{Action, server::Args},
    commands::ARG_PORT,
};
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(ARG_PORT)
        .copied()
        .context("missing required argument: --port")?;

    Ok(Action::Server(Args { port }))
}
