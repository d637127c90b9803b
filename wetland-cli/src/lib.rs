//! Command-line interface driving the wetland service against SQLite.
#![forbid(unsafe_code)]

mod create;
mod delete;
mod error;
mod fs;
mod grant;
mod identity;
mod list;
mod output;
mod reconcile;

use std::io::Write;

use clap::{Parser, Subcommand};

pub use error::CliError;

use create::CreateArgs;
use delete::DeleteArgs;
use grant::GrantArgs;
use list::ListArgs;
use reconcile::ReconcileArgs;

pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_GEOJSON: &str = "geojson";
pub(crate) const ARG_USER_ID: &str = "user-id";
pub(crate) const ARG_ORGANISM_ID: &str = "organism-id";
pub(crate) const ARG_CRUVED: &str = "cruved";
pub(crate) const ARG_NAME: &str = "name";
pub(crate) const ARG_SECONDARY_NAME: &str = "secondary-name";
pub(crate) const ARG_SDAGE_ID: &str = "sdage-id";
pub(crate) const ARG_DATASET_ID: &str = "dataset-id";
pub(crate) const ARG_CRITERION: &str = "criterion";
pub(crate) const ARG_REFERENCE_AREAS: &str = "reference-areas";
pub(crate) const ARG_EXCLUDE_ID: &str = "exclude-id";
pub(crate) const ARG_AREA_MODE: &str = "area-mode";
pub(crate) const ARG_LIMIT: &str = "limit";
pub(crate) const ARG_PAGE: &str = "page";
pub(crate) const ARG_WETLAND_ID: &str = "id";

const ENV_PREFIX: &str = "WETLAND";

/// Environment variable consulted for `field` of `command`.
pub(crate) fn env_var(command: &str, field: &str) -> String {
    format!(
        "{ENV_PREFIX}_CMDS_{}_{}",
        command.to_uppercase(),
        field.replace('-', "_").to_uppercase()
    )
}

/// Run the wetland CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments, configuration, inputs or the
/// requested operation fail.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    run_command(cli.command, &mut stdout)
}

fn run_command(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Reconcile(args) => reconcile::run_reconcile(args, writer),
        Command::Create(args) => create::run_create(args, writer),
        Command::List(args) => list::run_list(args, writer),
        Command::Delete(args) => delete::run_delete(args, writer),
        Command::Grant(args) => grant::run_grant(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "wetland",
    about = "Record wetland contours without overlap and manage access to them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconcile a contour against stored wetlands without saving it.
    Reconcile(ReconcileArgs),
    /// Reconcile and store a new wetland.
    Create(CreateArgs),
    /// List stored wetlands with the caller's rights on each.
    List(ListArgs),
    /// Delete a wetland.
    Delete(DeleteArgs),
    /// Let a user or organism act on a dataset.
    Grant(GrantArgs),
}

#[cfg(test)]
mod tests;
