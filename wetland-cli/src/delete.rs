//! `delete` command: remove a wetland the caller may delete.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wetland_core::{GeometryReconciler, WetlandId, WetlandService};

use crate::identity::{Identity, open_store, require_database};
use crate::output::write_json;
use crate::{
    ARG_CRUVED, ARG_DATABASE, ARG_ORGANISM_ID, ARG_USER_ID, ARG_WETLAND_ID, CliError, env_var,
};

const COMMAND: &str = "delete";

/// CLI arguments for the `delete` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Delete a wetland together with its co-authors, \
                 delimitation criteria and reference-area covers. The \
                 caller needs the delete right on the wetland.",
    about = "Delete a wetland"
)]
#[ortho_config(prefix = "WETLAND")]
pub(crate) struct DeleteArgs {
    /// Identifier of the wetland.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<i64>,
    /// Path to the wetland SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Identifier of the calling user.
    #[arg(long = ARG_USER_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) user_id: Option<i64>,
    /// Organism of the calling user.
    #[arg(long = ARG_ORGANISM_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) organism_id: Option<i64>,
    /// CRUVED table of the caller, e.g. `C1R3U1V1E1D1`.
    #[arg(long = ARG_CRUVED, value_name = "table")]
    #[serde(default)]
    pub(crate) cruved: Option<String>,
}

impl DeleteArgs {
    fn into_config(self) -> Result<DeleteConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DeleteConfig::try_from(merged)
    }
}

/// Resolved `delete` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeleteConfig {
    pub(crate) id: WetlandId,
    pub(crate) database: Utf8PathBuf,
    pub(crate) identity: Identity,
}

impl TryFrom<DeleteArgs> for DeleteConfig {
    type Error = CliError;

    fn try_from(args: DeleteArgs) -> Result<Self, Self::Error> {
        let id = args.id.map(WetlandId).ok_or_else(|| CliError::MissingArgument {
            field: ARG_WETLAND_ID,
            env: env_var(COMMAND, ARG_WETLAND_ID),
        })?;
        let identity =
            Identity::from_options(COMMAND, args.user_id, args.organism_id, args.cruved.as_deref())?;
        Ok(Self {
            id,
            database: require_database(COMMAND, args.database)?,
            identity,
        })
    }
}

#[derive(Debug, Serialize)]
struct Deleted {
    deleted: WetlandId,
}

pub(crate) fn run_delete(args: DeleteArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_delete(&config, writer)
}

pub(crate) fn execute_delete(config: &DeleteConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let store = open_store(&config.database)?;
    let user = config.identity.context(&store)?;
    let mut service = WetlandService::new(store, GeometryReconciler::default());
    service.delete(&user, &config.identity.cruved, config.id)?;
    write_json(writer, &Deleted { deleted: config.id })
}
