//! `list` command: page through stored wetlands.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wetland_core::{DEFAULT_PAGE_LIMIT, GeometryReconciler, PageRequest, WetlandService};

use crate::identity::{Identity, open_store, require_database};
use crate::output::write_json;
use crate::{
    ARG_CRUVED, ARG_DATABASE, ARG_LIMIT, ARG_ORGANISM_ID, ARG_PAGE, ARG_USER_ID, CliError,
};

const COMMAND: &str = "list";

/// CLI arguments for the `list` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Print one page of stored wetlands as JSON. Each row \
                 carries the wetland attributes, its GeoJSON contour and \
                 the actions the caller may perform on it.",
    about = "List stored wetlands"
)]
#[ortho_config(prefix = "WETLAND")]
pub(crate) struct ListArgs {
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
    /// Wetlands per page.
    #[arg(long = ARG_LIMIT, value_name = "count")]
    #[serde(default)]
    pub(crate) limit: Option<u32>,
    /// Zero-based page index.
    #[arg(long = ARG_PAGE, value_name = "index")]
    #[serde(default)]
    pub(crate) page: Option<u64>,
}

impl ListArgs {
    fn into_config(self) -> Result<ListConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ListConfig::try_from(merged)
    }
}

/// Resolved `list` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) identity: Identity,
    pub(crate) page: PageRequest,
}

impl TryFrom<ListArgs> for ListConfig {
    type Error = CliError;

    fn try_from(args: ListArgs) -> Result<Self, Self::Error> {
        let identity =
            Identity::from_options(COMMAND, args.user_id, args.organism_id, args.cruved.as_deref())?;
        Ok(Self {
            database: require_database(COMMAND, args.database)?,
            identity,
            page: PageRequest {
                limit: args.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
                page: args.page.unwrap_or_default(),
            },
        })
    }
}

pub(crate) fn run_list(args: ListArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_list(&config, writer)
}

pub(crate) fn execute_list(config: &ListConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let store = open_store(&config.database)?;
    let user = config.identity.context(&store)?;
    let service = WetlandService::new(store, GeometryReconciler::default());
    let page = service.list(&user, &config.identity.cruved, config.page)?;
    write_json(writer, &page)
}
