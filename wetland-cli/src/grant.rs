//! `grant` command: record a dataset actor.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wetland_core::{DatasetActor, DatasetId, OrganismId, UserId};

use crate::identity::{open_store, require_database};
use crate::output::write_json;
use crate::{ARG_DATABASE, ARG_DATASET_ID, ARG_ORGANISM_ID, ARG_USER_ID, CliError, env_var};

const COMMAND: &str = "grant";

/// CLI arguments for the `grant` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Record that a user, or every member of an organism, acts \
                 on a dataset. Wetlands of that dataset then become \
                 reachable at the own-only or organization access level.",
    about = "Grant dataset rights"
)]
#[ortho_config(prefix = "WETLAND")]
pub(crate) struct GrantArgs {
    /// Path to the wetland SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Dataset the rights apply to.
    #[arg(long = ARG_DATASET_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) dataset_id: Option<i64>,
    /// User acting on the dataset.
    #[arg(long = ARG_USER_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) user_id: Option<i64>,
    /// Organism acting on the dataset.
    #[arg(long = ARG_ORGANISM_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) organism_id: Option<i64>,
}

impl GrantArgs {
    fn into_config(self) -> Result<GrantConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        GrantConfig::try_from(merged)
    }
}

/// Resolved `grant` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GrantConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) dataset: DatasetId,
    pub(crate) actor: DatasetActor,
}

impl TryFrom<GrantArgs> for GrantConfig {
    type Error = CliError;

    fn try_from(args: GrantArgs) -> Result<Self, Self::Error> {
        let dataset = args.dataset_id.map(DatasetId).ok_or_else(|| CliError::MissingArgument {
            field: ARG_DATASET_ID,
            env: env_var(COMMAND, ARG_DATASET_ID),
        })?;
        let actor = match (args.user_id, args.organism_id) {
            (Some(user), None) => DatasetActor::User(UserId(user)),
            (None, Some(organism)) => DatasetActor::Organism(OrganismId(organism)),
            _ => return Err(CliError::AmbiguousActor),
        };
        Ok(Self {
            database: require_database(COMMAND, args.database)?,
            dataset,
            actor,
        })
    }
}

#[derive(Debug, Serialize)]
struct Granted {
    dataset_id: DatasetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    organism_id: Option<OrganismId>,
}

pub(crate) fn run_grant(args: GrantArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_grant(&config, writer)
}

pub(crate) fn execute_grant(config: &GrantConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let store = open_store(&config.database)?;
    store
        .add_dataset_actor(config.dataset, config.actor)
        .map_err(|source| CliError::Grant {
            dataset: config.dataset,
            source: Box::new(source),
        })?;
    let (user_id, organism_id) = match config.actor {
        DatasetActor::User(user) => (Some(user), None),
        DatasetActor::Organism(organism) => (None, Some(organism)),
    };
    write_json(
        writer,
        &Granted {
            dataset_id: config.dataset,
            user_id,
            organism_id,
        },
    )
}
