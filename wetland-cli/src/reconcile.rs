//! `reconcile` command: preview the stored contour of a drawing.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wetland_core::{AreaMode, GeometryReconciler, ReconcilerConfig, WetlandId, WetlandService};

use crate::identity::{Identity, open_store, require_database};
use crate::output::write_json;
use crate::{
    ARG_AREA_MODE, ARG_CRUVED, ARG_DATABASE, ARG_EXCLUDE_ID, ARG_GEOJSON, ARG_ORGANISM_ID,
    ARG_USER_ID, CliError, env_var, fs,
};

const COMMAND: &str = "reconcile";

/// CLI arguments for the `reconcile` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Subtract every stored wetland from a GeoJSON contour and \
                 report the contour that would be saved, whether it \
                 overlapped another wetland and its area in hectares. \
                 The caller needs a read right. Nothing is written to \
                 the database.",
    about = "Preview the reconciled contour of a drawing"
)]
#[ortho_config(prefix = "WETLAND")]
pub(crate) struct ReconcileArgs {
    /// Path to a GeoJSON Polygon, MultiPolygon or Feature.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) geojson: Option<Utf8PathBuf>,
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
    /// Wetland being edited, left out of the comparison.
    #[arg(long = ARG_EXCLUDE_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) exclude_id: Option<i64>,
    /// Surface measure: `planar` or `geodesic`.
    #[arg(long = ARG_AREA_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) area_mode: Option<AreaMode>,
}

impl ReconcileArgs {
    fn into_config(self) -> Result<ReconcileConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ReconcileConfig::try_from(merged)
    }
}

/// Resolved `reconcile` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReconcileConfig {
    pub(crate) geojson: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
    pub(crate) identity: Identity,
    pub(crate) exclude_id: Option<WetlandId>,
    pub(crate) area_mode: AreaMode,
}

impl TryFrom<ReconcileArgs> for ReconcileConfig {
    type Error = CliError;

    fn try_from(args: ReconcileArgs) -> Result<Self, Self::Error> {
        let geojson = args.geojson.ok_or_else(|| CliError::MissingArgument {
            field: ARG_GEOJSON,
            env: env_var(COMMAND, ARG_GEOJSON),
        })?;
        let database = require_database(COMMAND, args.database)?;
        let identity =
            Identity::from_options(COMMAND, args.user_id, args.organism_id, args.cruved.as_deref())?;
        Ok(Self {
            geojson,
            database,
            identity,
            exclude_id: args.exclude_id.map(WetlandId),
            area_mode: args.area_mode.unwrap_or_default(),
        })
    }
}

pub(crate) fn run_reconcile(args: ReconcileArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_reconcile(&config, writer)
}

pub(crate) fn execute_reconcile(
    config: &ReconcileConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let geojson = fs::read_input(&config.geojson, ARG_GEOJSON)?;
    let store = open_store(&config.database)?;
    let user = config.identity.context(&store)?;
    let reconciler = GeometryReconciler::new(ReconcilerConfig {
        area_mode: config.area_mode,
        ..ReconcilerConfig::default()
    });
    let service = WetlandService::new(store, reconciler);
    let report = service.reconcile_preview(
        &user,
        &config.identity.cruved,
        &geojson,
        config.exclude_id,
    )?;
    write_json(writer, &report)
}
