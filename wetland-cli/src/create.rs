//! `create` command: reconcile and store a new wetland.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wetland_core::{
    AreaMode, DatasetId, GeometryReconciler, NewWetland, ReconcilerConfig, ReferenceAreaIndex,
    WetlandService, parse_reference_areas,
};

use crate::identity::{Identity, open_store, require_database};
use crate::output::write_json;
use crate::{
    ARG_AREA_MODE, ARG_CRITERION, ARG_CRUVED, ARG_DATABASE, ARG_DATASET_ID, ARG_GEOJSON, ARG_NAME,
    ARG_ORGANISM_ID, ARG_REFERENCE_AREAS, ARG_SDAGE_ID, ARG_SECONDARY_NAME, ARG_USER_ID, CliError,
    env_var, fs,
};

const COMMAND: &str = "create";

/// CLI arguments for the `create` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Reconcile a GeoJSON contour against the stored wetlands \
                 and save what remains as a new wetland. A contour lying \
                 wholly inside an existing wetland is rejected.",
    about = "Store a new wetland"
)]
#[ortho_config(prefix = "WETLAND")]
pub(crate) struct CreateArgs {
    /// Path to a GeoJSON Polygon, MultiPolygon or Feature.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) geojson: Option<Utf8PathBuf>,
    /// Path to the wetland SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Main name of the wetland.
    #[arg(long = ARG_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    /// Secondary name of the wetland.
    #[arg(long = ARG_SECONDARY_NAME, value_name = "name")]
    #[serde(default)]
    pub(crate) secondary_name: Option<String>,
    /// SDAGE typology identifier.
    #[arg(long = ARG_SDAGE_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) sdage_id: Option<i64>,
    /// Dataset the wetland belongs to.
    #[arg(long = ARG_DATASET_ID, value_name = "id")]
    #[serde(default)]
    pub(crate) dataset_id: Option<i64>,
    /// Delimitation criterion identifier; repeat for several.
    #[arg(long = ARG_CRITERION, value_name = "id")]
    #[serde(default)]
    pub(crate) criterion: Vec<i64>,
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
    /// GeoJSON FeatureCollection of reference areas to record covers for.
    #[arg(long = ARG_REFERENCE_AREAS, value_name = "path")]
    #[serde(default)]
    pub(crate) reference_areas: Option<Utf8PathBuf>,
    /// Surface measure: `planar` or `geodesic`.
    #[arg(long = ARG_AREA_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) area_mode: Option<AreaMode>,
}

impl CreateArgs {
    fn into_config(self) -> Result<CreateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CreateConfig::try_from(merged)
    }
}

/// Resolved `create` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CreateConfig {
    pub(crate) geojson: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
    pub(crate) name: String,
    pub(crate) secondary_name: Option<String>,
    pub(crate) sdage_id: Option<i64>,
    pub(crate) dataset_id: Option<DatasetId>,
    pub(crate) criteria: Vec<i64>,
    pub(crate) identity: Identity,
    pub(crate) reference_areas: Option<Utf8PathBuf>,
    pub(crate) area_mode: AreaMode,
}

impl TryFrom<CreateArgs> for CreateConfig {
    type Error = CliError;

    fn try_from(args: CreateArgs) -> Result<Self, Self::Error> {
        let geojson = args.geojson.ok_or_else(|| CliError::MissingArgument {
            field: ARG_GEOJSON,
            env: env_var(COMMAND, ARG_GEOJSON),
        })?;
        let name = args.name.ok_or_else(|| CliError::MissingArgument {
            field: ARG_NAME,
            env: env_var(COMMAND, ARG_NAME),
        })?;
        let identity =
            Identity::from_options(COMMAND, args.user_id, args.organism_id, args.cruved.as_deref())?;
        Ok(Self {
            geojson,
            database: require_database(COMMAND, args.database)?,
            name,
            secondary_name: args.secondary_name,
            sdage_id: args.sdage_id,
            dataset_id: args.dataset_id.map(DatasetId),
            criteria: args.criterion,
            identity,
            reference_areas: args.reference_areas,
            area_mode: args.area_mode.unwrap_or_default(),
        })
    }
}

pub(crate) fn run_create(args: CreateArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    execute_create(&config, writer)
}

pub(crate) fn execute_create(config: &CreateConfig, writer: &mut dyn Write) -> Result<(), CliError> {
    let geometry_geojson = fs::read_input(&config.geojson, ARG_GEOJSON)?;
    let reference_areas = config
        .reference_areas
        .as_deref()
        .map(load_reference_areas)
        .transpose()?;

    let store = open_store(&config.database)?;
    let user = config.identity.context(&store)?;
    let reconciler = GeometryReconciler::new(ReconcilerConfig {
        area_mode: config.area_mode,
        ..ReconcilerConfig::default()
    });
    let mut service = WetlandService::new(store, reconciler);
    if let Some(index) = reference_areas {
        service = service.with_reference_areas(index);
    }

    let request = NewWetland {
        main_name: config.name.clone(),
        secondary_name: config.secondary_name.clone(),
        sdage_id: config.sdage_id,
        delimitation_criteria: config.criteria.clone(),
        dataset_id: config.dataset_id,
        geometry_geojson,
    };
    let wetland = service.create(&user, &config.identity.cruved, request)?;
    write_json(writer, &wetland.summary())
}

fn load_reference_areas(path: &Utf8Path) -> Result<ReferenceAreaIndex, CliError> {
    let text = fs::read_input(path, ARG_REFERENCE_AREAS)?;
    let areas = parse_reference_areas(&text).map_err(|source| CliError::ReferenceAreas {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ReferenceAreaIndex::new(areas))
}
