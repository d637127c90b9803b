//! Error types emitted by the wetland CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use wetland_core::{ApiError, CruvedParseError, DatasetId, ReferenceAreaError, StoreError};

/// Errors emitted by the wetland CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name of the option.
        field: &'static str,
        /// Environment variable that could have provided it.
        env: String,
    },
    /// The CRUVED table could not be parsed.
    #[error("invalid --cruved value: {0}")]
    InvalidCruved(#[from] CruvedParseError),
    /// `grant` needs exactly one of `--user-id` and `--organism-id`.
    #[error("grant needs exactly one of --user-id or --organism-id")]
    AmbiguousActor,
    /// A referenced input path does not exist.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag name of the input.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag name of the input.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// A referenced input could not be read.
    #[error("failed to read {field} from {path:?}: {source}")]
    ReadInput {
        /// Flag name of the input.
        field: &'static str,
        /// Offending path.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The directory meant to hold the database could not be created.
    #[error("failed to prepare the directory of database {path:?}: {source}")]
    PrepareDatabaseDir {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Opening the wetland database failed.
    #[error("failed to open wetland database {path:?}: {source}")]
    OpenStore {
        /// Database path.
        path: Utf8PathBuf,
        /// Store failure.
        #[source]
        source: Box<StoreError>,
    },
    /// Recording dataset rights failed.
    #[error("failed to grant rights on dataset {dataset}: {source}")]
    Grant {
        /// Dataset the rights were meant for.
        dataset: DatasetId,
        /// Store failure.
        #[source]
        source: Box<StoreError>,
    },
    /// The reference-area collection could not be loaded.
    #[error("failed to load reference areas from {path:?}: {source}")]
    ReferenceAreas {
        /// Collection path.
        path: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: ReferenceAreaError,
    },
    /// The wetland service rejected the request.
    #[error("{}", render_api_error(.0))]
    Service(ApiError),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

impl From<wetland_core::ServiceError> for CliError {
    fn from(err: wetland_core::ServiceError) -> Self {
        Self::Service(ApiError::from(err))
    }
}

fn render_api_error(error: &ApiError) -> String {
    serde_json::to_string(error).unwrap_or_else(|_| error.to_string())
}
