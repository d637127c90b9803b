//! Caller identity shared by the commands that act on wetlands.

use camino::{Utf8Path, Utf8PathBuf};
use wetland_core::{
    DatasetDirectory, OrganismId, SqliteWetlandStore, UserContext, UserCruved, UserId,
};

use crate::{ARG_CRUVED, ARG_DATABASE, ARG_USER_ID, CliError, env_var, fs};

/// Who is calling and with which CRUVED table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity {
    pub(crate) user: UserId,
    pub(crate) organism: Option<OrganismId>,
    pub(crate) cruved: UserCruved,
}

impl Identity {
    /// Validate the merged identity options of `command`.
    pub(crate) fn from_options(
        command: &str,
        user_id: Option<i64>,
        organism_id: Option<i64>,
        cruved: Option<&str>,
    ) -> Result<Self, CliError> {
        let user = user_id.map(UserId).ok_or_else(|| CliError::MissingArgument {
            field: ARG_USER_ID,
            env: env_var(command, ARG_USER_ID),
        })?;
        let table = cruved.ok_or_else(|| CliError::MissingArgument {
            field: ARG_CRUVED,
            env: env_var(command, ARG_CRUVED),
        })?;
        Ok(Self {
            user,
            organism: organism_id.map(OrganismId),
            cruved: table.parse()?,
        })
    }

    /// Resolve the dataset rights of the caller.
    pub(crate) fn context(&self, directory: &dyn DatasetDirectory) -> Result<UserContext, CliError> {
        UserContext::resolve(self.user, self.organism, directory)
            .map_err(|err| CliError::from(wetland_core::ServiceError::from(err)))
    }
}

/// Database path of `command`, which every wetland command needs.
pub(crate) fn require_database(
    command: &str,
    database: Option<Utf8PathBuf>,
) -> Result<Utf8PathBuf, CliError> {
    database.ok_or_else(|| CliError::MissingArgument {
        field: ARG_DATABASE,
        env: env_var(command, ARG_DATABASE),
    })
}

/// Open (creating if needed) the wetland database.
pub(crate) fn open_store(path: &Utf8Path) -> Result<SqliteWetlandStore, CliError> {
    fs::prepare_database_dir(path)?;
    SqliteWetlandStore::open(path.as_std_path()).map_err(|source| CliError::OpenStore {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}
