//! Lookup of the datasets a user or their organism may act on.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::{DatasetId, OrganismId, UserId};

/// A party that may act on a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatasetActor {
    /// A single user.
    User(UserId),
    /// Every member of an organism.
    Organism(OrganismId),
}

/// Error raised by a [`DatasetDirectory`] backend.
#[derive(Debug, Error)]
#[error("failed to resolve datasets for user {user}: {message}")]
pub struct DirectoryError {
    /// User whose datasets were requested.
    pub user: UserId,
    /// Backend failure description.
    pub message: String,
}

/// Dataset-actor relationships, resolved eagerly before evaluation.
///
/// # Examples
/// ```
/// use std::collections::BTreeSet;
/// use wetland_core::{DatasetDirectory, DatasetId, DirectoryError, OrganismId, UserId};
///
/// struct Fixed;
///
/// impl DatasetDirectory for Fixed {
///     fn user_datasets(
///         &self,
///         _user: UserId,
///         _organism: Option<OrganismId>,
///         only_own: bool,
///     ) -> Result<BTreeSet<DatasetId>, DirectoryError> {
///         let ids = if only_own { vec![DatasetId(1)] } else { vec![DatasetId(1), DatasetId(2)] };
///         Ok(ids.into_iter().collect())
///     }
/// }
///
/// let all = Fixed.user_datasets(UserId(9), None, false).expect("lookup");
/// assert_eq!(all.len(), 2);
/// ```
pub trait DatasetDirectory {
    /// Datasets on which `user` is an actor.
    ///
    /// With `only_own` set the result is restricted to datasets where the
    /// user is a direct actor; otherwise datasets on which the user's
    /// organism acts are included too.
    ///
    /// # Errors
    /// Returns [`DirectoryError`] when the backend lookup fails.
    fn user_datasets(
        &self,
        user: UserId,
        organism: Option<OrganismId>,
        only_own: bool,
    ) -> Result<BTreeSet<DatasetId>, DirectoryError>;
}

impl<T: DatasetDirectory + ?Sized> DatasetDirectory for &T {
    fn user_datasets(
        &self,
        user: UserId,
        organism: Option<OrganismId>,
        only_own: bool,
    ) -> Result<BTreeSet<DatasetId>, DirectoryError> {
        (**self).user_datasets(user, organism, only_own)
    }
}
